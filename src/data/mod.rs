//! Data structures for samples and alarm classification.
//!
//! Samples and verdicts are recomputed on every status tick and never stored.

pub mod alarms;
pub mod temperatures;

pub use alarms::{evaluate, AlarmBand, AlarmEvaluator, AlarmVerdict};
pub use temperatures::TemperatureSample;
