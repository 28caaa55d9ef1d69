//! Temperature acquisition.
//!
//! [`TemperatureSource`] is the seam between the monitor and the hardware;
//! [`SensorReader`] implements it for one-wire DS18x20 sensors.

pub mod parse;
pub mod w1;

pub use w1::{SensorReader, DEFAULT_DEVICE_ROOT, FAMILY_PREFIXES};

use crate::error::SensorError;

/// A sensor that can be probed for presence and sampled.
///
/// Reads are synchronous and never retried by the implementation; the
/// monitor samples once per status tick.
pub trait TemperatureSource {
    /// Check whether a sensor is attached and reporting valid data.
    fn is_connected(&self) -> bool;

    /// Take one reading in degrees Celsius.
    fn read(&self) -> Result<f64, SensorError>;
}
