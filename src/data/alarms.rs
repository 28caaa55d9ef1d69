//! Alarm band and verdict types.
//!
//! A sample is classified against an inclusive `[min, max]` band: only values
//! strictly outside the band raise an alarm. Classification is a pure
//! function; the [`AlarmEvaluator`] only holds the currently configured band.

use std::fmt;

use tracing::{info, warn};

use crate::data::TemperatureSample;
use crate::error::ConfigError;

/// Acceptable temperature range in degrees Celsius.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AlarmBand {
    min: f64,
    max: f64,
}

impl AlarmBand {
    /// Band used until the settings provide one.
    pub const DEFAULT: Self = Self {
        min: 0.0,
        max: 30.0,
    };

    /// Create a band, rejecting `min >= max` (and NaN bounds).
    #[allow(clippy::neg_cmp_op_on_partial_ord)]
    pub fn new(min: f64, max: f64) -> Result<Self, ConfigError> {
        // Written as a negated `<` so that NaN bounds are rejected too.
        if !(min < max) {
            return Err(ConfigError::InvalidBand { min, max });
        }
        Ok(Self { min, max })
    }

    /// Lower bound.
    pub fn min(&self) -> f64 {
        self.min
    }

    /// Upper bound.
    pub fn max(&self) -> f64 {
        self.max
    }

    /// Check if a value lies within the band (bounds included).
    pub fn contains(&self, value: f64) -> bool {
        value >= self.min && value <= self.max
    }
}

impl Default for AlarmBand {
    fn default() -> Self {
        Self::DEFAULT
    }
}

impl fmt::Display for AlarmBand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}, {}]", self.min, self.max)
    }
}

/// Classification of a sample relative to the band.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum AlarmVerdict {
    /// The reading lies within the band.
    NoAlarm {
        /// The reading in degrees Celsius.
        temperature: f64,
    },
    /// The reading is strictly lower than the band minimum.
    BelowMin {
        /// The reading in degrees Celsius.
        temperature: f64,
    },
    /// The reading is strictly greater than the band maximum.
    AboveMax {
        /// The reading in degrees Celsius.
        temperature: f64,
    },
    /// No reading could be obtained.
    SensorUnavailable,
}

impl AlarmVerdict {
    /// Check if this verdict raises the alarm flag.
    pub fn is_alarm(&self) -> bool {
        !matches!(self, Self::NoAlarm { .. })
    }

    /// The sample this verdict was derived from.
    pub fn sample(&self) -> TemperatureSample {
        match self {
            Self::NoAlarm { temperature }
            | Self::BelowMin { temperature }
            | Self::AboveMax { temperature } => TemperatureSample::Celsius(*temperature),
            Self::SensorUnavailable => TemperatureSample::Unreadable,
        }
    }

    /// Human-readable reason, as written to the log and the alarm e-mail.
    pub fn reason(&self) -> &'static str {
        match self {
            Self::NoAlarm { .. } => "No Alarm",
            Self::BelowMin { .. } => "Temperature Lower than Minimum",
            Self::AboveMax { .. } => "Temperature Greater than Maximum",
            Self::SensorUnavailable => "Temperature Sensor Unavailable",
        }
    }
}

impl fmt::Display for AlarmVerdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.sample() {
            TemperatureSample::Celsius(value) => write!(f, "{} ({value})", self.reason()),
            TemperatureSample::Unreadable => write!(f, "{}", self.reason()),
        }
    }
}

/// Classify `sample` against `band`.
///
/// Equality with either bound is not an alarm.
///
/// # Example
///
/// ```
/// use smart_alert::data::{evaluate, AlarmBand, AlarmVerdict, TemperatureSample};
///
/// let band = AlarmBand::new(0.0, 28.0).unwrap();
/// assert!(matches!(
///     evaluate(TemperatureSample::Celsius(28.0), &band),
///     AlarmVerdict::NoAlarm { .. }
/// ));
/// assert!(matches!(
///     evaluate(TemperatureSample::Celsius(28.5), &band),
///     AlarmVerdict::AboveMax { .. }
/// ));
/// ```
pub fn evaluate(sample: TemperatureSample, band: &AlarmBand) -> AlarmVerdict {
    match sample {
        TemperatureSample::Unreadable => AlarmVerdict::SensorUnavailable,
        TemperatureSample::Celsius(temperature) if temperature < band.min => {
            AlarmVerdict::BelowMin { temperature }
        }
        TemperatureSample::Celsius(temperature) if temperature > band.max => {
            AlarmVerdict::AboveMax { temperature }
        }
        TemperatureSample::Celsius(temperature) => AlarmVerdict::NoAlarm { temperature },
    }
}

/// Holds the configured band and classifies samples against it.
#[derive(Debug, Clone, Default)]
pub struct AlarmEvaluator {
    band: AlarmBand,
}

impl AlarmEvaluator {
    /// Create an evaluator with the default band.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an evaluator with a specific band.
    pub fn with_band(band: AlarmBand) -> Self {
        Self { band }
    }

    /// The band currently in force.
    pub fn band(&self) -> AlarmBand {
        self.band
    }

    /// Replace the band.
    ///
    /// An invalid band is rejected and the previous band stays in force.
    pub fn set_limits(&mut self, min: f64, max: f64) -> Result<(), ConfigError> {
        match AlarmBand::new(min, max) {
            Ok(band) => {
                info!("Alarm band set to {}", band);
                self.band = band;
                Ok(())
            }
            Err(e) => {
                warn!("{}; keeping {}", e, self.band);
                Err(e)
            }
        }
    }

    /// Classify a sample against the current band.
    pub fn evaluate(&self, sample: TemperatureSample) -> AlarmVerdict {
        evaluate(sample, &self.band)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn band(min: f64, max: f64) -> AlarmBand {
        AlarmBand::new(min, max).unwrap()
    }

    #[test]
    fn test_bounds_are_not_alarms() {
        let b = band(0.0, 28.0);
        assert_eq!(
            evaluate(TemperatureSample::Celsius(0.0), &b),
            AlarmVerdict::NoAlarm { temperature: 0.0 }
        );
        assert_eq!(
            evaluate(TemperatureSample::Celsius(28.0), &b),
            AlarmVerdict::NoAlarm { temperature: 28.0 }
        );
    }

    #[test]
    fn test_outside_band() {
        let b = band(0.0, 28.0);
        assert_eq!(
            evaluate(TemperatureSample::Celsius(-0.001), &b),
            AlarmVerdict::BelowMin {
                temperature: -0.001
            }
        );
        assert_eq!(
            evaluate(TemperatureSample::Celsius(28.001), &b),
            AlarmVerdict::AboveMax {
                temperature: 28.001
            }
        );
    }

    #[test]
    fn test_unreadable_is_sensor_unavailable() {
        let verdict = evaluate(TemperatureSample::Unreadable, &band(0.0, 28.0));
        assert_eq!(verdict, AlarmVerdict::SensorUnavailable);
        assert!(verdict.is_alarm());
        assert_eq!(verdict.sample(), TemperatureSample::Unreadable);
        assert_eq!(verdict.reason(), "Temperature Sensor Unavailable");
    }

    #[test]
    fn test_band_rejects_inverted_and_empty() {
        assert!(AlarmBand::new(28.0, 28.0).is_err());
        assert!(AlarmBand::new(30.0, 28.0).is_err());
        assert!(AlarmBand::new(f64::NAN, 28.0).is_err());
        assert!(AlarmBand::new(0.0, f64::NAN).is_err());
    }

    #[test]
    fn test_set_limits_rejection_keeps_previous_band() {
        let mut evaluator = AlarmEvaluator::new();
        assert_eq!(evaluator.band(), AlarmBand::DEFAULT);

        evaluator.set_limits(0.0, 28.0).unwrap();
        assert_eq!(evaluator.band(), band(0.0, 28.0));

        assert!(evaluator.set_limits(5.0, 5.0).is_err());
        assert_eq!(evaluator.band(), band(0.0, 28.0));

        // Rejecting twice changes nothing either.
        assert!(evaluator.set_limits(40.0, 10.0).is_err());
        assert_eq!(evaluator.band(), band(0.0, 28.0));
    }

    #[test]
    fn test_verdict_display() {
        assert_eq!(
            AlarmVerdict::AboveMax { temperature: 30.5 }.to_string(),
            "Temperature Greater than Maximum (30.5)"
        );
        assert_eq!(
            AlarmVerdict::SensorUnavailable.to_string(),
            "Temperature Sensor Unavailable"
        );
    }

    proptest! {
        #[test]
        fn prop_verdict_matches_comparisons(
            min in -60.0f64..60.0,
            width in 0.001f64..100.0,
            value in -200.0f64..200.0,
        ) {
            let max = min + width;
            let b = band(min, max);
            let verdict = evaluate(TemperatureSample::Celsius(value), &b);

            prop_assert_eq!(matches!(verdict, AlarmVerdict::BelowMin { .. }), value < min);
            prop_assert_eq!(matches!(verdict, AlarmVerdict::AboveMax { .. }), value > max);
            prop_assert_eq!(!verdict.is_alarm(), b.contains(value));
            prop_assert_eq!(verdict.sample(), TemperatureSample::Celsius(value));
        }

        #[test]
        fn prop_bounds_never_alarm(min in -60.0f64..60.0, width in 0.001f64..100.0) {
            let max = min + width;
            let b = band(min, max);
            prop_assert!(!evaluate(TemperatureSample::Celsius(min), &b).is_alarm());
            prop_assert!(!evaluate(TemperatureSample::Celsius(max), &b).is_alarm());
        }

        #[test]
        fn prop_invalid_band_is_rejected(min in -60.0f64..60.0, delta in 0.0f64..50.0) {
            let mut evaluator = AlarmEvaluator::new();
            prop_assert!(evaluator.set_limits(min, min - delta).is_err());
            prop_assert_eq!(evaluator.band(), AlarmBand::DEFAULT);
        }
    }
}
