//! Temperature sample produced once per status tick.

use std::fmt;

use crate::error::SensorError;

/// A single temperature acquisition.
///
/// Either a value in degrees Celsius or a marker that the sensor could not be
/// read on this tick. Samples are never persisted; a fresh one is taken on
/// every status tick.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum TemperatureSample {
    /// A valid reading in degrees Celsius.
    Celsius(f64),
    /// The sensor was missing, reported an invalid conversion or the data
    /// line could not be parsed.
    #[default]
    Unreadable,
}

impl TemperatureSample {
    /// Get the reading, or `None` if the sample is unreadable.
    pub fn celsius(&self) -> Option<f64> {
        match self {
            Self::Celsius(value) => Some(*value),
            Self::Unreadable => None,
        }
    }

    /// Check if this sample carries a reading.
    pub fn is_readable(&self) -> bool {
        matches!(self, Self::Celsius(_))
    }
}

impl From<f64> for TemperatureSample {
    fn from(value: f64) -> Self {
        Self::Celsius(value)
    }
}

impl From<&Result<f64, SensorError>> for TemperatureSample {
    fn from(result: &Result<f64, SensorError>) -> Self {
        match result {
            Ok(value) => Self::Celsius(*value),
            Err(_) => Self::Unreadable,
        }
    }
}

impl fmt::Display for TemperatureSample {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Celsius(value) => write!(f, "{value}"),
            Self::Unreadable => write!(f, "unreadable"),
        }
    }
}
