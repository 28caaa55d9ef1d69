//! Parser for the kernel `w1_slave` text blob.
//!
//! The w1-therm driver exposes two lines per conversion:
//!
//! ```text
//! 72 01 4b 46 7f ff 0e 10 57 : crc=57 YES
//! 72 01 4b 46 7f ff 0e 10 57 t=23125
//! ```
//!
//! The first line ends with `YES` when the CRC of the scratchpad matched and
//! `NO` otherwise; a blob sampled mid-conversion can report `NO`. The second
//! line carries the temperature as `t=<millidegrees>`.

use crate::error::SensorError;
use crate::utils::millidegrees_to_celsius;

/// Marker ending the first line of a valid conversion.
pub const VALID_MARKER: &str = "YES";

/// Key preceding the millidegree value.
pub const TEMPERATURE_KEY: &str = "t=";

/// Check whether the first line of `blob` carries the validity marker.
pub fn has_valid_marker(blob: &str) -> bool {
    blob.lines()
        .next()
        .map(|line| line.trim_end().ends_with(VALID_MARKER))
        .unwrap_or(false)
}

/// Extract the millidegree reading from a `w1_slave` blob.
///
/// The `t=` token is only searched for after the validity marker, so a blob
/// reporting `NO` is rejected even if it contains a stale reading.
pub fn parse_millidegrees(blob: &str) -> Result<i64, SensorError> {
    let first_line = blob.lines().next().unwrap_or_default();
    if !first_line.trim_end().ends_with(VALID_MARKER) {
        return Err(SensorError::InvalidReading);
    }

    let after_marker = &blob[first_line.len()..];
    let start = after_marker
        .find(TEMPERATURE_KEY)
        .ok_or(SensorError::MissingTemperature)?
        + TEMPERATURE_KEY.len();
    let rest = &after_marker[start..];

    let token: String = rest
        .chars()
        .enumerate()
        .take_while(|(i, c)| c.is_ascii_digit() || (*i == 0 && (*c == '-' || *c == '+')))
        .map(|(_, c)| c)
        .collect();

    token
        .parse::<i64>()
        .map_err(|_| SensorError::MalformedTemperature {
            token: rest.lines().next().unwrap_or_default().trim().to_string(),
        })
}

/// Parse a `w1_slave` blob into degrees Celsius.
///
/// # Example
///
/// ```
/// use smart_alert::sensor::parse::parse_celsius;
///
/// let blob = "72 01 4b 46 7f ff 0e 10 57 : crc=57 YES\n\
///             72 01 4b 46 7f ff 0e 10 57 t=23625\n";
/// assert!((parse_celsius(blob).unwrap() - 23.625).abs() < 1e-9);
/// ```
pub fn parse_celsius(blob: &str) -> Result<f64, SensorError> {
    parse_millidegrees(blob).map(millidegrees_to_celsius)
}
