//! DS18x20 one-wire thermometer exposed through sysfs.
//!
//! The kernel `w1-therm` driver creates one directory per device under
//! `/sys/bus/w1/devices`, named `<family>-<serial>`. Only the DS18S20 (`10`)
//! and DS18B20 (`28`) families are recognised.

use parking_lot::RwLock;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info, trace};

use crate::error::SensorError;
use crate::sensor::parse::{has_valid_marker, parse_celsius};
use crate::sensor::TemperatureSource;

/// Default sysfs directory of the one-wire bus.
pub const DEFAULT_DEVICE_ROOT: &str = "/sys/bus/w1/devices";

/// Directory name prefixes of the supported device families.
pub const FAMILY_PREFIXES: [&str; 2] = ["10-", "28-"];

/// Name of the data channel inside a device directory.
pub const DATA_CHANNEL: &str = "w1_slave";

/// Reader for a single one-wire temperature sensor.
///
/// [`is_connected`](Self::is_connected) scans the device root and caches the
/// data channel of the first device reporting a valid conversion;
/// [`read`](Self::read) then samples that cached device.
pub struct SensorReader {
    /// Directory scanned for devices.
    root: PathBuf,
    /// Data channel of the detected device.
    device: RwLock<Option<PathBuf>>,
}

impl SensorReader {
    /// Create a reader over the default sysfs device root.
    pub fn new() -> Self {
        Self::with_root(DEFAULT_DEVICE_ROOT)
    }

    /// Create a reader over a specific device root.
    pub fn with_root(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            device: RwLock::new(None),
        }
    }

    /// The directory scanned for devices.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Data channel of the detected device, if any.
    pub fn device_path(&self) -> Option<PathBuf> {
        self.device.read().clone()
    }

    /// Scan the device root for a supported sensor reporting a valid reading.
    ///
    /// Candidates are visited in name order. On success the data channel is
    /// cached and returned.
    ///
    /// # Errors
    ///
    /// Returns [`SensorError::DeviceNotFound`] if the root is missing or no
    /// candidate reports `YES`.
    pub fn detect(&self) -> Result<PathBuf, SensorError> {
        let not_found = || SensorError::DeviceNotFound {
            root: self.root.clone(),
        };

        let entries = fs::read_dir(&self.root).map_err(|e| {
            debug!("Cannot list {}: {}", self.root.display(), e);
            not_found()
        })?;

        let mut candidates: Vec<PathBuf> = entries
            .filter_map(|entry| entry.ok())
            .filter(|entry| {
                let name = entry.file_name();
                let name = name.to_string_lossy();
                FAMILY_PREFIXES.iter().any(|prefix| name.starts_with(prefix))
            })
            .map(|entry| entry.path())
            .filter(|path| path.is_dir())
            .collect();
        candidates.sort();

        for dir in candidates {
            let channel = dir.join(DATA_CHANNEL);
            match fs::read_to_string(&channel) {
                Ok(blob) if has_valid_marker(&blob) => {
                    info!("Temperature sensor found at {}", channel.display());
                    *self.device.write() = Some(channel.clone());
                    return Ok(channel);
                }
                Ok(_) => debug!("{} reports no valid conversion", channel.display()),
                Err(e) => debug!("Cannot read {}: {}", channel.display(), e),
            }
        }

        Err(not_found())
    }

    /// Check whether a supported sensor is attached and reporting.
    pub fn is_connected(&self) -> bool {
        self.detect().is_ok()
    }

    /// Sample the detected sensor.
    ///
    /// The validity marker is checked again on every read since a blob
    /// sampled mid-conversion can report `NO`.
    pub fn read(&self) -> Result<f64, SensorError> {
        let channel = self.device_path().ok_or_else(|| SensorError::DeviceNotFound {
            root: self.root.clone(),
        })?;

        let blob = fs::read_to_string(&channel).map_err(|source| SensorError::Unreadable {
            path: channel.clone(),
            source,
        })?;

        let celsius = parse_celsius(&blob)?;
        trace!("Read {} °C from {}", celsius, channel.display());
        Ok(celsius)
    }
}

impl Default for SensorReader {
    fn default() -> Self {
        Self::new()
    }
}

impl TemperatureSource for SensorReader {
    fn is_connected(&self) -> bool {
        SensorReader::is_connected(self)
    }

    fn read(&self) -> Result<f64, SensorError> {
        SensorReader::read(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const VALID: &str = "72 01 4b 46 7f ff 0e 10 57 : crc=57 YES\n\
                         72 01 4b 46 7f ff 0e 10 57 t=23625\n";
    const INVALID: &str = "72 01 4b 46 7f ff 0e 10 57 : crc=00 NO\n\
                           72 01 4b 46 7f ff 0e 10 57 t=23625\n";

    fn add_device(root: &Path, name: &str, blob: &str) -> PathBuf {
        let dir = root.join(name);
        fs::create_dir_all(&dir).unwrap();
        let channel = dir.join(DATA_CHANNEL);
        fs::write(&channel, blob).unwrap();
        channel
    }

    #[test]
    fn test_missing_root_is_not_connected() {
        let tmp = TempDir::new().unwrap();
        let reader = SensorReader::with_root(tmp.path().join("absent"));
        assert!(!reader.is_connected());
        assert!(reader.device_path().is_none());
    }

    #[test]
    fn test_detects_ds18b20() {
        let tmp = TempDir::new().unwrap();
        let channel = add_device(tmp.path(), "28-0316a2795bff", VALID);

        let reader = SensorReader::with_root(tmp.path());
        assert!(reader.is_connected());
        assert_eq!(reader.device_path(), Some(channel));
        assert!((reader.read().unwrap() - 23.625).abs() < 1e-9);
    }

    #[test]
    fn test_ignores_other_families() {
        let tmp = TempDir::new().unwrap();
        add_device(tmp.path(), "w1_bus_master1", VALID);
        add_device(tmp.path(), "3b-000000abcdef", VALID);

        let reader = SensorReader::with_root(tmp.path());
        assert!(!reader.is_connected());
    }

    #[test]
    fn test_skips_device_reporting_no() {
        let tmp = TempDir::new().unwrap();
        add_device(tmp.path(), "10-000802b4ba2a", INVALID);
        let good = add_device(tmp.path(), "28-0316a2795bff", VALID);

        let reader = SensorReader::with_root(tmp.path());
        assert_eq!(reader.detect().unwrap(), good);
    }

    #[test]
    fn test_read_before_detect_fails() {
        let tmp = TempDir::new().unwrap();
        add_device(tmp.path(), "28-0316a2795bff", VALID);

        let reader = SensorReader::with_root(tmp.path());
        assert!(matches!(
            reader.read(),
            Err(SensorError::DeviceNotFound { .. })
        ));
    }

    #[test]
    fn test_read_revalidates_marker() {
        let tmp = TempDir::new().unwrap();
        let channel = add_device(tmp.path(), "28-0316a2795bff", VALID);

        let reader = SensorReader::with_root(tmp.path());
        assert!(reader.is_connected());

        fs::write(&channel, INVALID).unwrap();
        assert!(matches!(reader.read(), Err(SensorError::InvalidReading)));

        // Recovers silently once the device reports a valid conversion again.
        fs::write(&channel, VALID).unwrap();
        assert!(reader.read().is_ok());
    }

    #[test]
    fn test_read_unplugged_device() {
        let tmp = TempDir::new().unwrap();
        let channel = add_device(tmp.path(), "28-0316a2795bff", VALID);

        let reader = SensorReader::with_root(tmp.path());
        assert!(reader.is_connected());

        fs::remove_file(&channel).unwrap();
        assert!(matches!(
            reader.read(),
            Err(SensorError::Unreadable { .. })
        ));
    }
}
