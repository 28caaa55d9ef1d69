//! Error types for the smart-alert crate.
//!
//! Every failure in the daemon is recoverable: sensor errors become a
//! `SensorUnavailable` verdict, notification errors are logged and retried on
//! the next tick, configuration errors keep the previous values and log errors
//! fall back to the process logger.

use std::path::PathBuf;
use thiserror::Error;

/// Failure to obtain a reading from the one-wire sensor.
#[derive(Error, Debug)]
pub enum SensorError {
    /// No device under the device root matched a known family code, or no
    /// device has been detected yet.
    #[error("no temperature sensor found under {root}")]
    DeviceNotFound {
        /// The directory that was scanned.
        root: PathBuf,
    },

    /// The device data channel could not be read.
    #[error("unable to read {path}: {source}")]
    Unreadable {
        /// Path of the `w1_slave` file.
        path: PathBuf,
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// The first line of the data channel did not end with `YES`.
    #[error("sensor reported an invalid conversion")]
    InvalidReading,

    /// The `t=` token was not present after the validity marker.
    #[error("temperature token not found")]
    MissingTemperature,

    /// The `t=` token was present but was not a signed integer.
    #[error("malformed temperature token: {token:?}")]
    MalformedTemperature {
        /// The text following `t=`.
        token: String,
    },
}

/// Failure to deliver a notification e-mail.
#[derive(Error, Debug)]
pub enum NotificationError {
    /// A sender or recipient address could not be parsed.
    #[error("invalid e-mail address {address:?}: {source}")]
    Address {
        /// The offending address text.
        address: String,
        /// The parser error.
        #[source]
        source: lettre::address::AddressError,
    },

    /// The SMTP envelope could not be assembled (e.g. no recipients).
    #[error("invalid envelope: {0}")]
    Envelope(String),

    /// SMTP transport-level failure (TLS, authentication, connection, ...).
    #[error("SMTP transport error: {0}")]
    Transport(#[from] lettre::transport::smtp::Error),
}

/// Rejected configuration.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// The alarm band is empty or inverted.
    #[error("invalid alarm band: min {min} must be lower than max {max}")]
    InvalidBand {
        /// Requested lower bound.
        min: f64,
        /// Requested upper bound.
        max: f64,
    },

    /// A timer interval was zero.
    #[error("invalid interval: {name} must be greater than zero")]
    InvalidInterval {
        /// Name of the setting.
        name: &'static str,
    },

    /// The settings file exists but could not be read.
    #[error("cannot read settings {path}: {source}")]
    Read {
        /// Settings file path.
        path: PathBuf,
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// The settings file is not valid TOML for [`Settings`](crate::config::Settings).
    #[error("settings parse error: {0}")]
    Parse(#[from] toml::de::Error),
}

/// Failure of the operator event log.
#[derive(Error, Debug)]
pub enum LogError {
    /// The log file could not be opened for writing.
    #[error("unable to open log file {path}: {source}")]
    Open {
        /// Log file path.
        path: PathBuf,
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// A log generation could not be renamed during rotation.
    #[error("unable to rotate {from} to {to}: {source}")]
    Rotate {
        /// Source path.
        from: PathBuf,
        /// Destination path.
        to: PathBuf,
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },
}

/// The main error type for this crate.
#[derive(Error, Debug)]
pub enum Error {
    /// Sensor acquisition error.
    #[error("Sensor error: {0}")]
    Sensor(#[from] SensorError),

    /// Notification delivery error.
    #[error("Notification error: {0}")]
    Notification(#[from] NotificationError),

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Event log error.
    #[error("Log error: {0}")]
    Log(#[from] LogError),

    /// Process-level I/O error (signal registration and the like).
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// A specialized Result type for this crate.
pub type Result<T> = std::result::Result<T, Error>;
