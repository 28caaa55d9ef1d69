//! Daemon settings loaded from a TOML file.
//!
//! # TOML Format
//! ```toml
//! [mail]
//! username = "alerts"
//! password = "secret"
//! server = "smtp.example.com:465"
//! to = "operator@example.com"
//! cc = ["backup@example.com"]
//! message = "Temperature out of range in the server room"
//!
//! [alarm]
//! min_temperature = 0.0
//! threshold = 28.0
//!
//! [schedule]
//! status_interval_secs = 60
//! resend_interval_secs = 1800
//!
//! [daemon]
//! device_root = "/sys/bus/w1/devices"
//! log_file = "/home/pi/smartAlertLog.txt"
//! debug = false
//! ```
//!
//! Every field has a default, so a missing file or section is not an error.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{info, warn};

use crate::error::ConfigError;
use crate::sensor::DEFAULT_DEVICE_ROOT;

/// Environment variable naming the settings file.
pub const CONFIG_ENV: &str = "SMART_ALERT_CONFIG";

/// Log file name used when `daemon.log_file` is not set.
pub const DEFAULT_LOG_FILE_NAME: &str = "smartAlertLog.txt";

/// Default upper alarm threshold in degrees Celsius.
pub const DEFAULT_THRESHOLD: f64 = 28.0;

/// Mail transport settings and message recipients.
#[derive(Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MailSettings {
    /// SMTP login; also the local part of the sender address.
    pub username: String,
    /// SMTP password.
    pub password: String,
    /// SMTPS server, `host` or `host:port`.
    pub server: String,
    /// Primary recipient.
    pub to: String,
    /// Carbon-copy recipients.
    pub cc: Vec<String>,
    /// Text of the alarm e-mail.
    pub message: String,
}

impl MailSettings {
    /// Server host without the port.
    pub fn host(&self) -> &str {
        self.server
            .rsplit_once(':')
            .map(|(host, _)| host)
            .unwrap_or(self.server.as_str())
    }

    /// Explicit port, if the server was given as `host:port`.
    pub fn port(&self) -> Option<u16> {
        self.server
            .rsplit_once(':')
            .and_then(|(_, port)| port.parse().ok())
    }

    /// Sender address, `<username>@<host>`.
    pub fn sender(&self) -> String {
        format!("{}@{}", self.username, self.host())
    }
}

// The password must never end up in a log line.
impl fmt::Debug for MailSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MailSettings")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .field("server", &self.server)
            .field("to", &self.to)
            .field("cc", &self.cc)
            .field("message", &self.message)
            .finish()
    }
}

/// Alarm thresholds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AlarmSettings {
    /// Lower bound of the acceptable band.
    pub min_temperature: f64,
    /// Upper bound of the acceptable band.
    pub threshold: f64,
}

impl Default for AlarmSettings {
    fn default() -> Self {
        Self {
            min_temperature: 0.0,
            threshold: DEFAULT_THRESHOLD,
        }
    }
}

/// Timer periods.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScheduleSettings {
    /// Seconds between status ticks.
    pub status_interval_secs: u64,
    /// Seconds between alarm resends while alarmed.
    pub resend_interval_secs: u64,
}

impl ScheduleSettings {
    /// Status tick period.
    pub fn status_interval(&self) -> Duration {
        Duration::from_secs(self.status_interval_secs)
    }

    /// Resend tick period.
    pub fn resend_interval(&self) -> Duration {
        Duration::from_secs(self.resend_interval_secs)
    }
}

impl Default for ScheduleSettings {
    fn default() -> Self {
        Self {
            status_interval_secs: 60,
            resend_interval_secs: 30 * 60,
        }
    }
}

/// Process-level settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DaemonSettings {
    /// Directory scanned for one-wire devices.
    pub device_root: PathBuf,
    /// Event log path; defaults to `$HOME/smartAlertLog.txt`.
    pub log_file: Option<PathBuf>,
    /// Skip the start and stop notices.
    pub debug: bool,
}

impl Default for DaemonSettings {
    fn default() -> Self {
        Self {
            device_root: PathBuf::from(DEFAULT_DEVICE_ROOT),
            log_file: None,
            debug: false,
        }
    }
}

/// Complete daemon configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Mail settings.
    pub mail: MailSettings,
    /// Alarm thresholds.
    pub alarm: AlarmSettings,
    /// Timer periods.
    pub schedule: ScheduleSettings,
    /// Process settings.
    pub daemon: DaemonSettings,
}

impl Settings {
    /// Load settings from a TOML file.
    ///
    /// A missing file yields the defaults.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        match std::fs::read_to_string(path) {
            Ok(content) => Self::from_toml(&content),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                warn!("Settings file {} not found, using defaults", path.display());
                Ok(Self::default())
            }
            Err(source) => Err(ConfigError::Read {
                path: path.to_path_buf(),
                source,
            }),
        }
    }

    /// Parse and validate settings from a TOML string.
    pub fn from_toml(toml_str: &str) -> Result<Self, ConfigError> {
        let settings: Self = toml::from_str(toml_str)?;
        settings.validate()?;
        Ok(settings)
    }

    /// Reject zero timer periods.
    ///
    /// The alarm band is validated when applied, so that an invalid band
    /// keeps the previous one instead of failing the whole load.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.schedule.status_interval_secs == 0 {
            return Err(ConfigError::InvalidInterval {
                name: "schedule.status_interval_secs",
            });
        }
        if self.schedule.resend_interval_secs == 0 {
            return Err(ConfigError::InvalidInterval {
                name: "schedule.resend_interval_secs",
            });
        }
        Ok(())
    }

    /// Resolve the event log path.
    pub fn log_file(&self) -> PathBuf {
        self.daemon
            .log_file
            .clone()
            .unwrap_or_else(|| home_dir().join(DEFAULT_LOG_FILE_NAME))
    }

    /// Lines logged whenever settings are (re)loaded.
    pub fn summary(&self) -> Vec<String> {
        let mut lines = vec![
            "Settings Changed. New Values Are:".to_string(),
            format!("Username: {}", self.mail.username),
            format!("Mail Server: {}", self.mail.server),
            format!("To: {}", self.mail.to),
        ];
        if !self.mail.cc.is_empty() {
            lines.push(format!("Cc: {}", self.mail.cc.join(", ")));
        }
        lines.push(format!("Threshold: {}", self.alarm.threshold));
        lines
    }
}

/// Settings file path from [`CONFIG_ENV`], or
/// `$HOME/.config/smart-alert/settings.toml`.
pub fn settings_path() -> PathBuf {
    match std::env::var_os(CONFIG_ENV) {
        Some(path) => PathBuf::from(path),
        None => home_dir()
            .join(".config")
            .join("smart-alert")
            .join("settings.toml"),
    }
}

fn home_dir() -> PathBuf {
    std::env::var_os("HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|| {
            info!("HOME is not set, using the working directory");
            PathBuf::from(".")
        })
}
