//! # smart-alert
//!
//! A temperature alarm daemon for DS18S20/DS18B20 one-wire sensors, typically
//! on a Raspberry Pi. It samples the sensor periodically, compares the reading
//! against a configured band and e-mails an operator when the temperature is
//! out of range, repeating the alarm while it lasts and announcing when it
//! has ceased.
//!
//! ## Features
//!
//! - **Sensor Discovery**: Finds the first `10-*`/`28-*` device reporting a valid conversion
//! - **Band Alarms**: Strict below-minimum / above-maximum classification
//! - **Notification Policy**: First alert on the status tick, resend and "ceased" on the resend tick
//! - **SMTPS Delivery**: Raw RFC 5322 messages through `lettre`
//! - **Event Log**: Timestamped operator log with weekly rotation and a syslog fallback
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use smart_alert::{LogSink, Monitor, SensorReader, Settings, SmtpGateway};
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> smart_alert::Result<()> {
//!     let settings = Settings::load(std::path::Path::new("settings.toml"))?;
//!     let log = LogSink::open(settings.log_file(), chrono::Local::now());
//!     let sensor = SensorReader::with_root(&settings.daemon.device_root);
//!     let gateway = SmtpGateway::new(settings.mail.clone());
//!
//!     let mut monitor = Monitor::new(settings, sensor, gateway, log);
//!     monitor
//!         .run(async {
//!             let _ = tokio::signal::ctrl_c().await;
//!         })
//!         .await
//! }
//! ```
//!
//! ## Platform Notes
//!
//! Requires Linux with the `w1-gpio` and `w1-therm` kernel modules loaded
//! (`dtoverlay=w1-gpio` on a Raspberry Pi). Settings reload listens for
//! SIGHUP, so the daemon is Unix-only.

// Public modules
pub mod config;
pub mod data;
pub mod error;
pub mod log_sink;
pub mod monitor;
pub mod notify;
pub mod scheduler;
pub mod sensor;
pub mod state_machine;
pub mod system_log;
pub mod utils;

// Re-exports for convenience
pub use config::Settings;
pub use error::{Error, Result};
pub use log_sink::LogSink;
pub use monitor::Monitor;
pub use notify::{NotificationGateway, SmtpGateway};
pub use scheduler::{ResendTimer, Scheduler, Tick};
pub use sensor::{SensorReader, TemperatureSource};
pub use state_machine::{AlarmStateMachine, NotificationState};
pub use system_log::{Syslog, SystemLog};
pub use utils::millidegrees_to_celsius;

// Re-export commonly used types from submodules
pub use data::{evaluate, AlarmBand, AlarmEvaluator, AlarmVerdict, TemperatureSample};
pub use error::{ConfigError, LogError, NotificationError, SensorError};
