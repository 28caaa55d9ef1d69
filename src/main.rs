//! smart-alert daemon entry point.
//!
//! Settings are read from `$SMART_ALERT_CONFIG` (default
//! `~/.config/smart-alert/settings.toml`). Log verbosity follows `RUST_LOG`.
//! Stop with SIGINT or SIGTERM; send SIGHUP to reload the alarm thresholds.

use chrono::Local;
use tokio::signal::unix::{signal, SignalKind};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use smart_alert::config::{settings_path, Settings};
use smart_alert::{LogSink, Monitor, Result, SensorReader, SmtpGateway};

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let path = settings_path();
    let settings = match Settings::load(&path) {
        Ok(settings) => settings,
        Err(e) => {
            error!("{}; using defaults", e);
            Settings::default()
        }
    };
    info!("Settings loaded from {}", path.display());

    let log = LogSink::open(settings.log_file(), Local::now());
    let sensor = SensorReader::with_root(&settings.daemon.device_root);
    let gateway = SmtpGateway::new(settings.mail.clone());

    let mut terminate = signal(SignalKind::terminate())?;
    let shutdown = async move {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => info!("Interrupted"),
            _ = terminate.recv() => info!("Terminated"),
        }
    };

    let mut monitor = Monitor::new(settings, sensor, gateway, log).with_settings_path(path);
    monitor.run(shutdown).await
}
