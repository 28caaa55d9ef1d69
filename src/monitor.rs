//! The monitoring daemon.
//!
//! [`Monitor`] owns every piece of state: the sensor, the evaluator, the
//! notification state machine, the scheduler and the event log. Tick handlers
//! take `&mut self` and are driven from one task, so they never overlap.

use chrono::{DateTime, Local};
use std::future::Future;
use std::path::PathBuf;
use tokio::signal::unix::{signal, SignalKind};
use tracing::{debug, info, warn};

use crate::config::Settings;
use crate::data::{AlarmEvaluator, TemperatureSample};
use crate::error::{ConfigError, Result};
use crate::log_sink::LogSink;
use crate::notify::{NotificationGateway, INFO_SUBJECT, STARTED_BODY, STOPPED_BODY};
use crate::scheduler::{ResendTimer, Scheduler, Tick};
use crate::sensor::TemperatureSource;
use crate::state_machine::{AlarmStateMachine, NotificationState};
use crate::utils::hours_since;

/// What woke the run loop.
enum Event {
    Tick(Tick),
    Reload,
    Shutdown,
}

/// Temperature alarm daemon.
pub struct Monitor<S, G> {
    /// Settings in force.
    settings: Settings,
    /// File the settings were loaded from, re-read on reload.
    settings_path: Option<PathBuf>,
    /// Temperature sensor.
    sensor: S,
    /// Whether the sensor was found at startup.
    polling: bool,
    /// Band classification.
    evaluator: AlarmEvaluator,
    /// Notification decisions.
    alarm: AlarmStateMachine,
    /// Notification transport.
    gateway: G,
    /// Status and resend timers.
    scheduler: Scheduler,
    /// Operator event log.
    log: LogSink,
    /// Time of startup, for the elapsed hours in reading lines.
    started_at: DateTime<Local>,
}

impl<S, G> Monitor<S, G>
where
    S: TemperatureSource,
    G: NotificationGateway,
{
    /// Create a monitor. Timers are created immediately, so this must be
    /// called from within a tokio runtime.
    pub fn new(settings: Settings, sensor: S, gateway: G, log: LogSink) -> Self {
        let scheduler = Scheduler::new(
            settings.schedule.status_interval(),
            settings.schedule.resend_interval(),
        );
        let alarm = AlarmStateMachine::new(settings.mail.message.clone());

        Self {
            settings,
            settings_path: None,
            sensor,
            polling: false,
            evaluator: AlarmEvaluator::new(),
            alarm,
            gateway,
            scheduler,
            log,
            started_at: Local::now(),
        }
    }

    /// Re-read settings from `path` on reload requests.
    pub fn with_settings_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.settings_path = Some(path.into());
        self
    }

    /// Settings in force.
    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Band evaluator.
    pub fn evaluator(&self) -> &AlarmEvaluator {
        &self.evaluator
    }

    /// Current notification state.
    pub fn notification_state(&self) -> NotificationState {
        self.alarm.state()
    }

    /// Check if the resend timer is running.
    pub fn is_resend_armed(&self) -> bool {
        self.scheduler.is_resend_armed()
    }

    /// Check if the sensor is polled on status ticks.
    pub fn is_polling(&self) -> bool {
        self.polling
    }

    /// The sensor.
    pub fn sensor(&self) -> &S {
        &self.sensor
    }

    /// The notification gateway.
    pub fn gateway(&self) -> &G {
        &self.gateway
    }

    /// Startup sequence: log settings, detect the sensor, apply the band,
    /// log a first reading and send the start notice.
    pub async fn start(&mut self, now: DateTime<Local>) {
        self.started_at = now;
        self.log_settings();

        if self.sensor.is_connected() {
            self.polling = true;
            self.apply_band();
            let reading = self.sensor.read();
            let sample = TemperatureSample::from(&reading);
            self.log.record_at(now, format!("Temperature: {}, {}", 0.0, sample));
        } else {
            self.polling = false;
            self.log.record_at(now, "No Temperature Sensor Found");
        }

        self.log.record_at(now, "Smart Alert System Started");
        if !self.settings.daemon.debug {
            self.send_info(STARTED_BODY, "Started").await;
        }
    }

    /// Status tick: rotate the log if due, sample the sensor and feed the
    /// verdict to the state machine.
    pub async fn on_status_tick(&mut self, now: DateTime<Local>) {
        if self.log.rotate_if_due(now) {
            info!("Event log rotated");
        }
        if !self.polling {
            return;
        }

        let reading = self.sensor.read();
        if let Err(e) = &reading {
            debug!("Sensor read failed: {}", e);
        }
        let sample = TemperatureSample::from(&reading);
        self.log.record_at(
            now,
            format!("Temperature: {}, {}", hours_since(&self.started_at, &now), sample),
        );

        let verdict = self.evaluator.evaluate(sample);
        let timer = self
            .alarm
            .on_status_tick(verdict, &self.gateway, &mut self.log)
            .await;
        self.scheduler.apply(timer);
    }

    /// Resend tick: repeat or clear the alarm notification.
    pub async fn on_resend_tick(&mut self) {
        let timer = self
            .alarm
            .on_resend_tick(&self.gateway, &mut self.log)
            .await;
        self.scheduler.apply(timer);
    }

    /// Apply reloaded settings.
    ///
    /// Only the alarm band is taken over; an invalid band is rejected and the
    /// previous settings are kept.
    pub fn reload(&mut self, settings: Settings) {
        let alarm = settings.alarm;
        match self.evaluator.set_limits(alarm.min_temperature, alarm.threshold) {
            Ok(()) => {
                self.settings.alarm = alarm;
                self.log_settings();
            }
            Err(e) => self.log_rejected_band(&e),
        }
    }

    /// Shutdown sequence: stop the timers, send the stop notice and flush
    /// the log.
    pub async fn shutdown(&mut self) {
        self.log.record("Switching Off the Program");
        self.scheduler.apply(ResendTimer::Disarm);

        if !self.settings.daemon.debug {
            self.send_info(STOPPED_BODY, "Switched Off").await;
        }
        self.log.flush();
    }

    /// Run until `shutdown` resolves.
    ///
    /// Reload requests (SIGHUP) re-read the settings file given through
    /// [`with_settings_path`](Self::with_settings_path).
    ///
    /// # Errors
    ///
    /// Returns an error if the reload signal handler cannot be installed.
    pub async fn run<F>(&mut self, shutdown: F) -> Result<()>
    where
        F: Future<Output = ()>,
    {
        let mut hangup = signal(SignalKind::hangup())?;
        tokio::pin!(shutdown);

        self.start(Local::now()).await;

        loop {
            let event = tokio::select! {
                tick = self.scheduler.next_tick() => Event::Tick(tick),
                _ = hangup.recv() => Event::Reload,
                _ = &mut shutdown => Event::Shutdown,
            };

            match event {
                Event::Tick(Tick::Status) => self.on_status_tick(Local::now()).await,
                Event::Tick(Tick::Resend) => self.on_resend_tick().await,
                Event::Reload => self.reload_from_file(),
                Event::Shutdown => break,
            }
        }

        self.shutdown().await;
        Ok(())
    }

    fn reload_from_file(&mut self) {
        let Some(path) = self.settings_path.clone() else {
            debug!("Reload requested without a settings file");
            return;
        };
        match Settings::load(&path) {
            Ok(settings) => self.reload(settings),
            Err(e) => {
                warn!("Settings reload failed: {}", e);
                self.log.record(format!("Settings not reloaded: {}", e));
            }
        }
    }

    fn apply_band(&mut self) {
        let alarm = &self.settings.alarm;
        if let Err(e) = self.evaluator.set_limits(alarm.min_temperature, alarm.threshold) {
            self.log_rejected_band(&e);
        }
    }

    fn log_rejected_band(&mut self, error: &ConfigError) {
        let band = self.evaluator.band();
        self.log.record(format!("{} (keeping {})", error, band));
    }

    fn log_settings(&mut self) {
        for line in self.settings.summary() {
            self.log.record(line);
        }
    }

    async fn send_info(&mut self, body: &str, label: &str) {
        match self.gateway.send(INFO_SUBJECT, body).await {
            Ok(()) => self.log.record(format!("{}: Message Sent", label)),
            Err(e) => {
                warn!("Info notification failed: {}", e);
                self.log.record(format!("{}: Unable to Send the Message ({})", label, e));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{NotificationError, SensorError};
    use crate::notify::{MockNotificationGateway, ALARM_SUBJECT, CEASED_BODY, CEASED_SUBJECT};
    use async_trait::async_trait;
    use mockall::predicate::{always, eq};
    use parking_lot::Mutex;
    use pretty_assertions::assert_eq;
    use std::collections::VecDeque;
    use std::sync::Arc;
    use std::time::Duration;
    use tokio::time::sleep;

    /// Sensor returning a scripted sequence of readings; the last one repeats.
    struct ScriptedSensor {
        connected: bool,
        readings: Mutex<VecDeque<f64>>,
    }

    impl ScriptedSensor {
        fn new(readings: Vec<f64>) -> Self {
            Self {
                connected: true,
                readings: Mutex::new(readings.into()),
            }
        }

        fn absent() -> Self {
            Self {
                connected: false,
                readings: Mutex::new(VecDeque::new()),
            }
        }
    }

    impl TemperatureSource for ScriptedSensor {
        fn is_connected(&self) -> bool {
            self.connected
        }

        fn read(&self) -> std::result::Result<f64, SensorError> {
            let mut readings = self.readings.lock();
            let next = if readings.len() > 1 {
                readings.pop_front()
            } else {
                readings.front().copied()
            };
            next.ok_or(SensorError::InvalidReading)
        }
    }

    /// Gateway keeping every (subject, body) it was asked to send.
    #[derive(Clone, Default)]
    struct RecordingGateway {
        sent: Arc<Mutex<Vec<(String, String)>>>,
    }

    impl RecordingGateway {
        fn sent(&self) -> Vec<(String, String)> {
            self.sent.lock().clone()
        }
    }

    #[async_trait]
    impl NotificationGateway for RecordingGateway {
        async fn send(
            &self,
            subject: &str,
            body: &str,
        ) -> std::result::Result<(), NotificationError> {
            self.sent.lock().push((subject.to_string(), body.to_string()));
            Ok(())
        }
    }

    fn fast_settings(debug: bool) -> Settings {
        let mut settings = settings(debug);
        settings.schedule.status_interval_secs = 60;
        settings.schedule.resend_interval_secs = 1000;
        settings
    }

    fn settings(debug: bool) -> Settings {
        let mut settings = Settings::default();
        settings.mail.message = "Too hot".to_string();
        settings.daemon.debug = debug;
        settings
    }

    #[tokio::test]
    async fn test_start_applies_band_and_sends_notice() {
        let mut gateway = MockNotificationGateway::new();
        gateway
            .expect_send()
            .with(eq(INFO_SUBJECT), eq(STARTED_BODY))
            .times(1)
            .returning(|_, _| Ok(()));

        let sensor = ScriptedSensor::new(vec![21.0]);
        let mut monitor = Monitor::new(settings(false), sensor, gateway, LogSink::detached());
        monitor.start(Local::now()).await;

        assert!(monitor.is_polling());
        assert_eq!(monitor.evaluator().band().min(), 0.0);
        assert_eq!(monitor.evaluator().band().max(), 28.0);
    }

    #[tokio::test]
    async fn test_debug_mode_skips_notices() {
        let gateway = MockNotificationGateway::new();
        let sensor = ScriptedSensor::new(vec![21.0]);
        let mut monitor = Monitor::new(settings(true), sensor, gateway, LogSink::detached());

        monitor.start(Local::now()).await;
        monitor.shutdown().await;
    }

    #[tokio::test]
    async fn test_absent_sensor_is_never_polled() {
        let gateway = MockNotificationGateway::new();
        let mut monitor =
            Monitor::new(settings(true), ScriptedSensor::absent(), gateway, LogSink::detached());

        monitor.start(Local::now()).await;
        assert!(!monitor.is_polling());

        // The mock has no expectations: any send would panic.
        for _ in 0..3 {
            monitor.on_status_tick(Local::now()).await;
        }
        assert_eq!(monitor.notification_state(), NotificationState::Idle);
        assert!(!monitor.is_resend_armed());
    }

    #[tokio::test]
    async fn test_alarm_arms_and_clear_disarms_resend() {
        let mut gateway = MockNotificationGateway::new();
        gateway
            .expect_send()
            .with(eq(ALARM_SUBJECT), always())
            .times(1)
            .returning(|_, _| Ok(()));
        gateway
            .expect_send()
            .with(eq(crate::notify::CEASED_SUBJECT), always())
            .times(1)
            .returning(|_, _| Ok(()));

        let sensor = ScriptedSensor::new(vec![21.0, 30.0, 22.0]);
        let mut monitor = Monitor::new(settings(true), sensor, gateway, LogSink::detached());
        monitor.start(Local::now()).await;

        monitor.on_status_tick(Local::now()).await;
        assert!(monitor.is_resend_armed());
        assert_eq!(monitor.notification_state(), NotificationState::Alerted);

        monitor.on_status_tick(Local::now()).await;
        assert!(monitor.is_resend_armed());

        monitor.on_resend_tick().await;
        assert!(!monitor.is_resend_armed());
        assert_eq!(monitor.notification_state(), NotificationState::Idle);
    }

    #[tokio::test]
    async fn test_failed_start_notice_is_not_fatal() {
        let mut gateway = MockNotificationGateway::new();
        gateway
            .expect_send()
            .times(1)
            .returning(|_, _| Err(NotificationError::Envelope("no recipients".to_string())));

        let sensor = ScriptedSensor::new(vec![21.0]);
        let mut monitor = Monitor::new(settings(false), sensor, gateway, LogSink::detached());
        monitor.start(Local::now()).await;
        assert!(monitor.is_polling());
    }

    #[tokio::test]
    async fn test_reload_rejects_invalid_band() {
        let gateway = MockNotificationGateway::new();
        let sensor = ScriptedSensor::new(vec![21.0]);
        let mut monitor = Monitor::new(settings(true), sensor, gateway, LogSink::detached());
        monitor.start(Local::now()).await;

        let mut reloaded = settings(true);
        reloaded.alarm.threshold = 25.0;
        monitor.reload(reloaded.clone());
        assert_eq!(monitor.evaluator().band().max(), 25.0);

        reloaded.alarm.threshold = -5.0;
        monitor.reload(reloaded);
        assert_eq!(monitor.evaluator().band().max(), 25.0);
        assert_eq!(monitor.settings().alarm.threshold, 25.0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_run_delivers_ticks_until_shutdown() {
        let gateway = RecordingGateway::default();
        // Startup reading, then one per status tick every 60 s.
        let sensor = ScriptedSensor::new(vec![25.0, 25.0, 30.0, 31.0, 27.0, 25.0]);
        let mut monitor = Monitor::new(
            fast_settings(false),
            sensor,
            gateway.clone(),
            LogSink::detached(),
        );

        monitor.run(sleep(Duration::from_secs(1530))).await.unwrap();

        // Alarm at 120 s, ceased on the resend tick at 1120 s, stop notice at 1530 s.
        assert_eq!(
            gateway.sent(),
            vec![
                (INFO_SUBJECT.to_string(), STARTED_BODY.to_string()),
                (
                    ALARM_SUBJECT.to_string(),
                    "Too hot\nTemperature Greater than Maximum (30)".to_string()
                ),
                (CEASED_SUBJECT.to_string(), CEASED_BODY.to_string()),
                (INFO_SUBJECT.to_string(), STOPPED_BODY.to_string()),
            ]
        );
        assert_eq!(monitor.notification_state(), NotificationState::Idle);
        assert!(!monitor.is_resend_armed());
    }

    #[tokio::test(start_paused = true)]
    async fn test_run_resends_while_alarm_persists() {
        let gateway = RecordingGateway::default();
        let sensor = ScriptedSensor::new(vec![25.0, 35.0]);
        let mut monitor = Monitor::new(
            fast_settings(true),
            sensor,
            gateway.clone(),
            LogSink::detached(),
        );

        // First alert at 60 s, resends at 1060 s and 2060 s.
        monitor.run(sleep(Duration::from_secs(2090))).await.unwrap();

        let subjects: Vec<String> = gateway.sent().into_iter().map(|(s, _)| s).collect();
        assert_eq!(subjects, vec![ALARM_SUBJECT.to_string(); 3]);
        assert_eq!(monitor.notification_state(), NotificationState::Alerted);
        assert!(monitor.is_resend_armed());
    }

    #[tokio::test(start_paused = true)]
    async fn test_run_reloads_band_on_hangup() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("settings.toml");
        std::fs::write(&path, "[alarm]\nmin_temperature = 0.0\nthreshold = 25.0\n").unwrap();

        let gateway = RecordingGateway::default();
        let sensor = ScriptedSensor::new(vec![27.0]);
        let mut monitor = Monitor::new(
            fast_settings(true),
            sensor,
            gateway.clone(),
            LogSink::detached(),
        )
        .with_settings_path(&path);

        let shutdown = async {
            sleep(Duration::from_secs(90)).await;
            // Safety: the run loop has installed its SIGHUP handler by now.
            unsafe { libc::raise(libc::SIGHUP) };
            sleep(Duration::from_secs(100)).await;
        };
        monitor.run(shutdown).await.unwrap();

        // 27 is fine against 28 at 60 s, but alarms against 25 at 120 s.
        let subjects: Vec<String> = gateway.sent().into_iter().map(|(s, _)| s).collect();
        assert_eq!(subjects, vec![ALARM_SUBJECT.to_string()]);
        assert_eq!(monitor.evaluator().band().max(), 25.0);
        assert_eq!(monitor.settings().alarm.threshold, 25.0);
    }
}
