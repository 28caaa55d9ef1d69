//! Alarm notification state machine.
//!
//! The alarm flag is recomputed on every status tick, but an alarm is only
//! declared over on a resend tick. Status ticks send the first alert; resend
//! ticks repeat it while the condition persists and send the "ceased" notice
//! once it is gone. At most one notification is attempted per tick.
//!
//! ```text
//!            alarm, send ok                    resend tick, flag clear
//!   Idle ───────────────────────▶ Alerted ──────────────────────────▶ Idle
//!    │  ▲                          │  ▲        (ceased notice, disarm)
//!    │  │ no alarm                 └──┘ resend tick, flag set (resend)
//!    │  │
//!    └──▶ AlertPending ──── alarm, send ok ───▶ Alerted
//!  alarm,  ▲    │
//!  send    └────┘ alarm, send failed (retry next status tick)
//!  failed
//! ```

use std::fmt;
use tracing::{debug, warn};

use crate::data::AlarmVerdict;
use crate::log_sink::LogSink;
use crate::notify::{NotificationGateway, ALARM_SUBJECT, CEASED_BODY, CEASED_SUBJECT};
use crate::scheduler::ResendTimer;

/// Where the alarm notification currently stands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum NotificationState {
    /// No alarm has been notified.
    #[default]
    Idle,
    /// An alarm is active but the first alert could not be delivered yet.
    AlertPending,
    /// The first alert was delivered and the resend timer is armed.
    Alerted,
}

impl fmt::Display for NotificationState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Idle => write!(f, "Idle"),
            Self::AlertPending => write!(f, "AlertPending"),
            Self::Alerted => write!(f, "Alerted"),
        }
    }
}

/// Decides which notification, if any, each tick sends.
#[derive(Debug, Clone)]
pub struct AlarmStateMachine {
    state: NotificationState,
    /// Alarm flag as of the latest status tick.
    on_alarm: bool,
    /// Verdict of the latest status tick.
    last_verdict: Option<AlarmVerdict>,
    /// Operator text of the alarm e-mail.
    alarm_message: String,
}

impl AlarmStateMachine {
    /// Create an idle state machine using `alarm_message` as the alarm text.
    pub fn new(alarm_message: impl Into<String>) -> Self {
        Self {
            state: NotificationState::Idle,
            on_alarm: false,
            last_verdict: None,
            alarm_message: alarm_message.into(),
        }
    }

    /// Current notification state.
    pub fn state(&self) -> NotificationState {
        self.state
    }

    /// Alarm flag as of the latest status tick.
    pub fn is_on_alarm(&self) -> bool {
        self.on_alarm
    }

    /// Verdict of the latest status tick.
    pub fn last_verdict(&self) -> Option<AlarmVerdict> {
        self.last_verdict
    }

    /// Body of alarm notices: the operator text, then the verdict.
    pub fn alarm_body(&self, verdict: Option<&AlarmVerdict>) -> String {
        match verdict {
            Some(verdict) if !self.alarm_message.is_empty() => {
                format!("{}\n{}", self.alarm_message, verdict)
            }
            Some(verdict) => verdict.to_string(),
            None => self.alarm_message.clone(),
        }
    }

    /// Handle a status tick with a freshly computed verdict.
    pub async fn on_status_tick<G>(
        &mut self,
        verdict: AlarmVerdict,
        gateway: &G,
        log: &mut LogSink,
    ) -> ResendTimer
    where
        G: NotificationGateway + ?Sized,
    {
        self.on_alarm = verdict.is_alarm();
        self.last_verdict = Some(verdict);

        if !self.on_alarm {
            if self.state == NotificationState::AlertPending {
                log.record("Temperature back in range before the alarm could be sent");
                self.state = NotificationState::Idle;
            }
            // An Alerted machine waits for the resend tick to declare the end.
            return ResendTimer::Unchanged;
        }

        if self.state == NotificationState::Alerted {
            debug!("Alarm still active, waiting for the resend tick");
            return ResendTimer::Unchanged;
        }

        log.record(format!("TEMPERATURE ALARM ! {}", verdict));
        let body = self.alarm_body(Some(&verdict));
        match gateway.send(ALARM_SUBJECT, &body).await {
            Ok(()) => {
                log.record(format!("{}: Message Sent", ALARM_SUBJECT));
                self.state = NotificationState::Alerted;
                ResendTimer::Arm
            }
            Err(e) => {
                warn!("Alarm notification failed: {}", e);
                log.record(format!("{}: Unable to Send the Message ({})", ALARM_SUBJECT, e));
                self.state = NotificationState::AlertPending;
                ResendTimer::Unchanged
            }
        }
    }

    /// Handle a resend tick.
    pub async fn on_resend_tick<G>(&mut self, gateway: &G, log: &mut LogSink) -> ResendTimer
    where
        G: NotificationGateway + ?Sized,
    {
        if self.state != NotificationState::Alerted {
            debug!("Resend tick in state {}, disarming", self.state);
            return ResendTimer::Disarm;
        }

        if !self.on_alarm {
            log.record("Temperature Alarm Ceased");
            match gateway.send(CEASED_SUBJECT, CEASED_BODY).await {
                Ok(()) => log.record(format!("{}: Message Sent", CEASED_SUBJECT)),
                Err(e) => {
                    warn!("Alarm ceased notification failed: {}", e);
                    log.record(format!(
                        "{}: Unable to Send the Message ({})",
                        CEASED_SUBJECT, e
                    ));
                }
            }
            self.state = NotificationState::Idle;
            return ResendTimer::Disarm;
        }

        log.record("TEMPERATURE ALARM STILL ON!");
        let body = self.alarm_body(self.last_verdict.as_ref());
        match gateway.send(ALARM_SUBJECT, &body).await {
            Ok(()) => log.record(format!("{}: Message Sent", ALARM_SUBJECT)),
            Err(e) => {
                warn!("Alarm resend failed: {}", e);
                log.record(format!("{}: Unable to Send the Message ({})", ALARM_SUBJECT, e));
            }
        }
        ResendTimer::Unchanged
    }
}
