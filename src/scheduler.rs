//! Status and resend timers.
//!
//! Both timers are polled from a single task through [`Scheduler::next_tick`],
//! so tick handlers run one at a time and never interleave.

use std::time::Duration;
use tokio::time::{self, Instant, Interval, MissedTickBehavior};
use tracing::debug;

/// Which timer fired.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Tick {
    /// Sample the sensor and re-evaluate the alarm.
    Status,
    /// Resend or clear the pending alarm notification.
    Resend,
}

/// What the state machine wants done with the resend timer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ResendTimer {
    /// Leave the resend timer as it is.
    #[default]
    Unchanged,
    /// Start the resend timer.
    Arm,
    /// Stop the resend timer.
    Disarm,
}

/// Two independent periodic timers.
pub struct Scheduler {
    /// Status tick, runs for the whole life of the daemon.
    status: Interval,
    /// Resend tick, only present while an alarm has been notified.
    resend: Option<Interval>,
    /// Resend period.
    resend_period: Duration,
}

impl Scheduler {
    /// Start the status timer. The first status tick fires one period from
    /// now; the resend timer starts disarmed.
    ///
    /// Must be called from within a tokio runtime.
    pub fn new(status_period: Duration, resend_period: Duration) -> Self {
        Self {
            status: periodic(status_period),
            resend: None,
            resend_period,
        }
    }

    /// Start the resend timer; its first tick fires one resend period from
    /// now. Arming an armed timer restarts it.
    pub fn arm_resend(&mut self) {
        debug!("Arming resend timer ({:?})", self.resend_period);
        self.resend = Some(periodic(self.resend_period));
    }

    /// Stop the resend timer.
    pub fn disarm_resend(&mut self) {
        if self.resend.take().is_some() {
            debug!("Resend timer disarmed");
        }
    }

    /// Apply a state machine decision.
    pub fn apply(&mut self, command: ResendTimer) {
        match command {
            ResendTimer::Unchanged => {}
            ResendTimer::Arm => self.arm_resend(),
            ResendTimer::Disarm => self.disarm_resend(),
        }
    }

    /// Check if the resend timer is running.
    pub fn is_resend_armed(&self) -> bool {
        self.resend.is_some()
    }

    /// Wait for the next tick of either timer.
    ///
    /// When both are due, the status tick is returned first.
    pub async fn next_tick(&mut self) -> Tick {
        match self.resend.as_mut() {
            Some(resend) => {
                tokio::select! {
                    biased;
                    _ = self.status.tick() => Tick::Status,
                    _ = resend.tick() => Tick::Resend,
                }
            }
            None => {
                self.status.tick().await;
                Tick::Status
            }
        }
    }
}

fn periodic(period: Duration) -> Interval {
    let mut interval = time::interval_at(Instant::now() + period, period);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
    interval
}
