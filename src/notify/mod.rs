//! Operator notification.
//!
//! The monitor only needs "send this subject and body"; [`SmtpGateway`] is the
//! production implementation over SMTPS.

pub mod payload;
pub mod smtp;

pub use payload::MailPayload;
pub use smtp::SmtpGateway;

use async_trait::async_trait;

use crate::error::NotificationError;

/// Subject of alarm and alarm-resend notices.
pub const ALARM_SUBJECT: &str = "Smart Alert System [ALARM!]";

/// Subject of the alarm-ceased notice.
pub const CEASED_SUBJECT: &str = "Smart Alert System [INFO!]";

/// Subject of the start and stop notices.
pub const INFO_SUBJECT: &str = "Smart Alert System [INFO]";

/// Body of the alarm-ceased notice.
pub const CEASED_BODY: &str = "Temperature Alarm Ceased";

/// Body of the start notice.
pub const STARTED_BODY: &str = "Smart Alert System Has Been Restarted";

/// Body of the stop notice.
pub const STOPPED_BODY: &str = "Smart Alert Has Been Switched Off";

/// Delivers a notification to the configured recipients.
///
/// Sends are awaited inline by the tick handler; no timeout is applied beyond
/// the one of the underlying transport.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait NotificationGateway: Send + Sync {
    /// Send one message. The body may contain several lines.
    async fn send(&self, subject: &str, body: &str) -> Result<(), NotificationError>;
}
