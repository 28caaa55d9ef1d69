//! SMTPS delivery via `lettre`.

use async_trait::async_trait;
use chrono::Local;
use lettre::address::Envelope;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{Address, AsyncSmtpTransport, AsyncTransport, Tokio1Executor};
use tracing::{debug, info};

use crate::config::MailSettings;
use crate::error::NotificationError;
use crate::notify::{MailPayload, NotificationGateway};

/// Sends notifications through an implicit-TLS SMTP relay.
///
/// A fresh connection is opened for every message; notices are minutes apart
/// so there is nothing to gain from pooling.
pub struct SmtpGateway {
    mail: MailSettings,
}

impl SmtpGateway {
    /// Create a gateway for the given mail settings.
    pub fn new(mail: MailSettings) -> Self {
        Self { mail }
    }

    /// The mail settings in use.
    pub fn settings(&self) -> &MailSettings {
        &self.mail
    }

    /// Build the SMTP envelope: sender plus `to` and every `cc`.
    pub fn envelope(&self) -> Result<Envelope, NotificationError> {
        let from = parse_address(&self.mail.sender())?;

        let mut recipients = vec![parse_address(&self.mail.to)?];
        for cc in &self.mail.cc {
            recipients.push(parse_address(cc)?);
        }

        Envelope::new(Some(from), recipients)
            .map_err(|e| NotificationError::Envelope(e.to_string()))
    }

    fn transport(&self) -> Result<AsyncSmtpTransport<Tokio1Executor>, NotificationError> {
        let mut builder = AsyncSmtpTransport::<Tokio1Executor>::relay(self.mail.host())?
            .credentials(Credentials::new(
                self.mail.username.clone(),
                self.mail.password.clone(),
            ));
        if let Some(port) = self.mail.port() {
            builder = builder.port(port);
        }
        Ok(builder.build())
    }
}

#[async_trait]
impl NotificationGateway for SmtpGateway {
    async fn send(&self, subject: &str, body: &str) -> Result<(), NotificationError> {
        let envelope = self.envelope()?;
        let payload = MailPayload::build(&self.mail, subject, body, &Local::now());
        let transport = self.transport()?;

        debug!(server = %self.mail.server, subject, "Sending notification");
        transport
            .send_raw(&envelope, payload.to_wire().as_bytes())
            .await?;

        info!(to = %self.mail.to, subject, "Notification sent");
        Ok(())
    }
}

/// Parse an address, tolerating surrounding whitespace and angle brackets.
fn parse_address(raw: &str) -> Result<Address, NotificationError> {
    let trimmed = raw.trim().trim_start_matches('<').trim_end_matches('>');
    trimmed
        .parse::<Address>()
        .map_err(|source| NotificationError::Address {
            address: raw.to_string(),
            source,
        })
}
