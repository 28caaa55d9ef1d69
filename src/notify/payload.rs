//! Raw RFC 5322 message assembly.
//!
//! The message is built line by line and handed to the transport verbatim, so
//! the header order below is exactly what the mail server receives:
//!
//! ```text
//! Date: <RFC 2822 date>
//! To: <to>
//! From: <username>@<host>
//! Cc: <cc>[, <cc>...]          (only when cc recipients are configured)
//! Message-ID: <ctime-with-#@smart_alert_system>
//! Subject: <subject>
//!
//! <ctime>
//! <body lines...>
//! ```

use chrono::{DateTime, TimeZone};
use std::fmt;

use crate::config::MailSettings;
use crate::utils::ctime_string;

/// Domain part of generated Message-IDs.
pub const MESSAGE_ID_DOMAIN: &str = "smart_alert_system";

/// A notification message as an ordered list of lines.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MailPayload {
    lines: Vec<String>,
}

impl MailPayload {
    /// Assemble the headers and body for one notification.
    pub fn build<Tz: TimeZone>(
        mail: &MailSettings,
        subject: &str,
        body: &str,
        now: &DateTime<Tz>,
    ) -> Self
    where
        Tz::Offset: fmt::Display,
    {
        let ctime = ctime_string(now);
        let mut lines = vec![
            format!("Date: {}", now.to_rfc2822()),
            format!("To: {}", mail.to),
            format!("From: {}", mail.sender()),
        ];
        if !mail.cc.is_empty() {
            let cc: Vec<String> = mail.cc.iter().map(|cc| format!("<{}>", cc)).collect();
            lines.push(format!("Cc: {}", cc.join(", ")));
        }
        lines.push(format!(
            "Message-ID: <{}@{}>",
            ctime.replace(' ', "#"),
            MESSAGE_ID_DOMAIN
        ));
        lines.push(format!("Subject: {}", subject));
        // Empty line separating headers from the body.
        lines.push(String::new());
        lines.push(ctime);
        lines.extend(body.split('\n').map(str::to_string));

        Self { lines }
    }

    /// The message lines, without terminators.
    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    /// Wire form: every line terminated by CRLF.
    pub fn to_wire(&self) -> String {
        let mut wire = String::new();
        for line in &self.lines {
            wire.push_str(line);
            wire.push_str("\r\n");
        }
        wire
    }
}
