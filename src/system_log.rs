//! System logger used when the event log file is unavailable.
//!
//! Events are sent to syslog(3) at `LOG_ALERT` on the `LOG_USER` facility.
//! The connection is opened on the first event, so a daemon whose log file
//! works never touches syslog.

use std::ffi::CString;

/// Identity under which events appear in the system log.
pub const SYSLOG_IDENT: &str = "smart-alert";

/// Destination for events that could not be written to the log file.
#[cfg_attr(test, mockall::automock)]
pub trait SystemLog {
    /// Record one event message.
    fn alert(&mut self, message: &str);
}

/// syslog(3) over `libc`.
pub struct Syslog {
    ident: CString,
    opened: bool,
}

impl Syslog {
    /// Create a logger for `ident`; nothing is opened until the first event.
    pub fn new(ident: &str) -> Self {
        Self {
            ident: c_string(ident),
            opened: false,
        }
    }
}

impl Default for Syslog {
    fn default() -> Self {
        Self::new(SYSLOG_IDENT)
    }
}

impl SystemLog for Syslog {
    fn alert(&mut self, message: &str) {
        if !self.opened {
            // Safety: `ident` is NUL-terminated and outlives the connection,
            // which is closed in `Drop`.
            unsafe { libc::openlog(self.ident.as_ptr(), libc::LOG_PID, libc::LOG_USER) };
            self.opened = true;
        }

        let message = c_string(message);
        // Safety: both pointers are NUL-terminated; the message is passed
        // through a "%s" format so it is never interpreted.
        unsafe {
            libc::syslog(
                libc::LOG_ALERT | libc::LOG_USER,
                FORMAT.as_ptr().cast::<libc::c_char>(),
                message.as_ptr(),
            )
        };
    }
}

impl Drop for Syslog {
    fn drop(&mut self) {
        if self.opened {
            // Safety: no arguments; only closes the descriptor opened above.
            unsafe { libc::closelog() };
        }
    }
}

const FORMAT: &[u8] = b"%s\0";

/// Interior NUL bytes would truncate the message; replace them.
fn c_string(text: &str) -> CString {
    CString::new(text.replace('\0', " ")).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_c_string_replaces_nul() {
        assert_eq!(c_string("a\0b").to_str().unwrap(), "a b");
        assert_eq!(c_string("").to_bytes().len(), 0);
    }

    #[test]
    fn test_syslog_opens_lazily() {
        let log = Syslog::default();
        assert!(!log.opened);
        assert_eq!(log.ident.to_str().unwrap(), SYSLOG_IDENT);
    }
}
