//! Operator event log with weekly rotation.
//!
//! One line per event, `MM dd yyyy hh:mm:ss: <message>`. Up to five previous
//! generations are kept next to the active file as `<path>_0.txt` (newest)
//! through `<path>_4.txt` (oldest). When the file cannot be opened, events
//! go to the system log (see [`crate::system_log`]) and to `tracing` at warn
//! level.

use chrono::{DateTime, Local};
use std::ffi::OsString;
use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, error, warn};

use crate::error::LogError;
use crate::system_log::{Syslog, SystemLog};
use crate::utils::log_timestamp;

/// Number of rotated generations kept.
pub const GENERATIONS: usize = 5;

/// Rotation happens once more than this many calendar days have passed.
pub const ROTATION_DAYS: i64 = 7;

/// Append-only event log.
pub struct LogSink {
    /// Active log path; `None` for a sink that only forwards to `tracing`.
    path: Option<PathBuf>,
    /// Open handle to the active log.
    file: Option<File>,
    /// Time of the last rotation (or of opening).
    last_rotation: DateTime<Local>,
    /// Receives events while there is no file.
    fallback: Option<Box<dyn SystemLog + Send>>,
}

impl LogSink {
    /// Open the log at `path`, rotating any previous log first.
    ///
    /// Never fails: if the file cannot be opened the sink falls back to
    /// syslog and reports the failure through `tracing`.
    pub fn open(path: impl Into<PathBuf>, now: DateTime<Local>) -> Self {
        Self::open_with_fallback(path, now, Syslog::default())
    }

    /// Like [`open`](Self::open), with a custom destination for events
    /// recorded while the file is unavailable.
    pub fn open_with_fallback<L>(
        path: impl Into<PathBuf>,
        now: DateTime<Local>,
        fallback: L,
    ) -> Self
    where
        L: SystemLog + Send + 'static,
    {
        let mut sink = Self {
            path: Some(path.into()),
            file: None,
            last_rotation: now,
            fallback: Some(Box::new(fallback)),
        };
        if let Err(e) = sink.rotate(now) {
            error!("{}; logging to the system log instead", e);
        }
        sink
    }

    /// A sink without a file or system log; every event goes to `tracing`.
    pub fn detached() -> Self {
        Self {
            path: None,
            file: None,
            last_rotation: Local::now(),
            fallback: None,
        }
    }

    /// Active log path, if any.
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Check whether events currently land in a file.
    pub fn is_file_backed(&self) -> bool {
        self.file.is_some()
    }

    /// Time of the last rotation.
    pub fn last_rotation(&self) -> DateTime<Local> {
        self.last_rotation
    }

    /// Record one event, timestamped with the current local time.
    pub fn record(&mut self, message: impl AsRef<str>) {
        self.record_at(Local::now(), message);
    }

    /// Record one event with an explicit timestamp.
    pub fn record_at(&mut self, now: DateTime<Local>, message: impl AsRef<str>) {
        let message = message.as_ref();
        let line = format_line(&now, message);
        debug!(target: "smart_alert::event", "{}", line);

        let written = match self.file.as_mut() {
            Some(file) => writeln!(file, "{}", line).and_then(|_| file.flush()),
            None => Err(io::Error::new(io::ErrorKind::NotFound, "no log file")),
        };

        if written.is_err() {
            warn!(target: "smart_alert::event", "{}", message);
            if let Some(fallback) = self.fallback.as_mut() {
                fallback.alert(message);
            }
        }
    }

    /// Rotate if more than [`ROTATION_DAYS`] calendar days have passed since
    /// the last rotation. Returns whether a rotation was performed
    /// successfully.
    pub fn rotate_if_due(&mut self, now: DateTime<Local>) -> bool {
        let days = (now.date_naive() - self.last_rotation.date_naive()).num_days();
        if days <= ROTATION_DAYS {
            return false;
        }
        match self.rotate(now) {
            Ok(()) => true,
            Err(e) => {
                error!("{}", e);
                false
            }
        }
    }

    /// Shift the generations, move the active log to `_0.txt` and open a
    /// fresh empty log at the original path.
    ///
    /// Missing generations are skipped. If a rename fails the active log
    /// stays where it is and keeps receiving events. The last-rotation time
    /// is updated even on failure, so a broken log directory is not retried
    /// on every tick.
    pub fn rotate(&mut self, now: DateTime<Local>) -> Result<(), LogError> {
        let Some(path) = self.path.clone() else {
            return Ok(());
        };
        self.last_rotation = now;

        if path.is_file() {
            debug!("Rotating log file {}", path.display());
            self.flush();
            if let Err(e) = shift_generations(&path) {
                self.reopen_append(&path);
                return Err(e);
            }
        }

        match File::create(&path) {
            Ok(file) => {
                self.file = Some(file);
                Ok(())
            }
            Err(source) => {
                self.file = None;
                Err(LogError::Open { path, source })
            }
        }
    }

    /// Keep writing to the active log after a failed rotation.
    fn reopen_append(&mut self, path: &Path) {
        if self.file.is_some() {
            return;
        }
        match OpenOptions::new().create(true).append(true).open(path) {
            Ok(file) => self.file = Some(file),
            Err(e) => warn!("Unable to reopen {}: {}", path.display(), e),
        }
    }

    /// Flush the active log.
    pub fn flush(&mut self) {
        if let Some(file) = self.file.as_mut() {
            if let Err(e) = file.flush() {
                warn!("Unable to flush the event log: {}", e);
            }
        }
    }
}

impl Drop for LogSink {
    fn drop(&mut self) {
        self.flush();
    }
}

/// Format one event line.
pub fn format_line(now: &DateTime<Local>, message: &str) -> String {
    format!("{}: {}", log_timestamp(now), message)
}

/// Path of rotated generation `index`, e.g. `smartAlertLog.txt_0.txt`.
pub fn generation_path(path: &Path, index: usize) -> PathBuf {
    let mut name = OsString::from(path.as_os_str());
    name.push(format!("_{}.txt", index));
    PathBuf::from(name)
}

/// Drop the oldest generation, shift the others up by one and move the
/// active log to generation 0.
fn shift_generations(path: &Path) -> Result<(), LogError> {
    let _ = fs::remove_file(generation_path(path, GENERATIONS - 1));
    for i in (1..GENERATIONS).rev() {
        let from = generation_path(path, i - 1);
        if from.exists() {
            rename(&from, &generation_path(path, i))?;
        }
    }
    rename(path, &generation_path(path, 0))
}

fn rename(from: &Path, to: &Path) -> Result<(), LogError> {
    fs::rename(from, to).map_err(|source| LogError::Rotate {
        from: from.to_path_buf(),
        to: to.to_path_buf(),
        source,
    })
}
