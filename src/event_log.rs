//! Append-only plain-text event log.
//!
//! A session looks like this:
//!
//! ```text
//! --- START 2024-05-01 18:30:00 ---
//! 2024-05-01 18:30:00,people=2,viol=0
//! 2024-05-01 18:30:01,people=3,viol=1
//! --- END 2024-05-01 18:30:02 ---
//! ```

use std::{
    fmt,
    fs::{File, OpenOptions},
    io::{self, LineWriter, Write},
    path::Path,
};

use chrono::NaiveDateTime;

const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Formats a timestamp the way it appears in the log.
pub fn format_timestamp(ts: NaiveDateTime) -> impl fmt::Display {
    ts.format(TIMESTAMP_FORMAT)
}

/// Formats the line recorded for one processed frame (without trailing newline).
pub fn entry_line(ts: NaiveDateTime, people: usize, violations: usize) -> String {
    format!("{},people={people},viol={violations}", format_timestamp(ts))
}

/// Writes session markers and per-frame entries.
///
/// A disabled log silently ignores all writes. A log becomes disabled when the file cannot be
/// opened or when a write fails.
pub struct EventLog<W: Write> {
    out: Option<W>,
}

impl EventLog<LineWriter<File>> {
    /// Opens `path` for appending, creating it if needed.
    ///
    /// If the file cannot be opened, a warning is logged and a disabled log is returned.
    pub fn open<P: AsRef<Path>>(path: P) -> Self {
        let path = path.as_ref();
        match OpenOptions::new().create(true).append(true).open(path) {
            Ok(file) => {
                log::info!("event log: {}", path.display());
                Self::new(LineWriter::new(file))
            }
            Err(e) => {
                log::warn!("couldn't open event log {}: {e}", path.display());
                Self::disabled()
            }
        }
    }
}

impl<W: Write> EventLog<W> {
    /// Creates a log writing to `out`.
    pub fn new(out: W) -> Self {
        Self { out: Some(out) }
    }

    /// Creates a log that discards everything.
    pub fn disabled() -> Self {
        Self { out: None }
    }

    #[inline]
    pub fn is_enabled(&self) -> bool {
        self.out.is_some()
    }

    /// Writes the session start marker.
    pub fn start_session(&mut self, ts: NaiveDateTime) {
        self.write_line(format_args!("--- START {} ---", format_timestamp(ts)));
    }

    /// Records one processed frame.
    pub fn record(&mut self, ts: NaiveDateTime, people: usize, violations: usize) {
        self.write_line(format_args!("{}", entry_line(ts, people, violations)));
    }

    /// Writes the session end marker and closes the log, returning the underlying writer.
    pub fn end_session(mut self, ts: NaiveDateTime) -> Option<W> {
        self.write_line(format_args!("--- END {} ---", format_timestamp(ts)));
        self.out.take()
    }

    fn write_line(&mut self, line: fmt::Arguments<'_>) {
        let Some(out) = &mut self.out else { return };
        if let Err(e) = write_and_flush(out, line) {
            log::warn!("failed to write event log, disabling it: {e}");
            self.out = None;
        }
    }
}

fn write_and_flush<W: Write>(out: &mut W, line: fmt::Arguments<'_>) -> io::Result<()> {
    writeln!(out, "{line}")?;
    out.flush()
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use super::*;

    fn ts(h: u32, m: u32, s: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 5, 1)
            .unwrap()
            .and_hms_opt(h, m, s)
            .unwrap()
    }

    fn text(buf: Vec<u8>) -> String {
        String::from_utf8(buf).unwrap()
    }

    #[test]
    fn entry_format() {
        assert_eq!(
            entry_line(ts(18, 30, 5), 4, 2),
            "2024-05-01 18:30:05,people=4,viol=2"
        );
        assert_eq!(
            entry_line(ts(0, 0, 0), 0, 0),
            "2024-05-01 00:00:00,people=0,viol=0"
        );
    }

    #[test]
    fn session() {
        let mut log = EventLog::new(Vec::new());
        log.start_session(ts(9, 0, 0));
        log.record(ts(9, 0, 1), 4, 2);
        log.record(ts(9, 0, 2), 1, 0);
        let out = text(log.end_session(ts(9, 0, 3)).unwrap());

        assert_eq!(
            out,
            "--- START 2024-05-01 09:00:00 ---\n\
             2024-05-01 09:00:01,people=4,viol=2\n\
             2024-05-01 09:00:02,people=1,viol=0\n\
             --- END 2024-05-01 09:00:03 ---\n"
        );
    }

    #[test]
    fn disabled_log_ignores_writes() {
        let mut log = EventLog::<Vec<u8>>::disabled();
        assert!(!log.is_enabled());
        log.start_session(ts(1, 2, 3));
        log.record(ts(1, 2, 3), 1, 1);
        assert!(log.end_session(ts(1, 2, 4)).is_none());
    }

    struct FailingWriter;

    impl Write for FailingWriter {
        fn write(&mut self, _buf: &[u8]) -> io::Result<usize> {
            Err(io::Error::new(io::ErrorKind::Other, "disk full"))
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn write_error_disables_log() {
        let mut log = EventLog::new(FailingWriter);
        assert!(log.is_enabled());
        log.start_session(ts(1, 2, 3));
        assert!(!log.is_enabled());
        log.record(ts(1, 2, 3), 2, 1);
        assert!(log.end_session(ts(1, 2, 4)).is_none());
    }

    #[test]
    fn appends_to_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("room.log");
        std::fs::write(&path, "previous\n").unwrap();

        let mut log = EventLog::open(&path);
        assert!(log.is_enabled());
        log.start_session(ts(12, 0, 0));
        log.record(ts(12, 0, 0), 3, 1);
        // Entries reach the file as they are written.
        let contents = std::fs::read_to_string(&path).unwrap();
        assert!(contents.ends_with("2024-05-01 12:00:00,people=3,viol=1\n"));
        drop(log.end_session(ts(12, 0, 1)));

        let contents = std::fs::read_to_string(&path).unwrap();
        let lines = contents.lines().collect::<Vec<_>>();
        assert_eq!(
            lines,
            [
                "previous",
                "--- START 2024-05-01 12:00:00 ---",
                "2024-05-01 12:00:00,people=3,viol=1",
                "--- END 2024-05-01 12:00:01 ---",
            ]
        );
    }

    #[test]
    fn unopenable_path_disables_log() {
        let dir = tempfile::tempdir().unwrap();
        let log = EventLog::open(dir.path().join("missing").join("room.log"));
        assert!(!log.is_enabled());
    }
}
