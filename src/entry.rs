//! Record assembly.
//!
//! [`EntryAssembler::write_entry`] turns one log record into one line:
//!
//! ```text
//! <time_key>=<RFC3339Nano> <level_key>=<level> <message_key>=<message>[ <fields>]\n
//! ```
//!
//! The line is built in a pooled scratch encoder, handed to the sink in a
//! single `write` call, and the scratch encoder goes back to the pool whether
//! or not the write succeeded. A leading token whose key is empty is left out.
//!
//! ```rust
//! use std::sync::Arc;
//! use logfmt_encoder::{
//!     Encoder, EncoderOptions, EncoderPool, Entry, EntryAssembler, Level, ObjectEncoder,
//! };
//!
//! let options = EncoderOptions::new().with_time_key("");
//! let assembler = EntryAssembler::new(Arc::new(EncoderPool::new(options.clone())));
//!
//! let mut fields = Encoder::new(options);
//! fields.add_i64("answer", 42);
//!
//! let mut sink = Vec::new();
//! let entry = Entry::new(Level::Info, "computed");
//! assembler.write_entry(Some(&mut sink), &entry, &fields).unwrap();
//! assert_eq!(sink, b"level=info msg=computed answer=42\n");
//! ```

use crate::{Encoder, EncoderPool, Error, ObjectEncoder, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::io::Write;
use std::str::FromStr;
use std::sync::Arc;

/// Severity of a record, rendered by its lowercase name.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Level {
    Debug,
    Info,
    Warn,
    Error,
    DPanic,
    Panic,
    Fatal,
}

impl Level {
    /// The canonical lowercase name.
    ///
    /// ```rust
    /// use logfmt_encoder::Level;
    ///
    /// assert_eq!(Level::Warn.as_str(), "warn");
    /// assert_eq!(Level::DPanic.as_str(), "dpanic");
    /// ```
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Level::Debug => "debug",
            Level::Info => "info",
            Level::Warn => "warn",
            Level::Error => "error",
            Level::DPanic => "dpanic",
            Level::Panic => "panic",
            Level::Fatal => "fatal",
        }
    }
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Level {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "debug" => Ok(Level::Debug),
            "info" => Ok(Level::Info),
            "warn" | "warning" => Ok(Level::Warn),
            "error" => Ok(Level::Error),
            "dpanic" => Ok(Level::DPanic),
            "panic" => Ok(Level::Panic),
            "fatal" => Ok(Level::Fatal),
            other => Err(Error::custom(format!("unknown level: {other}"))),
        }
    }
}

/// `tracing` has no panic or fatal levels, and its `TRACE` folds into `debug`.
impl From<tracing::Level> for Level {
    fn from(level: tracing::Level) -> Self {
        match level {
            tracing::Level::ERROR => Level::Error,
            tracing::Level::WARN => Level::Warn,
            tracing::Level::INFO => Level::Info,
            _ => Level::Debug,
        }
    }
}

/// The fixed part of a record: level, timestamp and message.
#[derive(Clone, Debug, PartialEq)]
pub struct Entry<'a> {
    pub level: Level,
    pub time: DateTime<Utc>,
    pub message: &'a str,
}

impl<'a> Entry<'a> {
    /// Creates an entry stamped with the current time.
    pub fn new(level: Level, message: &'a str) -> Self {
        Entry {
            level,
            time: Utc::now(),
            message,
        }
    }

    #[must_use]
    pub fn with_time(mut self, time: DateTime<Utc>) -> Self {
        self.time = time;
        self
    }
}

/// Writes complete record lines using scratch encoders from a shared pool.
#[derive(Clone, Debug)]
pub struct EntryAssembler {
    pool: Arc<EncoderPool>,
}

impl EntryAssembler {
    pub fn new(pool: Arc<EncoderPool>) -> Self {
        EntryAssembler { pool }
    }

    pub fn pool(&self) -> &Arc<EncoderPool> {
        &self.pool
    }

    /// Writes `entry` followed by the tokens already in `fields` as one line.
    ///
    /// Key names come from `fields`' options.
    ///
    /// # Errors
    ///
    /// - [`Error::NilSink`] if `sink` is `None`; nothing is written
    /// - [`Error::Io`] with the sink's own error, unchanged and not retried
    /// - [`Error::IncompleteWrite`] if the sink accepted fewer bytes than the line holds
    pub fn write_entry<W>(
        &self,
        sink: Option<&mut W>,
        entry: &Entry<'_>,
        fields: &Encoder,
    ) -> Result<()>
    where
        W: Write + ?Sized,
    {
        let sink = sink.ok_or(Error::NilSink)?;

        let mut line = self.pool.acquire();
        encode_entry(&mut line, entry, fields);

        let expected = line.len();
        let written = sink.write(line.as_bytes()).map_err(|err| {
            tracing::debug!(error = %err, "sink write failed");
            Error::Io(err)
        })?;
        if written != expected {
            tracing::debug!(written, expected, "short write");
            return Err(Error::incomplete_write(written, expected));
        }
        Ok(())
    }
}

/// Appends the full record line for `entry` and `fields` to `line`,
/// trailing newline included.
pub fn encode_entry(line: &mut Encoder, entry: &Entry<'_>, fields: &Encoder) {
    let options = fields.options();
    if !options.time_key.is_empty() {
        line.add_time(&options.time_key, &entry.time);
    }
    if !options.level_key.is_empty() {
        line.add_string(&options.level_key, entry.level.as_str());
    }
    if !options.message_key.is_empty() {
        line.add_string(&options.message_key, entry.message);
    }
    if !fields.is_empty() {
        let buffer = line.buffer_mut();
        buffer.separate(b' ');
        buffer.extend(fields.as_bytes());
    }
    line.buffer_mut().push(b'\n');
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::EncoderOptions;
    use chrono::TimeZone;
    use std::io;

    fn assembler(options: &EncoderOptions) -> EntryAssembler {
        EntryAssembler::new(Arc::new(EncoderPool::new(options.clone())))
    }

    #[test]
    fn test_all_three_leading_tokens() {
        let options = EncoderOptions::default();
        let time = Utc.with_ymd_and_hms(2024, 1, 15, 10, 30, 0).unwrap();
        let entry = Entry::new(Level::Info, "Hello World").with_time(time);
        let mut sink = Vec::new();
        assembler(&options)
            .write_entry(Some(&mut sink), &entry, &Encoder::new(options))
            .unwrap();
        assert_eq!(
            String::from_utf8(sink).unwrap(),
            "ts=2024-01-15T10:30:00Z level=info msg=\"Hello World\"\n"
        );
    }

    #[test]
    fn test_missing_sink() {
        let options = EncoderOptions::default();
        let entry = Entry::new(Level::Info, "x");
        let err = assembler(&options)
            .write_entry(None::<&mut Vec<u8>>, &entry, &Encoder::default())
            .unwrap_err();
        assert!(matches!(err, Error::NilSink));
    }

    #[test]
    fn test_only_fields() {
        let options = EncoderOptions::new()
            .with_time_key("")
            .with_level_key("")
            .with_message_key("");
        let mut fields = Encoder::new(options.clone());
        fields.add_bool("alone", true);
        let mut line = Encoder::new(options);
        encode_entry(&mut line, &Entry::new(Level::Debug, "ignored"), &fields);
        assert_eq!(line.as_bytes(), b"alone=true\n");
    }

    #[test]
    fn test_sink_error_passes_through() {
        struct Refuse;
        impl Write for Refuse {
            fn write(&mut self, _: &[u8]) -> io::Result<usize> {
                Err(io::Error::new(io::ErrorKind::BrokenPipe, "closed"))
            }
            fn flush(&mut self) -> io::Result<()> {
                Ok(())
            }
        }

        let options = EncoderOptions::default();
        let assembler = assembler(&options);
        let entry = Entry::new(Level::Error, "x");
        let err = assembler
            .write_entry(Some(&mut Refuse), &entry, &Encoder::default())
            .unwrap_err();
        match err {
            Error::Io(io) => assert_eq!(io.kind(), io::ErrorKind::BrokenPipe),
            other => panic!("unexpected error: {other}"),
        }
        assert_eq!(assembler.pool().stats().idle, 1);
    }

    #[test]
    fn test_level_names_round_trip() {
        let levels = [
            Level::Debug,
            Level::Info,
            Level::Warn,
            Level::Error,
            Level::DPanic,
            Level::Panic,
            Level::Fatal,
        ];
        for level in levels {
            assert_eq!(level.as_str().parse::<Level>().unwrap(), level);
        }
        assert_eq!(Level::from(tracing::Level::TRACE), Level::Debug);
        assert!("verbose".parse::<Level>().is_err());
    }
}
