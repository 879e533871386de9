//! Configuration options for the logfmt encoder.
//!
//! [`EncoderOptions`] names the three keys every record line starts with and
//! the initial capacity given to freshly allocated encoder buffers.
//!
//! Options are set once, at construction, and shared by an encoder, its
//! clones and the pool that recycles them.
//!
//! ## Examples
//!
//! ```rust
//! use logfmt_encoder::{Encoder, EncoderOptions};
//!
//! // Drop the timestamp and rename the message key
//! let options = EncoderOptions::new()
//!     .with_time_key("")
//!     .with_message_key("message");
//! let encoder = Encoder::new(options);
//! assert_eq!(encoder.options().message_key, "message");
//! ```
//!
//! The options also deserialize from any serde format, so a host can keep them
//! in its own configuration file. Missing keys fall back to the defaults.
//!
//! ```rust
//! use logfmt_encoder::EncoderOptions;
//!
//! let options: EncoderOptions = serde_json::from_str(r#"{"level_key":"lvl"}"#).unwrap();
//! assert_eq!(options.level_key, "lvl");
//! assert_eq!(options.time_key, "ts");
//! ```

use serde::{Deserialize, Serialize};

pub const DEFAULT_TIME_KEY: &str = "ts";
pub const DEFAULT_LEVEL_KEY: &str = "level";
pub const DEFAULT_MESSAGE_KEY: &str = "msg";
pub const DEFAULT_INITIAL_CAPACITY: usize = 1024;

/// Key names and buffer sizing for an [`Encoder`](crate::Encoder).
///
/// An empty key suppresses the matching leading token of a record line.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EncoderOptions {
    pub time_key: String,
    pub level_key: String,
    pub message_key: String,
    pub initial_capacity: usize,
}

impl Default for EncoderOptions {
    fn default() -> Self {
        EncoderOptions {
            time_key: DEFAULT_TIME_KEY.to_string(),
            level_key: DEFAULT_LEVEL_KEY.to_string(),
            message_key: DEFAULT_MESSAGE_KEY.to_string(),
            initial_capacity: DEFAULT_INITIAL_CAPACITY,
        }
    }
}

impl EncoderOptions {
    /// Creates default options (`ts`, `level`, `msg`, 1 KiB buffers).
    ///
    /// # Examples
    ///
    /// ```rust
    /// use logfmt_encoder::EncoderOptions;
    ///
    /// let options = EncoderOptions::new();
    /// assert_eq!(options.time_key, "ts");
    /// assert_eq!(options.level_key, "level");
    /// assert_eq!(options.message_key, "msg");
    /// ```
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the key of the timestamp token. Empty disables the token.
    #[must_use]
    pub fn with_time_key(mut self, key: impl Into<String>) -> Self {
        self.time_key = key.into();
        self
    }

    /// Sets the key of the level token. Empty disables the token.
    #[must_use]
    pub fn with_level_key(mut self, key: impl Into<String>) -> Self {
        self.level_key = key.into();
        self
    }

    /// Sets the key of the message token. Empty disables the token.
    #[must_use]
    pub fn with_message_key(mut self, key: impl Into<String>) -> Self {
        self.message_key = key.into();
        self
    }

    /// Sets the capacity reserved for a freshly allocated buffer.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use logfmt_encoder::EncoderOptions;
    ///
    /// let options = EncoderOptions::new().with_initial_capacity(256);
    /// assert_eq!(options.initial_capacity, 256);
    /// ```
    #[must_use]
    pub fn with_initial_capacity(mut self, capacity: usize) -> Self {
        self.initial_capacity = capacity;
        self
    }
}
