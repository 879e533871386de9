//! Error types for logfmt encoding and record writing.
//!
//! Encoding itself never fails: every string, number and timestamp has a
//! defined rendering. Errors come from three places only:
//!
//! - **The sink**: a missing sink, a failed write, or a short write
//! - **Nested values**: a nested form with no logfmt rendering (for example an
//!   object inside an array)
//! - **User marshalers**: [`MarshalObject`](crate::MarshalObject) and
//!   [`MarshalArray`](crate::MarshalArray) implementations, and serde
//!   `Serialize` impls, may bail out with a custom message
//!
//! ## Examples
//!
//! ```rust
//! use logfmt_encoder::Error;
//!
//! let err = Error::incomplete_write(3, 10);
//! assert_eq!(err.to_string(), "incomplete write: only wrote 3 of 10 bytes");
//! ```

use std::fmt;
use std::io;
use thiserror::Error;

/// Represents all possible errors raised while encoding fields or writing a record.
#[derive(Debug, Error)]
pub enum Error {
    /// `write_entry` was called without a sink.
    #[error("can't write encoded message to a nil sink")]
    NilSink,

    /// The sink reported an error. The original error is kept as the source.
    #[error(transparent)]
    Io(#[from] io::Error),

    /// The sink accepted fewer bytes than the record holds.
    #[error("incomplete write: only wrote {written} of {expected} bytes")]
    IncompleteWrite { written: usize, expected: usize },

    /// A nested value has no logfmt rendering.
    #[error("Unsupported type: {0}")]
    UnsupportedType(String),

    /// Custom error raised by a marshaler or a `Serialize` impl.
    #[error("Error: {0}")]
    Custom(String),
}

impl Error {
    /// Creates a short-write error carrying both byte counts.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use logfmt_encoder::Error;
    ///
    /// match Error::incomplete_write(4, 9) {
    ///     Error::IncompleteWrite { written, expected } => {
    ///         assert_eq!((written, expected), (4, 9));
    ///     }
    ///     _ => unreachable!(),
    /// }
    /// ```
    pub fn incomplete_write(written: usize, expected: usize) -> Self {
        Error::IncompleteWrite { written, expected }
    }

    /// Creates an unsupported type error for nested forms logfmt cannot express.
    pub fn unsupported_type(msg: &str) -> Self {
        Error::UnsupportedType(msg.to_string())
    }

    /// Creates a custom error with a display message.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use logfmt_encoder::Error;
    ///
    /// let err = Error::custom("missing user id");
    /// assert!(err.to_string().contains("missing user id"));
    /// ```
    pub fn custom<T: fmt::Display>(msg: T) -> Self {
        Error::Custom(msg.to_string())
    }

    /// Returns `true` if the error originated in the sink rather than the encoder.
    pub fn is_sink_error(&self) -> bool {
        matches!(
            self,
            Error::NilSink | Error::Io(_) | Error::IncompleteWrite { .. }
        )
    }
}

impl serde::ser::Error for Error {
    fn custom<T: fmt::Display>(msg: T) -> Self {
        Error::Custom(msg.to_string())
    }
}

pub type Result<T> = std::result::Result<T, Error>;
