//! # logfmt_encoder
//!
//! A structured-log field encoder for the `logfmt` convention: one record per
//! line, space-separated `key=value` tokens, values quoted and escaped only
//! when they have to be.
//!
//! ```text
//! ts=2024-01-15T10:30:00.123Z level=warn msg="hitchhiker discovered" identity="first=Arthur last=Dent age=42"
//! ```
//!
//! ## Key Features
//!
//! - **Minimal quoting**: values are written bare unless they contain a space,
//!   a control byte, `=`, `"` or invalid UTF-8
//! - **Injection-safe**: a quoted value can never end early, so user input
//!   cannot forge a `key=` boundary or split a line
//! - **Nested values**: objects flatten into one quoted sub-document, arrays
//!   into a bracketed comma list
//! - **Pooled buffers**: encoders are recycled through an [`EncoderPool`], so
//!   steady-state logging does not allocate per record
//! - **Serde compatible**: any `Serialize` value can be added as a field
//! - **`tracing` backend**: [`LogfmtLayer`] plugs into `tracing_subscriber`
//!
//! ## Quick Start
//!
//! ```rust
//! use std::sync::Arc;
//! use logfmt_encoder::{
//!     Encoder, EncoderOptions, EncoderPool, Entry, EntryAssembler, Level, ObjectEncoder,
//! };
//!
//! let options = EncoderOptions::new().with_time_key("");
//! let pool = Arc::new(EncoderPool::new(options.clone()));
//! let assembler = EntryAssembler::new(Arc::clone(&pool));
//!
//! let mut fields = Encoder::new(options);
//! fields.add_string("user", "arthur");
//! fields.add_i64("attempt", 3);
//!
//! let mut out = Vec::new();
//! assembler
//!     .write_entry(Some(&mut out), &Entry::new(Level::Warn, "login failed"), &fields)
//!     .unwrap();
//! assert_eq!(out, b"level=warn msg=\"login failed\" user=arthur attempt=3\n");
//! ```
//!
//! ## Value Rendering
//!
//! | Type | Rendering | Example |
//! |------|-----------|---------|
//! | Bool | `true` / `false` | `ok=true` |
//! | Integer | base 10 | `n=-7` |
//! | Float | `%g`, 3 significant digits | `ratio=3.14`, `big=1.23e+05` |
//! | String | bare or quoted | `name=Arthur`, `name="Arthur Dent"` |
//! | Time | RFC 3339, nanoseconds | `at=2024-01-15T10:30:00.5Z` |
//! | Object | quoted token list | `who="first=Arthur age=42"` |
//! | Array | bracketed, comma-separated | `ids=[1,2,3]` |
//!
//! Floats are deliberately rounded to three significant digits; use a string
//! field when full precision matters.
//!
//! ## Safety Guarantees
//!
//! - No `unsafe` code blocks
//! - Escaping and number formatting are total: they never fail or panic
//! - A failed nested add leaves the encoder exactly as it was

pub mod buffer;
pub mod encoder;
pub mod entry;
pub mod error;
pub mod escape;
pub mod format;
pub mod layer;
pub mod options;
pub mod pool;
pub mod ser;
pub mod value;

pub use buffer::FieldBuffer;
pub use encoder::{
    ArrayElement, ArrayEncoder, Encoder, MarshalArray, MarshalObject, ObjectEncoder,
};
pub use entry::{encode_entry, Entry, EntryAssembler, Level};
pub use error::{Error, Result};
pub use layer::LogfmtLayer;
pub use options::EncoderOptions;
pub use pool::{EncoderPool, PoolStats, PooledEncoder};
pub use ser::{to_value, ValueSerializer};
pub use value::{Map, Value};

use serde::Serialize;
use std::io;

/// Encode the fields of any struct or string-keyed map as a logfmt token list.
///
/// # Examples
///
/// ```rust
/// use logfmt_encoder::to_string;
/// use serde::Serialize;
///
/// #[derive(Serialize)]
/// struct Request { method: &'static str, path: &'static str, status: u16 }
///
/// let line = to_string(&Request { method: "GET", path: "/index.html", status: 200 }).unwrap();
/// assert_eq!(line, "method=GET path=/index.html status=200");
/// ```
///
/// # Errors
///
/// Returns [`Error::UnsupportedType`] if `value` is not a struct or map, or
/// contains a form logfmt cannot express.
#[must_use = "this returns the result of the operation, errors must be handled"]
pub fn to_string<T>(value: &T) -> Result<String>
where
    T: ?Sized + Serialize,
{
    let mut encoder = Encoder::default();
    to_value(value)?.marshal_object(&mut encoder)?;
    Ok(String::from_utf8_lossy(encoder.as_bytes()).into_owned())
}

/// Encode the fields of any struct or map as one newline-terminated line.
///
/// # Errors
///
/// Returns an error if encoding fails or the writer fails.
#[must_use = "this returns the result of the operation, errors must be handled"]
pub fn to_writer<W, T>(mut writer: W, value: &T) -> Result<()>
where
    W: io::Write,
    T: ?Sized + Serialize,
{
    let mut line = to_string(value)?;
    line.push('\n');
    writer.write_all(line.as_bytes())?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    #[derive(Serialize)]
    struct User {
        id: u32,
        name: String,
        active: bool,
        tags: Vec<String>,
    }

    #[test]
    fn test_to_string_struct() {
        let user = User {
            id: 123,
            name: "Alice Smith".to_string(),
            active: true,
            tags: vec!["admin".to_string(), "on call".to_string()],
        };
        assert_eq!(
            to_string(&user).unwrap(),
            r#"id=123 name="Alice Smith" active=true tags=[admin,"on call"]"#
        );
    }

    #[test]
    fn test_to_string_map() {
        let mut map = BTreeMap::new();
        map.insert("b", 2);
        map.insert("a", 1);
        assert_eq!(to_string(&map).unwrap(), "a=1 b=2");
    }

    #[test]
    fn test_to_string_rejects_scalars() {
        let err = to_string(&5).unwrap_err();
        assert!(matches!(err, Error::UnsupportedType(_)));
    }

    #[test]
    fn test_to_writer_appends_newline() {
        let mut out = Vec::new();
        let mut map = BTreeMap::new();
        map.insert("k", "v");
        to_writer(&mut out, &map).unwrap();
        assert_eq!(out, b"k=v\n");
    }
}
