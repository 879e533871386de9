//! The typed-field encoder.
//!
//! [`Encoder`] turns typed key/value pairs into logfmt tokens, in call order.
//! Scalars are rendered directly. Nested values go through two capability
//! traits that user types implement:
//!
//! - [`MarshalObject`]: the value writes its own `key=value` tokens into a
//!   child encoder; the child's text becomes one quoted value,
//!   `key="a=1 b=2"`
//! - [`MarshalArray`]: the value appends bare elements; they are joined with
//!   commas and wrapped in brackets, `key=[1,2,3]`. Each element is quoted on
//!   its own when unsafe; the brackets are never quoted.
//!
//! ## Examples
//!
//! ```rust
//! use logfmt_encoder::{Encoder, MarshalObject, ObjectEncoder, Result};
//!
//! struct Person {
//!     first: &'static str,
//!     last: &'static str,
//!     age: i64,
//! }
//!
//! impl MarshalObject for Person {
//!     fn marshal_object(&self, enc: &mut dyn ObjectEncoder) -> Result<()> {
//!         enc.add_string("first", self.first);
//!         enc.add_string("last", self.last);
//!         enc.add_i64("age", self.age);
//!         Ok(())
//!     }
//! }
//!
//! let mut enc = Encoder::default();
//! let person = Person { first: "Arthur", last: "Dent", age: 42 };
//! enc.add_object("identity", &person).unwrap();
//! enc.add_array("values", &[0, 1, 2, 3]).unwrap();
//! assert_eq!(
//!     enc.as_str(),
//!     Some(r#"identity="first=Arthur last=Dent age=42" values=[0,1,2,3]"#),
//! );
//! ```

use crate::buffer::FieldBuffer;
use crate::escape;
use crate::format;
use crate::{EncoderOptions, Error, Result};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fmt::{self, Display};
use std::sync::Arc;

/// Sink for `key=value` tokens. Implemented by [`Encoder`]; handed to
/// [`MarshalObject`] implementations.
pub trait ObjectEncoder {
    fn add_string(&mut self, key: &str, value: &str);

    /// Adds a string that may not be valid UTF-8.
    fn add_byte_string(&mut self, key: &str, value: &[u8]);

    fn add_bool(&mut self, key: &str, value: bool);

    fn add_i64(&mut self, key: &str, value: i64);

    fn add_u64(&mut self, key: &str, value: u64);

    /// Adds a float with three significant digits. See [`format::write_f64`].
    fn add_f64(&mut self, key: &str, value: f64);

    /// Adds a pointer-sized unsigned value as a decimal number.
    fn add_uintptr(&mut self, key: &str, value: usize);

    /// Adds a timestamp in RFC 3339 with nanoseconds.
    fn add_time(&mut self, key: &str, value: &DateTime<Utc>);

    /// Adds a nested object as one quoted value.
    ///
    /// # Errors
    ///
    /// Returns whatever the marshaler returns. The encoder is left unchanged.
    fn add_object(&mut self, key: &str, object: &dyn MarshalObject) -> Result<()>;

    /// Adds a bracketed, comma-separated list.
    ///
    /// # Errors
    ///
    /// Returns whatever the marshaler returns, or [`Error::UnsupportedType`]
    /// when an element is an object. The encoder is left unchanged.
    fn add_array(&mut self, key: &str, array: &dyn MarshalArray) -> Result<()>;

    /// Adds any `Display` value as a string.
    fn add_display(&mut self, key: &str, value: &dyn Display) {
        self.add_string(key, &value.to_string());
    }

    fn add_i32(&mut self, key: &str, value: i32) {
        self.add_i64(key, i64::from(value));
    }

    fn add_u32(&mut self, key: &str, value: u32) {
        self.add_u64(key, u64::from(value));
    }

    fn add_f32(&mut self, key: &str, value: f32) {
        self.add_f64(key, f64::from(value));
    }
}

/// Sink for the elements of a bracketed list. Handed to [`MarshalArray`]
/// implementations.
pub trait ArrayEncoder {
    fn append_string(&mut self, value: &str);

    fn append_byte_string(&mut self, value: &[u8]);

    fn append_bool(&mut self, value: bool);

    fn append_i64(&mut self, value: i64);

    fn append_u64(&mut self, value: u64);

    fn append_f64(&mut self, value: f64);

    /// Appends a nested list, `[[1,2],[3]]`.
    fn append_array(&mut self, array: &dyn MarshalArray) -> Result<()>;

    /// Objects have no rendering inside a list.
    ///
    /// # Errors
    ///
    /// Always returns [`Error::UnsupportedType`].
    fn append_object(&mut self, _object: &dyn MarshalObject) -> Result<()> {
        Err(Error::unsupported_type("object inside an array"))
    }
}

/// A value that knows how to write its own fields.
pub trait MarshalObject {
    fn marshal_object(&self, enc: &mut dyn ObjectEncoder) -> Result<()>;
}

/// A value that knows how to write its own elements.
pub trait MarshalArray {
    fn marshal_array(&self, enc: &mut dyn ArrayEncoder) -> Result<()>;
}

impl<T: MarshalObject + ?Sized> MarshalObject for &T {
    fn marshal_object(&self, enc: &mut dyn ObjectEncoder) -> Result<()> {
        (**self).marshal_object(enc)
    }
}

impl<T: MarshalArray + ?Sized> MarshalArray for &T {
    fn marshal_array(&self, enc: &mut dyn ArrayEncoder) -> Result<()> {
        (**self).marshal_array(enc)
    }
}

/// A single list element. Implemented for the scalar types and for nested
/// slices and vectors, which gives every `[T]`, `[T; N]` and `Vec<T>` of them
/// a [`MarshalArray`] impl.
pub trait ArrayElement {
    fn append_to(&self, enc: &mut dyn ArrayEncoder) -> Result<()>;
}

macro_rules! array_element {
    ($($ty:ty => |$enc:ident, $v:ident| $body:expr;)*) => {
        $(
            impl ArrayElement for $ty {
                fn append_to(&self, $enc: &mut dyn ArrayEncoder) -> Result<()> {
                    let $v = self;
                    $body;
                    Ok(())
                }
            }
        )*
    };
}

array_element! {
    bool => |enc, v| enc.append_bool(*v);
    i8 => |enc, v| enc.append_i64(i64::from(*v));
    i16 => |enc, v| enc.append_i64(i64::from(*v));
    i32 => |enc, v| enc.append_i64(i64::from(*v));
    i64 => |enc, v| enc.append_i64(*v);
    u8 => |enc, v| enc.append_u64(u64::from(*v));
    u16 => |enc, v| enc.append_u64(u64::from(*v));
    u32 => |enc, v| enc.append_u64(u64::from(*v));
    u64 => |enc, v| enc.append_u64(*v);
    usize => |enc, v| enc.append_u64(*v as u64);
    f32 => |enc, v| enc.append_f64(f64::from(*v));
    f64 => |enc, v| enc.append_f64(*v);
    str => |enc, v| enc.append_string(v);
    String => |enc, v| enc.append_string(v);
}

impl<T: ArrayElement + ?Sized> ArrayElement for &T {
    fn append_to(&self, enc: &mut dyn ArrayEncoder) -> Result<()> {
        (**self).append_to(enc)
    }
}

impl<T: ArrayElement> ArrayElement for [T] {
    fn append_to(&self, enc: &mut dyn ArrayEncoder) -> Result<()> {
        enc.append_array(&self)
    }
}

impl<T: ArrayElement> ArrayElement for Vec<T> {
    fn append_to(&self, enc: &mut dyn ArrayEncoder) -> Result<()> {
        enc.append_array(&self.as_slice())
    }
}

impl<T: ArrayElement> MarshalArray for [T] {
    fn marshal_array(&self, enc: &mut dyn ArrayEncoder) -> Result<()> {
        self.iter().try_for_each(|element| element.append_to(enc))
    }
}

impl<T: ArrayElement, const N: usize> MarshalArray for [T; N] {
    fn marshal_array(&self, enc: &mut dyn ArrayEncoder) -> Result<()> {
        self.as_slice().marshal_array(enc)
    }
}

impl<T: ArrayElement> MarshalArray for Vec<T> {
    fn marshal_array(&self, enc: &mut dyn ArrayEncoder) -> Result<()> {
        self.as_slice().marshal_array(enc)
    }
}

/// Encodes typed fields into a logfmt token list.
///
/// An encoder owns its buffer exclusively; share work across threads by giving
/// each record its own encoder, usually from an
/// [`EncoderPool`](crate::EncoderPool).
///
/// Cloning copies the tokens into an independent buffer of at least the same
/// capacity and shares the (immutable) options.
pub struct Encoder {
    buffer: FieldBuffer,
    options: Arc<EncoderOptions>,
    // Child encoder for nested objects, kept so pooled encoders stay warm.
    scratch: Option<Box<Encoder>>,
}

impl Encoder {
    pub fn new(options: EncoderOptions) -> Self {
        Encoder::with_shared_options(Arc::new(options))
    }

    pub fn with_shared_options(options: Arc<EncoderOptions>) -> Self {
        Encoder {
            buffer: FieldBuffer::with_capacity(options.initial_capacity),
            options,
            scratch: None,
        }
    }

    /// An encoder with no buffer allocation yet.
    pub(crate) fn detached(options: Arc<EncoderOptions>) -> Self {
        Encoder {
            buffer: FieldBuffer::new(),
            options,
            scratch: None,
        }
    }

    pub fn options(&self) -> &EncoderOptions {
        &self.options
    }

    pub(crate) fn shared_options(&self) -> &Arc<EncoderOptions> {
        &self.options
    }

    pub(crate) fn set_shared_options(&mut self, options: Arc<EncoderOptions>) {
        self.options = options;
    }

    pub fn buffer(&self) -> &FieldBuffer {
        &self.buffer
    }

    pub(crate) fn buffer_mut(&mut self) -> &mut FieldBuffer {
        &mut self.buffer
    }

    /// The encoded tokens.
    pub fn as_bytes(&self) -> &[u8] {
        self.buffer.as_bytes()
    }

    /// The encoded tokens as text.
    ///
    /// Keys are `&str` and values go through the escaper, so this is `Some`
    /// for anything built through the public API.
    pub fn as_str(&self) -> Option<&str> {
        std::str::from_utf8(self.buffer.as_bytes()).ok()
    }

    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    /// Drops every token, keeping the buffer's allocation.
    pub fn reset(&mut self) {
        self.buffer.reset();
    }

    /// Adds any `Serialize` value. Structs and string-keyed maps become
    /// objects, sequences and tuples become arrays, `None` and `()` become
    /// `null`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnsupportedType`] for forms logfmt cannot express
    /// (objects inside arrays, non-string map keys) and propagates errors
    /// raised by the `Serialize` impl. The encoder is left unchanged.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use logfmt_encoder::Encoder;
    /// use serde::Serialize;
    ///
    /// #[derive(Serialize)]
    /// struct Request { method: &'static str, path: &'static str }
    ///
    /// let mut enc = Encoder::default();
    /// enc.add_reflected("req", &Request { method: "GET", path: "/" }).unwrap();
    /// enc.add_reflected("ids", &vec![7, 8]).unwrap();
    /// assert_eq!(enc.as_str(), Some(r#"req="method=GET path=/" ids=[7,8]"#));
    /// ```
    pub fn add_reflected<T>(&mut self, key: &str, value: &T) -> Result<()>
    where
        T: ?Sized + Serialize,
    {
        let value = crate::ser::to_value(value)?;
        value.add_to(key, self)
    }

    fn take_scratch(&mut self) -> Box<Encoder> {
        let mut child = match self.scratch.take() {
            Some(child) => child,
            None => Box::new(Encoder::detached(Arc::clone(&self.options))),
        };
        child.reset();
        child
    }

    /// Runs `write` and rolls the buffer back if it fails.
    fn transactional<F>(&mut self, write: F) -> Result<()>
    where
        F: FnOnce(&mut Self) -> Result<()>,
    {
        let mark = self.buffer.len();
        let result = write(self);
        if result.is_err() {
            self.buffer.bytes_mut().truncate(mark);
        }
        result
    }
}

impl Default for Encoder {
    fn default() -> Self {
        Encoder::new(EncoderOptions::default())
    }
}

impl Clone for Encoder {
    fn clone(&self) -> Self {
        Encoder {
            buffer: self.buffer.clone(),
            options: Arc::clone(&self.options),
            scratch: None,
        }
    }

    fn clone_from(&mut self, source: &Self) {
        self.buffer.clone_from(&source.buffer);
        self.options = Arc::clone(&source.options);
    }
}

impl fmt::Debug for Encoder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Encoder")
            .field("fields", &String::from_utf8_lossy(self.buffer.as_bytes()))
            .field("options", &self.options)
            .finish()
    }
}

impl ObjectEncoder for Encoder {
    fn add_string(&mut self, key: &str, value: &str) {
        self.buffer.add_key(key);
        self.buffer.push_value(value.as_bytes());
    }

    fn add_byte_string(&mut self, key: &str, value: &[u8]) {
        self.buffer.add_key(key);
        self.buffer.push_value(value);
    }

    fn add_bool(&mut self, key: &str, value: bool) {
        self.buffer.add_key(key);
        self.buffer.push_bool(value);
    }

    fn add_i64(&mut self, key: &str, value: i64) {
        self.buffer.add_key(key);
        self.buffer.push_i64(value);
    }

    fn add_u64(&mut self, key: &str, value: u64) {
        self.buffer.add_key(key);
        self.buffer.push_u64(value);
    }

    fn add_f64(&mut self, key: &str, value: f64) {
        self.buffer.add_key(key);
        self.buffer.push_f64(value);
    }

    fn add_uintptr(&mut self, key: &str, value: usize) {
        self.add_u64(key, value as u64);
    }

    fn add_time(&mut self, key: &str, value: &DateTime<Utc>) {
        // RFC 3339 output never needs quoting
        self.buffer.add_key(key);
        format::write_rfc3339_nano(self.buffer.bytes_mut(), value);
    }

    fn add_display(&mut self, key: &str, value: &dyn Display) {
        let mut child = self.take_scratch();
        let rendered = fmt::write(
            &mut ByteWriter(child.buffer.bytes_mut()),
            format_args!("{value}"),
        );
        if rendered.is_ok() {
            self.add_byte_string(key, child.as_bytes());
        } else {
            self.add_string(key, "<Display error>");
        }
        self.scratch = Some(child);
    }

    fn add_object(&mut self, key: &str, object: &dyn MarshalObject) -> Result<()> {
        let mut child = self.take_scratch();
        let result = object.marshal_object(child.as_mut());
        if result.is_ok() {
            self.add_byte_string(key, child.as_bytes());
        }
        self.scratch = Some(child);
        result
    }

    fn add_array(&mut self, key: &str, array: &dyn MarshalArray) -> Result<()> {
        self.transactional(|enc| {
            enc.buffer.add_key(key);
            write_list(enc.buffer.bytes_mut(), array)
        })
    }
}

fn write_list(bytes: &mut Vec<u8>, array: &dyn MarshalArray) -> Result<()> {
    bytes.push(b'[');
    let mut list = ListWriter { bytes, first: true };
    array.marshal_array(&mut list)?;
    list.bytes.push(b']');
    Ok(())
}

/// Appends comma-separated elements straight into the parent buffer.
struct ListWriter<'a> {
    bytes: &'a mut Vec<u8>,
    first: bool,
}

impl ListWriter<'_> {
    #[inline]
    fn next(&mut self) -> &mut Vec<u8> {
        if self.first {
            self.first = false;
        } else {
            self.bytes.push(b',');
        }
        self.bytes
    }
}

impl ArrayEncoder for ListWriter<'_> {
    fn append_string(&mut self, value: &str) {
        escape::write_value(self.next(), value.as_bytes());
    }

    fn append_byte_string(&mut self, value: &[u8]) {
        escape::write_value(self.next(), value);
    }

    fn append_bool(&mut self, value: bool) {
        self.next()
            .extend_from_slice(if value { b"true" } else { b"false" });
    }

    fn append_i64(&mut self, value: i64) {
        format::write_i64(self.next(), value);
    }

    fn append_u64(&mut self, value: u64) {
        format::write_u64(self.next(), value);
    }

    fn append_f64(&mut self, value: f64) {
        format::write_f64(self.next(), value);
    }

    fn append_array(&mut self, array: &dyn MarshalArray) -> Result<()> {
        write_list(self.next(), array)
    }
}

pub(crate) struct ByteWriter<'a>(pub(crate) &'a mut Vec<u8>);

impl fmt::Write for ByteWriter<'_> {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        self.0.extend_from_slice(s.as_bytes());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Person {
        first: &'static str,
        last: &'static str,
        age: i64,
    }

    impl MarshalObject for Person {
        fn marshal_object(&self, enc: &mut dyn ObjectEncoder) -> Result<()> {
            enc.add_string("first", self.first);
            enc.add_string("last", self.last);
            enc.add_i64("age", self.age);
            Ok(())
        }
    }

    struct Team {
        name: &'static str,
        lead: Person,
    }

    impl MarshalObject for Team {
        fn marshal_object(&self, enc: &mut dyn ObjectEncoder) -> Result<()> {
            enc.add_string("name", self.name);
            enc.add_object("lead", &self.lead)
        }
    }

    struct Broken;

    impl MarshalObject for Broken {
        fn marshal_object(&self, enc: &mut dyn ObjectEncoder) -> Result<()> {
            enc.add_bool("partial", true);
            Err(Error::custom("boom"))
        }
    }

    struct People(Vec<Person>);

    impl MarshalArray for People {
        fn marshal_array(&self, enc: &mut dyn ArrayEncoder) -> Result<()> {
            self.0.iter().try_for_each(|p| enc.append_object(p))
        }
    }

    fn text(enc: &Encoder) -> &str {
        enc.as_str().unwrap()
    }

    #[test]
    fn test_scalars() {
        let mut enc = Encoder::default();
        enc.add_i64("n", -7);
        enc.add_u64("u", 7);
        enc.add_bool("b", true);
        enc.add_f64("f", 0.25);
        enc.add_string("s", "a b");
        assert_eq!(text(&enc), r#"n=-7 u=7 b=true f=0.25 s="a b""#);
    }

    #[test]
    fn test_uintptr_emits_value() {
        let mut enc = Encoder::default();
        enc.add_uintptr("addr", 0xdead);
        assert_eq!(text(&enc), "addr=57005");
    }

    #[test]
    fn test_nested_object() {
        let mut enc = Encoder::default();
        let person = Person {
            first: "Arthur",
            last: "Dent",
            age: 42,
        };
        enc.add_object("identity", &person).unwrap();
        assert_eq!(text(&enc), r#"identity="first=Arthur last=Dent age=42""#);
    }

    #[test]
    fn test_doubly_nested_object_escapes_inner_quotes() {
        let mut enc = Encoder::default();
        let team = Team {
            name: "hhgttg",
            lead: Person {
                first: "Ford",
                last: "Prefect",
                age: 200,
            },
        };
        enc.add_object("team", &team).unwrap();
        assert_eq!(
            text(&enc),
            r#"team="name=hhgttg lead=\"first=Ford last=Prefect age=200\"""#
        );
    }

    #[test]
    fn test_failed_object_leaves_buffer_unchanged() {
        let mut enc = Encoder::default();
        enc.add_i64("before", 1);
        assert!(enc.add_object("bad", &Broken).is_err());
        enc.add_i64("after", 2);
        assert_eq!(text(&enc), "before=1 after=2");
    }

    #[test]
    fn test_arrays() {
        let mut enc = Encoder::default();
        enc.add_array("values", &[0, 1, 2, 3]).unwrap();
        enc.add_array("empty", &Vec::<i64>::new()).unwrap();
        let names = ["ford", "zaphod beeblebrox"];
        enc.add_array("names", &names).unwrap();
        enc.add_array("grid", &vec![vec![1, 2], vec![3]]).unwrap();
        assert_eq!(
            text(&enc),
            r#"values=[0,1,2,3] empty=[] names=[ford,"zaphod beeblebrox"] grid=[[1,2],[3]]"#
        );
    }

    #[test]
    fn test_object_inside_array_is_unsupported() {
        let mut enc = Encoder::default();
        enc.add_string("k", "v");
        let people = People(vec![Person {
            first: "Arthur",
            last: "Dent",
            age: 42,
        }]);
        let err = enc.add_array("people", &people).unwrap_err();
        assert!(matches!(err, Error::UnsupportedType(_)));
        assert_eq!(text(&enc), "k=v");
    }

    #[test]
    fn test_display() {
        let mut enc = Encoder::default();
        enc.add_display("addr", &std::net::Ipv4Addr::LOCALHOST);
        enc.add_display("err", &"disk full");
        assert_eq!(text(&enc), r#"addr=127.0.0.1 err="disk full""#);
    }

    #[test]
    fn test_failing_display_is_replaced() {
        struct Unprintable;

        impl Display for Unprintable {
            fn fmt(&self, _: &mut fmt::Formatter<'_>) -> fmt::Result {
                Err(fmt::Error)
            }
        }

        let mut enc = Encoder::default();
        enc.add_display("v", &Unprintable);
        enc.add_display("n", &1);
        assert_eq!(text(&enc), r#"v="<Display error>" n=1"#);
    }

    #[test]
    fn test_clone_is_independent() {
        let mut original = Encoder::default();
        original.add_string("a", "1");
        let mut copy = original.clone();
        copy.add_string("b", "2");
        assert_eq!(text(&original), "a=1");
        assert_eq!(text(&copy), "a=1 b=2");
        assert_eq!(copy.options(), original.options());
    }
}
