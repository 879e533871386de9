//! Token accumulation for one record or one nested value.
//!
//! A [`FieldBuffer`] is an append-only byte sequence of `key=value` tokens.
//! Every token is preceded by a single space unless the buffer is empty, so a
//! buffer never has leading or trailing spaces, and it is empty exactly when
//! nothing was added since the last [`reset`](FieldBuffer::reset).

use crate::escape;
use crate::format;

/// The growable byte buffer behind an [`Encoder`](crate::Encoder).
#[derive(Debug, Default, PartialEq, Eq)]
pub struct FieldBuffer {
    bytes: Vec<u8>,
}

impl FieldBuffer {
    pub fn new() -> Self {
        FieldBuffer { bytes: Vec::new() }
    }

    pub fn with_capacity(capacity: usize) -> Self {
        FieldBuffer {
            bytes: Vec::with_capacity(capacity),
        }
    }

    /// Starts a new token: a separating space if needed, then `key=`.
    #[inline]
    pub fn add_key(&mut self, key: &str) {
        self.separate(b' ');
        self.bytes.extend_from_slice(key.as_bytes());
        self.bytes.push(b'=');
    }

    /// Pushes `separator` unless the buffer is empty.
    #[inline]
    pub(crate) fn separate(&mut self, separator: u8) {
        if !self.bytes.is_empty() {
            self.bytes.push(separator);
        }
    }

    #[inline]
    pub(crate) fn push(&mut self, byte: u8) {
        self.bytes.push(byte);
    }

    #[inline]
    pub(crate) fn extend(&mut self, bytes: &[u8]) {
        self.bytes.extend_from_slice(bytes);
    }

    /// Appends a value through the escaper.
    #[inline]
    pub(crate) fn push_value(&mut self, value: &[u8]) {
        escape::write_value(&mut self.bytes, value);
    }

    #[inline]
    pub(crate) fn push_bool(&mut self, value: bool) {
        self.extend(if value { b"true" } else { b"false" });
    }

    #[inline]
    pub(crate) fn push_i64(&mut self, value: i64) {
        format::write_i64(&mut self.bytes, value);
    }

    #[inline]
    pub(crate) fn push_u64(&mut self, value: u64) {
        format::write_u64(&mut self.bytes, value);
    }

    #[inline]
    pub(crate) fn push_f64(&mut self, value: f64) {
        format::write_f64(&mut self.bytes, value);
    }

    pub(crate) fn bytes_mut(&mut self) -> &mut Vec<u8> {
        &mut self.bytes
    }

    /// Drops every token but keeps the allocation.
    #[inline]
    pub fn reset(&mut self) {
        self.bytes.clear();
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.bytes.capacity()
    }
}

impl Clone for FieldBuffer {
    /// Copies the tokens into an allocation at least as large as the source's.
    fn clone(&self) -> Self {
        let mut bytes = Vec::with_capacity(self.bytes.capacity());
        bytes.extend_from_slice(&self.bytes);
        FieldBuffer { bytes }
    }

    fn clone_from(&mut self, source: &Self) {
        self.bytes.clear();
        self.bytes.reserve(source.bytes.capacity());
        self.bytes.extend_from_slice(&source.bytes);
    }
}
