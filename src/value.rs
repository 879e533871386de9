//! Dynamic field values.
//!
//! [`Value`] is the bridge between serde and the encoder: any `Serialize` type
//! is first converted into a `Value` (see [`to_value`](crate::to_value)), then
//! written with the same rules as the typed `add_*` calls. Objects keep their
//! field order through an [`IndexMap`].
//!
//! ```rust
//! use logfmt_encoder::{Encoder, Map, Value};
//!
//! let mut fields = Map::new();
//! fields.insert("user".to_string(), Value::from("ford"));
//! fields.insert("retries".to_string(), Value::from(3));
//!
//! let mut enc = Encoder::default();
//! Value::Object(fields).add_to("ctx", &mut enc).unwrap();
//! assert_eq!(enc.as_str(), Some(r#"ctx="user=ford retries=3""#));
//! ```

use crate::encoder::{ArrayElement, ArrayEncoder, MarshalObject, ObjectEncoder};
use crate::{Error, Result};
use indexmap::IndexMap;

/// Ordered string-keyed fields of an object value.
pub type Map = IndexMap<String, Value>;

/// A dynamically-typed field value.
#[derive(Clone, Debug, PartialEq, Default)]
pub enum Value {
    #[default]
    Null,
    Bool(bool),
    Int(i64),
    Uint(u64),
    Float(f64),
    String(String),
    Array(Vec<Value>),
    Object(Map),
}

impl Value {
    #[inline]
    #[must_use]
    pub const fn is_object(&self) -> bool {
        matches!(self, Value::Object(_))
    }

    /// Writes this value as the token `key=...`.
    ///
    /// `Null` renders as the bare word `null`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnsupportedType`] when an array holds an object.
    pub fn add_to(&self, key: &str, enc: &mut dyn ObjectEncoder) -> Result<()> {
        match self {
            Value::Null => enc.add_string(key, "null"),
            Value::Bool(b) => enc.add_bool(key, *b),
            Value::Int(i) => enc.add_i64(key, *i),
            Value::Uint(u) => enc.add_u64(key, *u),
            Value::Float(f) => enc.add_f64(key, *f),
            Value::String(s) => enc.add_string(key, s),
            Value::Array(items) => return enc.add_array(key, items),
            Value::Object(map) => return enc.add_object(key, &Fields(map)),
        }
        Ok(())
    }
}

struct Fields<'a>(&'a Map);

impl MarshalObject for Fields<'_> {
    fn marshal_object(&self, enc: &mut dyn ObjectEncoder) -> Result<()> {
        self.0
            .iter()
            .try_for_each(|(key, value)| value.add_to(key, enc))
    }
}

/// An object value writes its fields directly; anything else has no
/// top-level token form.
impl MarshalObject for Value {
    fn marshal_object(&self, enc: &mut dyn ObjectEncoder) -> Result<()> {
        match self {
            Value::Object(map) => Fields(map).marshal_object(enc),
            _ => Err(Error::unsupported_type(
                "only structs and maps can be encoded as a field list",
            )),
        }
    }
}

impl ArrayElement for Value {
    fn append_to(&self, enc: &mut dyn ArrayEncoder) -> Result<()> {
        match self {
            Value::Null => enc.append_string("null"),
            Value::Bool(b) => enc.append_bool(*b),
            Value::Int(i) => enc.append_i64(*i),
            Value::Uint(u) => enc.append_u64(*u),
            Value::Float(f) => enc.append_f64(*f),
            Value::String(s) => enc.append_string(s),
            Value::Array(items) => return enc.append_array(items),
            Value::Object(map) => return enc.append_object(&Fields(map)),
        }
        Ok(())
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::Int(i64::from(v))
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Int(v)
    }
}

impl From<u64> for Value {
    fn from(v: u64) -> Self {
        Value::Uint(v)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Float(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::String(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::String(v)
    }
}

impl<T: Into<Value>> From<Vec<T>> for Value {
    fn from(v: Vec<T>) -> Self {
        Value::Array(v.into_iter().map(Into::into).collect())
    }
}

impl From<Map> for Value {
    fn from(v: Map) -> Self {
        Value::Object(v)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map_or(Value::Null, Into::into)
    }
}
