// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! # Bottle messages
//!
//! A [`Bottle`] is the unit of exchange on a port: an ordered sequence of
//! typed, self-describing [`Value`]s. Field order is preserved through the
//! wire form, and the encoding can be decoded without any external schema.
//!
//! ## Example
//!
//! ```rust
//! use portlink::Bottle;
//!
//! let mut b = Bottle::new();
//! b.add_float64(1.5).add_string("hello");
//! let mut nested = Bottle::new();
//! nested.add_int32(1).add_int32(2);
//! b.add_list(nested);
//!
//! assert_eq!(b.to_string(), "1.5 hello (1 2)");
//!
//! let bytes = b.to_bytes()?;
//! assert_eq!(Bottle::from_bytes(&bytes)?, b);
//! # Ok::<(), portlink::bottle::CodecError>(())
//! ```
//!
//! ## Wire format
//!
//! ```text
//! i32 (TAG_LIST | spec)    spec = common item tag, or 0 when mixed
//! i32 count
//! count x { [i32 tag] payload }   tag omitted when spec != 0
//! ```

mod codec;
pub(crate) mod cursor;
mod text;
mod vocab;

pub use codec::{
    TAG_BLOB, TAG_FLOAT32, TAG_FLOAT64, TAG_INT16, TAG_INT32, TAG_INT64, TAG_INT8, TAG_LIST,
    TAG_STRING, TAG_VOCAB32,
};
pub use vocab::Vocab;

use std::fmt;

/// Codec failure while encoding or decoding the wire form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CodecError {
    /// Input ended before a complete value was read.
    Truncated { offset: usize },
    /// A type tag that no value kind maps to.
    UnknownTag { offset: usize, tag: i32 },
    /// A length prefix is negative or exceeds the remaining input.
    InvalidLength { offset: usize, len: i64 },
    /// Lists nested deeper than the decoder accepts.
    TooDeep { limit: usize },
    /// A string payload is not valid UTF-8.
    InvalidUtf8 { offset: usize },
    /// Bytes remained after the top-level value.
    TrailingBytes { offset: usize },
    /// A frame header carries inconsistent fields.
    InvalidHeader { reason: String },
}

impl fmt::Display for CodecError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CodecError::Truncated { offset } => write!(f, "truncated input at offset {}", offset),
            CodecError::UnknownTag { offset, tag } => {
                write!(f, "unknown tag {} at offset {}", tag, offset)
            }
            CodecError::InvalidLength { offset, len } => {
                write!(f, "invalid length {} at offset {}", len, offset)
            }
            CodecError::TooDeep { limit } => write!(f, "nesting deeper than {}", limit),
            CodecError::InvalidUtf8 { offset } => {
                write!(f, "string at offset {} is not UTF-8", offset)
            }
            CodecError::TrailingBytes { offset } => {
                write!(f, "trailing bytes after offset {}", offset)
            }
            CodecError::InvalidHeader { reason } => write!(f, "invalid header: {}", reason),
        }
    }
}

impl std::error::Error for CodecError {}

/// One typed field of a [`Bottle`].
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Int8(i8),
    Int16(i16),
    Int32(i32),
    Int64(i64),
    Float32(f32),
    Float64(f64),
    Vocab32(Vocab),
    String(String),
    Blob(Vec<u8>),
    List(Bottle),
}

impl Value {
    /// Boolean values travel as vocabs: `'1'` for true, 0 for false.
    #[must_use]
    pub fn from_bool(v: bool) -> Self {
        if v {
            Value::Vocab32(Vocab(i32::from(b'1')))
        } else {
            Value::Vocab32(Vocab(0))
        }
    }

    /// Wire tag of this value (lists include their specialization).
    #[must_use]
    pub fn tag(&self) -> i32 {
        codec::tag_of(self)
    }

    #[must_use]
    pub fn is_int(&self) -> bool {
        matches!(
            self,
            Value::Int8(_) | Value::Int16(_) | Value::Int32(_) | Value::Int64(_)
        )
    }

    #[must_use]
    pub fn is_float(&self) -> bool {
        matches!(self, Value::Float32(_) | Value::Float64(_))
    }

    /// Integer view of any numeric value (floats truncate).
    #[must_use]
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Int8(v) => Some(i64::from(*v)),
            Value::Int16(v) => Some(i64::from(*v)),
            Value::Int32(v) => Some(i64::from(*v)),
            Value::Int64(v) => Some(*v),
            Value::Float32(v) => Some(*v as i64),
            Value::Float64(v) => Some(*v as i64),
            Value::Vocab32(v) => Some(i64::from(v.0)),
            _ => None,
        }
    }

    /// Floating view of any numeric value.
    #[must_use]
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Float32(v) => Some(f64::from(*v)),
            Value::Float64(v) => Some(*v),
            Value::Int8(v) => Some(f64::from(*v)),
            Value::Int16(v) => Some(f64::from(*v)),
            Value::Int32(v) => Some(f64::from(*v)),
            Value::Int64(v) => Some(*v as f64),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Vocab32(v) if v.0 == 0 => Some(false),
            Value::Vocab32(v) if v.0 == i32::from(b'1') => Some(true),
            Value::String(s) if s == "true" => Some(true),
            Value::String(s) if s == "false" => Some(false),
            other => other.as_i64().map(|v| v != 0),
        }
    }

    #[must_use]
    pub fn as_list(&self) -> Option<&Bottle> {
        match self {
            Value::List(b) => Some(b),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_vocab(&self) -> Option<Vocab> {
        match self {
            Value::Vocab32(v) => Some(*v),
            _ => None,
        }
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::Int32(v)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Int64(v)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Float64(v)
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::from_bool(v)
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

impl From<Bottle> for Value {
    fn from(v: Bottle) -> Self {
        Value::List(v)
    }
}

/// Ordered sequence of typed values.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Bottle {
    items: Vec<Value>,
}

impl Bottle {
    #[must_use]
    pub fn new() -> Self {
        Self { items: Vec::new() }
    }

    /// Parse the text form (`1 2.5 "a b" (nested list) [vocb]`).
    #[must_use]
    pub fn from_text(text: &str) -> Self {
        Self {
            items: text::parse(text),
        }
    }

    /// Decode the binary wire form.
    pub fn from_bytes(data: &[u8]) -> Result<Self, CodecError> {
        codec::decode(data)
    }

    /// Encode to the binary wire form.
    pub fn to_bytes(&self) -> Result<Vec<u8>, CodecError> {
        codec::encode(self)
    }

    pub fn add(&mut self, value: impl Into<Value>) -> &mut Self {
        self.items.push(value.into());
        self
    }

    pub fn add_int8(&mut self, v: i8) -> &mut Self {
        self.add(Value::Int8(v))
    }

    pub fn add_int16(&mut self, v: i16) -> &mut Self {
        self.add(Value::Int16(v))
    }

    pub fn add_int32(&mut self, v: i32) -> &mut Self {
        self.add(Value::Int32(v))
    }

    pub fn add_int64(&mut self, v: i64) -> &mut Self {
        self.add(Value::Int64(v))
    }

    pub fn add_float32(&mut self, v: f32) -> &mut Self {
        self.add(Value::Float32(v))
    }

    pub fn add_float64(&mut self, v: f64) -> &mut Self {
        self.add(Value::Float64(v))
    }

    pub fn add_string(&mut self, v: impl Into<String>) -> &mut Self {
        self.add(Value::String(v.into()))
    }

    pub fn add_vocab(&mut self, v: impl Into<Vocab>) -> &mut Self {
        self.add(Value::Vocab32(v.into()))
    }

    pub fn add_blob(&mut self, v: impl Into<Vec<u8>>) -> &mut Self {
        self.add(Value::Blob(v.into()))
    }

    pub fn add_list(&mut self, v: Bottle) -> &mut Self {
        self.add(Value::List(v))
    }

    /// Append a new empty nested list and return it for filling.
    pub fn add_nested(&mut self) -> &mut Bottle {
        self.items.push(Value::List(Bottle::new()));
        match self.items.last_mut() {
            Some(Value::List(b)) => b,
            _ => unreachable!("just pushed a list"),
        }
    }

    #[must_use]
    pub fn get(&self, index: usize) -> Option<&Value> {
        self.items.get(index)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn clear(&mut self) {
        self.items.clear();
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Value> {
        self.items.iter()
    }

    /// Property-style lookup: the value following the first string `key`
    /// at top level, or the rest of a nested `(key value)` group.
    #[must_use]
    pub fn find(&self, key: &str) -> Option<&Value> {
        let mut iter = self.items.iter();
        while let Some(item) = iter.next() {
            match item {
                Value::String(s) if s == key => return iter.next(),
                Value::List(group) => {
                    if group.get(0).and_then(Value::as_str) == Some(key) {
                        return group.get(1);
                    }
                }
                _ => {}
            }
        }
        None
    }

    /// Nested list whose first element is `key`.
    #[must_use]
    pub fn find_group(&self, key: &str) -> Option<&Bottle> {
        self.items.iter().find_map(|item| match item {
            Value::List(group) if group.get(0).and_then(Value::as_str) == Some(key) => {
                Some(group)
            }
            _ => None,
        })
    }

    /// Common tag of all items, when the list can be specialized on the wire.
    #[must_use]
    pub fn specialization(&self) -> i32 {
        codec::specialization(self)
    }
}

impl fmt::Display for Bottle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&text::render(self))
    }
}

impl std::str::FromStr for Bottle {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Bottle::from_text(s))
    }
}

impl FromIterator<Value> for Bottle {
    fn from_iter<I: IntoIterator<Item = Value>>(iter: I) -> Self {
        Self {
            items: iter.into_iter().collect(),
        }
    }
}

impl<'a> IntoIterator for &'a Bottle {
    type Item = &'a Value;
    type IntoIter = std::slice::Iter<'a, Value>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.iter()
    }
}

impl crate::port::Portable for Bottle {
    fn encode(&self) -> crate::Result<Vec<u8>> {
        Ok(self.to_bytes()?)
    }

    fn decode(data: &[u8]) -> crate::Result<Self> {
        Ok(Self::from_bytes(data)?)
    }
}
