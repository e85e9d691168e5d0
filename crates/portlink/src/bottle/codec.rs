// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Binary wire codec for [`Bottle`].
//!
//! Encoding is deterministic: the same value sequence always produces the
//! same bytes. Lists whose items all share one primitive tag are
//! "specialized": the common tag is folded into the list tag and per-item
//! tags are omitted.

use super::cursor::{Cursor, WireWriter};
use super::{Bottle, CodecError, Value, Vocab};

pub const TAG_INT32: i32 = 1;
pub const TAG_STRING: i32 = 4;
pub const TAG_VOCAB32: i32 = 1 + 8;
pub const TAG_FLOAT64: i32 = 2 + 8;
pub const TAG_BLOB: i32 = 4 + 8;
pub const TAG_INT64: i32 = 1 + 16;
pub const TAG_INT8: i32 = 32;
pub const TAG_INT16: i32 = 64;
pub const TAG_FLOAT32: i32 = 128;
pub const TAG_LIST: i32 = 256;
/// Dictionaries are not produced by this codec; the bit is only masked.
const TAG_DICT: i32 = 512;

const UNIT_MASK: i32 = TAG_INT8
    | TAG_INT16
    | TAG_INT32
    | TAG_INT64
    | TAG_FLOAT32
    | TAG_FLOAT64
    | TAG_VOCAB32
    | TAG_STRING
    | TAG_BLOB;
const GROUP_MASK: i32 = TAG_LIST | TAG_DICT;

/// Maximum list nesting accepted by the encoder and the decoder.
pub const MAX_DEPTH: usize = 64;

pub(super) fn tag_of(value: &Value) -> i32 {
    match value {
        Value::List(inner) => TAG_LIST | specialization(inner),
        unit => unit_tag(unit).unwrap_or(TAG_LIST),
    }
}

/// Tag of a non-list value; `None` for lists.
fn unit_tag(value: &Value) -> Option<i32> {
    Some(match value {
        Value::Int8(_) => TAG_INT8,
        Value::Int16(_) => TAG_INT16,
        Value::Int32(_) => TAG_INT32,
        Value::Int64(_) => TAG_INT64,
        Value::Float32(_) => TAG_FLOAT32,
        Value::Float64(_) => TAG_FLOAT64,
        Value::Vocab32(_) => TAG_VOCAB32,
        Value::String(_) => TAG_STRING,
        Value::Blob(_) => TAG_BLOB,
        Value::List(_) => return None,
    })
}

/// Lists never specialize, so this only looks one level down.
pub(super) fn specialization(bottle: &Bottle) -> i32 {
    let mut iter = bottle.iter().map(unit_tag);
    let Some(Some(first)) = iter.next() else {
        return 0;
    };
    if iter.all(|tag| tag == Some(first)) {
        first
    } else {
        0
    }
}

fn is_unit_tag(tag: i32) -> bool {
    matches!(
        tag,
        TAG_INT8
            | TAG_INT16
            | TAG_INT32
            | TAG_INT64
            | TAG_FLOAT32
            | TAG_FLOAT64
            | TAG_VOCAB32
            | TAG_STRING
            | TAG_BLOB
    )
}

pub(super) fn encode(bottle: &Bottle) -> Result<Vec<u8>, CodecError> {
    let mut w = WireWriter::with_capacity(8 + bottle.len() * 8);
    let spec = specialization(bottle);
    w.put_i32(TAG_LIST | spec);
    write_list_body(&mut w, bottle, spec, 1)?;
    Ok(w.into_inner())
}

fn write_list_body(
    w: &mut WireWriter,
    bottle: &Bottle,
    spec: i32,
    depth: usize,
) -> Result<(), CodecError> {
    if depth > MAX_DEPTH {
        return Err(CodecError::TooDeep { limit: MAX_DEPTH });
    }
    let count = i32::try_from(bottle.len()).map_err(|_| CodecError::InvalidLength {
        offset: w.len(),
        len: i64::try_from(bottle.len()).unwrap_or(i64::MAX),
    })?;
    w.put_i32(count);
    for item in bottle {
        if spec == 0 {
            w.put_i32(tag_of(item));
        }
        write_payload(w, item, depth)?;
    }
    Ok(())
}

fn write_payload(w: &mut WireWriter, value: &Value, depth: usize) -> Result<(), CodecError> {
    match value {
        Value::Int8(v) => w.put_i8(*v),
        Value::Int16(v) => w.put_i16(*v),
        Value::Int32(v) => w.put_i32(*v),
        Value::Int64(v) => w.put_i64(*v),
        Value::Float32(v) => w.put_f32(*v),
        Value::Float64(v) => w.put_f64(*v),
        Value::Vocab32(v) => w.put_i32(v.0),
        Value::String(s) => w.put_block(s.as_bytes())?,
        Value::Blob(b) => w.put_block(b)?,
        Value::List(inner) => write_list_body(w, inner, specialization(inner), depth + 1)?,
    }
    Ok(())
}

pub(super) fn decode(data: &[u8]) -> Result<Bottle, CodecError> {
    let mut cursor = Cursor::new(data);
    let top = cursor.read_i32()?;
    if top & GROUP_MASK != TAG_LIST || top & !GROUP_MASK & !UNIT_MASK != 0 {
        return Err(CodecError::UnknownTag {
            offset: 0,
            tag: top,
        });
    }
    let spec = top & UNIT_MASK;
    if spec != 0 && !is_unit_tag(spec) {
        return Err(CodecError::UnknownTag {
            offset: 0,
            tag: top,
        });
    }
    let bottle = read_list_body(&mut cursor, spec, 1)?;
    if !cursor.is_eof() {
        return Err(CodecError::TrailingBytes {
            offset: cursor.offset(),
        });
    }
    Ok(bottle)
}

fn read_list_body(cursor: &mut Cursor<'_>, spec: i32, depth: usize) -> Result<Bottle, CodecError> {
    if depth > MAX_DEPTH {
        return Err(CodecError::TooDeep { limit: MAX_DEPTH });
    }
    // Every item takes at least one byte, so a count beyond the remaining
    // input cannot be valid and would only inflate the allocation.
    let count = cursor.read_len()?;
    let mut items = Vec::with_capacity(count);
    for _ in 0..count {
        let tag = if spec == 0 { cursor.read_i32()? } else { spec };
        items.push(read_value(cursor, tag, depth)?);
    }
    Ok(items.into_iter().collect())
}

fn read_value(cursor: &mut Cursor<'_>, tag: i32, depth: usize) -> Result<Value, CodecError> {
    let at = cursor.offset();
    let value = match tag {
        TAG_INT8 => Value::Int8(cursor.read_i8()?),
        TAG_INT16 => Value::Int16(cursor.read_i16()?),
        TAG_INT32 => Value::Int32(cursor.read_i32()?),
        TAG_INT64 => Value::Int64(cursor.read_i64()?),
        TAG_FLOAT32 => Value::Float32(cursor.read_f32()?),
        TAG_FLOAT64 => Value::Float64(cursor.read_f64()?),
        TAG_VOCAB32 => Value::Vocab32(Vocab(cursor.read_i32()?)),
        TAG_STRING => {
            let raw = cursor.read_block()?;
            let s = std::str::from_utf8(raw).map_err(|_| CodecError::InvalidUtf8 { offset: at })?;
            Value::String(s.to_string())
        }
        TAG_BLOB => Value::Blob(cursor.read_block()?.to_vec()),
        t if t & GROUP_MASK == TAG_LIST && (t & !GROUP_MASK & !UNIT_MASK) == 0 => {
            let sub = t & UNIT_MASK;
            if sub != 0 && !is_unit_tag(sub) {
                return Err(CodecError::UnknownTag { offset: at, tag: t });
            }
            Value::List(read_list_body(cursor, sub, depth + 1)?)
        }
        other => {
            return Err(CodecError::UnknownTag {
                offset: at,
                tag: other,
            })
        }
    };
    Ok(value)
}
