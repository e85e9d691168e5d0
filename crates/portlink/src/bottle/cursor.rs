// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Little-endian read/write cursors for the message wire format.
//!

use super::CodecError;

/// Generate append methods for primitive types.
macro_rules! impl_put_le {
    ($name:ident, $type:ty) => {
        pub fn $name(&mut self, value: $type) {
            self.buffer.extend_from_slice(&value.to_le_bytes());
        }
    };
}

/// Generate bounds-checked read methods for primitive types.
///
/// Each generated method reports `CodecError::Truncated` with the offset at
/// which the read started when fewer than `$size` bytes remain.
macro_rules! impl_read_le {
    ($name:ident, $type:ty, $size:expr) => {
        pub fn $name(&mut self) -> Result<$type, CodecError> {
            let bytes = self.read_bytes($size)?;
            let mut raw = [0u8; $size];
            raw.copy_from_slice(bytes);
            Ok(<$type>::from_le_bytes(raw))
        }
    };
}

/// Append-only writer. Encoding never fails, the buffer grows as needed.
pub struct WireWriter {
    buffer: Vec<u8>,
}

impl WireWriter {
    pub fn new() -> Self {
        Self { buffer: Vec::new() }
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            buffer: Vec::with_capacity(capacity),
        }
    }

    impl_put_le!(put_i8, i8);
    impl_put_le!(put_i16, i16);
    impl_put_le!(put_i32, i32);
    impl_put_le!(put_i64, i64);
    impl_put_le!(put_f32, f32);
    impl_put_le!(put_f64, f64);

    /// Length-prefixed byte block (`i32 len` + bytes).
    pub fn put_block(&mut self, data: &[u8]) -> Result<(), CodecError> {
        let len = i32::try_from(data.len()).map_err(|_| CodecError::InvalidLength {
            offset: self.buffer.len(),
            len: i64::try_from(data.len()).unwrap_or(i64::MAX),
        })?;
        self.put_i32(len);
        self.buffer.extend_from_slice(data);
        Ok(())
    }

    pub fn put_raw(&mut self, data: &[u8]) {
        self.buffer.extend_from_slice(data);
    }

    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    pub fn into_inner(self) -> Vec<u8> {
        self.buffer
    }
}

impl Default for WireWriter {
    fn default() -> Self {
        Self::new()
    }
}

/// Immutable cursor for reading (bounds-checked, zero-copy).
pub struct Cursor<'a> {
    buffer: &'a [u8],
    offset: usize,
}

impl<'a> Cursor<'a> {
    pub fn new(buffer: &'a [u8]) -> Self {
        Self { buffer, offset: 0 }
    }

    impl_read_le!(read_i8, i8, 1);
    impl_read_le!(read_i16, i16, 2);
    impl_read_le!(read_i32, i32, 4);
    impl_read_le!(read_i64, i64, 8);
    impl_read_le!(read_f32, f32, 4);
    impl_read_le!(read_f64, f64, 8);

    pub fn read_bytes(&mut self, len: usize) -> Result<&'a [u8], CodecError> {
        if len > self.remaining() {
            return Err(CodecError::Truncated {
                offset: self.offset,
            });
        }
        let slice = &self.buffer[self.offset..self.offset + len];
        self.offset += len;
        Ok(slice)
    }

    /// Read an `i32` length prefix and validate it against the remaining input.
    pub fn read_len(&mut self) -> Result<usize, CodecError> {
        let at = self.offset;
        let len = self.read_i32()?;
        let len_usize = usize::try_from(len).map_err(|_| CodecError::InvalidLength {
            offset: at,
            len: i64::from(len),
        })?;
        if len_usize > self.remaining() {
            return Err(CodecError::InvalidLength {
                offset: at,
                len: i64::from(len),
            });
        }
        Ok(len_usize)
    }

    /// Length-prefixed byte block.
    pub fn read_block(&mut self) -> Result<&'a [u8], CodecError> {
        let len = self.read_len()?;
        self.read_bytes(len)
    }

    pub fn offset(&self) -> usize {
        self.offset
    }

    pub fn remaining(&self) -> usize {
        self.buffer.len().saturating_sub(self.offset)
    }

    pub fn is_eof(&self) -> bool {
        self.offset >= self.buffer.len()
    }
}
