// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Image frames: a pixel buffer with row padding.
//!
//! # Layout
//!
//! ```text
//! row 0: [px 0][px 1] ... [px w-1][pad]
//! row 1: [px 0][px 1] ... [px w-1][pad]
//! ...
//! row_size = w * pixel_size + pad_bytes(w * pixel_size, quantum)
//! ```
//!
//! # Wire format
//!
//! ```text
//! i32 format vocab | i32 pixel_size | i32 width | i32 height | i32 quantum
//! i32 byte_len     | byte_len raw bytes (rows including padding)
//! ```

pub mod marshal;

use crate::bottle::cursor::{Cursor, WireWriter};
use crate::bottle::{CodecError, Vocab};
use crate::port::Portable;
use crate::{Error, Result};

/// Row alignment used when none is requested.
pub const DEFAULT_QUANTUM: usize = 8;

const HEADER_LEN: usize = 6 * 4;

/// Bytes needed to pad `len` up to a multiple of `quantum`.
#[must_use]
pub const fn pad_bytes(len: usize, quantum: usize) -> usize {
    if quantum == 0 {
        return 0;
    }
    let rem = len % quantum;
    if rem == 0 {
        0
    } else {
        quantum - rem
    }
}

/// Supported pixel encodings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum PixelFormat {
    #[default]
    Mono,
    Mono16,
    Rgb,
    Rgba,
    Bgr,
    Bgra,
    Hsv,
    Int,
    MonoFloat,
    RgbFloat,
}

impl PixelFormat {
    pub const ALL: [PixelFormat; 10] = [
        PixelFormat::Mono,
        PixelFormat::Mono16,
        PixelFormat::Rgb,
        PixelFormat::Rgba,
        PixelFormat::Bgr,
        PixelFormat::Bgra,
        PixelFormat::Hsv,
        PixelFormat::Int,
        PixelFormat::MonoFloat,
        PixelFormat::RgbFloat,
    ];

    /// Four-character code carried on the wire.
    #[must_use]
    pub const fn vocab(self) -> Vocab {
        match self {
            PixelFormat::Mono => Vocab::new(b'm', b'o', b'n', b'o'),
            PixelFormat::Mono16 => Vocab::new(b'm', b'o', b'1', b'6'),
            PixelFormat::Rgb => Vocab::new(b'r', b'g', b'b', 0),
            PixelFormat::Rgba => Vocab::new(b'r', b'g', b'b', b'a'),
            PixelFormat::Bgr => Vocab::new(b'b', b'g', b'r', 0),
            PixelFormat::Bgra => Vocab::new(b'b', b'g', b'r', b'a'),
            PixelFormat::Hsv => Vocab::new(b'h', b's', b'v', 0),
            PixelFormat::Int => Vocab::new(b'i', b'n', b't', 0),
            PixelFormat::MonoFloat => Vocab::new(b'd', b'e', b'c', 0),
            PixelFormat::RgbFloat => Vocab::new(b'r', b'g', b'b', b'.'),
        }
    }

    #[must_use]
    pub fn from_vocab(code: Vocab) -> Option<Self> {
        Self::ALL.into_iter().find(|f| f.vocab() == code)
    }

    /// Configuration name (`mono`, `rgb`, `mono_float`, ...).
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            PixelFormat::Mono => "mono",
            PixelFormat::Mono16 => "mono16",
            PixelFormat::Rgb => "rgb",
            PixelFormat::Rgba => "rgba",
            PixelFormat::Bgr => "bgr",
            PixelFormat::Bgra => "bgra",
            PixelFormat::Hsv => "hsv",
            PixelFormat::Int => "int",
            PixelFormat::MonoFloat => "mono_float",
            PixelFormat::RgbFloat => "rgb_float",
        }
    }

    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|f| f.name() == name)
    }

    /// Bytes per pixel.
    #[must_use]
    pub const fn pixel_size(self) -> usize {
        match self {
            PixelFormat::Mono => 1,
            PixelFormat::Mono16 => 2,
            PixelFormat::Rgb | PixelFormat::Bgr | PixelFormat::Hsv => 3,
            PixelFormat::Rgba | PixelFormat::Bgra | PixelFormat::Int | PixelFormat::MonoFloat => 4,
            PixelFormat::RgbFloat => 12,
        }
    }

    /// Channels per pixel.
    #[must_use]
    pub const fn planes(self) -> usize {
        match self {
            PixelFormat::Mono | PixelFormat::Mono16 | PixelFormat::Int | PixelFormat::MonoFloat => 1,
            PixelFormat::Rgb | PixelFormat::Bgr | PixelFormat::Hsv | PixelFormat::RgbFloat => 3,
            PixelFormat::Rgba | PixelFormat::Bgra => 4,
        }
    }
}

impl std::fmt::Display for PixelFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// A padded pixel buffer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Image {
    format: PixelFormat,
    width: usize,
    height: usize,
    quantum: usize,
    data: Vec<u8>,
}

impl Default for Image {
    fn default() -> Self {
        Self::new(PixelFormat::Mono, 0, 0)
    }
}

impl Image {
    /// Zero-filled image with the default row alignment.
    #[must_use]
    pub fn new(format: PixelFormat, width: usize, height: usize) -> Self {
        Self::with_quantum(format, width, height, DEFAULT_QUANTUM)
    }

    /// Zero-filled image aligned to `quantum` bytes per row (0 means default).
    #[must_use]
    pub fn with_quantum(format: PixelFormat, width: usize, height: usize, quantum: usize) -> Self {
        let mut image = Self {
            format,
            width,
            height,
            quantum: if quantum == 0 { DEFAULT_QUANTUM } else { quantum },
            data: Vec::new(),
        };
        image.data = vec![0; image.raw_size()];
        image
    }

    /// Change dimensions; pixel contents are reset to zero.
    pub fn resize(&mut self, width: usize, height: usize) {
        self.width = width;
        self.height = height;
        self.data = vec![0; self.raw_size()];
    }

    /// Change pixel format; pixel contents are reset to zero.
    pub fn set_format(&mut self, format: PixelFormat) {
        self.format = format;
        self.data = vec![0; self.raw_size()];
    }

    #[must_use]
    pub fn format(&self) -> PixelFormat {
        self.format
    }

    #[must_use]
    pub fn width(&self) -> usize {
        self.width
    }

    #[must_use]
    pub fn height(&self) -> usize {
        self.height
    }

    #[must_use]
    pub fn quantum(&self) -> usize {
        self.quantum
    }

    #[must_use]
    pub fn pixel_size(&self) -> usize {
        self.format.pixel_size()
    }

    /// Bytes per row, padding included.
    #[must_use]
    pub fn row_size(&self) -> usize {
        let line = self.width * self.pixel_size();
        line + pad_bytes(line, self.quantum)
    }

    /// Padding bytes at the end of each row.
    #[must_use]
    pub fn padding(&self) -> usize {
        self.row_size() - self.width * self.pixel_size()
    }

    #[must_use]
    pub fn raw_size(&self) -> usize {
        self.row_size() * self.height
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    /// Whole buffer, rows including padding.
    #[must_use]
    pub fn raw(&self) -> &[u8] {
        &self.data
    }

    pub fn raw_mut(&mut self) -> &mut [u8] {
        &mut self.data
    }

    /// Pixel bytes of row `y`, padding excluded.
    #[must_use]
    pub fn row(&self, y: usize) -> Option<&[u8]> {
        if y >= self.height {
            return None;
        }
        let start = y * self.row_size();
        self.data.get(start..start + self.width * self.pixel_size())
    }

    pub fn row_mut(&mut self, y: usize) -> Option<&mut [u8]> {
        if y >= self.height {
            return None;
        }
        let start = y * self.row_size();
        let len = self.width * self.pixel_size();
        self.data.get_mut(start..start + len)
    }

    #[must_use]
    pub fn pixel(&self, x: usize, y: usize) -> Option<&[u8]> {
        if x >= self.width {
            return None;
        }
        let size = self.pixel_size();
        self.row(y).map(|row| &row[x * size..(x + 1) * size])
    }

    pub fn pixel_mut(&mut self, x: usize, y: usize) -> Option<&mut [u8]> {
        if x >= self.width {
            return None;
        }
        let size = self.pixel_size();
        self.row_mut(y).map(|row| &mut row[x * size..(x + 1) * size])
    }

    /// Set every byte (padding included) to zero.
    pub fn zero(&mut self) {
        self.data.fill(0);
    }

    pub fn to_bytes(&self) -> std::result::Result<Vec<u8>, CodecError> {
        let mut w = WireWriter::with_capacity(HEADER_LEN + self.data.len());
        w.put_i32(self.format.vocab().code());
        for field in [self.pixel_size(), self.width, self.height, self.quantum] {
            w.put_i32(header_field(field)?);
        }
        w.put_block(&self.data)?;
        Ok(w.into_inner())
    }

    pub fn from_bytes(data: &[u8]) -> std::result::Result<Self, CodecError> {
        let mut c = Cursor::new(data);
        let code = Vocab(c.read_i32()?);
        let format = PixelFormat::from_vocab(code).ok_or_else(|| CodecError::InvalidHeader {
            reason: format!("unknown pixel format {:?}", code.decode()),
        })?;
        let pixel_size = read_dim(&mut c)?;
        let width = read_dim(&mut c)?;
        let height = read_dim(&mut c)?;
        let quantum = read_dim(&mut c)?;
        if pixel_size != format.pixel_size() {
            return Err(CodecError::InvalidHeader {
                reason: format!("pixel size {} does not match {}", pixel_size, format),
            });
        }
        if quantum == 0 {
            return Err(CodecError::InvalidHeader {
                reason: "zero quantum".to_string(),
            });
        }
        let line = width.checked_mul(pixel_size);
        let expected = line
            .and_then(|l| l.checked_add(pad_bytes(l, quantum)))
            .and_then(|row| row.checked_mul(height));
        let at = c.offset();
        let raw = c.read_block()?;
        if expected != Some(raw.len()) {
            return Err(CodecError::InvalidLength {
                offset: at,
                len: i64::try_from(raw.len()).unwrap_or(i64::MAX),
            });
        }
        if !c.is_eof() {
            return Err(CodecError::TrailingBytes { offset: c.offset() });
        }
        Ok(Self {
            format,
            width,
            height,
            quantum,
            data: raw.to_vec(),
        })
    }
}

fn header_field(value: usize) -> std::result::Result<i32, CodecError> {
    i32::try_from(value).map_err(|_| CodecError::InvalidHeader {
        reason: format!("dimension {} exceeds i32", value),
    })
}

fn read_dim(c: &mut Cursor<'_>) -> std::result::Result<usize, CodecError> {
    let at = c.offset();
    let v = c.read_i32()?;
    usize::try_from(v).map_err(|_| CodecError::InvalidLength {
        offset: at,
        len: i64::from(v),
    })
}

impl Portable for Image {
    fn encode(&self) -> Result<Vec<u8>> {
        Ok(self.to_bytes()?)
    }

    fn decode(data: &[u8]) -> Result<Self> {
        Self::from_bytes(data).map_err(Error::from)
    }
}
