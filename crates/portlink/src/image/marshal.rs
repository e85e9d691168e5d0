// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Conversion between padded images and plain numeric plane arrays.
//!
//! A [`PlaneArray`] is `rows x cols x planes` of `f64`, stored plane by
//! plane, each plane row-major. Row padding is stripped on the way out and
//! restored on the way in.

use super::{Image, PixelFormat};
use crate::{Error, Result};

/// Dense numeric view of an image, one plane per channel.
#[derive(Debug, Clone, PartialEq)]
pub struct PlaneArray {
    pub rows: usize,
    pub cols: usize,
    pub planes: usize,
    pub data: Vec<f64>,
}

impl PlaneArray {
    #[must_use]
    pub fn zeros(rows: usize, cols: usize, planes: usize) -> Self {
        Self {
            rows,
            cols,
            planes,
            data: vec![0.0; rows * cols * planes],
        }
    }

    fn index(&self, row: usize, col: usize, plane: usize) -> Option<usize> {
        (row < self.rows && col < self.cols && plane < self.planes)
            .then(|| (plane * self.rows + row) * self.cols + col)
    }

    #[must_use]
    pub fn get(&self, row: usize, col: usize, plane: usize) -> Option<f64> {
        self.index(row, col, plane).map(|i| self.data[i])
    }

    pub fn set(&mut self, row: usize, col: usize, plane: usize, value: f64) -> bool {
        match self.index(row, col, plane) {
            Some(i) => {
                self.data[i] = value;
                true
            }
            None => false,
        }
    }
}

/// How one channel is stored inside a pixel.
#[derive(Clone, Copy)]
enum Channel {
    U8,
    U16,
    I32,
    F32,
}

impl Channel {
    fn of(format: PixelFormat) -> Self {
        match format {
            PixelFormat::Mono16 => Channel::U16,
            PixelFormat::Int => Channel::I32,
            PixelFormat::MonoFloat | PixelFormat::RgbFloat => Channel::F32,
            _ => Channel::U8,
        }
    }

    fn size(self) -> usize {
        match self {
            Channel::U8 => 1,
            Channel::U16 => 2,
            Channel::I32 | Channel::F32 => 4,
        }
    }

    fn read(self, bytes: &[u8]) -> f64 {
        match self {
            Channel::U8 => f64::from(bytes[0]),
            Channel::U16 => f64::from(u16::from_le_bytes([bytes[0], bytes[1]])),
            Channel::I32 => f64::from(i32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]])),
            Channel::F32 => f64::from(f32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]])),
        }
    }

    /// Integer channels saturate and round; NaN becomes 0.
    fn write(self, value: f64, out: &mut [u8]) {
        match self {
            Channel::U8 => out[0] = value.round().clamp(0.0, 255.0) as u8,
            Channel::U16 => {
                let v = value.round().clamp(0.0, f64::from(u16::MAX)) as u16;
                out.copy_from_slice(&v.to_le_bytes());
            }
            Channel::I32 => {
                let v = value.round().clamp(f64::from(i32::MIN), f64::from(i32::MAX)) as i32;
                out.copy_from_slice(&v.to_le_bytes());
            }
            Channel::F32 => out.copy_from_slice(&(value as f32).to_le_bytes()),
        }
    }
}

/// Unpack `image` into a plane array, dropping row padding.
#[must_use]
pub fn to_plane_array(image: &Image) -> PlaneArray {
    let format = image.format();
    let channel = Channel::of(format);
    let planes = format.planes();
    let mut out = PlaneArray::zeros(image.height(), image.width(), planes);
    for y in 0..image.height() {
        let Some(row) = image.row(y) else { break };
        for (x, pixel) in row.chunks_exact(image.pixel_size()).enumerate() {
            for (p, raw) in pixel.chunks_exact(channel.size()).enumerate() {
                out.set(y, x, p, channel.read(raw));
            }
        }
    }
    out
}

/// Pack a plane array into a new image of `format`.
///
/// Fails with `InvalidConfig` when the plane count does not match the format
/// or `data` has the wrong length.
pub fn from_plane_array(array: &PlaneArray, format: PixelFormat) -> Result<Image> {
    if array.planes != format.planes() {
        return Err(Error::InvalidConfig(format!(
            "{} planes cannot be packed as {} ({} planes)",
            array.planes,
            format,
            format.planes()
        )));
    }
    if array.data.len() != array.rows * array.cols * array.planes {
        return Err(Error::InvalidConfig(format!(
            "plane array holds {} values, expected {}",
            array.data.len(),
            array.rows * array.cols * array.planes
        )));
    }
    let channel = Channel::of(format);
    let mut image = Image::new(format, array.cols, array.rows);
    let pixel_size = image.pixel_size();
    for y in 0..array.rows {
        let Some(row) = image.row_mut(y) else { break };
        for (x, pixel) in row.chunks_exact_mut(pixel_size).enumerate() {
            for (p, raw) in pixel.chunks_exact_mut(channel.size()).enumerate() {
                if let Some(v) = array.get(y, x, p) {
                    channel.write(v, raw);
                }
            }
        }
    }
    Ok(image)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rgb_planes_strip_padding() {
        let mut img = Image::new(PixelFormat::Rgb, 2, 2);
        assert!(img.padding() > 0);
        for y in 0..2 {
            for x in 0..2 {
                if let Some(px) = img.pixel_mut(x, y) {
                    px.copy_from_slice(&[(10 * y + x) as u8, 100, 200]);
                }
            }
        }
        let arr = to_plane_array(&img);
        assert_eq!((arr.rows, arr.cols, arr.planes), (2, 2, 3));
        assert_eq!(arr.data.len(), 12);
        assert_eq!(arr.get(1, 1, 0), Some(11.0));
        assert_eq!(arr.get(0, 1, 2), Some(200.0));
        assert_eq!(from_plane_array(&arr, PixelFormat::Rgb).expect("pack"), img);
    }

    #[test]
    fn test_mono16_and_float_channels() {
        let mut arr = PlaneArray::zeros(1, 2, 1);
        arr.set(0, 0, 0, 1000.0);
        arr.set(0, 1, 0, 70000.0);
        let img = from_plane_array(&arr, PixelFormat::Mono16).expect("pack");
        assert_eq!(img.pixel(0, 0), Some(&1000u16.to_le_bytes()[..]));
        assert_eq!(to_plane_array(&img).get(0, 1, 0), Some(65535.0));

        let img = from_plane_array(&arr, PixelFormat::MonoFloat).expect("pack");
        assert_eq!(to_plane_array(&img).get(0, 1, 0), Some(70000.0));
    }

    #[test]
    fn test_plane_count_mismatch() {
        let arr = PlaneArray::zeros(2, 2, 1);
        assert!(matches!(
            from_plane_array(&arr, PixelFormat::Rgb),
            Err(Error::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_out_of_range_index() {
        let mut arr = PlaneArray::zeros(1, 1, 1);
        assert!(arr.get(1, 0, 0).is_none());
        assert!(!arr.set(0, 0, 1, 1.0));
    }
}
