// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Simulated devices for tests and demos.

use super::driver::{DeviceDriver, Encoders, ImageSource, PositionControl};
use super::Property;
use crate::image::{Image, PixelFormat};
use crate::{Error, Result};

/// Test-pattern camera (`device fake_grabber`).
///
/// Keys: `width` (320), `height` (240), `format` (`rgb`), `mode`
/// (`line`: a vertical line scrolling one column per frame, `grid`: colour
/// ramps with the current row highlighted, `none`: black frames).
#[derive(Debug)]
pub struct FakeFrameGrabber {
    width: usize,
    height: usize,
    format: PixelFormat,
    mode: PatternMode,
    frame: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PatternMode {
    Line,
    Grid,
    Blank,
}

impl Default for FakeFrameGrabber {
    fn default() -> Self {
        Self {
            width: 320,
            height: 240,
            format: PixelFormat::Rgb,
            mode: PatternMode::Line,
            frame: 0,
        }
    }
}

/// Largest accepted image side, in pixels.
const MAX_SIDE: usize = 4096;
/// Largest accepted axis count.
const MAX_AXES: usize = 1024;

fn dimension(config: &Property, key: &str, default: usize, max: usize) -> Result<usize> {
    match config.find(key) {
        None => Ok(default),
        Some(v) => v
            .as_i64()
            .and_then(|n| usize::try_from(n).ok())
            .filter(|&n| n <= max)
            .ok_or_else(|| {
                Error::InvalidConfig(format!("'{}' must be an integer in 0..={}", key, max))
            }),
    }
}

impl FakeFrameGrabber {
    fn paint(&self, image: &mut Image) {
        let (w, h) = (self.width, self.height);
        let size = self.format.pixel_size();
        let lit = vec![255u8; size];
        for y in 0..h {
            for x in 0..w {
                let Some(px) = image.pixel_mut(x, y) else { continue };
                match self.mode {
                    PatternMode::Blank => {}
                    PatternMode::Line => {
                        if w > 0 && x == self.frame % w {
                            px.copy_from_slice(&lit);
                        }
                    }
                    PatternMode::Grid => {
                        let r = if w > 1 { (255 * x / (w - 1)) as u8 } else { 0 };
                        let g = if h > 1 { (255 * y / (h - 1)) as u8 } else { 0 };
                        let b = if h > 0 && y == self.frame % h { 255 } else { 0 };
                        for (i, byte) in px.iter_mut().enumerate() {
                            *byte = [r, g, b][i % 3];
                        }
                    }
                }
            }
        }
    }
}

impl ImageSource for FakeFrameGrabber {
    fn width(&self) -> usize {
        self.width
    }

    fn height(&self) -> usize {
        self.height
    }

    fn get_image(&mut self, image: &mut Image) -> Result<()> {
        if image.format() != self.format {
            image.set_format(self.format);
        }
        if image.width() != self.width || image.height() != self.height {
            image.resize(self.width, self.height);
        } else {
            image.zero();
        }
        self.paint(image);
        self.frame = self.frame.wrapping_add(1);
        Ok(())
    }
}

impl DeviceDriver for FakeFrameGrabber {
    fn open(&mut self, config: &Property) -> Result<()> {
        self.width = dimension(config, "width", self.width, MAX_SIDE)?;
        self.height = dimension(config, "height", self.height, MAX_SIDE)?;
        if let Some(name) = config.find_str("format") {
            self.format = PixelFormat::from_name(name)
                .ok_or_else(|| Error::InvalidConfig(format!("unknown pixel format '{}'", name)))?;
        }
        self.mode = match config.find_str("mode") {
            None | Some("line") => PatternMode::Line,
            Some("grid") => PatternMode::Grid,
            Some("none") => PatternMode::Blank,
            Some(other) => {
                return Err(Error::InvalidConfig(format!("unknown test pattern '{}'", other)))
            }
        };
        self.frame = 0;
        log::debug!(
            "[dev] fake_grabber {}x{} {} {:?}",
            self.width,
            self.height,
            self.format,
            self.mode
        );
        Ok(())
    }

    fn close(&mut self) -> Result<()> {
        Ok(())
    }

    fn image_source(&mut self) -> Option<&mut dyn ImageSource> {
        Some(self)
    }
}

/// Simulated motor board (`device fake_motor`, key `axes`, default 4).
///
/// Moves complete instantly: after `position_move` the encoder reads the
/// target and `check_motion_done` is `true`.
#[derive(Debug)]
pub struct FakeMotionControl {
    positions: Vec<f64>,
    speeds: Vec<f64>,
    offsets: Vec<f64>,
}

impl Default for FakeMotionControl {
    fn default() -> Self {
        Self::with_axes(4)
    }
}

impl FakeMotionControl {
    #[must_use]
    pub fn with_axes(axes: usize) -> Self {
        Self {
            positions: vec![0.0; axes],
            speeds: vec![0.0; axes],
            offsets: vec![0.0; axes],
        }
    }

    fn check_axis(&self, axis: usize) -> Result<()> {
        if axis < self.positions.len() {
            Ok(())
        } else {
            Err(Error::InvalidConfig(format!(
                "axis {} out of range (0..{})",
                axis,
                self.positions.len()
            )))
        }
    }
}

impl PositionControl for FakeMotionControl {
    fn axes(&self) -> usize {
        self.positions.len()
    }

    fn position_move(&mut self, axis: usize, target: f64) -> Result<()> {
        self.check_axis(axis)?;
        self.positions[axis] = target;
        Ok(())
    }

    fn positions_move(&mut self, targets: &[f64]) -> Result<()> {
        if targets.len() != self.positions.len() {
            return Err(Error::InvalidConfig(format!(
                "expected {} targets, got {}",
                self.positions.len(),
                targets.len()
            )));
        }
        self.positions.copy_from_slice(targets);
        Ok(())
    }

    fn check_motion_done(&self, axis: usize) -> Result<bool> {
        self.check_axis(axis)?;
        Ok(true)
    }

    fn set_ref_speed(&mut self, axis: usize, speed: f64) -> Result<()> {
        self.check_axis(axis)?;
        self.speeds[axis] = speed;
        Ok(())
    }
}

impl Encoders for FakeMotionControl {
    fn axes(&self) -> usize {
        self.positions.len()
    }

    fn encoder(&self, axis: usize) -> Result<f64> {
        self.check_axis(axis)?;
        Ok(self.positions[axis] - self.offsets[axis])
    }

    fn encoders(&self) -> Vec<f64> {
        self.positions
            .iter()
            .zip(&self.offsets)
            .map(|(p, o)| p - o)
            .collect()
    }

    fn reset_encoder(&mut self, axis: usize) -> Result<()> {
        self.check_axis(axis)?;
        self.offsets[axis] = self.positions[axis];
        Ok(())
    }
}

impl DeviceDriver for FakeMotionControl {
    fn open(&mut self, config: &Property) -> Result<()> {
        let axes = dimension(config, "axes", self.positions.len(), MAX_AXES)?;
        *self = Self::with_axes(axes);
        log::debug!("[dev] fake_motor with {} axes", axes);
        Ok(())
    }

    fn close(&mut self) -> Result<()> {
        Ok(())
    }

    fn position_control(&mut self) -> Option<&mut dyn PositionControl> {
        Some(self)
    }

    fn encoders(&mut self) -> Option<&mut dyn Encoders> {
        Some(self)
    }
}
