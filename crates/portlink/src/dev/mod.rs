// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Device layer: configuration, drivers and capability views.
//!
//! # Example
//!
//! ```rust
//! use portlink::dev::{PolyDriver, Property};
//! use portlink::Image;
//!
//! let config = Property::from_command_line(["--device", "fake_grabber", "--width", "64", "--height", "48"]);
//! let mut camera = PolyDriver::open(&config)?;
//! assert!(camera.position_control().is_none());
//!
//! let mut frame = Image::default();
//! if let Some(source) = camera.image_source() {
//!     source.get_image(&mut frame)?;
//! }
//! assert_eq!((frame.width(), frame.height()), (64, 48));
//! # Ok::<(), portlink::Error>(())
//! ```

mod driver;
mod fake;
mod property;

pub use driver::{
    DeviceDriver, DriverFactory, DriverMaker, Encoders, ImageSource, PolyDriver, PositionControl,
};
pub use fake::{FakeFrameGrabber, FakeMotionControl};
pub use property::Property;
