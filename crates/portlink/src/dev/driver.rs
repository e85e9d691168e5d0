// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Device drivers and capability queries.
//!
//! A driver exposes zero or more capability views. Asking for a capability
//! the driver lacks returns `None`, never an error.

use super::fake::{FakeFrameGrabber, FakeMotionControl};
use super::Property;
use crate::image::Image;
use crate::{Error, Result};
use dashmap::DashMap;
use std::sync::{Arc, OnceLock};

/// Frame source capability.
pub trait ImageSource: Send {
    fn width(&self) -> usize;
    fn height(&self) -> usize;
    /// Fill `image` with the next frame (resizing it as needed).
    fn get_image(&mut self, image: &mut Image) -> Result<()>;
}

/// Joint position control capability.
pub trait PositionControl: Send {
    fn axes(&self) -> usize;
    /// Command `axis` toward `target`.
    fn position_move(&mut self, axis: usize, target: f64) -> Result<()>;
    /// Command every axis at once; `targets.len()` must equal `axes()`.
    fn positions_move(&mut self, targets: &[f64]) -> Result<()>;
    fn check_motion_done(&self, axis: usize) -> Result<bool>;
    fn set_ref_speed(&mut self, axis: usize, speed: f64) -> Result<()>;
}

/// Encoder readout capability.
pub trait Encoders: Send {
    fn axes(&self) -> usize;
    fn encoder(&self, axis: usize) -> Result<f64>;
    fn encoders(&self) -> Vec<f64>;
    fn reset_encoder(&mut self, axis: usize) -> Result<()>;
}

/// A configurable device.
pub trait DeviceDriver: Send {
    fn open(&mut self, config: &Property) -> Result<()>;
    fn close(&mut self) -> Result<()>;

    fn image_source(&mut self) -> Option<&mut dyn ImageSource> {
        None
    }

    fn position_control(&mut self) -> Option<&mut dyn PositionControl> {
        None
    }

    fn encoders(&mut self) -> Option<&mut dyn Encoders> {
        None
    }
}

/// Constructor stored in a [`DriverFactory`].
pub type DriverMaker = fn() -> Box<dyn DeviceDriver>;

/// Registry of driver constructors keyed by device name.
pub struct DriverFactory {
    makers: DashMap<String, DriverMaker>,
}

static GLOBAL_FACTORY: OnceLock<Arc<DriverFactory>> = OnceLock::new();

impl DriverFactory {
    /// Empty factory.
    #[must_use]
    pub fn new() -> Self {
        Self {
            makers: DashMap::new(),
        }
    }

    /// Factory preloaded with `fake_grabber` and `fake_motor`.
    #[must_use]
    pub fn with_builtin() -> Self {
        let factory = Self::new();
        factory.add("fake_grabber", || Box::new(FakeFrameGrabber::default()));
        factory.add("fake_motor", || Box::new(FakeMotionControl::default()));
        factory
    }

    /// Process-wide factory used by [`PolyDriver::open`].
    pub fn global() -> Arc<DriverFactory> {
        Arc::clone(GLOBAL_FACTORY.get_or_init(|| Arc::new(Self::with_builtin())))
    }

    /// Register (or replace) a constructor.
    pub fn add(&self, name: &str, maker: DriverMaker) {
        if self.makers.insert(name.to_string(), maker).is_some() {
            log::debug!("[dev] Replaced driver {}", name);
        }
    }

    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.makers.contains_key(name)
    }

    /// Registered device names, sorted.
    #[must_use]
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.makers.iter().map(|e| e.key().clone()).collect();
        names.sort();
        names
    }

    pub fn create(&self, name: &str) -> Result<Box<dyn DeviceDriver>> {
        let maker = self
            .makers
            .get(name)
            .map(|m| *m.value())
            .ok_or_else(|| Error::DeviceNotFound(name.to_string()))?;
        Ok(maker())
    }
}

impl Default for DriverFactory {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for DriverFactory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DriverFactory")
            .field("drivers", &self.names())
            .finish()
    }
}

/// Opens the driver named by the `device` key and forwards capability queries.
pub struct PolyDriver {
    device: String,
    driver: Option<Box<dyn DeviceDriver>>,
}

impl PolyDriver {
    /// Open using the global factory.
    pub fn open(config: &Property) -> Result<Self> {
        Self::open_with(&DriverFactory::global(), config)
    }

    pub fn open_with(factory: &DriverFactory, config: &Property) -> Result<Self> {
        let device = config
            .find_str("device")
            .ok_or_else(|| Error::InvalidConfig("missing 'device' key".to_string()))?;
        let mut driver = factory.create(device)?;
        driver.open(config)?;
        log::info!("[dev] Opened device {}", device);
        Ok(Self {
            device: device.to_string(),
            driver: Some(driver),
        })
    }

    #[must_use]
    pub fn device(&self) -> &str {
        &self.device
    }

    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.driver.is_some()
    }

    /// Close the driver. Later capability queries return `None`.
    pub fn close(&mut self) -> Result<()> {
        match self.driver.take() {
            Some(mut driver) => {
                log::debug!("[dev] Closing device {}", self.device);
                driver.close()
            }
            None => Ok(()),
        }
    }

    pub fn image_source(&mut self) -> Option<&mut dyn ImageSource> {
        self.driver.as_mut()?.image_source()
    }

    pub fn position_control(&mut self) -> Option<&mut dyn PositionControl> {
        self.driver.as_mut()?.position_control()
    }

    pub fn encoders(&mut self) -> Option<&mut dyn Encoders> {
        self.driver.as_mut()?.encoders()
    }
}

impl Drop for PolyDriver {
    fn drop(&mut self) {
        if let Err(e) = self.close() {
            log::warn!("[dev] Error closing {}: {}", self.device, e);
        }
    }
}

impl std::fmt::Debug for PolyDriver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PolyDriver")
            .field("device", &self.device)
            .field("open", &self.is_valid())
            .finish()
    }
}
