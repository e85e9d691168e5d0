// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

#![allow(clippy::uninlined_format_args)] // Test code readability over pedantic
#![allow(clippy::float_cmp)] // Simulated encoders are exact
#![allow(clippy::missing_panics_doc)] // Tests panic on failure

//! Device layer integration tests
//!
//! Opening drivers from configuration and querying capabilities.

use portlink::config::RuntimeConfig;
use portlink::dev::{DeviceDriver, DriverFactory, PolyDriver, Property};
use portlink::{BufferedPort, Error, Image, Network, PixelFormat};

#[test]
fn test_grabber_from_config_text() {
    let config = Property::from_config(
        "device fake_grabber\n\
         width 16\n\
         height 8\n\
         format mono\n",
    );
    let mut cam = PolyDriver::open(&config).expect("open");
    assert_eq!(cam.device(), "fake_grabber");
    assert!(cam.encoders().is_none());

    let source = cam.image_source().expect("image source");
    assert_eq!((source.width(), source.height()), (16, 8));
    let mut frame = Image::default();
    source.get_image(&mut frame).expect("grab");
    assert_eq!(frame.format(), PixelFormat::Mono);
    assert_eq!(frame.pixel(0, 7), Some(&[255u8][..]));
}

#[test]
fn test_motor_capabilities() {
    let config = Property::from_command_line(["--device", "fake_motor", "--axes", "3"]);
    let mut motor = PolyDriver::open(&config).expect("open");
    assert!(motor.image_source().is_none());

    let control = motor.position_control().expect("position control");
    assert_eq!(control.axes(), 3);
    control.positions_move(&[10.0, 20.0, 30.0]).expect("move");
    assert!(control.check_motion_done(2).expect("done"));

    let encoders = motor.encoders().expect("encoders");
    assert_eq!(encoders.encoders(), vec![10.0, 20.0, 30.0]);
    encoders.reset_encoder(0).expect("reset");
    assert_eq!(encoders.encoder(0).expect("read"), 0.0);
}

#[test]
fn test_unknown_device_and_bad_config() {
    let unknown = Property::from_command_line(["--device", "hover_board"]);
    assert!(matches!(
        PolyDriver::open(&unknown),
        Err(Error::DeviceNotFound(_))
    ));

    let bad = Property::from_config("device fake_grabber\nformat yuv\n");
    assert!(matches!(PolyDriver::open(&bad), Err(Error::InvalidConfig(_))));
}

struct Counter {
    opened: bool,
}

impl DeviceDriver for Counter {
    fn open(&mut self, _config: &Property) -> portlink::Result<()> {
        self.opened = true;
        Ok(())
    }

    fn close(&mut self) -> portlink::Result<()> {
        self.opened = false;
        Ok(())
    }
}

#[test]
fn test_custom_factory() {
    let factory = DriverFactory::with_builtin();
    factory.add("counter", || Box::new(Counter { opened: false }));
    assert!(factory.contains("counter"));
    assert_eq!(factory.names().len(), 3);

    let mut prop = Property::new();
    prop.put("device", "counter");
    let mut dev = PolyDriver::open_with(&factory, &prop).expect("open");
    assert!(dev.is_valid());
    assert!(dev.position_control().is_none());
    dev.close().expect("close");
    assert!(!dev.is_valid());
}

#[test]
fn test_grabber_frames_streamed_over_port() {
    let net = Network::new(RuntimeConfig::new());
    net.initialize();
    let out: BufferedPort<Image> = BufferedPort::with_network(&net);
    let viewer: BufferedPort<Image> = BufferedPort::with_network(&net);
    out.open("/grabber/out").expect("open");
    viewer.open("/grabber/view").expect("open");
    net.connect("/grabber/out", "/grabber/view").expect("connect");

    let config = Property::from_config("device fake_grabber\nwidth 8\nheight 4\nmode grid\n");
    let mut cam = PolyDriver::open(&config).expect("open");
    let source = cam.image_source().expect("image source");
    for _ in 0..3 {
        let mut frame = out.prepare();
        source.get_image(&mut frame).expect("grab");
        frame.write().expect("write");
    }

    let latest = viewer.read(true).expect("read").expect("frame");
    assert_eq!((latest.width(), latest.height()), (8, 4));
    // frame 2 highlights row 2 in blue
    assert_eq!(latest.pixel(0, 2).map(|p| p[2]), Some(255));
    assert_eq!(latest.pixel(0, 1).map(|p| p[2]), Some(0));
}

#[test]
fn test_property_display_and_groups() {
    let prop = Property::from_config("device fake_motor\naxes 2\n[limits]\nmax 90\n");
    assert_eq!(prop.group("limits").and_then(|g| g.find_int("max")), Some(90));
    assert_eq!(
        prop.to_string(),
        "(axes 2) (device fake_motor) (limits (max 90))"
    );
}
