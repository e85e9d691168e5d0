// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

#![allow(clippy::uninlined_format_args)] // Test code readability over pedantic
#![allow(clippy::cast_possible_truncation)] // Test parameters
#![allow(clippy::float_cmp)] // Exact pixel values
#![allow(clippy::missing_panics_doc)] // Tests panic on failure

//! Image frame integration tests
//!
//! Padding, wire form over ports and plane-array marshalling.

use portlink::config::RuntimeConfig;
use portlink::image::marshal::{from_plane_array, to_plane_array, PlaneArray};
use portlink::image::{pad_bytes, DEFAULT_QUANTUM};
use portlink::{Image, Network, PixelFormat, Port};

#[test]
fn test_row_padding_follows_quantum() {
    let img = Image::new(PixelFormat::Rgb, 5, 2);
    assert_eq!(img.quantum(), DEFAULT_QUANTUM);
    assert_eq!(img.padding(), pad_bytes(15, 8));
    assert_eq!(img.row_size(), 16);
    assert_eq!(img.raw_size(), 32);

    let tight = Image::with_quantum(PixelFormat::Rgb, 5, 2, 1);
    assert_eq!(tight.row_size(), 15);
}

#[test]
fn test_image_travels_between_ports() {
    let net = Network::new(RuntimeConfig::new());
    net.initialize();
    let cam = Port::with_network(&net);
    let viewer = Port::with_network(&net);
    cam.open("/img/cam").expect("open");
    viewer.open("/img/view").expect("open");
    net.connect("/img/cam", "/img/view").expect("connect");

    let mut frame = Image::new(PixelFormat::Bgr, 4, 3);
    for y in 0..3 {
        for x in 0..4 {
            let px = frame.pixel_mut(x, y).expect("pixel");
            px.copy_from_slice(&[x as u8, y as u8, 200]);
        }
    }
    cam.write(&frame).expect("write");

    let got: Image = viewer.read(true).expect("read").expect("frame");
    assert_eq!(got, frame);
    assert_eq!(got.pixel(3, 2), Some(&[3u8, 2, 200][..]));
}

#[test]
fn test_every_format_roundtrips() {
    for format in PixelFormat::ALL {
        let img = Image::new(format, 3, 2);
        let bytes = img.to_bytes().expect("encode");
        let back = Image::from_bytes(&bytes).expect("decode");
        assert_eq!(back.format(), format, "{}", format);
        assert_eq!(back.raw_size(), img.raw_size());
        assert_eq!(PixelFormat::from_vocab(format.vocab()), Some(format));
        assert_eq!(PixelFormat::from_name(format.name()), Some(format));
    }
}

#[test]
fn test_corrupt_frames_rejected() {
    let bytes = Image::new(PixelFormat::Mono, 4, 4).to_bytes().expect("encode");
    assert!(Image::from_bytes(&bytes[..bytes.len() - 1]).is_err());

    let mut extra = bytes.clone();
    extra.push(0);
    assert!(Image::from_bytes(&extra).is_err());

    let mut bad_format = bytes;
    bad_format[..4].copy_from_slice(&0x7777_7777i32.to_le_bytes());
    assert!(Image::from_bytes(&bad_format).is_err());
}

#[test]
fn test_plane_array_strips_padding() {
    let mut img = Image::new(PixelFormat::Rgb, 3, 2);
    img.pixel_mut(2, 1).expect("pixel").copy_from_slice(&[10, 20, 30]);

    let planes = to_plane_array(&img);
    assert_eq!((planes.rows, planes.cols, planes.planes), (2, 3, 3));
    assert_eq!(planes.data.len(), 18);
    assert_eq!(planes.get(1, 2, 0), Some(10.0));
    assert_eq!(planes.get(1, 2, 2), Some(30.0));

    let back = from_plane_array(&planes, PixelFormat::Rgb).expect("convert");
    assert_eq!(back, img);
}

#[test]
fn test_plane_array_saturates_and_checks_planes() {
    let mut planes = PlaneArray::zeros(1, 2, 1);
    assert!(planes.set(0, 0, 0, 300.0));
    assert!(planes.set(0, 1, 0, -5.0));
    assert!(!planes.set(0, 2, 0, 1.0));

    let mono = from_plane_array(&planes, PixelFormat::Mono).expect("convert");
    assert_eq!(mono.pixel(0, 0), Some(&[255u8][..]));
    assert_eq!(mono.pixel(1, 0), Some(&[0u8][..]));

    assert!(from_plane_array(&planes, PixelFormat::Rgb).is_err());
}

#[test]
fn test_float_planes_keep_values() {
    let mut planes = PlaneArray::zeros(2, 2, 1);
    planes.set(1, 1, 0, 0.75);
    let img = from_plane_array(&planes, PixelFormat::MonoFloat).expect("convert");
    assert_eq!(to_plane_array(&img).get(1, 1, 0), Some(0.75));
}
