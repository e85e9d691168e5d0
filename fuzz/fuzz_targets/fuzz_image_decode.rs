// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

#![no_main]

use libfuzzer_sys::fuzz_target;
use portlink::image::marshal;
use portlink::Image;

fuzz_target!(|data: &[u8]| {
    if let Ok(image) = Image::from_bytes(data) {
        assert_eq!(image.raw().len(), image.row_size() * image.height());
        let planes = marshal::to_plane_array(&image);
        assert_eq!(planes.data.len(), image.width() * image.height() * image.format().planes());
    }
});
