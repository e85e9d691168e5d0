// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

#![no_main]

use libfuzzer_sys::fuzz_target;
use portlink::Bottle;

fuzz_target!(|data: &[u8]| {
    // Anything that decodes must re-encode and decode again
    if let Ok(bottle) = Bottle::from_bytes(data) {
        let again = bottle.to_bytes().expect("decoded bottle re-encodes");
        let back = Bottle::from_bytes(&again).expect("re-encoded bottle decodes");
        assert_eq!(back.len(), bottle.len());
    }

    // Text parsing is total
    if let Ok(text) = std::str::from_utf8(data) {
        let _ = Bottle::from_text(text).to_string();
    }
});
