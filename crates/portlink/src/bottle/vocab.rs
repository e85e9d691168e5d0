// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Vocabulary codes: up to four ASCII characters packed into an `i32`.
//!
//! Vocabs are used as cheap, human-readable tags (commands, pixel formats).
//! The first character lands in the least significant byte.

/// A four-character code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Vocab(pub i32);

impl Vocab {
    /// Pack four bytes, first byte lowest.
    #[must_use]
    pub const fn new(a: u8, b: u8, c: u8, d: u8) -> Self {
        Self(i32::from_le_bytes([a, b, c, d]))
    }

    /// Encode a string of at most four characters; extra characters are ignored.
    #[must_use]
    pub fn encode(s: &str) -> Self {
        let mut raw = [0u8; 4];
        for (slot, byte) in raw.iter_mut().zip(s.bytes()) {
            *slot = byte;
        }
        Self(i32::from_le_bytes(raw))
    }

    /// Decode back to text, stopping at the first NUL.
    #[must_use]
    pub fn decode(self) -> String {
        self.0
            .to_le_bytes()
            .iter()
            .take_while(|&&b| b != 0)
            .map(|&b| char::from(b))
            .collect()
    }

    #[must_use]
    pub const fn code(self) -> i32 {
        self.0
    }
}

impl std::fmt::Display for Vocab {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.decode())
    }
}

impl From<&str> for Vocab {
    fn from(s: &str) -> Self {
        Self::encode(s)
    }
}
