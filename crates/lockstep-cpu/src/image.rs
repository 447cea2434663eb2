//! Program images.
//!
//! Two on-disk forms are accepted:
//!
//! - raw binary, little-endian 16-bit halves in address order, so each
//!   32-bit word holds its lower-addressed half in bits 0..16;
//! - hex text, one halfword per line, with optional `0x` prefix, blank lines
//!   and `#` comments.

use thiserror::Error;

use crate::memory::SimpleMemory;

/// Halves addressable through a 30-bit word address.
pub const MAX_HALVES: usize = 1 << 31;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ImageError {
    #[error("binary image has odd length {0}; expected whole 16-bit halves")]
    OddLength(usize),
    #[error("line {line}: invalid halfword {text:?}")]
    BadHalfword { line: usize, text: String },
    #[error("image of {0} halves exceeds the addressable range")]
    TooLarge(usize),
}

/// A program as a sequence of 16-bit instruction halves.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ProgramImage {
    halves: Vec<u16>,
}

impl ProgramImage {
    pub fn from_halves(halves: Vec<u16>) -> Result<Self, ImageError> {
        if halves.len() > MAX_HALVES {
            return Err(ImageError::TooLarge(halves.len()));
        }
        Ok(Self { halves })
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, ImageError> {
        if bytes.len() % 2 != 0 {
            return Err(ImageError::OddLength(bytes.len()));
        }
        let halves = bytes
            .chunks_exact(2)
            .map(|pair| u16::from_le_bytes([pair[0], pair[1]]))
            .collect();
        Self::from_halves(halves)
    }

    pub fn from_hex(text: &str) -> Result<Self, ImageError> {
        let mut halves = Vec::new();
        for (index, raw) in text.lines().enumerate() {
            let content = raw.split('#').next().unwrap_or("").trim();
            if content.is_empty() {
                continue;
            }
            let digits = content
                .strip_prefix("0x")
                .or_else(|| content.strip_prefix("0X"))
                .unwrap_or(content)
                .replace('_', "");
            let half = u16::from_str_radix(&digits, 16).map_err(|_| ImageError::BadHalfword {
                line: index + 1,
                text: content.to_string(),
            })?;
            halves.push(half);
        }
        Self::from_halves(halves)
    }

    #[must_use]
    pub fn halves(&self) -> &[u16] {
        &self.halves
    }

    /// Packed words, low half first. A trailing odd half fills the low half
    /// of a final word.
    #[must_use]
    pub fn words(&self) -> Vec<u32> {
        self.halves
            .chunks(2)
            .map(|pair| {
                let high = pair.get(1).copied().unwrap_or(0);
                u32::from(pair[0]) | (u32::from(high) << 16)
            })
            .collect()
    }

    /// Copy into `memory` starting at halfword address `origin`.
    pub fn load_into(&self, memory: &mut SimpleMemory, origin: u32) {
        memory.load_halves(origin, &self.halves);
    }
}
