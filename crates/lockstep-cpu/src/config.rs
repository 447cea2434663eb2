//! CPU configuration.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Highest value of the 5-bit addressing-mode field.
pub const MODE_MAX: u8 = 0b1_1111;

/// Inclusive range of addressing-mode values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModeRange {
    pub first: u8,
    pub last: u8,
}

impl ModeRange {
    #[must_use]
    pub const fn new(first: u8, last: u8) -> Self {
        Self { first, last }
    }

    #[must_use]
    pub const fn contains(&self, mode: u8) -> bool {
        self.first <= mode && mode <= self.last
    }
}

/// Decoder settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DecoderConfig {
    /// Modes that carry a second instruction word (displacement or index).
    pub two_word_modes: ModeRange,
}

impl Default for DecoderConfig {
    fn default() -> Self {
        Self {
            // `010xx`: displacement and indexed.
            two_word_modes: ModeRange::new(0b0_1000, 0b0_1011),
        }
    }
}

/// Configuration for a [`LockstepCpu`](crate::LockstepCpu).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CpuConfig {
    pub decoder: DecoderConfig,
    /// Also drive the instructions-retired, explicit read/write and
    /// prefetch-blocked counters. Off by default: those stay at zero.
    pub extended_counters: bool,
}

impl CpuConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        let range = self.decoder.two_word_modes;
        for mode in [range.first, range.last] {
            if mode > MODE_MAX {
                return Err(ConfigError::ModeOutOfRange(mode));
            }
        }
        if range.first > range.last {
            return Err(ConfigError::InvertedRange {
                first: range.first,
                last: range.last,
            });
        }
        Ok(())
    }
}

/// Rejected configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("addressing mode {0:#07b} does not fit the 5-bit mode field")]
    ModeOutOfRange(u8),
    #[error("two-word mode range is inverted: first {first:#07b} > last {last:#07b}")]
    InvertedRange { first: u8, last: u8 },
}
