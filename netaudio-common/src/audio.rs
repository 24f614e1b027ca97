//! Core audio data types
//!
//! Defines the fixed-size sample block carried by network audio streams and
//! the stereo block reference handed between the multiplexer and its consumers.
//!
//! **Format:**
//! - Samples are i16 (signed 16-bit PCM)
//! - One block per channel, 128 frames each
//! - Left and right channels travel as separate blocks

use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Frames per audio block
pub const AUDIO_BLOCK_SAMPLES: usize = 128;

/// One channel's worth of samples for a single block period
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SampleBlock {
    pub samples: [i16; AUDIO_BLOCK_SAMPLES],
}

impl SampleBlock {
    /// Create a block of silence
    pub fn silent() -> Self {
        Self {
            samples: [0; AUDIO_BLOCK_SAMPLES],
        }
    }

    /// Create a block with every sample set to `value`
    pub fn filled(value: i16) -> Self {
        Self {
            samples: [value; AUDIO_BLOCK_SAMPLES],
        }
    }

    /// Check whether all samples are zero
    pub fn is_silent(&self) -> bool {
        self.samples.iter().all(|&s| s == 0)
    }
}

impl Default for SampleBlock {
    fn default() -> Self {
        Self::silent()
    }
}

/// Shared read-only reference to a sample block
///
/// Cloning a `BufferRef` never copies samples. Lifetime of the underlying
/// block is governed by whoever allocated it (the multiplexer).
pub type BufferRef = Arc<SampleBlock>;

/// Output channel index
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Channel {
    Left,
    Right,
}

impl Channel {
    /// Numeric channel index (0 = left, 1 = right)
    pub fn index(self) -> usize {
        match self {
            Channel::Left => 0,
            Channel::Right => 1,
        }
    }
}

impl std::fmt::Display for Channel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Channel::Left => write!(f, "left"),
            Channel::Right => write!(f, "right"),
        }
    }
}
