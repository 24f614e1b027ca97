//! # NetAudio Common Library
//!
//! Shared code for the network audio services including:
//! - Audio block types (stereo sample blocks, channel indices)
//! - Event types (NetAudioEvent enum) and the EventBus
//! - Configuration file resolution
//! - Timing utilities

pub mod audio;
pub mod config;
pub mod error;
pub mod events;
pub mod ids;
pub mod time;

pub use audio::{BufferRef, Channel, SampleBlock, AUDIO_BLOCK_SAMPLES};
pub use error::{Error, Result};
pub use ids::{ConsumerId, StreamIndex};
