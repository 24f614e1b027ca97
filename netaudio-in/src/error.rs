//! Error types for netaudio-in
//!
//! The per-tick consumption path never fails; these errors cover the outer
//! surfaces (configuration loading, checked subscription requests).

use netaudio_common::StreamIndex;
use thiserror::Error;

/// Main error type for netaudio-in
#[derive(Error, Debug)]
pub enum Error {
    /// Configuration file loading or validation errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Errors surfaced from netaudio-common (config resolution, I/O)
    #[error(transparent)]
    Common(#[from] netaudio_common::Error),

    /// Stream index outside the multiplexer's active stream range
    #[error("Invalid stream {stream}: {available} active stream(s)")]
    InvalidStream {
        stream: StreamIndex,
        available: usize,
    },

    /// Operation needs a multiplexer but none is attached
    #[error("No multiplexer attached")]
    NotAttached,
}

/// Convenience Result type using netaudio-in Error
pub type Result<T> = std::result::Result<T, Error>;
