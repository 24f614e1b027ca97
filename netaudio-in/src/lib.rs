//! # NetAudio Network Input Library (netaudio-in)
//!
//! Per-consumer subscription to multiplexed inbound network audio streams.
//!
//! **Purpose:** Attach an audio sink to one of several streams held by a
//! shared multiplexer, forward one stereo block per scheduling tick, and
//! track block loss within each connection epoch.
//!
//! **Architecture:** The multiplexer (queues, stream table, link status) and
//! the downstream sink are injected; [`input::BlockConsumer`] holds only its
//! own subscription, loss counters and sequence number.

pub mod config;
pub mod error;
pub mod input;
pub mod multiplexer;
pub mod observer;
pub mod sim;
pub mod sink;

pub use error::{Error, Result};
pub use input::{BlockConsumer, LossStats};
pub use multiplexer::{BlockRef, LocalMultiplexer, Multiplexer, StreamDescriptor};
pub use observer::InputObserver;
pub use sink::BlockSink;
