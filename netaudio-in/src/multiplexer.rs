//! Multiplexer contract consumed by network input consumers
//!
//! The multiplexer owns the inbound block queues, the per-stream descriptors
//! and the link status. Consumers only read from it, except for the
//! subscriber count of the stream they attach to, which they change through
//! [`Multiplexer::add_subscriber`] / [`Multiplexer::remove_subscriber`].
//!
//! Blocks fan out: every consumer subscribed to a stream receives every block
//! of it, and reading a block never takes it away from the other
//! subscribers. When a block is recycled is up to the implementation.
//!
//! All methods take `&self`: implementations shared between consumers on
//! different threads must make subscriber counting and block reads atomic.

pub mod local;

pub use local::LocalMultiplexer;

use netaudio_common::{BufferRef, ConsumerId, StreamIndex};

/// One stereo block handed out by the multiplexer
///
/// Consumers read the block and never recycle it; several consumers on the
/// same stream may hold clones of the same buffers.
#[derive(Debug, Clone)]
pub struct BlockRef {
    /// Packet sequence number assigned by the sender
    pub sequence: u32,
    /// Left channel samples
    pub left: BufferRef,
    /// Right channel samples
    pub right: BufferRef,
}

/// Snapshot of one stream slot
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StreamDescriptor {
    /// Stream is currently carrying audio
    pub active: bool,
    /// Stream is bound to a host on the network
    pub host_linked: bool,
    /// Consumers currently attached to this stream
    pub subscribers: usize,
}

impl StreamDescriptor {
    /// A stream worth subscribing to: active and linked to a host
    pub fn is_eligible(&self) -> bool {
        self.active && self.host_linked
    }
}

/// Source of inbound network audio blocks
pub trait Multiplexer: Send + Sync {
    /// Assign a new consumer handle
    fn register_consumer(&self) -> ConsumerId;

    /// Networking is configured and enabled
    fn enabled(&self) -> bool;

    /// Physical link is up
    fn link_active(&self) -> bool;

    /// Number of stream slots currently in use; valid indices are `0..count`
    fn active_stream_count(&self) -> usize;

    /// Descriptor for a stream slot, None when out of range
    fn stream(&self, index: StreamIndex) -> Option<StreamDescriptor>;

    /// Record one more subscriber on `index`, returning the new count
    fn add_subscriber(&self, index: StreamIndex) -> usize;

    /// Record one fewer subscriber on `index`, returning the new count
    fn remove_subscriber(&self, index: StreamIndex) -> usize;

    /// Next block on `stream` that `consumer` has not read yet
    ///
    /// Always None when `stream` is None. Must not block.
    fn next_ready_block(
        &self,
        consumer: ConsumerId,
        stream: Option<StreamIndex>,
    ) -> Option<BlockRef>;

    /// Free blocks in the shared pool (diagnostics only)
    fn free_queue_depth(&self) -> Option<usize> {
        None
    }
}
