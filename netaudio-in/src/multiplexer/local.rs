//! In-process multiplexer
//!
//! Holds a fixed table of stream slots, each with its own bounded block
//! queue. Whoever receives network audio pushes blocks in with
//! [`LocalMultiplexer::push_block`]; consumers read them through the
//! [`Multiplexer`] trait.
//!
//! Every subscriber of a stream sees every block. Each consumer has its own
//! read position per stream, and a block leaves the queue once as many reads
//! as the stream has subscribers have been made on it.
//!
//! **Thread Safety:** subscriber counts and flags are atomics; each queue is
//! behind its own mutex, held only for a single push or read.

use super::{BlockRef, Multiplexer, StreamDescriptor};
use netaudio_common::{ConsumerId, StreamIndex};
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, AtomicU32, AtomicU64, AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};
use tracing::{debug, trace};

/// Default per-stream queue capacity (blocks)
const DEFAULT_QUEUE_CAPACITY: usize = 8;

struct QueuedBlock {
    block: BlockRef,
    /// Distinct consumers that have read this block
    reads: usize,
}

/// Blocks of one stream plus per-consumer read positions
///
/// Positions are absolute: `base` is the position of the front block.
#[derive(Default)]
struct StreamQueue {
    blocks: VecDeque<QueuedBlock>,
    base: u64,
    cursors: HashMap<ConsumerId, u64>,
}

impl StreamQueue {
    fn with_capacity(capacity: usize) -> Self {
        Self {
            blocks: VecDeque::with_capacity(capacity),
            ..Self::default()
        }
    }

    /// Drop the front block; returns how many reads it had
    fn pop_front(&mut self) -> Option<usize> {
        let front = self.blocks.pop_front()?;
        self.base += 1;
        Some(front.reads)
    }

    fn clear(&mut self) {
        self.base += self.blocks.len() as u64;
        self.blocks.clear();
    }

    /// Next block `consumer` has not read yet
    ///
    /// A consumer that fell behind the front (overrun or cleared queue)
    /// resumes at the oldest block still held.
    fn read(&mut self, consumer: ConsumerId, subscribers: usize) -> Option<BlockRef> {
        let base = self.base;
        let cursor = self.cursors.entry(consumer).or_insert(base);
        if *cursor < base {
            *cursor = base;
        }
        let offset = (*cursor - base) as usize;
        let entry = self.blocks.get_mut(offset)?;
        *cursor += 1;
        entry.reads += 1;
        let block = entry.block.clone();

        while self
            .blocks
            .front()
            .is_some_and(|front| front.reads >= subscribers.max(1))
        {
            self.pop_front();
        }
        Some(block)
    }
}

struct StreamSlot {
    active: AtomicBool,
    host_linked: AtomicBool,
    subscribers: AtomicUsize,
    queue: Mutex<StreamQueue>,
}

impl StreamSlot {
    fn new(queue_capacity: usize) -> Self {
        Self {
            active: AtomicBool::new(false),
            host_linked: AtomicBool::new(false),
            subscribers: AtomicUsize::new(0),
            queue: Mutex::new(StreamQueue::with_capacity(queue_capacity)),
        }
    }

    fn queue(&self) -> MutexGuard<'_, StreamQueue> {
        // No queue update can panic halfway through
        self.queue.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Multiplexer backed by in-memory queues
pub struct LocalMultiplexer {
    enabled: AtomicBool,
    link_up: AtomicBool,
    next_consumer: AtomicU32,
    active_streams: AtomicUsize,
    queue_capacity: usize,
    /// Unread blocks discarded because a stream queue was full
    overruns: AtomicU64,
    slots: Vec<StreamSlot>,
}

impl LocalMultiplexer {
    /// Create a multiplexer with `streams` slots, all in use, enabled with the link up
    ///
    /// Slots start inactive and unlinked; see [`LocalMultiplexer::set_stream_state`].
    pub fn new(streams: usize) -> Self {
        Self::with_queue_capacity(streams, DEFAULT_QUEUE_CAPACITY)
    }

    /// Create a multiplexer with an explicit per-stream queue capacity
    pub fn with_queue_capacity(streams: usize, queue_capacity: usize) -> Self {
        let queue_capacity = queue_capacity.max(1);
        debug!(
            "Creating local multiplexer: {} stream slot(s), queue capacity {} block(s)",
            streams, queue_capacity
        );

        Self {
            enabled: AtomicBool::new(true),
            link_up: AtomicBool::new(true),
            next_consumer: AtomicU32::new(0),
            active_streams: AtomicUsize::new(streams),
            queue_capacity,
            overruns: AtomicU64::new(0),
            slots: (0..streams).map(|_| StreamSlot::new(queue_capacity)).collect(),
        }
    }

    /// Enable or disable networking as a whole
    pub fn set_enabled(&self, enabled: bool) {
        self.enabled.store(enabled, Ordering::Release);
    }

    /// Raise or drop the physical link
    pub fn set_link_active(&self, up: bool) {
        self.link_up.store(up, Ordering::Release);
    }

    /// Limit how many slots count as in use (clamped to the slot table size)
    pub fn set_active_stream_count(&self, count: usize) {
        self.active_streams
            .store(count.min(self.slots.len()), Ordering::Release);
    }

    /// Mark a stream's liveness and host linkage
    ///
    /// Returns false if `index` is not a slot.
    pub fn set_stream_state(&self, index: StreamIndex, active: bool, host_linked: bool) -> bool {
        let Some(slot) = self.slots.get(index) else {
            return false;
        };
        slot.active.store(active, Ordering::Release);
        slot.host_linked.store(host_linked, Ordering::Release);
        trace!(stream = index, active, host_linked, "stream state updated");
        true
    }

    /// Queue a received block on `index`
    ///
    /// When the queue is full the oldest block is discarded. Discarding a
    /// block some subscriber has not read yet counts as an overrun.
    /// Returns false if `index` is not a slot.
    pub fn push_block(&self, index: StreamIndex, block: BlockRef) -> bool {
        let Some(slot) = self.slots.get(index) else {
            return false;
        };
        let mut queue = slot.queue();
        if queue.blocks.len() >= self.queue_capacity {
            let subscribers = slot.subscribers.load(Ordering::Acquire);
            if queue.pop_front().is_some_and(|reads| reads < subscribers) {
                self.overruns.fetch_add(1, Ordering::Relaxed);
            }
        }
        queue.blocks.push_back(QueuedBlock { block, reads: 0 });
        true
    }

    /// Blocks held on `index`
    pub fn queued(&self, index: StreamIndex) -> usize {
        self.slots.get(index).map_or(0, |slot| slot.queue().blocks.len())
    }

    /// Drop every queued block on every stream
    pub fn clear_queues(&self) {
        for slot in &self.slots {
            slot.queue().clear();
        }
    }

    /// Unread blocks discarded because a queue was full
    pub fn overruns(&self) -> u64 {
        self.overruns.load(Ordering::Relaxed)
    }

    fn active_slot(&self, index: StreamIndex) -> Option<&StreamSlot> {
        if index < self.active_stream_count() {
            self.slots.get(index)
        } else {
            None
        }
    }
}

impl Multiplexer for LocalMultiplexer {
    fn register_consumer(&self) -> ConsumerId {
        ConsumerId(self.next_consumer.fetch_add(1, Ordering::Relaxed))
    }

    fn enabled(&self) -> bool {
        self.enabled.load(Ordering::Acquire)
    }

    fn link_active(&self) -> bool {
        self.link_up.load(Ordering::Acquire)
    }

    fn active_stream_count(&self) -> usize {
        self.active_streams.load(Ordering::Acquire)
    }

    fn stream(&self, index: StreamIndex) -> Option<StreamDescriptor> {
        self.active_slot(index).map(|slot| StreamDescriptor {
            active: slot.active.load(Ordering::Acquire),
            host_linked: slot.host_linked.load(Ordering::Acquire),
            subscribers: slot.subscribers.load(Ordering::Acquire),
        })
    }

    fn add_subscriber(&self, index: StreamIndex) -> usize {
        match self.slots.get(index) {
            Some(slot) => slot.subscribers.fetch_add(1, Ordering::AcqRel) + 1,
            None => 0,
        }
    }

    fn remove_subscriber(&self, index: StreamIndex) -> usize {
        let Some(slot) = self.slots.get(index) else {
            return 0;
        };
        let previous = slot
            .subscribers
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |n| Some(n.saturating_sub(1)))
            .unwrap_or(0);
        previous.saturating_sub(1)
    }

    fn next_ready_block(
        &self,
        consumer: ConsumerId,
        stream: Option<StreamIndex>,
    ) -> Option<BlockRef> {
        let slot = self.active_slot(stream?)?;
        let subscribers = slot.subscribers.load(Ordering::Acquire);
        slot.queue().read(consumer, subscribers)
    }

    fn free_queue_depth(&self) -> Option<usize> {
        let in_use = self.active_stream_count();
        let free = self.slots[..in_use]
            .iter()
            .map(|slot| self.queue_capacity.saturating_sub(slot.queue().blocks.len()))
            .sum();
        Some(free)
    }
}
