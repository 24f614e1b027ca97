//! Per-tick block consumer
//!
//! One `BlockConsumer` feeds one downstream sink from one subscribed stream.
//! The host scheduler calls [`BlockConsumer::tick`] once per audio period:
//!
//! - not begun, no multiplexer, or multiplexer disabled → nothing happens
//!   (no silence block is emitted either)
//! - block ready → left/right forwarded to channels 0/1, `received` + 1
//! - no block → `missing` + 1, then either reported as a live-stream gap
//!   (link up and stream active) or treated as a disconnect and the loss
//!   counters are reset so the next connection starts clean
//!
//! `tick` never blocks and never fails.

use super::discovery::{eligible_streams, next_eligible_stream, EligibleStreams};
use super::loss::{LossStats, LossTracker};
use super::subscription::{Released, StreamSubscription, Subscribed};
use crate::error::{Error, Result};
use crate::multiplexer::Multiplexer;
use crate::observer::{InputObserver, NoopObserver};
use crate::sink::BlockSink;
use netaudio_common::events::NetAudioEvent;
use netaudio_common::time::now;
use netaudio_common::{Channel, ConsumerId, StreamIndex};
use std::sync::Arc;
use tracing::{debug, trace};

/// Network input: pulls stereo blocks for one stream and forwards them
pub struct BlockConsumer<S: BlockSink> {
    ready: bool,
    multiplexer: Option<Arc<dyn Multiplexer>>,
    consumer_id: Option<ConsumerId>,
    subscription: StreamSubscription,
    loss: LossTracker,
    sequence: u32,
    /// Ticks that passed the readiness gates
    ticks: u64,
    report_every: u64,
    sink: S,
    observer: Arc<dyn InputObserver>,
}

impl<S: BlockSink> BlockConsumer<S> {
    /// Create a consumer feeding `sink`
    ///
    /// The consumer does nothing until [`begin`](Self::begin) is called and a
    /// multiplexer is [attached](Self::attach).
    pub fn new(sink: S) -> Self {
        Self {
            ready: false,
            multiplexer: None,
            consumer_id: None,
            subscription: StreamSubscription::new(),
            loss: LossTracker::new(),
            sequence: 0,
            ticks: 0,
            report_every: 0,
            sink,
            observer: Arc::new(NoopObserver),
        }
    }

    /// Route diagnostics to `observer`
    pub fn with_observer(mut self, observer: Arc<dyn InputObserver>) -> Self {
        self.observer = observer;
        self
    }

    /// Emit a TickReport every `ticks` enabled ticks (0 disables)
    pub fn with_report_every(mut self, ticks: u64) -> Self {
        self.report_every = ticks;
        self
    }

    /// Mark ready and reset all local state
    ///
    /// Clears the registration handle, the subscription (without touching
    /// the multiplexer's subscriber counts), the loss counters and the
    /// current sequence.
    pub fn begin(&mut self) {
        self.sequence = 0;
        self.consumer_id = None;
        self.subscription.clear();
        self.loss.reset();
        self.ticks = 0;
        self.ready = true;
        debug!("network input begin() complete");
    }

    /// Set the multiplexer this consumer reads from
    pub fn attach(&mut self, multiplexer: Arc<dyn Multiplexer>) {
        self.multiplexer = Some(multiplexer);
    }

    /// Run one scheduling period
    pub fn tick(&mut self) {
        if !self.ready {
            return;
        }
        let Some(mux) = self.multiplexer.clone() else {
            return;
        };
        if !mux.enabled() {
            return;
        }

        let consumer_id = match self.consumer_id {
            Some(consumer_id) => consumer_id,
            None => {
                let consumer_id = mux.register_consumer();
                self.consumer_id = Some(consumer_id);
                self.observer.on_event(NetAudioEvent::ConsumerRegistered {
                    consumer_id,
                    timestamp: now(),
                });
                consumer_id
            }
        };
        self.ticks += 1;

        match mux.next_ready_block(consumer_id, self.subscription.current()) {
            Some(block) => {
                self.sequence = block.sequence;
                self.sink.forward(&block.left, Channel::Left);
                self.sink.forward(&block.right, Channel::Right);
                self.loss.record_received();
                trace!(sequence = block.sequence, "block forwarded");
            }
            None => self.record_gap(mux.as_ref()),
        }

        if self.report_every > 0 && self.ticks % self.report_every == 0 {
            let stats = self.loss.stats();
            self.observer.on_event(NetAudioEvent::TickReport {
                consumer_id: self.consumer_id,
                stream: self.subscription.current(),
                ticks: self.ticks,
                received: stats.received,
                missing: stats.missing,
                free_queue_depth: mux.free_queue_depth(),
                timestamp: now(),
            });
        }
    }

    fn record_gap(&mut self, mux: &dyn Multiplexer) {
        let stats = self.loss.record_missing();
        let stream = self.subscription.current();

        let live = stream.and_then(|s| mux.stream(s).map(|d| (s, d.active)));
        match live {
            Some((stream, true)) if mux.link_active() => {
                self.observer.on_event(NetAudioEvent::BlockMissing {
                    consumer_id: self.consumer_id,
                    stream,
                    missing: stats.missing,
                    received: stats.received,
                    loss_ratio_percent: stats.loss_ratio(),
                    free_queue_depth: mux.free_queue_depth(),
                    timestamp: now(),
                });
            }
            _ => {
                let discarded = self.loss.reset();
                // Only this tick's gap was counted: nothing carried over from a live epoch
                if discarded.received > 0 || discarded.missing > 1 {
                    self.observer.on_event(NetAudioEvent::LossStatsReset {
                        consumer_id: self.consumer_id,
                        stream,
                        discarded_missing: discarded.missing,
                        discarded_received: discarded.received,
                        timestamp: now(),
                    });
                }
            }
        }
    }

    /// Attach to `stream`, releasing any other stream first
    ///
    /// Returns false (state unchanged) when no multiplexer is attached or
    /// `stream` is not below the multiplexer's active stream count.
    pub fn subscribe(&mut self, stream: StreamIndex) -> bool {
        self.try_subscribe(stream).is_ok()
    }

    /// [`subscribe`](Self::subscribe) with the failure reason
    pub fn try_subscribe(&mut self, stream: StreamIndex) -> Result<Subscribed> {
        let mux = self.multiplexer.clone().ok_or(Error::NotAttached)?;
        let outcome = match self.subscription.subscribe(mux.as_ref(), stream) {
            Ok(outcome) => outcome,
            Err(e) => {
                debug!("subscribe({}) rejected: {}", stream, e);
                return Err(e);
            }
        };

        if let Some(released) = outcome.released {
            self.emit_released(released);
        }
        if !outcome.unchanged {
            self.observer.on_event(NetAudioEvent::StreamSubscribed {
                consumer_id: self.consumer_id,
                stream: outcome.stream,
                subscribers: outcome.subscribers,
                timestamp: now(),
            });
        }
        Ok(outcome)
    }

    /// Detach from the current stream; no-op when unsubscribed
    pub fn release(&mut self) {
        let Some(mux) = self.multiplexer.clone() else {
            return;
        };
        if let Some(released) = self.subscription.release(mux.as_ref()) {
            self.emit_released(released);
        }
    }

    fn emit_released(&self, released: Released) {
        self.observer.on_event(NetAudioEvent::StreamReleased {
            consumer_id: self.consumer_id,
            stream: released.stream,
            subscribers: released.subscribers,
            timestamp: now(),
        });
    }

    /// Stream currently subscribed to
    pub fn current_stream(&self) -> Option<StreamIndex> {
        self.subscription.current()
    }

    /// First eligible stream after `after` (None = from the beginning)
    ///
    /// None when no multiplexer is attached.
    pub fn next_eligible_stream(&self, after: Option<StreamIndex>) -> Option<StreamIndex> {
        let mux = self.multiplexer.as_deref()?;
        next_eligible_stream(mux, after)
    }

    /// All eligible streams, None when no multiplexer is attached
    pub fn eligible_streams(&self) -> Option<EligibleStreams<'_>> {
        self.multiplexer.as_deref().map(|mux| eligible_streams(mux))
    }

    /// Sequence number of the last forwarded block
    pub fn current_sequence(&self) -> u32 {
        self.sequence
    }

    /// Registration handle, once the first enabled tick has run
    pub fn consumer_id(&self) -> Option<ConsumerId> {
        self.consumer_id
    }

    pub fn loss_stats(&self) -> LossStats {
        self.loss.stats()
    }

    /// Ticks that got past the readiness gates since `begin`
    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::multiplexer::{BlockRef, LocalMultiplexer};
    use crate::observer::EventBusObserver;
    use netaudio_common::events::EventBus;
    use netaudio_common::{BufferRef, SampleBlock};

    #[derive(Default)]
    struct RecordingSink {
        forwarded: Vec<(i16, Channel)>,
    }

    impl BlockSink for RecordingSink {
        fn forward(&mut self, buffer: &BufferRef, channel: Channel) {
            self.forwarded.push((buffer.samples[0], channel));
        }
    }

    fn block(sequence: u32) -> BlockRef {
        BlockRef {
            sequence,
            left: Arc::new(SampleBlock::filled(sequence as i16)),
            right: Arc::new(SampleBlock::filled(-(sequence as i16))),
        }
    }

    fn live_setup() -> (Arc<LocalMultiplexer>, BlockConsumer<RecordingSink>) {
        let mux = Arc::new(LocalMultiplexer::new(2));
        mux.set_stream_state(0, true, true);
        let mut input = BlockConsumer::new(RecordingSink::default());
        input.begin();
        input.attach(mux.clone());
        assert!(input.subscribe(0));
        (mux, input)
    }

    #[test]
    fn test_tick_before_begin_is_noop() {
        let mux = Arc::new(LocalMultiplexer::new(1));
        mux.push_block(0, block(1));
        let mut input = BlockConsumer::new(RecordingSink::default());
        input.attach(mux.clone());
        input.tick();

        assert!(input.consumer_id().is_none());
        assert_eq!(mux.queued(0), 1);
        assert_eq!(input.ticks(), 0);
    }

    #[test]
    fn test_disabled_multiplexer_is_noop() {
        let (mux, mut input) = live_setup();
        mux.push_block(0, block(1));
        mux.set_enabled(false);
        input.tick();

        assert!(input.consumer_id().is_none());
        assert!(input.sink().forwarded.is_empty());
        assert!(input.loss_stats().is_empty());
        assert_eq!(mux.queued(0), 1);
    }

    #[test]
    fn test_registers_once() {
        let (mux, mut input) = live_setup();
        input.tick();
        input.tick();
        assert_eq!(input.consumer_id(), Some(ConsumerId(0)));
        // next handle proves register_consumer ran exactly once
        assert_eq!(mux.register_consumer(), ConsumerId(1));
    }

    #[test]
    fn test_hit_forwards_left_then_right() {
        let (mux, mut input) = live_setup();
        mux.push_block(0, block(7));
        input.tick();

        assert_eq!(
            input.sink().forwarded,
            vec![(7, Channel::Left), (-7, Channel::Right)]
        );
        assert_eq!(input.current_sequence(), 7);
        assert_eq!(input.loss_stats(), LossStats { received: 1, missing: 0 });
    }

    #[test]
    fn test_unsubscribed_gap_resets_silently() {
        let mux = Arc::new(LocalMultiplexer::new(1));
        let bus = EventBus::new(16);
        let mut rx = bus.subscribe();
        let mut input = BlockConsumer::new(RecordingSink::default())
            .with_observer(Arc::new(EventBusObserver::new(bus)));
        input.begin();
        input.attach(mux);
        input.tick();
        input.tick();

        assert!(input.loss_stats().is_empty());
        assert_eq!(rx.try_recv().unwrap().event_type(), "ConsumerRegistered");
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_inactive_stream_gap_resets() {
        let (mux, mut input) = live_setup();
        mux.push_block(0, block(1));
        input.tick();
        mux.set_stream_state(0, false, true);
        input.tick();

        assert!(input.loss_stats().is_empty());
    }

    #[test]
    fn test_live_gap_reports_missing() {
        let mux = Arc::new(LocalMultiplexer::with_queue_capacity(1, 4));
        mux.set_stream_state(0, true, true);
        let bus = EventBus::new(16);
        let mut rx = bus.subscribe();
        let mut input = BlockConsumer::new(RecordingSink::default())
            .with_observer(Arc::new(EventBusObserver::new(bus)));
        input.begin();
        input.attach(mux.clone());
        input.subscribe(0);
        mux.push_block(0, block(1));
        input.tick();
        input.tick();

        let events: Vec<_> = std::iter::from_fn(|| rx.try_recv().ok()).collect();
        let missing = events
            .iter()
            .find(|e| e.event_type() == "BlockMissing")
            .unwrap();
        match missing {
            NetAudioEvent::BlockMissing {
                consumer_id,
                stream,
                missing,
                received,
                loss_ratio_percent,
                free_queue_depth,
                ..
            } => {
                assert_eq!(*consumer_id, Some(ConsumerId(0)));
                assert_eq!(*stream, 0);
                assert_eq!((*missing, *received), (1, 1));
                assert_eq!(*loss_ratio_percent, Some(100.0));
                assert_eq!(*free_queue_depth, Some(4));
            }
            other => panic!("unexpected event {:?}", other),
        }
    }

    #[test]
    fn test_tick_report_interval() {
        let mux = Arc::new(LocalMultiplexer::new(1));
        let bus = EventBus::new(16);
        let mut rx = bus.subscribe();
        let mut input = BlockConsumer::new(RecordingSink::default())
            .with_observer(Arc::new(EventBusObserver::new(bus)))
            .with_report_every(3);
        input.begin();
        input.attach(mux);
        for _ in 0..7 {
            input.tick();
        }

        let reports: Vec<u64> = std::iter::from_fn(|| rx.try_recv().ok())
            .filter_map(|e| match e {
                NetAudioEvent::TickReport { ticks, .. } => Some(ticks),
                _ => None,
            })
            .collect();
        assert_eq!(reports, vec![3, 6]);
    }

    #[test]
    fn test_subscribe_without_multiplexer_fails() {
        let mut input = BlockConsumer::new(RecordingSink::default());
        input.begin();
        assert!(!input.subscribe(0));
        assert!(matches!(input.try_subscribe(0), Err(Error::NotAttached)));
        assert_eq!(input.current_stream(), None);
        assert_eq!(input.next_eligible_stream(None), None);
        assert!(input.eligible_streams().is_none());
    }

    #[test]
    fn test_begin_clears_local_state() {
        let (mux, mut input) = live_setup();
        mux.push_block(0, block(9));
        input.tick();
        input.begin();

        assert_eq!(input.current_stream(), None);
        assert_eq!(input.current_sequence(), 0);
        assert!(input.consumer_id().is_none());
        assert!(input.loss_stats().is_empty());
    }
}
