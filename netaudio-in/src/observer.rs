//! Diagnostic observers for network input consumers
//!
//! Consumers report registration, subscription changes, gaps and periodic
//! health through an [`InputObserver`]. Production builds that want no
//! diagnostics use [`NoopObserver`].

use netaudio_common::events::{EventBus, NetAudioEvent};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Structured event sink for consumer diagnostics
///
/// Called from the tick path: implementations must not block.
pub trait InputObserver: Send + Sync {
    fn on_event(&self, event: NetAudioEvent);
}

/// Observer that ignores every event
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopObserver;

impl InputObserver for NoopObserver {
    fn on_event(&self, _event: NetAudioEvent) {}
}

/// Observer that writes events to the tracing subscriber
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingObserver;

impl InputObserver for TracingObserver {
    fn on_event(&self, event: NetAudioEvent) {
        match event {
            NetAudioEvent::ConsumerRegistered { consumer_id, .. } => {
                info!("{} registered with multiplexer", consumer_id);
            }
            NetAudioEvent::StreamSubscribed {
                consumer_id,
                stream,
                subscribers,
                ..
            } => {
                debug!(?consumer_id, stream, subscribers, "subscribed to stream");
            }
            NetAudioEvent::StreamReleased {
                consumer_id,
                stream,
                subscribers,
                ..
            } => {
                debug!(?consumer_id, stream, subscribers, "released stream");
            }
            NetAudioEvent::BlockMissing {
                consumer_id,
                stream,
                missing,
                received,
                loss_ratio_percent,
                free_queue_depth,
                ..
            } => match loss_ratio_percent {
                Some(ratio) => warn!(
                    ?consumer_id,
                    stream,
                    ?free_queue_depth,
                    "Missing block: {} missing, {} received, loss ratio = {:.3}%",
                    missing,
                    received,
                    ratio
                ),
                None => warn!(
                    ?consumer_id,
                    stream,
                    ?free_queue_depth,
                    "Missing block: {} missing, nothing received yet",
                    missing
                ),
            },
            NetAudioEvent::LossStatsReset {
                consumer_id,
                stream,
                discarded_missing,
                discarded_received,
                ..
            } => {
                debug!(
                    ?consumer_id,
                    ?stream,
                    discarded_missing, discarded_received, "loss statistics reset"
                );
            }
            NetAudioEvent::TickReport {
                consumer_id,
                stream,
                ticks,
                received,
                missing,
                free_queue_depth,
                ..
            } => {
                info!(
                    ?consumer_id,
                    ?stream,
                    ?free_queue_depth,
                    "{} ticks: {} received, {} missing",
                    ticks,
                    received,
                    missing
                );
            }
        }
    }
}

/// Observer that publishes events on an [`EventBus`]
#[derive(Clone)]
pub struct EventBusObserver {
    bus: EventBus,
}

impl EventBusObserver {
    pub fn new(bus: EventBus) -> Self {
        Self { bus }
    }
}

impl InputObserver for EventBusObserver {
    fn on_event(&self, event: NetAudioEvent) {
        self.bus.emit_lossy(event);
    }
}

/// Observer forwarding every event to several observers in order
#[derive(Clone, Default)]
pub struct FanoutObserver {
    observers: Vec<Arc<dyn InputObserver>>,
}

impl FanoutObserver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, observer: Arc<dyn InputObserver>) -> Self {
        self.observers.push(observer);
        self
    }
}

impl InputObserver for FanoutObserver {
    fn on_event(&self, event: NetAudioEvent) {
        if let Some((last, rest)) = self.observers.split_last() {
            for observer in rest {
                observer.on_event(event.clone());
            }
            last.on_event(event);
        }
    }
}
