//! Event types for the NetAudio event system
//!
//! Provides the diagnostic event enum emitted by network input consumers and
//! the broadcast EventBus used to fan those events out to listeners.

use crate::ids::{ConsumerId, StreamIndex};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

/// NetAudio event types
///
/// Events are broadcast via EventBus and can be serialized as JSON for
/// external monitoring.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum NetAudioEvent {
    /// Consumer received its registration handle from the multiplexer
    ConsumerRegistered {
        consumer_id: ConsumerId,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// Consumer attached to a stream
    StreamSubscribed {
        /// None until the first enabled tick registers the consumer
        consumer_id: Option<ConsumerId>,
        stream: StreamIndex,
        /// Subscriber count on the stream after attaching
        subscribers: usize,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// Consumer detached from a stream
    StreamReleased {
        consumer_id: Option<ConsumerId>,
        stream: StreamIndex,
        /// Subscriber count on the stream after detaching
        subscribers: usize,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// No block was ready on a live stream with the link up
    BlockMissing {
        consumer_id: Option<ConsumerId>,
        stream: StreamIndex,
        /// Missing blocks in the current connection epoch (including this one)
        missing: u64,
        /// Blocks received in the current connection epoch
        received: u64,
        /// `missing / received * 100`, None while nothing has been received
        loss_ratio_percent: Option<f64>,
        /// Free blocks in the multiplexer's pool, if it reports one
        free_queue_depth: Option<usize>,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// Loss statistics discarded because the link or stream went away
    LossStatsReset {
        consumer_id: Option<ConsumerId>,
        stream: Option<StreamIndex>,
        discarded_missing: u64,
        discarded_received: u64,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// Periodic consumer health report
    TickReport {
        consumer_id: Option<ConsumerId>,
        stream: Option<StreamIndex>,
        ticks: u64,
        received: u64,
        missing: u64,
        free_queue_depth: Option<usize>,
        timestamp: chrono::DateTime<chrono::Utc>,
    },
}

impl NetAudioEvent {
    /// Get event type as string for filtering
    pub fn event_type(&self) -> &str {
        match self {
            NetAudioEvent::ConsumerRegistered { .. } => "ConsumerRegistered",
            NetAudioEvent::StreamSubscribed { .. } => "StreamSubscribed",
            NetAudioEvent::StreamReleased { .. } => "StreamReleased",
            NetAudioEvent::BlockMissing { .. } => "BlockMissing",
            NetAudioEvent::LossStatsReset { .. } => "LossStatsReset",
            NetAudioEvent::TickReport { .. } => "TickReport",
        }
    }
}

/// Central event distribution bus
///
/// The EventBus uses tokio::broadcast internally, providing:
/// - Non-blocking publish (slow subscribers don't block producers)
/// - Multiple concurrent subscribers
/// - Lagged message detection for slow subscribers
///
/// Publishing never awaits, so it is safe to call from a tick.
///
/// # Examples
///
/// ```
/// use netaudio_common::events::{EventBus, NetAudioEvent};
/// use netaudio_common::ConsumerId;
///
/// let event_bus = EventBus::new(100);
/// let mut rx = event_bus.subscribe();
///
/// event_bus.emit_lossy(NetAudioEvent::ConsumerRegistered {
///     consumer_id: ConsumerId(0),
///     timestamp: netaudio_common::time::now(),
/// });
///
/// assert_eq!(rx.try_recv().unwrap().event_type(), "ConsumerRegistered");
/// ```
#[derive(Clone)]
pub struct EventBus {
    tx: broadcast::Sender<NetAudioEvent>,
}

impl EventBus {
    /// Creates a new EventBus with specified channel capacity
    ///
    /// * `capacity` - Number of events to buffer before dropping old events
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx }
    }

    /// Subscribe to all future events
    ///
    /// Events emitted before subscription are not received.
    pub fn subscribe(&self) -> broadcast::Receiver<NetAudioEvent> {
        self.tx.subscribe()
    }

    /// Emit an event, ignoring if no subscribers are listening
    pub fn emit_lossy(&self, event: NetAudioEvent) {
        let _ = self.tx.send(event);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn missing_event() -> NetAudioEvent {
        NetAudioEvent::BlockMissing {
            consumer_id: Some(ConsumerId(3)),
            stream: 0,
            missing: 1,
            received: 2,
            loss_ratio_percent: Some(50.0),
            free_queue_depth: None,
            timestamp: crate::time::now(),
        }
    }

    #[test]
    fn test_event_serializes_with_type_tag() {
        let json = serde_json::to_value(missing_event()).unwrap();
        assert_eq!(json["type"], "BlockMissing");
        assert_eq!(json["consumer_id"], 3);
        assert_eq!(json["loss_ratio_percent"], 50.0);
        assert!(json["free_queue_depth"].is_null());
    }

    #[test]
    fn test_event_type_names() {
        assert_eq!(missing_event().event_type(), "BlockMissing");
        let reset = NetAudioEvent::LossStatsReset {
            consumer_id: None,
            stream: None,
            discarded_missing: 4,
            discarded_received: 0,
            timestamp: crate::time::now(),
        };
        assert_eq!(reset.event_type(), "LossStatsReset");
    }

    #[test]
    fn test_emit_lossy_without_subscribers() {
        let bus = EventBus::new(10);
        bus.emit_lossy(missing_event());

        // Subscribers only see events emitted after they subscribed
        let mut rx = bus.subscribe();
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_emit_reaches_all_subscribers() {
        let bus = EventBus::new(10);
        let mut rx1 = bus.subscribe();
        let mut rx2 = bus.subscribe();

        bus.emit_lossy(missing_event());

        assert_eq!(rx1.recv().await.unwrap().event_type(), "BlockMissing");
        assert_eq!(rx2.recv().await.unwrap().event_type(), "BlockMissing");
    }

    #[tokio::test]
    async fn test_slow_subscriber_lags() {
        let bus = EventBus::new(2);
        let mut rx = bus.subscribe();
        for _ in 0..3 {
            bus.emit_lossy(missing_event());
        }

        assert!(matches!(
            rx.recv().await,
            Err(broadcast::error::RecvError::Lagged(1))
        ));
    }
}
