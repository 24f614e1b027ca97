//! Single-stream subscription state
//!
//! A consumer is attached to at most one stream. Attaching to a new stream
//! releases the previous one first, so the multiplexer's subscriber counts
//! always reflect exactly one attachment per subscribed consumer.

use crate::error::{Error, Result};
use crate::multiplexer::Multiplexer;
use netaudio_common::StreamIndex;

/// A stream the subscription detached from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Released {
    pub stream: StreamIndex,
    /// Subscriber count left on that stream
    pub subscribers: usize,
}

/// Result of a successful subscribe
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Subscribed {
    pub stream: StreamIndex,
    /// Subscriber count on the stream after attaching
    pub subscribers: usize,
    /// Previous stream, when switching
    pub released: Option<Released>,
    /// Already attached to this stream; no counts changed
    pub unchanged: bool,
}

/// Which stream (if any) a consumer is attached to
#[derive(Debug, Default, Clone)]
pub struct StreamSubscription {
    stream: Option<StreamIndex>,
}

impl StreamSubscription {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn current(&self) -> Option<StreamIndex> {
        self.stream
    }

    /// Attach to `stream`
    ///
    /// Fails with [`Error::InvalidStream`] unless
    /// `stream < mux.active_stream_count()`; state is untouched on failure.
    pub fn subscribe(&mut self, mux: &dyn Multiplexer, stream: StreamIndex) -> Result<Subscribed> {
        let available = mux.active_stream_count();
        if stream >= available {
            return Err(Error::InvalidStream { stream, available });
        }

        if self.stream == Some(stream) {
            let subscribers = mux.stream(stream).map_or(0, |d| d.subscribers);
            return Ok(Subscribed {
                stream,
                subscribers,
                released: None,
                unchanged: true,
            });
        }

        let released = self.release(mux);
        let subscribers = mux.add_subscriber(stream);
        self.stream = Some(stream);

        Ok(Subscribed {
            stream,
            subscribers,
            released,
            unchanged: false,
        })
    }

    /// Detach from the current stream, if any
    pub fn release(&mut self, mux: &dyn Multiplexer) -> Option<Released> {
        let stream = self.stream.take()?;
        let subscribers = mux.remove_subscriber(stream);
        Some(Released {
            stream,
            subscribers,
        })
    }

    /// Forget the current stream without touching the multiplexer
    pub(crate) fn clear(&mut self) {
        self.stream = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::multiplexer::LocalMultiplexer;

    fn subscribers(mux: &LocalMultiplexer, stream: StreamIndex) -> usize {
        mux.stream(stream).unwrap().subscribers
    }

    #[test]
    fn test_subscribe_sets_current_and_counts() {
        let mux = LocalMultiplexer::new(3);
        let mut sub = StreamSubscription::new();

        let outcome = sub.subscribe(&mux, 2).unwrap();
        assert_eq!(outcome.subscribers, 1);
        assert_eq!(outcome.released, None);
        assert_eq!(sub.current(), Some(2));
        assert_eq!(subscribers(&mux, 2), 1);
    }

    #[test]
    fn test_subscribe_out_of_range_leaves_state() {
        let mux = LocalMultiplexer::new(3);
        let mut sub = StreamSubscription::new();
        sub.subscribe(&mux, 0).unwrap();

        let err = sub.subscribe(&mux, 3).unwrap_err();
        assert!(matches!(err, Error::InvalidStream { stream: 3, available: 3 }));
        assert_eq!(sub.current(), Some(0));
        assert_eq!(subscribers(&mux, 0), 1);
    }

    #[test]
    fn test_switch_moves_one_count() {
        let mux = LocalMultiplexer::new(2);
        let mut sub = StreamSubscription::new();
        sub.subscribe(&mux, 0).unwrap();

        let outcome = sub.subscribe(&mux, 1).unwrap();
        assert_eq!(
            outcome.released,
            Some(Released {
                stream: 0,
                subscribers: 0
            })
        );
        assert_eq!(subscribers(&mux, 0), 0);
        assert_eq!(subscribers(&mux, 1), 1);
        assert_eq!(sub.current(), Some(1));
    }

    #[test]
    fn test_resubscribe_same_stream_is_unchanged() {
        let mux = LocalMultiplexer::new(1);
        let mut sub = StreamSubscription::new();
        sub.subscribe(&mux, 0).unwrap();

        let outcome = sub.subscribe(&mux, 0).unwrap();
        assert!(outcome.unchanged);
        assert_eq!(outcome.subscribers, 1);
        assert_eq!(subscribers(&mux, 0), 1);
    }

    #[test]
    fn test_release_idempotent() {
        let mux = LocalMultiplexer::new(1);
        let mut sub = StreamSubscription::new();
        sub.subscribe(&mux, 0).unwrap();

        assert!(sub.release(&mux).is_some());
        assert!(sub.release(&mux).is_none());
        assert_eq!(sub.current(), None);
        assert_eq!(subscribers(&mux, 0), 0);
    }
}
