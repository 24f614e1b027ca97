//! Eligible stream discovery
//!
//! Pure scans over multiplexer state. A stream is eligible when it is
//! active and linked to a host. Nothing here touches subscriptions.

use crate::multiplexer::Multiplexer;
use netaudio_common::StreamIndex;

/// First eligible stream with an index strictly greater than `after`
///
/// `after = None` starts from index 0. Returns None once the active stream
/// range is exhausted; restart from None to scan again.
pub fn next_eligible_stream(
    mux: &dyn Multiplexer,
    after: Option<StreamIndex>,
) -> Option<StreamIndex> {
    let start = after.map_or(0, |i| i.saturating_add(1));
    (start..mux.active_stream_count())
        .find(|&i| mux.stream(i).is_some_and(|d| d.is_eligible()))
}

/// Iterator over all eligible streams in index order
pub struct EligibleStreams<'a> {
    mux: &'a dyn Multiplexer,
    last: Option<StreamIndex>,
    done: bool,
}

impl Iterator for EligibleStreams<'_> {
    type Item = StreamIndex;

    fn next(&mut self) -> Option<StreamIndex> {
        if self.done {
            return None;
        }
        match next_eligible_stream(self.mux, self.last) {
            Some(index) => {
                self.last = Some(index);
                Some(index)
            }
            None => {
                self.done = true;
                None
            }
        }
    }
}

/// Walk every eligible stream from the beginning
pub fn eligible_streams(mux: &dyn Multiplexer) -> EligibleStreams<'_> {
    EligibleStreams {
        mux,
        last: None,
        done: false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::multiplexer::LocalMultiplexer;

    #[test]
    fn test_only_middle_stream_eligible() {
        let mux = LocalMultiplexer::new(3);
        mux.set_stream_state(0, true, false);
        mux.set_stream_state(1, true, true);
        mux.set_stream_state(2, false, true);

        assert_eq!(next_eligible_stream(&mux, None), Some(1));
        assert_eq!(next_eligible_stream(&mux, Some(1)), None);
    }

    #[test]
    fn test_no_streams() {
        let mux = LocalMultiplexer::new(0);
        assert_eq!(next_eligible_stream(&mux, None), None);
        assert_eq!(eligible_streams(&mux).count(), 0);
    }

    #[test]
    fn test_iterator_walks_all_eligible() {
        let mux = LocalMultiplexer::new(5);
        for i in [0, 2, 4] {
            mux.set_stream_state(i, true, true);
        }

        let found: Vec<_> = eligible_streams(&mux).collect();
        assert_eq!(found, vec![0, 2, 4]);
    }

    #[test]
    fn test_scan_stops_at_active_stream_count() {
        let mux = LocalMultiplexer::new(4);
        mux.set_stream_state(3, true, true);
        mux.set_active_stream_count(3);

        assert_eq!(next_eligible_stream(&mux, None), None);
    }

    #[test]
    fn test_after_past_end() {
        let mux = LocalMultiplexer::new(2);
        mux.set_stream_state(0, true, true);
        assert_eq!(next_eligible_stream(&mux, Some(usize::MAX)), None);
    }
}
