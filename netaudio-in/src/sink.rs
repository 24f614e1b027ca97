//! Downstream sinks receiving forwarded channel buffers

use netaudio_common::{BufferRef, Channel};

/// Receiver of forwarded audio buffers
///
/// `forward` is fire-and-forget. The buffer reference is borrowed: a sink
/// that wants to keep the samples clones the `BufferRef`.
pub trait BlockSink {
    fn forward(&mut self, buffer: &BufferRef, channel: Channel);
}

/// Sink that discards everything
#[derive(Debug, Default, Clone, Copy)]
pub struct NullSink;

impl BlockSink for NullSink {
    fn forward(&mut self, _buffer: &BufferRef, _channel: Channel) {}
}

/// Per-channel level meter
///
/// Tracks blocks seen and the peak absolute sample per channel.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct LevelMeterSink {
    blocks: [u64; 2],
    peak: [u16; 2],
}

impl LevelMeterSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Blocks forwarded on `channel`
    pub fn blocks(&self, channel: Channel) -> u64 {
        self.blocks[channel.index()]
    }

    /// Peak absolute sample seen on `channel`
    pub fn peak(&self, channel: Channel) -> u16 {
        self.peak[channel.index()]
    }
}

impl BlockSink for LevelMeterSink {
    fn forward(&mut self, buffer: &BufferRef, channel: Channel) {
        let i = channel.index();
        self.blocks[i] += 1;
        let block_peak = buffer
            .samples
            .iter()
            .map(|s| s.unsigned_abs())
            .max()
            .unwrap_or(0);
        self.peak[i] = self.peak[i].max(block_peak);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use netaudio_common::SampleBlock;
    use std::sync::Arc;

    #[test]
    fn test_level_meter_tracks_channels_independently() {
        let mut meter = LevelMeterSink::new();
        meter.forward(&Arc::new(SampleBlock::filled(-300)), Channel::Left);
        meter.forward(&Arc::new(SampleBlock::filled(100)), Channel::Left);
        meter.forward(&Arc::new(SampleBlock::silent()), Channel::Right);

        assert_eq!(meter.blocks(Channel::Left), 2);
        assert_eq!(meter.blocks(Channel::Right), 1);
        assert_eq!(meter.peak(Channel::Left), 300);
        assert_eq!(meter.peak(Channel::Right), 0);
    }

    #[test]
    fn test_level_meter_handles_i16_min() {
        let mut meter = LevelMeterSink::new();
        meter.forward(&Arc::new(SampleBlock::filled(i16::MIN)), Channel::Right);
        assert_eq!(meter.peak(Channel::Right), 32768);
    }
}
