//! Simulated network source
//!
//! Stands in for the Ethernet receive path: once per period it pushes one
//! sequenced stereo block per eligible stream into a [`LocalMultiplexer`],
//! optionally losing blocks at random and periodically dropping the link.

use crate::config::SimulationSettings;
use crate::multiplexer::{BlockRef, LocalMultiplexer, Multiplexer};
use netaudio_common::{SampleBlock, StreamIndex, AUDIO_BLOCK_SAMPLES};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::sync::Arc;
use tracing::info;

/// Peak amplitude of the generated test tone
const TONE_AMPLITUDE: i32 = 8_000;

/// Per-stream generator state
struct SimStream {
    index: StreamIndex,
    sequence: u32,
}

/// Drives a [`LocalMultiplexer`] with synthetic blocks
pub struct SimulatedSource {
    mux: Arc<LocalMultiplexer>,
    streams: Vec<SimStream>,
    drop_rate: f64,
    link_drop_every: u64,
    link_down_ticks: u64,
    rng: StdRng,
    steps: u64,
    generated: u64,
    dropped: u64,
}

impl SimulatedSource {
    /// Configure `mux` per `settings` and build a source for it
    ///
    /// Marks every eligible stream active and host-linked.
    pub fn new(mux: Arc<LocalMultiplexer>, settings: &SimulationSettings) -> Self {
        for &index in &settings.eligible {
            mux.set_stream_state(index, true, true);
        }
        let rng = match settings.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };

        Self {
            mux,
            streams: settings
                .eligible
                .iter()
                .map(|&index| SimStream { index, sequence: 0 })
                .collect(),
            drop_rate: settings.drop_rate,
            link_drop_every: settings.link_drop_every,
            link_down_ticks: settings.link_down_ticks,
            rng,
            steps: 0,
            generated: 0,
            dropped: 0,
        }
    }

    /// Produce one period's worth of blocks
    pub fn step(&mut self) {
        self.steps += 1;
        self.update_link();
        if !self.mux.link_active() {
            return;
        }

        for stream in &mut self.streams {
            let sequence = stream.sequence;
            stream.sequence = stream.sequence.wrapping_add(1);
            self.generated += 1;

            if self.drop_rate > 0.0 && self.rng.gen_bool(self.drop_rate) {
                self.dropped += 1;
                continue;
            }
            self.mux.push_block(stream.index, tone_block(sequence));
        }
    }

    fn update_link(&mut self) {
        if self.link_drop_every == 0 {
            return;
        }
        let phase = self.steps % self.link_drop_every;
        let up = self.steps < self.link_drop_every
            || phase >= self.link_down_ticks.min(self.link_drop_every);
        if up != self.mux.link_active() {
            info!(step = self.steps, "simulated link {}", if up { "up" } else { "down" });
            self.mux.set_link_active(up);
            if !up {
                self.mux.clear_queues();
            }
        }
    }

    /// Blocks generated (including dropped ones)
    pub fn generated(&self) -> u64 {
        self.generated
    }

    /// Blocks lost in simulated transit
    pub fn dropped(&self) -> u64 {
        self.dropped
    }
}

/// Sawtooth test tone, right channel inverted
fn tone_block(sequence: u32) -> BlockRef {
    let mut left = SampleBlock::silent();
    let mut right = SampleBlock::silent();
    for (i, (l, r)) in left
        .samples
        .iter_mut()
        .zip(right.samples.iter_mut())
        .enumerate()
    {
        let phase = i as i32 * 2 - AUDIO_BLOCK_SAMPLES as i32;
        let value = (phase * TONE_AMPLITUDE / AUDIO_BLOCK_SAMPLES as i32) as i16;
        *l = value;
        *r = -value;
    }

    BlockRef {
        sequence,
        left: Arc::new(left),
        right: Arc::new(right),
    }
}
