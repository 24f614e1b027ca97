//! Configuration management for netaudio-in
//!
//! Bootstrap configuration is a single TOML file with three tables:
//!
//! ```toml
//! [input]
//! tick_period_us = 2902      # 128 samples @ 44.1 kHz
//! report_every = 2000        # periodic report interval in ticks (0 = off)
//!
//! [simulation]
//! streams = 3
//! eligible = [1]
//! drop_rate = 0.02
//!
//! [logging]
//! level = "info"
//! ```
//!
//! Every key has a built-in default. File resolution priority:
//! 1. Command-line argument (--config)
//! 2. Environment variable (NETAUDIO_CONFIG)
//! 3. `<config_dir>/netaudio/input.toml`
//! 4. Built-in defaults

use crate::error::{Error, Result};
use netaudio_common::config::{load_toml_or_default, resolve_config_file, LoggingConfig};
use netaudio_common::time::block_period;
use netaudio_common::{StreamIndex, AUDIO_BLOCK_SAMPLES};
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;

/// Environment variable naming the config file
pub const CONFIG_ENV_VAR: &str = "NETAUDIO_CONFIG";

/// Config file name inside the user config directory
pub const CONFIG_FILE_NAME: &str = "input.toml";

/// Default stream sample rate (Hz)
pub const DEFAULT_SAMPLE_RATE: u32 = 44_100;

/// Complete netaudio-in configuration
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TomlConfig {
    #[serde(default)]
    pub input: InputSettings,

    #[serde(default)]
    pub simulation: SimulationSettings,

    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Consumer tick settings
#[derive(Debug, Clone, Deserialize)]
pub struct InputSettings {
    /// Scheduling period between ticks (microseconds)
    ///
    /// Default: one 128-frame block at 44.1kHz
    #[serde(default = "default_tick_period_us")]
    pub tick_period_us: u64,

    /// Emit a TickReport every N enabled ticks (0 disables reports)
    #[serde(default = "default_report_every")]
    pub report_every: u64,

    /// EventBus channel capacity
    #[serde(default = "default_event_capacity")]
    pub event_capacity: usize,
}

impl Default for InputSettings {
    fn default() -> Self {
        Self {
            tick_period_us: default_tick_period_us(),
            report_every: default_report_every(),
            event_capacity: default_event_capacity(),
        }
    }
}

impl InputSettings {
    /// Tick period as a Duration
    pub fn tick_period(&self) -> Duration {
        Duration::from_micros(self.tick_period_us)
    }
}

/// Simulated network source settings (used by the netaudio-in binary)
#[derive(Debug, Clone, Deserialize)]
pub struct SimulationSettings {
    /// Number of stream slots the multiplexer reports as active
    #[serde(default = "default_streams")]
    pub streams: usize,

    /// Streams marked active and host-linked
    #[serde(default = "default_eligible")]
    pub eligible: Vec<StreamIndex>,

    /// Probability (0.0-1.0) that a block is lost in transit
    #[serde(default)]
    pub drop_rate: f64,

    /// Take the link down every N ticks (0 = never)
    #[serde(default)]
    pub link_drop_every: u64,

    /// How many ticks the link stays down once dropped
    #[serde(default = "default_link_down_ticks")]
    pub link_down_ticks: u64,

    /// Per-stream queue capacity in blocks
    #[serde(default = "default_queue_capacity")]
    pub queue_capacity: usize,

    /// RNG seed for reproducible loss patterns
    #[serde(default)]
    pub seed: Option<u64>,
}

impl Default for SimulationSettings {
    fn default() -> Self {
        Self {
            streams: default_streams(),
            eligible: default_eligible(),
            drop_rate: 0.0,
            link_drop_every: 0,
            link_down_ticks: default_link_down_ticks(),
            queue_capacity: default_queue_capacity(),
            seed: None,
        }
    }
}

fn default_tick_period_us() -> u64 {
    block_period(AUDIO_BLOCK_SAMPLES, DEFAULT_SAMPLE_RATE).as_micros() as u64
}

fn default_report_every() -> u64 {
    2000
}

fn default_event_capacity() -> usize {
    256
}

fn default_streams() -> usize {
    3
}

fn default_eligible() -> Vec<StreamIndex> {
    vec![0]
}

fn default_link_down_ticks() -> u64 {
    10
}

fn default_queue_capacity() -> usize {
    8
}

impl TomlConfig {
    /// Resolve, load, and validate configuration
    ///
    /// `cli_path` takes priority over the environment and the user config
    /// directory. Missing files fall back to defaults.
    pub fn load(cli_path: Option<&Path>) -> Result<Self> {
        let path = resolve_config_file(cli_path, CONFIG_ENV_VAR, CONFIG_FILE_NAME)?;
        let config: TomlConfig = load_toml_or_default(path.as_deref())?;
        config.validate()?;
        Ok(config)
    }

    /// Parse and validate configuration from a TOML string
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: TomlConfig =
            toml::from_str(content).map_err(|e| Error::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Check value ranges
    pub fn validate(&self) -> Result<()> {
        if self.input.tick_period_us == 0 {
            return Err(Error::Config("input.tick_period_us must be > 0".to_string()));
        }

        let sim = &self.simulation;
        if !(0.0..=1.0).contains(&sim.drop_rate) {
            return Err(Error::Config(format!(
                "simulation.drop_rate must be within 0.0-1.0 (got {})",
                sim.drop_rate
            )));
        }
        if let Some(&bad) = sim.eligible.iter().find(|&&s| s >= sim.streams) {
            return Err(Error::Config(format!(
                "simulation.eligible stream {} out of range ({} streams)",
                bad, sim.streams
            )));
        }
        if sim.queue_capacity == 0 {
            return Err(Error::Config("simulation.queue_capacity must be > 0".to_string()));
        }

        Ok(())
    }
}
