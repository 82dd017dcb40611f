use anyhow::{bail, Result};
use clap::Parser;

/// Drives a camera reading store with simulated live-feed frames
#[derive(Debug, Clone, Parser)]
#[command(name = "camera-simulator", version)]
pub struct Config {
    /// Milliseconds between frames
    #[arg(long, env = "TICK_MS", default_value_t = 1000)]
    pub tick_ms: u64,

    /// Stop after this many frames (0 = run until Ctrl-C)
    #[arg(long, env = "FRAMES", default_value_t = 0)]
    pub frames: u64,

    /// Probability that a frame reports a detected person
    #[arg(long, env = "PERSON_RATE", default_value_t = 0.1)]
    pub person_rate: f64,

    /// Print every table snapshot to stdout as a JSON line
    #[arg(long, env = "EMIT_JSON")]
    pub emit_json: bool,
}

impl Config {
    pub fn validate(&self) -> Result<()> {
        if self.tick_ms == 0 {
            bail!("TICK_MS must be greater than 0");
        }
        if !(0.0..=1.0).contains(&self.person_rate) {
            bail!("PERSON_RATE {} out of range [0, 1]", self.person_rate);
        }
        Ok(())
    }
}
