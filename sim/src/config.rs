/// Simulator settings, read from `CARDBEACON_*` environment variables.
use std::str::FromStr;

use anyhow::Context;
use cardbeacon::pipeline::PipelineConfig;

#[derive(Debug, Clone, PartialEq)]
pub struct SimConfig {
    pub pipeline: PipelineConfig,
    /// Delay between a scan trigger and its results
    pub scan_latency_ms: u64,
    /// Stop after this many seconds; 0 runs until killed
    pub run_secs: u64,
    /// Cards the sender broadcasts before going quiet; 0 is unlimited
    pub cards: u32,
    /// Fixed RNG seed for reproducible card sequences
    pub seed: Option<u64>,
    /// Put unrelated and malformed networks on air
    pub noise: bool,
}

impl SimConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(get: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let defaults = PipelineConfig::new();
        let config = Self {
            pipeline: PipelineConfig {
                scan_interval_ms: parse(&get, "CARDBEACON_SCAN_MS", defaults.scan_interval_ms)?,
                cache_window_ms: parse(&get, "CARDBEACON_CACHE_MS", defaults.cache_window_ms)?,
            },
            scan_latency_ms: parse(&get, "CARDBEACON_SCAN_LATENCY_MS", 150)?,
            run_secs: parse(&get, "CARDBEACON_RUN_SECS", 0)?,
            cards: parse(&get, "CARDBEACON_CARDS", 0)?,
            seed: get("CARDBEACON_SEED")
                .map(|v| v.trim().parse().with_context(|| format!("CARDBEACON_SEED={v:?} is not a number")))
                .transpose()?,
            noise: parse(&get, "CARDBEACON_NOISE", true)?,
        };

        anyhow::ensure!(config.pipeline.scan_interval_ms > 0, "CARDBEACON_SCAN_MS must be positive");
        anyhow::ensure!(config.pipeline.cache_window_ms > 0, "CARDBEACON_CACHE_MS must be positive");
        Ok(config)
    }
}

fn parse<T>(get: &impl Fn(&str) -> Option<String>, key: &str, default: T) -> anyhow::Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match get(key) {
        Some(v) => v
            .trim()
            .parse()
            .with_context(|| format!("{key}={v:?} is not a valid value")),
        None => Ok(default),
    }
}
