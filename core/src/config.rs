use crate::error::{Error, SondeResult};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

pub const DEFAULT_REC_COUNT: usize = 3;
pub const DEFAULT_Q_REC_COUNT: usize = 2;
pub const DEFAULT_PROBE_COUNT: usize = 3;
pub const DEFAULT_Q_PROBE_COUNT: usize = 2;
pub const DEFAULT_REC_THRESH: i64 = 2;
pub const DEFAULT_PROBE_THRESH: i64 = 2;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SondeConfig {
    #[serde(default)]
    pub protocol: ProtocolConfig,
    #[serde(default)]
    pub simulation: SimulationConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProtocolConfig {
    #[serde(default = "default_rec_count")]
    pub rec_count: usize,
    #[serde(default = "default_q_rec_count")]
    pub q_rec_count: usize,
    #[serde(default = "default_probe_count")]
    pub probe_count: usize,
    #[serde(default = "default_q_probe_count")]
    pub q_probe_count: usize,
    #[serde(default = "default_rec_thresh")]
    pub rec_thresh: i64,
    #[serde(default = "default_probe_thresh")]
    pub probe_thresh: i64,
}

fn default_rec_count() -> usize {
    DEFAULT_REC_COUNT
}
fn default_q_rec_count() -> usize {
    DEFAULT_Q_REC_COUNT
}
fn default_probe_count() -> usize {
    DEFAULT_PROBE_COUNT
}
fn default_q_probe_count() -> usize {
    DEFAULT_Q_PROBE_COUNT
}
fn default_rec_thresh() -> i64 {
    DEFAULT_REC_THRESH
}
fn default_probe_thresh() -> i64 {
    DEFAULT_PROBE_THRESH
}

impl Default for ProtocolConfig {
    fn default() -> Self {
        Self {
            rec_count: default_rec_count(),
            q_rec_count: default_q_rec_count(),
            probe_count: default_probe_count(),
            q_probe_count: default_q_probe_count(),
            rec_thresh: default_rec_thresh(),
            probe_thresh: default_probe_thresh(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimulationConfig {
    #[serde(default = "default_peers")]
    pub peers: usize,
    #[serde(default = "default_rounds")]
    pub rounds: usize,
    #[serde(default)]
    pub seed: Option<u64>,
    #[serde(default)]
    pub miss_rate: f64,
    #[serde(default)]
    pub evil_peers: usize,
}

fn default_peers() -> usize {
    10
}
fn default_rounds() -> usize {
    100
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            peers: default_peers(),
            rounds: default_rounds(),
            seed: None,
            miss_rate: 0.0,
            evil_peers: 0,
        }
    }
}

impl SondeConfig {
    pub fn load<P: AsRef<Path>>(path: P) -> SondeResult<Self> {
        let content = fs::read_to_string(path.as_ref())
            .map_err(|e| Error::Config(format!("Failed to read config file: {}", e)))?;

        let config: Self = toml::from_str(&content)
            .map_err(|e| Error::Config(format!("Failed to parse config: {}", e)))?;

        config.validate()?;

        Ok(config)
    }

    pub fn validate(&self) -> SondeResult<()> {
        if self.simulation.peers == 0 {
            return Err(Error::Config("peers must be > 0".to_string()));
        }

        if !(0.0..=1.0).contains(&self.simulation.miss_rate) {
            return Err(Error::Config("miss_rate must be within [0, 1]".to_string()));
        }

        Ok(())
    }

    pub fn to_toml(&self) -> SondeResult<String> {
        toml::to_string_pretty(self)
            .map_err(|e| Error::Config(format!("Failed to serialize config: {}", e)))
    }
}
