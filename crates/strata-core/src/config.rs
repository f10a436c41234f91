//! Run configuration: total length, cache size, thread hint and sampling.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use strata_abi::SamplingParams;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("I/O error reading config: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid config JSON: {0}")]
    Serde(#[from] serde_json::Error),

    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Knobs for one generation run.
///
/// `n_ctx` and `n_threads` are handed to the engine when it is created; the
/// loop itself re-reads `n_ctx` from the engine so the cache check always
/// uses what the engine actually allocated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GenerationConfig {
    /// Total length of the sequence including the prompt.
    pub n_len: usize,
    /// KV cache capacity requested from the engine.
    pub n_ctx: usize,
    /// Engine parallelism hint.
    pub n_threads: usize,
    /// Batch capacity; `None` means "same as the engine's n_ctx".
    pub batch_capacity: Option<usize>,
    pub sampling: SamplingParams,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            n_len: 32,
            n_ctx: 8192,
            n_threads: 1,
            batch_capacity: None,
            sampling: SamplingParams::default(),
        }
    }
}

impl GenerationConfig {
    /// Load from a JSON file. Missing fields take their defaults.
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let raw = fs::read_to_string(path)?;
        let cfg: Self = serde_json::from_str(&raw)?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.n_len == 0 {
            return Err(ConfigError::Invalid("n_len must be >= 1".into()));
        }
        if self.n_ctx == 0 {
            return Err(ConfigError::Invalid("n_ctx must be >= 1".into()));
        }
        if self.n_threads == 0 {
            return Err(ConfigError::Invalid("n_threads must be >= 1".into()));
        }
        if self.batch_capacity == Some(0) {
            return Err(ConfigError::Invalid("batch_capacity must be >= 1".into()));
        }
        Ok(())
    }
}
