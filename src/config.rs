use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::types::{BeaverError, Limits, DEFAULT_CHECKPOINT_PERIOD, DEFAULT_MAX_TAPE_LEN};

/// Search configuration loaded from TOML.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchConfig {
    /// Maximum number of steps each candidate may run.
    #[serde(default = "default_max_steps")]
    pub max_steps: u64,

    /// Maximum tape storage length, in cells, for each candidate.
    #[serde(default = "default_max_tape_len")]
    pub max_tape_len: usize,

    /// Number of examined tables between two routine checkpoints.
    #[serde(default = "default_checkpoint_period")]
    pub checkpoint_period: u64,

    /// Directory receiving checkpoint and best-score files.
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,

    /// Best score already known; only scores reaching it are persisted.
    #[serde(default)]
    pub initial_best: usize,

    /// Whether to give up early on machines that re-enter state 0 with a blank tape.
    #[serde(default = "default_blank_loop_check")]
    pub blank_loop_check: bool,
}

fn default_max_steps() -> u64 {
    u64::MAX
}
fn default_max_tape_len() -> usize {
    DEFAULT_MAX_TAPE_LEN
}
fn default_checkpoint_period() -> u64 {
    DEFAULT_CHECKPOINT_PERIOD
}
fn default_output_dir() -> PathBuf {
    PathBuf::from(".")
}
fn default_blank_loop_check() -> bool {
    true
}

impl SearchConfig {
    /// Loads a configuration file. Missing fields take their defaults.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, BeaverError> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|e| {
            BeaverError::FileError(format!("Failed to read {}: {}", path.display(), e))
        })?;

        Self::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> Result<Self, BeaverError> {
        let config: Self = toml::from_str(content)
            .map_err(|e| BeaverError::ValidationError(format!("Invalid search config: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), BeaverError> {
        if self.checkpoint_period == 0 {
            return Err(BeaverError::ValidationError(
                "checkpoint_period must be positive".to_string(),
            ));
        }
        if self.max_tape_len == 0 {
            return Err(BeaverError::ValidationError(
                "max_tape_len must be positive".to_string(),
            ));
        }
        if self.max_steps == 0 {
            tracing::warn!("max_steps is 0; no candidate will ever halt");
        }
        Ok(())
    }

    /// The per-candidate run bounds.
    pub fn limits(&self) -> Limits {
        Limits::new(self.max_steps, self.max_tape_len).with_blank_loop_check(self.blank_loop_check)
    }
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            max_steps: default_max_steps(),
            max_tape_len: default_max_tape_len(),
            checkpoint_period: default_checkpoint_period(),
            output_dir: default_output_dir(),
            initial_best: 0,
            blank_loop_check: default_blank_loop_check(),
        }
    }
}
