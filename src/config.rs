//! Operator-facing settings for a fishing run

use crate::error::{MacroError, MacroResult};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Number of discrete steps the match threshold control exposes.
pub const THRESHOLD_STEPS: u8 = 10;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct MacroConfig {
    /// Settling time after a throw before the next tick may act
    pub start_delay_ms: u64,
    /// Wait between collecting the line and throwing it again
    pub throw_delay_ms: u64,
    /// Wait between spotting the pattern and collecting the line
    pub collect_delay_ms: u64,
    /// Minimum match score (0.0 to 1.0) that counts as a bite
    pub match_threshold: f32,
    /// Number of catches before the run stops on its own (0 = unlimited)
    pub run_limit: u32,
    /// Use the bundled subtitle pattern instead of a user image
    pub use_default_pattern: bool,
    /// User-supplied pattern image, ignored when `use_default_pattern` is set
    pub pattern_path: Option<PathBuf>,
    /// Period of the capture/match timer
    pub tick_interval_ms: u64,
}

impl Default for MacroConfig {
    fn default() -> Self {
        Self {
            start_delay_ms: 2000,
            throw_delay_ms: 1000,
            collect_delay_ms: 0,
            match_threshold: threshold_from_steps(9),
            run_limit: 0,
            use_default_pattern: false,
            pattern_path: None,
            tick_interval_ms: 100,
        }
    }
}

impl MacroConfig {
    /// Load settings from a JSON file. Missing keys fall back to defaults.
    pub fn load(path: &Path) -> MacroResult<Self> {
        let raw = std::fs::read_to_string(path).map_err(|source| MacroError::ConfigRead {
            path: path.to_path_buf(),
            source,
        })?;
        let config: Self =
            serde_json::from_str(&raw).map_err(|source| MacroError::ConfigParse {
                path: path.to_path_buf(),
                source,
            })?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> MacroResult<()> {
        if !(0.0..=1.0).contains(&self.match_threshold) {
            return Err(MacroError::InvalidConfig {
                description: format!(
                    "match threshold {} is outside 0.0..=1.0",
                    self.match_threshold
                ),
            });
        }
        if self.tick_interval_ms == 0 {
            return Err(MacroError::InvalidConfig {
                description: "tick interval must be at least 1 ms".to_string(),
            });
        }
        Ok(())
    }

    pub fn start_delay(&self) -> Duration {
        Duration::from_millis(self.start_delay_ms)
    }

    pub fn throw_delay(&self) -> Duration {
        Duration::from_millis(self.throw_delay_ms)
    }

    pub fn collect_delay(&self) -> Duration {
        Duration::from_millis(self.collect_delay_ms)
    }

    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms)
    }
}

/// Convert the integer threshold control (0..=10) to a score threshold.
pub fn threshold_from_steps(steps: u8) -> f32 {
    f32::from(steps.min(THRESHOLD_STEPS)) / f32::from(THRESHOLD_STEPS)
}
