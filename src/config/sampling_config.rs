use crate::errors::{ConfigError, ConfigResult};
use serde::Deserialize;

/// How samples are printed
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

/// The `[sampling]` section
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SamplingEntry {
    pub period_ms: u64,
    /// Pause between configuration and the first sample
    pub startup_delay_ms: u64,
    pub format: OutputFormat,
    /// Stop after this many samples; run forever when unset
    pub max_samples: Option<u64>,
}

impl Default for SamplingEntry {
    fn default() -> Self {
        Self {
            period_ms: 1000,
            startup_delay_ms: 100,
            format: OutputFormat::Text,
            max_samples: None,
        }
    }
}

impl SamplingEntry {
    pub fn validate(&self) -> ConfigResult<()> {
        if self.period_ms == 0 {
            return Err(ConfigError::InvalidValue {
                field: "sampling.period_ms".to_string(),
                reason: "must be greater than zero".to_string(),
            });
        }
        Ok(())
    }
}
