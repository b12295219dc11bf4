//! Library constants and pipeline configuration.
//!
//! `PipelineConfig::default()` carries the documented constants. A JSON file
//! may override any subset of them; the result is validated before use.

use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::market::{PriceBounds, VariationEngine, VariationTable};
use crate::pipeline::normalize::{DEFAULT_CONFIDENCE, MAX_CONFIDENCE};
use crate::pipeline::stream::AnnotationMarkers;

/// Application-level constants
pub const APP_NAME: &str = "AgriSight";
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Environment variable checked before `RUST_LOG`.
pub const LOG_ENV_VAR: &str = "AGRISIGHT_LOG";

/// Filter used when neither log variable is set.
pub fn default_log_filter() -> &'static str {
    "agrisight_core=info"
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("cannot read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("config is not valid JSON: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("invalid config: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct PipelineConfig {
    pub markers: AnnotationMarkers,
    pub default_confidence: u32,
    pub price_bounds: PriceBounds,
    pub variation: VariationTable,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            markers: AnnotationMarkers::default(),
            default_confidence: DEFAULT_CONFIDENCE,
            price_bounds: PriceBounds::default(),
            variation: VariationTable::default(),
        }
    }
}

impl PipelineConfig {
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let json = std::fs::read_to_string(path)?;
        let config = Self::from_json_str(&json)?;
        tracing::info!(path = %path.display(), "Loaded pipeline config");
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.markers.is_valid() {
            return Err(ConfigError::Invalid(
                "annotation markers must be non-empty".into(),
            ));
        }
        if self.default_confidence > MAX_CONFIDENCE {
            return Err(ConfigError::Invalid(format!(
                "defaultConfidence {} exceeds {MAX_CONFIDENCE}",
                self.default_confidence
            )));
        }
        if !self.price_bounds.is_valid() {
            return Err(ConfigError::Invalid(format!(
                "price floor {} is above ceiling {}",
                self.price_bounds.floor, self.price_bounds.ceiling
            )));
        }
        if !self.variation.is_valid() {
            return Err(ConfigError::Invalid(
                "variation deltas must lie in [0, 1)".into(),
            ));
        }
        Ok(())
    }

    pub fn variation_engine(&self) -> VariationEngine {
        VariationEngine::new(self.variation, self.price_bounds)
    }
}
