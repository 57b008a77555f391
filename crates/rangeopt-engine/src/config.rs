use crate::classifier::dataset::TrainingConfig;
use crate::error::{EngineError, Result};
use crate::gate::DecisionGate;
use crate::templates::TemplateConfig;
use rangeopt_spec::SpecParserConfig;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Engine-wide configuration. Every field has a default, so a JSON file only
/// needs the keys it overrides.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Confidence a prediction must strictly exceed to be acted upon.
    pub threshold: f64,
    pub training: TrainingConfig,
    pub templates: TemplateConfig,
    pub spec: SpecParserConfig,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            threshold: DecisionGate::DEFAULT_THRESHOLD,
            training: TrainingConfig::default(),
            templates: TemplateConfig::default(),
            spec: SpecParserConfig::default(),
        }
    }
}

impl EngineConfig {
    pub fn from_json_str(text: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_json_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json_str(&text)
    }

    pub fn validate(&self) -> Result<()> {
        if !(0.0..=1.0).contains(&self.threshold) {
            return Err(EngineError::InvalidConfig(format!(
                "threshold must be in [0, 1], got {}",
                self.threshold
            )));
        }
        self.training.validate()?;
        self.spec.validate().map_err(EngineError::InvalidConfig)?;

        let t = &self.templates;
        let ceilings = [
            ("narrow_area_ceiling_km2", t.narrow_area_ceiling_km2),
            ("planar_area_ceiling_km2", t.planar_area_ceiling_km2),
            ("constants_area_ceiling_km2", t.constants_area_ceiling_km2),
            ("single_byte_max", t.single_byte_max),
            ("meters_per_degree", t.meters_per_degree),
        ];
        if let Some((name, value)) = ceilings.iter().find(|(_, v)| !v.is_finite() || *v < 0.0) {
            return Err(EngineError::InvalidConfig(format!(
                "templates.{name} must be a non-negative number, got {value}"
            )));
        }
        Ok(())
    }
}
