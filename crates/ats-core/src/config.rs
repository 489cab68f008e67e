use serde::{Deserialize, Serialize};

use crate::error::EngineError;
use crate::evidence::EvidencePoints;
use crate::experience::TierThresholds;
use crate::matching::scoring::CapTable;
use crate::matching::weights::Weights;

/// Full scoring configuration. Validated once at load; the engine never
/// re-checks mid-scoring.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineConfig {
    pub weights: Weights,
    pub evidence_points: EvidencePoints,
    pub tier_thresholds: TierThresholds,
    pub caps: CapTable,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            weights: Weights::default(),
            evidence_points: EvidencePoints::default(),
            tier_thresholds: TierThresholds::default(),
            caps: CapTable::default(),
        }
    }
}

fn env_f64(key: &str) -> Result<Option<f64>, EngineError> {
    match std::env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse::<f64>()
            .map(Some)
            .map_err(|_| EngineError::Configuration(format!("{key} is not a number: {raw}"))),
        Err(_) => Ok(None),
    }
}

impl EngineConfig {
    pub fn validate(&self) -> Result<(), EngineError> {
        self.weights.validate()?;
        self.evidence_points.validate()?;
        self.tier_thresholds.validate()?;
        self.caps.validate()?;
        Ok(())
    }

    /// Defaults overridden by `ATS_*` environment variables:
    /// `ATS_MUST_HAVE_WEIGHT`, `ATS_NICE_TO_HAVE_WEIGHT`,
    /// `ATS_EXPERIENCE_WEIGHT`, `ATS_JUNIOR_MAX_YEARS`,
    /// `ATS_SENIOR_MIN_YEARS`. Fails on unparseable values or a
    /// configuration that does not validate.
    pub fn from_env() -> Result<Self, EngineError> {
        let mut config = Self::default();

        if let Some(v) = env_f64("ATS_MUST_HAVE_WEIGHT")? {
            config.weights.must_have = v;
        }
        if let Some(v) = env_f64("ATS_NICE_TO_HAVE_WEIGHT")? {
            config.weights.nice_to_have = v;
        }
        if let Some(v) = env_f64("ATS_EXPERIENCE_WEIGHT")? {
            config.weights.experience = v;
        }
        if let Some(v) = env_f64("ATS_JUNIOR_MAX_YEARS")? {
            config.tier_thresholds.junior_max_years = v;
        }
        if let Some(v) = env_f64("ATS_SENIOR_MIN_YEARS")? {
            config.tier_thresholds.senior_min_years = v;
        }

        config.validate()?;
        Ok(config)
    }
}
