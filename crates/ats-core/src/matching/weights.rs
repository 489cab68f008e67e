use serde::{Deserialize, Serialize};

use crate::error::EngineError;

/// Default component weights. Must-have skills dominate; experience
/// alignment outweighs nice-to-haves.
pub const DEFAULT_WEIGHTS: Weights = Weights {
    must_have: 0.5,
    nice_to_have: 0.2,
    experience: 0.3,
};

/// Relative weight of each score component. The three weights are fixed
/// configuration constants and must sum to 1.0.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Weights {
    pub must_have: f64,
    pub nice_to_have: f64,
    pub experience: f64,
}

impl Default for Weights {
    fn default() -> Self {
        DEFAULT_WEIGHTS
    }
}

impl Weights {
    pub fn sum(&self) -> f64 {
        self.must_have + self.nice_to_have + self.experience
    }

    pub fn validate(&self) -> Result<(), EngineError> {
        if self.must_have < 0.0 || self.nice_to_have < 0.0 || self.experience < 0.0 {
            return Err(EngineError::Configuration(
                "score weights must be non-negative".into(),
            ));
        }
        if (self.sum() - 1.0).abs() > 1e-6 {
            return Err(EngineError::Configuration(format!(
                "score weights must sum to 1.0, got {}",
                self.sum()
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_weights_sum_to_one() {
        assert!((DEFAULT_WEIGHTS.sum() - 1.0).abs() < 1e-6);
        assert!(DEFAULT_WEIGHTS.validate().is_ok());
    }

    #[test]
    fn validation_rejects_bad_sums_and_negatives() {
        let skewed = Weights {
            must_have: 0.5,
            nice_to_have: 0.5,
            experience: 0.3,
        };
        assert!(matches!(
            skewed.validate(),
            Err(EngineError::Configuration(_))
        ));

        let negative = Weights {
            must_have: 1.2,
            nice_to_have: -0.5,
            experience: 0.3,
        };
        assert!(matches!(
            negative.validate(),
            Err(EngineError::Configuration(_))
        ));
    }
}
