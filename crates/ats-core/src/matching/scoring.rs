use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use strum::Display;

use crate::config::EngineConfig;
use crate::error::EngineError;
use crate::evidence::EvidenceRecord;
use crate::experience::{ExperienceSummary, RoleTier};
use crate::skill_normalizer::SkillMatchOutcome;

/// Matched must-have skills below this evidence weight contribute their
/// weight instead of full credit ("listed but unproven").
const EVIDENCE_FULL_CREDIT_THRESHOLD: f64 = 0.5;

/// Per-tier multiplier for internship/project years when computing the
/// experience alignment ratio. A data table, not branch logic: adding a tier
/// means adding a row.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TierPolicy {
    pub tier: RoleTier,
    pub side_experience_multiplier: f64,
}

const TIER_POLICY_TABLE: [TierPolicy; 3] = [
    TierPolicy {
        tier: RoleTier::Junior,
        side_experience_multiplier: 1.0,
    },
    TierPolicy {
        tier: RoleTier::Mid,
        side_experience_multiplier: 0.5,
    },
    TierPolicy {
        tier: RoleTier::Senior,
        side_experience_multiplier: 0.0,
    },
];

pub fn tier_policy(tier: RoleTier) -> &'static TierPolicy {
    &TIER_POLICY_TABLE[tier as usize]
}

/// Which ratio a cap rule watches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum CapMetric {
    MustHave,
    Experience,
}

/// Upper bound on the final score, triggered when the watched ratio falls
/// below the threshold.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CapRule {
    pub metric: CapMetric,
    pub below: f64,
    pub limit: u8,
}

/// Per-tier cap rules. Junior scores are never capped; Mid and Senior carry
/// the hard caps for weak must-have or experience alignment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CapTable {
    pub junior: Vec<CapRule>,
    pub mid: Vec<CapRule>,
    pub senior: Vec<CapRule>,
}

impl Default for CapTable {
    fn default() -> Self {
        Self {
            junior: vec![],
            mid: vec![CapRule {
                metric: CapMetric::MustHave,
                below: 0.50,
                limit: 60,
            }],
            senior: vec![
                CapRule {
                    metric: CapMetric::MustHave,
                    below: 0.30,
                    limit: 20,
                },
                CapRule {
                    metric: CapMetric::MustHave,
                    below: 0.50,
                    limit: 35,
                },
                CapRule {
                    metric: CapMetric::Experience,
                    below: 0.50,
                    limit: 30,
                },
            ],
        }
    }
}

impl CapTable {
    pub fn for_tier(&self, tier: RoleTier) -> &[CapRule] {
        match tier {
            RoleTier::Junior => &self.junior,
            RoleTier::Mid => &self.mid,
            RoleTier::Senior => &self.senior,
        }
    }

    pub fn validate(&self) -> Result<(), EngineError> {
        for rule in self
            .junior
            .iter()
            .chain(self.mid.iter())
            .chain(self.senior.iter())
        {
            if !(0.0..=1.0).contains(&rule.below) {
                return Err(EngineError::Configuration(format!(
                    "cap threshold {} must lie in [0.0, 1.0]",
                    rule.below
                )));
            }
            if rule.limit > 100 {
                return Err(EngineError::Configuration(format!(
                    "cap limit {} exceeds the score range",
                    rule.limit
                )));
            }
        }
        Ok(())
    }
}

/// A cap that actually fired, kept for auditability.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AppliedCap {
    pub limit: u8,
    pub reason: String,
}

/// Final score plus everything needed to explain it. Reproducible as a pure
/// function of its inputs; the narrative boundary receives it read-only.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScoreBreakdown {
    pub final_score: u8,
    pub tier: RoleTier,
    pub must_have_ratio: f64,
    pub nice_to_have_ratio: f64,
    pub experience_ratio: f64,
    pub applied_caps: Vec<AppliedCap>,
    pub matched_skills: Vec<String>,
    pub missing_skills: Vec<String>,
    pub nice_to_have_matched: Vec<String>,
    pub nice_to_have_missing: Vec<String>,
}

/// Inputs already produced by the normalizer, aggregator, and evidence
/// scorer. The aggregator itself is pure and synchronous.
pub struct ScoreInputs<'a> {
    pub must_have: &'a SkillMatchOutcome,
    pub nice_to_have: &'a SkillMatchOutcome,
    pub evidence: &'a BTreeMap<String, EvidenceRecord>,
    pub experience: &'a ExperienceSummary,
    pub required_years: Option<f64>,
}

pub struct ScoreAggregator<'a> {
    config: &'a EngineConfig,
}

impl<'a> ScoreAggregator<'a> {
    pub fn new(config: &'a EngineConfig) -> Self {
        Self { config }
    }

    /// Must-have ratio with the evidence discount applied: a matched skill
    /// whose evidence weight is below the threshold earns only its weight.
    fn must_have_ratio(&self, outcome: &SkillMatchOutcome, evidence: &BTreeMap<String, EvidenceRecord>) -> f64 {
        let required = outcome.required_len();
        if required == 0 {
            return 1.0;
        }

        let credit: f64 = outcome
            .matched
            .iter()
            .map(|skill| match evidence.get(skill) {
                Some(record) if record.weight < EVIDENCE_FULL_CREDIT_THRESHOLD => record.weight,
                _ => 1.0,
            })
            .sum();

        credit / required as f64
    }

    /// Experience alignment: professional years plus tier-weighted side
    /// experience, against the requirement. No requirement is neutral 1.0.
    fn experience_ratio(&self, summary: &ExperienceSummary, required_years: Option<f64>) -> f64 {
        let required = match required_years {
            Some(years) if years > 0.0 => years,
            _ => return 1.0,
        };

        let policy = tier_policy(summary.tier);
        let effective = summary.professional_years
            + policy.side_experience_multiplier
                * (summary.internship_years + summary.project_years);

        (effective / required).min(1.0)
    }

    fn triggered_caps(&self, tier: RoleTier, must_have: f64, experience: f64) -> Vec<AppliedCap> {
        self.config
            .caps
            .for_tier(tier)
            .iter()
            .filter_map(|rule| {
                let value = match rule.metric {
                    CapMetric::MustHave => must_have,
                    CapMetric::Experience => experience,
                };
                (value < rule.below).then(|| AppliedCap {
                    limit: rule.limit,
                    reason: format!(
                        "{} ratio {:.0}% below {:.0}% ({} tier)",
                        rule.metric,
                        value * 100.0,
                        rule.below * 100.0,
                        tier
                    ),
                })
            })
            .collect()
    }

    /// Raw weighted score first, then the minimum of all triggered caps,
    /// then rounding to the nearest integer (ties round up).
    pub fn aggregate(&self, inputs: ScoreInputs<'_>) -> ScoreBreakdown {
        let tier = inputs.experience.tier;
        let must_have_ratio = self.must_have_ratio(inputs.must_have, inputs.evidence);
        let nice_to_have_ratio = inputs.nice_to_have.match_ratio;
        let experience_ratio = self.experience_ratio(inputs.experience, inputs.required_years);

        let weights = &self.config.weights;
        let raw = 100.0
            * (must_have_ratio * weights.must_have
                + nice_to_have_ratio * weights.nice_to_have
                + experience_ratio * weights.experience);
        let raw = raw.clamp(0.0, 100.0);

        let applied_caps = self.triggered_caps(tier, must_have_ratio, experience_ratio);
        let capped = applied_caps
            .iter()
            .fold(raw, |acc, cap| acc.min(f64::from(cap.limit)));

        ScoreBreakdown {
            final_score: capped.round() as u8,
            tier,
            must_have_ratio,
            nice_to_have_ratio,
            experience_ratio,
            applied_caps,
            matched_skills: inputs.must_have.matched.clone(),
            missing_skills: inputs.must_have.missing.clone(),
            nice_to_have_matched: inputs.nice_to_have.matched.clone(),
            nice_to_have_missing: inputs.nice_to_have.missing.clone(),
        }
    }
}
