use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::Serialize;
use tracing::debug;

use crate::config::EngineConfig;
use crate::error::EngineError;
use crate::evidence::{EvidenceRecord, EvidenceScorer};
use crate::experience::{self, ExperienceSummary};
use crate::matching::scoring::{ScoreAggregator, ScoreBreakdown, ScoreInputs};
use crate::skill_normalizer::SkillNormalizer;
use crate::{JobDescription, Resume};

/// Everything one analysis run produces. The breakdown is the auditable
/// numeric result; evidence and experience are its supporting detail.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnalysisOutcome {
    pub breakdown: ScoreBreakdown,
    pub evidence: BTreeMap<String, EvidenceRecord>,
    pub experience: ExperienceSummary,
}

/// Runs the four scoring stages sequentially on the calling thread: skill
/// matching, experience aggregation, per-skill evidence, score aggregation.
/// Holds no mutable state, so one engine can serve independent analyses
/// without coordination.
pub struct AnalysisEngine {
    config: EngineConfig,
    normalizer: SkillNormalizer,
}

impl AnalysisEngine {
    pub fn new(config: EngineConfig) -> Result<Self, EngineError> {
        Self::with_normalizer(config, SkillNormalizer::new())
    }

    /// Engine with a caller-supplied normalizer (custom alias tables).
    pub fn with_normalizer(
        config: EngineConfig,
        normalizer: SkillNormalizer,
    ) -> Result<Self, EngineError> {
        config.validate()?;
        Ok(Self { config, normalizer })
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Score one resume against one job description.
    ///
    /// `as_of` is the evaluation date for ongoing experience entries; identical
    /// structured inputs and `as_of` always reproduce the same outcome.
    pub fn analyze(
        &self,
        resume: &Resume,
        job: &JobDescription,
        as_of: NaiveDate,
    ) -> Result<AnalysisOutcome, EngineError> {
        let experience =
            experience::summarize(&resume.experience, &self.config.tier_thresholds, as_of)?;

        let offered = resume.offered_skills();
        let must_have = self.normalizer.match_skills(&job.must_have_skills, &offered);
        let nice_to_have = self
            .normalizer
            .match_skills(&job.nice_to_have_skills, &offered);

        let scorer = EvidenceScorer::new(self.config.evidence_points, &self.normalizer);
        let mut evidence = BTreeMap::new();
        for skill in must_have.matched.iter().chain(must_have.missing.iter()) {
            let record = scorer.score(skill, resume);
            evidence.insert(record.skill.clone(), record);
        }

        let breakdown = ScoreAggregator::new(&self.config).aggregate(ScoreInputs {
            must_have: &must_have,
            nice_to_have: &nice_to_have,
            evidence: &evidence,
            experience: &experience,
            required_years: job.required_years,
        });

        debug!(
            final_score = breakdown.final_score,
            tier = %breakdown.tier,
            must_have_ratio = breakdown.must_have_ratio,
            caps = breakdown.applied_caps.len(),
            "analysis complete"
        );

        Ok(AnalysisOutcome {
            breakdown,
            evidence,
            experience,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{EntryKind, ExperienceEntry, ProjectEntry};

    fn d(y: i32, m: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, 1).unwrap()
    }

    fn as_of() -> NaiveDate {
        d(2025, 6)
    }

    fn engine() -> AnalysisEngine {
        AnalysisEngine::new(EngineConfig::default()).unwrap()
    }

    fn job(must: &[&str], nice: &[&str], years: Option<f64>) -> JobDescription {
        JobDescription {
            title: "Backend Engineer".into(),
            must_have_skills: must.iter().map(|s| s.to_string()).collect(),
            nice_to_have_skills: nice.iter().map(|s| s.to_string()).collect(),
            required_years: years,
        }
    }

    fn strong_resume() -> Resume {
        Resume {
            skills: vec!["Python".into(), "PostgreSQL".into(), "Docker".into()],
            experience: vec![ExperienceEntry {
                kind: EntryKind::Professional,
                title: "Backend Engineer".into(),
                start: d(2019, 1),
                end: Some(d(2025, 1)),
                bullets: vec![
                    "Built Python services handling 2k requests per second".into(),
                    "Operated Docker deployments".into(),
                ],
            }],
            projects: vec![ProjectEntry {
                name: "ETL".into(),
                description: "Python pipeline with pandas, cut runtime by 60%".into(),
                technologies: vec!["Python".into(), "PostgreSQL".into()],
            }],
            education: vec![],
        }
    }

    #[test]
    fn full_analysis_is_deterministic() {
        let engine = engine();
        let job = job(&["Python", "PostgreSQL"], &["Docker"], Some(5.0));
        let resume = strong_resume();

        let first = engine.analyze(&resume, &job, as_of()).unwrap();
        let second = engine.analyze(&resume, &job, as_of()).unwrap();
        assert_eq!(first, second);

        assert_eq!(first.breakdown.must_have_ratio, 1.0);
        assert_eq!(first.breakdown.nice_to_have_ratio, 1.0);
        assert!(first.breakdown.final_score >= 95);
        assert!(first.breakdown.applied_caps.is_empty());
    }

    #[test]
    fn evidence_is_tracked_for_every_must_have_skill() {
        let engine = engine();
        let job = job(&["Python", "Kafka"], &[], None);
        let outcome = engine.analyze(&strong_resume(), &job, as_of()).unwrap();

        assert!(outcome.evidence.contains_key("python"));
        assert!(outcome.evidence.contains_key("kafka"));
        assert_eq!(outcome.evidence["kafka"].score, 0);
    }

    #[test]
    fn listed_but_unproven_skill_is_discounted_not_dropped() {
        // Python only appears in the skills list: matched, but at its
        // evidence weight rather than full credit.
        let engine = engine();
        let resume = Resume {
            skills: vec!["Python".into()],
            ..Resume::default()
        };
        let job = job(&["Python"], &[], None);

        let outcome = engine.analyze(&resume, &job, as_of()).unwrap();
        assert_eq!(outcome.evidence["python"].score, 20);
        assert_eq!(outcome.breakdown.matched_skills, vec!["python".to_string()]);
        assert!((outcome.breakdown.must_have_ratio - 0.2).abs() < f64::EPSILON);
    }

    #[test]
    fn empty_job_description_is_neutral() {
        // No must-have skills in the job description, resume has several.
        let engine = engine();
        let outcome = engine
            .analyze(&strong_resume(), &job(&[], &[], None), as_of())
            .unwrap();

        assert_eq!(outcome.breakdown.must_have_ratio, 1.0);
        assert_eq!(outcome.breakdown.final_score, 100);
    }

    #[test]
    fn junior_projects_and_internship_carry_the_alignment() {
        // Two projects plus a six-month internship, zero
        // professional experience.
        let engine = engine();
        let resume = Resume {
            skills: vec!["Python".into()],
            experience: vec![
                ExperienceEntry {
                    kind: EntryKind::Internship,
                    title: "SWE Intern".into(),
                    start: d(2024, 1),
                    end: Some(d(2024, 7)),
                    bullets: vec!["Wrote Python data checks".into()],
                },
                ExperienceEntry {
                    kind: EntryKind::Project,
                    title: "Scraper".into(),
                    start: d(2023, 1),
                    end: Some(d(2024, 1)),
                    bullets: vec!["Python scraper processing 10k pages".into()],
                },
                ExperienceEntry {
                    kind: EntryKind::Project,
                    title: "Dashboard".into(),
                    start: d(2024, 7),
                    end: Some(d(2025, 1)),
                    bullets: vec!["Flask dashboard".into()],
                },
            ],
            projects: vec![],
            education: vec![],
        };
        let job = job(&["Python"], &[], Some(2.0));

        let outcome = engine.analyze(&resume, &job, as_of()).unwrap();
        assert_eq!(outcome.experience.tier, crate::experience::RoleTier::Junior);
        assert_eq!(outcome.experience.internship_years, 0.5);
        assert_eq!(outcome.experience.project_years, 1.5);
        // Full side-experience weight: (0 + 0.5 + 1.5) / 2.0 = 1.0.
        assert_eq!(outcome.breakdown.experience_ratio, 1.0);
    }

    #[test]
    fn malformed_entry_dates_surface_as_validation_errors() {
        let engine = engine();
        let resume = Resume {
            experience: vec![ExperienceEntry {
                kind: EntryKind::Professional,
                title: "engineer".into(),
                start: d(2024, 6),
                end: Some(d(2023, 6)),
                bullets: vec![],
            }],
            ..Resume::default()
        };

        let err = engine
            .analyze(&resume, &job(&[], &[], None), as_of())
            .unwrap_err();
        assert!(matches!(err, EngineError::Validation(_)));
    }

    #[test]
    fn project_technologies_count_toward_matching() {
        let engine = engine();
        let resume = Resume {
            projects: vec![ProjectEntry {
                name: "infra".into(),
                description: "cluster tooling".into(),
                technologies: vec!["K8s".into()],
            }],
            ..Resume::default()
        };

        let outcome = engine
            .analyze(&resume, &job(&["Kubernetes"], &[], None), as_of())
            .unwrap();
        assert_eq!(
            outcome.breakdown.matched_skills,
            vec!["kubernetes".to_string()]
        );
    }
}
