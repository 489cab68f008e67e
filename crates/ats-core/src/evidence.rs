use std::collections::HashMap;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::EngineError;
use crate::skill_normalizer::SkillNormalizer;
use crate::Resume;

/// Fixed point values for the five independent evidence signals.
/// The sum bounds the best possible score and must stay within 100.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EvidencePoints {
    pub listed: u8,
    pub in_project: u8,
    pub in_experience: u8,
    pub framework: u8,
    pub metric: u8,
}

impl Default for EvidencePoints {
    fn default() -> Self {
        Self {
            listed: 20,
            in_project: 30,
            in_experience: 25,
            framework: 15,
            metric: 10,
        }
    }
}

impl EvidencePoints {
    pub fn sum(&self) -> u32 {
        self.listed as u32
            + self.in_project as u32
            + self.in_experience as u32
            + self.framework as u32
            + self.metric as u32
    }

    pub fn validate(&self) -> Result<(), EngineError> {
        if self.sum() > 100 {
            return Err(EngineError::Configuration(format!(
                "evidence point table sums to {}, must not exceed 100",
                self.sum()
            )));
        }
        Ok(())
    }
}

/// Per-skill evidence signals with the aggregate score and derived weight.
/// A weight of 0.0 means no corroboration at all; the score aggregator uses
/// the weight to discount credit for listed-but-unproven skills.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EvidenceRecord {
    pub skill: String,
    pub listed: bool,
    pub in_project: bool,
    pub in_experience: bool,
    pub framework: bool,
    pub metric: bool,
    pub score: u8,
    pub weight: f64,
}

/// Known libraries/frameworks that corroborate a canonical skill.
/// Keys must be canonical forms from the builtin alias table.
static FRAMEWORKS: Lazy<HashMap<&'static str, &'static [&'static str]>> = Lazy::new(|| {
    let entries: &[(&str, &[&str])] = &[
        (
            "python",
            &[
                "django", "flask", "fastapi", "pyramid", "tornado", "pandas", "numpy", "scipy",
                "scikit-learn", "sklearn", "tensorflow", "pytorch", "keras", "transformers",
                "requests", "beautifulsoup", "scrapy", "pytest", "sqlalchemy", "celery",
            ],
        ),
        (
            "javascript",
            &[
                "react", "angular", "vue", "svelte", "express", "nextjs", "jquery", "jest",
                "webpack", "vite", "nodejs",
            ],
        ),
        (
            "typescript",
            &["react", "angular", "nestjs", "nextjs", "deno", "tsnode"],
        ),
        (
            "java",
            &["spring", "hibernate", "maven", "gradle", "junit", "quarkus", "micronaut"],
        ),
        (
            "rust",
            &["tokio", "axum", "actix", "serde", "diesel", "sqlx", "rocket"],
        ),
        ("golang", &["gin", "echo", "gorm", "fiber", "cobra"]),
        ("ruby", &["rails", "sinatra", "rspec", "sidekiq"]),
        ("php", &["laravel", "symfony", "composer", "phpunit"]),
        ("csharp", &["aspnet", "entity framework", "xunit", "blazor"]),
        (
            "machine learning",
            &["tensorflow", "pytorch", "scikit-learn", "sklearn", "keras", "xgboost", "mlflow"],
        ),
        ("kubernetes", &["helm", "istio", "kustomize", "argocd"]),
        ("aws", &["lambda", "ec2", "s3", "dynamodb", "cloudformation", "eks"]),
    ];
    entries.iter().copied().collect()
});

/// Patterns for quantified impact: percentages, multipliers, scale counts,
/// latencies, and "improved by N" phrasings.
static METRIC_PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    [
        r"\d+(?:\.\d+)?%",
        r"\d+(?:\.\d+)?x\b",
        r"\d+k\b",
        r"\d+m\b",
        r"\d+\s*(?:users|requests|records|rows|queries)",
        r"\d+\s*(?:ms|seconds?|minutes?|hours?)",
        r"(?:increased|reduced|improved|decreased)\s+by\s+\d+",
    ]
    .iter()
    .map(|p| Regex::new(p).unwrap())
    .collect()
});

/// Lowercase and fold punctuation to spaces so token containment checks are
/// insensitive to formatting.
fn normalize_fragment(text: &str) -> String {
    let folded: String = text
        .to_lowercase()
        .chars()
        .map(|c| if c.is_alphanumeric() { c } else { ' ' })
        .collect();
    folded.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn contains_metric(text: &str) -> bool {
    let lower = text.to_lowercase();
    METRIC_PATTERNS.iter().any(|re| re.is_match(&lower))
}

/// Signal-based scorer for one target skill against structured resume fields.
/// Pure pattern matching; no calls to any generative service.
pub struct EvidenceScorer<'a> {
    points: EvidencePoints,
    normalizer: &'a SkillNormalizer,
}

impl<'a> EvidenceScorer<'a> {
    pub fn new(points: EvidencePoints, normalizer: &'a SkillNormalizer) -> Self {
        Self { points, normalizer }
    }

    /// True when the canonical skill appears in the free text. Single-token
    /// skills compare whole normalized tokens (so "go" never matches inside
    /// "google"); multi-word skills use a space-bounded phrase check.
    fn mentions(&self, text: &str, canonical: &str) -> bool {
        let haystack = normalize_fragment(text);
        if haystack.is_empty() {
            return false;
        }

        if canonical.contains(' ') {
            let padded = format!(" {haystack} ");
            return padded.contains(&format!(" {canonical} "));
        }

        haystack
            .split_whitespace()
            .any(|token| self.normalizer.normalize(token) == canonical)
    }

    fn listed(&self, resume: &Resume, canonical: &str) -> bool {
        resume
            .skills
            .iter()
            .any(|s| self.normalizer.normalize(s) == canonical)
    }

    fn in_project(&self, resume: &Resume, canonical: &str) -> bool {
        resume.projects.iter().any(|project| {
            project
                .technologies
                .iter()
                .any(|t| self.normalizer.normalize(t) == canonical)
                || self.mentions(&project.description, canonical)
        })
    }

    fn in_experience(&self, resume: &Resume, canonical: &str) -> bool {
        resume.experience.iter().any(|entry| {
            self.mentions(&entry.title, canonical)
                || entry.bullets.iter().any(|b| self.mentions(b, canonical))
        })
    }

    fn framework_detected(&self, resume: &Resume, canonical: &str) -> bool {
        let Some(frameworks) = FRAMEWORKS.get(canonical) else {
            return false;
        };

        let mut all_text = resume.skills.join(" ");
        for project in &resume.projects {
            all_text.push(' ');
            all_text.push_str(&project.description);
            all_text.push(' ');
            all_text.push_str(&project.technologies.join(" "));
        }
        for entry in &resume.experience {
            all_text.push(' ');
            all_text.push_str(&entry.bullets.join(" "));
        }

        let padded = format!(" {} ", normalize_fragment(&all_text));
        frameworks
            .iter()
            .any(|fw| padded.contains(&format!(" {} ", normalize_fragment(fw))))
    }

    /// Quantified impact must co-occur with the skill in the same bullet or
    /// project description, not merely anywhere on the resume.
    fn metric_near_skill(&self, resume: &Resume, canonical: &str) -> bool {
        for project in &resume.projects {
            let uses_skill = project
                .technologies
                .iter()
                .any(|t| self.normalizer.normalize(t) == canonical)
                || self.mentions(&project.description, canonical);
            if uses_skill && contains_metric(&project.description) {
                return true;
            }
        }

        for entry in &resume.experience {
            for bullet in &entry.bullets {
                if self.mentions(bullet, canonical) && contains_metric(bullet) {
                    return true;
                }
            }
        }

        false
    }

    /// Score one target skill. Each fired signal adds its fixed point value;
    /// the aggregate is clamped to 100 and the weight is score/100.
    pub fn score(&self, skill: &str, resume: &Resume) -> EvidenceRecord {
        let canonical = self.normalizer.normalize(skill);

        let listed = self.listed(resume, &canonical);
        let in_project = self.in_project(resume, &canonical);
        let in_experience = self.in_experience(resume, &canonical);
        let framework = self.framework_detected(resume, &canonical);
        let metric = self.metric_near_skill(resume, &canonical);

        let mut score: u32 = 0;
        if listed {
            score += self.points.listed as u32;
        }
        if in_project {
            score += self.points.in_project as u32;
        }
        if in_experience {
            score += self.points.in_experience as u32;
        }
        if framework {
            score += self.points.framework as u32;
        }
        if metric {
            score += self.points.metric as u32;
        }
        let score = score.min(100) as u8;

        EvidenceRecord {
            skill: canonical,
            listed,
            in_project,
            in_experience,
            framework,
            metric,
            score,
            weight: f64::from(score) / 100.0,
        }
    }
}
