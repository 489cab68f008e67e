pub mod config;
pub mod error;
pub mod evidence;
pub mod experience;
pub mod logging;
pub mod matching;
pub mod skill_normalizer;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

// Commonly used data models for a single analysis request. Everything is
// constructed fresh from caller-supplied structured data and lives only for
// the duration of one scoring invocation.

/// What kind of engagement an experience entry describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntryKind {
    Professional,
    Internship,
    Project,
}

/// A single date-ranged entry from the experience section.
///
/// `end = None` means the engagement is ongoing; it is resolved against the
/// evaluation date when durations are computed, never against wall-clock time
/// inside the engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExperienceEntry {
    pub kind: EntryKind,
    #[serde(default)]
    pub title: String,
    pub start: NaiveDate,
    #[serde(default)]
    pub end: Option<NaiveDate>,
    #[serde(default)]
    pub bullets: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProjectEntry {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub technologies: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EducationEntry {
    pub institution: String,
    #[serde(default)]
    pub degree: Option<String>,
    #[serde(default)]
    pub field: Option<String>,
}

/// Structured resume as supplied by the document parser. Missing or empty
/// fields are legitimately empty, not errors.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Resume {
    #[serde(default)]
    pub skills: Vec<String>,
    #[serde(default)]
    pub experience: Vec<ExperienceEntry>,
    #[serde(default)]
    pub projects: Vec<ProjectEntry>,
    #[serde(default)]
    pub education: Vec<EducationEntry>,
}

/// Structured job description as supplied by the requirement extractor.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct JobDescription {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub must_have_skills: Vec<String>,
    #[serde(default)]
    pub nice_to_have_skills: Vec<String>,
    #[serde(default)]
    pub required_years: Option<f64>,
}

impl Resume {
    /// Skill pool used for matching: the skills section plus project
    /// technologies, so a stack that only appears on a project still counts.
    pub fn offered_skills(&self) -> Vec<String> {
        let mut pool = self.skills.clone();
        for project in &self.projects {
            pool.extend(project.technologies.iter().cloned());
        }
        pool
    }
}
