use axum::{extract::State, Json};
use chrono::{NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use ats_core::error::EngineError;
use ats_core::experience::parse_entry_date;
use ats_core::matching::pipeline::AnalysisOutcome;
use ats_core::{
    EducationEntry, EntryKind, ExperienceEntry, JobDescription, ProjectEntry, Resume,
};

use crate::error::ApiError;
use crate::SharedState;

/// Experience entry as clients send it: dates are strings in resume-style
/// formats ("2021-03", "March 2021"), and an ongoing engagement uses a
/// marker like "present" or omits `end`.
#[derive(Debug, Clone, Deserialize)]
pub struct ExperiencePayload {
    pub kind: EntryKind,
    #[serde(default)]
    pub title: String,
    pub start: String,
    #[serde(default)]
    pub end: Option<String>,
    #[serde(default)]
    pub bullets: Vec<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ResumePayload {
    #[serde(default)]
    pub skills: Vec<String>,
    #[serde(default)]
    pub experience: Vec<ExperiencePayload>,
    #[serde(default)]
    pub projects: Vec<ProjectEntry>,
    #[serde(default)]
    pub education: Vec<EducationEntry>,
}

#[derive(Debug, Deserialize)]
pub struct AnalyzeRequest {
    pub resume: ResumePayload,
    pub job: JobDescription,
    /// Evaluation date for ongoing entries. Defaults to today; pass a fixed
    /// date to make repeated calls reproduce the same score.
    #[serde(default)]
    pub as_of: Option<NaiveDate>,
    /// When true, the response includes a prose summary of the breakdown.
    #[serde(default)]
    pub narrative: bool,
}

#[derive(Debug, Serialize)]
pub struct AnalyzeResponse {
    pub analysis: AnalysisOutcome,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub narrative: Option<String>,
}

impl ExperiencePayload {
    fn into_entry(self) -> Result<ExperienceEntry, ApiError> {
        // Undecodable wire strings are a request-shape problem, distinct from
        // the engine's own validation of decoded entries.
        let start = parse_entry_date(&self.start)
            .map_err(|err| EngineError::InputShape(err.to_string()))?
            .ok_or_else(|| {
                EngineError::InputShape(format!(
                    "start date cannot be an ongoing marker: {}",
                    self.start
                ))
            })?;

        let end = match self.end.as_deref() {
            None => None,
            Some(raw) => {
                parse_entry_date(raw).map_err(|err| EngineError::InputShape(err.to_string()))?
            }
        };

        Ok(ExperienceEntry {
            kind: self.kind,
            title: self.title,
            start,
            end,
            bullets: self.bullets,
        })
    }
}

impl ResumePayload {
    fn into_resume(self) -> Result<Resume, ApiError> {
        let experience = self
            .experience
            .into_iter()
            .map(ExperiencePayload::into_entry)
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Resume {
            skills: self.skills,
            experience,
            projects: self.projects,
            education: self.education,
        })
    }
}

pub async fn analyze(
    State(state): State<SharedState>,
    Json(request): Json<AnalyzeRequest>,
) -> Result<Json<AnalyzeResponse>, ApiError> {
    let resume = request.resume.into_resume()?;
    let as_of = request.as_of.unwrap_or_else(|| Utc::now().date_naive());

    let analysis = state.engine.analyze(&resume, &request.job, as_of)?;

    let narrative = if request.narrative {
        Some(state.narrator.narrate(&analysis, &request.job).await)
    } else {
        None
    };

    Ok(Json(AnalyzeResponse {
        analysis,
        narrative,
    }))
}
