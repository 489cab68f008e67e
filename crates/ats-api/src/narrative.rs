//! Narrative rendering sits strictly downstream of scoring: it reads a
//! finished [`AnalysisOutcome`] and produces prose. Nothing here can alter
//! the numeric breakdown, and any LLM failure degrades to the deterministic
//! template.

use std::fmt::Write as _;
use std::time::Duration;

use serde_json::json;
use thiserror::Error;
use tracing::warn;

use ats_core::matching::pipeline::AnalysisOutcome;
use ats_core::JobDescription;

#[derive(Debug, Error)]
pub enum NarrativeError {
    #[error("rate limited: {0}")]
    RateLimit(String),
    #[error("authentication failed: {0}")]
    Auth(String),
    #[error("upstream server error: {0}")]
    Server(String),
    #[error("network error: {0}")]
    Network(String),
    #[error("invalid completion response: {0}")]
    InvalidResponse(String),
}

impl NarrativeError {
    pub fn kind(&self) -> &'static str {
        match self {
            NarrativeError::RateLimit(_) => "rate_limit",
            NarrativeError::Auth(_) => "auth",
            NarrativeError::Server(_) => "server",
            NarrativeError::Network(_) => "network",
            NarrativeError::InvalidResponse(_) => "invalid_response",
        }
    }

    pub fn retryable(&self) -> bool {
        matches!(
            self,
            NarrativeError::RateLimit(_) | NarrativeError::Server(_) | NarrativeError::Network(_)
        )
    }

    fn from_status(status: reqwest::StatusCode, body: String) -> Self {
        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            NarrativeError::RateLimit(body)
        } else if status == reqwest::StatusCode::UNAUTHORIZED
            || status == reqwest::StatusCode::FORBIDDEN
        {
            NarrativeError::Auth(body)
        } else if status.is_server_error() {
            NarrativeError::Server(body)
        } else {
            NarrativeError::InvalidResponse(format!("unexpected status {status}: {body}"))
        }
    }
}

impl From<reqwest::Error> for NarrativeError {
    fn from(value: reqwest::Error) -> Self {
        NarrativeError::Network(value.to_string())
    }
}

#[derive(Debug, Clone)]
pub struct LlmConfig {
    pub model: String,
    pub endpoint: String,
    pub api_key: String,
    pub timeout_secs: u64,
    pub max_retries: u32,
    pub retry_backoff_secs: u64,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            model: "llama-3.1-8b-instant".into(),
            endpoint: "https://api.groq.com/openai/v1/chat/completions".into(),
            api_key: String::new(),
            timeout_secs: 15,
            max_retries: 2,
            retry_backoff_secs: 1,
        }
    }
}

impl LlmConfig {
    /// Reads `ATS_LLM_*` overrides; absent variables keep the defaults.
    /// `ATS_LLM_API_KEY` falls back to `GROQ_API_KEY`.
    pub fn from_env() -> Self {
        fn parse_u64(key: &str, default: u64) -> u64 {
            std::env::var(key)
                .ok()
                .and_then(|raw| raw.parse::<u64>().ok())
                .unwrap_or(default)
        }

        fn parse_u32(key: &str, default: u32) -> u32 {
            std::env::var(key)
                .ok()
                .and_then(|raw| raw.parse::<u32>().ok())
                .unwrap_or(default)
        }

        let defaults = Self::default();
        let api_key = std::env::var("ATS_LLM_API_KEY")
            .ok()
            .or_else(|| std::env::var("GROQ_API_KEY").ok())
            .unwrap_or_default();

        Self {
            model: std::env::var("ATS_LLM_MODEL").unwrap_or(defaults.model),
            endpoint: std::env::var("ATS_LLM_ENDPOINT").unwrap_or(defaults.endpoint),
            api_key,
            timeout_secs: parse_u64("ATS_LLM_TIMEOUT_SECONDS", defaults.timeout_secs),
            max_retries: parse_u32("ATS_LLM_MAX_RETRIES", defaults.max_retries),
            retry_backoff_secs: parse_u64(
                "ATS_LLM_RETRY_BACKOFF_SECONDS",
                defaults.retry_backoff_secs,
            ),
        }
    }
}

/// Deterministic prose straight from the breakdown. Same outcome, same text.
pub fn render_template(outcome: &AnalysisOutcome, job: &JobDescription) -> String {
    let breakdown = &outcome.breakdown;
    let mut text = String::new();

    let title = if job.title.is_empty() {
        "the role"
    } else {
        job.title.as_str()
    };

    let _ = write!(
        text,
        "Candidate scores {} out of 100 for {title} at the {} tier.",
        breakdown.final_score, breakdown.tier
    );

    if !breakdown.matched_skills.is_empty() {
        let _ = write!(
            text,
            " Required skills covered: {}.",
            breakdown.matched_skills.join(", ")
        );
    }
    if !breakdown.missing_skills.is_empty() {
        let _ = write!(
            text,
            " Required skills missing: {}.",
            breakdown.missing_skills.join(", ")
        );
    }

    let exp = &outcome.experience;
    let _ = write!(
        text,
        " Experience: {:.1} professional, {:.1} internship, {:.1} project years.",
        exp.professional_years, exp.internship_years, exp.project_years
    );

    for cap in &breakdown.applied_caps {
        let _ = write!(text, " Score capped at {}: {}.", cap.limit, cap.reason);
    }

    text
}

/// Asks a chat-completions endpoint to phrase the breakdown. The prompt
/// carries only already-computed numbers, never raw resume text.
#[derive(Debug, Clone)]
pub struct LlmNarrator {
    client: reqwest::Client,
    config: LlmConfig,
}

impl LlmNarrator {
    pub fn new(config: LlmConfig) -> Result<Self, NarrativeError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|err| NarrativeError::Network(err.to_string()))?;
        Ok(Self { client, config })
    }

    async fn request_once(&self, prompt: &str) -> Result<String, NarrativeError> {
        let body = json!({
            "model": self.config.model,
            "messages": [
                {
                    "role": "system",
                    "content": "You summarize pre-computed candidate scoring results for recruiters. \
                                Restate only the numbers and skill lists you are given; invent nothing.",
                },
                { "role": "user", "content": prompt },
            ],
            "temperature": 0.0,
        });

        let response = self
            .client
            .post(&self.config.endpoint)
            .bearer_auth(&self.config.api_key)
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(NarrativeError::from_status(status, body));
        }

        let payload: serde_json::Value = response.json().await?;
        payload["choices"][0]["message"]["content"]
            .as_str()
            .map(|content| content.trim().to_string())
            .filter(|content| !content.is_empty())
            .ok_or_else(|| NarrativeError::InvalidResponse("missing message content".into()))
    }

    pub async fn generate(
        &self,
        outcome: &AnalysisOutcome,
        job: &JobDescription,
    ) -> Result<String, NarrativeError> {
        let prompt = format!(
            "Write a short recruiter-facing summary of this scoring result:\n{}",
            render_template(outcome, job)
        );

        let mut attempt = 0u32;
        loop {
            match self.request_once(&prompt).await {
                Ok(text) => return Ok(text),
                Err(err) if err.retryable() && attempt < self.config.max_retries => {
                    attempt += 1;
                    warn!(
                        kind = err.kind(),
                        attempt,
                        error = %err,
                        "narrative completion failed; retrying"
                    );
                    tokio::time::sleep(Duration::from_secs(
                        self.config.retry_backoff_secs * u64::from(attempt),
                    ))
                    .await;
                }
                Err(err) => return Err(err),
            }
        }
    }
}

/// The adapter the handlers talk to. LLM mode degrades to the template on any
/// upstream failure, so narration can never make a request fail.
#[derive(Debug, Clone)]
pub enum Narrator {
    Template,
    Llm(LlmNarrator),
}

impl Narrator {
    pub fn from_env() -> Self {
        let enabled = std::env::var("ATS_LLM_ENABLED")
            .map(|value| matches!(value.to_ascii_lowercase().as_str(), "1" | "true" | "yes"))
            .unwrap_or(false);
        if !enabled {
            return Narrator::Template;
        }

        let config = LlmConfig::from_env();
        if config.api_key.is_empty() {
            warn!("ATS_LLM_ENABLED set but no API key configured; using template narration");
            return Narrator::Template;
        }

        match LlmNarrator::new(config) {
            Ok(narrator) => Narrator::Llm(narrator),
            Err(err) => {
                warn!(error = %err, "failed to build LLM narrator; using template narration");
                Narrator::Template
            }
        }
    }

    pub async fn narrate(&self, outcome: &AnalysisOutcome, job: &JobDescription) -> String {
        match self {
            Narrator::Template => render_template(outcome, job),
            Narrator::Llm(narrator) => match narrator.generate(outcome, job).await {
                Ok(text) => text,
                Err(err) => {
                    warn!(
                        kind = err.kind(),
                        error = %err,
                        "narration fell back to template"
                    );
                    render_template(outcome, job)
                }
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ats_core::config::EngineConfig;
    use ats_core::matching::pipeline::AnalysisEngine;
    use ats_core::{JobDescription, Resume};
    use chrono::NaiveDate;

    fn outcome_and_job() -> (AnalysisOutcome, JobDescription) {
        let engine = AnalysisEngine::new(EngineConfig::default()).unwrap();
        let resume = Resume {
            skills: vec!["Python".into()],
            ..Resume::default()
        };
        let job = JobDescription {
            title: "Data Engineer".into(),
            must_have_skills: vec!["Python".into(), "Spark".into()],
            ..JobDescription::default()
        };
        let as_of = NaiveDate::from_ymd_opt(2025, 6, 1).unwrap();
        let outcome = engine.analyze(&resume, &job, as_of).unwrap();
        (outcome, job)
    }

    #[test]
    fn template_is_deterministic_and_names_missing_skills() {
        let (outcome, job) = outcome_and_job();

        let first = render_template(&outcome, &job);
        let second = render_template(&outcome, &job);
        assert_eq!(first, second);
        assert!(first.contains("Data Engineer"));
        assert!(first.contains("spark"));
        assert!(first.contains(&outcome.breakdown.final_score.to_string()));
    }

    #[test]
    fn template_reports_applied_caps() {
        let engine = AnalysisEngine::new(EngineConfig::default()).unwrap();
        let resume = Resume {
            skills: vec!["Python".into()],
            experience: vec![ats_core::ExperienceEntry {
                kind: ats_core::EntryKind::Professional,
                title: "Engineer".into(),
                start: NaiveDate::from_ymd_opt(2017, 1, 1).unwrap(),
                end: Some(NaiveDate::from_ymd_opt(2024, 1, 1).unwrap()),
                bullets: vec![],
            }],
            ..Resume::default()
        };
        let job = JobDescription {
            must_have_skills: vec!["Python".into(), "Go".into(), "Kafka".into(), "AWS".into()],
            ..JobDescription::default()
        };
        let outcome = engine
            .analyze(&resume, &job, NaiveDate::from_ymd_opt(2025, 6, 1).unwrap())
            .unwrap();
        assert!(!outcome.breakdown.applied_caps.is_empty());

        let text = render_template(&outcome, &job);
        assert!(text.contains("Score capped at"));
    }

    #[test]
    fn error_classification_matches_upstream_status() {
        let rate = NarrativeError::from_status(
            reqwest::StatusCode::TOO_MANY_REQUESTS,
            "slow down".into(),
        );
        assert_eq!(rate.kind(), "rate_limit");
        assert!(rate.retryable());

        let auth =
            NarrativeError::from_status(reqwest::StatusCode::UNAUTHORIZED, "bad key".into());
        assert_eq!(auth.kind(), "auth");
        assert!(!auth.retryable());

        let server =
            NarrativeError::from_status(reqwest::StatusCode::BAD_GATEWAY, "oops".into());
        assert_eq!(server.kind(), "server");
        assert!(server.retryable());
    }

    #[test]
    fn narrator_from_env_defaults_to_template() {
        // ATS_LLM_ENABLED unset in the test environment.
        assert!(matches!(Narrator::from_env(), Narrator::Template));
    }
}
