use chrono::{Datelike, NaiveDate};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use strum::Display;

use crate::error::EngineError;
use crate::{EntryKind, ExperienceEntry};

/// Coarse experience-level classification. Governs which side signals count
/// toward experience alignment and which caps apply.
///
/// Discriminant order is load-bearing: the tier policy table in
/// `matching::scoring` is indexed by it.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Display,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum RoleTier {
    Junior = 0,
    Mid = 1,
    Senior = 2,
}

/// Year boundaries separating the tiers.
///
/// Boundary contract: Junior iff years <= junior_max_years, Senior iff
/// years >= senior_min_years, Mid otherwise. Exactly 1.0 merged years is
/// Junior; exactly 5.0 is Senior.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TierThresholds {
    pub junior_max_years: f64,
    pub senior_min_years: f64,
}

impl Default for TierThresholds {
    fn default() -> Self {
        Self {
            junior_max_years: 1.0,
            senior_min_years: 5.0,
        }
    }
}

impl TierThresholds {
    pub fn classify(&self, professional_years: f64) -> RoleTier {
        if professional_years <= self.junior_max_years {
            RoleTier::Junior
        } else if professional_years >= self.senior_min_years {
            RoleTier::Senior
        } else {
            RoleTier::Mid
        }
    }

    pub fn validate(&self) -> Result<(), EngineError> {
        if self.junior_max_years < 0.0 || self.senior_min_years < 0.0 {
            return Err(EngineError::Configuration(
                "tier thresholds must be non-negative".into(),
            ));
        }
        if self.junior_max_years >= self.senior_min_years {
            return Err(EngineError::Configuration(format!(
                "junior_max_years ({}) must be below senior_min_years ({})",
                self.junior_max_years, self.senior_min_years
            )));
        }
        Ok(())
    }
}

/// Aggregated durations per entry kind plus the derived tier. Internship and
/// project years are kept apart from the professional total; only the score
/// aggregator folds them in, under tier-specific weighting.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExperienceSummary {
    pub professional_years: f64,
    pub internship_years: f64,
    pub project_years: f64,
    pub tier: RoleTier,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Interval {
    start: NaiveDate,
    end: NaiveDate,
}

/// Month-granularity span, matching how resume date ranges are written.
fn months_between(start: NaiveDate, end: NaiveDate) -> i64 {
    let months =
        (end.year() as i64 - start.year() as i64) * 12 + (end.month() as i64 - start.month() as i64);
    months.max(0)
}

fn round_one_decimal(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

/// Sort by start and sweep-merge overlapping or adjacent intervals so
/// concurrent engagements are never double-counted.
fn merge_intervals(mut intervals: Vec<Interval>) -> Vec<Interval> {
    intervals.sort_by_key(|iv| (iv.start, iv.end));

    let mut merged: Vec<Interval> = Vec::with_capacity(intervals.len());
    for interval in intervals {
        match merged.last_mut() {
            Some(current) if interval.start <= current.end => {
                if interval.end > current.end {
                    current.end = interval.end;
                }
            }
            _ => merged.push(interval),
        }
    }
    merged
}

fn merged_years(intervals: Vec<Interval>) -> f64 {
    let total_months: i64 = merge_intervals(intervals)
        .iter()
        .map(|iv| months_between(iv.start, iv.end))
        .sum();
    round_one_decimal(total_months as f64 / 12.0)
}

/// Aggregate experience entries into per-kind totals and a role tier.
///
/// `as_of` resolves ongoing entries, keeping the computation a pure function
/// of its arguments. Entries whose end precedes their start are rejected.
pub fn summarize(
    entries: &[ExperienceEntry],
    thresholds: &TierThresholds,
    as_of: NaiveDate,
) -> Result<ExperienceSummary, EngineError> {
    let mut professional = Vec::new();
    let mut internships = Vec::new();
    let mut projects = Vec::new();

    for entry in entries {
        let end = entry.end.unwrap_or(as_of);
        if end < entry.start {
            return Err(EngineError::Validation(format!(
                "experience entry '{}' ends {} before it starts {}",
                entry.title, end, entry.start
            )));
        }

        let interval = Interval {
            start: entry.start,
            end,
        };
        match entry.kind {
            EntryKind::Professional => professional.push(interval),
            EntryKind::Internship => internships.push(interval),
            EntryKind::Project => projects.push(interval),
        }
    }

    let professional_years = merged_years(professional);

    Ok(ExperienceSummary {
        professional_years,
        internship_years: merged_years(internships),
        project_years: merged_years(projects),
        tier: thresholds.classify(professional_years),
    })
}

static NUMERIC_DATE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(\d{4})[/-](\d{1,2})(?:[/-](\d{1,2}))?$").unwrap());
static MONTH_NAME_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^(jan|feb|mar|apr|may|jun|jul|aug|sep|oct|nov|dec)[a-z]*\.?[\s,]+(\d{4})$")
        .unwrap()
});
static ONGOING_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)^(present|current|ongoing|now)$").unwrap());

/// Parse a resume date string into a date, or `None` for an ongoing marker.
///
/// Accepted forms: `YYYY-MM`, `YYYY-MM-DD` (slash separators too),
/// `Jan 2021` / `January 2021`, and `present`/`current`/`ongoing`/`now`.
/// Anything else is a validation error; durations are never fabricated from
/// unparseable dates.
pub fn parse_entry_date(raw: &str) -> Result<Option<NaiveDate>, EngineError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(EngineError::Validation("empty date string".into()));
    }

    if ONGOING_RE.is_match(trimmed) {
        return Ok(None);
    }

    if let Some(caps) = NUMERIC_DATE_RE.captures(trimmed) {
        let year: i32 = caps[1].parse().map_err(invalid_date(trimmed))?;
        let month: u32 = caps[2].parse().map_err(invalid_date(trimmed))?;
        let day: u32 = caps
            .get(3)
            .map(|m| m.as_str().parse())
            .transpose()
            .map_err(invalid_date(trimmed))?
            .unwrap_or(1);

        return NaiveDate::from_ymd_opt(year, month, day)
            .map(Some)
            .ok_or_else(|| EngineError::Validation(format!("date out of range: {trimmed}")));
    }

    if let Some(caps) = MONTH_NAME_RE.captures(trimmed) {
        let month = match caps[1].to_lowercase().as_str() {
            "jan" => 1,
            "feb" => 2,
            "mar" => 3,
            "apr" => 4,
            "may" => 5,
            "jun" => 6,
            "jul" => 7,
            "aug" => 8,
            "sep" => 9,
            "oct" => 10,
            "nov" => 11,
            _ => 12,
        };
        let year: i32 = caps[2].parse().map_err(invalid_date(trimmed))?;

        return NaiveDate::from_ymd_opt(year, month, 1)
            .map(Some)
            .ok_or_else(|| EngineError::Validation(format!("date out of range: {trimmed}")));
    }

    Err(EngineError::Validation(format!(
        "could not parse date: {trimmed}"
    )))
}

fn invalid_date<E>(raw: &str) -> impl FnOnce(E) -> EngineError + '_ {
    move |_| EngineError::Validation(format!("could not parse date: {raw}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    fn professional(start: NaiveDate, end: Option<NaiveDate>) -> ExperienceEntry {
        ExperienceEntry {
            kind: EntryKind::Professional,
            title: "engineer".into(),
            start,
            end,
            bullets: vec![],
        }
    }

    fn as_of() -> NaiveDate {
        d(2025, 6, 1)
    }

    #[test]
    fn overlapping_professional_entries_count_once() {
        // Overlapping concurrent jobs count once: 2019-01..2020-06 and
        // 2020-01..2021-01 overlap; the
        // merged span is 24 months.
        let entries = vec![
            professional(d(2019, 1, 1), Some(d(2020, 6, 1))),
            professional(d(2020, 1, 1), Some(d(2021, 1, 1))),
        ];

        let summary = summarize(&entries, &TierThresholds::default(), as_of()).unwrap();
        assert_eq!(summary.professional_years, 2.0);
        assert_eq!(summary.tier, RoleTier::Mid);
    }

    #[test]
    fn merging_is_order_independent() {
        let a = professional(d(2019, 1, 1), Some(d(2020, 6, 1)));
        let b = professional(d(2020, 1, 1), Some(d(2021, 1, 1)));
        let c = professional(d(2022, 3, 1), Some(d(2022, 9, 1)));

        let thresholds = TierThresholds::default();
        let forward = summarize(&[a.clone(), b.clone(), c.clone()], &thresholds, as_of()).unwrap();
        let backward = summarize(&[c, b, a], &thresholds, as_of()).unwrap();

        assert_eq!(forward, backward);
        assert_eq!(forward.professional_years, 2.5);
    }

    #[test]
    fn adjacent_intervals_merge_without_gap_or_double_count() {
        let entries = vec![
            professional(d(2020, 1, 1), Some(d(2021, 1, 1))),
            professional(d(2021, 1, 1), Some(d(2022, 1, 1))),
        ];

        let summary = summarize(&entries, &TierThresholds::default(), as_of()).unwrap();
        assert_eq!(summary.professional_years, 2.0);
    }

    #[test]
    fn ongoing_entries_resolve_to_evaluation_date() {
        let entries = vec![professional(d(2024, 6, 1), None)];
        let summary = summarize(&entries, &TierThresholds::default(), as_of()).unwrap();
        assert_eq!(summary.professional_years, 1.0);
        assert_eq!(summary.tier, RoleTier::Junior);
    }

    #[test]
    fn internships_and_projects_stay_out_of_the_professional_total() {
        let entries = vec![
            ExperienceEntry {
                kind: EntryKind::Internship,
                title: "intern".into(),
                start: d(2023, 1, 1),
                end: Some(d(2023, 7, 1)),
                bullets: vec![],
            },
            ExperienceEntry {
                kind: EntryKind::Project,
                title: "side project".into(),
                start: d(2023, 1, 1),
                end: Some(d(2024, 1, 1)),
                bullets: vec![],
            },
        ];

        let summary = summarize(&entries, &TierThresholds::default(), as_of()).unwrap();
        assert_eq!(summary.professional_years, 0.0);
        assert_eq!(summary.internship_years, 0.5);
        assert_eq!(summary.project_years, 1.0);
        assert_eq!(summary.tier, RoleTier::Junior);
    }

    #[test]
    fn end_before_start_is_a_validation_error() {
        let entries = vec![professional(d(2021, 5, 1), Some(d(2021, 1, 1)))];
        let err = summarize(&entries, &TierThresholds::default(), as_of()).unwrap_err();
        assert!(matches!(err, EngineError::Validation(_)));
    }

    #[test]
    fn tier_boundaries_are_pinned() {
        let t = TierThresholds::default();
        assert_eq!(t.classify(0.0), RoleTier::Junior);
        assert_eq!(t.classify(1.0), RoleTier::Junior);
        assert_eq!(t.classify(1.1), RoleTier::Mid);
        assert_eq!(t.classify(1.9), RoleTier::Mid);
        assert_eq!(t.classify(4.9), RoleTier::Mid);
        assert_eq!(t.classify(5.0), RoleTier::Senior);
        assert_eq!(t.classify(12.0), RoleTier::Senior);
    }

    #[test]
    fn threshold_validation_rejects_inverted_or_negative_bounds() {
        let inverted = TierThresholds {
            junior_max_years: 5.0,
            senior_min_years: 1.0,
        };
        assert!(matches!(
            inverted.validate(),
            Err(EngineError::Configuration(_))
        ));

        let negative = TierThresholds {
            junior_max_years: -1.0,
            senior_min_years: 5.0,
        };
        assert!(matches!(
            negative.validate(),
            Err(EngineError::Configuration(_))
        ));

        assert!(TierThresholds::default().validate().is_ok());
    }

    #[test]
    fn parses_supported_date_forms() {
        assert_eq!(parse_entry_date("2021-03").unwrap(), Some(d(2021, 3, 1)));
        assert_eq!(parse_entry_date("2021/03/15").unwrap(), Some(d(2021, 3, 15)));
        assert_eq!(parse_entry_date("Jan 2021").unwrap(), Some(d(2021, 1, 1)));
        assert_eq!(parse_entry_date("September 2019").unwrap(), Some(d(2019, 9, 1)));
        assert_eq!(parse_entry_date("Present").unwrap(), None);
        assert_eq!(parse_entry_date("ongoing").unwrap(), None);
    }

    #[test]
    fn rejects_unparseable_dates() {
        for raw in ["", "sometime", "2021-13", "13/2021"] {
            assert!(matches!(
                parse_entry_date(raw),
                Err(EngineError::Validation(_))
            ));
        }
    }
}
