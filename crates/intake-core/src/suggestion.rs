//! # AI Suggestions
//!
//! Response shapes of the optional suggestion endpoints and their mapping
//! onto form state. Suggestions are advisory: items that do not fit the
//! form (unknown phase, unparseable dates, blank metric names) are skipped.

use crate::dates::parse_flexible;
use crate::metric::Metric;
use crate::timeline::PhaseOrdering;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

// =============================================================================
// TIMELINE SUGGESTIONS
// =============================================================================

/// A suggested date range for one phase.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PhaseSuggestion {
    pub phase: String,
    pub start: NaiveDate,
    pub end: NaiveDate,
}

/// Raw timeline item as returned by `/api/ai/suggestions/phase`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TimelineSuggestionItem {
    pub name: String,
    pub start_date: String,
    pub end_date: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TimelineSuggestionResponse {
    pub items: Vec<TimelineSuggestionItem>,
}

impl TimelineSuggestionResponse {
    /// Match items to phases case-insensitively.
    ///
    /// Items naming an unknown phase, with an unparseable date or with an
    /// end not after the start are dropped. The first item per phase wins.
    #[must_use]
    pub fn into_suggestions(self, ordering: &PhaseOrdering) -> Vec<PhaseSuggestion> {
        let mut suggestions: Vec<PhaseSuggestion> = Vec::new();
        for item in self.items {
            let Some(phase) = ordering.canonical(&item.name) else {
                continue;
            };
            let (Some(start), Some(end)) =
                (parse_flexible(&item.start_date), parse_flexible(&item.end_date))
            else {
                continue;
            };
            if end <= start || suggestions.iter().any(|s| s.phase == phase) {
                continue;
            }
            suggestions.push(PhaseSuggestion {
                phase: phase.to_string(),
                start,
                end,
            });
        }
        suggestions
    }
}

// =============================================================================
// METRIC SUGGESTIONS
// =============================================================================

/// Raw metric item as returned by `/api/ai/suggestions/metric`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct MetricSuggestionItem {
    pub primary_success_value: String,
    pub parcs_category: String,
    pub unit_of_measurement: String,
    pub baseline_value: String,
    pub baseline_date: String,
    pub target_value: String,
    pub target_date: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MetricSuggestionResponse {
    pub items: Vec<MetricSuggestionItem>,
}

impl MetricSuggestionResponse {
    /// Draft metrics for every item with a metric name.
    #[must_use]
    pub fn into_metrics(self) -> Vec<Metric> {
        self.items
            .into_iter()
            .filter(|item| !item.primary_success_value.trim().is_empty())
            .map(|item| Metric {
                primary_success_value: item.primary_success_value.trim().to_string(),
                parcs_category: item.parcs_category.trim().to_string(),
                unit_of_measurement: item.unit_of_measurement.trim().to_string(),
                baseline_value: item.baseline_value.trim().to_string(),
                baseline_date: item.baseline_date.trim().to_string(),
                target_value: item.target_value.trim().to_string(),
                target_date: item.target_date.trim().to_string(),
                ..Metric::default()
            })
            .collect()
    }
}

// =============================================================================
// USE-CASE SUGGESTIONS
// =============================================================================

/// Text suggestions for the step-one fields. Any field may be missing.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct UseCaseSuggestion {
    pub title: Option<String>,
    pub headline: Option<String>,
    pub opportunity: Option<String>,
    pub business_value: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).expect("valid date")
    }

    #[test]
    fn timeline_items_match_phases_case_insensitively() {
        let response: TimelineSuggestionResponse = serde_json::from_str(
            r#"{"items":[
                {"name":"idea","startDate":"2024-01-01","endDate":"2024-01-31"},
                {"name":"Diagnose","startDate":"01-02-2024","endDate":"2024-02-28"},
                {"name":"Operate","startDate":"2024-03-01","endDate":"2024-03-31"},
                {"name":"Design","startDate":"soon","endDate":"2024-03-31"},
                {"name":"Implemented","startDate":"2024-05-01","endDate":"2024-04-01"}
            ]}"#,
        )
        .expect("parse");

        let suggestions = response.into_suggestions(&PhaseOrdering::fallback());
        assert_eq!(suggestions.len(), 2);
        assert_eq!(suggestions[0].phase, "Idea");
        assert_eq!(suggestions[1].start, date(2024, 2, 1));
    }

    #[test]
    fn empty_response_is_tolerated() {
        let response: TimelineSuggestionResponse = serde_json::from_str("{}").expect("parse");
        assert!(response.into_suggestions(&PhaseOrdering::fallback()).is_empty());
    }

    #[test]
    fn metric_items_become_draft_metrics() {
        let response: MetricSuggestionResponse = serde_json::from_str(
            r#"{"items":[
                {"primarySuccessValue":"Cycle time","parcsCategory":"Productivity",
                 "unitOfMeasurement":"Hours","baselineValue":"40","targetValue":"10",
                 "targetDate":"2025-01-01"},
                {"primarySuccessValue":"  "}
            ]}"#,
        )
        .expect("parse");

        let metrics = response.into_metrics();
        assert_eq!(metrics.len(), 1);
        assert_eq!(metrics[0].parcs_category, "Productivity");
        assert_eq!(metrics[0].target_date, "2025-01-01");
        assert!(metrics[0].baseline_date.is_empty());
        assert!(!metrics[0].is_submitted);
    }
}
