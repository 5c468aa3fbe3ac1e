//! # API Request/Response Types
//!
//! This module defines the JSON structures for the HTTP API.

use chrono::NaiveDate;
use intake_core::dates::{parse_required, today_local};
use intake_core::primitives::{MAX_METRICS, MAX_STAKEHOLDERS};
use intake_core::{
    FormContext, IntakeError, IntakeForm, Metric, ReferenceData, SubmissionPayload,
    UnresolvedPolicy, UnresolvedRecord, UseCaseId, WizardStep,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

// =============================================================================
// SHARED VALIDATION
// =============================================================================

/// Reject forms larger than the server accepts.
pub fn check_form_limits(form: &IntakeForm) -> Result<(), String> {
    check_metric_limit(form.metrics.len())?;
    if form.stakeholders.len() > MAX_STAKEHOLDERS {
        return Err(format!(
            "Stakeholder count {} exceeds maximum {}",
            form.stakeholders.len(),
            MAX_STAKEHOLDERS
        ));
    }
    Ok(())
}

fn check_metric_limit(count: usize) -> Result<(), String> {
    if count > MAX_METRICS {
        return Err(format!(
            "Metric count {} exceeds maximum {}",
            count, MAX_METRICS
        ));
    }
    Ok(())
}

/// The request's `today`, or the server's local date.
pub fn resolve_today(raw: Option<&str>) -> Result<NaiveDate, IntakeError> {
    match raw {
        Some(raw) => parse_required(raw),
        None => Ok(today_local()),
    }
}

/// Parse an optional date field; blank means unset.
pub fn parse_optional_date(raw: Option<&str>) -> Result<Option<NaiveDate>, IntakeError> {
    match raw.map(str::trim) {
        None | Some("") => Ok(None),
        Some(raw) => parse_required(raw).map(Some),
    }
}

// =============================================================================
// HEALTH RESPONSE
// =============================================================================

/// Health check response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}

impl Default for HealthResponse {
    fn default() -> Self {
        Self {
            status: "ok".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }
}

// =============================================================================
// REFERENCE RESPONSE
// =============================================================================

/// Summary of the cached reference data.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ReferenceResponse {
    pub success: bool,
    pub counts: BTreeMap<String, usize>,
    pub business_units: Vec<String>,
    pub phases: Vec<String>,
    pub role_options: Vec<String>,
    pub checklist_enabled: bool,
    pub error: Option<String>,
}

impl ReferenceResponse {
    pub fn success(data: &ReferenceData) -> Self {
        let context = FormContext::from_reference(data);
        Self {
            success: true,
            counts: data
                .summary()
                .into_iter()
                .map(|(k, v)| (k.to_string(), v))
                .collect(),
            business_units: data.structure().business_units().to_vec(),
            phases: context
                .ordering
                .phases()
                .iter()
                .map(|p| p.name.clone())
                .collect(),
            checklist_enabled: context.checklist_enabled(),
            role_options: context.role_options,
            error: None,
        }
    }

    pub fn error(msg: impl Into<String>) -> Self {
        Self {
            success: false,
            error: Some(msg.into()),
            ..Self::default()
        }
    }
}

// =============================================================================
// WIZARD ADVANCE
// =============================================================================

/// Ask whether the form may leave `step`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdvanceRequest {
    pub step: WizardStep,
    #[serde(default)]
    pub form: IntakeForm,
    /// `YYYY-MM-DD`; the server's date when absent.
    #[serde(default)]
    pub today: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdvanceResponse {
    pub success: bool,
    pub step: WizardStep,
    /// Where the wizard goes next; equal to `step` on the metrics step,
    /// which submits instead of moving.
    pub next_step: Option<WizardStep>,
    pub checklist_needs_attention: bool,
    pub error: Option<String>,
}

impl AdvanceResponse {
    pub fn success(step: WizardStep, next: WizardStep, checklist_needs_attention: bool) -> Self {
        Self {
            success: true,
            step,
            next_step: Some(next),
            checklist_needs_attention,
            error: None,
        }
    }

    pub fn error(step: WizardStep, msg: impl Into<String>) -> Self {
        Self {
            success: false,
            step,
            next_step: None,
            checklist_needs_attention: false,
            error: Some(msg.into()),
        }
    }
}

// =============================================================================
// TIMELINE VALIDATION
// =============================================================================

/// Check one phase edit against the form's current timeline.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimelineRequest {
    #[serde(default)]
    pub form: IntakeForm,
    pub phase: String,
    #[serde(default)]
    pub start_date: Option<String>,
    #[serde(default)]
    pub end_date: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimelineResponse {
    pub success: bool,
    pub valid: bool,
    pub error: Option<String>,
}

impl TimelineResponse {
    pub fn checked(violation: Option<String>) -> Self {
        Self {
            success: true,
            valid: violation.is_none(),
            error: violation,
        }
    }

    pub fn error(msg: impl Into<String>) -> Self {
        Self {
            success: false,
            valid: false,
            error: Some(msg.into()),
        }
    }
}

// =============================================================================
// METRIC VALIDATION
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricsRequest {
    pub metrics: Vec<Metric>,
    #[serde(default)]
    pub today: Option<String>,
}

impl MetricsRequest {
    pub fn check_limits(&self) -> Result<(), String> {
        check_metric_limit(self.metrics.len())
    }
}

/// First failing rule of one metric.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetricIssueJson {
    pub index: usize,
    pub message: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricsResponse {
    pub success: bool,
    pub valid: bool,
    pub issues: Vec<MetricIssueJson>,
    pub error: Option<String>,
}

impl MetricsResponse {
    pub fn checked(metrics: &[Metric], today: NaiveDate) -> Self {
        let issues: Vec<MetricIssueJson> = metrics
            .iter()
            .enumerate()
            .filter_map(|(index, metric)| {
                metric.check(today).err().map(|issue| MetricIssueJson {
                    index,
                    message: issue.to_string(),
                })
            })
            .collect();
        Self {
            success: true,
            valid: !metrics.is_empty() && issues.is_empty(),
            issues,
            error: None,
        }
    }

    pub fn error(msg: impl Into<String>) -> Self {
        Self {
            success: false,
            valid: false,
            issues: Vec::new(),
            error: Some(msg.into()),
        }
    }
}

// =============================================================================
// SUBMISSION
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubmissionRequest {
    pub form: IntakeForm,
    /// Overrides the server's configured editor email.
    #[serde(default)]
    pub editor_email: Option<String>,
    /// Overrides the server's configured policy.
    #[serde(default)]
    pub policy: Option<UnresolvedPolicy>,
    #[serde(default)]
    pub today: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SubmissionResponse {
    pub success: bool,
    pub payload: Option<SubmissionPayload>,
    pub warnings: Vec<UnresolvedRecord>,
    /// Set once the backend accepted the submission.
    pub use_case_id: Option<UseCaseId>,
    pub error: Option<String>,
}

impl SubmissionResponse {
    pub fn preview(payload: SubmissionPayload, warnings: Vec<UnresolvedRecord>) -> Self {
        Self {
            success: true,
            payload: Some(payload),
            warnings,
            use_case_id: None,
            error: None,
        }
    }

    pub fn created(
        payload: SubmissionPayload,
        warnings: Vec<UnresolvedRecord>,
        id: UseCaseId,
    ) -> Self {
        Self {
            use_case_id: Some(id),
            ..Self::preview(payload, warnings)
        }
    }

    pub fn error(msg: impl Into<String>) -> Self {
        Self {
            success: false,
            error: Some(msg.into()),
            ..Self::default()
        }
    }
}
