//! # Submission Payload Assembly
//!
//! Maps form state into the request body of `POST /api/usecases`.
//!
//! ## Rules
//!
//! - Role, metric category, unit and phase names resolve to ids through the
//!   case-insensitive lookup maps.
//! - Stakeholders are deduplicated by (role id, lowercased email); the first
//!   entry wins.
//! - Dates go out as `yyyy-MM-dd` whatever format they were typed in.
//! - The optional arrays (`checklist`, `stakeholders`, `plan`, `metrics`)
//!   serialize as `null` when empty.
//! - Records whose names do not resolve are handled by `UnresolvedPolicy`:
//!   `Reject` fails the whole assembly listing every such record, `Warn`
//!   drops them and returns them as warnings next to the payload.

use crate::checklist::{ChecklistAnswers, ChecklistQuestion};
use crate::dates::{parse_flexible, to_wire};
use crate::draft::UseCaseDraft;
use crate::metric::Metric;
use crate::primitives::DEFAULT_STATUS;
use crate::reference::LookupMaps;
use crate::stakeholder::Stakeholder;
use crate::timeline::Timeline;
use crate::types::{
    BusinessUnitId, MetricCategoryId, PhaseId, QuestionId, RoleId, StatusId, UnitOfMeasureId,
};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

// =============================================================================
// WIRE TYPES
// =============================================================================

/// `checklist[]` entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChecklistItem {
    pub question_id: QuestionId,
    pub response: String,
}

/// `stakeholders[]` entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StakeholderItem {
    pub role_id: RoleId,
    pub role: String,
    pub stakeholder_email: String,
}

/// `plan[]` entry. Field names are lowercase on the wire.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlanItem {
    pub usecasephaseid: PhaseId,
    pub startdate: String,
    pub enddate: String,
}

impl PlanItem {
    #[must_use]
    pub fn new(phase: PhaseId, start: NaiveDate, end: NaiveDate) -> Self {
        Self {
            usecasephaseid: phase,
            startdate: to_wire(start),
            enddate: to_wire(end),
        }
    }
}

/// `metrics[]` entry. Field names are lowercase on the wire.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetricItem {
    pub metrictypeid: MetricCategoryId,
    pub unitofmeasureid: UnitOfMeasureId,
    pub primarysuccessmetricname: String,
    pub baselinevalue: String,
    pub baselinedate: String,
    pub targetvalue: String,
    pub targetdate: String,
}

/// Request body of the create call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmissionPayload {
    pub business_unit_id: BusinessUnitId,
    pub phase_id: Option<PhaseId>,
    pub status_id: Option<StatusId>,
    pub title: String,
    pub headlines: String,
    pub opportunity: String,
    pub business_value: String,
    pub sub_team_name: Option<String>,
    pub information_url: Option<String>,
    pub ese_dependency: Option<String>,
    pub primary_contact: String,
    pub editor_email: Option<String>,
    pub checklist: Option<Vec<ChecklistItem>>,
    pub stakeholders: Option<Vec<StakeholderItem>>,
    pub plan: Option<Vec<PlanItem>>,
    pub metrics: Option<Vec<MetricItem>>,
}

// =============================================================================
// UNRESOLVED RECORDS
// =============================================================================

/// What to do with records whose names do not resolve to ids.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UnresolvedPolicy {
    /// Fail the assembly.
    #[default]
    Reject,
    /// Drop the records and report them as warnings.
    Warn,
}

impl FromStr for UnresolvedPolicy {
    type Err = String;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw.trim().to_lowercase().as_str() {
            "reject" => Ok(Self::Reject),
            "warn" => Ok(Self::Warn),
            other => Err(format!("unknown unresolved policy '{other}' (expected reject|warn)")),
        }
    }
}

impl fmt::Display for UnresolvedPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Reject => f.write_str("reject"),
            Self::Warn => f.write_str("warn"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecordKind {
    Stakeholder,
    Metric,
    Phase,
}

/// A record dropped or rejected because a field did not resolve.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UnresolvedRecord {
    pub kind: RecordKind,
    /// Human label of the record (email, metric name, phase name).
    pub label: String,
    pub field: String,
    pub value: String,
}

impl fmt::Display for UnresolvedRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kind = match self.kind {
            RecordKind::Stakeholder => "stakeholder",
            RecordKind::Metric => "metric",
            RecordKind::Phase => "phase",
        };
        write!(
            f,
            "{kind} '{}': {} '{}' could not be resolved",
            self.label, self.field, self.value
        )
    }
}

fn unresolved(kind: RecordKind, label: &str, field: &str, value: &str) -> UnresolvedRecord {
    UnresolvedRecord {
        kind,
        label: label.trim().to_string(),
        field: field.to_string(),
        value: value.trim().to_string(),
    }
}

fn list_records(records: &[UnresolvedRecord]) -> String {
    records
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

/// Assembly failures. Nothing is sent when assembly fails.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AssemblyError {
    #[error("Select a valid business unit.")]
    MissingBusinessUnit,

    #[error("Primary contact is required.")]
    MissingPrimaryContact,

    #[error("{} record(s) could not be resolved: {}", .0.len(), list_records(.0))]
    Unresolved(Vec<UnresolvedRecord>),
}

// =============================================================================
// ASSEMBLY
// =============================================================================

/// Borrowed view of everything the assembler reads.
#[derive(Debug, Clone, Copy)]
pub struct AssemblyInput<'a> {
    pub draft: &'a UseCaseDraft,
    pub stakeholders: &'a [Stakeholder],
    pub timeline: &'a Timeline,
    pub checklist: &'a ChecklistAnswers,
    pub questions: &'a [ChecklistQuestion],
    pub metrics: &'a [Metric],
    pub editor_email: Option<&'a str>,
}

/// An assembled payload plus the records dropped under `Warn`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AssembledSubmission {
    pub payload: SubmissionPayload,
    pub warnings: Vec<UnresolvedRecord>,
}

/// Primary contact: the draft value, else the owner's email, else the
/// owner's name.
#[must_use]
pub fn resolve_primary_contact(draft: &UseCaseDraft, stakeholders: &[Stakeholder]) -> Option<String> {
    let explicit = draft.primary_contact.trim();
    if !explicit.is_empty() {
        return Some(explicit.to_string());
    }
    let owner = stakeholders.iter().find(|s| s.is_owner())?;
    [owner.email.trim(), owner.name.trim()]
        .into_iter()
        .find(|value| !value.is_empty())
        .map(str::to_string)
}

/// `businessUnitId` for the draft's (business unit, team) selection.
#[must_use]
pub fn resolve_business_unit(draft: &UseCaseDraft, lookups: &LookupMaps) -> Option<BusinessUnitId> {
    lookups
        .structure
        .business_unit_id(&draft.business_unit, &draft.team)
}

fn stakeholder_items(
    stakeholders: &[Stakeholder],
    lookups: &LookupMaps,
    unresolved_records: &mut Vec<UnresolvedRecord>,
) -> Vec<StakeholderItem> {
    let mut seen: BTreeSet<(RoleId, String)> = BTreeSet::new();
    let mut items = Vec::new();
    for stakeholder in stakeholders {
        let email = stakeholder.email.trim();
        let label = if email.is_empty() {
            stakeholder.name.as_str()
        } else {
            email
        };
        if email.is_empty() {
            unresolved_records.push(unresolved(RecordKind::Stakeholder, label, "email", ""));
            continue;
        }
        let Some(role_id) = lookups.role_id(&stakeholder.role) else {
            unresolved_records.push(unresolved(
                RecordKind::Stakeholder,
                label,
                "role",
                &stakeholder.role,
            ));
            continue;
        };
        if seen.insert((role_id, email.to_lowercase())) {
            items.push(StakeholderItem {
                role_id,
                role: stakeholder.role.trim().to_string(),
                stakeholder_email: email.to_string(),
            });
        }
    }
    items
}

fn metric_items(
    metrics: &[Metric],
    lookups: &LookupMaps,
    unresolved_records: &mut Vec<UnresolvedRecord>,
) -> Vec<MetricItem> {
    let mut items = Vec::new();
    for metric in metrics {
        let label = metric.primary_success_value.as_str();
        let before = unresolved_records.len();

        let category = lookups.metric_category_id(&metric.parcs_category);
        if category.is_none() {
            unresolved_records.push(unresolved(
                RecordKind::Metric,
                label,
                "parcsCategory",
                &metric.parcs_category,
            ));
        }
        let unit = lookups.unit_id(&metric.unit_of_measurement);
        if unit.is_none() {
            unresolved_records.push(unresolved(
                RecordKind::Metric,
                label,
                "unitOfMeasurement",
                &metric.unit_of_measurement,
            ));
        }
        let baseline = parse_flexible(&metric.baseline_date);
        if baseline.is_none() {
            unresolved_records.push(unresolved(
                RecordKind::Metric,
                label,
                "baselineDate",
                &metric.baseline_date,
            ));
        }
        let target = parse_flexible(&metric.target_date);
        if target.is_none() {
            unresolved_records.push(unresolved(
                RecordKind::Metric,
                label,
                "targetDate",
                &metric.target_date,
            ));
        }

        if unresolved_records.len() != before {
            continue;
        }
        if let (Some(category), Some(unit), Some(baseline), Some(target)) =
            (category, unit, baseline, target)
        {
            items.push(MetricItem {
                metrictypeid: category,
                unitofmeasureid: unit,
                primarysuccessmetricname: metric.primary_success_value.trim().to_string(),
                baselinevalue: metric.baseline_value.trim().to_string(),
                baselinedate: to_wire(baseline),
                targetvalue: metric.target_value.trim().to_string(),
                targetdate: to_wire(target),
            });
        }
    }
    items
}

fn non_empty<T>(items: Vec<T>) -> Option<Vec<T>> {
    (!items.is_empty()).then_some(items)
}

fn non_blank(value: &str) -> Option<String> {
    let trimmed = value.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

/// Build the create request body.
pub fn assemble(
    input: &AssemblyInput<'_>,
    lookups: &LookupMaps,
    policy: UnresolvedPolicy,
) -> Result<AssembledSubmission, AssemblyError> {
    let draft = input.draft;
    let business_unit_id =
        resolve_business_unit(draft, lookups).ok_or(AssemblyError::MissingBusinessUnit)?;
    let primary_contact = resolve_primary_contact(draft, input.stakeholders)
        .ok_or(AssemblyError::MissingPrimaryContact)?;

    let mut unresolved_records = Vec::new();
    let stakeholders = stakeholder_items(input.stakeholders, lookups, &mut unresolved_records);
    let metrics = metric_items(input.metrics, lookups, &mut unresolved_records);
    let (plan, unresolved_phases) = input.timeline.plan_items(lookups);
    unresolved_records.extend(
        unresolved_phases
            .iter()
            .map(|name| unresolved(RecordKind::Phase, name, "phase", name)),
    );

    if policy == UnresolvedPolicy::Reject && !unresolved_records.is_empty() {
        return Err(AssemblyError::Unresolved(unresolved_records));
    }

    let phase_id = input
        .timeline
        .ordering()
        .first()
        .and_then(|first| first.id.or_else(|| lookups.phase_id(&first.name)));

    let payload = SubmissionPayload {
        business_unit_id,
        phase_id,
        status_id: lookups.status_id(DEFAULT_STATUS),
        title: draft.title.trim().to_string(),
        headlines: draft.headline.trim().to_string(),
        opportunity: draft.opportunity.trim().to_string(),
        business_value: draft.business_value.trim().to_string(),
        sub_team_name: non_blank(&draft.sub_team),
        information_url: draft.information_url(),
        ese_dependency: draft.ese_dependency().map(str::to_string),
        primary_contact,
        editor_email: input.editor_email.and_then(non_blank),
        checklist: non_empty(input.checklist.to_payload(input.questions)),
        stakeholders: non_empty(stakeholders),
        plan: non_empty(plan),
        metrics: non_empty(metrics),
    };

    Ok(AssembledSubmission {
        payload,
        warnings: unresolved_records,
    })
}

// =============================================================================
// EDITS
// =============================================================================

/// What an edit of an existing use case pushes to the backend.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct EditChanges {
    /// Dated phases whose start or end moved.
    pub plan: Vec<PlanItem>,
    /// Stakeholders absent from the loaded roster, by role and email.
    pub new_stakeholders: Vec<StakeholderItem>,
    pub warnings: Vec<UnresolvedRecord>,
}

impl EditChanges {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.plan.is_empty() && self.new_stakeholders.is_empty()
    }
}

/// Diff an edited form against the state it was loaded from.
///
/// Unresolved records of the edited side are dropped and reported.
#[must_use]
pub fn edit_changes(
    loaded_stakeholders: &[Stakeholder],
    loaded_timeline: &Timeline,
    stakeholders: &[Stakeholder],
    timeline: &Timeline,
    lookups: &LookupMaps,
) -> EditChanges {
    let mut ignored = Vec::new();
    let known: BTreeSet<(RoleId, String)> =
        stakeholder_items(loaded_stakeholders, lookups, &mut ignored)
            .into_iter()
            .map(|item| (item.role_id, item.stakeholder_email.to_lowercase()))
            .collect();

    let mut warnings = Vec::new();
    let new_stakeholders = stakeholder_items(stakeholders, lookups, &mut warnings)
        .into_iter()
        .filter(|item| !known.contains(&(item.role_id, item.stakeholder_email.to_lowercase())))
        .collect();

    let (plan, unresolved_phases) = timeline.plan_items_changed_since(loaded_timeline, lookups);
    warnings.extend(
        unresolved_phases
            .iter()
            .map(|name| unresolved(RecordKind::Phase, name, "phase", name)),
    );

    EditChanges {
        plan,
        new_stakeholders,
        warnings,
    }
}
