//! # Intake Form
//!
//! The complete state of one submit form as a serializable document, plus
//! the reference-derived context needed to evaluate it.
//!
//! This is the shape accepted by the HTTP API and by the CLI's `-f` files:
//!
//! ```json
//! {
//!   "draft": { "title": "...", "businessUnit": "Finance", "team": "Payroll", ... },
//!   "stakeholders": [{ "name": "...", "email": "...", "role": "Owner" }],
//!   "phases": [{ "phase": "Idea", "startDate": "2024-01-01", "endDate": "01-02-2024" }],
//!   "checklist": { "q_1": "Yes", "q_2": ["Internal", "Public"] },
//!   "metrics": [{ "primarySuccessValue": "...", ... }]
//! }
//! ```

use crate::checklist::{ChecklistAnswers, ChecklistQuestion};
use crate::dates::flexible_opt;
use crate::draft::UseCaseDraft;
use crate::metric::{Metric, metrics_form_valid};
use crate::payload::{
    AssembledSubmission, AssemblyInput, EditChanges, UnresolvedPolicy, assemble, edit_changes,
    resolve_business_unit, resolve_primary_contact,
};
use crate::reference::{LookupMaps, ReferenceData, role_options};
use crate::stakeholder::{Stakeholder, StakeholderRoster};
use crate::timeline::{PhaseOrdering, Timeline, TimelineError};
use crate::types::IntakeError;
use crate::wizard::FormSnapshot;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Dates entered for one phase.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PhaseEntry {
    pub phase: String,
    #[serde(default, with = "flexible_opt")]
    pub start_date: Option<NaiveDate>,
    #[serde(default, with = "flexible_opt")]
    pub end_date: Option<NaiveDate>,
}

/// Serializable state of one submit form.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct IntakeForm {
    pub draft: UseCaseDraft,
    pub stakeholders: Vec<Stakeholder>,
    pub phases: Vec<PhaseEntry>,
    pub checklist: ChecklistAnswers,
    pub metrics: Vec<Metric>,
}

/// Reference-derived context shared by every form evaluation.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FormContext {
    pub lookups: LookupMaps,
    pub ordering: PhaseOrdering,
    pub questions: Vec<ChecklistQuestion>,
    pub role_options: Vec<String>,
}

impl FormContext {
    #[must_use]
    pub fn from_reference(data: &ReferenceData) -> Self {
        Self {
            lookups: data.lookups(),
            ordering: PhaseOrdering::from_server(&data.phases),
            questions: ChecklistQuestion::from_reference(&data.ai_product_questions),
            role_options: role_options(&data.roles),
        }
    }

    /// The checklist tab is shown only when there are questions.
    #[must_use]
    pub fn checklist_enabled(&self) -> bool {
        !self.questions.is_empty()
    }
}

impl IntakeForm {
    /// Replay the phase entries onto a fresh timeline in phase order.
    ///
    /// Entries are applied as user edits, so every ordering rule holds; the
    /// first violation is returned.
    pub fn timeline(&self, ordering: &PhaseOrdering) -> Result<Timeline, TimelineError> {
        let mut entries: Vec<(usize, &PhaseEntry)> = Vec::with_capacity(self.phases.len());
        for entry in &self.phases {
            let position = ordering
                .position(&entry.phase)
                .ok_or_else(|| TimelineError::UnknownPhase(entry.phase.trim().to_string()))?;
            entries.push((position, entry));
        }
        entries.sort_by_key(|(position, _)| *position);

        let mut timeline = Timeline::new(ordering.clone());
        for (_, entry) in entries {
            timeline.apply_edit(&entry.phase, entry.start_date, entry.end_date)?;
        }
        Ok(timeline)
    }

    /// Stakeholders with roles normalized against the known role names.
    #[must_use]
    pub fn roster(&self, context: &FormContext) -> StakeholderRoster {
        StakeholderRoster::from_entries(self.stakeholders.clone(), &context.role_options)
    }

    /// Evaluate everything the step gate looks at.
    pub fn snapshot(
        &self,
        context: &FormContext,
        today: NaiveDate,
    ) -> Result<FormSnapshot, IntakeError> {
        let timeline = self.timeline(&context.ordering)?;
        let roster = self.roster(context);
        Ok(FormSnapshot {
            step_one_valid: self.draft.is_step_one_valid(),
            checklist_answered: self.checklist.answered_count(),
            stakeholder_count: roster.len(),
            first_phase_complete: timeline.first_phase_complete(),
            metric_count: self.metrics.len(),
            metrics_valid: metrics_form_valid(&self.metrics, today),
            primary_contact_resolved: resolve_primary_contact(&self.draft, roster.entries())
                .is_some(),
            business_unit_resolved: resolve_business_unit(&self.draft, &context.lookups).is_some(),
        })
    }

    /// Build the create request body.
    pub fn assemble(
        &self,
        context: &FormContext,
        editor_email: Option<&str>,
        policy: UnresolvedPolicy,
    ) -> Result<AssembledSubmission, IntakeError> {
        let timeline = self.timeline(&context.ordering)?;
        let roster = self.roster(context);
        let input = AssemblyInput {
            draft: &self.draft,
            stakeholders: roster.entries(),
            timeline: &timeline,
            checklist: &self.checklist,
            questions: &context.questions,
            metrics: &self.metrics,
            editor_email,
        };
        Ok(assemble(&input, &context.lookups, policy)?)
    }

    /// Plan and stakeholder changes relative to the form as it was loaded.
    pub fn edit_changes(
        &self,
        loaded: &IntakeForm,
        context: &FormContext,
    ) -> Result<EditChanges, IntakeError> {
        let timeline = self.timeline(&context.ordering)?;
        let loaded_timeline = loaded.timeline(&context.ordering)?;
        Ok(edit_changes(
            loaded.roster(context).entries(),
            &loaded_timeline,
            self.roster(context).entries(),
            &timeline,
            &context.lookups,
        ))
    }
}
