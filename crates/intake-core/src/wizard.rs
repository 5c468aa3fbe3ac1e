//! # Step Gate
//!
//! The submit wizard: Info → Checklist → Plan (stakeholders and timeline)
//! → Metrics, then Submitted.
//!
//! ## State Machine
//!
//! ```text
//! Info -> Checklist -> Plan -> Metrics -> Submitted
//! Back: step n -> step n-1, Info -> cancel
//! Failed submit: stays on Metrics with submit re-enabled
//! ```
//!
//! The checklist step is skipped in both directions when the checklist tab
//! is disabled. Every check is a pure predicate over a `FormSnapshot`; a
//! blocked transition leaves the wizard unchanged.

use serde::{Deserialize, Serialize};
use std::str::FromStr;
use thiserror::Error;

// =============================================================================
// STEPS
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum WizardStep {
    Info,
    Checklist,
    Plan,
    Metrics,
    Submitted,
}

impl WizardStep {
    /// 1-based step number as shown on the tabs. Submitted is 5.
    #[must_use]
    pub const fn ordinal(self) -> u8 {
        match self {
            Self::Info => 1,
            Self::Checklist => 2,
            Self::Plan => 3,
            Self::Metrics => 4,
            Self::Submitted => 5,
        }
    }

    #[must_use]
    pub const fn from_ordinal(ordinal: u8) -> Option<Self> {
        match ordinal {
            1 => Some(Self::Info),
            2 => Some(Self::Checklist),
            3 => Some(Self::Plan),
            4 => Some(Self::Metrics),
            5 => Some(Self::Submitted),
            _ => None,
        }
    }

    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Info => "Use Case Info",
            Self::Checklist => "AI Checklist",
            Self::Plan => "Stakeholders & Plan",
            Self::Metrics => "Metrics",
            Self::Submitted => "Submitted",
        }
    }
}

/// Accepts step names (`info`, `checklist`, `plan`, `metrics`) or their
/// 1-based numbers.
impl FromStr for WizardStep {
    type Err = String;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let raw = raw.trim();
        if let Some(step) = raw.parse::<u8>().ok().and_then(Self::from_ordinal) {
            return Ok(step);
        }
        match raw.to_lowercase().as_str() {
            "info" => Ok(Self::Info),
            "checklist" => Ok(Self::Checklist),
            "plan" => Ok(Self::Plan),
            "metrics" => Ok(Self::Metrics),
            "submitted" => Ok(Self::Submitted),
            other => Err(format!("unknown step '{other}'")),
        }
    }
}

/// Successor of `step`, skipping the checklist when it is disabled.
#[must_use]
pub const fn advance(step: WizardStep, checklist_enabled: bool) -> WizardStep {
    match step {
        WizardStep::Info if checklist_enabled => WizardStep::Checklist,
        WizardStep::Info | WizardStep::Checklist => WizardStep::Plan,
        WizardStep::Plan => WizardStep::Metrics,
        WizardStep::Metrics | WizardStep::Submitted => WizardStep::Submitted,
    }
}

/// Predecessor of `step`; `None` means leaving the wizard.
#[must_use]
pub const fn retreat(step: WizardStep, checklist_enabled: bool) -> Option<WizardStep> {
    match step {
        WizardStep::Info => None,
        WizardStep::Checklist => Some(WizardStep::Info),
        WizardStep::Plan if checklist_enabled => Some(WizardStep::Checklist),
        WizardStep::Plan => Some(WizardStep::Info),
        WizardStep::Metrics => Some(WizardStep::Plan),
        WizardStep::Submitted => Some(WizardStep::Submitted),
    }
}

// =============================================================================
// GATE
// =============================================================================

/// What the gate knows about the form. Built from the full form state by
/// `IntakeForm::snapshot`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct FormSnapshot {
    pub step_one_valid: bool,
    pub checklist_answered: usize,
    pub stakeholder_count: usize,
    pub first_phase_complete: bool,
    pub metric_count: usize,
    pub metrics_valid: bool,
    pub primary_contact_resolved: bool,
    pub business_unit_resolved: bool,
}

/// Why a transition was blocked. The messages are shown to the user as-is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum GateBlock {
    #[error("Please complete all required fields.")]
    StepOneIncomplete,

    #[error("Please add at least one stakeholder.")]
    NoStakeholders,

    #[error("Please add both start and end date for the first phase.")]
    FirstPhaseDates,

    #[error("Please complete at least one metric before submitting.")]
    NoMetrics,

    #[error("Fill all metric fields and ensure target dates are after baseline and today.")]
    IncompleteMetrics,

    #[error("Every reported value needs both a value and a reported date.")]
    IncompleteReports,

    #[error("Primary contact is required.")]
    MissingPrimaryContact,

    #[error("Select a valid business unit.")]
    InvalidBusinessUnit,

    #[error("A submission is already in progress.")]
    SubmissionInFlight,

    #[error("This use case has already been submitted.")]
    AlreadySubmitted,
}

/// Check the transition out of `step`.
pub fn check(step: WizardStep, snapshot: &FormSnapshot) -> Result<(), GateBlock> {
    match step {
        WizardStep::Info => {
            if !snapshot.step_one_valid {
                return Err(GateBlock::StepOneIncomplete);
            }
        }
        WizardStep::Checklist => {}
        WizardStep::Plan => {
            if snapshot.stakeholder_count == 0 {
                return Err(GateBlock::NoStakeholders);
            }
            if !snapshot.first_phase_complete {
                return Err(GateBlock::FirstPhaseDates);
            }
        }
        WizardStep::Metrics => {
            if !snapshot.step_one_valid {
                return Err(GateBlock::StepOneIncomplete);
            }
            if snapshot.metric_count == 0 {
                return Err(GateBlock::NoMetrics);
            }
            if !snapshot.metrics_valid {
                return Err(GateBlock::IncompleteMetrics);
            }
            if !snapshot.first_phase_complete {
                return Err(GateBlock::FirstPhaseDates);
            }
            if !snapshot.primary_contact_resolved {
                return Err(GateBlock::MissingPrimaryContact);
            }
            if !snapshot.business_unit_resolved {
                return Err(GateBlock::InvalidBusinessUnit);
            }
        }
        WizardStep::Submitted => return Err(GateBlock::AlreadySubmitted),
    }
    Ok(())
}

#[must_use]
pub fn can_advance(step: WizardStep, snapshot: &FormSnapshot) -> bool {
    check(step, snapshot).is_ok()
}

// =============================================================================
// WIZARD
// =============================================================================

/// Result of going back.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", tag = "outcome", content = "step")]
pub enum BackOutcome {
    Step(WizardStep),
    /// Back from the first step leaves the form.
    Cancel,
}

/// Wizard position and submit state of one form.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Wizard {
    step: WizardStep,
    checklist_enabled: bool,
    checklist_needs_attention: bool,
    is_submitting: bool,
    last_error: Option<String>,
}

impl Wizard {
    #[must_use]
    pub fn new(checklist_enabled: bool) -> Self {
        Self::starting_at(WizardStep::Info, checklist_enabled)
    }

    /// Open the wizard on a given step. A checklist start with the checklist
    /// disabled moves to the plan step.
    #[must_use]
    pub fn starting_at(step: WizardStep, checklist_enabled: bool) -> Self {
        let step = if step == WizardStep::Checklist && !checklist_enabled {
            WizardStep::Plan
        } else {
            step
        };
        Self {
            step,
            checklist_enabled,
            checklist_needs_attention: false,
            is_submitting: false,
            last_error: None,
        }
    }

    #[must_use]
    pub fn step(&self) -> WizardStep {
        self.step
    }

    #[must_use]
    pub fn checklist_needs_attention(&self) -> bool {
        self.checklist_needs_attention
    }

    #[must_use]
    pub fn is_submitting(&self) -> bool {
        self.is_submitting
    }

    #[must_use]
    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    /// Move forward from the current step.
    ///
    /// On the metrics step a passing gate starts the submission: the wizard
    /// stays on `Metrics` with `is_submitting` set until the caller reports
    /// the outcome through `complete_submission` or `fail_submission`.
    pub fn next(&mut self, snapshot: &FormSnapshot) -> Result<WizardStep, GateBlock> {
        if self.is_submitting {
            return Err(GateBlock::SubmissionInFlight);
        }
        check(self.step, snapshot)?;
        match self.step {
            WizardStep::Checklist => {
                self.checklist_needs_attention = snapshot.checklist_answered == 0;
                self.step = advance(self.step, self.checklist_enabled);
            }
            WizardStep::Metrics => {
                self.is_submitting = true;
                self.last_error = None;
            }
            _ => self.step = advance(self.step, self.checklist_enabled),
        }
        Ok(self.step)
    }

    /// Go back one step. Ignored while a submission is in flight.
    pub fn back(&mut self) -> BackOutcome {
        if self.is_submitting {
            return BackOutcome::Step(self.step);
        }
        match retreat(self.step, self.checklist_enabled) {
            Some(step) => {
                self.step = step;
                BackOutcome::Step(step)
            }
            None => BackOutcome::Cancel,
        }
    }

    /// The create call succeeded.
    pub fn complete_submission(&mut self) {
        self.is_submitting = false;
        self.step = WizardStep::Submitted;
    }

    /// The create call failed: stay on the metrics step, re-enable submit.
    pub fn fail_submission(&mut self, message: impl Into<String>) {
        self.is_submitting = false;
        self.last_error = Some(message.into());
    }
}
