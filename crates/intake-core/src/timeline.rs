//! # Phase Timeline
//!
//! Start and end dates for each phase of a use case, in phase order.
//!
//! ## Ordering rules
//!
//! For an edited phase with a proposed (start, end):
//! 1. end must be strictly after start
//! 2. start must not fall before the recorded end of the phase right
//!    before it in the ordering
//!
//! An accepted edit clears the phase's AI-generated flag and any pending
//! suggestion for it. A rejected edit leaves the timeline unchanged.

use crate::dates::to_display;
use crate::payload::PlanItem;
use crate::primitives::FALLBACK_PHASES;
use crate::reference::{LookupMaps, PhaseItem};
use crate::suggestion::PhaseSuggestion;
use crate::types::PhaseId;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use thiserror::Error;

// =============================================================================
// ERRORS
// =============================================================================

/// Rejected timeline edits.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TimelineError {
    #[error("End date must be after start date.")]
    EndNotAfterStart,

    /// `previous_end` is already formatted for display (`dd-MM-yyyy`).
    #[error("{phase} cannot start before {previous} ends ({previous_end}).")]
    StartsBeforePrevious {
        phase: String,
        previous: String,
        previous_end: String,
    },

    #[error("Unknown phase: {0}")]
    UnknownPhase(String),
}

// =============================================================================
// PHASE ORDERING
// =============================================================================

/// One phase in ordinal order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderedPhase {
    pub name: String,
    pub id: Option<PhaseId>,
}

/// The ordinal order of the timeline phases.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PhaseOrdering {
    phases: Vec<OrderedPhase>,
}

impl Default for PhaseOrdering {
    fn default() -> Self {
        Self::fallback()
    }
}

impl PhaseOrdering {
    /// Idea → Diagnose → Design → Implemented, without ids.
    #[must_use]
    pub fn fallback() -> Self {
        Self {
            phases: FALLBACK_PHASES
                .iter()
                .map(|name| OrderedPhase {
                    name: (*name).to_string(),
                    id: None,
                })
                .collect(),
        }
    }

    /// Order server phases by numeric id, ties by case-insensitive name.
    ///
    /// Phases without an id sort after those with one. Blank and duplicate
    /// names are dropped. Falls back to the fixed list when nothing usable
    /// remains.
    #[must_use]
    pub fn from_server(items: &[PhaseItem]) -> Self {
        let mut phases: Vec<OrderedPhase> = Vec::new();
        let mut sorted: Vec<&PhaseItem> = items
            .iter()
            .filter(|item| !item.name.trim().is_empty())
            .collect();
        sorted.sort_by_key(|item| (item.id.is_none(), item.id, item.name.trim().to_lowercase()));

        for item in sorted {
            let name = item.name.trim();
            if phases.iter().any(|p| p.name.eq_ignore_ascii_case(name)) {
                continue;
            }
            phases.push(OrderedPhase {
                name: name.to_string(),
                id: item.id.map(PhaseId),
            });
        }

        if phases.is_empty() {
            Self::fallback()
        } else {
            Self { phases }
        }
    }

    #[must_use]
    pub fn phases(&self) -> &[OrderedPhase] {
        &self.phases
    }

    #[must_use]
    pub fn first(&self) -> Option<&OrderedPhase> {
        self.phases.first()
    }

    /// Position of a phase, matched case-insensitively.
    #[must_use]
    pub fn position(&self, name: &str) -> Option<usize> {
        let name = name.trim();
        self.phases
            .iter()
            .position(|p| p.name.eq_ignore_ascii_case(name))
    }

    /// Canonical name of a phase, matched case-insensitively.
    #[must_use]
    pub fn canonical(&self, name: &str) -> Option<&str> {
        self.position(name).map(|i| self.phases[i].name.as_str())
    }

    /// The phase immediately before `name`.
    #[must_use]
    pub fn previous(&self, name: &str) -> Option<&OrderedPhase> {
        let index = self.position(name)?;
        index.checked_sub(1).and_then(|i| self.phases.get(i))
    }
}

// =============================================================================
// TIMELINE
// =============================================================================

/// Recorded dates of one phase.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PhaseState {
    pub start: Option<NaiveDate>,
    pub end: Option<NaiveDate>,
    pub ai_generated: bool,
    /// Pending AI suggestion, not yet accepted.
    pub suggestion: Option<PhaseSuggestion>,
}

/// A phase whose dates differ from a snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PhaseChange {
    pub phase: String,
    pub start: Option<NaiveDate>,
    pub end: Option<NaiveDate>,
}

/// Phase dates of one form, keyed by canonical phase name.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Timeline {
    ordering: PhaseOrdering,
    states: BTreeMap<String, PhaseState>,
}

impl Timeline {
    #[must_use]
    pub fn new(ordering: PhaseOrdering) -> Self {
        let states = ordering
            .phases()
            .iter()
            .map(|p| (p.name.clone(), PhaseState::default()))
            .collect();
        Self { ordering, states }
    }

    #[must_use]
    pub fn ordering(&self) -> &PhaseOrdering {
        &self.ordering
    }

    #[must_use]
    pub fn state(&self, phase: &str) -> Option<&PhaseState> {
        self.ordering
            .canonical(phase)
            .and_then(|name| self.states.get(name))
    }

    /// Phase states in ordinal order.
    pub fn iter(&self) -> impl Iterator<Item = (&OrderedPhase, &PhaseState)> {
        self.ordering
            .phases()
            .iter()
            .filter_map(|p| self.states.get(&p.name).map(|s| (p, s)))
    }

    /// Check a proposed edit without applying it.
    pub fn validate(
        &self,
        phase: &str,
        start: Option<NaiveDate>,
        end: Option<NaiveDate>,
    ) -> Result<(), TimelineError> {
        let name = self
            .ordering
            .canonical(phase)
            .ok_or_else(|| TimelineError::UnknownPhase(phase.trim().to_string()))?;

        if let (Some(start), Some(end)) = (start, end) {
            if end <= start {
                return Err(TimelineError::EndNotAfterStart);
            }
        }

        if let (Some(start), Some(previous)) = (start, self.ordering.previous(name)) {
            let previous_end = self.states.get(&previous.name).and_then(|s| s.end);
            if let Some(previous_end) = previous_end {
                if start < previous_end {
                    return Err(TimelineError::StartsBeforePrevious {
                        phase: name.to_string(),
                        previous: previous.name.clone(),
                        previous_end: to_display(previous_end),
                    });
                }
            }
        }

        Ok(())
    }

    /// Validate and apply a user edit.
    pub fn apply_edit(
        &mut self,
        phase: &str,
        start: Option<NaiveDate>,
        end: Option<NaiveDate>,
    ) -> Result<(), TimelineError> {
        self.validate(phase, start, end)?;
        let name = self
            .ordering
            .canonical(phase)
            .ok_or_else(|| TimelineError::UnknownPhase(phase.trim().to_string()))?
            .to_string();
        let state = self.states.entry(name).or_default();
        state.start = start;
        state.end = end;
        state.ai_generated = false;
        state.suggestion = None;
        Ok(())
    }

    /// Attach pending suggestions. Unknown phases are skipped; returns the
    /// number staged.
    pub fn stage_suggestions(&mut self, suggestions: &[PhaseSuggestion]) -> usize {
        let mut staged = 0;
        for suggestion in suggestions {
            let Some(name) = self.ordering.canonical(&suggestion.phase) else {
                continue;
            };
            if let Some(state) = self.states.get_mut(name) {
                state.suggestion = Some(suggestion.clone());
                staged += 1;
            }
        }
        staged
    }

    /// Accept every pending suggestion: dates are copied and the phases are
    /// marked AI-generated. Returns the number accepted.
    pub fn accept_suggestions(&mut self) -> usize {
        let mut accepted = 0;
        for state in self.states.values_mut() {
            if let Some(suggestion) = state.suggestion.take() {
                state.start = Some(suggestion.start);
                state.end = Some(suggestion.end);
                state.ai_generated = true;
                accepted += 1;
            }
        }
        accepted
    }

    pub fn reject_suggestions(&mut self) {
        for state in self.states.values_mut() {
            state.suggestion = None;
        }
    }

    #[must_use]
    pub fn has_pending_suggestions(&self) -> bool {
        self.states.values().any(|s| s.suggestion.is_some())
    }

    /// Both dates are set on the first phase.
    #[must_use]
    pub fn first_phase_complete(&self) -> bool {
        self.ordering
            .first()
            .and_then(|p| self.states.get(&p.name))
            .is_some_and(|s| s.start.is_some() && s.end.is_some())
    }

    /// `plan[]` entries for phases with both dates and a resolvable id.
    ///
    /// Returns the entries and the names of dated phases whose id could not
    /// be resolved.
    #[must_use]
    pub fn plan_items(&self, lookups: &LookupMaps) -> (Vec<PlanItem>, Vec<String>) {
        self.collect_plan_items(lookups, |_| true)
    }

    /// `plan[]` entries limited to phases changed since `snapshot`.
    #[must_use]
    pub fn plan_items_changed_since(
        &self,
        snapshot: &Self,
        lookups: &LookupMaps,
    ) -> (Vec<PlanItem>, Vec<String>) {
        let changed: BTreeSet<String> = self
            .changes_since(snapshot)
            .into_iter()
            .map(|change| change.phase)
            .collect();
        self.collect_plan_items(lookups, |name| changed.contains(name))
    }

    fn collect_plan_items(
        &self,
        lookups: &LookupMaps,
        keep: impl Fn(&str) -> bool,
    ) -> (Vec<PlanItem>, Vec<String>) {
        let mut items = Vec::new();
        let mut unresolved = Vec::new();
        for (phase, state) in self.iter().filter(|(phase, _)| keep(&phase.name)) {
            let (Some(start), Some(end)) = (state.start, state.end) else {
                continue;
            };
            match phase.id.or_else(|| lookups.phase_id(&phase.name)) {
                Some(id) => items.push(PlanItem::new(id, start, end)),
                None => unresolved.push(phase.name.clone()),
            }
        }
        (items, unresolved)
    }

    /// Phases whose start or end differ from `snapshot`, in phase order.
    #[must_use]
    pub fn changes_since(&self, snapshot: &Self) -> Vec<PhaseChange> {
        self.iter()
            .filter_map(|(phase, state)| {
                let before = snapshot.states.get(&phase.name);
                let changed = before.is_none_or(|b| b.start != state.start || b.end != state.end);
                changed.then(|| PhaseChange {
                    phase: phase.name.clone(),
                    start: state.start,
                    end: state.end,
                })
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).expect("valid date")
    }

    fn phase(id: Option<u64>, name: &str) -> PhaseItem {
        PhaseItem {
            id,
            name: name.to_string(),
            stage: String::new(),
        }
    }

    fn server_timeline() -> Timeline {
        Timeline::new(PhaseOrdering::from_server(&[
            phase(Some(3), "Design"),
            phase(Some(1), "Idea"),
            phase(Some(4), "Implemented"),
            phase(Some(2), "Diagnose"),
        ]))
    }

    #[test]
    fn fallback_ordering() {
        let ordering = PhaseOrdering::fallback();
        let names: Vec<&str> = ordering
            .phases()
            .iter()
            .map(|p| p.name.as_str())
            .collect();
        assert_eq!(names, vec!["Idea", "Diagnose", "Design", "Implemented"]);
    }

    #[test]
    fn server_ordering_sorts_by_id_then_name() {
        let ordering = PhaseOrdering::from_server(&[
            phase(Some(2), "beta"),
            phase(Some(2), "Alpha"),
            phase(None, "Later"),
            phase(Some(1), "First"),
            phase(Some(5), "first"),
        ]);
        let names: Vec<&str> = ordering.phases().iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, vec!["First", "Alpha", "beta", "Later"]);
    }

    #[test]
    fn empty_server_list_falls_back() {
        assert_eq!(
            PhaseOrdering::from_server(&[phase(Some(1), "  ")]),
            PhaseOrdering::fallback()
        );
    }

    #[test]
    fn end_must_follow_start() {
        let timeline = Timeline::new(PhaseOrdering::fallback());
        let d = date(2024, 1, 10);
        assert_eq!(
            timeline.validate("Idea", Some(d), Some(d)),
            Err(TimelineError::EndNotAfterStart)
        );
        assert_eq!(
            timeline.validate("Idea", Some(d), Some(date(2024, 1, 9))),
            Err(TimelineError::EndNotAfterStart)
        );
    }

    #[test]
    fn phase_cannot_start_before_previous_ends() {
        let mut timeline = server_timeline();
        timeline
            .apply_edit("Idea", Some(date(2024, 1, 1)), Some(date(2024, 2, 1)))
            .expect("idea");

        let err = timeline
            .apply_edit("Diagnose", Some(date(2024, 1, 31)), Some(date(2024, 3, 1)))
            .expect_err("overlap");
        assert_eq!(
            err,
            TimelineError::StartsBeforePrevious {
                phase: "Diagnose".to_string(),
                previous: "Idea".to_string(),
                previous_end: "01-02-2024".to_string(),
            }
        );
        assert_eq!(timeline.state("Diagnose"), Some(&PhaseState::default()));

        // Starting on the previous end date is allowed.
        timeline
            .apply_edit("diagnose", Some(date(2024, 2, 1)), Some(date(2024, 3, 1)))
            .expect("adjacent");
    }

    #[test]
    fn unknown_phase_is_rejected() {
        let timeline = Timeline::new(PhaseOrdering::fallback());
        assert_eq!(
            timeline.validate("Retire", None, None),
            Err(TimelineError::UnknownPhase("Retire".to_string()))
        );
    }

    #[test]
    fn accept_marks_ai_generated_and_edit_clears_it() {
        let mut timeline = Timeline::new(PhaseOrdering::fallback());
        let staged = timeline.stage_suggestions(&[
            PhaseSuggestion {
                phase: "idea".to_string(),
                start: date(2024, 1, 1),
                end: date(2024, 1, 31),
            },
            PhaseSuggestion {
                phase: "Operate".to_string(),
                start: date(2024, 1, 1),
                end: date(2024, 1, 31),
            },
        ]);
        assert_eq!(staged, 1);
        assert!(timeline.has_pending_suggestions());
        assert!(!timeline.first_phase_complete());

        assert_eq!(timeline.accept_suggestions(), 1);
        let idea = timeline.state("Idea").expect("idea");
        assert!(idea.ai_generated);
        assert!(timeline.first_phase_complete());

        timeline
            .apply_edit("Idea", Some(date(2024, 1, 2)), Some(date(2024, 1, 31)))
            .expect("edit");
        assert!(!timeline.state("Idea").expect("idea").ai_generated);
    }

    #[test]
    fn reject_drops_pending_suggestions() {
        let mut timeline = Timeline::new(PhaseOrdering::fallback());
        timeline.stage_suggestions(&[PhaseSuggestion {
            phase: "Design".to_string(),
            start: date(2024, 5, 1),
            end: date(2024, 6, 1),
        }]);
        timeline.reject_suggestions();
        assert!(!timeline.has_pending_suggestions());
        assert_eq!(timeline.state("Design").and_then(|s| s.start), None);
    }

    #[test]
    fn plan_items_use_server_ids() {
        let mut timeline = server_timeline();
        timeline
            .apply_edit("Idea", Some(date(2024, 1, 1)), Some(date(2024, 2, 1)))
            .expect("idea");
        timeline
            .apply_edit("Design", Some(date(2024, 3, 1)), None)
            .expect("design start only");

        let (items, unresolved) = timeline.plan_items(&LookupMaps::default());
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].usecasephaseid, PhaseId(1));
        assert_eq!(items[0].startdate, "2024-01-01");
        assert!(unresolved.is_empty());
    }

    #[test]
    fn plan_items_report_unresolved_fallback_phases() {
        let mut timeline = Timeline::new(PhaseOrdering::fallback());
        timeline
            .apply_edit("Idea", Some(date(2024, 1, 1)), Some(date(2024, 2, 1)))
            .expect("idea");
        let (items, unresolved) = timeline.plan_items(&LookupMaps::default());
        assert!(items.is_empty());
        assert_eq!(unresolved, vec!["Idea"]);
    }

    #[test]
    fn changes_since_lists_only_changed_phases() {
        let mut timeline = server_timeline();
        timeline
            .apply_edit("Idea", Some(date(2024, 1, 1)), Some(date(2024, 2, 1)))
            .expect("idea");
        let snapshot = timeline.clone();
        timeline
            .apply_edit("Design", Some(date(2024, 3, 1)), Some(date(2024, 4, 1)))
            .expect("design");

        let changes = timeline.changes_since(&snapshot);
        assert_eq!(changes.len(), 1);
        assert_eq!(changes[0].phase, "Design");
    }
}
