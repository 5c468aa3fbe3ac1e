//! # Property-Based Tests
//!
//! Invariants of stakeholder dedup, phase ordering and cache freshness.

use chrono::{Duration, NaiveDate};
use intake_core::cache::is_fresh;
use intake_core::reference::PhaseItem;
use intake_core::{
    FormContext, IntakeForm, PhaseEntry, PhaseOrdering, ReferenceData, Stakeholder, Timeline,
    TimelineError, UnresolvedPolicy,
};
use proptest::collection::vec;
use proptest::prelude::*;
use std::collections::BTreeSet;

const ROLES: [&str; 3] = ["Owner", "Sponsor", "Reviewer"];
const PEOPLE: [&str; 4] = ["ann", "bo", "cy", "di"];

fn reference() -> ReferenceData {
    serde_json::from_str(
        r#"{
            "businessUnits": [{"id": 11, "businessUnitName": "Finance", "teamName": "Payroll"}],
            "roles": [
                {"id": 1, "name": "Owner"},
                {"id": 2, "name": "Sponsor"},
                {"id": 3, "name": "Reviewer"}
            ],
            "phases": [{"id": 1, "name": "Idea"}, {"id": 2, "name": "Diagnose"}]
        }"#,
    )
    .expect("reference fixture")
}

fn base_date() -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 1, 1).expect("valid date")
}

// =============================================================================
// PROPERTY TESTS
// =============================================================================

proptest! {
    /// One payload entry per distinct (role, lowercase email).
    #[test]
    fn stakeholder_dedup_matches_distinct_pairs(
        picks in vec((0usize..PEOPLE.len(), 0usize..ROLES.len(), any::<bool>()), 1..20)
    ) {
        let context = FormContext::from_reference(&reference());
        let stakeholders: Vec<Stakeholder> = picks
            .iter()
            .map(|&(person, role, shout)| {
                let email = format!("{}@contoso.com", PEOPLE[person]);
                Stakeholder {
                    name: PEOPLE[person].to_string(),
                    email: if shout { email.to_uppercase() } else { email },
                    role: ROLES[role].to_string(),
                }
            })
            .collect();
        let expected: BTreeSet<(usize, usize)> =
            picks.iter().map(|&(person, role, _)| (role, person)).collect();

        let mut form = IntakeForm {
            stakeholders,
            ..IntakeForm::default()
        };
        form.draft.business_unit = "Finance".to_string();
        form.draft.team = "Payroll".to_string();
        form.draft.primary_contact = "ann@contoso.com".to_string();

        let assembled = form
            .assemble(&context, None, UnresolvedPolicy::Reject)
            .expect("assemble");
        let items = assembled.payload.stakeholders.unwrap_or_default();
        prop_assert_eq!(items.len(), expected.len());
    }

    /// Server phases come out ordered by id regardless of input order.
    #[test]
    fn phase_ordering_ignores_input_order(ids in vec(1u64..50, 1..10)) {
        let items: Vec<PhaseItem> = ids
            .iter()
            .map(|&id| PhaseItem {
                id: Some(id),
                name: format!("Phase {id}"),
                stage: String::new(),
            })
            .collect();
        let mut reversed = items.clone();
        reversed.reverse();

        let forward = PhaseOrdering::from_server(&items);
        prop_assert_eq!(&forward, &PhaseOrdering::from_server(&reversed));

        let ordered: Vec<u64> = forward
            .phases()
            .iter()
            .filter_map(|p| p.id.map(|id| id.value()))
            .collect();
        let mut sorted = ordered.clone();
        sorted.sort_unstable();
        sorted.dedup();
        prop_assert_eq!(ordered, sorted);
    }

    /// A later phase may start exactly when the previous one ends, never earlier.
    #[test]
    fn later_phase_start_compared_to_previous_end(
        idea_days in 1i64..60,
        offset in -30i64..30,
    ) {
        let start = base_date();
        let idea_end = start + Duration::days(idea_days);
        let mut timeline = Timeline::new(PhaseOrdering::fallback());
        timeline.apply_edit("Idea", Some(start), Some(idea_end)).expect("idea");

        let diagnose_start = idea_end + Duration::days(offset);
        let result = timeline.validate("Diagnose", Some(diagnose_start), None);
        if offset < 0 {
            let rejected = matches!(result, Err(TimelineError::StartsBeforePrevious { .. }));
            prop_assert!(rejected);
        } else {
            prop_assert!(result.is_ok());
        }
    }

    /// Replaying phase entries in any order gives the same verdict.
    #[test]
    fn phase_entry_order_does_not_matter(swap in any::<bool>(), gap in -5i64..5) {
        let idea_end = base_date() + Duration::days(10);
        let mut phases = vec![
            PhaseEntry {
                phase: "Idea".to_string(),
                start_date: Some(base_date()),
                end_date: Some(idea_end),
            },
            PhaseEntry {
                phase: "Diagnose".to_string(),
                start_date: Some(idea_end + Duration::days(gap)),
                end_date: Some(idea_end + Duration::days(30)),
            },
        ];
        if swap {
            phases.reverse();
        }
        let form = IntakeForm { phases, ..IntakeForm::default() };
        prop_assert_eq!(form.timeline(&PhaseOrdering::fallback()).is_ok(), gap >= 0);
    }

    /// Freshness flips exactly at the TTL boundary.
    #[test]
    fn freshness_boundary(stored_at in 0u64..1_000_000, age in 0u64..2_000, ttl in 1u64..1_000) {
        prop_assert_eq!(is_fresh(stored_at, stored_at + age, ttl), age < ttl);
    }
}
