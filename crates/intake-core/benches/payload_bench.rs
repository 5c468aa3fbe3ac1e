//! # Payload Benchmarks
//!
//! Gate evaluation and payload assembly for growing forms.
//!
//! Run with: `cargo bench -p intake-core`

use chrono::{Duration, NaiveDate};
use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use intake_core::{
    FormContext, IntakeForm, Metric, PhaseEntry, ReferenceData, Stakeholder, UnresolvedPolicy,
};
use std::hint::black_box;

fn reference() -> ReferenceData {
    serde_json::from_str(
        r#"{
            "businessUnits": [{"id": 11, "businessUnitName": "Finance", "teamName": "Payroll"}],
            "roles": [{"id": 1, "name": "Owner"}, {"id": 2, "name": "Sponsor"}],
            "phases": [
                {"id": 1, "name": "Idea"}, {"id": 2, "name": "Diagnose"},
                {"id": 3, "name": "Design"}, {"id": 4, "name": "Implemented"}
            ],
            "metricCategories": [{"id": 5, "category": "Cost"}],
            "unitOfMeasure": [{"id": 7, "name": "USD"}],
            "status": [{"id": 9, "name": "Draft"}]
        }"#,
    )
    .expect("reference fixture")
}

/// A complete form with `size` stakeholders and `size` metrics.
fn create_form(size: usize) -> IntakeForm {
    let start = NaiveDate::from_ymd_opt(2024, 1, 1).expect("date");
    let mut form = IntakeForm::default();
    form.draft.title = "Bench".to_string();
    form.draft.headline = "Bench".to_string();
    form.draft.opportunity = "Bench".to_string();
    form.draft.business_value = "Bench".to_string();
    form.draft.business_unit = "Finance".to_string();
    form.draft.team = "Payroll".to_string();
    form.draft.ese_resource = Some(true);

    form.stakeholders = (0..size)
        .map(|i| Stakeholder {
            name: format!("Person {i}"),
            email: format!("person{}@contoso.com", i % 50),
            role: if i == 0 { "Owner" } else { "Sponsor" }.to_string(),
        })
        .collect();

    form.phases = ["Idea", "Diagnose", "Design", "Implemented"]
        .iter()
        .enumerate()
        .map(|(i, phase)| PhaseEntry {
            phase: (*phase).to_string(),
            start_date: Some(start + Duration::days(30 * i as i64)),
            end_date: Some(start + Duration::days(30 * i as i64 + 30)),
        })
        .collect();

    form.metrics = (0..size)
        .map(|i| Metric {
            primary_success_value: format!("Metric {i}"),
            parcs_category: "Cost".to_string(),
            unit_of_measurement: "USD".to_string(),
            baseline_value: "10".to_string(),
            baseline_date: "2024-01-01".to_string(),
            target_value: "20".to_string(),
            target_date: "2030-01-01".to_string(),
            ..Metric::default()
        })
        .collect();

    form
}

// =============================================================================
// BENCHMARKS
// =============================================================================

fn bench_snapshot(c: &mut Criterion) {
    let context = FormContext::from_reference(&reference());
    let today = NaiveDate::from_ymd_opt(2024, 3, 1).expect("date");
    let mut group = c.benchmark_group("form_snapshot");

    for size in [10, 100].iter() {
        let form = create_form(*size);
        group.bench_with_input(BenchmarkId::from_parameter(size), size, |b, _| {
            b.iter(|| black_box(form.snapshot(&context, today)));
        });
    }

    group.finish();
}

fn bench_assemble(c: &mut Criterion) {
    let context = FormContext::from_reference(&reference());
    let mut group = c.benchmark_group("payload_assembly");

    for size in [10, 100].iter() {
        let form = create_form(*size);
        group.bench_with_input(BenchmarkId::from_parameter(size), size, |b, _| {
            b.iter(|| {
                black_box(form.assemble(
                    &context,
                    Some("editor@contoso.com"),
                    UnresolvedPolicy::Reject,
                ))
            });
        });
    }

    group.finish();
}

criterion_group!(benches, bench_snapshot, bench_assemble);
criterion_main!(benches);
