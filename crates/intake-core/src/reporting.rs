//! # Metric Reporting Change Sets
//!
//! Diff between the metrics loaded for a persisted use case (the snapshot)
//! and the edited sheet, in the shape the metrics PATCH endpoint expects.
//!
//! Metric rows are matched by id. Reported values are matched against the
//! latest report of each metric, latest by reported date; when dates tie
//! the report listed last wins.
//!
//! Field comparisons are on trimmed values. Patch fields are only present
//! when the value changed; a changed-to-blank value is sent as `null`.

use crate::dates::{parse_flexible, to_wire};
use crate::metric::{Metric, metrics_form_valid, reporting_form_valid};
use crate::reference::LookupMaps;
use crate::types::{MetricCategoryId, MetricId, ReportId, UnitOfMeasureId};
use crate::wizard::GateBlock;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A persisted reported value row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MetricReport {
    pub id: ReportId,
    pub metric_id: MetricId,
    #[serde(default)]
    pub reported_value: String,
    #[serde(default)]
    pub reported_date: String,
}

/// A metric that did not exist in the snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewMetric {
    pub metric_type_id: Option<MetricCategoryId>,
    pub unit_of_measure_id: Option<UnitOfMeasureId>,
    pub primary_success_metric_name: String,
    pub baseline_value: Option<String>,
    pub baseline_date: Option<String>,
    pub target_value: Option<String>,
    pub target_date: Option<String>,
}

/// Changed fields of an existing metric. `None` = unchanged,
/// `Some(None)` = cleared.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MetricPatch {
    pub id: MetricId,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub primary_success_metric_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metric_type_id: Option<Option<MetricCategoryId>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub unit_of_measure_id: Option<Option<UnitOfMeasureId>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub baseline_value: Option<Option<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub baseline_date: Option<Option<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target_value: Option<Option<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target_date: Option<Option<String>>,
}

impl MetricPatch {
    fn has_changes(&self) -> bool {
        self.primary_success_metric_name.is_some()
            || self.metric_type_id.is_some()
            || self.unit_of_measure_id.is_some()
            || self.baseline_value.is_some()
            || self.baseline_date.is_some()
            || self.target_value.is_some()
            || self.target_date.is_some()
    }
}

/// A first reported value for a metric.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewReport {
    pub metric_id: MetricId,
    pub reported_value: Option<String>,
    pub reported_date: Option<String>,
}

/// Changed fields of the latest report of a metric.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportPatch {
    pub id: ReportId,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reported_value: Option<Option<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reported_date: Option<Option<String>>,
}

/// Everything the metrics PATCH carries besides `editorEmail`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MetricChangeSet {
    pub new_metrics: Vec<NewMetric>,
    pub update_metrics: Vec<MetricPatch>,
    pub delete_metric_ids: Vec<MetricId>,
    pub new_reported_metrics: Vec<NewReport>,
    pub update_reported_metrics: Vec<ReportPatch>,
    pub delete_reported_metric_ids: Vec<ReportId>,
}

fn blank_to_none(value: &str) -> Option<String> {
    let trimmed = value.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

/// Dates go out in wire format when they parse, as typed otherwise.
fn date_value(value: &str) -> Option<String> {
    blank_to_none(value).map(|raw| parse_flexible(&raw).map_or(raw, to_wire))
}

fn changed(current: &str, previous: &str) -> bool {
    current.trim() != previous.trim()
}

/// Id of the latest report per metric.
#[must_use]
pub fn latest_reports(history: &[MetricReport]) -> BTreeMap<MetricId, ReportId> {
    let mut latest: BTreeMap<MetricId, (Option<chrono::NaiveDate>, ReportId)> = BTreeMap::new();
    for report in history {
        let date = parse_flexible(&report.reported_date);
        match latest.get(&report.metric_id) {
            // An undated current entry is always replaced; an undated
            // candidate never replaces a dated one.
            Some((Some(current), _)) if date.is_none_or(|d| d < *current) => {}
            _ => {
                latest.insert(report.metric_id, (date, report.id));
            }
        }
    }
    latest.into_iter().map(|(m, (_, r))| (m, r)).collect()
}

impl MetricChangeSet {
    /// Compute the change set between `snapshot` and `current`.
    #[must_use]
    pub fn between(
        snapshot: &[Metric],
        current: &[Metric],
        history: &[MetricReport],
        lookups: &LookupMaps,
    ) -> Self {
        let snapshot_by_id: BTreeMap<MetricId, &Metric> = snapshot
            .iter()
            .filter_map(|m| m.id.map(|id| (id, m)))
            .collect();
        let current_ids: Vec<MetricId> = current.iter().filter_map(|m| m.id).collect();

        let delete_metric_ids = snapshot_by_id
            .keys()
            .filter(|id| !current_ids.contains(id))
            .copied()
            .collect();

        let mut new_metrics = Vec::new();
        let mut update_metrics = Vec::new();
        for metric in current {
            match metric.id.and_then(|id| snapshot_by_id.get(&id).map(|p| (id, *p))) {
                None => new_metrics.push(NewMetric {
                    metric_type_id: lookups.metric_category_id(&metric.parcs_category),
                    unit_of_measure_id: lookups.unit_id(&metric.unit_of_measurement),
                    primary_success_metric_name: metric.primary_success_value.trim().to_string(),
                    baseline_value: blank_to_none(&metric.baseline_value),
                    baseline_date: date_value(&metric.baseline_date),
                    target_value: blank_to_none(&metric.target_value),
                    target_date: date_value(&metric.target_date),
                }),
                Some((id, previous)) => {
                    let patch = Self::metric_patch(id, metric, previous, lookups);
                    if patch.has_changes() {
                        update_metrics.push(patch);
                    }
                }
            }
        }

        let latest = latest_reports(history);
        let snapshot_reported: BTreeMap<MetricId, &Metric> = snapshot_by_id
            .iter()
            .filter(|(_, m)| m.has_report())
            .map(|(id, m)| (*id, *m))
            .collect();
        let current_reported: BTreeMap<MetricId, &Metric> = current
            .iter()
            .filter(|m| m.has_report())
            .filter_map(|m| m.id.map(|id| (id, m)))
            .collect();

        let delete_reported_metric_ids = snapshot_reported
            .keys()
            .filter(|id| !current_reported.contains_key(id))
            .filter_map(|id| latest.get(id).copied())
            .collect();

        let mut new_reported_metrics = Vec::new();
        let mut update_reported_metrics = Vec::new();
        for (id, metric) in &current_reported {
            match latest.get(id) {
                None => new_reported_metrics.push(NewReport {
                    metric_id: *id,
                    reported_value: blank_to_none(&metric.reported_value),
                    reported_date: date_value(&metric.reported_date),
                }),
                Some(report_id) => {
                    let Some(previous) = snapshot_reported.get(id) else {
                        continue;
                    };
                    let patch = ReportPatch {
                        id: *report_id,
                        reported_value: changed(&metric.reported_value, &previous.reported_value)
                            .then(|| blank_to_none(&metric.reported_value)),
                        reported_date: changed(&metric.reported_date, &previous.reported_date)
                            .then(|| date_value(&metric.reported_date)),
                    };
                    if patch.reported_value.is_some() || patch.reported_date.is_some() {
                        update_reported_metrics.push(patch);
                    }
                }
            }
        }

        Self {
            new_metrics,
            update_metrics,
            delete_metric_ids,
            new_reported_metrics,
            update_reported_metrics,
            delete_reported_metric_ids,
        }
    }

    fn metric_patch(
        id: MetricId,
        metric: &Metric,
        previous: &Metric,
        lookups: &LookupMaps,
    ) -> MetricPatch {
        MetricPatch {
            id,
            primary_success_metric_name: changed(
                &metric.primary_success_value,
                &previous.primary_success_value,
            )
            .then(|| metric.primary_success_value.trim().to_string()),
            metric_type_id: changed(&metric.parcs_category, &previous.parcs_category)
                .then(|| lookups.metric_category_id(&metric.parcs_category)),
            unit_of_measure_id: changed(&metric.unit_of_measurement, &previous.unit_of_measurement)
                .then(|| lookups.unit_id(&metric.unit_of_measurement)),
            baseline_value: changed(&metric.baseline_value, &previous.baseline_value)
                .then(|| blank_to_none(&metric.baseline_value)),
            baseline_date: changed(&metric.baseline_date, &previous.baseline_date)
                .then(|| date_value(&metric.baseline_date)),
            target_value: changed(&metric.target_value, &previous.target_value)
                .then(|| blank_to_none(&metric.target_value)),
            target_date: changed(&metric.target_date, &previous.target_date)
                .then(|| date_value(&metric.target_date)),
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.new_metrics.is_empty()
            && self.update_metrics.is_empty()
            && self.delete_metric_ids.is_empty()
            && self.new_reported_metrics.is_empty()
            && self.update_reported_metrics.is_empty()
            && self.delete_reported_metric_ids.is_empty()
    }
}

/// Whether an edited reporting sheet may be saved.
///
/// Every metric must be complete; once any row carries a report, every
/// started report needs both value and date.
pub fn check_reportable(metrics: &[Metric], today: NaiveDate) -> Result<(), GateBlock> {
    if metrics.is_empty() {
        return Err(GateBlock::NoMetrics);
    }
    if !metrics_form_valid(metrics, today) {
        return Err(GateBlock::IncompleteMetrics);
    }
    if metrics.iter().any(Metric::has_report) && !reporting_form_valid(metrics) {
        return Err(GateBlock::IncompleteReports);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reference::{MetricCategoryItem, ReferenceData, UnitOfMeasureItem};

    fn lookups() -> LookupMaps {
        ReferenceData {
            metric_categories: vec![MetricCategoryItem {
                id: Some(3),
                category: "Cost".to_string(),
                description: String::new(),
                default_unit_of_measure_id: None,
            }],
            unit_of_measure: vec![UnitOfMeasureItem {
                id: Some(9),
                name: "USD".to_string(),
                measure_type: String::new(),
            }],
            ..ReferenceData::default()
        }
        .lookups()
    }

    fn persisted(id: u64) -> Metric {
        Metric {
            id: Some(MetricId(id)),
            primary_success_value: "Reduce spend".to_string(),
            parcs_category: "Cost".to_string(),
            unit_of_measurement: "USD".to_string(),
            baseline_value: "10".to_string(),
            baseline_date: "2024-01-01".to_string(),
            target_value: "20".to_string(),
            target_date: "2024-06-01".to_string(),
            is_submitted: true,
            ..Metric::default()
        }
    }

    fn report(id: u64, metric: u64, value: &str, date: &str) -> MetricReport {
        MetricReport {
            id: ReportId(id),
            metric_id: MetricId(metric),
            reported_value: value.to_string(),
            reported_date: date.to_string(),
        }
    }

    #[test]
    fn dateless_report_cannot_be_saved() {
        let today = NaiveDate::from_ymd_opt(2024, 3, 1).expect("date");
        let mut metric = persisted(1);
        assert_eq!(check_reportable(&[metric.clone()], today), Ok(()));

        metric.reported_value = "12".to_string();
        assert_eq!(
            check_reportable(&[metric.clone()], today),
            Err(GateBlock::IncompleteReports)
        );

        metric.reported_date = "2024-02-20".to_string();
        assert_eq!(check_reportable(&[metric.clone()], today), Ok(()));

        metric.target_date = "2024-02-01".to_string();
        assert_eq!(
            check_reportable(&[metric], today),
            Err(GateBlock::IncompleteMetrics)
        );
        assert_eq!(check_reportable(&[], today), Err(GateBlock::NoMetrics));
    }

    #[test]
    fn unchanged_sheet_is_empty() {
        let snapshot = vec![persisted(1)];
        let set = MetricChangeSet::between(&snapshot, &snapshot, &[], &lookups());
        assert!(set.is_empty());
    }

    #[test]
    fn whitespace_only_edits_are_ignored() {
        let snapshot = vec![persisted(1)];
        let mut current = snapshot.clone();
        current[0].target_value = " 20 ".to_string();
        assert!(MetricChangeSet::between(&snapshot, &current, &[], &lookups()).is_empty());
    }

    #[test]
    fn new_updated_and_deleted_metrics() {
        let snapshot = vec![persisted(1), persisted(2)];
        let mut edited = persisted(1);
        edited.target_value = "25".to_string();
        edited.unit_of_measurement = "EUR".to_string();
        let mut fresh = persisted(0);
        fresh.id = Some(MetricId(100));
        fresh.baseline_date = "05-01-2024".to_string();

        let set = MetricChangeSet::between(&snapshot, &[edited, fresh], &[], &lookups());

        assert_eq!(set.delete_metric_ids, vec![MetricId(2)]);
        assert_eq!(set.new_metrics.len(), 1);
        assert_eq!(set.new_metrics[0].metric_type_id, Some(MetricCategoryId(3)));
        assert_eq!(set.new_metrics[0].baseline_date.as_deref(), Some("2024-01-05"));

        let patch = &set.update_metrics[0];
        assert_eq!(patch.id, MetricId(1));
        assert_eq!(patch.target_value, Some(Some("25".to_string())));
        // Unknown unit resolves to an explicit null.
        assert_eq!(patch.unit_of_measure_id, Some(None));
        assert_eq!(patch.baseline_value, None);
    }

    #[test]
    fn patch_serializes_only_changed_fields() {
        let patch = MetricPatch {
            id: MetricId(4),
            target_value: Some(None),
            ..MetricPatch::default()
        };
        let json = serde_json::to_string(&patch).expect("serialize");
        assert_eq!(json, r#"{"id":4,"targetValue":null}"#);
    }

    #[test]
    fn latest_report_is_picked_by_date() {
        let history = vec![
            report(10, 1, "5", "2024-03-01"),
            report(11, 1, "6", "2024-02-01"),
            report(12, 2, "1", ""),
            report(13, 2, "2", "2024-01-01"),
        ];
        let latest = latest_reports(&history);
        assert_eq!(latest.get(&MetricId(1)), Some(&ReportId(10)));
        assert_eq!(latest.get(&MetricId(2)), Some(&ReportId(13)));
    }

    #[test]
    fn reported_values_are_diffed_against_latest_report() {
        let mut reported_one = persisted(1);
        reported_one.reported_value = "12".to_string();
        reported_one.reported_date = "2024-04-01".to_string();
        let mut reported_two = persisted(2);
        reported_two.reported_value = "7".to_string();
        reported_two.reported_date = "2024-04-01".to_string();
        let snapshot = vec![reported_one.clone(), reported_two, persisted(3)];
        let history = vec![report(20, 1, "12", "2024-04-01"), report(21, 2, "7", "2024-04-01")];

        let mut edited_one = reported_one;
        edited_one.reported_value = "14".to_string();
        let cleared_two = persisted(2);
        let mut first_three = persisted(3);
        first_three.reported_value = "1".to_string();
        first_three.reported_date = "01-05-2024".to_string();

        let set = MetricChangeSet::between(
            &snapshot,
            &[edited_one, cleared_two, first_three],
            &history,
            &lookups(),
        );

        assert_eq!(set.update_reported_metrics.len(), 1);
        assert_eq!(set.update_reported_metrics[0].id, ReportId(20));
        assert_eq!(
            set.update_reported_metrics[0].reported_value,
            Some(Some("14".to_string()))
        );
        assert_eq!(set.update_reported_metrics[0].reported_date, None);
        assert_eq!(set.delete_reported_metric_ids, vec![ReportId(21)]);
        assert_eq!(
            set.new_reported_metrics,
            vec![NewReport {
                metric_id: MetricId(3),
                reported_value: Some("1".to_string()),
                reported_date: Some("2024-05-01".to_string()),
            }]
        );
        assert!(set.update_metrics.is_empty());
    }
}
