//! # Success Metrics
//!
//! Metric records, the completeness check used by the submit gate, and the
//! metric sheet that owns a form's metrics.
//!
//! ## Completeness
//!
//! A metric is complete when:
//! - the seven fields (name, category, unit, baseline value and date,
//!   target value and date) are non-blank
//! - both dates parse as calendar dates (`yyyy-MM-dd` or `dd-MM-yyyy`)
//! - the target date is strictly after the baseline date
//! - the target date is strictly after today
//!
//! Once submitted, a metric's baseline and target fields are read-only.
//! Reported value and date stay editable.

use crate::dates::{parse_flexible, to_wire};
use crate::primitives::MAX_METRICS;
use crate::types::MetricId;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use thiserror::Error;

// =============================================================================
// METRIC
// =============================================================================

/// One success metric row.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Metric {
    /// Backend id for persisted metrics, local id for drafts.
    pub id: Option<MetricId>,
    pub primary_success_value: String,
    pub parcs_category: String,
    pub unit_of_measurement: String,
    pub baseline_value: String,
    pub baseline_date: String,
    pub target_value: String,
    pub target_date: String,
    pub reported_value: String,
    pub reported_date: String,
    pub is_submitted: bool,
}

/// Why a metric is not complete. The first failing rule is reported.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MetricIssue {
    #[error("Missing {0}")]
    MissingField(&'static str),

    #[error("Baseline date is not a valid date")]
    InvalidBaselineDate,

    #[error("Target date is not a valid date")]
    InvalidTargetDate,

    #[error("Target date must be after baseline date")]
    TargetNotAfterBaseline,

    #[error("Target date must be after today")]
    TargetNotAfterToday,
}

impl Metric {
    fn required_fields(&self) -> [(&'static str, &str); 7] {
        [
            ("primarySuccessValue", &self.primary_success_value),
            ("parcsCategory", &self.parcs_category),
            ("unitOfMeasurement", &self.unit_of_measurement),
            ("baselineValue", &self.baseline_value),
            ("baselineDate", &self.baseline_date),
            ("targetValue", &self.target_value),
            ("targetDate", &self.target_date),
        ]
    }

    /// Check completeness against `today`.
    pub fn check(&self, today: NaiveDate) -> Result<(), MetricIssue> {
        if let Some((name, _)) = self
            .required_fields()
            .into_iter()
            .find(|(_, value)| value.trim().is_empty())
        {
            return Err(MetricIssue::MissingField(name));
        }
        let baseline = self.baseline().ok_or(MetricIssue::InvalidBaselineDate)?;
        let target = self.target().ok_or(MetricIssue::InvalidTargetDate)?;
        if target <= baseline {
            return Err(MetricIssue::TargetNotAfterBaseline);
        }
        if target <= today {
            return Err(MetricIssue::TargetNotAfterToday);
        }
        Ok(())
    }

    #[must_use]
    pub fn is_complete(&self, today: NaiveDate) -> bool {
        self.check(today).is_ok()
    }

    #[must_use]
    pub fn baseline(&self) -> Option<NaiveDate> {
        parse_flexible(&self.baseline_date)
    }

    #[must_use]
    pub fn target(&self) -> Option<NaiveDate> {
        parse_flexible(&self.target_date)
    }

    /// True when any reported field is filled.
    #[must_use]
    pub fn has_report(&self) -> bool {
        !self.reported_value.trim().is_empty() || !self.reported_date.trim().is_empty()
    }

    /// A reported row needs both a value and a parseable date.
    #[must_use]
    pub fn is_report_valid(&self) -> bool {
        !self.reported_value.trim().is_empty() && parse_flexible(&self.reported_date).is_some()
    }
}

/// The metrics step is valid when there is at least one metric and every
/// metric is complete.
#[must_use]
pub fn metrics_form_valid(metrics: &[Metric], today: NaiveDate) -> bool {
    !metrics.is_empty() && metrics.iter().all(|m| m.is_complete(today))
}

/// The reporting step is valid when at least one metric carries a report and
/// every started report has both value and date.
#[must_use]
pub fn reporting_form_valid(metrics: &[Metric]) -> bool {
    let mut reported = metrics.iter().filter(|m| m.has_report()).peekable();
    reported.peek().is_some() && reported.all(Metric::is_report_valid)
}

// =============================================================================
// METRIC SHEET
// =============================================================================

/// Editable fields of a metric row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum MetricField {
    PrimarySuccessValue,
    ParcsCategory,
    UnitOfMeasurement,
    BaselineValue,
    BaselineDate,
    TargetValue,
    TargetDate,
    ReportedValue,
    ReportedDate,
}

impl MetricField {
    /// Fields frozen once the metric is submitted.
    #[must_use]
    pub const fn locks_on_submit(self) -> bool {
        matches!(
            self,
            Self::BaselineValue | Self::BaselineDate | Self::TargetValue | Self::TargetDate
        )
    }

    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::PrimarySuccessValue => "primarySuccessValue",
            Self::ParcsCategory => "parcsCategory",
            Self::UnitOfMeasurement => "unitOfMeasurement",
            Self::BaselineValue => "baselineValue",
            Self::BaselineDate => "baselineDate",
            Self::TargetValue => "targetValue",
            Self::TargetDate => "targetDate",
            Self::ReportedValue => "reportedValue",
            Self::ReportedDate => "reportedDate",
        }
    }
}

/// Rejected metric sheet operations. The sheet is unchanged on error.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MetricEditError {
    #[error("Metric {0} not found")]
    NotFound(MetricId),

    #[error("Metric {id} is submitted; {field} is read-only")]
    Locked { id: MetricId, field: &'static str },

    #[error("A use case can have at most {0} metrics")]
    Full(usize),
}

/// The metrics of one form.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetricSheet {
    metrics: Vec<Metric>,
    next_local_id: u64,
}

impl MetricSheet {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adopt existing rows. Rows without an id get a local one.
    #[must_use]
    pub fn from_metrics(metrics: Vec<Metric>) -> Self {
        let next_local_id = metrics
            .iter()
            .filter_map(|m| m.id)
            .map(|id| id.value())
            .max()
            .unwrap_or(0);
        let mut sheet = Self {
            metrics: Vec::with_capacity(metrics.len()),
            next_local_id,
        };
        for mut metric in metrics {
            if metric.id.is_none() {
                metric.id = Some(sheet.allocate_id());
            }
            sheet.metrics.push(metric);
        }
        sheet
    }

    fn allocate_id(&mut self) -> MetricId {
        self.next_local_id += 1;
        MetricId(self.next_local_id)
    }

    fn find_mut(&mut self, id: MetricId) -> Result<&mut Metric, MetricEditError> {
        self.metrics
            .iter_mut()
            .find(|m| m.id == Some(id))
            .ok_or(MetricEditError::NotFound(id))
    }

    /// Append a metric with a fresh local id.
    pub fn add(&mut self, mut metric: Metric) -> Result<MetricId, MetricEditError> {
        if self.metrics.len() >= MAX_METRICS {
            return Err(MetricEditError::Full(MAX_METRICS));
        }
        let id = self.allocate_id();
        metric.id = Some(id);
        metric.is_submitted = false;
        self.metrics.push(metric);
        Ok(id)
    }

    pub fn remove(&mut self, id: MetricId) -> Result<Metric, MetricEditError> {
        let index = self
            .metrics
            .iter()
            .position(|m| m.id == Some(id))
            .ok_or(MetricEditError::NotFound(id))?;
        Ok(self.metrics.remove(index))
    }

    /// Set one field. Baseline and target fields of a submitted metric are
    /// rejected.
    pub fn edit(
        &mut self,
        id: MetricId,
        field: MetricField,
        value: &str,
    ) -> Result<(), MetricEditError> {
        let metric = self.find_mut(id)?;
        if metric.is_submitted && field.locks_on_submit() {
            return Err(MetricEditError::Locked {
                id,
                field: field.name(),
            });
        }
        let slot = match field {
            MetricField::PrimarySuccessValue => &mut metric.primary_success_value,
            MetricField::ParcsCategory => &mut metric.parcs_category,
            MetricField::UnitOfMeasurement => &mut metric.unit_of_measurement,
            MetricField::BaselineValue => &mut metric.baseline_value,
            MetricField::BaselineDate => &mut metric.baseline_date,
            MetricField::TargetValue => &mut metric.target_value,
            MetricField::TargetDate => &mut metric.target_date,
            MetricField::ReportedValue => &mut metric.reported_value,
            MetricField::ReportedDate => &mut metric.reported_date,
        };
        *slot = value.to_string();
        Ok(())
    }

    /// Set baseline and target dates from picked calendar dates.
    pub fn set_dates(
        &mut self,
        id: MetricId,
        baseline: Option<NaiveDate>,
        target: Option<NaiveDate>,
    ) -> Result<(), MetricEditError> {
        let metric = self.find_mut(id)?;
        if metric.is_submitted {
            return Err(MetricEditError::Locked {
                id,
                field: MetricField::BaselineDate.name(),
            });
        }
        metric.baseline_date = baseline.map(to_wire).unwrap_or_default();
        metric.target_date = target.map(to_wire).unwrap_or_default();
        Ok(())
    }

    /// Record a reported value. Allowed on submitted metrics.
    pub fn report(
        &mut self,
        id: MetricId,
        value: &str,
        date: NaiveDate,
    ) -> Result<(), MetricEditError> {
        let metric = self.find_mut(id)?;
        metric.reported_value = value.trim().to_string();
        metric.reported_date = to_wire(date);
        Ok(())
    }

    /// Mark every metric as submitted.
    pub fn lock_all(&mut self) {
        for metric in &mut self.metrics {
            metric.is_submitted = true;
        }
    }

    #[must_use]
    pub fn get(&self, id: MetricId) -> Option<&Metric> {
        self.metrics.iter().find(|m| m.id == Some(id))
    }

    #[must_use]
    pub fn metrics(&self) -> &[Metric] {
        &self.metrics
    }

    #[must_use]
    pub fn is_valid(&self, today: NaiveDate) -> bool {
        metrics_form_valid(&self.metrics, today)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.metrics.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.metrics.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).expect("valid date")
    }

    fn sample() -> Metric {
        Metric {
            primary_success_value: "Reduce spend".to_string(),
            parcs_category: "Cost".to_string(),
            unit_of_measurement: "USD".to_string(),
            baseline_value: "10".to_string(),
            baseline_date: "2024-01-01".to_string(),
            target_value: "20".to_string(),
            target_date: "2024-06-01".to_string(),
            ..Metric::default()
        }
    }

    #[test]
    fn complete_metric_passes() {
        assert_eq!(sample().check(date(2024, 3, 1)), Ok(()));
    }

    #[test]
    fn target_before_today_fails() {
        let mut metric = sample();
        metric.target_date = "2024-02-01".to_string();
        assert_eq!(
            metric.check(date(2024, 3, 1)),
            Err(MetricIssue::TargetNotAfterToday)
        );
    }

    #[test]
    fn target_equal_to_baseline_fails() {
        let mut metric = sample();
        metric.target_date = metric.baseline_date.clone();
        assert_eq!(
            metric.check(date(2023, 1, 1)),
            Err(MetricIssue::TargetNotAfterBaseline)
        );
    }

    #[test]
    fn target_equal_to_today_fails() {
        assert_eq!(
            sample().check(date(2024, 6, 1)),
            Err(MetricIssue::TargetNotAfterToday)
        );
    }

    #[test]
    fn display_format_dates_are_accepted() {
        let mut metric = sample();
        metric.baseline_date = "01-01-2024".to_string();
        metric.target_date = "01-06-2024".to_string();
        assert!(metric.is_complete(date(2024, 3, 1)));
    }

    #[test]
    fn blank_and_invalid_fields_are_reported() {
        let mut metric = sample();
        metric.unit_of_measurement = " ".to_string();
        assert_eq!(
            metric.check(date(2024, 3, 1)),
            Err(MetricIssue::MissingField("unitOfMeasurement"))
        );

        let mut metric = sample();
        metric.baseline_date = "2024-13-01".to_string();
        assert_eq!(
            metric.check(date(2024, 3, 1)),
            Err(MetricIssue::InvalidBaselineDate)
        );
    }

    #[test]
    fn form_needs_at_least_one_complete_metric() {
        let today = date(2024, 3, 1);
        assert!(!metrics_form_valid(&[], today));
        assert!(metrics_form_valid(&[sample()], today));
        assert!(!metrics_form_valid(&[sample(), Metric::default()], today));
    }

    #[test]
    fn submitted_metric_locks_baseline_and_target() {
        let mut sheet = MetricSheet::new();
        let id = sheet.add(sample()).expect("add");
        sheet.lock_all();

        assert_eq!(
            sheet.edit(id, MetricField::TargetValue, "30"),
            Err(MetricEditError::Locked {
                id,
                field: "targetValue"
            })
        );
        assert!(matches!(
            sheet.set_dates(id, None, None),
            Err(MetricEditError::Locked { .. })
        ));
        assert_eq!(sheet.get(id).map(|m| m.target_value.as_str()), Some("20"));

        sheet
            .report(id, " 15 ", date(2024, 4, 1))
            .expect("report allowed");
        let metric = sheet.get(id).expect("metric");
        assert_eq!(metric.reported_value, "15");
        assert_eq!(metric.reported_date, "2024-04-01");
        sheet
            .edit(id, MetricField::PrimarySuccessValue, "Reduce cost")
            .expect("name editable");
    }

    #[test]
    fn add_allocates_distinct_ids() {
        let mut sheet = MetricSheet::from_metrics(vec![Metric {
            id: Some(MetricId(41)),
            ..sample()
        }]);
        let a = sheet.add(sample()).expect("add");
        let b = sheet.add(sample()).expect("add");
        assert_eq!(a, MetricId(42));
        assert_eq!(b, MetricId(43));
        assert_eq!(sheet.len(), 3);
    }

    #[test]
    fn remove_unknown_metric() {
        let mut sheet = MetricSheet::new();
        assert_eq!(
            sheet.remove(MetricId(9)),
            Err(MetricEditError::NotFound(MetricId(9)))
        );
    }

    #[test]
    fn set_dates_writes_wire_format() {
        let mut sheet = MetricSheet::new();
        let id = sheet.add(Metric::default()).expect("add");
        sheet
            .set_dates(id, Some(date(2024, 1, 5)), Some(date(2024, 9, 5)))
            .expect("dates");
        let metric = sheet.get(id).expect("metric");
        assert_eq!(metric.baseline_date, "2024-01-05");
        assert_eq!(metric.target_date, "2024-09-05");
    }

    #[test]
    fn reporting_requires_value_and_date() {
        let mut reported = sample();
        reported.reported_value = "12".to_string();
        reported.reported_date = "2024-04-01".to_string();
        let untouched = sample();
        assert!(reporting_form_valid(&[reported.clone(), untouched.clone()]));

        let mut partial = sample();
        partial.reported_value = "12".to_string();
        assert!(!reporting_form_valid(&[reported, partial]));
        assert!(!reporting_form_valid(&[untouched]));
    }
}
