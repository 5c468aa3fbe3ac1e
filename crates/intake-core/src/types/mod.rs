//! # Core Type Definitions
//!
//! This module contains the identifier and error types shared by every
//! part of the intake workflow:
//! - Lookup identifiers (`RoleId`, `PhaseId`, `BusinessUnitId`, ...)
//! - Record identifiers (`MetricId`, `ReportId`, `UseCaseId`)
//! - The umbrella error type (`IntakeError`)
//!
//! All identifiers are numeric ids handed out by the backend's mapping
//! tables. They serialize transparently as plain JSON numbers.

use crate::cache::CacheError;
use crate::metric::MetricEditError;
use crate::payload::AssemblyError;
use crate::stakeholder::RosterError;
use crate::timeline::TimelineError;
use serde::{Deserialize, Serialize};
use thiserror::Error;

// =============================================================================
// LOOKUP IDENTIFIERS
// =============================================================================

macro_rules! lookup_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(
            Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize,
            Deserialize,
        )]
        #[serde(transparent)]
        pub struct $name(pub u64);

        impl $name {
            /// Get the raw id value.
            #[must_use]
            pub const fn value(self) -> u64 {
                self.0
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

lookup_id!(
    /// Row id of a (business unit, team) pair in the business-unit mapping.
    BusinessUnitId
);
lookup_id!(
    /// Id of a stakeholder role.
    RoleId
);
lookup_id!(
    /// Id of a use-case phase (Idea, Diagnose, ...).
    PhaseId
);
lookup_id!(
    /// Id of a use-case status (Draft, In Review, ...).
    StatusId
);
lookup_id!(
    /// Id of a PARCS metric category.
    MetricCategoryId
);
lookup_id!(
    /// Id of a unit of measure.
    UnitOfMeasureId
);
lookup_id!(
    /// Id of a checklist (AI product) question.
    QuestionId
);

// =============================================================================
// RECORD IDENTIFIERS
// =============================================================================

lookup_id!(
    /// Identifier of a metric row. Draft metrics get locally allocated ids;
    /// persisted metrics carry the backend id.
    MetricId
);
lookup_id!(
    /// Identifier of a reported value row attached to a metric.
    ReportId
);
lookup_id!(
    /// Identifier of a persisted use case.
    UseCaseId
);

// =============================================================================
// ERROR TYPES
// =============================================================================

/// Errors that can occur in the intake workflow.
///
/// - No silent failures
/// - Use `Result<T, IntakeError>` for fallible operations that cross modules
/// - The core never panics; every error leaves the form unchanged
#[derive(Debug, Error)]
pub enum IntakeError {
    /// A date string could not be parsed in any accepted format.
    #[error("Invalid date: {0}")]
    InvalidDate(String),

    /// A phase edit violated the timeline ordering rules.
    #[error(transparent)]
    Timeline(#[from] TimelineError),

    /// A metric edit was rejected.
    #[error(transparent)]
    MetricEdit(#[from] MetricEditError),

    /// A stakeholder roster operation was rejected.
    #[error(transparent)]
    Roster(#[from] RosterError),

    /// The submission payload could not be assembled.
    #[error(transparent)]
    Assembly(#[from] AssemblyError),

    /// The reference cache failed.
    #[error(transparent)]
    Cache(#[from] CacheError),

    /// A serialization or deserialization error occurred.
    #[error("Serialization error: {0}")]
    SerializationError(String),
}

// =============================================================================
// TESTS
// =============================================================================
