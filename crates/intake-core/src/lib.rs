//! # intake-core
//!
//! Domain logic for submitting AI use cases: the rules behind the
//! multi-step submit form, and the request bodies the backend accepts.
//!
//! ## Pieces
//!
//! - `wizard`: which step the form is on and what blocks leaving it
//! - `timeline`: phase date ordering and AI-suggested dates
//! - `metric`: success metric validation and submitted-field locks
//! - `payload`: assembly of the create request from form state
//! - `reporting`: metric and reported-value diffs for the edit pages
//! - `cache` / `storage`: TTL cache for reference data (memory or redb)
//!
//! ## Architectural Constraints
//!
//! - NO async, NO network dependencies (pure Rust)
//! - Validation never reads a clock: "today" and "now" are arguments
//! - BTreeMap everywhere so output order is stable

// =============================================================================
// MODULES
// =============================================================================

pub mod cache;
pub mod checklist;
pub mod dates;
pub mod directory;
pub mod draft;
pub mod form;
pub mod generation;
pub mod metric;
pub mod payload;
pub mod primitives;
pub mod reference;
pub mod reporting;
pub mod stakeholder;
pub mod storage;
pub mod suggestion;
pub mod timeline;
pub mod types;
pub mod wizard;

// =============================================================================
// RE-EXPORTS: Core Types (from types module)
// =============================================================================

pub use types::{
    BusinessUnitId, IntakeError, MetricCategoryId, MetricId, PhaseId, QuestionId, ReportId,
    RoleId, StatusId, UnitOfMeasureId, UseCaseId,
};

// =============================================================================
// RE-EXPORTS: Form State
// =============================================================================

pub use checklist::{ChecklistAnswers, ChecklistQuestion, ChecklistResponse, QuestionKind};
pub use draft::UseCaseDraft;
pub use form::{FormContext, IntakeForm, PhaseEntry};
pub use metric::{Metric, MetricEditError, MetricField, MetricIssue, MetricSheet};
pub use reference::{BusinessStructure, LookupMaps, ReferenceData};
pub use stakeholder::{RosterError, Stakeholder, StakeholderRoster};
pub use timeline::{PhaseOrdering, Timeline, TimelineError};
pub use wizard::{BackOutcome, FormSnapshot, GateBlock, Wizard, WizardStep};

// =============================================================================
// RE-EXPORTS: Outbound Requests
// =============================================================================

pub use directory::{DirectoryQuery, DirectoryResponse, DirectoryUser, Person};
pub use payload::{
    AssembledSubmission, AssemblyError, AssemblyInput, EditChanges, SubmissionPayload,
    UnresolvedPolicy, UnresolvedRecord, assemble, edit_changes,
};
pub use reporting::{MetricChangeSet, MetricReport, check_reportable};
pub use suggestion::{
    MetricSuggestionResponse, PhaseSuggestion, TimelineSuggestionResponse, UseCaseSuggestion,
};

// =============================================================================
// RE-EXPORTS: Caching and Concurrency
// =============================================================================

pub use cache::{CacheError, CacheLookup, CacheStore, MemoryStore, TtlCache};
pub use generation::{InFlight, RequestGeneration, Ticket};
pub use storage::RedbCacheStore;
