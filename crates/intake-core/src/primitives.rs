//! # Workflow Primitives
//!
//! Hardcoded constants for the intake workflow.
//!
//! These values mirror the behavior users already know from the intake
//! form (display formats, canonical role names, search thresholds) and are
//! compiled into the binary.

/// Phase names used when the backend provides no phase mapping.
///
/// The order is the ordinal order of the timeline.
pub const FALLBACK_PHASES: [&str; 4] = ["Idea", "Diagnose", "Design", "Implemented"];

/// Canonical name of the role that owns a use case.
///
/// Free-text "primary contact" entries normalize to this name.
pub const OWNER_ROLE: &str = "Owner";

/// Role label offered in the stakeholder dialog for the primary contact.
pub const PRIMARY_CONTACT_ROLE: &str = "Primary Contact";

/// Status a newly created use case starts in.
pub const DEFAULT_STATUS: &str = "Draft";

/// Separator used when a multi-select checklist answer is flattened.
pub const MULTI_ANSWER_SEPARATOR: &str = ", ";

// =============================================================================
// REFERENCE CACHE
// =============================================================================

/// Cache key for the consolidated reference data.
///
/// Bump the suffix when the cached shape changes.
pub const REFERENCE_CACHE_KEY: &str = "submit-use-case-data-v1";

/// Time-to-live of cached reference data, in seconds (10 minutes).
pub const REFERENCE_CACHE_TTL_SECS: u64 = 10 * 60;

/// Magic bytes at the start of every cache entry.
pub const CACHE_MAGIC_BYTES: &[u8; 4] = b"INTK";

/// Cache entry format version.
pub const CACHE_FORMAT_VERSION: u8 = 1;

/// Entries larger than this are rejected before decoding (16 MB).
pub const MAX_CACHE_ENTRY_SIZE: usize = 16 * 1024 * 1024;

// =============================================================================
// DIRECTORY SEARCH
// =============================================================================

/// Debounce window for people search, in milliseconds.
pub const SEARCH_DEBOUNCE_MS: u64 = 300;

/// Minimum trimmed search term length before a directory query is issued.
pub const MIN_SEARCH_TERM_LENGTH: usize = 2;

/// Maximum number of directory results requested per search.
pub const DIRECTORY_RESULT_LIMIT: usize = 8;

// =============================================================================
// INPUT LIMITS
// =============================================================================

/// Maximum number of metric rows on one use case.
///
/// Requests carrying more rows are rejected at the API boundary.
pub const MAX_METRICS: usize = 100;

/// Maximum number of stakeholders on one use case.
pub const MAX_STAKEHOLDERS: usize = 200;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fallback_phases_start_with_idea() {
        assert_eq!(FALLBACK_PHASES[0], "Idea");
        assert_eq!(FALLBACK_PHASES.len(), 4);
    }

    #[test]
    fn cache_ttl_is_ten_minutes() {
        assert_eq!(REFERENCE_CACHE_TTL_SECS, 600);
    }
}
