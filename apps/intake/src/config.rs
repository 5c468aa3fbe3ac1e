//! # Configuration
//!
//! `IntakeConfig` is read from an optional TOML file and then overridden by
//! `INTAKE_*` environment variables.
//!
//! ```toml
//! backend_url = "http://localhost:8000"
//! graph_url = "https://graph.microsoft.com"
//! editor_email = "me@contoso.com"
//! cache_path = "intake-cache.redb"
//! cache_ttl_secs = 600
//! timeout_secs = 30
//! unresolved_policy = "reject"
//! ```
//!
//! Server hardening (`INTAKE_API_KEY`, `INTAKE_RATE_LIMIT`,
//! `INTAKE_CORS_ORIGINS`) is read by the API layer at router creation.

use crate::error::AppError;
use intake_core::UnresolvedPolicy;
use intake_core::primitives::{REFERENCE_CACHE_TTL_SECS, SEARCH_DEBOUNCE_MS};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Maximum accepted size of the config file (1 MB).
const MAX_CONFIG_FILE_SIZE: u64 = 1024 * 1024;

/// Default request timeout of the backend client.
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct IntakeConfig {
    /// Base URL of the use-case backend.
    pub backend_url: String,
    /// Base URL of the Graph-shaped directory.
    pub graph_url: String,
    /// Bearer token for the directory. Never acquired, only configured.
    pub graph_token: Option<String>,
    /// Sent as `editorEmail` on every write.
    pub editor_email: Option<String>,
    /// redb file for the reference cache. In-memory when unset.
    pub cache_path: Option<PathBuf>,
    pub cache_ttl_secs: u64,
    pub timeout_secs: u64,
    pub search_debounce_ms: u64,
    pub unresolved_policy: UnresolvedPolicy,
}

impl Default for IntakeConfig {
    fn default() -> Self {
        Self {
            backend_url: "http://localhost:8000".to_string(),
            graph_url: "https://graph.microsoft.com".to_string(),
            graph_token: None,
            editor_email: None,
            cache_path: None,
            cache_ttl_secs: REFERENCE_CACHE_TTL_SECS,
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            search_debounce_ms: SEARCH_DEBOUNCE_MS,
            unresolved_policy: UnresolvedPolicy::Reject,
        }
    }
}

impl IntakeConfig {
    /// Load the file at `path` (a missing file is not an error) and apply
    /// the process environment on top.
    pub fn load(path: &Path) -> Result<Self, AppError> {
        let config = if path.exists() {
            Self::from_file(path)?
        } else {
            tracing::debug!("No config file at {}, using defaults", path.display());
            Self::default()
        };
        config.with_overrides(|key| std::env::var(key).ok())
    }

    pub fn from_file(path: &Path) -> Result<Self, AppError> {
        let metadata = std::fs::metadata(path)
            .map_err(|e| AppError::Io(format!("Cannot read config metadata: {}", e)))?;
        if metadata.len() > MAX_CONFIG_FILE_SIZE {
            return Err(AppError::Config(format!(
                "Config file size {} bytes exceeds maximum allowed {} bytes",
                metadata.len(),
                MAX_CONFIG_FILE_SIZE
            )));
        }
        let text = std::fs::read_to_string(path)
            .map_err(|e| AppError::Io(format!("Read config: {}", e)))?;
        Self::from_toml(&text)
    }

    pub fn from_toml(text: &str) -> Result<Self, AppError> {
        toml::from_str(text).map_err(|e| AppError::Config(e.to_string()))
    }

    /// Apply `INTAKE_*` overrides read through `lookup`.
    pub fn with_overrides<F>(mut self, lookup: F) -> Result<Self, AppError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(url) = get("INTAKE_BACKEND_URL") {
            self.backend_url = url;
        }
        if let Some(url) = get("INTAKE_GRAPH_URL") {
            self.graph_url = url;
        }
        if let Some(token) = get("INTAKE_GRAPH_TOKEN") {
            self.graph_token = Some(token);
        }
        if let Some(email) = get("INTAKE_EDITOR_EMAIL") {
            self.editor_email = Some(email);
        }
        if let Some(path) = get("INTAKE_CACHE_PATH") {
            self.cache_path = Some(PathBuf::from(path));
        }
        if let Some(raw) = get("INTAKE_CACHE_TTL_SECS") {
            self.cache_ttl_secs = parse_number("INTAKE_CACHE_TTL_SECS", &raw)?;
        }
        if let Some(raw) = get("INTAKE_TIMEOUT_SECS") {
            self.timeout_secs = parse_number("INTAKE_TIMEOUT_SECS", &raw)?;
        }
        if let Some(raw) = get("INTAKE_SEARCH_DEBOUNCE_MS") {
            self.search_debounce_ms = parse_number("INTAKE_SEARCH_DEBOUNCE_MS", &raw)?;
        }
        if let Some(raw) = get("INTAKE_UNRESOLVED_POLICY") {
            self.unresolved_policy = raw.parse().map_err(AppError::Config)?;
        }
        Ok(self)
    }

    #[must_use]
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs.max(1))
    }

    #[must_use]
    pub fn search_debounce(&self) -> Duration {
        Duration::from_millis(self.search_debounce_ms)
    }
}

fn parse_number(key: &str, raw: &str) -> Result<u64, AppError> {
    raw.trim()
        .parse()
        .map_err(|_| AppError::Config(format!("{} must be a whole number, got '{}'", key, raw)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: BTreeMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_match_cache_and_timeout_constants() {
        let config = IntakeConfig::default();
        assert_eq!(config.cache_ttl_secs, 600);
        assert_eq!(config.timeout(), Duration::from_secs(30));
        assert_eq!(config.unresolved_policy, UnresolvedPolicy::Reject);
    }

    #[test]
    fn toml_fields_are_optional() {
        let config = IntakeConfig::from_toml(
            r#"
            backend_url = "https://api.contoso.com"
            unresolved_policy = "warn"
            "#,
        )
        .expect("parse");
        assert_eq!(config.backend_url, "https://api.contoso.com");
        assert_eq!(config.unresolved_policy, UnresolvedPolicy::Warn);
        assert_eq!(config.timeout_secs, DEFAULT_TIMEOUT_SECS);
    }

    #[test]
    fn env_overrides_file_values() {
        let config = IntakeConfig::default()
            .with_overrides(env(&[
                ("INTAKE_BACKEND_URL", "http://backend:9000"),
                ("INTAKE_CACHE_TTL_SECS", "60"),
                ("INTAKE_UNRESOLVED_POLICY", "WARN"),
                ("INTAKE_GRAPH_TOKEN", "  "),
            ]))
            .expect("overrides");
        assert_eq!(config.backend_url, "http://backend:9000");
        assert_eq!(config.cache_ttl_secs, 60);
        assert_eq!(config.unresolved_policy, UnresolvedPolicy::Warn);
        assert_eq!(config.graph_token, None);
    }

    #[test]
    fn bad_numbers_are_rejected() {
        let result =
            IntakeConfig::default().with_overrides(env(&[("INTAKE_TIMEOUT_SECS", "soon")]));
        assert!(matches!(result, Err(AppError::Config(_))));
    }

    #[test]
    fn load_reads_file_when_present() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("intake.toml");
        std::fs::write(&path, "timeout_secs = 5\n").expect("write");
        let config = IntakeConfig::from_file(&path).expect("load");
        assert_eq!(config.timeout_secs, 5);
    }
}
