//! # Intake HTTP API Module
//!
//! Wizard validation and submission over HTTP, using axum.
//!
//! ## Endpoints
//!
//! - `GET /health` - Health check
//! - `GET /reference` - Summary of the cached reference data
//! - `POST /wizard/advance` - Run the step gate for a form
//! - `POST /timeline/validate` - Check one phase date edit
//! - `POST /metrics/validate` - Check metric rows
//! - `POST /submission/preview` - Assemble the create request
//! - `POST /submission` - Assemble and forward to the backend
//!
//! ## Environment
//!
//! - `INTAKE_CORS_ORIGINS`: comma-separated origins, or "*" for all (default: localhost)
//! - `INTAKE_RATE_LIMIT`: requests per second (default: 50, 0 disables)
//! - `INTAKE_API_KEY`: when set, requests need a Bearer token

mod auth;
mod handlers;
mod middleware;
mod types;

pub use auth::get_api_key_from_env;
pub use middleware::{DEFAULT_RATE_LIMIT, create_rate_limiter, get_rate_limit_from_env};
pub use types::{
    AdvanceRequest, AdvanceResponse, HealthResponse, MetricIssueJson, MetricsRequest,
    MetricsResponse, ReferenceResponse, SubmissionRequest, SubmissionResponse, TimelineRequest,
    TimelineResponse,
};

use crate::client::BackendClient;
use crate::error::AppError;
use crate::reference::ReferenceService;
use axum::{
    Router,
    http::{HeaderValue, Method, header},
    middleware as axum_middleware,
    routing::{get, post},
};
use intake_core::UnresolvedPolicy;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

/// Largest accepted request body.
const MAX_BODY_BYTES: usize = 2 * 1024 * 1024;

// =============================================================================
// SERVER STATE
// =============================================================================

/// Shared server state.
#[derive(Clone)]
pub struct AppState {
    pub reference: Arc<ReferenceService>,
    /// Target of `POST /submission`; absent means submissions fail with 502.
    pub backend: Option<BackendClient>,
    pub editor_email: Option<String>,
    pub policy: UnresolvedPolicy,
}

impl AppState {
    #[must_use]
    pub fn new(reference: ReferenceService) -> Self {
        Self {
            reference: Arc::new(reference),
            backend: None,
            editor_email: None,
            policy: UnresolvedPolicy::default(),
        }
    }

    #[must_use]
    pub fn with_backend(mut self, backend: BackendClient) -> Self {
        self.backend = Some(backend);
        self
    }

    #[must_use]
    pub fn with_editor_email(mut self, email: Option<String>) -> Self {
        self.editor_email = email.filter(|e| !e.trim().is_empty());
        self
    }

    #[must_use]
    pub fn with_policy(mut self, policy: UnresolvedPolicy) -> Self {
        self.policy = policy;
        self
    }
}

// =============================================================================
// CORS CONFIGURATION
// =============================================================================

fn build_cors_layer() -> CorsLayer {
    cors_from(std::env::var("INTAKE_CORS_ORIGINS").ok().as_deref())
}

fn cors_from(origins: Option<&str>) -> CorsLayer {
    match origins {
        Some("*") => {
            tracing::warn!("CORS: allowing all origins (INTAKE_CORS_ORIGINS=*)");
            CorsLayer::permissive()
        }
        Some(list) => {
            let allowed: Vec<HeaderValue> = list
                .split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .filter_map(|origin| match origin.parse::<HeaderValue>() {
                    Ok(value) => Some(value),
                    Err(e) => {
                        tracing::warn!("CORS: invalid origin '{}': {}", origin, e);
                        None
                    }
                })
                .collect();
            if allowed.is_empty() {
                tracing::warn!("CORS: no valid origins configured, using localhost only");
                return restricted_cors(localhost_origins());
            }
            restricted_cors(allowed)
        }
        None => restricted_cors(localhost_origins()),
    }
}

fn localhost_origins() -> Vec<HeaderValue> {
    [
        "http://localhost:3000",
        "http://localhost:5173",
        "http://127.0.0.1:3000",
        "http://127.0.0.1:5173",
    ]
    .into_iter()
    .filter_map(|o| o.parse().ok())
    .collect()
}

fn restricted_cors(origins: Vec<HeaderValue>) -> CorsLayer {
    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION])
}

// =============================================================================
// ROUTER CREATION
// =============================================================================

/// Build the router with every endpoint and middleware.
///
/// Layers from the inside out: authentication, rate limiting, body limit,
/// CORS, request tracing.
pub fn create_router(state: AppState) -> Router {
    let rate_limit = get_rate_limit_from_env();
    let has_auth = get_api_key_from_env().is_some();
    if has_auth {
        tracing::info!("API key authentication enabled");
    } else {
        tracing::warn!("API key authentication disabled; set INTAKE_API_KEY to enable it");
    }

    let mut router = Router::new()
        .route("/health", get(handlers::health_handler))
        .route("/reference", get(handlers::reference_handler))
        .route("/wizard/advance", post(handlers::advance_handler))
        .route("/timeline/validate", post(handlers::timeline_handler))
        .route("/metrics/validate", post(handlers::metrics_handler))
        .route("/submission/preview", post(handlers::preview_handler))
        .route("/submission", post(handlers::submit_handler));

    if has_auth {
        router = router.layer(axum_middleware::from_fn(auth::api_key_auth_middleware));
    }

    if rate_limit > 0 {
        tracing::info!("Rate limiting enabled: {} requests/second", rate_limit);
        router = router.layer(axum_middleware::from_fn_with_state(
            create_rate_limiter(rate_limit),
            middleware::rate_limit_middleware,
        ));
    } else {
        tracing::info!("Rate limiting disabled");
    }

    router
        .layer(axum::extract::DefaultBodyLimit::max(MAX_BODY_BYTES))
        .layer(build_cors_layer())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

// =============================================================================
// SERVER STARTUP
// =============================================================================

/// Bind `addr` and serve until the process stops.
pub async fn run_server(addr: &str, state: AppState) -> Result<(), AppError> {
    let router = create_router(state);
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|e| AppError::Io(format!("Bind failed: {}", e)))?;

    tracing::info!("Intake server listening on {}", addr);

    axum::serve(listener, router)
        .await
        .map_err(|e| AppError::Io(format!("Server error: {}", e)))
}
