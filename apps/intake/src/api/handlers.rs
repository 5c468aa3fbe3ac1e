//! # API Endpoint Handlers
//!
//! Status codes: 400 for malformed or oversized input, 422 when the step
//! gate or payload assembly refuses the form, 502 when reference data or
//! the backend is unavailable.

use super::{
    AppState,
    types::{
        AdvanceRequest, AdvanceResponse, HealthResponse, MetricsRequest, MetricsResponse,
        ReferenceResponse, SubmissionRequest, SubmissionResponse, TimelineRequest,
        TimelineResponse, check_form_limits, parse_optional_date, resolve_today,
    },
};
use crate::error::AppError;
use axum::{Json, extract::State, http::StatusCode, response::IntoResponse};
use intake_core::{
    AssembledSubmission, FormContext, IntakeError, TimelineError, Wizard, WizardStep,
};

/// Map an error to its response status.
fn status_for(error: &AppError) -> StatusCode {
    match error {
        AppError::Gate(_) | AppError::Intake(IntakeError::Assembly(_)) => {
            StatusCode::UNPROCESSABLE_ENTITY
        }
        AppError::Intake(IntakeError::Cache(_)) | AppError::Client(_) | AppError::Config(_) => {
            StatusCode::BAD_GATEWAY
        }
        AppError::Intake(_) | AppError::Io(_) => StatusCode::BAD_REQUEST,
    }
}

async fn form_context(state: &AppState) -> Result<FormContext, AppError> {
    let data = state.reference.get().await?;
    Ok(FormContext::from_reference(&data))
}

// =============================================================================
// HEALTH HANDLER
// =============================================================================

/// Health check endpoint.
pub async fn health_handler() -> impl IntoResponse {
    Json(HealthResponse::default())
}

// =============================================================================
// REFERENCE HANDLER
// =============================================================================

/// Summary of the cached reference data.
pub async fn reference_handler(State(state): State<AppState>) -> impl IntoResponse {
    match state.reference.get().await {
        Ok(data) => (StatusCode::OK, Json(ReferenceResponse::success(&data))),
        Err(e) => {
            tracing::error!("Reference data unavailable: {}", e);
            (status_for(&e), Json(ReferenceResponse::error(e.to_string())))
        }
    }
}

// =============================================================================
// WIZARD HANDLER
// =============================================================================

/// Run the step gate for the posted form.
pub async fn advance_handler(
    State(state): State<AppState>,
    Json(request): Json<AdvanceRequest>,
) -> impl IntoResponse {
    // Echoes the step actually gated: a disabled checklist resolves to plan.
    let mut step = request.step;
    match advance(&state, request, &mut step).await {
        Ok((next, attention)) => (
            StatusCode::OK,
            Json(AdvanceResponse::success(step, next, attention)),
        ),
        Err(e) => (status_for(&e), Json(AdvanceResponse::error(step, e.to_string()))),
    }
}

async fn advance(
    state: &AppState,
    request: AdvanceRequest,
    step: &mut WizardStep,
) -> Result<(WizardStep, bool), AppError> {
    check_form_limits(&request.form).map_err(AppError::Io)?;
    let today = resolve_today(request.today.as_deref())?;
    let context = form_context(state).await?;

    let mut wizard = Wizard::starting_at(request.step, context.checklist_enabled());
    *step = wizard.step();
    let snapshot = request.form.snapshot(&context, today)?;
    let next = wizard.next(&snapshot)?;
    Ok((next, wizard.checklist_needs_attention()))
}

// =============================================================================
// TIMELINE HANDLER
// =============================================================================

/// Check one phase edit. Ordering violations are a normal answer, not an
/// error status.
pub async fn timeline_handler(
    State(state): State<AppState>,
    Json(request): Json<TimelineRequest>,
) -> impl IntoResponse {
    match check_timeline(&state, &request).await {
        Ok(violation) => (StatusCode::OK, Json(TimelineResponse::checked(violation))),
        Err(e) => (status_for(&e), Json(TimelineResponse::error(e.to_string()))),
    }
}

async fn check_timeline(
    state: &AppState,
    request: &TimelineRequest,
) -> Result<Option<String>, AppError> {
    let start = parse_optional_date(request.start_date.as_deref())?;
    let end = parse_optional_date(request.end_date.as_deref())?;
    let context = form_context(state).await?;
    let timeline = request.form.timeline(&context.ordering)?;

    match timeline.validate(&request.phase, start, end) {
        Ok(()) => Ok(None),
        Err(e @ TimelineError::UnknownPhase(_)) => Err(e.into()),
        Err(violation) => Ok(Some(violation.to_string())),
    }
}

// =============================================================================
// METRICS HANDLER
// =============================================================================

/// Report the first failing rule of every metric.
pub async fn metrics_handler(Json(request): Json<MetricsRequest>) -> impl IntoResponse {
    if let Err(msg) = request.check_limits() {
        return (StatusCode::BAD_REQUEST, Json(MetricsResponse::error(msg)));
    }
    match resolve_today(request.today.as_deref()) {
        Ok(today) => (
            StatusCode::OK,
            Json(MetricsResponse::checked(&request.metrics, today)),
        ),
        Err(e) => (StatusCode::BAD_REQUEST, Json(MetricsResponse::error(e.to_string()))),
    }
}

// =============================================================================
// SUBMISSION HANDLERS
// =============================================================================

async fn prepare(
    state: &AppState,
    request: &SubmissionRequest,
) -> Result<AssembledSubmission, AppError> {
    check_form_limits(&request.form).map_err(AppError::Io)?;
    let today = resolve_today(request.today.as_deref())?;
    let context = form_context(state).await?;

    let snapshot = request.form.snapshot(&context, today)?;
    intake_core::wizard::check(WizardStep::Metrics, &snapshot)?;

    let editor_email = request
        .editor_email
        .as_deref()
        .or(state.editor_email.as_deref());
    let policy = request.policy.unwrap_or(state.policy);
    let assembled = request.form.assemble(&context, editor_email, policy)?;
    for warning in &assembled.warnings {
        tracing::warn!("Dropped unresolved record: {}", warning);
    }
    Ok(assembled)
}

/// Assemble the create request without sending it.
pub async fn preview_handler(
    State(state): State<AppState>,
    Json(request): Json<SubmissionRequest>,
) -> impl IntoResponse {
    match prepare(&state, &request).await {
        Ok(assembled) => (
            StatusCode::OK,
            Json(SubmissionResponse::preview(
                assembled.payload,
                assembled.warnings,
            )),
        ),
        Err(e) => (status_for(&e), Json(SubmissionResponse::error(e.to_string()))),
    }
}

/// Assemble the create request and forward it to the backend.
pub async fn submit_handler(
    State(state): State<AppState>,
    Json(request): Json<SubmissionRequest>,
) -> impl IntoResponse {
    let assembled = match prepare(&state, &request).await {
        Ok(assembled) => assembled,
        Err(e) => return (status_for(&e), Json(SubmissionResponse::error(e.to_string()))),
    };

    let Some(backend) = state.backend.as_ref() else {
        return (
            StatusCode::BAD_GATEWAY,
            Json(SubmissionResponse::error("No backend configured")),
        );
    };

    match backend.create_use_case(&assembled.payload).await {
        Ok(created) => {
            tracing::info!(use_case_id = %created.id, "Use case submitted");
            (
                StatusCode::CREATED,
                Json(SubmissionResponse::created(
                    assembled.payload,
                    assembled.warnings,
                    created.id,
                )),
            )
        }
        Err(e) => {
            tracing::error!("Submission failed: {}", e);
            (StatusCode::BAD_GATEWAY, Json(SubmissionResponse::error(e.to_string())))
        }
    }
}
