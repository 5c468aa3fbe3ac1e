//! # CLI Command Implementations

use crate::api::{self, AppState, ReferenceResponse};
use crate::client::BackendClient;
use crate::client::directory::{DirectoryClient, PeopleSearch, SearchOutcome};
use crate::config::IntakeConfig;
use crate::error::AppError;
use crate::reference::{CacheBackend, ReferenceService};
use chrono::NaiveDate;
use intake_core::dates::{parse_required, today_local, to_display};
use intake_core::{
    AssembledSubmission, FormContext, IntakeForm, Metric, MetricChangeSet, MetricReport,
    UnresolvedPolicy, UseCaseId, Wizard, WizardStep, check_reportable,
};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::path::{Path, PathBuf};
use std::sync::Arc;

// =============================================================================
// FILE HANDLING
// =============================================================================

/// Maximum size of a form or metrics file (1 MB).
const MAX_INPUT_FILE_SIZE: u64 = 1024 * 1024;

fn validate_file_size(path: &Path, max_size: u64) -> Result<(), AppError> {
    let metadata = std::fs::metadata(path)
        .map_err(|e| AppError::Io(format!("Cannot read file metadata: {}", e)))?;
    if metadata.len() > max_size {
        return Err(AppError::Io(format!(
            "File size {} bytes exceeds maximum allowed {} bytes",
            metadata.len(),
            max_size
        )));
    }
    Ok(())
}

/// Resolve `..` and symlinks and require a regular file.
fn validate_file_path(path: &Path) -> Result<PathBuf, AppError> {
    let canonical = path.canonicalize().map_err(|e| {
        AppError::Io(format!("Invalid file path '{}': {}", path.display(), e))
    })?;
    if !canonical.is_file() {
        return Err(AppError::Io(format!(
            "Path '{}' is not a regular file",
            path.display()
        )));
    }
    Ok(canonical)
}

/// Read and parse a JSON input file.
pub fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T, AppError> {
    let path = validate_file_path(path)?;
    validate_file_size(&path, MAX_INPUT_FILE_SIZE)?;
    let text = std::fs::read_to_string(&path)
        .map_err(|e| AppError::Io(format!("Cannot read '{}': {}", path.display(), e)))?;
    serde_json::from_str(&text).map_err(|e| {
        AppError::Intake(intake_core::IntakeError::SerializationError(format!(
            "{}: {}",
            path.display(),
            e
        )))
    })
}

fn print_json<T: Serialize>(output: &T) {
    println!(
        "{}",
        serde_json::to_string_pretty(output).unwrap_or_default()
    );
}

fn optional_date(raw: Option<&str>) -> Result<Option<NaiveDate>, AppError> {
    Ok(raw
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(parse_required)
        .transpose()?)
}

// =============================================================================
// SERVICES
// =============================================================================

fn backend_client(config: &IntakeConfig) -> Result<BackendClient, AppError> {
    Ok(BackendClient::new(&config.backend_url, config.timeout())?)
}

fn reference_service(config: &IntakeConfig) -> Result<Arc<ReferenceService>, AppError> {
    let cache = CacheBackend::open(config.cache_path.as_deref())?;
    let client = backend_client(config)?;
    Ok(Arc::new(ReferenceService::new(
        cache,
        Some(client),
        config.cache_ttl_secs,
    )))
}

async fn form_context(config: &IntakeConfig) -> Result<FormContext, AppError> {
    let data = reference_service(config)?.get().await?;
    Ok(FormContext::from_reference(&data))
}

// =============================================================================
// SERVER COMMAND
// =============================================================================

pub async fn cmd_server(config: &IntakeConfig, host: &str, port: u16) -> Result<(), AppError> {
    let cache = CacheBackend::open(config.cache_path.as_deref())?;
    let persistent = cache.is_persistent();
    let client = backend_client(config)?;
    let reference = ReferenceService::new(cache, Some(client.clone()), config.cache_ttl_secs);
    let state = AppState::new(reference)
        .with_backend(client)
        .with_editor_email(config.editor_email.clone())
        .with_policy(config.unresolved_policy);

    println!("Intake Server Starting...");
    println!();
    println!("Configuration:");
    println!("  Host:      {}", host);
    println!("  Port:      {}", port);
    println!("  Backend:   {}", config.backend_url);
    println!(
        "  Cache:     {} (ttl {}s)",
        if persistent { "redb" } else { "memory" },
        config.cache_ttl_secs
    );
    println!("  Unresolved records: {}", config.unresolved_policy);
    println!();
    println!("Endpoints:");
    println!("  GET  /health              - Health check");
    println!("  GET  /reference           - Reference data summary");
    println!("  POST /wizard/advance      - Step gate");
    println!("  POST /timeline/validate   - Phase date check");
    println!("  POST /metrics/validate    - Metric check");
    println!("  POST /submission/preview  - Assemble create request");
    println!("  POST /submission          - Submit use case");
    println!();
    println!("Press Ctrl+C to stop");
    println!();

    let addr = format!("{}:{}", host, port);
    api::run_server(&addr, state).await
}

// =============================================================================
// REFERENCE COMMAND
// =============================================================================

pub async fn cmd_reference(
    config: &IntakeConfig,
    json_mode: bool,
    refresh: bool,
) -> Result<(), AppError> {
    let service = reference_service(config)?;
    let data = if refresh {
        service.invalidate().await?;
        service.refresh().await?
    } else {
        service.get().await?
    };
    let summary = ReferenceResponse::success(&data);

    if json_mode {
        print_json(&summary);
        return Ok(());
    }

    println!("Reference Data");
    println!("==============");
    for (list, count) in &summary.counts {
        println!("  {:<20} {}", list, count);
    }
    println!();
    println!("Business units: {}", summary.business_units.join(", "));
    println!("Phases:         {}", summary.phases.join(" -> "));
    println!("Roles:          {}", summary.role_options.join(", "));
    println!(
        "Checklist:      {}",
        if summary.checklist_enabled {
            "enabled"
        } else {
            "disabled"
        }
    );
    Ok(())
}

// =============================================================================
// CHECK COMMAND
// =============================================================================

/// Run the gate for `step`. A blocked step is reported and returned as an
/// error so the exit status reflects it.
pub async fn cmd_check(
    config: &IntakeConfig,
    json_mode: bool,
    file: &Path,
    step: WizardStep,
) -> Result<(), AppError> {
    let form: IntakeForm = read_json(file)?;
    let context = form_context(config).await?;
    let snapshot = form.snapshot(&context, today_local())?;

    let mut wizard = Wizard::starting_at(step, context.checklist_enabled());
    let step = wizard.step();
    let outcome = wizard.next(&snapshot);

    if json_mode {
        let output = match &outcome {
            Ok(next) => {
                api::AdvanceResponse::success(step, *next, wizard.checklist_needs_attention())
            }
            Err(block) => api::AdvanceResponse::error(step, block.to_string()),
        };
        print_json(&output);
    } else {
        match &outcome {
            Ok(next) if *next == WizardStep::Metrics && step == WizardStep::Metrics => {
                println!("{}: ready to submit", step.label());
            }
            Ok(next) => println!("{} -> {}", step.label(), next.label()),
            Err(block) => println!("{}: {}", step.label(), block),
        }
        if wizard.checklist_needs_attention() {
            println!("Note: no checklist question was answered");
        }
    }

    outcome.map(|_| ()).map_err(AppError::from)
}

// =============================================================================
// TIMELINE COMMAND
// =============================================================================

pub async fn cmd_timeline(
    config: &IntakeConfig,
    json_mode: bool,
    file: &Path,
    phase: &str,
    start: Option<&str>,
    end: Option<&str>,
) -> Result<(), AppError> {
    let form: IntakeForm = read_json(file)?;
    let start = optional_date(start)?;
    let end = optional_date(end)?;
    let context = form_context(config).await?;
    let timeline = form.timeline(&context.ordering)?;
    let result = timeline.validate(phase, start, end);

    if json_mode {
        let output = serde_json::json!({
            "phase": phase,
            "start_date": start.map(to_display),
            "end_date": end.map(to_display),
            "valid": result.is_ok(),
            "error": result.as_ref().err().map(ToString::to_string),
        });
        print_json(&output);
    } else {
        match &result {
            Ok(()) => println!("{}: dates accepted", phase),
            Err(e) => println!("{}: {}", phase, e),
        }
    }

    Ok(result?)
}

// =============================================================================
// PREVIEW / SUBMIT COMMANDS
// =============================================================================

async fn assemble_form(
    config: &IntakeConfig,
    file: &Path,
    policy: Option<UnresolvedPolicy>,
) -> Result<AssembledSubmission, AppError> {
    let form: IntakeForm = read_json(file)?;
    let context = form_context(config).await?;
    let snapshot = form.snapshot(&context, today_local())?;
    intake_core::wizard::check(WizardStep::Metrics, &snapshot)?;

    let policy = policy.unwrap_or(config.unresolved_policy);
    let assembled = form.assemble(&context, config.editor_email.as_deref(), policy)?;
    for warning in &assembled.warnings {
        tracing::warn!("Dropped unresolved record: {}", warning);
    }
    Ok(assembled)
}

pub async fn cmd_preview(
    config: &IntakeConfig,
    json_mode: bool,
    file: &Path,
    policy: Option<UnresolvedPolicy>,
) -> Result<(), AppError> {
    let assembled = assemble_form(config, file, policy).await?;
    if json_mode {
        print_json(&assembled);
    } else {
        print_json(&assembled.payload);
        for warning in &assembled.warnings {
            println!("warning: {}", warning);
        }
    }
    Ok(())
}

pub async fn cmd_submit(
    config: &IntakeConfig,
    json_mode: bool,
    file: &Path,
    policy: Option<UnresolvedPolicy>,
) -> Result<(), AppError> {
    let assembled = assemble_form(config, file, policy).await?;
    let created = backend_client(config)?
        .create_use_case(&assembled.payload)
        .await?;
    tracing::info!(use_case_id = %created.id, "Use case submitted");

    if json_mode {
        let output = serde_json::json!({
            "id": created.id,
            "approvals": created.approvals,
            "warnings": assembled.warnings,
        });
        print_json(&output);
    } else {
        println!("Submitted use case #{}", created.id);
        if created.approvals == Some(true) {
            println!("Approvals were requested");
        }
    }
    Ok(())
}

// =============================================================================
// PEOPLE COMMAND
// =============================================================================

pub async fn cmd_people(
    config: &IntakeConfig,
    json_mode: bool,
    term: &str,
    selected: Option<&str>,
) -> Result<(), AppError> {
    let token = config.graph_token.as_deref().ok_or_else(|| {
        AppError::Config("Directory search needs graph_token (or INTAKE_GRAPH_TOKEN)".to_string())
    })?;
    let client = DirectoryClient::new(&config.graph_url, token, config.timeout())?;
    let search = PeopleSearch::new(client, config.search_debounce());

    let people = match search.search(term, selected).await? {
        SearchOutcome::Results(people) => people,
        SearchOutcome::Skipped | SearchOutcome::Superseded => Vec::new(),
    };

    if json_mode {
        print_json(&people);
        return Ok(());
    }
    if people.is_empty() {
        println!("No matches");
    }
    for person in &people {
        println!("{:<30} {}", person.name, person.email);
    }
    Ok(())
}

// =============================================================================
// SUGGEST COMMAND
// =============================================================================

pub async fn cmd_suggest(
    config: &IntakeConfig,
    json_mode: bool,
    file: &Path,
    kind: &str,
) -> Result<(), AppError> {
    let form: IntakeForm = read_json(file)?;
    let client = backend_client(config)?;

    match kind.to_lowercase().as_str() {
        "usecase" => {
            let suggestion = client.suggest_use_case(&form.draft).await?;
            if json_mode {
                print_json(&suggestion);
            } else {
                let fields = [
                    ("Title", &suggestion.title),
                    ("Headline", &suggestion.headline),
                    ("Opportunity", &suggestion.opportunity),
                    ("Business value", &suggestion.business_value),
                ];
                for (label, value) in fields {
                    if let Some(value) = value {
                        println!("{}: {}", label, value);
                    }
                }
            }
        }
        "metric" => {
            let metrics = client.suggest_metrics(&form.draft).await?.into_metrics();
            let today = today_local();
            if json_mode {
                print_json(&metrics);
            } else {
                for metric in &metrics {
                    let status = metric
                        .check(today)
                        .err()
                        .map_or_else(|| "complete".to_string(), |issue| issue.to_string());
                    println!("{} [{}]", metric.primary_success_value, status);
                }
            }
        }
        "phase" => {
            let context = form_context(config).await?;
            let suggestions = client
                .suggest_timeline(&form.draft)
                .await?
                .into_suggestions(&context.ordering);
            let mut timeline = form.timeline(&context.ordering)?;
            let staged = timeline.stage_suggestions(&suggestions);
            if json_mode {
                let output = serde_json::json!({ "staged": staged, "suggestions": suggestions });
                print_json(&output);
            } else {
                for s in &suggestions {
                    println!("{:<15} {} - {}", s.phase, to_display(s.start), to_display(s.end));
                }
                println!("{} of {} suggestions apply to this form", staged, suggestions.len());
            }
        }
        other => {
            return Err(AppError::Config(format!(
                "Unknown suggestion kind '{}' (expected usecase, metric or phase)",
                other
            )));
        }
    }
    Ok(())
}

// =============================================================================
// REPORT COMMAND
// =============================================================================

/// What `report` prints before syncing: the change set as JSON in JSON or
/// dry-run mode, a plain notice when there is nothing to send.
fn report_preview(changes: &MetricChangeSet, json_mode: bool, dry_run: bool) -> Option<String> {
    if json_mode || dry_run {
        Some(serde_json::to_string_pretty(changes).unwrap_or_default())
    } else if changes.is_empty() {
        Some("No metric changes".to_string())
    } else {
        None
    }
}

pub async fn cmd_report(
    config: &IntakeConfig,
    json_mode: bool,
    use_case: u64,
    before: &Path,
    after: &Path,
    history: Option<&Path>,
    dry_run: bool,
) -> Result<(), AppError> {
    let before: Vec<Metric> = read_json(before)?;
    let after: Vec<Metric> = read_json(after)?;
    let history: Vec<MetricReport> = match history {
        Some(path) => read_json(path)?,
        None => Vec::new(),
    };
    check_reportable(&after, today_local())?;
    let context = form_context(config).await?;
    let changes = MetricChangeSet::between(&before, &after, &history, &context.lookups);

    if let Some(preview) = report_preview(&changes, json_mode, dry_run) {
        println!("{}", preview);
    }
    if changes.is_empty() || dry_run {
        return Ok(());
    }

    backend_client(config)?
        .sync_metrics(UseCaseId(use_case), &changes, config.editor_email.as_deref())
        .await?;
    tracing::info!(use_case_id = use_case, "Metrics synced");
    if !json_mode {
        println!("Metrics of use case #{} updated", use_case);
    }
    Ok(())
}

// =============================================================================
// EDIT COMMAND
// =============================================================================

/// Push plan and stakeholder changes of an existing use case.
///
/// Only phases whose dates moved since `loaded` and stakeholders missing
/// from it are sent. Without `loaded` every dated phase and stakeholder is.
pub async fn cmd_edit(
    config: &IntakeConfig,
    json_mode: bool,
    use_case: u64,
    file: &Path,
    loaded: Option<&Path>,
    note: Option<&str>,
) -> Result<(), AppError> {
    let note = note.map(str::trim).filter(|n| !n.is_empty());
    let editor = config.editor_email.as_deref();
    if note.is_some() && editor.is_none() {
        return Err(AppError::Config(
            "Posting an update needs editor_email (or INTAKE_EDITOR_EMAIL)".to_string(),
        ));
    }

    let form: IntakeForm = read_json(file)?;
    let loaded: IntakeForm = match loaded {
        Some(path) => read_json(path)?,
        None => IntakeForm::default(),
    };
    let context = form_context(config).await?;
    let changes = form.edit_changes(&loaded, &context)?;
    for warning in &changes.warnings {
        tracing::warn!("Skipped unresolved record: {}", warning);
    }

    let id = UseCaseId(use_case);
    if !changes.is_empty() || note.is_some() {
        let client = backend_client(config)?;
        if !changes.plan.is_empty() {
            client.update_plan(id, &changes.plan, editor).await?;
        }
        for item in &changes.new_stakeholders {
            client.add_stakeholder(id, item, editor).await?;
        }
        if let (Some(note), Some(editor)) = (note, editor) {
            client.post_update(id, note, editor).await?;
        }
        tracing::info!(use_case_id = use_case, "Use case edited");
    }

    if json_mode {
        let output = serde_json::json!({
            "id": id,
            "plan_items": changes.plan.len(),
            "stakeholders": changes.new_stakeholders.len(),
            "update_posted": note.is_some(),
            "warnings": changes.warnings,
        });
        print_json(&output);
    } else if changes.is_empty() && note.is_none() {
        println!("Use case #{}: nothing changed", use_case);
    } else {
        println!(
            "Use case #{}: {} plan items, {} new stakeholders pushed",
            use_case,
            changes.plan.len(),
            changes.new_stakeholders.len()
        );
    }
    Ok(())
}
