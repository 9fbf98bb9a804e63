use serde_json::Value;

use rho_ai::{
    build_generator_client, GeneratorClient, GeneratorError, IssueAnalysis, IssueUpdate,
};
use rho_config::{ConfigError, ResolvedConfig};
use rho_events::{ActionKind, ActionLogEntry};
use rho_tracker::{IssueChanges, NewIssue, TrackerClient, TrackerConfig, TrackerError};
use thiserror::Error;

use crate::context::ServiceContext;

pub const TRACKER_RESOURCE: &str = "tracker";
pub const GENERATOR_RESOURCE: &str = "generator";

const ANALYSIS_PROMPT: &str = "Analysis request";

/// Enumerates supported `OrchestratorError` values.
#[derive(Debug, Error)]
pub enum OrchestratorError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("rate limit exceeded for {0}")]
    RateLimitExceeded(String),
    #[error("generator failure: {0}")]
    Generator(#[from] GeneratorError),
    #[error("tracker failure: {0}")]
    Tracker(#[from] TrackerError),
    #[error("prompt must not be empty")]
    EmptyPrompt,
}

fn rate_gate(
    ctx: &ServiceContext,
    config: &ResolvedConfig,
    now: u64,
) -> Result<(), OrchestratorError> {
    for resource in [TRACKER_RESOURCE, GENERATOR_RESOURCE] {
        if ctx
            .rate_limiter()
            .is_limited(resource, config.rate_limit_per_minute, now)
        {
            tracing::warn!(
                resource,
                budget = config.rate_limit_per_minute,
                "rate budget exhausted, rejecting request"
            );
            return Err(OrchestratorError::RateLimitExceeded(resource.to_string()));
        }
    }
    Ok(())
}

pub(crate) fn tracker_client(config: &ResolvedConfig) -> Result<TrackerClient, TrackerError> {
    TrackerClient::new(TrackerConfig {
        base_url: config.tracker_url.clone(),
        api_key: config.tracker_api_key.clone(),
        request_timeout_ms: config.request_timeout_ms,
    })
}

/// Converts any failure past the rate gate into a Failed audit entry
/// before it reaches the caller, so the log and the caller's view of the
/// outcome never disagree.
fn logged<T, E>(
    ctx: &ServiceContext,
    action_type: ActionKind,
    issue_id: Option<u64>,
    prompt: &str,
    result: Result<T, E>,
) -> Result<T, OrchestratorError>
where
    E: Into<OrchestratorError>,
{
    match result {
        Ok(value) => Ok(value),
        Err(error) => {
            let error = error.into();
            let entry = ActionLogEntry::failed(
                action_type,
                issue_id,
                prompt.to_string(),
                error.to_string(),
            );
            if let Err(append_error) = ctx.action_log().append(&entry) {
                tracing::error!(%append_error, "failed to append failure record");
            }
            Err(error)
        }
    }
}

fn record_completed(ctx: &ServiceContext, entry: ActionLogEntry) {
    if let Err(append_error) = ctx.action_log().append(&entry) {
        tracing::error!(%append_error, "failed to append completion record");
    }
}

fn changes_from_update(update: &IssueUpdate) -> IssueChanges {
    IssueChanges {
        subject: update.subject.clone(),
        description: update.description.clone(),
        tracker_id: update.tracker_id,
        priority_id: update.priority_id,
        status_id: update.status_id,
        assigned_to_id: update.assigned_to_id,
        notes: update.notes.clone(),
    }
}

/// Turns a free-form prompt into a new tracker issue. Returns the created
/// issue object as the tracker reported it.
pub async fn create_issue(
    ctx: &ServiceContext,
    prompt: &str,
) -> Result<Value, OrchestratorError> {
    let prompt = prompt.trim();
    if prompt.is_empty() {
        return Err(OrchestratorError::EmptyPrompt);
    }

    let config = ctx.resolver().get()?;
    let now = rho_core::current_unix_timestamp();
    rate_gate(ctx, config.as_ref(), now)?;

    let action = ActionKind::Create;
    let generator = logged(
        ctx,
        action,
        None,
        prompt,
        build_generator_client(config.as_ref(), ctx.mock_generator()),
    )?;
    let generated = logged(ctx, action, None, prompt, generator.generate_issue(prompt).await)?;
    ctx.rate_limiter().record_call(GENERATOR_RESOURCE, now);

    if generated.subject.trim().is_empty() || generated.description.trim().is_empty() {
        let invalid = GeneratorError::InvalidResponse(
            "generated issue is missing subject or description".to_string(),
        );
        return logged(ctx, action, None, prompt, Err::<Value, _>(invalid));
    }

    let tracker = logged(ctx, action, None, prompt, tracker_client(config.as_ref()))?;
    let new_issue = NewIssue {
        project_id: generated.project_id.unwrap_or(config.default_project_id),
        subject: generated.subject.clone(),
        description: generated.description.clone(),
        tracker_id: generated.tracker_id,
        priority_id: generated.priority_id,
        assigned_to_id: generated.assigned_to_id,
    };
    let created = logged(ctx, action, None, prompt, tracker.create_issue(&new_issue).await)?;
    ctx.rate_limiter().record_call(TRACKER_RESOURCE, now);

    let issue_id = created.get("id").and_then(Value::as_u64);
    let response = serde_json::to_string(&generated).map_err(GeneratorError::Serde)?;
    record_completed(
        ctx,
        ActionLogEntry::completed(action, issue_id, created.to_string(), prompt.to_string(), response),
    );
    Ok(created)
}

/// Applies a prompt-derived partial update to an existing issue and
/// returns the tracker's result message.
pub async fn update_issue(
    ctx: &ServiceContext,
    issue_id: u64,
    prompt: &str,
) -> Result<String, OrchestratorError> {
    let prompt = prompt.trim();
    if prompt.is_empty() {
        return Err(OrchestratorError::EmptyPrompt);
    }

    let config = ctx.resolver().get()?;
    let now = rho_core::current_unix_timestamp();
    rate_gate(ctx, config.as_ref(), now)?;

    let action = ActionKind::Update;
    let id = Some(issue_id);
    let tracker = logged(ctx, action, id, prompt, tracker_client(config.as_ref()))?;
    let current = logged(ctx, action, id, prompt, tracker.get_issue(issue_id).await)?;
    ctx.rate_limiter().record_call(TRACKER_RESOURCE, now);

    let generator = logged(
        ctx,
        action,
        id,
        prompt,
        build_generator_client(config.as_ref(), ctx.mock_generator()),
    )?;
    let update = logged(
        ctx,
        action,
        id,
        prompt,
        generator.update_issue(prompt, &current).await,
    )?;
    ctx.rate_limiter().record_call(GENERATOR_RESOURCE, now);

    let changes = changes_from_update(&update);
    let message = logged(
        ctx,
        action,
        id,
        prompt,
        tracker.update_issue(issue_id, &changes).await,
    )?;
    ctx.rate_limiter().record_call(TRACKER_RESOURCE, now);

    let content = serde_json::json!({"success": true, "message": message}).to_string();
    let response = serde_json::to_string(&update).map_err(GeneratorError::Serde)?;
    record_completed(
        ctx,
        ActionLogEntry::completed(action, id, content, prompt.to_string(), response),
    );
    Ok(message)
}

/// Produces an analysis of an existing issue. No tracker mutation: the
/// generator's output is the result.
pub async fn analyze_issue(
    ctx: &ServiceContext,
    issue_id: u64,
) -> Result<IssueAnalysis, OrchestratorError> {
    let config = ctx.resolver().get()?;
    let now = rho_core::current_unix_timestamp();
    rate_gate(ctx, config.as_ref(), now)?;

    let action = ActionKind::Analyze;
    let id = Some(issue_id);
    let tracker = logged(ctx, action, id, ANALYSIS_PROMPT, tracker_client(config.as_ref()))?;
    let issue = logged(ctx, action, id, ANALYSIS_PROMPT, tracker.get_issue(issue_id).await)?;
    ctx.rate_limiter().record_call(TRACKER_RESOURCE, now);

    let generator = logged(
        ctx,
        action,
        id,
        ANALYSIS_PROMPT,
        build_generator_client(config.as_ref(), ctx.mock_generator()),
    )?;
    let analysis = logged(
        ctx,
        action,
        id,
        ANALYSIS_PROMPT,
        generator.analyze_issue(&issue).await,
    )?;
    ctx.rate_limiter().record_call(GENERATOR_RESOURCE, now);

    let response = serde_json::to_string(&analysis).map_err(GeneratorError::Serde)?;
    record_completed(
        ctx,
        ActionLogEntry::completed(
            action,
            id,
            issue.to_string(),
            ANALYSIS_PROMPT.to_string(),
            response,
        ),
    );
    Ok(analysis)
}
