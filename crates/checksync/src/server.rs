//! HTTP server for GitHub webhooks.

use axum::{
    body::Bytes,
    extract::State,
    http::{HeaderMap, StatusCode},
    response::Json,
    routing::{get, post},
    Router,
};
use serde_json::{json, Value};
use tracing::{debug, error, info, warn};

use crate::config::Config;
use crate::events::PullRequestEvent;
use crate::github::GitHubClient;
use crate::reconcile::{Outcome, Reconciler};
use crate::webhooks::verify_webhook_signature;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    /// Configuration.
    pub config: Config,
}

/// Build the HTTP router for the checksync service.
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/webhooks/github", post(github_webhook_handler))
        .route("/health", get(health_check))
        .route("/ready", get(readiness_check))
        .with_state(state)
}

/// Health check endpoint.
async fn health_check() -> Json<Value> {
    Json(json!({ "status": "healthy" }))
}

/// Readiness check endpoint.
async fn readiness_check(State(state): State<AppState>) -> Result<Json<Value>, StatusCode> {
    if state.config.github_token.is_none() {
        return Err(StatusCode::SERVICE_UNAVAILABLE);
    }
    Ok(Json(json!({ "status": "ready" })))
}

/// Handle an incoming GitHub webhook: verify, parse, reconcile, report.
async fn github_webhook_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<Value>, StatusCode> {
    let event_type = headers
        .get("X-GitHub-Event")
        .and_then(|v| v.to_str().ok())
        .unwrap_or("unknown");

    let delivery_id = headers
        .get("X-GitHub-Delivery")
        .and_then(|v| v.to_str().ok())
        .unwrap_or("unknown");

    info!(
        event_type = %event_type,
        delivery_id = %delivery_id,
        "Received GitHub webhook"
    );

    if let Some(secret) = &state.config.webhook_secret {
        let signature = headers
            .get("X-Hub-Signature-256")
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default();
        if !verify_webhook_signature(&body, signature, secret) {
            warn!(delivery_id = %delivery_id, "Webhook signature verification failed");
            return Err(StatusCode::UNAUTHORIZED);
        }
    }

    if event_type != "pull_request" {
        debug!(event_type = %event_type, "Ignoring non-pull_request event");
        return Ok(Json(json!({
            "status": "ignored",
            "reason": "not_pull_request_event"
        })));
    }

    let event: PullRequestEvent = serde_json::from_slice(&body).map_err(|e| {
        error!(error = %e, "Failed to parse GitHub webhook payload");
        StatusCode::BAD_REQUEST
    })?;

    let Some(token) = &state.config.github_token else {
        error!("GitHub token not configured");
        return Ok(Json(json!({
            "status": "error",
            "error": "GitHub token not configured"
        })));
    };

    let Some((owner, repo)) = event.repository.owner_and_repo() else {
        warn!(full_name = %event.repository.full_name, "Invalid repository full name");
        return Ok(Json(json!({
            "status": "error",
            "error": "Invalid repository full name"
        })));
    };

    let client = match GitHubClient::new(token, owner, repo) {
        Ok(client) => client,
        Err(e) => {
            error!(error = %e, "Failed to create GitHub client");
            return Ok(Json(json!({
                "status": "error",
                "error": format!("{e}")
            })));
        }
    };

    let reconciler = Reconciler::new(&client, &state.config);
    match reconciler.process(&event).await {
        Ok(outcome) => Ok(Json(outcome_response(&event, &outcome))),
        Err(e) => {
            error!(
                pr_number = event.pull_request.number,
                action = %event.action,
                error = %e,
                "Reconciliation pass failed"
            );
            Ok(Json(json!({
                "status": "error",
                "action": event.action,
                "pr_number": event.pull_request.number,
                "error": format!("{e}")
            })))
        }
    }
}

fn outcome_response(event: &PullRequestEvent, outcome: &Outcome) -> Value {
    let base = json!({
        "action": event.action,
        "pr_number": event.pull_request.number,
        "repository": event.repository.full_name,
    });
    let mut response = base;
    match outcome {
        Outcome::Skipped(reason) => {
            response["status"] = json!("ignored");
            response["reason"] = json!(reason);
        }
        Outcome::Onboarded => {
            response["status"] = json!("success");
            response["result"] = json!("onboarded");
        }
        Outcome::Reconciled {
            added,
            removed,
            multiple_checked,
        } => {
            response["status"] = json!("success");
            response["result"] = json!("reconciled");
            response["added"] = json!(added);
            response["removed"] = json!(removed);
            response["multiple_checked"] = json!(multiple_checked);
        }
        Outcome::Refreshed => {
            response["status"] = json!("success");
            response["result"] = json!("refreshed");
        }
        Outcome::Unchanged => {
            response["status"] = json!("success");
            response["result"] = json!("unchanged");
        }
    }
    response
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::{PullRequest, Repository};

    fn event() -> PullRequestEvent {
        PullRequestEvent {
            action: "labeled".to_string(),
            pull_request: PullRequest {
                number: 12,
                title: "Add widget".to_string(),
                body: None,
                labels: vec![],
            },
            repository: Repository {
                name: "widgets".to_string(),
                full_name: "acme/widgets".to_string(),
            },
            sender: None,
            label: None,
            changes: None,
        }
    }

    #[test]
    fn outcome_response_reports_reconciled_labels() {
        let outcome = Outcome::Reconciled {
            added: vec!["minor".to_string()],
            removed: vec![],
            multiple_checked: false,
        };
        let response = outcome_response(&event(), &outcome);
        assert_eq!(response["status"], "success");
        assert_eq!(response["result"], "reconciled");
        assert_eq!(response["added"][0], "minor");
        assert_eq!(response["pr_number"], 12);
    }

    #[test]
    fn outcome_response_reports_skip_reason() {
        let response = outcome_response(&event(), &Outcome::Skipped("self-authored event"));
        assert_eq!(response["status"], "ignored");
        assert_eq!(response["reason"], "self-authored event");
    }
}
