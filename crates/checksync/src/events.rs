//! GitHub webhook payload types for pull-request events.

use serde::Deserialize;

use crate::labels::Label;

/// GitHub `pull_request` event payload (simplified).
#[derive(Debug, Clone, Deserialize)]
pub struct PullRequestEvent {
    /// Action type (opened, edited, labeled, unlabeled, ...).
    pub action: String,
    /// Pull request details.
    pub pull_request: PullRequest,
    /// Repository info.
    pub repository: Repository,
    /// Sender (user who triggered the event).
    #[serde(default)]
    pub sender: Option<Sender>,
    /// The label involved, for labeled/unlabeled actions.
    #[serde(default)]
    pub label: Option<Label>,
    /// Previous values, for edited actions.
    #[serde(default)]
    pub changes: Option<Changes>,
}

/// GitHub pull request.
#[derive(Debug, Clone, Deserialize)]
pub struct PullRequest {
    /// PR number.
    pub number: u64,
    /// PR title.
    pub title: String,
    /// PR body/description.
    #[serde(default)]
    pub body: Option<String>,
    /// Labels on the PR at event time.
    #[serde(default)]
    pub labels: Vec<Label>,
}

/// GitHub repository.
#[derive(Debug, Clone, Deserialize)]
pub struct Repository {
    /// Repository name.
    pub name: String,
    /// Full name (owner/repo).
    pub full_name: String,
}

impl Repository {
    /// Split `full_name` into (owner, repo).
    #[must_use]
    pub fn owner_and_repo(&self) -> Option<(&str, &str)> {
        self.full_name.split_once('/')
    }
}

/// Event sender.
#[derive(Debug, Clone, Deserialize)]
pub struct Sender {
    /// User login.
    pub login: String,
}

/// Previous field values delivered with `edited` events.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Changes {
    /// Previous body, when the body was edited.
    #[serde(default)]
    pub body: Option<ChangedFrom>,
}

/// A single changed field.
#[derive(Debug, Clone, Deserialize)]
pub struct ChangedFrom {
    /// The value before the edit.
    pub from: String,
}

/// Self-authorship oracle: whether the most recent actor is this automation
/// identity. The primary feedback-loop breaker; every body rewrite the
/// service performs comes back as an `edited` event sent by this login.
#[must_use]
pub fn sent_by_app(sender: Option<&Sender>, bot_login: &str) -> bool {
    sender.is_some_and(|s| s.login == bot_login)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_labeled_payload() {
        let payload = serde_json::json!({
            "action": "labeled",
            "pull_request": {
                "number": 7,
                "title": "Add widget",
                "body": "text",
                "labels": [{ "name": "minor" }],
            },
            "repository": { "name": "widgets", "full_name": "acme/widgets" },
            "sender": { "login": "octocat" },
            "label": { "name": "minor" },
        });
        let event: PullRequestEvent = serde_json::from_value(payload).unwrap();
        assert_eq!(event.action, "labeled");
        assert_eq!(event.pull_request.number, 7);
        assert_eq!(event.label.unwrap().name, "minor");
        assert_eq!(
            event.repository.owner_and_repo(),
            Some(("acme", "widgets"))
        );
    }

    #[test]
    fn parses_edited_payload_with_previous_body() {
        let payload = serde_json::json!({
            "action": "edited",
            "pull_request": { "number": 7, "title": "Add widget", "body": "new" },
            "repository": { "name": "widgets", "full_name": "acme/widgets" },
            "changes": { "body": { "from": "old" } },
        });
        let event: PullRequestEvent = serde_json::from_value(payload).unwrap();
        let changes = event.changes.unwrap();
        assert_eq!(changes.body.unwrap().from, "old");
        assert!(event.sender.is_none());
    }

    #[test]
    fn sent_by_app_matches_login_exactly() {
        let sender = Sender {
            login: "checksync[bot]".to_string(),
        };
        assert!(sent_by_app(Some(&sender), "checksync[bot]"));
        assert!(!sent_by_app(Some(&sender), "otherbot[bot]"));
        assert!(!sent_by_app(None, "checksync[bot]"));
    }
}
