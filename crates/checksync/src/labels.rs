//! Label catalog mapper: resolves configured label specifications against the
//! repository's actual catalog, creating missing entries as needed.

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::config::{LabelSpec, ReleaseRole};
use crate::error::SyncError;
use crate::github::GitHubClient;

/// A canonical named label.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Label {
    /// Canonical label name.
    pub name: String,
    /// Label color (hex, without `#`).
    #[serde(default)]
    pub color: Option<String>,
    /// Label description.
    #[serde(default)]
    pub description: Option<String>,
}

/// Resolve one configured role into a concrete label.
///
/// If the resolved name exists in the catalog, the catalog entry (with its
/// real color and description) is reused. Otherwise a new entry is registered
/// first. Idempotent: a concurrent "already exists" answer from the remote
/// catalog is success, not an error.
///
/// # Errors
///
/// Fails only on transport errors other than the already-exists case.
pub async fn populate(
    client: &GitHubClient,
    role: ReleaseRole,
    spec: &LabelSpec,
    catalog: &[Label],
) -> Result<Label, SyncError> {
    let name = spec.resolved_name(role);

    if let Some(existing) = catalog.iter().find(|label| label.name == name) {
        debug!(label = %name, "Reusing existing catalog entry");
        return Ok(existing.clone());
    }

    let candidate = Label {
        name: name.to_string(),
        color: Some(
            spec.color
                .clone()
                .unwrap_or_else(|| role.default_color().to_string()),
        ),
        description: Some(
            spec.description
                .clone()
                .unwrap_or_else(|| role.default_description().to_string()),
        ),
    };

    match client.create_label(&candidate).await {
        Ok(created) => Ok(created),
        Err(SyncError::Api { status: 422, .. }) => {
            // Lost a creation race; the entry exists now, which is all we need.
            info!(label = %name, "Label already existed in remote catalog");
            Ok(candidate)
        }
        Err(e) => Err(e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_partial_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client(server: &MockServer) -> GitHubClient {
        GitHubClient::with_base_url(&server.uri(), "test-token", "acme", "widgets").unwrap()
    }

    #[tokio::test]
    async fn populate_reuses_catalog_entry() {
        let server = MockServer::start().await;
        // No create call is mocked; reuse must not hit the API at all.
        let catalog = vec![Label {
            name: "major".to_string(),
            color: Some("ff0000".to_string()),
            description: Some("user-tuned".to_string()),
        }];

        let label = populate(
            &client(&server),
            ReleaseRole::Major,
            &LabelSpec::default(),
            &catalog,
        )
        .await
        .unwrap();

        assert_eq!(label.color.as_deref(), Some("ff0000"));
        assert_eq!(label.description.as_deref(), Some("user-tuned"));
    }

    #[tokio::test]
    async fn populate_creates_missing_entry_with_role_defaults() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/repos/acme/widgets/labels"))
            .and(body_partial_json(serde_json::json!({
                "name": "patch",
                "color": "1d76db",
            })))
            .respond_with(ResponseTemplate::new(201).set_body_json(serde_json::json!({
                "name": "patch",
                "color": "1d76db",
                "description": "Bug fix",
            })))
            .expect(1)
            .mount(&server)
            .await;

        let label = populate(&client(&server), ReleaseRole::Patch, &LabelSpec::default(), &[])
            .await
            .unwrap();
        assert_eq!(label.name, "patch");
    }

    #[tokio::test]
    async fn populate_prefers_explicit_spec_name() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/repos/acme/widgets/labels"))
            .and(body_partial_json(serde_json::json!({ "name": "breaking" })))
            .respond_with(ResponseTemplate::new(201).set_body_json(serde_json::json!({
                "name": "breaking",
                "color": "b60205",
            })))
            .mount(&server)
            .await;

        let label = populate(
            &client(&server),
            ReleaseRole::Major,
            &LabelSpec::named("breaking"),
            &[],
        )
        .await
        .unwrap();
        assert_eq!(label.name, "breaking");
    }

    #[tokio::test]
    async fn populate_treats_already_exists_as_success() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/repos/acme/widgets/labels"))
            .respond_with(ResponseTemplate::new(422).set_body_json(serde_json::json!({
                "message": "Validation Failed",
                "errors": [{ "code": "already_exists" }],
            })))
            .mount(&server)
            .await;

        let label = populate(&client(&server), ReleaseRole::Minor, &LabelSpec::default(), &[])
            .await
            .unwrap();
        assert_eq!(label.name, "minor");
    }

    #[tokio::test]
    async fn populate_propagates_transport_failures() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/repos/acme/widgets/labels"))
            .respond_with(ResponseTemplate::new(500).set_body_json(serde_json::json!({
                "message": "boom",
            })))
            .mount(&server)
            .await;

        let err = populate(&client(&server), ReleaseRole::Minor, &LabelSpec::default(), &[])
            .await
            .unwrap_err();
        assert!(matches!(err, SyncError::Api { status: 500, .. }));
    }
}
