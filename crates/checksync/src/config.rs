//! Configuration for the checksync service.

use serde::{Deserialize, Serialize};
use std::env;

/// Webhook service configuration.
#[derive(Clone)]
pub struct Config {
    /// HTTP server port.
    pub port: u16,
    /// Webhook signing secret for signature verification.
    pub webhook_secret: Option<String>,
    /// GitHub token for API calls.
    pub github_token: Option<String>,
    /// Login of the automation identity. Events sent by this login are
    /// self-authored and must never be acted on.
    pub bot_login: String,
    /// Checklist namespace embedded in rendered markers. Only checklists in
    /// this namespace are recognized when parsing a document.
    pub namespace: String,
    /// Release label specifications.
    pub labels: LabelsConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            port: env::var("CHECKSYNC_PORT")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(8082),
            webhook_secret: env::var("CHECKSYNC_WEBHOOK_SECRET")
                .ok()
                .filter(|s| !s.is_empty()),
            github_token: env::var("GITHUB_TOKEN").ok(),
            bot_login: env::var("CHECKSYNC_BOT_LOGIN")
                .unwrap_or_else(|_| "checksync[bot]".to_string()),
            namespace: env::var("CHECKSYNC_NAMESPACE").unwrap_or_else(|_| "checksync".to_string()),
            labels: LabelsConfig::default(),
        }
    }
}

/// Semantic role of a release label.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ReleaseRole {
    /// Breaking change.
    Major,
    /// New functionality.
    Minor,
    /// Bug fix.
    Patch,
    /// Suppress the release entirely.
    SkipRelease,
}

impl ReleaseRole {
    /// The three mutually-exclusive version-bump roles.
    pub const SEMVER: [ReleaseRole; 3] = [ReleaseRole::Major, ReleaseRole::Minor, ReleaseRole::Patch];

    /// Label name used when the configuration gives no explicit name.
    #[must_use]
    pub fn default_name(self) -> &'static str {
        match self {
            ReleaseRole::Major => "major",
            ReleaseRole::Minor => "minor",
            ReleaseRole::Patch => "patch",
            ReleaseRole::SkipRelease => "skip-release",
        }
    }

    /// Default description for a newly created catalog entry.
    #[must_use]
    pub fn default_description(self) -> &'static str {
        match self {
            ReleaseRole::Major => "Breaking change",
            ReleaseRole::Minor => "New feature",
            ReleaseRole::Patch => "Bug fix",
            ReleaseRole::SkipRelease => "Do not create a release",
        }
    }

    /// Default color (hex, without `#`) for a newly created catalog entry.
    #[must_use]
    pub fn default_color(self) -> &'static str {
        match self {
            ReleaseRole::Major => "b60205",
            ReleaseRole::Minor => "0e8a16",
            ReleaseRole::Patch => "1d76db",
            ReleaseRole::SkipRelease => "cccccc",
        }
    }
}

/// Specification for one label, as configured. Unset fields fall back to the
/// role defaults when the label has to be created.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct LabelSpec {
    /// Explicit label name. `None` derives the name from the role.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Label description.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Label color (hex, without `#`).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
}

impl LabelSpec {
    /// Spec with only an explicit name set.
    #[must_use]
    pub fn named(name: &str) -> Self {
        Self {
            name: Some(name.to_string()),
            ..Self::default()
        }
    }

    /// Name this spec resolves to for the given role.
    #[must_use]
    pub fn resolved_name(&self, role: ReleaseRole) -> &str {
        self.name.as_deref().unwrap_or_else(|| role.default_name())
    }
}

/// Per-role label specifications plus any extra skip-release labels.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct LabelsConfig {
    /// Breaking-change label.
    pub major: LabelSpec,
    /// Feature label.
    pub minor: LabelSpec,
    /// Fix label.
    pub patch: LabelSpec,
    /// Primary skip-release label.
    pub skip_release: LabelSpec,
    /// Additional labels that also suppress a release. These always carry
    /// explicit names.
    pub extra_skip: Vec<LabelSpec>,
}

impl Default for LabelsConfig {
    fn default() -> Self {
        Self {
            major: spec_from_env("CHECKSYNC_LABEL_MAJOR"),
            minor: spec_from_env("CHECKSYNC_LABEL_MINOR"),
            patch: spec_from_env("CHECKSYNC_LABEL_PATCH"),
            skip_release: spec_from_env("CHECKSYNC_LABEL_SKIP"),
            extra_skip: env::var("CHECKSYNC_EXTRA_SKIP_LABELS")
                .ok()
                .map(|s| {
                    s.split(',')
                        .map(str::trim)
                        .filter(|n| !n.is_empty())
                        .map(LabelSpec::named)
                        .collect()
                })
                .unwrap_or_default(),
        }
    }
}

fn spec_from_env(var: &str) -> LabelSpec {
    env::var(var)
        .ok()
        .filter(|s| !s.is_empty())
        .map(|name| LabelSpec::named(&name))
        .unwrap_or_default()
}

impl LabelsConfig {
    /// Spec configured for a role.
    #[must_use]
    pub fn spec(&self, role: ReleaseRole) -> &LabelSpec {
        match role {
            ReleaseRole::Major => &self.major,
            ReleaseRole::Minor => &self.minor,
            ReleaseRole::Patch => &self.patch,
            ReleaseRole::SkipRelease => &self.skip_release,
        }
    }

    /// Resolved name for a role.
    #[must_use]
    pub fn name(&self, role: ReleaseRole) -> &str {
        self.spec(role).resolved_name(role)
    }

    /// Every label name this configuration can attach: the four role labels
    /// plus the extra skip labels. Any of these counts as a release
    /// classification already being present.
    #[must_use]
    pub fn all_names(&self) -> Vec<&str> {
        let mut names = vec![
            self.name(ReleaseRole::Major),
            self.name(ReleaseRole::Minor),
            self.name(ReleaseRole::Patch),
            self.name(ReleaseRole::SkipRelease),
        ];
        for spec in &self.extra_skip {
            names.push(spec.resolved_name(ReleaseRole::SkipRelease));
        }
        names
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    // Use a mutex to serialize tests that modify environment variables
    static ENV_MUTEX: Mutex<()> = Mutex::new(());

    #[test]
    fn test_default_config() {
        let _lock = ENV_MUTEX.lock().unwrap();

        env::remove_var("CHECKSYNC_PORT");
        env::remove_var("CHECKSYNC_WEBHOOK_SECRET");
        env::remove_var("CHECKSYNC_BOT_LOGIN");
        env::remove_var("CHECKSYNC_NAMESPACE");

        let config = Config::default();
        assert_eq!(config.port, 8082);
        assert!(config.webhook_secret.is_none());
        assert_eq!(config.bot_login, "checksync[bot]");
        assert_eq!(config.namespace, "checksync");
    }

    #[test]
    fn test_config_from_env() {
        let _lock = ENV_MUTEX.lock().unwrap();

        env::set_var("CHECKSYNC_PORT", "9000");
        env::set_var("CHECKSYNC_WEBHOOK_SECRET", "test-secret");
        env::set_var("CHECKSYNC_BOT_LOGIN", "release-butler[bot]");

        let config = Config::default();
        assert_eq!(config.port, 9000);
        assert_eq!(config.webhook_secret, Some("test-secret".to_string()));
        assert_eq!(config.bot_login, "release-butler[bot]");

        env::remove_var("CHECKSYNC_PORT");
        env::remove_var("CHECKSYNC_WEBHOOK_SECRET");
        env::remove_var("CHECKSYNC_BOT_LOGIN");
    }

    #[test]
    fn test_role_default_names() {
        assert_eq!(ReleaseRole::Major.default_name(), "major");
        assert_eq!(ReleaseRole::SkipRelease.default_name(), "skip-release");
    }

    #[test]
    fn test_resolved_name_prefers_explicit() {
        let spec = LabelSpec::named("breaking");
        assert_eq!(spec.resolved_name(ReleaseRole::Major), "breaking");

        let unnamed = LabelSpec::default();
        assert_eq!(unnamed.resolved_name(ReleaseRole::Major), "major");
    }

    #[test]
    fn test_extra_skip_labels_from_env() {
        let _lock = ENV_MUTEX.lock().unwrap();

        env::set_var("CHECKSYNC_EXTRA_SKIP_LABELS", "docs-only, chore");
        let labels = LabelsConfig::default();
        assert_eq!(
            labels.extra_skip,
            vec![LabelSpec::named("docs-only"), LabelSpec::named("chore")]
        );
        assert!(labels.all_names().contains(&"docs-only"));
        env::remove_var("CHECKSYNC_EXTRA_SKIP_LABELS");
    }

    #[test]
    fn test_all_names_covers_roles() {
        let _lock = ENV_MUTEX.lock().unwrap();
        env::remove_var("CHECKSYNC_EXTRA_SKIP_LABELS");
        env::remove_var("CHECKSYNC_LABEL_MAJOR");

        let labels = LabelsConfig::default();
        assert_eq!(
            labels.all_names(),
            vec!["major", "minor", "patch", "skip-release"]
        );
    }
}
