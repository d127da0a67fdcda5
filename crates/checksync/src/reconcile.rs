//! Reconciliation engine.
//!
//! One pass per inbound event, rebuilt from remote state every time: pull the
//! label catalog, resolve the configured labels, recompute the checklist
//! sections, diff against the previous snapshot, and issue whatever label
//! and body mutations restore agreement. No state survives between passes.

use futures::future::{try_join, try_join_all};
use std::collections::BTreeMap;
use tracing::{debug, info, warn};

use crate::checklist::{self, Checklist, ChecklistItem};
use crate::config::{Config, ReleaseRole};
use crate::envelope;
use crate::error::SyncError;
use crate::events::{sent_by_app, PullRequestEvent};
use crate::github::GitHubClient;
use crate::labels::{populate, Label};

/// Checklist key for the mutually-exclusive version-bump group.
pub const SEMVER_KEY: &str = "semver";
/// Checklist key for the skip-release group.
pub const SKIP_KEY: &str = "skip";

/// What a reconciliation pass did, for the HTTP layer to report.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// Nothing to do; the reason is logged and reported.
    Skipped(&'static str),
    /// Initial checklist appended to a fresh pull request.
    Onboarded,
    /// Checklist edit propagated to labels and the body canonicalized.
    Reconciled {
        /// Label names attached this pass.
        added: Vec<String>,
        /// Label names detached this pass.
        removed: Vec<String>,
        /// More than one box ticked in an exclusive group.
        multiple_checked: bool,
    },
    /// Label change propagated back into the embedded checklist.
    Refreshed,
    /// Labels and checklist already agreed.
    Unchanged,
}

/// Where the checked/unchecked flags of a rebuilt section come from.
enum CheckedSource<'a> {
    /// Fresh onboarding: everything unchecked.
    Initial,
    /// Flags carried over from a parsed document snapshot.
    Parsed(&'a BTreeMap<String, Checklist>),
    /// Flags derived from the labels currently attached.
    Attached(&'a [Label]),
}

struct Entry {
    label: Label,
    item: ChecklistItem,
}

struct Section {
    key: &'static str,
    title: &'static str,
    exclusive: bool,
    entries: Vec<Entry>,
}

impl Section {
    fn items(&self) -> Vec<ChecklistItem> {
        self.entries.iter().map(|entry| entry.item.clone()).collect()
    }
}

/// The per-event reconciliation engine. Holds no state across events.
pub struct Reconciler<'a> {
    client: &'a GitHubClient,
    config: &'a Config,
}

impl<'a> Reconciler<'a> {
    /// Engine over one repository client and one configuration.
    #[must_use]
    pub fn new(client: &'a GitHubClient, config: &'a Config) -> Self {
        Self { client, config }
    }

    /// Process one inbound pull-request event to completion.
    ///
    /// # Errors
    ///
    /// Propagates [`SyncError::MalformedEnvelope`] for half-marked documents,
    /// transport failures from the remote calls, and
    /// [`SyncError::Aggregated`] when independent mutations of an `edited`
    /// pass fail.
    pub async fn process(&self, event: &PullRequestEvent) -> Result<Outcome, SyncError> {
        match event.action.as_str() {
            "opened" => self.onboard(event).await,
            "edited" | "labeled" | "unlabeled" => {
                if sent_by_app(event.sender.as_ref(), &self.config.bot_login) {
                    debug!(
                        pr_number = event.pull_request.number,
                        "Event was self-authored; suppressing to break the feedback loop"
                    );
                    return Ok(Outcome::Skipped("self-authored event"));
                }
                if event.action == "edited" {
                    self.reconcile_edit(event).await
                } else {
                    self.refresh_from_labels(event).await
                }
            }
            _ => {
                debug!(action = %event.action, "Ignoring unhandled action");
                Ok(Outcome::Skipped("unhandled action"))
            }
        }
    }

    /// `opened`: append an unchecked checklist envelope, unless the pull
    /// request already carries a release classification or an envelope.
    async fn onboard(&self, event: &PullRequestEvent) -> Result<Outcome, SyncError> {
        let number = event.pull_request.number;
        let body = event.pull_request.body.as_deref().unwrap_or_default();
        // At most one engine-owned region per document, even on redelivery.
        if envelope::has_envelope(body)? {
            debug!(pr_number = number, "Envelope already present; skipping onboarding");
            return Ok(Outcome::Skipped("already onboarded"));
        }

        let attached = self.client.pull_request_labels(number).await?;
        let known = self.config.labels.all_names();
        if attached.iter().any(|label| known.contains(&label.name.as_str())) {
            info!(
                pr_number = number,
                "Release label already present; skipping onboarding"
            );
            return Ok(Outcome::Skipped("release label already present"));
        }

        let sections = self.build_sections(&CheckedSource::Initial).await?;
        let message = self.render_message(&sections);

        let new_body = if body.trim().is_empty() {
            envelope::wrap(&message)
        } else {
            format!("{body}\n\n{}", envelope::wrap(&message))
        };
        self.client.update_body(number, &new_body).await?;

        info!(pr_number = number, "Onboarded pull request with release checklist");
        Ok(Outcome::Onboarded)
    }

    /// `edited`: the checklist is the source of truth. Diff the parsed
    /// checkboxes against the previous snapshot, mutate labels accordingly,
    /// and always canonicalize the embedded message.
    async fn reconcile_edit(&self, event: &PullRequestEvent) -> Result<Outcome, SyncError> {
        let number = event.pull_request.number;
        let body = event.pull_request.body.as_deref().unwrap_or_default();
        if !envelope::has_envelope(body)? {
            return Ok(Outcome::Skipped("no envelope"));
        }

        let Some(prior) = event.changes.as_ref().and_then(|c| c.body.as_ref()) else {
            return Ok(Outcome::Skipped("body unchanged"));
        };
        let prior_body = prior.from.as_str();
        if prior_body == body {
            return Ok(Outcome::Skipped("body unchanged"));
        }

        let embedded = envelope::extract(body)?;
        if envelope::extract(prior_body).ok() == Some(embedded) {
            // Only user-owned text moved; the envelope is untouched.
            return Ok(Outcome::Skipped("embedded message unchanged"));
        }

        let parsed_now = checklist::parse(body, &self.config.namespace);
        let parsed_prior = checklist::parse(prior_body, &self.config.namespace);
        let sections = self.build_sections(&CheckedSource::Parsed(&parsed_now)).await?;
        self.log_unresolved_items(&parsed_now, &sections);

        let mut multiple_checked = false;
        for section in &sections {
            if section.exclusive && checklist::more_than_one_checked(&section.items()) {
                warn!(
                    pr_number = number,
                    key = section.key,
                    "More than one box checked in an exclusive group"
                );
                multiple_checked = true;
            }
        }

        let mut to_add = Vec::new();
        let mut to_remove = Vec::new();
        for section in &sections {
            for entry in &section.entries {
                let was = parsed_prior
                    .get(section.key)
                    .is_some_and(|cl| cl.is_checked(&entry.item.id));
                let now = entry.item.checked;
                if now && !was {
                    to_add.push(entry.label.name.clone());
                } else if was && !now {
                    to_remove.push(entry.label.name.clone());
                }
            }
        }

        let message = self.render_message(&sections);
        let new_body = envelope::splice(body, &message)?;

        // Attempt everything, report everything: the label mutations run
        // independently of each other and the body rewrite runs last no
        // matter how they fared.
        let (add_res, remove_res) = tokio::join!(
            self.client.add_labels(number, &to_add),
            self.client.remove_labels(number, &to_remove),
        );
        let body_res = self.client.update_body(number, &new_body).await;

        let failures: Vec<SyncError> = [add_res, remove_res, body_res]
            .into_iter()
            .filter_map(Result::err)
            .collect();
        SyncError::aggregate(3, failures)?;

        info!(
            pr_number = number,
            added = to_add.len(),
            removed = to_remove.len(),
            "Reconciled checklist edit into labels"
        );
        Ok(Outcome::Reconciled {
            added: to_add,
            removed: to_remove,
            multiple_checked,
        })
    }

    /// `labeled`/`unlabeled`: the attached labels are the source of truth.
    /// Rewrite the embedded checklist to match them; no label mutation here.
    async fn refresh_from_labels(&self, event: &PullRequestEvent) -> Result<Outcome, SyncError> {
        let number = event.pull_request.number;
        let body = event.pull_request.body.as_deref().unwrap_or_default();
        if !envelope::has_envelope(body)? {
            return Ok(Outcome::Skipped("no envelope"));
        }

        let attached = self.client.pull_request_labels(number).await?;
        let sections = self.build_sections(&CheckedSource::Attached(&attached)).await?;
        let message = self.render_message(&sections);

        if envelope::extract(body)? == envelope::inner(&message) {
            debug!(pr_number = number, "Embedded checklist already matches labels");
            return Ok(Outcome::Unchanged);
        }

        let new_body = envelope::splice(body, &message)?;
        self.client.update_body(number, &new_body).await?;

        info!(pr_number = number, "Refreshed embedded checklist from labels");
        Ok(Outcome::Refreshed)
    }

    /// Rebuild both checklist sections from configuration and the remote
    /// catalog. Per-role label population is issued concurrently; the roles
    /// are independent.
    async fn build_sections(&self, source: &CheckedSource<'_>) -> Result<Vec<Section>, SyncError> {
        let catalog = self.client.list_repo_labels().await?;
        let labels_cfg = &self.config.labels;

        let semver_futures = ReleaseRole::SEMVER
            .iter()
            .map(|&role| populate(self.client, role, labels_cfg.spec(role), &catalog));

        let skip_futures = std::iter::once(labels_cfg.spec(ReleaseRole::SkipRelease))
            .chain(labels_cfg.extra_skip.iter())
            .map(|spec| populate(self.client, ReleaseRole::SkipRelease, spec, &catalog));

        let (semver_labels, skip_labels) =
            try_join(try_join_all(semver_futures), try_join_all(skip_futures)).await?;

        Ok(vec![
            Self::section(SEMVER_KEY, "Release classification", true, semver_labels, source),
            Self::section(SKIP_KEY, "Skip release", false, skip_labels, source),
        ])
    }

    fn section(
        key: &'static str,
        title: &'static str,
        exclusive: bool,
        labels: Vec<Label>,
        source: &CheckedSource<'_>,
    ) -> Section {
        let entries = labels
            .into_iter()
            .map(|label| {
                let id = checklist::fingerprint(&label.name);
                let checked = match source {
                    CheckedSource::Initial => false,
                    CheckedSource::Parsed(parsed) => parsed
                        .get(key)
                        .is_some_and(|checklist| checklist.is_checked(&id)),
                    CheckedSource::Attached(attached) => {
                        attached.iter().any(|attached| attached.name == label.name)
                    }
                };
                let body = match &label.description {
                    Some(description) if !description.is_empty() => {
                        format!("**{}**: {description}", label.name)
                    }
                    _ => format!("**{}**", label.name),
                };
                Entry {
                    item: ChecklistItem { id, checked, body },
                    label,
                }
            })
            .collect();

        Section {
            key,
            title,
            exclusive,
            entries,
        }
    }

    fn render_message(&self, sections: &[Section]) -> String {
        sections
            .iter()
            .map(|section| {
                checklist::render(
                    &self.config.namespace,
                    section.key,
                    section.title,
                    &section.items(),
                )
            })
            .collect::<Vec<_>>()
            .join("\n\n")
    }

    /// Checklist items whose fingerprint matches no configured label cannot
    /// drive a mutation; they degrade to a diagnostic and are omitted.
    fn log_unresolved_items(&self, parsed: &BTreeMap<String, Checklist>, sections: &[Section]) {
        for (key, checklist) in parsed {
            let Some(section) = sections.iter().find(|section| section.key == key.as_str()) else {
                debug!(key = %key, "Parsed checklist has no configured section");
                continue;
            };
            for item in &checklist.items {
                if !section.entries.iter().any(|entry| entry.item.id == item.id) {
                    debug!(
                        id = %item.id,
                        key = %key,
                        "Checklist item matches no configured label; omitting from mutation set"
                    );
                }
            }
        }
    }
}
