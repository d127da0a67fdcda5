//! Checklist/label reconciliation for pull requests.
//!
//! This crate keeps a machine-rendered release checklist embedded in a
//! pull-request body synchronized, in both directions, with the release
//! labels attached to that pull request:
//! - Checklist model with identity-stable items ([`checklist`])
//! - Envelope codec that owns one region of the user's document ([`envelope`])
//! - Label catalog mapper ([`labels`])
//! - Event-driven reconciliation engine with self-authored-edit suppression
//!   ([`reconcile`])
//! - Webhook payload parsing and signature verification, plus an HTTP server
//!   for the webhook surface

#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]

pub mod checklist;
pub mod config;
pub mod envelope;
pub mod error;
pub mod events;
pub mod github;
pub mod labels;
pub mod reconcile;
pub mod server;
pub mod webhooks;

pub use config::{Config, LabelSpec, LabelsConfig, ReleaseRole};
pub use error::SyncError;
pub use events::PullRequestEvent;
pub use github::GitHubClient;
pub use labels::Label;
pub use reconcile::{Outcome, Reconciler};
pub use webhooks::verify_webhook_signature;
