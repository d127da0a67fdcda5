//! Checklist model: namespaced, identity-stable checkbox items rendered into
//! and parsed back out of markdown.
//!
//! Item identity is a content fingerprint of the canonical label name, never
//! a position, so reordering labels in configuration does not break identity.
//! The fingerprint travels inside an HTML comment next to the visible text,
//! which lets [`parse`] recover `(id, checked)` from any render even after
//! the visible body text changed.

use regex::Regex;
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use std::sync::OnceLock;
use tracing::debug;

/// One selectable line of a checklist.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChecklistItem {
    /// Stable fingerprint of the underlying label's canonical name.
    pub id: String,
    /// Whether the box is ticked.
    pub checked: bool,
    /// Visible markdown for the line.
    pub body: String,
}

/// An ordered group of checklist items under one key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Checklist {
    /// Checklist key within the namespace (e.g. `semver`, `skip`).
    pub key: String,
    /// Items in render order. Ids are unique within one checklist.
    pub items: Vec<ChecklistItem>,
}

impl Checklist {
    /// Whether the item with the given id is checked. Unknown ids are
    /// unchecked.
    #[must_use]
    pub fn is_checked(&self, id: &str) -> bool {
        self.items.iter().any(|item| item.id == id && item.checked)
    }
}

/// Stable fingerprint for a label name: truncated hex SHA-256 of the
/// canonical name. Part of the data model, not a rendering detail.
#[must_use]
pub fn fingerprint(name: &str) -> String {
    let digest = Sha256::digest(name.as_bytes());
    let mut out = hex::encode(digest);
    out.truncate(12);
    out
}

/// Render one checklist as markdown. Deterministic: the same items always
/// produce the same text.
#[must_use]
pub fn render(namespace: &str, key: &str, title: &str, items: &[ChecklistItem]) -> String {
    let mut lines = Vec::with_capacity(items.len() + 1);
    lines.push(format!("**{title}** <!-- {namespace}:{key} -->"));
    for item in items {
        let mark = if item.checked { "x" } else { " " };
        lines.push(format!(
            "- [{mark}] {} <!-- {namespace}:{key}:item:{} -->",
            item.body, item.id
        ));
    }
    lines.join("\n")
}

fn item_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(
            r"(?m)^\s*[-*]\s*\[([ xX])\]\s*(.*?)\s*<!--\s*([A-Za-z0-9_-]+):([A-Za-z0-9_-]+):item:([0-9a-f]+)\s*-->\s*$",
        )
        .expect("static checklist item pattern")
    })
}

/// Parse every checklist in the given namespace out of a markdown document.
///
/// Tolerant by design: a document with no checklist yields an empty map,
/// checklists in other namespaces are ignored, and malformed lines are
/// skipped rather than fatal.
#[must_use]
pub fn parse(markdown: &str, namespace: &str) -> BTreeMap<String, Checklist> {
    let mut checklists: BTreeMap<String, Checklist> = BTreeMap::new();

    for caps in item_pattern().captures_iter(markdown) {
        let ns = &caps[3];
        if ns != namespace {
            continue;
        }
        let key = caps[4].to_string();
        let item = ChecklistItem {
            id: caps[5].to_string(),
            checked: &caps[1] != " ",
            body: caps[2].to_string(),
        };

        let checklist = checklists.entry(key.clone()).or_insert_with(|| Checklist {
            key,
            items: Vec::new(),
        });
        if checklist.items.iter().any(|existing| existing.id == item.id) {
            // Duplicate identity inside one checklist; first occurrence wins.
            debug!(id = %item.id, key = %checklist.key, "Skipping duplicate checklist item");
            continue;
        }
        checklist.items.push(item);
    }

    checklists
}

/// Soft mutual-exclusion check: more than one box ticked in a group that is
/// supposed to hold exactly one.
#[must_use]
pub fn more_than_one_checked(items: &[ChecklistItem]) -> bool {
    items.iter().filter(|item| item.checked).count() > 1
}
