//! Message envelope codec.
//!
//! The pull-request body is user-owned except for exactly one region
//! delimited by the start/end markers below. Everything this service writes
//! goes between the markers; bytes outside the region are preserved exactly.

use crate::error::SyncError;

/// Opening sentinel of the engine-owned region.
pub const START_MARKER: &str = "<!-- checksync:start -->";
/// Closing sentinel of the engine-owned region.
pub const END_MARKER: &str = "<!-- checksync:end -->";

const BOILERPLATE: &str =
    "_This section is maintained by checksync. Tick a box below or attach the matching label; the two are kept in sync._";

/// The text that sits strictly between the markers for the given content.
#[must_use]
pub fn inner(content: &str) -> String {
    format!("\n{BOILERPLATE}\n\n{content}\n")
}

/// Wrap content in a complete envelope: markers, boilerplate, content.
#[must_use]
pub fn wrap(content: &str) -> String {
    format!("{START_MARKER}{}{END_MARKER}", inner(content))
}

/// Locate the envelope in a document. Returns the byte offsets of the start
/// marker and of the end marker that follows it.
fn locate(document: &str) -> Result<(usize, usize), SyncError> {
    let start = document
        .find(START_MARKER)
        .ok_or(SyncError::MalformedEnvelope("missing start marker"))?;
    let after_start = start + START_MARKER.len();
    let end_rel = document[after_start..]
        .find(END_MARKER)
        .ok_or(SyncError::MalformedEnvelope("missing end marker"))?;
    Ok((start, after_start + end_rel))
}

/// Whether the document contains an envelope.
///
/// # Errors
///
/// A document with one marker but not the other is malformed; the engine
/// refuses to guess region boundaries and propagates the error instead.
pub fn has_envelope(document: &str) -> Result<bool, SyncError> {
    match locate(document) {
        Ok(_) => Ok(true),
        Err(_) if !document.contains(START_MARKER) && !document.contains(END_MARKER) => Ok(false),
        Err(e) => Err(e),
    }
}

/// The substring strictly between the first start marker and the first end
/// marker after it.
///
/// # Errors
///
/// Fails with [`SyncError::MalformedEnvelope`] if either marker is absent.
/// An empty result would be indistinguishable from a legitimately empty
/// checklist, so this never degrades to `""`.
pub fn extract(document: &str) -> Result<&str, SyncError> {
    let (start, end) = locate(document)?;
    Ok(&document[start + START_MARKER.len()..end])
}

/// Replace the envelope region with `wrap(new_content)`, preserving every
/// byte before the start marker and after the end marker exactly.
///
/// # Errors
///
/// Fails with [`SyncError::MalformedEnvelope`] if either marker is absent.
pub fn splice(document: &str, new_content: &str) -> Result<String, SyncError> {
    let (start, end) = locate(document)?;
    let prefix = &document[..start];
    let suffix = &document[end + END_MARKER.len()..];
    Ok(format!("{prefix}{}{suffix}", wrap(new_content)))
}
