//! Redirect rules. Pure functions over already-fetched data; the service
//! decides what to fetch and in which order.

use std::collections::BTreeSet;

use crate::{ContentItem, CoreError, NormalizedUrl, ValidationMessage};

/// Find the first of `sources` that another item in `existing` already uses.
///
/// The item with `current_id` is skipped so an already-published redirect is
/// never reported as conflicting with itself.
pub fn source_conflict(
    current_id: &str,
    sources: &[NormalizedUrl],
    existing: &[ContentItem],
) -> Result<Option<ValidationMessage>, CoreError> {
    for other in existing.iter().filter(|i| i.id() != current_id) {
        let taken = other.source_urls()?;
        if let Some(dup) = sources.iter().find(|s| taken.contains(s)) {
            return Ok(Some(duplicate_source(dup)));
        }
    }
    Ok(None)
}

/// Normalize a target and require it to be a site-relative path.
pub fn relative_target(raw: Option<&str>) -> Result<NormalizedUrl, ValidationMessage> {
    match raw.and_then(NormalizedUrl::new) {
        Some(url) if url.is_relative() => Ok(url),
        _ => Err(ValidationMessage::error(
            "Target URL must be a relative path starting with '/'.",
        )),
    }
}

/// Require the target to be one of the published URLs.
pub fn target_published(
    target: &NormalizedUrl,
    published: &BTreeSet<NormalizedUrl>,
) -> Option<ValidationMessage> {
    if published.contains(target) {
        None
    } else {
        Some(ValidationMessage::error(format!(
            "Target URL '{}' does not exist or is not published.",
            target
        )))
    }
}

fn duplicate_source(source: &NormalizedUrl) -> ValidationMessage {
    ValidationMessage::error(format!(
        "Source URL '{}' already exists in another published redirect.",
        source
    ))
}
