//! # Notification Formatter
//!
//! Renders a classification into the announcement posted to the room.
//! Returns nothing when there is nothing to announce; an empty-string send
//! would still show up as a message.

use crate::domain::types::Classification;

/// Render the announcement for one cycle, or `None` when both sets are
/// empty. Names appear in the order the diff engine produced them.
pub fn format(classification: &Classification, repo_name: &str) -> Option<String> {
    if classification.is_empty() {
        return None;
    }

    let mut out = format!(
        "**⟳ {} apps added, {} updated at {}**\n\n",
        classification.added.len(),
        classification.updated.len(),
        repo_name
    );

    if !classification.added.is_empty() {
        out.push_str(&format!("**Added ({})**\n", classification.added.len()));
        for app in &classification.added {
            out.push_str(&format!("* {}\n", app.name));
        }
    }
    if !classification.updated.is_empty() {
        out.push_str(&format!("**Updated ({})**\n", classification.updated.len()));
        for app in &classification.updated {
            out.push_str(&format!("* {}\n", app.name));
        }
    }

    Some(out)
}
