//! Case-insensitive substring search over the `From` and `Subject` headers.
//!
//! Complexity: O(n) over the full index, no I/O.

use crate::error::{MboxError, Result};
use crate::index::mailbox::MailboxIndex;
use crate::model::mail::MessageRecord;

/// Maximum number of matches handed to the presentation layer.
pub const SEARCH_DISPLAY_LIMIT: usize = 100;

/// Result of a search over the full index.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchOutcome {
    /// The query as given.
    pub query: String,
    /// Indices (file order) of every matching record.
    pub matches: Vec<usize>,
}

impl SearchOutcome {
    /// True number of matches, regardless of the display cap.
    pub fn total(&self) -> usize {
        self.matches.len()
    }

    /// The first [`SEARCH_DISPLAY_LIMIT`] matches.
    pub fn displayed(&self) -> &[usize] {
        &self.matches[..self.matches.len().min(SEARCH_DISPLAY_LIMIT)]
    }

    /// Whether some matches are hidden by the display cap.
    pub fn is_truncated(&self) -> bool {
        self.matches.len() > SEARCH_DISPLAY_LIMIT
    }
}

/// Find every record whose `From` or `Subject` contains `query`, ignoring case.
///
/// Always searches the whole index, never a previous result. An empty or
/// whitespace-only query is rejected.
pub fn search(index: &MailboxIndex, query: &str) -> Result<SearchOutcome> {
    let needle = query.trim();
    if needle.is_empty() {
        return Err(MboxError::InvalidArgument(
            "search needs a non-empty query".to_string(),
        ));
    }
    let needle = needle.to_lowercase();

    let matches = index
        .records()
        .iter()
        .filter(|record| record_matches(record, &needle))
        .map(|record| record.index)
        .collect();

    Ok(SearchOutcome {
        query: query.to_string(),
        matches,
    })
}

/// `needle` must already be lowercased.
fn record_matches(record: &MessageRecord, needle: &str) -> bool {
    matches_text(record.from(), needle) || matches_text(record.subject(), needle)
}

fn matches_text(haystack: &str, needle: &str) -> bool {
    !haystack.is_empty() && haystack.to_lowercase().contains(needle)
}
