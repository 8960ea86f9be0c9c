use crate::feed::extract::extract;
use crate::feed::parser::RawEntry;

/// Placeholder used when a feed entry carries no usable title.
pub const NO_TITLE: &str = "No Title";

/// The normalized entry record handed to downstream stages.
///
/// The only value that escapes the feed pipeline. `content` is always
/// non-empty plain text; entries that extract to nothing are dropped
/// before a record is ever built.
#[derive(Debug, Clone, PartialEq)]
pub struct EntryRecord {
    /// Entry title, `"No Title"` when the feed had none
    pub title: String,
    /// Entry link, empty string when the feed had none
    pub link: String,
    /// RFC 2822 publication timestamp; absent when the feed had none
    pub published: Option<String>,
    /// Plain-text content, non-empty
    pub content: String,
}

/// Assembles an [`EntryRecord`] from a raw entry, or drops it.
///
/// Missing title and link get defaults; a missing published date stays
/// absent rather than being fabricated. Returns `None` when extraction
/// yields no content, so contentless entries never reach downstream
/// stages.
pub fn normalize(entry: &RawEntry) -> Option<EntryRecord> {
    let content = extract(entry);
    if content.is_empty() {
        tracing::debug!(title = ?entry.title, "Dropping entry with no usable content");
        return None;
    }

    let title = entry
        .title
        .as_deref()
        .filter(|t| !t.trim().is_empty())
        .unwrap_or(NO_TITLE)
        .to_string();

    Some(EntryRecord {
        title,
        link: entry.link.clone().unwrap_or_default(),
        published: entry.published.map(|dt| dt.to_rfc2822()),
        content,
    })
}
