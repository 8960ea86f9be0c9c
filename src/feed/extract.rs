use crate::feed::parser::RawEntry;
use scraper::Html;

/// Selects the best available content field of an entry and reduces it to
/// plain text.
///
/// Field priority, first present wins:
///
/// 1. first structured content block
/// 2. summary
/// 3. description
///
/// Returns an empty string when no field is present — extraction never
/// fails, so one malformed entry can never abort a batch.
pub fn extract(entry: &RawEntry) -> String {
    let raw = entry
        .content_blocks
        .first()
        .map(String::as_str)
        .or(entry.summary.as_deref())
        .or(entry.description.as_deref());

    match raw {
        Some(markup) => strip_markup(markup),
        None => String::new(),
    }
}

/// Strips markup from `raw`, returning whitespace-normalized plain text.
///
/// Tags are dropped, entities decoded, text nodes joined by single spaces,
/// and whitespace runs collapsed. Idempotent: already-plain text passes
/// through unchanged apart from that collapsing.
pub fn strip_markup(raw: &str) -> String {
    let fragment = Html::parse_fragment(raw);
    let joined = fragment
        .root_element()
        .text()
        .collect::<Vec<_>>()
        .join(" ");

    // Collapse runs of whitespace (including newlines between text nodes)
    // into single spaces; this also trims both ends.
    joined.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn entry_with(
        content: Option<&str>,
        summary: Option<&str>,
        description: Option<&str>,
    ) -> RawEntry {
        RawEntry {
            content_blocks: content.map(|c| vec![c.to_string()]).unwrap_or_default(),
            summary: summary.map(str::to_string),
            description: description.map(str::to_string),
            ..RawEntry::default()
        }
    }

    #[test]
    fn test_content_block_preferred_over_summary_and_description() {
        let entry = entry_with(
            Some("<p>full body</p>"),
            Some("the summary"),
            Some("the description"),
        );
        assert_eq!(extract(&entry), "full body");
    }

    #[test]
    fn test_summary_preferred_over_description() {
        let entry = entry_with(None, Some("the summary"), Some("the description"));
        assert_eq!(extract(&entry), "the summary");
    }

    #[test]
    fn test_description_used_last() {
        let entry = entry_with(None, None, Some("the description"));
        assert_eq!(extract(&entry), "the description");
    }

    #[test]
    fn test_no_fields_yields_empty() {
        let entry = entry_with(None, None, None);
        assert_eq!(extract(&entry), "");
    }

    #[test]
    fn test_strip_tags_and_join_with_spaces() {
        let html = "<div><h1>Title</h1><p>First para.</p><p>Second para.</p></div>";
        assert_eq!(strip_markup(html), "Title First para. Second para.");
    }

    #[test]
    fn test_entities_decoded() {
        assert_eq!(strip_markup("Hi &amp; bye"), "Hi & bye");
        assert_eq!(strip_markup("<p>1 &lt; 2</p>"), "1 < 2");
    }

    #[test]
    fn test_nested_markup() {
        let html = "<p>a <b>bold <i>and italic</i></b> word</p>";
        assert_eq!(strip_markup(html), "a bold and italic word");
    }

    #[test]
    fn test_whitespace_collapsed_and_trimmed() {
        assert_eq!(strip_markup("  spaced \n\n  out  "), "spaced out");
    }

    #[test]
    fn test_plain_text_unchanged() {
        assert_eq!(strip_markup("already plain text"), "already plain text");
    }

    #[test]
    fn test_idempotent_on_stripped_output() {
        let html = "<p>Hello &amp; <b>world</b></p>";
        let once = strip_markup(html);
        assert_eq!(strip_markup(&once), once);
    }

    #[test]
    fn test_markup_only_yields_empty() {
        assert_eq!(strip_markup("<div><img src=\"x.png\"/></div>"), "");
    }

    proptest! {
        // Plain text free of markup metacharacters must survive a strip
        // pass, and a second pass must be a fixpoint.
        #[test]
        fn strip_markup_idempotent(s in "[a-zA-Z0-9 ,.!?'-]{0,120}") {
            let once = strip_markup(&s);
            let twice = strip_markup(&once);
            prop_assert_eq!(once, twice);
        }
    }
}
