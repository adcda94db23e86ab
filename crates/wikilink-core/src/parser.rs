//! `[[wikilink]]` extraction.
//!
//! Supported token shapes:
//!
//! | Token | title | alias | heading |
//! |-------|-------|-------|---------|
//! | `[[Title]]` | `Title` | | |
//! | `[[Title\|Alias]]` | `Title` | `Alias` | |
//! | `[[Title#Heading]]` | `Title` | | `Heading` |
//! | `[[Title#Heading\|Alias]]` | `Title` | `Alias` | `Heading` |
//!
//! The pipe split happens first; the heading split applies to the title side
//! only, so `[[A|B#C]]` has alias `B#C` and no heading.

use std::ops::Range;

use once_cell::sync::Lazy;
use regex::Regex;

use crate::models::Wikilink;

static WIKILINK_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\[\[([^\]]*?)\]\]").expect("valid wikilink regex"));

static HTML_COMMENT_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)<!--.*?-->").expect("valid comment regex"));

/// Extract every wikilink in `content`, in source order.
///
/// # Examples
///
/// ```
/// use wikilink_core::parse;
///
/// let links = parse("See [[Timeline|Project Schedule]] and [[Technical Requirements#Security]]");
/// assert_eq!(links.len(), 2);
/// assert_eq!(links[0].title, "Timeline");
/// assert_eq!(links[0].alias, "Project Schedule");
/// assert_eq!(links[1].heading, "Security");
/// ```
pub fn parse(content: &str) -> Vec<Wikilink> {
    WIKILINK_RE
        .captures_iter(content)
        .filter_map(|cap| {
            let whole = cap.get(0)?;
            let inner = cap.get(1).map(|m| m.as_str()).unwrap_or_default();
            Some(build_wikilink(whole.as_str(), inner, whole.start()))
        })
        .collect()
}

/// Like [`parse`], but skips tokens inside HTML comments.
///
/// The rewriter preserves original tokens as `<!-- [[...]] -->`; those must
/// not be picked up again on the next run.
pub fn parse_unprocessed(content: &str) -> Vec<Wikilink> {
    let comments = comment_spans(content);
    if comments.is_empty() {
        return parse(content);
    }
    parse(content)
        .into_iter()
        .filter(|link| {
            !comments
                .iter()
                .any(|span| span.start <= link.position && link.end() <= span.end)
        })
        .collect()
}

/// Byte ranges of every closed `<!-- ... -->` comment.
pub fn comment_spans(content: &str) -> Vec<Range<usize>> {
    HTML_COMMENT_RE
        .find_iter(content)
        .map(|m| m.range())
        .collect()
}

fn build_wikilink(full_match: &str, inner: &str, position: usize) -> Wikilink {
    let (title_part, alias) = match inner.split_once('|') {
        Some((title, alias)) => (title.trim(), alias.trim()),
        None => (inner, ""),
    };

    let (title, heading) = match title_part.split_once('#') {
        Some((title, heading)) => (title.trim(), heading.trim()),
        None => (title_part.trim(), ""),
    };

    Wikilink {
        full_match: full_match.to_string(),
        title: title.to_string(),
        alias: alias.to_string(),
        heading: heading.to_string(),
        position,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_alias_form() {
        let links = parse("[[Timeline|Project Schedule]]");
        assert_eq!(links.len(), 1);
        assert_eq!(links[0].title, "Timeline");
        assert_eq!(links[0].alias, "Project Schedule");
        assert_eq!(links[0].heading, "");
        assert_eq!(links[0].position, 0);
        assert_eq!(links[0].full_match, "[[Timeline|Project Schedule]]");
    }

    #[test]
    fn test_heading_form() {
        let links = parse("[[Technical Requirements#Security]]");
        assert_eq!(links.len(), 1);
        assert_eq!(links[0].title, "Technical Requirements");
        assert_eq!(links[0].heading, "Security");
        assert_eq!(links[0].alias, "");
    }

    #[test]
    fn test_heading_and_alias() {
        let links = parse("[[A#B|C]]");
        assert_eq!(links[0].title, "A");
        assert_eq!(links[0].heading, "B");
        assert_eq!(links[0].alias, "C");
    }

    #[test]
    fn test_pipe_split_happens_first() {
        let links = parse("[[A|B#C]]");
        assert_eq!(links[0].title, "A");
        assert_eq!(links[0].alias, "B#C");
        assert_eq!(links[0].heading, "");
    }

    #[test]
    fn test_order_and_positions() {
        let content = "Intro [[One]] middle [[Two|2]] and [[Three#x]] end";
        let links = parse(content);
        assert_eq!(links.len(), 3);
        let titles: Vec<&str> = links.iter().map(|l| l.title.as_str()).collect();
        assert_eq!(titles, vec!["One", "Two", "Three"]);
        for link in &links {
            assert_eq!(&content[link.position..link.end()], link.full_match);
            assert_eq!(&content[link.position..link.position + 2], "[[");
        }
        assert_eq!(links[0].position, 6);
        assert_eq!(links[1].position, 21);
    }

    #[test]
    fn test_no_tokens() {
        assert!(parse("").is_empty());
        assert!(parse("No links here, just [single] brackets").is_empty());
    }

    #[test]
    fn test_empty_title_is_still_a_token() {
        let links = parse("Empty [[]] token");
        assert_eq!(links.len(), 1);
        assert_eq!(links[0].title, "");
        assert_eq!(links[0].position, 6);
    }

    #[test]
    fn test_whitespace_is_trimmed() {
        let links = parse("[[  Research Notes | the notes ]]");
        assert_eq!(links[0].title, "Research Notes");
        assert_eq!(links[0].alias, "the notes");
    }

    #[test]
    fn test_lazy_match_stops_at_first_closing_pair() {
        let links = parse("[[A]]]] and [[B]]");
        assert_eq!(links.len(), 2);
        assert_eq!(links[0].full_match, "[[A]]");
        assert_eq!(links[1].title, "B");
    }

    #[test]
    fn test_duplicate_titles_yield_separate_tokens() {
        let links = parse("[[Same]] then [[Same]]");
        assert_eq!(links.len(), 2);
        assert_ne!(links[0].position, links[1].position);
    }

    #[test]
    fn test_multibyte_positions_are_byte_offsets() {
        let content = "Über [[Café]] ok";
        let links = parse(content);
        assert_eq!(links[0].position, "Über ".len());
        assert_eq!(&content[links[0].position..links[0].end()], "[[Café]]");
    }

    #[test]
    fn test_parse_unprocessed_skips_commented_tokens() {
        let content = "~abc123 <!-- [[Timeline]] --> and [[Research Notes]]";
        let all = parse(content);
        assert_eq!(all.len(), 2);

        let active = parse_unprocessed(content);
        assert_eq!(active.len(), 1);
        assert_eq!(active[0].title, "Research Notes");
    }

    #[test]
    fn test_comment_spans_ignore_unclosed_comment() {
        assert!(comment_spans("<!-- never closed [[A]]").is_empty());
        assert_eq!(parse_unprocessed("<!-- never closed [[A]]").len(), 1);
    }
}
