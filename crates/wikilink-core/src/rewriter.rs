//! Replacement of resolved wikilinks with Trilium link syntax.

use crate::config::{LinkFormat, ProcessorConfig};
use crate::models::ResolvedLink;

/// Rewrites resolved wikilink spans in note content.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LinkRewriter {
    pub format: LinkFormat,
    pub preserve_original: bool,
}

impl LinkRewriter {
    pub fn new(format: LinkFormat, preserve_original: bool) -> Self {
        Self {
            format,
            preserve_original,
        }
    }

    pub fn from_config(config: &ProcessorConfig) -> Self {
        Self::new(config.link_format, config.preserve_original_text)
    }

    /// Text that replaces one wikilink token.
    pub fn replacement(&self, link: &ResolvedLink) -> String {
        let note_id = &link.resolution.note_id;
        let mut out = match self.format {
            LinkFormat::Internal => format!("~{note_id}"),
            LinkFormat::Markdown => {
                format!("[{}](~{note_id})", link.wikilink.display_text())
            }
        };
        if self.preserve_original {
            out.push_str(" <!-- ");
            out.push_str(&link.wikilink.full_match.replace("-->", "--&gt;"));
            out.push_str(" -->");
        }
        out
    }

    /// Apply every resolution to `content`, returning the new text.
    ///
    /// Replacements are applied from the highest position down so earlier
    /// offsets stay valid. Links whose recorded span no longer matches the
    /// content are left untouched.
    pub fn rewrite(&self, content: &str, resolutions: &[ResolvedLink]) -> String {
        if resolutions.is_empty() {
            return content.to_string();
        }

        let mut ordered: Vec<&ResolvedLink> = resolutions.iter().collect();
        ordered.sort_by(|a, b| b.wikilink.position.cmp(&a.wikilink.position));

        let mut output = content.to_string();
        for link in ordered {
            let start = link.wikilink.position;
            let end = link.wikilink.end();
            if output.get(start..end) != Some(link.wikilink.full_match.as_str()) {
                tracing::warn!(
                    position = start,
                    wikilink = %link.wikilink.full_match,
                    "Wikilink span does not match content, skipping replacement"
                );
                continue;
            }
            output.replace_range(start..end, &self.replacement(link));
        }
        output
    }
}

/// Convenience wrapper building a [`LinkRewriter`] from the run configuration.
pub fn rewrite(content: &str, resolutions: &[ResolvedLink], config: &ProcessorConfig) -> String {
    LinkRewriter::from_config(config).rewrite(content, resolutions)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Resolution;
    use crate::parser::parse;

    fn resolve_all(content: &str, ids: &[&str]) -> Vec<ResolvedLink> {
        parse(content)
            .into_iter()
            .zip(ids)
            .map(|(wikilink, id)| ResolvedLink {
                resolution: Resolution {
                    note_id: id.to_string(),
                    title: wikilink.title.clone(),
                    created: false,
                    confidence: 1.0,
                },
                wikilink,
            })
            .collect()
    }

    const THREE_LINKS: &str = "Start [[Alpha]] mid [[Beta|B]] then [[Gamma#H]] end";

    #[test]
    fn test_internal_format_three_links() {
        let resolutions = resolve_all(THREE_LINKS, &["a1", "b2", "g3"]);
        let rewriter = LinkRewriter::new(LinkFormat::Internal, false);
        assert_eq!(
            rewriter.rewrite(THREE_LINKS, &resolutions),
            "Start ~a1 mid ~b2 then ~g3 end"
        );
    }

    #[test]
    fn test_markdown_format_with_preserved_original() {
        let resolutions = resolve_all(THREE_LINKS, &["a1", "b2", "g3"]);
        let rewriter = LinkRewriter::new(LinkFormat::Markdown, true);
        assert_eq!(
            rewriter.rewrite(THREE_LINKS, &resolutions),
            "Start [Alpha](~a1) <!-- [[Alpha]] --> mid [B](~b2) <!-- [[Beta|B]] --> \
             then [Gamma](~g3) <!-- [[Gamma#H]] --> end"
        );
    }

    #[test]
    fn test_internal_format_with_preserved_original() {
        let content = "See [[Timeline|Project Schedule]].";
        let resolutions = resolve_all(content, &["tl1"]);
        let rewriter = LinkRewriter::new(LinkFormat::Internal, true);
        assert_eq!(
            rewriter.rewrite(content, &resolutions),
            "See ~tl1 <!-- [[Timeline|Project Schedule]] -->."
        );
    }

    #[test]
    fn test_order_of_input_does_not_matter() {
        let mut resolutions = resolve_all(THREE_LINKS, &["a1", "b2", "g3"]);
        resolutions.reverse();
        resolutions.swap(0, 1);
        let rewriter = LinkRewriter::new(LinkFormat::Internal, false);
        assert_eq!(
            rewriter.rewrite(THREE_LINKS, &resolutions),
            "Start ~a1 mid ~b2 then ~g3 end"
        );
    }

    #[test]
    fn test_partial_resolutions_leave_other_links() {
        let all = resolve_all(THREE_LINKS, &["a1", "b2", "g3"]);
        let only_middle = vec![all[1].clone()];
        let rewriter = LinkRewriter::new(LinkFormat::Internal, false);
        assert_eq!(
            rewriter.rewrite(THREE_LINKS, &only_middle),
            "Start [[Alpha]] mid ~b2 then [[Gamma#H]] end"
        );
    }

    #[test]
    fn test_empty_resolutions_is_identity() {
        let rewriter = LinkRewriter::new(LinkFormat::Markdown, true);
        assert_eq!(rewriter.rewrite(THREE_LINKS, &[]), THREE_LINKS);
    }

    #[test]
    fn test_stale_span_is_skipped() {
        let resolutions = resolve_all("[[Alpha]]", &["a1"]);
        let rewriter = LinkRewriter::new(LinkFormat::Internal, false);
        assert_eq!(rewriter.rewrite("changed text", &resolutions), "changed text");
    }

    #[test]
    fn test_multibyte_content() {
        let content = "Notizen über [[Café]] und [[Straße|Weg]]";
        let resolutions = resolve_all(content, &["c1", "s2"]);
        let rewriter = LinkRewriter::new(LinkFormat::Markdown, false);
        assert_eq!(
            rewriter.rewrite(content, &resolutions),
            "Notizen über [Café](~c1) und [Weg](~s2)"
        );
    }

    #[test]
    fn test_rewrite_uses_config() {
        let content = "[[Alpha]]";
        let resolutions = resolve_all(content, &["a1"]);
        let config = ProcessorConfig {
            preserve_original_text: false,
            ..Default::default()
        };
        assert_eq!(rewrite(content, &resolutions, &config), "~a1");
    }
}
