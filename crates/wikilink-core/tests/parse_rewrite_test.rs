//! End-to-end checks of parse → rewrite without any store.

use wikilink_core::{
    parse, parse_unprocessed, LinkFormat, LinkRewriter, Resolution, ResolvedLink,
};

const DEMO: &str = "# Project Overview\n\n\
This is a demo project to test the [[wikilink processor]] functionality.\n\n\
- [[Research Notes]]\n\
- [[Timeline|Project Schedule]]\n\
- See [[Technical Requirements#Security]] for security considerations\n";

fn resolve(content: &str) -> Vec<ResolvedLink> {
    parse_unprocessed(content)
        .into_iter()
        .map(|wikilink| {
            let id = wikilink.title.replace(' ', "").to_lowercase();
            ResolvedLink {
                resolution: Resolution {
                    note_id: id,
                    title: wikilink.title.clone(),
                    created: false,
                    confidence: 1.0,
                },
                wikilink,
            }
        })
        .collect()
}

#[test]
fn test_demo_note_links_are_all_found() {
    let links = parse(DEMO);
    let titles: Vec<&str> = links.iter().map(|l| l.title.as_str()).collect();
    assert_eq!(
        titles,
        vec![
            "wikilink processor",
            "Research Notes",
            "Timeline",
            "Technical Requirements"
        ]
    );
    assert!(links.windows(2).all(|w| w[0].position < w[1].position));
}

#[test]
fn test_rewritten_note_has_no_active_wikilinks() {
    let rewriter = LinkRewriter::new(LinkFormat::Internal, true);
    let rewritten = rewriter.rewrite(DEMO, &resolve(DEMO));

    assert!(rewritten.contains("~wikilinkprocessor <!-- [[wikilink processor]] -->"));
    assert!(rewritten.contains("~timeline <!-- [[Timeline|Project Schedule]] -->"));
    assert!(rewritten.starts_with("# Project Overview\n\n"));

    // Every remaining token sits inside a preserved comment.
    assert_eq!(parse(&rewritten).len(), 4);
    assert!(parse_unprocessed(&rewritten).is_empty());
}

#[test]
fn test_second_pass_is_a_noop() {
    let rewriter = LinkRewriter::new(LinkFormat::Markdown, true);
    let once = rewriter.rewrite(DEMO, &resolve(DEMO));
    let twice = rewriter.rewrite(&once, &resolve(&once));
    assert_eq!(once, twice);
}
