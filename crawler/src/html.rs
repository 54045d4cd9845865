//! Text and link extraction from HTML pages.

use lazy_static::lazy_static;
use scraper::{Html, Node, Selector};
use url::Url;

lazy_static! {
    static ref ANCHOR: Selector = Selector::parse("a[href]").expect("valid selector");
}

/// Elements whose content is never visible text.
const HIDDEN_ELEMENTS: &[&str] = &["script", "style", "noscript", "template"];

/// Visible text of `document`, one space between text nodes. Tags are dropped
/// and entities decoded by the parser.
pub fn extract_text(document: &Html) -> String {
    let mut text = String::new();
    for node in document.tree.root().descendants() {
        let Node::Text(chunk) = node.value() else {
            continue;
        };
        let hidden = node
            .ancestors()
            .any(|ancestor| matches!(ancestor.value(), Node::Element(e) if HIDDEN_ELEMENTS.contains(&e.name())));
        if !hidden {
            text.push_str(chunk);
            text.push(' ');
        }
    }
    text
}

/// Absolute http(s) targets of every `<a href>` in `document`, resolved
/// against `base`, fragments removed. Unresolvable links are left out.
pub fn extract_links(document: &Html, base: &Url) -> Vec<String> {
    let mut links = Vec::new();
    for anchor in document.select(&ANCHOR) {
        let Some(href) = anchor.value().attr("href") else {
            continue;
        };
        match base.join(href.trim()) {
            Ok(mut link) if matches!(link.scheme(), "http" | "https") => {
                link.set_fragment(None);
                links.push(link.to_string());
            }
            Ok(_) => {}
            Err(err) => tracing::trace!(href, error = %err, "dropping malformed link"),
        }
    }
    links
}

#[cfg(test)]
mod tests {
    use super::*;

    const PAGE: &str = r#"<html><head><title>Hello</title>
        <style>body { color: red; }</style>
        <script>var hidden = "secret";</script></head>
        <body><p>Cats &amp; dogs</p><a href="/b.html#top">B</a>
        <a href="https://other.example/c">C</a>
        <a href="mailto:someone@example.com">mail</a>
        <a href="http://[bad">bad</a>
        <a>no href</a></body></html>"#;

    #[test]
    fn text_skips_scripts_and_styles() {
        let text = extract_text(&Html::parse_document(PAGE));
        assert!(text.contains("Hello"));
        assert!(text.contains("Cats & dogs"));
        assert!(!text.contains("secret"));
        assert!(!text.contains("color"));
    }

    #[test]
    fn links_are_absolute_without_fragments() {
        let base = Url::parse("http://site.example/dir/a.html").unwrap();
        let links = extract_links(&Html::parse_document(PAGE), &base);
        assert_eq!(links, vec!["http://site.example/b.html", "https://other.example/c"]);
    }

    #[test]
    fn one_document_serves_text_and_links() {
        let document = Html::parse_document(PAGE);
        let base = Url::parse("http://site.example/").unwrap();
        let text = extract_text(&document);
        let links = extract_links(&document, &base);
        assert!(text.contains("Cats & dogs"));
        assert_eq!(links.len(), 2);
        assert_eq!(extract_text(&document), text);
    }
}
