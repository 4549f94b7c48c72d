//! Pure extraction operations over parsed homepage and article documents.
//!
//! Two generic operations cover every language: locate the featured-article
//! block and build one item from its "read more…" anchor, or walk the
//! did-you-know list and build one item per entry. Both rewrite site-relative
//! links to absolute; the full-article dereference additionally strips the
//! table of contents and reference lists.

use std::sync::LazyLock;

use regex::{Captures, Regex};
use scraper::{ElementRef, Html, Selector};
use tidings_common::{BridgeError, Result};

/// Tags kept by the featured-article content cleanup.
const KEPT_TAGS: &[&str] = &["a", "p", "br", "img"];

static TAG_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"</?([a-zA-Z][a-zA-Z0-9]*)[^>]*>").expect("tag pattern"));

/// Intermediate extraction result, before the bridge decides between snippet
/// content and a full-article dereference.
#[derive(Debug, Clone)]
pub struct ExtractedItem {
    pub uri: String,
    pub title: String,
    pub content: String,
}

/// Extract the single featured-article item from a homepage document.
///
/// The container's trailing decorative sub-block is dropped, the anchor whose
/// visible text carries an ellipsis ("read more…") names the article, and the
/// remaining markup is link-rewritten with every tag outside `a/p/br/img`
/// stripped.
pub fn featured_article(html: &str, container_selector: &str, base: &str) -> Result<ExtractedItem> {
    let document = Html::parse_document(html);
    let container = select_container(&document, container_selector)?;

    let mut inner = container.inner_html();
    let div_sel = Selector::parse("div").expect("selector");
    if let Some(last_div) = container.select(&div_sel).last() {
        let needle = last_div.html();
        if let Some(pos) = inner.rfind(&needle) {
            inner.replace_range(pos..pos + needle.len(), "");
        }
    }

    let anchor_sel = Selector::parse("a").expect("selector");
    let paragraph_anchor_sel = Selector::parse("p a").expect("selector");
    let target = container
        .select(&anchor_sel)
        .find(|anchor| {
            let text: String = anchor.text().collect();
            text.contains("...") || text.contains('…')
        })
        .or_else(|| container.select(&paragraph_anchor_sel).next())
        .or_else(|| container.select(&anchor_sel).next())
        .ok_or_else(|| {
            BridgeError::ContentNotFound("no anchor inside the featured-article block".into())
        })?;

    let uri = absolutize(base, target.value().attr("href").unwrap_or_default());
    let title = anchor_title(&target);
    let content = strip_tags_except(&rewrite_relative_links(&inner, base), KEPT_TAGS);

    Ok(ExtractedItem {
        uri,
        title,
        content,
    })
}

/// Extract one item per did-you-know list entry.
///
/// Each entry's first anchor names the target article; there is no way of
/// finding the "correct" one when an entry links several. Entries without any
/// anchor are skipped.
pub fn did_you_know(html: &str, container_selector: &str, base: &str) -> Result<Vec<ExtractedItem>> {
    let document = Html::parse_document(html);
    let container = select_container(&document, container_selector)?;

    let list_sel = Selector::parse("ul").expect("selector");
    let list = container.select(&list_sel).next().ok_or_else(|| {
        BridgeError::ContentNotFound("no list inside the did-you-know block".into())
    })?;

    let entry_sel = Selector::parse("li").expect("selector");
    let anchor_sel = Selector::parse("a").expect("selector");
    let mut items = Vec::new();
    for entry in list.select(&entry_sel) {
        let Some(anchor) = entry.select(&anchor_sel).next() else {
            tracing::debug!("wikipedia.extract.entry_without_anchor");
            continue;
        };
        let uri = absolutize(base, anchor.value().attr("href").unwrap_or_default());
        let title = collapse_whitespace(&entry.text().collect::<String>());
        let content = rewrite_relative_links(&entry.inner_html(), base);
        items.push(ExtractedItem {
            uri,
            title,
            content,
        });
    }
    Ok(items)
}

/// Extract the main content region of a full article page.
///
/// Fails when the content region is missing; the table-of-contents block and
/// all reference lists are removed before the link rewrite.
pub fn full_article(html: &str, base: &str) -> Result<String> {
    let document = Html::parse_document(html);
    let content_sel = Selector::parse("#mw-content-text").expect("selector");
    let content = document.select(&content_sel).next().ok_or_else(|| {
        BridgeError::ContentNotFound("could not find content in article page".into())
    })?;

    let mut inner = content.inner_html();
    let toc_sel = Selector::parse("#toc").expect("selector");
    if let Some(toc) = content.select(&toc_sel).next() {
        remove_fragment(&mut inner, &toc.html());
    }
    let references_sel = Selector::parse("ol.references").expect("selector");
    for reference in content.select(&references_sel) {
        remove_fragment(&mut inner, &reference.html());
    }

    Ok(rewrite_relative_links(&inner, base))
}

/// Replace every site-relative `href` with an absolute one.
pub fn rewrite_relative_links(html: &str, base: &str) -> String {
    html.replace("href=\"/", &format!("href=\"{base}/"))
}

/// Drop every tag whose name is not in `allowed`, keeping text content.
pub fn strip_tags_except(html: &str, allowed: &[&str]) -> String {
    TAG_PATTERN
        .replace_all(html, |caps: &Captures<'_>| {
            let name = caps[1].to_ascii_lowercase();
            if allowed.contains(&name.as_str()) {
                caps[0].to_string()
            } else {
                String::new()
            }
        })
        .into_owned()
}

fn select_container<'a>(document: &'a Html, selector: &str) -> Result<ElementRef<'a>> {
    let parsed = Selector::parse(selector).map_err(|_| {
        BridgeError::ContentNotFound(format!("invalid container selector: {selector}"))
    })?;
    document.select(&parsed).next().ok_or_else(|| {
        BridgeError::ContentNotFound(format!("no element matches selector: {selector}"))
    })
}

fn anchor_title(anchor: &ElementRef<'_>) -> String {
    match anchor.value().attr("title") {
        Some(title) if !title.is_empty() => title.to_string(),
        _ => collapse_whitespace(&anchor.text().collect::<String>()),
    }
}

fn absolutize(base: &str, href: &str) -> String {
    if href.starts_with("http://") || href.starts_with("https://") {
        href.to_string()
    } else {
        format!("{base}{href}")
    }
}

fn remove_fragment(html: &mut String, needle: &str) {
    if let Some(pos) = html.find(needle) {
        html.replace_range(pos..pos + needle.len(), "");
    }
}

fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    const BASE: &str = "https://en.wikipedia.org";

    fn homepage(tfa_inner: &str) -> String {
        format!(
            "<html><body><div id=\"mp-tfa\">{tfa_inner}</div>\
             <div id=\"mp-other\">noise</div></body></html>"
        )
    }

    #[test]
    fn featured_article_prefers_the_read_more_anchor() {
        let html = homepage(
            "<p><b>Lead</b> about <a href=\"/wiki/Some_topic\" title=\"Some topic\">a topic</a>. \
             <a href=\"/wiki/Featured_article\" title=\"Featured article\">Full article...</a></p>\
             <div class=\"tfa-footer\"><a href=\"/wiki/Archive\">Archive</a></div>",
        );

        let item = featured_article(&html, "div#mp-tfa", BASE).unwrap();
        assert_eq!(item.uri, "https://en.wikipedia.org/wiki/Featured_article");
        assert_eq!(item.title, "Featured article");
        // Links rewritten, disallowed tags stripped, footer block removed.
        assert!(item.content.contains("href=\"https://en.wikipedia.org/wiki/Some_topic\""));
        assert!(!item.content.contains("<b>"));
        assert!(item.content.contains("Lead"));
        assert!(!item.content.contains("Archive"));
    }

    #[test]
    fn featured_article_falls_back_to_the_first_anchor() {
        let html = homepage(
            "<p>Lead with only <a href=\"/wiki/Only_link\" title=\"Only link\">one link</a>.</p>\
             <div>footer</div>",
        );

        let item = featured_article(&html, "div#mp-tfa", BASE).unwrap();
        assert_eq!(item.uri, "https://en.wikipedia.org/wiki/Only_link");
        assert_eq!(item.title, "Only link");
    }

    #[test]
    fn featured_article_title_falls_back_to_anchor_text() {
        let html = homepage("<p><a href=\"/wiki/Plain\">Read the rest...</a></p><div></div>");
        let item = featured_article(&html, "div#mp-tfa", BASE).unwrap();
        assert_eq!(item.title, "Read the rest...");
    }

    #[test]
    fn missing_container_is_content_not_found() {
        let err = featured_article("<html><body></body></html>", "div#mp-tfa", BASE).unwrap_err();
        assert!(matches!(err, BridgeError::ContentNotFound(_)));
    }

    #[test]
    fn did_you_know_yields_one_item_per_entry() {
        let entries: String = (1..=5)
            .map(|n| {
                format!(
                    "<li>... that <a href=\"/wiki/Fact_{n}\" title=\"Fact {n}\">fact {n}</a> \
                     is <i>surprising</i>?</li>"
                )
            })
            .collect();
        let html = format!(
            "<html><body><div id=\"mp-dyk\"><ul>{entries}</ul></div></body></html>"
        );

        let items = did_you_know(&html, "div#mp-dyk", BASE).unwrap();
        assert_eq!(items.len(), 5);
        for (idx, item) in items.iter().enumerate() {
            assert!(!item.title.is_empty());
            assert_eq!(
                item.uri,
                format!("https://en.wikipedia.org/wiki/Fact_{}", idx + 1)
            );
            assert!(item.content.contains(&format!(
                "href=\"https://en.wikipedia.org/wiki/Fact_{}\"",
                idx + 1
            )));
        }
        assert_eq!(items[0].title, "... that fact 1 is surprising?");
    }

    #[test]
    fn did_you_know_skips_entries_without_anchors() {
        let html = "<html><body><div id=\"mp-dyk\"><ul>\
                    <li>plain text only</li>\
                    <li><a href=\"/wiki/Linked\">linked</a></li>\
                    </ul></div></body></html>";

        let items = did_you_know(html, "div#mp-dyk", BASE).unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].uri, "https://en.wikipedia.org/wiki/Linked");
    }

    #[test]
    fn full_article_strips_toc_and_references() {
        let html = "<html><body><div id=\"mw-content-text\">\
                    <div id=\"toc\">contents listing</div>\
                    <p>Body with a <a href=\"/wiki/Link\">link</a>.</p>\
                    <ol class=\"references\"><li>ref one</li></ol>\
                    <ol class=\"references\"><li>ref two</li></ol>\
                    </div></body></html>";

        let content = full_article(html, BASE).unwrap();
        assert!(!content.contains("contents listing"));
        assert!(!content.contains("ref one"));
        assert!(!content.contains("ref two"));
        assert!(content.contains("href=\"https://en.wikipedia.org/wiki/Link\""));
    }

    #[test]
    fn full_article_requires_the_content_region() {
        let err = full_article("<html><body><p>bare</p></body></html>", BASE).unwrap_err();
        assert!(matches!(err, BridgeError::ContentNotFound(_)));
    }

    #[test]
    fn strip_tags_except_keeps_the_whitelist() {
        let cleaned = strip_tags_except(
            "<p>keep <a href=\"x\">link</a> <span>drop</span> <img src=\"y\"> <br></p>",
            KEPT_TAGS,
        );
        assert!(cleaned.contains("<p>"));
        assert!(cleaned.contains("<a href=\"x\">"));
        assert!(cleaned.contains("<img src=\"y\">"));
        assert!(!cleaned.contains("<span>"));
        assert!(cleaned.contains("drop"));
    }
}
