//! DOM helpers over the scraper crate.
//!
//! Matching is done by tag name plus case-insensitive class tokens rather
//! than by raw CSS, so per-site configuration stays a list of words.

use std::sync::LazyLock;

use scraper::{ElementRef, Html, Selector};
use url::Url;

static BODY: LazyLock<Selector> = LazyLock::new(|| Selector::parse("body").unwrap());
static LINK: LazyLock<Selector> = LazyLock::new(|| Selector::parse("a[href]").unwrap());

/// Collapse runs of whitespace into single spaces and trim
pub fn normalize_ws(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Text content of an element, text nodes joined by a space and normalized
pub fn element_text(element: ElementRef<'_>) -> String {
    normalize_ws(&element.text().collect::<Vec<_>>().join(" "))
}

/// Case-insensitive substring test against any of `tokens`
pub fn contains_any_ci(text: &str, tokens: &[String]) -> bool {
    let lower = text.to_lowercase();
    tokens
        .iter()
        .any(|t| !t.is_empty() && lower.contains(&t.to_lowercase()))
}

/// Whether the element's tag is one of `tags` (empty list matches any tag)
pub fn tag_in(element: ElementRef<'_>, tags: &[String]) -> bool {
    if tags.is_empty() {
        return true;
    }
    let name = element.value().name();
    tags.iter().any(|t| t.eq_ignore_ascii_case(name))
}

/// Whether the element's `class` or `data-testid` contains any token
pub fn class_matches(element: ElementRef<'_>, tokens: &[String]) -> bool {
    let value = element.value();
    ["class", "data-testid"]
        .iter()
        .filter_map(|attr| value.attr(attr))
        .any(|attr| contains_any_ci(attr, tokens))
}

/// Whether the element has a non-blank text node as a direct child
pub fn has_own_text(element: ElementRef<'_>) -> bool {
    element
        .children()
        .filter_map(|child| child.value().as_text())
        .any(|text| !text.trim().is_empty())
}

/// Every element of the document, root included, in document order
pub fn all_elements(document: &Html) -> impl Iterator<Item = ElementRef<'_>> {
    document.root_element().descendants().filter_map(ElementRef::wrap)
}

/// Whether `inner` sits somewhere below `outer`
pub fn is_within(inner: ElementRef<'_>, outer: ElementRef<'_>) -> bool {
    inner.ancestors().any(|node| node.id() == outer.id())
}

/// Descendant elements of `root`, in document order, excluding `root`
pub fn descendant_elements<'a>(root: ElementRef<'a>) -> impl Iterator<Item = ElementRef<'a>> {
    root.descendants().skip(1).filter_map(ElementRef::wrap)
}

/// First descendant with a tag in `tags` and a class matching `tokens`.
/// An empty token list matches on tag alone.
pub fn find_descendant<'a>(
    root: ElementRef<'a>,
    tags: &[String],
    tokens: &[String],
) -> Option<ElementRef<'a>> {
    descendant_elements(root)
        .find(|el| tag_in(*el, tags) && (tokens.is_empty() || class_matches(*el, tokens)))
}

/// Resolve an href against the site origin.
///
/// Skips empty, javascript:, mailto:, tel: and anchor links, and anything
/// that does not end up as http/https.
pub fn resolve_link(base: Option<&Url>, href: &str) -> Option<String> {
    let href = href.trim();
    if href.is_empty()
        || href.starts_with("javascript:")
        || href.starts_with("mailto:")
        || href.starts_with("tel:")
        || href.starts_with('#')
    {
        return None;
    }

    let absolute = match Url::parse(href) {
        Ok(u) => u,
        Err(url::ParseError::RelativeUrlWithoutBase) => base?.join(href).ok()?,
        Err(_) => return None,
    };

    if absolute.scheme() == "http" || absolute.scheme() == "https" {
        Some(absolute.to_string())
    } else {
        None
    }
}

/// First descendant link of `root`, resolved to an absolute URL
pub fn first_link(root: ElementRef<'_>, base: Option<&Url>) -> Option<String> {
    root.select(&LINK)
        .filter_map(|a| a.value().attr("href"))
        .find_map(|href| resolve_link(base, href))
}

/// Readiness probe: the document has some non-whitespace body text
pub fn has_body_content(markup: &str) -> bool {
    let document = Html::parse_document(markup);
    document
        .select(&BODY)
        .next()
        .map(|body| body.text().any(|t| !t.trim().is_empty()))
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tokens(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_element_text_normalized() {
        let html = Html::parse_fragment("<div>  Truck \n <b>Driver</b>\t needed </div>");
        let div = html.select(&Selector::parse("div").unwrap()).next().unwrap();
        assert_eq!(element_text(div), "Truck Driver needed");
    }

    #[test]
    fn test_class_matching_is_case_insensitive() {
        let html = Html::parse_fragment(
            r#"<div class="SRP-JobCard wide"><span data-testid="company-name">Acme</span></div>"#,
        );
        let div = html.select(&Selector::parse("div").unwrap()).next().unwrap();
        assert!(class_matches(div, &tokens(&["job"])));
        assert!(!class_matches(div, &tokens(&["listing"])));

        let span = find_descendant(div, &tokens(&["span"]), &tokens(&["company"])).unwrap();
        assert_eq!(element_text(span), "Acme");
    }

    #[test]
    fn test_resolve_link() {
        let base = Url::parse("https://www.jobhai.com").unwrap();
        assert_eq!(
            resolve_link(Some(&base), "/job/123").as_deref(),
            Some("https://www.jobhai.com/job/123")
        );
        assert_eq!(
            resolve_link(Some(&base), "https://other.example/x").as_deref(),
            Some("https://other.example/x")
        );
        assert_eq!(resolve_link(Some(&base), "javascript:void(0)"), None);
        assert_eq!(resolve_link(Some(&base), "#top"), None);
        assert_eq!(resolve_link(None, "/job/123"), None);
    }

    #[test]
    fn test_first_link_skips_unusable() {
        let html = Html::parse_fragment(
            r##"<div><a href="#">x</a><a href="mailto:a@b.c">m</a><a href="/jobs/7">Job</a></div>"##,
        );
        let div = html.select(&Selector::parse("div").unwrap()).next().unwrap();
        let base = Url::parse("https://apna.co").unwrap();
        assert_eq!(
            first_link(div, Some(&base)).as_deref(),
            Some("https://apna.co/jobs/7")
        );
    }

    #[test]
    fn test_own_text_and_nesting() {
        let html = Html::parse_fragment(
            "<div id=\"outer\"> <span id=\"inner\">₹<b>20,000</b></span> </div>",
        );
        let outer = html.select(&Selector::parse("#outer").unwrap()).next().unwrap();
        let inner = html.select(&Selector::parse("#inner").unwrap()).next().unwrap();
        assert!(!has_own_text(outer));
        assert!(has_own_text(inner));
        assert!(is_within(inner, outer));
        assert!(!is_within(outer, inner));
        assert!(!is_within(outer, outer));
    }

    #[test]
    fn test_body_content_probe() {
        assert!(has_body_content("<html><body><p>hello</p></body></html>"));
        assert!(!has_body_content("<html><body>   </body></html>"));
        assert!(!has_body_content(""));
    }
}
