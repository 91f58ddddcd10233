//! Thin query layer over `scraper`.
//!
//! Selector lookups return `Option`/`Vec`: a missing element is a normal
//! outcome for these pages, never an error. An unparsable selector is logged
//! and treated as matching nothing.

use crate::error::ParseError;
use scraper::{ElementRef, Html, Node, Selector};
use tracing::warn;
use url::Url;

// ── Text ──────────────────────────────────────────────────────────────────────

/// Collapse every whitespace run to a single space and trim.
pub fn collapse_whitespace(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Truncate to at most `max` characters on a char boundary.
pub fn truncate_chars(s: &str, max: usize) -> String {
    match s.char_indices().nth(max) {
        Some((idx, _)) => s[..idx].to_string(),
        None => s.to_string(),
    }
}

const HIDDEN_TAGS: [&str; 4] = ["script", "style", "iframe", "noscript"];

// ── Selectors ─────────────────────────────────────────────────────────────────

pub fn try_selector(css: &str) -> Result<Selector, ParseError> {
    Selector::parse(css).map_err(|_| ParseError::Selector(css.to_string()))
}

pub fn selector(css: &str) -> Option<Selector> {
    match try_selector(css) {
        Ok(sel) => Some(sel),
        Err(e) => {
            warn!("{}", e);
            None
        }
    }
}

pub fn parse(html: &str) -> Html {
    Html::parse_document(html)
}

/// Selector queries over a document or a subtree.
pub trait Query<'a> {
    fn select_all(self, css: &str) -> Vec<ElementRef<'a>>;

    fn select_first(self, css: &str) -> Option<ElementRef<'a>>
    where
        Self: Sized,
    {
        self.select_all(css).into_iter().next()
    }

    /// Texts of all matches, collapsed, empties dropped.
    fn texts(self, css: &str) -> Vec<String>
    where
        Self: Sized,
    {
        self.select_all(css)
            .into_iter()
            .map(|e| e.text_collapsed())
            .filter(|t| !t.is_empty())
            .collect()
    }

    /// Try each selector in turn; first non-empty match set wins.
    fn select_ladder(self, candidates: &[&str]) -> Vec<ElementRef<'a>>
    where
        Self: Sized + Copy,
    {
        for css in candidates {
            let found = self.select_all(css);
            if !found.is_empty() {
                return found;
            }
        }
        Vec::new()
    }
}

impl<'a> Query<'a> for &'a Html {
    fn select_all(self, css: &str) -> Vec<ElementRef<'a>> {
        let Some(sel) = selector(css) else { return Vec::new() };
        self.select(&sel).collect()
    }
}

impl<'a> Query<'a> for ElementRef<'a> {
    fn select_all(self, css: &str) -> Vec<ElementRef<'a>> {
        let Some(sel) = selector(css) else { return Vec::new() };
        self.select(&sel).collect()
    }
}

// ── Element helpers ───────────────────────────────────────────────────────────

pub trait ElementExt<'a> {
    fn text_collapsed(&self) -> String;
    fn visible_text(&self) -> String;
    fn attr_str(&self, name: &str) -> Option<&'a str>;
    fn tag(&self) -> &'a str;
    fn has_class(&self, class: &str) -> bool;
    fn parent_element(&self) -> Option<ElementRef<'a>>;
    fn closest_with_class(&self, class: &str) -> Option<ElementRef<'a>>;
    fn find_next(&self, css: &str) -> Option<ElementRef<'a>>;
    fn find_previous(&self, css: &str) -> Option<ElementRef<'a>>;
    fn following(&self) -> Vec<ElementRef<'a>>;
}

impl<'a> ElementExt<'a> for ElementRef<'a> {
    fn text_collapsed(&self) -> String {
        collapse_whitespace(&self.text().collect::<Vec<_>>().join(" "))
    }

    /// Text with script/style/embed content skipped.
    fn visible_text(&self) -> String {
        let mut out = Vec::new();
        collect_visible(*self, &mut out);
        collapse_whitespace(&out.join(" "))
    }

    fn attr_str(&self, name: &str) -> Option<&'a str> {
        self.value().attr(name)
    }

    fn tag(&self) -> &'a str {
        self.value().name()
    }

    fn has_class(&self, class: &str) -> bool {
        self.value().classes().any(|c| c == class)
    }

    fn parent_element(&self) -> Option<ElementRef<'a>> {
        self.parent().and_then(ElementRef::wrap)
    }

    fn closest_with_class(&self, class: &str) -> Option<ElementRef<'a>> {
        self.ancestors()
            .filter_map(ElementRef::wrap)
            .find(|e| e.has_class(class))
    }

    /// First element after this one in document order (descendants included).
    fn find_next(&self, css: &str) -> Option<ElementRef<'a>> {
        let sel = selector(css)?;
        let root = self.ancestors().last()?;
        let me = self.id();
        root.descendants()
            .skip_while(|n| n.id() != me)
            .skip(1)
            .filter_map(ElementRef::wrap)
            .find(|e| sel.matches(e))
    }

    /// Nearest element before this one in document order.
    fn find_previous(&self, css: &str) -> Option<ElementRef<'a>> {
        let sel = selector(css)?;
        let root = self.ancestors().last()?;
        let me = self.id();
        root.descendants()
            .take_while(|n| n.id() != me)
            .filter_map(ElementRef::wrap)
            .filter(|e| sel.matches(e))
            .last()
    }

    /// Every element after this one in document order.
    fn following(&self) -> Vec<ElementRef<'a>> {
        let Some(root) = self.ancestors().last() else { return Vec::new() };
        let me = self.id();
        root.descendants()
            .skip_while(|n| n.id() != me)
            .skip(1)
            .filter_map(ElementRef::wrap)
            .collect()
    }
}

fn collect_visible<'a>(el: ElementRef<'a>, out: &mut Vec<&'a str>) {
    for child in el.children() {
        match child.value() {
            Node::Text(t) => out.push(t),
            Node::Element(e) if HIDDEN_TAGS.contains(&e.name()) => {}
            Node::Element(_) => {
                if let Some(child_el) = ElementRef::wrap(child) {
                    collect_visible(child_el, out);
                }
            }
            _ => {}
        }
    }
}

/// Collapsed text of each `td`/`th` in a table row.
pub fn row_cells(row: ElementRef<'_>) -> Vec<String> {
    row.select_all("td, th")
        .into_iter()
        .map(|c| c.text_collapsed())
        .collect()
}

/// Resolve `href` against `base`, keeping `href` unchanged when either is unusable.
pub fn absolute_url(base: &str, href: &str) -> String {
    Url::parse(base)
        .and_then(|b| b.join(href))
        .map(|u| u.to_string())
        .unwrap_or_else(|_| href.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn collapses_whitespace() {
        assert_eq!(collapse_whitespace("  Grade\n\t 1 \u{a0} fee "), "Grade 1 fee");
        assert_eq!(collapse_whitespace(""), "");
    }

    #[test]
    fn truncates_on_char_boundary() {
        assert_eq!(truncate_chars("héllo", 2), "hé");
        assert_eq!(truncate_chars("ab", 10), "ab");
    }

    #[test]
    fn invalid_selector_matches_nothing() {
        assert!(matches!(try_selector("div["), Err(ParseError::Selector(css)) if css == "div["));
        let doc = parse("<div class='a'>x</div>");
        assert!(doc.select_all("div[").is_empty());
        assert!(doc.select_first("div.a").is_some());
    }

    #[test]
    fn ladder_falls_through_to_general_selector() {
        let doc = parse("<table><tr><td>1</td></tr></table>");
        let found = doc.select_ladder(&["table.table", "div.fees table", "table"]);
        assert_eq!(found.len(), 1);
    }

    #[test]
    fn visible_text_skips_scripts() {
        let doc = parse("<main>Hello <script>var x=1;</script><b>world</b><style>p{}</style></main>");
        let main = doc.select_first("main").unwrap();
        assert_eq!(main.visible_text(), "Hello world");
    }

    #[test]
    fn find_next_walks_document_order() {
        let doc = parse(
            "<div><p><strong>Forms</strong></p></div><div><ul><li>A</li></ul></div><ul><li>B</li></ul>",
        );
        let label = doc.select_first("strong").unwrap();
        let ul = label.find_next("ul").unwrap();
        assert_eq!(ul.text_collapsed(), "A");
    }

    #[test]
    fn find_previous_returns_nearest() {
        let doc = parse("<h3>One</h3><p>x</p><h3>Two</h3><table></table>");
        let table = doc.select_first("table").unwrap();
        assert_eq!(table.find_previous("h3").unwrap().text_collapsed(), "Two");
    }

    #[test]
    fn closest_class_finds_ancestor() {
        let doc = parse("<div class='mcb-wrap'><section><h3><span>STEP 1</span></h3></section></div>");
        let span = doc.select_first("span").unwrap();
        assert!(span.closest_with_class("mcb-wrap").is_some());
        assert!(span.closest_with_class("nope").is_none());
    }

    #[test]
    fn resolves_relative_links() {
        assert_eq!(
            absolute_url("https://cismanila.org/learning/curriculum/", "/files/a.pdf"),
            "https://cismanila.org/files/a.pdf"
        );
        assert_eq!(absolute_url("not a url", "x.pdf"), "x.pdf");
    }
}
