//! Tree helpers over `scraper` element references.

use certscrape_document::{hides_itself, is_visible, normalize_text};
use scraper::{ElementRef, Node, Selector};

/// Compile a selector literal. Only for static tables initialised once.
pub(crate) fn css(selector: &str) -> Selector {
    Selector::parse(selector).expect("valid selector")
}

/// Text of `el` with hidden subtrees skipped, whitespace-normalized.
///
/// Element boundaries become spaces so adjacent labels don't fuse.
pub fn visible_text(el: ElementRef<'_>) -> String {
    let mut buf = String::new();
    push_visible_text(el, &mut buf);
    normalize_text(&buf)
}

fn push_visible_text(el: ElementRef<'_>, buf: &mut String) {
    for child in el.children() {
        match child.value() {
            Node::Text(text) => buf.push_str(text),
            Node::Element(element) => {
                if hides_itself(element) || matches!(element.name(), "script" | "style") {
                    continue;
                }
                if let Some(child_el) = ElementRef::wrap(child) {
                    buf.push(' ');
                    push_visible_text(child_el, buf);
                    buf.push(' ');
                }
            }
            _ => {}
        }
    }
}

/// Every text node of `el`, hidden or not, whitespace-normalized.
pub fn full_text(el: ElementRef<'_>) -> String {
    normalize_text(&el.text().collect::<Vec<_>>().join(" "))
}

/// Descendants of `el` matching `selector`, excluding `el` itself.
pub fn descendants_matching<'a>(
    el: ElementRef<'a>,
    selector: &'a Selector,
) -> impl Iterator<Item = ElementRef<'a>> + 'a {
    el.select(selector).filter(move |d| d.id() != el.id())
}

/// Visible descendants of `el` matching `selector`.
pub fn visible_matching<'a>(
    el: ElementRef<'a>,
    selector: &'a Selector,
) -> impl Iterator<Item = ElementRef<'a>> + 'a {
    descendants_matching(el, selector).filter(|d| is_visible(*d))
}

/// Closest strict ancestor of `el` satisfying `pred`.
pub fn nearest_ancestor_matching<'a>(
    el: ElementRef<'a>,
    pred: impl Fn(ElementRef<'a>) -> bool,
) -> Option<ElementRef<'a>> {
    el.ancestors().filter_map(ElementRef::wrap).find(|a| pred(*a))
}

/// Closest ancestor whose tag is `tag`.
pub fn nearest_ancestor_tag<'a>(el: ElementRef<'a>, tag: &str) -> Option<ElementRef<'a>> {
    nearest_ancestor_matching(el, |a| a.value().name() == tag)
}

/// Closest ancestor carrying a class token that contains `fragment`.
pub fn nearest_ancestor_class<'a>(el: ElementRef<'a>, fragment: &str) -> Option<ElementRef<'a>> {
    nearest_ancestor_matching(el, |a| a.value().classes().any(|c| c.contains(fragment)))
}

/// `el` itself when it satisfies `pred`, otherwise its closest ancestor that does.
pub fn closest<'a>(
    el: ElementRef<'a>,
    pred: impl Fn(ElementRef<'a>) -> bool,
) -> Option<ElementRef<'a>> {
    if pred(el) {
        Some(el)
    } else {
        nearest_ancestor_matching(el, pred)
    }
}

/// Lowest common ancestor of a set of elements (inclusive).
pub fn lowest_common_ancestor<'a>(
    elements: impl IntoIterator<Item = ElementRef<'a>>,
) -> Option<ElementRef<'a>> {
    let mut iter = elements.into_iter();
    let first = iter.next()?;

    // Root-to-node chain of the first element; shrink it to the shared prefix.
    let mut chain: Vec<ElementRef<'a>> = std::iter::once(first)
        .chain(first.ancestors().filter_map(ElementRef::wrap))
        .collect();
    chain.reverse();

    for el in iter {
        let mut other: Vec<ElementRef<'a>> = std::iter::once(el)
            .chain(el.ancestors().filter_map(ElementRef::wrap))
            .collect();
        other.reverse();
        let shared = chain
            .iter()
            .zip(other.iter())
            .take_while(|(a, b)| a.id() == b.id())
            .count();
        chain.truncate(shared);
    }

    chain.last().copied()
}

/// Whether `outer` is a strict ancestor of `inner`.
pub fn is_ancestor_of(outer: ElementRef<'_>, inner: ElementRef<'_>) -> bool {
    inner.ancestors().any(|a| a.id() == outer.id())
}

#[cfg(test)]
mod tests {
    use super::*;
    use scraper::Html;

    fn first<'a>(doc: &'a Html, css: &str) -> ElementRef<'a> {
        let sel = Selector::parse(css).unwrap();
        doc.select(&sel).next().unwrap()
    }

    #[test]
    fn visible_text_skips_hidden_copies() {
        let doc = Html::parse_document(
            r#"<div id="x"><span>Issued</span><span class="visually-hidden">secret</span><b>Jan</b> 2024<script>var a;</script></div>"#,
        );
        let el = first(&doc, "#x");
        assert_eq!(visible_text(el), "Issued Jan 2024");
        assert!(full_text(el).contains("secret"));
    }

    #[test]
    fn lca_of_siblings_is_parent() {
        let doc = Html::parse_document(
            r#"<section id="s"><ul id="u"><li id="a">a</li><li id="b">b</li></ul><p id="c">c</p></section>"#,
        );
        let a = first(&doc, "#a");
        let b = first(&doc, "#b");
        let c = first(&doc, "#c");
        assert_eq!(lowest_common_ancestor([a, b]).unwrap().value().id(), Some("u"));
        assert_eq!(lowest_common_ancestor([a, c]).unwrap().value().id(), Some("s"));
        assert_eq!(lowest_common_ancestor([a]).unwrap().value().id(), Some("a"));
    }

    #[test]
    fn ancestor_lookups() {
        let doc = Html::parse_document(
            r#"<section><div class="artdeco-card pv-x"><ul><li id="a">a</li></ul></div></section>"#,
        );
        let a = first(&doc, "#a");
        assert!(nearest_ancestor_tag(a, "section").is_some());
        assert!(nearest_ancestor_class(a, "artdeco-card").is_some());
        assert!(nearest_ancestor_tag(a, "article").is_none());
        let ul = first(&doc, "ul");
        assert!(is_ancestor_of(ul, a));
        assert!(!is_ancestor_of(a, ul));
    }

    #[test]
    fn closest_checks_the_element_itself_first() {
        let doc = Html::parse_document(
            r#"<section id="outer"><section id="inner"><p id="p">x</p></section></section>"#,
        );
        let inner = first(&doc, "#inner");
        let is_section = |el: ElementRef<'_>| el.value().name() == "section";
        assert_eq!(closest(inner, is_section).unwrap().value().id(), Some("inner"));
        assert_eq!(nearest_ancestor_tag(inner, "section").unwrap().value().id(), Some("outer"));
        let p = first(&doc, "#p");
        assert_eq!(closest(p, is_section).unwrap().value().id(), Some("inner"));
    }
}
