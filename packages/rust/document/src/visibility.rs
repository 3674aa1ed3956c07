//! Static visibility rules for markup snapshots.
//!
//! A live browser knows computed styles; a snapshot only has attributes. We
//! treat a node as hidden when it, or any ancestor, carries one of the
//! hiding signals below. `aria-hidden` is not one of them: the
//! visible copy of duplicated accessible text is the `aria-hidden` one.

use scraper::ElementRef;
use scraper::node::Element;

/// Class tokens that mark decoy or screen-reader-only nodes.
const DECOY_CLASSES: &[&str] = &[
    "hidden",
    "d-none",
    "invisible",
    "honeypot",
    "decoy",
    "visually-hidden",
    "sr-only",
];

/// Whether the element hides itself, ignoring its ancestors.
pub fn hides_itself(el: &Element) -> bool {
    if el.attr("hidden").is_some() {
        return true;
    }

    if el.name() == "input"
        && el
            .attr("type")
            .is_some_and(|t| t.eq_ignore_ascii_case("hidden"))
    {
        return true;
    }

    // Live sources may stamp computed visibility onto the snapshot.
    if el
        .attr("data-visible")
        .is_some_and(|v| v.eq_ignore_ascii_case("false"))
    {
        return true;
    }

    if el.attr("style").is_some_and(style_hides) {
        return true;
    }

    el.classes()
        .any(|c| DECOY_CLASSES.iter().any(|d| c.eq_ignore_ascii_case(d)))
}

/// Whether the element and all of its ancestors are visible.
pub fn is_visible(el: ElementRef<'_>) -> bool {
    if hides_itself(el.value()) {
        return false;
    }
    !el.ancestors()
        .filter_map(ElementRef::wrap)
        .any(|anc| hides_itself(anc.value()))
}

/// Inline-style check for `display:none`, `visibility:hidden` and `opacity:0`.
fn style_hides(style: &str) -> bool {
    for decl in style.split(';') {
        let Some((prop, value)) = decl.split_once(':') else {
            continue;
        };
        let prop = prop.trim().to_ascii_lowercase();
        let value = value
            .trim()
            .trim_end_matches("!important")
            .trim()
            .to_ascii_lowercase();

        let hides = match prop.as_str() {
            "display" => value == "none",
            "visibility" => value == "hidden" || value == "collapse",
            "opacity" => value.parse::<f32>().is_ok_and(|o| o <= 0.0),
            _ => false,
        };
        if hides {
            return true;
        }
    }
    false
}

#[cfg(test)]
mod tests {
    use super::*;
    use scraper::{Html, Selector};

    fn visible_ids(html: &str) -> Vec<String> {
        let doc = Html::parse_document(html);
        let sel = Selector::parse("li").unwrap();
        doc.select(&sel)
            .filter(|el| is_visible(*el))
            .filter_map(|el| el.value().attr("id").map(String::from))
            .collect()
    }

    #[test]
    fn inline_styles_hide() {
        let html = r#"<ul>
            <li id="a">shown</li>
            <li id="b" style="display: none">gone</li>
            <li id="c" style="opacity:0">gone</li>
            <li id="d" style="visibility : hidden !important">gone</li>
            <li id="e" style="opacity: 0.5">half</li>
        </ul>"#;
        assert_eq!(visible_ids(html), vec!["a", "e"]);
    }

    #[test]
    fn attributes_and_classes_hide() {
        let html = r#"<ul>
            <li id="a" hidden>gone</li>
            <li id="b" class="item honeypot">gone</li>
            <li id="c" data-visible="false">gone</li>
            <li id="d" aria-hidden="true">shown</li>
            <li id="e" class="pvs-list__paged-list-item">shown</li>
        </ul>"#;
        assert_eq!(visible_ids(html), vec!["d", "e"]);
    }

    #[test]
    fn hidden_ancestor_hides_descendants() {
        let html = r#"<div style="display:none"><ul><li id="a">x</li></ul></div>
            <div><ul><li id="b">y</li></ul></div>"#;
        assert_eq!(visible_ids(html), vec!["b"]);
    }
}
