//! Record enumerator: list the record-shaped nodes inside a region.
//!
//! Patterns run most specific first. The first pattern with at least one
//! visible match is used on its own; yields of different patterns are never
//! merged.

use std::sync::LazyLock;

use certscrape_document::is_visible;
use certscrape_shared::{Stage, TrailEntry};
use scraper::{ElementRef, Selector};

use crate::dom::{css, descendants_matching, is_ancestor_of};
use crate::strategy::{Attempt, Chain, ChainRun};

/// Item patterns in priority order. Partial class matches tolerate renamed build classes.
static ITEM_PATTERNS: LazyLock<Vec<(&'static str, Selector)>> = LazyLock::new(|| {
    [
        "li.pvs-list__paged-list-item",
        "div.pvs-list__paged-list-item",
        "li.artdeco-list__item",
        "div.artdeco-list__item",
        "[data-view-name='profile-component-entity']",
        "li[class*='list__item']",
        "div[class*='pvs-entity']",
        "[role='listitem']",
        "li.profile-section-card",
        "ul > li",
    ]
    .into_iter()
    .map(|pattern| (pattern, css(pattern)))
    .collect()
});

/// Broad patterns that also match ordinary page lists.
const FALLBACK_PATTERNS: &[&str] = &["[role='listitem']", "ul > li"];

/// Whether `pattern` is one of the broad fallbacks whose bare rows are noise.
pub fn is_fallback(pattern: &str) -> bool {
    FALLBACK_PATTERNS.contains(&pattern)
}

/// A record-shaped node and its position among the yielded items.
#[derive(Debug, Clone, Copy)]
pub struct CandidateItem<'a> {
    pub node: ElementRef<'a>,
    pub index: usize,
}

/// Candidate items in document order. Single pass.
#[derive(Debug)]
pub struct Items<'a> {
    inner: std::iter::Enumerate<std::vec::IntoIter<ElementRef<'a>>>,
}

impl<'a> Iterator for Items<'a> {
    type Item = CandidateItem<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        self.inner
            .next()
            .map(|(index, node)| CandidateItem { node, index })
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

impl ExactSizeIterator for Items<'_> {}

/// Enumerator output.
#[derive(Debug)]
pub struct Enumeration<'a> {
    /// Winning pattern, `None` when nothing visible matched.
    pub pattern: Option<String>,
    pub items: Items<'a>,
    pub attempts: Vec<TrailEntry>,
}

impl Enumeration<'_> {
    pub fn is_empty(&self) -> bool {
        self.items.len() == 0
    }
}

/// Enumerate the visible record nodes under `region`.
pub fn enumerate(region: ElementRef<'_>) -> Enumeration<'_> {
    let ChainRun { hit, attempts } = chain().run(region);

    let (pattern, nodes) = match hit {
        Some(hit) => (Some(hit.strategy), hit.value),
        None => (None, Vec::new()),
    };

    Enumeration {
        pattern,
        items: Items {
            inner: nodes.into_iter().enumerate(),
        },
        attempts,
    }
}

fn chain<'a>() -> Chain<'a, ElementRef<'a>, Vec<ElementRef<'a>>> {
    ITEM_PATTERNS
        .iter()
        .fold(Chain::new(Stage::Enumerate), |chain, (name, selector)| {
            chain.then(*name, move |region: ElementRef<'a>| visible_yield(region, selector))
        })
}

fn visible_yield<'a>(region: ElementRef<'a>, selector: &'a Selector) -> Attempt<Vec<ElementRef<'a>>> {
    let matches: Vec<ElementRef<'a>> = descendants_matching(region, selector).collect();
    if matches.is_empty() {
        return Attempt::Miss;
    }

    let outermost: Vec<ElementRef<'a>> = matches
        .iter()
        .copied()
        .filter(|m| !matches.iter().any(|other| is_ancestor_of(*other, *m)))
        .collect();

    let visible: Vec<ElementRef<'a>> = outermost.iter().copied().filter(|m| is_visible(*m)).collect();
    if visible.is_empty() {
        Attempt::Rejected(format!("{} hidden", outermost.len()))
    } else {
        Attempt::Hit(visible)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use certscrape_shared::Outcome;
    use scraper::Html;

    fn region<'a>(doc: &'a Html) -> ElementRef<'a> {
        let sel = Selector::parse("#region").unwrap();
        doc.select(&sel).next().unwrap()
    }

    fn names(items: Items<'_>) -> Vec<String> {
        items
            .map(|i| i.node.value().attr("data-n").unwrap_or_default().to_string())
            .collect()
    }

    #[test]
    fn hidden_decoys_are_excluded_in_order() {
        let html = r#"<section id="region"><ul>
            <li class="pvs-list__paged-list-item" data-n="a">A</li>
            <li class="pvs-list__paged-list-item honeypot" data-n="x">X</li>
            <li class="pvs-list__paged-list-item" data-n="b">B</li>
            <li class="pvs-list__paged-list-item" style="opacity:0" data-n="y">Y</li>
            <div style="display:none"><li class="pvs-list__paged-list-item" data-n="z">Z</li></div>
            <li class="pvs-list__paged-list-item" data-n="c">C</li>
        </ul></section>"#;
        let doc = Html::parse_document(html);
        let result = enumerate(region(&doc));
        assert_eq!(result.pattern.as_deref(), Some("li.pvs-list__paged-list-item"));
        assert_eq!(result.items.len(), 3);
        let indices: Vec<usize> = enumerate(region(&doc)).items.map(|i| i.index).collect();
        assert_eq!(indices, vec![0, 1, 2]);
        assert_eq!(names(result.items), vec!["a", "b", "c"]);
    }

    #[test]
    fn all_hidden_pattern_falls_through() {
        let html = r#"<section id="region">
            <li class="artdeco-list__item" hidden data-n="decoy">D</li>
            <ul><li data-n="one">1</li><li data-n="two">2</li></ul>
        </section>"#;
        let doc = Html::parse_document(html);
        let result = enumerate(region(&doc));
        assert_eq!(result.pattern.as_deref(), Some("ul > li"));
        assert!(result.attempts.iter().any(|e| {
            e.strategy == "li.artdeco-list__item"
                && matches!(e.outcome, Outcome::Rejected { .. })
        }));
        assert_eq!(names(result.items), vec!["one", "two"]);
    }

    #[test]
    fn renamed_classes_match_by_substring() {
        let html = r#"<div id="region">
            <li class="xyz-list__item--v2" data-n="a">A</li>
            <li class="xyz-list__item--v2" data-n="b">B</li>
        </div>"#;
        let doc = Html::parse_document(html);
        let result = enumerate(region(&doc));
        assert_eq!(result.pattern.as_deref(), Some("li[class*='list__item']"));
        assert_eq!(names(result.items), vec!["a", "b"]);
    }

    #[test]
    fn nested_list_items_are_not_separate_records() {
        let html = r#"<section id="region"><ul>
            <li data-n="outer1">Cert <ul><li data-n="skill">Skill</li></ul></li>
            <li data-n="outer2">Cert 2</li>
        </ul></section>"#;
        let doc = Html::parse_document(html);
        let result = enumerate(region(&doc));
        assert_eq!(names(result.items), vec!["outer1", "outer2"]);
    }

    #[test]
    fn empty_region_yields_nothing() {
        let doc = Html::parse_document(r#"<section id="region"><p>Nothing here</p></section>"#);
        let result = enumerate(region(&doc));
        assert!(result.pattern.is_none());
        assert!(result.is_empty());
        assert_eq!(result.attempts.len(), ITEM_PATTERNS.len());
    }

    #[test]
    fn fallback_patterns_are_in_the_table() {
        for pattern in FALLBACK_PATTERNS {
            assert!(ITEM_PATTERNS.iter().any(|(name, _)| name == pattern));
        }
        assert!(is_fallback("ul > li"));
        assert!(!is_fallback("li.pvs-list__paged-list-item"));
    }
}
