//! Region locator: find the one subtree that holds the credential records.
//!
//! Strategies, first success wins:
//! 1. `stable_id`: the section carrying the well-known anchor id
//! 2. `header_text:*`: a visible heading matching one of the phrase patterns,
//!    in priority order (canonical, abbreviated, localized, extended)
//! 3. `anchor_keyword:*`: the container around the first field-label text
//!    node that sits in a record list
//! 4. `detail_main`: the `main` element, only on a detail view

use std::sync::LazyLock;

use certscrape_document::is_visible;
use certscrape_shared::{Stage, TrailEntry, clip};
use regex::Regex;
use scraper::{ElementRef, Html, Node, Selector};

use crate::dom::{
    closest, css, is_ancestor_of, lowest_common_ancestor, nearest_ancestor_class,
    nearest_ancestor_tag, visible_text,
};
use crate::strategy::{Attempt, Chain, ChainRun};

/// Longest page-text snippet carried by [`RegionNotFound`].
pub const SNIPPET_MAX_CHARS: usize = 280;

/// Longest refused text carried by a rejected attempt.
const REJECTED_MAX_CHARS: usize = 80;

const STABLE_ID: &str = "#licenses_and_certifications";

static HEADINGS: LazyLock<Selector> = LazyLock::new(|| {
    css("h1, h2, h3, header, span.pvs-header__title, span[class*='title'], div.pvs-header__title-container")
});

/// A section's own title: its first heading, never record content.
static SECTION_TITLE: LazyLock<Selector> =
    LazyLock::new(|| css("h1, h2, h3, [class*='pvs-header']"));

static LIST_ITEM: LazyLock<Selector> =
    LazyLock::new(|| css("li, [class*='pvs-entity'], [class*='list__item']"));

static MAIN: LazyLock<Selector> = LazyLock::new(|| css("main"));
static BODY: LazyLock<Selector> = LazyLock::new(|| css("body"));

/// Heading phrases in priority order. Matched against the whole visible heading text.
static HEADER_PATTERNS: LazyLock<Vec<(&'static str, Regex)>> = LazyLock::new(|| {
    [
        ("header_text:canonical", r"licen[cs]es?\s*(?:&|and)?\s*certifications?"),
        ("header_text:abbreviated", r"certifications?"),
        (
            "header_text:localized",
            r"lisensi(?:\s*(?:&|dan)?\s*sertifika(?:t|si))?|sertifika(?:t|si)",
        ),
        ("header_text:extended", r"professional\s*certifications?"),
    ]
    .into_iter()
    .map(|(label, pattern)| {
        let anchored = format!(r"(?i)^\s*(?:{pattern})\s*(?:\(\d+\))?\s*$");
        (label, Regex::new(&anchored).expect("valid regex"))
    })
    .collect()
});

/// Field-label keywords in priority order.
static ANCHOR_KEYWORDS: LazyLock<Vec<(&'static str, Regex)>> = LazyLock::new(|| {
    [
        ("anchor_keyword:credential_id", r"credential\s*id"),
        ("anchor_keyword:id_kredensial", r"id\s*kredensial"),
        ("anchor_keyword:issued_by", r"issued\s*by"),
        ("anchor_keyword:diterbitkan_oleh", r"diterbitkan\s*oleh"),
        ("anchor_keyword:issue_date", r"issue\s*date"),
        ("anchor_keyword:expiration_date", r"expiration\s*date"),
    ]
    .into_iter()
    .map(|(label, pattern)| (label, Regex::new(&format!("(?i){pattern}")).expect("valid regex")))
    .collect()
});

static FOREIGN_SECTION: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)experience|education|pengalaman|pendidikan").expect("valid regex"));

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// The located region: its root and the strategy that found it.
#[derive(Debug, Clone, Copy)]
pub struct CandidateRegion<'a> {
    pub root: ElementRef<'a>,
    pub strategy: &'static str,
}

/// Every strategy failed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegionNotFound {
    /// Leading visible page text, at most [`SNIPPET_MAX_CHARS`] chars.
    pub snippet: String,
}

/// Locator output plus every attempt made.
#[derive(Debug)]
pub struct RegionLookup<'a> {
    pub result: Result<CandidateRegion<'a>, RegionNotFound>,
    pub attempts: Vec<TrailEntry>,
}

/// What the locator needs to know about the document beyond its markup.
#[derive(Debug, Clone, Copy, Default)]
pub struct RegionContext {
    pub on_detail_view: bool,
}

// ---------------------------------------------------------------------------
// Locator
// ---------------------------------------------------------------------------

/// Locate the credential region of `doc`.
pub fn locate<'a>(doc: &'a Html, ctx: RegionContext) -> RegionLookup<'a> {
    let root = doc.root_element();
    let ChainRun { hit, attempts } = chain(ctx).run(root);

    let result = match hit {
        Some(hit) => Ok(CandidateRegion {
            root: hit.value.0,
            strategy: hit.value.1,
        }),
        None => {
            let text = doc
                .select(&BODY)
                .next()
                .map(visible_text)
                .unwrap_or_else(|| visible_text(root));
            Err(RegionNotFound {
                snippet: clip(&text, SNIPPET_MAX_CHARS),
            })
        }
    };

    RegionLookup { result, attempts }
}

type Found<'a> = (ElementRef<'a>, &'static str);

fn chain<'a>(ctx: RegionContext) -> Chain<'a, ElementRef<'a>, Found<'a>> {
    let mut chain = Chain::new(Stage::Region).then("stable_id", |root: ElementRef<'a>| {
        by_stable_id(root).map(|el| (el, "stable_id"))
    });

    for (label, pattern) in HEADER_PATTERNS.iter().map(|(l, p)| (*l, p)) {
        chain = chain.then(label, move |root: ElementRef<'a>| {
            by_header(root, pattern).map(|el| (el, label))
        });
    }

    for (label, pattern) in ANCHOR_KEYWORDS.iter().map(|(l, p)| (*l, p)) {
        chain = chain.then(label, move |root: ElementRef<'a>| {
            by_anchor_keyword(root, pattern).map(|el| (el, label))
        });
    }

    chain.then("detail_main", move |root: ElementRef<'a>| {
        if !ctx.on_detail_view {
            return Attempt::Miss;
        }
        match root.select(&MAIN).find(|m| is_visible(*m)) {
            Some(main) => Attempt::Hit((main, "detail_main")),
            None => Attempt::Miss,
        }
    })
}

// ---------------------------------------------------------------------------
// Strategies
// ---------------------------------------------------------------------------

fn by_stable_id(root: ElementRef<'_>) -> Attempt<ElementRef<'_>> {
    static ID: LazyLock<Selector> = LazyLock::new(|| css(STABLE_ID));

    let Some(anchor) = root.select(&ID).next() else {
        return Attempt::Miss;
    };
    let region = closest(anchor, is_section).unwrap_or(anchor);
    if is_visible(region) {
        Attempt::Hit(region)
    } else {
        Attempt::Rejected(format!("hidden {}", region.value().name()))
    }
}

fn by_header<'a>(root: ElementRef<'a>, pattern: &Regex) -> Attempt<ElementRef<'a>> {
    let mut rejected = None;

    for heading in root.select(&HEADINGS) {
        if !is_visible(heading) {
            continue;
        }
        let text = visible_text(heading);
        if !pattern.is_match(&text) {
            continue;
        }
        match region_for_heading(heading) {
            Ok(region) => return Attempt::Hit(region),
            Err(value) => {
                rejected.get_or_insert(value);
            }
        }
    }

    rejected.map_or(Attempt::Miss, Attempt::Rejected)
}

/// Climb from a matched heading to the container holding its records.
fn region_for_heading(heading: ElementRef<'_>) -> Result<ElementRef<'_>, String> {
    if let Some(section) = nearest_ancestor_tag(heading, "section") {
        if let Some(title) = foreign_title(section) {
            return Err(title);
        }
        return Ok(section);
    }

    if let Some(parent) = nearest_ancestor_class(heading, "pvs-header")
        .and_then(|header| header.parent())
        .and_then(ElementRef::wrap)
    {
        return Ok(parent);
    }

    if let Some(card) = nearest_ancestor_class(heading, "artdeco-card") {
        return Ok(card);
    }

    heading
        .parent()
        .and_then(ElementRef::wrap)
        .ok_or_else(|| visible_text(heading))
}

fn by_anchor_keyword<'a>(root: ElementRef<'a>, pattern: &Regex) -> Attempt<ElementRef<'a>> {
    let holders: Vec<ElementRef<'a>> = root
        .descendants()
        .filter_map(|node| match node.value() {
            Node::Text(text) if pattern.is_match(text) => node.parent().and_then(ElementRef::wrap),
            _ => None,
        })
        .filter(|el| !matches!(el.value().name(), "script" | "style" | "title"))
        .filter(|el| is_visible(*el))
        .collect();

    let mut rejected = None;
    for holder in &holders {
        let container = anchor_container(*holder);
        if let Some(title) = foreign_title(container) {
            rejected.get_or_insert(title);
            continue;
        }
        if container.select(&LIST_ITEM).next().is_none() {
            rejected.get_or_insert_with(|| clip(&visible_text(container), REJECTED_MAX_CHARS));
            continue;
        }

        // Only hits inside this container narrow it; hits elsewhere on the page never widen it.
        let inside = holders
            .iter()
            .copied()
            .filter(|h| h.id() == container.id() || is_ancestor_of(container, *h));
        let region = lowest_common_ancestor(inside)
            .map(anchor_container)
            .unwrap_or(container);
        return Attempt::Hit(region);
    }

    rejected.map_or(Attempt::Miss, Attempt::Rejected)
}

/// Climb from a keyword holder: section, then card or list wrapper, then `ul`.
fn anchor_container(el: ElementRef<'_>) -> ElementRef<'_> {
    closest(el, is_section)
        .or_else(|| closest(el, is_card_or_list))
        .or_else(|| closest(el, |a| a.value().name() == "ul"))
        .unwrap_or(el)
}

fn is_section(el: ElementRef<'_>) -> bool {
    el.value().name() == "section"
}

/// Card and list wrappers. `pvs-list__paged-list-item` is a single record, not a wrapper.
fn is_card_or_list(el: ElementRef<'_>) -> bool {
    el.value()
        .classes()
        .any(|c| c.starts_with("artdeco-card") || c == "pvs-list" || c == "pvs-list__container")
}

/// The title of the section around `el` when it names another profile section.
fn foreign_title(el: ElementRef<'_>) -> Option<String> {
    let section = closest(el, is_section)?;
    let title = section
        .select(&SECTION_TITLE)
        .find(|h| is_visible(*h))
        .map(visible_text)?;
    FOREIGN_SECTION
        .is_match(&title)
        .then(|| clip(&title, REJECTED_MAX_CHARS))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fixture(name: &str) -> String {
        let path = format!(
            "{}/../../../fixtures/html/{name}",
            env!("CARGO_MANIFEST_DIR")
        );
        std::fs::read_to_string(&path).unwrap_or_else(|e| panic!("read {path}: {e}"))
    }

    fn region_id(lookup: &RegionLookup<'_>) -> Option<String> {
        lookup
            .result
            .as_ref()
            .ok()
            .and_then(|r| r.root.value().id().map(String::from))
    }

    #[test]
    fn abbreviated_header_wins_on_detail_page() {
        let doc = Html::parse_document(&fixture("detail_certifications.html"));
        let lookup = locate(&doc, RegionContext { on_detail_view: true });
        let region = lookup.result.as_ref().expect("region");
        assert_eq!(region.strategy, "header_text:abbreviated");
        assert_eq!(region_id(&lookup).as_deref(), Some("cert-detail"));

        let tried: Vec<_> = lookup.attempts.iter().map(|e| e.strategy.as_str()).collect();
        assert_eq!(
            tried,
            vec!["stable_id", "header_text:canonical", "header_text:abbreviated"]
        );
    }

    #[test]
    fn stable_id_climbs_to_section() {
        let doc = Html::parse_document(&fixture("profile_with_show_all.html"));
        let lookup = locate(&doc, RegionContext::default());
        let region = lookup.result.as_ref().expect("region");
        assert_eq!(region.strategy, "stable_id");
        assert_eq!(region.root.value().name(), "section");
        assert_eq!(region_id(&lookup).as_deref(), Some("certs-card"));
    }

    #[test]
    fn header_in_experience_section_is_rejected() {
        let html = r#"<html><body><main>
            <section id="exp"><h2>Experience</h2>
                <ul><li><h3>Certifications</h3><span>Program lead</span></li></ul>
            </section>
            <section id="real"><div class="pvs-header"><h2>Certifications</h2></div>
                <ul><li>AWS</li></ul>
            </section>
        </main></body></html>"#;
        let doc = Html::parse_document(html);
        let lookup = locate(&doc, RegionContext::default());
        assert_eq!(region_id(&lookup).as_deref(), Some("real"));
    }

    #[test]
    fn hidden_heading_is_ignored() {
        let html = r#"<html><body>
            <section id="decoy" style="display:none"><h2>Licenses &amp; certifications</h2></section>
            <section id="real"><h2>Certifications</h2><ul><li>x</li></ul></section>
        </body></html>"#;
        let doc = Html::parse_document(html);
        let lookup = locate(&doc, RegionContext::default());
        assert_eq!(lookup.result.as_ref().unwrap().strategy, "header_text:abbreviated");
        assert_eq!(region_id(&lookup).as_deref(), Some("real"));
    }

    #[test]
    fn localized_and_extended_headers() {
        let doc = Html::parse_document(
            r#"<html><body><section id="id"><h2>Lisensi &amp; sertifikasi</h2></section></body></html>"#,
        );
        let lookup = locate(&doc, RegionContext::default());
        assert_eq!(lookup.result.unwrap().strategy, "header_text:localized");

        let doc = Html::parse_document(
            r#"<html><body><section><h2>Professional Certifications</h2></section></body></html>"#,
        );
        let lookup = locate(&doc, RegionContext::default());
        assert_eq!(lookup.result.unwrap().strategy, "header_text:extended");
    }

    #[test]
    fn anchor_keyword_finds_headerless_list() {
        let doc = Html::parse_document(&fixture("anchor_only.html"));
        let lookup = locate(&doc, RegionContext::default());
        let region = lookup.result.as_ref().expect("region");
        assert_eq!(region.strategy, "anchor_keyword:credential_id");
        assert_eq!(region_id(&lookup).as_deref(), Some("creds"));
    }

    #[test]
    fn record_named_after_another_section_keeps_its_region() {
        let html = r#"<html><body><main>
            <section id="certs"><div class="pvs-header"><h2>Licenses &amp; certifications</h2></div>
                <ul>
                    <li class="pvs-list__paged-list-item"><span>Salesforce Certified Experience Cloud Consultant</span><span>Salesforce</span></li>
                    <li class="pvs-list__paged-list-item"><span>Certified Education Technology Specialist</span><span>ISTE</span></li>
                </ul>
            </section>
        </main></body></html>"#;
        let doc = Html::parse_document(html);
        let lookup = locate(&doc, RegionContext::default());
        assert_eq!(lookup.result.as_ref().unwrap().strategy, "header_text:canonical");
        assert_eq!(region_id(&lookup).as_deref(), Some("certs"));
    }

    #[test]
    fn stray_keyword_outside_the_list_does_not_widen_the_region() {
        let html = r#"<html><body><main id="main">
            <section id="exp"><h2>Experience</h2>
                <ul><li class="pvs-list__paged-list-item"><span>Senior Engineer at Acme</span></li></ul>
            </section>
            <div id="about"><p>Ask me for my credential ID any time.</p></div>
            <div class="block">
                <ul id="creds">
                    <li><strong>Google Professional Cloud Architect</strong><span>Credential ID GCP-PCA-778</span></li>
                </ul>
            </div>
        </main></body></html>"#;
        let doc = Html::parse_document(html);
        let lookup = locate(&doc, RegionContext::default());
        assert_eq!(lookup.result.as_ref().unwrap().strategy, "anchor_keyword:credential_id");
        assert_eq!(region_id(&lookup).as_deref(), Some("creds"));
    }

    #[test]
    fn keyword_inside_experience_section_is_rejected() {
        let html = r#"<html><body>
            <section id="exp"><h2>Experience</h2>
                <ul><li><span>Ops lead</span><span>Credential ID checks</span></li></ul>
            </section>
        </body></html>"#;
        let doc = Html::parse_document(html);
        let lookup = locate(&doc, RegionContext::default());
        assert!(lookup.result.is_err());
        assert!(lookup.attempts.iter().any(|e| e.strategy == "anchor_keyword:credential_id"
            && matches!(&e.outcome, certscrape_shared::Outcome::Rejected { value } if value == "Experience")));
    }

    #[test]
    fn stable_id_on_the_section_itself() {
        let html = r#"<html><body><section id="outer">
            <section id="licenses_and_certifications"><h2>Licenses</h2><ul><li>x</li></ul></section>
        </section></body></html>"#;
        let doc = Html::parse_document(html);
        let lookup = locate(&doc, RegionContext::default());
        assert_eq!(region_id(&lookup).as_deref(), Some("licenses_and_certifications"));
    }

    #[test]
    fn detail_main_only_on_detail_view() {
        let html = r#"<html><body><main id="m"><ul><li>Thing</li></ul></main></body></html>"#;
        let doc = Html::parse_document(html);
        assert!(locate(&doc, RegionContext::default()).result.is_err());

        let lookup = locate(&doc, RegionContext { on_detail_view: true });
        assert_eq!(lookup.result.as_ref().unwrap().strategy, "detail_main");
        assert_eq!(region_id(&lookup).as_deref(), Some("m"));
    }

    #[test]
    fn exhaustion_carries_bounded_snippet() {
        let doc = Html::parse_document(&fixture("no_section.html"));
        let lookup = locate(&doc, RegionContext::default());
        let err = lookup.result.unwrap_err();
        assert!(!err.snippet.is_empty());
        assert!(err.snippet.chars().count() <= SNIPPET_MAX_CHARS + 1);
        assert_eq!(lookup.attempts.len(), 1 + HEADER_PATTERNS.len() + ANCHOR_KEYWORDS.len() + 1);
    }
}
