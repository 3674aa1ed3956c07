//! Field extractor: resolve each record field independently.
//!
//! Every field runs its own chain. Structural locators come first (most
//! semantic first); each candidate text is captured and then validated, and
//! the first validated value wins. When no locator validates, regex patterns
//! run over the item's visible text. A value accepted by a validator is never
//! replaced by a lower-priority strategy.

use std::sync::LazyLock;

use certscrape_shared::{FieldKind, NO_EXPIRATION, Outcome, Stage, TrailEntry};
use regex::Regex;
use scraper::{ElementRef, Selector};
use url::Url;

use crate::dom::{css, visible_matching, visible_text};
use crate::strategy::{Attempt, Chain, ChainRun, first_accepted};
use crate::validators;

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// One resolved (or unresolved) field.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FieldResult {
    /// Accepted value; empty when unresolved.
    pub value: String,
    /// Strategy that produced the value.
    pub source: Option<String>,
    /// Every strategy tried, in order.
    pub attempts: Vec<TrailEntry>,
}

impl FieldResult {
    pub fn is_resolved(&self) -> bool {
        self.source.is_some()
    }

    /// The one entry worth keeping in a request trail: the hit, or `unresolved`.
    pub fn summary_entry(&self, kind: FieldKind) -> TrailEntry {
        TrailEntry {
            stage: Stage::Field(kind),
            strategy: self.source.clone().unwrap_or_else(|| "*".into()),
            outcome: if self.is_resolved() {
                Outcome::Hit
            } else {
                Outcome::Unresolved
            },
        }
    }
}

/// Per-item context for field extraction.
#[derive(Debug, Clone, Default)]
pub struct FieldContext {
    /// Document location; relative links resolve against it.
    pub base: Option<Url>,
    /// Name already resolved for this item (the issuer may not repeat it).
    pub name: Option<String>,
}

/// All six fields of one item.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ItemFields {
    pub name: FieldResult,
    pub credential_id: FieldResult,
    pub issuer: FieldResult,
    pub issue_date: FieldResult,
    pub expiry_date: FieldResult,
    pub verify_link: FieldResult,
}

impl ItemFields {
    pub fn get(&self, kind: FieldKind) -> &FieldResult {
        match kind {
            FieldKind::Name => &self.name,
            FieldKind::CredentialId => &self.credential_id,
            FieldKind::Issuer => &self.issuer,
            FieldKind::IssueDate => &self.issue_date,
            FieldKind::ExpiryDate => &self.expiry_date,
            FieldKind::VerifyLink => &self.verify_link,
        }
    }

    fn slot(&mut self, kind: FieldKind) -> &mut FieldResult {
        match kind {
            FieldKind::Name => &mut self.name,
            FieldKind::CredentialId => &mut self.credential_id,
            FieldKind::Issuer => &mut self.issuer,
            FieldKind::IssueDate => &mut self.issue_date,
            FieldKind::ExpiryDate => &mut self.expiry_date,
            FieldKind::VerifyLink => &mut self.verify_link,
        }
    }
}

/// What every probe sees.
#[derive(Clone, Copy)]
struct ItemView<'a> {
    node: ElementRef<'a>,
    text: &'a str,
    ctx: &'a FieldContext,
}

type Capture = fn(&str) -> Option<String>;
type Validate = fn(&str, &FieldContext) -> Result<(), String>;

// ---------------------------------------------------------------------------
// Entry points
// ---------------------------------------------------------------------------

/// Resolve every field of `item`. The name is resolved first so the issuer
/// validator can refuse a repeat of it.
pub fn extract_item(item: ElementRef<'_>, base: Option<&Url>) -> ItemFields {
    let text = visible_text(item);
    let mut ctx = FieldContext {
        base: base.cloned(),
        name: None,
    };
    let mut fields = ItemFields::default();

    for kind in FieldKind::ALL {
        let result = resolve(item, &text, kind, &ctx);
        if kind == FieldKind::Name && result.is_resolved() {
            ctx.name = Some(result.value.clone());
        }
        *fields.slot(kind) = result;
    }

    fields
}

/// Resolve one field of `item`.
pub fn extract_field(item: ElementRef<'_>, kind: FieldKind, ctx: &FieldContext) -> FieldResult {
    resolve(item, &visible_text(item), kind, ctx)
}

fn resolve(item: ElementRef<'_>, text: &str, kind: FieldKind, ctx: &FieldContext) -> FieldResult {
    let view = ItemView {
        node: item,
        text,
        ctx,
    };
    let ChainRun { hit, mut attempts } = chain(kind).run(view);

    match hit {
        Some(hit) => FieldResult {
            value: hit.value,
            source: Some(hit.strategy),
            attempts,
        },
        None => {
            attempts.push(TrailEntry {
                stage: Stage::Field(kind),
                strategy: "*".into(),
                outcome: Outcome::Unresolved,
            });
            FieldResult {
                value: String::new(),
                source: None,
                attempts,
            }
        }
    }
}

fn chain<'a>(kind: FieldKind) -> Chain<'a, ItemView<'a>, String> {
    let stage = Stage::Field(kind);
    match kind {
        FieldKind::Name => text_chain(stage, &NAME_LOCATORS, &NAME_PATTERNS, plain, validate_name),
        FieldKind::Issuer => {
            text_chain(stage, &ISSUER_LOCATORS, &ISSUER_PATTERNS, strip_issuer_label, validate_issuer)
        }
        FieldKind::IssueDate => text_chain(
            stage,
            &ISSUE_DATE_LOCATORS,
            &ISSUE_DATE_PATTERNS,
            capture_issue_date,
            validate_issue_date,
        ),
        FieldKind::ExpiryDate => expiry_chain(stage),
        FieldKind::CredentialId => text_chain(
            stage,
            &CREDENTIAL_ID_LOCATORS,
            &CREDENTIAL_ID_PATTERNS,
            capture_credential_id,
            validate_credential_id,
        ),
        FieldKind::VerifyLink => link_chain(stage),
    }
}

// ---------------------------------------------------------------------------
// Strategy tables
// ---------------------------------------------------------------------------

type Locators = LazyLock<Vec<(&'static str, Selector)>>;
type Patterns = LazyLock<Vec<(&'static str, Regex)>>;

fn locators(table: &[(&'static str, &str)]) -> Vec<(&'static str, Selector)> {
    table.iter().map(|(name, sel)| (*name, css(sel))).collect()
}

fn patterns(table: &[(&'static str, String)]) -> Vec<(&'static str, Regex)> {
    table
        .iter()
        .map(|(name, re)| (*name, Regex::new(re).expect("valid regex")))
        .collect()
}

const ISSUER_LABEL: &str = r"(?:issued\s+by|diterbitkan\s+oleh|oleh|issuer|organization|organisasi)";
const ISSUE_LABEL: &str = r"(?:issued(?:\s+on)?|issue\s+date|diterbitkan(?:\s+pada)?)";
const EXPIRY_LABEL: &str =
    r"(?:expires(?:\s+on)?|expired|expiration\s+date|kedaluwarsa|kadaluarsa|berlaku\s+hingga)";
const CREDENTIAL_LABEL: &str = r"(?:credential\s*id|id\s*kredensial|credential\s*(?:no\.?|number|#)|certificate\s*(?:id|no\.?|number)|license\s*(?:no\.?|number))";

static NAME_LOCATORS: Locators = LazyLock::new(|| {
    locators(&[
        ("name:heading", "h3, h4"),
        ("name:bold_aria", ".t-bold span[aria-hidden='true']"),
        ("name:bold", ".t-bold"),
        ("name:title_class", "[class*='title']"),
        ("name:strong", "strong, b"),
        ("name:first_span", "div.display-flex > span:first-child"),
    ])
});

static NAME_PATTERNS: Patterns = LazyLock::new(|| {
    patterns(&[
        (
            "name:before_issuer_label",
            format!(r"(?i)^(.+?)\s+{ISSUER_LABEL}\b"),
        ),
        ("name:before_dash", r"^(.+?)\s+[–—-]\s+".to_string()),
        (
            "name:before_issued",
            r"(?i)^(.+?)\s+(?:issued|diterbitkan)\b".to_string(),
        ),
    ])
});

static ISSUER_LOCATORS: Locators = LazyLock::new(|| {
    locators(&[
        ("issuer:data_field", "[data-field='issuer'], [class*='issuer']"),
        ("issuer:normal_aria", "span.t-14.t-normal span[aria-hidden='true']"),
        ("issuer:normal", "span.t-14.t-normal"),
        ("issuer:caption", "[class*='caption-wrapper']"),
        ("issuer:subtitle", "[class*='subtitle']"),
    ])
});

static ISSUER_PATTERNS: Patterns = LazyLock::new(|| {
    patterns(&[(
        "issuer:label_text",
        format!(
            r"(?i)\b{ISSUER_LABEL}\s*:?\s*(.+?)(?:\s+(?:{ISSUE_LABEL}|{EXPIRY_LABEL}|{CREDENTIAL_LABEL})\b|\s*[·|•]|$)"
        ),
    )])
});

static ISSUE_DATE_LOCATORS: Locators = LazyLock::new(|| {
    locators(&[
        (
            "issue_date:data_field",
            "[data-field='issue-date'], [class*='issue-date'], time",
        ),
        ("issue_date:light_aria", "span.t-black--light span[aria-hidden='true']"),
        ("issue_date:light", "span.t-black--light, [class*='caption-wrapper']"),
    ])
});

static ISSUE_DATE_PATTERNS: Patterns = LazyLock::new(|| {
    let date = validators::date_token();
    patterns(&[(
        "issue_date:label_text",
        format!(r"(?i)\b{ISSUE_LABEL}\s*:?\s*({date})"),
    )])
});

static EXPIRY_DATE_LOCATORS: Locators = LazyLock::new(|| {
    locators(&[
        (
            "expiry_date:data_field",
            "[data-field='expiry-date'], [class*='expir']",
        ),
        ("expiry_date:light_aria", "span.t-black--light span[aria-hidden='true']"),
        ("expiry_date:light", "span.t-black--light, [class*='caption-wrapper']"),
    ])
});

static EXPIRY_LABELLED: LazyLock<Regex> = LazyLock::new(|| {
    let date = validators::date_token();
    Regex::new(&format!(r"(?i)\b{EXPIRY_LABEL}\s*:?\s*({date})")).expect("valid regex")
});

static ISSUE_LABELLED: LazyLock<Regex> = LazyLock::new(|| {
    let date = validators::date_token();
    Regex::new(&format!(r"(?i)\b{ISSUE_LABEL}\s*:?\s*({date})")).expect("valid regex")
});

static ANY_DATE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(r"(?i)\b({})\b", validators::date_token())).expect("valid regex")
});

static HAS_EXPIRY_LABEL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(&format!(r"(?i)\b{EXPIRY_LABEL}\b")).expect("valid regex"));

static CREDENTIAL_ID_LOCATORS: Locators = LazyLock::new(|| {
    locators(&[
        (
            "credential_id:data_field",
            "[data-field='credential-id'], [class*='credential-id']",
        ),
        (
            "credential_id:caption",
            "[class*='caption-wrapper'], span.t-black--light",
        ),
        ("credential_id:span", "span, p"),
    ])
});

static CREDENTIAL_ID_PATTERNS: Patterns = LazyLock::new(|| {
    patterns(&[(
        "credential_id:label_text",
        format!(r"(?i){CREDENTIAL_LABEL}\s*[:#]?\s*([A-Za-z0-9][\w\-./]*)"),
    )])
});

static CREDENTIAL_LABELLED: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(
        r"(?i){CREDENTIAL_LABEL}\s*[:#]?\s*([A-Za-z0-9][\w\-./]*)"
    ))
    .expect("valid regex")
});

static LINK_LOCATORS: Locators = LazyLock::new(|| {
    locators(&[
        ("verify_link:action_wrapper", "a.optional-action-target-wrapper[href]"),
        ("verify_link:href_credential", "a[href*='credential']"),
        ("verify_link:href_verify", "a[href*='verify'], a[href*='verification']"),
        ("verify_link:href_redirect", "a[href*='redir']"),
        (
            "verify_link:aria_label",
            "a[aria-label*='credential'][href], a[aria-label*='Credential'][href]",
        ),
    ])
});

static ANY_LINK: LazyLock<Selector> = LazyLock::new(|| css("a[href]"));

static SHOW_CREDENTIAL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(?:show|see|view|verify)\s+credential|lihat\s+kredensial|tampilkan\s+kredensial")
        .expect("valid regex")
});

static TEXT_URL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"https?://[^\s<>()]+").expect("valid regex"));

static ISSUER_PREFIX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(r"(?i)^\s*{ISSUER_LABEL}\s*:?\s*")).expect("valid regex")
});

// ---------------------------------------------------------------------------
// Chain builders
// ---------------------------------------------------------------------------

/// Structural locators, then regex fallbacks, sharing one capture and validator.
fn text_chain<'a>(
    stage: Stage,
    locators: &'static Locators,
    patterns: &'static Patterns,
    capture: Capture,
    validate: Validate,
) -> Chain<'a, ItemView<'a>, String> {
    let mut chain = Chain::new(stage);

    for (name, selector) in locators.iter().map(|(n, s)| (*n, s)) {
        chain = chain.then(name, move |item: ItemView<'a>| {
            structural(item, selector, capture, validate)
        });
    }

    for (name, re) in patterns.iter().map(|(n, r)| (*n, r)) {
        chain = chain.then(name, move |item: ItemView<'a>| text_regex(item, re, validate));
    }

    chain
}

fn expiry_chain<'a>(stage: Stage) -> Chain<'a, ItemView<'a>, String> {
    let mut chain = Chain::new(stage);

    for (name, selector) in EXPIRY_DATE_LOCATORS.iter().map(|(n, s)| (*n, s)) {
        chain = chain.then(name, move |item: ItemView<'a>| {
            structural(item, selector, capture_expiry_date, validate_expiry_date)
        });
    }

    chain
        .then("expiry_date:no_expiration_text", |item: ItemView<'a>| {
            if validators::NO_EXPIRATION_RE.is_match(item.text) {
                Attempt::Hit(NO_EXPIRATION.to_string())
            } else {
                Attempt::Miss
            }
        })
        .then("expiry_date:label_text", |item: ItemView<'a>| {
            text_regex(item, &EXPIRY_LABELLED, validate_expiry_date)
        })
}

fn link_chain<'a>(stage: Stage) -> Chain<'a, ItemView<'a>, String> {
    let mut chain = Chain::new(stage);

    for (name, selector) in LINK_LOCATORS.iter().map(|(n, s)| (*n, s)) {
        chain = chain.then(name, move |item: ItemView<'a>| {
            let hrefs = visible_matching(item.node, selector)
                .filter_map(|a| a.value().attr("href"))
                .filter_map(|href| absolutize(href, item.ctx.base.as_ref()));
            first_accepted(hrefs, |v| validators::verify_link(v))
        });
    }

    chain
        .then("verify_link:show_credential_text", |item: ItemView<'a>| {
            let hrefs = visible_matching(item.node, &ANY_LINK)
                .filter(|a| {
                    SHOW_CREDENTIAL.is_match(&visible_text(*a))
                        || a.value()
                            .attr("aria-label")
                            .is_some_and(|l| SHOW_CREDENTIAL.is_match(l))
                })
                .filter_map(|a| a.value().attr("href"))
                .filter_map(|href| absolutize(href, item.ctx.base.as_ref()));
            first_accepted(hrefs, |v| validators::verify_link(v))
        })
        .then("verify_link:text_url", |item: ItemView<'a>| {
            let urls = TEXT_URL
                .find_iter(item.text)
                .map(|m| m.as_str().trim_end_matches(['.', ',', ';']).to_string());
            first_accepted(urls, |v| validators::verify_link(v))
        })
}

fn structural(
    item: ItemView<'_>,
    selector: &Selector,
    capture: Capture,
    validate: Validate,
) -> Attempt<String> {
    let candidates = visible_matching(item.node, selector)
        .map(visible_text)
        .filter(|text| !text.is_empty())
        .filter_map(|text| capture(&text));
    first_accepted(candidates, |v| validate(v, item.ctx))
}

fn text_regex(item: ItemView<'_>, re: &Regex, validate: Validate) -> Attempt<String> {
    let captures = re
        .captures_iter(item.text)
        .filter_map(|c| c.get(1))
        .map(|m| m.as_str().trim().to_string())
        .filter(|v| !v.is_empty());
    first_accepted(captures, |v| validate(v, item.ctx))
}

/// Resolve `href` against `base`; drops fragments-only and script links.
fn absolutize(href: &str, base: Option<&Url>) -> Option<String> {
    let href = href.trim();
    if href.is_empty() || href.starts_with('#') {
        return None;
    }
    let url = match Url::parse(href) {
        Ok(url) => url,
        Err(url::ParseError::RelativeUrlWithoutBase) => base?.join(href).ok()?,
        Err(_) => return None,
    };
    Some(url.to_string())
}

// ---------------------------------------------------------------------------
// Captures
// ---------------------------------------------------------------------------

fn plain(text: &str) -> Option<String> {
    Some(text.trim().to_string())
}

fn strip_issuer_label(text: &str) -> Option<String> {
    let stripped = ISSUER_PREFIX.replace(text, "");
    let value = stripped.trim();
    (!value.is_empty()).then(|| value.to_string())
}

/// Labelled issue date, else the first date of a text with no expiry label.
fn capture_issue_date(text: &str) -> Option<String> {
    if let Some(m) = ISSUE_LABELLED.captures(text).and_then(|c| c.get(1)) {
        return Some(m.as_str().to_string());
    }
    if HAS_EXPIRY_LABEL.is_match(text) {
        return None;
    }
    ANY_DATE
        .captures(text)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().to_string())
}

/// The sentinel wins over a labelled date.
fn capture_expiry_date(text: &str) -> Option<String> {
    if validators::NO_EXPIRATION_RE.is_match(text) {
        return Some(NO_EXPIRATION.to_string());
    }
    EXPIRY_LABELLED
        .captures(text)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().to_string())
}

fn capture_credential_id(text: &str) -> Option<String> {
    CREDENTIAL_LABELLED
        .captures(text)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().trim_end_matches(['.', ',']).to_string())
}

// ---------------------------------------------------------------------------
// Validator adapters
// ---------------------------------------------------------------------------

fn validate_name(value: &str, _: &FieldContext) -> Result<(), String> {
    validators::name(value)
}

fn validate_issuer(value: &str, ctx: &FieldContext) -> Result<(), String> {
    validators::issuer(value, ctx.name.as_deref())
}

fn validate_issue_date(value: &str, _: &FieldContext) -> Result<(), String> {
    validators::issue_date(value)
}

fn validate_expiry_date(value: &str, _: &FieldContext) -> Result<(), String> {
    validators::expiry_date(value)
}

fn validate_credential_id(value: &str, _: &FieldContext) -> Result<(), String> {
    validators::credential_id(value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use scraper::Html;

    fn item<'a>(doc: &'a Html) -> ElementRef<'a> {
        let sel = Selector::parse("li").unwrap();
        doc.select(&sel).next().unwrap()
    }

    fn base() -> Url {
        Url::parse("https://www.example.com/in/jane-doe/details/certifications/").unwrap()
    }

    const WELL_FORMED: &str = r#"<ul><li class="pvs-list__paged-list-item">
        <div class="display-flex">
            <div class="t-bold"><span aria-hidden="true">AWS Certified Solutions Architect</span><span class="visually-hidden">AWS Certified Solutions Architect</span></div>
            <span class="t-14 t-normal"><span aria-hidden="true">Amazon Web Services (AWS)</span></span>
            <span class="t-14 t-normal t-black--light"><span aria-hidden="true">Issued Jan 2024 · Expires Jan 2027</span></span>
            <span class="t-14 t-normal t-black--light"><span aria-hidden="true">Credential ID AWS-SAA-123</span></span>
        </div>
        <a class="optional-action-target-wrapper" href="/redir/redirect?url=https%3A%2F%2Fcredly.com%2Fbadges%2Fx">Show credential</a>
    </li></ul>"#;

    #[test]
    fn well_formed_item_resolves_structurally() {
        let doc = Html::parse_document(WELL_FORMED);
        let fields = extract_item(item(&doc), Some(&base()));

        assert_eq!(fields.name.value, "AWS Certified Solutions Architect");
        assert_eq!(fields.name.source.as_deref(), Some("name:bold_aria"));
        assert_eq!(fields.issuer.value, "Amazon Web Services (AWS)");
        assert_eq!(fields.issuer.source.as_deref(), Some("issuer:normal_aria"));
        assert_eq!(fields.issue_date.value, "Jan 2024");
        assert_eq!(fields.expiry_date.value, "Jan 2027");
        assert_eq!(fields.credential_id.value, "AWS-SAA-123");
        assert!(fields.credential_id.source.as_deref().unwrap().starts_with("credential_id:"));
        assert_eq!(
            fields.verify_link.value,
            "https://www.example.com/redir/redirect?url=https%3A%2F%2Fcredly.com%2Fbadges%2Fx"
        );

        for kind in FieldKind::ALL {
            let source = fields.get(kind).source.as_deref().unwrap_or_default();
            assert!(!source.ends_with("_text"), "{kind} fell back to regex: {source}");
        }
    }

    #[test]
    fn date_shaped_issuer_is_never_accepted() {
        let html = r#"<ul><li>
            <div class="t-bold"><span aria-hidden="true">Google Data Analytics</span></div>
            <span class="t-14 t-normal"><span aria-hidden="true">Issued Jan 2024</span></span>
        </li></ul>"#;
        let doc = Html::parse_document(html);
        let fields = extract_item(item(&doc), None);

        assert_ne!(fields.issuer.value, "Issued Jan 2024");
        assert!(fields.issuer.value.is_empty());
        assert!(fields.issuer.attempts.iter().any(|e| matches!(
            &e.outcome,
            Outcome::Rejected { value } if value == "Issued Jan 2024"
        )));
        assert_eq!(fields.issue_date.value, "Jan 2024");
    }

    #[test]
    fn no_expiration_is_distinct_from_unknown() {
        let html = r#"<ul><li>
            <h3>Scrum Master</h3>
            <span class="t-black--light">Issued Mar 2022 · No Expiration Date</span>
        </li></ul>"#;
        let doc = Html::parse_document(html);
        let fields = extract_item(item(&doc), None);
        assert_eq!(fields.expiry_date.value, NO_EXPIRATION);

        let html = r#"<ul><li><h3>Scrum Master</h3><span class="t-black--light">Issued Mar 2022</span></li></ul>"#;
        let doc = Html::parse_document(html);
        let fields = extract_item(item(&doc), None);
        assert_eq!(fields.expiry_date.value, "");
        assert!(!fields.expiry_date.is_resolved());
    }

    #[test]
    fn name_falls_back_to_text_patterns() {
        let html = r#"<ul><li><div>Certified Kubernetes Administrator Issued by The Linux Foundation</div></li></ul>"#;
        let doc = Html::parse_document(html);
        let fields = extract_item(item(&doc), None);
        assert_eq!(fields.name.value, "Certified Kubernetes Administrator");
        assert_eq!(fields.name.source.as_deref(), Some("name:before_issuer_label"));
        assert_eq!(fields.issuer.value, "The Linux Foundation");
        assert_eq!(fields.issuer.source.as_deref(), Some("issuer:label_text"));
    }

    #[test]
    fn empty_name_exhausts_every_strategy() {
        let doc = Html::parse_document("<ul><li><span>—</span></li></ul>");
        let result = extract_field(item(&doc), FieldKind::Name, &FieldContext::default());
        assert!(!result.is_resolved());
        // six locators, three patterns, and the unresolved marker
        assert_eq!(result.attempts.len(), 10);
        assert_eq!(result.attempts.last().unwrap().outcome, Outcome::Unresolved);
    }

    #[test]
    fn relative_links_become_absolute() {
        let html = r#"<ul><li><h3>CKA</h3><a href="../../verify/abc">See credential</a></li></ul>"#;
        let doc = Html::parse_document(html);
        let ctx = FieldContext {
            base: Some(base()),
            name: None,
        };
        let link = extract_field(item(&doc), FieldKind::VerifyLink, &ctx);
        assert_eq!(link.value, "https://www.example.com/in/jane-doe/verify/abc");
        assert_eq!(link.source.as_deref(), Some("verify_link:href_verify"));

        // Without a base the relative link is dropped rather than returned as-is.
        let link = extract_field(item(&doc), FieldKind::VerifyLink, &FieldContext::default());
        assert!(link.value.is_empty());
    }

    #[test]
    fn hidden_credential_decoy_is_ignored() {
        let html = r#"<ul><li>
            <h3>Azure Fundamentals</h3>
            <span class="honeypot">Credential ID FAKE-999</span>
            <span>Credential ID: REAL-42</span>
        </li></ul>"#;
        let doc = Html::parse_document(html);
        let fields = extract_item(item(&doc), None);
        assert_eq!(fields.credential_id.value, "REAL-42");
    }
}
