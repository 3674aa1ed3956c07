//! Offline, deterministic document source.
//!
//! `StaticSite` serves registered pages by URL. It models the behaviours the
//! navigation controller has to cope with: server-side redirects, fragments
//! that only render after enough scrolling, waits that never settle, and
//! hosts that cannot be reached. Every handle operation is appended to a
//! shared action log.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use certscrape_shared::{CertScrapeError, Result};
use tracing::debug;
use url::Url;

use crate::handle::{DocumentHandle, DocumentSource, ScrollTarget, WaitCondition, blank_location};
use crate::node::{self, Node};

/// Markup served for unknown paths on a known host.
const NOT_FOUND_PAGE: &str =
    "<html><body><main><h1>Page not found</h1><p>This page doesn't exist.</p></main></body></html>";

/// Redirect chains longer than this are treated as loops.
const MAX_REDIRECT_HOPS: usize = 10;

/// Marker replaced by a deferred fragment once it is revealed.
pub const DEFERRED_MARKER: &str = "<!-- deferred -->";

// ---------------------------------------------------------------------------
// Pages
// ---------------------------------------------------------------------------

/// One page of a [`StaticSite`].
#[derive(Debug, Clone)]
pub struct StaticPage {
    html: String,
    deferred: Option<Deferred>,
    stall_idle: bool,
}

#[derive(Debug, Clone)]
struct Deferred {
    after_scrolls: usize,
    fragment: String,
}

impl StaticPage {
    pub fn new(html: impl Into<String>) -> Self {
        Self {
            html: html.into(),
            deferred: None,
            stall_idle: false,
        }
    }

    /// Reveal `fragment` once at least `after_scrolls` downward scroll steps ran.
    ///
    /// The fragment replaces [`DEFERRED_MARKER`] if present, otherwise it is
    /// inserted before `</body>`.
    pub fn with_deferred(mut self, after_scrolls: usize, fragment: impl Into<String>) -> Self {
        self.deferred = Some(Deferred {
            after_scrolls,
            fragment: fragment.into(),
        });
        self
    }

    /// Make `wait_for(Idle)` never settle on this page.
    pub fn stalled(mut self) -> Self {
        self.stall_idle = true;
        self
    }

    fn render(&self, scrolls: usize) -> String {
        match &self.deferred {
            Some(d) if scrolls >= d.after_scrolls => {
                if self.html.contains(DEFERRED_MARKER) {
                    self.html.replacen(DEFERRED_MARKER, &d.fragment, 1)
                } else if let Some(pos) = self.html.rfind("</body>") {
                    let mut out = self.html.clone();
                    out.insert_str(pos, &d.fragment);
                    out
                } else {
                    format!("{}{}", self.html, d.fragment)
                }
            }
            _ => self.html.clone(),
        }
    }
}

impl From<&str> for StaticPage {
    fn from(html: &str) -> Self {
        Self::new(html)
    }
}

impl From<String> for StaticPage {
    fn from(html: String) -> Self {
        Self::new(html)
    }
}

// ---------------------------------------------------------------------------
// Action log
// ---------------------------------------------------------------------------

/// One recorded handle operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    Navigate(String),
    Reload,
    Wait(WaitCondition),
    ScrollBy(i64),
    ScrollTo(ScrollTarget),
    Click(String),
    Close,
}

/// Shared, append-only log of handle operations.
#[derive(Debug, Clone, Default)]
pub struct ActionLog(Arc<Mutex<Vec<Action>>>);

impl ActionLog {
    fn push(&self, action: Action) {
        self.0
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push(action);
    }

    /// Copy of everything recorded so far.
    pub fn snapshot(&self) -> Vec<Action> {
        self.0
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    /// Number of recorded actions matching `pred`.
    pub fn count(&self, pred: impl Fn(&Action) -> bool) -> usize {
        self.snapshot().iter().filter(|a| pred(a)).count()
    }
}

// ---------------------------------------------------------------------------
// Site
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default)]
struct SiteInner {
    hosts: HashSet<String>,
    pages: HashMap<String, StaticPage>,
    redirects: HashMap<String, Url>,
}

impl SiteInner {
    fn resolve(&self, url: &Url) -> Result<Url> {
        let mut current = url.clone();
        for _ in 0..MAX_REDIRECT_HOPS {
            if !self.knows_host(&current) {
                return Err(CertScrapeError::Unreachable {
                    url: current.to_string(),
                });
            }
            match self.redirects.get(&page_key(&current)) {
                Some(next) => current = next.clone(),
                None => return Ok(current),
            }
        }
        Err(CertScrapeError::Network(format!("redirect loop at {url}")))
    }

    fn knows_host(&self, url: &Url) -> bool {
        url.host_str().is_some_and(|h| self.hosts.contains(h))
    }

    fn page(&self, url: &Url) -> Option<&StaticPage> {
        self.pages.get(&page_key(url))
    }
}

/// A set of pages keyed by host and path.
#[derive(Debug, Clone, Default)]
pub struct StaticSite {
    inner: Arc<SiteInner>,
    log: ActionLog,
}

impl StaticSite {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a page at `url` (query and fragment are ignored).
    pub fn with_page(mut self, url: &Url, page: impl Into<StaticPage>) -> Self {
        let inner = Arc::make_mut(&mut self.inner);
        if let Some(host) = url.host_str() {
            inner.hosts.insert(host.to_string());
        }
        inner.pages.insert(page_key(url), page.into());
        self
    }

    /// Answer requests for `from` with a redirect to `to`.
    pub fn with_redirect(mut self, from: &Url, to: &Url) -> Self {
        let inner = Arc::make_mut(&mut self.inner);
        for u in [from, to] {
            if let Some(host) = u.host_str() {
                inner.hosts.insert(host.to_string());
            }
        }
        inner.redirects.insert(page_key(from), to.clone());
        self
    }

    /// The log shared by every handle this site opened.
    pub fn action_log(&self) -> ActionLog {
        self.log.clone()
    }
}

#[async_trait]
impl DocumentSource for StaticSite {
    async fn open(&self) -> Result<Box<dyn DocumentHandle>> {
        Ok(Box::new(StaticDocument {
            site: Arc::clone(&self.inner),
            log: self.log.clone(),
            location: blank_location(),
            scrolls: 0,
            closed: false,
        }))
    }

    fn name(&self) -> &str {
        "static"
    }
}

// ---------------------------------------------------------------------------
// Handle
// ---------------------------------------------------------------------------

/// Handle over a [`StaticSite`].
pub struct StaticDocument {
    site: Arc<SiteInner>,
    log: ActionLog,
    location: Url,
    scrolls: usize,
    closed: bool,
}

impl StaticDocument {
    fn ensure_open(&self) -> Result<()> {
        if self.closed {
            return Err(CertScrapeError::document("handle already closed"));
        }
        Ok(())
    }

    fn current_page(&self) -> Option<&StaticPage> {
        self.site.page(&self.location)
    }

    fn markup(&self) -> String {
        if self.location.scheme() == "about" {
            return "<html><head></head><body></body></html>".to_string();
        }
        self.current_page()
            .map(|p| p.render(self.scrolls))
            .unwrap_or_else(|| NOT_FOUND_PAGE.to_string())
    }

    fn load(&mut self, url: &Url) -> Result<()> {
        let landed = self.site.resolve(url)?;
        debug!(requested = %url, %landed, "static navigation");
        self.location = landed;
        self.scrolls = 0;
        Ok(())
    }
}

#[async_trait]
impl DocumentHandle for StaticDocument {
    async fn navigate(&mut self, url: &Url) -> Result<()> {
        self.ensure_open()?;
        self.log.push(Action::Navigate(url.to_string()));
        self.load(url)
    }

    async fn current_location(&self) -> Result<Url> {
        self.ensure_open()?;
        Ok(self.location.clone())
    }

    async fn wait_for(&mut self, condition: &WaitCondition, timeout: Duration) -> Result<()> {
        self.ensure_open()?;
        self.log.push(Action::Wait(condition.clone()));

        let settled = match condition {
            WaitCondition::Idle => !self.current_page().is_some_and(|p| p.stall_idle),
            WaitCondition::Selector(sel) => !node::query_markup(&self.markup(), sel)?.is_empty(),
            WaitCondition::LocationContains(text) => self.location.as_str().contains(text.as_str()),
        };

        if settled {
            return Ok(());
        }

        // Static content never changes while waiting.
        tokio::time::sleep(timeout).await;
        Err(CertScrapeError::Timeout {
            stage: format!("wait_for({condition:?})"),
            after_ms: timeout.as_millis() as u64,
        })
    }

    async fn scroll_by(&mut self, dy: i64) -> Result<()> {
        self.ensure_open()?;
        self.log.push(Action::ScrollBy(dy));
        if dy > 0 {
            self.scrolls += 1;
        }
        Ok(())
    }

    async fn scroll_to(&mut self, target: ScrollTarget) -> Result<()> {
        self.ensure_open()?;
        self.log.push(Action::ScrollTo(target));
        Ok(())
    }

    async fn query(&self, selector: &str) -> Result<Vec<Node>> {
        self.ensure_open()?;
        node::query_markup(&self.markup(), selector)
    }

    async fn click(&mut self, target: &Node) -> Result<()> {
        self.ensure_open()?;
        let href = node::href_at(&self.markup(), target.path())
            .ok_or_else(|| CertScrapeError::document("click target is not a link"))?;
        self.log.push(Action::Click(href.clone()));

        let next = self
            .location
            .join(&href)
            .map_err(|e| CertScrapeError::document(format!("bad href {href:?}: {e}")))?;
        self.load(&next)
    }

    async fn content(&self) -> Result<String> {
        self.ensure_open()?;
        Ok(self.markup())
    }

    async fn reload(&mut self) -> Result<()> {
        self.ensure_open()?;
        self.log.push(Action::Reload);
        let here = self.location.clone();
        self.load(&here)
    }

    async fn close(&mut self) -> Result<()> {
        if !self.closed {
            self.log.push(Action::Close);
            self.closed = true;
        }
        Ok(())
    }
}

/// Lookup key: host plus path without trailing slash.
fn page_key(url: &Url) -> String {
    format!(
        "{}{}",
        url.host_str().unwrap_or_default(),
        url.path().trim_end_matches('/')
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn url(s: &str) -> Url {
        Url::parse(s).unwrap()
    }

    fn site() -> StaticSite {
        StaticSite::new()
            .with_page(
                &url("https://example.com/in/jane/"),
                StaticPage::new(
                    "<html><body><main><a id=\"more\" href=\"/in/jane/details/certifications/\">Show all</a><!-- deferred --></main></body></html>",
                )
                .with_deferred(2, "<section id=\"late\">late</section>"),
            )
            .with_page(
                &url("https://example.com/in/jane/details/certifications/"),
                "<html><body><main><h2>Certifications</h2></main></body></html>",
            )
            .with_redirect(
                &url("https://example.com/in/bob/details/certifications/"),
                &url("https://example.com/in/bob/"),
            )
    }

    #[tokio::test]
    async fn redirects_change_location() {
        let site = site();
        let mut doc = site.open().await.unwrap();
        doc.navigate(&url("https://example.com/in/bob/details/certifications/"))
            .await
            .unwrap();
        let here = doc.current_location().await.unwrap();
        assert_eq!(here.path(), "/in/bob/");
        assert!(doc.content().await.unwrap().contains("Page not found"));
    }

    #[tokio::test]
    async fn unknown_host_is_unreachable() {
        let site = site();
        let mut doc = site.open().await.unwrap();
        let err = doc
            .navigate(&url("https://elsewhere.test/"))
            .await
            .unwrap_err();
        assert!(matches!(err, CertScrapeError::Unreachable { .. }));
    }

    #[tokio::test]
    async fn deferred_fragment_needs_scrolling() {
        let site = site();
        let mut doc = site.open().await.unwrap();
        doc.navigate(&url("https://example.com/in/jane")).await.unwrap();
        assert!(!doc.content().await.unwrap().contains("late"));

        doc.scroll_by(800).await.unwrap();
        doc.scroll_by(-200).await.unwrap();
        assert!(!doc.content().await.unwrap().contains("late"));

        doc.scroll_by(800).await.unwrap();
        assert!(doc.content().await.unwrap().contains("id=\"late\""));

        doc.reload().await.unwrap();
        assert!(!doc.content().await.unwrap().contains("late"));
    }

    #[tokio::test]
    async fn click_follows_relative_href() {
        let site = site();
        let mut doc = site.open().await.unwrap();
        doc.navigate(&url("https://example.com/in/jane/")).await.unwrap();
        let links = doc.query("a#more").await.unwrap();
        doc.click(&links[0]).await.unwrap();
        let here = doc.current_location().await.unwrap();
        assert_eq!(here.path(), "/in/jane/details/certifications/");
        assert!(
            site.action_log()
                .snapshot()
                .contains(&Action::Click("/in/jane/details/certifications/".into()))
        );
    }

    #[tokio::test]
    async fn stalled_idle_times_out_and_handle_still_closes() {
        let site = StaticSite::new().with_page(
            &url("https://example.com/slow"),
            StaticPage::new("<html><body></body></html>").stalled(),
        );
        let mut doc = site.open().await.unwrap();
        doc.navigate(&url("https://example.com/slow")).await.unwrap();
        let err = doc
            .wait_for(&WaitCondition::Idle, Duration::from_millis(5))
            .await
            .unwrap_err();
        assert!(matches!(err, CertScrapeError::Timeout { .. }));
        doc.close().await.unwrap();
        assert!(doc.content().await.is_err());
    }

    #[tokio::test]
    async fn selector_wait_checks_markup() {
        let site = site();
        let mut doc = site.open().await.unwrap();
        doc.navigate(&url("https://example.com/in/jane/details/certifications/"))
            .await
            .unwrap();
        doc.wait_for(&WaitCondition::Selector("main h2".into()), Duration::ZERO)
            .await
            .unwrap();
        assert!(
            doc.wait_for(&WaitCondition::Selector("main li".into()), Duration::ZERO)
                .await
                .is_err()
        );
    }
}
