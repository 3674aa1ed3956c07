//! HTTP-backed document source.
//!
//! Fetches server-rendered markup with `reqwest`. There is no script engine,
//! so scrolling is a no-op and waits only check the markup already fetched.
//! It is enough for pages that render on the server and for replaying
//! captured pages behind a local server.

use std::time::Duration;

use async_trait::async_trait;
use certscrape_shared::{CertScrapeError, HttpConfig, Result};
use reqwest::Client;
use tracing::{debug, warn};
use url::Url;

use crate::handle::{DocumentHandle, DocumentSource, ScrollTarget, WaitCondition, blank_location};
use crate::node::{self, Node};

// ---------------------------------------------------------------------------
// Source
// ---------------------------------------------------------------------------

/// Opens [`HttpDocument`]s sharing one connection pool.
pub struct HttpSource {
    client: Client,
}

impl HttpSource {
    /// Build a source from the `[http]` config section.
    pub fn new(config: &HttpConfig) -> Result<Self> {
        let client = Client::builder()
            .user_agent(config.user_agent.as_str())
            .redirect(reqwest::redirect::Policy::limited(config.max_redirects))
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| CertScrapeError::Network(format!("failed to build HTTP client: {e}")))?;

        Ok(Self { client })
    }
}

#[async_trait]
impl DocumentSource for HttpSource {
    async fn open(&self) -> Result<Box<dyn DocumentHandle>> {
        Ok(Box::new(HttpDocument {
            client: self.client.clone(),
            location: blank_location(),
            body: String::new(),
            closed: false,
        }))
    }

    fn name(&self) -> &str {
        "http"
    }
}

// ---------------------------------------------------------------------------
// Handle
// ---------------------------------------------------------------------------

/// One fetched page plus the location it ended up at.
pub struct HttpDocument {
    client: Client,
    location: Url,
    body: String,
    closed: bool,
}

impl HttpDocument {
    fn ensure_open(&self) -> Result<()> {
        if self.closed {
            return Err(CertScrapeError::document("handle already closed"));
        }
        Ok(())
    }

    async fn fetch(&mut self, url: &Url) -> Result<()> {
        debug!(%url, "fetching document");

        let response = self
            .client
            .get(url.as_str())
            .send()
            .await
            .map_err(|e| map_send_error(url, e))?;

        let status = response.status();
        let landed = response.url().clone();
        if !status.is_success() {
            // Error pages are still documents; the caller decides what they mean.
            warn!(%url, %landed, %status, "non-success status");
        }

        let body = response
            .text()
            .await
            .map_err(|e| CertScrapeError::Network(format!("{url}: body read failed: {e}")))?;

        self.location = landed;
        self.body = body;
        Ok(())
    }
}

fn map_send_error(url: &Url, e: reqwest::Error) -> CertScrapeError {
    if e.is_timeout() {
        CertScrapeError::Timeout {
            stage: format!("fetch {url}"),
            after_ms: 0,
        }
    } else if e.is_connect() {
        CertScrapeError::Unreachable {
            url: url.to_string(),
        }
    } else {
        CertScrapeError::Network(format!("{url}: {e}"))
    }
}

#[async_trait]
impl DocumentHandle for HttpDocument {
    async fn navigate(&mut self, url: &Url) -> Result<()> {
        self.ensure_open()?;
        self.fetch(url).await
    }

    async fn current_location(&self) -> Result<Url> {
        self.ensure_open()?;
        Ok(self.location.clone())
    }

    async fn wait_for(&mut self, condition: &WaitCondition, timeout: Duration) -> Result<()> {
        self.ensure_open()?;
        let settled = match condition {
            WaitCondition::Idle => true,
            WaitCondition::Selector(sel) => !node::query_markup(&self.body, sel)?.is_empty(),
            WaitCondition::LocationContains(text) => self.location.as_str().contains(text.as_str()),
        };
        if settled {
            Ok(())
        } else {
            Err(CertScrapeError::Timeout {
                stage: format!("wait_for({condition:?})"),
                after_ms: timeout.as_millis() as u64,
            })
        }
    }

    async fn scroll_by(&mut self, _dy: i64) -> Result<()> {
        self.ensure_open()
    }

    async fn scroll_to(&mut self, _target: ScrollTarget) -> Result<()> {
        self.ensure_open()
    }

    async fn query(&self, selector: &str) -> Result<Vec<Node>> {
        self.ensure_open()?;
        node::query_markup(&self.body, selector)
    }

    async fn click(&mut self, target: &Node) -> Result<()> {
        self.ensure_open()?;
        let href = node::href_at(&self.body, target.path())
            .ok_or_else(|| CertScrapeError::document("click target is not a link"))?;
        let next = self
            .location
            .join(&href)
            .map_err(|e| CertScrapeError::document(format!("bad href {href:?}: {e}")))?;
        self.fetch(&next).await
    }

    async fn content(&self) -> Result<String> {
        self.ensure_open()?;
        Ok(self.body.clone())
    }

    async fn reload(&mut self) -> Result<()> {
        self.ensure_open()?;
        let here = self.location.clone();
        self.fetch(&here).await
    }

    async fn close(&mut self) -> Result<()> {
        self.closed = true;
        self.body.clear();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn source() -> HttpSource {
        HttpSource::new(&HttpConfig::default()).expect("client")
    }

    #[tokio::test]
    async fn redirect_is_visible_in_location() {
        let server = wiremock::MockServer::start().await;

        wiremock::Mock::given(wiremock::matchers::method("GET"))
            .and(wiremock::matchers::path("/in/jane/details/certifications/"))
            .respond_with(
                wiremock::ResponseTemplate::new(302)
                    .insert_header("location", format!("{}/in/jane/", server.uri())),
            )
            .mount(&server)
            .await;

        wiremock::Mock::given(wiremock::matchers::method("GET"))
            .and(wiremock::matchers::path("/in/jane/"))
            .respond_with(
                wiremock::ResponseTemplate::new(200)
                    .set_body_string("<html><body><main><h1>Jane</h1></main></body></html>"),
            )
            .mount(&server)
            .await;

        let mut doc = source().open().await.unwrap();
        let target = Url::parse(&format!("{}/in/jane/details/certifications/", server.uri())).unwrap();
        doc.navigate(&target).await.unwrap();

        let here = doc.current_location().await.unwrap();
        assert_eq!(here.path(), "/in/jane/");
        let h1 = doc.query("h1").await.unwrap();
        assert_eq!(h1[0].text(), "Jane");
    }

    #[tokio::test]
    async fn error_status_still_loads_markup() {
        let server = wiremock::MockServer::start().await;
        wiremock::Mock::given(wiremock::matchers::path("/gone"))
            .respond_with(
                wiremock::ResponseTemplate::new(404)
                    .set_body_string("<html><body><h1>Page not found</h1></body></html>"),
            )
            .mount(&server)
            .await;

        let mut doc = source().open().await.unwrap();
        let target = Url::parse(&format!("{}/gone", server.uri())).unwrap();
        doc.navigate(&target).await.unwrap();
        assert!(doc.content().await.unwrap().contains("Page not found"));
        doc.wait_for(&WaitCondition::Idle, Duration::ZERO).await.unwrap();
        assert!(
            doc.wait_for(&WaitCondition::Selector("li".into()), Duration::ZERO)
                .await
                .is_err()
        );
    }

    #[tokio::test]
    async fn closed_handle_rejects_operations() {
        let mut doc = source().open().await.unwrap();
        doc.close().await.unwrap();
        assert!(doc.content().await.is_err());
        doc.close().await.unwrap();
    }
}
