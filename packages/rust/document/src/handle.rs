//! The document-source seam.
//!
//! The browser layer lives outside this workspace; everything the extraction
//! core needs from it is expressed by [`DocumentSource`] and
//! [`DocumentHandle`].

use std::time::Duration;

use async_trait::async_trait;
use certscrape_shared::Result;
use url::Url;

use crate::node::Node;

/// Condition a handle can wait on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WaitCondition {
    /// Document finished loading and the network went quiet.
    Idle,
    /// At least one element matches the CSS selector.
    Selector(String),
    /// The current location contains the text.
    LocationContains(String),
}

/// Absolute scroll positions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScrollTarget {
    Top,
    Middle,
    Bottom,
}

/// A live document. Acquired per request and closed at request end.
///
/// Operations are issued strictly in sequence; a handle is never shared
/// between concurrent tasks.
#[async_trait]
pub trait DocumentHandle: Send {
    /// Load `url`. Redirects are followed; check [`current_location`](Self::current_location) afterwards.
    async fn navigate(&mut self, url: &Url) -> Result<()>;

    /// Where the document actually is right now.
    async fn current_location(&self) -> Result<Url>;

    /// Resolve once `condition` holds, or fail with `Timeout` after `timeout`.
    async fn wait_for(&mut self, condition: &WaitCondition, timeout: Duration) -> Result<()>;

    /// Scroll vertically by `dy` pixels (negative scrolls up).
    async fn scroll_by(&mut self, dy: i64) -> Result<()>;

    async fn scroll_to(&mut self, target: ScrollTarget) -> Result<()>;

    /// Snapshot every element matching a CSS selector.
    async fn query(&self, selector: &str) -> Result<Vec<Node>>;

    /// Click the element a previous [`query`](Self::query) returned.
    async fn click(&mut self, node: &Node) -> Result<()>;

    /// Serialized markup of the current document.
    async fn content(&self) -> Result<String>;

    async fn reload(&mut self) -> Result<()>;

    /// Release the handle. Must succeed even after an abandoned wait.
    async fn close(&mut self) -> Result<()>;
}

/// Factory for isolated per-request handles.
#[async_trait]
pub trait DocumentSource: Send + Sync {
    async fn open(&self) -> Result<Box<dyn DocumentHandle>>;

    /// Human-readable source name for tracing.
    fn name(&self) -> &str;
}

/// The blank location every fresh handle starts on.
pub fn blank_location() -> Url {
    Url::parse("about:blank").expect("about:blank is a valid URL")
}
