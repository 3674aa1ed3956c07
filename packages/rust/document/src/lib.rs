//! Document sources for certscrape.
//!
//! A [`DocumentSource`] opens one isolated [`DocumentHandle`] per request.
//! Two sources ship with the workspace:
//! - [`StaticSite`]: registered pages served offline, with an action log
//! - [`HttpSource`]: server-rendered pages fetched over HTTP

pub mod fixture;
pub mod handle;
pub mod http;
pub mod node;
pub mod visibility;

pub use fixture::{Action, ActionLog, DEFERRED_MARKER, StaticDocument, StaticPage, StaticSite};
pub use handle::{DocumentHandle, DocumentSource, ScrollTarget, WaitCondition, blank_location};
pub use http::{HttpDocument, HttpSource};
pub use node::{Node, NodePath, href_at, normalize_text, parse_selector, query_markup};
pub use visibility::{hides_itself, is_visible};
