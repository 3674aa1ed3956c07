//! Request orchestration for certscrape.
//!
//! Ties the document source, the navigation controller and the extraction
//! pipeline together into one `scrape` call per request.

pub mod auth;
pub mod health;
pub mod navigation;
pub mod pipeline;

pub use auth::{AuthDetection, detect};
pub use health::{PageHealth, inspect};
pub use navigation::{Acquisition, Deadline, Locations, NavigationController};
pub use pipeline::{ProgressReporter, SilentProgress, scrape};
