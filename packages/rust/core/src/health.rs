//! Blocked-page detection.
//!
//! A blocked request and a profile without credentials both end with zero
//! records. These signals, taken on the first landing, tell them apart.

use certscrape_document::DocumentHandle;
use certscrape_shared::{Outcome, Result, Stage, TrailEntry};
use tracing::{debug, warn};

/// Banner of the site's generic error page (lowercased).
const ERROR_PAGE_TEXT: &str = "something went wrong";

/// `main` text shorter than this is an empty shell.
const MIN_MAIN_CHARS: usize = 20;

/// One trail entry per check; `Blocked` when the check fired.
#[derive(Debug, Clone)]
pub struct PageHealth {
    pub signals: Vec<TrailEntry>,
}

impl PageHealth {
    pub fn is_blocked(&self) -> bool {
        self.signals
            .iter()
            .any(|e| matches!(e.outcome, Outcome::Blocked { .. }))
    }
}

/// Check the current document for an error page and for an empty DOM.
pub async fn inspect(doc: &dyn DocumentHandle) -> Result<PageHealth> {
    let body_text = doc
        .query("body")
        .await?
        .first()
        .map(|body| body.text().to_lowercase())
        .unwrap_or_default();
    let error_page = body_text.contains(ERROR_PAGE_TEXT);

    let sections = doc.query("section").await?.len();
    let main_chars = doc
        .query("main")
        .await?
        .first()
        .map_or(0, |main| main.text().chars().count());
    let dom_empty = sections == 0 || main_chars < MIN_MAIN_CHARS;

    let health = PageHealth {
        signals: vec![
            signal(
                "error_page",
                error_page.then(|| "something_went_wrong".to_string()),
            ),
            signal(
                "dom_empty",
                dom_empty.then(|| format!("sections:{sections},main_chars:{main_chars}")),
            ),
        ],
    };

    if health.is_blocked() {
        warn!(error_page, sections, main_chars, "landing looks blocked");
    } else {
        debug!(sections, main_chars, "landing looks healthy");
    }
    Ok(health)
}

fn signal(name: &str, blocked: Option<String>) -> TrailEntry {
    TrailEntry {
        stage: Stage::Page,
        strategy: name.to_string(),
        outcome: match blocked {
            Some(reason) => Outcome::Blocked { reason },
            None => Outcome::Miss,
        },
    }
}
