//! End-to-end scrape: request → document handle → navigation → extraction → envelope.

use chrono::Utc;
use tracing::{info, instrument, warn};

use certscrape_document::DocumentSource;
use certscrape_extract::{AssemblyMeta, assemble};
use certscrape_shared::{
    CertScrapeError, DebugTrail, NavigationConfig, Outcome, RequestId, Result, ScrapeEnvelope,
    ScrapeRequest, SourceTag, Stage,
};

use crate::navigation::{Acquisition, Deadline, Locations, NavigationController};

/// Progress callback for reporting pipeline status.
pub trait ProgressReporter: Send + Sync {
    /// Called when entering a new phase.
    fn phase(&self, name: &str);
    /// Called once the envelope is ready.
    fn done(&self, envelope: &ScrapeEnvelope);
}

/// No-op progress reporter for headless/test usage.
pub struct SilentProgress;

impl ProgressReporter for SilentProgress {
    fn phase(&self, _name: &str) {}
    fn done(&self, _envelope: &ScrapeEnvelope) {}
}

/// Run one scrape request against `source`.
///
/// Zero records is not an error: the envelope says `found: false` and the
/// debug trail tells "nothing there" apart from "redirected" or "blocked".
/// Only a fatal navigation failure or the request deadline return `Err`.
/// The document handle is closed on every path.
#[instrument(skip_all, fields(target = %request.target, source = source.name()))]
pub async fn scrape(
    source: &dyn DocumentSource,
    request: &ScrapeRequest,
    config: &NavigationConfig,
    progress: &dyn ProgressReporter,
) -> Result<ScrapeEnvelope> {
    let request_id = RequestId::new();
    let locations = Locations::resolve(&request.target, &config.detail_suffix)?;
    info!(%request_id, profile = %locations.profile, "starting scrape");

    let mut doc = source.open().await?;
    let deadline = Deadline::start(config.request_deadline);
    let mut trail = DebugTrail::new();
    let controller = NavigationController::new(config, &request.flags, progress);

    let outcome = tokio::time::timeout(
        config.request_deadline,
        controller.acquire(doc.as_mut(), &locations, &deadline, &mut trail),
    )
    .await;

    if let Err(e) = doc.close().await {
        warn!(error = %e, "failed to close document handle");
    }

    let acquisition = match outcome {
        Ok(result) => result?,
        Err(_) => {
            warn!(elapsed_ms = deadline.elapsed_ms(), "request deadline exceeded");
            return Err(CertScrapeError::DeadlineExceeded {
                elapsed_ms: deadline.elapsed_ms(),
            });
        }
    };

    let envelope = build_envelope(request_id, request, acquisition, trail);
    info!(
        found = envelope.found,
        records = envelope.total_records,
        auth = %envelope.auth_state,
        "scrape finished"
    );
    progress.done(&envelope);
    Ok(envelope)
}

fn build_envelope(
    request_id: RequestId,
    request: &ScrapeRequest,
    acquisition: Acquisition,
    mut trail: DebugTrail,
) -> ScrapeEnvelope {
    let navigation = trail.stage_summary(Stage::Navigation);
    let blocked: Vec<String> = trail
        .for_stage(Stage::Page)
        .filter(|e| matches!(e.outcome, Outcome::Blocked { .. }))
        .map(|e| format!("{}={}", e.strategy, e.outcome))
        .collect();
    let auth_state = acquisition.auth_state;

    let (records, summary) = match acquisition.extraction {
        Some(extraction) => {
            trail.extend(extraction.trail);
            (extraction.records, extraction.summary)
        }
        None => {
            let empty = assemble(
                Vec::new(),
                AssemblyMeta {
                    auth_state,
                    region_strategy: None,
                    pattern: None,
                    source_tag: SourceTag::MainProfile,
                },
            );
            trail.extend(empty.trail);
            (empty.records, empty.summary)
        }
    };

    let mut debug_trail = if navigation.is_empty() {
        summary
    } else {
        format!("{summary} | nav:{navigation}")
    };
    if !blocked.is_empty() {
        debug_trail.push_str(&format!(" | page:{}", blocked.join(">")));
    }

    ScrapeEnvelope {
        request_id,
        url: request.target.to_string(),
        found: !records.is_empty(),
        total_records: records.len(),
        records,
        debug_trail,
        auth_state,
        trail: trail.into_entries(),
        scraped_at: Utc::now(),
    }
}
