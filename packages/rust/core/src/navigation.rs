//! Navigation controller: position a document where the credential records
//! can be extracted.
//!
//! Ordered, first success wins:
//! 1. direct attack on the detail view
//! 2. redirect detection (a distinct outcome, never "zero records")
//! 3. parent view with the scroll sequence
//! 4. expansion through the "show all" control
//! 5. bounded reload rounds of 3-4
//!
//! Navigation failures (unreachable target, navigation timeout) end the
//! request. Wait timeouts only end the attempt.

use std::sync::LazyLock;
use std::time::Duration;

use certscrape_document::{DocumentHandle, Node, NodePath, ScrollTarget, WaitCondition};
use certscrape_extract::{ExtractOptions, Extraction, extract};
use certscrape_shared::{
    AuthState, CertScrapeError, DebugTrail, NavigationConfig, Outcome, RequestFlags, Result,
    SourceTag, Stage,
};
use regex::Regex;
use tokio::time::Instant;
use tracing::{debug, info, instrument, warn};
use url::Url;

use crate::{auth, health};
use crate::pipeline::ProgressReporter;

static EXPAND_TEXT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)show all|tampilkan semua|see all|lihat semua").expect("valid regex")
});

/// Detail views the site serves besides the configured one.
const KNOWN_DETAIL_SUFFIXES: &[&str] = &["details/certifications", "details/licenses"];

const EXPAND_CONTROLS: &str = "a, button";
const EXPAND_BY_ID: &str = "[id*='navigation-index']";

// ---------------------------------------------------------------------------
// Locations
// ---------------------------------------------------------------------------

/// The locations one request works with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Locations {
    /// Profile (parent view), without query, fragment or trailing slash.
    pub profile: Url,
    /// Detail view: profile plus the detail suffix.
    pub detail: Url,
    /// Path markers of every detail view, the configured one first.
    detail_markers: Vec<String>,
}

impl Locations {
    /// Normalize a request target. A target already on the detail view is
    /// mapped back to its profile.
    pub fn resolve(target: &Url, detail_suffix: &str) -> Result<Self> {
        if !matches!(target.scheme(), "http" | "https") || target.host_str().is_none() {
            return Err(CertScrapeError::validation(format!(
                "unsupported target location: {target}"
            )));
        }
        let suffix = detail_suffix.trim_matches('/');
        if suffix.is_empty() {
            return Err(CertScrapeError::config("detail suffix is empty"));
        }
        let detail_marker = format!("/{suffix}");
        let mut detail_markers = vec![detail_marker.clone()];
        for known in KNOWN_DETAIL_SUFFIXES {
            let marker = format!("/{known}");
            if !detail_markers.contains(&marker) {
                detail_markers.push(marker);
            }
        }

        let path = target.path().trim_end_matches('/');
        let profile_path = detail_markers
            .iter()
            .filter_map(|marker| path.find(marker.as_str()))
            .min()
            .map_or(path, |idx| &path[..idx]);

        let mut profile = target.clone();
        profile.set_query(None);
        profile.set_fragment(None);
        profile.set_path(profile_path);

        let mut detail = profile.clone();
        detail.set_path(&format!("{profile_path}{detail_marker}/"));

        Ok(Self {
            profile,
            detail,
            detail_markers,
        })
    }

    /// Whether `url` is a detail view of this profile.
    pub fn is_detail(&self, url: &Url) -> bool {
        if same_page(url, &self.detail) {
            return true;
        }
        let profile_path = self.profile.path().trim_end_matches('/');
        let path = url.path().trim_end_matches('/');
        url.host_str() == self.profile.host_str()
            && path
                .strip_prefix(profile_path)
                .is_some_and(|rest| self.detail_markers.iter().any(|m| rest == m.as_str()))
    }

    pub fn is_profile(&self, url: &Url) -> bool {
        same_page(url, &self.profile)
    }

    /// Whether `url` is any detail-style view (the source tag follows this).
    pub fn on_detail_path(&self, url: &Url) -> bool {
        let path = url.path();
        self.detail_markers.iter().any(|m| path.contains(m.as_str()))
    }

    fn source_tag(&self, url: &Url) -> SourceTag {
        if self.on_detail_path(url) {
            SourceTag::DetailView
        } else {
            SourceTag::MainProfile
        }
    }
}

fn same_page(a: &Url, b: &Url) -> bool {
    a.host_str() == b.host_str() && a.path().trim_end_matches('/') == b.path().trim_end_matches('/')
}

// ---------------------------------------------------------------------------
// Deadline
// ---------------------------------------------------------------------------

/// Per-request ceiling, checked before every strategy attempt.
#[derive(Debug, Clone, Copy)]
pub struct Deadline {
    started: Instant,
    limit: Duration,
}

impl Deadline {
    pub fn start(limit: Duration) -> Self {
        Self {
            started: Instant::now(),
            limit,
        }
    }

    pub fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }

    pub fn elapsed_ms(&self) -> u64 {
        self.elapsed().as_millis() as u64
    }

    /// Fail with `DeadlineExceeded` once the ceiling has passed.
    pub fn check(&self, stage: &str) -> Result<()> {
        if self.elapsed() >= self.limit {
            warn!(stage, elapsed_ms = self.elapsed_ms(), "request deadline exceeded");
            return Err(CertScrapeError::DeadlineExceeded {
                elapsed_ms: self.elapsed_ms(),
            });
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Controller
// ---------------------------------------------------------------------------

/// Where the controller ended up and what it extracted there.
#[derive(Debug, Clone)]
pub struct Acquisition {
    /// Location that produced `extraction`.
    pub location: Url,
    pub source_tag: SourceTag,
    /// Last extraction performed; `None` when no view was ever extracted.
    pub extraction: Option<Extraction>,
    pub auth_state: AuthState,
}

impl Acquisition {
    pub fn found(&self) -> bool {
        self.extraction.as_ref().is_some_and(Extraction::found)
    }
}

/// One extracted view.
struct View {
    location: Url,
    extraction: Extraction,
}

pub struct NavigationController<'c> {
    config: &'c NavigationConfig,
    flags: &'c RequestFlags,
    progress: &'c dyn ProgressReporter,
}

impl<'c> NavigationController<'c> {
    pub fn new(
        config: &'c NavigationConfig,
        flags: &'c RequestFlags,
        progress: &'c dyn ProgressReporter,
    ) -> Self {
        Self {
            config,
            flags,
            progress,
        }
    }

    /// Run the strategy sequence on `doc`.
    #[instrument(skip_all, fields(profile = %locations.profile, detail_only = self.flags.detail_only))]
    pub async fn acquire(
        &self,
        doc: &mut dyn DocumentHandle,
        locations: &Locations,
        deadline: &Deadline,
        trail: &mut DebugTrail,
    ) -> Result<Acquisition> {
        let mut last: Option<View> = None;

        // Direct attack
        self.progress.phase("Opening detail view");
        deadline.check("direct_attack")?;
        self.goto(doc, &locations.detail, "direct_attack", trail).await?;

        let detection = auth::detect(&*doc).await?;
        trail.extend(detection.signals);
        let auth_state = detection.state;
        trail.extend(health::inspect(&*doc).await?.signals);

        let landed = doc.current_location().await?;
        if locations.is_detail(&landed) {
            self.scroll_sequence(doc).await?;
            let view = self.extract_view(&*doc, locations, auth_state).await?;
            if view.extraction.found() {
                info!(records = view.extraction.records.len(), "detail view extracted");
                trail.record(
                    Stage::Navigation,
                    "direct_attack",
                    Outcome::Landed {
                        location: landed.to_string(),
                    },
                );
                return Ok(self.finish(Some(view), locations, auth_state));
            }
            info!("detail view reached but nothing extracted");
            trail.record(Stage::Navigation, "direct_attack", Outcome::DetailEmpty);
            last = Some(view);
        } else {
            info!(%landed, "direct attack redirected");
            trail.record(
                Stage::Navigation,
                "direct_attack",
                Outcome::Redirected {
                    location: landed.to_string(),
                },
            );
        }

        if self.flags.detail_only {
            trail.record(
                Stage::Navigation,
                "parent_view",
                Outcome::Skipped {
                    reason: "detail_only".into(),
                },
            );
            return Ok(self.finish(last, locations, auth_state));
        }

        // Parent view, then bounded reload rounds.
        let rounds = self.config.reload_attempts + 1;
        for round in 0..rounds {
            let strategy = if round == 0 { "parent_view" } else { "reload" };
            deadline.check(strategy)?;

            if round == 0 {
                self.progress.phase("Scanning profile");
                self.goto(doc, &locations.profile, strategy, trail).await?;
            } else {
                let backoff = self.config.backoff_for(round);
                debug!(round, ?backoff, "backing off before reload");
                tokio::time::sleep(backoff).await;
                deadline.check(strategy)?;
                self.progress.phase("Reloading profile");
                self.reload_parent(doc, locations, trail).await?;
            }

            self.scroll_sequence(doc).await?;
            let view = self.extract_view(&*doc, locations, auth_state).await?;
            trail.record(
                Stage::Navigation,
                strategy,
                Outcome::Count {
                    value: view.extraction.records.len(),
                },
            );

            deadline.check("expand")?;
            if let Some(expanded) = self.expand(doc, locations, &view, auth_state, trail).await? {
                if expanded.extraction.found() {
                    return Ok(self.finish(Some(expanded), locations, auth_state));
                }
            }

            if view.extraction.found() {
                return Ok(self.finish(Some(view), locations, auth_state));
            }
            last = Some(view);
        }

        warn!(rounds, "no records after bounded retries");
        trail.record(
            Stage::Navigation,
            "retry",
            Outcome::Skipped {
                reason: format!("exhausted after {rounds} rounds"),
            },
        );
        Ok(self.finish(last, locations, auth_state))
    }

    fn finish(&self, view: Option<View>, locations: &Locations, auth_state: AuthState) -> Acquisition {
        match view {
            Some(View {
                location,
                extraction,
            }) => Acquisition {
                source_tag: locations.source_tag(&location),
                location,
                extraction: Some(extraction),
                auth_state,
            },
            None => Acquisition {
                location: locations.profile.clone(),
                source_tag: SourceTag::MainProfile,
                extraction: None,
                auth_state,
            },
        }
    }

    /// Navigate and settle. Navigation failures are fatal for the request.
    async fn goto(
        &self,
        doc: &mut dyn DocumentHandle,
        url: &Url,
        stage: &'static str,
        trail: &mut DebugTrail,
    ) -> Result<()> {
        let limit = self.config.navigation_timeout(self.flags.max_wait());
        match tokio::time::timeout(limit, doc.navigate(url)).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => {
                warn!(stage, %url, error = %e, "navigation failed");
                trail.record(
                    Stage::Navigation,
                    stage,
                    Outcome::Failed {
                        message: e.to_string(),
                    },
                );
                return Err(CertScrapeError::navigation(stage, e.to_string()));
            }
            Err(_) => {
                let after_ms = limit.as_millis() as u64;
                warn!(stage, %url, after_ms, "navigation timed out");
                trail.record(Stage::Navigation, stage, Outcome::TimedOut { after_ms });
                return Err(CertScrapeError::navigation(
                    stage,
                    format!("timed out after {after_ms} ms"),
                ));
            }
        }
        self.settle(doc, stage, trail).await
    }

    /// Reload the parent view, or return to it when elsewhere.
    async fn reload_parent(
        &self,
        doc: &mut dyn DocumentHandle,
        locations: &Locations,
        trail: &mut DebugTrail,
    ) -> Result<()> {
        let here = doc.current_location().await?;
        if !locations.is_profile(&here) {
            return self.goto(doc, &locations.profile, "reload", trail).await;
        }

        let limit = self.config.navigation_timeout(self.flags.max_wait());
        match tokio::time::timeout(limit, doc.reload()).await {
            Ok(Ok(())) => self.settle(doc, "reload", trail).await,
            Ok(Err(e)) => {
                warn!(error = %e, "reload failed");
                Err(CertScrapeError::navigation("reload", e.to_string()))
            }
            Err(_) => Err(CertScrapeError::navigation(
                "reload",
                format!("timed out after {} ms", limit.as_millis()),
            )),
        }
    }

    /// Idle wait bounded by the caller's budget, then the render delay.
    async fn settle(&self, doc: &mut dyn DocumentHandle, stage: &str, trail: &mut DebugTrail) -> Result<()> {
        match doc.wait_for(&WaitCondition::Idle, self.flags.max_wait()).await {
            Ok(()) => {}
            Err(CertScrapeError::Timeout { after_ms, .. }) => {
                warn!(stage, after_ms, "idle wait timed out, continuing");
                trail.record(
                    Stage::Navigation,
                    format!("{stage}:idle"),
                    Outcome::TimedOut { after_ms },
                );
            }
            Err(e) => return Err(e),
        }
        tokio::time::sleep(self.config.min_render_delay).await;
        Ok(())
    }

    /// Downward steps, a reverse nudge to unstick deferred content, then settle.
    async fn scroll_sequence(&self, doc: &mut dyn DocumentHandle) -> Result<()> {
        doc.scroll_to(ScrollTarget::Top).await?;
        for _ in 0..self.config.scroll_steps {
            doc.scroll_by(self.config.scroll_step_px).await?;
            tokio::time::sleep(self.config.scroll_pause).await;
        }
        doc.scroll_to(ScrollTarget::Bottom).await?;
        doc.scroll_by(-self.config.reverse_scroll_px).await?;
        tokio::time::sleep(self.config.scroll_pause).await;
        doc.scroll_to(ScrollTarget::Middle).await?;
        tokio::time::sleep(self.config.settle_pause).await;
        Ok(())
    }

    async fn extract_view(
        &self,
        doc: &dyn DocumentHandle,
        locations: &Locations,
        auth_state: AuthState,
    ) -> Result<View> {
        let location = doc.current_location().await?;
        let markup = doc.content().await?;
        let on_detail_view = locations.on_detail_path(&location);
        let extraction = extract(
            &markup,
            &ExtractOptions {
                location: Some(location.clone()),
                source_tag: locations.source_tag(&location),
                auth_state,
                on_detail_view,
            },
        );
        debug!(%location, summary = %extraction.summary, "view extracted");
        Ok(View {
            location,
            extraction,
        })
    }

    /// Trigger the expand control once and extract the resulting view.
    async fn expand(
        &self,
        doc: &mut dyn DocumentHandle,
        locations: &Locations,
        view: &View,
        auth_state: AuthState,
        trail: &mut DebugTrail,
    ) -> Result<Option<View>> {
        let skip = |trail: &mut DebugTrail, reason: &str| {
            trail.record(
                Stage::Navigation,
                "expand",
                Outcome::Skipped {
                    reason: reason.into(),
                },
            );
        };

        if !self.flags.expand_all {
            skip(trail, "disabled");
            return Ok(None);
        }
        if auth_state == AuthState::Guest {
            skip(trail, "guest");
            return Ok(None);
        }
        let Some(region) = view.extraction.region_path.as_ref() else {
            skip(trail, "no region");
            return Ok(None);
        };
        let Some(control) = find_expand_control(&*doc, region).await? else {
            trail.record(Stage::Navigation, "expand", Outcome::Miss);
            return Ok(None);
        };

        self.progress.phase("Expanding list");
        debug!(text = control.text(), "clicking expand control");
        if let Err(e) = doc.click(&control).await {
            warn!(error = %e, "expand click failed");
            trail.record(
                Stage::Navigation,
                "expand",
                Outcome::Failed {
                    message: e.to_string(),
                },
            );
            self.return_to_parent(doc, locations, trail).await?;
            return Ok(None);
        }

        let landed = doc.current_location().await?;
        if landed.host_str() != locations.profile.host_str() {
            info!(%landed, "expansion left the site");
            trail.record(
                Stage::Navigation,
                "expand",
                Outcome::Redirected {
                    location: landed.to_string(),
                },
            );
            self.return_to_parent(doc, locations, trail).await?;
            return Ok(None);
        }

        trail.record(Stage::Navigation, "expand", Outcome::Hit);
        tokio::time::sleep(self.config.expand_wait).await;
        self.settle(doc, "expand", trail).await?;
        self.scroll_sequence(doc).await?;
        let expanded = self.extract_view(&*doc, locations, auth_state).await?;
        info!(
            location = %expanded.location,
            records = expanded.extraction.records.len(),
            "expanded view extracted"
        );
        Ok(Some(expanded))
    }

    /// Undo an expansion that went somewhere unusable.
    async fn return_to_parent(
        &self,
        doc: &mut dyn DocumentHandle,
        locations: &Locations,
        trail: &mut DebugTrail,
    ) -> Result<()> {
        let here = doc.current_location().await?;
        if locations.is_profile(&here) {
            return Ok(());
        }
        self.goto(doc, &locations.profile, "undo_expand", trail).await?;
        trail.record(
            Stage::Navigation,
            "undo_expand",
            Outcome::Landed {
                location: locations.profile.to_string(),
            },
        );
        Ok(())
    }
}

/// Visible "show all" link or button inside the region.
async fn find_expand_control(doc: &dyn DocumentHandle, region: &NodePath) -> Result<Option<Node>> {
    let in_region = |node: &Node| node.is_visible() && region.contains(node.path());

    let by_text = doc
        .query(EXPAND_CONTROLS)
        .await?
        .into_iter()
        .find(|node| in_region(node) && EXPAND_TEXT.is_match(node.text()));
    if by_text.is_some() {
        return Ok(by_text);
    }

    Ok(doc
        .query(EXPAND_BY_ID)
        .await?
        .into_iter()
        .find(|node| in_region(node)))
}
