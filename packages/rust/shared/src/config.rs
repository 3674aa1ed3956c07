//! Application configuration for certscrape.
//!
//! User config lives at `~/.certscrape/certscrape.toml`.
//! CLI flags override config file values, which override defaults.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{CertScrapeError, Result};

/// Default configuration file name.
const CONFIG_FILE_NAME: &str = "certscrape.toml";

/// Default config directory name under the user's home.
const CONFIG_DIR_NAME: &str = ".certscrape";

/// The scroll sequence never uses fewer downward steps than this.
pub const MIN_SCROLL_STEPS: u32 = 5;

// ---------------------------------------------------------------------------
// Config structs (matching certscrape.toml schema)
// ---------------------------------------------------------------------------

/// Top-level application config, deserialized from TOML.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Per-request defaults.
    #[serde(default)]
    pub defaults: DefaultsConfig,

    /// Navigation pacing and retry bounds.
    #[serde(default)]
    pub timing: TimingConfig,

    /// Site layout knobs.
    #[serde(default)]
    pub site: SiteConfig,

    /// HTTP document source settings.
    #[serde(default)]
    pub http: HttpConfig,
}

/// `[defaults]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DefaultsConfig {
    /// Upper bound for each wait-for-condition, in ms.
    #[serde(default = "default_max_wait_ms")]
    pub max_wait_ms: u64,

    /// Only try the detail view; never fall back to the profile.
    #[serde(default)]
    pub detail_only: bool,

    /// Trigger the "show all" control when the profile exposes one.
    #[serde(default = "default_true")]
    pub expand_all: bool,
}

impl Default for DefaultsConfig {
    fn default() -> Self {
        Self {
            max_wait_ms: default_max_wait_ms(),
            detail_only: false,
            expand_all: true,
        }
    }
}

fn default_max_wait_ms() -> u64 {
    25_000
}
fn default_true() -> bool {
    true
}

/// `[timing]` section. All values in milliseconds unless noted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimingConfig {
    /// Pause after the idle wait before trusting the render.
    #[serde(default = "default_min_render_delay")]
    pub min_render_delay_ms: u64,

    /// Navigation timeout never drops below this, whatever `max_wait_ms` says.
    #[serde(default = "default_navigation_timeout_floor")]
    pub navigation_timeout_floor_ms: u64,

    /// Downward scroll steps (clamped to at least 5).
    #[serde(default = "default_scroll_steps")]
    pub scroll_steps: u32,

    /// Pixels per downward step.
    #[serde(default = "default_scroll_step_px")]
    pub scroll_step_px: i64,

    /// Pause after each scroll step.
    #[serde(default = "default_scroll_pause")]
    pub scroll_pause_ms: u64,

    /// Pixels scrolled back up to unstick deferred elements.
    #[serde(default = "default_reverse_scroll_px")]
    pub reverse_scroll_px: i64,

    /// Final settle pause after the scroll sequence.
    #[serde(default = "default_settle_pause")]
    pub settle_pause_ms: u64,

    /// Pause after clicking the expand control.
    #[serde(default = "default_expand_wait")]
    pub expand_wait_ms: u64,

    /// Parent-view reloads after the first pass (clamped to at least 1).
    #[serde(default = "default_reload_attempts")]
    pub reload_attempts: u32,

    /// Base backoff before a reload round; doubles each round.
    #[serde(default = "default_retry_backoff")]
    pub retry_backoff_ms: u64,

    /// Hard per-request ceiling.
    #[serde(default = "default_request_deadline")]
    pub request_deadline_ms: u64,
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            min_render_delay_ms: default_min_render_delay(),
            navigation_timeout_floor_ms: default_navigation_timeout_floor(),
            scroll_steps: default_scroll_steps(),
            scroll_step_px: default_scroll_step_px(),
            scroll_pause_ms: default_scroll_pause(),
            reverse_scroll_px: default_reverse_scroll_px(),
            settle_pause_ms: default_settle_pause(),
            expand_wait_ms: default_expand_wait(),
            reload_attempts: default_reload_attempts(),
            retry_backoff_ms: default_retry_backoff(),
            request_deadline_ms: default_request_deadline(),
        }
    }
}

fn default_min_render_delay() -> u64 {
    1_500
}
fn default_navigation_timeout_floor() -> u64 {
    20_000
}
fn default_scroll_steps() -> u32 {
    MIN_SCROLL_STEPS
}
fn default_scroll_step_px() -> i64 {
    800
}
fn default_scroll_pause() -> u64 {
    700
}
fn default_reverse_scroll_px() -> i64 {
    500
}
fn default_settle_pause() -> u64 {
    3_000
}
fn default_expand_wait() -> u64 {
    2_000
}
fn default_reload_attempts() -> u32 {
    1
}
fn default_retry_backoff() -> u64 {
    2_000
}
fn default_request_deadline() -> u64 {
    180_000
}

/// `[site]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SiteConfig {
    /// Path appended to a profile location to reach its detail view.
    #[serde(default = "default_detail_suffix")]
    pub detail_suffix: String,
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            detail_suffix: default_detail_suffix(),
        }
    }
}

fn default_detail_suffix() -> String {
    "details/certifications/".into()
}

/// `[http]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HttpConfig {
    /// User-Agent header for the HTTP document source.
    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// Whole-request timeout in seconds.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Redirects followed before giving up.
    #[serde(default = "default_max_redirects")]
    pub max_redirects: usize,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            user_agent: default_user_agent(),
            timeout_secs: default_timeout_secs(),
            max_redirects: default_max_redirects(),
        }
    }
}

fn default_user_agent() -> String {
    concat!("certscrape/", env!("CARGO_PKG_VERSION")).into()
}
fn default_timeout_secs() -> u64 {
    30
}
fn default_max_redirects() -> usize {
    5
}

// ---------------------------------------------------------------------------
// Navigation config (runtime, merged from config + CLI flags)
// ---------------------------------------------------------------------------

/// Runtime navigation configuration handed to the navigation controller.
#[derive(Debug, Clone)]
pub struct NavigationConfig {
    pub min_render_delay: Duration,
    pub navigation_timeout_floor: Duration,
    pub scroll_steps: u32,
    pub scroll_step_px: i64,
    pub scroll_pause: Duration,
    pub reverse_scroll_px: i64,
    pub settle_pause: Duration,
    pub expand_wait: Duration,
    pub reload_attempts: u32,
    pub retry_backoff: Duration,
    pub request_deadline: Duration,
    pub detail_suffix: String,
}

impl NavigationConfig {
    /// A config with every pause set to zero; handy for offline replay and tests.
    pub fn immediate() -> Self {
        Self {
            min_render_delay: Duration::ZERO,
            scroll_pause: Duration::ZERO,
            settle_pause: Duration::ZERO,
            expand_wait: Duration::ZERO,
            retry_backoff: Duration::ZERO,
            ..Self::from(&AppConfig::default())
        }
    }

    /// Backoff before reload round `round` (1-based): base * 2^(round-1).
    pub fn backoff_for(&self, round: u32) -> Duration {
        let factor = 1u32 << round.saturating_sub(1).min(6);
        self.retry_backoff.saturating_mul(factor)
    }

    /// Timeout for a navigation given the caller's wait budget.
    pub fn navigation_timeout(&self, max_wait: Duration) -> Duration {
        max_wait.max(self.navigation_timeout_floor)
    }
}

impl From<&AppConfig> for NavigationConfig {
    fn from(config: &AppConfig) -> Self {
        let t = &config.timing;
        Self {
            min_render_delay: Duration::from_millis(t.min_render_delay_ms),
            navigation_timeout_floor: Duration::from_millis(t.navigation_timeout_floor_ms),
            scroll_steps: t.scroll_steps.max(MIN_SCROLL_STEPS),
            scroll_step_px: t.scroll_step_px,
            scroll_pause: Duration::from_millis(t.scroll_pause_ms),
            reverse_scroll_px: t.reverse_scroll_px,
            settle_pause: Duration::from_millis(t.settle_pause_ms),
            expand_wait: Duration::from_millis(t.expand_wait_ms),
            reload_attempts: t.reload_attempts.max(1),
            retry_backoff: Duration::from_millis(t.retry_backoff_ms),
            request_deadline: Duration::from_millis(t.request_deadline_ms),
            detail_suffix: config.site.detail_suffix.clone(),
        }
    }
}

// ---------------------------------------------------------------------------
// Config loading
// ---------------------------------------------------------------------------

/// Get the path to the config directory (`~/.certscrape/`).
pub fn config_dir() -> Result<PathBuf> {
    let home = dirs::home_dir()
        .ok_or_else(|| CertScrapeError::config("could not determine home directory"))?;
    Ok(home.join(CONFIG_DIR_NAME))
}

/// Get the path to the config file (`~/.certscrape/certscrape.toml`).
pub fn config_file_path() -> Result<PathBuf> {
    Ok(config_dir()?.join(CONFIG_FILE_NAME))
}

/// Load the application config from disk. Returns defaults if the file does not exist.
pub fn load_config() -> Result<AppConfig> {
    let path = config_file_path()?;

    if !path.exists() {
        tracing::debug!(?path, "config file not found, using defaults");
        return Ok(AppConfig::default());
    }

    load_config_from(&path)
}

/// Load the application config from a specific file path.
pub fn load_config_from(path: &Path) -> Result<AppConfig> {
    let content = std::fs::read_to_string(path).map_err(|e| CertScrapeError::io(path, e))?;

    toml::from_str(&content).map_err(|e| {
        CertScrapeError::config(format!("failed to parse {}: {e}", path.display()))
    })
}

/// Create the config directory and write a default config file.
/// Returns the path to the created file.
pub fn init_config() -> Result<PathBuf> {
    let dir = config_dir()?;
    std::fs::create_dir_all(&dir).map_err(|e| CertScrapeError::io(&dir, e))?;

    let path = dir.join(CONFIG_FILE_NAME);
    let config = AppConfig::default();
    let content =
        toml::to_string_pretty(&config).map_err(|e| CertScrapeError::config(e.to_string()))?;

    std::fs::write(&path, content).map_err(|e| CertScrapeError::io(&path, e))?;
    tracing::info!(?path, "created default config file");

    Ok(path)
}
