//! Shared types, error model, and configuration for certscrape.
//!
//! This crate is the foundation depended on by all other certscrape crates.
//! It provides:
//! - [`CertScrapeError`]: the unified error type
//! - Domain types ([`Record`], [`ScrapeRequest`], [`ScrapeEnvelope`], [`RequestId`])
//! - The [`DebugTrail`] of typed stage outcomes
//! - Configuration ([`AppConfig`], [`NavigationConfig`], config loading)

pub mod config;
pub mod error;
pub mod trail;
pub mod types;

// Re-export public API at crate root for ergonomic imports.
pub use config::{
    AppConfig, DefaultsConfig, HttpConfig, MIN_SCROLL_STEPS, NavigationConfig, SiteConfig,
    TimingConfig, config_dir, config_file_path, init_config, load_config, load_config_from,
};
pub use error::{CertScrapeError, Result};
pub use trail::{DebugTrail, Outcome, Stage, TrailEntry, clip};
pub use types::{
    AuthState, FieldKind, NO_EXPIRATION, Record, RequestFlags, RequestId, ScrapeEnvelope,
    ScrapeRequest, SourceTag,
};
