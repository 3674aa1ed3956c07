//! Core domain types for certscrape requests and records.

use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use url::Url;
use uuid::Uuid;

use crate::config::DefaultsConfig;
use crate::trail::TrailEntry;

/// Expiry value for credentials that explicitly never expire.
///
/// Distinct from an empty expiry, which means "unknown".
pub const NO_EXPIRATION: &str = "No Expiration";

// ---------------------------------------------------------------------------
// RequestId
// ---------------------------------------------------------------------------

/// A UUID v7 wrapper for request identifiers (time-sortable).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RequestId(pub Uuid);

impl RequestId {
    /// Generate a new time-sortable request identifier.
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }
}

impl Default for RequestId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for RequestId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ---------------------------------------------------------------------------
// Enumerations
// ---------------------------------------------------------------------------

/// Which document location produced a record.
///
/// Downstream consumers weight detail-view records higher than ones scraped
/// from the truncated profile section.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SourceTag {
    DetailView,
    MainProfile,
}

impl std::fmt::Display for SourceTag {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::DetailView => f.write_str("DetailView"),
            Self::MainProfile => f.write_str("MainProfile"),
        }
    }
}

/// Session state observed on the first landing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum AuthState {
    LoggedIn,
    Guest,
    #[default]
    Unknown,
}

impl std::fmt::Display for AuthState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::LoggedIn => f.write_str("LoggedIn"),
            Self::Guest => f.write_str("Guest"),
            Self::Unknown => f.write_str("Unknown"),
        }
    }
}

/// The record fields the extractor resolves independently.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldKind {
    Name,
    CredentialId,
    Issuer,
    IssueDate,
    ExpiryDate,
    VerifyLink,
}

impl FieldKind {
    /// All kinds in record order.
    pub const ALL: [FieldKind; 6] = [
        FieldKind::Name,
        FieldKind::CredentialId,
        FieldKind::Issuer,
        FieldKind::IssueDate,
        FieldKind::ExpiryDate,
        FieldKind::VerifyLink,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Name => "name",
            Self::CredentialId => "credential_id",
            Self::Issuer => "issuer",
            Self::IssueDate => "issue_date",
            Self::ExpiryDate => "expiry_date",
            Self::VerifyLink => "verify_link",
        }
    }
}

impl std::fmt::Display for FieldKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Record
// ---------------------------------------------------------------------------

/// One extracted credential. Field order is part of the output contract.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Record {
    pub name: String,
    pub credential_id: String,
    pub issuer: String,
    pub issue_date: String,
    pub expiry_date: String,
    pub verify_link: String,
    pub source_tag: SourceTag,
}

impl Record {
    /// Number of optional fields carrying a value; used to pick between duplicates.
    pub fn richness(&self) -> usize {
        [
            &self.credential_id,
            &self.issuer,
            &self.issue_date,
            &self.expiry_date,
            &self.verify_link,
        ]
        .iter()
        .filter(|v| !v.is_empty())
        .count()
    }
}

// ---------------------------------------------------------------------------
// Request / envelope
// ---------------------------------------------------------------------------

/// Per-request switches supplied by the caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestFlags {
    /// Upper bound for each wait-for-condition, in ms.
    pub max_wait_ms: u64,
    /// Only try the detail view.
    pub detail_only: bool,
    /// Trigger the expand control when present.
    pub expand_all: bool,
}

impl RequestFlags {
    pub fn max_wait(&self) -> Duration {
        Duration::from_millis(self.max_wait_ms)
    }
}

impl Default for RequestFlags {
    fn default() -> Self {
        Self::from(&DefaultsConfig::default())
    }
}

impl From<&DefaultsConfig> for RequestFlags {
    fn from(defaults: &DefaultsConfig) -> Self {
        Self {
            max_wait_ms: defaults.max_wait_ms,
            detail_only: defaults.detail_only,
            expand_all: defaults.expand_all,
        }
    }
}

/// A single scrape request.
#[derive(Debug, Clone)]
pub struct ScrapeRequest {
    /// Profile or detail-view location identifying the target document.
    pub target: Url,
    pub flags: RequestFlags,
}

/// The output envelope returned to orchestration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScrapeEnvelope {
    pub request_id: RequestId,
    pub url: String,
    pub found: bool,
    pub total_records: usize,
    pub records: Vec<Record>,
    /// Compact one-line diagnostic.
    pub debug_trail: String,
    pub auth_state: AuthState,
    /// Every typed outcome collected on the way, in order.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub trail: Vec<TrailEntry>,
    pub scraped_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record() -> Record {
        Record {
            name: "AWS Certified Cloud Practitioner".into(),
            credential_id: "ABC-123".into(),
            issuer: "Amazon Web Services".into(),
            issue_date: "Jan 2024".into(),
            expiry_date: NO_EXPIRATION.into(),
            verify_link: "https://example.com/verify/ABC-123".into(),
            source_tag: SourceTag::DetailView,
        }
    }

    #[test]
    fn record_serializes_in_contract_order() {
        let json = serde_json::to_string(&record()).expect("serialize");
        let keys = [
            "\"name\"",
            "\"credentialId\"",
            "\"issuer\"",
            "\"issueDate\"",
            "\"expiryDate\"",
            "\"verifyLink\"",
            "\"sourceTag\"",
        ];
        let positions: Vec<usize> = keys
            .iter()
            .map(|k| json.find(k).unwrap_or_else(|| panic!("missing {k}")))
            .collect();
        assert!(positions.windows(2).all(|w| w[0] < w[1]), "{json}");
        assert!(json.contains("\"sourceTag\":\"DetailView\""));
    }

    #[test]
    fn richness_counts_optional_fields() {
        let mut r = record();
        assert_eq!(r.richness(), 5);
        r.verify_link.clear();
        r.credential_id.clear();
        assert_eq!(r.richness(), 3);
    }

    #[test]
    fn flags_follow_config_defaults() {
        let flags = RequestFlags::default();
        assert_eq!(flags.max_wait_ms, 25_000);
        assert!(flags.expand_all);
        assert!(!flags.detail_only);
        assert_eq!(flags.max_wait(), Duration::from_secs(25));
    }

    #[test]
    fn envelope_uses_camel_case() {
        let env = ScrapeEnvelope {
            request_id: RequestId::new(),
            url: "https://example.com/in/someone".into(),
            found: true,
            total_records: 1,
            records: vec![record()],
            debug_trail: "auth:LoggedIn".into(),
            auth_state: AuthState::LoggedIn,
            trail: Vec::new(),
            scraped_at: Utc::now(),
        };
        let json = serde_json::to_string(&env).expect("serialize");
        assert!(json.contains("\"debugTrail\""));
        assert!(json.contains("\"authState\":\"LoggedIn\""));
        assert!(!json.contains("\"trail\""));
        let parsed: ScrapeEnvelope = serde_json::from_str(&json).expect("deserialize");
        assert_eq!(parsed.records, env.records);
    }
}
