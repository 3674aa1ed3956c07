//! The debug trail: an ordered log of (stage, strategy, outcome) triples.
//!
//! Every stage reports typed outcomes here instead of printing; the compact
//! debug string in the envelope is rendered from these entries.

use serde::{Deserialize, Serialize};

use crate::types::FieldKind;

/// Pipeline stage that produced an entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Navigation,
    Auth,
    /// Page health checks on the first landing.
    Page,
    Region,
    Enumerate,
    Field(FieldKind),
    Assemble,
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Navigation => f.write_str("nav"),
            Self::Auth => f.write_str("auth"),
            Self::Page => f.write_str("page"),
            Self::Region => f.write_str("region"),
            Self::Enumerate => f.write_str("enumerate"),
            Self::Field(kind) => write!(f, "field.{kind}"),
            Self::Assemble => f.write_str("assemble"),
        }
    }
}

/// What happened when a strategy was tried.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Outcome {
    /// The strategy produced an accepted value.
    Hit,
    /// Nothing matched.
    Miss,
    /// Something matched but the validator refused it.
    Rejected { value: String },
    /// Navigation settled on the expected location.
    Landed { location: String },
    /// Final location diverged from the requested one.
    Redirected { location: String },
    /// On the detail view, but nothing was extractable there.
    DetailEmpty,
    TimedOut { after_ms: u64 },
    Failed { message: String },
    Skipped { reason: String },
    Count { value: usize },
    /// A field exhausted every strategy.
    Unresolved,
    /// The region locator exhausted every strategy.
    NotFound { snippet: String },
    /// A region was found but no visible record node was in it.
    NoVisibleItems,
    /// The site served an error page or an empty shell instead of content.
    Blocked { reason: String },
}

impl std::fmt::Display for Outcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Hit => f.write_str("hit"),
            Self::Miss => f.write_str("miss"),
            Self::Rejected { value } => write!(f, "rejected({})", clip(value, 40)),
            Self::Landed { .. } => f.write_str("landed"),
            Self::Redirected { location } => write!(f, "redirected({location})"),
            Self::DetailEmpty => f.write_str("detail_empty"),
            Self::TimedOut { after_ms } => write!(f, "timed_out({after_ms}ms)"),
            Self::Failed { message } => write!(f, "failed({})", clip(message, 60)),
            Self::Skipped { reason } => write!(f, "skipped({reason})"),
            Self::Count { value } => write!(f, "{value}"),
            Self::Unresolved => f.write_str("unresolved"),
            Self::NotFound { .. } => f.write_str("not_found"),
            Self::NoVisibleItems => f.write_str("no_visible_items"),
            Self::Blocked { reason } => write!(f, "blocked({reason})"),
        }
    }
}

/// A single trail line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrailEntry {
    pub stage: Stage,
    pub strategy: String,
    pub outcome: Outcome,
}

impl std::fmt::Display for TrailEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}={}", self.stage, self.strategy, self.outcome)
    }
}

/// Ordered diagnostic log for one request.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DebugTrail {
    entries: Vec<TrailEntry>,
}

impl DebugTrail {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append one outcome.
    pub fn record(&mut self, stage: Stage, strategy: impl Into<String>, outcome: Outcome) {
        self.entries.push(TrailEntry {
            stage,
            strategy: strategy.into(),
            outcome,
        });
    }

    pub fn push(&mut self, entry: TrailEntry) {
        self.entries.push(entry);
    }

    pub fn entries(&self) -> &[TrailEntry] {
        &self.entries
    }

    pub fn into_entries(self) -> Vec<TrailEntry> {
        self.entries
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Entries for one stage, in order.
    pub fn for_stage(&self, stage: Stage) -> impl Iterator<Item = &TrailEntry> {
        self.entries.iter().filter(move |e| e.stage == stage)
    }

    /// Whether any entry of `stage` tried `strategy` with an outcome satisfying `pred`.
    pub fn any(&self, stage: Stage, strategy: &str, pred: impl Fn(&Outcome) -> bool) -> bool {
        self.for_stage(stage)
            .any(|e| e.strategy == strategy && pred(&e.outcome))
    }

    /// `strategy=outcome` pairs of one stage joined with `>`.
    pub fn stage_summary(&self, stage: Stage) -> String {
        self.for_stage(stage)
            .map(|e| format!("{}={}", e.strategy, e.outcome))
            .collect::<Vec<_>>()
            .join(">")
    }
}

impl Extend<TrailEntry> for DebugTrail {
    fn extend<T: IntoIterator<Item = TrailEntry>>(&mut self, iter: T) {
        self.entries.extend(iter);
    }
}

impl IntoIterator for DebugTrail {
    type Item = TrailEntry;
    type IntoIter = std::vec::IntoIter<TrailEntry>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.into_iter()
    }
}

/// Cut `s` to at most `max` chars, on a char boundary.
pub fn clip(s: &str, max: usize) -> String {
    match s.char_indices().nth(max) {
        Some((idx, _)) => format!("{}…", &s[..idx]),
        None => s.to_string(),
    }
}
