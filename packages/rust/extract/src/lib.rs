//! Credential extraction for certscrape.
//!
//! Pipeline over one markup snapshot:
//! [`region::locate`] → [`enumerate::enumerate`] → [`fields::extract_item`]
//! per item → [`assembler::assemble`]. Each stage is an ordered chain of
//! named strategies ([`strategy::Chain`]) and reports every attempt to the
//! [`DebugTrail`].
//!
//! Parsed trees are not `Send`; [`extract`] parses, extracts and drops the
//! tree synchronously and returns owned data.

pub mod assembler;
pub mod dom;
pub mod enumerate;
pub mod fields;
pub mod region;
pub mod strategy;
pub mod validators;

use certscrape_document::NodePath;
use certscrape_shared::{AuthState, DebugTrail, Outcome, Record, SourceTag, Stage};
use scraper::Html;
use tracing::{info, instrument};
use url::Url;

pub use assembler::{Assembled, AssemblyMeta, assemble};
pub use enumerate::{CandidateItem, Enumeration, enumerate, is_fallback};
pub use fields::{FieldContext, FieldResult, ItemFields, extract_field, extract_item};
pub use region::{CandidateRegion, RegionContext, RegionLookup, RegionNotFound, locate};
pub use strategy::{Attempt, Chain, ChainRun, Hit, Strategy};

/// What the extractor needs to know besides the markup.
#[derive(Debug, Clone)]
pub struct ExtractOptions {
    /// Where the markup came from; relative links resolve against it.
    pub location: Option<Url>,
    pub source_tag: SourceTag,
    pub auth_state: AuthState,
    /// Enables the `detail_main` region strategy.
    pub on_detail_view: bool,
}

impl Default for ExtractOptions {
    fn default() -> Self {
        Self {
            location: None,
            source_tag: SourceTag::MainProfile,
            auth_state: AuthState::Unknown,
            on_detail_view: false,
        }
    }
}

/// Why an extraction came back the way it did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExtractionStatus {
    /// At least one record.
    Records,
    RegionNotFound { snippet: String },
    /// Region found, nothing visible to enumerate.
    NoVisibleItems,
    /// Items enumerated but none survived assembly (no name, or a bare fallback row).
    NoUsableItems,
}

/// Owned result of one extraction pass.
#[derive(Debug, Clone)]
pub struct Extraction {
    pub records: Vec<Record>,
    pub region_strategy: Option<String>,
    pub pattern: Option<String>,
    /// Structural address of the region root, for scoping follow-up queries.
    pub region_path: Option<NodePath>,
    /// Compact assembler summary.
    pub summary: String,
    pub trail: DebugTrail,
    pub status: ExtractionStatus,
}

impl Extraction {
    pub fn found(&self) -> bool {
        !self.records.is_empty()
    }
}

/// Run the whole extraction over `markup`.
#[instrument(skip_all, fields(location = ?options.location.as_ref().map(Url::as_str), source = %options.source_tag))]
pub fn extract(markup: &str, options: &ExtractOptions) -> Extraction {
    let doc = Html::parse_document(markup);
    let mut trail = DebugTrail::new();

    let lookup = locate(
        &doc,
        RegionContext {
            on_detail_view: options.on_detail_view,
        },
    );
    trail.extend(lookup.attempts);

    let region = match lookup.result {
        Ok(region) => region,
        Err(RegionNotFound { snippet }) => {
            info!("region not found");
            trail.record(
                Stage::Region,
                "exhausted",
                Outcome::NotFound {
                    snippet: snippet.clone(),
                },
            );
            let assembled = assemble(Vec::new(), meta(options, None, None));
            trail.extend(assembled.trail);
            return Extraction {
                records: Vec::new(),
                region_strategy: None,
                pattern: None,
                region_path: None,
                summary: assembled.summary,
                trail,
                status: ExtractionStatus::RegionNotFound { snippet },
            };
        }
    };
    info!(strategy = region.strategy, "region located");

    let enumeration = enumerate(region.root);
    trail.extend(enumeration.attempts);
    let pattern = enumeration.pattern;
    let item_count = enumeration.items.len();

    if item_count == 0 {
        trail.record(Stage::Enumerate, "exhausted", Outcome::NoVisibleItems);
    } else {
        info!(pattern = pattern.as_deref().unwrap_or("none"), items = item_count, "items enumerated");
    }

    let base = options.location.as_ref();
    let items: Vec<ItemFields> = enumeration
        .items
        .map(|candidate| {
            let fields = extract_item(candidate.node, base);
            for kind in certscrape_shared::FieldKind::ALL {
                trail.push(fields.get(kind).summary_entry(kind));
            }
            fields
        })
        .collect();

    let assembled = assemble(
        items,
        meta(options, Some(region.strategy), pattern.as_deref()),
    );
    trail.extend(assembled.trail);

    let status = if !assembled.records.is_empty() {
        ExtractionStatus::Records
    } else if item_count == 0 {
        ExtractionStatus::NoVisibleItems
    } else {
        ExtractionStatus::NoUsableItems
    };
    info!(records = assembled.records.len(), ?status, "extraction finished");

    Extraction {
        records: assembled.records,
        region_strategy: Some(region.strategy.to_string()),
        pattern,
        region_path: Some(NodePath::of(region.root)),
        summary: assembled.summary,
        trail,
        status,
    }
}

fn meta<'m>(
    options: &ExtractOptions,
    region_strategy: Option<&'m str>,
    pattern: Option<&'m str>,
) -> AssemblyMeta<'m> {
    AssemblyMeta {
        auth_state: options.auth_state,
        region_strategy,
        pattern,
        source_tag: options.source_tag,
    }
}
