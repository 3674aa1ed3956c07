//! Result assembler: per-item field results to ordered records.
//!
//! Never fails. No data is an empty list plus a summary saying why.

use std::collections::HashMap;

use certscrape_shared::{AuthState, Outcome, Record, SourceTag, Stage, TrailEntry};
use tracing::debug;

use crate::enumerate::is_fallback;
use crate::fields::ItemFields;

/// Context the assembler stamps onto its summary and records.
#[derive(Debug, Clone, Copy)]
pub struct AssemblyMeta<'m> {
    pub auth_state: AuthState,
    pub region_strategy: Option<&'m str>,
    pub pattern: Option<&'m str>,
    pub source_tag: SourceTag,
}

/// Assembled records plus the compact summary line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Assembled {
    pub records: Vec<Record>,
    /// `auth:<state> | region:<strategy> | pattern:<pattern> | count:<n>`
    pub summary: String,
    pub trail: Vec<TrailEntry>,
}

/// Build records in document order.
///
/// Items without a name are dropped, and so are name-only rows from a broad
/// fallback pattern. Records sharing a name collapse into
/// the first position, keeping whichever copy carries a credential id or
/// verify link (then whichever has more fields).
pub fn assemble(items: impl IntoIterator<Item = ItemFields>, meta: AssemblyMeta<'_>) -> Assembled {
    let mut records: Vec<Record> = Vec::new();
    let mut by_name: HashMap<String, usize> = HashMap::new();
    let mut trail = Vec::new();
    let fallback = meta.pattern.is_some_and(is_fallback);

    for (index, fields) in items.into_iter().enumerate() {
        if fields.name.value.trim().is_empty() {
            trail.push(TrailEntry {
                stage: Stage::Assemble,
                strategy: "drop_nameless".into(),
                outcome: Outcome::Skipped {
                    reason: format!("item {index}"),
                },
            });
            continue;
        }

        let record = into_record(fields, meta.source_tag);
        if fallback && record.richness() == 0 {
            debug!(name = %record.name, index, "bare fallback row");
            trail.push(TrailEntry {
                stage: Stage::Assemble,
                strategy: "drop_bare_fallback".into(),
                outcome: Outcome::Skipped {
                    reason: format!("item {index} has only a name"),
                },
            });
            continue;
        }
        let key = record.name.trim().to_lowercase();

        match by_name.get(&key) {
            Some(&slot) => {
                let keep_new = prefer(&record, &records[slot]);
                debug!(name = %record.name, index, keep_new, "duplicate record");
                trail.push(TrailEntry {
                    stage: Stage::Assemble,
                    strategy: "dedupe".into(),
                    outcome: Outcome::Skipped {
                        reason: format!("item {index} duplicates {}", record.name),
                    },
                });
                if keep_new {
                    records[slot] = record;
                }
            }
            None => {
                by_name.insert(key, records.len());
                records.push(record);
            }
        }
    }

    trail.push(TrailEntry {
        stage: Stage::Assemble,
        strategy: "records".into(),
        outcome: Outcome::Count {
            value: records.len(),
        },
    });

    let summary = format!(
        "auth:{} | region:{} | pattern:{} | count:{}",
        meta.auth_state,
        meta.region_strategy.unwrap_or("none"),
        meta.pattern.unwrap_or("none"),
        records.len()
    );

    Assembled {
        records,
        summary,
        trail,
    }
}

fn into_record(fields: ItemFields, source_tag: SourceTag) -> Record {
    Record {
        name: fields.name.value,
        credential_id: fields.credential_id.value,
        issuer: fields.issuer.value,
        issue_date: fields.issue_date.value,
        expiry_date: fields.expiry_date.value,
        verify_link: fields.verify_link.value,
        source_tag,
    }
}

/// Whether `candidate` should replace `current` for the same name.
fn prefer(candidate: &Record, current: &Record) -> bool {
    let anchored = |r: &Record| !r.credential_id.is_empty() || !r.verify_link.is_empty();
    match (anchored(candidate), anchored(current)) {
        (true, false) => true,
        (false, true) => false,
        _ => candidate.richness() > current.richness(),
    }
}
