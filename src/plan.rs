//! Order planning for the ignition generator.
//!
//! Produces the definitive invocation sequence: priority ascending, with
//! discovery order breaking ties. Sorting on the composite key
//! `(priority, discovery_seq)` makes the order a total one, so the result
//! does not depend on any sort algorithm's own stability.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::priority::PrioritizedCandidate;
use crate::scan::ExportKind;

/// One planned invocation. The full sequence is immutable once sorted and
/// consumed only by the emitter.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderedEntry {
    pub priority: i32,
    pub qualified_name: String,
    pub discovery_seq: u32,
    pub unit: PathBuf,
    pub class_name: String,
    pub method_name: String,
    pub export: ExportKind,
}

pub fn plan_order(candidates: Vec<PrioritizedCandidate>) -> Vec<OrderedEntry> {
    let mut entries: Vec<OrderedEntry> = candidates
        .into_iter()
        .map(|p| OrderedEntry {
            priority: p.priority,
            qualified_name: p.candidate.qualified_name,
            discovery_seq: p.candidate.discovery_seq,
            unit: p.candidate.unit,
            class_name: p.candidate.class_name,
            method_name: p.candidate.method_name,
            export: p.candidate.export,
        })
        .collect();

    entries.sort_by_key(|e| (e.priority, e.discovery_seq));
    entries
}
