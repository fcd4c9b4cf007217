//! Per-dictionary statistics over a set of entries
//!
//! Collected in memory during a conversion run, or read back from the
//! database with [`crate::db::entries`], both rendered by [`format_stats_table`].

use std::collections::{BTreeMap, HashSet};

use serde::Serialize;

use crate::tei_entry::TeiEntry;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WbStatsRow {
    pub wb: String,
    pub entries: i64,
    pub unique_lemmas: i64,
    pub avg_variants: f64,
    pub avg_definitions: f64,
}

#[derive(Debug, Default)]
struct WbTotals {
    entries: i64,
    lemmas: HashSet<String>,
    variants: i64,
    definitions: i64,
}

#[derive(Debug, Default)]
pub struct CorpusStats {
    by_wb: BTreeMap<String, WbTotals>,
}

impl CorpusStats {
    pub fn new() -> Self {
        CorpusStats::default()
    }

    pub fn add(&mut self, entry: &TeiEntry) {
        let totals = self.by_wb.entry(entry.wb.clone()).or_default();
        totals.entries += 1;
        totals.lemmas.insert(entry.lemma.clone());
        totals.variants += entry.lemma_variants.len() as i64;
        totals.definitions += entry.definitions.len() as i64;
    }

    pub fn total_entries(&self) -> i64 {
        self.by_wb.values().map(|t| t.entries).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.by_wb.is_empty()
    }

    /// One row per dictionary code, sorted by code.
    pub fn rows(&self) -> Vec<WbStatsRow> {
        self.by_wb
            .iter()
            .map(|(wb, t)| WbStatsRow {
                wb: wb.clone(),
                entries: t.entries,
                unique_lemmas: t.lemmas.len() as i64,
                avg_variants: average(t.variants, t.entries),
                avg_definitions: average(t.definitions, t.entries),
            })
            .collect()
    }
}

fn average(total: i64, count: i64) -> f64 {
    if count == 0 { 0.0 } else { total as f64 / count as f64 }
}

pub fn format_stats_table(rows: &[WbStatsRow]) -> String {
    let mut out = format!(
        "{:<15} {:<10} {:<10} {:<10} {:<10}\n",
        "Dictionary", "Entries", "Unique", "Avg Vars", "Avg Defs"
    );
    out.push_str(&"-".repeat(60));
    out.push('\n');
    for row in rows {
        out.push_str(&format!(
            "{:<15} {:<10} {:<10} {:<10.1} {:<10.1}\n",
            row.wb, row.entries, row.unique_lemmas, row.avg_variants, row.avg_definitions
        ));
    }
    out
}
