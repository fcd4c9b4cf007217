//! `wbdict import`: batch upsert of parsed entries into the SQLite store

use std::path::{Path, PathBuf};

use anyhow::Result;

use wbdict_backend::db::EntriesDbHandle;
use wbdict_backend::db::entries_models::NewEntry;
use wbdict_backend::logger;
use wbdict_backend::{TagRules, parse_tei_file};

use crate::{find_xml_files, progress_bar, relative_name};

pub const DEFAULT_BATCH_SIZE: usize = 1000;

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ImportSummary {
    pub total: usize,
    pub imported: usize,
    pub failed: usize,
}

/// Parses every file of the batch, skipping the ones that fail, and upserts
/// the rest together. A failed upsert counts the whole batch as failed.
fn import_batch(
    db: &EntriesDbHandle,
    input_dir: &Path,
    files: &[PathBuf],
    rules: &TagRules,
) -> (usize, usize) {
    let mut new_entries = Vec::with_capacity(files.len());
    let mut failed = 0;

    for file in files {
        match parse_tei_file(file, rules) {
            Ok(entry) => new_entries.push(NewEntry::from(&entry)),
            Err(e) => {
                logger::error(&format!("Error parsing {}: {:#}", relative_name(input_dir, file), e));
                failed += 1;
            }
        }
    }

    if new_entries.is_empty() {
        return (0, failed);
    }

    match db.upsert_entries(&new_entries) {
        Ok(_) => (new_entries.len(), failed),
        Err(e) => {
            logger::error(&format!("Failed to write batch of {} entries: {:#}", new_entries.len(), e));
            (0, failed + new_entries.len())
        }
    }
}

pub fn import_directory(
    db: &EntriesDbHandle,
    input_dir: &Path,
    batch_size: usize,
    rules: &TagRules,
    show_progress: bool,
) -> Result<ImportSummary> {
    let files = find_xml_files(input_dir)?;
    let mut summary = ImportSummary {
        total: files.len(),
        ..Default::default()
    };

    if files.is_empty() {
        logger::warn(&format!("No XML files found in {}", input_dir.display()));
        return Ok(summary);
    }

    logger::info(&format!("Importing {} TEI files from {}", files.len(), input_dir.display()));

    let pb = progress_bar(files.len(), show_progress)?;

    for batch in files.chunks(batch_size.max(1)) {
        let (imported, failed) = import_batch(db, input_dir, batch, rules);
        summary.imported += imported;
        summary.failed += failed;

        pb.inc(batch.len() as u64);
        pb.set_message(format!("✓ {}, ✗ {}", summary.imported, summary.failed));
    }

    pb.finish_with_message("done");
    logger::info(&format!(
        "Import complete: {} imported, {} failed",
        summary.imported, summary.failed
    ));

    Ok(summary)
}
