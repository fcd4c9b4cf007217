//! `wbdict convert`: one JSON file per TEI entry, in a mirrored directory tree

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use wbdict_backend::logger;
use wbdict_backend::stats::CorpusStats;
use wbdict_backend::{TagRules, TeiEntry, parse_tei_file};

use crate::{find_xml_files, progress_bar, relative_name};

#[derive(Debug, Default)]
pub struct ConvertSummary {
    pub total: usize,
    pub converted: usize,
    pub failed: usize,
    pub stats: CorpusStats,
}

/// `input_dir/a/b.xml` → `output_dir/a/b.json`
pub fn output_path_for(input_dir: &Path, output_dir: &Path, file: &Path) -> PathBuf {
    let relative = match file.strip_prefix(input_dir) {
        Ok(rel) => rel.to_path_buf(),
        Err(_) => PathBuf::from(file.file_name().unwrap_or_default()),
    };
    output_dir.join(relative).with_extension("json")
}

pub fn write_entry_json(entry: &TeiEntry, output_path: &Path) -> Result<()> {
    if let Some(parent) = output_path.parent() {
        fs::create_dir_all(parent).with_context(|| format!("Failed to create directory: {}", parent.display()))?;
    }
    let json = serde_json::to_string_pretty(entry)?;
    fs::write(output_path, json).with_context(|| format!("Failed to write: {}", output_path.display()))?;
    Ok(())
}

pub fn convert_directory(
    input_dir: &Path,
    output_dir: &Path,
    rules: &TagRules,
    show_progress: bool,
) -> Result<ConvertSummary> {
    let files = find_xml_files(input_dir)?;
    let mut summary = ConvertSummary {
        total: files.len(),
        ..Default::default()
    };

    if files.is_empty() {
        logger::warn(&format!("No XML files found in {}", input_dir.display()));
        return Ok(summary);
    }

    logger::info(&format!(
        "Converting {} TEI files from {} to {}",
        files.len(),
        input_dir.display(),
        output_dir.display()
    ));

    let pb = progress_bar(files.len(), show_progress)?;

    for file in &files {
        let name = relative_name(input_dir, file);
        pb.set_message(name.clone());

        let result = parse_tei_file(file, rules).and_then(|entry| {
            write_entry_json(&entry, &output_path_for(input_dir, output_dir, file))?;
            Ok(entry)
        });

        match result {
            Ok(entry) => {
                summary.stats.add(&entry);
                summary.converted += 1;
            }
            Err(e) => {
                logger::error(&format!("Error converting {}: {:#}", name, e));
                pb.println(format!("✗ Error converting {}: {:#}", name, e));
                summary.failed += 1;
            }
        }
        pb.inc(1);
    }

    pb.finish_with_message("done");
    logger::info(&format!(
        "Conversion complete: {} converted, {} failed",
        summary.converted, summary.failed
    ));

    Ok(summary)
}
