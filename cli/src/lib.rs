pub mod convert;
pub mod import;

use std::path::{Path, PathBuf};

use anyhow::{Result, bail};
use indicatif::{ProgressBar, ProgressStyle};
use walkdir::WalkDir;

/// All `*.xml` files under `input_dir`, recursively, in sorted order
pub fn find_xml_files(input_dir: &Path) -> Result<Vec<PathBuf>> {
    if !input_dir.is_dir() {
        bail!("Input directory not found: {}", input_dir.display());
    }

    let mut files: Vec<PathBuf> = WalkDir::new(input_dir)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .map(|e| e.into_path())
        .filter(|p| p.extension().is_some_and(|ext| ext.eq_ignore_ascii_case("xml")))
        .collect();

    files.sort();
    Ok(files)
}

pub fn progress_bar(len: usize, show_progress: bool) -> Result<ProgressBar> {
    if !show_progress {
        return Ok(ProgressBar::hidden());
    }
    let pb = ProgressBar::new(len as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("[{elapsed_precise}] {bar:40.cyan/blue} {pos}/{len} {msg}")?
            .progress_chars("=>-"),
    );
    Ok(pb)
}

/// Display name of a file relative to the input dir
pub fn relative_name(input_dir: &Path, file: &Path) -> String {
    file.strip_prefix(input_dir).unwrap_or(file).display().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn test_find_xml_files_recursive_sorted() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir_all(dir.path().join("dwb/a")).unwrap();
        fs::write(dir.path().join("dwb/a/b.xml"), "<a/>").unwrap();
        fs::write(dir.path().join("dwb/a.XML"), "<a/>").unwrap();
        fs::write(dir.path().join("notes.txt"), "").unwrap();

        let files = find_xml_files(dir.path()).unwrap();
        let names: Vec<String> = files.iter().map(|f| relative_name(dir.path(), f)).collect();
        // component-wise ordering: "a" sorts before "a.XML"
        assert_eq!(names, vec!["dwb/a/b.xml", "dwb/a.XML"]);
    }

    #[test]
    fn test_missing_input_dir() {
        assert!(find_xml_files(Path::new("/nonexistent/tei")).is_err());
    }
}
