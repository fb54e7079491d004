//! Small filesystem helpers shared by the subcommands

use crate::errors::Result;
use chrono::Local;
use std::fs;
use std::path::{Path, PathBuf};

/// Read a UTF-8 file, tolerating a leading BOM (Excel and Access exports
/// carry one).
pub fn read_utf8(path: &Path) -> Result<String> {
    let contents = fs::read_to_string(path)?;
    Ok(match contents.strip_prefix('\u{feff}') {
        Some(rest) => rest.to_string(),
        None => contents,
    })
}

/// Timestamp used in output file and directory names
pub fn run_stamp() -> String {
    Local::now().format("%Y%m%d_%H%M%S").to_string()
}

/// First non-existing path for `file_name` inside `dir`, probing
/// `stem_2.ext`, `stem_3.ext`, ...
pub fn unique_path(dir: &Path, file_name: &str) -> PathBuf {
    let candidate = dir.join(file_name);
    if !candidate.exists() {
        return candidate;
    }
    let (stem, ext) = match file_name.rsplit_once('.') {
        Some((s, e)) if !s.is_empty() => (s.to_string(), format!(".{}", e)),
        _ => (file_name.to_string(), String::new()),
    };
    let mut n = 2;
    loop {
        let candidate = dir.join(format!("{}_{}{}", stem, n, ext));
        if !candidate.exists() {
            return candidate;
        }
        n += 1;
    }
}

/// Move `file` into `dir` (created on demand), renaming on collision.
/// Returns the destination actually used.
pub fn move_into(dir: &Path, file: &Path) -> Result<PathBuf> {
    fs::create_dir_all(dir)?;
    let name = file
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "unnamed".to_string());
    let dest = unique_path(dir, &name);
    fs::rename(file, &dest)?;
    Ok(dest)
}
