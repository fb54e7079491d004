//! File housekeeping
//!
//! `satchel tidy` routes loose files in a directory into per-type folders,
//! keeping an audit log of every move. `satchel tidy revisions` prunes dated
//! exports, keeping the newest few per base name and parking the rest in
//! `old/`.

use crate::config::TidyConfig;
use crate::errors::{Result, ToolError};
use crate::fsutil;
use crate::runlog::RunLog;
use colored::Colorize;
use lazy_static::lazy_static;
use regex::Regex;
use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::path::{Path, PathBuf};

pub struct TidySummary {
    pub moved: usize,
    pub skipped: usize,
    pub log: Option<PathBuf>,
}

pub struct RevisionsSummary {
    pub groups: usize,
    pub moved: usize,
}

/// Reverse the config's folder -> extensions table into ext -> folder
fn extension_routes(groups: &BTreeMap<String, Vec<String>>) -> HashMap<String, String> {
    let mut routes = HashMap::new();
    for (folder, extensions) in groups {
        for ext in extensions {
            routes.insert(ext.to_lowercase(), folder.clone());
        }
    }
    routes
}

/// Folder a file routes into: its configured group, else its bare extension,
/// else `no_extension`.
pub fn destination_folder(path: &Path, routes: &HashMap<String, String>) -> String {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_lowercase())
        .filter(|e| !e.is_empty());
    match ext {
        Some(ext) => routes.get(&ext).cloned().unwrap_or(ext),
        None => "no_extension".to_string(),
    }
}

/// Sort every top-level file in the target dir into per-type folders
pub fn sort_files(
    config: &TidyConfig,
    target_override: Option<&Path>,
    dry_run: bool,
) -> Result<TidySummary> {
    let target = target_override
        .map(Path::to_path_buf)
        .unwrap_or_else(|| config.target_dir.clone());
    if !target.is_dir() {
        return Err(ToolError::NotFound(target));
    }

    let log_dir = target.join(&config.log_dir);
    let routes = extension_routes(&config.groups);
    let mut log = if dry_run {
        None
    } else {
        Some(RunLog::create(&log_dir, "sort")?)
    };

    let mut entries: Vec<PathBuf> = fs::read_dir(&target)?
        .filter_map(|e| e.ok())
        .map(|e| e.path())
        .collect();
    entries.sort();

    let mut moved = 0;
    let mut skipped = 0;
    for path in entries {
        if path == log_dir || !path.is_file() {
            continue;
        }
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();

        if config.exclude_files.iter().any(|f| f == &name) {
            skipped += 1;
            if let Some(log) = log.as_mut() {
                log.info(&format!("skipped {} (excluded name)", name));
            }
            continue;
        }
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_lowercase());
        if let Some(ext) = ext.as_deref() {
            if config
                .exclude_extensions
                .iter()
                .any(|e| e.eq_ignore_ascii_case(ext))
            {
                skipped += 1;
                if let Some(log) = log.as_mut() {
                    log.info(&format!("skipped {} (excluded extension .{})", name, ext));
                }
                continue;
            }
        }

        let folder = destination_folder(&path, &routes);
        if dry_run {
            println!("   {} {} -> {}/{}", "[dry-run]".yellow(), name, folder, name);
            moved += 1;
            continue;
        }

        let dest = fsutil::move_into(&target.join(&folder), &path)?;
        let dest_name = dest
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        if let Some(log) = log.as_mut() {
            log.info(&format!("moved {} -> {}/{}", name, folder, dest_name));
        }
        moved += 1;
    }

    if dry_run {
        println!(
            "\n   {} {} move(s) planned",
            "Dry-run:".yellow().bold(),
            moved
        );
    } else {
        println!(
            "\n   {} {} moved, {} skipped",
            "Sorted".green().bold(),
            moved,
            skipped
        );
    }
    let log_path = log.map(|l| l.path().to_path_buf());
    if let Some(ref p) = log_path {
        println!("   Log: {}", p.display());
    }

    Ok(TidySummary {
        moved,
        skipped,
        log: log_path,
    })
}

lazy_static! {
    // `_YYYYMMDD` immediately before a dot, the shape the export scripts use
    static ref DATED: Regex = Regex::new(r"_(\d{8})\.").unwrap();
}

/// Split `spec_20250110.xlsx` into (`spec.xlsx`, `20250110`). Returns `None`
/// for undated names.
pub fn split_dated_name(name: &str) -> Option<(String, String)> {
    let caps = DATED.captures(name)?;
    let whole = caps.get(0)?;
    let date = caps[1].to_string();
    // Drop `_` plus eight digits, keep the dot that follows
    let base = format!(
        "{}{}",
        &name[..whole.start()],
        &name[whole.start() + 9..]
    );
    Some((base, date))
}

struct Revision {
    path: PathBuf,
    name: String,
    date: String,
}

/// Keep the newest `keep` dated revisions per base name, move the rest to
/// the old dir. Undated files are left alone.
pub fn prune_revisions(
    config: &TidyConfig,
    target_override: Option<&Path>,
    keep_override: Option<usize>,
    dry_run: bool,
) -> Result<RevisionsSummary> {
    let target = target_override
        .map(Path::to_path_buf)
        .unwrap_or_else(|| config.target_dir.clone());
    if !target.is_dir() {
        return Err(ToolError::NotFound(target));
    }
    let keep = keep_override.unwrap_or(config.keep_revisions);
    let old_dir = target.join(&config.old_dir);

    let mut groups: BTreeMap<String, Vec<Revision>> = BTreeMap::new();
    let mut entries: Vec<PathBuf> = fs::read_dir(&target)?
        .filter_map(|e| e.ok())
        .map(|e| e.path())
        .collect();
    entries.sort();
    for path in entries {
        if !path.is_file() {
            continue;
        }
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        if let Some((base, date)) = split_dated_name(&name) {
            groups
                .entry(base)
                .or_default()
                .push(Revision { path, name, date });
        }
    }

    let mut moved = 0;
    let mut touched = 0;
    for (base, mut items) in groups {
        // Newest first; name as the tiebreak so reruns are stable
        items.sort_by(|a, b| b.date.cmp(&a.date).then_with(|| a.name.cmp(&b.name)));
        if items.len() <= keep {
            continue;
        }
        touched += 1;

        let kept: Vec<&str> = items[..keep].iter().map(|r| r.name.as_str()).collect();
        println!("\n   {} {}", "Group:".bold(), base);
        println!("   keep: {}", kept.join(", "));
        for item in &items[keep..] {
            if dry_run {
                println!(
                    "   {} {} -> {}/",
                    "[dry-run]".yellow(),
                    item.name,
                    config.old_dir
                );
            } else {
                let dest = fsutil::move_into(&old_dir, &item.path)?;
                println!("   {} {} -> {}", "Moving".cyan(), item.name, dest.display());
            }
            moved += 1;
        }
    }

    if dry_run {
        println!(
            "\n   {} {} move(s) planned in {} group(s)",
            "Dry-run:".yellow().bold(),
            moved,
            touched
        );
    } else {
        println!(
            "\n   {} {} file(s) from {} group(s)",
            "Pruned".green().bold(),
            moved,
            touched
        );
    }

    Ok(RevisionsSummary {
        groups: touched,
        moved,
    })
}
