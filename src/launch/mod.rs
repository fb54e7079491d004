//! Config-driven shortcut launcher
//!
//! `launch.json` groups named entries into pages; each entry opens a
//! directory, a URL, a parameterized URL, or switches to another page.
//! Parsing is strict and every config problem is reported with its JSON
//! location, so a typo surfaces before anything is opened.

pub mod tui;

use crate::config::LaunchSettings;
use crate::errors::{InputError, Result, ToolError};
use crate::fsutil;
use colored::Colorize;
use lazy_static::lazy_static;
use regex::Regex;
use serde::Deserialize;
use std::collections::{BTreeMap, HashSet};
use std::fmt;
use std::path::Path;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Action {
    OpenDirectory,
    OpenUrl,
    OpenParameterizedUrl,
    ShowPage,
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Action::OpenDirectory => "open_directory",
            Action::OpenUrl => "open_url",
            Action::OpenParameterizedUrl => "open_parameterized_url",
            Action::ShowPage => "show_page",
        };
        write!(f, "{}", name)
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Entry {
    pub name: String,
    pub action: Action,
    #[serde(default)]
    pub path: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub base_url: Option<String>,
    #[serde(default)]
    pub params: Option<BTreeMap<String, String>>,
    #[serde(default)]
    pub target: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(deny_unknown_fields)]
pub struct Settings {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub initial_page: Option<String>,
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct RawLaunchFile {
    #[serde(default)]
    settings: Settings,
    pages: serde_json::Map<String, serde_json::Value>,
}

#[derive(Debug, Clone)]
pub struct Page {
    pub name: String,
    pub entries: Vec<Entry>,
}

#[derive(Debug, Clone)]
pub struct LaunchFile {
    pub title: String,
    pub initial_page: Option<String>,
    pub pages: Vec<Page>,
}

/// Read and validate a launcher file. Every parse or validation problem is
/// collected and reported together, each with its `pages.name[index]` path.
pub fn load(path: &Path) -> Result<LaunchFile> {
    if !path.exists() {
        return Err(ToolError::NotFound(path.to_path_buf()));
    }
    let raw = fsutil::read_utf8(path)?;
    let file: RawLaunchFile = serde_json::from_str(&raw)?;

    let mut problems = Vec::new();
    let mut pages = Vec::with_capacity(file.pages.len());
    for (page_name, value) in file.pages {
        let raw_entries = match value {
            serde_json::Value::Array(items) => items,
            _ => {
                problems.push(format!("pages.{}: expected an array of entries", page_name));
                continue;
            }
        };
        let mut entries = Vec::with_capacity(raw_entries.len());
        for (i, item) in raw_entries.into_iter().enumerate() {
            match serde_json::from_value::<Entry>(item) {
                Ok(entry) => entries.push(entry),
                Err(e) => problems.push(format!("pages.{}[{}]: {}", page_name, i, e)),
            }
        }
        pages.push(Page {
            name: page_name,
            entries,
        });
    }

    let launch = LaunchFile {
        title: file
            .settings
            .title
            .unwrap_or_else(|| "Launcher".to_string()),
        initial_page: file.settings.initial_page,
        pages,
    };
    problems.extend(validate(&launch));
    if !problems.is_empty() {
        return Err(ToolError::Config(format!(
            "{}:\n  {}",
            path.display(),
            problems.join("\n  ")
        )));
    }
    Ok(launch)
}

fn validate(file: &LaunchFile) -> Vec<String> {
    let mut problems = Vec::new();
    let page_names: HashSet<String> = file.pages.iter().map(|p| p.name.to_lowercase()).collect();

    if let Some(ref initial) = file.initial_page {
        if !file.pages.iter().any(|p| &p.name == initial) {
            problems.push(format!("settings.initial_page: no page named {:?}", initial));
        }
    }

    for page in &file.pages {
        let mut seen: HashSet<String> = HashSet::new();
        for (i, entry) in page.entries.iter().enumerate() {
            let at = format!("pages.{}[{}]", page.name, i);
            if entry.name.trim().is_empty() {
                problems.push(format!("{}: entry name is blank", at));
            } else if !seen.insert(entry.name.to_lowercase()) {
                problems.push(format!("{}: duplicate entry name {:?}", at, entry.name));
            }
            problems.extend(check_fields(entry, &at));
            if entry.action == Action::ShowPage {
                if let Some(ref target) = entry.target {
                    if !page_names.contains(&target.to_lowercase()) {
                        problems.push(format!(
                            "{}: show_page target {:?} is not a page",
                            at, target
                        ));
                    }
                }
            }
        }
    }
    problems
}

/// Each action takes exactly its own fields; anything else is a config error
fn check_fields(entry: &Entry, at: &str) -> Vec<String> {
    let mut problems = Vec::new();
    let action = entry.action;
    let (required_name, present) = match action {
        Action::OpenDirectory => ("path", entry.path.is_some()),
        Action::OpenUrl => ("url", entry.url.is_some()),
        Action::OpenParameterizedUrl => ("base_url", entry.base_url.is_some()),
        Action::ShowPage => ("target", entry.target.is_some()),
    };
    if !present {
        problems.push(format!(
            "{}: action {} requires {:?}",
            at, action, required_name
        ));
    }

    let foreign = [
        ("path", entry.path.is_some() && action != Action::OpenDirectory),
        ("url", entry.url.is_some() && action != Action::OpenUrl),
        (
            "base_url",
            entry.base_url.is_some() && action != Action::OpenParameterizedUrl,
        ),
        (
            "params",
            entry.params.is_some() && action != Action::OpenParameterizedUrl,
        ),
        ("target", entry.target.is_some() && action != Action::ShowPage),
    ];
    for (field, bad) in foreign {
        if bad {
            problems.push(format!("{}: action {} does not take {:?}", at, action, field));
        }
    }
    problems
}

lazy_static! {
    // ${VAR} and %VAR% forms, as the configured paths use both
    static ref ENV_VAR: Regex =
        Regex::new(r"\$\{([A-Za-z_][A-Za-z0-9_]*)\}|%([A-Za-z_][A-Za-z0-9_]*)%").unwrap();
}

/// Expand `${VAR}` and `%VAR%` references; unset variables stay as written
pub fn expand_env(path: &str) -> String {
    ENV_VAR
        .replace_all(path, |caps: &regex::Captures<'_>| {
            let name = caps
                .get(1)
                .or_else(|| caps.get(2))
                .map(|m| m.as_str())
                .unwrap_or("");
            std::env::var(name).unwrap_or_else(|_| caps[0].to_string())
        })
        .into_owned()
}

/// What executing an entry did, or would have done
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Opened(String),
    WouldOpen(String),
    /// Page switch request, handled by the caller
    Page(String),
}

/// Full URL for an `open_parameterized_url` entry
pub fn parameterized_url(entry: &Entry) -> Result<String> {
    let base = entry.base_url.as_deref().unwrap_or_default();
    let query = match entry.params {
        Some(ref params) if !params.is_empty() => serde_urlencoded::to_string(params)
            .map_err(|e| {
                ToolError::Config(format!("unencodable params for {}: {}", entry.name, e))
            })?,
        _ => String::new(),
    };
    Ok(if query.is_empty() {
        base.to_string()
    } else if base.contains('?') {
        format!("{}&{}", base, query)
    } else {
        format!("{}?{}", base, query)
    })
}

fn open_target(target: &str, dry_run: bool) -> Result<Outcome> {
    if dry_run {
        return Ok(Outcome::WouldOpen(target.to_string()));
    }
    open::that(target).map_err(ToolError::Io)?;
    Ok(Outcome::Opened(target.to_string()))
}

/// Execute one entry. Page switches are returned to the caller instead of
/// being performed, so the CLI and the TUI can each handle them their way.
/// The directory existence check runs even under `--dry-run`.
pub fn execute(entry: &Entry, dry_run: bool) -> Result<Outcome> {
    match entry.action {
        Action::OpenDirectory => {
            let expanded = expand_env(entry.path.as_deref().unwrap_or_default());
            if !Path::new(&expanded).exists() {
                return Err(
                    InputError::new(format!("path does not exist: {}", expanded)).into(),
                );
            }
            open_target(&expanded, dry_run)
        }
        Action::OpenUrl => open_target(entry.url.as_deref().unwrap_or_default(), dry_run),
        Action::OpenParameterizedUrl => {
            let url = parameterized_url(entry)?;
            open_target(&url, dry_run)
        }
        Action::ShowPage => Ok(Outcome::Page(entry.target.clone().unwrap_or_default())),
    }
}

/// A located entry and the page it sits on
#[derive(Debug, Clone)]
pub struct Located<'a> {
    pub page: &'a str,
    pub entry: &'a Entry,
}

/// Case-insensitive entry lookup, optionally scoped to one page. A name
/// found on several pages is an error naming every candidate.
pub fn resolve<'a>(file: &'a LaunchFile, name: &str, page: Option<&str>) -> Result<Located<'a>> {
    let wanted = name.to_lowercase();
    let mut matches: Vec<Located<'a>> = Vec::new();
    for p in &file.pages {
        if let Some(scope) = page {
            if !p.name.eq_ignore_ascii_case(scope) {
                continue;
            }
        }
        for entry in &p.entries {
            if entry.name.to_lowercase() == wanted {
                matches.push(Located {
                    page: &p.name,
                    entry,
                });
            }
        }
    }
    match matches.len() {
        0 => Err(InputError::new(match page {
            Some(p) => format!("no entry named {:?} on page {:?}", name, p),
            None => format!("no entry named {:?}", name),
        })
        .into()),
        1 => Ok(matches.remove(0)),
        _ => {
            let candidates: Vec<String> = matches
                .iter()
                .map(|m| format!("{}/{}", m.page, m.entry.name))
                .collect();
            Err(InputError::new(format!(
                "entry name {:?} is ambiguous: {}",
                name,
                candidates.join(", ")
            ))
            .into())
        }
    }
}

/// Short action summary for listings and status lines
pub fn describe(entry: &Entry) -> String {
    match entry.action {
        Action::OpenDirectory => {
            format!("open_directory {}", entry.path.as_deref().unwrap_or(""))
        }
        Action::OpenUrl => format!("open_url {}", entry.url.as_deref().unwrap_or("")),
        Action::OpenParameterizedUrl => match parameterized_url(entry) {
            Ok(url) => format!("open_parameterized_url {}", url),
            Err(_) => "open_parameterized_url".to_string(),
        },
        Action::ShowPage => format!("show_page -> {}", entry.target.as_deref().unwrap_or("")),
    }
}

fn print_entries(page: &Page) {
    for entry in &page.entries {
        println!("      {:<24} {}", entry.name, describe(entry).dimmed());
    }
}

/// Print every page and entry with action summaries
pub fn list(file: &LaunchFile) {
    println!("\n   {}", file.title.bold());
    for page in &file.pages {
        println!("\n   {} {}", "Page:".cyan().bold(), page.name);
        print_entries(page);
    }
    println!();
}

pub fn run(
    settings: &LaunchSettings,
    file_override: Option<&Path>,
    name: Option<&str>,
    page: Option<&str>,
    list_entries: bool,
    open_tui: bool,
    dry_run: bool,
) -> Result<()> {
    let path = file_override
        .map(Path::to_path_buf)
        .unwrap_or_else(|| settings.config_path.clone());
    let file = load(&path)?;

    if list_entries {
        list(&file);
        return Ok(());
    }
    if open_tui {
        return tui::run(&path, file);
    }

    let name = name.ok_or_else(|| {
        InputError::new("nothing to do: pass an entry name, --list, or --tui")
    })?;
    let located = resolve(&file, name, page)?;
    match execute(located.entry, dry_run)? {
        Outcome::Opened(target) => {
            println!("   {} {} ({})", "Opened".green(), located.entry.name, target);
        }
        Outcome::WouldOpen(target) => {
            println!(
                "   {} {} -> {}",
                "[dry-run]".yellow(),
                located.entry.name,
                target
            );
        }
        Outcome::Page(target) => {
            // Page switches only mean something inside the TUI
            println!(
                "   {} {} switches to page {:?}:",
                "Note:".cyan(),
                located.entry.name,
                target
            );
            if let Some(p) = file
                .pages
                .iter()
                .find(|p| p.name.eq_ignore_ascii_case(&target))
            {
                print_entries(p);
            }
        }
    }
    Ok(())
}
