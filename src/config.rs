//! Configuration file support for satchel
//!
//! Reads satchel.toml, discovered by walking up the directory tree (like git
//! finds .git). The `SATCHEL_CONFIG` env var or `--config` override discovery.
//! A missing file means defaults; a present-but-broken file is an error.

use crate::errors::{Result, ToolError};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Top-level configuration, one section per tool
#[derive(Debug, Deserialize, Serialize, Default, Clone)]
pub struct Config {
    #[serde(default)]
    pub portal: PortalConfig,

    #[serde(default)]
    pub site: SiteConfig,

    #[serde(default)]
    pub tidy: TidyConfig,

    #[serde(default)]
    pub hours: HoursConfig,

    #[serde(default)]
    pub launch: LaunchSettings,
}

/// Settings for the audit-trail diff portal
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct PortalConfig {
    /// CSV of change events, one row per attribute change
    #[serde(default = "default_portal_input")]
    pub input_csv: PathBuf,

    /// Where index.html and the stylesheet land
    #[serde(default = "default_portal_output")]
    pub output_dir: PathBuf,

    /// Stylesheet directory name inside output_dir
    #[serde(default = "default_assets_dir")]
    pub assets_dir: String,

    /// Columns that must be non-blank on every row (after carry-forward)
    #[serde(default = "default_required_columns")]
    pub required_columns: Vec<String>,

    /// Sparse context columns inherited from the previous row of the same case
    #[serde(default = "default_carry_columns")]
    pub carry_forward_columns: Vec<String>,

    /// Cell texts treated as null
    #[serde(default = "default_null_values")]
    pub null_values: Vec<String>,

    /// Sticky left-hand columns of the rendered table
    #[serde(default = "default_fixed_columns")]
    pub fixed_columns: Vec<String>,

    /// Attribute names pulled to the front of their table group
    #[serde(default)]
    pub priority_columns: Vec<String>,

    #[serde(default = "default_true")]
    pub show_legend: bool,

    #[serde(default = "default_true")]
    pub show_generated_at: bool,

    #[serde(default = "default_true")]
    pub show_input_name: bool,
}

/// Settings for the markdown knowledge base builder
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct SiteConfig {
    #[serde(default = "default_md_dir")]
    pub md_dir: PathBuf,

    #[serde(default = "default_html_dir")]
    pub html_dir: PathBuf,

    /// Category used for pages without front matter
    #[serde(default = "default_category")]
    pub default_category: String,

    /// Name of the category order file inside md_dir
    #[serde(default = "default_categories_file")]
    pub categories_file: String,

    /// Categories shown per index page
    #[serde(default = "default_categories_per_page")]
    pub categories_per_page: usize,

    /// Width forced onto <img> tags that carry none
    #[serde(default = "default_image_width")]
    pub image_width: u32,

    #[serde(default = "default_site_title")]
    pub title: String,
}

/// Settings for the file sorter
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct TidyConfig {
    #[serde(default = "default_dot_dir")]
    pub target_dir: PathBuf,

    /// Log directory name inside the target (never itself sorted)
    #[serde(default = "default_tidy_log_dir")]
    pub log_dir: String,

    /// Folder name -> extensions routed into it
    #[serde(default = "default_tidy_groups")]
    pub groups: BTreeMap<String, Vec<String>>,

    /// Exact file names left in place
    #[serde(default)]
    pub exclude_files: Vec<String>,

    /// Extensions left in place
    #[serde(default)]
    pub exclude_extensions: Vec<String>,

    /// Dated revisions kept per base name by `tidy revisions`
    #[serde(default = "default_keep_revisions")]
    pub keep_revisions: usize,

    /// Where pruned revisions go
    #[serde(default = "default_old_dir")]
    pub old_dir: String,
}

/// Settings for the timesheet aggregator
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct HoursConfig {
    #[serde(default = "default_hours_output")]
    pub out_dir: PathBuf,

    /// Input column headers, remappable for exports with different names
    #[serde(default)]
    pub columns: HoursColumns,
}

/// Column header names expected in the timesheet CSV
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct HoursColumns {
    #[serde(default = "default_col_employee")]
    pub employee: String,

    #[serde(default = "default_col_client")]
    pub client: String,

    #[serde(default = "default_col_project_code")]
    pub project_code: String,

    #[serde(default = "default_col_project_name")]
    pub project_name: String,

    #[serde(default = "default_col_date")]
    pub date: String,

    #[serde(default = "default_col_minutes")]
    pub minutes: String,

    #[serde(default = "default_col_memo")]
    pub memo: String,
}

/// Settings for the shortcut launcher
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct LaunchSettings {
    /// Path to the launcher entry file
    #[serde(default = "default_launch_file")]
    pub config_path: PathBuf,
}

fn default_portal_input() -> PathBuf {
    PathBuf::from("data/input/data_flow.csv")
}

fn default_portal_output() -> PathBuf {
    PathBuf::from("data/output/portal")
}

fn default_assets_dir() -> String {
    "assets".to_string()
}

fn default_required_columns() -> Vec<String> {
    vec!["case_id".to_string(), "attr_type".to_string()]
}

fn default_carry_columns() -> Vec<String> {
    vec![
        "table".to_string(),
        "operation".to_string(),
        "trigger".to_string(),
        "sql".to_string(),
    ]
}

fn default_null_values() -> Vec<String> {
    vec![
        "NULL".to_string(),
        "null".to_string(),
        "None".to_string(),
        String::new(),
    ]
}

fn default_fixed_columns() -> Vec<String> {
    vec![
        "case_id".to_string(),
        "table".to_string(),
        "operation".to_string(),
        "trigger".to_string(),
    ]
}

fn default_true() -> bool {
    true
}

fn default_md_dir() -> PathBuf {
    PathBuf::from("md")
}

fn default_html_dir() -> PathBuf {
    PathBuf::from("html")
}

fn default_category() -> String {
    "Uncategorized".to_string()
}

fn default_categories_file() -> String {
    "_categories.txt".to_string()
}

fn default_categories_per_page() -> usize {
    3
}

fn default_image_width() -> u32 {
    1000
}

fn default_site_title() -> String {
    "Design Notes".to_string()
}

fn default_dot_dir() -> PathBuf {
    PathBuf::from(".")
}

fn default_tidy_log_dir() -> String {
    "sort_logs".to_string()
}

fn default_tidy_groups() -> BTreeMap<String, Vec<String>> {
    let mut groups = BTreeMap::new();
    groups.insert(
        "documents".to_string(),
        ["pdf", "doc", "docx", "xls", "xlsx", "ppt", "pptx", "txt", "md"]
            .iter()
            .map(|s| s.to_string())
            .collect(),
    );
    groups.insert(
        "images".to_string(),
        ["jpg", "jpeg", "png", "gif", "bmp", "svg"]
            .iter()
            .map(|s| s.to_string())
            .collect(),
    );
    groups.insert(
        "archives".to_string(),
        ["zip", "rar", "7z", "gz", "tar"]
            .iter()
            .map(|s| s.to_string())
            .collect(),
    );
    groups.insert(
        "data".to_string(),
        ["csv", "tsv", "json", "xml", "sql"]
            .iter()
            .map(|s| s.to_string())
            .collect(),
    );
    groups
}

fn default_keep_revisions() -> usize {
    2
}

fn default_old_dir() -> String {
    "old".to_string()
}

fn default_hours_output() -> PathBuf {
    PathBuf::from("data/output/hours")
}

fn default_col_employee() -> String {
    "employee".to_string()
}

fn default_col_client() -> String {
    "client".to_string()
}

fn default_col_project_code() -> String {
    "project_code".to_string()
}

fn default_col_project_name() -> String {
    "project_name".to_string()
}

fn default_col_date() -> String {
    "date".to_string()
}

fn default_col_minutes() -> String {
    "minutes".to_string()
}

fn default_col_memo() -> String {
    "memo".to_string()
}

fn default_launch_file() -> PathBuf {
    PathBuf::from("launch.json")
}

impl Default for PortalConfig {
    fn default() -> Self {
        Self {
            input_csv: default_portal_input(),
            output_dir: default_portal_output(),
            assets_dir: default_assets_dir(),
            required_columns: default_required_columns(),
            carry_forward_columns: default_carry_columns(),
            null_values: default_null_values(),
            fixed_columns: default_fixed_columns(),
            priority_columns: Vec::new(),
            show_legend: true,
            show_generated_at: true,
            show_input_name: true,
        }
    }
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            md_dir: default_md_dir(),
            html_dir: default_html_dir(),
            default_category: default_category(),
            categories_file: default_categories_file(),
            categories_per_page: default_categories_per_page(),
            image_width: default_image_width(),
            title: default_site_title(),
        }
    }
}

impl Default for TidyConfig {
    fn default() -> Self {
        Self {
            target_dir: default_dot_dir(),
            log_dir: default_tidy_log_dir(),
            groups: default_tidy_groups(),
            exclude_files: Vec::new(),
            exclude_extensions: Vec::new(),
            keep_revisions: default_keep_revisions(),
            old_dir: default_old_dir(),
        }
    }
}

impl Default for HoursConfig {
    fn default() -> Self {
        Self {
            out_dir: default_hours_output(),
            columns: HoursColumns::default(),
        }
    }
}

impl Default for HoursColumns {
    fn default() -> Self {
        Self {
            employee: default_col_employee(),
            client: default_col_client(),
            project_code: default_col_project_code(),
            project_name: default_col_project_name(),
            date: default_col_date(),
            minutes: default_col_minutes(),
            memo: default_col_memo(),
        }
    }
}

impl Default for LaunchSettings {
    fn default() -> Self {
        Self {
            config_path: default_launch_file(),
        }
    }
}

impl Config {
    /// Load config, preferring: explicit path > SATCHEL_CONFIG > walk-up discovery.
    /// An absent file yields defaults; an unreadable or invalid one is an error.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        if let Some(path) = explicit {
            return Self::read(path);
        }
        if let Ok(env_path) = std::env::var("SATCHEL_CONFIG") {
            return Self::read(Path::new(&env_path));
        }
        match Self::find_config_path() {
            Some(path) => Self::read(&path),
            None => Ok(Self::default()),
        }
    }

    fn read(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| {
            ToolError::Config(format!("could not read {}: {}", path.display(), e))
        })?;
        let config: Config = toml::from_str(&contents)?;
        config.portal.validate()?;
        Ok(config)
    }

    /// Find satchel.toml by walking up the directory tree
    fn find_config_path() -> Option<PathBuf> {
        let current_dir = std::env::current_dir().ok()?;
        let mut dir = current_dir.as_path();

        loop {
            let config_path = dir.join("satchel.toml");
            if config_path.exists() {
                return Some(config_path);
            }

            match dir.parent() {
                Some(parent) => dir = parent,
                None => break,
            }
        }
        None
    }
}

impl PortalConfig {
    /// The columns the pipeline itself depends on must stay required,
    /// and the rendered table needs at least one sticky column.
    pub fn validate(&self) -> Result<()> {
        for needed in ["case_id", "attr_type"] {
            if !self.required_columns.iter().any(|c| c == needed) {
                return Err(ToolError::Config(format!(
                    "portal.required_columns must include \"{}\"",
                    needed
                )));
            }
        }
        if self.fixed_columns.is_empty() {
            return Err(ToolError::Config(
                "portal.fixed_columns must not be empty".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.portal.required_columns, vec!["case_id", "attr_type"]);
        assert_eq!(config.portal.carry_forward_columns.len(), 4);
        assert!(config.portal.show_legend);
        assert_eq!(config.site.categories_per_page, 3);
        assert_eq!(config.tidy.keep_revisions, 2);
        assert!(config.tidy.groups.contains_key("documents"));
        assert_eq!(config.hours.columns.minutes, "minutes");
        config.portal.validate().expect("defaults must validate");
    }

    #[test]
    fn test_parse_partial_config() {
        let toml = r#"
[portal]
priority_columns = ["status", "price"]

[site]
title = "Team Wiki"
categories_per_page = 5
"#;
        let config: Config = toml::from_str(toml).unwrap();
        assert_eq!(config.portal.priority_columns, vec!["status", "price"]);
        // Untouched fields keep their defaults
        assert_eq!(config.portal.required_columns, vec!["case_id", "attr_type"]);
        assert_eq!(config.site.title, "Team Wiki");
        assert_eq!(config.site.categories_per_page, 5);
    }

    #[test]
    fn test_validate_rejects_missing_required() {
        let toml = r#"
[portal]
required_columns = ["attr_type"]
"#;
        let config: Config = toml::from_str(toml).unwrap();
        assert!(config.portal.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_empty_fixed_columns() {
        let toml = r#"
[portal]
fixed_columns = []
"#;
        let config: Config = toml::from_str(toml).unwrap();
        assert!(config.portal.validate().is_err());
    }

    #[test]
    fn test_invalid_toml_is_an_error() {
        let result: std::result::Result<Config, _> = toml::from_str("portal = 3");
        assert!(result.is_err());
    }
}
