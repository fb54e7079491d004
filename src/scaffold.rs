//! Project scaffolding
//!
//! `satchel new` lays out the directory skeleton the other subcommands
//! expect: input/output/temp data dirs, the markdown source tree, a
//! commented config preset, and a README naming the project.

use crate::errors::{InputError, Result};
use colored::Colorize;
use std::fs;
use std::path::{Path, PathBuf};

/// Commented preset; every key shows its default
const CONFIG_TOML: &str = r#"# satchel configuration
#
# Copy this file to the project root (or point SATCHEL_CONFIG at it) and
# uncomment what you change. Missing keys keep the defaults shown here.

[portal]
# input_csv = "data/input/data_flow.csv"
# output_dir = "data/output/portal"
# assets_dir = "assets"
# required_columns = ["case_id", "attr_type"]
# carry_forward_columns = ["table", "operation", "trigger", "sql"]
# null_values = ["NULL", "null", "None", ""]
# fixed_columns = ["case_id", "table", "operation", "trigger"]
# priority_columns = []
# show_legend = true
# show_generated_at = true
# show_input_name = true

[site]
# md_dir = "md"
# html_dir = "html"
# default_category = "Uncategorized"
# categories_file = "_categories.txt"
# categories_per_page = 3
# image_width = 1000
# title = "Design Notes"

[tidy]
# target_dir = "."
# log_dir = "sort_logs"
# keep_revisions = 2
# old_dir = "old"
# exclude_files = []
# exclude_extensions = []
# [tidy.groups]
# documents = ["pdf", "doc", "docx", "xls", "xlsx", "ppt", "pptx", "txt", "md"]
# images = ["jpg", "jpeg", "png", "gif", "bmp", "svg"]
# archives = ["zip", "rar", "7z", "gz", "tar"]
# data = ["csv", "tsv", "json", "xml", "sql"]

[hours]
# out_dir = "data/output/hours"
# [hours.columns]
# employee = "employee"
# client = "client"
# project_code = "project_code"
# project_name = "project_name"
# date = "date"
# minutes = "minutes"
# memo = "memo"

[launch]
# config_path = "launch.json"
"#;

const CATEGORIES_SEED: &str = r#"# Index page category order, one name per line.
# Categories not listed here sort alphabetically after these.
General
"#;

const GITIGNORE: &str = r#"# Generated outputs
data/output/
data/temp/
html/
logs/
sort_logs/
old/

# Editor leftovers
*.swp
.DS_Store
"#;

const README_MD: &str = r#"# {name}

Working tree for the satchel desk tools.

## Layout

- `config/satchel.toml` - commented preset; copy it to this directory to activate
- `data/input/` - timesheet and audit-trail CSVs as they arrive
- `data/output/` - generated portals, summaries, and TSVs
- `data/temp/` - scratch space, safe to empty
- `logs/` - run logs written by the sorters
- `md/` - knowledge base sources for `satchel site build`
- `docs/` - published pages and handover notes
- `scripts/` - SQL snippets and one-off shell scripts

## First steps

```
satchel portal --input data/input/data_flow.csv
satchel site build
satchel tidy --dry-run
```

Config discovery walks up from the working directory, so any `satchel`
run inside this tree picks up a `satchel.toml` placed at this level.
"#;

/// Create a fresh project directory named `name` under `dir`.
/// An existing directory is never touched.
pub fn run(name: &str, dir: &Path) -> Result<PathBuf> {
    if name.is_empty() || name.contains(['/', '\\']) {
        return Err(InputError::new(format!("invalid project name {:?}", name)).into());
    }
    let root = dir.join(name);
    if root.exists() {
        return Err(InputError::new(format!(
            "{} already exists, refusing to touch it",
            root.display()
        ))
        .into());
    }

    println!("\n{}", format!("Scaffolding {}...", name).cyan().bold());
    println!("   Directory: {}\n", root.display());

    create_dir_if_missing(&root)?;
    for sub in [
        "config",
        "data/input",
        "data/output",
        "data/temp",
        "logs",
        "md",
        "docs",
        "scripts",
    ] {
        create_dir_if_missing(&root.join(sub))?;
    }

    write_file_if_missing(
        &root.join("config").join("satchel.toml"),
        CONFIG_TOML,
        "config/satchel.toml",
    )?;
    write_file_if_missing(
        &root.join("md").join("_categories.txt"),
        CATEGORIES_SEED,
        "md/_categories.txt",
    )?;
    write_file_if_missing(&root.join(".gitignore"), GITIGNORE, ".gitignore")?;
    write_file_if_missing(
        &root.join("README.md"),
        &README_MD.replace("{name}", name),
        "README.md",
    )?;

    println!("\n{}", "Project ready!".green().bold());
    println!("\nNext steps:");
    println!(
        "  1. Drop timesheet and audit CSVs into {}",
        "data/input/".cyan()
    );
    println!(
        "  2. Write pages under {} and run {}",
        "md/".cyan(),
        "satchel site build".cyan()
    );
    println!(
        "  3. Copy {} up to the project root to change defaults",
        "config/satchel.toml".cyan()
    );
    println!();

    Ok(root)
}

fn create_dir_if_missing(path: &Path) -> Result<()> {
    if !path.exists() {
        fs::create_dir_all(path)?;
        println!("   {} {}", "Creating".green(), path.display());
    }
    Ok(())
}

fn write_file_if_missing(path: &Path, content: &str, display_name: &str) -> Result<()> {
    if path.exists() {
        println!("   {} {} (already exists)", "Skipping".yellow(), display_name);
    } else {
        fs::write(path, content)?;
        println!("   {} {}", "Creating".green(), display_name);
    }
    Ok(())
}
