//! Data flow portal
//!
//! Reads an audit-trail CSV, fills blank context cells from earlier rows of
//! the same case, merges rows into per-case events and renders the result as
//! one static HTML diff table.

mod aggregate;
mod columns;
mod context;
mod loader;
mod render;

pub use aggregate::{aggregate, attr_key, Change, Event};
pub use columns::{plan_columns, AttrColumn, ColumnPlan, FixedColumn};
pub use context::fill_context;
pub use loader::{load_rows, RawRow};
pub use render::{render_page, PageInfo, STYLE_CSS};

use crate::config::PortalConfig;
use crate::errors::Result;
use chrono::Local;
use colored::Colorize;
use std::fs;
use std::path::{Path, PathBuf};

pub struct PortalOutput {
    pub page: PathBuf,
    pub events: usize,
    pub attr_columns: usize,
}

/// Build the portal page. CLI paths win over the config file.
pub fn run(
    config: &PortalConfig,
    input_override: Option<&Path>,
    output_override: Option<&Path>,
    open_page: bool,
) -> Result<PortalOutput> {
    let input = input_override
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from(&config.input_csv));
    let out_dir = output_override
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from(&config.output_dir));

    println!("   {} {}", "Reading".cyan(), input.display());
    let (headers, mut rows) = load_rows(&input, &config.required_columns)?;
    fill_context(
        &mut rows,
        &headers,
        &config.carry_forward_columns,
        &config.required_columns,
    )?;

    let events = aggregate(&rows, &config.null_values);
    let plan = plan_columns(&rows, &config.fixed_columns, &config.priority_columns);

    let input_name = input
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| input.display().to_string());
    let info = PageInfo {
        input_name,
        generated_at: Local::now().format("%Y-%m-%d %H:%M:%S").to_string(),
        show_legend: config.show_legend,
        show_generated_at: config.show_generated_at,
        show_input_name: config.show_input_name,
    };
    let page_html = render_page(&events, &plan, &info);

    let assets = out_dir.join(&config.assets_dir);
    fs::create_dir_all(&assets)?;
    fs::write(assets.join("style.css"), STYLE_CSS)?;
    let page = out_dir.join("index.html");
    fs::write(&page, page_html)?;

    println!(
        "   {} {} rows -> {} events, {} attribute columns",
        "Merged".green(),
        rows.len(),
        events.len(),
        plan.attrs.len()
    );
    println!("   {} {}", "Writing".green(), page.display());

    if open_page {
        if let Err(e) = open::that(&page) {
            eprintln!("   {} could not open browser: {}", "Warning:".yellow(), e);
        }
    }

    Ok(PortalOutput {
        page,
        events: events.len(),
        attr_columns: plan.attrs.len(),
    })
}
