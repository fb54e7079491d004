//! Satchel - a toolbag for recurring design-office chores
//!
//! One binary, several small tools that share config, error reporting, and
//! run logging:
//!
//! | Command | Purpose |
//! |---------|---------|
//! | `portal` | merge an audit-trail CSV into a static diff portal |
//! | `site` | build and serve a markdown knowledge base |
//! | `sql` | sanitize, restore, split, and summarize SQL dumps |
//! | `tidy` | sort loose files; prune dated revisions |
//! | `flatten` | flatten JSON into a leveled TSV |
//! | `hours` | aggregate a timesheet CSV into summaries |
//! | `launch` | open configured folders and URLs by name |
//! | `new` | scaffold a fresh tool project |
//!
//! # Quick Start
//!
//! ```no_run
//! use satchel::config::Config;
//!
//! let config = Config::load(None).unwrap();
//!
//! // Render the knowledge base
//! let summary = satchel::site::build(&config.site, false).unwrap();
//! println!("{} rendered, {} unchanged", summary.rendered, summary.skipped);
//!
//! // Build the audit-trail portal
//! satchel::portal::run(&config.portal, None, None, false).unwrap();
//! ```

pub mod config;
pub mod errors;
pub mod flatten;
pub mod fsutil;
pub mod hours;
pub mod html;
pub mod launch;
pub mod portal;
pub mod runlog;
pub mod scaffold;
pub mod serve;
pub mod site;
pub mod sql;
pub mod tidy;

pub use config::Config;
pub use errors::{InputError, Result, ToolError};
pub use runlog::RunLog;
