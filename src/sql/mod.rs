//! Access SQL grooming pipeline
//!
//! The subcommands mirror the manual review steps: sanitize the raw export,
//! protect it for external formatters, split a dump into reviewable files,
//! then mine the statements for join relationships.

mod links;
mod placeholder;
mod sanitize;
mod split;

pub use links::{extract_links, run_links, run_pairs, JoinLink, PairSort};
pub use placeholder::{protect, restore, SEMICOLON_TOKEN, TOKENS};
pub use sanitize::{
    clean_sql, detect_sql_column, restore_file, run as sanitize, SanitizeOptions, SanitizeSummary,
};
pub use split::{run as split, split_statements, statement_type, SplitOptions, SplitSummary};
