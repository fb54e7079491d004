//! Markdown knowledge base
//!
//! `site build` renders the md directory into a static, categorized site;
//! `site serve` previews it and hosts the meta-editing admin page.

mod builder;
mod front_matter;

pub use builder::{build, inject_img_width, render_markdown, BuildSummary, INDEX_CSS, INDEX_JS, PAGE_CSS};
pub use front_matter::{compose, parse, rewrite, split, PageMeta, ParsedPage};
