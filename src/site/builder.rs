//! Markdown site building
//!
//! Renders `md/*.md` into a static html dir with a categorized, searchable
//! index. Content hashes in a manifest file make repeat builds incremental;
//! pages render in parallel when there is more than one to do.

use super::front_matter::{self, PageMeta};
use crate::config::SiteConfig;
use crate::errors::{Result, ToolError};
use crate::fsutil;
use crate::html;
use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};
use pulldown_cmark::{Options, Parser};
use rayon::prelude::*;
use regex::Regex;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use std::fmt::Write as _;
use std::fs;
use std::path::Path;

pub const INDEX_CSS: &str = include_str!("index.css");
pub const INDEX_JS: &str = include_str!("index.js");
pub const PAGE_CSS: &str = include_str!("page.css");

const MANIFEST_FILE: &str = ".satchel-site.json";

lazy_static::lazy_static! {
    static ref IMG_TAG: Regex = Regex::new(r"<img\b[^>]*>").unwrap();
}

#[derive(Debug)]
pub struct BuildSummary {
    pub rendered: usize,
    pub skipped: usize,
    pub pages: Vec<PageMeta>,
    pub warnings: Vec<String>,
}

/// Content hashes from the previous build
#[derive(Serialize, Deserialize, Default)]
struct Manifest {
    template: String,
    pages: BTreeMap<String, String>,
}

struct PageOutcome {
    meta: PageMeta,
    hash: String,
    warning: Option<String>,
    skipped: bool,
}

fn compute_hash(content: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(content.as_bytes());
    format!("{:x}", hasher.finalize())
}

/// Changes to the embedded assets must invalidate every page
fn template_hash() -> String {
    compute_hash(&format!("{}{}{}", INDEX_CSS, INDEX_JS, PAGE_CSS))
}

fn ensure_dir(path: &Path) -> Result<()> {
    if path.exists() {
        if !path.is_dir() {
            return Err(ToolError::Config(format!(
                "{} exists but is not a directory",
                path.display()
            )));
        }
        return Ok(());
    }
    println!("   {} {}", "Creating".green(), path.display());
    fs::create_dir_all(path)?;
    Ok(())
}

fn check_writable(dir: &Path) -> Result<()> {
    let probe = dir.join(".satchel-probe");
    fs::write(&probe, b"probe")
        .map_err(|e| ToolError::Config(format!("{} is not writable: {}", dir.display(), e)))?;
    let _ = fs::remove_file(&probe);
    Ok(())
}

pub fn render_markdown(body: &str) -> String {
    let mut options = Options::empty();
    options.insert(Options::ENABLE_TABLES);
    options.insert(Options::ENABLE_STRIKETHROUGH);
    options.insert(Options::ENABLE_TASKLISTS);
    let parser = Parser::new_ext(body, options);
    let mut out = String::new();
    pulldown_cmark::html::push_html(&mut out, parser);
    out
}

/// Give width-less `<img>` tags the configured default; an author-set width
/// always wins.
pub fn inject_img_width(rendered: &str, width: u32) -> String {
    IMG_TAG
        .replace_all(rendered, |caps: &regex::Captures| {
            let tag = &caps[0];
            if tag.contains("width=") {
                return tag.to_string();
            }
            if let Some(head) = tag.strip_suffix("/>") {
                format!("{} width=\"{}\" />", head.trim_end(), width)
            } else if let Some(head) = tag.strip_suffix('>') {
                format!("{} width=\"{}\">", head.trim_end(), width)
            } else {
                tag.to_string()
            }
        })
        .into_owned()
}

fn page_document(stem: &str, category: &str, tags: &[String], body_html: &str) -> String {
    let meta_line = if tags.is_empty() {
        format!("category: {}", html::escape(category))
    } else {
        format!(
            "category: {} \u{b7} tags: {}",
            html::escape(category),
            html::escape(&tags.join(", "))
        )
    };
    let body = format!(
        "<nav><a href=\"index.html\">&larr; Index</a></nav>\n<p class=\"page-meta\">{}</p>\n<main>\n{}</main>\n",
        meta_line, body_html
    );
    html::document(stem, &format!("<style>\n{}</style>", PAGE_CSS), &body)
}

fn render_page_file(
    md_path: &Path,
    html_dir: &Path,
    config: &SiteConfig,
    previous_hash: Option<&String>,
    force: bool,
) -> Result<PageOutcome> {
    let file = md_path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let stem = md_path
        .file_stem()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();

    let raw = fsutil::read_utf8(md_path)?;
    let hash = compute_hash(&raw);
    let parsed = front_matter::parse(&raw, &config.default_category);
    let warning = parsed.warning.as_ref().map(|w| format!("{}: {}", file, w));
    let meta = PageMeta {
        file,
        category: parsed.category.clone(),
        tags: parsed.tags.clone(),
    };

    let out_path = html_dir.join(format!("{}.html", stem));
    if !force && previous_hash == Some(&hash) && out_path.exists() {
        return Ok(PageOutcome {
            meta,
            hash,
            warning,
            skipped: true,
        });
    }

    let rendered = inject_img_width(&render_markdown(parsed.body), config.image_width);
    fs::write(&out_path, page_document(&stem, &meta.category, &meta.tags, &rendered))?;
    Ok(PageOutcome {
        meta,
        hash,
        warning,
        skipped: false,
    })
}

/// Category display order: the order file first, the rest alphabetical, the
/// default category always last.
fn category_order(
    config: &SiteConfig,
    present: &[String],
    warnings: &mut Vec<String>,
) -> Vec<String> {
    let order_file = config.md_dir.join(&config.categories_file);
    let mut listed: Vec<String> = Vec::new();
    match fsutil::read_utf8(&order_file) {
        Ok(text) => {
            for line in text.lines() {
                let line = line.trim();
                if line.is_empty() || line.starts_with('#') {
                    continue;
                }
                listed.push(line.to_string());
            }
        }
        Err(_) => warnings.push(format!(
            "no category order file ({}); categories sorted alphabetically",
            order_file.display()
        )),
    }

    let mut ordered: Vec<String> = Vec::new();
    for cat in &listed {
        if *cat != config.default_category && present.contains(cat) && !ordered.contains(cat) {
            ordered.push(cat.clone());
        }
    }
    let mut rest: Vec<String> = present
        .iter()
        .filter(|c| !ordered.contains(c) && **c != config.default_category)
        .cloned()
        .collect();
    rest.sort();
    ordered.extend(rest);
    if present.iter().any(|c| *c == config.default_category) {
        ordered.push(config.default_category.clone());
    }
    ordered
}

fn index_document(config: &SiteConfig, pages: &[PageMeta], warnings: &mut Vec<String>) -> String {
    let mut by_category: BTreeMap<&str, Vec<&PageMeta>> = BTreeMap::new();
    for page in pages {
        by_category.entry(&page.category).or_default().push(page);
    }
    let present: Vec<String> = by_category.keys().map(|c| c.to_string()).collect();
    let order = category_order(config, &present, warnings);

    let mut tag_counts: BTreeMap<&str, usize> = BTreeMap::new();
    for page in pages {
        for tag in &page.tags {
            *tag_counts.entry(tag).or_insert(0) += 1;
        }
    }

    let mut body = String::new();
    let _ = writeln!(body, "<h1>{}</h1>", html::escape(&config.title));
    body.push_str(concat!(
        "<div class=\"toolbar\">\n",
        "<input id=\"search\" type=\"search\" placeholder=\"Search pages...\">\n",
        "<button id=\"open-all\">Open all</button>\n",
        "<button id=\"close-all\">Close all</button>\n",
        "</div>\n"
    ));

    if !tag_counts.is_empty() {
        body.push_str("<div class=\"tags\" id=\"tag-cloud\">\n");
        for (tag, count) in &tag_counts {
            let _ = writeln!(
                body,
                "<button class=\"tag\" data-tag=\"{0}\">{0} ({1})</button>",
                html::escape(tag),
                count
            );
        }
        body.push_str("</div>\n");
    }

    if pages.is_empty() {
        body.push_str(
            "<p class=\"empty-note\">No pages yet. Drop markdown files into the md directory.</p>\n",
        );
    } else {
        let _ = writeln!(
            body,
            "<div id=\"categories\" data-per-page=\"{}\">",
            config.categories_per_page
        );
        for cat in &order {
            let items = match by_category.get(cat.as_str()) {
                Some(items) => items,
                None => continue,
            };
            let _ = writeln!(
                body,
                "<details class=\"category\" data-category=\"{}\">",
                html::escape(cat)
            );
            let _ = writeln!(
                body,
                "<summary>{} <span class=\"count\">({})</span></summary>",
                html::escape(cat),
                items.len()
            );
            body.push_str("<ul>\n");
            for page in items {
                let title = page.file.trim_end_matches(".md");
                let tag_note = if page.tags.is_empty() {
                    String::new()
                } else {
                    format!(
                        " <span class=\"page-tags\">{}</span>",
                        html::escape(&page.tags.join(", "))
                    )
                };
                let _ = writeln!(
                    body,
                    "<li class=\"page\" data-title=\"{0}\" data-tags=\"{1}\" data-category=\"{2}\"><a href=\"{0}.html\">{0}</a>{3}</li>",
                    html::escape(title),
                    html::escape(&page.tags.join(",")),
                    html::escape(cat),
                    tag_note
                );
            }
            body.push_str("</ul>\n</details>\n");
        }
        body.push_str("</div>\n<div class=\"pagination\" id=\"pagination\"></div>\n");
    }
    let _ = writeln!(body, "<script>\n{}</script>", INDEX_JS);

    html::document(
        &config.title,
        &format!("<style>\n{}</style>", INDEX_CSS),
        &body,
    )
}

fn load_manifest(html_dir: &Path) -> Manifest {
    let path = html_dir.join(MANIFEST_FILE);
    fs::read_to_string(&path)
        .ok()
        .and_then(|text| serde_json::from_str(&text).ok())
        .unwrap_or_default()
}

pub fn build(config: &SiteConfig, force: bool) -> Result<BuildSummary> {
    ensure_dir(&config.md_dir)?;
    ensure_dir(&config.html_dir)?;
    check_writable(&config.html_dir)?;

    let mut warnings: Vec<String> = Vec::new();
    let mut files: Vec<std::path::PathBuf> = fs::read_dir(&config.md_dir)?
        .filter_map(|e| e.ok())
        .map(|e| e.path())
        .filter(|p| {
            p.is_file()
                && p.extension()
                    .map(|ext| ext.eq_ignore_ascii_case("md"))
                    .unwrap_or(false)
        })
        .collect();
    files.sort();
    if files.is_empty() {
        warnings.push(format!("no markdown files in {}", config.md_dir.display()));
    }

    let manifest = load_manifest(&config.html_dir);
    let template = template_hash();
    // A template change rebuilds everything
    let force = force || manifest.template != template;

    let pb = if files.len() > 1 {
        let pb = ProgressBar::new(files.len() as u64);
        pb.set_style(
            ProgressStyle::default_bar()
                .template("{spinner:.green} [{bar:40.cyan/blue}] {pos}/{len} {msg}")
                .unwrap()
                .progress_chars("=>-"),
        );
        Some(pb)
    } else {
        None
    };

    let outcomes: Vec<Result<PageOutcome>> = files
        .par_iter()
        .map(|path| {
            let key = path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default();
            let outcome =
                render_page_file(path, &config.html_dir, config, manifest.pages.get(&key), force);
            if let Some(ref pb) = pb {
                pb.inc(1);
                pb.set_message(key);
            }
            outcome
        })
        .collect();
    if let Some(pb) = pb {
        pb.finish_and_clear();
    }

    let mut pages = Vec::with_capacity(outcomes.len());
    let mut next_manifest = Manifest {
        template,
        pages: BTreeMap::new(),
    };
    let mut rendered = 0;
    let mut skipped = 0;
    for outcome in outcomes {
        let outcome = outcome?;
        if let Some(w) = outcome.warning {
            warnings.push(w);
        }
        if outcome.skipped {
            skipped += 1;
        } else {
            rendered += 1;
        }
        next_manifest
            .pages
            .insert(outcome.meta.file.clone(), outcome.hash);
        pages.push(outcome.meta);
    }

    let uncategorized = pages
        .iter()
        .filter(|p| p.category == config.default_category)
        .count();
    if uncategorized > 0 {
        warnings.push(format!(
            "{} page(s) without a category, filed under \"{}\"",
            uncategorized, config.default_category
        ));
    }

    let index = index_document(config, &pages, &mut warnings);
    fs::write(config.html_dir.join("index.html"), index)?;
    fs::write(
        config.html_dir.join(MANIFEST_FILE),
        serde_json::to_string_pretty(&next_manifest)?,
    )?;

    println!(
        "   {} {} page(s) rendered, {} unchanged",
        "Building".green(),
        rendered,
        skipped
    );
    if !warnings.is_empty() {
        eprintln!("\n{}", "─".repeat(70));
        eprintln!("{}", "Warnings".yellow().bold());
        for w in &warnings {
            eprintln!("   {} {}", "!".yellow(), w);
        }
        eprintln!("{}", "─".repeat(70));
    }

    Ok(BuildSummary {
        rendered,
        skipped,
        pages,
        warnings,
    })
}
