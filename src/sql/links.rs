//! Join-link extraction
//!
//! Reads statements out of `.sql` files and records every qualified equality
//! `a.x = b.y` found in ON and WHERE blocks, with aliases resolved back to
//! table names. The regexes lean on `\w` being Unicode-aware so Japanese
//! table and column names survive.

use super::split::{split_statements, statement_type};
use crate::errors::{InputError, Result};
use crate::fsutil;
use colored::Colorize;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

lazy_static::lazy_static! {
    static ref LINE_COMMENT: Regex = Regex::new(r"(?m)--.*$").unwrap();
    static ref TABLE_REF: Regex = Regex::new(r"(?i)\b(?:FROM|JOIN)\s+(\w+)").unwrap();
    // Checked against the text after a table ref without consuming it, so a
    // following JOIN keyword is still seen by the next TABLE_REF match
    static ref ALIAS_AFTER: Regex = Regex::new(r"^\s+(?:(?i:AS)\s+)?(\w+)").unwrap();
    static ref QUALIFIED_EQ: Regex =
        Regex::new(r"(\w+)\.(\w+)\s*=\s*(\w+)\.(\w+)").unwrap();
    // Lazy body, closed by the next clause keyword or end of statement
    static ref ON_BLOCK: Regex = Regex::new(
        r"(?is)\bON\b(.*?)(?:\b(?:LEFT|RIGHT|INNER|OUTER|JOIN|WHERE|GROUP|ORDER|HAVING|UNION)\b|$)"
    )
    .unwrap();
    static ref WHERE_BLOCK: Regex =
        Regex::new(r"(?is)\bWHERE\b(.*?)(?:\b(?:GROUP|ORDER|HAVING|UNION)\b|$)").unwrap();
}

/// Words that follow a table name without being its alias
const NOT_ALIASES: &[&str] = &[
    "ON", "WHERE", "LEFT", "RIGHT", "INNER", "OUTER", "FULL", "CROSS", "JOIN", "GROUP",
    "ORDER", "HAVING", "UNION", "SET", "AND", "OR", "AS", "USING", "VALUES",
];

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JoinLink {
    pub source: String,
    pub statement_type: String,
    pub context: String,
    pub left_table: String,
    pub left_column: String,
    pub right_table: String,
    pub right_column: String,
    pub condition: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PairSort {
    Count,
    Table,
}

fn alias_map(statement: &str) -> HashMap<String, String> {
    let mut map = HashMap::new();
    for caps in TABLE_REF.captures_iter(statement) {
        let table_m = match caps.get(1) {
            Some(m) => m,
            None => continue,
        };
        let table = table_m.as_str().to_string();
        map.insert(table.to_lowercase(), table.clone());
        if let Some(acaps) = ALIAS_AFTER.captures(&statement[table_m.end()..]) {
            let alias = &acaps[1];
            if !NOT_ALIASES.contains(&alias.to_uppercase().as_str()) {
                map.insert(alias.to_lowercase(), table.clone());
            }
        }
    }
    map
}

fn resolve(aliases: &HashMap<String, String>, name: &str) -> String {
    aliases
        .get(&name.to_lowercase())
        .cloned()
        .unwrap_or_else(|| name.to_string())
}

/// All join links in one file's worth of SQL
pub fn extract_links(source: &str, sql: &str) -> Vec<JoinLink> {
    let mut links = Vec::new();
    let mut seen: HashSet<String> = HashSet::new();

    for statement in split_statements(sql) {
        let code = LINE_COMMENT.replace_all(&statement, "");
        let ty = statement_type(&statement);
        let aliases = alias_map(&code);

        let mut blocks: Vec<(&str, String)> = Vec::new();
        for caps in ON_BLOCK.captures_iter(&code) {
            blocks.push(("ON", caps[1].to_string()));
        }
        for caps in WHERE_BLOCK.captures_iter(&code) {
            blocks.push(("WHERE", caps[1].to_string()));
        }

        for (context, body) in blocks {
            for caps in QUALIFIED_EQ.captures_iter(&body) {
                let left_table = resolve(&aliases, &caps[1]);
                let left_column = caps[2].to_string();
                let right_table = resolve(&aliases, &caps[3]);
                let right_column = caps[4].to_string();
                // a.x = a.x carries no join information
                if left_table == right_table && left_column == right_column {
                    continue;
                }
                let key = format!(
                    "{}|{}|{}|{}|{}|{}",
                    source, context, left_table, left_column, right_table, right_column
                );
                if !seen.insert(key) {
                    continue;
                }
                links.push(JoinLink {
                    source: source.to_string(),
                    statement_type: ty.clone(),
                    context: context.to_string(),
                    left_table,
                    left_column,
                    right_table,
                    right_column,
                    condition: caps[0].trim().to_string(),
                });
            }
        }
    }
    links
}

/// `.sql` files under `input`, or `input` itself when it is a file
fn collect_sources(input: &Path) -> Result<Vec<PathBuf>> {
    if input.is_file() {
        return Ok(vec![input.to_path_buf()]);
    }
    if !input.is_dir() {
        return Err(InputError::new(format!("input not found: {}", input.display())).into());
    }
    let mut files: Vec<PathBuf> = WalkDir::new(input)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .map(|e| e.path().to_path_buf())
        .filter(|p| {
            p.extension()
                .map(|ext| ext.eq_ignore_ascii_case("sql"))
                .unwrap_or(false)
        })
        .collect();
    files.sort();
    Ok(files)
}

pub fn run_links(input: &Path, out: &Path) -> Result<usize> {
    let files = collect_sources(input)?;
    if files.is_empty() {
        return Err(InputError::new(format!("no .sql files under {}", input.display())).into());
    }

    let mut links = Vec::new();
    for file in &files {
        let sql = fsutil::read_utf8(file)?;
        let source = file
            .strip_prefix(input)
            .unwrap_or(file)
            .to_string_lossy()
            .into_owned();
        let source = if source.is_empty() {
            file.to_string_lossy().into_owned()
        } else {
            source
        };
        links.extend(extract_links(&source, &sql));
    }

    let mut writer = csv::Writer::from_path(out)?;
    for link in &links {
        writer.serialize(link)?;
    }
    writer.flush()?;
    println!(
        "   {} {} links from {} files -> {}",
        "Writing".green(),
        links.len(),
        files.len(),
        out.display()
    );
    Ok(links.len())
}

#[derive(Default)]
struct PairAgg {
    count: usize,
    column_pairs: BTreeSet<String>,
    sources: BTreeSet<String>,
    contexts: BTreeSet<String>,
}

/// Aggregate a link CSV into order-normalized table pairs
pub fn run_pairs(input: &Path, out: &Path, sort: PairSort) -> Result<usize> {
    if !input.exists() {
        return Err(InputError::new(format!(
            "link CSV not found: {} (run `sql links` first)",
            input.display()
        ))
        .into());
    }
    let contents = fsutil::read_utf8(input)?;
    let mut reader = csv::Reader::from_reader(contents.as_bytes());

    let mut pairs: BTreeMap<(String, String), PairAgg> = BTreeMap::new();
    for record in reader.deserialize() {
        let link: JoinLink = record?;
        let (key, cols) = if link.left_table <= link.right_table {
            (
                (link.left_table.clone(), link.right_table.clone()),
                format!("{}={}", link.left_column, link.right_column),
            )
        } else {
            (
                (link.right_table.clone(), link.left_table.clone()),
                format!("{}={}", link.right_column, link.left_column),
            )
        };
        let agg = pairs.entry(key).or_default();
        agg.count += 1;
        agg.column_pairs.insert(cols);
        agg.sources.insert(link.source);
        agg.contexts.insert(link.context);
    }

    let mut rows: Vec<((String, String), PairAgg)> = pairs.into_iter().collect();
    if sort == PairSort::Count {
        rows.sort_by(|a, b| b.1.count.cmp(&a.1.count).then_with(|| a.0.cmp(&b.0)));
    }

    let mut writer = csv::Writer::from_path(out)?;
    writer.write_record([
        "table_a",
        "table_b",
        "link_count",
        "column_pairs",
        "sources",
        "contexts",
    ])?;
    let total = rows.len();
    for ((a, b), agg) in rows {
        writer.write_record([
            a.as_str(),
            b.as_str(),
            &agg.count.to_string(),
            &agg.column_pairs.iter().cloned().collect::<Vec<_>>().join(";"),
            &agg.sources.iter().cloned().collect::<Vec<_>>().join(";"),
            &agg.contexts.iter().cloned().collect::<Vec<_>>().join(";"),
        ])?;
    }
    writer.flush()?;
    println!("   {} {} table pairs -> {}", "Writing".green(), total, out.display());
    Ok(total)
}
