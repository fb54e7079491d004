//! Access SQL cleanup
//!
//! The training exports arrive as headerless TSVs with one Access SQL
//! statement buried in each row. The statements use Access-only syntax that
//! chokes every other tool, so each cleanup rule rewrites one Access habit
//! and records a note saying it fired.

use super::placeholder;
use crate::errors::{InputError, Result};
use crate::fsutil;
use colored::Colorize;
use regex::Regex;
use std::fs;
use std::path::{Path, PathBuf};

lazy_static::lazy_static! {
    static ref SQL_KEYWORD: Regex = Regex::new(r"(?i)\b(SELECT|INSERT|UPDATE|DELETE)\b").unwrap();
    static ref DATE_LITERAL: Regex = Regex::new(r"#([^#\r\n]*)#").unwrap();
    static ref BRACKET_IDENT: Regex = Regex::new(r"\[([^\]\r\n]+)\]").unwrap();
    // Leading group keeps the char before the identifier; a quote or word
    // char there means we are inside a literal or another identifier
    static ref DIGIT_IDENT: Regex = Regex::new(r"(^|[^'\w])(\d+[A-Za-z_]\w*)").unwrap();
    static ref BOOL_TRUE: Regex = Regex::new(r"=\s*(?i:true|yes)\b").unwrap();
    static ref BOOL_FALSE: Regex = Regex::new(r"=\s*(?i:false|no)\b").unwrap();
}

pub struct SanitizeOptions {
    pub out_csv: Option<PathBuf>,
    pub out_sql: Option<PathBuf>,
    pub out_safe: Option<PathBuf>,
    pub archive_dir: Option<PathBuf>,
}

pub struct SanitizeSummary {
    pub rows: usize,
    pub sql_column: usize,
    pub out_csv: PathBuf,
    pub out_sql: PathBuf,
    pub out_safe: PathBuf,
}

/// Rewrite one SQL cell. Returns the cleaned text and one note per rule that
/// fired, with its hit count.
pub fn clean_sql(sql: &str) -> (String, Vec<String>) {
    let mut out = sql.to_string();
    let mut notes = Vec::new();

    let hits = DATE_LITERAL.find_iter(&out).count();
    if hits > 0 {
        out = DATE_LITERAL.replace_all(&out, "'${1}'").into_owned();
        notes.push(format!("date literals quoted ({})", hits));
    }

    let hits = out.matches('&').count();
    if hits > 0 {
        out = out.replace('&', " + ");
        notes.push(format!("& concatenation ({})", hits));
    }

    let hits = out.matches('!').count();
    if hits > 0 {
        out = out.replace('!', ".");
        notes.push(format!("! separators ({})", hits));
    }

    let hits = BRACKET_IDENT.find_iter(&out).count();
    if hits > 0 {
        out = BRACKET_IDENT.replace_all(&out, "FIX_${1}").into_owned();
        notes.push(format!("bracketed identifiers ({})", hits));
    }

    let hits = DIGIT_IDENT.find_iter(&out).count();
    if hits > 0 {
        out = DIGIT_IDENT.replace_all(&out, "${1}FIX_${2}").into_owned();
        notes.push(format!("digit-leading identifiers ({})", hits));
    }

    let hits = BOOL_TRUE.find_iter(&out).count();
    if hits > 0 {
        out = BOOL_TRUE.replace_all(&out, "= 1").into_owned();
        notes.push(format!("boolean true ({})", hits));
    }

    let hits = BOOL_FALSE.find_iter(&out).count();
    if hits > 0 {
        out = BOOL_FALSE.replace_all(&out, "= 0").into_owned();
        notes.push(format!("boolean false ({})", hits));
    }

    (out, notes)
}

/// Pick the column with the most SQL keyword hits. Exports without a single
/// keyword fall back to the historical layouts: column 8, column 5, then the
/// last column.
pub fn detect_sql_column(rows: &[Vec<String>]) -> usize {
    let width = rows.iter().map(Vec::len).max().unwrap_or(0);
    let mut best: Option<(usize, usize)> = None;
    for col in 0..width {
        let hits: usize = rows
            .iter()
            .filter_map(|r| r.get(col))
            .map(|cell| SQL_KEYWORD.find_iter(cell).count())
            .sum();
        if hits > 0 && best.map(|(_, h)| hits > h).unwrap_or(true) {
            best = Some((col, hits));
        }
    }
    if let Some((col, _)) = best {
        return col;
    }
    if width > 7 {
        7
    } else if width > 4 {
        4
    } else {
        width.saturating_sub(1)
    }
}

fn read_tsv(path: &Path) -> Result<Vec<Vec<String>>> {
    if !path.exists() {
        return Err(InputError::new(format!("input TSV not found: {}", path.display())).into());
    }
    let contents = fsutil::read_utf8(path)?;
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(b'\t')
        .has_headers(false)
        .flexible(true)
        .from_reader(contents.as_bytes());
    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record?;
        rows.push(record.iter().map(str::to_string).collect());
    }
    Ok(rows)
}

fn sibling(input: &Path, suffix: &str) -> PathBuf {
    let stem = input
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "input".to_string());
    input.with_file_name(format!("{}{}", stem, suffix))
}

/// Move an existing output aside before overwriting it
fn archive_existing(path: &Path, archive_dir: &Path) -> Result<()> {
    if !path.exists() {
        return Ok(());
    }
    fs::create_dir_all(archive_dir)?;
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "output".to_string());
    let dest = archive_dir.join(format!("{}_{}", fsutil::run_stamp(), name));
    fs::rename(path, &dest)?;
    println!("   {} {} -> {}", "Archiving".yellow(), name, dest.display());
    Ok(())
}

pub fn run(input: &Path, opts: &SanitizeOptions) -> Result<SanitizeSummary> {
    println!("   {} {}", "Reading".cyan(), input.display());
    let rows = read_tsv(input)?;
    if rows.is_empty() {
        return Err(InputError::new("input TSV has no rows").into());
    }

    let sql_column = detect_sql_column(&rows);
    println!(
        "   {} SQL in column {} of {} rows",
        "Detected".green(),
        sql_column + 1,
        rows.len()
    );

    let out_csv = opts
        .out_csv
        .clone()
        .unwrap_or_else(|| sibling(input, "_converted.csv"));
    let out_sql = opts
        .out_sql
        .clone()
        .unwrap_or_else(|| sibling(input, "_converted.sql"));
    let out_safe = opts
        .out_safe
        .clone()
        .unwrap_or_else(|| sibling(input, "_safe.sql"));
    let archive_dir = opts
        .archive_dir
        .clone()
        .unwrap_or_else(|| input.with_file_name("archive"));
    for path in [&out_csv, &out_sql, &out_safe] {
        archive_existing(path, &archive_dir)?;
    }

    let mut writer = csv::Writer::from_path(&out_csv)?;
    let mut converted_all = Vec::with_capacity(rows.len());
    for row in &rows {
        let raw = row.get(sql_column).map(String::as_str).unwrap_or("");
        let (converted, notes) = clean_sql(raw);
        let mut record = row.clone();
        record.push(converted.clone());
        record.push(notes.join(" | "));
        writer.write_record(&record)?;
        converted_all.push(converted);
    }
    writer.flush()?;

    fs::write(&out_sql, format!("{}\n", converted_all.join("\n\n")))?;
    let safe: Vec<String> = converted_all
        .iter()
        .map(|sql| placeholder::protect(sql))
        .collect();
    fs::write(&out_safe, format!("{}\n", safe.join("\n\n")))?;

    for path in [&out_csv, &out_sql, &out_safe] {
        println!("   {} {}", "Writing".green(), path.display());
    }

    Ok(SanitizeSummary {
        rows: rows.len(),
        sql_column,
        out_csv,
        out_sql,
        out_safe,
    })
}

/// Undo the formatter-safe placeholders in a whole file
pub fn restore_file(input: &Path, output: Option<&Path>) -> Result<PathBuf> {
    if !input.exists() {
        return Err(InputError::new(format!("input file not found: {}", input.display())).into());
    }
    let contents = fsutil::read_utf8(input)?;
    let restored = placeholder::restore(&contents);
    let out = output
        .map(Path::to_path_buf)
        .unwrap_or_else(|| sibling(input, "_restored.sql"));
    fs::write(&out, restored)?;
    println!("   {} {}", "Writing".green(), out.display());
    Ok(out)
}
