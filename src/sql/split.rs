//! Statement splitting and per-statement files
//!
//! A dump arrives as one blob; the review flow wants one file per statement
//! with the tracking sheet's columns as leading comments. Semicolons inside
//! strings and comments do not split. When the sheet and the dump disagree,
//! fragments that look like continuations are folded back into their
//! predecessor until the counts line up.

use crate::errors::{InputError, Result};
use crate::fsutil;
use colored::Colorize;
use regex::Regex;
use std::fs;
use std::path::{Path, PathBuf};

const COMMENT_COLUMN_LIMIT: usize = 3;

/// First token of a statement, for type labels and continuation checks
const TOP_LEVEL_KEYWORDS: &[&str] = &[
    "SELECT", "INSERT", "UPDATE", "DELETE", "CREATE", "DROP", "ALTER", "TRUNCATE", "MERGE",
    "WITH", "GRANT", "REVOKE", "BEGIN", "DECLARE", "SET", "USE", "EXEC", "EXECUTE", "CALL",
    "COMMENT",
];

lazy_static::lazy_static! {
    static ref FIRST_TOKEN: Regex = Regex::new(r"^[A-Za-z_][0-9A-Za-z_]*").unwrap();
}

pub struct SplitOptions {
    pub out_dir: Option<PathBuf>,
    pub prefix: Option<String>,
    pub meta_csv: Option<PathBuf>,
    pub comment_cols: Vec<String>,
    pub no_sync: bool,
}

pub struct SplitSummary {
    pub run_dir: PathBuf,
    pub files: Vec<PathBuf>,
    pub statements: usize,
    pub comment_rows: Option<usize>,
    pub synced: bool,
}

/// Split on top-level semicolons. Quoted strings ('' escape respected),
/// double-quoted identifiers, `--` line comments and `/* */` blocks are
/// opaque. A trailing unterminated statement is kept.
pub fn split_statements(sql: &str) -> Vec<String> {
    let mut statements = Vec::new();
    let mut current = String::new();
    let mut chars = sql.chars().peekable();
    let mut in_single = false;
    let mut in_double = false;
    let mut in_line_comment = false;
    let mut in_block_comment = false;

    while let Some(c) = chars.next() {
        if in_line_comment {
            current.push(c);
            if c == '\n' {
                in_line_comment = false;
            }
            continue;
        }
        if in_block_comment {
            current.push(c);
            if c == '*' && chars.peek() == Some(&'/') {
                if let Some(n) = chars.next() {
                    current.push(n);
                }
                in_block_comment = false;
            }
            continue;
        }
        if in_single {
            current.push(c);
            if c == '\'' {
                if chars.peek() == Some(&'\'') {
                    if let Some(n) = chars.next() {
                        current.push(n);
                    }
                } else {
                    in_single = false;
                }
            }
            continue;
        }
        if in_double {
            current.push(c);
            if c == '"' {
                in_double = false;
            }
            continue;
        }
        match c {
            '\'' => {
                in_single = true;
                current.push(c);
            }
            '"' => {
                in_double = true;
                current.push(c);
            }
            '-' if chars.peek() == Some(&'-') => {
                in_line_comment = true;
                current.push(c);
            }
            '/' if chars.peek() == Some(&'*') => {
                in_block_comment = true;
                current.push(c);
            }
            ';' => {
                let stmt = current.trim();
                if !stmt.is_empty() {
                    statements.push(stmt.to_string());
                }
                current.clear();
            }
            _ => current.push(c),
        }
    }
    let stmt = current.trim();
    if !stmt.is_empty() {
        statements.push(stmt.to_string());
    }
    statements
}

/// First code token uppercased, skipping leading `--` comment lines
pub fn statement_type(sql: &str) -> String {
    for line in sql.lines() {
        let t = line.trim_start();
        if t.is_empty() || t.starts_with("--") {
            continue;
        }
        if let Some(m) = FIRST_TOKEN.find(t) {
            return m.as_str().to_uppercase();
        }
        break;
    }
    "UNKNOWN".to_string()
}

/// A fragment that cannot start a statement: empty, opens with `)` or `,`,
/// or its first token is not a top-level keyword.
fn is_continuation(stmt: &str) -> bool {
    let t = stmt.trim_start();
    if t.is_empty() || t.starts_with(')') || t.starts_with(',') {
        return true;
    }
    let ty = statement_type(stmt);
    !TOP_LEVEL_KEYWORDS.contains(&ty.as_str())
}

/// Fold continuation fragments into their predecessor until `target`
/// statements remain or nothing more can be merged.
fn align_statements(mut statements: Vec<String>, target: usize) -> Vec<String> {
    while statements.len() > target {
        let idx = (1..statements.len()).find(|&i| is_continuation(&statements[i]));
        match idx {
            Some(i) => {
                let fragment = statements.remove(i);
                statements[i - 1] = format!("{};\n{}", statements[i - 1], fragment);
            }
            None => break,
        }
    }
    statements
}

/// Chosen meta columns per row, in column order
fn read_meta(path: &Path, wanted: &[String]) -> Result<(Vec<String>, Vec<Vec<String>>)> {
    let contents = fsutil::read_utf8(path)?;
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .from_reader(contents.as_bytes());
    let headers: Vec<String> = reader
        .headers()?
        .iter()
        .map(|h| h.trim().to_string())
        .collect();

    let indices: Vec<usize> = if wanted.is_empty() {
        (0..headers.len().min(COMMENT_COLUMN_LIMIT)).collect()
    } else {
        let mut found = Vec::new();
        for name in wanted.iter().take(COMMENT_COLUMN_LIMIT) {
            match headers.iter().position(|h| h == name) {
                Some(i) => found.push(i),
                None => {
                    return Err(InputError::new(format!(
                        "meta CSV has no column named \"{}\"",
                        name
                    ))
                    .into())
                }
            }
        }
        found
    };

    let names: Vec<String> = indices.iter().map(|&i| headers[i].clone()).collect();
    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record?;
        rows.push(
            indices
                .iter()
                .map(|&i| record.get(i).unwrap_or("").trim().to_string())
                .collect(),
        );
    }
    Ok((names, rows))
}

pub fn run(input: &Path, opts: &SplitOptions) -> Result<SplitSummary> {
    if !input.exists() {
        return Err(InputError::new(format!("input SQL not found: {}", input.display())).into());
    }
    println!("   {} {}", "Reading".cyan(), input.display());
    let sql = fsutil::read_utf8(input)?;
    let mut statements = split_statements(&sql);
    if statements.is_empty() {
        return Err(InputError::new("no SQL statements found in input").into());
    }

    let meta = match &opts.meta_csv {
        Some(path) => Some(read_meta(path, &opts.comment_cols)?),
        None => None,
    };

    let mut synced = true;
    if let Some((_, rows)) = &meta {
        if !opts.no_sync && statements.len() > rows.len() {
            statements = align_statements(statements, rows.len());
        }
        if statements.len() != rows.len() {
            synced = false;
            println!(
                "   {} {} statements but {} comment rows",
                "Warning:".yellow(),
                statements.len(),
                rows.len()
            );
        }
    }

    let base = opts
        .out_dir
        .clone()
        .unwrap_or_else(|| input.parent().unwrap_or(Path::new(".")).join("split"));
    let run_dir = base.join(fsutil::run_stamp());
    fs::create_dir_all(&run_dir)?;

    let prefix = opts
        .prefix
        .as_ref()
        .map(|p| format!("{}_", p))
        .unwrap_or_default();
    let mut files = Vec::with_capacity(statements.len());
    let mut manifest_rows = Vec::with_capacity(statements.len());
    for (i, stmt) in statements.iter().enumerate() {
        let ty = statement_type(stmt);
        let name = format!("{}{:03}_{}.sql", prefix, i + 1, ty);
        let path = run_dir.join(&name);

        let mut body = String::new();
        if let Some((names, rows)) = &meta {
            if let Some(row) = rows.get(i) {
                for (col, value) in names.iter().zip(row) {
                    body.push_str(&format!("-- {}: {}\n", col, value));
                }
            }
        }
        body.push_str(stmt);
        body.push('\n');
        fs::write(&path, body)?;

        manifest_rows.push(format!("{}\t{}\t{}", name, ty, stmt.len()));
        files.push(path);
    }

    let comment_rows = meta.as_ref().map(|(_, rows)| rows.len());
    let status = if synced {
        "ok".to_string()
    } else {
        format!(
            "count mismatch ({} statements, {} comment rows)",
            statements.len(),
            comment_rows.unwrap_or(0)
        )
    };
    let manifest = format!(
        "input={}\nstatements={}\ncomments={}\nstatus={}\ncreated={}\n\n{}\n",
        input.display(),
        statements.len(),
        comment_rows.map(|n| n.to_string()).unwrap_or_else(|| "-".to_string()),
        status,
        chrono::Local::now().format("%Y-%m-%d %H:%M:%S"),
        manifest_rows.join("\n")
    );
    fs::write(run_dir.join("_manifest.txt"), manifest)?;

    println!(
        "   {} {} statements -> {}",
        "Writing".green(),
        statements.len(),
        run_dir.display()
    );

    Ok(SplitSummary {
        run_dir,
        files,
        statements: statements.len(),
        comment_rows,
        synced,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_split_ignores_quoted_semicolons() {
        let parts = split_statements("SELECT ';' FROM t; DELETE FROM u");
        assert_eq!(parts, vec!["SELECT ';' FROM t", "DELETE FROM u"]);
    }

    #[test]
    fn test_split_ignores_comment_semicolons() {
        let parts = split_statements("A /* x; y */ B; -- tail;\nC;");
        assert_eq!(parts.len(), 2);
        assert_eq!(parts[0], "A /* x; y */ B");
        assert!(parts[1].ends_with('C'));
    }

    #[test]
    fn test_split_respects_escaped_quote() {
        let parts = split_statements("WHERE a = 'it''s; fine'; NEXT");
        assert_eq!(parts[0], "WHERE a = 'it''s; fine'");
    }

    #[test]
    fn test_split_keeps_trailing_statement() {
        let parts = split_statements("SELECT 1; SELECT 2");
        assert_eq!(parts.len(), 2);
    }

    #[test]
    fn test_statement_type_skips_leading_comments() {
        assert_eq!(statement_type("-- note\nupdate t set a = 1"), "UPDATE");
        assert_eq!(statement_type("(a, b)"), "UNKNOWN");
        assert_eq!(statement_type("select 1"), "SELECT");
    }

    #[test]
    fn test_continuation_detection() {
        assert!(is_continuation(", (2)"));
        assert!(is_continuation(") AS x"));
        assert!(is_continuation("AND b = 1"));
        assert!(!is_continuation("DELETE FROM t"));
    }

    #[test]
    fn test_align_merges_continuations() {
        let parts = vec![
            "INSERT INTO t VALUES (1)".to_string(),
            ", (2)".to_string(),
            "DELETE FROM t".to_string(),
        ];
        let merged = align_statements(parts, 2);
        assert_eq!(merged.len(), 2);
        assert_eq!(merged[0], "INSERT INTO t VALUES (1);\n, (2)");
    }

    #[test]
    fn test_align_gives_up_without_continuations() {
        let parts = vec!["SELECT 1".to_string(), "SELECT 2".to_string()];
        let merged = align_statements(parts, 1);
        assert_eq!(merged.len(), 2);
    }

    #[test]
    fn test_run_writes_numbered_files_and_manifest() {
        let dir = TempDir::new().unwrap();
        let input = dir.path().join("dump.sql");
        fs::write(&input, "SELECT a FROM t;\nUPDATE t SET a = 1;\n").unwrap();
        let meta = dir.path().join("meta.csv");
        fs::write(&meta, "no,title\n1,first\n2,second\n").unwrap();

        let opts = SplitOptions {
            out_dir: Some(dir.path().join("out")),
            prefix: None,
            meta_csv: Some(meta),
            comment_cols: vec![],
            no_sync: false,
        };
        let summary = run(&input, &opts).unwrap();
        assert_eq!(summary.statements, 2);
        assert!(summary.synced);

        let first = fs::read_to_string(&summary.files[0]).unwrap();
        assert!(first.starts_with("-- no: 1\n-- title: first\n"));
        assert!(first.contains("SELECT a FROM t"));
        assert!(summary.files[0].file_name().unwrap().to_str().unwrap().starts_with("001_SELECT"));

        let manifest = fs::read_to_string(summary.run_dir.join("_manifest.txt")).unwrap();
        assert!(manifest.contains("statements=2"));
        assert!(manifest.contains("status=ok"));
        assert!(manifest.contains("002_UPDATE.sql\tUPDATE"));
    }
}
