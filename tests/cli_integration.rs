//! Integration tests for the satchel CLI
//!
//! Each test drives the compiled binary inside its own temp directory, so
//! config discovery, relative outputs, and exit codes are exercised
//! end-to-end.

use std::fs;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};
use tempfile::TempDir;

/// Run satchel with `dir` as the working directory
fn run_satchel(dir: &Path, args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_satchel"))
        .args(args)
        .current_dir(dir)
        .output()
        .expect("Failed to execute satchel")
}

fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).to_string()
}

fn stderr(output: &Output) -> String {
    String::from_utf8_lossy(&output.stderr).to_string()
}

/// Files directly under `dir` whose names start with `prefix`, sorted
fn find_with_prefix(dir: &Path, prefix: &str) -> Vec<PathBuf> {
    let mut found: Vec<PathBuf> = fs::read_dir(dir)
        .expect("read_dir")
        .filter_map(|e| e.ok())
        .map(|e| e.path())
        .filter(|p| {
            p.file_name()
                .and_then(|n| n.to_str())
                .map(|n| n.starts_with(prefix))
                .unwrap_or(false)
        })
        .collect();
    found.sort();
    found
}

// =============================================================================
// Basic Command Tests
// =============================================================================

#[test]
fn test_help_command() {
    let temp = TempDir::new().expect("temp dir");
    let output = run_satchel(temp.path(), &["--help"]);

    assert!(output.status.success());
    let out = stdout(&output);
    assert!(out.contains("satchel"));
    assert!(out.contains("portal"));
    assert!(out.contains("tidy"));
}

#[test]
fn test_version_command() {
    let temp = TempDir::new().expect("temp dir");
    let output = run_satchel(temp.path(), &["--version"]);

    assert!(output.status.success());
    assert!(stdout(&output).contains("satchel"));
}

// =============================================================================
// Shell Completion Tests
// =============================================================================

#[test]
fn test_completion_zsh() {
    let temp = TempDir::new().expect("temp dir");
    let output = run_satchel(temp.path(), &["completion", "zsh"]);

    assert!(
        output.status.success(),
        "completion zsh failed: {}",
        stderr(&output)
    );
    assert!(stdout(&output).contains("#compdef satchel"));
}

#[test]
fn test_completion_bash() {
    let temp = TempDir::new().expect("temp dir");
    let output = run_satchel(temp.path(), &["completion", "bash"]);

    assert!(
        output.status.success(),
        "completion bash failed: {}",
        stderr(&output)
    );
    assert!(stdout(&output).contains("_satchel"));
}

#[test]
fn test_completion_fish() {
    let temp = TempDir::new().expect("temp dir");
    let output = run_satchel(temp.path(), &["completion", "fish"]);

    assert!(
        output.status.success(),
        "completion fish failed: {}",
        stderr(&output)
    );
    assert!(stdout(&output).contains("complete -c satchel"));
}

// =============================================================================
// Scaffold Tests
// =============================================================================

#[test]
fn test_new_creates_skeleton() {
    let temp = TempDir::new().expect("temp dir");
    let output = run_satchel(temp.path(), &["new", "demo"]);

    assert!(output.status.success(), "new failed: {}", stderr(&output));
    assert!(stdout(&output).contains("Project ready!"));

    let root = temp.path().join("demo");
    for sub in ["config", "data/input", "data/output", "logs", "md", "scripts"] {
        assert!(root.join(sub).is_dir(), "missing {}", sub);
    }
    assert!(root.join("config/satchel.toml").is_file());
    let readme = fs::read_to_string(root.join("README.md")).expect("README");
    assert!(readme.starts_with("# demo"));
}

#[test]
fn test_new_refuses_existing_directory() {
    let temp = TempDir::new().expect("temp dir");
    assert!(run_satchel(temp.path(), &["new", "demo"]).status.success());

    let output = run_satchel(temp.path(), &["new", "demo"]);
    assert!(!output.status.success());
    assert!(stderr(&output).contains("already exists"));
}

// =============================================================================
// Portal Tests
// =============================================================================

#[test]
fn test_portal_renders_page() {
    let temp = TempDir::new().expect("temp dir");
    fs::write(
        temp.path().join("flow.csv"),
        "case_id,table,operation,trigger,sql,attr_type,before,after,note\n\
         C-1,orders,UPDATE,app,UPDATE orders SET status='paid',status,pending,paid,\n\
         C-1,,,,,total,100,120,\n",
    )
    .expect("write csv");

    let output = run_satchel(
        temp.path(),
        &["portal", "--input", "flow.csv", "--output", "portal"],
    );
    assert!(output.status.success(), "portal failed: {}", stderr(&output));

    let page = fs::read_to_string(temp.path().join("portal/index.html")).expect("index.html");
    assert!(page.contains("C-1"));
    assert!(page.contains("paid"));
    assert!(temp.path().join("portal/assets/style.css").is_file());
}

#[test]
fn test_portal_missing_required_column_fails() {
    let temp = TempDir::new().expect("temp dir");
    fs::write(temp.path().join("flow.csv"), "case_id,before,after\nC-1,a,b\n").expect("write csv");

    let output = run_satchel(temp.path(), &["portal", "--input", "flow.csv"]);
    assert!(!output.status.success());
    assert!(stderr(&output).contains("attr_type"));
}

// =============================================================================
// Site Tests
// =============================================================================

#[test]
fn test_site_build_renders_pages_and_index() {
    let temp = TempDir::new().expect("temp dir");
    fs::create_dir(temp.path().join("md")).expect("mkdir");
    fs::write(
        temp.path().join("md/setup.md"),
        "---\ncategory: Guides\ntags:\n  - env\n---\n# Setup\n\nInstall things.\n",
    )
    .expect("write md");

    let output = run_satchel(temp.path(), &["site", "build"]);
    assert!(output.status.success(), "build failed: {}", stderr(&output));

    let page = fs::read_to_string(temp.path().join("html/setup.html")).expect("setup.html");
    assert!(page.contains("<h1>Setup</h1>"));
    let index = fs::read_to_string(temp.path().join("html/index.html")).expect("index.html");
    assert!(index.contains("Guides"));
    assert!(index.contains("setup"));
}

#[test]
fn test_site_build_skips_unchanged_pages() {
    let temp = TempDir::new().expect("temp dir");
    fs::create_dir(temp.path().join("md")).expect("mkdir");
    fs::write(temp.path().join("md/a.md"), "# A\n").expect("write md");

    assert!(run_satchel(temp.path(), &["site", "build"]).status.success());
    let output = run_satchel(temp.path(), &["site", "build"]);
    assert!(output.status.success());
    assert!(stdout(&output).contains("unchanged"));
}

// =============================================================================
// Sql Tests
// =============================================================================

#[test]
fn test_sql_sanitize_converts_access_isms() {
    let temp = TempDir::new().expect("temp dir");
    fs::write(
        temp.path().join("dump.tsv"),
        "1\tSELECT a FROM [order table] WHERE paid = True;\n",
    )
    .expect("write tsv");

    let output = run_satchel(temp.path(), &["sql", "sanitize", "--input", "dump.tsv"]);
    assert!(
        output.status.success(),
        "sanitize failed: {}",
        stderr(&output)
    );

    let sql = fs::read_to_string(temp.path().join("dump_converted.sql")).expect("converted");
    assert!(sql.contains("FIX_order table") || sql.contains("FIX_order"));
    assert!(sql.contains("= 1"));
    assert!(temp.path().join("dump_converted.csv").is_file());
    assert!(temp.path().join("dump_safe.sql").is_file());
}

#[test]
fn test_sql_restore_replaces_placeholders() {
    let temp = TempDir::new().expect("temp dir");
    fs::write(
        temp.path().join("safe.sql"),
        "SELECT 1 /*__SC__*/ SELECT 2;\n",
    )
    .expect("write sql");

    let output = run_satchel(temp.path(), &["sql", "restore", "safe.sql"]);
    assert!(output.status.success(), "restore failed: {}", stderr(&output));

    let restored =
        fs::read_to_string(temp.path().join("safe_restored.sql")).expect("restored file");
    assert!(restored.contains("SELECT 1 ;"));
}

#[test]
fn test_sql_split_writes_run_dir_and_manifest() {
    let temp = TempDir::new().expect("temp dir");
    fs::write(
        temp.path().join("dump.sql"),
        "CREATE TABLE a (x INT);\nINSERT INTO a VALUES (1);\n",
    )
    .expect("write sql");

    let output = run_satchel(
        temp.path(),
        &["sql", "split", "dump.sql", "--out-dir", "runs"],
    );
    assert!(output.status.success(), "split failed: {}", stderr(&output));

    let run_dirs: Vec<PathBuf> = fs::read_dir(temp.path().join("runs"))
        .expect("runs dir")
        .filter_map(|e| e.ok())
        .map(|e| e.path())
        .collect();
    assert_eq!(run_dirs.len(), 1);

    let names: Vec<String> = fs::read_dir(&run_dirs[0])
        .expect("run dir")
        .filter_map(|e| e.ok())
        .map(|e| e.file_name().to_string_lossy().into_owned())
        .collect();
    assert!(names.iter().any(|n| n.starts_with("001_")));
    assert!(names.iter().any(|n| n.starts_with("002_")));

    let manifest =
        fs::read_to_string(run_dirs[0].join("_manifest.txt")).expect("manifest");
    assert!(manifest.contains("statements=2"));
}

#[test]
fn test_sql_links_then_pairs() {
    let temp = TempDir::new().expect("temp dir");
    fs::write(
        temp.path().join("query.sql"),
        "SELECT * FROM orders o JOIN customers c ON o.cust_id = c.id;\n",
    )
    .expect("write sql");

    let output = run_satchel(temp.path(), &["sql", "links", "query.sql"]);
    assert!(output.status.success(), "links failed: {}", stderr(&output));
    let links = fs::read_to_string(temp.path().join("join_links.csv")).expect("links csv");
    assert!(links.contains("orders"));
    assert!(links.contains("customers"));

    let output = run_satchel(temp.path(), &["sql", "pairs"]);
    assert!(output.status.success(), "pairs failed: {}", stderr(&output));
    let pairs = fs::read_to_string(temp.path().join("join_pairs.csv")).expect("pairs csv");
    assert!(pairs.contains("customers"));
    assert!(pairs.contains("orders"));
}

// =============================================================================
// Tidy Tests
// =============================================================================

#[test]
fn test_tidy_sorts_files_into_groups() {
    let temp = TempDir::new().expect("temp dir");
    fs::write(temp.path().join("report.pdf"), "x").expect("write");
    fs::write(temp.path().join("pic.png"), "x").expect("write");
    fs::write(temp.path().join("notes"), "x").expect("write");

    let output = run_satchel(temp.path(), &["tidy", "--target", "."]);
    assert!(output.status.success(), "tidy failed: {}", stderr(&output));

    assert!(temp.path().join("documents/report.pdf").is_file());
    assert!(temp.path().join("images/pic.png").is_file());
    assert!(temp.path().join("no_extension/notes").is_file());
    assert!(!find_with_prefix(&temp.path().join("sort_logs"), "sort_").is_empty());
}

#[test]
fn test_tidy_dry_run_moves_nothing() {
    let temp = TempDir::new().expect("temp dir");
    fs::write(temp.path().join("report.pdf"), "x").expect("write");

    let output = run_satchel(temp.path(), &["tidy", "--target", ".", "--dry-run"]);
    assert!(output.status.success());
    assert!(stdout(&output).contains("[dry-run]"));
    assert!(temp.path().join("report.pdf").is_file());
    assert!(!temp.path().join("documents").exists());
    assert!(!temp.path().join("sort_logs").exists());
}

#[test]
fn test_tidy_revisions_keeps_newest() {
    let temp = TempDir::new().expect("temp dir");
    fs::write(temp.path().join("spec_20250101.txt"), "old").expect("write");
    fs::write(temp.path().join("spec_20250301.txt"), "new").expect("write");
    fs::write(temp.path().join("undated.txt"), "x").expect("write");

    let output = run_satchel(
        temp.path(),
        &["tidy", "revisions", "--target", ".", "--keep", "1"],
    );
    assert!(
        output.status.success(),
        "revisions failed: {}",
        stderr(&output)
    );

    assert!(temp.path().join("spec_20250301.txt").is_file());
    assert!(temp.path().join("old/spec_20250101.txt").is_file());
    assert!(temp.path().join("undated.txt").is_file());
}

// =============================================================================
// Flatten Tests
// =============================================================================

#[test]
fn test_flatten_writes_leveled_tsv() {
    let temp = TempDir::new().expect("temp dir");
    fs::write(
        temp.path().join("data.json"),
        r#"{"order": {"id": 7, "lines": [{"sku": "A"}]}}"#,
    )
    .expect("write json");

    let output = run_satchel(temp.path(), &["flatten", "data.json"]);
    assert!(output.status.success(), "flatten failed: {}", stderr(&output));

    let outputs = find_with_prefix(temp.path(), "output_");
    assert_eq!(outputs.len(), 1);
    let tsv = fs::read_to_string(&outputs[0]).expect("tsv");
    assert!(tsv.contains("order"));
    assert!(tsv.contains('\u{2192}'));
    assert!(tsv.lines().last().expect("value row").contains('7'));
}

#[test]
fn test_flatten_without_input_needs_a_json() {
    let temp = TempDir::new().expect("temp dir");
    let output = run_satchel(temp.path(), &["flatten"]);
    assert!(!output.status.success());
    assert!(stderr(&output).contains("json"));
}

// =============================================================================
// Hours Tests
// =============================================================================

#[test]
fn test_hours_writes_detail_and_monthly() {
    let temp = TempDir::new().expect("temp dir");
    fs::write(
        temp.path().join("timesheet.csv"),
        "employee,client,project_code,project_name,date,minutes,memo\n\
         Tanaka,Acme,P01,Portal,2025-01-10,90,review\n\
         Tanaka,Acme,P01,Portal,2025-01-20,30,fixes\n",
    )
    .expect("write csv");

    let output = run_satchel(
        temp.path(),
        &["hours", "--input", "timesheet.csv", "--out-dir", "out"],
    );
    assert!(output.status.success(), "hours failed: {}", stderr(&output));

    let out = temp.path().join("out");
    assert_eq!(find_with_prefix(&out, "hours_detail_all_").len(), 1);
    let monthly = find_with_prefix(&out, "hours_monthly_all_");
    assert_eq!(monthly.len(), 1);
    let monthly = fs::read_to_string(&monthly[0]).expect("monthly csv");
    assert!(monthly.contains("Tanaka,P01:Portal,2.0,2025-01"));
}

#[test]
fn test_hours_bad_minutes_reports_line() {
    let temp = TempDir::new().expect("temp dir");
    fs::write(
        temp.path().join("timesheet.csv"),
        "employee,client,project_code,project_name,date,minutes,memo\n\
         Tanaka,Acme,P01,Portal,2025-01-10,ninety,review\n",
    )
    .expect("write csv");

    let output = run_satchel(temp.path(), &["hours", "--input", "timesheet.csv"]);
    assert!(!output.status.success());
    let err = stderr(&output);
    assert!(err.contains("line=2"), "stderr was: {}", err);
}

// =============================================================================
// Launch Tests
// =============================================================================

fn write_launch_file(dir: &Path) {
    fs::write(
        dir.join("launch.json"),
        r#"{
            "settings": { "title": "Desk" },
            "pages": {
                "dev": [
                    { "name": "docs", "action": "open_url", "url": "https://example.com/docs" }
                ]
            }
        }"#,
    )
    .expect("write launch.json");
}

#[test]
fn test_launch_list_shows_entries() {
    let temp = TempDir::new().expect("temp dir");
    write_launch_file(temp.path());

    let output = run_satchel(temp.path(), &["launch", "--list"]);
    assert!(output.status.success(), "list failed: {}", stderr(&output));
    let out = stdout(&output);
    assert!(out.contains("dev"));
    assert!(out.contains("docs"));
    assert!(out.contains("https://example.com/docs"));
}

#[test]
fn test_launch_dry_run_prints_target() {
    let temp = TempDir::new().expect("temp dir");
    write_launch_file(temp.path());

    let output = run_satchel(temp.path(), &["launch", "docs", "--dry-run"]);
    assert!(output.status.success(), "launch failed: {}", stderr(&output));
    let out = stdout(&output);
    assert!(out.contains("[dry-run]"));
    assert!(out.contains("https://example.com/docs"));
}

#[test]
fn test_launch_rejects_unknown_entry_fields() {
    let temp = TempDir::new().expect("temp dir");
    fs::write(
        temp.path().join("launch.json"),
        r#"{ "pages": { "dev": [ { "name": "a", "action": "open_url", "url": "https://x", "icon": "a.png" } ] } }"#,
    )
    .expect("write launch.json");

    let output = run_satchel(temp.path(), &["launch", "--list"]);
    assert!(!output.status.success());
    assert!(stderr(&output).contains("pages.dev[0]"));
}

// =============================================================================
// Config Tests
// =============================================================================

#[test]
fn test_config_groups_override_tidy_routing() {
    let temp = TempDir::new().expect("temp dir");
    fs::write(
        temp.path().join("satchel.toml"),
        "[tidy.groups]\npaperwork = [\"pdf\"]\n",
    )
    .expect("write config");
    fs::write(temp.path().join("report.pdf"), "x").expect("write");

    let output = run_satchel(temp.path(), &["tidy", "--target", "."]);
    assert!(output.status.success(), "tidy failed: {}", stderr(&output));
    assert!(temp.path().join("paperwork/report.pdf").is_file());
}

#[test]
fn test_invalid_config_is_fatal() {
    let temp = TempDir::new().expect("temp dir");
    fs::write(temp.path().join("satchel.toml"), "portal = 3\n").expect("write config");

    let output = run_satchel(temp.path(), &["tidy", "--target", "."]);
    assert!(!output.status.success());
    assert!(stderr(&output).contains("Error"));
}
