//! Timesheet aggregation
//!
//! Reads the HR timesheet export, filters by client and employee, and writes
//! a sorted detail CSV, a monthly per-project summary, and optionally a
//! styled HTML recap. Memo splitting and the subtotals are computed here
//! instead of being injected as spreadsheet formulas.

use crate::config::{HoursColumns, HoursConfig};
use crate::errors::{InputError, Result};
use crate::fsutil;
use crate::html;
use chrono::NaiveDate;
use colored::Colorize;
use serde::Serialize;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

/// One timesheet row after mapping, filtering and derivation
#[derive(Debug, Clone)]
pub struct Entry {
    pub employee: String,
    pub client: String,
    /// `{project_code}:{project_name}`
    pub project: String,
    pub date: NaiveDate,
    pub minutes: i64,
    pub memo_kind: String,
    pub memo_detail: String,
}

/// One line of the monthly summary CSV
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct MonthlyRow {
    pub employee: String,
    pub project: String,
    pub hours: f64,
    /// `YYYY-MM`
    pub month: String,
    /// Exact total behind `hours`, kept for downstream subtotals
    #[serde(skip)]
    pub minutes: i64,
}

#[derive(Serialize)]
struct DetailRecord {
    employee: String,
    client: String,
    project: String,
    date: String,
    minutes: i64,
    work_hours: f64,
    memo_kind: String,
    memo_detail: String,
}

pub struct HoursSummary {
    pub rows: usize,
    pub detail: PathBuf,
    pub monthly: PathBuf,
    pub html: Option<PathBuf>,
    pub archived: usize,
}

pub fn round2(x: f64) -> f64 {
    (x * 100.0).round() / 100.0
}

/// Split a memo at the first comma into kind and detail. Without a comma the
/// kind is `-` and the whole memo becomes the detail.
pub fn split_memo(memo: &str) -> (String, String) {
    match memo.split_once(',') {
        Some((kind, detail)) => (kind.to_string(), detail.to_string()),
        None => ("-".to_string(), memo.to_string()),
    }
}

fn parse_date(raw: &str, line: usize) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .or_else(|_| NaiveDate::parse_from_str(raw, "%Y/%m/%d"))
        .map_err(|_| InputError::at_line(format!("unparseable date: {:?}", raw), line).into())
}

struct ColumnIndexes {
    employee: usize,
    client: usize,
    code: usize,
    name: usize,
    date: usize,
    minutes: usize,
    memo: usize,
}

fn resolve_columns(headers: &csv::StringRecord, columns: &HoursColumns) -> Result<ColumnIndexes> {
    let find = |name: &str| headers.iter().position(|h| h.trim() == name);
    let mut missing = Vec::new();
    let mut require = |name: &str| match find(name) {
        Some(i) => i,
        None => {
            missing.push(name.to_string());
            0
        }
    };

    let indexes = ColumnIndexes {
        employee: require(&columns.employee),
        client: require(&columns.client),
        code: require(&columns.project_code),
        name: require(&columns.project_name),
        date: require(&columns.date),
        minutes: require(&columns.minutes),
        memo: require(&columns.memo),
    };
    if missing.is_empty() {
        Ok(indexes)
    } else {
        Err(InputError::new(format!("missing timesheet columns: {}", missing.join(", "))).into())
    }
}

/// Read and filter the timesheet. Filters compare exact trimmed values, and
/// rows outside the filters are never parsed further, so a broken row in
/// another project does not block a filtered run.
pub fn load_entries(
    path: &Path,
    columns: &HoursColumns,
    project: Option<&str>,
    employee: Option<&str>,
) -> Result<Vec<Entry>> {
    if !path.exists() {
        return Err(InputError::new(format!("timesheet not found: {}", path.display())).into());
    }
    let contents = fsutil::read_utf8(path)?;
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .from_reader(contents.as_bytes());
    let headers = reader.headers()?.clone();
    let idx = resolve_columns(&headers, columns)?;

    let mut entries = Vec::new();
    for (i, record) in reader.records().enumerate() {
        let record = record?;
        let line = i + 2;
        let get = |col: usize| record.get(col).unwrap_or("").trim().to_string();

        let client = get(idx.client);
        if let Some(want) = project {
            if client != want {
                continue;
            }
        }
        let who = get(idx.employee);
        if let Some(want) = employee {
            if who != want {
                continue;
            }
        }

        let minutes_raw = get(idx.minutes);
        let minutes: i64 = minutes_raw.parse().map_err(|_| {
            InputError::at_line(format!("minutes is not a number: {:?}", minutes_raw), line)
                .with_context(record.iter().collect::<Vec<_>>().join(","))
        })?;
        let date = parse_date(&get(idx.date), line)?;
        let (memo_kind, memo_detail) = split_memo(&get(idx.memo));

        entries.push(Entry {
            employee: who,
            client,
            project: format!("{}:{}", get(idx.code), get(idx.name)),
            date,
            minutes,
            memo_kind,
            memo_detail,
        });
    }
    Ok(entries)
}

/// Detail ordering: employee, project, memo kind, memo detail, date
pub fn sort_detail(entries: &mut [Entry]) {
    entries.sort_by(|a, b| {
        a.employee
            .cmp(&b.employee)
            .then_with(|| a.project.cmp(&b.project))
            .then_with(|| a.memo_kind.cmp(&b.memo_kind))
            .then_with(|| a.memo_detail.cmp(&b.memo_detail))
            .then_with(|| a.date.cmp(&b.date))
    });
}

/// Group by employee, project and month, summing minutes and converting to
/// hours once per group so repeated rounding cannot drift the totals.
/// Sorted by employee, then hours descending, then project.
pub fn monthly_summary(entries: &[Entry]) -> Vec<MonthlyRow> {
    let mut totals: BTreeMap<(String, String, String), i64> = BTreeMap::new();
    for e in entries {
        let key = (
            e.employee.clone(),
            e.project.clone(),
            e.date.format("%Y-%m").to_string(),
        );
        *totals.entry(key).or_insert(0) += e.minutes;
    }

    let mut rows: Vec<MonthlyRow> = totals
        .into_iter()
        .map(|((employee, project, month), minutes)| MonthlyRow {
            employee,
            project,
            hours: round2(minutes as f64 / 60.0),
            month,
            minutes,
        })
        .collect();
    rows.sort_by(|a, b| {
        a.employee
            .cmp(&b.employee)
            .then_with(|| b.hours.total_cmp(&a.hours))
            .then_with(|| a.project.cmp(&b.project))
    });
    rows
}

/// Output-name label for the active filters, `all` when unfiltered
pub fn filter_label(project: Option<&str>, employee: Option<&str>) -> String {
    let mut parts: Vec<String> = Vec::new();
    if let Some(p) = project {
        parts.push(p.replace(' ', "_"));
    }
    if let Some(e) = employee {
        parts.push(e.replace(' ', "_"));
    }
    if parts.is_empty() {
        "all".to_string()
    } else {
        parts.join("_")
    }
}

const SUMMARY_CSS: &str = r#"
body { font-family: -apple-system, "Segoe UI", "Hiragino Sans", sans-serif; margin: 2rem; color: #24292f; }
h1 { font-size: 1.4rem; }
.meta { color: #57606a; }
table { border-collapse: collapse; min-width: 40rem; }
th, td { border: 1px solid #d0d7de; padding: 0.35rem 0.75rem; text-align: left; }
thead th { background: #f6f8fa; }
th.num, td.num { text-align: right; font-variant-numeric: tabular-nums; }
tr.subtotal td { background: #f6f8fa; font-weight: 600; }
tr.grand td { background: #eef2f6; font-weight: 700; }
"#;

/// Styled recap: month rows grouped into employee and project blocks with a
/// subtotal per block and a grand total, all computed from raw minutes.
pub fn summary_page(monthly: &[MonthlyRow], label: &str) -> String {
    let mut by_employee: BTreeMap<&str, BTreeMap<&str, Vec<&MonthlyRow>>> = BTreeMap::new();
    for row in monthly {
        by_employee
            .entry(&row.employee)
            .or_default()
            .entry(&row.project)
            .or_default()
            .push(row);
    }

    let mut body = String::new();
    body.push_str("<h1>Hours Summary</h1>\n");
    body.push_str(&format!(
        "<p class=\"meta\">filter: {}</p>\n",
        html::escape(label)
    ));
    body.push_str("<table>\n<thead><tr><th>Employee</th><th>Project</th><th>Month</th><th class=\"num\">Hours</th></tr></thead>\n<tbody>\n");

    let mut grand_minutes: i64 = 0;
    for (employee, projects) in by_employee {
        let mut blocks: Vec<(&str, Vec<&MonthlyRow>, i64)> = projects
            .into_iter()
            .map(|(project, mut rows)| {
                rows.sort_by(|a, b| a.month.cmp(&b.month));
                let total: i64 = rows.iter().map(|r| r.minutes).sum();
                (project, rows, total)
            })
            .collect();
        // Busiest project first, mirroring the monthly CSV ordering
        blocks.sort_by(|a, b| b.2.cmp(&a.2).then_with(|| a.0.cmp(b.0)));

        for (project, rows, total) in blocks {
            for row in rows {
                body.push_str(&format!(
                    "<tr><td>{}</td><td>{}</td><td>{}</td><td class=\"num\">{:.2}</td></tr>\n",
                    html::escape(employee),
                    html::escape(project),
                    row.month,
                    row.hours
                ));
            }
            grand_minutes += total;
            body.push_str(&format!(
                "<tr class=\"subtotal\"><td></td><td>{}</td><td>total</td><td class=\"num\">{:.2}</td></tr>\n",
                html::escape(project),
                round2(total as f64 / 60.0)
            ));
        }
    }
    body.push_str(&format!(
        "<tr class=\"grand\"><td colspan=\"3\">grand total</td><td class=\"num\">{:.2}</td></tr>\n",
        round2(grand_minutes as f64 / 60.0)
    ));
    body.push_str("</tbody>\n</table>");

    html::document(
        &format!("Hours Summary ({})", label),
        &format!("<style>{}</style>", SUMMARY_CSS),
        &body,
    )
}

fn write_detail(path: &Path, entries: &[Entry]) -> Result<()> {
    let mut writer = csv::Writer::from_path(path)?;
    for e in entries {
        writer.serialize(DetailRecord {
            employee: e.employee.clone(),
            client: e.client.clone(),
            project: e.project.clone(),
            date: e.date.format("%Y-%m-%d").to_string(),
            minutes: e.minutes,
            work_hours: round2(e.minutes as f64 / 60.0),
            memo_kind: e.memo_kind.clone(),
            memo_detail: e.memo_detail.clone(),
        })?;
    }
    writer.flush()?;
    Ok(())
}

fn write_monthly(path: &Path, rows: &[MonthlyRow]) -> Result<()> {
    let mut writer = csv::Writer::from_path(path)?;
    for row in rows {
        writer.serialize(row)?;
    }
    writer.flush()?;
    Ok(())
}

/// Earlier `hours_*` outputs go to `old/` so the newest run is unambiguous
fn archive_outputs(dir: &Path) -> Result<usize> {
    let old_dir = dir.join("old");
    let mut entries: Vec<PathBuf> = fs::read_dir(dir)?
        .filter_map(|e| e.ok())
        .map(|e| e.path())
        .collect();
    entries.sort();

    let mut moved = 0;
    for path in entries {
        let name = match path.file_name().and_then(|n| n.to_str()) {
            Some(n) => n,
            None => continue,
        };
        if path.is_file() && name.starts_with("hours_") {
            fsutil::move_into(&old_dir, &path)?;
            moved += 1;
        }
    }
    Ok(moved)
}

pub fn run(
    config: &HoursConfig,
    input: &Path,
    project: Option<&str>,
    employee: Option<&str>,
    out_override: Option<&Path>,
    html_page: bool,
) -> Result<HoursSummary> {
    let out_dir = out_override
        .map(Path::to_path_buf)
        .unwrap_or_else(|| config.out_dir.clone());

    println!("   {} {}", "Reading".cyan(), input.display());
    let mut entries = load_entries(input, &config.columns, project, employee)?;
    if entries.is_empty() {
        println!("   {} no rows matched the filters", "Warning:".yellow());
    }
    sort_detail(&mut entries);
    let monthly = monthly_summary(&entries);

    fs::create_dir_all(&out_dir)?;
    let archived = archive_outputs(&out_dir)?;
    if archived > 0 {
        println!(
            "   {} {} earlier output file(s) -> old/",
            "Archiving".yellow(),
            archived
        );
    }

    let label = filter_label(project, employee);
    let stamp = fsutil::run_stamp();
    let detail = out_dir.join(format!("hours_detail_{}_{}.csv", label, stamp));
    write_detail(&detail, &entries)?;
    let monthly_path = out_dir.join(format!("hours_monthly_{}_{}.csv", label, stamp));
    write_monthly(&monthly_path, &monthly)?;

    let html_out = if html_page {
        let path = out_dir.join(format!("hours_summary_{}_{}.html", label, stamp));
        fs::write(&path, summary_page(&monthly, &label))?;
        Some(path)
    } else {
        None
    };

    println!(
        "   {} {} rows -> {} monthly group(s)",
        "Merged".green(),
        entries.len(),
        monthly.len()
    );
    println!("   {} {}", "Writing".green(), detail.display());
    println!("   {} {}", "Writing".green(), monthly_path.display());
    if let Some(ref p) = html_out {
        println!("   {} {}", "Writing".green(), p.display());
    }

    Ok(HoursSummary {
        rows: entries.len(),
        detail,
        monthly: monthly_path,
        html: html_out,
        archived,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const HEADER: &str = "employee,client,project_code,project_name,date,minutes,memo";

    fn write_timesheet(dir: &TempDir, body: &str) -> PathBuf {
        let path = dir.path().join("timesheet.csv");
        fs::write(&path, format!("{}\n{}", HEADER, body)).unwrap();
        path
    }

    fn columns() -> HoursColumns {
        HoursConfig::default().columns
    }

    fn entry(employee: &str, project: &str, date: &str, minutes: i64) -> Entry {
        Entry {
            employee: employee.to_string(),
            client: "Acme".to_string(),
            project: project.to_string(),
            date: NaiveDate::parse_from_str(date, "%Y-%m-%d").unwrap(),
            minutes,
            memo_kind: "-".to_string(),
            memo_detail: String::new(),
        }
    }

    // === Memo splitting Tests ===

    #[test]
    fn test_split_memo_at_first_comma() {
        assert_eq!(
            split_memo("design,review,extra"),
            ("design".to_string(), "review,extra".to_string())
        );
    }

    #[test]
    fn test_split_memo_without_comma() {
        assert_eq!(split_memo("meeting"), ("-".to_string(), "meeting".to_string()));
        assert_eq!(split_memo(""), ("-".to_string(), String::new()));
    }

    // === Loading Tests ===

    #[test]
    fn test_load_maps_and_derives() {
        let dir = TempDir::new().unwrap();
        let path =
            write_timesheet(&dir, "Tanaka,Acme,P01,Portal,2025-01-15,90,\"design,wireframe\"\n");
        let entries = load_entries(&path, &columns(), None, None).unwrap();
        assert_eq!(entries.len(), 1);
        let e = &entries[0];
        assert_eq!(e.project, "P01:Portal");
        assert_eq!(e.minutes, 90);
        assert_eq!(e.memo_kind, "design");
        assert_eq!(e.memo_detail, "wireframe");
        assert_eq!(e.date, NaiveDate::from_ymd_opt(2025, 1, 15).unwrap());
    }

    #[test]
    fn test_load_filters_client_and_employee() {
        let dir = TempDir::new().unwrap();
        let path = write_timesheet(
            &dir,
            "Tanaka,Acme,P01,Portal,2025-01-15,60,x\n\
             Sato,Acme,P01,Portal,2025-01-15,60,x\n\
             Tanaka,Globex,P02,Intranet,2025-01-15,60,x\n",
        );
        let entries = load_entries(&path, &columns(), Some("Acme"), Some("Tanaka")).unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].client, "Acme");
        assert_eq!(entries[0].employee, "Tanaka");
    }

    #[test]
    fn test_filtered_out_rows_are_not_parsed() {
        let dir = TempDir::new().unwrap();
        let path = write_timesheet(
            &dir,
            "Tanaka,Acme,P01,Portal,2025-01-15,60,x\n\
             Sato,Globex,P02,Intranet,not-a-date,oops,x\n",
        );
        assert!(load_entries(&path, &columns(), Some("Acme"), None).is_ok());
    }

    #[test]
    fn test_bad_minutes_errors_with_line() {
        let dir = TempDir::new().unwrap();
        let path = write_timesheet(&dir, "Tanaka,Acme,P01,Portal,2025-01-15,ninety,x\n");
        let err = load_entries(&path, &columns(), None, None).unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("minutes is not a number"));
        assert!(msg.contains("line=2"));
    }

    #[test]
    fn test_dates_accept_both_separators() {
        let dir = TempDir::new().unwrap();
        let path = write_timesheet(
            &dir,
            "Tanaka,Acme,P01,Portal,2025/1/5,60,x\n\
             Tanaka,Acme,P01,Portal,2025-01-06,60,x\n",
        );
        let entries = load_entries(&path, &columns(), None, None).unwrap();
        assert_eq!(entries[0].date, NaiveDate::from_ymd_opt(2025, 1, 5).unwrap());
        assert_eq!(entries[1].date, NaiveDate::from_ymd_opt(2025, 1, 6).unwrap());
    }

    #[test]
    fn test_missing_column_is_named() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("timesheet.csv");
        fs::write(&path, "employee,client,date\n").unwrap();
        let err = load_entries(&path, &columns(), None, None).unwrap_err();
        assert!(err.to_string().contains("project_code"));
    }

    // === Aggregation Tests ===

    #[test]
    fn test_monthly_sums_minutes_before_rounding() {
        let entries = vec![
            entry("A", "P01:Portal", "2025-01-10", 50),
            entry("A", "P01:Portal", "2025-01-20", 25),
            entry("A", "P02:Intranet", "2025-01-05", 120),
        ];
        let rows = monthly_summary(&entries);
        assert_eq!(rows.len(), 2);
        // Busiest project first within the employee
        assert_eq!(rows[0].project, "P02:Intranet");
        assert_eq!(rows[0].hours, 2.0);
        assert_eq!(rows[1].project, "P01:Portal");
        assert_eq!(rows[1].hours, 1.25);
        assert_eq!(rows[1].minutes, 75);
    }

    #[test]
    fn test_monthly_splits_months() {
        let entries = vec![
            entry("A", "P01:Portal", "2025-01-10", 60),
            entry("A", "P01:Portal", "2025-02-10", 60),
        ];
        let rows = monthly_summary(&entries);
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].month, "2025-01");
        assert_eq!(rows[1].month, "2025-02");
    }

    #[test]
    fn test_detail_sort_order() {
        let mut entries = vec![
            entry("B", "P01:Portal", "2025-01-10", 60),
            entry("A", "P02:Intranet", "2025-01-10", 60),
            entry("A", "P01:Portal", "2025-01-20", 60),
            entry("A", "P01:Portal", "2025-01-10", 60),
        ];
        sort_detail(&mut entries);
        assert_eq!(entries[0].employee, "A");
        assert_eq!(entries[0].project, "P01:Portal");
        assert_eq!(entries[0].date, NaiveDate::from_ymd_opt(2025, 1, 10).unwrap());
        assert_eq!(entries[1].date, NaiveDate::from_ymd_opt(2025, 1, 20).unwrap());
        assert_eq!(entries[2].project, "P02:Intranet");
        assert_eq!(entries[3].employee, "B");
    }

    // === Label Tests ===

    #[test]
    fn test_filter_label() {
        assert_eq!(filter_label(None, None), "all");
        assert_eq!(filter_label(Some("Acme Corp"), None), "Acme_Corp");
        assert_eq!(
            filter_label(Some("Acme Corp"), Some("Tanaka")),
            "Acme_Corp_Tanaka"
        );
    }

    // === Summary page Tests ===

    #[test]
    fn test_summary_page_blocks_and_totals() {
        let monthly = monthly_summary(&[
            entry("A", "P01:Portal", "2025-01-10", 60),
            entry("A", "P01:Portal", "2025-02-10", 120),
        ]);
        let page = summary_page(&monthly, "all");
        assert!(page.contains("<tr class=\"subtotal\">"));
        assert!(page.contains("3.00"));
        assert!(page.contains("grand total"));
        assert!(page.contains("2025-01"));
        assert!(page.contains("2025-02"));
    }

    // === Run Tests ===

    #[test]
    fn test_run_writes_outputs_and_archives() {
        let dir = TempDir::new().unwrap();
        let input = write_timesheet(
            &dir,
            "Tanaka,Acme,P01,Portal,2025-01-15,90,\"design,wireframe\"\n\
             Tanaka,Acme,P01,Portal,2025-01-20,30,review\n",
        );
        let out_dir = dir.path().join("out");
        fs::create_dir(&out_dir).unwrap();
        fs::write(out_dir.join("hours_detail_all_stale.csv"), "x").unwrap();

        let config = HoursConfig::default();
        let summary = run(&config, &input, None, None, Some(&out_dir), true).unwrap();
        assert_eq!(summary.rows, 2);
        assert_eq!(summary.archived, 1);
        assert!(out_dir.join("old/hours_detail_all_stale.csv").exists());
        assert!(summary.detail.exists());
        assert!(summary.monthly.exists());
        assert!(summary.html.unwrap().exists());

        let detail = fs::read_to_string(&summary.detail).unwrap();
        assert!(detail.starts_with(
            "employee,client,project,date,minutes,work_hours,memo_kind,memo_detail"
        ));
        let monthly = fs::read_to_string(&summary.monthly).unwrap();
        assert!(monthly.starts_with("employee,project,hours,month"));
        assert!(monthly.contains("Tanaka,P01:Portal,2.0,2025-01"));
    }
}
