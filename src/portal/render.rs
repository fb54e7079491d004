//! Static HTML rendering of the portal table

use super::aggregate::{Change, Event};
use super::columns::ColumnPlan;
use crate::html;
use std::fmt::Write as _;

/// Stylesheet written next to the page, linked as assets/style.css
pub const STYLE_CSS: &str = r#":root {
    --bg: #f5f5f7;
    --card: #ffffff;
    --border: #d2d2d7;
    --text: #1d1d1f;
    --dim: #86868b;
    --same: #f2f2f4;
    --added: #d7f5dd;
    --removed: #fde2e0;
    --changed: #fff2cc;
    --insert: #eef7ff;
    --update: #fffbe9;
    --delete: #fff0ef;
}
* { box-sizing: border-box; margin: 0; padding: 0; }
body {
    font-family: -apple-system, BlinkMacSystemFont, 'Helvetica Neue', Helvetica, Arial, sans-serif;
    background: var(--bg);
    color: var(--text);
    line-height: 1.4;
    padding: 1.5rem;
}
h1 { font-size: 1.4rem; margin-bottom: 0.25rem; }
.meta { color: var(--dim); font-size: 0.8rem; margin-bottom: 1rem; }
.legend { display: flex; gap: 0.75rem; margin-bottom: 1rem; font-size: 0.75rem; }
.legend span { padding: 0.15rem 0.6rem; border-radius: 4px; border: 1px solid var(--border); }
.legend .added { background: var(--added); }
.legend .removed { background: var(--removed); }
.legend .changed { background: var(--changed); }
.legend .same { background: var(--same); }
.table-wrap { overflow: auto; max-height: calc(100vh - 10rem); background: var(--card); border: 1px solid var(--border); border-radius: 8px; }
table { border-collapse: separate; border-spacing: 0; font-size: 0.78rem; }
th, td { border-bottom: 1px solid var(--border); border-right: 1px solid var(--border); padding: 0.35rem 0.5rem; white-space: nowrap; overflow: hidden; text-overflow: ellipsis; }
thead th { position: sticky; top: 0; background: #e9e9ec; z-index: 2; }
thead tr:nth-child(2) th { top: 2.05rem; }
th.fixed, td.fixed { position: sticky; background: var(--card); z-index: 1; }
thead th.fixed { z-index: 3; background: #e9e9ec; }
td.same { background: var(--same); }
td.added { background: var(--added); }
td.removed { background: var(--removed); }
td.changed { background: var(--changed); }
td.carried { color: var(--dim); }
td.empty { background: repeating-linear-gradient(45deg, transparent, transparent 6px, #fafafa 6px, #fafafa 12px); }
tr.op-insert td.fixed { background: var(--insert); }
tr.op-update td.fixed { background: var(--update); }
tr.op-delete td.fixed { background: var(--delete); }
.null { color: var(--dim); font-style: italic; }
"#;

/// Page-level toggles and captions, resolved by the caller
pub struct PageInfo {
    pub input_name: String,
    pub generated_at: String,
    pub show_legend: bool,
    pub show_generated_at: bool,
    pub show_input_name: bool,
}

enum CellKind {
    Same,
    Added,
    Removed,
    Changed,
}

fn classify(change: &Change) -> (CellKind, String) {
    match (&change.before, &change.after) {
        (None, None) => (CellKind::Same, "NULL".to_string()),
        (Some(b), Some(a)) if b == a => (CellKind::Same, html::escape(a)),
        (None, Some(a)) => (CellKind::Added, html::escape(a)),
        (Some(b), None) => (
            CellKind::Removed,
            format!("{} \u{2192} NULL", html::escape(b)),
        ),
        (Some(b), Some(a)) => (
            CellKind::Changed,
            format!("{} \u{2192} {}", html::escape(b), html::escape(a)),
        ),
    }
}

fn cell_class(kind: &CellKind) -> &'static str {
    match kind {
        CellKind::Same => "same",
        CellKind::Added => "added",
        CellKind::Removed => "removed",
        CellKind::Changed => "changed",
    }
}

/// Row class derived from the operation, safe for use in an attribute
fn operation_class(operation: &str) -> String {
    let slug: String = operation
        .trim()
        .to_lowercase()
        .chars()
        .map(|c| if c.is_alphanumeric() || c == '-' || c == '_' { c } else { '-' })
        .collect();
    format!("op-{}", slug)
}

fn sticky_style(left: u32, width: u32) -> String {
    format!(
        "left: {}px; min-width: {}px; max-width: {}px;",
        left, width, width
    )
}

fn fixed_value<'a>(event: &'a Event, name: &str) -> &'a str {
    match name {
        "case_id" => &event.case_id,
        "table" => &event.table,
        "operation" => &event.operation,
        "trigger" => &event.trigger,
        "sql" => &event.sql,
        _ => "",
    }
}

/// Render the full portal page, one row per event
pub fn render_page(events: &[Event], plan: &ColumnPlan, info: &PageInfo) -> String {
    let mut body = String::new();
    body.push_str("<h1>Data Flow Portal</h1>\n");

    let mut meta_parts = Vec::new();
    if info.show_input_name {
        meta_parts.push(format!("source: {}", html::escape(&info.input_name)));
    }
    if info.show_generated_at {
        meta_parts.push(format!("generated: {}", html::escape(&info.generated_at)));
    }
    meta_parts.push(format!("events: {}", events.len()));
    let _ = writeln!(body, "<p class=\"meta\">{}</p>", meta_parts.join(" · "));

    if info.show_legend {
        body.push_str(concat!(
            "<div class=\"legend\">",
            "<span class=\"added\">added</span>",
            "<span class=\"removed\">removed</span>",
            "<span class=\"changed\">changed</span>",
            "<span class=\"same\">unchanged</span>",
            "</div>\n"
        ));
    }

    body.push_str("<div class=\"table-wrap\">\n<table>\n<thead>\n<tr>\n");
    for col in &plan.fixed {
        let _ = writeln!(
            body,
            "<th class=\"fixed\" rowspan=\"2\" style=\"{}\">{}</th>",
            sticky_style(col.left, col.width),
            html::escape(&col.name)
        );
    }
    for (table, span) in plan.table_groups() {
        let _ = writeln!(
            body,
            "<th colspan=\"{}\">{}</th>",
            span,
            html::escape(&table)
        );
    }
    body.push_str("</tr>\n<tr>\n");
    for col in &plan.attrs {
        let _ = writeln!(
            body,
            "<th style=\"min-width: {}px;\">{}</th>",
            col.width,
            html::escape(&col.attr)
        );
    }
    body.push_str("</tr>\n</thead>\n<tbody>\n");

    for event in events {
        let _ = writeln!(body, "<tr class=\"{}\">", operation_class(&event.operation));
        for col in &plan.fixed {
            let _ = writeln!(
                body,
                "<td class=\"fixed\" style=\"{}\">{}</td>",
                sticky_style(col.left, col.width),
                html::escape(fixed_value(event, &col.name))
            );
        }
        for col in &plan.attrs {
            if let Some(change) = event.changes.get(&col.key) {
                let (kind, text) = classify(change);
                let title = if change.note.is_empty() {
                    String::new()
                } else {
                    format!(" title=\"{}\"", html::escape(&change.note))
                };
                let _ = writeln!(
                    body,
                    "<td class=\"{}\"{}>{}</td>",
                    cell_class(&kind),
                    title,
                    text
                );
            } else if col.table == event.table {
                // Value carried from an earlier event on the same table
                match event.current_values.get(&col.key) {
                    Some(Some(v)) => {
                        let _ = writeln!(body, "<td class=\"carried\">{}</td>", html::escape(v));
                    }
                    Some(None) => {
                        body.push_str("<td class=\"carried\"><span class=\"null\">NULL</span></td>\n");
                    }
                    None => body.push_str("<td class=\"empty\"></td>\n"),
                }
            } else {
                body.push_str("<td class=\"empty\"></td>\n");
            }
        }
        body.push_str("</tr>\n");
    }
    body.push_str("</tbody>\n</table>\n</div>\n");

    html::document(
        "Data Flow Portal",
        "<link rel=\"stylesheet\" href=\"assets/style.css\">",
        &body,
    )
}
