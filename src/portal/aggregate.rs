//! Row-to-event aggregation
//!
//! All rows sharing (case_id, table) merge into one event, in first-appearance
//! order. Each event also carries a snapshot of the latest known values of its
//! table so the rendered row shows state, not just deltas.

use super::loader::RawRow;
use std::collections::HashMap;

/// One attribute transition inside an event. `None` means null per the
/// configured null vocabulary.
#[derive(Debug, Clone, PartialEq)]
pub struct Change {
    pub before: Option<String>,
    pub after: Option<String>,
    pub note: String,
}

/// All changes of one (case_id, table) pair
#[derive(Debug, Clone)]
pub struct Event {
    pub case_id: String,
    pub table: String,
    pub operation: String,
    pub trigger: String,
    pub sql: String,
    /// attr_key -> transition, attr_key being "table::attr_type"
    pub changes: HashMap<String, Change>,
    /// attr_key -> latest value after this event
    pub current_values: HashMap<String, Option<String>>,
}

pub fn attr_key(table: &str, attr_type: &str) -> String {
    format!("{}::{}", table, attr_type)
}

fn is_null(value: Option<&str>, null_values: &[String]) -> bool {
    match value {
        None => true,
        Some(v) => {
            let trimmed = v.trim();
            trimmed.is_empty()
                || null_values
                    .iter()
                    .any(|n| n.to_lowercase() == trimmed.to_lowercase())
        }
    }
}

fn normalize(value: Option<&str>, null_values: &[String]) -> Option<String> {
    if is_null(value, null_values) {
        None
    } else {
        value.map(|v| v.to_string())
    }
}

/// Merge filled rows into events keyed by (case_id, table).
///
/// The first row of a group seeds operation/trigger/sql and inherits the
/// latest snapshot of its table; a group revisited later in the file (after
/// other cases) still merges into its first occurrence.
pub fn aggregate(rows: &[RawRow], null_values: &[String]) -> Vec<Event> {
    let mut events: Vec<Event> = Vec::new();
    let mut index: HashMap<(String, String), usize> = HashMap::new();
    let mut latest_by_table: HashMap<String, HashMap<String, Option<String>>> = HashMap::new();

    for row in rows {
        let case_id = row.get("case_id").unwrap_or("").to_string();
        let table = row.get("table").unwrap_or("").to_string();
        let attr_type = row.get("attr_type").unwrap_or("");
        let key = attr_key(&table, attr_type);

        let group = (case_id.clone(), table.clone());
        let idx = match index.get(&group) {
            Some(&i) => i,
            None => {
                let event = Event {
                    case_id,
                    table: table.clone(),
                    operation: row.get("operation").unwrap_or("").to_string(),
                    trigger: row.get("trigger").unwrap_or("").to_string(),
                    sql: row.get("sql").unwrap_or("").to_string(),
                    changes: HashMap::new(),
                    current_values: latest_by_table.get(&table).cloned().unwrap_or_default(),
                };
                events.push(event);
                let i = events.len() - 1;
                index.insert(group, i);
                i
            }
        };

        let after = normalize(row.get("after"), null_values);
        let event = &mut events[idx];
        event.changes.insert(
            key.clone(),
            Change {
                before: normalize(row.get("before"), null_values),
                after: after.clone(),
                note: row.get("note").unwrap_or("").to_string(),
            },
        );
        event.current_values.insert(key, after);

        // Later events on the same table start from this state
        latest_by_table.insert(table, event.current_values.clone());
    }

    events
}
