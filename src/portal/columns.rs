//! Column planning for the portal table
//!
//! Fixed columns stick to the left edge, so each needs a cumulative pixel
//! offset. Attribute columns are discovered from the rows themselves and
//! grouped by table, tables in first-seen order.

use super::loader::RawRow;

const WIDTH_CASE_ID: u32 = 110;
const WIDTH_TABLE: u32 = 140;
const WIDTH_OPERATION: u32 = 110;
const WIDTH_TRIGGER: u32 = 150;
const WIDTH_DEFAULT: u32 = 140;

#[derive(Debug, Clone)]
pub struct FixedColumn {
    pub name: String,
    pub width: u32,
    /// Sticky offset, sum of the widths to the left
    pub left: u32,
}

#[derive(Debug, Clone)]
pub struct AttrColumn {
    /// "table::attr" key, matching event change keys
    pub key: String,
    pub table: String,
    pub attr: String,
    pub width: u32,
}

#[derive(Debug, Clone)]
pub struct ColumnPlan {
    pub fixed: Vec<FixedColumn>,
    pub attrs: Vec<AttrColumn>,
}

fn fixed_width(name: &str) -> u32 {
    match name {
        "case_id" => WIDTH_CASE_ID,
        "table" => WIDTH_TABLE,
        "operation" => WIDTH_OPERATION,
        "trigger" => WIDTH_TRIGGER,
        _ => WIDTH_DEFAULT,
    }
}

impl ColumnPlan {
    /// Contiguous (table, column count) runs for the group header row
    pub fn table_groups(&self) -> Vec<(String, usize)> {
        let mut groups: Vec<(String, usize)> = Vec::new();
        for col in &self.attrs {
            match groups.last_mut() {
                Some((table, span)) if *table == col.table => *span += 1,
                _ => groups.push((col.table.clone(), 1)),
            }
        }
        groups
    }
}

struct AttrStats {
    name: String,
    count: usize,
    first_seen: usize,
}

/// Walk the rows and lay out the table.
///
/// Attribute columns of one table stay contiguous even when its rows are
/// interleaved with other tables. Within a group, `priority_columns` come
/// first (matched on the bare attr name, in the order given), then the rest
/// by descending row count, ties by first appearance.
pub fn plan_columns(
    rows: &[RawRow],
    fixed_columns: &[String],
    priority_columns: &[String],
) -> ColumnPlan {
    let mut fixed = Vec::new();
    let mut left = 0;
    for name in fixed_columns {
        let width = fixed_width(name);
        fixed.push(FixedColumn {
            name: name.clone(),
            width,
            left,
        });
        left += width;
    }

    let mut tables: Vec<String> = Vec::new();
    let mut attrs_by_table: Vec<Vec<AttrStats>> = Vec::new();
    for (seen, row) in rows.iter().enumerate() {
        let table = row.get("table").unwrap_or("").to_string();
        let attr = row.get("attr_type").unwrap_or("").to_string();
        let idx = match tables.iter().position(|t| *t == table) {
            Some(i) => i,
            None => {
                tables.push(table);
                attrs_by_table.push(Vec::new());
                tables.len() - 1
            }
        };
        match attrs_by_table[idx].iter_mut().find(|a| a.name == attr) {
            Some(stats) => stats.count += 1,
            None => attrs_by_table[idx].push(AttrStats {
                name: attr,
                count: 1,
                first_seen: seen,
            }),
        }
    }

    let priority_rank = |name: &str| priority_columns.iter().position(|p| p == name);
    let mut attrs = Vec::new();
    for (table, table_attrs) in tables.iter().zip(&mut attrs_by_table) {
        table_attrs.sort_by(|a, b| match (priority_rank(&a.name), priority_rank(&b.name)) {
            (Some(x), Some(y)) => x.cmp(&y),
            (Some(_), None) => std::cmp::Ordering::Less,
            (None, Some(_)) => std::cmp::Ordering::Greater,
            (None, None) => b.count.cmp(&a.count).then(a.first_seen.cmp(&b.first_seen)),
        });
        for stats in table_attrs.iter() {
            attrs.push(AttrColumn {
                key: super::aggregate::attr_key(table, &stats.name),
                table: table.clone(),
                attr: stats.name.clone(),
                width: WIDTH_DEFAULT,
            });
        }
    }

    ColumnPlan { fixed, attrs }
}
