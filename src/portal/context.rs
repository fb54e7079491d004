//! Carry-forward of sparse context columns
//!
//! Audit exports only repeat table/operation/trigger on the first row of a
//! burst; later rows of the same case inherit them. Inheritance never crosses
//! a case_id boundary.

use super::loader::RawRow;
use crate::errors::{InputError, Result};
use std::collections::HashMap;

pub fn is_blank(value: Option<&str>) -> bool {
    match value {
        None => true,
        Some(v) => v.trim().is_empty(),
    }
}

/// Fill blank carry-forward columns from the previous rows of the same case,
/// then require every `required_columns` entry to be non-blank.
pub fn fill_context(
    rows: &mut [RawRow],
    headers: &[String],
    carry_columns: &[String],
    required_columns: &[String],
) -> Result<()> {
    let mut context: HashMap<String, String> = HashMap::new();
    let mut current_case: Option<String> = None;

    for row in rows.iter_mut() {
        let case_id = row.get("case_id").map(|s| s.to_string());
        if is_blank(case_id.as_deref()) {
            return Err(InputError::at_line("case_id is blank", row.line)
                .with_context(row.excerpt(headers))
                .into());
        }
        let case_id = case_id.unwrap_or_default();

        if current_case.as_deref() != Some(case_id.as_str()) {
            context.clear();
            current_case = Some(case_id);
        }

        for column in carry_columns {
            if is_blank(row.get(column)) {
                if let Some(value) = context.get(column) {
                    row.fields.insert(column.clone(), value.clone());
                }
            } else if let Some(value) = row.get(column) {
                context.insert(column.clone(), value.to_string());
            }
        }

        for column in required_columns {
            if is_blank(row.get(column)) {
                return Err(InputError::at_line(
                    format!("column \"{}\" is blank after carry-forward", column),
                    row.line,
                )
                .with_context(row.excerpt(headers))
                .into());
            }
        }
    }

    Ok(())
}
