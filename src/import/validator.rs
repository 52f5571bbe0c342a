//! Structural validation and row cleaning of uploaded batches.
//!
//! Both steps are pure. Validation fails closed on the column set before any
//! row is looked at; cleaning drops rows it cannot use and counts them.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::batch::{Cell, ColumnMapping, TabularBatch};

/// The outcome of checking a batch's columns.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationResult {
    /// True when every required column is present.
    pub ok: bool,
    /// Required columns absent from the batch, in required order.
    pub missing_fields: Vec<String>,
}

/// Checks that the batch declares every required column.
///
/// # Example
///
/// ```
/// use payroll_engine::import::{validate, TabularBatch};
/// use payroll_engine::models::ImportKind;
///
/// let batch = TabularBatch {
///     kind: ImportKind::Attendance,
///     columns: vec!["员工编号".to_string(), "出勤天数".to_string()],
///     rows: vec![],
/// };
/// let required = vec!["员工编号".to_string(), "姓名".to_string(), "出勤天数".to_string()];
///
/// let result = validate(&batch, &required);
/// assert!(!result.ok);
/// assert_eq!(result.missing_fields, vec!["姓名".to_string()]);
/// ```
pub fn validate(batch: &TabularBatch, required_fields: &[String]) -> ValidationResult {
    let missing_fields: Vec<String> = required_fields
        .iter()
        .filter(|field| !batch.has_column(field))
        .cloned()
        .collect();
    ValidationResult {
        ok: missing_fields.is_empty(),
        missing_fields,
    }
}

/// A cleaned batch and the number of rows removed from it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CleanOutcome {
    /// The rows that survived cleaning, numeric cells coerced.
    pub batch: TabularBatch,
    /// Number of rows removed.
    pub dropped: usize,
}

/// Drops rows with a blank identity cell or a numeric cell that does not
/// parse, and coerces the numeric cells of the remaining rows.
///
/// `outcome.batch.len() + outcome.dropped == batch.len()` always holds.
pub fn clean(
    batch: &TabularBatch,
    identity_fields: &[String],
    numeric_fields: &[String],
) -> CleanOutcome {
    let mut rows = Vec::with_capacity(batch.rows.len());
    let mut dropped = 0;

    'rows: for row in &batch.rows {
        if identity_fields
            .iter()
            .any(|field| TabularBatch::cell(row, field).is_blank())
        {
            dropped += 1;
            continue;
        }

        let mut cleaned = row.clone();
        for field in numeric_fields {
            match TabularBatch::cell(row, field).as_decimal() {
                Some(value) => {
                    cleaned.insert(field.clone(), Cell::Number(value));
                }
                None => {
                    dropped += 1;
                    continue 'rows;
                }
            }
        }
        rows.push(cleaned);
    }

    if dropped > 0 {
        debug!(
            kind = %batch.kind,
            dropped = dropped,
            total = batch.rows.len(),
            "Dropped unusable rows while cleaning batch"
        );
    }

    CleanOutcome {
        batch: TabularBatch {
            kind: batch.kind,
            columns: batch.columns.clone(),
            rows,
        },
        dropped,
    }
}

/// Replaces blank cells of the given columns with zero.
///
/// Columns the batch does not declare are left alone.
pub fn fill_blank(batch: &TabularBatch, fields: &[String]) -> TabularBatch {
    let present: Vec<&String> = fields.iter().filter(|f| batch.has_column(f)).collect();
    let rows = batch
        .rows
        .iter()
        .map(|row| {
            let mut row = row.clone();
            for field in &present {
                if TabularBatch::cell(&row, field).is_blank() {
                    row.insert((*field).clone(), Cell::Number(Decimal::ZERO));
                }
            }
            row
        })
        .collect();
    TabularBatch {
        kind: batch.kind,
        columns: batch.columns.clone(),
        rows,
    }
}

/// Renames uploaded headers according to `mapping`.
///
/// Headers absent from the mapping are kept.
pub fn apply_mapping(batch: &TabularBatch, mapping: &ColumnMapping) -> TabularBatch {
    if mapping.is_empty() {
        return batch.clone();
    }
    let rename = |header: &String| mapping.get(header).cloned().unwrap_or_else(|| header.clone());
    TabularBatch {
        kind: batch.kind,
        columns: batch.columns.iter().map(rename).collect(),
        rows: batch
            .rows
            .iter()
            .map(|row| {
                row.iter()
                    .map(|(header, cell)| (rename(header), cell.clone()))
                    .collect()
            })
            .collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::import::batch::Row;
    use crate::models::ImportKind;

    fn strings(values: &[&str]) -> Vec<String> {
        values.iter().map(|v| v.to_string()).collect()
    }

    fn row(cells: &[(&str, Cell)]) -> Row {
        cells
            .iter()
            .map(|(header, cell)| (header.to_string(), cell.clone()))
            .collect()
    }

    fn attendance_batch(rows: Vec<Row>) -> TabularBatch {
        TabularBatch {
            kind: ImportKind::Attendance,
            columns: strings(&["员工编号", "姓名", "出勤天数", "加班时长"]),
            rows,
        }
    }

    #[test]
    fn test_validate_accepts_superset_of_required() {
        let batch = attendance_batch(vec![]);
        let result = validate(&batch, &strings(&["员工编号", "姓名", "出勤天数"]));
        assert!(result.ok);
        assert!(result.missing_fields.is_empty());
    }

    #[test]
    fn test_validate_lists_every_missing_field() {
        let batch = TabularBatch {
            kind: ImportKind::RewardPunishment,
            columns: strings(&["工号"]),
            rows: vec![],
        };
        let result = validate(&batch, &strings(&["工号", "姓名", "类型", "金额", "原因"]));
        assert!(!result.ok);
        assert_eq!(result.missing_fields, strings(&["姓名", "类型", "金额", "原因"]));
    }

    #[test]
    fn test_clean_drops_blank_identity_and_bad_numbers() {
        let batch = attendance_batch(vec![
            row(&[
                ("员工编号", Cell::from("001")),
                ("姓名", Cell::from("张三")),
                ("出勤天数", Cell::from("21")),
            ]),
            row(&[
                ("员工编号", Cell::Empty),
                ("姓名", Cell::from("李四")),
                ("出勤天数", Cell::from("20")),
            ]),
            row(&[
                ("员工编号", Cell::from("003")),
                ("姓名", Cell::from("王五")),
                ("出勤天数", Cell::from("abc")),
            ]),
            row(&[
                ("员工编号", Cell::from("004")),
                ("姓名", Cell::from("  ")),
                ("出勤天数", Cell::from("18")),
            ]),
        ]);

        let outcome = clean(&batch, &strings(&["员工编号", "姓名"]), &strings(&["出勤天数"]));
        assert_eq!(outcome.batch.len(), 1);
        assert_eq!(outcome.dropped, 3);
        assert_eq!(
            outcome.batch.rows[0]["出勤天数"],
            Cell::Number(Decimal::from(21))
        );
    }

    #[test]
    fn test_clean_of_clean_batch_drops_nothing() {
        let batch = attendance_batch(vec![row(&[
            ("员工编号", Cell::from("001")),
            ("姓名", Cell::from("张三")),
            ("出勤天数", Cell::Number(Decimal::from(22))),
        ])]);
        let outcome = clean(&batch, &strings(&["员工编号"]), &strings(&["出勤天数"]));
        assert_eq!(outcome.dropped, 0);
        assert_eq!(outcome.batch, batch);
    }

    #[test]
    fn test_fill_blank_zeroes_optional_column() {
        let batch = attendance_batch(vec![
            row(&[("员工编号", Cell::from("001")), ("加班时长", Cell::Empty)]),
            row(&[("员工编号", Cell::from("002"))]),
            row(&[("员工编号", Cell::from("003")), ("加班时长", Cell::from("4"))]),
        ]);
        let filled = fill_blank(&batch, &strings(&["加班时长", "不存在"]));
        assert_eq!(filled.rows[0]["加班时长"], Cell::Number(Decimal::ZERO));
        assert_eq!(filled.rows[1]["加班时长"], Cell::Number(Decimal::ZERO));
        assert_eq!(filled.rows[2]["加班时长"], Cell::from("4"));
        assert!(!filled.rows[0].contains_key("不存在"));
    }

    #[test]
    fn test_apply_mapping_renames_columns_and_cells() {
        let batch = TabularBatch {
            kind: ImportKind::Performance,
            columns: strings(&["Emp No", "Score"]),
            rows: vec![row(&[
                ("Emp No", Cell::from("001")),
                ("Score", Cell::from("90")),
            ])],
        };
        let mapping: ColumnMapping = [
            ("Emp No".to_string(), "员工编号".to_string()),
            ("Score".to_string(), "绩效得分".to_string()),
        ]
        .into_iter()
        .collect();

        let mapped = apply_mapping(&batch, &mapping);
        assert_eq!(mapped.columns, strings(&["员工编号", "绩效得分"]));
        assert_eq!(mapped.rows[0]["绩效得分"], Cell::from("90"));
        assert!(validate(&mapped, &strings(&["员工编号", "绩效得分"])).ok);
    }
}
