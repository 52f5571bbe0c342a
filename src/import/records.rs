//! Conversion of a cleaned batch into typed period records.
//!
//! Past this boundary nothing inspects raw rows.

use std::collections::BTreeSet;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::ValidationError;
use crate::models::{
    AttendanceRecord, ImportKind, PerformanceRecord, Period, RewardKind, RewardPunishmentRecord,
};

use super::batch::{Row, TabularBatch};
use super::schema::{ColumnHeaders, ImportField};

/// The typed records of one import batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImportedRecords {
    /// Attendance records.
    Attendance(Vec<AttendanceRecord>),
    /// Performance records.
    Performance(Vec<PerformanceRecord>),
    /// Reward/punishment records.
    RewardPunishment(Vec<RewardPunishmentRecord>),
}

/// An uploaded employee id with the name it was uploaded under, if any.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadedIdentity {
    /// Employee id.
    pub emp_id: String,
    /// Uploaded name; `None` when the batch carries no name.
    pub name: Option<String>,
}

struct RowReader<'a> {
    headers: &'a ColumnHeaders,
    kind: ImportKind,
    index: usize,
    row: &'a Row,
}

impl RowReader<'_> {
    fn column(&self, field: ImportField) -> &str {
        self.headers.header(self.kind, field)
    }

    fn invalid(&self, field: ImportField, value: String) -> ValidationError {
        ValidationError::InvalidValue {
            row: self.index,
            column: self.column(field).to_string(),
            value,
        }
    }

    fn text(&self, field: ImportField) -> Result<String, ValidationError> {
        TabularBatch::cell(self.row, self.column(field))
            .as_text()
            .ok_or_else(|| self.invalid(field, String::new()))
    }

    fn optional_text(&self, field: ImportField) -> Option<String> {
        TabularBatch::cell(self.row, self.column(field)).as_text()
    }

    fn decimal(&self, field: ImportField) -> Result<Decimal, ValidationError> {
        let cell = TabularBatch::cell(self.row, self.column(field));
        cell.as_decimal()
            .ok_or_else(|| self.invalid(field, cell.as_text().unwrap_or_default()))
    }

    fn optional_decimal(&self, field: ImportField) -> Result<Decimal, ValidationError> {
        let cell = TabularBatch::cell(self.row, self.column(field));
        if cell.is_blank() {
            Ok(Decimal::ZERO)
        } else {
            self.decimal(field)
        }
    }
}

fn readers<'a>(
    batch: &'a TabularBatch,
    headers: &'a ColumnHeaders,
) -> impl Iterator<Item = RowReader<'a>> {
    batch
        .rows
        .iter()
        .enumerate()
        .map(move |(index, row)| RowReader {
            headers,
            kind: batch.kind,
            index,
            row,
        })
}

impl ImportedRecords {
    /// Converts a cleaned batch into records for `period`.
    ///
    /// # Errors
    ///
    /// - [`ValidationError::EmptyBatch`] if the batch has no rows.
    /// - [`ValidationError::InvalidValue`] for a cell that does not fit its
    ///   column, such as a reward type other than reward or punishment.
    /// - [`ValidationError::DuplicateEmployee`] if an attendance or
    ///   performance batch names the same employee twice.
    pub fn from_batch(
        batch: &TabularBatch,
        headers: &ColumnHeaders,
        period: Period,
    ) -> Result<Self, ValidationError> {
        if batch.is_empty() {
            return Err(ValidationError::EmptyBatch { kind: batch.kind });
        }

        let records = match batch.kind {
            ImportKind::Attendance => ImportedRecords::Attendance(
                readers(batch, headers)
                    .map(|reader| {
                        Ok(AttendanceRecord {
                            emp_id: reader.text(ImportField::EmployeeId)?,
                            period,
                            attendance_days: reader.decimal(ImportField::AttendanceDays)?,
                            overtime_hours: reader.optional_decimal(ImportField::OvertimeHours)?,
                        })
                    })
                    .collect::<Result<_, ValidationError>>()?,
            ),
            ImportKind::Performance => ImportedRecords::Performance(
                readers(batch, headers)
                    .map(|reader| {
                        Ok(PerformanceRecord {
                            emp_id: reader.text(ImportField::EmployeeId)?,
                            period,
                            score: reader.decimal(ImportField::PerformanceScore)?,
                        })
                    })
                    .collect::<Result<_, ValidationError>>()?,
            ),
            ImportKind::RewardPunishment => ImportedRecords::RewardPunishment(
                readers(batch, headers)
                    .map(|reader| {
                        let kind = reader
                            .text(ImportField::RewardType)?
                            .parse::<RewardKind>()
                            .map_err(|value| reader.invalid(ImportField::RewardType, value))?;
                        Ok(RewardPunishmentRecord {
                            emp_id: reader.text(ImportField::EmployeeId)?,
                            name: reader.text(ImportField::Name)?,
                            period,
                            kind,
                            amount: reader.decimal(ImportField::Amount)?,
                            reason: reader.optional_text(ImportField::Reason).unwrap_or_default(),
                        })
                    })
                    .collect::<Result<_, ValidationError>>()?,
            ),
        };

        if batch.kind.is_unique_per_period() {
            let mut seen = BTreeSet::new();
            for emp_id in records.emp_id_list() {
                if !seen.insert(emp_id) {
                    return Err(ValidationError::DuplicateEmployee {
                        kind: batch.kind,
                        emp_id: emp_id.to_string(),
                    });
                }
            }
        }

        Ok(records)
    }

    /// The import kind of these records.
    pub fn kind(&self) -> ImportKind {
        match self {
            ImportedRecords::Attendance(_) => ImportKind::Attendance,
            ImportedRecords::Performance(_) => ImportKind::Performance,
            ImportedRecords::RewardPunishment(_) => ImportKind::RewardPunishment,
        }
    }

    /// Number of records.
    pub fn len(&self) -> usize {
        match self {
            ImportedRecords::Attendance(rows) => rows.len(),
            ImportedRecords::Performance(rows) => rows.len(),
            ImportedRecords::RewardPunishment(rows) => rows.len(),
        }
    }

    /// Returns true if there are no records.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn emp_id_list(&self) -> Vec<&str> {
        match self {
            ImportedRecords::Attendance(rows) => rows.iter().map(|r| r.emp_id.as_str()).collect(),
            ImportedRecords::Performance(rows) => rows.iter().map(|r| r.emp_id.as_str()).collect(),
            ImportedRecords::RewardPunishment(rows) => {
                rows.iter().map(|r| r.emp_id.as_str()).collect()
            }
        }
    }

    /// The distinct employee ids in these records.
    pub fn emp_ids(&self) -> BTreeSet<String> {
        self.emp_id_list().into_iter().map(str::to_string).collect()
    }
}

/// Collects each row's employee id and uploaded name from a cleaned batch.
///
/// The name is `None` when the batch has no name column or the cell is blank.
pub fn uploaded_identities(batch: &TabularBatch, headers: &ColumnHeaders) -> Vec<UploadedIdentity> {
    readers(batch, headers)
        .filter_map(|reader| {
            let emp_id = reader.optional_text(ImportField::EmployeeId)?;
            Some(UploadedIdentity {
                emp_id,
                name: reader.optional_text(ImportField::Name),
            })
        })
        .collect()
}
