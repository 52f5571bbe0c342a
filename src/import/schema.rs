//! Semantic import fields and their configured column headers.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::models::ImportKind;

/// A semantic column of an uploaded batch, independent of its header text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ImportField {
    /// Employee number.
    EmployeeId,
    /// Employee name as uploaded.
    Name,
    /// Days attended.
    AttendanceDays,
    /// Overtime hours.
    OvertimeHours,
    /// Performance score.
    PerformanceScore,
    /// Reward or punishment.
    RewardType,
    /// Reward or punishment amount.
    Amount,
    /// Free-text reason.
    Reason,
}

impl ImportField {
    /// The snake_case name, used as the header when none is configured.
    pub fn as_str(&self) -> &'static str {
        match self {
            ImportField::EmployeeId => "employee_id",
            ImportField::Name => "name",
            ImportField::AttendanceDays => "attendance_days",
            ImportField::OvertimeHours => "overtime_hours",
            ImportField::PerformanceScore => "performance_score",
            ImportField::RewardType => "reward_type",
            ImportField::Amount => "amount",
            ImportField::Reason => "reason",
        }
    }
}

/// Which fields an import kind requires and how each is cleaned.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportSchema {
    /// The import kind.
    pub kind: ImportKind,
    /// Columns that must be present for the batch to be accepted.
    pub required: Vec<ImportField>,
    /// Columns whose blank cells drop the row.
    pub identity: Vec<ImportField>,
    /// Columns coerced to decimals; rows that fail coercion are dropped.
    pub numeric: Vec<ImportField>,
    /// Numeric columns that may be absent; blank cells become zero.
    pub optional_numeric: Vec<ImportField>,
}

impl ImportSchema {
    /// Returns the schema of an import kind.
    pub fn for_kind(kind: ImportKind) -> Self {
        use ImportField::*;
        match kind {
            ImportKind::Attendance => Self {
                kind,
                required: vec![EmployeeId, Name, AttendanceDays],
                identity: vec![EmployeeId, Name],
                numeric: vec![AttendanceDays],
                optional_numeric: vec![OvertimeHours],
            },
            ImportKind::Performance => Self {
                kind,
                required: vec![EmployeeId, PerformanceScore],
                identity: vec![EmployeeId],
                numeric: vec![PerformanceScore],
                optional_numeric: vec![],
            },
            ImportKind::RewardPunishment => Self {
                kind,
                required: vec![EmployeeId, Name, RewardType, Amount, Reason],
                identity: vec![EmployeeId, Name],
                numeric: vec![Amount],
                optional_numeric: vec![],
            },
        }
    }
}

/// Column headers per import kind, keyed by semantic field.
///
/// # Example
///
/// ```
/// use payroll_engine::import::{ColumnHeaders, ImportField};
/// use payroll_engine::models::ImportKind;
///
/// let headers = ColumnHeaders::default();
/// assert_eq!(headers.header(ImportKind::Attendance, ImportField::EmployeeId), "员工编号");
/// assert_eq!(headers.header(ImportKind::RewardPunishment, ImportField::EmployeeId), "工号");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnHeaders {
    /// Attendance headers.
    #[serde(default)]
    pub attendance: BTreeMap<ImportField, String>,
    /// Performance headers.
    #[serde(default)]
    pub performance: BTreeMap<ImportField, String>,
    /// Reward/punishment headers.
    #[serde(default)]
    pub reward_punishment: BTreeMap<ImportField, String>,
}

impl ColumnHeaders {
    fn for_kind(&self, kind: ImportKind) -> &BTreeMap<ImportField, String> {
        match kind {
            ImportKind::Attendance => &self.attendance,
            ImportKind::Performance => &self.performance,
            ImportKind::RewardPunishment => &self.reward_punishment,
        }
    }

    /// Returns the header of `field` for `kind`, falling back to the field name.
    pub fn header(&self, kind: ImportKind, field: ImportField) -> &str {
        self.for_kind(kind)
            .get(&field)
            .map(String::as_str)
            .unwrap_or(field.as_str())
    }

    /// Returns the headers of several fields, in order.
    pub fn headers(&self, kind: ImportKind, fields: &[ImportField]) -> Vec<String> {
        fields
            .iter()
            .map(|field| self.header(kind, *field).to_string())
            .collect()
    }
}

impl Default for ColumnHeaders {
    fn default() -> Self {
        use ImportField::*;
        let table = |pairs: &[(ImportField, &str)]| -> BTreeMap<ImportField, String> {
            pairs
                .iter()
                .map(|(field, header)| (*field, header.to_string()))
                .collect()
        };
        Self {
            attendance: table(&[
                (EmployeeId, "员工编号"),
                (Name, "姓名"),
                (AttendanceDays, "出勤天数"),
                (OvertimeHours, "加班时长"),
            ]),
            performance: table(&[
                (EmployeeId, "员工编号"),
                (Name, "姓名"),
                (PerformanceScore, "绩效得分"),
            ]),
            reward_punishment: table(&[
                (EmployeeId, "工号"),
                (Name, "姓名"),
                (RewardType, "类型"),
                (Amount, "金额"),
                (Reason, "原因"),
            ]),
        }
    }
}
