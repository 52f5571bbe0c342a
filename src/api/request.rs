//! Request types for the payroll engine API.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::import::{ColumnMapping, ImportRequest, Row, TabularBatch};
use crate::models::{ImportKind, Period};

/// Request body for `POST /imports`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImportBatchRequest {
    /// The declared import kind.
    pub kind: ImportKind,
    /// The period the batch belongs to.
    pub period: Period,
    /// Column headers; derived from the rows when absent.
    #[serde(default)]
    pub columns: Option<Vec<String>>,
    /// The uploaded rows, keyed by header.
    pub rows: Vec<Row>,
    /// Header renames applied before validation.
    #[serde(default)]
    pub mapping: ColumnMapping,
    /// Commit even when reconciliation finds differences.
    #[serde(default)]
    pub confirm: bool,
    /// Accept rows being dropped during cleaning.
    #[serde(default)]
    pub allow_dropped_rows: bool,
}

impl ImportBatchRequest {
    /// Converts the body into an import request.
    pub fn into_request(self) -> ImportRequest {
        let batch = match self.columns {
            Some(columns) => TabularBatch {
                kind: self.kind,
                columns,
                rows: self.rows,
            },
            None => TabularBatch::from_rows(self.kind, self.rows),
        };
        ImportRequest {
            batch,
            period: self.period,
            mapping: self.mapping,
            allow_dropped_rows: self.allow_dropped_rows,
        }
    }
}

/// Request body for `POST /salaries/compute`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComputeSalaryRequest {
    /// Employee id.
    pub emp_id: String,
    /// The period.
    pub period: Period,
}

/// Request body for `POST /payroll/run`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PayrollRunRequest {
    /// The period.
    pub period: Period,
}

/// Request body for `POST /formulas/validate`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FormulaRequest {
    /// The formula text.
    pub formula: String,
}

/// Request body for `POST /tax`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaxRequest {
    /// Monthly taxable income.
    pub taxable_income: Decimal,
}
