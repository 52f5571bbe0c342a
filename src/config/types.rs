//! Configuration types for the payroll engine.
//!
//! This module contains the strongly-typed configuration structures that
//! are deserialized from YAML configuration files.

use serde::{Deserialize, Serialize};

use crate::calculation::{TaxBracket, TaxTable, DEFAULT_AMOUNT_SCALE};
use crate::error::EngineResult;
use crate::import::ColumnHeaders;

/// What to do when a salary's taxable income comes out negative.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NegativeIncomePolicy {
    /// Fail the computation with an invalid-input error.
    #[default]
    Reject,
    /// Compute the tax on zero and keep the negative taxable income.
    FloorAtZero,
}

/// Engine-wide settings from `engine.yaml`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineSettings {
    /// Decimal places every amount is rounded to.
    #[serde(default = "default_amount_scale")]
    pub amount_scale: u32,
    /// Handling of negative taxable income.
    #[serde(default)]
    pub negative_taxable_income: NegativeIncomePolicy,
    /// Worker threads used by a payroll run; 1 computes sequentially.
    #[serde(default = "default_payroll_workers")]
    pub payroll_workers: usize,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            amount_scale: default_amount_scale(),
            negative_taxable_income: NegativeIncomePolicy::default(),
            payroll_workers: default_payroll_workers(),
        }
    }
}

fn default_amount_scale() -> u32 {
    DEFAULT_AMOUNT_SCALE
}

fn default_payroll_workers() -> usize {
    1
}

/// Structure of `tax_brackets.yaml`.
#[derive(Debug, Clone, Deserialize)]
pub struct TaxBracketsFile {
    /// Brackets in ascending order; the last has no upper bound.
    pub brackets: Vec<TaxBracket>,
}

impl TaxBracketsFile {
    /// Validates the brackets into a [`TaxTable`].
    pub fn into_table(self) -> EngineResult<TaxTable> {
        TaxTable::new(self.brackets)
    }
}

/// Structure of `imports.yaml`.
#[derive(Debug, Clone, Deserialize)]
pub struct ImportsFile {
    /// Column headers per import kind.
    pub headers: ColumnHeaders,
}

/// The complete payroll configuration loaded from YAML files.
#[derive(Debug, Clone)]
pub struct PayrollConfig {
    settings: EngineSettings,
    tax_table: TaxTable,
    headers: ColumnHeaders,
}

impl PayrollConfig {
    /// Creates a new PayrollConfig from its component parts.
    pub fn new(settings: EngineSettings, tax_table: TaxTable, headers: ColumnHeaders) -> Self {
        Self {
            settings,
            tax_table,
            headers,
        }
    }

    /// Returns the engine settings.
    pub fn settings(&self) -> &EngineSettings {
        &self.settings
    }

    /// Returns the validated tax table.
    pub fn tax_table(&self) -> &TaxTable {
        &self.tax_table
    }

    /// Returns the import column headers.
    pub fn headers(&self) -> &ColumnHeaders {
        &self.headers
    }
}

impl Default for PayrollConfig {
    fn default() -> Self {
        Self::new(
            EngineSettings::default(),
            TaxTable::default(),
            ColumnHeaders::default(),
        )
    }
}
