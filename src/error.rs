//! Error types for the payroll engine.
//!
//! This module provides strongly-typed errors using the `thiserror` crate
//! for all error conditions that can occur during imports, reconciliation
//! and salary computation.

use std::fmt;

use thiserror::Error;

use crate::models::{ImportKind, Period};

/// The main error type for the payroll engine.
///
/// All operations in the engine return this error type, making it easy
/// to handle errors consistently throughout the application.
///
/// # Example
///
/// ```
/// use payroll_engine::error::EngineError;
///
/// let error = EngineError::ConfigNotFound {
///     path: "/missing/engine.yaml".to_string(),
/// };
/// assert_eq!(error.to_string(), "Configuration file not found: /missing/engine.yaml");
/// ```
#[derive(Debug, Error)]
pub enum EngineError {
    /// Configuration file was not found at the specified path.
    #[error("Configuration file not found: {path}")]
    ConfigNotFound {
        /// The path that was not found.
        path: String,
    },

    /// Configuration file could not be parsed.
    #[error("Failed to parse configuration file '{path}': {message}")]
    ConfigParseError {
        /// The path to the file that failed to parse.
        path: String,
        /// A description of the parse error.
        message: String,
    },

    /// An uploaded batch was rejected before any row was persisted.
    #[error("Validation failed: {0}")]
    Validation(#[from] ValidationError),

    /// Reconciliation found identity or cohort differences that were not confirmed.
    #[error(
        "Import requires confirmation: {mismatches} name mismatch(es), {unknown} unknown employee(s), {cohort_changes} cohort change(s)"
    )]
    IdentityMismatch {
        /// Number of uploaded rows whose name differs from the canonical record.
        mismatches: usize,
        /// Number of uploaded employee ids with no canonical record.
        unknown: usize,
        /// Number of employees entering or leaving the cohort.
        cohort_changes: usize,
    },

    /// A salary could not be computed because a dependency is missing.
    #[error("Cannot compute salary for '{emp_id}' in {period}: {missing} not found")]
    Computation {
        /// The employee being computed.
        emp_id: String,
        /// The payroll period.
        period: Period,
        /// The dependency that could not be loaded.
        missing: MissingDependency,
    },

    /// A record would violate the per-period uniqueness of its kind.
    #[error("Duplicate {kind} record for '{emp_id}' in {period}")]
    DuplicateRecord {
        /// The import kind of the conflicting record.
        kind: ImportKind,
        /// The employee id of the conflicting record.
        emp_id: String,
        /// The period of the conflicting record.
        period: Period,
    },

    /// The persistence collaborator failed; the surrounding transaction is rolled back.
    #[error("Persistence failure: {message}")]
    Persistence {
        /// A description of the underlying failure.
        message: String,
    },

    /// A numeric or structural input was outside its domain.
    #[error("Invalid input: {message}")]
    InvalidInput {
        /// A description of what made the input invalid.
        message: String,
    },

    /// A salary formula could not be tokenized or parsed.
    #[error("Malformed formula '{formula}': {message}")]
    MalformedFormula {
        /// The offending formula text.
        formula: String,
        /// A description of the problem.
        message: String,
    },

    /// A formula keyword had no value when the formula was evaluated.
    #[error("Formula keyword '{keyword}' has no resolved value")]
    UnresolvedKeyword {
        /// The unresolved keyword.
        keyword: String,
    },
}

impl EngineError {
    /// Returns a stable, machine-readable code for this error kind.
    pub fn code(&self) -> &'static str {
        match self {
            EngineError::ConfigNotFound { .. } | EngineError::ConfigParseError { .. } => {
                "CONFIG_ERROR"
            }
            EngineError::Validation(_) => "VALIDATION_ERROR",
            EngineError::IdentityMismatch { .. } => "IDENTITY_MISMATCH",
            EngineError::Computation { .. } => "COMPUTATION_ERROR",
            EngineError::DuplicateRecord { .. } => "DUPLICATE_RECORD",
            EngineError::Persistence { .. } => "PERSISTENCE_ERROR",
            EngineError::InvalidInput { .. } => "INVALID_INPUT",
            EngineError::MalformedFormula { .. } => "MALFORMED_FORMULA",
            EngineError::UnresolvedKeyword { .. } => "UNRESOLVED_KEYWORD",
        }
    }

    /// Returns true if this error was raised while validating an import batch.
    pub fn is_validation(&self) -> bool {
        matches!(self, EngineError::Validation(_))
    }

    pub(crate) fn invalid_input(message: impl Into<String>) -> Self {
        EngineError::InvalidInput {
            message: message.into(),
        }
    }

    pub(crate) fn persistence(message: impl Into<String>) -> Self {
        EngineError::Persistence {
            message: message.into(),
        }
    }
}

/// Reasons an uploaded batch is rejected.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// The batch lacks one or more columns required for its import kind.
    #[error("missing required field(s) for {kind} import: {}", .fields.join(", "))]
    MissingFields {
        /// The declared import kind.
        kind: ImportKind,
        /// Header names of the missing columns.
        fields: Vec<String>,
    },

    /// Cleaning dropped rows and the caller did not accept dropped rows.
    #[error("{dropped} of {total} row(s) have empty identity fields or non-numeric values")]
    UnparseableRows {
        /// Number of rows dropped during cleaning.
        dropped: usize,
        /// Number of rows in the uploaded batch.
        total: usize,
    },

    /// A cell holds a value outside the column's vocabulary.
    #[error("row {row}: invalid value '{value}' in column '{column}'")]
    InvalidValue {
        /// Zero-based index of the row within the cleaned batch.
        row: usize,
        /// Header name of the column.
        column: String,
        /// The rejected value.
        value: String,
    },

    /// An employee id occurs twice in a batch whose records are unique per period.
    #[error("employee '{emp_id}' appears more than once in the {kind} batch")]
    DuplicateEmployee {
        /// The import kind.
        kind: ImportKind,
        /// The repeated employee id.
        emp_id: String,
    },

    /// The batch contains no rows.
    #[error("the {kind} batch contains no rows")]
    EmptyBatch {
        /// The import kind.
        kind: ImportKind,
    },
}

/// The dependency a salary computation could not load.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MissingDependency {
    /// The employee record itself.
    Employee,
    /// The salary group referenced by the employee.
    SalaryGroup(String),
    /// The attendance record for the period.
    Attendance,
}

impl fmt::Display for MissingDependency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MissingDependency::Employee => write!(f, "employee"),
            MissingDependency::SalaryGroup(id) => write!(f, "salary group '{}'", id),
            MissingDependency::Attendance => write!(f, "attendance record"),
        }
    }
}

/// A type alias for Results that return EngineError.
pub type EngineResult<T> = Result<T, EngineError>;
