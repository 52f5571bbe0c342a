//! Response types for the payroll engine API.
//!
//! This module defines the response bodies, the error response structure
//! and the mapping from engine errors to HTTP status codes.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::calculation::TaxSlice;
use crate::error::EngineError;
use crate::import::ReconciliationReport;
use crate::models::SalaryComponent;

/// API error response structure.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiError {
    /// Error code for programmatic handling.
    pub code: String,
    /// Human-readable error message.
    pub message: String,
    /// Optional details about the error.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl ApiError {
    /// Creates a new API error.
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
            details: None,
        }
    }

    /// Creates a new API error with details.
    pub fn with_details(
        code: impl Into<String>,
        message: impl Into<String>,
        details: impl Into<String>,
    ) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
            details: Some(details.into()),
        }
    }

    /// Creates a malformed JSON error response.
    pub fn malformed_json(message: impl Into<String>) -> Self {
        Self::new("MALFORMED_JSON", message)
    }
}

/// API error with HTTP status code.
pub struct ApiErrorResponse {
    /// The HTTP status code.
    pub status: StatusCode,
    /// The error body.
    pub error: ApiError,
}

impl IntoResponse for ApiErrorResponse {
    fn into_response(self) -> Response {
        (self.status, Json(self.error)).into_response()
    }
}

fn status_for(error: &EngineError) -> StatusCode {
    match error {
        EngineError::ConfigNotFound { .. }
        | EngineError::ConfigParseError { .. }
        | EngineError::Persistence { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        EngineError::Validation(_)
        | EngineError::InvalidInput { .. }
        | EngineError::MalformedFormula { .. }
        | EngineError::UnresolvedKeyword { .. } => StatusCode::BAD_REQUEST,
        EngineError::IdentityMismatch { .. } | EngineError::DuplicateRecord { .. } => {
            StatusCode::CONFLICT
        }
        EngineError::Computation { .. } => StatusCode::UNPROCESSABLE_ENTITY,
    }
}

impl From<EngineError> for ApiErrorResponse {
    fn from(error: EngineError) -> Self {
        let status = status_for(&error);
        let code = error.code();
        let api_error = match &error {
            EngineError::Persistence { .. } => {
                ApiError::with_details(code, "Storage failure", error.to_string())
            }
            EngineError::ConfigNotFound { .. } | EngineError::ConfigParseError { .. } => {
                ApiError::with_details(code, "Configuration error", error.to_string())
            }
            EngineError::Validation(inner) => {
                ApiError::with_details(code, "Import batch rejected", inner.to_string())
            }
            _ => ApiError::new(code, error.to_string()),
        };
        ApiErrorResponse {
            status,
            error: api_error,
        }
    }
}

/// Body of the `409` returned when an import needs confirmation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfirmationRequired {
    /// Always `IDENTITY_MISMATCH`.
    pub code: String,
    /// Human-readable summary.
    pub message: String,
    /// What the operator has to confirm.
    pub report: ReconciliationReport,
}

impl ConfirmationRequired {
    /// Builds the response body for a report.
    pub fn new(report: ReconciliationReport) -> Self {
        let error = EngineError::IdentityMismatch {
            mismatches: report.mismatches.len(),
            unknown: report.unknown_employees.len(),
            cohort_changes: report.cohort_changes(),
        };
        Self {
            code: error.code().to_string(),
            message: error.to_string(),
            report,
        }
    }
}

/// Response body for `POST /formulas/validate`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FormulaValidationResponse {
    /// Whether the formula tokenizes and parses.
    pub valid: bool,
    /// Components the formula refers to.
    pub components: Vec<SalaryComponent>,
    /// Why the formula is invalid.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Response body for `POST /tax`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaxResponse {
    /// The taxable income.
    pub taxable_income: Decimal,
    /// The tax, unrounded.
    pub tax: Decimal,
    /// Per-bracket breakdown.
    pub slices: Vec<TaxSlice>,
}
