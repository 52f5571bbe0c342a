//! HTTP API module for the payroll engine.
//!
//! This module exposes imports, attendance corrections, salary computation,
//! payroll runs, formula validation and tax lookups as JSON endpoints.

mod handlers;
mod request;
mod response;
mod state;

pub use handlers::create_router;
pub use request::{
    ComputeSalaryRequest, FormulaRequest, ImportBatchRequest, PayrollRunRequest, TaxRequest,
};
pub use response::{
    ApiError, ApiErrorResponse, ConfirmationRequired, FormulaValidationResponse, TaxResponse,
};
pub use state::AppState;
