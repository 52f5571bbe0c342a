//! Periodic imports of attendance, performance and reward/punishment batches.
//!
//! A batch goes through column validation, row cleaning, conversion to typed
//! records and identity/cohort reconciliation before anything is written.

mod batch;
mod reconcile;
mod records;
mod schema;
mod service;
mod validator;

pub use batch::{Cell, ColumnMapping, Row, TabularBatch};
pub use reconcile::{
    diff_cohorts, match_identities, reconcile, unknown_employees, CohortDiff, Mismatch,
    ReconciliationReport,
};
pub use records::{uploaded_identities, ImportedRecords, UploadedIdentity};
pub use schema::{ColumnHeaders, ImportField, ImportSchema};
pub use service::{
    Decision, ImportOutcome, ImportRequest, ImportService, InteractionPort, PreparedImport,
    PresetDecision,
};
pub use validator::{apply_mapping, clean, fill_blank, validate, CleanOutcome, ValidationResult};
