//! The import command: validate, clean, reconcile, confirm, commit.

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::error::{EngineResult, ValidationError};
use crate::models::{Employee, ImportKind, Period};
use crate::store::{in_transaction, PersistenceStore};

use super::batch::{ColumnMapping, TabularBatch};
use super::records::{uploaded_identities, ImportedRecords};
use super::reconcile::{reconcile, ReconciliationReport};
use super::schema::{ColumnHeaders, ImportSchema};
use super::validator::{apply_mapping, clean, fill_blank, validate};

/// An operator's answer to a reconciliation report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Decision {
    /// Commit the import.
    Confirm,
    /// Abandon the import; nothing is written.
    Cancel,
}

/// Presents a reconciliation report to an operator and returns their decision.
///
/// The import blocks on this call.
pub trait InteractionPort {
    /// Asks the operator whether to commit an import with this report.
    fn confirm(&mut self, report: &ReconciliationReport) -> Decision;
}

/// An [`InteractionPort`] that answers every report with a fixed decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PresetDecision(pub Decision);

impl InteractionPort for PresetDecision {
    fn confirm(&mut self, _report: &ReconciliationReport) -> Decision {
        self.0
    }
}

/// An uploaded batch and the options it is imported with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportRequest {
    /// The uploaded batch.
    pub batch: TabularBatch,
    /// The period the batch belongs to.
    pub period: Period,
    /// Header renames applied before validation.
    pub mapping: ColumnMapping,
    /// Whether rows dropped during cleaning are acceptable.
    pub allow_dropped_rows: bool,
}

/// What happened to an import.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ImportOutcome {
    /// The records were written.
    Committed {
        /// The import kind.
        kind: ImportKind,
        /// The period.
        period: Period,
        /// Number of records written.
        imported: usize,
        /// Number of rows dropped during cleaning.
        dropped: usize,
        /// The reconciliation report the import was committed with.
        report: ReconciliationReport,
    },
    /// The operator cancelled; nothing was written.
    Cancelled {
        /// The report the operator declined.
        report: ReconciliationReport,
    },
}

/// A batch that passed validation and reconciliation but is not yet written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PreparedImport {
    /// The typed records.
    pub records: ImportedRecords,
    /// The period.
    pub period: Period,
    /// Number of rows dropped during cleaning.
    pub dropped: usize,
    /// The reconciliation report.
    pub report: ReconciliationReport,
}

/// Runs periodic imports against a store.
#[derive(Debug, Clone, Default)]
pub struct ImportService {
    headers: ColumnHeaders,
}

impl ImportService {
    /// Creates a service reading batches with the given column headers.
    pub fn new(headers: ColumnHeaders) -> Self {
        Self { headers }
    }

    /// Returns the configured column headers.
    pub fn headers(&self) -> &ColumnHeaders {
        &self.headers
    }

    /// Validates, cleans, types and reconciles a batch without writing.
    ///
    /// # Errors
    ///
    /// Returns a [`ValidationError`] for a batch missing required columns,
    /// dropping rows when that is not allowed, or holding invalid values, and
    /// a persistence error if the canonical records cannot be read.
    pub fn prepare<S>(&self, store: &S, request: &ImportRequest) -> EngineResult<PreparedImport>
    where
        S: PersistenceStore + ?Sized,
    {
        let kind = request.batch.kind;
        let schema = ImportSchema::for_kind(kind);
        let batch = apply_mapping(&request.batch, &request.mapping);

        let validation = validate(&batch, &self.headers.headers(kind, &schema.required));
        if !validation.ok {
            return Err(ValidationError::MissingFields {
                kind,
                fields: validation.missing_fields,
            }
            .into());
        }

        let optional = self.headers.headers(kind, &schema.optional_numeric);
        let batch = fill_blank(&batch, &optional);
        let mut numeric = self.headers.headers(kind, &schema.numeric);
        numeric.extend(optional.into_iter().filter(|field| batch.has_column(field)));
        let cleaned = clean(&batch, &self.headers.headers(kind, &schema.identity), &numeric);

        if cleaned.dropped > 0 && !request.allow_dropped_rows {
            return Err(ValidationError::UnparseableRows {
                dropped: cleaned.dropped,
                total: batch.len(),
            }
            .into());
        }

        let records = ImportedRecords::from_batch(&cleaned.batch, &self.headers, request.period)?;
        let identities = uploaded_identities(&cleaned.batch, &self.headers);

        let canonical: Vec<Employee> = store
            .list_employees()?
            .into_iter()
            .filter(Employee::is_active)
            .collect();
        let prior_cohort = if kind.tracks_cohort() {
            store.cohort(kind, request.period.previous())?
        } else {
            Default::default()
        };
        let report = reconcile(kind, request.period, &identities, &canonical, &prior_cohort);

        Ok(PreparedImport {
            records,
            period: request.period,
            dropped: cleaned.dropped,
            report,
        })
    }

    /// Imports a batch.
    ///
    /// The port is consulted only when the reconciliation report requires
    /// confirmation. A cancelled import leaves the store unchanged. The
    /// records are written in a single transaction.
    ///
    /// # Errors
    ///
    /// Everything [`prepare`](Self::prepare) returns, plus
    /// [`EngineError::DuplicateRecord`](crate::error::EngineError::DuplicateRecord)
    /// when an attendance or performance record already exists for the period.
    pub fn import_batch<S, P>(
        &self,
        store: &mut S,
        request: &ImportRequest,
        port: &mut P,
    ) -> EngineResult<ImportOutcome>
    where
        S: PersistenceStore + ?Sized,
        P: InteractionPort + ?Sized,
    {
        let prepared = self.prepare(&*store, request)?;
        let kind = prepared.records.kind();

        if prepared.report.requires_confirmation() {
            info!(
                kind = %kind,
                period = %prepared.period,
                mismatches = prepared.report.mismatches.len(),
                unknown = prepared.report.unknown_employees.len(),
                cohort_changes = prepared.report.cohort_changes(),
                "Import requires confirmation"
            );
            if port.confirm(&prepared.report) == Decision::Cancel {
                warn!(kind = %kind, period = %prepared.period, "Import cancelled by operator");
                return Ok(ImportOutcome::Cancelled {
                    report: prepared.report,
                });
            }
        }

        let imported = in_transaction(store, |store| {
            store.upsert_imported_records(&prepared.records, prepared.period)
        })?;

        info!(
            kind = %kind,
            period = %prepared.period,
            imported = imported,
            dropped = prepared.dropped,
            "Import committed"
        );

        Ok(ImportOutcome::Committed {
            kind,
            period: prepared.period,
            imported,
            dropped: prepared.dropped,
            report: prepared.report,
        })
    }
}
