//! Whole-period payroll runs.
//!
//! A run computes every active employee and commits all records together,
//! so either the whole payroll for the period becomes visible or none of it.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use uuid::Uuid;

use crate::error::EngineResult;
use crate::models::{Employee, Period, SalaryRecord};
use crate::store::{in_transaction, PersistenceStore};

use super::salary::{SalaryComputer, SalaryInputs};

/// The committed result of a payroll run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PayrollRunSummary {
    /// Identifies the run in logs.
    pub run_id: Uuid,
    /// The period.
    pub period: Period,
    /// The committed records, ordered by employee id.
    pub records: Vec<SalaryRecord>,
    /// Sum of the records' net salaries.
    pub total_net: Decimal,
}

impl SalaryComputer {
    /// Computes and commits the salaries of every active employee for a period.
    ///
    /// Inputs are loaded first, then computed on up to
    /// `payroll_workers` threads, then committed in one transaction. Every
    /// record of the run carries the same timestamp.
    ///
    /// # Errors
    ///
    /// The first error of any employee aborts the run and rolls back every
    /// record of it.
    pub fn run_payroll<S>(&self, store: &mut S, period: Period) -> EngineResult<PayrollRunSummary>
    where
        S: PersistenceStore + ?Sized,
    {
        let run_id = Uuid::new_v4();
        let computed_at = self.now();
        info!(run_id = %run_id, period = %period, "Payroll run started");

        let result = in_transaction(store, |store| {
            let inputs = store
                .list_employees()?
                .into_iter()
                .filter(Employee::is_active)
                .map(|employee| self.load_inputs(&*store, &employee.emp_id, period))
                .collect::<EngineResult<Vec<_>>>()?;
            let records = self.compute_all(&inputs, computed_at)?;
            records
                .into_iter()
                .map(|record| store.commit_salary_record(record))
                .collect::<EngineResult<Vec<_>>>()
        });

        match result {
            Ok(records) => {
                let total_net: Decimal = records.iter().map(|r| r.net_salary).sum();
                info!(
                    run_id = %run_id,
                    period = %period,
                    employees = records.len(),
                    total_net = %total_net,
                    "Payroll run committed"
                );
                Ok(PayrollRunSummary {
                    run_id,
                    period,
                    records,
                    total_net,
                })
            }
            Err(error) => {
                warn!(
                    run_id = %run_id,
                    period = %period,
                    error = %error,
                    "Payroll run aborted and rolled back"
                );
                Err(error)
            }
        }
    }

    fn compute_all(
        &self,
        inputs: &[SalaryInputs],
        computed_at: DateTime<Utc>,
    ) -> EngineResult<Vec<SalaryRecord>> {
        let workers = self.settings().payroll_workers.clamp(1, inputs.len().max(1));
        if workers == 1 {
            return inputs
                .iter()
                .map(|input| self.compute_record(input, computed_at))
                .collect();
        }

        let chunk_size = inputs.len().div_ceil(workers);
        std::thread::scope(|scope| -> EngineResult<Vec<SalaryRecord>> {
            let handles: Vec<_> = inputs
                .chunks(chunk_size)
                .map(|chunk| {
                    scope.spawn(move || {
                        chunk
                            .iter()
                            .map(|input| self.compute_record(input, computed_at))
                            .collect::<EngineResult<Vec<_>>>()
                    })
                })
                .collect();

            let mut records = Vec::with_capacity(inputs.len());
            for handle in handles {
                match handle.join() {
                    Ok(chunk) => records.extend(chunk?),
                    Err(panic) => std::panic::resume_unwind(panic),
                }
            }
            Ok(records)
        })
    }
}
