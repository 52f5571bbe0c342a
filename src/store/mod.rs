//! The persistence port the engine reads from and commits to.
//!
//! The engine never manages connections. Every component receives a
//! [`PersistenceStore`] explicitly and scopes its writes with
//! [`in_transaction`], so a failure at any step leaves no partial writes.

mod memory;

pub use memory::InMemoryStore;

use std::collections::BTreeSet;

use tracing::warn;

use crate::error::EngineResult;
use crate::import::ImportedRecords;
use crate::models::{
    AttendanceRecord, Employee, ImportKind, PerformanceRecord, Period, RewardPunishmentRecord,
    SalaryGroup, SalaryRecord,
};

/// Storage of canonical employees, salary groups, imported period records
/// and computed salary records.
///
/// Reads are infallible in shape but may fail with
/// [`EngineError::Persistence`](crate::error::EngineError::Persistence) when
/// the backing store does. Writes must happen between
/// [`begin_transaction`](Self::begin_transaction) and
/// [`commit`](Self::commit) or [`rollback`](Self::rollback).
pub trait PersistenceStore {
    /// Opens a transaction. Nested transactions are not supported.
    fn begin_transaction(&mut self) -> EngineResult<()>;

    /// Makes every write since [`begin_transaction`](Self::begin_transaction) durable.
    fn commit(&mut self) -> EngineResult<()>;

    /// Discards every write since [`begin_transaction`](Self::begin_transaction).
    fn rollback(&mut self) -> EngineResult<()>;

    /// Looks up a canonical employee.
    fn get_employee(&self, emp_id: &str) -> EngineResult<Option<Employee>>;

    /// Lists every canonical employee, active or not, ordered by id.
    fn list_employees(&self) -> EngineResult<Vec<Employee>>;

    /// Looks up a salary group.
    fn get_salary_group(&self, group_id: &str) -> EngineResult<Option<SalaryGroup>>;

    /// Looks up an employee's attendance for a period.
    fn get_attendance(&self, emp_id: &str, period: Period)
    -> EngineResult<Option<AttendanceRecord>>;

    /// Looks up an employee's performance score for a period.
    fn get_performance(
        &self,
        emp_id: &str,
        period: Period,
    ) -> EngineResult<Option<PerformanceRecord>>;

    /// Lists an employee's rewards and punishments for a period.
    fn get_rewards(&self, emp_id: &str, period: Period)
    -> EngineResult<Vec<RewardPunishmentRecord>>;

    /// Returns the employee ids holding a record of `kind` in `period`.
    fn cohort(&self, kind: ImportKind, period: Period) -> EngineResult<BTreeSet<String>>;

    /// Persists a confirmed import and returns the number of rows written.
    ///
    /// Attendance and performance rows that already exist for the same
    /// `(emp_id, period)` are rejected with
    /// [`EngineError::DuplicateRecord`](crate::error::EngineError::DuplicateRecord).
    fn upsert_imported_records(
        &mut self,
        records: &ImportedRecords,
        period: Period,
    ) -> EngineResult<usize>;

    /// Replaces an existing attendance record with a corrected one and
    /// returns the record it replaced.
    fn correct_attendance(&mut self, record: AttendanceRecord) -> EngineResult<AttendanceRecord>;

    /// Persists a computed salary record, assigning the next revision for its
    /// `(emp_id, period)`, and returns the record as stored.
    fn commit_salary_record(&mut self, record: SalaryRecord) -> EngineResult<SalaryRecord>;

    /// Returns every revision of an employee's salary record for a period,
    /// oldest first.
    fn salary_records(&self, emp_id: &str, period: Period) -> EngineResult<Vec<SalaryRecord>>;
}

/// Runs `work` inside a transaction on `store`.
///
/// Commits when `work` succeeds and rolls back when it or the commit fails.
/// The error from `work` is returned even if the rollback itself fails.
pub fn in_transaction<S, T, F>(store: &mut S, work: F) -> EngineResult<T>
where
    S: PersistenceStore + ?Sized,
    F: FnOnce(&mut S) -> EngineResult<T>,
{
    store.begin_transaction()?;
    let result = work(store).and_then(|value| store.commit().map(|()| value));
    if let Err(error) = &result {
        if let Err(rollback_error) = store.rollback() {
            warn!(
                error = %error,
                rollback_error = %rollback_error,
                "Rollback failed after aborted transaction"
            );
        }
    }
    result
}
