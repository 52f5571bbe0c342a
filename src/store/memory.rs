//! An in-memory [`PersistenceStore`] with snapshot transactions.

use std::collections::{BTreeMap, BTreeSet};

use tracing::debug;

use crate::error::{EngineError, EngineResult};
use crate::import::ImportedRecords;
use crate::models::{
    AttendanceRecord, Employee, ImportKind, PerformanceRecord, Period, RewardPunishmentRecord,
    SalaryGroup, SalaryRecord,
};

use super::PersistenceStore;

type PeriodKey = (String, Period);

#[derive(Debug, Clone, Default, PartialEq)]
struct StoreState {
    employees: BTreeMap<String, Employee>,
    salary_groups: BTreeMap<String, SalaryGroup>,
    attendance: BTreeMap<PeriodKey, AttendanceRecord>,
    performance: BTreeMap<PeriodKey, PerformanceRecord>,
    rewards: Vec<RewardPunishmentRecord>,
    salary_records: BTreeMap<PeriodKey, Vec<SalaryRecord>>,
}

/// A [`PersistenceStore`] held entirely in memory.
///
/// A transaction takes a snapshot of the whole state; rollback restores it.
/// Employees and salary groups are administrative data seeded by the host
/// with [`insert_employee`](Self::insert_employee) and
/// [`insert_salary_group`](Self::insert_salary_group).
///
/// # Example
///
/// ```
/// use payroll_engine::store::{InMemoryStore, PersistenceStore};
///
/// let mut store = InMemoryStore::new();
/// store.begin_transaction().unwrap();
/// store.rollback().unwrap();
/// assert!(!store.in_transaction());
/// ```
#[derive(Debug, Clone, Default)]
pub struct InMemoryStore {
    state: StoreState,
    snapshot: Option<StoreState>,
}

impl InMemoryStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns true while a transaction is open.
    pub fn in_transaction(&self) -> bool {
        self.snapshot.is_some()
    }

    /// Inserts or replaces a canonical employee.
    pub fn insert_employee(&mut self, employee: Employee) {
        self.state
            .employees
            .insert(employee.emp_id.clone(), employee);
    }

    /// Inserts or replaces a salary group.
    pub fn insert_salary_group(&mut self, group: SalaryGroup) {
        self.state
            .salary_groups
            .insert(group.group_id.clone(), group);
    }

    fn ensure_writable(&self) -> EngineResult<()> {
        if self.in_transaction() {
            Ok(())
        } else {
            Err(EngineError::persistence("write attempted outside a transaction"))
        }
    }
}

fn key(emp_id: &str, period: Period) -> PeriodKey {
    (emp_id.to_string(), period)
}

fn check_period(emp_id: &str, record_period: Period, period: Period) -> EngineResult<()> {
    if record_period == period {
        Ok(())
    } else {
        Err(EngineError::invalid_input(format!(
            "record for '{}' belongs to {} but the import is for {}",
            emp_id, record_period, period
        )))
    }
}

impl PersistenceStore for InMemoryStore {
    fn begin_transaction(&mut self) -> EngineResult<()> {
        if self.in_transaction() {
            return Err(EngineError::persistence("a transaction is already open"));
        }
        self.snapshot = Some(self.state.clone());
        Ok(())
    }

    fn commit(&mut self) -> EngineResult<()> {
        match self.snapshot.take() {
            Some(_) => Ok(()),
            None => Err(EngineError::persistence("commit without an open transaction")),
        }
    }

    fn rollback(&mut self) -> EngineResult<()> {
        match self.snapshot.take() {
            Some(snapshot) => {
                self.state = snapshot;
                debug!("Transaction rolled back");
                Ok(())
            }
            None => Err(EngineError::persistence("rollback without an open transaction")),
        }
    }

    fn get_employee(&self, emp_id: &str) -> EngineResult<Option<Employee>> {
        Ok(self.state.employees.get(emp_id).cloned())
    }

    fn list_employees(&self) -> EngineResult<Vec<Employee>> {
        Ok(self.state.employees.values().cloned().collect())
    }

    fn get_salary_group(&self, group_id: &str) -> EngineResult<Option<SalaryGroup>> {
        Ok(self.state.salary_groups.get(group_id).cloned())
    }

    fn get_attendance(
        &self,
        emp_id: &str,
        period: Period,
    ) -> EngineResult<Option<AttendanceRecord>> {
        Ok(self.state.attendance.get(&key(emp_id, period)).cloned())
    }

    fn get_performance(
        &self,
        emp_id: &str,
        period: Period,
    ) -> EngineResult<Option<PerformanceRecord>> {
        Ok(self.state.performance.get(&key(emp_id, period)).cloned())
    }

    fn get_rewards(
        &self,
        emp_id: &str,
        period: Period,
    ) -> EngineResult<Vec<RewardPunishmentRecord>> {
        Ok(self
            .state
            .rewards
            .iter()
            .filter(|record| record.emp_id == emp_id && record.period == period)
            .cloned()
            .collect())
    }

    fn cohort(&self, kind: ImportKind, period: Period) -> EngineResult<BTreeSet<String>> {
        let ids: BTreeSet<String> = match kind {
            ImportKind::Attendance => self
                .state
                .attendance
                .keys()
                .filter(|(_, p)| *p == period)
                .map(|(emp_id, _)| emp_id.clone())
                .collect(),
            ImportKind::Performance => self
                .state
                .performance
                .keys()
                .filter(|(_, p)| *p == period)
                .map(|(emp_id, _)| emp_id.clone())
                .collect(),
            ImportKind::RewardPunishment => self
                .state
                .rewards
                .iter()
                .filter(|record| record.period == period)
                .map(|record| record.emp_id.clone())
                .collect(),
        };
        Ok(ids)
    }

    fn upsert_imported_records(
        &mut self,
        records: &ImportedRecords,
        period: Period,
    ) -> EngineResult<usize> {
        self.ensure_writable()?;
        match records {
            ImportedRecords::Attendance(rows) => {
                for row in rows {
                    check_period(&row.emp_id, row.period, period)?;
                    let row_key = key(&row.emp_id, period);
                    if self.state.attendance.contains_key(&row_key) {
                        return Err(EngineError::DuplicateRecord {
                            kind: ImportKind::Attendance,
                            emp_id: row.emp_id.clone(),
                            period,
                        });
                    }
                    self.state.attendance.insert(row_key, row.clone());
                }
            }
            ImportedRecords::Performance(rows) => {
                for row in rows {
                    check_period(&row.emp_id, row.period, period)?;
                    let row_key = key(&row.emp_id, period);
                    if self.state.performance.contains_key(&row_key) {
                        return Err(EngineError::DuplicateRecord {
                            kind: ImportKind::Performance,
                            emp_id: row.emp_id.clone(),
                            period,
                        });
                    }
                    self.state.performance.insert(row_key, row.clone());
                }
            }
            ImportedRecords::RewardPunishment(rows) => {
                for row in rows {
                    check_period(&row.emp_id, row.period, period)?;
                }
                self.state.rewards.extend(rows.iter().cloned());
            }
        }
        Ok(records.len())
    }

    fn correct_attendance(&mut self, record: AttendanceRecord) -> EngineResult<AttendanceRecord> {
        self.ensure_writable()?;
        let record_key = key(&record.emp_id, record.period);
        match self.state.attendance.get_mut(&record_key) {
            Some(existing) => Ok(std::mem::replace(existing, record)),
            None => Err(EngineError::persistence(format!(
                "no attendance record for '{}' in {} to correct",
                record.emp_id, record.period
            ))),
        }
    }

    fn commit_salary_record(&mut self, mut record: SalaryRecord) -> EngineResult<SalaryRecord> {
        self.ensure_writable()?;
        let revisions = self
            .state
            .salary_records
            .entry(key(&record.emp_id, record.period))
            .or_default();
        record.revision = u32::try_from(revisions.len() + 1)
            .map_err(|_| EngineError::persistence("salary record revision overflow"))?;
        revisions.push(record.clone());
        Ok(record)
    }

    fn salary_records(&self, emp_id: &str, period: Period) -> EngineResult<Vec<SalaryRecord>> {
        Ok(self
            .state
            .salary_records
            .get(&key(emp_id, period))
            .cloned()
            .unwrap_or_default())
    }
}
