//! Identity and cohort reconciliation of an uploaded batch.
//!
//! Identity is keyed by employee id alone. Names only flag mismatches for an
//! operator to confirm; they never decide which employee a row belongs to.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::models::{Employee, ImportKind, Period};

use super::records::UploadedIdentity;

/// An uploaded name that differs from the canonical one.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Mismatch {
    /// Employee id.
    pub emp_id: String,
    /// Name in the uploaded batch.
    pub uploaded_name: String,
    /// Name on the canonical employee record.
    pub canonical_name: String,
}

fn canonical_names(canonical: &[Employee]) -> BTreeMap<&str, &str> {
    canonical
        .iter()
        .map(|employee| (employee.emp_id.as_str(), employee.name.as_str()))
        .collect()
}

/// Lists the uploaded rows whose name differs from the canonical record.
///
/// Names are compared after trimming surrounding whitespace. Rows with an
/// unknown employee id or without a name produce no mismatch. Each distinct
/// `(emp_id, uploaded_name)` pair is reported once, in upload order.
///
/// # Example
///
/// ```
/// use payroll_engine::import::{match_identities, UploadedIdentity};
/// # use payroll_engine::models::{Employee, EmployeeStatus, EmploymentType};
/// # use chrono::NaiveDate;
/// # let employee = Employee {
/// #     emp_id: "001".to_string(),
/// #     name: "张三".to_string(),
/// #     national_id: None,
/// #     hire_date: NaiveDate::from_ymd_opt(2023, 6, 1).unwrap(),
/// #     employment_type: EmploymentType::FullTime,
/// #     status: EmployeeStatus::Active,
/// #     salary_group: "G1".to_string(),
/// #     department: None,
/// #     position: None,
/// # };
///
/// let uploaded = vec![
///     UploadedIdentity { emp_id: "001".to_string(), name: Some("李四".to_string()) },
///     UploadedIdentity { emp_id: "999".to_string(), name: Some("王五".to_string()) },
/// ];
/// let mismatches = match_identities(&uploaded, &[employee]);
///
/// assert_eq!(mismatches.len(), 1);
/// assert_eq!(mismatches[0].uploaded_name, "李四");
/// assert_eq!(mismatches[0].canonical_name, "张三");
/// ```
pub fn match_identities(uploaded: &[UploadedIdentity], canonical: &[Employee]) -> Vec<Mismatch> {
    let names = canonical_names(canonical);
    let mut seen = BTreeSet::new();
    let mut mismatches = Vec::new();

    for identity in uploaded {
        let Some(uploaded_name) = identity.name.as_deref().map(str::trim) else {
            continue;
        };
        let Some(canonical_name) = names.get(identity.emp_id.as_str()) else {
            continue;
        };
        if uploaded_name == canonical_name.trim() {
            continue;
        }
        if seen.insert((identity.emp_id.as_str(), uploaded_name)) {
            mismatches.push(Mismatch {
                emp_id: identity.emp_id.clone(),
                uploaded_name: uploaded_name.to_string(),
                canonical_name: canonical_name.to_string(),
            });
        }
    }

    mismatches
}

/// Returns the uploaded employee ids that have no canonical record.
pub fn unknown_employees(uploaded: &[UploadedIdentity], canonical: &[Employee]) -> BTreeSet<String> {
    let names = canonical_names(canonical);
    uploaded
        .iter()
        .filter(|identity| !names.contains_key(identity.emp_id.as_str()))
        .map(|identity| identity.emp_id.clone())
        .collect()
}

/// Employees entering and leaving a cohort between two periods.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CohortDiff {
    /// In the current cohort but not the prior one.
    pub added: BTreeSet<String>,
    /// In the prior cohort but not the current one.
    pub removed: BTreeSet<String>,
}

impl CohortDiff {
    /// Returns true if the cohorts are identical.
    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.removed.is_empty()
    }

    /// Number of employees entering or leaving.
    pub fn len(&self) -> usize {
        self.added.len() + self.removed.len()
    }
}

/// Computes `added = current - prior` and `removed = prior - current`.
///
/// # Example
///
/// ```
/// use payroll_engine::import::diff_cohorts;
/// use std::collections::BTreeSet;
///
/// let set = |ids: &[&str]| ids.iter().map(|id| id.to_string()).collect::<BTreeSet<_>>();
/// let diff = diff_cohorts(&set(&["002", "003", "004"]), &set(&["001", "002", "003"]));
///
/// assert_eq!(diff.added, set(&["004"]));
/// assert_eq!(diff.removed, set(&["001"]));
/// ```
pub fn diff_cohorts(current: &BTreeSet<String>, prior: &BTreeSet<String>) -> CohortDiff {
    CohortDiff {
        added: current.difference(prior).cloned().collect(),
        removed: prior.difference(current).cloned().collect(),
    }
}

/// Everything an operator must see before an import is committed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReconciliationReport {
    /// The import kind.
    pub kind: ImportKind,
    /// The period being imported.
    pub period: Period,
    /// The period the cohort was compared against.
    pub prior_period: Period,
    /// Name mismatches against canonical records.
    pub mismatches: Vec<Mismatch>,
    /// Uploaded employee ids with no canonical record.
    pub unknown_employees: BTreeSet<String>,
    /// Cohort changes against the prior period; `None` when the kind does not
    /// track a cohort or the prior period has no records.
    pub cohort: Option<CohortDiff>,
}

impl ReconciliationReport {
    /// Returns true if an operator must confirm before the import commits.
    pub fn requires_confirmation(&self) -> bool {
        !self.mismatches.is_empty()
            || !self.unknown_employees.is_empty()
            || self.cohort.as_ref().is_some_and(|diff| !diff.is_empty())
    }

    /// Number of cohort changes.
    pub fn cohort_changes(&self) -> usize {
        self.cohort.as_ref().map_or(0, CohortDiff::len)
    }
}

/// Builds the reconciliation report of an uploaded batch.
///
/// `canonical` are the employees uploads are checked against and
/// `prior_cohort` the ids holding records of `kind` in the previous period.
pub fn reconcile(
    kind: ImportKind,
    period: Period,
    uploaded: &[UploadedIdentity],
    canonical: &[Employee],
    prior_cohort: &BTreeSet<String>,
) -> ReconciliationReport {
    let cohort = if kind.tracks_cohort() && !prior_cohort.is_empty() {
        let current: BTreeSet<String> = uploaded.iter().map(|u| u.emp_id.clone()).collect();
        Some(diff_cohorts(&current, prior_cohort))
    } else {
        None
    };

    ReconciliationReport {
        kind,
        period,
        prior_period: period.previous(),
        mismatches: match_identities(uploaded, canonical),
        unknown_employees: unknown_employees(uploaded, canonical),
        cohort,
    }
}
