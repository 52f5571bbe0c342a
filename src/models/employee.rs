//! Employee model and related types.
//!
//! This module defines the canonical [`Employee`] record against which
//! uploaded batches are reconciled, along with its employment type and status.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Represents the type of employment arrangement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EmploymentType {
    /// Full-time employment.
    FullTime,
    /// Part-time employment.
    PartTime,
    /// Fixed-term contract.
    Contract,
    /// Internship.
    Intern,
}

/// Whether the employee is currently employed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EmployeeStatus {
    /// Currently employed; in scope for imports and payroll runs.
    #[default]
    Active,
    /// Left the company; kept for history.
    Inactive,
}

/// The canonical, persisted employee record.
///
/// Identity is keyed solely by `emp_id`. The name is mutable metadata and is
/// only used to flag mismatches against uploaded batches.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Employee {
    /// Unique employee number.
    pub emp_id: String,
    /// The employee's name as held on record.
    pub name: String,
    /// Optional national identity number.
    #[serde(default)]
    pub national_id: Option<String>,
    /// The date the employee was hired.
    pub hire_date: NaiveDate,
    /// The type of employment arrangement.
    pub employment_type: EmploymentType,
    /// Employment status.
    #[serde(default)]
    pub status: EmployeeStatus,
    /// Id of the salary group that defines this employee's pay.
    pub salary_group: String,
    /// Department, if recorded.
    #[serde(default)]
    pub department: Option<String>,
    /// Position, if recorded.
    #[serde(default)]
    pub position: Option<String>,
}

impl Employee {
    /// Returns true if the employee is currently employed.
    ///
    /// # Examples
    ///
    /// ```
    /// use payroll_engine::models::{Employee, EmployeeStatus, EmploymentType};
    /// use chrono::NaiveDate;
    ///
    /// let employee = Employee {
    ///     emp_id: "001".to_string(),
    ///     name: "张三".to_string(),
    ///     national_id: None,
    ///     hire_date: NaiveDate::from_ymd_opt(2023, 6, 1).unwrap(),
    ///     employment_type: EmploymentType::FullTime,
    ///     status: EmployeeStatus::Active,
    ///     salary_group: "G1".to_string(),
    ///     department: None,
    ///     position: None,
    /// };
    /// assert!(employee.is_active());
    /// ```
    pub fn is_active(&self) -> bool {
        self.status == EmployeeStatus::Active
    }
}
