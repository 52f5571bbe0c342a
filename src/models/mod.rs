//! Core data models for the payroll engine.
//!
//! This module contains all the domain models used throughout the engine.

mod employee;
mod period;
mod records;
mod salary_group;
mod salary_record;

pub use employee::{Employee, EmployeeStatus, EmploymentType};
pub use period::Period;
pub use records::{
    AttendanceRecord, ImportKind, PerformanceRecord, RewardKind, RewardPunishmentRecord,
};
pub use salary_group::{
    ContributionItem, OvertimeRule, PerformanceRule, PerformanceTier, ProrationRule, SalaryGroup,
    SocialSecurityScheme,
};
pub use salary_record::{AuditStep, AuditWarning, SalaryComponent, SalaryRecord};
