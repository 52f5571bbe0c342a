//! Base salary proration.
//!
//! The group's monthly base salary is paid in proportion to the days attended
//! out of the group's standard working days.

use rust_decimal::Decimal;

use crate::error::{EngineError, EngineResult};
use crate::models::{AttendanceRecord, AuditStep, SalaryGroup};

use super::money::{checked_div, checked_mul, round_amount};

/// The result of prorating the base salary, including the audit step.
#[derive(Debug, Clone)]
pub struct BaseSalaryResult {
    /// The prorated, rounded base salary.
    pub amount: Decimal,
    /// The audit step recording this calculation.
    pub audit_step: AuditStep,
}

/// Prorates the group's base salary by attendance.
///
/// `amount = base_salary * days / standard_days`, where `days` is capped at
/// `standard_days` when the group's proration rule says so.
///
/// # Errors
///
/// Returns [`EngineError::InvalidInput`] if the standard days are not positive,
/// the attendance days are negative, or the proration overflows.
///
/// # Examples
///
/// ```
/// use payroll_engine::calculation::calculate_base_salary;
/// use payroll_engine::models::{AttendanceRecord, SalaryGroup};
/// use rust_decimal::Decimal;
/// use std::str::FromStr;
///
/// let group: SalaryGroup = serde_json::from_str(
///     r#"{"group_id": "G1", "group_name": "行政", "base_salary": "6000", "formula": "基本工资"}"#,
/// ).unwrap();
/// let attendance = AttendanceRecord {
///     emp_id: "001".to_string(),
///     period: "2024-03".parse().unwrap(),
///     attendance_days: Decimal::from_str("21.75").unwrap(),
///     overtime_hours: Decimal::ZERO,
/// };
///
/// let result = calculate_base_salary(&group, &attendance, 2, 1).unwrap();
/// assert_eq!(result.amount, Decimal::from(6000));
/// ```
pub fn calculate_base_salary(
    group: &SalaryGroup,
    attendance: &AttendanceRecord,
    scale: u32,
    step_number: u32,
) -> EngineResult<BaseSalaryResult> {
    let rule = &group.proration;
    if rule.standard_days <= Decimal::ZERO {
        return Err(EngineError::invalid_input(format!(
            "salary group '{}' has non-positive standard days {}",
            group.group_id, rule.standard_days
        )));
    }
    if attendance.attendance_days < Decimal::ZERO {
        return Err(EngineError::invalid_input(format!(
            "attendance days for '{}' are negative: {}",
            attendance.emp_id, attendance.attendance_days
        )));
    }

    let capped = rule.cap_at_standard && attendance.attendance_days > rule.standard_days;
    let paid_days = if capped {
        rule.standard_days
    } else {
        attendance.attendance_days
    };
    let what = format!("base salary for '{}'", attendance.emp_id);
    let prorated = checked_div(
        checked_mul(group.base_salary, paid_days, &what)?,
        rule.standard_days,
        &what,
    )?;
    let amount = round_amount(prorated, scale);

    let audit_step = AuditStep {
        step_number,
        rule_id: "base_salary_proration".to_string(),
        rule_name: "Base Salary Proration".to_string(),
        input: serde_json::json!({
            "base_salary": group.base_salary.normalize().to_string(),
            "attendance_days": attendance.attendance_days.normalize().to_string(),
            "standard_days": rule.standard_days.normalize().to_string(),
        }),
        output: serde_json::json!({
            "paid_days": paid_days.normalize().to_string(),
            "capped": capped,
            "amount": amount.to_string(),
        }),
        reasoning: format!(
            "{} x {} / {} = {}",
            group.base_salary.normalize(),
            paid_days.normalize(),
            rule.standard_days.normalize(),
            amount
        ),
    };

    Ok(BaseSalaryResult { amount, audit_step })
}
