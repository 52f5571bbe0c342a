//! Overtime pay calculation.

use rust_decimal::Decimal;

use crate::error::{EngineError, EngineResult};
use crate::models::{AttendanceRecord, AuditStep, SalaryGroup};

use super::money::{checked_div, checked_mul, round_amount};

/// The result of the overtime pay calculation.
#[derive(Debug, Clone)]
pub struct OvertimePayResult {
    /// The rounded overtime pay.
    pub amount: Decimal,
    /// The hourly rate before the multiplier.
    pub hourly_rate: Decimal,
    /// The audit step recording this calculation.
    pub audit_step: AuditStep,
}

/// Returns the hourly rate overtime is paid against.
///
/// This is the group's explicit rate when configured, otherwise
/// `base_salary / standard_days / hours_per_day`.
///
/// # Errors
///
/// Returns [`EngineError::InvalidInput`] when the rate has to be derived and
/// either divisor is not positive, or the division overflows.
pub fn overtime_hourly_rate(group: &SalaryGroup) -> EngineResult<Decimal> {
    if let Some(rate) = group.overtime.hourly_rate {
        return Ok(rate);
    }
    let standard_days = group.proration.standard_days;
    let hours_per_day = group.overtime.hours_per_day;
    if standard_days <= Decimal::ZERO || hours_per_day <= Decimal::ZERO {
        return Err(EngineError::invalid_input(format!(
            "salary group '{}' cannot derive an hourly rate from {} days of {} hours",
            group.group_id, standard_days, hours_per_day
        )));
    }
    let what = format!("hourly rate of salary group '{}'", group.group_id);
    let daily = checked_div(group.base_salary, standard_days, &what)?;
    checked_div(daily, hours_per_day, &what)
}

/// Calculates overtime pay: `hours x hourly_rate x multiplier`.
///
/// # Errors
///
/// Returns [`EngineError::InvalidInput`] for negative overtime hours, when
/// the hourly rate cannot be derived, or when the pay overflows.
pub fn calculate_overtime_pay(
    group: &SalaryGroup,
    attendance: &AttendanceRecord,
    scale: u32,
    step_number: u32,
) -> EngineResult<OvertimePayResult> {
    let hours = attendance.overtime_hours;
    if hours < Decimal::ZERO {
        return Err(EngineError::invalid_input(format!(
            "overtime hours for '{}' are negative: {}",
            attendance.emp_id, hours
        )));
    }

    let hourly_rate = overtime_hourly_rate(group)?;
    let multiplier = group.overtime.multiplier;
    let what = format!("overtime pay for '{}'", attendance.emp_id);
    let amount = round_amount(
        checked_mul(checked_mul(hours, hourly_rate, &what)?, multiplier, &what)?,
        scale,
    );
    let shown_rate = round_amount(hourly_rate, 4).normalize();

    let audit_step = AuditStep {
        step_number,
        rule_id: "overtime_pay".to_string(),
        rule_name: "Overtime Pay".to_string(),
        input: serde_json::json!({
            "overtime_hours": hours.normalize().to_string(),
            "hourly_rate": shown_rate.to_string(),
            "explicit_rate": group.overtime.hourly_rate.is_some(),
            "multiplier": multiplier.normalize().to_string(),
        }),
        output: serde_json::json!({
            "amount": amount.to_string(),
        }),
        reasoning: format!(
            "{}h x {} x {} = {}",
            hours.normalize(),
            shown_rate,
            multiplier.normalize(),
            amount
        ),
    };

    Ok(OvertimePayResult {
        amount,
        hourly_rate,
        audit_step,
    })
}
