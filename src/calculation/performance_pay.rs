//! Performance pay calculation.
//!
//! Applies a salary group's [`PerformanceRule`] to the employee's score for
//! the period. A missing score is not an error: the pay is zero and a warning
//! is attached to the result.

use rust_decimal::Decimal;

use crate::error::{EngineError, EngineResult};
use crate::models::{AuditStep, AuditWarning, PerformanceRecord, PerformanceRule};

use super::money::{checked_div, checked_mul, round_amount};

/// Warning code attached when no performance record exists for the period.
pub const MISSING_PERFORMANCE: &str = "MISSING_PERFORMANCE";

/// The result of the performance pay calculation.
#[derive(Debug, Clone)]
pub struct PerformancePayResult {
    /// The rounded performance pay.
    pub amount: Decimal,
    /// The audit step recording this calculation.
    pub audit_step: AuditStep,
    /// Set when the rule needed a score that was not recorded.
    pub warning: Option<AuditWarning>,
}

fn rule_name(rule: &PerformanceRule) -> &'static str {
    match rule {
        PerformanceRule::None => "none",
        PerformanceRule::Fixed { .. } => "fixed",
        PerformanceRule::ScoreRatio { .. } => "score_ratio",
        PerformanceRule::Tiered { .. } => "tiered",
    }
}

/// Calculates performance pay for one employee.
///
/// # Errors
///
/// Returns [`EngineError::InvalidInput`] if a score-ratio rule has a
/// non-positive full score or the pay overflows.
///
/// # Examples
///
/// ```
/// use payroll_engine::calculation::calculate_performance_pay;
/// use payroll_engine::models::{PerformanceRecord, PerformanceRule};
/// use rust_decimal::Decimal;
///
/// let rule = PerformanceRule::ScoreRatio {
///     target_amount: Decimal::from(2000),
///     full_score: Decimal::from(100),
/// };
/// let record = PerformanceRecord {
///     emp_id: "001".to_string(),
///     period: "2024-03".parse().unwrap(),
///     score: Decimal::from(90),
/// };
///
/// let result = calculate_performance_pay(&rule, Some(&record), 2, 2).unwrap();
/// assert_eq!(result.amount, Decimal::from(1800));
/// assert!(result.warning.is_none());
/// ```
pub fn calculate_performance_pay(
    rule: &PerformanceRule,
    performance: Option<&PerformanceRecord>,
    scale: u32,
    step_number: u32,
) -> EngineResult<PerformancePayResult> {
    let score = performance.map(|record| record.score);
    let what = match performance {
        Some(record) => format!("performance pay for '{}'", record.emp_id),
        None => "performance pay".to_string(),
    };
    let mut warning = None;

    let (raw, reasoning) = match (rule, score) {
        (PerformanceRule::None, _) => (Decimal::ZERO, "no performance rule".to_string()),
        (PerformanceRule::Fixed { amount }, _) => {
            (*amount, format!("fixed amount {}", amount.normalize()))
        }
        (PerformanceRule::ScoreRatio { full_score, .. }, _) if *full_score <= Decimal::ZERO => {
            return Err(EngineError::invalid_input(format!(
                "performance full score must be positive, got {}",
                full_score
            )));
        }
        (PerformanceRule::ScoreRatio { .. } | PerformanceRule::Tiered { .. }, None) => {
            warning = Some(AuditWarning {
                code: MISSING_PERFORMANCE.to_string(),
                message: "No performance score recorded for the period; performance pay is 0"
                    .to_string(),
                severity: "medium".to_string(),
            });
            (Decimal::ZERO, "no performance score recorded".to_string())
        }
        (
            PerformanceRule::ScoreRatio {
                target_amount,
                full_score,
            },
            Some(score),
        ) => (
            checked_div(checked_mul(*target_amount, score, &what)?, *full_score, &what)?,
            format!(
                "{} x {} / {}",
                target_amount.normalize(),
                score.normalize(),
                full_score.normalize()
            ),
        ),
        (
            PerformanceRule::Tiered {
                target_amount,
                tiers,
            },
            Some(score),
        ) => {
            let reached = tiers
                .iter()
                .filter(|tier| score >= tier.min_score)
                .max_by(|a, b| a.min_score.cmp(&b.min_score));
            match reached {
                Some(tier) => (
                    checked_mul(*target_amount, tier.coefficient, &what)?,
                    format!(
                        "score {} reaches tier {}: {} x {}",
                        score.normalize(),
                        tier.min_score.normalize(),
                        target_amount.normalize(),
                        tier.coefficient.normalize()
                    ),
                ),
                None => (
                    Decimal::ZERO,
                    format!("score {} reaches no tier", score.normalize()),
                ),
            }
        }
    };

    let amount = round_amount(raw, scale);
    let audit_step = AuditStep {
        step_number,
        rule_id: "performance_pay".to_string(),
        rule_name: "Performance Pay".to_string(),
        input: serde_json::json!({
            "rule": rule_name(rule),
            "score": score.map(|s| s.normalize().to_string()),
        }),
        output: serde_json::json!({
            "amount": amount.to_string(),
        }),
        reasoning: format!("{} = {}", reasoning, amount),
    };

    Ok(PerformancePayResult {
        amount,
        audit_step,
        warning,
    })
}
