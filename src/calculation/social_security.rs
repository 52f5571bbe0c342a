//! Social-security contribution calculation.
//!
//! The personal contribution is deducted before tax; the employer
//! contribution is reported in the audit trail only.

use rust_decimal::Decimal;

use crate::error::{EngineError, EngineResult};
use crate::models::{AuditStep, SocialSecurityScheme};

use super::money::{checked_mul, round_amount};

/// The result of the social-security calculation.
#[derive(Debug, Clone)]
pub struct SocialSecurityResult {
    /// The rounded personal contribution.
    pub amount: Decimal,
    /// The rounded employer contribution.
    pub employer_amount: Decimal,
    /// The audit step recording this calculation.
    pub audit_step: AuditStep,
}

/// Calculates `base_amount x sum(personal rates)` for a scheme.
///
/// # Errors
///
/// Returns [`EngineError::InvalidInput`] when a rate sum or a contribution
/// overflows.
///
/// # Examples
///
/// ```
/// use payroll_engine::calculation::calculate_social_security;
/// use payroll_engine::models::{ContributionItem, SocialSecurityScheme};
/// use rust_decimal::Decimal;
/// use std::str::FromStr;
///
/// let scheme = SocialSecurityScheme {
///     location: None,
///     base_amount: Decimal::from(5000),
///     items: vec![ContributionItem {
///         name: "养老保险".to_string(),
///         personal_rate: Decimal::from_str("0.08").unwrap(),
///         employer_rate: Decimal::from_str("0.16").unwrap(),
///     }],
/// };
///
/// let result = calculate_social_security(&scheme, 2, 4).unwrap();
/// assert_eq!(result.amount, Decimal::from(400));
/// assert_eq!(result.employer_amount, Decimal::from(800));
/// ```
pub fn calculate_social_security(
    scheme: &SocialSecurityScheme,
    scale: u32,
    step_number: u32,
) -> EngineResult<SocialSecurityResult> {
    let rates_out_of_range = || EngineError::invalid_input("social-security rate sum is out of range");
    let personal_rate = scheme.personal_rate().ok_or_else(rates_out_of_range)?;
    let employer_rate = scheme.employer_rate().ok_or_else(rates_out_of_range)?;
    let amount = round_amount(
        checked_mul(scheme.base_amount, personal_rate, "personal social-security contribution")?,
        scale,
    );
    let employer_amount = round_amount(
        checked_mul(scheme.base_amount, employer_rate, "employer social-security contribution")?,
        scale,
    );

    let items: Vec<serde_json::Value> = scheme
        .items
        .iter()
        .map(|item| {
            serde_json::json!({
                "name": item.name,
                "personal_rate": item.personal_rate.normalize().to_string(),
                "employer_rate": item.employer_rate.normalize().to_string(),
            })
        })
        .collect();

    let audit_step = AuditStep {
        step_number,
        rule_id: "social_security".to_string(),
        rule_name: "Social Security Contribution".to_string(),
        input: serde_json::json!({
            "location": scheme.location,
            "base_amount": scheme.base_amount.normalize().to_string(),
            "items": items,
        }),
        output: serde_json::json!({
            "personal_amount": amount.to_string(),
            "employer_amount": employer_amount.to_string(),
        }),
        reasoning: format!(
            "{} x {} = {}",
            scheme.base_amount.normalize(),
            personal_rate.normalize(),
            amount
        ),
    };

    Ok(SocialSecurityResult {
        amount,
        employer_amount,
        audit_step,
    })
}
