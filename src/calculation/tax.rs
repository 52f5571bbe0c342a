//! Progressive income tax calculation.
//!
//! This module provides the [`TaxTable`] type, an ordered set of marginal
//! brackets, and computes tax by taxing each slice of income at the rate of
//! the bracket it falls in.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::{EngineError, EngineResult};
use crate::models::AuditStep;

use super::money::{checked_mul, checked_sum};

/// A contiguous income range taxed at its own marginal rate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaxBracket {
    /// Lower bound of the bracket (exclusive for taxation).
    pub lower: Decimal,
    /// Upper bound of the bracket; `None` for the unbounded top bracket.
    pub upper: Option<Decimal>,
    /// Marginal rate as a fraction (e.g. 0.10 for 10%).
    pub rate: Decimal,
}

impl TaxBracket {
    /// Creates a bounded bracket.
    pub fn bounded(lower: Decimal, upper: Decimal, rate: Decimal) -> Self {
        Self {
            lower,
            upper: Some(upper),
            rate,
        }
    }

    /// Creates the unbounded top bracket.
    pub fn unbounded(lower: Decimal, rate: Decimal) -> Self {
        Self {
            lower,
            upper: None,
            rate,
        }
    }

    /// Returns the part of `income` that falls inside this bracket.
    fn slice_of(&self, income: Decimal) -> Decimal {
        if income <= self.lower {
            return Decimal::ZERO;
        }
        let above_lower = income - self.lower;
        match self.upper {
            Some(upper) => above_lower.min(upper - self.lower),
            None => above_lower,
        }
    }
}

/// One bracket's contribution to a tax computation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaxSlice {
    /// Lower bound of the bracket.
    pub lower: Decimal,
    /// Upper bound of the bracket, if bounded.
    pub upper: Option<Decimal>,
    /// Income taxed in this bracket.
    pub taxable: Decimal,
    /// The bracket's rate.
    pub rate: Decimal,
    /// `taxable * rate`.
    pub tax: Decimal,
}

/// The result of a tax computation, including per-bracket slices and audit step.
#[derive(Debug, Clone)]
pub struct TaxResult {
    /// Total tax.
    pub tax: Decimal,
    /// Contribution of every bracket the income reached.
    pub slices: Vec<TaxSlice>,
    /// The audit step recording this computation.
    pub audit_step: AuditStep,
}

/// An ordered, validated table of progressive tax brackets.
///
/// Construction enforces the table invariants: at least one bracket, the
/// first `lower` is zero, every bracket's `lower` equals the previous
/// bracket's `upper`, only the last bracket is unbounded, every bracket is
/// non-empty, and rates lie in `[0, 1]` and never decrease.
///
/// # Example
///
/// ```
/// use payroll_engine::calculation::TaxTable;
/// use rust_decimal::Decimal;
///
/// let table = TaxTable::default();
/// assert_eq!(table.compute_tax(Decimal::from(5000)).unwrap(), Decimal::from(290));
/// assert_eq!(table.compute_tax(Decimal::from(100000)).unwrap(), Decimal::from(29840));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TaxTable {
    brackets: Vec<TaxBracket>,
}

impl TaxTable {
    /// Creates a table after checking the bracket invariants.
    pub fn new(brackets: Vec<TaxBracket>) -> EngineResult<Self> {
        let Some(first) = brackets.first() else {
            return Err(EngineError::invalid_input("tax table has no brackets"));
        };
        if !first.lower.is_zero() {
            return Err(EngineError::invalid_input(format!(
                "first tax bracket must start at 0, starts at {}",
                first.lower
            )));
        }

        let last_index = brackets.len() - 1;
        for (index, bracket) in brackets.iter().enumerate() {
            if bracket.rate < Decimal::ZERO || bracket.rate > Decimal::ONE {
                return Err(EngineError::invalid_input(format!(
                    "tax bracket {} has rate {} outside [0, 1]",
                    index, bracket.rate
                )));
            }
            match bracket.upper {
                Some(upper) if upper <= bracket.lower => {
                    return Err(EngineError::invalid_input(format!(
                        "tax bracket {} is empty: {} to {}",
                        index, bracket.lower, upper
                    )));
                }
                None if index != last_index => {
                    return Err(EngineError::invalid_input(format!(
                        "only the last tax bracket may be unbounded, bracket {} is",
                        index
                    )));
                }
                Some(_) if index == last_index => {
                    return Err(EngineError::invalid_input(
                        "last tax bracket must be unbounded",
                    ));
                }
                _ => {}
            }
            if index > 0 {
                let previous = &brackets[index - 1];
                if previous.upper != Some(bracket.lower) {
                    return Err(EngineError::invalid_input(format!(
                        "tax bracket {} starts at {} but the previous bracket ends at {:?}",
                        index, bracket.lower, previous.upper
                    )));
                }
                if bracket.rate < previous.rate {
                    return Err(EngineError::invalid_input(format!(
                        "tax bracket {} rate {} is lower than the previous rate {}",
                        index, bracket.rate, previous.rate
                    )));
                }
            }
        }

        Ok(Self { brackets })
    }

    /// Returns the brackets in ascending order.
    pub fn brackets(&self) -> &[TaxBracket] {
        &self.brackets
    }

    /// Computes progressive tax on `taxable_income`.
    ///
    /// Returns `InvalidInput` for negative income; callers that want a floor
    /// at zero must apply it explicitly.
    pub fn compute_tax(&self, taxable_income: Decimal) -> EngineResult<Decimal> {
        checked_sum(self.slices(taxable_income)?.iter().map(|s| s.tax), "tax")
    }

    /// Computes tax and records an audit step listing every bracket slice.
    pub fn compute_tax_with_audit(
        &self,
        taxable_income: Decimal,
        step_number: u32,
    ) -> EngineResult<TaxResult> {
        let slices = self.slices(taxable_income)?;
        let tax = checked_sum(slices.iter().map(|s| s.tax), "tax")?;

        let breakdown: Vec<String> = slices
            .iter()
            .map(|s| format!("{}@{}", s.taxable.normalize(), s.rate.normalize()))
            .collect();
        let audit_step = AuditStep {
            step_number,
            rule_id: "progressive_tax".to_string(),
            rule_name: "Progressive Income Tax".to_string(),
            input: serde_json::json!({
                "taxable_income": taxable_income.to_string(),
                "brackets": self.brackets.len()
            }),
            output: serde_json::json!({
                "tax": tax.normalize().to_string(),
                "slices": slices.iter().map(|s| serde_json::json!({
                    "lower": s.lower.to_string(),
                    "upper": s.upper.map(|u| u.to_string()),
                    "taxable": s.taxable.normalize().to_string(),
                    "rate": s.rate.normalize().to_string(),
                    "tax": s.tax.normalize().to_string()
                })).collect::<Vec<_>>()
            }),
            reasoning: if breakdown.is_empty() {
                "No taxable income".to_string()
            } else {
                format!("{} = {}", breakdown.join(" + "), tax.normalize())
            },
        };

        Ok(TaxResult {
            tax,
            slices,
            audit_step,
        })
    }

    fn slices(&self, taxable_income: Decimal) -> EngineResult<Vec<TaxSlice>> {
        if taxable_income.is_sign_negative() && !taxable_income.is_zero() {
            return Err(EngineError::invalid_input(format!(
                "taxable income {} is negative",
                taxable_income
            )));
        }

        self.brackets
            .iter()
            .filter(|b| taxable_income > b.lower)
            .map(|b| {
                let taxable = b.slice_of(taxable_income);
                Ok(TaxSlice {
                    lower: b.lower,
                    upper: b.upper,
                    taxable,
                    rate: b.rate,
                    tax: checked_mul(taxable, b.rate, "bracket tax")?,
                })
            })
            .collect()
    }
}

impl Default for TaxTable {
    /// The seven-bracket table: 3%, 10%, 20%, 25%, 30%, 35%, 45%.
    fn default() -> Self {
        let bound = |lower: i64, upper: i64, rate_pct: i64| {
            TaxBracket::bounded(
                Decimal::from(lower),
                Decimal::from(upper),
                Decimal::new(rate_pct, 2),
            )
        };
        Self {
            brackets: vec![
                bound(0, 3000, 3),
                bound(3000, 12000, 10),
                bound(12000, 25000, 20),
                bound(25000, 35000, 25),
                bound(35000, 55000, 30),
                bound(55000, 80000, 35),
                TaxBracket::unbounded(Decimal::from(80000), Decimal::new(45, 2)),
            ],
        }
    }
}
