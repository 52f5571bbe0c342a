//! Calculation logic for the payroll engine.
//!
//! This module contains the progressive tax table, the salary formula
//! engine, the per-component salary rules (base salary proration,
//! performance pay, overtime pay, social security), the per-employee salary
//! pipeline and whole-period payroll runs.

mod base_salary;
mod formula;
mod money;
mod overtime_pay;
mod payroll_run;
mod performance_pay;
mod salary;
mod social_security;
mod tax;

pub use base_salary::{BaseSalaryResult, calculate_base_salary};
pub use formula::{
    ComponentValues, Formula, MAX_FORMULA_NESTING, MAX_FORMULA_TOKENS, Operator, Token, evaluate,
    tokenize, validate_formula,
};
pub use money::{DEFAULT_AMOUNT_SCALE, round_amount};
pub use overtime_pay::{OvertimePayResult, calculate_overtime_pay, overtime_hourly_rate};
pub use payroll_run::PayrollRunSummary;
pub use performance_pay::{MISSING_PERFORMANCE, PerformancePayResult, calculate_performance_pay};
pub use salary::{
    Clock, FixedClock, NEGATIVE_TAXABLE_INCOME, SalaryComputer, SalaryInputs, SystemClock,
};
pub use social_security::{SocialSecurityResult, calculate_social_security};
pub use tax::{TaxBracket, TaxResult, TaxSlice, TaxTable};
