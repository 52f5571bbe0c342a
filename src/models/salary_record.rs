//! Salary computation output models.
//!
//! This module contains the [`SalaryRecord`] produced by a salary computation,
//! the [`SalaryComponent`] vocabulary shared with the formula engine, and the
//! audit structures that document every computation step.

use std::fmt;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::Period;

/// A named salary component that formulas may refer to.
///
/// # Example
///
/// ```
/// use payroll_engine::models::SalaryComponent;
///
/// assert_eq!(SalaryComponent::BaseSalary.keyword(), "基本工资");
/// assert_eq!(SalaryComponent::from_keyword("overtime pay"), Some(SalaryComponent::OvertimePay));
/// assert_eq!(SalaryComponent::from_keyword("基本工资X"), None);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SalaryComponent {
    /// Prorated base salary.
    BaseSalary,
    /// Performance pay.
    PerformancePay,
    /// Overtime pay.
    OvertimePay,
    /// Personal social-security contribution.
    SocialSecurity,
    /// Individual income tax.
    IndividualTax,
}

impl SalaryComponent {
    /// All components in pipeline order.
    pub const ALL: [SalaryComponent; 5] = [
        SalaryComponent::BaseSalary,
        SalaryComponent::PerformancePay,
        SalaryComponent::OvertimePay,
        SalaryComponent::SocialSecurity,
        SalaryComponent::IndividualTax,
    ];

    /// The canonical formula keyword.
    pub fn keyword(&self) -> &'static str {
        self.spellings()[0]
    }

    /// Every accepted spelling of this component in a formula.
    pub fn spellings(&self) -> &'static [&'static str] {
        match self {
            SalaryComponent::BaseSalary => &["基本工资", "base_salary", "base salary"],
            SalaryComponent::PerformancePay => &["绩效工资", "performance_pay", "performance pay"],
            SalaryComponent::OvertimePay => &["加班工资", "overtime_pay", "overtime pay"],
            SalaryComponent::SocialSecurity => &["社保", "social_security", "social security"],
            SalaryComponent::IndividualTax => &["个税", "individual_tax", "individual tax"],
        }
    }

    /// Looks up a component by an exact spelling.
    pub fn from_keyword(word: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|component| component.spellings().contains(&word))
    }
}

impl fmt::Display for SalaryComponent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.spellings()[1])
    }
}

/// A single step in the audit trace recording a calculation decision.
///
/// Each step captures the input, output, and reasoning for a rule application.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditStep {
    /// The sequential step number.
    pub step_number: u32,
    /// The unique identifier of the rule that was applied.
    pub rule_id: String,
    /// The human-readable name of the rule.
    pub rule_name: String,
    /// The input data for this step.
    pub input: serde_json::Value,
    /// The output data from this step.
    pub output: serde_json::Value,
    /// Human-readable explanation of the decision.
    pub reasoning: String,
}

/// A warning generated during calculation.
///
/// Warnings indicate conditions that don't prevent calculation
/// but may require attention.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditWarning {
    /// A code identifying the type of warning.
    pub code: String,
    /// A human-readable description of the warning.
    pub message: String,
    /// The severity level (e.g., "low", "medium", "high").
    pub severity: String,
}

/// The persisted result of computing one employee's salary for one period.
///
/// Records are never edited in place. A rerun for the same `(emp_id, period)`
/// is committed with a higher `revision` and supersedes the earlier one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SalaryRecord {
    /// Employee id.
    pub emp_id: String,
    /// The payroll period.
    pub period: Period,
    /// Revision assigned by the store on commit; 0 before commit.
    pub revision: u32,
    /// Prorated base salary.
    pub base_salary: Decimal,
    /// Performance pay.
    pub performance_pay: Decimal,
    /// Overtime pay.
    pub overtime_pay: Decimal,
    /// Personal social-security contribution.
    pub social_security: Decimal,
    /// `base + performance + overtime - social_security`.
    pub taxable_income: Decimal,
    /// Individual income tax.
    pub tax: Decimal,
    /// `taxable_income - tax`.
    pub net_salary: Decimal,
    /// The salary group's formula evaluated over the components.
    pub formula_value: Decimal,
    /// When the record was computed.
    pub computed_at: DateTime<Utc>,
    /// Every computation step, in order.
    pub audit_steps: Vec<AuditStep>,
    /// Warnings raised during computation.
    #[serde(default)]
    pub warnings: Vec<AuditWarning>,
}

impl SalaryRecord {
    /// Returns the value of a component as recorded.
    pub fn component(&self, component: SalaryComponent) -> Decimal {
        match component {
            SalaryComponent::BaseSalary => self.base_salary,
            SalaryComponent::PerformancePay => self.performance_pay,
            SalaryComponent::OvertimePay => self.overtime_pay,
            SalaryComponent::SocialSecurity => self.social_security,
            SalaryComponent::IndividualTax => self.tax,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    fn create_sample_record() -> SalaryRecord {
        SalaryRecord {
            emp_id: "001".to_string(),
            period: "2024-03".parse().unwrap(),
            revision: 1,
            base_salary: dec("6000.00"),
            performance_pay: dec("1800.00"),
            overtime_pay: dec("413.79"),
            social_security: dec("525.00"),
            taxable_income: dec("7688.79"),
            tax: dec("558.88"),
            net_salary: dec("7129.91"),
            formula_value: dec("7688.79"),
            computed_at: DateTime::parse_from_rfc3339("2024-04-01T08:00:00Z")
                .unwrap()
                .with_timezone(&Utc),
            audit_steps: vec![],
            warnings: vec![],
        }
    }

    #[test]
    fn test_keywords_are_collision_free() {
        let mut seen = std::collections::HashSet::new();
        for component in SalaryComponent::ALL {
            for spelling in component.spellings() {
                assert!(seen.insert(*spelling), "duplicate spelling {}", spelling);
            }
        }
    }

    #[test]
    fn test_from_keyword_requires_exact_match() {
        assert_eq!(
            SalaryComponent::from_keyword("社保"),
            Some(SalaryComponent::SocialSecurity)
        );
        assert_eq!(
            SalaryComponent::from_keyword("individual_tax"),
            Some(SalaryComponent::IndividualTax)
        );
        assert_eq!(SalaryComponent::from_keyword("社保费"), None);
        assert_eq!(SalaryComponent::from_keyword("Base Salary"), None);
    }

    #[test]
    fn test_component_accessor() {
        let record = create_sample_record();
        assert_eq!(record.component(SalaryComponent::BaseSalary), dec("6000.00"));
        assert_eq!(record.component(SalaryComponent::IndividualTax), dec("558.88"));
    }

    #[test]
    fn test_serialize_salary_record() {
        let record = create_sample_record();
        let json = serde_json::to_string(&record).unwrap();
        assert!(json.contains("\"emp_id\":\"001\""));
        assert!(json.contains("\"period\":\"2024-03\""));
        assert!(json.contains("\"net_salary\":\"7129.91\""));

        let back: SalaryRecord = serde_json::from_str(&json).unwrap();
        assert_eq!(back, record);
    }
}
