//! Salary group configuration.
//!
//! A [`SalaryGroup`] is a reusable definition of base pay, attendance
//! proration, performance rule, overtime rule, social-security scheme and the
//! composition formula. Employees reference a group by id.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// How base salary is prorated against attendance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProrationRule {
    /// Number of attendance days that earn the full base salary.
    #[serde(default = "default_standard_days")]
    pub standard_days: Decimal,
    /// Whether attendance beyond `standard_days` is capped.
    #[serde(default = "default_true")]
    pub cap_at_standard: bool,
}

impl Default for ProrationRule {
    fn default() -> Self {
        Self {
            standard_days: default_standard_days(),
            cap_at_standard: true,
        }
    }
}

/// One tier of a tiered performance rule.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PerformanceTier {
    /// Lowest score (inclusive) that reaches this tier.
    pub min_score: Decimal,
    /// Fraction of the target amount paid in this tier.
    pub coefficient: Decimal,
}

/// The structured rule turning a performance score into performance pay.
///
/// # Example
///
/// ```
/// use payroll_engine::models::PerformanceRule;
///
/// let rule: PerformanceRule = serde_json::from_str(
///     r#"{"type": "score_ratio", "target_amount": "2000", "full_score": "100"}"#,
/// ).unwrap();
/// assert!(matches!(rule, PerformanceRule::ScoreRatio { .. }));
/// ```
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PerformanceRule {
    /// No performance pay.
    #[default]
    None,
    /// A fixed amount regardless of score.
    Fixed {
        /// The amount paid.
        amount: Decimal,
    },
    /// `target_amount * score / full_score`.
    ScoreRatio {
        /// Amount paid at the full score.
        target_amount: Decimal,
        /// The score that earns the full target amount.
        full_score: Decimal,
    },
    /// `target_amount * coefficient` of the highest tier whose `min_score` is reached.
    Tiered {
        /// Amount paid at coefficient 1.
        target_amount: Decimal,
        /// Tiers in any order; the highest reached `min_score` wins.
        tiers: Vec<PerformanceTier>,
    },
}

/// How overtime hours are paid.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OvertimeRule {
    /// Multiplier applied to the hourly rate.
    #[serde(default = "default_overtime_multiplier")]
    pub multiplier: Decimal,
    /// Explicit hourly rate; derived from the base salary when absent.
    #[serde(default)]
    pub hourly_rate: Option<Decimal>,
    /// Working hours per standard day, used to derive the hourly rate.
    #[serde(default = "default_hours_per_day")]
    pub hours_per_day: Decimal,
}

impl Default for OvertimeRule {
    fn default() -> Self {
        Self {
            multiplier: default_overtime_multiplier(),
            hourly_rate: None,
            hours_per_day: default_hours_per_day(),
        }
    }
}

/// A single social-insurance contribution (pension, medical, ...).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContributionItem {
    /// Item name, e.g. "养老保险".
    pub name: String,
    /// Fraction of the base deducted from the employee.
    pub personal_rate: Decimal,
    /// Fraction of the base paid by the employer.
    #[serde(default)]
    pub employer_rate: Decimal,
}

/// The social-security base amount and contribution items of a salary group.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct SocialSecurityScheme {
    /// Where contributions are paid.
    #[serde(default)]
    pub location: Option<String>,
    /// The contribution base amount.
    pub base_amount: Decimal,
    /// Contribution items.
    #[serde(default)]
    pub items: Vec<ContributionItem>,
}

impl SocialSecurityScheme {
    /// Sum of the personal contribution rates; `None` on overflow.
    pub fn personal_rate(&self) -> Option<Decimal> {
        self.items
            .iter()
            .try_fold(Decimal::ZERO, |total, item| total.checked_add(item.personal_rate))
    }

    /// Sum of the employer contribution rates; `None` on overflow.
    pub fn employer_rate(&self) -> Option<Decimal> {
        self.items
            .iter()
            .try_fold(Decimal::ZERO, |total, item| total.checked_add(item.employer_rate))
    }
}

/// A reusable salary configuration shared by multiple employees.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SalaryGroup {
    /// Unique group id.
    pub group_id: String,
    /// Human-readable name.
    pub group_name: String,
    /// Monthly base salary before proration.
    pub base_salary: Decimal,
    /// Attendance proration.
    #[serde(default)]
    pub proration: ProrationRule,
    /// Performance rule.
    #[serde(default)]
    pub performance_rule: PerformanceRule,
    /// Overtime rule.
    #[serde(default)]
    pub overtime: OvertimeRule,
    /// Social-security scheme.
    #[serde(default)]
    pub social_security: SocialSecurityScheme,
    /// Composition formula over the salary components.
    pub formula: String,
}

fn default_standard_days() -> Decimal {
    Decimal::new(2175, 2)
}

fn default_overtime_multiplier() -> Decimal {
    Decimal::new(15, 1)
}

fn default_hours_per_day() -> Decimal {
    Decimal::from(8)
}

fn default_true() -> bool {
    true
}
