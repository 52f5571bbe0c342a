//! Period records created by confirmed imports.
//!
//! Attendance and performance records are unique per `(emp_id, period)`;
//! reward/punishment records may repeat.

use std::fmt;
use std::str::FromStr;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::Period;

/// The kind of periodic import a batch belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ImportKind {
    /// Monthly attendance days and overtime hours.
    Attendance,
    /// Monthly performance scores.
    Performance,
    /// Rewards and punishments with amounts and reasons.
    RewardPunishment,
}

impl ImportKind {
    /// All import kinds.
    pub const ALL: [ImportKind; 3] = [
        ImportKind::Attendance,
        ImportKind::Performance,
        ImportKind::RewardPunishment,
    ];

    /// Returns true if records of this kind are unique per `(emp_id, period)`.
    pub fn is_unique_per_period(&self) -> bool {
        !matches!(self, ImportKind::RewardPunishment)
    }

    /// Returns true if imports of this kind are checked for cohort changes
    /// against the prior period.
    pub fn tracks_cohort(&self) -> bool {
        self.is_unique_per_period()
    }
}

impl fmt::Display for ImportKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ImportKind::Attendance => "attendance",
            ImportKind::Performance => "performance",
            ImportKind::RewardPunishment => "reward/punishment",
        };
        write!(f, "{}", name)
    }
}

/// Attendance for one employee in one period.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttendanceRecord {
    /// Employee id.
    pub emp_id: String,
    /// The period.
    pub period: Period,
    /// Days attended.
    pub attendance_days: Decimal,
    /// Overtime hours worked.
    pub overtime_hours: Decimal,
}

/// Performance score for one employee in one period.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PerformanceRecord {
    /// Employee id.
    pub emp_id: String,
    /// The period.
    pub period: Period,
    /// The performance score.
    pub score: Decimal,
}

/// Whether a reward/punishment row adds to or deducts from pay.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RewardKind {
    /// A reward.
    Reward,
    /// A punishment.
    Punishment,
}

impl RewardKind {
    /// Returns the amount with the sign this kind implies.
    pub fn signed(&self, amount: Decimal) -> Decimal {
        match self {
            RewardKind::Reward => amount.abs(),
            RewardKind::Punishment => -amount.abs(),
        }
    }
}

impl FromStr for RewardKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "奖励" => Ok(RewardKind::Reward),
            "惩罚" => Ok(RewardKind::Punishment),
            other if other.eq_ignore_ascii_case("reward") => Ok(RewardKind::Reward),
            other if other.eq_ignore_ascii_case("punishment") => Ok(RewardKind::Punishment),
            other => Err(other.to_string()),
        }
    }
}

/// A reward or punishment for one employee in one period.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RewardPunishmentRecord {
    /// Employee id.
    pub emp_id: String,
    /// Name as uploaded.
    pub name: String,
    /// The period.
    pub period: Period,
    /// Reward or punishment.
    pub kind: RewardKind,
    /// The amount, always recorded as uploaded.
    pub amount: Decimal,
    /// Free-text reason.
    pub reason: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reward_kind_parses_both_vocabularies() {
        assert_eq!("奖励".parse::<RewardKind>(), Ok(RewardKind::Reward));
        assert_eq!(" 惩罚 ".parse::<RewardKind>(), Ok(RewardKind::Punishment));
        assert_eq!("Reward".parse::<RewardKind>(), Ok(RewardKind::Reward));
        assert_eq!("PUNISHMENT".parse::<RewardKind>(), Ok(RewardKind::Punishment));
        assert_eq!("bonus".parse::<RewardKind>(), Err("bonus".to_string()));
    }

    #[test]
    fn test_reward_kind_signed_amount() {
        let amount = Decimal::new(20000, 2);
        assert_eq!(RewardKind::Reward.signed(amount), amount);
        assert_eq!(RewardKind::Punishment.signed(amount), -amount);
        assert_eq!(RewardKind::Punishment.signed(-amount), -amount);
    }

    #[test]
    fn test_import_kind_uniqueness() {
        assert!(ImportKind::Attendance.is_unique_per_period());
        assert!(ImportKind::Performance.is_unique_per_period());
        assert!(!ImportKind::RewardPunishment.is_unique_per_period());
        assert!(!ImportKind::RewardPunishment.tracks_cohort());
    }

    #[test]
    fn test_import_kind_serialization() {
        assert_eq!(
            serde_json::to_string(&ImportKind::RewardPunishment).unwrap(),
            "\"reward_punishment\""
        );
        assert_eq!(ImportKind::RewardPunishment.to_string(), "reward/punishment");
    }
}
