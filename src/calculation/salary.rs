//! The per-employee salary computation pipeline.
//!
//! [`SalaryComputer`] loads an employee's inputs from a store, applies the
//! component rules of their salary group, taxes the result and commits a
//! [`SalaryRecord`] inside one transaction.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use tracing::{debug, info, warn};

use crate::config::{EngineSettings, NegativeIncomePolicy};
use crate::error::{EngineError, EngineResult, MissingDependency};
use crate::models::{
    AttendanceRecord, AuditStep, AuditWarning, Employee, PerformanceRecord, Period,
    SalaryComponent, SalaryGroup, SalaryRecord,
};
use crate::store::{in_transaction, PersistenceStore};

use super::base_salary::calculate_base_salary;
use super::formula::{ComponentValues, Formula};
use super::money::{checked_sum, round_amount};
use super::overtime_pay::calculate_overtime_pay;
use super::performance_pay::calculate_performance_pay;
use super::social_security::calculate_social_security;
use super::tax::TaxTable;

/// Warning code attached when negative taxable income was floored for tax.
pub const NEGATIVE_TAXABLE_INCOME: &str = "NEGATIVE_TAXABLE_INCOME";

/// The source of computation timestamps.
pub trait Clock: Send + Sync {
    /// Returns the current time.
    fn now(&self) -> DateTime<Utc>;
}

/// A [`Clock`] reading the system time.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// A [`Clock`] that always returns the same instant.
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub DateTime<Utc>);

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        self.0
    }
}

/// Everything a salary computation reads from the store.
#[derive(Debug, Clone, PartialEq)]
pub struct SalaryInputs {
    /// The employee.
    pub employee: Employee,
    /// The employee's salary group.
    pub group: SalaryGroup,
    /// Attendance for the period.
    pub attendance: AttendanceRecord,
    /// Performance for the period, if recorded.
    pub performance: Option<PerformanceRecord>,
}

/// Computes and persists salary records.
///
/// # Example
///
/// ```
/// use payroll_engine::calculation::{SalaryComputer, SalaryInputs, TaxTable};
/// use payroll_engine::config::EngineSettings;
/// use payroll_engine::models::{AttendanceRecord, Employee, EmploymentType, EmployeeStatus, SalaryGroup};
/// use chrono::NaiveDate;
/// use rust_decimal::Decimal;
///
/// let group: SalaryGroup = serde_json::from_str(
///     r#"{"group_id": "G1", "group_name": "行政", "base_salary": "5000",
///         "proration": {"standard_days": "20"}, "formula": "基本工资 - 个税"}"#,
/// ).unwrap();
/// let inputs = SalaryInputs {
///     employee: Employee {
///         emp_id: "001".to_string(),
///         name: "张三".to_string(),
///         national_id: None,
///         hire_date: NaiveDate::from_ymd_opt(2023, 6, 1).unwrap(),
///         employment_type: EmploymentType::FullTime,
///         status: EmployeeStatus::Active,
///         salary_group: "G1".to_string(),
///         department: None,
///         position: None,
///     },
///     group,
///     attendance: AttendanceRecord {
///         emp_id: "001".to_string(),
///         period: "2024-03".parse().unwrap(),
///         attendance_days: Decimal::from(20),
///         overtime_hours: Decimal::ZERO,
///     },
///     performance: None,
/// };
///
/// let computer = SalaryComputer::new(TaxTable::default(), EngineSettings::default());
/// let record = computer.compute_record(&inputs, chrono::Utc::now()).unwrap();
/// assert_eq!(record.tax, Decimal::from(290));
/// assert_eq!(record.net_salary, Decimal::from(4710));
/// assert_eq!(record.formula_value, Decimal::from(4710));
/// ```
#[derive(Clone)]
pub struct SalaryComputer {
    tax_table: TaxTable,
    settings: EngineSettings,
    clock: Arc<dyn Clock>,
}

impl std::fmt::Debug for SalaryComputer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SalaryComputer")
            .field("tax_table", &self.tax_table)
            .field("settings", &self.settings)
            .finish_non_exhaustive()
    }
}

impl SalaryComputer {
    /// Creates a computer that timestamps records with the system clock.
    pub fn new(tax_table: TaxTable, settings: EngineSettings) -> Self {
        Self {
            tax_table,
            settings,
            clock: Arc::new(SystemClock),
        }
    }

    /// Replaces the clock records are timestamped with.
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Returns the tax table.
    pub fn tax_table(&self) -> &TaxTable {
        &self.tax_table
    }

    /// Returns the engine settings.
    pub fn settings(&self) -> &EngineSettings {
        &self.settings
    }

    pub(crate) fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    /// Loads the employee, salary group, attendance and performance for a period.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::Computation`] naming the first missing
    /// dependency, or a persistence error from the store.
    pub fn load_inputs<S>(&self, store: &S, emp_id: &str, period: Period) -> EngineResult<SalaryInputs>
    where
        S: PersistenceStore + ?Sized,
    {
        let not_found = |missing: MissingDependency| EngineError::Computation {
            emp_id: emp_id.to_string(),
            period,
            missing,
        };

        let employee = store
            .get_employee(emp_id)?
            .ok_or_else(|| not_found(MissingDependency::Employee))?;
        let group = store
            .get_salary_group(&employee.salary_group)?
            .ok_or_else(|| not_found(MissingDependency::SalaryGroup(employee.salary_group.clone())))?;
        let attendance = store
            .get_attendance(emp_id, period)?
            .ok_or_else(|| not_found(MissingDependency::Attendance))?;
        let performance = store.get_performance(emp_id, period)?;

        Ok(SalaryInputs {
            employee,
            group,
            attendance,
            performance,
        })
    }

    /// Computes a salary record from loaded inputs without touching a store.
    ///
    /// The record's revision is 0 until a store commits it.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::InvalidInput`] for out-of-domain inputs or
    /// negative taxable income under the reject policy, and a formula error
    /// when the group formula is malformed.
    pub fn compute_record(
        &self,
        inputs: &SalaryInputs,
        computed_at: DateTime<Utc>,
    ) -> EngineResult<SalaryRecord> {
        let scale = self.settings.amount_scale;
        let emp_id = &inputs.employee.emp_id;
        let period = inputs.attendance.period;
        let group = &inputs.group;
        let mut audit_steps = Vec::with_capacity(8);
        let mut warnings = Vec::new();

        let base = calculate_base_salary(group, &inputs.attendance, scale, 1)?;
        audit_steps.push(base.audit_step);

        let performance =
            calculate_performance_pay(&group.performance_rule, inputs.performance.as_ref(), scale, 2)?;
        audit_steps.push(performance.audit_step);
        warnings.extend(performance.warning);

        let overtime = calculate_overtime_pay(group, &inputs.attendance, scale, 3)?;
        audit_steps.push(overtime.audit_step);

        let social_security = calculate_social_security(&group.social_security, scale, 4)?;
        audit_steps.push(social_security.audit_step);

        let taxable_income = round_amount(
            checked_sum(
                [
                    base.amount,
                    performance.amount,
                    overtime.amount,
                    -social_security.amount,
                ],
                "taxable income",
            )?,
            scale,
        );
        audit_steps.push(AuditStep {
            step_number: 5,
            rule_id: "taxable_income".to_string(),
            rule_name: "Taxable Income".to_string(),
            input: serde_json::json!({
                "base_salary": base.amount.to_string(),
                "performance_pay": performance.amount.to_string(),
                "overtime_pay": overtime.amount.to_string(),
                "social_security": social_security.amount.to_string(),
            }),
            output: serde_json::json!({
                "taxable_income": taxable_income.to_string(),
            }),
            reasoning: format!(
                "{} + {} + {} - {} = {}",
                base.amount, performance.amount, overtime.amount, social_security.amount, taxable_income
            ),
        });

        let taxed_income = if taxable_income < Decimal::ZERO {
            match self.settings.negative_taxable_income {
                NegativeIncomePolicy::Reject => {
                    return Err(EngineError::invalid_input(format!(
                        "taxable income for '{}' in {} is negative: {}",
                        emp_id, period, taxable_income
                    )));
                }
                NegativeIncomePolicy::FloorAtZero => {
                    warn!(
                        emp_id = %emp_id,
                        period = %period,
                        taxable_income = %taxable_income,
                        "Negative taxable income floored at zero for tax"
                    );
                    warnings.push(AuditWarning {
                        code: NEGATIVE_TAXABLE_INCOME.to_string(),
                        message: format!(
                            "Taxable income {} is negative; tax computed on 0",
                            taxable_income
                        ),
                        severity: "high".to_string(),
                    });
                    Decimal::ZERO
                }
            }
        } else {
            taxable_income
        };

        let tax_result = self.tax_table.compute_tax_with_audit(taxed_income, 6)?;
        let tax = round_amount(tax_result.tax, scale);
        audit_steps.push(tax_result.audit_step);

        let net_salary = taxable_income - tax;
        audit_steps.push(AuditStep {
            step_number: 7,
            rule_id: "net_salary".to_string(),
            rule_name: "Net Salary".to_string(),
            input: serde_json::json!({
                "taxable_income": taxable_income.to_string(),
                "tax": tax.to_string(),
            }),
            output: serde_json::json!({
                "net_salary": net_salary.to_string(),
            }),
            reasoning: format!("{} - {} = {}", taxable_income, tax, net_salary),
        });

        let values: ComponentValues = [
            (SalaryComponent::BaseSalary, base.amount),
            (SalaryComponent::PerformancePay, performance.amount),
            (SalaryComponent::OvertimePay, overtime.amount),
            (SalaryComponent::SocialSecurity, social_security.amount),
            (SalaryComponent::IndividualTax, tax),
        ]
        .into_iter()
        .collect();
        let formula = Formula::parse(&group.formula)?;
        let formula_value = round_amount(formula.evaluate(&values)?, scale);
        audit_steps.push(AuditStep {
            step_number: 8,
            rule_id: "salary_formula".to_string(),
            rule_name: "Salary Group Formula".to_string(),
            input: serde_json::json!({
                "group_id": group.group_id,
                "formula": formula.source(),
            }),
            output: serde_json::json!({
                "formula_value": formula_value.to_string(),
            }),
            reasoning: format!("{} = {}", formula.source(), formula_value),
        });

        debug!(
            emp_id = %emp_id,
            period = %period,
            net_salary = %net_salary,
            "Computed salary breakdown"
        );

        Ok(SalaryRecord {
            emp_id: emp_id.clone(),
            period,
            revision: 0,
            base_salary: base.amount,
            performance_pay: performance.amount,
            overtime_pay: overtime.amount,
            social_security: social_security.amount,
            taxable_income,
            tax,
            net_salary,
            formula_value,
            computed_at,
            audit_steps,
            warnings,
        })
    }

    /// Computes one employee's salary for a period and commits it.
    ///
    /// Inputs are read afresh from the store on every call, so a rerun after
    /// an attendance correction uses the corrected data and commits a new
    /// revision. Any failure rolls the transaction back.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::Computation`] when the employee, its salary
    /// group or its attendance for the period is missing, plus anything
    /// [`compute_record`](Self::compute_record) or the store returns.
    pub fn compute_salary<S>(&self, store: &mut S, emp_id: &str, period: Period) -> EngineResult<SalaryRecord>
    where
        S: PersistenceStore + ?Sized,
    {
        let record = in_transaction(store, |store| {
            let inputs = self.load_inputs(&*store, emp_id, period)?;
            let record = self.compute_record(&inputs, self.now())?;
            store.commit_salary_record(record)
        })?;

        info!(
            emp_id = %record.emp_id,
            period = %record.period,
            revision = record.revision,
            net_salary = %record.net_salary,
            "Salary committed"
        );
        Ok(record)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::import::ImportedRecords;
    use crate::models::{
        ContributionItem, EmployeeStatus, EmploymentType, PerformanceRule, SocialSecurityScheme,
    };
    use crate::store::InMemoryStore;
    use chrono::{NaiveDate, TimeZone};
    use std::str::FromStr;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    fn period() -> Period {
        "2024-03".parse().unwrap()
    }

    fn fixed_time() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 4, 1, 8, 0, 0).unwrap()
    }

    fn employee() -> Employee {
        Employee {
            emp_id: "001".to_string(),
            name: "张三".to_string(),
            national_id: None,
            hire_date: NaiveDate::from_ymd_opt(2023, 6, 1).unwrap(),
            employment_type: EmploymentType::FullTime,
            status: EmployeeStatus::Active,
            salary_group: "G1".to_string(),
            department: Some("行政部".to_string()),
            position: None,
        }
    }

    fn group() -> SalaryGroup {
        SalaryGroup {
            group_id: "G1".to_string(),
            group_name: "行政".to_string(),
            base_salary: dec("6000"),
            proration: Default::default(),
            performance_rule: PerformanceRule::ScoreRatio {
                target_amount: dec("2000"),
                full_score: dec("100"),
            },
            overtime: Default::default(),
            social_security: SocialSecurityScheme {
                location: None,
                base_amount: dec("5000"),
                items: vec![ContributionItem {
                    name: "养老保险".to_string(),
                    personal_rate: dec("0.105"),
                    employer_rate: dec("0.16"),
                }],
            },
            formula: "基本工资 + 绩效工资 + 加班工资 - 社保".to_string(),
        }
    }

    fn attendance(days: &str, overtime: &str) -> AttendanceRecord {
        AttendanceRecord {
            emp_id: "001".to_string(),
            period: period(),
            attendance_days: dec(days),
            overtime_hours: dec(overtime),
        }
    }

    fn inputs() -> SalaryInputs {
        SalaryInputs {
            employee: employee(),
            group: group(),
            attendance: attendance("21.75", "8"),
            performance: Some(PerformanceRecord {
                emp_id: "001".to_string(),
                period: period(),
                score: dec("90"),
            }),
        }
    }

    fn computer() -> SalaryComputer {
        SalaryComputer::new(TaxTable::default(), EngineSettings::default())
            .with_clock(Arc::new(FixedClock(fixed_time())))
    }

    fn seeded_store() -> InMemoryStore {
        let mut store = InMemoryStore::new();
        store.insert_employee(employee());
        store.insert_salary_group(group());
        store.begin_transaction().unwrap();
        store
            .upsert_imported_records(
                &ImportedRecords::Attendance(vec![attendance("21.75", "8")]),
                period(),
            )
            .unwrap();
        store.commit().unwrap();
        store
    }

    #[test]
    fn test_full_pipeline_breakdown() {
        let record = computer().compute_record(&inputs(), fixed_time()).unwrap();

        assert_eq!(record.base_salary, dec("6000"));
        assert_eq!(record.performance_pay, dec("1800"));
        assert_eq!(record.overtime_pay, dec("413.79"));
        assert_eq!(record.social_security, dec("525"));
        assert_eq!(record.taxable_income, dec("7688.79"));
        // 3000 x 0.03 + 4688.79 x 0.10 = 558.879
        assert_eq!(record.tax, dec("558.88"));
        assert_eq!(record.net_salary, dec("7129.91"));
        assert_eq!(record.formula_value, dec("7688.79"));
        assert_eq!(record.audit_steps.len(), 8);
        assert!(record.warnings.is_empty());
        assert_eq!(record.revision, 0);
    }

    #[test]
    fn test_audit_steps_are_numbered_in_order() {
        let record = computer().compute_record(&inputs(), fixed_time()).unwrap();
        let numbers: Vec<u32> = record.audit_steps.iter().map(|s| s.step_number).collect();
        assert_eq!(numbers, (1..=8).collect::<Vec<_>>());
        assert_eq!(record.audit_steps[5].rule_id, "progressive_tax");
    }

    #[test]
    fn test_missing_performance_yields_zero_with_warning() {
        let mut inputs = inputs();
        inputs.performance = None;
        let record = computer().compute_record(&inputs, fixed_time()).unwrap();
        assert_eq!(record.performance_pay, Decimal::ZERO);
        assert_eq!(record.warnings.len(), 1);
        assert_eq!(record.warnings[0].code, "MISSING_PERFORMANCE");
    }

    #[test]
    fn test_negative_taxable_income_policy() {
        let mut inputs = inputs();
        inputs.attendance = attendance("1", "0");
        inputs.performance = None;
        inputs.group.performance_rule = PerformanceRule::None;
        // base 6000 x 1 / 21.75 = 275.86, social security 525

        let error = computer().compute_record(&inputs, fixed_time()).unwrap_err();
        assert_eq!(error.code(), "INVALID_INPUT");

        let floored = SalaryComputer::new(
            TaxTable::default(),
            EngineSettings {
                negative_taxable_income: NegativeIncomePolicy::FloorAtZero,
                ..Default::default()
            },
        );
        let record = floored.compute_record(&inputs, fixed_time()).unwrap();
        assert_eq!(record.taxable_income, dec("-249.14"));
        assert_eq!(record.tax, Decimal::ZERO);
        assert_eq!(record.net_salary, dec("-249.14"));
        assert_eq!(record.warnings[0].code, NEGATIVE_TAXABLE_INCOME);
    }

    #[test]
    fn test_malformed_group_formula_fails_computation() {
        let mut inputs = inputs();
        inputs.group.formula = "基本工资 +".to_string();
        let error = computer().compute_record(&inputs, fixed_time()).unwrap_err();
        assert_eq!(error.code(), "MALFORMED_FORMULA");
    }

    #[test]
    fn test_compute_salary_commits_with_revision() {
        let mut store = seeded_store();
        let record = computer().compute_salary(&mut store, "001", period()).unwrap();
        assert_eq!(record.revision, 1);
        assert_eq!(record.computed_at, fixed_time());
        assert_eq!(store.salary_records("001", period()).unwrap(), vec![record]);
    }

    #[test]
    fn test_compute_salary_is_deterministic() {
        let mut store = seeded_store();
        let first = computer().compute_salary(&mut store, "001", period()).unwrap();
        let second = computer().compute_salary(&mut store, "001", period()).unwrap();
        assert_eq!(
            SalaryRecord {
                revision: 0,
                ..first
            },
            SalaryRecord {
                revision: 0,
                ..second
            }
        );
    }

    #[test]
    fn test_missing_dependencies_are_reported() {
        let mut store = InMemoryStore::new();
        let error = computer().compute_salary(&mut store, "001", period()).unwrap_err();
        assert!(matches!(
            error,
            EngineError::Computation {
                missing: MissingDependency::Employee,
                ..
            }
        ));

        store.insert_employee(employee());
        let error = computer().compute_salary(&mut store, "001", period()).unwrap_err();
        assert!(matches!(
            error,
            EngineError::Computation {
                missing: MissingDependency::SalaryGroup(_),
                ..
            }
        ));

        store.insert_salary_group(group());
        let error = computer().compute_salary(&mut store, "001", period()).unwrap_err();
        assert_eq!(
            error.to_string(),
            "Cannot compute salary for '001' in 2024-03: attendance record not found"
        );
        assert!(!store.in_transaction());
        assert!(store.salary_records("001", period()).unwrap().is_empty());
    }

    #[test]
    fn test_rerun_after_correction_uses_new_attendance() {
        let mut store = seeded_store();
        let first = computer().compute_salary(&mut store, "001", period()).unwrap();

        in_transaction(&mut store, |s| s.correct_attendance(attendance("20", "0"))).unwrap();
        let second = computer().compute_salary(&mut store, "001", period()).unwrap();

        assert_eq!(second.revision, 2);
        assert_eq!(second.base_salary, dec("5517.24"));
        assert_eq!(second.overtime_pay, Decimal::ZERO);
        assert!(second.net_salary < first.net_salary);
    }

    #[test]
    fn test_overflowing_overtime_rolls_back_without_panicking() {
        let mut store = InMemoryStore::new();
        store.insert_employee(employee());
        store.insert_salary_group(group());
        store.begin_transaction().unwrap();
        store
            .upsert_imported_records(
                &ImportedRecords::Attendance(vec![attendance("20", &Decimal::MAX.to_string())]),
                period(),
            )
            .unwrap();
        store.commit().unwrap();

        let error = computer().compute_salary(&mut store, "001", period()).unwrap_err();
        assert_eq!(error.code(), "INVALID_INPUT");
        assert!(!store.in_transaction());
        assert!(store.salary_records("001", period()).unwrap().is_empty());
    }
}
