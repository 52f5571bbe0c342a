//! Property tests for the tax table, batch cleaning, cohort diffs and
//! formula evaluation.

use std::collections::BTreeSet;

use proptest::prelude::*;
use rust_decimal::Decimal;

use payroll_engine::calculation::{round_amount, ComponentValues, Formula, TaxTable};
use payroll_engine::import::{clean, diff_cohorts, Cell, Row, TabularBatch};
use payroll_engine::models::{ImportKind, SalaryComponent};

const ID: &str = "员工编号";
const DAYS: &str = "出勤天数";

fn amount() -> impl Strategy<Value = Decimal> {
    (0i64..20_000_000).prop_map(|cents| Decimal::new(cents, 2))
}

fn cell() -> impl Strategy<Value = Cell> {
    prop_oneof![
        Just(Cell::Empty),
        Just(Cell::Text("   ".to_string())),
        Just(Cell::Text("n/a".to_string())),
        (0i64..3000).prop_map(|v| Cell::Number(Decimal::new(v, 2))),
        (0i64..3000).prop_map(|v| Cell::Text(Decimal::new(v, 1).to_string())),
    ]
}

fn row() -> impl Strategy<Value = Row> {
    (cell(), cell()).prop_map(|(id, days)| {
        let mut row = Row::new();
        row.insert(ID.to_string(), id);
        row.insert(DAYS.to_string(), days);
        row
    })
}

fn emp_ids() -> impl Strategy<Value = BTreeSet<String>> {
    prop::collection::btree_set((1u32..40).prop_map(|n| format!("{:03}", n)), 0..20)
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(256))]

    #[test]
    fn prop_tax_is_non_negative_and_non_decreasing(a in amount(), b in amount()) {
        let table = TaxTable::default();
        let (low, high) = if a <= b { (a, b) } else { (b, a) };
        let tax_low = table.compute_tax(low).unwrap();
        let tax_high = table.compute_tax(high).unwrap();

        prop_assert!(tax_low >= Decimal::ZERO);
        prop_assert!(tax_low <= tax_high);
        prop_assert!(tax_high - tax_low <= (high - low) * Decimal::new(45, 2));
    }

    #[test]
    fn prop_tax_is_the_sum_of_its_slices(income in amount()) {
        let result = TaxTable::default().compute_tax_with_audit(income, 1).unwrap();
        let total: Decimal = result.slices.iter().map(|s| s.tax).sum();
        let taxed: Decimal = result.slices.iter().map(|s| s.taxable).sum();

        prop_assert_eq!(result.tax, total);
        prop_assert_eq!(taxed, income);
    }

    #[test]
    fn prop_clean_accounts_for_every_row(rows in prop::collection::vec(row(), 0..30)) {
        let batch = TabularBatch::from_rows(ImportKind::Attendance, rows);
        let outcome = clean(&batch, &[ID.to_string()], &[DAYS.to_string()]);

        prop_assert_eq!(outcome.batch.len() + outcome.dropped, batch.len());
        for row in &outcome.batch.rows {
            prop_assert!(!TabularBatch::cell(row, ID).is_blank());
            prop_assert!(matches!(TabularBatch::cell(row, DAYS), Cell::Number(_)));
        }
    }

    #[test]
    fn prop_cohort_diff_partitions_the_change(current in emp_ids(), prior in emp_ids()) {
        let diff = diff_cohorts(&current, &prior);

        prop_assert!(diff.added.is_disjoint(&diff.removed));
        prop_assert!(diff.added.iter().all(|id| current.contains(id) && !prior.contains(id)));
        prop_assert!(diff.removed.iter().all(|id| prior.contains(id) && !current.contains(id)));

        let rebuilt: BTreeSet<String> = prior
            .difference(&diff.removed)
            .chain(diff.added.iter())
            .cloned()
            .collect();
        prop_assert_eq!(rebuilt, current);
    }

    #[test]
    fn prop_sum_formula_matches_component_arithmetic(
        base in amount(),
        performance in amount(),
        social in amount(),
    ) {
        let formula = Formula::parse("基本工资 + 绩效工资 - 社保").unwrap();
        let mut values = ComponentValues::new();
        values.insert(SalaryComponent::BaseSalary, base);
        values.insert(SalaryComponent::PerformancePay, performance);
        values.insert(SalaryComponent::SocialSecurity, social);

        prop_assert_eq!(formula.evaluate(&values).unwrap(), base + performance - social);
    }

    #[test]
    fn prop_rounding_is_idempotent(cents in -10_000_000i64..10_000_000, extra in 0u32..4) {
        let value = Decimal::new(cents, 2 + extra);
        let once = round_amount(value, 2);

        prop_assert_eq!(round_amount(once, 2), once);
        prop_assert!((value - once).abs() <= Decimal::new(5, 3));
    }
}
