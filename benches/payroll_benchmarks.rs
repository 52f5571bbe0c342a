//! Performance benchmarks for the payroll engine.
//!
//! Covers the progressive tax table, formula parsing and evaluation, the
//! single-employee salary pipeline, whole-period payroll runs at several
//! sizes and worker counts, and one salary computation over HTTP.
//!
//! Run with: `cargo bench`
//! HTML reports are generated in `target/criterion/`

use std::str::FromStr;

use chrono::{NaiveDate, TimeZone, Utc};
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use rust_decimal::Decimal;

use payroll_engine::api::{create_router, AppState};
use payroll_engine::calculation::{ComponentValues, Formula, SalaryComputer, SalaryInputs, TaxTable};
use payroll_engine::config::{ConfigLoader, EngineSettings};
use payroll_engine::import::ImportedRecords;
use payroll_engine::models::{
    AttendanceRecord, ContributionItem, Employee, EmployeeStatus, EmploymentType, Period,
    PerformanceRecord, PerformanceRule, SalaryComponent, SalaryGroup, SocialSecurityScheme,
};
use payroll_engine::store::{InMemoryStore, PersistenceStore};

use axum::{body::Body, http::Request};
use tower::ServiceExt;

fn dec(s: &str) -> Decimal {
    Decimal::from_str(s).unwrap()
}

fn period() -> Period {
    "2024-03".parse().unwrap()
}

fn employee(index: usize) -> Employee {
    Employee {
        emp_id: format!("{:05}", index),
        name: format!("员工{}", index),
        national_id: None,
        hire_date: NaiveDate::from_ymd_opt(2022, 1, 10).unwrap(),
        employment_type: EmploymentType::FullTime,
        status: EmployeeStatus::Active,
        salary_group: "G1".to_string(),
        department: None,
        position: None,
    }
}

fn salary_group() -> SalaryGroup {
    SalaryGroup {
        group_id: "G1".to_string(),
        group_name: "行政".to_string(),
        base_salary: dec("12000"),
        proration: Default::default(),
        performance_rule: PerformanceRule::ScoreRatio {
            target_amount: dec("3000"),
            full_score: dec("100"),
        },
        overtime: Default::default(),
        social_security: SocialSecurityScheme {
            location: None,
            base_amount: dec("10000"),
            items: vec![ContributionItem {
                name: "养老保险".to_string(),
                personal_rate: dec("0.105"),
                employer_rate: dec("0.16"),
            }],
        },
        formula: "基本工资 + 绩效工资 + 加班工资 - 社保".to_string(),
    }
}

fn attendance(emp_id: &str) -> AttendanceRecord {
    AttendanceRecord {
        emp_id: emp_id.to_string(),
        period: period(),
        attendance_days: dec("20.5"),
        overtime_hours: dec("6"),
    }
}

/// Creates a store with `count` employees and their attendance for the period.
fn seeded_store(count: usize) -> InMemoryStore {
    let mut store = InMemoryStore::new();
    store.insert_salary_group(salary_group());
    let mut records = Vec::with_capacity(count);
    for index in 0..count {
        let employee = employee(index);
        records.push(attendance(&employee.emp_id));
        store.insert_employee(employee);
    }
    store.begin_transaction().unwrap();
    store
        .upsert_imported_records(&ImportedRecords::Attendance(records), period())
        .unwrap();
    store.commit().unwrap();
    store
}

fn bench_tax(c: &mut Criterion) {
    let table = TaxTable::default();
    let income = dec("48321.57");
    c.bench_function("compute_tax", |b| {
        b.iter(|| black_box(table.compute_tax(black_box(income)).unwrap()))
    });
}

fn bench_formula(c: &mut Criterion) {
    let source = "(基本工资 + 绩效工资 * 1.2 + 加班工资) - 社保 - 个税";
    let mut values = ComponentValues::new();
    for (component, value) in SalaryComponent::ALL.into_iter().zip(["12000", "3000", "600", "1050", "1200"]) {
        values.insert(component, dec(value));
    }

    c.bench_function("formula_parse", |b| {
        b.iter(|| black_box(Formula::parse(black_box(source)).unwrap()))
    });

    let formula = Formula::parse(source).unwrap();
    c.bench_function("formula_evaluate", |b| {
        b.iter(|| black_box(formula.evaluate(black_box(&values)).unwrap()))
    });
}

fn bench_compute_record(c: &mut Criterion) {
    let computer = SalaryComputer::new(TaxTable::default(), EngineSettings::default());
    let inputs = SalaryInputs {
        employee: employee(1),
        group: salary_group(),
        attendance: attendance("00001"),
        performance: Some(PerformanceRecord {
            emp_id: "00001".to_string(),
            period: period(),
            score: dec("92"),
        }),
    };
    let computed_at = Utc.with_ymd_and_hms(2024, 4, 1, 8, 0, 0).unwrap();

    c.bench_function("compute_record", |b| {
        b.iter(|| black_box(computer.compute_record(black_box(&inputs), computed_at).unwrap()))
    });
}

fn bench_payroll_run(c: &mut Criterion) {
    let mut group = c.benchmark_group("payroll_run");
    group.sample_size(10);

    for count in [100usize, 1000] {
        let store = seeded_store(count);
        group.throughput(Throughput::Elements(count as u64));

        for workers in [1usize, 4] {
            let settings = EngineSettings {
                payroll_workers: workers,
                ..EngineSettings::default()
            };
            let computer = SalaryComputer::new(TaxTable::default(), settings);
            group.bench_with_input(
                BenchmarkId::new(format!("workers_{}", workers), count),
                &count,
                |b, _| {
                    b.iter_batched(
                        || store.clone(),
                        |mut store| black_box(computer.run_payroll(&mut store, period()).unwrap()),
                        criterion::BatchSize::LargeInput,
                    )
                },
            );
        }
    }
    group.finish();
}

fn bench_http_compute(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().unwrap();
    let state = AppState::new(ConfigLoader::default(), seeded_store(1));
    let body = serde_json::json!({"emp_id": "00000", "period": "2024-03"}).to_string();

    c.bench_function("http_compute_salary", |b| {
        b.to_async(&rt).iter(|| async {
            let router = create_router(state.clone());
            let request = Request::builder()
                .method("POST")
                .uri("/salaries/compute")
                .header("Content-Type", "application/json")
                .body(Body::from(body.clone()))
                .unwrap();
            black_box(router.oneshot(request).await.unwrap())
        })
    });
}

criterion_group!(
    benches,
    bench_tax,
    bench_formula,
    bench_compute_record,
    bench_payroll_run,
    bench_http_compute
);
criterion_main!(benches);
