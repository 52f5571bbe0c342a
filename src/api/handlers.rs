//! HTTP request handlers for the payroll engine API.
//!
//! Every handler locks the store for the whole command, so imports,
//! corrections and computations are serialized.

use std::time::Instant;

use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::Serialize;
use tracing::{info, warn};
use uuid::Uuid;

use crate::calculation::Formula;
use crate::error::EngineError;
use crate::import::{Decision, ImportOutcome, PresetDecision};
use crate::models::{AttendanceRecord, Period};
use crate::store::{in_transaction, PersistenceStore};

use super::request::{
    ComputeSalaryRequest, FormulaRequest, ImportBatchRequest, PayrollRunRequest, TaxRequest,
};
use super::response::{
    ApiError, ApiErrorResponse, ConfirmationRequired, FormulaValidationResponse, TaxResponse,
};
use super::state::AppState;

/// Creates the API router with all endpoints.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/imports", post(import_handler))
        .route("/attendance/corrections", post(correct_attendance_handler))
        .route("/salaries/compute", post(compute_salary_handler))
        .route("/salaries/:emp_id/:period", get(salary_records_handler))
        .route("/rewards/:emp_id/:period", get(rewards_handler))
        .route("/payroll/run", post(payroll_run_handler))
        .route("/formulas/validate", post(validate_formula_handler))
        .route("/tax", post(tax_handler))
        .with_state(state)
}

fn json_response<T: Serialize>(status: StatusCode, body: T) -> Response {
    (
        status,
        [(header::CONTENT_TYPE, "application/json")],
        Json(body),
    )
        .into_response()
}

fn error_response(error: ApiErrorResponse) -> Response {
    json_response(error.status, error.error)
}

fn engine_error_response(correlation_id: Uuid, error: EngineError, context: &str) -> Response {
    warn!(
        correlation_id = %correlation_id,
        code = error.code(),
        error = %error,
        "{}",
        context
    );
    error_response(error.into())
}

/// Turns a JSON extraction failure into a `400` response.
fn rejection_response(correlation_id: Uuid, rejection: JsonRejection) -> Response {
    let error = match rejection {
        JsonRejection::JsonDataError(err) => {
            let body_text = err.body_text();
            warn!(
                correlation_id = %correlation_id,
                error = %body_text,
                "JSON data error"
            );
            if body_text.contains("missing field") {
                ApiError::new("VALIDATION_ERROR", body_text)
            } else {
                ApiError::malformed_json(body_text)
            }
        }
        JsonRejection::JsonSyntaxError(err) => {
            warn!(
                correlation_id = %correlation_id,
                error = %err,
                "JSON syntax error"
            );
            ApiError::malformed_json(format!("Invalid JSON syntax: {}", err))
        }
        JsonRejection::MissingJsonContentType(_) => {
            ApiError::new("MISSING_CONTENT_TYPE", "Content-Type must be application/json")
        }
        _ => ApiError::malformed_json("Failed to parse request body"),
    };
    json_response(StatusCode::BAD_REQUEST, error)
}

/// Handler for `POST /imports`.
///
/// An import whose reconciliation needs confirmation is answered with `409`
/// and the report unless the request sets `confirm`.
async fn import_handler(
    State(state): State<AppState>,
    payload: Result<Json<ImportBatchRequest>, JsonRejection>,
) -> Response {
    let correlation_id = Uuid::new_v4();
    let body = match payload {
        Ok(Json(body)) => body,
        Err(rejection) => return rejection_response(correlation_id, rejection),
    };
    info!(
        correlation_id = %correlation_id,
        kind = %body.kind,
        period = %body.period,
        rows = body.rows.len(),
        "Processing import request"
    );

    let confirm = body.confirm;
    let request = body.into_request();
    let mut port = PresetDecision(if confirm {
        Decision::Confirm
    } else {
        Decision::Cancel
    });

    let result = state.with_store(|store| {
        state
            .importer()
            .import_batch(store, &request, &mut port)
    });

    match result {
        Ok(ImportOutcome::Cancelled { report }) => {
            info!(
                correlation_id = %correlation_id,
                cohort_changes = report.cohort_changes(),
                "Import awaiting confirmation"
            );
            json_response(StatusCode::CONFLICT, ConfirmationRequired::new(report))
        }
        Ok(outcome) => json_response(StatusCode::OK, outcome),
        Err(err) => engine_error_response(correlation_id, err, "Import failed"),
    }
}

/// Handler for `POST /attendance/corrections`.
///
/// Replaces an existing attendance record so the salary can be recomputed.
async fn correct_attendance_handler(
    State(state): State<AppState>,
    payload: Result<Json<AttendanceRecord>, JsonRejection>,
) -> Response {
    let correlation_id = Uuid::new_v4();
    let record = match payload {
        Ok(Json(record)) => record,
        Err(rejection) => return rejection_response(correlation_id, rejection),
    };

    let result = state.with_store(|store| {
        in_transaction(store, |store| store.correct_attendance(record))
    });

    match result {
        Ok(previous) => {
            info!(
                correlation_id = %correlation_id,
                emp_id = %previous.emp_id,
                period = %previous.period,
                "Attendance corrected"
            );
            json_response(StatusCode::OK, previous)
        }
        Err(err) => engine_error_response(correlation_id, err, "Attendance correction failed"),
    }
}

/// Handler for `POST /salaries/compute`.
async fn compute_salary_handler(
    State(state): State<AppState>,
    payload: Result<Json<ComputeSalaryRequest>, JsonRejection>,
) -> Response {
    let correlation_id = Uuid::new_v4();
    let request = match payload {
        Ok(Json(request)) => request,
        Err(rejection) => return rejection_response(correlation_id, rejection),
    };
    info!(
        correlation_id = %correlation_id,
        emp_id = %request.emp_id,
        period = %request.period,
        "Processing salary computation"
    );

    let start_time = Instant::now();
    let result = state.with_store(|store| {
        state
            .computer()
            .compute_salary(store, &request.emp_id, request.period)
    });

    match result {
        Ok(record) => {
            info!(
                correlation_id = %correlation_id,
                revision = record.revision,
                net_salary = %record.net_salary,
                duration_us = start_time.elapsed().as_micros(),
                "Salary computed"
            );
            json_response(StatusCode::OK, record)
        }
        Err(err) => engine_error_response(correlation_id, err, "Salary computation failed"),
    }
}

/// Handler for `GET /salaries/:emp_id/:period`.
///
/// Returns every committed revision, oldest first.
async fn salary_records_handler(
    State(state): State<AppState>,
    Path((emp_id, period)): Path<(String, String)>,
) -> Response {
    let correlation_id = Uuid::new_v4();
    let period: Period = match period.parse() {
        Ok(period) => period,
        Err(err) => return engine_error_response(correlation_id, err, "Invalid period"),
    };

    match state.with_store(|store| store.salary_records(&emp_id, period)) {
        Ok(records) if records.is_empty() => json_response(
            StatusCode::NOT_FOUND,
            ApiError::new(
                "NOT_FOUND",
                format!("no salary record for '{}' in {}", emp_id, period),
            ),
        ),
        Ok(records) => json_response(StatusCode::OK, records),
        Err(err) => engine_error_response(correlation_id, err, "Salary lookup failed"),
    }
}

/// Handler for `GET /rewards/:emp_id/:period`.
///
/// Returns the rewards and punishments imported for the period in upload
/// order. An employee without any gets an empty list.
async fn rewards_handler(
    State(state): State<AppState>,
    Path((emp_id, period)): Path<(String, String)>,
) -> Response {
    let correlation_id = Uuid::new_v4();
    let period: Period = match period.parse() {
        Ok(period) => period,
        Err(err) => return engine_error_response(correlation_id, err, "Invalid period"),
    };

    match state.with_store(|store| store.get_rewards(&emp_id, period)) {
        Ok(rewards) => json_response(StatusCode::OK, rewards),
        Err(err) => engine_error_response(correlation_id, err, "Reward lookup failed"),
    }
}

/// Handler for `POST /payroll/run`.
async fn payroll_run_handler(
    State(state): State<AppState>,
    payload: Result<Json<PayrollRunRequest>, JsonRejection>,
) -> Response {
    let correlation_id = Uuid::new_v4();
    let request = match payload {
        Ok(Json(request)) => request,
        Err(rejection) => return rejection_response(correlation_id, rejection),
    };

    let start_time = Instant::now();
    let result =
        state.with_store(|store| state.computer().run_payroll(store, request.period));

    match result {
        Ok(summary) => {
            info!(
                correlation_id = %correlation_id,
                run_id = %summary.run_id,
                records = summary.records.len(),
                total_net = %summary.total_net,
                duration_us = start_time.elapsed().as_micros(),
                "Payroll run completed"
            );
            json_response(StatusCode::OK, summary)
        }
        Err(err) => engine_error_response(correlation_id, err, "Payroll run failed"),
    }
}

/// Handler for `POST /formulas/validate`.
///
/// An invalid formula is a successful answer, not an error.
async fn validate_formula_handler(
    payload: Result<Json<FormulaRequest>, JsonRejection>,
) -> Response {
    let correlation_id = Uuid::new_v4();
    let request = match payload {
        Ok(Json(request)) => request,
        Err(rejection) => return rejection_response(correlation_id, rejection),
    };

    let body = match Formula::parse(&request.formula) {
        Ok(formula) => FormulaValidationResponse {
            valid: true,
            components: formula.components().into_iter().collect(),
            error: None,
        },
        Err(err) => FormulaValidationResponse {
            valid: false,
            components: vec![],
            error: Some(err.to_string()),
        },
    };
    json_response(StatusCode::OK, body)
}

/// Handler for `POST /tax`.
async fn tax_handler(
    State(state): State<AppState>,
    payload: Result<Json<TaxRequest>, JsonRejection>,
) -> Response {
    let correlation_id = Uuid::new_v4();
    let request = match payload {
        Ok(Json(request)) => request,
        Err(rejection) => return rejection_response(correlation_id, rejection),
    };

    match state
        .computer()
        .tax_table()
        .compute_tax_with_audit(request.taxable_income, 1)
    {
        Ok(result) => json_response(
            StatusCode::OK,
            TaxResponse {
                taxable_income: request.taxable_income,
                tax: result.tax,
                slices: result.slices,
            },
        ),
        Err(err) => engine_error_response(correlation_id, err, "Tax computation failed"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ConfigLoader;
    use crate::models::{
        ContributionItem, Employee, EmployeeStatus, EmploymentType, ImportKind, PerformanceRule,
        SalaryGroup, SocialSecurityScheme,
    };
    use crate::store::InMemoryStore;
    use axum::body::Body;
    use axum::http::Request;
    use chrono::NaiveDate;
    use rust_decimal::Decimal;
    use serde_json::{json, Value};
    use std::str::FromStr;
    use tower::ServiceExt;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    fn employee(emp_id: &str, name: &str) -> Employee {
        Employee {
            emp_id: emp_id.to_string(),
            name: name.to_string(),
            national_id: None,
            hire_date: NaiveDate::from_ymd_opt(2023, 6, 1).unwrap(),
            employment_type: EmploymentType::FullTime,
            status: EmployeeStatus::Active,
            salary_group: "G1".to_string(),
            department: None,
            position: None,
        }
    }

    fn create_test_state() -> AppState {
        let mut store = InMemoryStore::new();
        store.insert_employee(employee("001", "张三"));
        store.insert_salary_group(SalaryGroup {
            group_id: "G1".to_string(),
            group_name: "行政".to_string(),
            base_salary: dec("6000"),
            proration: Default::default(),
            performance_rule: PerformanceRule::Fixed {
                amount: dec("1000"),
            },
            overtime: Default::default(),
            social_security: SocialSecurityScheme {
                location: None,
                base_amount: dec("5000"),
                items: vec![ContributionItem {
                    name: "养老保险".to_string(),
                    personal_rate: dec("0.08"),
                    employer_rate: dec("0.16"),
                }],
            },
            formula: "基本工资 + 绩效工资 - 社保".to_string(),
        });
        AppState::new(ConfigLoader::default(), store)
    }

    async fn post_json(router: Router, uri: &str, body: Value) -> (StatusCode, Value) {
        let response = router
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri(uri)
                    .header("Content-Type", "application/json")
                    .body(Body::from(body.to_string()))
                    .unwrap(),
            )
            .await
            .unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    fn attendance_import(name: &str, confirm: bool) -> Value {
        json!({
            "kind": "attendance",
            "period": "2024-03",
            "rows": [{"员工编号": "001", "姓名": name, "出勤天数": 21.75, "加班时长": 0}],
            "confirm": confirm
        })
    }

    #[tokio::test]
    async fn test_tax_endpoint() {
        let router = create_router(create_test_state());
        let (status, body) = post_json(router, "/tax", json!({"taxable_income": "5000"})).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(dec(body["tax"].as_str().unwrap()), dec("290"));
        assert_eq!(body["slices"].as_array().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_negative_tax_input_is_bad_request() {
        let router = create_router(create_test_state());
        let (status, body) = post_json(router, "/tax", json!({"taxable_income": "-1"})).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["code"], "INVALID_INPUT");
    }

    #[tokio::test]
    async fn test_formula_validation() {
        let state = create_test_state();
        let (status, body) = post_json(
            create_router(state.clone()),
            "/formulas/validate",
            json!({"formula": "基本工资 + 加班工资"}),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["valid"], true);
        assert_eq!(body["components"], json!(["base_salary", "overtime_pay"]));

        let (status, body) = post_json(
            create_router(state),
            "/formulas/validate",
            json!({"formula": "基本工资 +"}),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["valid"], false);
        assert!(body["error"].is_string());
    }

    #[tokio::test]
    async fn test_import_then_compute() {
        let state = create_test_state();
        let (status, body) = post_json(
            create_router(state.clone()),
            "/imports",
            attendance_import("张三", false),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "committed");
        assert_eq!(body["imported"], 1);

        let (status, body) = post_json(
            create_router(state),
            "/salaries/compute",
            json!({"emp_id": "001", "period": "2024-03"}),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["revision"], 1);
        assert_eq!(dec(body["base_salary"].as_str().unwrap()), dec("6000.00"));
        assert_eq!(dec(body["net_salary"].as_str().unwrap()), dec("6150.00"));
    }

    #[tokio::test]
    async fn test_name_mismatch_requires_confirmation() {
        let state = create_test_state();
        let (status, body) = post_json(
            create_router(state.clone()),
            "/imports",
            attendance_import("李四", false),
        )
        .await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(body["code"], "IDENTITY_MISMATCH");
        assert_eq!(body["report"]["mismatches"][0]["canonical_name"], "张三");

        let period: Period = "2024-03".parse().unwrap();
        let cohort = state
            .with_store(|store| store.cohort(ImportKind::Attendance, period))
            .unwrap();
        assert!(cohort.is_empty());

        let (status, _) = post_json(
            create_router(state),
            "/imports",
            attendance_import("李四", true),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
    }

    #[tokio::test]
    async fn test_compute_without_attendance_is_unprocessable() {
        let router = create_router(create_test_state());
        let (status, body) = post_json(
            router,
            "/salaries/compute",
            json!({"emp_id": "001", "period": "2024-03"}),
        )
        .await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(body["code"], "COMPUTATION_ERROR");
    }

    #[tokio::test]
    async fn test_missing_field_returns_validation_error() {
        let router = create_router(create_test_state());
        let (status, body) =
            post_json(router, "/salaries/compute", json!({"emp_id": "001"})).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["code"], "VALIDATION_ERROR");
    }

    #[tokio::test]
    async fn test_malformed_json_returns_400() {
        let router = create_router(create_test_state());
        let response = router
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/tax")
                    .header("Content-Type", "application/json")
                    .body(Body::from("{not json"))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_unknown_salary_record_is_not_found() {
        let router = create_router(create_test_state());
        let response = router
            .oneshot(
                Request::builder()
                    .uri("/salaries/001/2024-03")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_invalid_period_in_path_is_bad_request() {
        let router = create_router(create_test_state());
        let response = router
            .oneshot(
                Request::builder()
                    .uri("/salaries/001/2024-13")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    async fn get_json(router: Router, uri: &str) -> (StatusCode, Value) {
        let response = router
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn test_rewards_are_listed_in_upload_order() {
        let state = create_test_state();
        let (status, body) = get_json(create_router(state.clone()), "/rewards/001/2024-03").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!([]));

        let (status, _) = post_json(
            create_router(state.clone()),
            "/imports",
            json!({
                "kind": "reward_punishment",
                "period": "2024-03",
                "rows": [
                    {"工号": "001", "姓名": "张三", "类型": "奖励", "金额": 200, "原因": "全勤"},
                    {"工号": "001", "姓名": "张三", "类型": "惩罚", "金额": 50, "原因": "迟到"}
                ]
            }),
        )
        .await;
        assert_eq!(status, StatusCode::OK);

        let (status, body) = get_json(create_router(state.clone()), "/rewards/001/2024-03").await;
        assert_eq!(status, StatusCode::OK);
        let rewards = body.as_array().unwrap();
        assert_eq!(rewards.len(), 2);
        assert_eq!(rewards[0]["kind"], "reward");
        assert_eq!(rewards[0]["reason"], "全勤");
        assert_eq!(rewards[1]["kind"], "punishment");

        let (status, _) = get_json(create_router(state), "/rewards/001/2024-13").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_overflowing_overtime_is_bad_request_and_store_keeps_serving() {
        let state = create_test_state();
        let (status, _) = post_json(
            create_router(state.clone()),
            "/imports",
            json!({
                "kind": "attendance",
                "period": "2024-03",
                "rows": [{
                    "员工编号": "001",
                    "姓名": "张三",
                    "出勤天数": 21.75,
                    "加班时长": "79228162514264337593543950335"
                }]
            }),
        )
        .await;
        assert_eq!(status, StatusCode::OK);

        let (status, body) = post_json(
            create_router(state.clone()),
            "/salaries/compute",
            json!({"emp_id": "001", "period": "2024-03"}),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["code"], "INVALID_INPUT");

        let (status, _) = get_json(create_router(state.clone()), "/salaries/001/2024-03").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        let (status, _) =
            post_json(create_router(state), "/tax", json!({"taxable_income": "5000"})).await;
        assert_eq!(status, StatusCode::OK);
    }

    #[tokio::test]
    async fn test_deeply_nested_formula_is_reported_invalid() {
        let state = create_test_state();
        let formula = format!("{}1{}", "(".repeat(10_000), ")".repeat(10_000));
        let (status, body) = post_json(
            create_router(state.clone()),
            "/formulas/validate",
            json!({"formula": formula}),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["valid"], false);

        let (status, _) =
            post_json(create_router(state), "/tax", json!({"taxable_income": "5000"})).await;
        assert_eq!(status, StatusCode::OK);
    }
}
