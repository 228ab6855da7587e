mod args;

use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    Router,
    extract::{
        Json, Path, Query, State,
        rejection::{JsonRejection, PathRejection, QueryRejection},
    },
    http::{StatusCode, header},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::net::TcpListener;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

pub use args::{CliMaritalStatus, EstateArgs, build_inputs};
use args::{EstatePayload, inputs_from_payload};

use crate::core::{
    BequestSolveConfig, EstateError, FEDERAL_ESTATE_TAX_RATE, ProjectionResult,
    RothConversionProjection, RothConversionYear, StateSchedule, apply_roth_overlay,
    calculate_estate_projection, compare_strategies, federal_exemption_for_year, is_known_state,
    solve_charitable_bequest, state_estate_tax, state_schedule,
};

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{message}")]
    Http { status: StatusCode, message: String },
    #[error(transparent)]
    Estate(#[from] EstateError),
    #[error("failed to encode response: {0}")]
    Encode(#[from] serde_json::Error),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl ApiError {
    fn not_found(message: impl Into<String>) -> Self {
        Self::Http {
            status: StatusCode::NOT_FOUND,
            message: message.into(),
        }
    }

    fn bad_request(message: impl Into<String>) -> Self {
        Self::Http {
            status: StatusCode::BAD_REQUEST,
            message: message.into(),
        }
    }

    fn status(&self) -> StatusCode {
        match self {
            ApiError::Http { status, .. } => *status,
            ApiError::Estate(_) => StatusCode::BAD_REQUEST,
            ApiError::Encode(_) | ApiError::Io(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self::bad_request(rejection.body_text())
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        Self::bad_request(rejection.body_text())
    }
}

impl From<PathRejection> for ApiError {
    fn from(rejection: PathRejection) -> Self {
        Self::bad_request(rejection.body_text())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_client_error() {
            warn!(%status, error = %self, "request rejected");
        } else {
            tracing::error!(%status, error = %self, "request failed");
        }
        error_response(status, &self.to_string())
    }
}

/// In-memory copy of the last saved plan. Writes are last-write-wins.
#[derive(Debug, Clone)]
struct SavedPlan {
    revision: u64,
    plan: serde_json::Value,
    projection: ProjectionResult,
}

#[derive(Debug, Clone, Default)]
pub struct AppState {
    plan: Arc<RwLock<Option<SavedPlan>>>,
}

#[derive(Debug, Serialize)]
struct ErrorResponse {
    error: String,
}

#[derive(Debug, Serialize)]
struct HealthResponse {
    status: &'static str,
    service: &'static str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct PlanResponse {
    revision: u64,
    plan: serde_json::Value,
    projection: ProjectionResult,
}

/// `PUT` reply: the stored plan plus whether the write was a no-op.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct PlanWriteResponse {
    #[serde(flatten)]
    saved: PlanResponse,
    unchanged: bool,
}

impl From<&SavedPlan> for PlanResponse {
    fn from(saved: &SavedPlan) -> Self {
        Self {
            revision: saved.revision,
            plan: saved.plan.clone(),
            projection: saved.projection.clone(),
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ExemptionResponse {
    year: i32,
    basic_exclusion: f64,
    rate: f64,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct StateTaxQuery {
    taxable_estate: Option<f64>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct StateTaxResponse {
    code: String,
    has_estate_tax: bool,
    schedule: Option<&'static StateSchedule>,
    taxable_estate: Option<f64>,
    state_tax: Option<f64>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RothOverlayPayload {
    #[serde(flatten)]
    estate: EstatePayload,
    #[serde(default)]
    years: Vec<RothConversionYear>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SolvePayload {
    #[serde(flatten)]
    estate: EstatePayload,
    #[serde(default)]
    target_total_tax: Option<f64>,
    #[serde(default)]
    search_max: Option<f64>,
    #[serde(default)]
    tolerance: Option<f64>,
    #[serde(default)]
    max_iterations: Option<u32>,
}

impl SolvePayload {
    fn config(&self) -> BequestSolveConfig {
        let defaults = BequestSolveConfig::default();
        BequestSolveConfig {
            target_total_tax: self.target_total_tax.unwrap_or(defaults.target_total_tax),
            search_max: self.search_max.or(defaults.search_max),
            tolerance: self.tolerance.unwrap_or(defaults.tolerance),
            max_iterations: self.max_iterations.unwrap_or(defaults.max_iterations),
        }
    }
}

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_handler))
        .route(
            "/api/estate/projection",
            get(projection_get_handler).post(projection_post_handler),
        )
        .route("/api/estate/compare", post(compare_handler))
        .route("/api/estate/solve/charitable", post(solve_handler))
        .route(
            "/api/roth-conversion/estate-overlay",
            post(roth_overlay_handler),
        )
        .route("/api/estate/exemption/:year", get(exemption_handler))
        .route("/api/estate/state-tax/:code", get(state_tax_handler))
        .route("/api/estate-plan", get(plan_get_handler).put(plan_put_handler))
        .fallback(not_found_handler)
        .with_state(state)
}

pub async fn run_http_server(addr: SocketAddr) -> Result<(), ApiError> {
    let app = build_router(AppState::default());
    let listener = TcpListener::bind(addr).await?;
    info!("estate HTTP API listening on http://{}", listener.local_addr()?);

    axum::serve(listener, app).await?;
    Ok(())
}

pub fn render_projection(args: EstateArgs) -> Result<String, ApiError> {
    let inputs = build_inputs(args)?;
    Ok(serde_json::to_string_pretty(&calculate_estate_projection(
        &inputs,
    ))?)
}

pub fn render_comparison(args: EstateArgs) -> Result<String, ApiError> {
    let inputs = build_inputs(args)?;
    Ok(serde_json::to_string_pretty(&compare_strategies(&inputs))?)
}

pub fn render_bequest_solve(args: EstateArgs, target_total_tax: f64) -> Result<String, ApiError> {
    let inputs = build_inputs(args)?;
    let config = BequestSolveConfig {
        target_total_tax,
        ..BequestSolveConfig::default()
    };
    Ok(serde_json::to_string_pretty(&solve_charitable_bequest(
        &inputs, config,
    )?)?)
}

async fn health_handler() -> Response {
    json_response(
        StatusCode::OK,
        HealthResponse {
            status: "ok",
            service: "estate",
        },
    )
}

async fn not_found_handler() -> Response {
    error_response(StatusCode::NOT_FOUND, "Not found")
}

async fn projection_get_handler(
    payload: Result<Query<EstatePayload>, QueryRejection>,
) -> Result<Response, ApiError> {
    let Query(payload) = payload?;
    projection_handler_impl(payload)
}

async fn projection_post_handler(
    payload: Result<Json<EstatePayload>, JsonRejection>,
) -> Result<Response, ApiError> {
    let Json(payload) = payload?;
    projection_handler_impl(payload)
}

fn projection_handler_impl(payload: EstatePayload) -> Result<Response, ApiError> {
    let inputs = inputs_from_payload(payload)?;
    let result = calculate_estate_projection(&inputs);
    debug!(
        death_year = result.death_year,
        state = %result.state_code,
        total_tax = result.total_tax,
        "estate projection computed"
    );
    Ok(json_response(StatusCode::OK, result))
}

async fn compare_handler(
    payload: Result<Json<EstatePayload>, JsonRejection>,
) -> Result<Response, ApiError> {
    let Json(payload) = payload?;
    let inputs = inputs_from_payload(payload)?;
    Ok(json_response(StatusCode::OK, compare_strategies(&inputs)))
}

async fn solve_handler(
    payload: Result<Json<SolvePayload>, JsonRejection>,
) -> Result<Response, ApiError> {
    let Json(payload) = payload?;
    let config = payload.config();
    let inputs = inputs_from_payload(payload.estate)?;
    let result = solve_charitable_bequest(&inputs, config)?;
    Ok(json_response(StatusCode::OK, result))
}

async fn roth_overlay_handler(
    payload: Result<Json<RothOverlayPayload>, JsonRejection>,
) -> Result<Response, ApiError> {
    let Json(payload) = payload?;
    let inputs = inputs_from_payload(payload.estate)?;
    let projection = RothConversionProjection::new(payload.years);
    let overlay = apply_roth_overlay(&inputs, &projection)?;
    Ok(json_response(StatusCode::OK, overlay))
}

async fn exemption_handler(
    year: Result<Path<i32>, PathRejection>,
) -> Result<Response, ApiError> {
    let Path(year) = year?;
    Ok(json_response(
        StatusCode::OK,
        ExemptionResponse {
            year,
            basic_exclusion: federal_exemption_for_year(year),
            rate: FEDERAL_ESTATE_TAX_RATE,
        },
    ))
}

async fn state_tax_handler(
    Path(code): Path<String>,
    query: Result<Query<StateTaxQuery>, QueryRejection>,
) -> Result<Response, ApiError> {
    let Query(query) = query?;
    let code = code.trim().to_ascii_uppercase();
    if !is_known_state(&code) {
        return Err(ApiError::not_found(format!("Unknown state code {code:?}")));
    }

    let schedule = state_schedule(&code);
    let taxable_estate = query.taxable_estate.map(|v| v.max(0.0));
    Ok(json_response(
        StatusCode::OK,
        StateTaxResponse {
            has_estate_tax: schedule.is_some(),
            schedule,
            state_tax: taxable_estate.map(|v| state_estate_tax(&code, v)),
            taxable_estate,
            code,
        },
    ))
}

async fn plan_get_handler(State(state): State<AppState>) -> Result<Response, ApiError> {
    let guard = state.plan.read().await;
    let Some(saved) = guard.as_ref() else {
        return Err(ApiError::not_found("No estate plan saved"));
    };
    Ok(json_response(StatusCode::OK, PlanResponse::from(saved)))
}

async fn plan_put_handler(
    State(state): State<AppState>,
    plan: Result<Json<serde_json::Value>, JsonRejection>,
) -> Result<Response, ApiError> {
    let Json(plan) = plan?;
    let payload = serde_json::from_value::<EstatePayload>(plan.clone())
        .map_err(|e| ApiError::bad_request(format!("Invalid estate plan payload: {e}")))?;
    let inputs = inputs_from_payload(payload)?;

    let mut guard = state.plan.write().await;
    if let Some(saved) = guard.as_ref().filter(|saved| saved.plan == plan) {
        debug!(revision = saved.revision, "estate plan unchanged");
        return Ok(json_response(
            StatusCode::OK,
            PlanWriteResponse {
                saved: PlanResponse::from(saved),
                unchanged: true,
            },
        ));
    }

    let revision = guard.as_ref().map_or(1, |saved| saved.revision + 1);
    let projection = calculate_estate_projection(&inputs);
    *guard = Some(SavedPlan {
        revision,
        plan: plan.clone(),
        projection: projection.clone(),
    });
    info!(revision, "estate plan saved");

    Ok(json_response(
        StatusCode::OK,
        PlanWriteResponse {
            saved: PlanResponse {
                revision,
                plan,
                projection,
            },
            unchanged: false,
        },
    ))
}

fn json_response<T: Serialize>(status: StatusCode, body: T) -> Response {
    let mut response = (status, Json(body)).into_response();
    response.headers_mut().insert(
        header::CACHE_CONTROL,
        header::HeaderValue::from_static("no-store"),
    );
    response
}

fn error_response(status: StatusCode, msg: &str) -> Response {
    json_response(
        status,
        ErrorResponse {
            error: msg.to_string(),
        },
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::{Body, to_bytes};
    use axum::http::Request;
    use tower::ServiceExt;

    const EPS: f64 = 1e-6;

    fn assert_approx(actual: f64, expected: f64) {
        assert!(
            (actual - expected).abs() <= EPS,
            "expected {expected}, got {actual}"
        );
    }

    fn twenty_million_payload() -> serde_json::Value {
        serde_json::json!({
            "currentAge": 65,
            "deathAge": 65,
            "currentYear": 2025,
            "state": "FL",
            "cash": 500000,
            "taxableInvestments": 4500000,
            "taxDeferred": 3000000,
            "roth": 1000000,
            "realEstate": 8000000,
            "businessInterests": 2500000,
            "personalProperty": 500000,
            "growthRate": 0,
            "settlementCostRate": 0
        })
    }

    async fn send(
        app: Router,
        method: &str,
        uri: &str,
        body: Option<serde_json::Value>,
    ) -> (StatusCode, serde_json::Value) {
        send_raw(app, method, uri, body.map(|json| json.to_string())).await
    }

    async fn send_raw(
        app: Router,
        method: &str,
        uri: &str,
        body: Option<String>,
    ) -> (StatusCode, serde_json::Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        let body = match body {
            Some(text) => {
                builder = builder.header("content-type", "application/json");
                Body::from(text)
            }
            None => Body::empty(),
        };
        let response = app
            .oneshot(builder.body(body).unwrap())
            .await
            .unwrap();
        let status = response.status();
        assert_eq!(
            response.headers().get(header::CACHE_CONTROL).unwrap(),
            "no-store"
        );
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn projection_endpoint_returns_camel_case_result() {
        let app = build_router(AppState::default());
        let (status, body) = send(
            app,
            "POST",
            "/api/estate/projection",
            Some(twenty_million_payload()),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_approx(body["federalTax"].as_f64().unwrap(), 2_404_000.0);
        assert_approx(body["totalTax"].as_f64().unwrap(), 2_404_000.0);
        assert_eq!(body["stateCode"], "FL");
        assert!(body["liquidity"]["gap"].is_number());
        assert!(body["charitableImpact"]["taxSavings"].is_number());
    }

    #[tokio::test]
    async fn projection_get_accepts_query_parameters() {
        let app = build_router(AppState::default());
        let (status, body) = send(
            app,
            "GET",
            "/api/estate/projection?currentAge=70&deathAge=70&currentYear=2025&realEstate=15000000&state=MD",
            None,
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_approx(body["stateTax"].as_f64().unwrap(), 1_600_000.0);
    }

    #[tokio::test]
    async fn projection_endpoint_rejects_invalid_input() {
        let app = build_router(AppState::default());
        let mut payload = twenty_million_payload();
        payload["deathAge"] = serde_json::json!(50);
        let (status, body) = send(app, "POST", "/api/estate/projection", Some(payload)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["error"].as_str().unwrap().contains("--death-age"));
    }

    #[tokio::test]
    async fn malformed_bodies_return_json_bad_request() {
        for body in [r#"{"cash":"abc"}"#, r#"{"cash":"#, "42"] {
            let (status, json) = send_raw(
                build_router(AppState::default()),
                "POST",
                "/api/estate/projection",
                Some(body.to_string()),
            )
            .await;
            assert_eq!(status, StatusCode::BAD_REQUEST, "body {body}");
            assert!(json["error"].is_string(), "body {body}");
        }

        let (status, json) = send_raw(
            build_router(AppState::default()),
            "PUT",
            "/api/estate-plan",
            Some("not json".to_string()),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(json["error"].is_string());
    }

    #[tokio::test]
    async fn bad_query_and_path_values_return_json_bad_request() {
        let app = build_router(AppState::default());
        let (status, body) =
            send(app.clone(), "GET", "/api/estate/projection?cash=abc", None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["error"].is_string());

        let (status, body) = send(app.clone(), "GET", "/api/estate/exemption/soon", None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["error"].is_string());

        let (status, body) = send(
            app,
            "GET",
            "/api/estate/state-tax/NY?taxableEstate=lots",
            None,
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["error"].is_string());
    }

    #[tokio::test]
    async fn projection_endpoint_rejects_extreme_values() {
        let app = build_router(AppState::default());

        let mut payload = twenty_million_payload();
        payload["currentYear"] = serde_json::json!(i32::MAX);
        payload["deathAge"] = serde_json::json!(90);
        let (status, body) =
            send(app.clone(), "POST", "/api/estate/projection", Some(payload)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["error"].as_str().unwrap().contains("--current-year"));

        let (status, body) = send(
            app.clone(),
            "POST",
            "/api/estate/projection",
            Some(serde_json::json!({ "currentYear": 2025, "birthYear": i32::MIN })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["error"].as_str().unwrap().contains("--birth-year"));

        let (status, body) =
            send(app.clone(), "GET", "/api/estate/projection?cash=NaN", None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["error"].as_str().unwrap().contains("--cash"));

        let (status, body) =
            send(app, "GET", "/api/estate/projection?growthRate=inf", None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["error"].as_str().unwrap().contains("--growth-rate"));
    }

    #[tokio::test]
    async fn compare_endpoint_reports_savings() {
        let app = build_router(AppState::default());
        let mut payload = twenty_million_payload();
        payload["lifetimeGifts"] = serde_json::json!(2_000_000);
        let (status, body) = send(app, "POST", "/api/estate/compare", Some(payload)).await;
        assert_eq!(status, StatusCode::OK);
        assert_approx(body["taxSavings"].as_f64().unwrap(), 800_000.0);
    }

    #[tokio::test]
    async fn solve_endpoint_returns_bequest() {
        let app = build_router(AppState::default());
        let mut payload = twenty_million_payload();
        payload["tolerance"] = serde_json::json!(1.0);
        let (status, body) =
            send(app, "POST", "/api/estate/solve/charitable", Some(payload)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["feasible"], true);
        let bequest = body["solvedBequest"].as_f64().unwrap();
        assert!((bequest - 6_010_000.0).abs() <= 1.5, "got {bequest}");
    }

    #[tokio::test]
    async fn solve_endpoint_rejects_oversized_iteration_limit() {
        for max_iterations in [serde_json::json!(u32::MAX), serde_json::json!(1_001)] {
            let mut payload = twenty_million_payload();
            payload["maxIterations"] = max_iterations;
            let (status, body) = send(
                build_router(AppState::default()),
                "POST",
                "/api/estate/solve/charitable",
                Some(payload),
            )
            .await;
            assert_eq!(status, StatusCode::BAD_REQUEST);
            assert!(body["error"].as_str().unwrap().contains("max_iterations"));
        }
    }

    #[tokio::test]
    async fn roth_overlay_endpoint_requires_years() {
        let app = build_router(AppState::default());
        let (status, body) = send(
            app.clone(),
            "POST",
            "/api/roth-conversion/estate-overlay",
            Some(twenty_million_payload()),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["error"].as_str().unwrap().contains("no years"));

        let mut payload = twenty_million_payload();
        payload["years"] = serde_json::json!([
            { "age": 65, "taxDeferredBalance": 0, "rothBalance": 4000000 }
        ]);
        let (status, body) =
            send(app, "POST", "/api/roth-conversion/estate-overlay", Some(payload)).await;
        assert_eq!(status, StatusCode::OK);
        assert_approx(body["heirIncomeTaxSavings"].as_f64().unwrap(), 720_000.0);
    }

    #[tokio::test]
    async fn exemption_and_state_lookups() {
        let app = build_router(AppState::default());
        let (status, body) = send(app.clone(), "GET", "/api/estate/exemption/2026", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_approx(body["basicExclusion"].as_f64().unwrap(), 7_000_000.0);

        let (status, body) = send(
            app.clone(),
            "GET",
            "/api/estate/state-tax/ma?taxableEstate=6000000",
            None,
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["hasEstateTax"], true);
        assert_approx(body["stateTax"].as_f64().unwrap(), 440_000.0);

        let (status, body) = send(app.clone(), "GET", "/api/estate/state-tax/TX", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["hasEstateTax"], false);
        assert!(body["schedule"].is_null());

        let (status, _) = send(app, "GET", "/api/estate/state-tax/ZZ", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn estate_plan_put_is_last_write_wins_and_skips_identical_writes() {
        let state = AppState::default();

        let (status, _) = send(build_router(state.clone()), "GET", "/api/estate-plan", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let payload = twenty_million_payload();
        let (status, body) = send(
            build_router(state.clone()),
            "PUT",
            "/api/estate-plan",
            Some(payload.clone()),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["revision"], 1);
        assert_eq!(body["unchanged"], false);

        let (_, body) = send(
            build_router(state.clone()),
            "PUT",
            "/api/estate-plan",
            Some(payload.clone()),
        )
        .await;
        assert_eq!(body["revision"], 1);
        assert_eq!(body["unchanged"], true);

        let mut updated = payload;
        updated["charitableBequest"] = serde_json::json!(1_000_000);
        let (_, body) = send(
            build_router(state.clone()),
            "PUT",
            "/api/estate-plan",
            Some(updated),
        )
        .await;
        assert_eq!(body["revision"], 2);

        let (status, body) = send(build_router(state), "GET", "/api/estate-plan", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["revision"], 2);
        assert!(body.get("unchanged").is_none());
        assert_approx(
            body["projection"]["charitableImpact"]["bequest"].as_f64().unwrap(),
            1_000_000.0,
        );
    }

    #[tokio::test]
    async fn unknown_route_returns_json_404() {
        let app = build_router(AppState::default());
        let (status, body) = send(app, "GET", "/nope", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"], "Not found");
    }

    #[test]
    fn render_projection_is_deterministic() {
        let mut estate_args = args::default_args_for_api();
        estate_args.current_year = Some(2025);
        estate_args.real_estate = 20_000_000.0;
        let first = render_projection(estate_args.clone()).expect("must render");
        let second = render_projection(estate_args).expect("must render");
        assert_eq!(first, second);
    }
}
