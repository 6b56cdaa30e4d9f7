use axum::{
    Router,
    extract::{Json, Query, State},
    http::{HeaderValue, StatusCode, header},
    response::{IntoResponse, Response},
    routing::get,
};
use log::{info, warn};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;

use super::{
    BreakEvenArgs, JourneyArgs, PaymentArgs, ProfileArgs, RateArgs, default_break_even_for_api,
    default_journey_for_api, default_payment_for_api, default_rates_for_api, preset_entries,
    run_break_even, run_journey, run_payment, run_rates,
};
use crate::core::ProjectionConfig;

#[derive(Clone)]
struct AppState {
    config: Arc<ProjectionConfig>,
}

/// Vehicle, party and solver fields shared by the journey and break-even
/// endpoints. Percent fields are in percent, as on the command line.
#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct ProjectionPayload {
    preset: Option<String>,
    price: Option<f64>,
    down_payment: Option<f64>,
    loan_apr: Option<f64>,
    loan_term_months: Option<u32>,
    lease_residual: Option<f64>,
    money_factor: Option<f64>,
    lease_term_months: Option<u32>,
    mileage_allowance: Option<f64>,

    credit_score: Option<u16>,
    annual_income: Option<f64>,
    monthly_budget: Option<f64>,
    annual_miles: Option<f64>,

    low_monthly_cost: Option<u8>,
    long_term_value: Option<u8>,
    flexibility: Option<u8>,
    latest_technology: Option<u8>,
    low_maintenance: Option<u8>,

    growing_family: Option<bool>,
    stable_income: Option<bool>,
    long_road_trips: Option<bool>,
    enjoys_new_vehicles: Option<bool>,

    horizon_months: Option<u32>,
    seed: Option<u64>,
    summary_only: Option<bool>,

    search_min: Option<f64>,
    search_max: Option<f64>,
    tolerance: Option<f64>,
    max_iterations: Option<u32>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct RatesPayload {
    principal: Option<f64>,
    term_months: Option<u32>,
    fixed_apr: Option<f64>,
    index_rate: Option<f64>,
    variable_margin: Option<f64>,
    reset_months: Option<u32>,
    horizon_months: Option<u32>,
    seed: Option<u64>,
    stable_income: Option<bool>,
    flexibility: Option<u8>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct PaymentPayload {
    principal: Option<f64>,
    apr: Option<f64>,
    term_months: Option<u32>,
    credit_score: Option<u16>,
    schedule: Option<bool>,
}

#[derive(Debug, Serialize)]
struct ErrorResponse {
    error: String,
}

#[derive(Debug, Serialize)]
struct HealthResponse {
    status: &'static str,
}

pub async fn run_http_server(port: u16, config: ProjectionConfig) -> std::io::Result<()> {
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let state = AppState {
        config: Arc::new(config),
    };
    let app = Router::new()
        .route("/health", get(health_handler))
        .route("/api/presets", get(presets_handler))
        .route(
            "/api/journey",
            get(journey_get_handler).post(journey_post_handler),
        )
        .route(
            "/api/rates",
            get(rates_get_handler).post(rates_post_handler),
        )
        .route("/api/payment", get(payment_handler))
        .route(
            "/api/break-even",
            get(break_even_get_handler).post(break_even_post_handler),
        )
        .fallback(not_found_handler)
        .with_state(state);

    let listener = TcpListener::bind(addr).await?;
    info!("buylease HTTP API listening on http://{addr}");
    info!("Local access: http://127.0.0.1:{port}/health");

    axum::serve(listener, app).await
}

async fn health_handler() -> Response {
    json_response(StatusCode::OK, HealthResponse { status: "ok" })
}

async fn presets_handler() -> Response {
    json_response(StatusCode::OK, preset_entries())
}

async fn not_found_handler() -> Response {
    error_response(StatusCode::NOT_FOUND, "Not found")
}

async fn journey_get_handler(
    State(state): State<AppState>,
    Query(payload): Query<ProjectionPayload>,
) -> Response {
    journey_handler_impl(&state, payload)
}

async fn journey_post_handler(
    State(state): State<AppState>,
    Json(payload): Json<ProjectionPayload>,
) -> Response {
    journey_handler_impl(&state, payload)
}

fn journey_handler_impl(state: &AppState, payload: ProjectionPayload) -> Response {
    let args = journey_args_from_payload(payload);
    info!(
        "journey request: preset {} over {} months (seed {})",
        args.profile.preset, args.horizon_months, args.seed
    );
    respond(run_journey(&args, &state.config))
}

async fn break_even_get_handler(
    State(state): State<AppState>,
    Query(payload): Query<ProjectionPayload>,
) -> Response {
    break_even_handler_impl(&state, payload)
}

async fn break_even_post_handler(
    State(state): State<AppState>,
    Json(payload): Json<ProjectionPayload>,
) -> Response {
    break_even_handler_impl(&state, payload)
}

fn break_even_handler_impl(state: &AppState, payload: ProjectionPayload) -> Response {
    let args = break_even_args_from_payload(payload);
    info!(
        "break-even request: preset {} over {} months",
        args.profile.preset, args.horizon_months
    );
    respond(run_break_even(&args, &state.config))
}

async fn rates_get_handler(
    State(state): State<AppState>,
    Query(payload): Query<RatesPayload>,
) -> Response {
    rates_handler_impl(&state, payload)
}

async fn rates_post_handler(
    State(state): State<AppState>,
    Json(payload): Json<RatesPayload>,
) -> Response {
    rates_handler_impl(&state, payload)
}

fn rates_handler_impl(state: &AppState, payload: RatesPayload) -> Response {
    let args = rate_args_from_payload(payload);
    info!(
        "rates request: {:.0} over {} months",
        args.principal, args.term_months
    );
    respond(run_rates(&args, &state.config))
}

async fn payment_handler(Query(payload): Query<PaymentPayload>) -> Response {
    respond(run_payment(&payment_args_from_payload(payload)))
}

fn respond<T: Serialize>(result: Result<T, String>) -> Response {
    match result {
        Ok(body) => json_response(StatusCode::OK, body),
        Err(msg) => {
            warn!("rejected request: {msg}");
            error_response(StatusCode::BAD_REQUEST, &msg)
        }
    }
}

fn json_response<T: Serialize>(status: StatusCode, body: T) -> Response {
    let mut response = (status, Json(body)).into_response();
    response
        .headers_mut()
        .insert(header::CACHE_CONTROL, HeaderValue::from_static("no-store"));
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

fn apply_profile(profile: &mut ProfileArgs, payload: &ProjectionPayload) {
    if let Some(v) = &payload.preset {
        profile.preset = v.clone();
    }
    if payload.price.is_some() {
        profile.price = payload.price;
    }
    if payload.down_payment.is_some() {
        profile.down_payment = payload.down_payment;
    }
    if payload.loan_apr.is_some() {
        profile.loan_apr = payload.loan_apr;
    }
    if payload.loan_term_months.is_some() {
        profile.loan_term_months = payload.loan_term_months;
    }
    if payload.lease_residual.is_some() {
        profile.lease_residual = payload.lease_residual;
    }
    if payload.money_factor.is_some() {
        profile.money_factor = payload.money_factor;
    }
    if payload.lease_term_months.is_some() {
        profile.lease_term_months = payload.lease_term_months;
    }
    if payload.mileage_allowance.is_some() {
        profile.mileage_allowance = payload.mileage_allowance;
    }

    if let Some(v) = payload.credit_score {
        profile.credit_score = v;
    }
    if let Some(v) = payload.annual_income {
        profile.annual_income = v;
    }
    if let Some(v) = payload.monthly_budget {
        profile.monthly_budget = v;
    }
    if let Some(v) = payload.annual_miles {
        profile.annual_miles = v;
    }

    if let Some(v) = payload.low_monthly_cost {
        profile.low_monthly_cost = v;
    }
    if let Some(v) = payload.long_term_value {
        profile.long_term_value = v;
    }
    if let Some(v) = payload.flexibility {
        profile.flexibility = v;
    }
    if let Some(v) = payload.latest_technology {
        profile.latest_technology = v;
    }
    if let Some(v) = payload.low_maintenance {
        profile.low_maintenance = v;
    }

    if let Some(v) = payload.growing_family {
        profile.growing_family = v;
    }
    if let Some(v) = payload.stable_income {
        profile.variable_income = !v;
    }
    if let Some(v) = payload.long_road_trips {
        profile.long_road_trips = v;
    }
    if let Some(v) = payload.enjoys_new_vehicles {
        profile.enjoys_new_vehicles = v;
    }
}

fn journey_args_from_payload(payload: ProjectionPayload) -> JourneyArgs {
    let mut args = default_journey_for_api();
    apply_profile(&mut args.profile, &payload);
    if let Some(v) = payload.horizon_months {
        args.horizon_months = v;
    }
    if let Some(v) = payload.seed {
        args.seed = v;
    }
    if let Some(v) = payload.summary_only {
        args.summary_only = v;
    }
    args
}

fn break_even_args_from_payload(payload: ProjectionPayload) -> BreakEvenArgs {
    let mut args = default_break_even_for_api();
    apply_profile(&mut args.profile, &payload);
    if let Some(v) = payload.horizon_months {
        args.horizon_months = v;
    }
    if let Some(v) = payload.search_min {
        args.search_min = v;
    }
    if let Some(v) = payload.search_max {
        args.search_max = v;
    }
    if let Some(v) = payload.tolerance {
        args.tolerance = v;
    }
    if let Some(v) = payload.max_iterations {
        args.max_iterations = v;
    }
    args
}

fn rate_args_from_payload(payload: RatesPayload) -> RateArgs {
    let mut args = default_rates_for_api();
    if let Some(v) = payload.principal {
        args.principal = v;
    }
    if let Some(v) = payload.term_months {
        args.term_months = v;
    }
    if let Some(v) = payload.fixed_apr {
        args.fixed_apr = v;
    }
    if let Some(v) = payload.index_rate {
        args.index_rate = v;
    }
    if let Some(v) = payload.variable_margin {
        args.variable_margin = v;
    }
    if let Some(v) = payload.reset_months {
        args.reset_months = v;
    }
    if payload.horizon_months.is_some() {
        args.horizon_months = payload.horizon_months;
    }
    if let Some(v) = payload.seed {
        args.seed = v;
    }
    if let Some(v) = payload.stable_income {
        args.variable_income = !v;
    }
    if let Some(v) = payload.flexibility {
        args.flexibility = v;
    }
    args
}

fn payment_args_from_payload(payload: PaymentPayload) -> PaymentArgs {
    let mut args = default_payment_for_api();
    if let Some(v) = payload.principal {
        args.principal = v;
    }
    if let Some(v) = payload.apr {
        args.apr = v;
    }
    if let Some(v) = payload.term_months {
        args.term_months = v;
    }
    if payload.credit_score.is_some() {
        args.credit_score = payload.credit_score;
    }
    if let Some(v) = payload.schedule {
        args.schedule = v;
    }
    args
}
