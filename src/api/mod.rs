mod error;

use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::sync::Arc;

use axum::{
    Router,
    extract::{Json, Query, State},
    http::{StatusCode, header},
    response::{IntoResponse, Response},
    routing::get,
};
use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand};
use serde::{Deserialize, Serialize};
use tokio::net::TcpListener;

pub use error::ApiError;

use crate::core::{
    AssetBucket, AssetKind, Clock, EquityBuckets, EquityComposition, FixedClock,
    RequirementState, SystemClock, TimelinePoint, default_target_month, equity_composition,
    evaluate, format_chf, growth_timeline, months_remaining, parse_amount,
};

/// Longest month-by-month series the API will build.
pub const MAX_TIMELINE_MONTHS: u32 = 1_200;

const DEFAULT_PRICE: &str = "800'000";
const DEFAULT_CASH: &str = "40'000";
const DEFAULT_PILLAR_3A: &str = "30'000";
const DEFAULT_PILLAR_3A_MONTHLY: &str = "500";
const DEFAULT_PENSION_FUND: &str = "60'000";
const DEFAULT_PENSION_FUND_MONTHLY: &str = "0";
const DEFAULT_OTHER: &str = "10'000";
const DEFAULT_MONTHLY: &str = "0";

#[derive(Parser, Debug)]
#[command(
    name = "eigenmittel",
    about = "Swiss home-purchase equity calculator (20% total / 10% hard equity)"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Serve the JSON API over HTTP.
    Serve(ServeArgs),
    /// Evaluate one scenario and print the result as JSON.
    Evaluate(EvaluateArgs),
}

#[derive(Args, Debug, Clone)]
pub struct ServeArgs {
    #[arg(long, env = "EIGENMITTEL_PORT", default_value_t = 8080)]
    pub port: u16,
    #[arg(
        long,
        env = "EIGENMITTEL_BIND",
        default_value_t = IpAddr::V4(Ipv4Addr::UNSPECIFIED)
    )]
    pub bind: IpAddr,
    #[arg(long, help = "Pin the reference date (YYYY-MM-DD) instead of using today")]
    pub today: Option<NaiveDate>,
}

/// Every amount is taken as typed (`1'000.50`, `1000,50`, ...) and read with
/// the same lenient parser the API uses.
#[derive(Args, Debug, Clone)]
pub struct EvaluateArgs {
    #[arg(long, default_value = DEFAULT_PRICE, help = "Purchase price in CHF")]
    pub price: String,
    #[arg(
        long,
        help = "Target purchase month as YYYY-MM; defaults to 24 months from today"
    )]
    pub target_month: Option<String>,
    #[arg(long, default_value = DEFAULT_CASH, help = "Cash and savings accounts")]
    pub cash: String,
    #[arg(long = "pillar-3a", default_value = DEFAULT_PILLAR_3A)]
    pub pillar_3a: String,
    #[arg(
        long = "pillar-3a-monthly",
        default_value = DEFAULT_PILLAR_3A_MONTHLY,
        help = "Monthly pillar 3a payment until the target month"
    )]
    pub pillar_3a_monthly: String,
    #[arg(
        long,
        default_value = DEFAULT_PENSION_FUND,
        help = "Pension fund (2nd pillar); does not count as hard equity"
    )]
    pub pension_fund: String,
    #[arg(long, default_value = DEFAULT_PENSION_FUND_MONTHLY)]
    pub pension_fund_monthly: String,
    #[arg(long, default_value = DEFAULT_OTHER, help = "Other assets, assumed liquid")]
    pub other: String,
    #[arg(long, default_value = DEFAULT_MONTHLY)]
    pub cash_monthly: String,
    #[arg(long, default_value = DEFAULT_MONTHLY)]
    pub other_monthly: String,
    #[arg(long, help = "Reference date as YYYY-MM-DD; defaults to today")]
    pub today: Option<NaiveDate>,
    #[arg(long, help = "Include the month-by-month balance series")]
    pub timeline: bool,
}

/// Amounts arrive as typed text from the web form, but plain JSON numbers are
/// accepted too.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
enum RawAmount {
    Number(f64),
    Text(String),
}

impl RawAmount {
    fn into_text(self) -> String {
        match self {
            RawAmount::Number(n) if n.is_finite() && n > 0.0 => n.to_string(),
            RawAmount::Number(_) => String::new(),
            RawAmount::Text(text) => text,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct EvaluatePayload {
    price: Option<RawAmount>,
    target_month: Option<String>,
    cash: Option<RawAmount>,
    #[serde(alias = "saeule3a")]
    pillar3a: Option<RawAmount>,
    #[serde(alias = "saeule3aMonthly")]
    pillar3a_monthly: Option<RawAmount>,
    #[serde(alias = "pensionskasse")]
    pension_fund: Option<RawAmount>,
    #[serde(alias = "pensionskasseMonthly")]
    pension_fund_monthly: Option<RawAmount>,
    other: Option<RawAmount>,
    cash_monthly: Option<RawAmount>,
    other_monthly: Option<RawAmount>,
    include_timeline: Option<bool>,
}

#[derive(Debug, Clone)]
struct EvaluationRequest {
    today: NaiveDate,
    target_month: String,
    months: u32,
    price: f64,
    buckets: EquityBuckets,
    include_timeline: bool,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct FormattedAmounts {
    total_required: String,
    hard_required: String,
    total_projected: String,
    hard_projected: String,
    savings_gap: String,
    required_monthly_rate: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct EvaluateResponse {
    today: NaiveDate,
    target_month: String,
    months_remaining: u32,
    state: RequirementState,
    composition: EquityComposition,
    formatted: FormattedAmounts,
    #[serde(skip_serializing_if = "Option::is_none")]
    timeline: Option<Vec<TimelinePoint>>,
}

#[derive(Debug, Serialize)]
struct ErrorResponse {
    error: String,
}

#[derive(Debug, Serialize)]
struct HealthResponse {
    status: &'static str,
}

#[derive(Clone)]
struct AppState {
    clock: Arc<dyn Clock>,
}

fn default_evaluate_args() -> EvaluateArgs {
    EvaluateArgs {
        price: DEFAULT_PRICE.to_string(),
        target_month: None,
        cash: DEFAULT_CASH.to_string(),
        pillar_3a: DEFAULT_PILLAR_3A.to_string(),
        pillar_3a_monthly: DEFAULT_PILLAR_3A_MONTHLY.to_string(),
        pension_fund: DEFAULT_PENSION_FUND.to_string(),
        pension_fund_monthly: DEFAULT_PENSION_FUND_MONTHLY.to_string(),
        other: DEFAULT_OTHER.to_string(),
        cash_monthly: DEFAULT_MONTHLY.to_string(),
        other_monthly: DEFAULT_MONTHLY.to_string(),
        today: None,
        timeline: false,
    }
}

fn evaluate_args_from_payload(payload: EvaluatePayload) -> EvaluateArgs {
    let mut args = default_evaluate_args();

    if let Some(v) = payload.price {
        args.price = v.into_text();
    }
    if let Some(v) = payload.target_month {
        args.target_month = Some(v);
    }
    if let Some(v) = payload.cash {
        args.cash = v.into_text();
    }
    if let Some(v) = payload.pillar3a {
        args.pillar_3a = v.into_text();
    }
    if let Some(v) = payload.pillar3a_monthly {
        args.pillar_3a_monthly = v.into_text();
    }
    if let Some(v) = payload.pension_fund {
        args.pension_fund = v.into_text();
    }
    if let Some(v) = payload.pension_fund_monthly {
        args.pension_fund_monthly = v.into_text();
    }
    if let Some(v) = payload.other {
        args.other = v.into_text();
    }
    if let Some(v) = payload.cash_monthly {
        args.cash_monthly = v.into_text();
    }
    if let Some(v) = payload.other_monthly {
        args.other_monthly = v.into_text();
    }
    if let Some(v) = payload.include_timeline {
        args.timeline = v;
    }

    args
}

fn build_request(args: &EvaluateArgs, clock: &dyn Clock) -> Result<EvaluationRequest, ApiError> {
    let today = args.today.unwrap_or_else(|| clock.today());
    // Only a missing target falls back to the default; an empty or malformed
    // one means "no time left".
    let target_month = args
        .target_month
        .clone()
        .unwrap_or_else(|| default_target_month(today));
    let months = months_remaining(Some(&target_month), today);

    if args.timeline && months > MAX_TIMELINE_MONTHS {
        return Err(ApiError::TimelineTooLong {
            months,
            max: MAX_TIMELINE_MONTHS,
        });
    }

    let buckets = EquityBuckets {
        cash: AssetBucket::new(
            AssetKind::Cash,
            parse_amount(&args.cash),
            parse_amount(&args.cash_monthly),
        ),
        pillar_3a: AssetBucket::new(
            AssetKind::Pillar3a,
            parse_amount(&args.pillar_3a),
            parse_amount(&args.pillar_3a_monthly),
        ),
        pension_fund: AssetBucket::new(
            AssetKind::PensionFund,
            parse_amount(&args.pension_fund),
            parse_amount(&args.pension_fund_monthly),
        ),
        other: AssetBucket::new(
            AssetKind::Other,
            parse_amount(&args.other),
            parse_amount(&args.other_monthly),
        ),
    };

    Ok(EvaluationRequest {
        today,
        target_month,
        months,
        price: parse_amount(&args.price),
        buckets,
        include_timeline: args.timeline,
    })
}

fn build_evaluate_response(request: &EvaluationRequest) -> EvaluateResponse {
    let state = evaluate(request.price, &request.buckets, request.months);
    let composition = equity_composition(&state);
    let formatted = FormattedAmounts {
        total_required: format_chf(state.total_required, 2),
        hard_required: format_chf(state.hard_required, 2),
        total_projected: format_chf(state.total_projected, 2),
        hard_projected: format_chf(state.hard_projected, 2),
        savings_gap: format_chf(state.savings_gap, 2),
        required_monthly_rate: state.monthly_rate().map(|rate| format_chf(rate, 2)),
    };
    let timeline = request
        .include_timeline
        .then(|| growth_timeline(&request.buckets, request.months, request.today));

    EvaluateResponse {
        today: request.today,
        target_month: request.target_month.clone(),
        months_remaining: request.months,
        state,
        composition,
        formatted,
        timeline,
    }
}

/// Runs the `evaluate` subcommand: one scenario, pretty JSON on stdout.
pub fn print_evaluation(args: &EvaluateArgs) -> Result<(), ApiError> {
    let request = build_request(args, &SystemClock)?;
    let response = build_evaluate_response(&request);
    println!("{}", serde_json::to_string_pretty(&response)?);
    Ok(())
}

pub fn router(clock: Arc<dyn Clock>) -> Router {
    Router::new()
        .route(
            "/api/evaluate",
            get(evaluate_get_handler).post(evaluate_post_handler),
        )
        .route("/health", get(health_handler))
        .fallback(not_found_handler)
        .with_state(AppState { clock })
}

pub async fn run_http_server(args: &ServeArgs) -> Result<(), ApiError> {
    let clock: Arc<dyn Clock> = match args.today {
        Some(today) => Arc::new(FixedClock(today)),
        None => Arc::new(SystemClock),
    };
    let addr = SocketAddr::new(args.bind, args.port);
    let listener = TcpListener::bind(addr)
        .await
        .map_err(|source| ApiError::Bind { addr, source })?;
    tracing::info!(%addr, fixed_today = ?args.today, "equity calculator API listening");

    axum::serve(listener, router(clock))
        .await
        .map_err(ApiError::Serve)
}

async fn health_handler() -> Response {
    json_response(StatusCode::OK, HealthResponse { status: "ok" })
}

async fn not_found_handler() -> Response {
    tracing::debug!("unknown route");
    error_response(StatusCode::NOT_FOUND, "Not found")
}

async fn evaluate_get_handler(
    State(state): State<AppState>,
    Query(payload): Query<EvaluatePayload>,
) -> Response {
    evaluate_handler_impl(&state, payload)
}

async fn evaluate_post_handler(
    State(state): State<AppState>,
    Json(payload): Json<EvaluatePayload>,
) -> Response {
    evaluate_handler_impl(&state, payload)
}

fn evaluate_handler_impl(state: &AppState, payload: EvaluatePayload) -> Response {
    let args = evaluate_args_from_payload(payload);
    let request = match build_request(&args, state.clock.as_ref()) {
        Ok(request) => request,
        Err(err) => return err.into_response(),
    };
    tracing::debug!(
        price = request.price,
        months = request.months,
        target_month = %request.target_month,
        "evaluate request"
    );
    json_response(StatusCode::OK, build_evaluate_response(&request))
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
fn evaluate_args_from_json(json: &str) -> Result<EvaluateArgs, String> {
    let payload = serde_json::from_str::<EvaluatePayload>(json)
        .map_err(|e| format!("Invalid API JSON payload: {e}"))?;
    Ok(evaluate_args_from_payload(payload))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{BindingConstraint, RateIssue};
    use serde_json::Value;

    const EPS: f64 = 1e-6;

    fn assert_approx(actual: f64, expected: f64) {
        assert!(
            (actual - expected).abs() <= EPS,
            "expected {expected}, got {actual}"
        );
    }

    fn jan_2025() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 1, 1).expect("valid date")
    }

    fn fixed_state() -> AppState {
        AppState {
            clock: Arc::new(FixedClock(jan_2025())),
        }
    }

    fn sample_args() -> EvaluateArgs {
        let mut args = default_evaluate_args();
        args.target_month = Some("2027-01".to_string());
        args
    }

    async fn body_json(response: Response) -> Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("readable body");
        serde_json::from_slice(&bytes).expect("json body")
    }

    #[test]
    fn cli_parses_evaluate_flags() {
        let cli = Cli::try_parse_from([
            "eigenmittel",
            "evaluate",
            "--price",
            "1'000'000",
            "--target-month",
            "2026-06",
            "--pillar-3a-monthly",
            "600",
            "--today",
            "2025-01-15",
            "--timeline",
        ])
        .expect("valid command line");

        let Command::Evaluate(args) = cli.command else {
            panic!("expected evaluate subcommand");
        };
        assert_eq!(args.price, "1'000'000");
        assert_eq!(args.target_month.as_deref(), Some("2026-06"));
        assert_eq!(args.pillar_3a_monthly, "600");
        assert_eq!(args.cash, DEFAULT_CASH);
        assert_eq!(args.today, NaiveDate::from_ymd_opt(2025, 1, 15));
        assert!(args.timeline);
    }

    #[test]
    fn cli_parses_serve_flags() {
        let cli = Cli::try_parse_from(["eigenmittel", "serve", "--port", "9000"])
            .expect("valid command line");
        let Command::Serve(args) = cli.command else {
            panic!("expected serve subcommand");
        };
        assert_eq!(args.port, 9000);
        assert_eq!(args.bind, IpAddr::V4(Ipv4Addr::UNSPECIFIED));
        assert_eq!(args.today, None);
    }

    #[test]
    fn build_request_defaults_target_to_two_years_out() {
        let args = default_evaluate_args();
        let request = build_request(&args, &FixedClock(jan_2025())).expect("valid request");
        assert_eq!(request.target_month, "2027-01");
        assert_eq!(request.months, 24);
        assert_approx(request.price, 800_000.0);
        assert_approx(request.buckets.pillar_3a.monthly_contribution, 500.0);
        assert_approx(request.buckets.cash.monthly_contribution, 0.0);
    }

    #[test]
    fn build_request_keeps_empty_target_as_no_window() {
        let mut args = sample_args();
        args.target_month = Some(String::new());
        let request = build_request(&args, &FixedClock(jan_2025())).expect("valid request");
        assert_eq!(request.months, 0);

        let response = build_evaluate_response(&request);
        assert_eq!(response.state.rate_issue, Some(RateIssue::NoTimeWindow));
        assert!(response.formatted.required_monthly_rate.is_none());
    }

    #[test]
    fn build_request_prefers_explicit_today() {
        let mut args = sample_args();
        args.today = NaiveDate::from_ymd_opt(2026, 1, 1);
        let request = build_request(&args, &FixedClock(jan_2025())).expect("valid request");
        assert_eq!(request.months, 12);
    }

    #[test]
    fn build_request_rejects_oversized_timeline() {
        let mut args = sample_args();
        args.target_month = Some("2200-01".to_string());
        args.timeline = true;
        let err = build_request(&args, &FixedClock(jan_2025())).expect_err("too long");
        assert!(matches!(err, ApiError::TimelineTooLong { max: 1_200, .. }));

        args.timeline = false;
        assert!(build_request(&args, &FixedClock(jan_2025())).is_ok());
    }

    #[test]
    fn evaluate_args_from_json_parses_web_keys() {
        let json = r#"{
          "price": "950'000",
          "targetMonth": "2026-07",
          "cash": 25000,
          "pillar3a": "45’000.50",
          "pillar3aMonthly": "600",
          "pensionFund": "80 000",
          "pensionFundMonthly": "250,50",
          "other": "",
          "cashMonthly": -100,
          "includeTimeline": true
        }"#;
        let args = evaluate_args_from_json(json).expect("json should parse");
        let request = build_request(&args, &FixedClock(jan_2025())).expect("valid request");

        assert_approx(request.price, 950_000.0);
        assert_eq!(request.months, 18);
        assert_approx(request.buckets.cash.current_balance, 25_000.0);
        assert_approx(request.buckets.cash.monthly_contribution, 0.0);
        assert_approx(request.buckets.pillar_3a.current_balance, 45_000.50);
        assert_approx(request.buckets.pillar_3a.monthly_contribution, 600.0);
        assert_approx(request.buckets.pension_fund.current_balance, 80_000.0);
        assert_approx(request.buckets.pension_fund.monthly_contribution, 250.50);
        assert_approx(request.buckets.other.current_balance, 0.0);
        assert!(request.include_timeline);
    }

    #[test]
    fn evaluate_args_from_json_accepts_german_aliases() {
        let json = r#"{"saeule3a": "12'000", "pensionskasse": "99'000"}"#;
        let args = evaluate_args_from_json(json).expect("json should parse");
        assert_eq!(args.pillar_3a, "12'000");
        assert_eq!(args.pension_fund, "99'000");
        assert_eq!(args.price, DEFAULT_PRICE);
    }

    #[test]
    fn evaluate_response_reports_default_scenario() {
        let request = build_request(&sample_args(), &FixedClock(jan_2025())).expect("valid");
        let response = build_evaluate_response(&request);

        assert_eq!(response.months_remaining, 24);
        assert_eq!(response.state.binding_constraint, BindingConstraint::Total);
        assert_approx(response.state.savings_gap, 8_000.0);
        assert_eq!(response.formatted.total_required, "CHF 160'000.00");
        assert_eq!(response.formatted.hard_projected, "CHF 92'000.00");
        assert_eq!(
            response.formatted.required_monthly_rate.as_deref(),
            Some("CHF 333.33")
        );
        assert_approx(response.composition.gap, 8_000.0);
        assert!(response.timeline.is_none());
    }

    #[test]
    fn evaluate_response_serialization_contains_expected_fields() {
        let mut args = sample_args();
        args.timeline = true;
        let request = build_request(&args, &FixedClock(jan_2025())).expect("valid");
        let json = serde_json::to_string(&build_evaluate_response(&request))
            .expect("response should serialize");

        assert!(json.contains("\"monthsRemaining\":24"));
        assert!(json.contains("\"targetMonth\":\"2027-01\""));
        assert!(json.contains("\"today\":\"2025-01-01\""));
        assert!(json.contains("\"bindingConstraint\":\"total\""));
        assert!(json.contains("\"hardEquityWarning\":false"));
        assert!(json.contains("\"requiredMonthlyRate\""));
        assert!(json.contains("\"composition\""));
        assert!(json.contains("\"timeline\""));
        assert!(json.contains("\"pillar3a\""));
    }

    #[test]
    fn undefined_rate_serializes_as_null() {
        let mut args = sample_args();
        args.price = "0".to_string();
        let request = build_request(&args, &FixedClock(jan_2025())).expect("valid");
        let value = serde_json::to_value(build_evaluate_response(&request)).expect("serialize");

        assert_eq!(value["state"]["requiredMonthlyRate"], Value::Null);
        assert_eq!(value["state"]["rateIssue"], "invalid-price");
        assert_eq!(value["state"]["priceValid"], false);
        assert_eq!(value["formatted"]["requiredMonthlyRate"], Value::Null);
    }

    #[tokio::test]
    async fn get_handler_evaluates_query_payload() {
        let payload = EvaluatePayload {
            price: Some(RawAmount::Text("800'000".to_string())),
            target_month: Some("2025-06".to_string()),
            cash: Some(RawAmount::Text("200'000".to_string())),
            ..EvaluatePayload::default()
        };
        let response = evaluate_get_handler(State(fixed_state()), Query(payload)).await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers().get(header::CACHE_CONTROL),
            Some(&header::HeaderValue::from_static("no-store"))
        );

        let body = body_json(response).await;
        assert_eq!(body["monthsRemaining"], 5);
        assert_eq!(body["state"]["bindingConstraint"], "none");
        assert_eq!(body["state"]["requiredMonthlyRate"], 0.0);
    }

    #[tokio::test]
    async fn post_handler_flags_hard_equity_warning() {
        let payload = EvaluatePayload {
            target_month: Some("2027-01".to_string()),
            cash: Some(RawAmount::Text("5'000".to_string())),
            pension_fund: Some(RawAmount::Number(150_000.0)),
            ..EvaluatePayload::default()
        };
        let response = evaluate_post_handler(State(fixed_state()), Json(payload)).await;
        assert_eq!(response.status(), StatusCode::OK);

        let body = body_json(response).await;
        assert_eq!(body["state"]["bindingConstraint"], "hard");
        assert_eq!(body["state"]["hardEquityWarning"], true);
        assert_eq!(body["state"]["totalRuleMet"], true);
    }

    #[tokio::test]
    async fn post_handler_rejects_oversized_timeline() {
        let payload = EvaluatePayload {
            target_month: Some("2400-01".to_string()),
            include_timeline: Some(true),
            ..EvaluatePayload::default()
        };
        let response = evaluate_post_handler(State(fixed_state()), Json(payload)).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = body_json(response).await;
        assert!(
            body["error"]
                .as_str()
                .is_some_and(|msg| msg.contains("1200 months"))
        );
    }

    #[tokio::test]
    async fn health_and_fallback_respond_with_json() {
        let health = body_json(health_handler().await).await;
        assert_eq!(health["status"], "ok");

        let response = not_found_handler().await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        let body = body_json(response).await;
        assert_eq!(body["error"], "Not found");
    }
}
