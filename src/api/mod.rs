use axum::{
    Router,
    extract::{Json, Query},
    http::{StatusCode, header},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use clap::Args;
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use tokio::net::TcpListener;
use tracing::{info, warn};

use crate::core::{Scenario, Trajectory, project};
use crate::error::{Error, Result};

mod report;

pub use report::{
    ComparisonReport, ComparisonTable, ScenarioSummary, TableRow, assign_display_labels,
    build_comparison_report, build_comparison_table, format_thousands, render_comparison_text,
    render_trajectory_text,
};

pub const DEFAULT_PORT: u16 = 8080;
pub const MAX_YEARS: i64 = 100;
const FRACTION_SUM_TOLERANCE: f64 = 1e-6;

/// Scenario form input. Fractions and rates are percents (`7` is 7%).
#[derive(Args, Debug, Clone)]
pub struct ScenarioArgs {
    #[arg(long, default_value = "My Scenario")]
    pub label: String,
    #[arg(long, default_value_t = 10_000.0)]
    pub initial_asset: f64,
    #[arg(long, default_value_t = 50_000.0, help = "Initial annual income")]
    pub annual_income: f64,
    #[arg(long, default_value_t = 30, help = "Age at the start of the projection")]
    pub starting_age: i64,
    #[arg(long, default_value_t = 30.0, help = "Share of income invested, in percent")]
    pub invest_percent: f64,
    #[arg(long, default_value_t = 20.0, help = "Share of income saved, in percent")]
    pub save_percent: f64,
    #[arg(long, default_value_t = 50.0, help = "Share of income consumed, in percent")]
    pub consumption_percent: f64,
    #[arg(
        long,
        default_value_t = 7.0,
        allow_hyphen_values = true,
        help = "Nominal annual investment return in percent"
    )]
    pub investment_return: f64,
    #[arg(
        long,
        default_value_t = 2.0,
        allow_hyphen_values = true,
        help = "Nominal annual savings return in percent"
    )]
    pub savings_return: f64,
    #[arg(
        long,
        default_value_t = 3.0,
        allow_hyphen_values = true,
        help = "Nominal annual income growth in percent"
    )]
    pub income_growth: f64,
    #[arg(
        long,
        default_value_t = 2.0,
        allow_hyphen_values = true,
        help = "Annual inflation in percent; recorded but not applied"
    )]
    pub inflation: f64,
    #[arg(long, default_value_t = 30, help = "Projection horizon in years")]
    pub years: i64,
}

impl Default for ScenarioArgs {
    fn default() -> Self {
        Self {
            label: "My Scenario".to_string(),
            initial_asset: 10_000.0,
            annual_income: 50_000.0,
            starting_age: 30,
            invest_percent: 30.0,
            save_percent: 20.0,
            consumption_percent: 50.0,
            investment_return: 7.0,
            savings_return: 2.0,
            income_growth: 3.0,
            inflation: 2.0,
            years: 30,
        }
    }
}

/// Request body for one scenario. Form keys (`investPercent`, `investmentReturn`,
/// ...) are percents; model keys (`investFraction`, `annualReturnInvestment`, ...)
/// are decimals and win when both are sent.
#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ScenarioPayload {
    label: Option<String>,
    initial_asset: Option<f64>,
    #[serde(alias = "annualIncomeInitial")]
    annual_income: Option<f64>,
    starting_age: Option<i64>,
    invest_percent: Option<f64>,
    save_percent: Option<f64>,
    consumption_percent: Option<f64>,
    investment_return: Option<f64>,
    savings_return: Option<f64>,
    income_growth: Option<f64>,
    inflation: Option<f64>,
    years: Option<i64>,

    invest_fraction: Option<f64>,
    save_fraction: Option<f64>,
    consumption_fraction: Option<f64>,
    annual_return_investment: Option<f64>,
    annual_return_savings: Option<f64>,
    income_growth_rate: Option<f64>,
    inflation_rate: Option<f64>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ComparePayload {
    scenarios: Vec<ScenarioPayload>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ProjectResponse {
    label: String,
    final_age: u32,
    final_total_assets: f64,
    trajectory: Trajectory,
}

#[derive(Debug, Serialize)]
struct ErrorResponse {
    error: String,
}

#[derive(Debug, Serialize)]
struct HealthResponse {
    status: &'static str,
}

#[derive(Debug, Clone, Copy)]
pub struct ServerConfig {
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self { port: DEFAULT_PORT }
    }
}

/// Validates form input and converts percents to decimals. `position` names
/// scenarios submitted without a label.
pub fn build_scenario(args: ScenarioArgs, position: usize) -> Result<Scenario> {
    for (name, value) in [
        ("--initial-asset", args.initial_asset),
        ("--annual-income", args.annual_income),
        ("--invest-percent", args.invest_percent),
        ("--save-percent", args.save_percent),
        ("--consumption-percent", args.consumption_percent),
        ("--investment-return", args.investment_return),
        ("--savings-return", args.savings_return),
        ("--income-growth", args.income_growth),
        ("--inflation", args.inflation),
    ] {
        if !value.is_finite() {
            return Err(Error::invalid_field(name, "must be a finite number"));
        }
    }

    if args.initial_asset < 0.0 {
        return Err(Error::invalid_field("--initial-asset", "must be >= 0"));
    }

    if args.annual_income < 0.0 {
        return Err(Error::invalid_field("--annual-income", "must be >= 0"));
    }

    for (name, pct) in [
        ("--invest-percent", args.invest_percent),
        ("--save-percent", args.save_percent),
        ("--consumption-percent", args.consumption_percent),
    ] {
        if !(0.0..=100.0).contains(&pct) {
            return Err(Error::invalid_field(name, "must be between 0 and 100"));
        }
    }

    let fraction_sum = args.invest_percent + args.save_percent + args.consumption_percent;
    if (fraction_sum - 100.0).abs() > FRACTION_SUM_TOLERANCE {
        return Err(Error::FractionSum { sum: fraction_sum });
    }

    if !(1..=MAX_YEARS).contains(&args.years) {
        return Err(Error::invalid_field(
            "--years",
            format!("must be between 1 and {MAX_YEARS}"),
        ));
    }

    let starting_age = u32::try_from(args.starting_age)
        .map_err(|_| Error::invalid_field("--starting-age", "must be >= 0"))?;

    let label = match args.label.trim() {
        "" => format!("Scenario_{}", position + 1),
        trimmed => trimmed.to_string(),
    };

    Ok(Scenario {
        label,
        initial_asset: args.initial_asset,
        annual_income_initial: args.annual_income,
        invest_fraction: args.invest_percent / 100.0,
        save_fraction: args.save_percent / 100.0,
        consumption_fraction: args.consumption_percent / 100.0,
        annual_return_investment: args.investment_return / 100.0,
        annual_return_savings: args.savings_return / 100.0,
        income_growth_rate: args.income_growth / 100.0,
        inflation_rate: args.inflation / 100.0,
        years: args.years as u32,
        starting_age,
    })
}

/// Overlays the fields present in `payload` on the form defaults.
pub fn scenario_args_from_payload(payload: ScenarioPayload) -> ScenarioArgs {
    let mut args = ScenarioArgs::default();

    if let Some(v) = payload.label {
        args.label = v;
    }
    if let Some(v) = payload.initial_asset {
        args.initial_asset = v;
    }
    if let Some(v) = payload.annual_income {
        args.annual_income = v;
    }
    if let Some(v) = payload.starting_age {
        args.starting_age = v;
    }
    if let Some(v) = payload.invest_percent {
        args.invest_percent = v;
    }
    if let Some(v) = payload.save_percent {
        args.save_percent = v;
    }
    if let Some(v) = payload.consumption_percent {
        args.consumption_percent = v;
    }
    if let Some(v) = payload.investment_return {
        args.investment_return = v;
    }
    if let Some(v) = payload.savings_return {
        args.savings_return = v;
    }
    if let Some(v) = payload.income_growth {
        args.income_growth = v;
    }
    if let Some(v) = payload.inflation {
        args.inflation = v;
    }
    if let Some(v) = payload.years {
        args.years = v;
    }

    for (decimal, percent) in [
        (payload.invest_fraction, &mut args.invest_percent),
        (payload.save_fraction, &mut args.save_percent),
        (payload.consumption_fraction, &mut args.consumption_percent),
        (payload.annual_return_investment, &mut args.investment_return),
        (payload.annual_return_savings, &mut args.savings_return),
        (payload.income_growth_rate, &mut args.income_growth),
        (payload.inflation_rate, &mut args.inflation),
    ] {
        if let Some(v) = decimal {
            *percent = v * 100.0;
        }
    }

    args
}

pub fn scenario_from_payload(payload: ScenarioPayload, position: usize) -> Result<Scenario> {
    build_scenario(scenario_args_from_payload(payload), position)
}

/// Parses a JSON array of scenario payloads.
pub fn scenarios_from_json(json: &str) -> Result<Vec<Scenario>> {
    let payloads = serde_json::from_str::<Vec<ScenarioPayload>>(json)
        .map_err(|e| Error::InvalidPayload(e.to_string()))?;
    payloads
        .into_iter()
        .enumerate()
        .map(|(position, payload)| scenario_from_payload(payload, position))
        .collect()
}

pub async fn run_http_server(config: ServerConfig) -> Result<()> {
    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    let listener = TcpListener::bind(addr).await?;
    info!(%addr, "scenario API listening");
    info!("local access: http://127.0.0.1:{}/api/health", config.port);

    axum::serve(listener, router()).await?;
    Ok(())
}

fn router() -> Router {
    Router::new()
        .route("/api/health", get(health_handler))
        .route(
            "/api/project",
            get(project_get_handler).post(project_post_handler),
        )
        .route("/api/compare", post(compare_handler))
        .fallback(not_found_handler)
}

async fn health_handler() -> Response {
    json_response(StatusCode::OK, HealthResponse { status: "ok" })
}

async fn not_found_handler() -> Response {
    error_response(StatusCode::NOT_FOUND, "Not found")
}

async fn project_get_handler(Query(payload): Query<ScenarioPayload>) -> Response {
    project_handler_impl(payload)
}

async fn project_post_handler(Json(payload): Json<ScenarioPayload>) -> Response {
    project_handler_impl(payload)
}

fn project_handler_impl(payload: ScenarioPayload) -> Response {
    match scenario_from_payload(payload, 0) {
        Ok(scenario) => json_response(StatusCode::OK, build_project_response(&scenario)),
        Err(e) => {
            warn!(error = %e, "rejected projection request");
            error_response(StatusCode::BAD_REQUEST, &e.to_string())
        }
    }
}

async fn compare_handler(Json(payload): Json<ComparePayload>) -> Response {
    let scenarios = match payload
        .scenarios
        .into_iter()
        .enumerate()
        .map(|(position, p)| scenario_from_payload(p, position))
        .collect::<Result<Vec<_>>>()
    {
        Ok(scenarios) => scenarios,
        Err(e) => {
            warn!(error = %e, "rejected comparison request");
            return error_response(StatusCode::BAD_REQUEST, &e.to_string());
        }
    };

    json_response(StatusCode::OK, build_comparison_report(&scenarios))
}

fn build_project_response(scenario: &Scenario) -> ProjectResponse {
    let trajectory = project(scenario);
    ProjectResponse {
        label: scenario.label.clone(),
        final_age: scenario.final_age(),
        final_total_assets: trajectory.total_assets.last().copied().unwrap_or(0.0),
        trajectory,
    }
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
fn scenario_from_json(json: &str) -> Result<Scenario> {
    let payload = serde_json::from_str::<ScenarioPayload>(json)
        .map_err(|e| Error::InvalidPayload(e.to_string()))?;
    scenario_from_payload(payload, 0)
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPS: f64 = 1e-9;

    fn assert_approx(actual: f64, expected: f64) {
        assert!(
            (actual - expected).abs() <= EPS,
            "expected {expected}, got {actual}"
        );
    }

    fn sample_args() -> ScenarioArgs {
        ScenarioArgs::default()
    }

    #[test]
    fn build_scenario_converts_percents_to_decimals() {
        let scenario = build_scenario(sample_args(), 0).expect("valid scenario");
        assert_eq!(scenario.label, "My Scenario");
        assert_approx(scenario.initial_asset, 10_000.0);
        assert_approx(scenario.annual_income_initial, 50_000.0);
        assert_approx(scenario.invest_fraction, 0.30);
        assert_approx(scenario.save_fraction, 0.20);
        assert_approx(scenario.consumption_fraction, 0.50);
        assert_approx(scenario.annual_return_investment, 0.07);
        assert_approx(scenario.annual_return_savings, 0.02);
        assert_approx(scenario.income_growth_rate, 0.03);
        assert_approx(scenario.inflation_rate, 0.02);
        assert_eq!(scenario.years, 30);
        assert_eq!(scenario.starting_age, 30);
    }

    #[test]
    fn build_scenario_rejects_fractions_not_summing_to_hundred() {
        let mut args = sample_args();
        args.consumption_percent = 40.0;

        let err = build_scenario(args, 0).expect_err("must reject 90% total");
        assert!(matches!(err, Error::FractionSum { .. }));
        assert_eq!(
            err.to_string(),
            "Fractions sum to 90.00%, not 100%. Please fix them."
        );
    }

    #[test]
    fn build_scenario_accepts_sum_within_tolerance() {
        let mut args = sample_args();
        args.invest_percent = 33.3;
        args.save_percent = 33.3;
        args.consumption_percent = 33.4;

        assert!(build_scenario(args, 0).is_ok());
    }

    #[test]
    fn build_scenario_rejects_zero_and_negative_horizons() {
        for years in [0, -3] {
            let mut args = sample_args();
            args.years = years;
            let err = build_scenario(args, 0).expect_err("must reject horizon");
            assert!(err.to_string().contains("--years"));
        }
    }

    #[test]
    fn build_scenario_rejects_negative_starting_age() {
        let mut args = sample_args();
        args.starting_age = -1;
        let err = build_scenario(args, 0).expect_err("must reject age");
        assert!(err.to_string().contains("--starting-age"));
    }

    #[test]
    fn build_scenario_rejects_non_finite_rates() {
        let mut args = sample_args();
        args.investment_return = f64::NAN;
        let err = build_scenario(args, 0).expect_err("must reject NaN");
        assert!(err.to_string().contains("--investment-return"));
    }

    #[test]
    fn build_scenario_allows_negative_returns() {
        let mut args = sample_args();
        args.investment_return = -12.5;
        let scenario = build_scenario(args, 0).expect("negative returns are valid");
        assert_approx(scenario.annual_return_investment, -0.125);
    }

    #[test]
    fn blank_label_is_named_after_position() {
        let mut args = sample_args();
        args.label = "   ".to_string();
        let scenario = build_scenario(args, 2).expect("valid scenario");
        assert_eq!(scenario.label, "Scenario_3");
    }

    #[test]
    fn scenario_from_json_parses_web_keys() {
        let json = r#"{
          "label": "Aggressive",
          "initialAsset": 25000,
          "annualIncome": 80000,
          "startingAge": 35,
          "investPercent": 60,
          "savePercent": 10,
          "consumptionPercent": 30,
          "investmentReturn": 8.5,
          "savingsReturn": 1.5,
          "incomeGrowth": 2,
          "years": 25
        }"#;
        let scenario = scenario_from_json(json).expect("json should parse");

        assert_eq!(scenario.label, "Aggressive");
        assert_approx(scenario.initial_asset, 25_000.0);
        assert_approx(scenario.annual_income_initial, 80_000.0);
        assert_eq!(scenario.starting_age, 35);
        assert_approx(scenario.invest_fraction, 0.60);
        assert_approx(scenario.save_fraction, 0.10);
        assert_approx(scenario.consumption_fraction, 0.30);
        assert_approx(scenario.annual_return_investment, 0.085);
        assert_approx(scenario.annual_return_savings, 0.015);
        assert_approx(scenario.income_growth_rate, 0.02);
        assert_approx(scenario.inflation_rate, 0.02);
        assert_eq!(scenario.years, 25);
    }

    #[test]
    fn model_field_keys_are_read_as_decimals() {
        let json = r#"{
          "annualIncomeInitial": 60000,
          "investFraction": 0.3,
          "saveFraction": 0.2,
          "consumptionFraction": 0.5,
          "annualReturnInvestment": 0.07,
          "annualReturnSavings": 0.02,
          "incomeGrowthRate": 0.03,
          "inflationRate": 0.025
        }"#;
        let scenario = scenario_from_json(json).expect("decimal fractions sum to one");
        assert_approx(scenario.annual_income_initial, 60_000.0);
        assert_approx(scenario.invest_fraction, 0.3);
        assert_approx(scenario.save_fraction, 0.2);
        assert_approx(scenario.consumption_fraction, 0.5);
        assert_approx(scenario.annual_return_investment, 0.07);
        assert_approx(scenario.annual_return_savings, 0.02);
        assert_approx(scenario.income_growth_rate, 0.03);
        assert_approx(scenario.inflation_rate, 0.025);
    }

    #[test]
    fn decimal_key_overrides_percent_key() {
        let json = r#"{ "investmentReturn": 5, "annualReturnInvestment": 0.07 }"#;
        let scenario = scenario_from_json(json).expect("json should parse");
        assert_approx(scenario.annual_return_investment, 0.07);
    }

    #[test]
    fn scenario_from_json_reports_malformed_payload() {
        let err = scenario_from_json(r#"{ "years": "many" }"#).expect_err("must reject");
        assert!(matches!(err, Error::InvalidPayload(_)));
    }

    #[test]
    fn scenarios_from_json_reads_array() {
        let json = r#"[
          { "label": "A" },
          { "label": "B", "investmentReturn": 5 }
        ]"#;
        let scenarios = scenarios_from_json(json).expect("array should parse");
        assert_eq!(scenarios.len(), 2);
        assert_eq!(scenarios[1].label, "B");
        assert_approx(scenarios[1].annual_return_investment, 0.05);
    }

    #[test]
    fn invalid_projection_request_is_bad_request_with_no_store() {
        let payload = ScenarioPayload {
            consumption_percent: Some(10.0),
            ..ScenarioPayload::default()
        };
        let response = project_handler_impl(payload);
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            response
                .headers()
                .get(header::CACHE_CONTROL)
                .and_then(|v| v.to_str().ok()),
            Some("no-store")
        );
    }

    #[test]
    fn valid_projection_request_is_ok() {
        let response = project_handler_impl(ScenarioPayload::default());
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[test]
    fn project_response_serialization_contains_expected_fields() {
        let mut args = sample_args();
        args.years = 2;
        let scenario = build_scenario(args, 0).expect("valid scenario");
        let response = build_project_response(&scenario);

        assert_eq!(response.final_age, 32);
        assert_eq!(response.trajectory.len(), 3);
        let json = serde_json::to_string(&response).expect("response should serialize");
        assert!(json.contains("\"finalTotalAssets\""));
        assert!(json.contains("\"totalAssets\""));
        assert!(json.contains("\"investmentAccount\""));
        assert!(json.contains("\"savingsAccount\""));
        assert!(json.contains("\"initialAssetOnly\""));
        assert!(json.contains("\"incomeContributionOnlyInv\""));
        assert!(json.contains("\"incomeContributionOnlySav\""));
        assert!(json.contains("\"incomeContributionOnly\""));
    }
}
