mod input;

use axum::{
    Router,
    extract::{Json, Query},
    http::{StatusCode, header},
    response::{IntoResponse, Response},
    routing::get,
};
use chrono::NaiveDate;
use clap::Parser;
use serde::{Deserialize, Serialize};
use std::ffi::OsString;
use std::net::SocketAddr;
use tokio::net::TcpListener;

use crate::core::{
    Bonus, CpfPolicy, ForecastResult, HousingLoan, Inputs, run_forecast, years_and_months,
};

pub use input::{CliError, FormValue, InputError, parse_amount, round_to_2dec};

const MAX_AGE: u32 = 120;

#[derive(Parser, Debug, Clone)]
#[command(
    name = "cpf-forecast",
    about = "Month-by-month CPF forecast (ordinary, special and retirement accounts) to payout age"
)]
pub struct Cli {
    #[arg(long, help = "Birth date, YYYY-MM-DD")]
    birth_date: Option<NaiveDate>,
    #[arg(long, help = "First simulated month, YYYY-MM-DD; defaults to today")]
    start_date: Option<NaiveDate>,
    #[arg(long, default_value = "0")]
    ordinary_balance: String,
    #[arg(long, default_value = "0")]
    special_balance: String,
    #[arg(long, default_value = "0")]
    monthly_salary: String,
    #[arg(
        long,
        default_value = "0",
        help = "Annual salary increase in percent, applied every January"
    )]
    salary_increase: String,
    #[arg(long, help = "Annual bonus as a multiple of the monthly salary")]
    bonus_months: Option<String>,
    #[arg(long, help = "Calendar month (1-12) the bonus is paid in")]
    bonus_month: Option<u32>,
    #[arg(long, help = "Lump sum paid from the ordinary account for housing")]
    housing_loan: Option<String>,
    #[arg(long, help = "Month of the housing lump sum and first monthly payment")]
    housing_loan_date: Option<NaiveDate>,
    #[arg(long, help = "Monthly housing payment from the ordinary account")]
    housing_payment: Option<String>,
    #[arg(long, help = "Housing loan tenure in years")]
    housing_tenure: Option<u32>,
    #[arg(
        long,
        help = "Move the ordinary account and all future ordinary contributions into the special account"
    )]
    special_account_only: bool,
    #[arg(long, default_value_t = 55)]
    withdrawal_age: u32,
    #[arg(long, default_value_t = 65)]
    payout_age: u32,
    #[arg(
        long,
        default_value_t = 192000.0,
        help = "Full retirement sum in the first simulated year"
    )]
    full_retirement_sum: f64,
    #[arg(
        long,
        default_value_t = 6000.0,
        help = "Dollar increase of the full retirement sum per year"
    )]
    frs_annual_increase: f64,
    #[arg(long, default_value_t = 6000.0)]
    ordinary_wage_ceiling: f64,
    #[arg(long, default_value_t = 102000.0)]
    annual_wage_ceiling: f64,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct ForecastPayload {
    birth_date: Option<NaiveDate>,
    start_date: Option<NaiveDate>,

    ordinary_balance: Option<FormValue>,
    special_balance: Option<FormValue>,
    monthly_salary: Option<FormValue>,
    salary_increase: Option<FormValue>,

    bonus_months: Option<FormValue>,
    bonus_month: Option<u32>,

    housing_loan: Option<FormValue>,
    housing_loan_date: Option<NaiveDate>,
    housing_payment: Option<FormValue>,
    housing_tenure: Option<u32>,

    special_account_only: Option<bool>,

    withdrawal_age: Option<u32>,
    payout_age: Option<u32>,
    full_retirement_sum: Option<f64>,
    frs_annual_increase: Option<f64>,
    ordinary_wage_ceiling: Option<f64>,
    annual_wage_ceiling: Option<f64>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ForecastResponse {
    start_date: NaiveDate,
    time_until_withdrawal: String,
    valid: bool,
    #[serde(flatten)]
    forecast: ForecastResult,
}

#[derive(Debug, Serialize)]
struct ErrorResponse {
    error: String,
}

fn parse_optional(flag: &'static str, raw: Option<&str>) -> Result<f64, InputError> {
    raw.map_or(Ok(0.0), |raw| parse_amount(flag, raw))
}

fn build_inputs(cli: Cli, today: NaiveDate) -> Result<Inputs, InputError> {
    let Some(birth_date) = cli.birth_date else {
        return Err(InputError::Missing {
            flag: "--birth-date",
            condition: "forecasting",
        });
    };
    let start_date = cli.start_date.unwrap_or(today);
    if birth_date > start_date {
        return Err(InputError::OutOfRange {
            flag: "--birth-date",
            requirement: "on or before --start-date",
        });
    }

    if cli.withdrawal_age == 0 {
        return Err(InputError::OutOfRange {
            flag: "--withdrawal-age",
            requirement: "> 0",
        });
    }
    if cli.withdrawal_age > MAX_AGE {
        return Err(InputError::OutOfRange {
            flag: "--withdrawal-age",
            requirement: "<= 120",
        });
    }
    if cli.payout_age > MAX_AGE {
        return Err(InputError::OutOfRange {
            flag: "--payout-age",
            requirement: "<= 120",
        });
    }
    if cli.payout_age <= cli.withdrawal_age {
        return Err(InputError::OutOfRange {
            flag: "--payout-age",
            requirement: "> --withdrawal-age",
        });
    }
    for (flag, value) in [
        ("--full-retirement-sum", cli.full_retirement_sum),
        ("--frs-annual-increase", cli.frs_annual_increase),
        ("--ordinary-wage-ceiling", cli.ordinary_wage_ceiling),
        ("--annual-wage-ceiling", cli.annual_wage_ceiling),
    ] {
        if !value.is_finite() || value < 0.0 {
            return Err(InputError::OutOfRange {
                flag,
                requirement: ">= 0",
            });
        }
    }

    let ordinary_start = parse_amount("--ordinary-balance", &cli.ordinary_balance)?;
    let special_start = parse_amount("--special-balance", &cli.special_balance)?;
    let monthly_salary = parse_amount("--monthly-salary", &cli.monthly_salary)?;
    let salary_increase_rate = parse_amount("--salary-increase", &cli.salary_increase)?;

    let bonus_months = parse_optional("--bonus-months", cli.bonus_months.as_deref())?;
    let bonus = if bonus_months > 0.0 {
        let Some(month) = cli.bonus_month else {
            return Err(InputError::Missing {
                flag: "--bonus-month",
                condition: "--bonus-months > 0",
            });
        };
        if !(1..=12).contains(&month) {
            return Err(InputError::OutOfRange {
                flag: "--bonus-month",
                requirement: "between 1 and 12",
            });
        }
        Some(Bonus {
            months: bonus_months,
            month,
        })
    } else {
        None
    };

    let lump_sum = parse_optional("--housing-loan", cli.housing_loan.as_deref())?;
    let monthly_payment = parse_optional("--housing-payment", cli.housing_payment.as_deref())?;
    let housing = if lump_sum > 0.0 || monthly_payment > 0.0 {
        let Some(date) = cli.housing_loan_date else {
            return Err(InputError::Missing {
                flag: "--housing-loan-date",
                condition: "--housing-loan or --housing-payment > 0",
            });
        };
        let tenure_years = cli.housing_tenure.unwrap_or(0);
        if monthly_payment > 0.0 && tenure_years == 0 {
            return Err(InputError::Missing {
                flag: "--housing-tenure",
                condition: "--housing-payment > 0",
            });
        }
        Some(HousingLoan {
            date,
            lump_sum,
            monthly_payment,
            tenure_years,
        })
    } else {
        None
    };

    Ok(Inputs {
        start_date,
        birth_date,
        ordinary_start,
        special_start,
        monthly_salary,
        salary_increase_rate,
        bonus,
        housing,
        special_account_only: cli.special_account_only,
        policy: CpfPolicy {
            withdrawal_age: cli.withdrawal_age,
            payout_age: cli.payout_age,
            full_retirement_sum: cli.full_retirement_sum,
            full_retirement_sum_increase: cli.frs_annual_increase,
            ordinary_wage_ceiling: cli.ordinary_wage_ceiling,
            annual_wage_ceiling: cli.annual_wage_ceiling,
        },
    })
}

fn today() -> NaiveDate {
    chrono::Local::now().date_naive()
}

/// Parses command-line arguments, runs the forecast and returns it as JSON.
pub fn run_cli<I, T>(args: I) -> Result<String, CliError>
where
    I: IntoIterator<Item = T>,
    T: Into<OsString> + Clone,
{
    let cli = Cli::parse_from(args);
    let inputs = build_inputs(cli, today())?;
    let result = run_forecast(&inputs);
    let response = build_forecast_response(&inputs, result);
    Ok(serde_json::to_string_pretty(&response)?)
}

pub async fn run_http_server(port: u16) -> std::io::Result<()> {
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let app = Router::new()
        .route(
            "/api/forecast",
            get(forecast_get_handler).post(forecast_post_handler),
        )
        .fallback(not_found_handler);

    let listener = TcpListener::bind(addr).await?;
    log::info!("CPF forecast API listening on http://{addr}");
    log::info!("Local access: http://127.0.0.1:{port}/api/forecast");

    axum::serve(listener, app).await
}

async fn not_found_handler() -> Response {
    error_response(StatusCode::NOT_FOUND, "Not found")
}

async fn forecast_get_handler(Query(payload): Query<ForecastPayload>) -> Response {
    forecast_handler_impl(payload)
}

async fn forecast_post_handler(Json(payload): Json<ForecastPayload>) -> Response {
    forecast_handler_impl(payload)
}

fn forecast_handler_impl(payload: ForecastPayload) -> Response {
    let inputs = match inputs_from_payload(payload, today()) {
        Ok(inputs) => inputs,
        Err(err) => {
            log::debug!("rejected forecast request: {err}");
            return error_response(StatusCode::BAD_REQUEST, &err.to_string());
        }
    };

    let result = run_forecast(&inputs);
    json_response(StatusCode::OK, build_forecast_response(&inputs, result))
}

fn json_response<T: Serialize>(status: StatusCode, body: T) -> Response {
    let mut response = (status, Json(body)).into_response();
    response.headers_mut().insert(
        header::CACHE_CONTROL,
        "no-store".parse().expect("valid header"),
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

fn build_forecast_response(inputs: &Inputs, forecast: ForecastResult) -> ForecastResponse {
    ForecastResponse {
        start_date: inputs.start_date,
        time_until_withdrawal: years_and_months(forecast.months_until_withdrawal),
        valid: forecast.errors.is_empty(),
        forecast,
    }
}

#[cfg(test)]
fn inputs_from_json(json: &str, today: NaiveDate) -> Result<Inputs, String> {
    let payload = serde_json::from_str::<ForecastPayload>(json)
        .map_err(|e| format!("Invalid API JSON payload: {e}"))?;
    inputs_from_payload(payload, today).map_err(|e| e.to_string())
}

fn inputs_from_payload(payload: ForecastPayload, today: NaiveDate) -> Result<Inputs, InputError> {
    let mut cli = default_cli_for_api();

    if let Some(v) = payload.birth_date {
        cli.birth_date = Some(v);
    }
    if let Some(v) = payload.start_date {
        cli.start_date = Some(v);
    }

    if let Some(v) = payload.ordinary_balance {
        cli.ordinary_balance = v.into_text();
    }
    if let Some(v) = payload.special_balance {
        cli.special_balance = v.into_text();
    }
    if let Some(v) = payload.monthly_salary {
        cli.monthly_salary = v.into_text();
    }
    if let Some(v) = payload.salary_increase {
        cli.salary_increase = v.into_text();
    }

    if let Some(v) = payload.bonus_months {
        cli.bonus_months = Some(v.into_text());
    }
    if let Some(v) = payload.bonus_month {
        cli.bonus_month = Some(v);
    }

    if let Some(v) = payload.housing_loan {
        cli.housing_loan = Some(v.into_text());
    }
    if let Some(v) = payload.housing_loan_date {
        cli.housing_loan_date = Some(v);
    }
    if let Some(v) = payload.housing_payment {
        cli.housing_payment = Some(v.into_text());
    }
    if let Some(v) = payload.housing_tenure {
        cli.housing_tenure = Some(v);
    }

    if let Some(v) = payload.special_account_only {
        cli.special_account_only = v;
    }

    if let Some(v) = payload.withdrawal_age {
        cli.withdrawal_age = v;
    }
    if let Some(v) = payload.payout_age {
        cli.payout_age = v;
    }
    if let Some(v) = payload.full_retirement_sum {
        cli.full_retirement_sum = v;
    }
    if let Some(v) = payload.frs_annual_increase {
        cli.frs_annual_increase = v;
    }
    if let Some(v) = payload.ordinary_wage_ceiling {
        cli.ordinary_wage_ceiling = v;
    }
    if let Some(v) = payload.annual_wage_ceiling {
        cli.annual_wage_ceiling = v;
    }

    build_inputs(cli, today)
}

fn default_cli_for_api() -> Cli {
    let policy = CpfPolicy::default();
    Cli {
        birth_date: None,
        start_date: None,
        ordinary_balance: "0".to_string(),
        special_balance: "0".to_string(),
        monthly_salary: "0".to_string(),
        salary_increase: "0".to_string(),
        bonus_months: None,
        bonus_month: None,
        housing_loan: None,
        housing_loan_date: None,
        housing_payment: None,
        housing_tenure: None,
        special_account_only: false,
        withdrawal_age: policy.withdrawal_age,
        payout_age: policy.payout_age,
        full_retirement_sum: policy.full_retirement_sum,
        frs_annual_increase: policy.full_retirement_sum_increase,
        ordinary_wage_ceiling: policy.ordinary_wage_ceiling,
        annual_wage_ceiling: policy.annual_wage_ceiling,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPS: f64 = 1e-6;

    fn assert_approx(actual: f64, expected: f64) {
        assert!(
            (actual - expected).abs() <= EPS,
            "expected {expected}, got {actual}"
        );
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).expect("valid date")
    }

    fn sample_cli() -> Cli {
        let mut cli = default_cli_for_api();
        cli.birth_date = Some(date(1990, 4, 12));
        cli.ordinary_balance = "20000".to_string();
        cli.special_balance = "15000".to_string();
        cli.monthly_salary = "4500".to_string();
        cli.salary_increase = "3".to_string();
        cli
    }

    #[test]
    fn build_inputs_defaults_start_date_to_today() {
        let inputs = build_inputs(sample_cli(), date(2025, 3, 1)).expect("valid inputs");
        assert_eq!(inputs.start_date, date(2025, 3, 1));
        assert_approx(inputs.ordinary_start, 20_000.0);
        assert_approx(inputs.salary_increase_rate, 3.0);
        assert!(inputs.bonus.is_none());
        assert!(inputs.housing.is_none());
        assert_eq!(inputs.policy, CpfPolicy::default());
    }

    #[test]
    fn build_inputs_requires_birth_date() {
        let mut cli = sample_cli();
        cli.birth_date = None;
        let err = build_inputs(cli, date(2025, 3, 1)).expect_err("must require birth date");
        assert!(err.to_string().contains("--birth-date"));
    }

    #[test]
    fn build_inputs_rejects_birth_after_start() {
        let mut cli = sample_cli();
        cli.start_date = Some(date(1980, 1, 1));
        let err = build_inputs(cli, date(2025, 3, 1)).expect_err("must reject unborn person");
        assert!(err.to_string().contains("--birth-date"));
    }

    #[test]
    fn build_inputs_truncates_amounts_to_cents() {
        let mut cli = sample_cli();
        cli.ordinary_balance = "0012345.678".to_string();
        let inputs = build_inputs(cli, date(2025, 3, 1)).expect("valid inputs");
        assert_approx(inputs.ordinary_start, 12_345.67);
    }

    #[test]
    fn build_inputs_rejects_negative_balances() {
        let mut cli = sample_cli();
        cli.special_balance = "-1".to_string();
        let err = build_inputs(cli, date(2025, 3, 1)).expect_err("must reject negative");
        assert!(err.to_string().contains("--special-balance"));
    }

    #[test]
    fn build_inputs_requires_bonus_month_for_bonus() {
        let mut cli = sample_cli();
        cli.bonus_months = Some("1.5".to_string());
        let err = build_inputs(cli.clone(), date(2025, 3, 1)).expect_err("must require month");
        assert!(err.to_string().contains("--bonus-month"));

        cli.bonus_month = Some(13);
        let err = build_inputs(cli.clone(), date(2025, 3, 1)).expect_err("must reject month 13");
        assert!(err.to_string().contains("between 1 and 12"));

        cli.bonus_month = Some(12);
        let inputs = build_inputs(cli, date(2025, 3, 1)).expect("valid inputs");
        assert_eq!(
            inputs.bonus,
            Some(Bonus {
                months: 1.5,
                month: 12
            })
        );
    }

    #[test]
    fn build_inputs_requires_housing_date_and_tenure() {
        let mut cli = sample_cli();
        cli.housing_payment = Some("900".to_string());
        let err = build_inputs(cli.clone(), date(2025, 3, 1)).expect_err("must require date");
        assert!(err.to_string().contains("--housing-loan-date"));

        cli.housing_loan_date = Some(date(2027, 1, 1));
        let err = build_inputs(cli.clone(), date(2025, 3, 1)).expect_err("must require tenure");
        assert!(err.to_string().contains("--housing-tenure"));

        cli.housing_tenure = Some(25);
        let inputs = build_inputs(cli, date(2025, 3, 1)).expect("valid inputs");
        let housing = inputs.housing.expect("housing present");
        assert_approx(housing.monthly_payment, 900.0);
        assert_approx(housing.lump_sum, 0.0);
        assert_eq!(housing.tenure_years, 25);
    }

    #[test]
    fn build_inputs_rejects_payout_age_not_after_withdrawal_age() {
        let mut cli = sample_cli();
        cli.payout_age = 55;
        let err = build_inputs(cli, date(2025, 3, 1)).expect_err("must reject ages");
        assert!(err.to_string().contains("--payout-age"));
    }

    #[test]
    fn build_inputs_rejects_ages_beyond_a_lifetime() {
        let mut cli = sample_cli();
        cli.payout_age = 300_000;
        let err = build_inputs(cli, date(2025, 3, 1)).expect_err("must reject payout age");
        assert_eq!(
            err,
            InputError::OutOfRange {
                flag: "--payout-age",
                requirement: "<= 120",
            }
        );

        let mut cli = sample_cli();
        cli.withdrawal_age = 121;
        cli.payout_age = 130;
        let err = build_inputs(cli, date(2025, 3, 1)).expect_err("must reject withdrawal age");
        assert!(err.to_string().contains("--withdrawal-age"));

        let mut cli = sample_cli();
        cli.withdrawal_age = 110;
        cli.payout_age = MAX_AGE;
        assert!(build_inputs(cli, date(2025, 3, 1)).is_ok());
    }

    #[test]
    fn oversized_payout_age_in_json_is_rejected() {
        let json = r#"{"birthDate": "1990-01-01", "payoutAge": 300000}"#;
        let err = inputs_from_json(json, date(2025, 3, 1)).expect_err("must reject");
        assert!(err.to_string().contains("--payout-age"));
    }

    #[test]
    fn inputs_from_json_parses_form_keys() {
        let json = r#"{
          "birthDate": "1985-07-30",
          "startDate": "2025-02-14",
          "ordinaryBalance": "045000.999",
          "specialBalance": 30000,
          "monthlySalary": "7000",
          "salaryIncrease": 2.5,
          "bonusMonths": "2",
          "bonusMonth": 12,
          "housingLoan": 60000,
          "housingLoanDate": "2026-05-01",
          "specialAccountOnly": true,
          "fullRetirementSum": 205800
        }"#;
        let inputs = inputs_from_json(json, date(2030, 1, 1)).expect("json should parse");

        assert_eq!(inputs.birth_date, date(1985, 7, 30));
        assert_eq!(inputs.start_date, date(2025, 2, 14));
        assert_approx(inputs.ordinary_start, 45_000.99);
        assert_approx(inputs.special_start, 30_000.0);
        assert_approx(inputs.monthly_salary, 7_000.0);
        assert_approx(inputs.salary_increase_rate, 2.5);
        assert_eq!(
            inputs.bonus,
            Some(Bonus {
                months: 2.0,
                month: 12
            })
        );
        let housing = inputs.housing.expect("housing present");
        assert_approx(housing.lump_sum, 60_000.0);
        assert_eq!(housing.date, date(2026, 5, 1));
        assert!(inputs.special_account_only);
        assert_approx(inputs.policy.full_retirement_sum, 205_800.0);
        assert_eq!(inputs.policy.withdrawal_age, 55);
    }

    #[test]
    fn inputs_from_json_reports_bad_numbers() {
        let json = r#"{ "birthDate": "1985-07-30", "monthlySalary": "lots" }"#;
        let err = inputs_from_json(json, date(2025, 1, 1)).expect_err("must reject");
        assert!(err.contains("--monthly-salary"));
    }

    #[test]
    fn forecast_response_serialization_contains_expected_fields() {
        let mut cli = sample_cli();
        cli.start_date = Some(date(2025, 3, 1));
        cli.special_account_only = true;
        cli.housing_loan = Some("1000000".to_string());
        cli.housing_loan_date = Some(date(2026, 1, 1));

        let inputs = build_inputs(cli, date(2025, 3, 1)).expect("valid inputs");
        let result = run_forecast(&inputs);
        let response = build_forecast_response(&inputs, result);
        assert!(!response.valid);
        assert_eq!(response.time_until_withdrawal, "20 years and 2 months");

        let json = serde_json::to_string(&response).expect("response should serialize");
        assert!(json.contains("\"startDate\":\"2025-03-01\""));
        assert!(json.contains("\"timeUntilWithdrawal\""));
        assert!(json.contains("\"historyUntilWithdrawal\""));
        assert!(json.contains("\"historyAfterWithdrawal\""));
        assert!(json.contains("\"salaryHistoryAfterWithdrawal\""));
        assert!(json.contains("\"comparisonValues\":{"));
        assert!(json.contains("\"ordinaryAtWithdrawal\""));
        assert!(json.contains("\"housingLoan\""));
        assert!(!json.contains("\"housingPayment\""));
        assert!(json.contains("\"category\":\"Contribution\""));
    }

    #[test]
    fn run_cli_prints_forecast_json() {
        let json = run_cli([
            "cpf-forecast",
            "--birth-date",
            "1995-09-01",
            "--start-date",
            "2025-01-15",
            "--ordinary-balance",
            "1000",
            "--special-balance",
            "1000",
            "--monthly-salary",
            "1000",
            "--salary-increase",
            "1",
        ])
        .expect("forecast should run");

        let value: serde_json::Value = serde_json::from_str(&json).expect("valid json");
        assert_eq!(value["monthsUntilWithdrawal"], 308);
        assert!(value["comparisonValues"].is_null());
        assert_eq!(value["valid"], true);
    }
}
