mod http;

use clap::{Args, Parser, Subcommand};
use serde::Serialize;
use std::path::PathBuf;

use crate::core::{
    AmortizationRow, AssetProfile, BreakEvenConfig, BreakEvenResult, Journey, Lifestyle,
    LoanRequest, PRESET_IDS, PartyProfile, Priorities, ProjectionConfig, RatePoint,
    RateRecommendation, RecommendationSummary, amortization_schedule, credit_adjusted_apr,
    default_party, generate_journey, generate_rate_timeline, monthly_payment, preset, presets,
    recommend, recommend_rate_choice, solve_break_even_mileage, total_interest,
};

pub use http::run_http_server;

#[derive(Parser, Debug)]
#[command(
    name = "buylease",
    about = "Buy-versus-lease journey projections, rate navigation and payment math"
)]
pub struct Cli {
    #[arg(
        long,
        global = true,
        help = "JSON file overriding projection constants, event rules and scoring weights"
    )]
    config: Option<PathBuf>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Serve the JSON API over HTTP.
    Serve {
        #[arg(long, default_value_t = 8080)]
        port: u16,
    },
    /// Project owning and leasing month by month and recommend one.
    Journey(JourneyArgs),
    /// Compare a fixed-rate loan against a variable-rate one.
    Rates(RateArgs),
    /// Monthly payment and optional amortization schedule.
    Payment(PaymentArgs),
    /// Solve the annual mileage at which buying becomes cheaper than leasing.
    BreakEven(BreakEvenArgs),
    /// List the built-in vehicle presets.
    Presets,
}

#[derive(Args, Debug, Clone, PartialEq)]
pub(crate) struct ProfileArgs {
    #[arg(long, default_value = "compact-ev", help = "Vehicle preset id")]
    preset: String,
    #[arg(long, help = "Override the preset purchase price")]
    price: Option<f64>,
    #[arg(long)]
    down_payment: Option<f64>,
    #[arg(long, help = "Loan APR in percent, e.g. 6.99")]
    loan_apr: Option<f64>,
    #[arg(long)]
    loan_term_months: Option<u32>,
    #[arg(long, help = "Lease residual value in percent of price")]
    lease_residual: Option<f64>,
    #[arg(long)]
    money_factor: Option<f64>,
    #[arg(long)]
    lease_term_months: Option<u32>,
    #[arg(long, help = "Lease mileage allowance per year")]
    mileage_allowance: Option<f64>,

    #[arg(long, default_value_t = 740)]
    credit_score: u16,
    #[arg(long, default_value_t = 95_000.0)]
    annual_income: f64,
    #[arg(long, default_value_t = 650.0)]
    monthly_budget: f64,
    #[arg(long, default_value_t = 12_000.0)]
    annual_miles: f64,

    #[arg(long, default_value_t = 7, help = "Priority weight 0-10")]
    low_monthly_cost: u8,
    #[arg(long, default_value_t = 6, help = "Priority weight 0-10")]
    long_term_value: u8,
    #[arg(long, default_value_t = 5, help = "Priority weight 0-10")]
    flexibility: u8,
    #[arg(long, default_value_t = 4, help = "Priority weight 0-10")]
    latest_technology: u8,
    #[arg(long, default_value_t = 6, help = "Priority weight 0-10")]
    low_maintenance: u8,

    #[arg(long)]
    growing_family: bool,
    #[arg(long, help = "Income varies from month to month")]
    variable_income: bool,
    #[arg(long)]
    long_road_trips: bool,
    #[arg(long)]
    enjoys_new_vehicles: bool,
}

#[derive(Args, Debug, Clone, PartialEq)]
pub(crate) struct JourneyArgs {
    #[command(flatten)]
    profile: ProfileArgs,
    #[arg(long, default_value_t = 60)]
    horizon_months: u32,
    #[arg(long, default_value_t = 42)]
    seed: u64,
    #[arg(long, help = "Omit the month-by-month snapshots from the output")]
    summary_only: bool,
}

#[derive(Args, Debug, Clone, PartialEq)]
pub(crate) struct BreakEvenArgs {
    #[command(flatten)]
    profile: ProfileArgs,
    #[arg(long, default_value_t = 36)]
    horizon_months: u32,
    #[arg(long, default_value_t = 0.0)]
    search_min: f64,
    #[arg(long, default_value_t = 60_000.0)]
    search_max: f64,
    #[arg(long, default_value_t = 25.0, help = "Mileage tolerance for the bisection")]
    tolerance: f64,
    #[arg(long, default_value_t = 40)]
    max_iterations: u32,
}

#[derive(Args, Debug, Clone, PartialEq)]
pub(crate) struct RateArgs {
    #[arg(long, default_value_t = 300_000.0)]
    principal: f64,
    #[arg(long, default_value_t = 360)]
    term_months: u32,
    #[arg(long, default_value_t = 6.5, help = "Fixed APR in percent")]
    fixed_apr: f64,
    #[arg(long, default_value_t = 4.5, help = "Starting index rate in percent")]
    index_rate: f64,
    #[arg(long, default_value_t = 1.25, help = "Variable margin over the index in percent")]
    variable_margin: f64,
    #[arg(long, default_value_t = 12)]
    reset_months: u32,
    #[arg(long, help = "Months to project; defaults to the full term")]
    horizon_months: Option<u32>,
    #[arg(long, default_value_t = 42)]
    seed: u64,
    #[arg(long, help = "Income varies from month to month")]
    variable_income: bool,
    #[arg(long, default_value_t = 5, help = "Flexibility priority 0-10")]
    flexibility: u8,
}

#[derive(Args, Debug, Clone, PartialEq)]
pub(crate) struct PaymentArgs {
    #[arg(long, default_value_t = 42_990.0)]
    principal: f64,
    #[arg(long, default_value_t = 6.99, help = "APR in percent")]
    apr: f64,
    #[arg(long, default_value_t = 72)]
    term_months: u32,
    #[arg(long, help = "Adjust the APR for this credit score")]
    credit_score: Option<u16>,
    #[arg(long, help = "Include the full amortization schedule")]
    schedule: bool,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct JourneyResponse {
    preset: String,
    asset: AssetProfile,
    party: PartyProfile,
    horizon_months: u32,
    seed: u64,
    recommendation: RecommendationSummary,
    #[serde(skip_serializing_if = "Option::is_none")]
    journey: Option<Journey>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct RatesResponse {
    request: LoanRequest,
    horizon_months: u32,
    seed: u64,
    recommendation: RateRecommendation,
    timeline: Vec<RatePoint>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct PaymentResponse {
    principal: f64,
    apr: f64,
    term_months: u32,
    monthly_payment: f64,
    total_interest: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    schedule: Option<Vec<AmortizationRow>>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct BreakEvenResponse {
    preset: String,
    asset: AssetProfile,
    #[serde(flatten)]
    result: BreakEvenResult,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct PresetEntry {
    id: &'static str,
    asset: AssetProfile,
}

fn percent(flag: &str, value: f64) -> Result<f64, String> {
    if !value.is_finite() || !(0.0..=100.0).contains(&value) {
        return Err(format!("{flag} must be between 0 and 100"));
    }
    Ok(value / 100.0)
}

fn build_profiles(args: &ProfileArgs) -> Result<(AssetProfile, PartyProfile), String> {
    let mut asset = preset(&args.preset).ok_or_else(|| {
        format!(
            "--preset '{}' is unknown; expected one of: {}",
            args.preset,
            PRESET_IDS.join(", ")
        )
    })?;

    if let Some(v) = args.price {
        asset.price = v;
    }
    if let Some(v) = args.down_payment {
        asset.down_payment = v;
    }
    if let Some(v) = args.loan_apr {
        asset.loan_apr = percent("--loan-apr", v)?;
    }
    if let Some(v) = args.loan_term_months {
        asset.loan_term_months = v;
    }
    if let Some(v) = args.lease_residual {
        asset.lease_residual = percent("--lease-residual", v)?;
    }
    if let Some(v) = args.money_factor {
        asset.money_factor = v;
    }
    if let Some(v) = args.lease_term_months {
        asset.lease_term_months = v;
    }
    if let Some(v) = args.mileage_allowance {
        asset.lease_mileage_allowance = v;
    }
    asset.validate().map_err(|e| e.to_string())?;

    let party = PartyProfile {
        credit_score: args.credit_score,
        annual_income: args.annual_income,
        monthly_budget: args.monthly_budget,
        annual_miles: args.annual_miles,
        priorities: Priorities {
            low_monthly_cost: args.low_monthly_cost,
            long_term_value: args.long_term_value,
            flexibility: args.flexibility,
            latest_technology: args.latest_technology,
            low_maintenance: args.low_maintenance,
        },
        lifestyle: Lifestyle {
            growing_family: args.growing_family,
            stable_income: !args.variable_income,
            long_road_trips: args.long_road_trips,
            enjoys_new_vehicles: args.enjoys_new_vehicles,
        },
    };
    party.validate().map_err(|e| e.to_string())?;

    Ok((asset, party))
}

fn build_loan_request(args: &RateArgs) -> Result<(LoanRequest, PartyProfile), String> {
    let request = LoanRequest {
        principal: args.principal,
        term_months: args.term_months,
        fixed_apr: percent("--fixed-apr", args.fixed_apr)?,
        index_rate: percent("--index-rate", args.index_rate)?,
        variable_margin: percent("--variable-margin", args.variable_margin)?,
        reset_months: args.reset_months,
    };
    request.validate().map_err(|e| e.to_string())?;

    let mut party = default_party();
    party.lifestyle.stable_income = !args.variable_income;
    party.priorities.flexibility = args.flexibility;
    party.validate().map_err(|e| e.to_string())?;
    Ok((request, party))
}

pub(crate) fn run_journey(
    args: &JourneyArgs,
    config: &ProjectionConfig,
) -> Result<JourneyResponse, String> {
    let (asset, party) = build_profiles(&args.profile)?;
    let journey = generate_journey(&asset, &party, args.horizon_months, config, args.seed)
        .map_err(|e| e.to_string())?;
    let recommendation = recommend(&journey, &asset, &party, config).map_err(|e| e.to_string())?;
    Ok(JourneyResponse {
        preset: args.profile.preset.clone(),
        horizon_months: journey.len() as u32,
        seed: args.seed,
        asset,
        party,
        recommendation,
        journey: (!args.summary_only).then_some(journey),
    })
}

pub(crate) fn run_rates(args: &RateArgs, config: &ProjectionConfig) -> Result<RatesResponse, String> {
    let (request, party) = build_loan_request(args)?;
    let horizon_months = args.horizon_months.unwrap_or(request.term_months);
    let timeline = generate_rate_timeline(&request, horizon_months, config, args.seed)
        .map_err(|e| e.to_string())?;
    let recommendation =
        recommend_rate_choice(&timeline, &party, config).map_err(|e| e.to_string())?;
    Ok(RatesResponse {
        request,
        horizon_months: timeline.len() as u32,
        seed: args.seed,
        recommendation,
        timeline,
    })
}

pub(crate) fn run_payment(args: &PaymentArgs) -> Result<PaymentResponse, String> {
    let mut apr = percent("--apr", args.apr)?;
    if let Some(score) = args.credit_score {
        if !(300..=850).contains(&score) {
            return Err("--credit-score must be between 300 and 850".to_string());
        }
        apr = credit_adjusted_apr(apr, score);
    }
    let rate = apr / 12.0;
    let monthly_payment =
        monthly_payment(args.principal, rate, args.term_months).map_err(|e| e.to_string())?;
    let total_interest =
        total_interest(args.principal, rate, args.term_months).map_err(|e| e.to_string())?;
    let schedule = if args.schedule {
        Some(amortization_schedule(args.principal, rate, args.term_months).map_err(|e| e.to_string())?)
    } else {
        None
    };
    Ok(PaymentResponse {
        principal: args.principal,
        apr,
        term_months: args.term_months,
        monthly_payment,
        total_interest,
        schedule,
    })
}

pub(crate) fn run_break_even(
    args: &BreakEvenArgs,
    config: &ProjectionConfig,
) -> Result<BreakEvenResponse, String> {
    let (asset, party) = build_profiles(&args.profile)?;
    let search = BreakEvenConfig {
        horizon_months: args.horizon_months,
        search_min: args.search_min,
        search_max: args.search_max,
        tolerance: args.tolerance,
        max_iterations: args.max_iterations,
    };
    let result =
        solve_break_even_mileage(&asset, &party, config, search).map_err(|e| e.to_string())?;
    Ok(BreakEvenResponse {
        preset: args.profile.preset.clone(),
        asset,
        result,
    })
}

pub(crate) fn preset_entries() -> Vec<PresetEntry> {
    presets()
        .into_iter()
        .map(|(id, asset)| PresetEntry { id, asset })
        .collect()
}

fn load_config(path: Option<&PathBuf>) -> Result<ProjectionConfig, String> {
    match path {
        Some(path) => {
            let config = ProjectionConfig::from_path(path).map_err(|e| e.to_string())?;
            log::info!("loaded projection config from {}", path.display());
            Ok(config)
        }
        None => Ok(ProjectionConfig::default()),
    }
}

fn print_json<T: Serialize>(body: &T) -> Result<(), String> {
    let json = serde_json::to_string_pretty(body).map_err(|e| format!("cannot encode output: {e}"))?;
    println!("{json}");
    Ok(())
}

pub async fn run_cli(cli: Cli) -> Result<(), String> {
    let config = load_config(cli.config.as_ref())?;
    match cli.command {
        Command::Serve { port } => run_http_server(port, config)
            .await
            .map_err(|e| format!("server error: {e}")),
        Command::Journey(args) => print_json(&run_journey(&args, &config)?),
        Command::Rates(args) => print_json(&run_rates(&args, &config)?),
        Command::Payment(args) => print_json(&run_payment(&args)?),
        Command::BreakEven(args) => print_json(&run_break_even(&args, &config)?),
        Command::Presets => print_json(&preset_entries()),
    }
}

fn default_profile_for_api() -> ProfileArgs {
    let party = default_party();
    ProfileArgs {
        preset: "compact-ev".to_string(),
        price: None,
        down_payment: None,
        loan_apr: None,
        loan_term_months: None,
        lease_residual: None,
        money_factor: None,
        lease_term_months: None,
        mileage_allowance: None,
        credit_score: party.credit_score,
        annual_income: party.annual_income,
        monthly_budget: party.monthly_budget,
        annual_miles: party.annual_miles,
        low_monthly_cost: party.priorities.low_monthly_cost,
        long_term_value: party.priorities.long_term_value,
        flexibility: party.priorities.flexibility,
        latest_technology: party.priorities.latest_technology,
        low_maintenance: party.priorities.low_maintenance,
        growing_family: party.lifestyle.growing_family,
        variable_income: !party.lifestyle.stable_income,
        long_road_trips: party.lifestyle.long_road_trips,
        enjoys_new_vehicles: party.lifestyle.enjoys_new_vehicles,
    }
}

fn default_journey_for_api() -> JourneyArgs {
    JourneyArgs {
        profile: default_profile_for_api(),
        horizon_months: 60,
        seed: 42,
        summary_only: false,
    }
}

fn default_break_even_for_api() -> BreakEvenArgs {
    let search = BreakEvenConfig::default();
    BreakEvenArgs {
        profile: default_profile_for_api(),
        horizon_months: search.horizon_months,
        search_min: search.search_min,
        search_max: search.search_max,
        tolerance: search.tolerance,
        max_iterations: search.max_iterations,
    }
}

fn default_rates_for_api() -> RateArgs {
    RateArgs {
        principal: 300_000.0,
        term_months: 360,
        fixed_apr: 6.5,
        index_rate: 4.5,
        variable_margin: 1.25,
        reset_months: 12,
        horizon_months: None,
        seed: 42,
        variable_income: false,
        flexibility: 5,
    }
}

fn default_payment_for_api() -> PaymentArgs {
    PaymentArgs {
        principal: 42_990.0,
        apr: 6.99,
        term_months: 72,
        credit_score: None,
        schedule: false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::Decision;

    const EPS: f64 = 1e-6;

    fn assert_approx(actual: f64, expected: f64) {
        assert!(
            (actual - expected).abs() <= EPS,
            "expected {expected}, got {actual}"
        );
    }

    fn parse(args: &[&str]) -> Cli {
        Cli::try_parse_from(args.iter().copied()).expect("arguments should parse")
    }

    #[test]
    fn cli_defaults_match_api_defaults() {
        let Command::Journey(journey) = parse(&["buylease", "journey"]).command else {
            panic!("expected journey command");
        };
        assert_eq!(journey, default_journey_for_api());

        let Command::BreakEven(break_even) = parse(&["buylease", "break-even"]).command else {
            panic!("expected break-even command");
        };
        assert_eq!(break_even, default_break_even_for_api());

        let Command::Rates(rates) = parse(&["buylease", "rates"]).command else {
            panic!("expected rates command");
        };
        assert_eq!(rates, default_rates_for_api());

        let Command::Payment(payment) = parse(&["buylease", "payment"]).command else {
            panic!("expected payment command");
        };
        assert_eq!(payment, default_payment_for_api());
    }

    #[test]
    fn serve_port_and_global_config_parse() {
        let cli = parse(&["buylease", "serve", "--port", "9090", "--config", "tuning.json"]);
        assert_eq!(cli.config, Some(PathBuf::from("tuning.json")));
        assert!(matches!(cli.command, Command::Serve { port: 9090 }));
    }

    #[test]
    fn build_profiles_converts_percent_flags() {
        let mut args = default_profile_for_api();
        args.preset = "midsize-sedan".to_string();
        args.loan_apr = Some(4.5);
        args.lease_residual = Some(55.0);
        args.variable_income = true;

        let (asset, party) = build_profiles(&args).expect("valid profiles");
        assert_approx(asset.loan_apr, 0.045);
        assert_approx(asset.lease_residual, 0.55);
        assert!(!party.lifestyle.stable_income);
    }

    #[test]
    fn build_profiles_rejects_unknown_preset() {
        let mut args = default_profile_for_api();
        args.preset = "hovercraft".to_string();
        let err = build_profiles(&args).expect_err("must reject unknown preset");
        assert!(err.contains("--preset"));
        assert!(err.contains("compact-ev"));
    }

    #[test]
    fn build_profiles_rejects_out_of_range_apr() {
        let mut args = default_profile_for_api();
        args.loan_apr = Some(140.0);
        let err = build_profiles(&args).expect_err("must reject apr");
        assert!(err.contains("--loan-apr"));
    }

    #[test]
    fn build_profiles_surfaces_core_validation() {
        let mut args = default_profile_for_api();
        args.credit_score = 200;
        let err = build_profiles(&args).expect_err("must reject credit score");
        assert!(err.contains("credit_score"));

        let mut args = default_profile_for_api();
        args.down_payment = Some(1_000_000.0);
        let err = build_profiles(&args).expect_err("must reject down payment");
        assert!(err.contains("down_payment"));
    }

    #[test]
    fn payment_matches_reference_loan() {
        let response = run_payment(&default_payment_for_api()).expect("valid payment");
        assert!((response.monthly_payment - 732.73).abs() < 0.01);
        assert!(response.schedule.is_none());

        let mut args = default_payment_for_api();
        args.schedule = true;
        args.credit_score = Some(600);
        let response = run_payment(&args).expect("valid payment");
        assert_approx(response.apr, 0.0699 + 0.04);
        let schedule = response.schedule.expect("schedule requested");
        assert_eq!(schedule.len(), 72);
        assert!(schedule[71].balance.abs() < 1e-6);
    }

    #[test]
    fn payment_rejects_bad_credit_score() {
        let mut args = default_payment_for_api();
        args.credit_score = Some(900);
        let err = run_payment(&args).expect_err("must reject score");
        assert!(err.contains("--credit-score"));
    }

    #[test]
    fn oversized_terms_and_budgets_are_rejected() {
        let mut args = default_payment_for_api();
        args.term_months = 100_000;
        args.schedule = true;
        let err = run_payment(&args).expect_err("must reject term");
        assert!(err.contains("periods"));

        let mut args = default_break_even_for_api();
        args.max_iterations = u32::MAX;
        let err = run_break_even(&args, &ProjectionConfig::default()).expect_err("must reject");
        assert!(err.contains("max_iterations"));
    }

    #[test]
    fn journey_summary_only_drops_snapshots() {
        let mut args = default_journey_for_api();
        args.summary_only = true;
        args.horizon_months = 24;
        let response = run_journey(&args, &ProjectionConfig::default()).expect("valid journey");
        assert!(response.journey.is_none());
        assert_eq!(response.horizon_months, 24);

        let json = serde_json::to_string(&response).expect("response should serialize");
        assert!(json.contains("\"recommendation\""));
        assert!(!json.contains("\"snapshots\""));
    }

    #[test]
    fn journey_response_serialization_contains_expected_fields() {
        let args = default_journey_for_api();
        let response = run_journey(&args, &ProjectionConfig::default()).expect("valid journey");
        assert!(matches!(
            response.recommendation.choice,
            Decision::Buy | Decision::Lease
        ));
        let json = serde_json::to_string(&response).expect("response should serialize");
        for key in [
            "\"snapshots\"",
            "\"ownMonthlyPayment\"",
            "\"leaseMonthlyPayment\"",
            "\"pendingTurnInCharge\"",
            "\"scenarios\"",
            "\"risks\"",
            "\"marketTrend\"",
        ] {
            assert!(json.contains(key), "missing {key}");
        }
    }

    #[test]
    fn horizon_beyond_cap_is_truncated() {
        let mut args = default_journey_for_api();
        args.horizon_months = 500;
        let response = run_journey(&args, &ProjectionConfig::default()).expect("valid journey");
        assert_eq!(response.horizon_months, 120);
    }

    #[test]
    fn rates_default_to_full_term() {
        let response =
            run_rates(&default_rates_for_api(), &ProjectionConfig::default()).expect("valid rates");
        assert_eq!(response.horizon_months, 360);
        assert_eq!(response.timeline.len(), 360);
        assert_approx(response.request.fixed_apr, 0.065);
        assert_approx(response.request.variable_margin, 0.0125);
    }

    #[test]
    fn rates_reject_bad_percentages() {
        let mut args = default_rates_for_api();
        args.index_rate = -1.0;
        let err = run_rates(&args, &ProjectionConfig::default()).expect_err("must reject");
        assert!(err.contains("--index-rate"));
    }

    #[test]
    fn break_even_response_flattens_solver_result() {
        let response = run_break_even(&default_break_even_for_api(), &ProjectionConfig::default())
            .expect("valid break-even");
        let json = serde_json::to_string(&response).expect("response should serialize");
        assert!(json.contains("\"breakEvenMiles\""));
        assert!(json.contains("\"iterations\""));
        assert!(json.contains("\"preset\":\"compact-ev\""));
    }

    #[test]
    fn preset_entries_list_every_id() {
        let ids: Vec<&str> = preset_entries().iter().map(|p| p.id).collect();
        assert_eq!(ids, PRESET_IDS.to_vec());
    }

    #[test]
    fn missing_config_file_is_reported() {
        let err = load_config(Some(&PathBuf::from("/nonexistent/buylease.json")))
            .expect_err("must fail");
        assert!(err.contains("/nonexistent/buylease.json"));
    }
}
