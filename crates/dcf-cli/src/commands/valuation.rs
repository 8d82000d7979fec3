use clap::Args;
use rust_decimal::Decimal;
use serde_json::Value;

use dcf_core::valuation::{
    self, CostOfCapitalRequest, GrowthSchedule, ValuationModel, ValuationRequest,
};
use dcf_core::DcfError;

use crate::input;

/// Arguments for a DCF valuation
#[derive(Args)]
#[command(allow_hyphen_values = true)]
pub struct ValuateArgs {
    /// Path to JSON input file (overrides individual flags)
    #[arg(long)]
    pub input: Option<String>,

    /// Ticker symbol, echoed back but not validated
    #[arg(long)]
    pub ticker: Option<String>,

    /// Cash flows being discounted: fcff (subtract net debt) or equity
    #[arg(long)]
    pub model: Option<ValuationModel>,

    /// Shares outstanding
    #[arg(long)]
    pub shares_out: Option<Decimal>,

    /// Base-year free cash flow
    #[arg(long)]
    pub fcf_base: Option<Decimal>,

    /// Growth rate, or a comma-separated year-by-year schedule (e.g. 0.10,0.08,0.06)
    #[arg(long, value_delimiter = ',')]
    pub fcf_growth: Vec<Decimal>,

    /// Discount rate (e.g. 0.10 for 10%)
    #[arg(long)]
    pub discount_rate: Option<Decimal>,

    /// Terminal (perpetual) growth rate
    #[arg(long)]
    pub terminal_growth: Option<Decimal>,

    /// Explicit forecast years
    #[arg(long)]
    pub years: Option<u32>,

    /// Net debt (debt minus cash)
    #[arg(long)]
    pub net_debt: Option<Decimal>,
}

/// Arguments for a CAPM / WACC discount-rate build-up
#[derive(Args)]
#[command(allow_hyphen_values = true)]
pub struct WaccArgs {
    /// Path to JSON input file (overrides individual flags)
    #[arg(long)]
    pub input: Option<String>,

    /// Risk-free rate (e.g. 0.042 for 4.2%)
    #[arg(long)]
    pub risk_free_rate: Option<Decimal>,

    /// Equity risk premium
    #[arg(long, alias = "erp")]
    pub equity_risk_premium: Option<Decimal>,

    /// Levered beta (defaults to 1.0)
    #[arg(long)]
    pub beta: Option<Decimal>,

    /// Pre-tax cost of debt
    #[arg(long)]
    pub cost_of_debt: Option<Decimal>,

    /// Marginal tax rate
    #[arg(long)]
    pub tax_rate: Option<Decimal>,

    /// Debt share of capital (market value)
    #[arg(long)]
    pub debt_weight: Option<Decimal>,

    /// Equity share of capital (market value)
    #[arg(long)]
    pub equity_weight: Option<Decimal>,

    #[arg(long)]
    pub size_premium: Option<Decimal>,

    #[arg(long)]
    pub country_risk: Option<Decimal>,

    #[arg(long)]
    pub specific_risk: Option<Decimal>,

    /// Asset beta to re-lever with Hamada
    #[arg(long)]
    pub unlevered_beta: Option<Decimal>,

    /// Target D/E for re-levering
    #[arg(long)]
    pub target_debt_equity: Option<Decimal>,
}

pub fn run_wacc(args: WaccArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let request: CostOfCapitalRequest = if let Some(ref path) = args.input {
        serde_json::from_value(input::file::read_json_value(path)?).map_err(DcfError::from)?
    } else if let Some(data) = input::stdin::read_stdin()? {
        serde_json::from_value(data).map_err(DcfError::from)?
    } else {
        wacc_request_from_flags(args)?
    };

    let result = valuation::cost_of_capital(&request)?;
    Ok(serde_json::to_value(result)?)
}

fn wacc_request_from_flags(args: WaccArgs) -> Result<CostOfCapitalRequest, DcfError> {
    Ok(CostOfCapitalRequest {
        risk_free_rate: required(args.risk_free_rate, "--risk-free-rate")?,
        equity_risk_premium: required(args.equity_risk_premium, "--equity-risk-premium")?,
        beta: args.beta.unwrap_or(Decimal::ONE),
        cost_of_debt: required(args.cost_of_debt, "--cost-of-debt")?,
        tax_rate: required(args.tax_rate, "--tax-rate")?,
        debt_weight: required(args.debt_weight, "--debt-weight")?,
        equity_weight: required(args.equity_weight, "--equity-weight")?,
        size_premium: args.size_premium,
        country_risk_premium: args.country_risk,
        specific_risk_premium: args.specific_risk,
        unlevered_beta: args.unlevered_beta,
        target_debt_equity: args.target_debt_equity,
    })
}

pub fn run_valuate(args: ValuateArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let request: ValuationRequest = if let Some(ref path) = args.input {
        parse_request(input::file::read_json_value(path)?)?
    } else if let Some(data) = input::stdin::read_stdin()? {
        parse_request(data)?
    } else {
        request_from_flags(args)?
    };

    let result = valuation::valuate(&request)?;
    Ok(serde_json::to_value(result)?)
}

fn parse_request(data: Value) -> Result<ValuationRequest, DcfError> {
    Ok(serde_json::from_value(data)?)
}

fn required(value: Option<Decimal>, flag: &str) -> Result<Decimal, DcfError> {
    value.ok_or_else(|| DcfError::InvalidInput {
        field: flag.trim_start_matches("--").replace('-', "_"),
        reason: format!("{flag} is required (or provide --input)"),
    })
}

fn request_from_flags(args: ValuateArgs) -> Result<ValuationRequest, DcfError> {
    let fcf_growth = match args.fcf_growth.as_slice() {
        [] => None,
        [rate] => Some(GrowthSchedule::Flat(*rate)),
        rates => Some(GrowthSchedule::Schedule(rates.to_vec())),
    };

    Ok(ValuationRequest {
        ticker: args.ticker.unwrap_or_default(),
        model: args.model,
        shares_out: required(args.shares_out, "--shares-out")?,
        fcf_base: required(args.fcf_base, "--fcf-base")?,
        fcf_growth,
        discount_rate: required(args.discount_rate, "--discount-rate")?,
        terminal_growth: required(args.terminal_growth, "--terminal-growth")?,
        years: args.years,
        net_debt: args.net_debt,
    })
}
