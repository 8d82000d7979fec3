use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::DcfError;
use crate::types::{Money, Rate};
use crate::DcfResult;

use super::growth::GrowthSchedule;

/// Longest explicit forecast horizon accepted.
pub const MAX_FORECAST_YEARS: u32 = 200;

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// Which cash flows are being discounted.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ValuationModel {
    /// Free cash flow to the firm: present value is enterprise value, net debt
    /// is subtracted to reach equity.
    #[default]
    Fcff,
    /// Free cash flow to equity: present value is already equity value.
    Equity,
}

impl fmt::Display for ValuationModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValuationModel::Fcff => write!(f, "fcff"),
            ValuationModel::Equity => write!(f, "equity"),
        }
    }
}

impl FromStr for ValuationModel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "fcff" => Ok(ValuationModel::Fcff),
            "equity" => Ok(ValuationModel::Equity),
            other => Err(format!("unknown model '{other}' (expected fcff or equity)")),
        }
    }
}

/// Raw valuation request as supplied by the caller.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ValuationRequest {
    /// Informational only
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub ticker: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<ValuationModel>,
    /// Shares outstanding
    pub shares_out: Decimal,
    /// Base-year free cash flow, any sign
    pub fcf_base: Money,
    /// Flat rate or year-by-year schedule
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fcf_growth: Option<GrowthSchedule>,
    pub discount_rate: Rate,
    pub terminal_growth: Rate,
    /// Explicit forecast horizon
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub years: Option<u32>,
    /// Debt minus cash, used by the FCFF equity bridge
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub net_debt: Option<Money>,
}

/// Named defaults for every optional request field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValuationDefaults {
    pub model: ValuationModel,
    pub fcf_growth: Rate,
    pub years: u32,
    pub net_debt: Money,
}

impl Default for ValuationDefaults {
    fn default() -> Self {
        Self {
            model: ValuationModel::Fcff,
            fcf_growth: dec!(0.07),
            years: 5,
            net_debt: Decimal::ZERO,
        }
    }
}

/// A request with every default applied; what the arithmetic runs on.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResolvedAssumptions {
    pub ticker: String,
    pub model: ValuationModel,
    pub shares_out: Decimal,
    pub fcf_base: Money,
    pub fcf_growth: GrowthSchedule,
    pub discount_rate: Rate,
    pub terminal_growth: Rate,
    pub years: u32,
    pub net_debt: Money,
}

// ---------------------------------------------------------------------------
// Validation and resolution
// ---------------------------------------------------------------------------

/// Reject requests the engine must not compute. The discount-rate check runs
/// first so an inverted rate pair is always reported as such.
pub fn validate_request(request: &ValuationRequest) -> DcfResult<()> {
    if request.discount_rate <= request.terminal_growth {
        return Err(DcfError::InvalidAssumptions(
            "Discount rate must exceed terminal growth".into(),
        ));
    }
    if request.discount_rate <= dec!(-1) {
        return Err(DcfError::InvalidInput {
            field: "discount_rate".into(),
            reason: "Discount rate must be greater than -100%".into(),
        });
    }
    if request.shares_out <= Decimal::ZERO {
        return Err(DcfError::InvalidInput {
            field: "shares_out".into(),
            reason: "Shares outstanding must be positive".into(),
        });
    }
    match request.years {
        Some(0) => {
            return Err(DcfError::InvalidInput {
                field: "years".into(),
                reason: "Forecast horizon must be at least one year".into(),
            });
        }
        Some(n) if n > MAX_FORECAST_YEARS => {
            return Err(DcfError::InvalidInput {
                field: "years".into(),
                reason: format!("Forecast horizon must not exceed {MAX_FORECAST_YEARS} years"),
            });
        }
        _ => {}
    }
    if let Some(ref growth) = request.fcf_growth {
        growth.validate()?;
    }
    Ok(())
}

impl ValuationDefaults {
    pub fn resolve(&self, request: &ValuationRequest) -> ResolvedAssumptions {
        ResolvedAssumptions {
            ticker: request.ticker.clone(),
            model: request.model.unwrap_or(self.model),
            shares_out: request.shares_out,
            fcf_base: request.fcf_base,
            fcf_growth: request
                .fcf_growth
                .clone()
                .unwrap_or(GrowthSchedule::Flat(self.fcf_growth)),
            discount_rate: request.discount_rate,
            terminal_growth: request.terminal_growth,
            years: request.years.unwrap_or(self.years),
            net_debt: request.net_debt.unwrap_or(self.net_debt),
        }
    }
}
