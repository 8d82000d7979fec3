use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::time::Instant;

use crate::error::DcfError;
use crate::types::{with_metadata, ComputationOutput, Rate};
use crate::DcfResult;

use super::assumptions::ValuationModel;

/// Debt and equity weights may miss 1.0 by this much before being rejected.
const WEIGHT_TOLERANCE: Decimal = dec!(0.01);

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// Capital-structure inputs for deriving a discount rate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CostOfCapitalRequest {
    /// Risk-free rate, e.g. the 10-year government yield
    pub risk_free_rate: Rate,
    /// Expected market return over the risk-free rate
    pub equity_risk_premium: Rate,
    /// Levered equity beta. Ignored when `unlevered_beta` is given.
    #[serde(default = "default_beta")]
    pub beta: Decimal,
    /// Pre-tax cost of debt
    pub cost_of_debt: Rate,
    pub tax_rate: Rate,
    pub debt_weight: Rate,
    pub equity_weight: Rate,
    /// Additive premiums on top of CAPM (size, country, company-specific)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size_premium: Option<Rate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub country_risk_premium: Option<Rate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub specific_risk_premium: Option<Rate>,
    /// Asset beta to re-lever with Hamada
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unlevered_beta: Option<Decimal>,
    /// D/E used for re-levering. Falls back to debt_weight / equity_weight.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_debt_equity: Option<Decimal>,
}

fn default_beta() -> Decimal {
    Decimal::ONE
}

/// Cost of equity, after-tax cost of debt and their blend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CostOfCapital {
    pub wacc: Rate,
    pub cost_of_equity: Rate,
    pub after_tax_cost_of_debt: Rate,
    pub cost_of_debt_pretax: Rate,
    /// Beta that went into CAPM
    pub levered_beta: Decimal,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub unlevered_beta: Option<Decimal>,
}

impl CostOfCapital {
    /// Rate matching the cash flows a valuation discounts: firm cash flows at
    /// WACC, equity cash flows at the cost of equity.
    pub fn discount_rate_for(&self, model: ValuationModel) -> Rate {
        match model {
            ValuationModel::Fcff => self.wacc,
            ValuationModel::Equity => self.cost_of_equity,
        }
    }
}

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

/// Weighted average cost of capital with a CAPM cost of equity.
///
/// Ke = Rf + beta * ERP + premiums, Kd_at = Kd * (1 - t),
/// WACC = Ke * We + Kd_at * Wd.
#[tracing::instrument(name = "wacc", skip_all)]
pub fn cost_of_capital(
    request: &CostOfCapitalRequest,
) -> DcfResult<ComputationOutput<CostOfCapital>> {
    let start = Instant::now();
    validate_cost_of_capital(request)?;

    let mut warnings = Vec::new();
    let (levered_beta, unlevered_beta) = resolve_beta(request, &mut warnings)?;
    let cost_of_equity = capm_cost_of_equity(request, levered_beta)?;

    let overflow = |context: &str| DcfError::NumericOverflow {
        context: context.into(),
    };
    let after_tax_cost_of_debt = Decimal::ONE
        .checked_sub(request.tax_rate)
        .and_then(|shield| request.cost_of_debt.checked_mul(shield))
        .ok_or_else(|| overflow("after-tax cost of debt"))?;
    let wacc = cost_of_equity
        .checked_mul(request.equity_weight)
        .zip(after_tax_cost_of_debt.checked_mul(request.debt_weight))
        .and_then(|(equity, debt)| equity.checked_add(debt))
        .ok_or_else(|| overflow("WACC blend"))?;

    if levered_beta > dec!(3) {
        warnings.push(format!(
            "Beta of {levered_beta} is above 3.0; check the market data"
        ));
    }
    if request.equity_risk_premium > dec!(0.10) {
        warnings.push(format!(
            "Equity risk premium of {} is above 10%",
            request.equity_risk_premium
        ));
    }
    if wacc > dec!(0.20) {
        warnings.push(format!(
            "WACC of {wacc} is above 20%; expect a heavily discounted valuation"
        ));
    }
    for w in &warnings {
        tracing::warn!(warning = %w, "advisory cost of capital warning");
    }
    tracing::info!(%wacc, %cost_of_equity, "cost of capital complete");

    let result = CostOfCapital {
        wacc,
        cost_of_equity,
        after_tax_cost_of_debt,
        cost_of_debt_pretax: request.cost_of_debt,
        levered_beta,
        unlevered_beta,
    };
    with_metadata("WACC via CAPM build-up", request, warnings, start, result)
}

/// Hamada: beta_L = beta_U * (1 + (1 - t) * D/E).
pub fn relever_beta(
    unlevered_beta: Decimal,
    tax_rate: Rate,
    debt_equity: Decimal,
) -> DcfResult<Decimal> {
    hamada_factor(tax_rate, debt_equity)
        .and_then(|factor| unlevered_beta.checked_mul(factor))
        .ok_or_else(|| DcfError::NumericOverflow {
            context: "Hamada re-levering".into(),
        })
}

/// Inverse of [`relever_beta`].
pub fn unlever_beta(
    levered_beta: Decimal,
    tax_rate: Rate,
    debt_equity: Decimal,
) -> DcfResult<Decimal> {
    let factor = hamada_factor(tax_rate, debt_equity).ok_or_else(|| DcfError::NumericOverflow {
        context: "Hamada un-levering".into(),
    })?;
    if factor.is_zero() {
        return Err(DcfError::DivisionByZero {
            context: "Hamada un-levering factor".into(),
        });
    }
    levered_beta
        .checked_div(factor)
        .ok_or_else(|| DcfError::NumericOverflow {
            context: "Hamada un-levering".into(),
        })
}

// ---------------------------------------------------------------------------
// Internals
// ---------------------------------------------------------------------------

fn hamada_factor(tax_rate: Rate, debt_equity: Decimal) -> Option<Decimal> {
    Decimal::ONE
        .checked_sub(tax_rate)
        .and_then(|shield| shield.checked_mul(debt_equity))
        .and_then(|levered| Decimal::ONE.checked_add(levered))
}

fn invalid(field: &str, reason: &str) -> DcfError {
    DcfError::InvalidInput {
        field: field.into(),
        reason: reason.into(),
    }
}

fn validate_cost_of_capital(request: &CostOfCapitalRequest) -> DcfResult<()> {
    let non_negative = [
        ("risk_free_rate", request.risk_free_rate),
        ("equity_risk_premium", request.equity_risk_premium),
        ("cost_of_debt", request.cost_of_debt),
        ("debt_weight", request.debt_weight),
        ("equity_weight", request.equity_weight),
    ];
    if let Some((field, _)) = non_negative.iter().find(|(_, v)| *v < Decimal::ZERO) {
        return Err(invalid(field, "must not be negative"));
    }
    if request.tax_rate < Decimal::ZERO || request.tax_rate > Decimal::ONE {
        return Err(invalid("tax_rate", "must be between 0 and 1"));
    }
    if request.unlevered_beta.is_none() && request.beta <= Decimal::ZERO {
        return Err(invalid("beta", "must be positive"));
    }

    let weight_sum = request
        .debt_weight
        .checked_add(request.equity_weight)
        .ok_or_else(|| DcfError::NumericOverflow {
            context: "capital structure weights".into(),
        })?;
    if (weight_sum - Decimal::ONE).abs() > WEIGHT_TOLERANCE {
        return Err(DcfError::InvalidInput {
            field: "debt_weight + equity_weight".into(),
            reason: format!("weights must sum to 1.0, got {weight_sum}"),
        });
    }
    Ok(())
}

/// Returns the beta to use and, when re-levered, the asset beta it came from.
fn resolve_beta(
    request: &CostOfCapitalRequest,
    warnings: &mut Vec<String>,
) -> DcfResult<(Decimal, Option<Decimal>)> {
    let Some(beta_u) = request.unlevered_beta else {
        return Ok((request.beta, None));
    };
    if beta_u <= Decimal::ZERO {
        return Err(invalid("unlevered_beta", "must be positive"));
    }

    let debt_equity = match request.target_debt_equity {
        Some(de) if de < Decimal::ZERO => {
            return Err(invalid("target_debt_equity", "must not be negative"));
        }
        Some(de) => de,
        None => {
            if request.equity_weight.is_zero() {
                return Err(DcfError::DivisionByZero {
                    context: "implied D/E with zero equity weight".into(),
                });
            }
            request
                .debt_weight
                .checked_div(request.equity_weight)
                .ok_or_else(|| DcfError::NumericOverflow {
                    context: "implied D/E".into(),
                })?
        }
    };

    let beta_l = relever_beta(beta_u, request.tax_rate, debt_equity)?;
    warnings.push(format!(
        "Beta re-levered to {beta_l} from asset beta {beta_u} at D/E {debt_equity}"
    ));
    Ok((beta_l, Some(beta_u)))
}

fn capm_cost_of_equity(request: &CostOfCapitalRequest, levered_beta: Decimal) -> DcfResult<Rate> {
    let premiums = [
        request.size_premium,
        request.country_risk_premium,
        request.specific_risk_premium,
    ];
    levered_beta
        .checked_mul(request.equity_risk_premium)
        .and_then(|risk| request.risk_free_rate.checked_add(risk))
        .and_then(|base| {
            premiums
                .into_iter()
                .flatten()
                .try_fold(base, |ke, p| ke.checked_add(p))
        })
        .ok_or_else(|| DcfError::NumericOverflow {
            context: "CAPM cost of equity".into(),
        })
}
