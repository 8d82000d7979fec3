use rust_decimal::Decimal;
use rust_decimal::MathematicalOps;
use rust_decimal_macros::dec;

use crate::error::DcfError;
use crate::types::{Money, Rate};
use crate::DcfResult;

fn check_rate(rate: Rate) -> DcfResult<()> {
    if rate <= dec!(-1) {
        return Err(DcfError::InvalidInput {
            field: "discount_rate".into(),
            reason: "Discount rate must be greater than -100%".into(),
        });
    }
    Ok(())
}

/// Discount factor `1 / (1 + rate)^period`.
pub fn discount_factor(rate: Rate, period: u32) -> DcfResult<Rate> {
    check_rate(rate)?;

    let growth = Decimal::ONE
        .checked_add(rate)
        .and_then(|base| base.checked_powu(u64::from(period)))
        .ok_or_else(|| DcfError::NumericOverflow {
            context: format!("discount factor at period {period}"),
        })?;

    Decimal::ONE
        .checked_div(growth)
        .ok_or_else(|| DcfError::DivisionByZero {
            context: format!("discount factor at period {period}"),
        })
}

/// Present value of end-of-period cash flows; the first flow is discounted
/// one full period: `Σ cf[i-1] / (1 + rate)^i` for `i` in `1..=n`.
pub fn present_value(cash_flows: &[Money], rate: Rate) -> DcfResult<Money> {
    check_rate(rate)?;

    let one_plus_r = Decimal::ONE
        .checked_add(rate)
        .ok_or_else(|| DcfError::NumericOverflow {
            context: "PV discount base".into(),
        })?;
    let mut discount = Decimal::ONE;
    let mut result = Decimal::ZERO;

    for (t, cf) in cash_flows.iter().enumerate() {
        let period = t + 1;
        discount = discount
            .checked_mul(one_plus_r)
            .ok_or_else(|| DcfError::NumericOverflow {
                context: format!("PV discount base at period {period}"),
            })?;
        let pv = cf.checked_div(discount).ok_or_else(|| DcfError::DivisionByZero {
            context: format!("PV discount factor at period {period}"),
        })?;
        result = result
            .checked_add(pv)
            .ok_or_else(|| DcfError::NumericOverflow {
                context: "present value sum".into(),
            })?;
    }

    Ok(result)
}
