use rust_decimal::Decimal;

use crate::error::DcfError;
use crate::time_value::discount_factor;
use crate::types::{Money, Rate};
use crate::DcfResult;

/// Gordon growth terminal value: `TV = last_cashflow * (1 + g) / (r - g)`.
pub fn terminal_value(last_cashflow: Money, rate: Rate, growth: Rate) -> DcfResult<Money> {
    if rate <= growth {
        return Err(DcfError::InvalidAssumptions(format!(
            "Discount rate ({rate}) must exceed terminal growth ({growth})"
        )));
    }
    let overflow = || DcfError::NumericOverflow {
        context: "Gordon growth terminal value".into(),
    };

    let denom = rate.checked_sub(growth).ok_or_else(overflow)?;
    Decimal::ONE
        .checked_add(growth)
        .and_then(|factor| last_cashflow.checked_mul(factor))
        .and_then(|next| next.checked_div(denom))
        .ok_or_else(overflow)
}

/// Terminal value discounted back `years` periods.
pub fn pv_terminal(terminal_value: Money, rate: Rate, years: u32) -> DcfResult<Money> {
    let factor = discount_factor(rate, years)?;
    terminal_value
        .checked_mul(factor)
        .ok_or_else(|| DcfError::NumericOverflow {
            context: "terminal value discounting".into(),
        })
}
