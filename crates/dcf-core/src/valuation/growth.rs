use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::DcfError;
use crate::types::{Money, Rate};
use crate::DcfResult;

/// Per-period free-cash-flow growth: one rate for every period, or an
/// explicit year-by-year schedule.
///
/// On the wire this is either a bare number (`0.07`) or an array
/// (`[0.10, 0.08, 0.06]`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum GrowthSchedule {
    Flat(Rate),
    Schedule(Vec<Rate>),
}

impl GrowthSchedule {
    /// Growth rate applied in the period at `index` (0-based). A schedule
    /// shorter than the horizon carries its last rate forward; entries past
    /// the horizon are never asked for. `None` only for an empty schedule.
    pub fn rate_for_period(&self, index: usize) -> Option<Rate> {
        match self {
            GrowthSchedule::Flat(rate) => Some(*rate),
            GrowthSchedule::Schedule(rates) => rates.get(index).or_else(|| rates.last()).copied(),
        }
    }

    /// Number of explicitly supplied rates (`None` for a flat rate).
    pub fn explicit_len(&self) -> Option<usize> {
        match self {
            GrowthSchedule::Flat(_) => None,
            GrowthSchedule::Schedule(rates) => Some(rates.len()),
        }
    }

    pub fn validate(&self) -> DcfResult<()> {
        if self.explicit_len() == Some(0) {
            return Err(DcfError::InvalidInput {
                field: "fcf_growth".into(),
                reason: "Growth schedule must contain at least one rate".into(),
            });
        }
        Ok(())
    }
}

impl From<Rate> for GrowthSchedule {
    fn from(rate: Rate) -> Self {
        GrowthSchedule::Flat(rate)
    }
}

impl From<Vec<Rate>> for GrowthSchedule {
    fn from(rates: Vec<Rate>) -> Self {
        GrowthSchedule::Schedule(rates)
    }
}

/// Project `years` free cash flows from `fcf_base`. Period 1 is
/// `fcf_base * (1 + g[0])`; every later period compounds on the previous one.
pub fn project(fcf_base: Money, growth: &GrowthSchedule, years: u32) -> DcfResult<Vec<Money>> {
    let mut flows = Vec::with_capacity(years as usize);
    let mut prev = fcf_base;

    for idx in 0..years as usize {
        let g = growth
            .rate_for_period(idx)
            .ok_or_else(|| DcfError::InvalidInput {
                field: "fcf_growth".into(),
                reason: "Growth schedule must contain at least one rate".into(),
            })?;
        let fcf = Decimal::ONE
            .checked_add(g)
            .and_then(|factor| prev.checked_mul(factor))
            .ok_or_else(|| DcfError::NumericOverflow {
                context: format!("free cash flow projection in year {}", idx + 1),
            })?;
        flows.push(fcf);
        prev = fcf;
    }

    Ok(flows)
}
