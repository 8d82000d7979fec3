use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::time::Instant;

use crate::error::DcfError;
use crate::time_value::{discount_factor, present_value};
use crate::types::{with_metadata, ComputationOutput, Money, Rate};
use crate::DcfResult;

use super::assumptions::{
    validate_request, ResolvedAssumptions, ValuationDefaults, ValuationModel, ValuationRequest,
};
use super::growth::project;
use super::terminal::{pv_terminal, terminal_value};

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// One explicit forecast year.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectionYear {
    pub year: u32,
    pub growth_rate: Rate,
    pub fcf: Money,
    pub discount_factor: Rate,
    pub pv_fcf: Money,
}

/// Output of the DCF valuation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValuationResult {
    /// Model the figures were computed under
    pub model: ValuationModel,
    /// Year-by-year projections
    pub projections: Vec<ProjectionYear>,
    /// Sum of present values of the explicit-period cash flows
    pub pv_cashflows: Money,
    /// Undiscounted Gordon growth terminal value
    pub terminal_value: Money,
    /// Present value of the terminal value
    pub pv_terminal: Money,
    /// pv_cashflows + pv_terminal
    pub present_value: Money,
    /// Share of present value coming from the terminal value
    pub terminal_value_pct: Rate,
    pub equity_value: Money,
    pub per_share: Money,
    /// The request exactly as received
    pub assumptions_echo: ValuationRequest,
}

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

/// Run a single-stage DCF valuation with the standard defaults.
pub fn valuate(request: &ValuationRequest) -> DcfResult<ComputationOutput<ValuationResult>> {
    valuate_with_defaults(request, &ValuationDefaults::default())
}

/// Run a single-stage DCF valuation, filling optional fields from `defaults`.
#[tracing::instrument(name = "valuate", skip_all, fields(ticker = %request.ticker))]
pub fn valuate_with_defaults(
    request: &ValuationRequest,
    defaults: &ValuationDefaults,
) -> DcfResult<ComputationOutput<ValuationResult>> {
    let start = Instant::now();
    let mut warnings: Vec<String> = Vec::new();

    // --- Validate ---
    if let Err(e) = validate_request(request) {
        tracing::debug!(kind = e.kind(), "rejected valuation request: {e}");
        return Err(e);
    }

    // --- Resolve defaults ---
    let assumptions = defaults.resolve(request);
    tracing::debug!(
        model = %assumptions.model,
        years = assumptions.years,
        discount_rate = %assumptions.discount_rate,
        terminal_growth = %assumptions.terminal_growth,
        "resolved valuation assumptions"
    );
    schedule_warnings(&assumptions, &mut warnings);

    // --- Project cash flows ---
    let cashflows = project(assumptions.fcf_base, &assumptions.fcf_growth, assumptions.years)?;
    let projections = build_projection_table(&assumptions, &cashflows)?;
    let pv_cashflows = present_value(&cashflows, assumptions.discount_rate)?;

    // --- Terminal value ---
    let last = *cashflows.last().ok_or_else(|| DcfError::InvalidInput {
        field: "years".into(),
        reason: "Forecast horizon must be at least one year".into(),
    })?;
    let tv = terminal_value(last, assumptions.discount_rate, assumptions.terminal_growth)?;
    let pv_tv = pv_terminal(tv, assumptions.discount_rate, assumptions.years)?;

    let present = pv_cashflows
        .checked_add(pv_tv)
        .ok_or_else(|| overflow("present value"))?;

    let tv_pct = if present.is_zero() {
        Decimal::ZERO
    } else {
        pv_tv
            .checked_div(present)
            .ok_or_else(|| overflow("terminal value share"))?
    };
    if tv_pct > dec!(0.75) {
        warnings.push(format!(
            "Terminal value represents {:.1}% of present value; consider extending the explicit forecast period",
            tv_pct.checked_mul(dec!(100)).unwrap_or(Decimal::MAX)
        ));
    }

    // --- Equity bridge ---
    let equity_value = match assumptions.model {
        ValuationModel::Equity => present,
        ValuationModel::Fcff => present
            .checked_sub(assumptions.net_debt)
            .ok_or_else(|| overflow("equity bridge"))?,
    };
    if equity_value <= Decimal::ZERO {
        warnings.push("Equity value is not positive; per-share value is zero or negative".into());
    }

    let per_share = equity_value
        .checked_div(assumptions.shares_out)
        .ok_or_else(|| overflow("per-share value"))?;

    for w in &warnings {
        tracing::warn!(warning = %w, "advisory valuation warning");
    }
    tracing::info!(
        present_value = %present,
        equity_value = %equity_value,
        per_share = %per_share,
        "valuation complete"
    );

    let output = ValuationResult {
        model: assumptions.model,
        projections,
        pv_cashflows,
        terminal_value: tv,
        pv_terminal: pv_tv,
        present_value: present,
        terminal_value_pct: tv_pct,
        equity_value,
        per_share,
        assumptions_echo: request.clone(),
    };

    with_metadata(
        methodology(assumptions.model),
        &assumptions,
        warnings,
        start,
        output,
    )
}

// ---------------------------------------------------------------------------
// Internal helpers
// ---------------------------------------------------------------------------

fn overflow(context: &str) -> DcfError {
    DcfError::NumericOverflow {
        context: context.into(),
    }
}

fn methodology(model: ValuationModel) -> &'static str {
    match model {
        ValuationModel::Fcff => "FCFF DCF (Gordon growth terminal value, end-of-period)",
        ValuationModel::Equity => "Equity DCF (Gordon growth terminal value, end-of-period)",
    }
}

fn schedule_warnings(assumptions: &ResolvedAssumptions, warnings: &mut Vec<String>) {
    let years = assumptions.years as usize;
    if let Some(n) = assumptions.fcf_growth.explicit_len() {
        if n > years {
            warnings.push(format!(
                "fcf_growth supplies {n} rates for a {years}-year horizon; trailing rates ignored"
            ));
        } else if n < years {
            if let Some(last) = assumptions.fcf_growth.rate_for_period(n) {
                warnings.push(format!(
                    "fcf_growth supplies {n} rates for a {years}-year horizon; last rate ({last}) carried forward"
                ));
            }
        }
    }
    if assumptions.fcf_base < Decimal::ZERO {
        warnings.push("Base free cash flow is negative; terminal value will be negative".into());
    }
}

fn build_projection_table(
    assumptions: &ResolvedAssumptions,
    cashflows: &[Money],
) -> DcfResult<Vec<ProjectionYear>> {
    let mut table = Vec::with_capacity(cashflows.len());

    for (idx, fcf) in cashflows.iter().enumerate() {
        let year = idx as u32 + 1;
        let growth_rate = assumptions
            .fcf_growth
            .rate_for_period(idx)
            .unwrap_or(Decimal::ZERO);
        let factor = discount_factor(assumptions.discount_rate, year)?;
        table.push(ProjectionYear {
            year,
            growth_rate,
            fcf: *fcf,
            discount_factor: factor,
            pv_fcf: fcf.checked_mul(factor).ok_or_else(|| overflow("projection PV"))?,
        });
    }

    Ok(table)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::valuation::growth::GrowthSchedule;
    use pretty_assertions::assert_eq;
    use std::io;
    use std::sync::{Arc, Mutex};

    fn sample_request() -> ValuationRequest {
        ValuationRequest {
            ticker: "ACME".into(),
            model: Some(ValuationModel::Fcff),
            shares_out: dec!(1000),
            fcf_base: dec!(100),
            fcf_growth: Some(GrowthSchedule::Flat(dec!(0.07))),
            discount_rate: dec!(0.10),
            terminal_growth: dec!(0.02),
            years: Some(5),
            net_debt: Some(dec!(200)),
        }
    }

    fn assert_close(actual: Decimal, expected: Decimal, tol: Decimal) {
        assert!(
            (actual - expected).abs() < tol,
            "expected {expected} ± {tol}, got {actual}"
        );
    }

    #[test]
    fn test_end_to_end_fcff() {
        let result = valuate(&sample_request()).unwrap();
        let out = &result.result;

        let fcfs: Vec<Money> = out.projections.iter().map(|p| p.fcf).collect();
        assert_eq!(
            fcfs,
            vec![
                dec!(107),
                dec!(114.49),
                dec!(122.5043),
                dec!(131.079601),
                dec!(140.25517307),
            ]
        );
        assert_close(out.pv_cashflows, dec!(460.5484), dec!(0.001));
        assert_close(out.terminal_value, dec!(1788.2535), dec!(0.001));
        assert_close(out.pv_terminal, dec!(1110.3647), dec!(0.001));
        assert_close(out.present_value, dec!(1570.9131), dec!(0.001));
        assert_close(out.equity_value, dec!(1370.9131), dec!(0.001));
        assert_close(out.per_share, dec!(1.3709), dec!(0.0001));
    }

    #[test]
    fn test_present_value_is_sum_of_parts() {
        let out = valuate(&sample_request()).unwrap().result;
        assert_eq!(out.present_value, out.pv_cashflows + out.pv_terminal);
    }

    #[test]
    fn test_projection_pv_matches_pv_cashflows() {
        let out = valuate(&sample_request()).unwrap().result;
        let table_sum: Money = out.projections.iter().map(|p| p.pv_fcf).sum();
        assert_close(table_sum, out.pv_cashflows, dec!(0.0000001));
    }

    #[test]
    fn test_monotonic_in_discount_rate() {
        let mut prev: Option<Money> = None;
        for rate in [dec!(0.06), dec!(0.08), dec!(0.10), dec!(0.12), dec!(0.15)] {
            let mut request = sample_request();
            request.discount_rate = rate;
            let pv = valuate(&request).unwrap().result.present_value;
            if let Some(p) = prev {
                assert!(pv < p, "PV at {rate} ({pv}) should be below {p}");
            }
            prev = Some(pv);
        }
    }

    #[test]
    fn test_growth_schedule_padding() {
        let mut request = sample_request();
        request.fcf_growth = Some(GrowthSchedule::Schedule(vec![dec!(0.1), dec!(0.2)]));
        request.years = Some(4);

        let result = valuate(&request).unwrap();
        let rates: Vec<Rate> = result.result.projections.iter().map(|p| p.growth_rate).collect();
        assert_eq!(rates, vec![dec!(0.1), dec!(0.2), dec!(0.2), dec!(0.2)]);
        assert_eq!(result.result.projections[3].fcf, dec!(190.08));
        assert!(result.warnings.iter().any(|w| w.contains("carried forward")));
    }

    #[test]
    fn test_long_schedule_warns() {
        let mut request = sample_request();
        request.fcf_growth = Some(GrowthSchedule::Schedule(vec![dec!(0.1); 8]));
        let result = valuate(&request).unwrap();
        assert_eq!(result.result.projections.len(), 5);
        assert!(result.warnings.iter().any(|w| w.contains("trailing rates ignored")));
    }

    #[test]
    fn test_model_switch() {
        let fcff = valuate(&sample_request()).unwrap().result;
        assert_eq!(fcff.equity_value, fcff.present_value - dec!(200));

        let mut request = sample_request();
        request.model = Some(ValuationModel::Equity);
        let equity = valuate(&request).unwrap().result;
        assert_eq!(equity.equity_value, equity.present_value);
        assert_eq!(equity.present_value, fcff.present_value);
        assert_eq!(equity.model, ValuationModel::Equity);
    }

    #[test]
    fn test_defaults_applied() {
        let request = ValuationRequest {
            model: None,
            fcf_growth: None,
            years: None,
            net_debt: None,
            ..sample_request()
        };
        let result = valuate(&request).unwrap();
        let out = &result.result;

        assert_eq!(out.model, ValuationModel::Fcff);
        assert_eq!(out.projections.len(), 5);
        assert_eq!(out.projections[0].fcf, dec!(107));
        assert_eq!(out.equity_value, out.present_value);
        assert_eq!(result.assumptions["years"], 5);
        assert_eq!(result.assumptions["model"], "fcff");
    }

    #[test]
    fn test_echo_is_raw_request() {
        let request = ValuationRequest {
            years: None,
            ..sample_request()
        };
        let out = valuate(&request).unwrap().result;
        assert_eq!(out.assumptions_echo, request);

        let json = serde_json::to_value(&out).unwrap();
        assert!(json["assumptions_echo"].get("years").is_none());
        assert_eq!(json["assumptions_echo"]["ticker"], "ACME");
    }

    #[test]
    fn test_rejects_rate_below_terminal_growth() {
        let mut request = sample_request();
        request.discount_rate = dec!(0.05);
        request.terminal_growth = dec!(0.06);

        let err = valuate(&request).unwrap_err();
        assert!(matches!(err, DcfError::InvalidAssumptions(_)));
        assert!(err.is_client_error());
    }

    #[test]
    fn test_rejects_zero_shares() {
        let mut request = sample_request();
        request.shares_out = Decimal::ZERO;
        let err = valuate(&request).unwrap_err();
        assert!(matches!(err, DcfError::InvalidInput { .. }));
    }

    #[test]
    fn test_rejects_empty_schedule() {
        let mut request = sample_request();
        request.fcf_growth = Some(GrowthSchedule::Schedule(vec![]));
        let err = valuate(&request).unwrap_err();
        assert!(matches!(err, DcfError::InvalidInput { .. }));
    }

    #[test]
    fn test_terminal_value_dominance_warning() {
        let mut request = sample_request();
        request.discount_rate = dec!(0.05);
        request.terminal_growth = dec!(0.04);
        let result = valuate(&request).unwrap();
        assert!(result.result.terminal_value_pct > dec!(0.75));
        assert!(result
            .warnings
            .iter()
            .any(|w| w.contains("Terminal value represents")));
    }

    #[test]
    fn test_negative_equity_warns() {
        let mut request = sample_request();
        request.net_debt = Some(dec!(5000));
        let result = valuate(&request).unwrap();
        assert!(result.result.per_share < Decimal::ZERO);
        assert!(result.warnings.iter().any(|w| w.contains("not positive")));
    }

    #[test]
    fn test_extreme_horizon_overflows_cleanly() {
        let mut request = sample_request();
        request.fcf_growth = Some(GrowthSchedule::Flat(dec!(5)));
        request.years = Some(200);
        let err = valuate(&request).unwrap_err();
        assert!(matches!(err, DcfError::NumericOverflow { .. }));
    }

    #[test]
    fn test_max_discount_rate_overflows_cleanly() {
        let mut request = sample_request();
        request.discount_rate = Decimal::MAX;
        request.terminal_growth = Decimal::ZERO;
        let err = valuate(&request).unwrap_err();
        assert!(matches!(err, DcfError::NumericOverflow { .. }));
        assert!(!err.is_client_error());
    }

    /// Collects formatted log output for assertions.
    #[derive(Clone, Default)]
    struct LogBuffer(Arc<Mutex<Vec<u8>>>);

    impl io::Write for LogBuffer {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn test_advisory_warnings_emitted_at_warn_level() {
        let buffer = LogBuffer::default();
        let writer = buffer.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_max_level(tracing::Level::WARN)
            .with_writer(move || writer.clone())
            .finish();

        let mut request = sample_request();
        request.fcf_growth = Some(GrowthSchedule::Schedule(vec![dec!(0.1), dec!(0.2)]));
        let result = tracing::subscriber::with_default(subscriber, || valuate(&request)).unwrap();
        assert!(!result.warnings.is_empty());

        let logged = String::from_utf8(buffer.0.lock().unwrap().clone()).unwrap();
        assert!(logged.contains("WARN"), "no warn event in: {logged}");
        assert!(logged.contains("advisory valuation warning"));
        assert!(logged.contains("carried forward"));
        // info-level completion event is filtered out at warn
        assert!(!logged.contains("valuation complete"));
    }

    #[test]
    fn test_methodology() {
        let result = valuate(&sample_request()).unwrap();
        assert_eq!(
            result.methodology,
            "FCFF DCF (Gordon growth terminal value, end-of-period)"
        );
    }
}
