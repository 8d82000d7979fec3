use napi::Result as NapiResult;
use napi_derive::napi;

use dcf_core::valuation::{self, CostOfCapitalRequest, ValuationRequest};
use dcf_core::DcfError;

/// Convert an engine error into a napi::Error whose reason is the JSON
/// `{"error", "kind"}` payload, so JS callers can map it to a status code.
fn to_napi_error(e: DcfError) -> napi::Error {
    let reason = serde_json::to_string(&e.to_payload()).unwrap_or_else(|_| e.to_string());
    napi::Error::from_reason(reason)
}

// ---------------------------------------------------------------------------
// Valuation
// ---------------------------------------------------------------------------

#[napi]
pub fn valuate(input_json: String) -> NapiResult<String> {
    let input: ValuationRequest =
        serde_json::from_str(&input_json).map_err(|e| to_napi_error(e.into()))?;
    let output = valuation::valuate(&input).map_err(to_napi_error)?;
    serde_json::to_string(&output).map_err(|e| to_napi_error(e.into()))
}

#[napi]
pub fn cost_of_capital(input_json: String) -> NapiResult<String> {
    let input: CostOfCapitalRequest =
        serde_json::from_str(&input_json).map_err(|e| to_napi_error(e.into()))?;
    let output = valuation::cost_of_capital(&input).map_err(to_napi_error)?;
    serde_json::to_string(&output).map_err(|e| to_napi_error(e.into()))
}
