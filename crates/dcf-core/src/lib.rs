pub mod error;
pub mod time_value;
pub mod types;

#[cfg(feature = "valuation")]
pub mod valuation;

pub use error::{DcfError, ErrorPayload};
pub use types::*;

/// Standard result type for all valuation operations
pub type DcfResult<T> = Result<T, DcfError>;
