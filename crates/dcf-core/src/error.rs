use serde::Serialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DcfError {
    #[error("Invalid assumptions: {0}")]
    InvalidAssumptions(String),

    #[error("Invalid input: {field} — {reason}")]
    InvalidInput { field: String, reason: String },

    #[error("Numeric overflow in {context}")]
    NumericOverflow { context: String },

    #[error("Division by zero in {context}")]
    DivisionByZero { context: String },

    #[error("Serialization error: {0}")]
    SerializationError(String),
}

impl DcfError {
    /// Stable snake_case tag for the error variant.
    pub fn kind(&self) -> &'static str {
        match self {
            DcfError::InvalidAssumptions(_) => "invalid_assumptions",
            DcfError::InvalidInput { .. } => "invalid_input",
            DcfError::NumericOverflow { .. } => "numeric_overflow",
            DcfError::DivisionByZero { .. } => "division_by_zero",
            DcfError::SerializationError(_) => "serialization_error",
        }
    }

    /// True when the caller supplied something it must correct before retrying.
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            DcfError::InvalidAssumptions(_)
                | DcfError::InvalidInput { .. }
                | DcfError::SerializationError(_)
        )
    }

    pub fn to_payload(&self) -> ErrorPayload {
        ErrorPayload {
            error: self.to_string(),
            kind: self.kind().to_string(),
        }
    }
}

impl From<serde_json::Error> for DcfError {
    fn from(e: serde_json::Error) -> Self {
        DcfError::SerializationError(e.to_string())
    }
}

/// Wire form of a rejected request: `{"error": "...", "kind": "..."}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ErrorPayload {
    pub error: String,
    pub kind: String,
}
