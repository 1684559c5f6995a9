use rust_decimal::Decimal;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SteelDcfError {
    #[error("Invalid input for {field}: {reason}")]
    InvalidInput { field: String, reason: String },

    #[error("Financial impossibility: {0}")]
    FinancialImpossibility(String),

    #[error("Convergence failure: {function} did not converge after {iterations} iterations (delta: {last_delta})")]
    ConvergenceFailure {
        function: String,
        iterations: u32,
        last_delta: Decimal,
    },

    #[error("Insufficient data: {0}")]
    InsufficientData(String),

    #[error("Division by zero in {context}")]
    DivisionByZero { context: String },

    #[error("Unknown capital project: {0}")]
    UnknownProject(String),

    #[error("Invalid distribution for '{variable}': {reason}")]
    Distribution { variable: String, reason: String },

    #[error("Serialization error: {0}")]
    SerializationError(String),
}

impl SteelDcfError {
    pub(crate) fn invalid(field: impl Into<String>, reason: impl Into<String>) -> Self {
        SteelDcfError::InvalidInput {
            field: field.into(),
            reason: reason.into(),
        }
    }
}

impl From<serde_json::Error> for SteelDcfError {
    fn from(e: serde_json::Error) -> Self {
        SteelDcfError::SerializationError(e.to_string())
    }
}
