//! Error types for request validation and simulation runs

use thiserror::Error;

/// Request-level validation failure
///
/// Raised once, before any lender is evaluated. No partial simulation is attempted.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationError {
    #[error("Invalid input for {field}: {reason}")]
    InvalidInput { field: String, reason: String },

    #[error("Requested principal {principal:.2} must be positive")]
    NonPositivePrincipal { principal: f64 },

    #[error("Requested principal {principal:.2} must be below the property value {property_value:.2}")]
    PrincipalNotBelowValue { principal: f64, property_value: f64 },

    #[error("Property value {property_value:.2} is below the minimum of {minimum:.2}")]
    PropertyValueBelowMinimum { property_value: f64, minimum: f64 },

    #[error("Borrower birth date is missing")]
    MissingBirthDate,

    #[error("Borrower age {age} is outside [{min}, {max}]")]
    AgeOutOfRange { age: u32, min: u32, max: u32 },

    #[error("Combined monthly income {income:.2} must be positive")]
    NonPositiveIncome { income: f64 },

    #[error("Term of {term} months is outside [{min}, {max}]")]
    TermOutOfRange { term: u32, min: u32, max: u32 },

    #[error("No lenders selected")]
    NoLendersSelected,
}

/// Errors surfaced by the simulation entry points
#[derive(Debug, Error)]
pub enum SimulationError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl From<serde_json::Error> for SimulationError {
    fn from(e: serde_json::Error) -> Self {
        SimulationError::Serialization(e.to_string())
    }
}
