//! Error taxonomy for pricing-service.

use service_core::error::AppError;
use thiserror::Error;

/// Failures raised by the pricing engine and its collaborators.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PricingError {
    /// Malformed line item or adjustment data. The cart must not proceed to checkout.
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Unrecognised or missing fee/tax configuration.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// The external tax provider failed or timed out.
    #[error("Tax provider error: {0}")]
    TaxProvider(String),

    /// Reading or writing a pricing record failed.
    #[error("Persistence error: {0}")]
    Persistence(String),

    #[error("Not found: {0}")]
    NotFound(String),
}

impl PricingError {
    pub fn invalid(msg: impl Into<String>) -> Self {
        PricingError::InvalidInput(msg.into())
    }

    pub fn configuration(msg: impl Into<String>) -> Self {
        PricingError::Configuration(msg.into())
    }

    /// A money amount left the representable `Decimal` range.
    pub fn overflow(what: impl std::fmt::Display) -> Self {
        PricingError::InvalidInput(format!("amount overflow computing {}", what))
    }

    /// Short label used for metrics and structured logs.
    pub fn error_type(&self) -> &'static str {
        match self {
            PricingError::InvalidInput(_) => "invalid_input",
            PricingError::Configuration(_) => "configuration",
            PricingError::TaxProvider(_) => "tax_provider",
            PricingError::Persistence(_) => "persistence",
            PricingError::NotFound(_) => "not_found",
        }
    }
}

impl From<PricingError> for AppError {
    fn from(err: PricingError) -> Self {
        match err {
            PricingError::InvalidInput(msg) => AppError::BadRequest(anyhow::anyhow!(msg)),
            PricingError::NotFound(msg) => AppError::NotFound(anyhow::anyhow!(msg)),
            PricingError::Configuration(msg) => AppError::ConfigError(anyhow::anyhow!(msg)),
            PricingError::TaxProvider(msg) => AppError::BadGateway(msg),
            PricingError::Persistence(msg) => AppError::DatabaseError(anyhow::anyhow!(msg)),
        }
    }
}

impl From<sqlx::Error> for PricingError {
    fn from(err: sqlx::Error) -> Self {
        PricingError::Persistence(err.to_string())
    }
}
