//! Tax provider seam and its HTTP client.
//!
//! The calculator never reimplements jurisdiction logic: under the automatic
//! tax method it hands the taxable base and jurisdiction to a provider and
//! trusts the returned rate and amount.

use crate::error::PricingError;
use crate::models::Jurisdiction;
use async_trait::async_trait;
use reqwest::Client;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use service_core::observability::TracedClientExt;
use std::time::Duration;

/// Request sent to the tax provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TaxRequest {
    pub taxable_base: Decimal,
    /// Delivery taxability is jurisdiction-dependent, so the provider decides.
    pub delivery_fee: Decimal,
    pub jurisdiction: Jurisdiction,
}

/// Provider answer, trusted verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaxQuote {
    /// Percentage points.
    pub rate: Decimal,
    pub amount: Decimal,
    #[serde(default)]
    pub description: Option<String>,
}

#[async_trait]
pub trait TaxProvider: Send + Sync {
    async fn compute_tax(&self, request: &TaxRequest) -> Result<TaxQuote, PricingError>;
}

/// Used when no provider endpoint is configured; every call fails.
#[derive(Debug, Clone, Copy, Default)]
pub struct UnconfiguredTaxProvider;

#[async_trait]
impl TaxProvider for UnconfiguredTaxProvider {
    async fn compute_tax(&self, _request: &TaxRequest) -> Result<TaxQuote, PricingError> {
        Err(PricingError::TaxProvider(
            "no tax provider configured".to_string(),
        ))
    }
}

#[derive(Debug, Deserialize)]
struct TaxProviderErrorBody {
    error: String,
}

/// JSON-over-HTTP tax provider client.
#[derive(Clone)]
pub struct HttpTaxProvider {
    client: Client,
    base_url: String,
    timeout: Duration,
}

impl HttpTaxProvider {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            timeout,
        }
    }

    fn calculate_url(&self) -> String {
        format!("{}/v1/tax/calculate", self.base_url)
    }
}

#[async_trait]
impl TaxProvider for HttpTaxProvider {
    #[tracing::instrument(skip(self, request), fields(country = %request.jurisdiction.country))]
    async fn compute_tax(&self, request: &TaxRequest) -> Result<TaxQuote, PricingError> {
        let response = self
            .client
            .traced_post(&self.calculate_url())
            .timeout(self.timeout)
            .json(request)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    PricingError::TaxProvider(format!(
                        "tax provider timed out after {:?}",
                        self.timeout
                    ))
                } else {
                    PricingError::TaxProvider(format!("tax provider unreachable: {}", e))
                }
            })?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| PricingError::TaxProvider(format!("failed to read response: {}", e)))?;

        tracing::debug!(status = %status, "Tax provider response");

        if !status.is_success() {
            let message = serde_json::from_str::<TaxProviderErrorBody>(&body)
                .map(|b| b.error)
                .unwrap_or(body);
            tracing::error!(status = %status, error = %message, "Tax provider rejected request");
            return Err(PricingError::TaxProvider(format!(
                "tax provider returned {}: {}",
                status, message
            )));
        }

        serde_json::from_str::<TaxQuote>(&body)
            .map_err(|e| PricingError::TaxProvider(format!("malformed tax quote: {}", e)))
    }
}
