//! Pricing snapshot: the computed totals breakdown.

use crate::error::PricingError;
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};

/// Round a currency amount to cents, midpoint away from zero, at scale 2.
pub fn round_to_cents(amount: Decimal) -> Decimal {
    let mut rounded = amount.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero);
    rounded.rescale(2);
    rounded
}

/// Sum amounts, failing with `InvalidInput` instead of overflowing.
pub fn checked_sum(
    amounts: impl IntoIterator<Item = Decimal>,
    what: &str,
) -> Result<Decimal, PricingError> {
    amounts.into_iter().try_fold(Decimal::ZERO, |acc, amount| {
        acc.checked_add(amount)
            .ok_or_else(|| PricingError::overflow(what))
    })
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LineTotal {
    pub id: String,
    pub quantity: Decimal,
    pub unit_price: Decimal,
    pub line_total: Decimal,
    pub taxable: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppliedAdjustment {
    pub id: String,
    pub label: String,
    /// Signed: negative for discounts.
    pub amount: Decimal,
    pub taxable: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VendorDeliveryFee {
    pub vendor_id: String,
    pub fee: Decimal,
}

/// Fully computed totals for an order or invoice.
///
/// Carries no timestamps: identical inputs serialise identically.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PricingSnapshot {
    pub subtotal: Decimal,
    pub service_fee: Decimal,
    pub delivery_fee: Decimal,
    pub adjustments_total: Decimal,
    pub taxable_base: Decimal,
    pub tax: Decimal,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tax_rate: Option<Decimal>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tax_description: Option<String>,
    pub total: Decimal,
    #[serde(default)]
    pub lines: Vec<LineTotal>,
    #[serde(default)]
    pub adjustments: Vec<AppliedAdjustment>,
    #[serde(default)]
    pub delivery_fees: Vec<VendorDeliveryFee>,
}

impl PricingSnapshot {
    /// All-zero totals used as the display fallback.
    pub fn zero() -> Self {
        let zero = round_to_cents(Decimal::ZERO);
        Self {
            subtotal: zero,
            service_fee: zero,
            delivery_fee: zero,
            adjustments_total: zero,
            taxable_base: zero,
            tax: zero,
            tax_rate: None,
            tax_description: None,
            total: zero,
            lines: Vec::new(),
            adjustments: Vec::new(),
            delivery_fees: Vec::new(),
        }
    }

    /// Sum of the components that make up `total`.
    pub fn components_total(&self) -> Result<Decimal, PricingError> {
        checked_sum(
            [
                self.subtotal,
                self.service_fee,
                self.delivery_fee,
                self.adjustments_total,
                self.tax,
            ],
            "total",
        )
    }

    pub fn is_balanced(&self) -> bool {
        self.components_total().is_ok_and(|sum| sum == self.total)
    }
}

/// Live-preview result; never an error.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PricingPreview {
    pub snapshot: PricingSnapshot,
    /// Tax could not be obtained; `total` excludes tax.
    pub tax_pending: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl PricingPreview {
    pub fn ok(snapshot: PricingSnapshot) -> Self {
        Self {
            snapshot,
            tax_pending: false,
            error: None,
        }
    }

    pub fn has_error(&self) -> bool {
        self.error.is_some()
    }
}
