//! Line item model for pricing-service.

use crate::error::PricingError;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// How the UI collects a line item's quantity.
///
/// The arithmetic is the same for every variant: `price × quantity`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PriceType {
    PerPerson,
    FlatRate,
    PerHour,
    PerDay,
    PerItem,
}

fn default_taxable() -> bool {
    true
}

/// A selected service or menu item in a cart, order or invoice.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LineItem {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vendor_id: Option<String>,
    pub price: Decimal,
    pub quantity: Decimal,
    pub price_type: PriceType,
    #[serde(default = "default_taxable")]
    pub taxable: bool,
}

impl LineItem {
    pub fn new(id: impl Into<String>, price: Decimal, quantity: u32, price_type: PriceType) -> Self {
        Self {
            id: id.into(),
            name: None,
            vendor_id: None,
            price,
            quantity: Decimal::from(quantity),
            price_type,
            taxable: true,
        }
    }

    pub fn with_vendor(mut self, vendor_id: impl Into<String>) -> Self {
        self.vendor_id = Some(vendor_id.into());
        self
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn non_taxable(mut self) -> Self {
        self.taxable = false;
        self
    }

    /// Reject negative prices and negative or fractional quantities.
    pub fn validate(&self) -> Result<(), PricingError> {
        if self.id.trim().is_empty() {
            return Err(PricingError::invalid("line item id is required"));
        }
        if self.price < Decimal::ZERO {
            return Err(PricingError::invalid(format!(
                "line item '{}' has negative price {}",
                self.id, self.price
            )));
        }
        if self.quantity < Decimal::ZERO {
            return Err(PricingError::invalid(format!(
                "line item '{}' has negative quantity {}",
                self.id, self.quantity
            )));
        }
        if !self.quantity.fract().is_zero() {
            return Err(PricingError::invalid(format!(
                "line item '{}' has non-integer quantity {}",
                self.id, self.quantity
            )));
        }
        Ok(())
    }

    /// Unrounded `price × quantity`.
    pub fn line_total(&self) -> Result<Decimal, PricingError> {
        self.price
            .checked_mul(self.quantity)
            .ok_or_else(|| PricingError::overflow(format_args!("line item '{}'", self.id)))
    }
}
