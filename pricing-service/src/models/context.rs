//! Per-order pricing context.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Event location supplied by the booking flow.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Location {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub line1: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub city: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub postal_code: Option<String>,
    pub country: String,
}

impl Location {
    /// Tax jurisdiction for this location.
    pub fn jurisdiction(&self) -> Jurisdiction {
        Jurisdiction {
            country: self.country.trim().to_ascii_uppercase(),
            state: self
                .state
                .as_deref()
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_ascii_uppercase),
            city: self
                .city
                .as_deref()
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string),
            postal_code: self
                .postal_code
                .as_deref()
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string),
        }
    }
}

/// Normalised jurisdiction sent to the tax provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Jurisdiction {
    pub country: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub city: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub postal_code: Option<String>,
}

/// Delivery leg for one vendor on the order.
///
/// Either `fee` is supplied directly, or the delivery strategy derives one
/// from `distance_miles` and the vendor's opaque `rules`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VendorDelivery {
    pub vendor_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub distance_miles: Option<Decimal>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fee: Option<Decimal>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rules: Option<serde_json::Value>,
}

impl VendorDelivery {
    pub fn with_fee(vendor_id: impl Into<String>, fee: Decimal) -> Self {
        Self {
            vendor_id: vendor_id.into(),
            distance_miles: None,
            fee: Some(fee),
            rules: None,
        }
    }

    pub fn with_distance(vendor_id: impl Into<String>, distance_miles: Decimal) -> Self {
        Self {
            vendor_id: vendor_id.into(),
            distance_miles: Some(distance_miles),
            fee: None,
            rules: None,
        }
    }
}

/// Order-level context; flags combine with the configuration flags.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PricingContext {
    pub location: Option<Location>,
    pub deliveries: Vec<VendorDelivery>,
    pub is_tax_exempt: bool,
    pub is_service_fee_waived: bool,
}
