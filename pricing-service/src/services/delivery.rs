//! Delivery fee strategy seam.

use crate::error::PricingError;
use rust_decimal::Decimal;

/// Computes one vendor's delivery fee from the distance to the event.
///
/// `vendor_rules` is the vendor's rule document exactly as the marketplace
/// stores it; interpreting it belongs to the implementation.
pub trait DeliveryFeeStrategy: Send + Sync {
    fn compute_delivery_fee(
        &self,
        distance_miles: Decimal,
        vendor_rules: Option<&serde_json::Value>,
    ) -> Result<Decimal, PricingError>;
}

/// Charges nothing for distance; only explicitly supplied fees apply.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoDeliveryFee;

impl DeliveryFeeStrategy for NoDeliveryFee {
    fn compute_delivery_fee(
        &self,
        _distance_miles: Decimal,
        _vendor_rules: Option<&serde_json::Value>,
    ) -> Result<Decimal, PricingError> {
        Ok(Decimal::ZERO)
    }
}
