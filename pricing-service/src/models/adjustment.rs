//! Custom adjustment model for pricing-service.

use crate::error::PricingError;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Sign of an adjustment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AdjustmentMode {
    Surcharge,
    Discount,
}

impl AdjustmentMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            AdjustmentMode::Surcharge => "surcharge",
            AdjustmentMode::Discount => "discount",
        }
    }

    pub fn parse(s: &str) -> Result<Self, PricingError> {
        match s {
            "surcharge" => Ok(AdjustmentMode::Surcharge),
            "discount" => Ok(AdjustmentMode::Discount),
            other => Err(PricingError::invalid(format!(
                "unknown adjustment mode '{}'",
                other
            ))),
        }
    }
}

/// Magnitude of an adjustment: a currency amount or percentage points of the subtotal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdjustmentAmount {
    Fixed(Decimal),
    Percentage(Decimal),
}

impl AdjustmentAmount {
    pub fn type_str(&self) -> &'static str {
        match self {
            AdjustmentAmount::Fixed(_) => "fixed",
            AdjustmentAmount::Percentage(_) => "percentage",
        }
    }

    pub fn value(&self) -> Decimal {
        match self {
            AdjustmentAmount::Fixed(v) | AdjustmentAmount::Percentage(v) => *v,
        }
    }
}

fn default_taxable() -> bool {
    true
}

/// Loosely typed adjustment as sent by collaborators and stored as JSON.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawAdjustment {
    pub id: String,
    #[serde(default)]
    pub label: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub mode: String,
    pub value: Decimal,
    #[serde(default = "default_taxable")]
    pub taxable: bool,
}

/// An ad-hoc surcharge or discount applied on top of the subtotal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawAdjustment", into = "RawAdjustment")]
pub struct CustomAdjustment {
    pub id: String,
    pub label: String,
    pub amount: AdjustmentAmount,
    pub mode: AdjustmentMode,
    pub taxable: bool,
}

impl CustomAdjustment {
    pub fn fixed(
        id: impl Into<String>,
        label: impl Into<String>,
        value: Decimal,
        mode: AdjustmentMode,
    ) -> Self {
        Self {
            id: id.into(),
            label: label.into(),
            amount: AdjustmentAmount::Fixed(value),
            mode,
            taxable: true,
        }
    }

    pub fn percentage(
        id: impl Into<String>,
        label: impl Into<String>,
        value: Decimal,
        mode: AdjustmentMode,
    ) -> Self {
        Self {
            id: id.into(),
            label: label.into(),
            amount: AdjustmentAmount::Percentage(value),
            mode,
            taxable: true,
        }
    }

    pub fn non_taxable(mut self) -> Self {
        self.taxable = false;
        self
    }

    pub fn validate(&self) -> Result<(), PricingError> {
        if self.id.trim().is_empty() {
            return Err(PricingError::invalid("adjustment id is required"));
        }
        if self.amount.value() < Decimal::ZERO {
            return Err(PricingError::invalid(format!(
                "adjustment '{}' has negative value {}; use mode=discount instead",
                self.id,
                self.amount.value()
            )));
        }
        Ok(())
    }

    /// Signed, unrounded contribution against the given subtotal.
    pub fn signed_amount(&self, subtotal: Decimal) -> Result<Decimal, PricingError> {
        let magnitude = match self.amount {
            AdjustmentAmount::Fixed(value) => value,
            AdjustmentAmount::Percentage(pct) => subtotal
                .checked_mul(pct)
                .map(|v| v / Decimal::ONE_HUNDRED)
                .ok_or_else(|| PricingError::overflow(format_args!("adjustment '{}'", self.id)))?,
        };
        Ok(match self.mode {
            AdjustmentMode::Surcharge => magnitude,
            AdjustmentMode::Discount => -magnitude,
        })
    }
}

impl TryFrom<RawAdjustment> for CustomAdjustment {
    type Error = PricingError;

    fn try_from(raw: RawAdjustment) -> Result<Self, Self::Error> {
        let amount = match raw.kind.as_str() {
            "fixed" => AdjustmentAmount::Fixed(raw.value),
            "percentage" => AdjustmentAmount::Percentage(raw.value),
            other => {
                return Err(PricingError::invalid(format!(
                    "unknown adjustment type '{}'",
                    other
                )))
            }
        };
        let adjustment = CustomAdjustment {
            id: raw.id,
            label: raw.label,
            amount,
            mode: AdjustmentMode::parse(&raw.mode)?,
            taxable: raw.taxable,
        };
        adjustment.validate()?;
        Ok(adjustment)
    }
}

impl From<CustomAdjustment> for RawAdjustment {
    fn from(adjustment: CustomAdjustment) -> Self {
        RawAdjustment {
            id: adjustment.id,
            label: adjustment.label,
            kind: adjustment.amount.type_str().to_string(),
            mode: adjustment.mode.as_str().to_string(),
            value: adjustment.amount.value(),
            taxable: adjustment.taxable,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn parses_loose_shape() {
        let adj: CustomAdjustment = serde_json::from_str(
            r#"{"id":"d1","label":"Loyalty","type":"percentage","mode":"discount","value":"10"}"#,
        )
        .unwrap();
        assert_eq!(adj.amount, AdjustmentAmount::Percentage(dec!(10)));
        assert_eq!(adj.mode, AdjustmentMode::Discount);
        assert!(adj.taxable);
    }

    #[test]
    fn rejects_unknown_type() {
        let result: Result<CustomAdjustment, _> = serde_json::from_str(
            r#"{"id":"d1","label":"x","type":"tiered","mode":"discount","value":"10"}"#,
        );
        let err = result.unwrap_err().to_string();
        assert!(err.contains("unknown adjustment type"), "{}", err);
    }

    #[test]
    fn rejects_unknown_mode() {
        let result: Result<CustomAdjustment, _> = serde_json::from_str(
            r#"{"id":"d1","label":"x","type":"fixed","mode":"rebate","value":"10"}"#,
        );
        assert!(result.is_err());
    }

    #[test]
    fn rejects_negative_magnitude() {
        let result: Result<CustomAdjustment, _> = serde_json::from_str(
            r#"{"id":"d1","label":"x","type":"fixed","mode":"surcharge","value":"-5"}"#,
        );
        assert!(result.is_err());
    }

    #[test]
    fn signed_amount_follows_mode() {
        let surcharge =
            CustomAdjustment::fixed("s", "Setup", dec!(25), AdjustmentMode::Surcharge);
        let discount =
            CustomAdjustment::percentage("d", "Promo", dec!(10), AdjustmentMode::Discount);
        assert_eq!(surcharge.signed_amount(dec!(1000)).unwrap(), dec!(25));
        assert_eq!(discount.signed_amount(dec!(1000)).unwrap(), dec!(-100));

        let huge = CustomAdjustment::percentage("h", "Huge", dec!(1000), AdjustmentMode::Surcharge);
        assert!(matches!(
            huge.signed_amount(Decimal::MAX),
            Err(PricingError::InvalidInput(_))
        ));
    }

    #[test]
    fn serializes_back_to_loose_shape() {
        let adj = CustomAdjustment::fixed("s", "Setup", dec!(25), AdjustmentMode::Surcharge)
            .non_taxable();
        let json = serde_json::to_value(&adj).unwrap();
        assert_eq!(json["type"], "fixed");
        assert_eq!(json["mode"], "surcharge");
        assert_eq!(json["taxable"], false);
    }
}
