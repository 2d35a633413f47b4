//! Admin-controlled pricing configuration.

use crate::error::PricingError;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// How the platform service fee is derived from the subtotal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ServiceFeeType {
    Percentage,
    Fixed,
    Hybrid,
}

impl ServiceFeeType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ServiceFeeType::Percentage => "percentage",
            ServiceFeeType::Fixed => "fixed",
            ServiceFeeType::Hybrid => "hybrid",
        }
    }
}

impl FromStr for ServiceFeeType {
    type Err = PricingError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "percentage" => Ok(ServiceFeeType::Percentage),
            "fixed" => Ok(ServiceFeeType::Fixed),
            "hybrid" => Ok(ServiceFeeType::Hybrid),
            other => Err(PricingError::configuration(format!(
                "unrecognized service fee type '{}'",
                other
            ))),
        }
    }
}

/// Where tax amounts come from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaxCalculationMethod {
    /// Delegated to the external tax provider.
    Automatic,
    /// Flat configured rate applied to the taxable base.
    Manual,
}

impl TaxCalculationMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            TaxCalculationMethod::Automatic => "automatic",
            TaxCalculationMethod::Manual => "manual",
        }
    }
}

impl FromStr for TaxCalculationMethod {
    type Err = PricingError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "automatic" => Ok(TaxCalculationMethod::Automatic),
            "manual" => Ok(TaxCalculationMethod::Manual),
            other => Err(PricingError::configuration(format!(
                "unrecognized tax calculation method '{}'",
                other
            ))),
        }
    }
}

/// Fully resolved pricing configuration handed to the calculator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PricingConfiguration {
    pub service_fee_type: ServiceFeeType,
    /// Percentage points, e.g. 5 means 5 %.
    pub service_fee_percentage: Decimal,
    pub service_fee_fixed: Decimal,
    pub service_fee_taxable: bool,
    pub tax_calculation_method: TaxCalculationMethod,
    /// Percentage points; required when the method is manual.
    pub manual_tax_rate: Option<Decimal>,
    /// Manual method only. The tax provider decides this under the automatic method.
    pub delivery_fee_taxable: bool,
    pub is_tax_exempt: bool,
    pub is_service_fee_waived: bool,
    pub enable_multi_vendor_orders: bool,
}

impl Default for PricingConfiguration {
    fn default() -> Self {
        Self {
            service_fee_type: ServiceFeeType::Percentage,
            service_fee_percentage: Decimal::new(5, 0),
            service_fee_fixed: Decimal::ZERO,
            service_fee_taxable: true,
            tax_calculation_method: TaxCalculationMethod::Automatic,
            manual_tax_rate: None,
            delivery_fee_taxable: false,
            is_tax_exempt: false,
            is_service_fee_waived: false,
            enable_multi_vendor_orders: true,
        }
    }
}

impl PricingConfiguration {
    /// Manual tax with the given rate in percentage points.
    pub fn with_manual_tax(mut self, rate: Decimal) -> Self {
        self.tax_calculation_method = TaxCalculationMethod::Manual;
        self.manual_tax_rate = Some(rate);
        self
    }

    pub fn validate(&self) -> Result<(), PricingError> {
        if self.service_fee_percentage < Decimal::ZERO {
            return Err(PricingError::configuration(
                "service fee percentage must not be negative",
            ));
        }
        if self.service_fee_fixed < Decimal::ZERO {
            return Err(PricingError::configuration(
                "fixed service fee must not be negative",
            ));
        }
        match (self.tax_calculation_method, self.manual_tax_rate) {
            (TaxCalculationMethod::Manual, None) => Err(PricingError::configuration(
                "manual tax method requires a manual tax rate",
            )),
            (_, Some(rate)) if rate < Decimal::ZERO => Err(PricingError::configuration(
                "manual tax rate must not be negative",
            )),
            _ => Ok(()),
        }
    }

    /// Resolve admin settings, falling back to defaults when they are
    /// unavailable or invalid.
    pub fn resolve_or_default(settings: Option<&PricingSettings>) -> Self {
        let Some(settings) = settings else {
            tracing::warn!("Pricing settings unavailable, using defaults");
            return Self::default();
        };

        match settings.resolve() {
            Ok(config) => config,
            Err(e) => {
                tracing::warn!(error = %e, "Invalid pricing settings, using defaults");
                Self::default()
            }
        }
    }
}

/// Raw admin settings as stored; every field is an optional override.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PricingSettings {
    pub service_fee_type: Option<String>,
    pub service_fee_percentage: Option<Decimal>,
    pub service_fee_fixed: Option<Decimal>,
    pub service_fee_taxable: Option<bool>,
    pub tax_calculation_method: Option<String>,
    pub manual_tax_rate: Option<Decimal>,
    pub delivery_fee_taxable: Option<bool>,
    pub is_tax_exempt: Option<bool>,
    pub is_service_fee_waived: Option<bool>,
    pub enable_multi_vendor_orders: Option<bool>,
}

impl PricingSettings {
    /// Merge these overrides over the defaults.
    pub fn resolve(&self) -> Result<PricingConfiguration, PricingError> {
        let defaults = PricingConfiguration::default();

        let service_fee_type = match &self.service_fee_type {
            Some(s) => s.parse()?,
            None => defaults.service_fee_type,
        };
        let tax_calculation_method = match &self.tax_calculation_method {
            Some(s) => s.parse()?,
            None => defaults.tax_calculation_method,
        };

        let config = PricingConfiguration {
            service_fee_type,
            service_fee_percentage: self
                .service_fee_percentage
                .unwrap_or(defaults.service_fee_percentage),
            service_fee_fixed: self.service_fee_fixed.unwrap_or(defaults.service_fee_fixed),
            service_fee_taxable: self
                .service_fee_taxable
                .unwrap_or(defaults.service_fee_taxable),
            tax_calculation_method,
            manual_tax_rate: self.manual_tax_rate.or(defaults.manual_tax_rate),
            delivery_fee_taxable: self
                .delivery_fee_taxable
                .unwrap_or(defaults.delivery_fee_taxable),
            is_tax_exempt: self.is_tax_exempt.unwrap_or(defaults.is_tax_exempt),
            is_service_fee_waived: self
                .is_service_fee_waived
                .unwrap_or(defaults.is_service_fee_waived),
            enable_multi_vendor_orders: self
                .enable_multi_vendor_orders
                .unwrap_or(defaults.enable_multi_vendor_orders),
        };

        config.validate()?;
        Ok(config)
    }
}
