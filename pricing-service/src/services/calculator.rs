//! Order pricing calculator.
//!
//! Every amount is rounded to cents before it is summed, so a snapshot's
//! `total` always equals the sum of its components exactly. The tax provider
//! call is the only suspending step; everything else is synchronous and pure.

use crate::error::PricingError;
use crate::models::{
    checked_sum, round_to_cents, AppliedAdjustment, CustomAdjustment, LineItem, LineTotal,
    PricingConfiguration, PricingContext, PricingPreview, PricingSnapshot, ServiceFeeType,
    TaxCalculationMethod, VendorDeliveryFee,
};
use crate::services::delivery::{DeliveryFeeStrategy, NoDeliveryFee};
use crate::services::metrics::{record_calculation, record_error, TAX_PROVIDER_DURATION};
use crate::services::tax::{TaxProvider, TaxRequest, UnconfiguredTaxProvider};
use rust_decimal::Decimal;
use std::collections::BTreeSet;
use std::sync::Arc;
use tracing::{debug, instrument, warn};

/// Service fee for a subtotal, unrounded.
pub fn service_fee(
    subtotal: Decimal,
    config: &PricingConfiguration,
    waived: bool,
) -> Result<Decimal, PricingError> {
    if waived {
        return Ok(Decimal::ZERO);
    }
    let percentage_part = || {
        subtotal
            .checked_mul(config.service_fee_percentage)
            .map(|v| v / Decimal::ONE_HUNDRED)
            .ok_or_else(|| PricingError::overflow("service fee"))
    };
    match config.service_fee_type {
        ServiceFeeType::Percentage => percentage_part(),
        ServiceFeeType::Fixed => Ok(config.service_fee_fixed),
        ServiceFeeType::Hybrid => config
            .service_fee_fixed
            .checked_add(percentage_part()?)
            .ok_or_else(|| PricingError::overflow("service fee")),
    }
}

/// Everything except tax, already rounded to cents.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PreTaxTotals {
    pub subtotal: Decimal,
    pub service_fee: Decimal,
    pub delivery_fee: Decimal,
    pub adjustments_total: Decimal,
    /// Subtotal, fee and adjustment parts that are taxable, floored at zero.
    /// Excludes delivery under the automatic method.
    pub taxable_base: Decimal,
    pub lines: Vec<LineTotal>,
    pub adjustments: Vec<AppliedAdjustment>,
    pub delivery_fees: Vec<VendorDeliveryFee>,
}

/// Tax component of a snapshot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaxOutcome {
    pub amount: Decimal,
    pub rate: Option<Decimal>,
    pub description: Option<String>,
}

impl TaxOutcome {
    fn none(description: &str) -> Self {
        Self {
            amount: round_to_cents(Decimal::ZERO),
            rate: None,
            description: Some(description.to_string()),
        }
    }
}

impl PreTaxTotals {
    pub fn into_snapshot(self, tax: TaxOutcome) -> Result<PricingSnapshot, PricingError> {
        let total = checked_sum(
            [
                self.subtotal,
                self.service_fee,
                self.delivery_fee,
                self.adjustments_total,
                tax.amount,
            ],
            "total",
        )?;
        Ok(PricingSnapshot {
            subtotal: self.subtotal,
            service_fee: self.service_fee,
            delivery_fee: self.delivery_fee,
            adjustments_total: self.adjustments_total,
            taxable_base: self.taxable_base,
            tax: tax.amount,
            tax_rate: tax.rate,
            tax_description: tax.description,
            total,
            lines: self.lines,
            adjustments: self.adjustments,
            delivery_fees: self.delivery_fees,
        })
    }
}

/// Computes pricing snapshots from carts, adjustments, configuration and context.
#[derive(Clone)]
pub struct PricingEngine {
    tax_provider: Arc<dyn TaxProvider>,
    delivery: Arc<dyn DeliveryFeeStrategy>,
}

impl Default for PricingEngine {
    fn default() -> Self {
        Self::new(Arc::new(UnconfiguredTaxProvider), Arc::new(NoDeliveryFee))
    }
}

impl PricingEngine {
    pub fn new(tax_provider: Arc<dyn TaxProvider>, delivery: Arc<dyn DeliveryFeeStrategy>) -> Self {
        Self {
            tax_provider,
            delivery,
        }
    }

    /// Compute a full snapshot. Tax provider failures propagate.
    #[instrument(skip_all, fields(items = line_items.len(), adjustments = adjustments.len()))]
    pub async fn calculate_totals(
        &self,
        line_items: &[LineItem],
        adjustments: &[CustomAdjustment],
        config: &PricingConfiguration,
        context: &PricingContext,
    ) -> Result<PricingSnapshot, PricingError> {
        let result = self
            .compute_snapshot(line_items, adjustments, config, context)
            .await;

        match &result {
            Ok(snapshot) => {
                debug!(total = %snapshot.total, "Totals calculated");
                record_calculation("calculate", "ok");
            }
            Err(e) => {
                warn!(error = %e, "Totals calculation failed");
                record_calculation("calculate", "error");
                record_error(e.error_type());
            }
        }

        result
    }

    async fn compute_snapshot(
        &self,
        line_items: &[LineItem],
        adjustments: &[CustomAdjustment],
        config: &PricingConfiguration,
        context: &PricingContext,
    ) -> Result<PricingSnapshot, PricingError> {
        let pre_tax = self.price_pre_tax(line_items, adjustments, config, context)?;
        let tax = self.resolve_tax(&pre_tax, config, context).await?;
        pre_tax.into_snapshot(tax)
    }

    /// Compute totals for live display without ever failing.
    ///
    /// An invalid configuration is replaced by the defaults and reported in
    /// `error`. Input problems give all-zero totals with `error` set. Tax
    /// provider failures keep the pre-tax amounts, set `tax = 0` and flag
    /// `tax_pending`.
    #[instrument(skip_all, fields(items = line_items.len()))]
    pub async fn preview_totals(
        &self,
        line_items: &[LineItem],
        adjustments: &[CustomAdjustment],
        config: &PricingConfiguration,
        context: &PricingContext,
    ) -> PricingPreview {
        let fallback;
        let (config, config_error) = match config.validate() {
            Ok(()) => (config, None),
            Err(e) => {
                warn!(error = %e, "Invalid pricing configuration, previewing with defaults");
                record_error(e.error_type());
                fallback = PricingConfiguration::default();
                (&fallback, Some(e.to_string()))
            }
        };

        let pre_tax = match self.price_pre_tax(line_items, adjustments, config, context) {
            Ok(pre_tax) => pre_tax,
            Err(e) => return zeroed_preview("preview", e),
        };

        match self.resolve_tax(&pre_tax, config, context).await {
            Ok(tax) => match pre_tax.into_snapshot(tax) {
                Ok(snapshot) => {
                    record_calculation("preview", "ok");
                    let mut preview = PricingPreview::ok(snapshot);
                    preview.error = config_error;
                    preview
                }
                Err(e) => zeroed_preview("preview", e),
            },
            Err(e @ PricingError::TaxProvider(_)) => {
                match pre_tax.into_snapshot(TaxOutcome::none("Tax pending")) {
                    Ok(snapshot) => {
                        warn!(error = %e, "Tax pending, previewing pre-tax totals");
                        record_calculation("preview", "tax_pending");
                        record_error(e.error_type());
                        PricingPreview {
                            snapshot,
                            tax_pending: true,
                            error: Some(e.to_string()),
                        }
                    }
                    Err(overflow) => zeroed_preview("preview", overflow),
                }
            }
            Err(e) => zeroed_preview("preview", e),
        }
    }

    /// Steps 1-6: line totals, subtotal, service fee, delivery, adjustments
    /// and the taxable base.
    pub fn price_pre_tax(
        &self,
        line_items: &[LineItem],
        adjustments: &[CustomAdjustment],
        config: &PricingConfiguration,
        context: &PricingContext,
    ) -> Result<PreTaxTotals, PricingError> {
        config.validate()?;
        validate_cart(line_items, adjustments, config, context)?;

        let lines = line_items
            .iter()
            .map(|item| {
                Ok(LineTotal {
                    id: item.id.clone(),
                    quantity: item.quantity,
                    unit_price: item.price,
                    line_total: round_to_cents(item.line_total()?),
                    taxable: item.taxable,
                })
            })
            .collect::<Result<Vec<LineTotal>, PricingError>>()?;

        let subtotal = round_to_cents(checked_sum(lines.iter().map(|l| l.line_total), "subtotal")?);
        let taxable_lines = checked_sum(
            lines.iter().filter(|l| l.taxable).map(|l| l.line_total),
            "taxable base",
        )?;

        let waived = config.is_service_fee_waived || context.is_service_fee_waived;
        let service_fee = round_to_cents(service_fee(subtotal, config, waived)?);

        let delivery_fees = self.delivery_fees(context)?;
        let delivery_fee =
            round_to_cents(checked_sum(delivery_fees.iter().map(|d| d.fee), "delivery fee")?);

        let applied = adjustments
            .iter()
            .map(|adj| {
                Ok(AppliedAdjustment {
                    id: adj.id.clone(),
                    label: adj.label.clone(),
                    amount: round_to_cents(adj.signed_amount(subtotal)?),
                    taxable: adj.taxable,
                })
            })
            .collect::<Result<Vec<AppliedAdjustment>, PricingError>>()?;
        let adjustments_total =
            round_to_cents(checked_sum(applied.iter().map(|a| a.amount), "adjustments")?);
        let taxable_adjustments = checked_sum(
            applied.iter().filter(|a| a.taxable).map(|a| a.amount),
            "taxable base",
        )?;

        let mut base_parts = vec![taxable_lines, taxable_adjustments];
        if config.service_fee_taxable {
            base_parts.push(service_fee);
        }
        if config.tax_calculation_method == TaxCalculationMethod::Manual
            && config.delivery_fee_taxable
        {
            base_parts.push(delivery_fee);
        }
        let taxable_base =
            round_to_cents(checked_sum(base_parts, "taxable base")?.max(Decimal::ZERO));

        Ok(PreTaxTotals {
            subtotal,
            service_fee,
            delivery_fee,
            adjustments_total,
            taxable_base,
            lines,
            adjustments: applied,
            delivery_fees,
        })
    }

    fn delivery_fees(&self, context: &PricingContext) -> Result<Vec<VendorDeliveryFee>, PricingError> {
        context
            .deliveries
            .iter()
            .map(|delivery| {
                let fee = match (delivery.fee, delivery.distance_miles) {
                    (Some(fee), _) => fee,
                    (None, Some(distance)) => self
                        .delivery
                        .compute_delivery_fee(distance, delivery.rules.as_ref())?,
                    (None, None) => Decimal::ZERO,
                };
                if fee < Decimal::ZERO {
                    return Err(PricingError::invalid(format!(
                        "delivery fee for vendor '{}' is negative",
                        delivery.vendor_id
                    )));
                }
                Ok(VendorDeliveryFee {
                    vendor_id: delivery.vendor_id.clone(),
                    fee: round_to_cents(fee),
                })
            })
            .collect()
    }

    /// Step 7: tax on the taxable base.
    async fn resolve_tax(
        &self,
        pre_tax: &PreTaxTotals,
        config: &PricingConfiguration,
        context: &PricingContext,
    ) -> Result<TaxOutcome, PricingError> {
        if config.is_tax_exempt || context.is_tax_exempt {
            return Ok(TaxOutcome::none("Tax exempt"));
        }

        match config.tax_calculation_method {
            TaxCalculationMethod::Manual => {
                let rate = config.manual_tax_rate.ok_or_else(|| {
                    PricingError::configuration("manual tax method requires a manual tax rate")
                })?;
                let amount = pre_tax
                    .taxable_base
                    .checked_mul(rate)
                    .map(|v| v / Decimal::ONE_HUNDRED)
                    .ok_or_else(|| PricingError::overflow("tax"))?;
                Ok(TaxOutcome {
                    amount: round_to_cents(amount),
                    rate: Some(rate),
                    description: Some(format!("Sales tax ({}%)", rate.normalize())),
                })
            }
            TaxCalculationMethod::Automatic => {
                if pre_tax.taxable_base.is_zero() && pre_tax.delivery_fee.is_zero() {
                    return Ok(TaxOutcome::none("No taxable amount"));
                }
                let location = context.location.as_ref().ok_or_else(|| {
                    PricingError::invalid("location is required for automatic tax calculation")
                })?;
                let request = TaxRequest {
                    taxable_base: pre_tax.taxable_base,
                    delivery_fee: pre_tax.delivery_fee,
                    jurisdiction: location.jurisdiction(),
                };

                let timer = std::time::Instant::now();
                let result = self.tax_provider.compute_tax(&request).await;
                let outcome = if result.is_ok() { "ok" } else { "error" };
                TAX_PROVIDER_DURATION
                    .with_label_values(&[outcome])
                    .observe(timer.elapsed().as_secs_f64());

                let quote = result?;
                Ok(TaxOutcome {
                    amount: round_to_cents(quote.amount),
                    rate: Some(quote.rate),
                    description: quote.description,
                })
            }
        }
    }
}

fn zeroed_preview(operation: &str, e: PricingError) -> PricingPreview {
    warn!(error = %e, "Preview failed, showing zero totals");
    record_calculation(operation, "error");
    record_error(e.error_type());
    PricingPreview {
        snapshot: PricingSnapshot::zero(),
        tax_pending: false,
        error: Some(e.to_string()),
    }
}

fn validate_cart(
    line_items: &[LineItem],
    adjustments: &[CustomAdjustment],
    config: &PricingConfiguration,
    context: &PricingContext,
) -> Result<(), PricingError> {
    let mut line_ids = BTreeSet::new();
    for item in line_items {
        item.validate()?;
        if !line_ids.insert(item.id.as_str()) {
            return Err(PricingError::invalid(format!(
                "duplicate line item id '{}'",
                item.id
            )));
        }
    }

    let mut adjustment_ids = BTreeSet::new();
    for adjustment in adjustments {
        adjustment.validate()?;
        if !adjustment_ids.insert(adjustment.id.as_str()) {
            return Err(PricingError::invalid(format!(
                "duplicate adjustment id '{}'",
                adjustment.id
            )));
        }
    }

    let mut delivery_vendors = BTreeSet::new();
    for delivery in &context.deliveries {
        if delivery.vendor_id.trim().is_empty() {
            return Err(PricingError::invalid("delivery vendor id is required"));
        }
        if delivery.distance_miles.is_some_and(|d| d < Decimal::ZERO) {
            return Err(PricingError::invalid(format!(
                "delivery distance for vendor '{}' is negative",
                delivery.vendor_id
            )));
        }
        if !delivery_vendors.insert(delivery.vendor_id.as_str()) {
            return Err(PricingError::invalid(format!(
                "duplicate delivery entry for vendor '{}'",
                delivery.vendor_id
            )));
        }
    }

    if !config.enable_multi_vendor_orders {
        let vendors: BTreeSet<&str> = line_items
            .iter()
            .filter_map(|item| item.vendor_id.as_deref())
            .chain(delivery_vendors.iter().copied())
            .collect();
        if vendors.len() > 1 {
            return Err(PricingError::invalid(format!(
                "multi-vendor orders are disabled; cart spans {} vendors",
                vendors.len()
            )));
        }
    }

    Ok(())
}
