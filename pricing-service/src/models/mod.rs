//! Domain models for pricing-service.

mod adjustment;
mod configuration;
mod context;
mod line_item;
mod record;
mod snapshot;

pub use adjustment::{AdjustmentAmount, AdjustmentMode, CustomAdjustment, RawAdjustment};
pub use configuration::{
    PricingConfiguration, PricingSettings, ServiceFeeType, TaxCalculationMethod,
};
pub use context::{Jurisdiction, Location, PricingContext, VendorDelivery};
pub use line_item::{LineItem, PriceType};
pub use record::{
    BatchRebuildReport, PricingRecord, RebuildFailure, RebuildOutcome, RebuildSummary, RecordKind,
};
pub use snapshot::{
    checked_sum, round_to_cents, AppliedAdjustment, LineTotal, PricingPreview, PricingSnapshot,
    VendorDeliveryFee,
};
