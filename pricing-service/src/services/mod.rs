//! Services module for pricing-service.

pub mod calculator;
pub mod database;
pub mod delivery;
pub mod metrics;
pub mod snapshots;
pub mod store;
pub mod tax;

pub use calculator::{PreTaxTotals, PricingEngine, TaxOutcome};
pub use database::Database;
pub use delivery::{DeliveryFeeStrategy, NoDeliveryFee};
pub use metrics::{get_metrics, init_metrics};
pub use snapshots::SnapshotService;
pub use store::{InMemorySnapshotStore, SnapshotStore};
pub use tax::{HttpTaxProvider, TaxProvider, TaxQuote, TaxRequest, UnconfiguredTaxProvider};
