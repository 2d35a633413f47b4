//! Test helper module for pricing-service integration tests.
//!
//! Spawns the HTTP router on a random port backed by the in-memory store.

#![allow(dead_code)]

use async_trait::async_trait;
use axum::Router;
use pricing_service::error::PricingError;
use pricing_service::models::{
    LineItem, Location, PriceType, PricingConfiguration, PricingContext, PricingRecord,
    PricingSnapshot, RebuildSummary,
};
use pricing_service::services::{
    init_metrics, DeliveryFeeStrategy, InMemorySnapshotStore, NoDeliveryFee, PricingEngine,
    SnapshotStore, TaxProvider, TaxQuote, TaxRequest,
};
use pricing_service::startup::{router, AppState};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::collections::HashSet;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Once};
use tokio::net::TcpListener;
use uuid::Uuid;

static TRACING: Once = Once::new();

pub fn init_test_tracing() {
    TRACING.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter("pricing_service=debug")
            .with_test_writer()
            .try_init();
    });
}

/// Tax provider that charges a flat rate on the taxable base, or always fails.
pub struct MockTaxProvider {
    rate: Decimal,
    fail: bool,
    calls: AtomicU32,
}

impl MockTaxProvider {
    pub fn with_rate(rate: Decimal) -> Self {
        Self {
            rate,
            fail: false,
            calls: AtomicU32::new(0),
        }
    }

    pub fn failing() -> Self {
        Self {
            rate: Decimal::ZERO,
            fail: true,
            calls: AtomicU32::new(0),
        }
    }

    pub fn calls(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl TaxProvider for MockTaxProvider {
    async fn compute_tax(&self, request: &TaxRequest) -> Result<TaxQuote, PricingError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            return Err(PricingError::TaxProvider(
                "tax provider timed out after 10s".to_string(),
            ));
        }
        Ok(TaxQuote {
            rate: self.rate,
            amount: request.taxable_base * self.rate / Decimal::ONE_HUNDRED,
            description: Some(format!("{} sales tax", request.jurisdiction.country)),
        })
    }
}

pub fn engine_with(provider: Arc<MockTaxProvider>) -> PricingEngine {
    PricingEngine::new(provider, Arc::new(NoDeliveryFee))
}

/// 5% percentage fee, 8% manual tax.
pub fn manual_config() -> PricingConfiguration {
    PricingConfiguration::default().with_manual_tax(dec!(8))
}

/// A catering buffet at 65 per guest for 100 guests plus a 500 cake.
pub fn catering_cart() -> Vec<LineItem> {
    vec![
        LineItem::new("buffet", dec!(65), 100, PriceType::PerPerson)
            .with_name("Catering buffet")
            .with_vendor("vendor-a"),
        LineItem::new("cake", dec!(500), 1, PriceType::FlatRate)
            .with_name("Cake")
            .with_vendor("vendor-a"),
    ]
}

/// A line whose `price × quantity` exceeds the `Decimal` range.
pub fn overflowing_item() -> LineItem {
    LineItem::new(
        "chandelier",
        Decimal::from_i128_with_scale(10_i128.pow(25), 0),
        100_000,
        PriceType::PerItem,
    )
}

/// Charges a per-mile rate, overridable by the vendor's `perMile` rule.
pub struct PerMileDelivery {
    pub default_rate: Decimal,
}

impl DeliveryFeeStrategy for PerMileDelivery {
    fn compute_delivery_fee(
        &self,
        distance_miles: Decimal,
        vendor_rules: Option<&serde_json::Value>,
    ) -> Result<Decimal, PricingError> {
        let rate = match vendor_rules.and_then(|rules| rules.get("perMile")) {
            Some(value) => value
                .as_str()
                .and_then(|s| s.parse::<Decimal>().ok())
                .ok_or_else(|| PricingError::invalid("perMile must be a decimal string"))?,
            None => self.default_rate,
        };
        Ok(distance_miles * rate)
    }
}

/// In-memory store whose snapshot writes fail for selected records.
pub struct FailingStore {
    pub inner: Arc<InMemorySnapshotStore>,
    pub fail_on: HashSet<Uuid>,
}

impl FailingStore {
    pub fn new(inner: Arc<InMemorySnapshotStore>, fail_on: impl IntoIterator<Item = Uuid>) -> Self {
        Self {
            inner,
            fail_on: fail_on.into_iter().collect(),
        }
    }
}

#[async_trait]
impl SnapshotStore for FailingStore {
    async fn insert_record(&self, record: &PricingRecord) -> Result<(), PricingError> {
        self.inner.insert_record(record).await
    }

    async fn get_record(&self, record_id: Uuid) -> Result<Option<PricingRecord>, PricingError> {
        self.inner.get_record(record_id).await
    }

    async fn save_snapshot(
        &self,
        record_id: Uuid,
        snapshot: &PricingSnapshot,
        summary: &RebuildSummary,
    ) -> Result<(), PricingError> {
        if self.fail_on.contains(&record_id) {
            return Err(PricingError::Persistence(
                "connection reset while saving snapshot".to_string(),
            ));
        }
        self.inner.save_snapshot(record_id, snapshot, summary).await
    }

    async fn list_incomplete(&self) -> Result<Vec<Uuid>, PricingError> {
        self.inner.list_incomplete().await
    }

    async fn health_check(&self) -> Result<(), PricingError> {
        self.inner.health_check().await
    }
}

/// Serve a stand-in tax provider on a random port and return its base URL.
pub async fn spawn_tax_stub(app: Router) -> String {
    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind tax stub listener");
    let port = listener.local_addr().expect("No local address").port();

    tokio::spawn(async move {
        axum::serve(listener, app)
            .await
            .expect("Tax stub server failed");
    });

    format!("http://127.0.0.1:{}", port)
}

pub fn austin_context() -> PricingContext {
    PricingContext {
        location: Some(Location {
            line1: Some("500 Congress Ave".to_string()),
            city: Some("Austin".to_string()),
            state: Some("tx".to_string()),
            postal_code: Some("78701".to_string()),
            country: "us".to_string(),
        }),
        ..Default::default()
    }
}

/// Test application wrapper for integration tests.
pub struct TestApp {
    pub http_address: String,
    pub http_port: u16,
    pub store: Arc<InMemorySnapshotStore>,
}

impl TestApp {
    /// Spawn the router with manual tax and no tax provider.
    pub async fn spawn() -> Self {
        Self::spawn_with(PricingEngine::default(), manual_config()).await
    }

    pub async fn spawn_with(engine: PricingEngine, config: PricingConfiguration) -> Self {
        init_test_tracing();
        init_metrics();

        let store = Arc::new(InMemorySnapshotStore::new());
        let state = AppState::new(store.clone(), engine, config);

        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind test listener");
        let http_port = listener.local_addr().expect("No local address").port();

        tokio::spawn(async move {
            axum::serve(listener, router(state))
                .await
                .expect("Test server failed");
        });

        Self {
            http_address: format!("http://127.0.0.1:{}", http_port),
            http_port,
            store,
        }
    }
}
