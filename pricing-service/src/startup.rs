//! Application startup and lifecycle management.

use crate::config::PricingServiceConfig;
use crate::handlers::{health, pricing, snapshots};
use crate::models::PricingConfiguration;
use crate::services::{
    init_metrics, Database, HttpTaxProvider, NoDeliveryFee, PricingEngine, SnapshotService,
    SnapshotStore, TaxProvider, UnconfiguredTaxProvider,
};
use axum::{
    middleware,
    routing::{get, post},
    Router,
};
use service_core::error::AppError;
use service_core::middleware::request_id_middleware;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn SnapshotStore>,
    pub engine: PricingEngine,
    pub pricing_config: Arc<PricingConfiguration>,
    pub snapshots: SnapshotService,
}

impl AppState {
    pub fn new(
        store: Arc<dyn SnapshotStore>,
        engine: PricingEngine,
        pricing_config: PricingConfiguration,
    ) -> Self {
        let pricing_config = Arc::new(pricing_config);
        let snapshots = SnapshotService::new(store.clone(), engine.clone(), pricing_config.clone());
        Self {
            store,
            engine,
            pricing_config,
            snapshots,
        }
    }
}

/// HTTP routes for health checks, metrics, previews and snapshot administration.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health_check))
        .route("/ready", get(health::readiness_check))
        .route("/metrics", get(health::metrics_handler))
        .route("/v1/pricing/preview", post(pricing::preview))
        .route("/v1/records", post(snapshots::capture_record))
        .route("/v1/records/:record_id", get(snapshots::get_record_snapshot))
        .route(
            "/v1/records/:record_id/snapshot/rebuild",
            post(snapshots::rebuild_snapshot),
        )
        .route(
            "/v1/records/snapshots/rebuild",
            post(snapshots::rebuild_incomplete),
        )
        .layer(TraceLayer::new_for_http())
        .layer(middleware::from_fn(request_id_middleware))
        .with_state(state)
}

/// Application container for managing server lifecycle.
pub struct Application {
    port: u16,
    listener: TcpListener,
    state: AppState,
}

impl Application {
    /// Build the application with the given configuration.
    pub async fn build(config: PricingServiceConfig) -> Result<Self, AppError> {
        Self::build_internal(config, true).await
    }

    /// Build the application without running migrations.
    pub async fn build_without_migrations(config: PricingServiceConfig) -> Result<Self, AppError> {
        Self::build_internal(config, false).await
    }

    async fn build_internal(
        config: PricingServiceConfig,
        run_migrations: bool,
    ) -> Result<Self, AppError> {
        init_metrics();

        let db = Database::new(
            &config.database.url,
            config.database.max_connections,
            config.database.min_connections,
        )
        .await
        .map_err(|e| {
            tracing::error!(error = %e, "Failed to connect to PostgreSQL");
            e
        })?;

        if run_migrations {
            db.run_migrations().await.map_err(|e| {
                tracing::error!(error = %e, "Failed to run migrations");
                e
            })?;
        }

        // Settings are read once; an unreachable settings row falls back to defaults.
        let settings = match db.load_pricing_settings().await {
            Ok(settings) => settings,
            Err(e) => {
                tracing::warn!(error = %e, "Failed to load pricing settings");
                None
            }
        };
        let pricing_config = PricingConfiguration::resolve_or_default(settings.as_ref());
        tracing::info!(
            service_fee_type = pricing_config.service_fee_type.as_str(),
            service_fee_percentage = %pricing_config.service_fee_percentage,
            tax_method = pricing_config.tax_calculation_method.as_str(),
            "Pricing configuration resolved"
        );

        let tax_provider: Arc<dyn TaxProvider> = match &config.tax_provider.url {
            Some(url) => Arc::new(HttpTaxProvider::new(url.clone(), config.tax_provider.timeout)),
            None => {
                tracing::warn!("TAX_PROVIDER_URL not set; automatic tax will report as pending");
                Arc::new(UnconfiguredTaxProvider)
            }
        };
        let engine = PricingEngine::new(tax_provider, Arc::new(NoDeliveryFee));

        let state = AppState::new(Arc::new(db), engine, pricing_config);

        let addr = config.common.bind_address();
        let listener = TcpListener::bind(&addr).await.map_err(|e| {
            tracing::error!(error = %e, addr = %addr, "Failed to bind HTTP listener");
            AppError::from(e)
        })?;
        let port = listener.local_addr()?.port();

        tracing::info!(port = port, "Pricing service listener bound");

        Ok(Self {
            port,
            listener,
            state,
        })
    }

    /// Get the port the server is listening on.
    pub fn port(&self) -> u16 {
        self.port
    }

    /// Run the application until stopped.
    pub async fn run_until_stopped(self) -> std::io::Result<()> {
        tracing::info!(
            service = "pricing-service",
            version = env!("CARGO_PKG_VERSION"),
            port = self.port,
            "Service ready to accept connections"
        );

        axum::serve(self.listener, router(self.state))
            .await
            .map_err(|e| {
                tracing::error!(error = %e, "HTTP server error");
                std::io::Error::other(format!("HTTP server error: {}", e))
            })
    }
}
