//! Database service for pricing-service.

use crate::error::PricingError;
use crate::models::{
    CustomAdjustment, LineItem, PricingContext, PricingRecord, PricingSettings, PricingSnapshot,
    RebuildSummary, RecordKind,
};
use crate::services::metrics::DB_QUERY_DURATION;
use crate::services::store::SnapshotStore;
use async_trait::async_trait;
use service_core::error::AppError;
use sqlx::postgres::{PgPool, PgPoolOptions};
use sqlx::types::Json;
use sqlx::FromRow;
use std::time::Duration;
use tracing::{info, instrument};
use uuid::Uuid;

/// Row shape of `pricing_records`.
#[derive(Debug, FromRow)]
struct PricingRecordRow {
    record_id: Uuid,
    record_kind: String,
    line_items: Json<Vec<LineItem>>,
    adjustments: Json<Vec<CustomAdjustment>>,
    context: Json<PricingContext>,
    snapshot: Option<Json<PricingSnapshot>>,
    snapshot_complete: bool,
}

impl TryFrom<PricingRecordRow> for PricingRecord {
    type Error = PricingError;

    fn try_from(row: PricingRecordRow) -> Result<Self, Self::Error> {
        Ok(PricingRecord {
            record_id: row.record_id,
            kind: RecordKind::parse(&row.record_kind)?,
            line_items: row.line_items.0,
            adjustments: row.adjustments.0,
            context: row.context.0,
            snapshot: row.snapshot.map(|s| s.0),
            snapshot_complete: row.snapshot_complete,
        })
    }
}

/// Database connection pool wrapper.
#[derive(Clone)]
pub struct Database {
    pool: PgPool,
}

impl Database {
    /// Create a new database connection pool.
    #[instrument(skip(database_url), fields(service = "pricing-service"))]
    pub async fn new(
        database_url: &str,
        max_connections: u32,
        min_connections: u32,
    ) -> Result<Self, AppError> {
        info!(
            max_connections = max_connections,
            min_connections = min_connections,
            "Connecting to PostgreSQL"
        );

        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .min_connections(min_connections)
            .acquire_timeout(Duration::from_secs(30))
            .idle_timeout(Duration::from_secs(600))
            .connect(database_url)
            .await
            .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to connect: {}", e)))?;

        info!("PostgreSQL connection pool established");

        Ok(Self { pool })
    }

    /// Run database migrations.
    #[instrument(skip(self))]
    pub async fn run_migrations(&self) -> Result<(), AppError> {
        info!("Running database migrations");
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Migration failed: {}", e)))?;
        info!("Database migrations completed");
        Ok(())
    }

    // -------------------------------------------------------------------------
    // Pricing Settings
    // -------------------------------------------------------------------------

    /// Load the admin pricing settings, if any have been saved.
    #[instrument(skip(self))]
    pub async fn load_pricing_settings(&self) -> Result<Option<PricingSettings>, PricingError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["load_pricing_settings"])
            .start_timer();

        let settings = sqlx::query_scalar::<_, Json<PricingSettings>>(
            r#"
            SELECT settings
            FROM pricing_settings
            WHERE settings_id = 1
            "#,
        )
        .fetch_optional(&self.pool)
        .await?;

        timer.observe_duration();

        Ok(settings.map(|s| s.0))
    }
}

#[async_trait]
impl SnapshotStore for Database {
    #[instrument(skip(self, record), fields(record_id = %record.record_id))]
    async fn insert_record(&self, record: &PricingRecord) -> Result<(), PricingError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["insert_record"])
            .start_timer();

        sqlx::query(
            r#"
            INSERT INTO pricing_records (
                record_id, record_kind, line_items, adjustments, context,
                snapshot, snapshot_complete, snapshot_updated_utc
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, CASE WHEN $6::jsonb IS NULL THEN NULL ELSE NOW() END)
            "#,
        )
        .bind(record.record_id)
        .bind(record.kind.as_str())
        .bind(Json(&record.line_items))
        .bind(Json(&record.adjustments))
        .bind(Json(&record.context))
        .bind(record.snapshot.as_ref().map(Json))
        .bind(record.snapshot_complete)
        .execute(&self.pool)
        .await
        .map_err(|e| match e {
            sqlx::Error::Database(ref db_err) if db_err.is_unique_violation() => {
                PricingError::Persistence(format!("record {} already exists", record.record_id))
            }
            _ => PricingError::Persistence(format!("Failed to insert record: {}", e)),
        })?;

        timer.observe_duration();

        info!("Pricing record inserted");
        Ok(())
    }

    #[instrument(skip(self))]
    async fn get_record(&self, record_id: Uuid) -> Result<Option<PricingRecord>, PricingError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["get_record"])
            .start_timer();

        let row = sqlx::query_as::<_, PricingRecordRow>(
            r#"
            SELECT record_id, record_kind, line_items, adjustments, context,
                snapshot, snapshot_complete
            FROM pricing_records
            WHERE record_id = $1
            "#,
        )
        .bind(record_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| PricingError::Persistence(format!("Failed to get record: {}", e)))?;

        timer.observe_duration();

        row.map(PricingRecord::try_from).transpose()
    }

    #[instrument(skip(self, snapshot, summary))]
    async fn save_snapshot(
        &self,
        record_id: Uuid,
        snapshot: &PricingSnapshot,
        summary: &RebuildSummary,
    ) -> Result<(), PricingError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["save_snapshot"])
            .start_timer();

        let mut tx = self.pool.begin().await?;

        let updated = sqlx::query(
            r#"
            UPDATE pricing_records
            SET snapshot = $2,
                snapshot_complete = TRUE,
                snapshot_summary = $3,
                snapshot_updated_utc = NOW()
            WHERE record_id = $1
            "#,
        )
        .bind(record_id)
        .bind(Json(snapshot))
        .bind(summary.message())
        .execute(&mut *tx)
        .await
        .map_err(|e| PricingError::Persistence(format!("Failed to save snapshot: {}", e)))?;

        if updated.rows_affected() == 0 {
            return Err(PricingError::NotFound(format!(
                "record {} not found",
                record_id
            )));
        }

        sqlx::query(
            r#"
            INSERT INTO snapshot_audit (audit_id, record_id, summary, message)
            VALUES ($1, $2, $3, $4)
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(record_id)
        .bind(Json(summary))
        .bind(summary.message())
        .execute(&mut *tx)
        .await
        .map_err(|e| PricingError::Persistence(format!("Failed to write audit entry: {}", e)))?;

        tx.commit().await?;

        timer.observe_duration();

        Ok(())
    }

    #[instrument(skip(self))]
    async fn list_incomplete(&self) -> Result<Vec<Uuid>, PricingError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["list_incomplete"])
            .start_timer();

        let ids = sqlx::query_scalar::<_, Uuid>(
            r#"
            SELECT record_id
            FROM pricing_records
            WHERE snapshot IS NULL OR snapshot_complete = FALSE
            ORDER BY created_utc, record_id
            "#,
        )
        .fetch_all(&self.pool)
        .await
        .map_err(|e| PricingError::Persistence(format!("Failed to list records: {}", e)))?;

        timer.observe_duration();

        Ok(ids)
    }

    #[instrument(skip(self))]
    async fn health_check(&self) -> Result<(), PricingError> {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .map_err(|e| PricingError::Persistence(format!("Health check failed: {}", e)))?;
        Ok(())
    }
}
