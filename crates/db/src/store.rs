//! Postgres implementation of [`PriceChartStore`].

use async_trait::async_trait;
use voyage_core::error::CoreError;
use voyage_core::price_chart::{ChartDraft, PriceChart, PriceChartPatch};
use voyage_core::store::PriceChartStore;
use voyage_core::types::{Date, DbId};

use crate::repositories::PriceChartRepo;
use crate::DbPool;

/// PostgreSQL error code for a CHECK constraint violation.
const CHECK_VIOLATION: &str = "23514";

/// Price chart store backed by the `price_charts` table.
#[derive(Clone)]
pub struct PgPriceChartStore {
    pool: DbPool,
}

impl PgPriceChartStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &DbPool {
        &self.pool
    }
}

/// Map a sqlx error onto the store error taxonomy.
///
/// CHECK violations become `Validation` (the table constraints mirror the
/// core validators); everything else is a `Transport` failure.
fn map_sqlx_error(err: sqlx::Error) -> CoreError {
    if let sqlx::Error::Database(db_err) = &err {
        if db_err.code().as_deref() == Some(CHECK_VIOLATION) {
            let constraint = db_err.constraint().unwrap_or("unknown");
            return CoreError::Validation(format!("Violates constraint: {constraint}"));
        }
    }
    tracing::error!(error = %err, "Price chart store query failed");
    CoreError::Transport(err.to_string())
}

#[async_trait]
impl PriceChartStore for PgPriceChartStore {
    async fn list(&self, package_id: DbId) -> Result<Vec<PriceChart>, CoreError> {
        let rows = PriceChartRepo::list_by_package(&self.pool, package_id)
            .await
            .map_err(map_sqlx_error)?;
        Ok(rows.into_iter().map(PriceChart::from).collect())
    }

    async fn list_active(&self, package_id: DbId, today: Date) -> Result<Vec<PriceChart>, CoreError> {
        let rows = PriceChartRepo::list_active_by_package(&self.pool, package_id, today)
            .await
            .map_err(map_sqlx_error)?;
        Ok(rows.into_iter().map(PriceChart::from).collect())
    }

    async fn create(&self, package_id: DbId, draft: &ChartDraft) -> Result<PriceChart, CoreError> {
        draft.check()?;
        let row = PriceChartRepo::create(&self.pool, package_id, draft)
            .await
            .map_err(map_sqlx_error)?;
        tracing::debug!(package_id, chart_id = row.id, "Price chart inserted");
        Ok(row.into())
    }

    async fn update(&self, id: DbId, patch: &PriceChartPatch) -> Result<PriceChart, CoreError> {
        let existing = PriceChartRepo::find_by_id(&self.pool, id)
            .await
            .map_err(map_sqlx_error)?
            .ok_or_else(|| CoreError::chart_not_found(id))?;
        patch
            .apply_to(PriceChart::from(existing).to_draft())
            .check()?;

        let row = PriceChartRepo::update(&self.pool, id, patch)
            .await
            .map_err(map_sqlx_error)?
            .ok_or_else(|| CoreError::chart_not_found(id))?;
        tracing::debug!(chart_id = id, "Price chart updated");
        Ok(row.into())
    }

    async fn delete(&self, id: DbId) -> Result<(), CoreError> {
        let deleted = PriceChartRepo::delete(&self.pool, id)
            .await
            .map_err(map_sqlx_error)?;
        if deleted {
            tracing::debug!(chart_id = id, "Price chart deleted");
            Ok(())
        } else {
            Err(CoreError::chart_not_found(id))
        }
    }
}
