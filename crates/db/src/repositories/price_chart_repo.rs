//! Repository for the `price_charts` table.
//!
//! Plain CRUD. Validation happens in the core draft types before a write
//! reaches this layer; the table's CHECK constraints are the backstop.

use sqlx::PgPool;
use voyage_core::price_chart::{ChartDraft, PriceChartPatch};
use voyage_core::types::{Date, DbId};

use crate::models::price_chart::PriceChartRow;

/// Column list for `price_charts` queries.
const COLUMNS: &str = "\
    id, package_id, title, start_date, end_date, price, \
    is_active, created_at, updated_at";

/// Provides data access for price charts.
pub struct PriceChartRepo;

impl PriceChartRepo {
    /// List all charts of a package, ordered by start date then id.
    pub async fn list_by_package(
        pool: &PgPool,
        package_id: DbId,
    ) -> Result<Vec<PriceChartRow>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM price_charts \
             WHERE package_id = $1 \
             ORDER BY start_date, id"
        );
        sqlx::query_as::<_, PriceChartRow>(&query)
            .bind(package_id)
            .fetch_all(pool)
            .await
    }

    /// List the charts of a package that are active on `today`.
    ///
    /// Mirrors the core classifier: `is_active` and
    /// `start_date <= today < end_date`.
    pub async fn list_active_by_package(
        pool: &PgPool,
        package_id: DbId,
        today: Date,
    ) -> Result<Vec<PriceChartRow>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM price_charts \
             WHERE package_id = $1 \
               AND is_active \
               AND start_date <= $2 \
               AND end_date > $2 \
             ORDER BY start_date, id"
        );
        sqlx::query_as::<_, PriceChartRow>(&query)
            .bind(package_id)
            .bind(today)
            .fetch_all(pool)
            .await
    }

    /// Find a chart by its ID.
    pub async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<PriceChartRow>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM price_charts WHERE id = $1");
        sqlx::query_as::<_, PriceChartRow>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Insert a new chart under `package_id`.
    pub async fn create(
        pool: &PgPool,
        package_id: DbId,
        dto: &ChartDraft,
    ) -> Result<PriceChartRow, sqlx::Error> {
        let query = format!(
            "INSERT INTO price_charts \
                 (package_id, title, start_date, end_date, price, is_active) \
             VALUES ($1, $2, $3, $4, $5, $6) \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, PriceChartRow>(&query)
            .bind(package_id)
            .bind(&dto.title)
            .bind(dto.start_date)
            .bind(dto.end_date)
            .bind(&dto.price)
            .bind(dto.is_active)
            .fetch_one(pool)
            .await
    }

    /// Partially update a chart.
    ///
    /// Uses `COALESCE` so only provided fields are changed. Returns `None`
    /// if no chart has this id.
    pub async fn update(
        pool: &PgPool,
        id: DbId,
        dto: &PriceChartPatch,
    ) -> Result<Option<PriceChartRow>, sqlx::Error> {
        let query = format!(
            "UPDATE price_charts SET \
                 title = COALESCE($2, title), \
                 start_date = COALESCE($3, start_date), \
                 end_date = COALESCE($4, end_date), \
                 price = COALESCE($5, price), \
                 is_active = COALESCE($6, is_active) \
             WHERE id = $1 \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, PriceChartRow>(&query)
            .bind(id)
            .bind(&dto.title)
            .bind(dto.start_date)
            .bind(dto.end_date)
            .bind(&dto.price)
            .bind(dto.is_active)
            .fetch_optional(pool)
            .await
    }

    /// Delete a chart by ID.
    ///
    /// Returns `true` if a row was deleted.
    pub async fn delete(pool: &PgPool, id: DbId) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM price_charts WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
