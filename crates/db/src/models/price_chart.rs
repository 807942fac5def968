//! `price_charts` row model.

use bigdecimal::BigDecimal;
use serde::Serialize;
use sqlx::FromRow;
use voyage_core::price_chart::PriceChart;
use voyage_core::types::{Date, DbId, Timestamp};

pub use voyage_core::price_chart::{ChartDraft as CreatePriceChart, PriceChartPatch as UpdatePriceChart};

/// A row from the `price_charts` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct PriceChartRow {
    pub id: DbId,
    pub package_id: DbId,
    pub title: String,
    pub start_date: Date,
    pub end_date: Date,
    pub price: BigDecimal,
    pub is_active: bool,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl From<PriceChartRow> for PriceChart {
    fn from(row: PriceChartRow) -> Self {
        Self {
            id: row.id,
            package_id: row.package_id,
            title: row.title,
            start_date: row.start_date,
            end_date: row.end_date,
            price: row.price,
            is_active: row.is_active,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}
