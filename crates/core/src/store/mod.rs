//! The price chart store contract.
//!
//! The store is the single source of truth for chart records. Adapters
//! (Postgres in `voyage-db`, [`MemoryPriceChartStore`] here) implement
//! [`PriceChartStore`]; the engine never persists anything itself.

pub mod memory;

use async_trait::async_trait;

use crate::classification::is_active_on;
use crate::error::CoreError;
use crate::price_chart::{ChartDraft, PriceChart, PriceChartPatch};
use crate::types::{Date, DbId};

pub use memory::MemoryPriceChartStore;

/// CRUD access to price chart records.
///
/// Errors follow a fixed taxonomy: [`CoreError::Validation`] for malformed
/// input, [`CoreError::NotFound`] for unknown ids, and
/// [`CoreError::Transport`] when the backing store fails.
#[async_trait]
pub trait PriceChartStore: Send + Sync {
    /// All charts of a package, in no particular order.
    async fn list(&self, package_id: DbId) -> Result<Vec<PriceChart>, CoreError>;

    /// Charts of a package classified active at `today`.
    ///
    /// The default filters [`list`](Self::list); adapters may push the
    /// predicate down to the backend.
    async fn list_active(&self, package_id: DbId, today: Date) -> Result<Vec<PriceChart>, CoreError> {
        let charts = self.list(package_id).await?;
        Ok(charts
            .into_iter()
            .filter(|c| is_active_on(c, today))
            .collect())
    }

    /// Create a chart under `package_id`.
    async fn create(&self, package_id: DbId, draft: &ChartDraft) -> Result<PriceChart, CoreError>;

    /// Apply a partial update. The merged record is validated as a whole.
    async fn update(&self, id: DbId, patch: &PriceChartPatch) -> Result<PriceChart, CoreError>;

    /// Permanently delete a chart.
    async fn delete(&self, id: DbId) -> Result<(), CoreError>;
}
