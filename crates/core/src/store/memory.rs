//! In-process [`PriceChartStore`] backed by a `BTreeMap`.
//!
//! Used by tests and local tooling. Ids are assigned from a monotonically
//! increasing counter and never reused. The store can be switched offline
//! to exercise transport-failure paths.

use std::collections::BTreeMap;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;

use super::PriceChartStore;
use crate::error::CoreError;
use crate::price_chart::{ChartDraft, PriceChart, PriceChartPatch};
use crate::types::DbId;

#[derive(Default)]
struct Inner {
    next_id: DbId,
    charts: BTreeMap<DbId, PriceChart>,
    offline: bool,
    calls: usize,
}

impl Inner {
    /// Count the call and fail if the store is offline.
    fn enter(&mut self) -> Result<(), CoreError> {
        self.calls += 1;
        if self.offline {
            Err(CoreError::Transport("price chart store is offline".into()))
        } else {
            Ok(())
        }
    }
}

/// Thread-safe in-memory chart store.
#[derive(Default)]
pub struct MemoryPriceChartStore {
    inner: RwLock<Inner>,
}

impl MemoryPriceChartStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Simulate the store becoming unreachable (or reachable again).
    pub async fn set_offline(&self, offline: bool) {
        self.inner.write().await.offline = offline;
    }

    /// Total number of store operations attempted, including failed ones.
    pub async fn call_count(&self) -> usize {
        self.inner.read().await.calls
    }

    /// Fetch a single chart by id, bypassing the offline switch.
    pub async fn get(&self, id: DbId) -> Option<PriceChart> {
        self.inner.read().await.charts.get(&id).cloned()
    }
}

#[async_trait]
impl PriceChartStore for MemoryPriceChartStore {
    async fn list(&self, package_id: DbId) -> Result<Vec<PriceChart>, CoreError> {
        let mut inner = self.inner.write().await;
        inner.enter()?;
        Ok(inner
            .charts
            .values()
            .filter(|c| c.package_id == package_id)
            .cloned()
            .collect())
    }

    async fn create(&self, package_id: DbId, draft: &ChartDraft) -> Result<PriceChart, CoreError> {
        let mut inner = self.inner.write().await;
        inner.enter()?;
        draft.check()?;

        inner.next_id += 1;
        let now = Utc::now();
        let chart = PriceChart {
            id: inner.next_id,
            package_id,
            title: draft.title.clone(),
            start_date: draft.start_date,
            end_date: draft.end_date,
            price: draft.price.clone(),
            is_active: draft.is_active,
            created_at: now,
            updated_at: now,
        };
        inner.charts.insert(chart.id, chart.clone());
        Ok(chart)
    }

    async fn update(&self, id: DbId, patch: &PriceChartPatch) -> Result<PriceChart, CoreError> {
        let mut inner = self.inner.write().await;
        inner.enter()?;

        let existing = inner
            .charts
            .get(&id)
            .ok_or_else(|| CoreError::chart_not_found(id))?;
        let merged = patch.apply_to(existing.to_draft());
        merged.check()?;

        let chart = PriceChart {
            title: merged.title,
            start_date: merged.start_date,
            end_date: merged.end_date,
            price: merged.price,
            is_active: merged.is_active,
            updated_at: Utc::now(),
            ..existing.clone()
        };
        inner.charts.insert(id, chart.clone());
        Ok(chart)
    }

    async fn delete(&self, id: DbId) -> Result<(), CoreError> {
        let mut inner = self.inner.write().await;
        inner.enter()?;
        inner
            .charts
            .remove(&id)
            .map(|_| ())
            .ok_or_else(|| CoreError::chart_not_found(id))
    }
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use assert_matches::assert_matches;
    use bigdecimal::BigDecimal;

    use super::*;
    use crate::types::Date;

    fn draft(title: &str, start: &str, end: &str, price: i64) -> ChartDraft {
        ChartDraft {
            title: title.into(),
            start_date: Date::from_str(start).unwrap(),
            end_date: Date::from_str(end).unwrap(),
            price: BigDecimal::from(price),
            is_active: true,
        }
    }

    #[tokio::test]
    async fn create_assigns_fresh_ids() {
        let store = MemoryPriceChartStore::new();
        let a = store.create(1, &draft("A", "2025-05-01", "2025-06-01", 100)).await.unwrap();
        let b = store.create(1, &draft("B", "2025-06-01", "2025-07-01", 200)).await.unwrap();
        assert_ne!(a.id, b.id);
        assert_eq!(a.package_id, 1);

        store.delete(b.id).await.unwrap();
        let c = store.create(1, &draft("C", "2025-07-01", "2025-08-01", 300)).await.unwrap();
        assert!(c.id > b.id, "ids must never be reused");
    }

    #[tokio::test]
    async fn list_is_scoped_to_package() {
        let store = MemoryPriceChartStore::new();
        store.create(1, &draft("A", "2025-05-01", "2025-06-01", 100)).await.unwrap();
        store.create(2, &draft("B", "2025-05-01", "2025-06-01", 100)).await.unwrap();
        assert_eq!(store.list(1).await.unwrap().len(), 1);
        assert!(store.list(3).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn list_active_filters_by_classification() {
        let store = MemoryPriceChartStore::new();
        store.create(1, &draft("Now", "2025-05-01", "2025-09-01", 100)).await.unwrap();
        store.create(1, &draft("Later", "2025-10-01", "2025-11-01", 100)).await.unwrap();
        let mut off = draft("Off", "2025-05-01", "2025-09-01", 100);
        off.is_active = false;
        store.create(1, &off).await.unwrap();

        let active = store
            .list_active(1, Date::from_str("2025-06-15").unwrap())
            .await
            .unwrap();
        assert_eq!(active.len(), 1);
        assert_eq!(active[0].title, "Now");
    }

    #[tokio::test]
    async fn create_rejects_invalid_draft() {
        let store = MemoryPriceChartStore::new();
        let bad = draft("Bad", "2025-06-01", "2025-06-01", 100);
        assert_matches!(store.create(1, &bad).await, Err(CoreError::Validation(_)));
        assert!(store.list(1).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn update_validates_merged_record() {
        let store = MemoryPriceChartStore::new();
        let chart = store.create(1, &draft("A", "2025-05-01", "2025-06-01", 100)).await.unwrap();

        let patch = PriceChartPatch {
            end_date: Some(Date::from_str("2025-04-01").unwrap()),
            ..Default::default()
        };
        assert_matches!(store.update(chart.id, &patch).await, Err(CoreError::Validation(_)));

        let patch = PriceChartPatch {
            price: Some(BigDecimal::from_str("149.50").unwrap()),
            ..Default::default()
        };
        let updated = store.update(chart.id, &patch).await.unwrap();
        assert_eq!(updated.price, BigDecimal::from_str("149.5").unwrap());
        assert_eq!(updated.id, chart.id);
        assert_eq!(updated.package_id, chart.package_id);
        assert_eq!(updated.created_at, chart.created_at);
    }

    #[tokio::test]
    async fn unknown_ids_are_not_found() {
        let store = MemoryPriceChartStore::new();
        assert_matches!(
            store.update(42, &PriceChartPatch::default()).await,
            Err(CoreError::NotFound { id: 42, .. })
        );
        assert_matches!(store.delete(42).await, Err(CoreError::NotFound { id: 42, .. }));
    }

    #[tokio::test]
    async fn offline_store_reports_transport_errors() {
        let store = MemoryPriceChartStore::new();
        store.set_offline(true).await;
        assert_matches!(store.list(1).await, Err(CoreError::Transport(_)));
        assert_eq!(store.call_count().await, 1);
    }

    #[tokio::test]
    async fn sub_cent_prices_are_rejected() {
        let store = MemoryPriceChartStore::new();
        let chart = store.create(1, &draft("A", "2025-05-01", "2025-06-01", 100)).await.unwrap();
        let patch = PriceChartPatch {
            price: Some(BigDecimal::from_str("19.999").unwrap()),
            ..Default::default()
        };
        assert_matches!(store.update(chart.id, &patch).await, Err(CoreError::Validation(_)));
        assert_eq!(store.get(chart.id).await.unwrap().price, BigDecimal::from(100));
    }
}
