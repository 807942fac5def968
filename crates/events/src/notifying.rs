//! Store decorator that announces successful writes on the [`EventBus`].
//!
//! Wrapping the real store here is what makes every read-side consumer
//! refresh after a create, update, or delete: the event is published before
//! the write call returns, so any read issued afterwards observes it.

use std::sync::Arc;

use async_trait::async_trait;
use voyage_core::error::CoreError;
use voyage_core::price_chart::{ChartDraft, PriceChart, PriceChartPatch};
use voyage_core::store::PriceChartStore;
use voyage_core::types::{Date, DbId};

use crate::bus::{ChartEvent, EventBus};

/// A [`PriceChartStore`] that publishes a [`ChartEvent`] per successful write.
pub struct NotifyingStore<S: PriceChartStore + ?Sized> {
    inner: Arc<S>,
    bus: Arc<EventBus>,
}

impl<S: PriceChartStore + ?Sized> NotifyingStore<S> {
    pub fn new(inner: Arc<S>, bus: Arc<EventBus>) -> Self {
        Self { inner, bus }
    }

    /// The wrapped store.
    pub fn inner(&self) -> &Arc<S> {
        &self.inner
    }
}

#[async_trait]
impl<S: PriceChartStore + ?Sized> PriceChartStore for NotifyingStore<S> {
    async fn list(&self, package_id: DbId) -> Result<Vec<PriceChart>, CoreError> {
        self.inner.list(package_id).await
    }

    async fn list_active(&self, package_id: DbId, today: Date) -> Result<Vec<PriceChart>, CoreError> {
        self.inner.list_active(package_id, today).await
    }

    async fn create(&self, package_id: DbId, draft: &ChartDraft) -> Result<PriceChart, CoreError> {
        let chart = self.inner.create(package_id, draft).await?;
        self.bus.publish(ChartEvent::created(&chart));
        Ok(chart)
    }

    async fn update(&self, id: DbId, patch: &PriceChartPatch) -> Result<PriceChart, CoreError> {
        let chart = self.inner.update(id, patch).await?;
        self.bus.publish(ChartEvent::updated(&chart));
        Ok(chart)
    }

    async fn delete(&self, id: DbId) -> Result<(), CoreError> {
        self.inner.delete(id).await?;
        self.bus.publish(ChartEvent::deleted(id));
        Ok(())
    }
}
