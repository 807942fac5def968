//! Shared, invalidating read model of chart sets per package.
//!
//! Every renderer (listing card, detail page, admin table) reads through one
//! [`ChartReadModel`] so the derived prices cannot drift apart. Cached sets
//! are marked stale when a [`ChartEvent`] for their package arrives. Pending
//! events are drained at the start of every read, so a read issued after a
//! successful write never serves the pre-write set.
//!
//! When the store cannot be read, the last known-good set is served (or an
//! empty set if there is none) and the failure is logged.

use std::collections::HashMap;
use std::sync::Arc;

use bigdecimal::BigDecimal;
use tokio::sync::broadcast::error::TryRecvError;
use tokio::sync::{broadcast, Mutex, RwLock};
use voyage_core::error::CoreError;
use voyage_core::presenter::{price_package, PackagePricing, PresenterOptions};
use voyage_core::price_chart::PriceChart;
use voyage_core::store::PriceChartStore;
use voyage_core::types::{Date, DbId};

use crate::bus::{ChartEvent, EventBus};

#[derive(Debug, Clone)]
struct CachedSet {
    charts: Vec<PriceChart>,
    stale: bool,
}

/// Cached sets plus the invalidation counters reads are checked against.
///
/// Every invalidation of a package bumps its generation; invalidations that
/// cannot be attributed to one package bump the epoch. A store read only
/// caches its result as fresh if neither moved while it was in flight.
#[derive(Debug, Default)]
struct Cache {
    sets: HashMap<DbId, CachedSet>,
    generations: HashMap<DbId, u64>,
    epoch: u64,
}

impl Cache {
    fn token(&self, package_id: DbId) -> (u64, u64) {
        let generation = self.generations.get(&package_id).copied().unwrap_or(0);
        (self.epoch, generation)
    }

    fn invalidate(&mut self, package_id: DbId) {
        *self.generations.entry(package_id).or_default() += 1;
        if let Some(set) = self.sets.get_mut(&package_id) {
            set.stale = true;
        }
    }

    fn invalidate_where(&mut self, pred: impl Fn(&CachedSet) -> bool) {
        self.epoch += 1;
        for set in self.sets.values_mut() {
            if pred(set) {
                set.stale = true;
            }
        }
    }
}

/// Caching reader over a [`PriceChartStore`].
pub struct ChartReadModel<S: PriceChartStore + ?Sized> {
    store: Arc<S>,
    events: Mutex<broadcast::Receiver<ChartEvent>>,
    cache: RwLock<Cache>,
}

impl<S: PriceChartStore + ?Sized> ChartReadModel<S> {
    /// Create a read model subscribed to `bus`.
    pub fn new(store: Arc<S>, bus: &EventBus) -> Self {
        Self {
            store,
            events: Mutex::new(bus.subscribe()),
            cache: RwLock::new(Cache::default()),
        }
    }

    // -----------------------------------------------------------------------
    // Invalidation
    // -----------------------------------------------------------------------

    /// Mark the cached set of `package_id` stale.
    pub async fn invalidate(&self, package_id: DbId) {
        self.cache.write().await.invalidate(package_id);
    }

    /// Mark every cached set stale.
    pub async fn invalidate_all(&self) {
        self.cache.write().await.invalidate_where(|_| true);
    }

    /// Apply one event to the cache.
    ///
    /// Events without a package (deletes by id) invalidate whichever cached
    /// set contains the chart, and any read still in flight.
    pub async fn apply_event(&self, event: &ChartEvent) {
        let mut cache = self.cache.write().await;
        match event.package_id {
            Some(package_id) => cache.invalidate(package_id),
            None => cache.invalidate_where(|set| set.charts.iter().any(|c| c.id == event.chart_id)),
        }
    }

    /// Drain pending bus events into the cache.
    async fn sync_events(&self) {
        let mut events = self.events.lock().await;
        loop {
            match events.try_recv() {
                Ok(event) => self.apply_event(&event).await,
                Err(TryRecvError::Lagged(skipped)) => {
                    tracing::warn!(skipped, "Chart read model lagged, invalidating all packages");
                    self.invalidate_all().await;
                }
                Err(TryRecvError::Empty) | Err(TryRecvError::Closed) => break,
            }
        }
    }

    /// `true` if a non-stale set is cached for `package_id`.
    pub async fn is_fresh(&self, package_id: DbId) -> bool {
        self.sync_events().await;
        self.cache
            .read()
            .await
            .sets
            .get(&package_id)
            .is_some_and(|set| !set.stale)
    }

    // -----------------------------------------------------------------------
    // Reads
    // -----------------------------------------------------------------------

    /// Load the chart set, propagating store errors.
    pub async fn load(&self, package_id: DbId) -> Result<Vec<PriceChart>, CoreError> {
        self.sync_events().await;

        let token = {
            let cache = self.cache.read().await;
            if let Some(set) = cache.sets.get(&package_id) {
                if !set.stale {
                    return Ok(set.charts.clone());
                }
            }
            cache.token(package_id)
        };

        let charts = self.store.list(package_id).await?;

        // Writes that landed during the store read must not be masked.
        self.sync_events().await;
        let mut cache = self.cache.write().await;
        if cache.token(package_id) == token {
            cache.sets.insert(
                package_id,
                CachedSet {
                    charts: charts.clone(),
                    stale: false,
                },
            );
            tracing::debug!(package_id, count = charts.len(), "Chart set loaded");
        } else {
            cache.sets.entry(package_id).or_insert_with(|| CachedSet {
                charts: charts.clone(),
                stale: true,
            });
            tracing::debug!(package_id, "Chart set changed during read, not cached as fresh");
        }
        Ok(charts)
    }

    /// Load the chart set, falling back to the last known-good set (or an
    /// empty set) when the store fails.
    pub async fn charts(&self, package_id: DbId) -> Vec<PriceChart> {
        match self.load(package_id).await {
            Ok(charts) => charts,
            Err(err) => {
                let fallback = self
                    .cache
                    .read()
                    .await
                    .sets
                    .get(&package_id)
                    .map(|set| set.charts.clone());
                tracing::warn!(
                    package_id,
                    error = %err,
                    has_fallback = fallback.is_some(),
                    "Chart set read failed, serving last known-good set"
                );
                fallback.unwrap_or_default()
            }
        }
    }

    /// Full pricing snapshot for a package page.
    pub async fn pricing(
        &self,
        package_id: DbId,
        base_price: &BigDecimal,
        today: Date,
        opts: PresenterOptions,
    ) -> PackagePricing {
        let charts = self.charts(package_id).await;
        price_package(package_id, &charts, base_price, today, opts)
    }
}
