//! In-process event bus backed by a `tokio::sync::broadcast` channel.
//!
//! [`EventBus`] fans out [`ChartEvent`]s to every read-side consumer of the
//! chart set. It is designed to be shared via `Arc<EventBus>`.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use voyage_core::price_chart::PriceChart;
use voyage_core::types::{DbId, Timestamp};

// ---------------------------------------------------------------------------
// ChartEvent
// ---------------------------------------------------------------------------

/// What happened to a chart.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChartChange {
    Created,
    Updated,
    Deleted,
}

impl ChartChange {
    /// Dot-separated event name, e.g. `"price_chart.updated"`.
    pub fn event_type(self) -> &'static str {
        match self {
            Self::Created => "price_chart.created",
            Self::Updated => "price_chart.updated",
            Self::Deleted => "price_chart.deleted",
        }
    }
}

/// A successful mutation of the chart store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChartEvent {
    pub change: ChartChange,
    pub chart_id: DbId,
    /// Owning package. Unknown for deletes issued by id only.
    pub package_id: Option<DbId>,
    /// When the event was created (UTC).
    pub timestamp: Timestamp,
}

impl ChartEvent {
    fn new(change: ChartChange, chart_id: DbId, package_id: Option<DbId>) -> Self {
        Self {
            change,
            chart_id,
            package_id,
            timestamp: Utc::now(),
        }
    }

    pub fn created(chart: &PriceChart) -> Self {
        Self::new(ChartChange::Created, chart.id, Some(chart.package_id))
    }

    pub fn updated(chart: &PriceChart) -> Self {
        Self::new(ChartChange::Updated, chart.id, Some(chart.package_id))
    }

    pub fn deleted(chart_id: DbId) -> Self {
        Self::new(ChartChange::Deleted, chart_id, None)
    }
}

// ---------------------------------------------------------------------------
// EventBus
// ---------------------------------------------------------------------------

/// Default buffer capacity for the broadcast channel.
const DEFAULT_CAPACITY: usize = 1024;

/// In-process fan-out event bus.
///
/// Wraps a [`broadcast::Sender`] so that any number of subscribers can
/// independently receive every published [`ChartEvent`].
///
/// # Usage
///
/// ```rust
/// use voyage_events::bus::{ChartEvent, EventBus};
///
/// let bus = EventBus::default();
/// let mut rx = bus.subscribe();
///
/// bus.publish(ChartEvent::deleted(42));
/// ```
pub struct EventBus {
    sender: broadcast::Sender<ChartEvent>,
}

impl EventBus {
    /// Create a bus with a specific channel capacity.
    ///
    /// When the buffer is full, the oldest un-consumed messages are dropped
    /// and slow receivers will observe a `Lagged` error.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Publish an event to all current subscribers.
    ///
    /// If there are no active subscribers the event is silently dropped.
    pub fn publish(&self, event: ChartEvent) {
        tracing::debug!(
            event_type = event.change.event_type(),
            chart_id = event.chart_id,
            package_id = ?event.package_id,
            "Publishing chart event"
        );
        // A SendError only means there are no receivers.
        let _ = self.sender.send(event);
    }

    /// Subscribe to all events published on this bus.
    pub fn subscribe(&self) -> broadcast::Receiver<ChartEvent> {
        self.sender.subscribe()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
