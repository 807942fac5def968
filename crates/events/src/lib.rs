//! Voyage chart-change events and the invalidating read model.
//!
//! - [`EventBus`] -- in-process publish/subscribe hub backed by
//!   `tokio::sync::broadcast`.
//! - [`ChartEvent`] -- emitted after every successful chart write.
//! - [`NotifyingStore`] -- store decorator that publishes those events.
//! - [`ChartReadModel`] -- per-package chart cache shared by all renderers,
//!   invalidated by the bus.

pub mod bus;
pub mod notifying;
pub mod read_model;

pub use bus::{ChartChange, ChartEvent, EventBus};
pub use notifying::NotifyingStore;
pub use read_model::ChartReadModel;
