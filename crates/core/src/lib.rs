//! Voyage price-period resolution engine.
//!
//! Pure pricing logic (classification, resolution, presentation), the edit
//! session state machine, and the [`store::PriceChartStore`] contract. This
//! crate has no database or transport dependencies.

pub mod classification;
pub mod edit_session;
pub mod error;
pub mod presenter;
pub mod price_chart;
pub mod resolver;
pub mod store;
pub mod types;
