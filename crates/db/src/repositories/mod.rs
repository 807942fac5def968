//! Repository layer.
//!
//! Each repository is a zero-sized struct providing async CRUD methods
//! that accept `&PgPool` as the first argument.

pub mod price_chart_repo;

pub use price_chart_repo::PriceChartRepo;
