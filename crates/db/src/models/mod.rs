//! Database row structs.
//!
//! Rows convert into the `voyage_core` entities; write payloads reuse the
//! core draft and patch types so validation has a single definition.

pub mod price_chart;
