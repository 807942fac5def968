//! Advertised-price resolution across a package's full chart set.
//!
//! Two selections are made from the charts active at the as-of date:
//!
//! - the **advertised** chart: lowest price, then earliest `start_date`,
//!   then smallest `id`;
//! - the **narrative-current** chart (title and "valid until" text):
//!   earliest `start_date`, then smallest `id`.
//!
//! The two may differ when active charts overlap. Both selections are total
//! orders, so identical inputs always produce identical results.

use std::cmp::Ordering;

use bigdecimal::BigDecimal;
use serde::{Deserialize, Serialize};

use crate::classification::is_active_on;
use crate::price_chart::{format_price, PriceChart};
use crate::types::{Date, DbId};

/// Title shown when no chart is active.
pub const STANDARD_PRICE_TITLE: &str = "Standard Price";

// ---------------------------------------------------------------------------
// Output types
// ---------------------------------------------------------------------------

/// Where a resolved price came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PriceSource {
    Chart,
    Base,
}

/// The single price to advertise for a package at an as-of date.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResolvedPrice {
    pub amount: BigDecimal,
    pub source: PriceSource,
    /// Set only when `source == Chart`.
    pub chart_id: Option<DbId>,
}

impl ResolvedPrice {
    /// The "from" label, e.g. `"499.00"`.
    pub fn display_amount(&self) -> String {
        format_price(&self.amount)
    }
}

/// Title and validity text for the narrative-current chart.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NarrativePrice {
    pub title: String,
    pub amount: BigDecimal,
    /// Exclusive end date of the current chart; `None` for the base price.
    pub valid_until: Option<Date>,
    pub chart_id: Option<DbId>,
}

// ---------------------------------------------------------------------------
// Orderings
// ---------------------------------------------------------------------------

/// Earliest `start_date`, then smallest `id`.
pub fn by_start_then_id(a: &PriceChart, b: &PriceChart) -> Ordering {
    a.start_date
        .cmp(&b.start_date)
        .then_with(|| a.id.cmp(&b.id))
}

/// Lowest price, then [`by_start_then_id`].
fn by_price_then_start(a: &PriceChart, b: &PriceChart) -> Ordering {
    a.price
        .cmp(&b.price)
        .then_with(|| by_start_then_id(a, b))
}

fn active_charts(charts: &[PriceChart], today: Date) -> impl Iterator<Item = &PriceChart> {
    charts.iter().filter(move |c| is_active_on(c, today))
}

// ---------------------------------------------------------------------------
// Resolution
// ---------------------------------------------------------------------------

/// Resolve the advertised price for a package.
///
/// Falls back to `base_price` when no chart is active at `today`.
pub fn resolve_price(charts: &[PriceChart], base_price: &BigDecimal, today: Date) -> ResolvedPrice {
    match active_charts(charts, today).min_by(|a, b| by_price_then_start(a, b)) {
        Some(chart) => ResolvedPrice {
            amount: chart.price.clone(),
            source: PriceSource::Chart,
            chart_id: Some(chart.id),
        },
        None => ResolvedPrice {
            amount: base_price.clone(),
            source: PriceSource::Base,
            chart_id: None,
        },
    }
}

/// The active chart used for title / "valid until" display, if any.
pub fn narrative_current(charts: &[PriceChart], today: Date) -> Option<&PriceChart> {
    active_charts(charts, today).min_by(|a, b| by_start_then_id(a, b))
}

/// Narrative display for a package, falling back to the standard price.
pub fn narrative(charts: &[PriceChart], base_price: &BigDecimal, today: Date) -> NarrativePrice {
    match narrative_current(charts, today) {
        Some(chart) => NarrativePrice {
            title: chart.title.clone(),
            amount: chart.price.clone(),
            valid_until: Some(chart.end_date),
            chart_id: Some(chart.id),
        },
        None => NarrativePrice {
            title: STANDARD_PRICE_TITLE.to_string(),
            amount: base_price.clone(),
            valid_until: None,
            chart_id: None,
        },
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use super::*;

    fn d(y: i32, m: u32, day: u32) -> Date {
        Date::from_ymd_opt(y, m, day).unwrap()
    }

    fn chart(id: DbId, start: Date, end: Date, price: i64, is_active: bool) -> PriceChart {
        PriceChart {
            id,
            package_id: 10,
            title: format!("Chart {id}"),
            start_date: start,
            end_date: end,
            price: BigDecimal::from(price),
            is_active,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn base() -> BigDecimal {
        BigDecimal::from(699)
    }

    // -----------------------------------------------------------------------
    // Advertised price
    // -----------------------------------------------------------------------

    #[test]
    fn active_chart_overrides_base() {
        let charts = vec![chart(1, d(2025, 5, 1), d(2025, 9, 1), 499, true)];
        let resolved = resolve_price(&charts, &base(), d(2025, 6, 15));
        assert_eq!(resolved.amount, BigDecimal::from(499));
        assert_eq!(resolved.source, PriceSource::Chart);
        assert_eq!(resolved.chart_id, Some(1));
        assert_eq!(resolved.display_amount(), "499.00");
    }

    #[test]
    fn falls_back_to_base_on_end_date() {
        let charts = vec![chart(1, d(2025, 5, 1), d(2025, 9, 1), 499, true)];
        let resolved = resolve_price(&charts, &base(), d(2025, 9, 1));
        assert_eq!(resolved.amount, base());
        assert_eq!(resolved.source, PriceSource::Base);
        assert_eq!(resolved.chart_id, None);
    }

    #[test]
    fn empty_set_uses_base() {
        let resolved = resolve_price(&[], &base(), d(2025, 1, 1));
        assert_eq!(resolved.source, PriceSource::Base);
        assert_eq!(resolved.amount, base());
    }

    #[test]
    fn inactive_and_upcoming_charts_are_ignored() {
        let charts = vec![
            chart(1, d(2025, 5, 1), d(2025, 9, 1), 99, false),
            chart(2, d(2025, 7, 1), d(2025, 9, 1), 199, true),
        ];
        let resolved = resolve_price(&charts, &base(), d(2025, 6, 1));
        assert_eq!(resolved.source, PriceSource::Base);
    }

    #[test]
    fn cheapest_active_chart_wins() {
        let charts = vec![
            chart(1, d(2025, 6, 1), d(2025, 9, 1), 599, true),
            chart(2, d(2025, 7, 1), d(2025, 9, 1), 499, true),
            chart(3, d(2025, 1, 1), d(2025, 7, 1), 299, true),
        ];
        let resolved = resolve_price(&charts, &base(), d(2025, 7, 15));
        assert_eq!(resolved.amount, BigDecimal::from(499));
        assert_eq!(resolved.chart_id, Some(2));
    }

    #[test]
    fn price_tie_prefers_earlier_start() {
        let charts = vec![
            chart(1, d(2025, 7, 1), d(2025, 9, 1), 499, true),
            chart(2, d(2025, 6, 1), d(2025, 9, 1), 499, true),
        ];
        let resolved = resolve_price(&charts, &base(), d(2025, 7, 15));
        assert_eq!(resolved.chart_id, Some(2));
    }

    #[test]
    fn price_and_start_tie_prefers_lower_id() {
        let charts = vec![
            chart(9, d(2025, 6, 1), d(2025, 9, 1), 499, true),
            chart(4, d(2025, 6, 1), d(2025, 8, 1), 499, true),
        ];
        let today = d(2025, 7, 15);
        let first = resolve_price(&charts, &base(), today);
        assert_eq!(first.chart_id, Some(4));

        let mut reversed = charts.clone();
        reversed.reverse();
        for _ in 0..5 {
            assert_eq!(resolve_price(&reversed, &base(), today), first);
        }
    }

    #[test]
    fn resolution_is_idempotent() {
        let charts = vec![
            chart(1, d(2025, 6, 1), d(2025, 9, 1), 599, true),
            chart(2, d(2025, 7, 1), d(2025, 9, 1), 499, true),
        ];
        let today = d(2025, 7, 15);
        assert_eq!(
            resolve_price(&charts, &base(), today),
            resolve_price(&charts, &base(), today)
        );
    }

    // -----------------------------------------------------------------------
    // Narrative-current chart
    // -----------------------------------------------------------------------

    #[test]
    fn narrative_prefers_earliest_start_over_cheapest() {
        let charts = vec![
            chart(1, d(2025, 6, 1), d(2025, 9, 1), 599, true),
            chart(2, d(2025, 7, 1), d(2025, 9, 1), 499, true),
        ];
        let today = d(2025, 7, 15);
        assert_eq!(resolve_price(&charts, &base(), today).amount, BigDecimal::from(499));

        let current = narrative_current(&charts, today).unwrap();
        assert_eq!(current.id, 1);
        assert_eq!(current.price, BigDecimal::from(599));
    }

    #[test]
    fn narrative_start_tie_prefers_lower_id() {
        let charts = vec![
            chart(7, d(2025, 6, 1), d(2025, 9, 1), 599, true),
            chart(3, d(2025, 6, 1), d(2025, 9, 1), 799, true),
        ];
        assert_eq!(narrative_current(&charts, d(2025, 7, 1)).unwrap().id, 3);
    }

    #[test]
    fn narrative_shows_title_and_end_date() {
        let mut summer = chart(1, d(2025, 5, 1), d(2025, 9, 1), 499, true);
        summer.title = "Summer".into();
        let n = narrative(&[summer], &base(), d(2025, 6, 15));
        assert_eq!(n.title, "Summer");
        assert_eq!(n.valid_until, Some(d(2025, 9, 1)));
        assert_eq!(n.chart_id, Some(1));
    }

    #[test]
    fn narrative_falls_back_to_standard_price() {
        let n = narrative(&[], &base(), d(2025, 6, 15));
        assert_eq!(n.title, STANDARD_PRICE_TITLE);
        assert_eq!(n.amount, base());
        assert_eq!(n.valid_until, None);
        assert_eq!(n.chart_id, None);
    }
}
