//! Interval classification of a single price chart at an as-of date.
//!
//! Bounds are half-open: `[start_date, end_date)`. A chart starting on the
//! same day another ends is never active together with it.

use serde::{Deserialize, Serialize};

use crate::price_chart::PriceChart;
use crate::types::{Date, Timestamp};

/// Display classification of a chart at a point in time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Classification {
    Inactive,
    Expired,
    Upcoming,
    Active,
}

impl Classification {
    /// Stable lowercase identifier.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Inactive => "inactive",
            Self::Expired => "expired",
            Self::Upcoming => "upcoming",
            Self::Active => "active",
        }
    }

    /// Human-readable label.
    pub fn label(self) -> &'static str {
        match self {
            Self::Inactive => "Inactive",
            Self::Expired => "Expired",
            Self::Upcoming => "Upcoming",
            Self::Active => "Active",
        }
    }
}

/// Classify `chart` as of the calendar date `today`.
///
/// The `is_active` flag wins over every date comparison.
pub fn classify(chart: &PriceChart, today: Date) -> Classification {
    if !chart.is_active {
        Classification::Inactive
    } else if today < chart.start_date {
        Classification::Upcoming
    } else if today >= chart.end_date {
        Classification::Expired
    } else {
        Classification::Active
    }
}

/// Classify `chart` at a UTC instant.
///
/// Chart bounds are midnight UTC, so comparing the instant's UTC date is
/// equivalent to comparing instants.
pub fn classify_at(chart: &PriceChart, now: Timestamp) -> Classification {
    classify(chart, now.date_naive())
}

/// Shorthand for `classify(chart, today) == Classification::Active`.
pub fn is_active_on(chart: &PriceChart, today: Date) -> bool {
    classify(chart, today) == Classification::Active
}
