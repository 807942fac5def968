//! Chart list presentation: sorted, annotated rows for table display.
//!
//! This is the only place display-oriented fields (formatted dates, price
//! labels, day counters) are derived. Classification and resolution stay
//! purely semantic.

use bigdecimal::BigDecimal;
use serde::{Deserialize, Serialize};

use crate::classification::{classify, Classification};
use crate::price_chart::{format_price, PriceChart};
use crate::resolver::{by_start_then_id, narrative, resolve_price, NarrativePrice, ResolvedPrice};
use crate::types::{Date, DbId};

/// Default number of upcoming charts shown.
pub const DEFAULT_UPCOMING_LIMIT: usize = 3;

/// Date format used in rendered ranges, e.g. `May 1, 2025`.
const DATE_FORMAT: &str = "%b %-d, %Y";

// ---------------------------------------------------------------------------
// Options
// ---------------------------------------------------------------------------

/// Presenter tuning knobs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PresenterOptions {
    /// Maximum number of rows in [`ChartListView::upcoming`].
    pub upcoming_limit: usize,
}

impl Default for PresenterOptions {
    fn default() -> Self {
        Self {
            upcoming_limit: DEFAULT_UPCOMING_LIMIT,
        }
    }
}

// ---------------------------------------------------------------------------
// View types
// ---------------------------------------------------------------------------

/// One chart annotated for a renderer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChartRow {
    pub chart: PriceChart,
    pub classification: Classification,
    pub price_display: String,
    pub date_range: String,
    /// Days until the chart starts; only for upcoming rows.
    pub days_until_start: Option<i64>,
    /// Days left before the exclusive end date; only for active rows.
    pub days_remaining: Option<i64>,
}

/// Partitioned chart list for one package.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChartListView {
    pub current: Option<ChartRow>,
    pub upcoming: Vec<ChartRow>,
    pub all: Vec<ChartRow>,
}

impl ChartListView {
    /// Placeholder rendered when the chart set could not be read.
    pub fn empty() -> Self {
        Self {
            current: None,
            upcoming: Vec::new(),
            all: Vec::new(),
        }
    }
}

/// Everything a package page needs to render its price, derived in one pass.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PackagePricing {
    pub package_id: DbId,
    pub as_of: Date,
    pub resolved: ResolvedPrice,
    pub narrative: NarrativePrice,
    /// Last day the narrative price applies, e.g. `Aug 31, 2025`.
    pub valid_through: Option<String>,
    pub charts: ChartListView,
}

// ---------------------------------------------------------------------------
// Presentation
// ---------------------------------------------------------------------------

/// The last day covered by an exclusive `end` date, formatted.
pub fn format_last_day(end: Date) -> String {
    end.pred_opt().unwrap_or(end).format(DATE_FORMAT).to_string()
}

/// Render a chart's `[start, end)` range with inclusive days, e.g.
/// `May 1, 2025 - Aug 31, 2025` for an end date of Sep 1.
pub fn format_date_range(start: Date, end: Date) -> String {
    format!("{} - {}", start.format(DATE_FORMAT), format_last_day(end))
}

fn annotate(chart: &PriceChart, today: Date) -> ChartRow {
    let classification = classify(chart, today);
    let days_until_start = (classification == Classification::Upcoming)
        .then(|| (chart.start_date - today).num_days());
    let days_remaining = (classification == Classification::Active)
        .then(|| (chart.end_date - today).num_days());

    ChartRow {
        chart: chart.clone(),
        classification,
        price_display: format_price(&chart.price),
        date_range: format_date_range(chart.start_date, chart.end_date),
        days_until_start,
        days_remaining,
    }
}

/// Build the sorted, partitioned view of `charts` as of `today`.
pub fn present(charts: &[PriceChart], today: Date, opts: PresenterOptions) -> ChartListView {
    let mut sorted: Vec<&PriceChart> = charts.iter().collect();
    sorted.sort_by(|a, b| by_start_then_id(a, b));

    let all: Vec<ChartRow> = sorted.iter().map(|c| annotate(c, today)).collect();

    let upcoming = all
        .iter()
        .filter(|row| row.classification == Classification::Upcoming)
        .take(opts.upcoming_limit)
        .cloned()
        .collect();

    // `all` is in narrative order, so the first active row is the
    // narrative-current chart.
    let current = all
        .iter()
        .find(|row| row.classification == Classification::Active)
        .cloned();

    ChartListView {
        current,
        upcoming,
        all,
    }
}

/// Derive the full pricing snapshot for one package.
pub fn price_package(
    package_id: DbId,
    charts: &[PriceChart],
    base_price: &BigDecimal,
    today: Date,
    opts: PresenterOptions,
) -> PackagePricing {
    let narrative = narrative(charts, base_price, today);
    PackagePricing {
        package_id,
        as_of: today,
        resolved: resolve_price(charts, base_price, today),
        valid_through: narrative.valid_until.map(format_last_day),
        narrative,
        charts: present(charts, today, opts),
    }
}
