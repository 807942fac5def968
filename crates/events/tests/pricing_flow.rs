//! End-to-end pricing flow: edit sessions write through the notifying store
//! and every reader of the shared read model sees the new price.

use std::str::FromStr;
use std::sync::Arc;

use assert_matches::assert_matches;
use bigdecimal::BigDecimal;
use voyage_core::classification::Classification;
use voyage_core::edit_session::{EditSessionManager, EditState, SessionKey};
use voyage_core::error::CoreError;
use voyage_core::presenter::PresenterOptions;
use voyage_core::price_chart::ChartDraft;
use voyage_core::resolver::PriceSource;
use voyage_core::store::MemoryPriceChartStore;
use voyage_core::types::Date;
use voyage_events::{ChartReadModel, EventBus, NotifyingStore};

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

type Store = NotifyingStore<MemoryPriceChartStore>;

const PACKAGE: i64 = 12;

fn d(s: &str) -> Date {
    Date::from_str(s).unwrap()
}

fn chart(title: &str, start: &str, end: &str, price: i64) -> ChartDraft {
    ChartDraft {
        title: title.to_string(),
        start_date: d(start),
        end_date: d(end),
        price: BigDecimal::from(price),
        is_active: true,
    }
}

struct App {
    memory: Arc<MemoryPriceChartStore>,
    editor: EditSessionManager<Store>,
    reader: ChartReadModel<Store>,
}

fn app() -> App {
    let bus = Arc::new(EventBus::default());
    let memory = Arc::new(MemoryPriceChartStore::new());
    let store = Arc::new(NotifyingStore::new(Arc::clone(&memory), Arc::clone(&bus)));
    App {
        memory,
        editor: EditSessionManager::new(Arc::clone(&store)),
        reader: ChartReadModel::new(store, &bus),
    }
}

fn base() -> BigDecimal {
    BigDecimal::from(699)
}

// ---------------------------------------------------------------------------
// Test: summer chart scenario
// ---------------------------------------------------------------------------

#[tokio::test]
async fn summer_chart_drives_advertised_price() {
    let app = app();
    app.editor
        .begin_create(PACKAGE, chart("Summer", "2025-05-01", "2025-09-01", 499))
        .await
        .unwrap();
    app.editor.submit(SessionKey::NewChart(PACKAGE)).await.unwrap();

    let mid = app
        .reader
        .pricing(PACKAGE, &base(), d("2025-06-15"), PresenterOptions::default())
        .await;
    assert_eq!(mid.resolved.amount, BigDecimal::from(499));
    assert_eq!(mid.resolved.source, PriceSource::Chart);
    assert_eq!(mid.narrative.title, "Summer");
    assert_eq!(mid.charts.all[0].classification, Classification::Active);

    let end = app
        .reader
        .pricing(PACKAGE, &base(), d("2025-09-01"), PresenterOptions::default())
        .await;
    assert_eq!(end.resolved.amount, base());
    assert_eq!(end.resolved.source, PriceSource::Base);
    assert_eq!(end.narrative.title, "Standard Price");
    assert_eq!(end.charts.all[0].classification, Classification::Expired);
}

// ---------------------------------------------------------------------------
// Test: overlapping charts
// ---------------------------------------------------------------------------

#[tokio::test]
async fn overlapping_charts_split_price_and_narrative() {
    let app = app();
    for draft in [
        chart("Early Summer", "2025-06-01", "2025-09-01", 599),
        chart("July Deal", "2025-07-01", "2025-09-01", 499),
    ] {
        app.editor.begin_create(PACKAGE, draft).await.unwrap();
        app.editor.submit(SessionKey::NewChart(PACKAGE)).await.unwrap();
    }

    let pricing = app
        .reader
        .pricing(PACKAGE, &base(), d("2025-07-15"), PresenterOptions::default())
        .await;
    assert_eq!(pricing.resolved.amount, BigDecimal::from(499));
    assert_eq!(pricing.narrative.title, "Early Summer");
    assert_eq!(pricing.narrative.amount, BigDecimal::from(599));
    assert_eq!(
        pricing.charts.current.map(|row| row.chart.title),
        Some("Early Summer".to_string())
    );
}

// ---------------------------------------------------------------------------
// Test: edits are visible to every reader immediately
// ---------------------------------------------------------------------------

#[tokio::test]
async fn saved_edit_replaces_cached_from_price() {
    let app = app();
    app.editor
        .begin_create(PACKAGE, chart("Summer", "2025-05-01", "2025-09-01", 499))
        .await
        .unwrap();
    let created = app.editor.submit(SessionKey::NewChart(PACKAGE)).await.unwrap();
    let today = d("2025-06-15");

    let before = app
        .reader
        .pricing(PACKAGE, &base(), today, PresenterOptions::default())
        .await;
    assert_eq!(before.resolved.display_amount(), "499.00");

    app.editor.begin_edit(&created).await.unwrap();
    app.editor
        .edit_draft(SessionKey::Chart(created.id), |draft| {
            draft.price = BigDecimal::from_str("429.99").unwrap()
        })
        .await
        .unwrap();
    app.editor.submit(SessionKey::Chart(created.id)).await.unwrap();

    let after = app
        .reader
        .pricing(PACKAGE, &base(), today, PresenterOptions::default())
        .await;
    assert_eq!(after.resolved.display_amount(), "429.99");
}

// ---------------------------------------------------------------------------
// Test: failures keep the draft and the last good view
// ---------------------------------------------------------------------------

#[tokio::test]
async fn store_outage_keeps_draft_and_last_view() {
    let app = app();
    app.editor
        .begin_create(PACKAGE, chart("Summer", "2025-05-01", "2025-09-01", 499))
        .await
        .unwrap();
    let created = app.editor.submit(SessionKey::NewChart(PACKAGE)).await.unwrap();
    let today = d("2025-06-15");
    app.reader
        .pricing(PACKAGE, &base(), today, PresenterOptions::default())
        .await;

    app.memory.set_offline(true).await;

    let key = SessionKey::Chart(created.id);
    app.editor.begin_edit(&created).await.unwrap();
    app.editor
        .edit_draft(key, |draft| draft.price = BigDecimal::from(1))
        .await
        .unwrap();
    assert_matches!(app.editor.submit(key).await, Err(CoreError::Transport(_)));
    assert_matches!(
        app.editor.state(key).await,
        EditState::Editing { ref draft, error: Some(_) } if draft.price == BigDecimal::from(1)
    );

    let view = app
        .reader
        .pricing(PACKAGE, &base(), today, PresenterOptions::default())
        .await;
    assert_eq!(view.resolved.amount, BigDecimal::from(499));
}
