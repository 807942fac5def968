//! `voyage-report` -- print a package's resolved pricing as JSON.
//!
//! Reads the package's price charts from Postgres and prints the same
//! snapshot every package page renders from: the advertised "from" price,
//! the narrative-current chart, and the annotated chart list.
//!
//! See [`PricingConfig::from_env`] for the environment variables.

use std::sync::Arc;

use anyhow::Context;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use voyage_db::PgPriceChartStore;
use voyage_events::{ChartReadModel, EventBus};
use voyage_report::config::PricingConfig;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "voyage_report=info,voyage_events=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let config = PricingConfig::from_env()?;
    let as_of = config.as_of_or_today();
    tracing::info!(
        package_id = config.package_id,
        %as_of,
        upcoming_limit = config.presenter.upcoming_limit,
        "Loaded report configuration"
    );

    let pool = voyage_db::create_pool(&config.database_url)
        .await
        .context("Failed to connect to database")?;
    voyage_db::health_check(&pool)
        .await
        .context("Database health check failed")?;
    tracing::info!("Database connection pool created");

    voyage_db::run_migrations(&pool)
        .await
        .context("Failed to run database migrations")?;
    tracing::info!("Database migrations applied");

    let bus = EventBus::default();
    let store = Arc::new(PgPriceChartStore::new(pool));
    let reader = ChartReadModel::new(store, &bus);

    let pricing = reader
        .pricing(config.package_id, &config.base_price, as_of, config.presenter)
        .await;
    tracing::info!(
        package_id = pricing.package_id,
        amount = %pricing.resolved.display_amount(),
        source = ?pricing.resolved.source,
        charts = pricing.charts.all.len(),
        "Resolved package pricing"
    );

    println!("{}", serde_json::to_string_pretty(&pricing)?);
    Ok(())
}
