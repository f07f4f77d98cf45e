//! Scheduled entry point that posts due fixed expenses.
//!
//! Meant to run once a day from cron or a container scheduler. Posting is
//! keyed by calendar month, so overlapping or repeated runs are harmless.

use sqlx::postgres::PgPoolOptions;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use gastos_hormigas::config::Config;
use gastos_hormigas::repositories::category_repository::PostgresCategoryRepository;
use gastos_hormigas::repositories::fixed_expense_repository::PostgresFixedExpenseRepository;
use gastos_hormigas::services::poster_service::FixedExpensePoster;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenv::dotenv().ok();

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env()?;

    let pool = PgPoolOptions::new()
        .max_connections(2)
        .connect(&config.database_url)
        .await?;

    let poster = FixedExpensePoster::new(
        Arc::new(PostgresFixedExpenseRepository::new(pool.clone())),
        Arc::new(PostgresCategoryRepository::new(pool)),
    );

    let today = chrono::Utc::now().date_naive();
    info!(%today, "posting run starting");

    let summary = poster.post_due_fixed_expenses(today).await?;

    if summary.users_failed > 0 {
        // Partial failure: the summary was already logged per user. A
        // non-zero exit lets the scheduler alert on it.
        return Err(format!("{} users failed during posting", summary.users_failed).into());
    }

    Ok(())
}
