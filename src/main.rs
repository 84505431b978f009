use std::time::Duration;

use anyhow::Context;
use sqlx::postgres::PgPoolOptions;

use surplus_web::cache::start_cache_warmer;
use surplus_web::config::AppConfig;
use surplus_web::routes::create_router;
use surplus_web::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "surplus_web=info,tower_http=info".into()),
        )
        .init();

    let config = AppConfig::from_env().context("loading configuration")?;
    tracing::info!(
        "Starting surplus-web (timezone: {}, code length: {})",
        config.timezone,
        config.code_policy.length()
    );

    let db = PgPoolOptions::new()
        .max_connections(10)
        .acquire_timeout(Duration::from_secs(5))
        .connect(&config.database_url)
        .await
        .context("connecting to database")?;

    sqlx::migrate!("./migrations")
        .run(&db)
        .await
        .context("running migrations")?;

    let state = AppState::new(db, &config);
    if !state.notifier.is_enabled() {
        tracing::warn!("NOTIFY_WEBHOOK_URL not set, order notifications disabled");
    }

    tokio::spawn(start_cache_warmer(state.cache.clone(), state.db.clone()));

    let app = create_router(state);
    let listener = tokio::net::TcpListener::bind(config.bind_addr)
        .await
        .with_context(|| format!("binding {}", config.bind_addr))?;
    tracing::info!("Listening on {}", config.bind_addr);

    axum::serve(listener, app).await?;
    Ok(())
}
