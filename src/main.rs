use std::sync::Arc;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use basket_api::{
    api::{create_router, AppState},
    config::Config,
    db,
    services::{CsvFileSource, DatasetSource, PostgresSource, Recommender},
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("basket_api=debug,tower_http=info")),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env()?;
    let default_method = config.default_method()?;

    let source: Arc<dyn DatasetSource> = match &config.database_url {
        Some(url) => {
            let pool = db::create_pool(url).await?;
            Arc::new(PostgresSource::new(pool, config.dataset_table.clone()))
        }
        None => Arc::new(CsvFileSource::new(&config.dataset_path)),
    };

    tracing::info!(source = source.name(), "Loading dataset");
    let dataset = source.load(&config.column_bindings()).await?;
    let recommender = Recommender::new(dataset, config.recommender_config())?;
    recommender.prepare()?;

    let state = AppState::new(recommender, source, default_method);
    let app = create_router(state);

    let addr = format!("{}:{}", config.host, config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Server running on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}
