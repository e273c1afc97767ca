//! Example server: loads the model registry from CONFIG_PATH, connects the
//! default pool from DATABASE_URL, and serves the query routes.

use crudgate::{load_from_path, query_routes, resolve_pg, AppState, HttpErrorFactory, QueryService, Settings};
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("crudgate=info".parse()?))
        .init();

    let settings = Settings::from_env();
    let pool = match &settings.database_url {
        Some(url) => Some(
            sqlx::postgres::PgPoolOptions::new()
                .max_connections(settings.max_connections)
                .connect(url)
                .await?,
        ),
        None => {
            tracing::warn!("DATABASE_URL not set; only models with their own databaseUrl are served");
            None
        }
    };

    let config = load_from_path(&settings.config_path).await?;
    let registry = resolve_pg(&config, pool)?;
    let timeout = settings.request_timeout.unwrap_or_else(|| config.request_timeout());
    let service = QueryService::new(Arc::new(registry), HttpErrorFactory).with_request_timeout(timeout);

    let app = query_routes(AppState::new(service));

    let listener = TcpListener::bind(&settings.bind_addr).await?;
    tracing::info!("listening on {}", listener.local_addr()?);
    axum::serve(listener, app).await?;
    Ok(())
}
