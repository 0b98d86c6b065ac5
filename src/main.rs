//! Tienda Storefront - WhatsApp-order storefront backend

use std::sync::Arc;

use anyhow::Result;
use sqlx::postgres::PgPoolOptions;
use tienda_storefront::config::Config;
use tienda_storefront::routes::{self, AppState};
use tienda_storefront::tracking::{BeaconPixel, CapiDispatcher, DisabledPixel, DualTracker, PixelChannel};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env()?;
    let db = PgPoolOptions::new().max_connections(10).connect(&config.database_url).await?;
    sqlx::migrate!("./migrations").run(&db).await?;

    let nats = match &config.nats_url {
        Some(url) => match async_nats::connect(url.as_str()).await {
            Ok(client) => Some(client),
            Err(e) => {
                tracing::warn!(error = %e, "NATS unavailable, order events will not be published");
                None
            }
        },
        None => None,
    };

    let pixel: Arc<dyn PixelChannel> = match &config.meta.pixel_id {
        Some(pixel_id) => Arc::new(BeaconPixel::new(config.meta.beacon_base.as_str(), pixel_id.as_str())?),
        None => Arc::new(DisabledPixel),
    };
    let tracker = Arc::new(DualTracker::new(CapiDispatcher::new(config.meta.clone())?, pixel));

    let port = config.port;
    let state = AppState { db, nats, tracker, config: Arc::new(config) };
    let app = routes::router(state);

    tracing::info!("tienda-storefront listening on 0.0.0.0:{}", port);
    axum::serve(tokio::net::TcpListener::bind(format!("0.0.0.0:{}", port)).await?, app).await?;
    Ok(())
}
