mod availability;
mod config;
mod db;
mod discovery;
mod domain;
mod geo;
mod pages;
mod payments;
mod pricing;
mod routes;
mod services;
mod state;
mod storage;
mod timefmt;
mod validation;
mod wizard;

use std::sync::Arc;

use tracing_subscriber::EnvFilter;

use crate::payments::{HttpPaymentFunctions, PaymentFunctions};
use crate::storage::{LocalStorage, ObjectStorage};

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = config::AppConfig::from_env().expect("invalid configuration");

    let pool = db::init_pool(&config.database_url, config.db_max_connections)
        .await
        .expect("database init failed");

    let payments: Option<Arc<dyn PaymentFunctions>> = match &config.functions {
        Some(functions) => {
            let client = HttpPaymentFunctions::new(functions).expect("payment client init failed");
            Some(Arc::new(client))
        }
        None => {
            tracing::warn!("FUNCTIONS_BASE_URL not set; paid bookings and games are disabled");
            None
        }
    };
    if config.mail.is_none() {
        tracing::warn!("RESEND_API_KEY not set; sign-in codes are logged instead of emailed");
    }
    let storage: Arc<dyn ObjectStorage> =
        Arc::new(LocalStorage::new(config.storage_dir.clone(), &config.public_base_url));

    let port = config.port;
    let state = state::AppState::new(pool, config, payments, storage);
    let app = routes::app(state);
    let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{port}"))
        .await
        .expect("failed to bind");

    tracing::info!(%port, "sportsbnb listening");
    axum::serve(listener, app).await.expect("server failed");
}
