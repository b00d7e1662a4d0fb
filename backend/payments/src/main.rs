//! ZeroHunger payments service — entry point.
//!
//! Accepts donation requests, routes charges across the platform's payment
//! rails (Stripe card processing, M-Pesa mobile money, Instasend
//! cross-border settlement), persists donation records, and reconciles
//! provider webhook events into terminal donation states. Exposes a small
//! Axum REST API consumed by the platform frontend.

mod api;
mod auth;
mod config;
mod db;
mod donations;
mod errors;
mod providers;
mod router;
mod webhooks;

use std::sync::Arc;
use std::time::Duration;

use axum::{
    routing::{get, post},
    Router,
};
use reqwest::Client;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::info;
use tracing_subscriber::EnvFilter;

use config::{Config, ProviderMode};
use donations::PaymentMethod;
use providers::{mock, InstasendProvider, MpesaProvider, StripeProvider};
use router::PaymentRouter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialise structured logging (RUST_LOG controls verbosity).
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    // Load optional .env file (ignored if missing).
    let _ = dotenvy::dotenv();

    // Load config from environment.
    let config = Config::from_env().map_err(|e| anyhow::anyhow!("{e}"))?;

    // Set up the SQLite connection pool and run migrations.
    let pool = db::init_pool(&config.database_url).await?;

    // Outbound HTTP client shared by all live adapters; every provider call
    // is bounded by the charge timeout.
    let client = Client::builder()
        .timeout(Duration::from_secs(config.charge_timeout_secs))
        .build()?;

    let payment_router = build_payment_router(&config, client);

    let state = Arc::new(api::ApiState {
        pool,
        payment_router,
        config: config.clone(),
    });

    let app = Router::new()
        .route("/health", get(api::health))
        .route(
            "/donations",
            post(api::create_donation).get(api::list_donations),
        )
        .route("/webhooks/stripe", post(api::stripe_webhook))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    let addr = format!("0.0.0.0:{}", config.api_port);
    info!("API listening on http://{addr}");

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

/// Wire the rail registry. Adapters hold no global state; the shared HTTP
/// client is constructed here and injected.
fn build_payment_router(config: &Config, client: Client) -> PaymentRouter {
    let timeout = Duration::from_secs(config.charge_timeout_secs);

    match config.provider_mode {
        ProviderMode::Live => PaymentRouter::new(timeout)
            .with_provider(
                PaymentMethod::Card,
                Arc::new(StripeProvider::new(
                    client.clone(),
                    &config.stripe_api_base,
                    &config.stripe_secret_key,
                )),
            )
            .with_provider(
                PaymentMethod::Mpesa,
                Arc::new(MpesaProvider::new(
                    client.clone(),
                    &config.mpesa_api_base,
                    &config.mpesa_api_key,
                )),
            )
            .with_provider(
                PaymentMethod::Instasend,
                Arc::new(InstasendProvider::new(
                    client,
                    &config.instasend_api_base,
                    &config.instasend_api_key,
                )),
            ),
        ProviderMode::Sandbox => {
            info!("sandbox provider mode — using in-memory rails");
            PaymentRouter::new(timeout)
                .with_provider(PaymentMethod::Card, Arc::new(mock::MockCardProvider::new()))
                .with_provider(
                    PaymentMethod::Mpesa,
                    Arc::new(mock::MockMpesaProvider::new()),
                )
                .with_provider(
                    PaymentMethod::Instasend,
                    Arc::new(mock::MockInstasendProvider::new()),
                )
        }
    }
}
