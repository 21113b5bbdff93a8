pub mod config;
pub mod db;
pub mod domain;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod payments;
pub mod services;
pub mod validation;

use std::sync::Arc;
use std::time::Duration;

use axum::{
    Router,
    routing::{get, post},
};
use tower_http::cors::CorsLayer;

use crate::config::Config;
use crate::payments::HostedPaymentClient;
use crate::services::{OrderService, SubmissionGuard};

#[derive(Clone)]
pub struct AppState {
    pub db: sqlx::PgPool,
    pub config: Arc<Config>,
    pub orders: Arc<OrderService>,
}

impl AppState {
    pub fn new(db: sqlx::PgPool, config: Config) -> Self {
        let config = Arc::new(config);
        let guard = Arc::new(SubmissionGuard::new(Duration::from_secs(
            config.submission_cooldown_secs,
        )));
        let payments = config
            .payment_api_url
            .clone()
            .map(HostedPaymentClient::new);
        let orders = Arc::new(OrderService::new(db.clone(), &config, guard, payments));

        Self { db, config, orders }
    }
}

pub fn create_app(state: AppState) -> Router {
    Router::new()
        .route("/health", get(handlers::health))
        .route("/orders/preview", post(handlers::orders::preview))
        .route("/orders/delivery-dates", get(handlers::orders::delivery_dates))
        .route(
            "/orders/idempotency-key",
            post(handlers::orders::issue_idempotency_key),
        )
        .route(
            "/orders",
            post(handlers::orders::create_order).get(handlers::orders::list_orders),
        )
        .route("/orders/:id", get(handlers::orders::get_order))
        .route("/orders/:id/cancel", post(handlers::orders::cancel_order))
        .route(
            "/billing",
            get(handlers::billing::get_billing).put(handlers::billing::put_billing),
        )
        .layer(CorsLayer::permissive())
        .with_state(state)
}
