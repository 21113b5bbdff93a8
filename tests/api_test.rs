use axum::{
    body::Body,
    http::{Request, StatusCode},
};
use serde_json::{Value, json};
use tower::ServiceExt;

use harvest_core::{AppState, config::Config, create_app};
use harvest_core::domain::calendar::CalendarConfig;
use harvest_core::domain::pricing::PricingConfig;

/// Lazy pool: nothing here touches the database, so no server is needed.
fn test_state() -> AppState {
    let config = Config {
        server_port: 0,
        database_url: "postgres://localhost/harvest_test".to_string(),
        payment_api_url: None,
        order_number_prefix: "HV".to_string(),
        submission_cooldown_secs: 5,
        pricing: PricingConfig::default(),
        calendar: CalendarConfig::default(),
    };
    let pool = sqlx::PgPool::connect_lazy(&config.database_url).expect("lazy pool");
    AppState::new(pool, config)
}

async fn body_json(response: axum::response::Response) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("read body");
    serde_json::from_slice(&bytes).expect("json body")
}

fn post_json(uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

#[tokio::test]
async fn preview_matches_worked_example() {
    let app = create_app(test_state());

    let response = app
        .oneshot(post_json(
            "/orders/preview",
            json!({
                "quantity": 20,
                "schedule": [0, 1],
                "billing_type": "private"
            }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["unit_price"], 1490);
    assert_eq!(body["per_delivery_subtotal"], 29_800);
    assert_eq!(body["per_delivery_shipping_fee"], 5_700);
    assert_eq!(body["subtotal"], 59_600);
    assert_eq!(body["total_shipping_fee"], 11_400);
    assert_eq!(body["total_amount"], 71_000);
    assert_eq!(body["coupon"]["state"], "none");
}

#[tokio::test]
async fn preview_reports_coupon_rejection_without_failing() {
    let app = create_app(test_state());

    let response = app
        .oneshot(post_json(
            "/orders/preview",
            json!({
                "quantity": 21,
                "schedule": [0],
                "coupon_code": "WELCOME-PRIVATE",
                "billing_type": "private"
            }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["coupon"]["state"], "rejected");
    // pricing fell back to standard tiers
    assert_eq!(body["unit_price"], 1490);
    assert_eq!(body["per_delivery_shipping_fee"], 5_700);
}

#[tokio::test]
async fn preview_applies_private_coupon_at_threshold() {
    let app = create_app(test_state());

    let response = app
        .oneshot(post_json(
            "/orders/preview",
            json!({
                "quantity": 20,
                "schedule": [0],
                "coupon_code": "WELCOME-PRIVATE",
                "billing_type": "private"
            }),
        ))
        .await
        .unwrap();

    let body = body_json(response).await;
    assert_eq!(body["coupon"]["state"], "applied");
    assert_eq!(body["unit_price"], 1190);
    assert_eq!(body["per_delivery_shipping_fee"], 3_000);
}

#[tokio::test]
async fn preview_rejects_zero_quantity() {
    let app = create_app(test_state());

    let response = app
        .oneshot(post_json(
            "/orders/preview",
            json!({
                "quantity": 0,
                "schedule": [0],
                "billing_type": "private"
            }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn delivery_dates_lists_both_weekdays() {
    let app = create_app(test_state());

    let response = app
        .oneshot(
            Request::builder()
                .uri("/orders/delivery-dates")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    let slots = body["slots"].as_array().unwrap();
    // default window: 8 weeks, two weekdays each
    assert_eq!(slots.len(), 16);
    assert!(slots.iter().any(|s| s["index"].as_u64().unwrap() < 100));
    assert!(slots.iter().any(|s| s["index"].as_u64().unwrap() >= 100));
}

#[tokio::test]
async fn delivery_dates_rejects_unknown_quick_selection() {
    let app = create_app(test_state());

    let response = app
        .oneshot(
            Request::builder()
                .uri("/orders/delivery-dates?quick=daily")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn order_creation_requires_identity() {
    let app = create_app(test_state());

    let response = app
        .oneshot(post_json(
            "/orders",
            json!({
                "quantity": 20,
                "schedule": [0, 1],
                "payment_plan": "full",
                "payment_method": "transfer",
                "billing_type": "private",
                "billing": {"name": "A. Customer"},
                "idempotency_key": "7e4c1d8a-9f1b-4f7e-bb6a-2f1f0a9c3d55"
            }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn billing_requires_identity() {
    let app = create_app(test_state());

    let response = app
        .oneshot(
            Request::builder()
                .uri("/billing")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn idempotency_key_is_issued_per_request() {
    let state = test_state();

    let issue = |app: axum::Router| async move {
        let response = app
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/orders/idempotency-key")
                    .header("x-user-id", "7e4c1d8a-9f1b-4f7e-bb6a-2f1f0a9c3d55")
                    .header("x-user-email", "customer@example.com")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        body_json(response).await["idempotency_key"]
            .as_str()
            .unwrap()
            .to_string()
    };

    let first = issue(create_app(state.clone())).await;
    let second = issue(create_app(state)).await;
    assert_ne!(first, second);
}
