use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use chrono::{NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::AppState;
use crate::domain::calendar::{self, DeliverySlot};
use crate::domain::pricing::{self, BillingType, CouponOutcome};
use crate::error::AppError;
use crate::middleware::AuthUser;
use crate::services::orders::OrderDraft;
use crate::validation;

#[derive(Debug, Deserialize)]
pub struct PreviewRequest {
    pub quantity: u32,
    /// Selected delivery indices; may be empty while the customer is still
    /// picking dates.
    #[serde(default)]
    pub schedule: Vec<u32>,
    pub coupon_code: Option<String>,
    pub billing_type: BillingType,
}

#[derive(Debug, Serialize)]
pub struct PreviewResponse {
    pub quantity: u32,
    pub unit_price: i64,
    pub per_delivery_subtotal: i64,
    pub per_delivery_shipping_fee: i64,
    pub delivery_count: usize,
    pub subtotal: i64,
    pub total_shipping_fee: i64,
    pub total_amount: i64,
    pub coupon: CouponOutcome,
}

/// Live pricing preview. Calls the same pricing function as order creation;
/// coupon mismatches come back as an outcome, never as a failure status.
pub async fn preview(
    State(state): State<AppState>,
    Json(request): Json<PreviewRequest>,
) -> Result<impl IntoResponse, AppError> {
    validation::validate_quantity(request.quantity)
        .map_err(|e| AppError::Validation(e.to_string()))?;
    if !request.schedule.is_empty() {
        validation::validate_schedule(&request.schedule)
            .map_err(|e| AppError::Validation(e.to_string()))?;
    }

    let quote = pricing::price(
        &state.config.pricing,
        request.quantity,
        request.coupon_code.as_deref(),
        request.billing_type,
    );
    let n = request.schedule.len();

    Ok(Json(PreviewResponse {
        quantity: quote.quantity,
        unit_price: quote.unit_price,
        per_delivery_subtotal: quote.per_delivery_subtotal,
        per_delivery_shipping_fee: quote.per_delivery_shipping_fee,
        delivery_count: n,
        subtotal: quote.scaled_subtotal(n),
        total_shipping_fee: quote.scaled_shipping_fee(n),
        total_amount: quote.total_amount(n),
        coupon: quote.coupon,
    }))
}

#[derive(Debug, Deserialize)]
pub struct DeliveryDatesQuery {
    /// "weekly" or "biweekly" quick selection; omit for the full listing.
    pub quick: Option<String>,
    pub count: Option<usize>,
}

#[derive(Debug, Serialize)]
pub struct DeliveryDatesResponse {
    pub window_start: NaiveDate,
    pub slots: Vec<DeliverySlot>,
}

pub async fn delivery_dates(
    State(state): State<AppState>,
    Query(query): Query<DeliveryDatesQuery>,
) -> Result<impl IntoResponse, AppError> {
    let now = Utc::now();
    let config = &state.config.calendar;
    let count = query.count.unwrap_or(4);

    let slots = match query.quick.as_deref() {
        None => calendar::available_dates(config, now),
        Some("weekly") => calendar::weekly_selection(config, count, now),
        Some("biweekly") => calendar::biweekly_selection(config, count, now),
        Some(other) => {
            return Err(AppError::Validation(format!(
                "quick: unknown selection {}",
                other
            )));
        }
    };

    Ok(Json(DeliveryDatesResponse {
        window_start: calendar::window_start(config, now.date_naive()),
        slots,
    }))
}

#[derive(Debug, Serialize)]
pub struct IdempotencyKeyResponse {
    pub idempotency_key: Uuid,
}

/// Issues the server-generated key the client must echo on submission.
pub async fn issue_idempotency_key(user: AuthUser) -> impl IntoResponse {
    tracing::debug!("issued idempotency key for user {}", user.user_id);
    Json(IdempotencyKeyResponse {
        idempotency_key: Uuid::new_v4(),
    })
}

pub async fn create_order(
    State(state): State<AppState>,
    user: AuthUser,
    Json(draft): Json<OrderDraft>,
) -> Result<impl IntoResponse, AppError> {
    let created = state.orders.create_order(&user, draft).await?;
    let status = if created.replayed {
        StatusCode::OK
    } else {
        StatusCode::CREATED
    };
    Ok((status, Json(created)))
}

#[derive(Deserialize)]
pub struct Pagination {
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

const MAX_PAGE_SIZE: i64 = 100;

fn page_limit(requested: Option<i64>) -> i64 {
    requested.unwrap_or(20).clamp(1, MAX_PAGE_SIZE)
}

pub async fn list_orders(
    State(state): State<AppState>,
    user: AuthUser,
    Query(pagination): Query<Pagination>,
) -> Result<impl IntoResponse, AppError> {
    let limit = page_limit(pagination.limit);
    let offset = pagination.offset.unwrap_or(0).max(0);

    let orders = state.orders.list_orders(&user, limit, offset).await?;
    Ok(Json(orders))
}

pub async fn get_order(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let detail = state.orders.get_order_detail(&user, id).await?;
    Ok(Json(detail))
}

pub async fn cancel_order(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let order = state.orders.cancel_order(&user, id).await?;
    Ok(Json(order))
}
