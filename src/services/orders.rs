//! Order creation orchestration: validate, price, expand, persist.
//!
//! The pricing call here is the same `pricing::price` the preview endpoint
//! uses; totals therefore cannot diverge between the live display and the
//! persisted order.

use chrono::{NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use std::sync::Arc;
use uuid::Uuid;

use crate::config::Config;
use crate::db::models::{DeliveryPackage, Order, PaymentGroup};
use crate::db::queries;
use crate::domain::calendar::{self, CalendarConfig};
use crate::domain::order::{self, OrderStatus};
use crate::domain::payment_plan::{self, PaymentPlan};
use crate::domain::pricing::{self, BillingType, PricingConfig};
use crate::domain::schedule;
use crate::error::AppError;
use crate::middleware::AuthUser;
use crate::payments::{HostedPaymentClient, LineItem};
use crate::services::guard::SubmissionGuard;
use crate::validation;

/// Client-held order draft as submitted.
#[derive(Debug, Clone, Deserialize)]
pub struct OrderDraft {
    pub quantity: u32,
    pub schedule: Vec<u32>,
    pub payment_plan: PaymentPlan,
    pub payment_method: String,
    pub coupon_code: Option<String>,
    pub billing_type: BillingType,
    pub billing: serde_json::Value,
    /// Server-issued key; the store enforces uniqueness per (user, key).
    pub idempotency_key: Uuid,
}

#[derive(Debug, Clone, Serialize)]
pub struct CreatedOrder {
    pub order_id: Uuid,
    pub order_number: String,
    pub total_amount: i64,
    pub payment_group_count: usize,
    pub delivery_package_count: usize,
    pub status: String,
    pub payment_redirect_url: Option<String>,
    /// True when the idempotency key matched an existing order.
    pub replayed: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct OrderDetail {
    pub order: Order,
    pub payment_groups: Vec<PaymentGroup>,
    pub delivery_packages: Vec<DeliveryPackage>,
}

pub struct OrderService {
    pool: PgPool,
    pricing: PricingConfig,
    calendar: CalendarConfig,
    order_number_prefix: String,
    guard: Arc<SubmissionGuard>,
    payments: Option<HostedPaymentClient>,
}

impl OrderService {
    pub fn new(
        pool: PgPool,
        config: &Config,
        guard: Arc<SubmissionGuard>,
        payments: Option<HostedPaymentClient>,
    ) -> Self {
        Self {
            pool,
            pricing: config.pricing.clone(),
            calendar: config.calendar.clone(),
            order_number_prefix: config.order_number_prefix.clone(),
            guard,
            payments,
        }
    }

    pub async fn create_order(
        &self,
        user: &AuthUser,
        draft: OrderDraft,
    ) -> Result<CreatedOrder, AppError> {
        self.guard
            .begin(user.user_id)
            .map_err(|r| AppError::TooManyRequests(r.message().to_string()))?;

        let result = self.create_order_inner(user, draft).await;
        self.guard.complete(user.user_id, result.is_ok());
        result
    }

    async fn create_order_inner(
        &self,
        user: &AuthUser,
        draft: OrderDraft,
    ) -> Result<CreatedOrder, AppError> {
        validation::validate_quantity(draft.quantity)
            .map_err(|e| AppError::Validation(e.to_string()))?;
        validation::validate_schedule(&draft.schedule)
            .map_err(|e| AppError::Validation(e.to_string()))?;
        validation::validate_required("payment_method", &draft.payment_method)
            .map_err(|e| AppError::Validation(e.to_string()))?;
        validation::validate_enum(
            "payment_method",
            &draft.payment_method,
            validation::PAYMENT_METHODS,
        )
        .map_err(|e| AppError::Validation(e.to_string()))?;
        if let Some(code) = draft.coupon_code.as_deref() {
            validation::validate_coupon_code(code)
                .map_err(|e| AppError::Validation(e.to_string()))?;
        }
        if !draft.billing.is_object() {
            return Err(AppError::Validation(
                "billing: must be an object".to_string(),
            ));
        }

        // Replay: the same (user, key) always resolves to the same order.
        if let Some(existing) = queries::find_order_by_idempotency_key(
            &self.pool,
            user.user_id,
            draft.idempotency_key,
        )
        .await?
        {
            return Ok(self.replayed_response(existing).await?);
        }

        let now = Utc::now();
        let today = now.date_naive();
        let window_start = calendar::window_start(&self.calendar, today);
        let resolved: Vec<(u32, NaiveDate)> = draft
            .schedule
            .iter()
            .map(|&index| (index, calendar::date_from_index(window_start, index)))
            .collect();
        let dates: Vec<NaiveDate> = resolved.iter().map(|(_, d)| *d).collect();
        let delivery_count = dates.len();

        let quote = pricing::price(
            &self.pricing,
            draft.quantity,
            draft.coupon_code.as_deref(),
            draft.billing_type,
        );
        let total_amount = quote.total_amount(delivery_count);
        let total_shipping_fee = quote.scaled_shipping_fee(delivery_count);

        let group_drafts =
            payment_plan::build_groups(draft.payment_plan, total_amount, &dates, today);
        let package_drafts = schedule::build_packages(
            &resolved,
            draft.quantity,
            quote.unit_price,
            self.calendar.first_weekday,
        );

        let order_id = Uuid::new_v4();
        let order_number = order::generate_order_number(&self.order_number_prefix, now);

        // Card orders wait for the hosted-payment step; everything else is
        // confirmed at creation.
        let (status, confirmed_at) = if draft.payment_method == "card" {
            (OrderStatus::PendingPayment, None)
        } else {
            (OrderStatus::Confirmed, Some(now))
        };

        let order = Order {
            id: order_id,
            order_number: order_number.clone(),
            user_id: user.user_id,
            user_email: user.email.clone(),
            quantity: draft.quantity as i32,
            unit_price: quote.unit_price,
            total_shipping_fee,
            total_amount,
            schedule: serde_json::json!(draft.schedule),
            billing: draft.billing.clone(),
            coupon_code: quote.coupon.applied_code().map(String::from),
            payment_plan: draft.payment_plan.as_str().to_string(),
            payment_method: draft.payment_method.clone(),
            status: status.as_str().to_string(),
            payment_redirect_url: None,
            idempotency_key: draft.idempotency_key,
            created_at: now,
            updated_at: now,
            confirmed_at,
        };

        let groups: Vec<PaymentGroup> = group_drafts
            .iter()
            .map(|g| PaymentGroup {
                id: Uuid::new_v4(),
                order_id,
                group_number: g.group_number,
                amount: g.amount,
                due_date: g.due_date,
                status: "pending".to_string(),
                description: g.description.clone(),
                created_at: now,
            })
            .collect();

        let packages: Vec<DeliveryPackage> = package_drafts
            .iter()
            .map(|p| DeliveryPackage {
                id: Uuid::new_v4(),
                order_id,
                package_number: p.package_number,
                total_packages: p.total_packages,
                delivery_index: p.delivery_index,
                delivery_date: p.delivery_date,
                quantity: p.quantity,
                amount: p.amount,
                on_first_weekday: p.on_first_weekday,
                status: "scheduled".to_string(),
                created_at: now,
            })
            .collect();

        let inserted =
            match queries::insert_order_aggregate(&self.pool, &order, &groups, &packages).await {
                Ok(inserted) => inserted,
                Err(e) if is_unique_violation(&e) => {
                    // Lost a race against a concurrent retry with the same
                    // key; the winner's order is the order.
                    let existing = queries::find_order_by_idempotency_key(
                        &self.pool,
                        user.user_id,
                        draft.idempotency_key,
                    )
                    .await?
                    .ok_or_else(|| {
                        AppError::Internal("idempotency conflict without a matching order".into())
                    })?;
                    return Ok(self.replayed_response(existing).await?);
                }
                Err(e) => return Err(e.into()),
            };

        // The session is opened only after the order is durable; a failed
        // insert can no longer orphan an external checkout session, and a
        // failed session open is recoverable through an idempotent replay.
        let payment_redirect_url = self.ensure_redirect_url(&inserted, packages.len()).await?;

        tracing::info!(
            "created order {} for user {} ({} groups, {} packages, total {})",
            inserted.order_number,
            user.user_id,
            groups.len(),
            packages.len(),
            inserted.total_amount
        );

        Ok(CreatedOrder {
            order_id: inserted.id,
            order_number: inserted.order_number,
            total_amount: inserted.total_amount,
            payment_group_count: groups.len(),
            delivery_package_count: packages.len(),
            status: inserted.status,
            payment_redirect_url,
            replayed: false,
        })
    }

    async fn replayed_response(&self, existing: Order) -> Result<CreatedOrder, AppError> {
        let groups = queries::get_payment_groups(&self.pool, existing.id).await?;
        let packages = queries::get_delivery_packages(&self.pool, existing.id).await?;
        // A retrying client is exactly the one that never saw the original
        // response, so a pending card order must hand its checkout URL back.
        let payment_redirect_url = self.ensure_redirect_url(&existing, packages.len()).await?;
        Ok(CreatedOrder {
            order_id: existing.id,
            order_number: existing.order_number,
            total_amount: existing.total_amount,
            payment_group_count: groups.len(),
            delivery_package_count: packages.len(),
            status: existing.status,
            payment_redirect_url,
            replayed: true,
        })
    }

    /// Returns the checkout URL of a pending-payment order, opening and
    /// persisting a session first if none is stored yet. Orders in any other
    /// status have no payment step and get no URL.
    async fn ensure_redirect_url(
        &self,
        order: &Order,
        delivery_count: usize,
    ) -> Result<Option<String>, AppError> {
        if order.status != OrderStatus::PendingPayment.as_str() {
            return Ok(None);
        }
        if let Some(url) = &order.payment_redirect_url {
            return Ok(Some(url.clone()));
        }

        let url = self.open_checkout_session(order, delivery_count).await?;
        if let Some(url) = &url {
            queries::set_payment_redirect_url(&self.pool, order.id, url).await?;
        }
        Ok(url)
    }

    async fn open_checkout_session(
        &self,
        order: &Order,
        delivery_count: usize,
    ) -> Result<Option<String>, AppError> {
        let Some(client) = &self.payments else {
            return Ok(None);
        };

        let mut line_items = vec![LineItem {
            description: format!(
                "{} units across {} deliveries",
                order.quantity, delivery_count
            ),
            unit_amount: order.unit_price,
            quantity: order.quantity as u32 * delivery_count as u32,
        }];
        if order.total_shipping_fee > 0 && delivery_count > 0 {
            line_items.push(LineItem {
                description: "Shipping".to_string(),
                unit_amount: order.total_shipping_fee / delivery_count as i64,
                quantity: delivery_count as u32,
            });
        }

        let session = client
            .create_session(&order.order_number, &line_items, order.total_amount)
            .await
            .map_err(|e| {
                tracing::error!("checkout session failed for {}: {}", order.order_number, e);
                AppError::Internal("could not start the payment session".to_string())
            })?;
        Ok(Some(session.redirect_url))
    }

    pub async fn get_order_detail(
        &self,
        user: &AuthUser,
        order_id: Uuid,
    ) -> Result<OrderDetail, AppError> {
        let order = queries::get_order_for_user(&self.pool, order_id, user.user_id)
            .await
            .map_err(|e| match e {
                sqlx::Error::RowNotFound => {
                    AppError::NotFound(format!("Order {} not found", order_id))
                }
                _ => AppError::DatabaseError(e.to_string()),
            })?;
        let payment_groups = queries::get_payment_groups(&self.pool, order.id).await?;
        let delivery_packages = queries::get_delivery_packages(&self.pool, order.id).await?;

        Ok(OrderDetail {
            order,
            payment_groups,
            delivery_packages,
        })
    }

    pub async fn list_orders(
        &self,
        user: &AuthUser,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<Order>, AppError> {
        Ok(queries::list_orders_for_user(&self.pool, user.user_id, limit, offset).await?)
    }

    pub async fn cancel_order(&self, user: &AuthUser, order_id: Uuid) -> Result<Order, AppError> {
        let order = queries::get_order_for_user(&self.pool, order_id, user.user_id)
            .await
            .map_err(|e| match e {
                sqlx::Error::RowNotFound => {
                    AppError::NotFound(format!("Order {} not found", order_id))
                }
                _ => AppError::DatabaseError(e.to_string()),
            })?;

        let current: OrderStatus = order
            .status
            .parse()
            .map_err(|e: String| AppError::Internal(e))?;
        if !current.can_transition_to(OrderStatus::Cancelled) {
            return Err(AppError::BadRequest(format!(
                "order in status {} cannot be cancelled",
                current
            )));
        }

        Ok(queries::update_order_status(&self.pool, order.id, OrderStatus::Cancelled.as_str())
            .await?)
    }
}

fn is_unique_violation(error: &sqlx::Error) -> bool {
    error
        .as_database_error()
        .map(|db| db.is_unique_violation())
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn service(payments: Option<HostedPaymentClient>) -> OrderService {
        let config = Config {
            server_port: 0,
            database_url: "postgres://localhost/harvest_test".to_string(),
            payment_api_url: None,
            order_number_prefix: "HV".to_string(),
            submission_cooldown_secs: 5,
            pricing: PricingConfig::default(),
            calendar: CalendarConfig::default(),
        };
        // Lazy pool: these tests never reach the database.
        let pool = sqlx::PgPool::connect_lazy(&config.database_url).expect("lazy pool");
        let guard = Arc::new(SubmissionGuard::new(Duration::from_secs(5)));
        OrderService::new(pool, &config, guard, payments)
    }

    fn pending_card_order(payment_redirect_url: Option<String>) -> Order {
        let now = Utc::now();
        Order {
            id: Uuid::new_v4(),
            order_number: "HV-20260901-0042".to_string(),
            user_id: Uuid::new_v4(),
            user_email: "customer@example.com".to_string(),
            quantity: 20,
            unit_price: 1490,
            total_shipping_fee: 11_400,
            total_amount: 71_000,
            schedule: serde_json::json!([0, 1]),
            billing: serde_json::json!({"name": "A. Customer"}),
            coupon_code: None,
            payment_plan: "full".to_string(),
            payment_method: "card".to_string(),
            status: OrderStatus::PendingPayment.as_str().to_string(),
            payment_redirect_url,
            idempotency_key: Uuid::new_v4(),
            created_at: now,
            updated_at: now,
            confirmed_at: None,
        }
    }

    #[tokio::test]
    async fn pending_order_replay_keeps_stored_redirect_url() {
        let svc = service(None);
        let order = pending_card_order(Some("https://pay.example.com/cs_1".to_string()));

        let url = svc.ensure_redirect_url(&order, 2).await.unwrap();
        assert_eq!(url.as_deref(), Some("https://pay.example.com/cs_1"));
    }

    #[tokio::test]
    async fn confirmed_orders_get_no_redirect_url() {
        let svc = service(None);
        let mut order = pending_card_order(Some("https://pay.example.com/cs_1".to_string()));
        order.status = OrderStatus::Confirmed.as_str().to_string();

        let url = svc.ensure_redirect_url(&order, 2).await.unwrap();
        assert!(url.is_none());
    }

    #[tokio::test]
    async fn pending_order_without_collaborator_has_no_url() {
        let svc = service(None);
        let order = pending_card_order(None);

        let url = svc.ensure_redirect_url(&order, 2).await.unwrap();
        assert!(url.is_none());
    }

    #[tokio::test]
    async fn checkout_session_is_built_from_persisted_amounts() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", "/checkout/sessions")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"session_id":"cs_9","redirect_url":"https://pay.example.com/cs_9"}"#)
            .create_async()
            .await;

        let svc = service(Some(HostedPaymentClient::new(server.url())));
        let order = pending_card_order(None);

        let url = svc.open_checkout_session(&order, 2).await.unwrap();
        assert_eq!(url.as_deref(), Some("https://pay.example.com/cs_9"));
    }
}
