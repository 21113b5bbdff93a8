use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Persisted order aggregate root. Immutable after creation except for
/// status and the owned payment-group/delivery-package rows.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Order {
    pub id: Uuid,
    pub order_number: String,
    pub user_id: Uuid,
    pub user_email: String,
    pub quantity: i32,
    pub unit_price: i64,
    pub total_shipping_fee: i64,
    pub total_amount: i64,
    /// Original delivery-index schedule, jsonb array.
    pub schedule: serde_json::Value,
    /// Billing identity snapshot taken at submission time.
    pub billing: serde_json::Value,
    pub coupon_code: Option<String>,
    pub payment_plan: String,
    pub payment_method: String,
    pub status: String,
    /// Checkout URL of the hosted-payment session, kept so an idempotent
    /// replay can hand it back to a client that never saw the first response.
    pub payment_redirect_url: Option<String>,
    pub idempotency_key: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub confirmed_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct PaymentGroup {
    pub id: Uuid,
    pub order_id: Uuid,
    pub group_number: i32,
    pub amount: i64,
    pub due_date: NaiveDate,
    pub status: String,
    pub description: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct DeliveryPackage {
    pub id: Uuid,
    pub order_id: Uuid,
    pub package_number: i32,
    pub total_packages: i32,
    pub delivery_index: i32,
    pub delivery_date: NaiveDate,
    pub quantity: i32,
    pub amount: i64,
    pub on_first_weekday: bool,
    pub status: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct BillingProfile {
    pub user_id: Uuid,
    pub profile: serde_json::Value,
    pub updated_at: DateTime<Utc>,
}
