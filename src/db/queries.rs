use crate::db::models::{BillingProfile, DeliveryPackage, Order, PaymentGroup};
use chrono::Utc;
use sqlx::{PgPool, Postgres, Result, Transaction as SqlxTransaction};
use uuid::Uuid;

// --- Order Queries ---

/// Replay lookup for the store-enforced idempotency key.
pub async fn find_order_by_idempotency_key(
    pool: &PgPool,
    user_id: Uuid,
    key: Uuid,
) -> Result<Option<Order>> {
    sqlx::query_as::<_, Order>(
        "SELECT * FROM orders WHERE user_id = $1 AND idempotency_key = $2",
    )
    .bind(user_id)
    .bind(key)
    .fetch_optional(pool)
    .await
}

/// Writes the order with all of its payment groups and delivery packages in
/// one database transaction; any failed sub-write rolls back everything.
pub async fn insert_order_aggregate(
    pool: &PgPool,
    order: &Order,
    groups: &[PaymentGroup],
    packages: &[DeliveryPackage],
) -> Result<Order> {
    let mut tx = pool.begin().await?;

    let inserted = insert_order(&mut tx, order).await?;
    for group in groups {
        insert_payment_group(&mut tx, group).await?;
    }
    for package in packages {
        insert_delivery_package(&mut tx, package).await?;
    }

    tx.commit().await?;
    Ok(inserted)
}

async fn insert_order(
    executor: &mut SqlxTransaction<'_, Postgres>,
    order: &Order,
) -> Result<Order> {
    sqlx::query_as::<_, Order>(
        r#"
        INSERT INTO orders (
            id, order_number, user_id, user_email, quantity, unit_price,
            total_shipping_fee, total_amount, schedule, billing, coupon_code,
            payment_plan, payment_method, status, payment_redirect_url,
            idempotency_key, created_at, updated_at, confirmed_at
        ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17, $18, $19)
        RETURNING *
        "#,
    )
    .bind(order.id)
    .bind(&order.order_number)
    .bind(order.user_id)
    .bind(&order.user_email)
    .bind(order.quantity)
    .bind(order.unit_price)
    .bind(order.total_shipping_fee)
    .bind(order.total_amount)
    .bind(&order.schedule)
    .bind(&order.billing)
    .bind(&order.coupon_code)
    .bind(&order.payment_plan)
    .bind(&order.payment_method)
    .bind(&order.status)
    .bind(&order.payment_redirect_url)
    .bind(order.idempotency_key)
    .bind(order.created_at)
    .bind(order.updated_at)
    .bind(order.confirmed_at)
    .fetch_one(&mut **executor)
    .await
}

async fn insert_payment_group(
    executor: &mut SqlxTransaction<'_, Postgres>,
    group: &PaymentGroup,
) -> Result<PaymentGroup> {
    sqlx::query_as::<_, PaymentGroup>(
        r#"
        INSERT INTO payment_groups (
            id, order_id, group_number, amount, due_date, status, description, created_at
        ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
        RETURNING *
        "#,
    )
    .bind(group.id)
    .bind(group.order_id)
    .bind(group.group_number)
    .bind(group.amount)
    .bind(group.due_date)
    .bind(&group.status)
    .bind(&group.description)
    .bind(group.created_at)
    .fetch_one(&mut **executor)
    .await
}

async fn insert_delivery_package(
    executor: &mut SqlxTransaction<'_, Postgres>,
    package: &DeliveryPackage,
) -> Result<DeliveryPackage> {
    sqlx::query_as::<_, DeliveryPackage>(
        r#"
        INSERT INTO delivery_packages (
            id, order_id, package_number, total_packages, delivery_index,
            delivery_date, quantity, amount, on_first_weekday, status, created_at
        ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
        RETURNING *
        "#,
    )
    .bind(package.id)
    .bind(package.order_id)
    .bind(package.package_number)
    .bind(package.total_packages)
    .bind(package.delivery_index)
    .bind(package.delivery_date)
    .bind(package.quantity)
    .bind(package.amount)
    .bind(package.on_first_weekday)
    .bind(&package.status)
    .bind(package.created_at)
    .fetch_one(&mut **executor)
    .await
}

pub async fn get_order_for_user(pool: &PgPool, id: Uuid, user_id: Uuid) -> Result<Order> {
    sqlx::query_as::<_, Order>("SELECT * FROM orders WHERE id = $1 AND user_id = $2")
        .bind(id)
        .bind(user_id)
        .fetch_one(pool)
        .await
}

pub async fn list_orders_for_user(
    pool: &PgPool,
    user_id: Uuid,
    limit: i64,
    offset: i64,
) -> Result<Vec<Order>> {
    sqlx::query_as::<_, Order>(
        "SELECT * FROM orders WHERE user_id = $1 ORDER BY created_at DESC LIMIT $2 OFFSET $3",
    )
    .bind(user_id)
    .bind(limit)
    .bind(offset)
    .fetch_all(pool)
    .await
}

pub async fn set_payment_redirect_url(pool: &PgPool, id: Uuid, url: &str) -> Result<Order> {
    sqlx::query_as::<_, Order>(
        "UPDATE orders SET payment_redirect_url = $1, updated_at = $2 WHERE id = $3 RETURNING *",
    )
    .bind(url)
    .bind(Utc::now())
    .bind(id)
    .fetch_one(pool)
    .await
}

pub async fn update_order_status(pool: &PgPool, id: Uuid, status: &str) -> Result<Order> {
    sqlx::query_as::<_, Order>(
        "UPDATE orders SET status = $1, updated_at = $2 WHERE id = $3 RETURNING *",
    )
    .bind(status)
    .bind(Utc::now())
    .bind(id)
    .fetch_one(pool)
    .await
}

pub async fn get_payment_groups(pool: &PgPool, order_id: Uuid) -> Result<Vec<PaymentGroup>> {
    sqlx::query_as::<_, PaymentGroup>(
        "SELECT * FROM payment_groups WHERE order_id = $1 ORDER BY group_number",
    )
    .bind(order_id)
    .fetch_all(pool)
    .await
}

pub async fn get_delivery_packages(pool: &PgPool, order_id: Uuid) -> Result<Vec<DeliveryPackage>> {
    sqlx::query_as::<_, DeliveryPackage>(
        "SELECT * FROM delivery_packages WHERE order_id = $1 ORDER BY package_number",
    )
    .bind(order_id)
    .fetch_all(pool)
    .await
}

// --- Billing Profile Queries ---

pub async fn get_billing_profile(pool: &PgPool, user_id: Uuid) -> Result<Option<BillingProfile>> {
    sqlx::query_as::<_, BillingProfile>("SELECT * FROM billing_profiles WHERE user_id = $1")
        .bind(user_id)
        .fetch_optional(pool)
        .await
}

pub async fn upsert_billing_profile(
    pool: &PgPool,
    user_id: Uuid,
    profile: &serde_json::Value,
) -> Result<BillingProfile> {
    sqlx::query_as::<_, BillingProfile>(
        r#"
        INSERT INTO billing_profiles (user_id, profile, updated_at)
        VALUES ($1, $2, $3)
        ON CONFLICT (user_id) DO UPDATE SET profile = $2, updated_at = $3
        RETURNING *
        "#,
    )
    .bind(user_id)
    .bind(profile)
    .bind(Utc::now())
    .fetch_one(pool)
    .await
}
