use anyhow::Result;
use chrono::{NaiveDate, Weekday};
use dotenvy::dotenv;
use std::env;
use std::str::FromStr;

use crate::domain::calendar::CalendarConfig;
use crate::domain::pricing::PricingConfig;

#[derive(Debug, Clone)]
pub struct Config {
    pub server_port: u16,
    pub database_url: String,
    /// Base URL of the hosted-payment collaborator; card orders are created
    /// as pending_payment only when this is set.
    pub payment_api_url: Option<String>,
    pub order_number_prefix: String,
    pub submission_cooldown_secs: u64,
    pub pricing: PricingConfig,
    pub calendar: CalendarConfig,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenv().ok(); // Load .env file if present

        let prefix = env::var("ORDER_NUMBER_PREFIX").unwrap_or_else(|_| "HV".to_string());
        if prefix.is_empty() || !prefix.chars().all(|c| c.is_ascii_uppercase()) {
            anyhow::bail!("ORDER_NUMBER_PREFIX must be non-empty uppercase ASCII");
        }

        Ok(Config {
            server_port: env::var("SERVER_PORT")
                .unwrap_or_else(|_| "3000".to_string())
                .parse()?,
            database_url: env::var("DATABASE_URL")?,
            payment_api_url: env::var("PAYMENT_API_URL").ok(),
            order_number_prefix: prefix,
            submission_cooldown_secs: env_parse("SUBMISSION_COOLDOWN_SECS", 5)?,
            pricing: pricing_from_env()?,
            calendar: calendar_from_env()?,
        })
    }
}

fn pricing_from_env() -> Result<PricingConfig> {
    let defaults = PricingConfig::default();
    Ok(PricingConfig {
        unit_price: env_parse("UNIT_PRICE", defaults.unit_price)?,
        high_shipping_fee: env_parse("HIGH_SHIPPING_FEE", defaults.high_shipping_fee)?,
        low_shipping_fee: env_parse("LOW_SHIPPING_FEE", defaults.low_shipping_fee)?,
        low_tier_min_quantity: env_parse("LOW_TIER_MIN_QUANTITY", defaults.low_tier_min_quantity)?,
        free_shipping_threshold: env_parse(
            "FREE_SHIPPING_THRESHOLD",
            defaults.free_shipping_threshold,
        )?,
        private_coupon_code: env::var("PRIVATE_COUPON_CODE")
            .unwrap_or(defaults.private_coupon_code),
        private_coupon_unit_price: env_parse(
            "PRIVATE_COUPON_UNIT_PRICE",
            defaults.private_coupon_unit_price,
        )?,
        private_coupon_max_quantity: env_parse(
            "PRIVATE_COUPON_MAX_QUANTITY",
            defaults.private_coupon_max_quantity,
        )?,
        partner_codes: env::var("PARTNER_CODES")
            .map(|raw| {
                raw.split(',')
                    .map(str::trim)
                    .filter(|c| !c.is_empty())
                    .map(String::from)
                    .collect()
            })
            .unwrap_or(defaults.partner_codes),
        shipping_fee_ceiling: env_parse("SHIPPING_FEE_CEILING", defaults.shipping_fee_ceiling)?,
    })
}

fn calendar_from_env() -> Result<CalendarConfig> {
    let defaults = CalendarConfig::default();
    let first_weekday = match env::var("FIRST_DELIVERY_WEEKDAY") {
        Ok(raw) => Weekday::from_str(&raw)
            .map_err(|_| anyhow::anyhow!("FIRST_DELIVERY_WEEKDAY is not a weekday: {}", raw))?,
        Err(_) => defaults.first_weekday,
    };

    let holidays = match env::var("DELIVERY_HOLIDAYS") {
        Ok(raw) => raw
            .split(',')
            .map(str::trim)
            .filter(|entry| !entry.is_empty())
            .map(|entry| {
                NaiveDate::parse_from_str(entry, "%Y-%m-%d")
                    .map_err(|e| anyhow::anyhow!("bad DELIVERY_HOLIDAYS entry {}: {}", entry, e))
            })
            .collect::<Result<Vec<_>>>()?,
        Err(_) => defaults.holidays,
    };

    Ok(CalendarConfig {
        first_weekday,
        weeks_in_advance: env_parse("DELIVERY_WEEKS_IN_ADVANCE", defaults.weeks_in_advance)?,
        cutoff_hours: env_parse("DELIVERY_CUTOFF_HOURS", defaults.cutoff_hours)?,
        holidays,
    })
}

fn env_parse<T>(key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match env::var(key) {
        Ok(raw) => Ok(raw.parse()?),
        Err(_) => Ok(default),
    }
}
