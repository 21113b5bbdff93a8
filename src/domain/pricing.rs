//! Quantity-tiered shipping and coupon-adjusted unit pricing.
//!
//! One `price` function serves the live preview, checkout-session creation,
//! and final persistence paths; the three call sites must never diverge on
//! totals, so none of them is allowed a second pricing implementation.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BillingType {
    Private,
    Business,
}

/// All tier boundaries, fees, and coupon parameters in one place.
/// Pricing arithmetic reads only from here; call sites never re-derive.
#[derive(Debug, Clone)]
pub struct PricingConfig {
    pub unit_price: i64,
    pub high_shipping_fee: i64,
    pub low_shipping_fee: i64,
    /// Smallest quantity that qualifies for the low shipping tier.
    pub low_tier_min_quantity: u32,
    /// Quantity at which shipping becomes free.
    pub free_shipping_threshold: u32,
    pub private_coupon_code: String,
    pub private_coupon_unit_price: i64,
    /// Private-discount code only applies up to this quantity.
    pub private_coupon_max_quantity: u32,
    pub partner_codes: Vec<String>,
    /// Coupons cap the per-delivery shipping fee at this value.
    pub shipping_fee_ceiling: i64,
}

impl Default for PricingConfig {
    fn default() -> Self {
        Self {
            unit_price: 1490,
            high_shipping_fee: 5700,
            low_shipping_fee: 3000,
            low_tier_min_quantity: 26,
            free_shipping_threshold: 40,
            private_coupon_code: "WELCOME-PRIVATE".to_string(),
            private_coupon_unit_price: 1190,
            private_coupon_max_quantity: 20,
            partner_codes: vec!["PARTNER-A".to_string(), "PARTNER-B".to_string()],
            shipping_fee_ceiling: 3000,
        }
    }
}

/// One promotional rule: a code, an applicability predicate over
/// (billing type, quantity), and the price effect. Rules are evaluated in
/// order, first match wins, so adding a promotion never touches arithmetic.
#[derive(Debug, Clone)]
pub struct CouponRule {
    pub code: String,
    pub billing: Option<BillingType>,
    pub max_quantity: Option<u32>,
    pub unit_price_override: Option<i64>,
    pub shipping_fee_ceiling: Option<i64>,
}

impl CouponRule {
    fn applicable(&self, billing: BillingType, quantity: u32) -> bool {
        if let Some(required) = self.billing {
            if billing != required {
                return false;
            }
        }
        if let Some(max) = self.max_quantity {
            if quantity > max {
                return false;
            }
        }
        true
    }
}

impl PricingConfig {
    /// The ordered rule table: the private-discount code first, then the
    /// partner codes with the shared shipping-fee cap.
    pub fn coupon_rules(&self) -> Vec<CouponRule> {
        let mut rules = vec![CouponRule {
            code: self.private_coupon_code.clone(),
            billing: Some(BillingType::Private),
            max_quantity: Some(self.private_coupon_max_quantity),
            unit_price_override: Some(self.private_coupon_unit_price),
            shipping_fee_ceiling: Some(self.shipping_fee_ceiling),
        }];
        for code in &self.partner_codes {
            rules.push(CouponRule {
                code: code.clone(),
                billing: None,
                max_quantity: None,
                unit_price_override: None,
                shipping_fee_ceiling: Some(self.shipping_fee_ceiling),
            });
        }
        rules
    }
}

/// How a submitted coupon code fared. Mismatches are outcomes, not errors.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "lowercase")]
pub enum CouponOutcome {
    None,
    Applied { code: String },
    Rejected { code: String, reason: String },
}

impl CouponOutcome {
    pub fn applied_code(&self) -> Option<&str> {
        match self {
            CouponOutcome::Applied { code } => Some(code),
            _ => None,
        }
    }
}

/// Per-delivery pricing for one (quantity, coupon, billing type) input.
/// Totals scale linearly with the number of scheduled deliveries.
#[derive(Debug, Clone, Serialize)]
pub struct Quote {
    pub quantity: u32,
    pub unit_price: i64,
    pub per_delivery_subtotal: i64,
    pub per_delivery_shipping_fee: i64,
    pub coupon: CouponOutcome,
}

impl Quote {
    pub fn scaled_subtotal(&self, deliveries: usize) -> i64 {
        self.per_delivery_subtotal * deliveries as i64
    }

    pub fn scaled_shipping_fee(&self, deliveries: usize) -> i64 {
        self.per_delivery_shipping_fee * deliveries as i64
    }

    pub fn total_amount(&self, deliveries: usize) -> i64 {
        self.scaled_subtotal(deliveries) + self.scaled_shipping_fee(deliveries)
    }
}

/// Shipping tier on quantity alone, before any coupon effect.
fn tiered_shipping_fee(config: &PricingConfig, quantity: u32) -> i64 {
    if quantity >= config.free_shipping_threshold {
        0
    } else if quantity >= config.low_tier_min_quantity {
        config.low_shipping_fee
    } else {
        config.high_shipping_fee
    }
}

pub fn price(
    config: &PricingConfig,
    quantity: u32,
    coupon_code: Option<&str>,
    billing: BillingType,
) -> Quote {
    let mut unit_price = config.unit_price;
    let mut shipping_fee = tiered_shipping_fee(config, quantity);

    let coupon = match coupon_code.map(str::trim).filter(|c| !c.is_empty()) {
        None => CouponOutcome::None,
        Some(code) => {
            let rules = config.coupon_rules();
            match rules.iter().find(|r| r.code == code) {
                None => CouponOutcome::Rejected {
                    code: code.to_string(),
                    reason: "unknown coupon code".to_string(),
                },
                Some(rule) if !rule.applicable(billing, quantity) => CouponOutcome::Rejected {
                    code: code.to_string(),
                    reason: "coupon conditions not met for this billing type or quantity"
                        .to_string(),
                },
                Some(rule) => {
                    if let Some(override_price) = rule.unit_price_override {
                        unit_price = override_price;
                    }
                    if let Some(ceiling) = rule.shipping_fee_ceiling {
                        if shipping_fee > ceiling {
                            shipping_fee = ceiling;
                        }
                    }
                    CouponOutcome::Applied {
                        code: code.to_string(),
                    }
                }
            }
        }
    };

    Quote {
        quantity,
        unit_price,
        per_delivery_subtotal: unit_price * quantity as i64,
        per_delivery_shipping_fee: shipping_fee,
        coupon,
    }
}
