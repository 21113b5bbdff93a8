pub mod calendar;
pub mod order;
pub mod payment_plan;
pub mod pricing;
pub mod schedule;

pub use order::OrderStatus;
pub use payment_plan::PaymentPlan;
pub use pricing::{BillingType, CouponOutcome, Quote};
