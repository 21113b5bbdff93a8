//! Payment-plan expansion: splits an order total into due installments.
//!
//! Every plan satisfies the same invariant: the group amounts sum to the
//! order total exactly. The last bucket absorbs the rounding remainder for
//! both the per-delivery and the monthly split.

use chrono::{Datelike, Duration, NaiveDate};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaymentPlan {
    Full,
    Monthly,
    Delivery,
}

impl PaymentPlan {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentPlan::Full => "full",
            PaymentPlan::Monthly => "monthly",
            PaymentPlan::Delivery => "delivery",
        }
    }
}

/// One installment before persistence; numbering is 1-based and contiguous.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaymentGroupDraft {
    pub group_number: i32,
    pub amount: i64,
    pub due_date: NaiveDate,
    pub description: String,
}

/// Nearest-integer division for the per-installment share.
fn rounded_share(total: i64, parts: i64) -> i64 {
    (total + parts / 2) / parts
}

/// Expands `plan` over the resolved delivery dates.
///
/// `dates` need not be pre-sorted; groups are always emitted in due-date
/// order. An empty schedule yields no groups for the monthly and delivery
/// plans; callers reject empty schedules before getting here.
pub fn build_groups(
    plan: PaymentPlan,
    total_amount: i64,
    dates: &[NaiveDate],
    today: NaiveDate,
) -> Vec<PaymentGroupDraft> {
    let mut sorted: Vec<NaiveDate> = dates.to_vec();
    sorted.sort_unstable();

    match plan {
        PaymentPlan::Full => vec![PaymentGroupDraft {
            group_number: 1,
            amount: total_amount,
            due_date: today,
            description: "Full payment".to_string(),
        }],
        PaymentPlan::Delivery => build_per_delivery(total_amount, &sorted),
        PaymentPlan::Monthly => build_monthly(total_amount, &sorted),
    }
}

fn build_per_delivery(total_amount: i64, sorted: &[NaiveDate]) -> Vec<PaymentGroupDraft> {
    let n = sorted.len() as i64;
    if n == 0 {
        return Vec::new();
    }
    let share = rounded_share(total_amount, n);

    let mut groups = Vec::with_capacity(sorted.len());
    let mut paid = 0i64;
    for (i, date) in sorted.iter().enumerate() {
        let last = i as i64 == n - 1;
        let amount = if last { total_amount - paid } else { share };
        paid += amount;
        groups.push(PaymentGroupDraft {
            group_number: i as i32 + 1,
            amount,
            due_date: *date - Duration::days(1),
            description: format!("Payment for delivery on {}", date),
        });
    }
    groups
}

fn build_monthly(total_amount: i64, sorted: &[NaiveDate]) -> Vec<PaymentGroupDraft> {
    let n = sorted.len() as i64;
    if n == 0 {
        return Vec::new();
    }
    let per_delivery = rounded_share(total_amount, n);

    // Months in ascending order with their delivery counts.
    let mut months: Vec<((i32, u32), i64)> = Vec::new();
    for date in sorted {
        let key = (date.year(), date.month());
        match months.last_mut() {
            Some((k, count)) if *k == key => *count += 1,
            _ => months.push((key, 1)),
        }
    }

    let month_count = months.len();
    let mut groups = Vec::with_capacity(month_count);
    let mut paid = 0i64;
    for (i, ((year, month), count)) in months.into_iter().enumerate() {
        let last = i == month_count - 1;
        let amount = if last {
            total_amount - paid
        } else {
            per_delivery * count
        };
        paid += amount;
        // first day of the month always exists
        let due_date = NaiveDate::from_ymd_opt(year, month, 1).unwrap_or(sorted[0]);
        groups.push(PaymentGroupDraft {
            group_number: i as i32 + 1,
            amount,
            due_date,
            description: format!("{} deliveries in {}-{:02}", count, year, month),
        });
    }
    groups
}
