//! Expands a confirmed schedule into one delivery record per selected date.

use chrono::{Datelike, NaiveDate, Weekday};

/// One physical delivery before persistence. Every package carries the full
/// order quantity; deliveries are never fractional splits of the order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeliveryPackageDraft {
    pub package_number: i32,
    pub total_packages: i32,
    pub delivery_index: i32,
    pub delivery_date: NaiveDate,
    pub quantity: i32,
    pub amount: i64,
    pub on_first_weekday: bool,
}

/// Builds packages from resolved (index, date) pairs, numbered 1..N by date
/// ascending. `amount` covers goods only; shipping lives on payment groups.
pub fn build_packages(
    resolved: &[(u32, NaiveDate)],
    quantity: u32,
    unit_price: i64,
    first_weekday: Weekday,
) -> Vec<DeliveryPackageDraft> {
    let mut sorted: Vec<(u32, NaiveDate)> = resolved.to_vec();
    sorted.sort_by_key(|(_, date)| *date);

    let total = sorted.len() as i32;
    sorted
        .into_iter()
        .enumerate()
        .map(|(i, (index, date))| DeliveryPackageDraft {
            package_number: i as i32 + 1,
            total_packages: total,
            delivery_index: index as i32,
            delivery_date: date,
            quantity: quantity as i32,
            amount: unit_price * quantity as i64,
            on_first_weekday: date.weekday() == first_weekday,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    #[test]
    fn packages_are_numbered_by_date_ascending() {
        // Mondays and a Tuesday, deliberately out of order
        let resolved = [(1, d(2026, 9, 7)), (100, d(2026, 9, 1)), (0, d(2026, 8, 31))];
        let packages = build_packages(&resolved, 20, 1490, Weekday::Mon);

        assert_eq!(packages.len(), 3);
        assert_eq!(packages[0].delivery_date, d(2026, 8, 31));
        assert_eq!(packages[0].package_number, 1);
        assert_eq!(packages[2].delivery_date, d(2026, 9, 7));
        assert_eq!(packages[2].package_number, 3);
        assert!(packages.iter().all(|p| p.total_packages == 3));
    }

    #[test]
    fn every_package_carries_the_full_quantity() {
        let resolved = [(0, d(2026, 8, 31)), (1, d(2026, 9, 7))];
        let packages = build_packages(&resolved, 20, 1490, Weekday::Mon);

        let total_quantity: i32 = packages.iter().map(|p| p.quantity).sum();
        assert_eq!(total_quantity, 20 * 2);
        assert!(packages.iter().all(|p| p.amount == 29_800));
    }

    #[test]
    fn weekday_flag_follows_resolved_date() {
        let resolved = [(0, d(2026, 8, 31)), (100, d(2026, 9, 1))];
        let packages = build_packages(&resolved, 5, 1490, Weekday::Mon);
        assert!(packages[0].on_first_weekday);
        assert!(!packages[1].on_first_weekday);
    }
}
