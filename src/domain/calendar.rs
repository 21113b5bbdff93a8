//! Delivery calendar arithmetic.
//! Decodes the flat delivery-index encoding into calendar dates and
//! enumerates selectable dates under the configured window.

use chrono::{DateTime, Datelike, Duration, NaiveDate, Utc, Weekday};
use serde::{Deserialize, Serialize};

/// Indices at or above this value address the second weekday of the grid.
pub const SECOND_WEEKDAY_BASE: u32 = 100;

/// Largest delivery index the encoding can represent.
pub const MAX_DELIVERY_INDEX: u32 = 199;

#[derive(Debug, Clone)]
pub struct CalendarConfig {
    /// Weekday of the first delivery slot; the second slot is one day later.
    pub first_weekday: Weekday,
    /// How many weeks ahead of today dates may be selected.
    pub weeks_in_advance: u32,
    /// Candidate dates starting within this many hours are no longer selectable.
    pub cutoff_hours: i64,
    pub holidays: Vec<NaiveDate>,
}

impl Default for CalendarConfig {
    fn default() -> Self {
        Self {
            first_weekday: Weekday::Mon,
            weeks_in_advance: 8,
            cutoff_hours: 48,
            holidays: Vec::new(),
        }
    }
}

/// One candidate delivery date, tagged with its index encoding.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeliverySlot {
    pub index: u32,
    pub date: NaiveDate,
    pub is_available: bool,
}

/// Resolves a delivery index against a start date.
///
/// Indices `0..=99` are week offsets of the first weekday; `100..=199` are
/// the same week offsets of the second weekday, which is always exactly one
/// calendar day after the first.
pub fn date_from_index(start: NaiveDate, index: u32) -> NaiveDate {
    if index < SECOND_WEEKDAY_BASE {
        start + Duration::weeks(index as i64)
    } else {
        start + Duration::days(1) + Duration::weeks((index - SECOND_WEEKDAY_BASE) as i64)
    }
}

/// First occurrence of the configured first weekday on or after `today`.
/// All index encodings within one availability window are anchored here.
pub fn window_start(config: &CalendarConfig, today: NaiveDate) -> NaiveDate {
    let offset = (7 + config.first_weekday.num_days_from_monday() as i64
        - today.weekday().num_days_from_monday() as i64)
        % 7;
    today + Duration::days(offset)
}

/// Enumerates every candidate date of both weekdays within the configured
/// window. Recomputed from `now` on every call; an empty result is a valid
/// outcome, not an error.
pub fn available_dates(config: &CalendarConfig, now: DateTime<Utc>) -> Vec<DeliverySlot> {
    let today = now.date_naive();
    let start = window_start(config, today);

    let mut slots = Vec::with_capacity(config.weeks_in_advance as usize * 2);
    for week in 0..config.weeks_in_advance {
        slots.push(slot_for(config, start, week, now));
        slots.push(slot_for(config, start, week + SECOND_WEEKDAY_BASE, now));
    }
    slots.sort_by_key(|s| s.date);
    slots
}

fn slot_for(config: &CalendarConfig, start: NaiveDate, index: u32, now: DateTime<Utc>) -> DeliverySlot {
    let date = date_from_index(start, index);
    DeliverySlot {
        index,
        date,
        is_available: is_selectable(config, date, now),
    }
}

fn is_selectable(config: &CalendarConfig, date: NaiveDate, now: DateTime<Utc>) -> bool {
    let today = now.date_naive();
    if date < today {
        return false;
    }
    if config.holidays.contains(&date) {
        return false;
    }
    let day_start = date
        .and_hms_opt(0, 0, 0)
        .map(|dt| dt.and_utc())
        .unwrap_or(now);
    day_start - now >= Duration::hours(config.cutoff_hours)
}

/// Quick select: the next `count` available occurrences of the first weekday.
pub fn weekly_selection(config: &CalendarConfig, count: usize, now: DateTime<Utc>) -> Vec<DeliverySlot> {
    available_dates(config, now)
        .into_iter()
        .filter(|s| s.is_available && s.index < SECOND_WEEKDAY_BASE)
        .take(count)
        .collect()
}

/// Quick select: both weekdays of the next `count` weeks that still have at
/// least one selectable slot, unavailable dates filtered out.
pub fn biweekly_selection(config: &CalendarConfig, count: usize, now: DateTime<Utc>) -> Vec<DeliverySlot> {
    let slots = available_dates(config, now);
    let mut weeks: Vec<u32> = slots
        .iter()
        .filter(|s| s.is_available)
        .map(|s| s.index % SECOND_WEEKDAY_BASE)
        .collect();
    weeks.sort_unstable();
    weeks.dedup();
    weeks.truncate(count);

    slots
        .into_iter()
        .filter(|s| s.is_available && weeks.contains(&(s.index % SECOND_WEEKDAY_BASE)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn monday_start() -> NaiveDate {
        // 2026-08-31 is a Monday
        NaiveDate::from_ymd_opt(2026, 8, 31).unwrap()
    }

    #[test]
    fn first_weekday_indices_land_on_first_weekday() {
        let start = monday_start();
        for i in 0..100 {
            let date = date_from_index(start, i);
            assert_eq!(date.weekday(), Weekday::Mon);
            assert_eq!(date, start + Duration::weeks(i as i64));
        }
    }

    #[test]
    fn second_weekday_indices_land_one_day_later() {
        let start = monday_start();
        for i in 100..200 {
            let date = date_from_index(start, i);
            assert_eq!(date.weekday(), Weekday::Tue);
            assert_eq!(date, start + Duration::days(1) + Duration::weeks((i - 100) as i64));
        }
    }

    #[test]
    fn window_start_rolls_forward_to_first_weekday() {
        let config = CalendarConfig::default();
        // 2026-09-02 is a Wednesday; next Monday is 2026-09-07
        let wednesday = NaiveDate::from_ymd_opt(2026, 9, 2).unwrap();
        assert_eq!(
            window_start(&config, wednesday),
            NaiveDate::from_ymd_opt(2026, 9, 7).unwrap()
        );
        // A Monday anchors on itself
        assert_eq!(window_start(&config, monday_start()), monday_start());
    }

    #[test]
    fn cutoff_and_holidays_mark_dates_unavailable() {
        let mut config = CalendarConfig::default();
        config.holidays = vec![NaiveDate::from_ymd_opt(2026, 9, 7).unwrap()];

        // Saturday noon; the upcoming Monday (Aug 31) starts in 36h < 48h cutoff
        let now = Utc.with_ymd_and_hms(2026, 8, 29, 12, 0, 0).unwrap();
        let slots = available_dates(&config, now);

        let first_monday = slots.iter().find(|s| s.index == 0).unwrap();
        assert_eq!(first_monday.date, monday_start());
        assert!(!first_monday.is_available);

        let holiday = slots
            .iter()
            .find(|s| s.date == NaiveDate::from_ymd_opt(2026, 9, 7).unwrap())
            .unwrap();
        assert!(!holiday.is_available);

        // A slot two weeks out is clear of both rules
        let clear = slots.iter().find(|s| s.index == 2).unwrap();
        assert!(clear.is_available);
    }

    #[test]
    fn weekly_selection_returns_first_weekday_only() {
        let config = CalendarConfig::default();
        let now = Utc.with_ymd_and_hms(2026, 8, 20, 9, 0, 0).unwrap();
        let picks = weekly_selection(&config, 4, now);
        assert_eq!(picks.len(), 4);
        assert!(picks.iter().all(|s| s.index < SECOND_WEEKDAY_BASE));
        assert!(picks.iter().all(|s| s.is_available));
    }

    #[test]
    fn biweekly_selection_covers_both_weekdays() {
        let config = CalendarConfig::default();
        let now = Utc.with_ymd_and_hms(2026, 8, 20, 9, 0, 0).unwrap();
        let picks = biweekly_selection(&config, 3, now);
        assert_eq!(picks.len(), 6);
        let second_day = picks.iter().filter(|s| s.index >= SECOND_WEEKDAY_BASE).count();
        assert_eq!(second_day, 3);
    }

    #[test]
    fn empty_window_is_not_an_error() {
        let config = CalendarConfig {
            weeks_in_advance: 0,
            ..CalendarConfig::default()
        };
        let now = Utc.with_ymd_and_hms(2026, 8, 20, 9, 0, 0).unwrap();
        assert!(available_dates(&config, now).is_empty());
    }
}
