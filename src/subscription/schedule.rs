//! Delivery counting and occurrence scheduling.
//!
//! A subscription contracts `delivery_number` total deliveries. The
//! originating parent order already delivered once, so the count of renewals
//! still owed is `delivery_number - completed_generated_orders - 1`. While
//! deliveries remain, the next occurrence is one frequency interval of
//! calendar months past now; once exhausted it is `None`, which is also the
//! signal active-subscription queries use to exclude spent records.

use chrono::{DateTime, Months, Utc};

use crate::frequency::Frequency;

/// Sentinel `delivery_number` meaning "effectively unlimited".
pub const DEFAULT_DELIVERY_NUMBER: u32 = 1_000_000_000;

/// Renewal deliveries still owed.
///
/// Signed: a subscription whose completed orders already cover the contract
/// reports zero or below.
#[must_use]
pub fn deliveries_left(delivery_number: u32, completed_orders: usize) -> i64 {
    i64::from(delivery_number) - completed_orders as i64 - 1
}

/// True while at least one renewal delivery is owed.
#[must_use]
pub fn deliveries_remaining(delivery_number: u32, completed_orders: usize) -> bool {
    deliveries_left(delivery_number, completed_orders) > 0
}

/// Computes the next occurrence timestamp from `now`.
///
/// Returns `None` when no deliveries remain, or on calendar overflow (a date
/// beyond chrono's representable range, unreachable for realistic
/// frequencies).
#[must_use]
pub fn next_occurrence(
    frequency: &Frequency,
    delivery_number: u32,
    completed_orders: usize,
    now: DateTime<Utc>,
) -> Option<DateTime<Utc>> {
    if !deliveries_remaining(delivery_number, completed_orders) {
        return None;
    }
    now.checked_add_months(Months::new(frequency.months_count()))
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    #[test]
    fn test_deliveries_left_discounts_parent_order() {
        // delivery_number=4, 0 completed: parent took one, three renewals owed.
        assert_eq!(deliveries_left(4, 0), 3);
        assert_eq!(deliveries_left(4, 2), 1);
        assert_eq!(deliveries_left(4, 3), 0);
    }

    #[test]
    fn test_deliveries_left_can_go_negative() {
        assert_eq!(deliveries_left(1, 1), -1);
    }

    #[test]
    fn test_deliveries_remaining_boundary() {
        assert!(deliveries_remaining(4, 2));
        assert!(!deliveries_remaining(4, 3));
        assert!(!deliveries_remaining(1, 0));
    }

    #[test]
    fn test_default_sentinel_is_effectively_unlimited() {
        assert!(deliveries_remaining(DEFAULT_DELIVERY_NUMBER, 100_000));
    }

    #[test]
    fn test_next_occurrence_advances_by_frequency_months() {
        let now = Utc.with_ymd_and_hms(2026, 1, 15, 12, 0, 0).unwrap();
        let freq = Frequency::new("quarterly", 3).unwrap();

        let next = next_occurrence(&freq, 4, 0, now).unwrap();
        assert_eq!(next, Utc.with_ymd_and_hms(2026, 4, 15, 12, 0, 0).unwrap());
    }

    #[test]
    fn test_next_occurrence_clamps_end_of_month() {
        let now = Utc.with_ymd_and_hms(2026, 1, 31, 9, 0, 0).unwrap();
        let freq = Frequency::monthly();

        let next = next_occurrence(&freq, 4, 0, now).unwrap();
        // 2026 is not a leap year; January 31 + 1 month clamps to February 28.
        assert_eq!(next, Utc.with_ymd_and_hms(2026, 2, 28, 9, 0, 0).unwrap());
    }

    #[test]
    fn test_next_occurrence_none_when_exhausted() {
        let now = Utc::now();
        let freq = Frequency::monthly();
        assert_eq!(next_occurrence(&freq, 1, 0, now), None);
    }
}
