//! Availability and pricing engine.
//!
//! Pure date-range and arithmetic logic, invoked exactly once per booking at
//! creation time. The computed total is persisted into the booking's pricing
//! snapshot and never recomputed from the live hoarding afterwards.

use chrono::NaiveDate;

use crate::models::{AdditionalCost, PricePer};

/// Whether two inclusive date ranges share at least one day.
pub fn overlaps(s1: NaiveDate, e1: NaiveDate, s2: NaiveDate, e2: NaiveDate) -> bool {
    s1 <= e2 && e1 >= s2
}

/// Number of billable days in an inclusive range. `[Aug 1, Aug 3]` is 3 days.
pub fn billable_days(start: NaiveDate, end: NaiveDate) -> i64 {
    (end - start).num_days() + 1
}

/// How many billing units the range spans. Weeks and months round up;
/// slot-priced hoardings are flat-rate regardless of duration.
pub fn unit_count(per: PricePer, days: i64) -> i64 {
    match per {
        PricePer::Day => days,
        PricePer::Week => days.div_ceil(7),
        PricePer::Month => days.div_ceil(30),
        PricePer::Slot => 1,
    }
}

/// Total price for booking `[start, end]` under the given pricing rules:
/// base price times the unit count, plus every additional cost flagged as
/// included.
pub fn quote(
    base_price: f64,
    per: PricePer,
    additional_costs: &[AdditionalCost],
    start: NaiveDate,
    end: NaiveDate,
) -> f64 {
    let units = unit_count(per, billable_days(start, end));
    let extras: f64 = additional_costs
        .iter()
        .filter(|c| c.included)
        .map(|c| c.cost)
        .sum();

    base_price * units as f64 + extras
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    #[test]
    fn ranges_sharing_a_day_overlap() {
        // Identical, nested, partial and single-day-touching ranges.
        assert!(overlaps(d(2026, 8, 1), d(2026, 8, 3), d(2026, 8, 1), d(2026, 8, 3)));
        assert!(overlaps(d(2026, 8, 1), d(2026, 8, 31), d(2026, 8, 10), d(2026, 8, 12)));
        assert!(overlaps(d(2026, 8, 1), d(2026, 8, 3), d(2026, 8, 2), d(2026, 8, 4)));
        assert!(overlaps(d(2026, 8, 1), d(2026, 8, 3), d(2026, 8, 3), d(2026, 8, 5)));
    }

    #[test]
    fn disjoint_ranges_do_not_overlap() {
        assert!(!overlaps(d(2026, 8, 1), d(2026, 8, 3), d(2026, 8, 4), d(2026, 8, 6)));
        assert!(!overlaps(d(2026, 8, 4), d(2026, 8, 6), d(2026, 8, 1), d(2026, 8, 3)));
    }

    #[test]
    fn days_are_endpoint_inclusive() {
        assert_eq!(billable_days(d(2026, 8, 1), d(2026, 8, 3)), 3);
        assert_eq!(billable_days(d(2026, 8, 1), d(2026, 8, 2)), 2);
        assert_eq!(billable_days(d(2026, 1, 1), d(2026, 1, 10)), 10);
    }

    #[test]
    fn units_round_up() {
        assert_eq!(unit_count(PricePer::Day, 10), 10);
        assert_eq!(unit_count(PricePer::Week, 7), 1);
        assert_eq!(unit_count(PricePer::Week, 8), 2);
        assert_eq!(unit_count(PricePer::Week, 10), 2);
        assert_eq!(unit_count(PricePer::Month, 30), 1);
        assert_eq!(unit_count(PricePer::Month, 31), 2);
        assert_eq!(unit_count(PricePer::Slot, 365), 1);
    }

    #[test]
    fn daily_quote() {
        // 1000/day, Aug 1-3 -> 3 days -> 3000.
        let total = quote(1000.0, PricePer::Day, &[], d(2026, 8, 1), d(2026, 8, 3));
        assert_eq!(total, 3000.0);
    }

    #[test]
    fn weekly_quote_rounds_up() {
        // 500/week, Jan 1-10 -> 10 days -> 2 weeks -> 1000.
        let total = quote(500.0, PricePer::Week, &[], d(2026, 1, 1), d(2026, 1, 10));
        assert_eq!(total, 1000.0);
    }

    #[test]
    fn only_included_costs_are_charged() {
        let costs = vec![
            AdditionalCost {
                name: "printing".into(),
                cost: 250.0,
                included: true,
            },
            AdditionalCost {
                name: "lighting".into(),
                cost: 400.0,
                included: false,
            },
        ];

        let total = quote(1000.0, PricePer::Day, &costs, d(2026, 8, 1), d(2026, 8, 3));
        assert_eq!(total, 3250.0);
    }

    #[test]
    fn quote_is_deterministic() {
        let a = quote(750.0, PricePer::Month, &[], d(2026, 3, 1), d(2026, 5, 15));
        let b = quote(750.0, PricePer::Month, &[], d(2026, 3, 1), d(2026, 5, 15));
        assert_eq!(a, b);
    }
}
