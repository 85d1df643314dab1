use chrono::NaiveDate;
use rust_decimal::Decimal;

/// Whole days between the due date and the return date, floored at zero.
pub fn late_days(due_date: NaiveDate, returned_on: NaiveDate) -> i64 {
    (returned_on - due_date).num_days().max(0)
}

/// Late fine for a number of days at a per-day rate.
///
/// Negative inputs are clamped to zero before multiplying.
pub fn calculate_fine(late_days: i64, fine_per_day: Decimal) -> Decimal {
    Decimal::from(late_days.max(0)) * fine_per_day
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_zero_days_costs_nothing() {
        assert_eq!(calculate_fine(0, dec!(5000)), Decimal::ZERO);
    }

    #[test]
    fn test_fine_is_linear_in_days() {
        for days in 0..60 {
            assert_eq!(
                calculate_fine(days, dec!(5000)),
                Decimal::from(days) * dec!(5000)
            );
        }
    }

    #[test]
    fn test_negative_days_are_clamped() {
        assert_eq!(calculate_fine(-3, dec!(5000)), Decimal::ZERO);
    }

    #[test]
    fn test_five_days_late_example() {
        let days = late_days(date(2024, 1, 1), date(2024, 1, 6));
        assert_eq!(days, 5);
        assert_eq!(calculate_fine(days, dec!(5000)), dec!(25000));
    }

    #[test]
    fn test_early_return_has_no_late_days() {
        assert_eq!(late_days(date(2024, 1, 10), date(2024, 1, 6)), 0);
        assert_eq!(late_days(date(2024, 1, 10), date(2024, 1, 10)), 0);
    }

    #[test]
    fn test_late_days_across_month_boundary() {
        assert_eq!(late_days(date(2024, 2, 27), date(2024, 3, 2)), 4);
    }
}
