//! Calendar-month arithmetic for monthly series

use chrono::{Datelike, Months, NaiveDate};

/// First day of the month containing `date`
pub fn month_start(date: NaiveDate) -> NaiveDate {
    date.with_day(1).unwrap_or(date)
}

/// First day of the month after the one containing `date`
pub fn next_month(date: NaiveDate) -> Option<NaiveDate> {
    month_start(date).checked_add_months(Months::new(1))
}

/// `count` consecutive month starts, beginning the month after `last`
pub fn months_after(last: NaiveDate, count: usize) -> Option<Vec<NaiveDate>> {
    let mut months = Vec::with_capacity(count);
    let mut current = month_start(last);
    for _ in 0..count {
        current = next_month(current)?;
        months.push(current);
    }
    Some(months)
}

/// Whether `dates` step forward by exactly one calendar month each time
pub fn is_contiguous(dates: &[NaiveDate]) -> bool {
    dates
        .windows(2)
        .all(|w| next_month(w[0]).map_or(false, |next| next == w[1]))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn normalises_to_month_start() {
        assert_eq!(month_start(ymd(2023, 3, 31)), ymd(2023, 3, 1));
    }

    #[test]
    fn steps_over_year_end() {
        assert_eq!(next_month(ymd(2023, 12, 15)), Some(ymd(2024, 1, 1)));
    }

    #[test]
    fn generates_contiguous_months() {
        let months = months_after(ymd(2023, 11, 30), 3).unwrap();
        assert_eq!(months, vec![ymd(2023, 12, 1), ymd(2024, 1, 1), ymd(2024, 2, 1)]);
        assert!(is_contiguous(&months));
    }

    #[test]
    fn detects_gaps() {
        assert!(!is_contiguous(&[ymd(2023, 1, 1), ymd(2023, 3, 1)]));
        assert!(is_contiguous(&[]));
    }
}
