use crate::util::plural;
use chrono::{Datelike, Months, NaiveDate};

/// Calendar difference between two dates, like a relative delta.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Age {
    pub years: u32,
    pub months: u32,
    pub days: u32,
}

impl Age {
    pub fn between(from: NaiveDate, to: NaiveDate) -> Self {
        if to <= from {
            return Self { years: 0, months: 0, days: 0 };
        }
        let total_months =
            (to.year() - from.year()) * 12 + to.month() as i32 - from.month() as i32;

        // Step back until adding whole months to `from` no longer passes `to`.
        let mut months = total_months.max(0) as u32;
        let anchor = loop {
            match from.checked_add_months(Months::new(months)) {
                Some(anchor) if anchor <= to || months == 0 => break anchor,
                _ => months -= 1,
            }
        };

        Self {
            years: months / 12,
            months: months % 12,
            days: (to - anchor).num_days() as u32,
        }
    }

    pub fn is_anniversary(&self) -> bool {
        self.months == 0 && self.days == 0
    }
}

/// `"9 years, 2 months, 1 day"`, with a cake on the anniversary.
pub fn age_string(from: NaiveDate, to: NaiveDate) -> String {
    let age = Age::between(from, to);
    format!(
        "{} year{}, {} month{}, {} day{}{}",
        age.years,
        plural(age.years),
        age.months,
        plural(age.months),
        age.days,
        plural(age.days),
        if age.is_anniversary() { " 🎂" } else { "" }
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    #[test]
    fn whole_units_and_remainder() {
        assert_eq!(
            Age::between(d(2006, 3, 9), d(2024, 5, 20)),
            Age { years: 18, months: 2, days: 11 }
        );
        assert_eq!(
            Age::between(d(2006, 3, 9), d(2024, 3, 8)),
            Age { years: 17, months: 11, days: 28 }
        );
    }

    #[test]
    fn month_end_birthdays_clamp() {
        assert_eq!(
            Age::between(d(2020, 1, 31), d(2020, 2, 28)),
            Age { years: 0, months: 0, days: 28 }
        );
        assert_eq!(
            Age::between(d(2020, 1, 31), d(2020, 3, 1)),
            Age { years: 0, months: 1, days: 1 }
        );
    }

    #[test]
    fn string_pluralises_and_marks_anniversary() {
        assert_eq!(age_string(d(2006, 3, 9), d(2007, 4, 10)), "1 year, 1 month, 1 day");
        assert_eq!(age_string(d(2006, 3, 9), d(2024, 3, 9)), "18 years, 0 months, 0 days 🎂");
    }

    #[test]
    fn future_start_is_zero() {
        assert_eq!(Age::between(d(2030, 1, 1), d(2024, 1, 1)), Age { years: 0, months: 0, days: 0 });
    }
}
