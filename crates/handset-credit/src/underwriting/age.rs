use chrono::{Datelike, NaiveDate};

pub const MINIMUM_AGE: i32 = 18;
pub const MAXIMUM_AGE: i32 = 65;

/// Whole years between `birth_date` and `today`, not counting a birthday still to come this year.
pub fn age_on(birth_date: NaiveDate, today: NaiveDate) -> i32 {
    let mut age = today.year() - birth_date.year();
    if (today.month(), today.day()) < (birth_date.month(), birth_date.day()) {
        age -= 1;
    }
    age
}

pub fn is_eligible_age(age: i32) -> bool {
    (MINIMUM_AGE..=MAXIMUM_AGE).contains(&age)
}

/// Risk-group ordinal for an eligible age; `None` outside the lending window.
pub fn risk_group_ordinal(age: i32) -> Option<u8> {
    match age {
        18..=30 => Some(1),
        31..=50 => Some(2),
        51..=65 => Some(3),
        _ => None,
    }
}
