//! Quarter and Sunday-slot computations for the service grid.

use chrono::{Datelike, Duration, Month, NaiveDate, Weekday};
use serde::Serialize;

/// The four three-month groups shown on the schedule grid.
pub const QUARTER_MONTHS: [[Month; 3]; 4] = [
    [Month::January, Month::February, Month::March],
    [Month::April, Month::May, Month::June],
    [Month::July, Month::August, Month::September],
    [Month::October, Month::November, Month::December],
];

/// Months of quarter `index` (0..=3).
pub fn quarter_months(index: usize) -> Option<[Month; 3]> {
    QUARTER_MONTHS.get(index).copied()
}

/// Quarter index (0..=3) containing `date`.
pub fn current_quarter(date: NaiveDate) -> usize {
    date.month0() as usize / 3
}

/// Every Sunday that falls inside `month` of `year`.
pub fn sundays_of_month(year: i32, month: Month) -> Vec<NaiveDate> {
    let Some(first) = NaiveDate::from_ymd_opt(year, month.number_from_month(), 1) else {
        return Vec::new();
    };

    let offset = (7 - first.weekday().num_days_from_sunday()) % 7;
    let mut day = first + Duration::days(offset as i64);
    let mut sundays = Vec::new();
    while day.month() == first.month() {
        debug_assert_eq!(day.weekday(), Weekday::Sun);
        sundays.push(day);
        day += Duration::days(7);
    }
    sundays
}

/// English ordinal suffix for `n` (1st, 2nd, 3rd, 4th, 11th, 21st, ...).
pub fn ordinal_suffix(n: u32) -> &'static str {
    if (11..=13).contains(&(n % 100)) || (n > 3 && n < 21) {
        return "th";
    }
    match n % 10 {
        1 => "st",
        2 => "nd",
        3 => "rd",
        _ => "th",
    }
}

/// Schedule key for the `position`-th (1-based) Sunday of a month,
/// e.g. `2nd Sunday (April 13)`.
pub fn slot_label(position: u32, date: NaiveDate) -> String {
    format!(
        "{}{} Sunday ({} {})",
        position,
        ordinal_suffix(position),
        date.format("%B"),
        date.day()
    )
}

/// Recover the calendar date from a schedule key.
///
/// Accepts ISO `YYYY-MM-DD` keys and slot labels whose parenthesised
/// `Month D` part is placed in `year`.
pub fn parse_slot_date(key: &str, year: i32) -> Option<NaiveDate> {
    let key = key.trim();
    if let Ok(date) = NaiveDate::parse_from_str(key, "%Y-%m-%d") {
        return Some(date);
    }

    let start = key.find('(')?;
    let end = start + key[start..].find(')')?;
    let inner = key[start + 1..end].trim();
    NaiveDate::parse_from_str(&format!("{} {}", inner, year), "%B %d %Y").ok()
}

/// One Sunday cell of the grid.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct ServiceSlot {
    pub label: String,
    pub date: NaiveDate,
}

/// A month column of the grid.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct MonthSlots {
    pub month: String,
    pub slots: Vec<ServiceSlot>,
}

/// Sunday slots for every month of quarter `index` in `year`.
pub fn quarter_slots(year: i32, index: usize) -> Option<Vec<MonthSlots>> {
    let months = quarter_months(index)?;
    Some(
        months
            .iter()
            .map(|month| MonthSlots {
                month: month.name().to_string(),
                slots: sundays_of_month(year, *month)
                    .into_iter()
                    .zip(1u32..)
                    .map(|(date, position)| ServiceSlot {
                        label: slot_label(position, date),
                        date,
                    })
                    .collect(),
            })
            .collect(),
    )
}
