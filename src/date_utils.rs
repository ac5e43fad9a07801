use chrono::{Datelike, Local, NaiveDate};

/// Key format used by every date-indexed map coming from the backend
pub const ISO_FORMAT: &str = "%Y-%m-%d";

const DISPLAY_FORMAT: &str = "%d/%m/%Y";

const MONTH_LABELS: [&str; 12] = [
    "January",
    "February",
    "March",
    "April",
    "May",
    "June",
    "July",
    "August",
    "September",
    "October",
    "November",
    "December",
];

const WEEKDAY_LABELS: [&str; 7] = ["Sun", "Mon", "Tue", "Wed", "Thu", "Fri", "Sat"];

/// One day slot of a month grid
///
/// Padding slots before the first day of the month are represented as `None`
/// in the sequence returned by [`build_month_calendar`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CalendarCell {
    /// Day of month, 1-based
    pub day: u32,

    /// Full calendar date of the slot
    pub date: NaiveDate,
}

impl CalendarCell {
    /// ISO key of the cell, as used in `TaskCounts`
    pub fn iso(&self) -> String {
        format_iso(self.date)
    }
}

/// Current calendar day in local time
pub fn today() -> NaiveDate {
    Local::now().date_naive()
}

/// Format a date as `DD/MM/YYYY`
///
/// # Arguments
/// * `date` - Date to format, `None` for a missing date
///
/// # Returns
/// * `String` - The formatted date, or an empty string when no date is given
pub fn format_display(date: Option<NaiveDate>) -> String {
    match date {
        Some(d) => d.format(DISPLAY_FORMAT).to_string(),
        None => String::new(),
    }
}

/// Format a date as zero-padded `YYYY-MM-DD`
pub fn format_iso(date: NaiveDate) -> String {
    date.format(ISO_FORMAT).to_string()
}

/// Parse an ISO date
///
/// Accepts a bare `YYYY-MM-DD` as well as timestamps starting with one
/// (`2026-03-05T08:00:00`), since the backend is not consistent about it.
/// Years past 9999 use the signed form written by [`format_iso`] (`+10000-01-01`).
///
/// # Returns
/// * `Option<NaiveDate>` - The date, or `None` if the input is empty or malformed
pub fn parse_iso(input: &str) -> Option<NaiveDate> {
    let head = input.trim().split(['T', ' ']).next()?;
    NaiveDate::parse_from_str(head, ISO_FORMAT).ok()
}

fn month_start(year: i32, month0: u32) -> Option<NaiveDate> {
    if month0 > 11 {
        return None;
    }
    NaiveDate::from_ymd_opt(year, month0 + 1, 1)
}

/// Number of days in a month (`month0` is 0-based). Invalid months yield 0.
pub fn days_in_month(year: i32, month0: u32) -> u32 {
    let Some(first) = month_start(year, month0) else {
        return 0;
    };
    let next = if month0 == 11 {
        year.checked_add(1).and_then(|y| NaiveDate::from_ymd_opt(y, 1, 1))
    } else {
        NaiveDate::from_ymd_opt(year, month0 + 2, 1)
    };

    match next {
        Some(next) => (next - first).num_days() as u32,
        None => 0,
    }
}

/// Weekday of the first day of a month, 0 = Sunday
pub fn first_weekday_of_month(year: i32, month0: u32) -> u32 {
    month_start(year, month0)
        .map(|d| d.weekday().num_days_from_sunday())
        .unwrap_or(0)
}

/// Build the grid of a month
///
/// Emits `first_weekday_of_month` empty slots followed by one cell per day.
/// Laid out 7 per row, this gives a rectangular Sunday-first calendar.
///
/// # Arguments
/// * `year` - Calendar year
/// * `month0` - Month, 0-based (0 = January)
///
/// # Returns
/// * `Vec<Option<CalendarCell>>` - Padding slots as `None`, then the days in order
pub fn build_month_calendar(year: i32, month0: u32) -> Vec<Option<CalendarCell>> {
    let Some(first) = month_start(year, month0) else {
        return Vec::new();
    };
    let padding = first_weekday_of_month(year, month0) as usize;
    let days = days_in_month(year, month0);

    let mut calendar = Vec::with_capacity(padding + days as usize);
    calendar.extend(std::iter::repeat_n(None, padding));

    for day in 1..=days {
        if let Some(date) = first.with_day(day) {
            calendar.push(Some(CalendarCell { day, date }));
        }
    }

    calendar
}

/// Signed whole-day difference between `today` and `date`
///
/// Both sides are calendar days, so time of day never leaks into the result.
pub fn days_between(today: NaiveDate, date: NaiveDate) -> i64 {
    (date - today).num_days()
}

/// Days from the start of today until `date`, negative for past dates
pub fn days_until(date: NaiveDate) -> i64 {
    days_between(today(), date)
}

/// True iff `0 <= days_between(today, date) <= n`
pub fn is_within_days(today: NaiveDate, date: NaiveDate, n: i64) -> bool {
    let diff = days_between(today, date);
    (0..=n).contains(&diff)
}

/// [`is_within_days`] measured from the current local day
pub fn is_within_next_days(date: NaiveDate, n: i64) -> bool {
    is_within_days(today(), date, n)
}

pub fn is_today(date: NaiveDate) -> bool {
    date == today()
}

pub fn is_past(date: NaiveDate) -> bool {
    date < today()
}

/// Display name of a month (`month0` is 0-based)
pub fn month_label(month0: u32) -> &'static str {
    MONTH_LABELS.get(month0 as usize).copied().unwrap_or("")
}

/// Short weekday name, 0 = Sunday
pub fn weekday_label(index: usize) -> &'static str {
    WEEKDAY_LABELS.get(index).copied().unwrap_or("")
}
