//! Lenient cell parsers used by the normalizer.
//!
//! Every parser returns `Option`: a cell that cannot be interpreted is a
//! recoverable defect, never an error.

use chrono::{Datelike, Days, NaiveDate, NaiveDateTime, NaiveTime};

use crate::domain::RawCell;

/// Date-only layouts, day-first. ISO is unambiguous and accepted as well.
const DATE_FMTS: [&str; 5] = ["%d/%m/%Y", "%d-%m-%Y", "%d.%m.%Y", "%Y-%m-%d", "%Y/%m/%d"];

/// Date+time layouts (stores and some exports keep a midnight time component).
const DATETIME_FMTS: [&str; 6] = [
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S",
    "%d/%m/%Y %H:%M:%S",
    "%d/%m/%Y %H:%M",
    "%d-%m-%Y %H:%M:%S",
];

const TIME_FMTS: [&str; 6] = ["%H:%M:%S", "%H:%M", "%H:%M:%S%.f", "%Hh%M", "%I:%M %p", "%I:%M:%S %p"];

/// Largest serial a spreadsheet will produce (9999-12-31).
const MAX_SERIAL: f64 = 2_958_465.0;

/// Parse a date cell with day-first interpretation.
pub fn parse_date_cell(cell: &RawCell) -> Option<NaiveDate> {
    match cell {
        RawCell::Empty => None,
        RawCell::DateTime(dt) => Some(dt.date()),
        RawCell::Number(v) => serial_to_date(*v),
        RawCell::Text(s) => parse_day_first_date(s),
    }
}

/// Parse free text as a day-first date (`01/02/2026` is the 1st of February).
///
/// Two-digit years are read as 20xx.
pub fn parse_day_first_date(s: &str) -> Option<NaiveDate> {
    let s = s.trim();
    if s.is_empty() {
        return None;
    }

    let parsed = DATE_FMTS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(s, fmt).ok())
        .or_else(|| {
            DATETIME_FMTS
                .iter()
                .find_map(|fmt| NaiveDateTime::parse_from_str(s, fmt).ok())
                .map(|dt| dt.date())
        })?;

    if (0..100).contains(&parsed.year()) {
        return parsed.with_year(2000 + parsed.year());
    }
    Some(parsed)
}

/// Spreadsheet serial day number (1900 date system) to a calendar date.
fn serial_to_date(v: f64) -> Option<NaiveDate> {
    if !v.is_finite() || !(1.0..=MAX_SERIAL).contains(&v) {
        return None;
    }
    NaiveDate::from_ymd_opt(1899, 12, 30)?.checked_add_days(Days::new(v.floor() as u64))
}

/// Render a time cell as text, the way it is kept in the `Heure` column.
pub fn time_text(cell: &RawCell) -> String {
    match cell {
        RawCell::Empty => String::new(),
        RawCell::Text(s) => s.trim().to_string(),
        RawCell::Number(v) if (0.0..1.0).contains(v) => day_fraction_to_time(*v)
            .map(|t| t.format("%H:%M:%S").to_string())
            .unwrap_or_default(),
        RawCell::Number(_) => cell.to_text().unwrap_or_default(),
        RawCell::DateTime(dt) => dt.time().format("%H:%M:%S").to_string(),
    }
}

fn day_fraction_to_time(v: f64) -> Option<NaiveTime> {
    let secs = (v * 86_400.0).round() as u32 % 86_400;
    NaiveTime::from_num_seconds_from_midnight_opt(secs, 0)
}

/// Lenient time-of-day parser (`14:30`, `14:30:05`, `14h30`, `14h`, `2:30 PM`).
pub fn parse_time_of_day(s: &str) -> Option<NaiveTime> {
    let s = s.trim();
    if s.is_empty() {
        return None;
    }
    let lowered = s.to_lowercase();

    if let Some(t) = TIME_FMTS
        .iter()
        .find_map(|fmt| NaiveTime::parse_from_str(&lowered, fmt).ok())
    {
        return Some(t);
    }

    // Bare hour, e.g. "14h".
    let hour = lowered.strip_suffix('h')?.trim().parse::<u32>().ok()?;
    NaiveTime::from_hms_opt(hour, 0, 0)
}

/// Parse a monetary cell. Accepts `1 234,50 $`, `1,234.50`, `12.5`.
pub fn parse_value(cell: &RawCell) -> Option<f64> {
    let v = match cell {
        RawCell::Number(v) => *v,
        RawCell::Text(s) => parse_money_text(s)?,
        RawCell::Empty | RawCell::DateTime(_) => return None,
    };
    if v.is_finite() { Some(v) } else { None }
}

fn parse_money_text(s: &str) -> Option<f64> {
    let cleaned: String = s
        .chars()
        .filter(|c| !c.is_whitespace() && !matches!(c, '$' | '€' | '\u{a0}' | '\u{202f}'))
        .collect();
    if cleaned.is_empty() {
        return None;
    }

    let normalized = match (cleaned.contains(','), cleaned.contains('.')) {
        (true, false) => cleaned.replace(',', "."),
        (true, true) => cleaned.replace(',', ""),
        _ => cleaned,
    };
    normalized.parse::<f64>().ok()
}
