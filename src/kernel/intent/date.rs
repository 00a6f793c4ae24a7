use chrono::{Datelike, NaiveDate};

/// German month names as the recognizer spells them.
const MONTHS: [(&str, u32); 14] = [
    ("januar", 1),
    ("jänner", 1),
    ("februar", 2),
    ("märz", 3),
    ("maerz", 3),
    ("april", 4),
    ("mai", 5),
    ("juni", 6),
    ("juli", 7),
    ("august", 8),
    ("september", 9),
    ("oktober", 10),
    ("november", 11),
    ("dezember", 12),
];

const NUMERIC_FORMATS: [&str; 4] = ["%Y-%m-%d", "%d.%m.%Y", "%Y/%m/%d", "%d/%m/%Y"];

/// "1.5.24" style dates. Two-digit years map to 1969..2068.
const SHORT_YEAR_FORMATS: [&str; 2] = ["%d.%m.%y", "%d/%m/%y"];

/// `%Y` also accepts "24"; such years are read as short years instead.
const MIN_FULL_YEAR: i32 = 1000;

/// Parses a spoken date token for the de-DE locale.
///
/// Accepts ISO dates, dotted German dates (also with two-digit years) and
/// "1. Mai 2024". Anything else,
/// including impossible calendar dates such as 31.02., yields `None`.
pub fn parse_date(token: &str) -> Option<NaiveDate> {
    let token = token.trim().trim_end_matches('.').to_lowercase();
    if token.is_empty() {
        return None;
    }

    if let Some(date) = NUMERIC_FORMATS
        .iter()
        .filter_map(|format| NaiveDate::parse_from_str(&token, format).ok())
        .find(|date| date.year() >= MIN_FULL_YEAR)
    {
        return Some(date);
    }

    if let Some(date) = SHORT_YEAR_FORMATS
        .iter()
        .find_map(|format| NaiveDate::parse_from_str(&token, format).ok())
    {
        return Some(date);
    }

    parse_spelled(&token)
}

fn parse_spelled(token: &str) -> Option<NaiveDate> {
    let mut parts = token.split_whitespace();
    let day: u32 = parts.next()?.trim_end_matches('.').parse().ok()?;
    let month_word = parts.next()?;
    let year: i32 = parts.next()?.parse().ok()?;
    if parts.next().is_some() {
        return None;
    }

    let month = MONTHS
        .iter()
        .find(|(name, _)| *name == month_word)
        .map(|(_, number)| *number)?;

    NaiveDate::from_ymd_opt(year, month, day)
}
