use chrono::{DateTime, NaiveDate, NaiveDateTime};
use once_cell::sync::Lazy;
use regex::{Captures, Regex};

const DATETIME_FORMATS: &[&str] = &["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M"];

// Day/month ambiguity in numeric dates resolves month-first.
const DATE_FORMATS: &[&str] = &[
    "%Y-%m-%d",
    "%Y/%m/%d",
    "%d %B %Y",
    "%d %B, %Y",
    "%B %d, %Y",
    "%B %d %Y",
    "%a, %d %B %Y",
    "%A, %d %B %Y",
    "%m/%d/%Y",
];

const MONTH: &str = r"(jan(?:uary)?|feb(?:ruary)?|mar(?:ch)?|apr(?:il)?|may|june?|july?|aug(?:ust)?|sep(?:t(?:ember)?)?|oct(?:ober)?|nov(?:ember)?|dec(?:ember)?)\.?";

static DAY_MONTH_YEAR: Lazy<Regex> = Lazy::new(|| {
    Regex::new(&format!(r"(?i)\b(\d{{1,2}})(?:st|nd|rd|th)?\s+{MONTH},?\s+(\d{{4}})\b")).unwrap()
});
static MONTH_DAY_YEAR: Lazy<Regex> = Lazy::new(|| {
    Regex::new(&format!(r"(?i)\b{MONTH}\s+(\d{{1,2}})(?:st|nd|rd|th)?,?\s+(\d{{4}})\b")).unwrap()
});
static YEAR_MONTH_DAY: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b(\d{4})[-/](\d{1,2})[-/](\d{1,2})\b").unwrap());
static MONTH_DAY_YEAR_NUMERIC: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b(\d{1,2})/(\d{1,2})/(\d{4})\b").unwrap());
static ISO_FALLBACK: Lazy<Regex> = Lazy::new(|| Regex::new(r"\d{4}-\d{2}-\d{2}").unwrap());

/// Normalise a free-form date to `YYYY-MM-DD`.
///
/// Tries strict feed formats (RFC 3339, RFC 2822, a handful of common layouts), then looks for a
/// date anywhere inside the text. If nothing parses, a literal `YYYY-MM-DD` substring is returned
/// as-is, and failing that the input comes back unchanged. The calendar date is taken as written;
/// no timezone conversion happens.
pub fn normalize_date(input: &str) -> String {
    if input.is_empty() {
        return String::new();
    }

    if let Some(date) = parse_strict(input.trim()).or_else(|| parse_fuzzy(input)) {
        return date.format("%Y-%m-%d").to_string();
    }

    match ISO_FALLBACK.find(input) {
        Some(m) => m.as_str().to_string(),
        None => input.to_string(),
    }
}

fn parse_strict(t: &str) -> Option<NaiveDate> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(t) {
        return Some(dt.date_naive());
    }
    if let Ok(dt) = DateTime::parse_from_rfc2822(t) {
        return Some(dt.date_naive());
    }
    DATETIME_FORMATS
        .iter()
        .find_map(|f| NaiveDateTime::parse_from_str(t, f).ok().map(|dt| dt.date()))
        .or_else(|| {
            DATE_FORMATS
                .iter()
                .find_map(|f| NaiveDate::parse_from_str(t, f).ok())
        })
}

/// Find the earliest plausible date embedded in surrounding text.
fn parse_fuzzy(t: &str) -> Option<NaiveDate> {
    let mut candidates: Vec<(usize, NaiveDate)> = Vec::new();

    let mut scan = |re: &Regex, build: fn(&Captures<'_>) -> Option<NaiveDate>| {
        if let Some((start, date)) = re
            .captures_iter(t)
            .find_map(|c| build(&c).map(|d| (c.get(0).map_or(0, |m| m.start()), d)))
        {
            candidates.push((start, date));
        }
    };

    scan(&DAY_MONTH_YEAR, |c| ymd(&c[3], month_number(&c[2])?, &c[1]));
    scan(&MONTH_DAY_YEAR, |c| ymd(&c[3], month_number(&c[1])?, &c[2]));
    scan(&YEAR_MONTH_DAY, |c| ymd(&c[1], c[2].parse().ok()?, &c[3]));
    scan(&MONTH_DAY_YEAR_NUMERIC, |c| ymd(&c[3], c[1].parse().ok()?, &c[2]));

    candidates.into_iter().min_by_key(|(start, _)| *start).map(|(_, d)| d)
}

fn ymd(year: &str, month: u32, day: &str) -> Option<NaiveDate> {
    NaiveDate::from_ymd_opt(year.parse().ok()?, month, day.parse().ok()?)
}

fn month_number(name: &str) -> Option<u32> {
    let head = name.get(..3)?.to_ascii_lowercase();
    Some(match head.as_str() {
        "jan" => 1,
        "feb" => 2,
        "mar" => 3,
        "apr" => 4,
        "may" => 5,
        "jun" => 6,
        "jul" => 7,
        "aug" => 8,
        "sep" => 9,
        "oct" => 10,
        "nov" => 11,
        "dec" => 12,
        _ => return None,
    })
}
