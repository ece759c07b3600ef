use chrono::{DateTime, Datelike, Duration, NaiveDate, Utc};
use once_cell::sync::Lazy;
use regex::Regex;

static PATTERNS: Lazy<[Regex; 4]> = Lazy::new(|| {
    [
        Regex::new(r"(?P<y>\d{4})-(?P<m>\d{2})-(?P<d>\d{2})").unwrap(),
        Regex::new(r"(?P<y>\d{4})\.(?P<m>\d{2})\.(?P<d>\d{2})").unwrap(),
        Regex::new(r"(?P<y>\d{4})/(?P<m>\d{2})/(?P<d>\d{2})").unwrap(),
        Regex::new(r"(?P<y>\d{4})(?P<m>\d{2})(?P<d>\d{2})").unwrap(),
    ]
});

static PATTERN_YYMMDD: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?:^|[^0-9])(?P<y>\d{2})(?P<m>\d{2})(?P<d>\d{2})(?:[^0-9]|$)").unwrap());

fn safe_date(y: i32, m: u32, d: u32) -> Option<NaiveDate> {
    NaiveDate::from_ymd_opt(y, m, d)
}

/// Infers the century for a two-digit year relative to the ingestion year:
/// prefer the current/previous century's closest match, then roll back a
/// century if that still lands more than ~1 year in the future.
fn infer_century(two_digit_year: i32, ingested_at: DateTime<Utc>) -> i32 {
    let base = ingested_at.year() % 100;
    let mut year = if two_digit_year <= base + 1 {
        2000 + two_digit_year
    } else {
        1900 + two_digit_year
    };
    let candidate = NaiveDate::from_ymd_opt(year, 1, 1).unwrap();
    let future_bound = (ingested_at + Duration::days(365)).date_naive();
    if candidate > future_bound {
        year -= 100;
    }
    year
}

/// Tries every supported date format against free text, in the fixed order
/// from spec §4.2 step 3: `YYYY-MM-DD`, `YYYY.MM.DD`, `YYYY/MM/DD`,
/// `YYYYMMDD`, then `YYMMDD` with century inference.
pub fn parse_event_date_from_text(text: Option<&str>, ingested_at: DateTime<Utc>) -> Option<NaiveDate> {
    let text = text?;
    if text.is_empty() {
        return None;
    }

    for pattern in PATTERNS.iter() {
        if let Some(caps) = pattern.captures(text) {
            let y: i32 = caps["y"].parse().ok()?;
            let m: u32 = caps["m"].parse().ok()?;
            let d: u32 = caps["d"].parse().ok()?;
            if let Some(date) = safe_date(y, m, d) {
                return Some(date);
            }
        }
    }

    if let Some(caps) = PATTERN_YYMMDD.captures(text) {
        let yy: i32 = caps["y"].parse().ok()?;
        let m: u32 = caps["m"].parse().ok()?;
        let d: u32 = caps["d"].parse().ok()?;
        let y = infer_century(yy, ingested_at);
        return safe_date(y, m, d);
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(y: i32, m: u32, d: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, 0, 0, 0).unwrap()
    }

    #[test]
    fn parses_iso_dashed_date() {
        let result = parse_event_date_from_text(Some("보고서 2026-02-24"), at(2026, 2, 24));
        assert_eq!(result, NaiveDate::from_ymd_opt(2026, 2, 24));
    }

    #[test]
    fn parses_dotted_and_slashed_and_compact() {
        let now = at(2026, 1, 1);
        assert_eq!(
            parse_event_date_from_text(Some("2026.02.24"), now),
            NaiveDate::from_ymd_opt(2026, 2, 24)
        );
        assert_eq!(
            parse_event_date_from_text(Some("2026/02/24"), now),
            NaiveDate::from_ymd_opt(2026, 2, 24)
        );
        assert_eq!(
            parse_event_date_from_text(Some("20260224"), now),
            NaiveDate::from_ymd_opt(2026, 2, 24)
        );
    }

    #[test]
    fn infers_century_for_two_digit_year_without_overshoot() {
        // Ingested in 2026; "260224" should resolve to 2026-02-24, not 2126.
        let result = parse_event_date_from_text(Some("rev.260224"), at(2026, 6, 1));
        assert_eq!(result, NaiveDate::from_ymd_opt(2026, 2, 24));
    }

    #[test]
    fn returns_none_for_text_with_no_date() {
        assert_eq!(parse_event_date_from_text(Some("무관한 내용"), at(2026, 1, 1)), None);
        assert_eq!(parse_event_date_from_text(None, at(2026, 1, 1)), None);
    }

    #[test]
    fn rejects_impossible_calendar_dates() {
        assert_eq!(parse_event_date_from_text(Some("2026-13-40"), at(2026, 1, 1)), None);
    }
}
