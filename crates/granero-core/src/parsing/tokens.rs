use chrono::NaiveDate;
use regex::Regex;
use std::sync::LazyLock;

/// Grain codes that appear in the grain-type column of inspection reports.
const GRAIN_CODES: &[&str] = &[
    "HRW", "SRW", "SWW", "HRS", "HAD", "DNS", "CWRS", "YC", "YSB", "SBM", "DDGS", "MAIZ", "TRIGO",
    "SOYA", "SORGO", "CEBADA", "ARROZ", "AVENA",
];

const MONTHS: [&str; 12] = [
    "jan", "feb", "mar", "apr", "may", "jun", "jul", "aug", "sep", "oct", "nov", "dec",
];

static DATE_TOKEN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(\d{1,2})([A-Za-z]{3})(\d{4})$").expect("valid regex"));

static BARE_CODE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z]{2,4}$").expect("valid regex"));

/// True for `06Apr2024`-shaped tokens. A token without the year is not a date.
pub fn is_date_token(token: &str) -> bool {
    DATE_TOKEN.is_match(token.trim())
}

/// True for whitelisted grain codes, or any bare 2-4 letter code that is not a date.
pub fn is_grain_type(token: &str) -> bool {
    let token = token.trim();
    if token.is_empty() {
        return false;
    }
    if GRAIN_CODES.iter().any(|c| c.eq_ignore_ascii_case(token)) {
        return true;
    }
    BARE_CODE.is_match(token) && !is_date_token(token)
}

/// True for a bare integer in `[0, 1000)`, the shape of a days-stored column.
pub fn is_small_int(token: &str) -> bool {
    small_int(token).is_some()
}

pub fn small_int(token: &str) -> Option<u32> {
    let token = token.trim();
    if token.is_empty() || !token.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }
    token.parse::<u32>().ok().filter(|n| *n < 1000)
}

/// Parse a `06Apr2024` token into a date.
pub fn storage_date(token: &str) -> Option<NaiveDate> {
    let caps = DATE_TOKEN.captures(token.trim())?;
    let day: u32 = caps[1].parse().ok()?;
    let month_abbr = caps[2].to_lowercase();
    let month = MONTHS.iter().position(|m| *m == month_abbr)? as u32 + 1;
    let year: i32 = caps[3].parse().ok()?;
    NaiveDate::from_ymd_opt(year, month, day)
}

/// Convert a `06Apr2024` token to `2024-04-06`. Returns an empty string when
/// the token is not a valid date.
pub fn parse_storage_date(token: &str) -> String {
    storage_date(token)
        .map(|d| d.format("%Y-%m-%d").to_string())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_date_token() {
        assert!(is_date_token("06Apr2024"));
        assert!(is_date_token("6apr2024"));
        assert!(!is_date_token("31Mar"));
        assert!(!is_date_token("Malta"));
        assert!(!is_date_token("2024-04-06"));
        assert!(!is_date_token("06April2024"));
    }

    #[test]
    fn test_parse_storage_date() {
        assert_eq!(parse_storage_date("25Dec2024"), "2024-12-25");
        assert_eq!(parse_storage_date("06Apr2024"), "2024-04-06");
        assert_eq!(parse_storage_date("1JAN2023"), "2023-01-01");
    }

    #[test]
    fn test_parse_storage_date_rejects_garbage() {
        assert_eq!(parse_storage_date(""), "");
        assert_eq!(parse_storage_date("31Mar"), "");
        assert_eq!(parse_storage_date("12Foo2024"), "");
        assert_eq!(parse_storage_date("31Feb2024"), "");
    }

    #[test]
    fn test_is_grain_type() {
        assert!(is_grain_type("HRW"));
        assert!(is_grain_type("trigo"));
        assert!(is_grain_type("CWRS"));
        assert!(is_grain_type("YC"));
        assert!(is_grain_type("ABC"));
        assert!(!is_grain_type(""));
        assert!(!is_grain_type("MALTA"));
        assert!(!is_grain_type("06Apr2024"));
        assert!(!is_grain_type("12"));
        assert!(!is_grain_type("A"));
    }

    #[test]
    fn test_small_int() {
        assert_eq!(small_int("0"), Some(0));
        assert_eq!(small_int("45"), Some(45));
        assert_eq!(small_int("999"), Some(999));
        assert_eq!(small_int("1000"), None);
        assert_eq!(small_int("-3"), None);
        assert_eq!(small_int("1,5"), None);
        assert!(!is_small_int("TRIGO"));
    }
}
