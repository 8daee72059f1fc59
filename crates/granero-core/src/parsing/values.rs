use crate::parsing::tokens::storage_date;
use chrono::NaiveDate;
use rust_decimal::Decimal;
use std::str::FromStr;

const DATE_FORMATS: &[&str] = &["%d/%m/%Y", "%Y-%m-%d", "%d-%m-%Y", "%d.%m.%Y"];

/// Parse a report or form date: `dd/mm/yyyy`, `yyyy-mm-dd`, `dd-mm-yyyy`,
/// `dd.mm.yyyy` or the `06Apr2024` token shape. Only the first word is read.
pub fn parse_date_loose(s: &str) -> Option<NaiveDate> {
    let word = s.split_whitespace().next()?;
    DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(word, fmt).ok())
        .or_else(|| storage_date(word))
}

/// Parse an insect-count cell. Anything that is not a bare non-negative
/// integer yields `None`.
pub fn parse_count(s: &str) -> Option<u32> {
    let s = s.trim();
    if s.is_empty() || !s.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }
    s.parse().ok()
}

/// Parse a tonnage reading such as "1,250.5" or "980 t".
///
/// Thousands separators and non-numeric characters are stripped. When more
/// than one dot remains the dots are treated as thousands separators too
/// ("1.250.000"). Unparseable input yields zero.
pub fn parse_observation(s: &str) -> Decimal {
    parse_decimal_loose(s).unwrap_or(Decimal::ZERO)
}

/// Same cleanup as [`parse_observation`], returning `None` on failure.
pub fn parse_decimal_loose(s: &str) -> Option<Decimal> {
    let cleaned: String = s
        .trim()
        .chars()
        .filter(|c| c.is_ascii_digit() || *c == '.')
        .collect();
    let cleaned = if cleaned.matches('.').count() > 1 {
        cleaned.replace('.', "")
    } else {
        cleaned
    };
    if cleaned.is_empty() || cleaned == "." {
        return None;
    }
    Decimal::from_str(&cleaned).ok()
}
