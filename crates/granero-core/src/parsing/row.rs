use crate::model::{Muestra, PestCounts, Sample, COUNT_FIELDS};
use crate::parsing::tokens::{is_date_token, is_grain_type, is_small_int, small_int, storage_date};
use crate::parsing::values::{parse_count, parse_observation};
use regex::Regex;
use std::sync::LazyLock;
use tracing::debug;

/// Rows shorter than this cannot carry the count columns.
pub const MIN_ROW_TOKENS: usize = 10;

/// How far past the grain-type column a storage date may have drifted.
const DATE_LOOKAHEAD: usize = 3;

static SILO_CODE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(?:AP-\d+|[A-Za-z]{1,3}-\d+)$").expect("valid regex"));

/// True for silo codes such as `AP-01` or `B-3`.
pub fn is_silo_code(token: &str) -> bool {
    SILO_CODE.is_match(token.trim())
}

/// Tokenize and parse a single report line.
pub fn parse_line(line: &str) -> Option<Sample> {
    let tokens: Vec<&str> = line.split_whitespace().collect();
    parse_row(&tokens)
}

/// Parse one tokenized report row into a sample.
///
/// Ship name and grain type are free text of variable width, so the walk
/// stops the ship name at the first grain code, date or small integer and
/// then looks a few tokens ahead for the date. Counts are positional and the
/// tonnage is always the last token. Returns `None` when the row cannot be
/// read; the caller moves on to the next line.
pub fn parse_row(tokens: &[&str]) -> Option<Sample> {
    if tokens.len() < MIN_ROW_TOKENS {
        debug!(tokens = tokens.len(), "row dropped: too few tokens");
        return None;
    }

    let silo = tokens[0];
    if !is_silo_code(silo) {
        debug!(silo, "row dropped: first token is not a silo code");
        return None;
    }

    // A silo sub-label sometimes lands between the code and the position.
    let (muestra, mut i) = match Muestra::from_str_loose(tokens[1]) {
        Some(m) => (m, 2),
        None => match Muestra::from_str_loose(tokens[2]) {
            Some(m) => (m, 3),
            None => {
                debug!(silo, "row dropped: no Arriba/Abajo position");
                return None;
            }
        },
    };

    // The observation column is read from the end, never walked into.
    let body = &tokens[..tokens.len() - 1];

    let mut ship_parts: Vec<&str> = Vec::new();
    while let Some(tok) = body.get(i) {
        if is_grain_type(tok) || is_date_token(tok) || is_small_int(tok) {
            break;
        }
        ship_parts.push(*tok);
        i += 1;
    }

    let mut rest: Vec<&str> = body.get(i..).unwrap_or_default().to_vec();

    let mut grain_type = String::new();
    match rest.first() {
        Some(tok) if !is_date_token(tok) && !is_small_int(tok) => {
            grain_type = rest.remove(0).to_string();
        }
        Some(_) => {
            if rest.get(1).is_some_and(|next| is_grain_word(next)) {
                grain_type = rest.remove(1).to_string();
            }
        }
        None => {}
    }

    let mut date = None;
    let mut early_days = None;
    if let Some(pos) = rest
        .iter()
        .take(DATE_LOOKAHEAD)
        .position(|t| is_date_token(t))
    {
        early_days = rest[..pos].iter().find_map(|t| small_int(t));
        date = storage_date(rest[pos]);
        rest.drain(..=pos);
    }

    let days_stored = match early_days {
        Some(d) => d,
        None => match rest.first() {
            Some(tok) => match small_int(tok) {
                Some(d) => {
                    rest.remove(0);
                    d
                }
                // "-" in the days column, with all the counts still after it.
                None if is_placeholder(tok) && rest.len() > COUNT_FIELDS => {
                    rest.remove(0);
                    0
                }
                None => 0,
            },
            None => 0,
        },
    };

    let mut fields = [0u32; COUNT_FIELDS];
    for (slot, tok) in fields.iter_mut().zip(rest.iter()) {
        *slot = parse_count(tok).unwrap_or(0);
    }

    let observation = parse_observation(tokens[tokens.len() - 1]);

    Some(Sample {
        silo: silo.to_string(),
        muestra,
        ship: ship_parts.join(" "),
        grain_type,
        storage_date: date,
        days_stored,
        counts: PestCounts::from_fields(fields),
        observation,
    })
}

/// Free text that can stand in the grain column: has a letter, is no date.
fn is_grain_word(token: &str) -> bool {
    token.chars().any(char::is_alphabetic) && !is_date_token(token)
}

fn is_placeholder(token: &str) -> bool {
    !token.is_empty() && !token.chars().any(char::is_alphanumeric)
}
