use std::str::FromStr;
use std::sync::OnceLock;

use bigdecimal::{BigDecimal, Signed, ToPrimitive, Zero};
use chrono::NaiveDate;
use regex::Regex;
use thiserror::Error;

use crate::errors::AppError;
use crate::models::{ChangeOrigin, DailyPriceRecord, RawRow};

/// Scale applied to derived change percentages.
const PERCENT_SCALE: i64 = 4;

/// Longest numeric cell accepted, in characters after cleaning.
const MAX_NUMBER_LEN: usize = 32;

#[derive(Debug, Error, PartialEq)]
pub enum RecordError {
    #[error("invalid date '{0}', expected DD-MM-YYYY")]
    InvalidDate(String),

    #[error("invalid number '{value}' in column '{column}'")]
    InvalidNumber { column: String, value: String },

    #[error("negative value '{value}' in column '{column}'")]
    Negative { column: String, value: String },
}

impl From<RecordError> for AppError {
    fn from(value: RecordError) -> Self {
        AppError::MalformedRecord(value.to_string())
    }
}

/// Source column names for each canonical field, resolved once per batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnMapping {
    pub date: String,
    pub close: String,
    pub open: Option<String>,
    pub high: Option<String>,
    pub low: Option<String>,
    pub volume: Option<String>,
    pub change: Option<String>,
}

/// Resolve source headers to canonical fields.
///
/// Each field prefers a case-insensitive exact alias and falls back to the
/// first header containing one of its fragments. A header is claimed by at
/// most one field. Fields are claimed in a fixed order (date, change, open,
/// high, low, volume, close) so that e.g. "Open Price" or "Price Change" are
/// not mistaken for the close column. Fragments are tried in priority order;
/// among headers matching the same fragment the earliest in `headers` wins.
/// Either both date and close resolve or the whole mapping fails.
pub fn resolve_columns<'a, I>(headers: I) -> Result<ColumnMapping, AppError>
where
    I: IntoIterator<Item = &'a String>,
{
    let mut candidates: Vec<(String, String)> = headers
        .into_iter()
        .map(|h| (h.clone(), h.trim().to_lowercase()))
        .collect();

    let date = take_column(&mut candidates, &["date"], &["date"]);
    let change = take_column(&mut candidates, &["change", "change %", "chg%"], &["change", "chg", "%"]);
    let open = take_column(&mut candidates, &["open"], &["open"]);
    let high = take_column(&mut candidates, &["high"], &["high"]);
    let low = take_column(&mut candidates, &["low"], &["low"]);
    let volume = take_column(&mut candidates, &["volume", "vol."], &["vol"]);
    let close = take_column(&mut candidates, &["close", "price"], &["close", "price"]);

    match (date, close) {
        (Some(date), Some(close)) => Ok(ColumnMapping { date, close, open, high, low, volume, change }),
        (None, None) => Err(AppError::Schema("missing required date and close/price columns".to_string())),
        (None, _) => Err(AppError::Schema("missing required date column".to_string())),
        (_, None) => Err(AppError::Schema("missing required close/price column".to_string())),
    }
}

fn take_column(candidates: &mut Vec<(String, String)>, exact: &[&str], fragments: &[&str]) -> Option<String> {
    let position = candidates
        .iter()
        .position(|(_, lower)| exact.contains(&lower.as_str()))
        .or_else(|| {
            fragments
                .iter()
                .find_map(|f| candidates.iter().position(|(_, lower)| lower.contains(f)))
        })?;
    Some(candidates.remove(position).0)
}

/// Turn one raw row into a canonical record. Pure.
pub fn normalize_row(row: &RawRow, mapping: &ColumnMapping) -> Result<DailyPriceRecord, RecordError> {
    let date = parse_date(cell(row, Some(&mapping.date)))?;

    let close_price = parse_price(&mapping.close, cell(row, Some(&mapping.close)))?;
    let open_price = parse_optional_price(row, mapping.open.as_ref())?;
    let high_price = parse_optional_price(row, mapping.high.as_ref())?;
    let low_price = parse_optional_price(row, mapping.low.as_ref())?;

    let volume = match &mapping.volume {
        Some(column) => parse_volume(column, cell(row, Some(column)))?,
        None => None,
    };

    let source_percent = match &mapping.change {
        Some(column) => parse_percent(column, cell(row, Some(column)))?,
        None => None,
    };

    let change_amount = &close_price - &open_price;
    let (change_percent, change_origin) = match source_percent {
        Some(pct) => (Some(pct), ChangeOrigin::FromSource),
        None => derive_change_percent(&open_price, &change_amount),
    };

    Ok(DailyPriceRecord {
        date,
        open_price,
        high_price,
        low_price,
        close_price,
        volume,
        change_amount,
        change_percent,
        change_origin,
    })
}

/// `(close - open) / open * 100`, undefined for a zero open price.
pub fn derive_change_percent(
    open_price: &BigDecimal,
    change_amount: &BigDecimal,
) -> (Option<BigDecimal>, ChangeOrigin) {
    if open_price.is_zero() {
        return (None, ChangeOrigin::Undefined);
    }
    let pct = (change_amount / open_price) * BigDecimal::from(100);
    (Some(pct.round(PERCENT_SCALE)), ChangeOrigin::Derived)
}

fn cell<'a>(row: &'a RawRow, column: Option<&String>) -> &'a str {
    column
        .and_then(|c| row.get(c))
        .map(|s| s.as_str())
        .unwrap_or("")
}

/// Plain decimal text only: no exponents, no inf/nan.
fn decimal_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^-?\d+(\.\d+)?$").expect("valid decimal regex"))
}

fn date_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^(\d{1,2})-(\d{1,2})-(\d{4})$").expect("valid date regex"))
}

/// Parse a `DD-MM-YYYY` calendar date. Impossible dates fail instead of
/// rolling over into the next month.
pub fn parse_date(raw: &str) -> Result<NaiveDate, RecordError> {
    let trimmed = raw.trim().trim_matches('"');
    let invalid = || RecordError::InvalidDate(raw.to_string());

    let caps = date_pattern().captures(trimmed).ok_or_else(invalid)?;
    let day: u32 = caps[1].parse().map_err(|_| invalid())?;
    let month: u32 = caps[2].parse().map_err(|_| invalid())?;
    let year: i32 = caps[3].parse().map_err(|_| invalid())?;

    NaiveDate::from_ymd_opt(year, month, day).ok_or_else(invalid)
}

/// Strip thousands separators, quotes and surrounding whitespace.
pub fn clean_number(raw: &str) -> String {
    raw.chars()
        .filter(|c| !matches!(c, ',' | '"' | '\''))
        .collect::<String>()
        .trim()
        .to_string()
}

fn is_blank(cleaned: &str) -> bool {
    cleaned.is_empty() || cleaned == "-"
}

/// Blank price cells mean zero.
fn parse_price(column: &str, raw: &str) -> Result<BigDecimal, RecordError> {
    let cleaned = clean_number(raw);
    if is_blank(&cleaned) {
        return Ok(BigDecimal::zero());
    }
    let value = parse_decimal(column, raw, &cleaned)?;
    if value.is_negative() {
        return Err(RecordError::Negative {
            column: column.to_string(),
            value: raw.to_string(),
        });
    }
    Ok(value)
}

fn parse_optional_price(row: &RawRow, column: Option<&String>) -> Result<BigDecimal, RecordError> {
    match column {
        Some(c) => parse_price(c, cell(row, Some(c))),
        None => Ok(BigDecimal::zero()),
    }
}

/// Blank volume cells mean absent, not zero. Accepts K/M/B suffixes.
fn parse_volume(column: &str, raw: &str) -> Result<Option<i64>, RecordError> {
    let cleaned = clean_number(raw);
    if is_blank(&cleaned) {
        return Ok(None);
    }

    let (digits, multiplier) = match cleaned.chars().last().map(|c| c.to_ascii_uppercase()) {
        Some('K') => (&cleaned[..cleaned.len() - 1], 1_000i64),
        Some('M') => (&cleaned[..cleaned.len() - 1], 1_000_000),
        Some('B') => (&cleaned[..cleaned.len() - 1], 1_000_000_000),
        _ => (cleaned.as_str(), 1),
    };

    let value = parse_decimal(column, raw, digits.trim())? * BigDecimal::from(multiplier);
    if value.is_negative() {
        return Err(RecordError::Negative {
            column: column.to_string(),
            value: raw.to_string(),
        });
    }

    value
        .round(0)
        .to_i64()
        .map(Some)
        .ok_or_else(|| RecordError::InvalidNumber {
            column: column.to_string(),
            value: raw.to_string(),
        })
}

/// Source change column, e.g. "1.25%". A blank cell yields `None` so the
/// caller falls back to the derived form.
fn parse_percent(column: &str, raw: &str) -> Result<Option<BigDecimal>, RecordError> {
    let cleaned = clean_number(raw);
    let stripped = cleaned.strip_suffix('%').unwrap_or(&cleaned).trim();
    if is_blank(stripped) {
        return Ok(None);
    }
    parse_decimal(column, raw, stripped).map(Some)
}

fn parse_decimal(column: &str, raw: &str, cleaned: &str) -> Result<BigDecimal, RecordError> {
    let invalid = || RecordError::InvalidNumber {
        column: column.to_string(),
        value: raw.to_string(),
    };
    // Exponent notation would let a short cell expand into a huge scale
    if cleaned.len() > MAX_NUMBER_LEN || !decimal_pattern().is_match(cleaned) {
        return Err(invalid());
    }
    BigDecimal::from_str(cleaned).map_err(|_| invalid())
}
