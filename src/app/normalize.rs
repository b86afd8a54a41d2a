use std::sync::LazyLock;

use chrono::NaiveDate;
use rand::{Rng, distributions::Alphanumeric};
use regex::Regex;
use rust_decimal::Decimal;

static NON_ALNUM: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^a-z0-9]+").expect("invalid header regex"));

/// Canonicalizes an uploaded column header: lowercase, accents stripped,
/// any run of punctuation or whitespace collapsed to a single underscore.
/// "Ponderazione (%)" becomes "ponderazione", "Quantità" becomes "quantita".
pub fn normalize_header(raw: &str) -> String {
    let lowered: String = raw.to_lowercase().chars().map(strip_accent).collect();
    NON_ALNUM
        .replace_all(&lowered, "_")
        .trim_matches('_')
        .to_string()
}

fn strip_accent(c: char) -> char {
    match c {
        'à' | 'á' | 'â' | 'ä' => 'a',
        'è' | 'é' | 'ê' | 'ë' => 'e',
        'ì' | 'í' | 'î' | 'ï' => 'i',
        'ò' | 'ó' | 'ô' | 'ö' => 'o',
        'ù' | 'ú' | 'û' | 'ü' => 'u',
        'ç' => 'c',
        'ñ' => 'n',
        _ => c,
    }
}

/// Parses a number that may use a comma decimal separator and thousands
/// separators ("1.234,56", "1,234.56", "1234,56"). Empty or unparseable
/// input yields `None` rather than an error.
pub fn parse_decimal_lenient(raw: &str) -> Option<Decimal> {
    let trimmed = raw.trim();
    if trimmed.is_empty() || trimmed == "-" {
        return None;
    }

    let comma = trimmed.rfind(',');
    let dot = trimmed.rfind('.');
    let cleaned = match (comma, dot) {
        // Both present: the rightmost one is the decimal separator.
        (Some(c), Some(d)) if c > d => trimmed.replace('.', "").replace(',', "."),
        (Some(_), Some(_)) => trimmed.replace(',', ""),
        (Some(_), None) => trimmed.replace(',', "."),
        _ => trimmed.to_string(),
    };

    cleaned.parse::<Decimal>().ok()
}

const DATE_FORMATS: [&str; 3] = ["%Y-%m-%d", "%d/%m/%Y", "%d-%m-%Y"];

/// Parses a calendar date in ISO or day-month-year notation.
pub fn parse_date_lenient(raw: &str) -> Option<NaiveDate> {
    let trimmed = raw.trim();
    DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(trimmed, fmt).ok())
}

/// Single display format for dates across all reports.
pub fn format_date(date: &NaiveDate) -> String {
    date.format("%d/%m/%Y").to_string()
}

/// Renders "€1,234.56"-style amounts for report output.
pub fn format_currency(value: Decimal, symbol: &str) -> String {
    let rounded = value.round_dp(2).abs();
    let as_text = format!("{:.2}", rounded);
    let (int_part, frac_part) = as_text.split_once('.').unwrap_or((as_text.as_str(), "00"));

    let mut grouped = String::new();
    for (i, c) in int_part.chars().rev().enumerate() {
        if i > 0 && i % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(c);
    }
    let int_grouped: String = grouped.chars().rev().collect();

    let sign = if value.is_sign_negative() { "-" } else { "" };
    format!("{sign}{symbol}{int_grouped}.{frac_part}")
}

pub fn validate_isin(isin: &str) -> bool {
    isin.len() == 12 && isin.chars().all(|c| c.is_ascii_alphanumeric())
}

/// Short random token used as the order reference of a manually entered
/// transaction, so manual and imported rows share one dedup key shape.
pub fn new_order_reference() -> String {
    let token: String = rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(8)
        .map(char::from)
        .collect();
    token.to_uppercase()
}
