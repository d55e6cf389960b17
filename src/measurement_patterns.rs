//! # Measurement Patterns Module
//!
//! This module contains regex patterns used to recognise package measurements
//! and numeric noise on label lines.

use lazy_static::lazy_static;
use regex::Regex;

// Quantity followed by a package or nutrition unit (e.g. "12 oz", "340g", "1.7 fl oz", "30 mL")
pub const MEASUREMENT_PATTERN: &str = r"(?i)\b\d+(?:[.,]\d+)?\s*(?:fl\.?\s*oz|oz|ounces?|lbs?|pounds?|mg|mcg|kg|g|grams?|ml|l|liters?|litres?|kcal|cal|ct|count|pack|pk|servings?)\b\.?";

// Net-weight style prefixes that introduce a package measurement
pub const NET_WEIGHT_PATTERN: &str = r"(?i)\b(?:net\s*wt\.?|net\s*weight|net\s*contents?|contenu\s*net)\b";

// Lines that are nothing but numbers, punctuation and unit tokens
pub const PURE_NUMBER_PATTERN: &str = r"^[\d\s.,%/()\-+*]+$";

// Percentages such as "10%" or "1 %"
pub const PERCENT_PATTERN: &str = r"\d+(?:[.,]\d+)?\s*%";

lazy_static! {
    pub static ref MEASUREMENT_REGEX: Regex =
        Regex::new(MEASUREMENT_PATTERN).expect("Measurement pattern should be valid");
    pub static ref NET_WEIGHT_REGEX: Regex =
        Regex::new(NET_WEIGHT_PATTERN).expect("Net weight pattern should be valid");
    pub static ref PURE_NUMBER_REGEX: Regex =
        Regex::new(PURE_NUMBER_PATTERN).expect("Pure number pattern should be valid");
    pub static ref PERCENT_REGEX: Regex =
        Regex::new(PERCENT_PATTERN).expect("Percent pattern should be valid");
}

/// Whether the line is only a measurement, possibly with a net-weight prefix
pub fn is_measurement_line(line: &str) -> bool {
    let stripped = NET_WEIGHT_REGEX.replace_all(line, "");
    let stripped = MEASUREMENT_REGEX.replace_all(&stripped, "");
    let rest = stripped.trim_matches(|c: char| !c.is_alphanumeric());
    rest.is_empty() && MEASUREMENT_REGEX.is_match(line)
}
