//! # Text Processing Module
//!
//! This module provides the line-level helpers shared by the product identifier,
//! the field extractor and the nutrition parser: OCR cleanup, section header
//! detection, casing heuristics and product-name normalisation.

use lazy_static::lazy_static;
use log::{debug, trace};
use regex::Regex;

use crate::measurement_patterns::{MEASUREMENT_REGEX, NET_WEIGHT_REGEX, PERCENT_REGEX};

/// Words kept lowercase when title-casing a product name (unless first)
const CONNECTOR_WORDS: &[&str] = &[
    "a", "an", "and", "as", "at", "by", "for", "in", "of", "on", "or", "the", "to", "with",
];

/// Whole-word capitalisation fixes applied after title-casing
const BRAND_CAPITALIZATION: &[(&str, &str)] = &[
    ("Kelloggs", "Kellogg's"),
    ("Kellogg'S", "Kellogg's"),
    ("Special k", "Special K"),
    ("Cerave", "CeraVe"),
    ("Pca", "PCA"),
    ("Spf", "SPF"),
    ("Ha", "HA"),
    ("Bha", "BHA"),
    ("Aha", "AHA"),
    ("Rxbar", "RXBAR"),
    ("Kind", "KIND"),
    ("Mcdonald's", "McDonald's"),
    ("Oreo", "OREO"),
];

/// Section headers that never belong to a product title
const SECTION_HEADERS: &[&str] = &[
    "ingredients",
    "ingrédients",
    "nutrition facts",
    "nutrition information",
    "supplement facts",
    "directions",
    "how to use",
    "warning",
    "warnings",
    "caution",
    "allergen",
    "contains",
    "storage",
    "distributed by",
    "manufactured by",
    "serving size",
    "servings per",
    "amount per serving",
    "% daily value",
];

lazy_static! {
    static ref MULTI_SPACE_REGEX: Regex = Regex::new(r"\s+").expect("Whitespace pattern should be valid");
    static ref NON_PRODUCT_TOKEN_REGEX: Regex = Regex::new(
        r"(?i)\b(?:new|improved|net\s*wt|net\s*weight|family\s*size|value\s*pack|per\s*serving|servings?|ct)\b"
    )
    .expect("Non-product token pattern should be valid");
    static ref EDGE_PUNCTUATION_REGEX: Regex =
        Regex::new(r"^[^\p{L}\p{N}]+|[^\p{L}\p{N}'!+)%]+$").expect("Edge punctuation pattern should be valid");
    static ref BRAND_PATTERNS: Vec<(Regex, &'static str)> = BRAND_CAPITALIZATION
        .iter()
        .map(|(from, to)| {
            let pattern = format!(r"\b{}\b", regex::escape(from));
            (Regex::new(&pattern).expect("Brand pattern should be valid"), *to)
        })
        .collect();
}

/// Clean raw OCR output: trim every line and drop empty ones
pub fn clean_ocr_text(raw: &str) -> String {
    raw.trim()
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .collect::<Vec<&str>>()
        .join("\n")
}

/// Non-empty, trimmed lines of the text in order
pub fn non_empty_lines(text: &str) -> Vec<&str> {
    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .collect()
}

/// Collapse runs of whitespace into single spaces
pub fn collapse_whitespace(text: &str) -> String {
    MULTI_SPACE_REGEX.replace_all(text.trim(), " ").to_string()
}

pub fn count_commas(line: &str) -> usize {
    line.matches(',').count()
}

pub fn digit_count(line: &str) -> usize {
    line.chars().filter(char::is_ascii_digit).count()
}

pub fn has_letters(line: &str) -> bool {
    line.chars().any(char::is_alphabetic)
}

/// True when the line has both upper- and lowercase letters
pub fn has_mixed_case(line: &str) -> bool {
    line.chars().any(char::is_uppercase) && line.chars().any(char::is_lowercase)
}

/// True when every letter in the line is uppercase (and there is at least one)
pub fn is_all_caps(line: &str) -> bool {
    has_letters(line) && !line.chars().any(char::is_lowercase)
}

/// Count of characters that are neither alphanumeric, whitespace nor common name punctuation
pub fn special_char_count(line: &str) -> usize {
    line.chars()
        .filter(|c| !c.is_alphanumeric() && !c.is_whitespace() && !matches!(c, '\'' | '-' | '&' | '.' | '%' | '+'))
        .count()
}

/// Whether a line starts with (or is) a known label section header
pub fn is_section_header(line: &str) -> bool {
    let lower = line.trim().to_lowercase();
    SECTION_HEADERS.iter().any(|header| lower.starts_with(header))
}

/// Whether a line belongs to a nutrition or ingredient panel
pub fn is_panel_line(line: &str) -> bool {
    let lower = line.to_lowercase();
    is_section_header(line)
        || ["calories", "total fat", "sodium", "protein", "carbohydrate", "sugars", "cholesterol", "daily value"]
            .iter()
            .any(|kw| lower.contains(kw))
}

/// Count how many of the keywords occur in the (already lowercased) text
pub fn count_keyword_hits(lower_text: &str, keywords: &[&str]) -> usize {
    keywords.iter().filter(|kw| lower_text.contains(*kw)).count()
}

/// Title-case a name, keeping connector words lowercase except at the start
pub fn title_case(text: &str) -> String {
    text.split_whitespace()
        .enumerate()
        .map(|(i, word)| {
            let lower = word.to_lowercase();
            if i > 0 && CONNECTOR_WORDS.contains(&lower.as_str()) {
                return lower;
            }
            let mut chars = lower.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
                None => String::new(),
            }
        })
        .collect::<Vec<String>>()
        .join(" ")
}

/// Normalise a detected product name for display
///
/// Strips measurement and marketing tokens, collapses whitespace, title-cases
/// the remainder and applies whole-word brand capitalisation fixes.
pub fn clean_product_name(raw: &str) -> String {
    let without_net = NET_WEIGHT_REGEX.replace_all(raw, " ");
    let without_measurements = MEASUREMENT_REGEX.replace_all(&without_net, " ");
    let without_percent = PERCENT_REGEX.replace_all(&without_measurements, |caps: &regex::Captures| {
        caps[0].replace(' ', "")
    });
    let without_tokens = NON_PRODUCT_TOKEN_REGEX.replace_all(&without_percent, " ");
    let without_parens = without_tokens.replace("()", " ");
    let collapsed = collapse_whitespace(&without_parens);
    let trimmed = EDGE_PUNCTUATION_REGEX.replace_all(&collapsed, "").to_string();
    trace!("Product name cleanup: '{}' -> '{}'", raw, trimmed);

    let mut name = title_case(&trimmed);
    for (pattern, to) in BRAND_PATTERNS.iter() {
        if pattern.is_match(&name) {
            name = pattern.replace_all(&name, *to).into_owned();
        }
    }
    debug!("Cleaned product name: '{}'", name);
    name
}
