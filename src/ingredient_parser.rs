//! # Ingredient Parser
//!
//! Splits a raw ingredient panel into individual ingredient names.
//!
//! ## Features
//!
//! - Splitter cascade: comma, semicolon, period, multi-space, newline, single space
//! - Separators inside parentheses or brackets never split an ingredient
//! - Token filtering (length, numbers, stopwords, warning and allergen phrases)
//! - Chemical-suffix aware retry for panels OCR flattened into one run of words
//!
//! ## Usage
//!
//! ```rust
//! use scan_it_know_it::ingredient_parser::parse_ingredient_list;
//!
//! let parsed = parse_ingredient_list("Whole Grain Oats, Sugar, Canola Oil");
//! assert_eq!(parsed, vec!["Whole Grain Oats", "Sugar", "Canola Oil"]);
//! ```

use log::{debug, trace};
use regex::Regex;
use std::sync::LazyLock;

use crate::measurement_patterns::PURE_NUMBER_REGEX;

/// Maximum number of ingredients kept from one panel
pub const MAX_INGREDIENTS: usize = 40;
const MIN_TOKEN_LENGTH: usize = 2;
const MAX_TOKEN_LENGTH: usize = 100;
/// Panels at least this long that yield fewer than 3 tokens get the chemical retry
const LONG_PANEL_LENGTH: usize = 40;

static PERIOD_SPLIT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\.\s+|\.$").expect("Period split pattern should be valid"));
static MULTI_SPACE_SPLIT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[ \t]{2,}").expect("Multi-space split pattern should be valid"));
static LABEL_PREFIX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^\s*(?:ingr[eé]dients?|ingredient list|composition)\s*[:;.\-]?\s*")
        .expect("Label prefix pattern should be valid")
});
static LEADING_CONNECTOR: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^(?:and|&|or|contains\s+\d+%?\s+or\s+less\s+of:?|contains\s+less\s+than\s+\d+%\s+of:?)\s+")
        .expect("Leading connector pattern should be valid")
});
static CHEMICAL_NAME: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)\b(?:[a-z0-9-]+\s+){0,2}[a-z0-9-]*(?:ate|ide|ine|ol|one|ene|ose|ium|acid|glycol|pca|gum|extract|oil)\b",
    )
    .expect("Chemical name pattern should be valid")
});

/// Single words that are never ingredients on their own
const STOPWORDS: &[&str] = &[
    "and", "or", "the", "of", "with", "in", "a", "an", "to", "for", "from", "contains", "ingredients",
    "ingredient", "less", "than", "made", "each", "per", "serving", "amount", "organic", "other",
];

/// Phrases marking warnings or allergen statements rather than ingredients
const NON_INGREDIENT_PHRASES: &[&str] = &[
    "may contain",
    "contains:",
    "allergen",
    "allergy",
    "warning",
    "caution",
    "keep out of reach",
    "for external use",
    "avoid contact",
    "manufactured in",
    "produced in a facility",
    "processed in a facility",
    "made in a facility",
    "best before",
    "store in",
    "daily value",
    "www.",
    "http",
];

/// Parse raw ingredient text into a list of ingredient names
pub fn parse_ingredient_list(raw: &str) -> Vec<String> {
    let text = LABEL_PREFIX.replace(raw.trim(), "").to_string();
    if text.trim().is_empty() {
        return Vec::new();
    }

    let tokens = split_with_cascade(&text);
    let mut ingredients = filter_tokens(tokens);

    if ingredients.len() < 3 && text.chars().count() >= LONG_PANEL_LENGTH {
        let chemical = filter_tokens(
            CHEMICAL_NAME
                .find_iter(&text)
                .map(|m| m.as_str().to_string())
                .collect(),
        );
        debug!(
            "Splitter cascade produced {} tokens, chemical retry produced {}",
            ingredients.len(),
            chemical.len()
        );
        if chemical.len() > ingredients.len() {
            ingredients = chemical;
        }
    }

    ingredients.truncate(MAX_INGREDIENTS);
    debug!("Parsed {} ingredients", ingredients.len());
    ingredients
}

/// Split using the first applicable separator in cascade order
fn split_with_cascade(text: &str) -> Vec<String> {
    if text.contains(',') {
        trace!("Splitting ingredients on commas");
        return split_top_level(text, ',');
    }
    if text.contains(';') {
        trace!("Splitting ingredients on semicolons");
        return split_top_level(text, ';');
    }
    if PERIOD_SPLIT.find_iter(text).count() >= 2 {
        trace!("Splitting ingredients on periods");
        return PERIOD_SPLIT.split(text).map(str::to_string).collect();
    }
    if MULTI_SPACE_SPLIT.is_match(text) {
        trace!("Splitting ingredients on runs of spaces");
        return MULTI_SPACE_SPLIT.split(text).map(str::to_string).collect();
    }
    if text.contains('\n') {
        trace!("Splitting ingredients on newlines");
        return text.lines().map(str::to_string).collect();
    }
    trace!("Splitting ingredients on single spaces");
    text.split_whitespace().map(str::to_string).collect()
}

/// Split on `separator` only where it is not nested in parentheses or brackets
pub fn split_top_level(text: &str, separator: char) -> Vec<String> {
    let mut parts = Vec::new();
    let mut current = String::new();
    let mut depth: usize = 0;

    for c in text.chars() {
        match c {
            '(' | '[' | '{' => {
                depth += 1;
                current.push(c);
            }
            ')' | ']' | '}' => {
                depth = depth.saturating_sub(1);
                current.push(c);
            }
            c if c == separator && depth == 0 => {
                parts.push(std::mem::take(&mut current));
            }
            '\n' => current.push(' '),
            _ => current.push(c),
        }
    }
    parts.push(current);
    parts
}

fn filter_tokens(tokens: Vec<String>) -> Vec<String> {
    tokens
        .into_iter()
        .map(|token| clean_token(&token))
        .filter(|token| is_ingredient_token(token))
        .collect()
}

/// Trim whitespace, trailing punctuation and leading connectors from a token
fn clean_token(token: &str) -> String {
    let collapsed = token.split_whitespace().collect::<Vec<&str>>().join(" ");
    let trimmed = collapsed.trim_matches(|c: char| matches!(c, '.' | ':' | ';' | '*' | '•' | '-' | '·' | ' '));
    let without_connector = LEADING_CONNECTOR.replace(trimmed, "");
    without_connector.trim().to_string()
}

fn is_ingredient_token(token: &str) -> bool {
    let len = token.chars().count();
    if !(MIN_TOKEN_LENGTH..=MAX_TOKEN_LENGTH).contains(&len) {
        return false;
    }
    if PURE_NUMBER_REGEX.is_match(token) {
        return false;
    }
    let lower = token.to_lowercase();
    if STOPWORDS.contains(&lower.as_str()) {
        return false;
    }
    if NON_INGREDIENT_PHRASES.iter().any(|phrase| lower.contains(phrase)) {
        trace!("Dropping non-ingredient token '{token}'");
        return false;
    }
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clean_comma_list() {
        assert_eq!(parse_ingredient_list("A1, B2, C3").len(), 3);
        assert_eq!(parse_ingredient_list("AQUA, NIACINAMIDE, ZINC PCA"), vec!["AQUA", "NIACINAMIDE", "ZINC PCA"]);
    }

    #[test]
    fn test_parentheses_are_not_split() {
        let parsed = parse_ingredient_list("Enriched Flour (Wheat Flour, Niacin, Iron), Sugar, Salt.");
        assert_eq!(parsed, vec!["Enriched Flour (Wheat Flour, Niacin, Iron)", "Sugar", "Salt"]);
    }

    #[test]
    fn test_label_prefix_removed() {
        let parsed = parse_ingredient_list("Ingredients: Rice, Sugar, Salt");
        assert_eq!(parsed, vec!["Rice", "Sugar", "Salt"]);
    }

    #[test]
    fn test_semicolon_split() {
        let parsed = parse_ingredient_list("Water; Sugar; Citric Acid");
        assert_eq!(parsed, vec!["Water", "Sugar", "Citric Acid"]);
    }

    #[test]
    fn test_period_split() {
        let parsed = parse_ingredient_list("Water. Sugar. Citric Acid.");
        assert_eq!(parsed, vec!["Water", "Sugar", "Citric Acid"]);
    }

    #[test]
    fn test_multi_space_split() {
        let parsed = parse_ingredient_list("Water   Cane Sugar   Sea Salt");
        assert_eq!(parsed, vec!["Water", "Cane Sugar", "Sea Salt"]);
    }

    #[test]
    fn test_newline_split() {
        let parsed = parse_ingredient_list("Water\nCane Sugar\nSea Salt");
        assert_eq!(parsed, vec!["Water", "Cane Sugar", "Sea Salt"]);
    }

    #[test]
    fn test_filters_numbers_stopwords_and_warnings() {
        let parsed = parse_ingredient_list("Sugar, 123, and, Salt, May contain traces of nuts, x");
        assert_eq!(parsed, vec!["Sugar", "Salt"]);
    }

    #[test]
    fn test_leading_connector_removed() {
        let parsed = parse_ingredient_list("Oats, Sugar, and Honey");
        assert_eq!(parsed, vec!["Oats", "Sugar", "Honey"]);
    }

    #[test]
    fn test_caps_at_forty() {
        let raw = (1..=60).map(|i| format!("Item{i}")).collect::<Vec<_>>().join(", ");
        assert_eq!(parse_ingredient_list(&raw).len(), MAX_INGREDIENTS);
    }

    #[test]
    fn test_empty_input() {
        assert!(parse_ingredient_list("").is_empty());
        assert!(parse_ingredient_list("Ingredients:").is_empty());
    }

    #[test]
    fn test_split_top_level_nested() {
        let parts = split_top_level("a (b, c [d, e]), f", ',');
        assert_eq!(parts, vec!["a (b, c [d, e])", " f"]);
    }
}
