//! # Product Identifier
//!
//! Scans raw OCR text for the product name, brand, type and category.
//!
//! Detection runs as a fixed sequence of strategies, the first one that
//! produces a result wins:
//!
//! 1. Cosmetic detection (ingredient and context keywords)
//! 2. Title candidate scoring over the first lines of the label
//! 3. Ordered brand table, against the top candidates then the whole text
//! 4. Best title candidate with keyword-inferred brand and type
//! 5. First meaningful line, else `"Unknown Product"`
//!
//! ```rust
//! use scan_it_know_it::product_identifier::identify_product;
//!
//! let info = identify_product("Kellogg's\nSpecial K Original\nNET WT 12 OZ");
//! assert_eq!(info.brand, "Kellogg's");
//! assert_eq!(info.product_type, "Cereal");
//! ```

use lazy_static::lazy_static;
use log::{debug, info, trace};
use regex::Regex;

use crate::ingredient_model::{ProductInfo, COSMETIC_PRODUCT, UNKNOWN_PRODUCT};
use crate::measurement_patterns::{is_measurement_line, PURE_NUMBER_REGEX};
use crate::text_processing::{
    clean_product_name, count_keyword_hits, digit_count, has_letters, has_mixed_case, is_all_caps,
    is_panel_line, is_section_header, non_empty_lines, special_char_count,
};

/// Ingredient names that almost only appear on cosmetic labels
pub const COSMETIC_INGREDIENT_KEYWORDS: &[&str] = &[
    "aqua",
    "niacinamide",
    "zinc pca",
    "pentylene glycol",
    "butylene glycol",
    "propanediol",
    "phenoxyethanol",
    "chlorphenesin",
    "ethylhexylglycerin",
    "caprylyl glycol",
    "sodium hyaluronate",
    "hyaluronic acid",
    "dimethicone",
    "cetearyl alcohol",
    "carbomer",
    "ceramide",
    "panthenol",
    "allantoin",
    "squalane",
    "retinol",
    "salicylic acid",
    "tamarindus indica",
    "isoceteth",
    "polysorbate 20",
];

/// Words describing how a product is used on skin
pub const COSMETIC_CONTEXT_KEYWORDS: &[&str] = &[
    "serum",
    "moisturizer",
    "moisturiser",
    "moisturizing",
    "cream",
    "lotion",
    "cleanser",
    "toner",
    "spf",
    "sunscreen",
    "skincare",
    "skin care",
    "dermatologist",
    "non-comedogenic",
    "for external use",
];

/// Food phrases that contain cosmetic context words and must not count as cosmetic cues
pub const FOOD_CREAM_PHRASES: &[&str] = &[
    "ice cream",
    "cream cheese",
    "sour cream",
    "whipped cream",
    "heavy cream",
    "cream of",
    "creamer",
    "cream filling",
    "cream filled",
];

/// Cosmetic sub-type decision list: (keywords, product label, short noun)
const COSMETIC_SUBTYPES: &[(&[&str], &str, &str)] = &[
    (&["serum"], "Skincare Serum", "Serum"),
    (&["moisturizer", "moisturiser", "moisturizing", "cream"], "Moisturizing Cream", "Cream"),
    (&["cleanser", "face wash", "foaming"], "Facial Cleanser", "Cleanser"),
    (&["toner"], "Facial Toner", "Toner"),
    (&["sunscreen", "spf"], "Sunscreen", "Sunscreen"),
    (&["lotion"], "Body Lotion", "Lotion"),
];

/// Active ingredients used to name a cosmetic product, in priority order
const COSMETIC_HERO_INGREDIENTS: &[(&str, &str)] = &[
    ("niacinamide", "Niacinamide"),
    ("hyaluronic", "Hyaluronic Acid"),
    ("retinol", "Retinol"),
    ("salicylic", "Salicylic Acid"),
    ("ascorbic", "Vitamin C"),
    ("ceramide", "Ceramide"),
];

const COSMETIC_BRANDS: &[(&str, &str)] = &[
    ("the ordinary", "The Ordinary"),
    ("cerave", "CeraVe"),
    ("la roche-posay", "La Roche-Posay"),
    ("la roche posay", "La Roche-Posay"),
    ("neutrogena", "Neutrogena"),
    ("cetaphil", "Cetaphil"),
    ("olay", "Olay"),
    ("paula's choice", "Paula's Choice"),
    ("the inkey list", "The Inkey List"),
    ("garnier", "Garnier"),
    ("l'oreal", "L'Oréal"),
    ("l'oréal", "L'Oréal"),
];

/// Words that commonly appear in food product titles
const TITLE_WORDS: &[&str] = &[
    "original", "classic", "crunchy", "organic", "natural", "cereal", "granola", "bar", "bars", "chips",
    "cookies", "crackers", "protein", "honey", "chocolate", "oats", "vanilla", "peanut", "almond", "berry",
    "strawberry", "whole grain", "multigrain", "light", "zero", "juice", "soda", "yogurt",
];

/// Brand words used when scoring meaningful fallback lines
const BRAND_WORDS: &[&str] = &[
    "kellogg", "nature valley", "quaker", "general mills", "clif", "kind", "rxbar", "nabisco", "oreo",
    "frito", "doritos", "lay's", "coca", "pepsi", "nestle", "nestlé", "heinz", "campbell", "post", "annie",
    "larabar", "kraft", "danone", "chobani",
];

/// Keyword → product type inference for title candidates, first match wins
const TYPE_KEYWORDS: &[(&str, &str)] = &[
    ("granola bar", "Granola Bar"),
    ("protein bar", "Protein Bar"),
    ("cereal", "Cereal"),
    ("granola", "Granola"),
    ("oats", "Oats"),
    (" bar", "Snack Bar"),
    ("chips", "Chips"),
    ("crisps", "Chips"),
    ("cookie", "Cookies"),
    ("cracker", "Crackers"),
    ("soda", "Beverage"),
    ("juice", "Beverage"),
    ("drink", "Beverage"),
    (" tea ", "Beverage"),
    ("coffee", "Beverage"),
    ("milk", "Dairy"),
    ("yogurt", "Dairy"),
    ("cheese", "Dairy"),
    ("soup", "Soup"),
    ("sauce", "Condiment"),
    ("ketchup", "Condiment"),
    ("protein", "Protein Product"),
];

/// Minimum title score for a line to be considered a title candidate
const TITLE_SCORE_THRESHOLD: i32 = 4;
/// Minimum score for the meaningful-line fallback
const MEANINGFUL_SCORE_THRESHOLD: i32 = 4;
const TITLE_SCAN_LINES: usize = 8;

/// One entry of the ordered brand table
struct BrandRule {
    pattern: Regex,
    brand: &'static str,
    product_type: &'static str,
}

fn brand_rule(pattern: &str, brand: &'static str, product_type: &'static str) -> BrandRule {
    BrandRule {
        pattern: Regex::new(pattern).expect("Brand pattern should be valid"),
        brand,
        product_type,
    }
}

lazy_static! {
    /// Ordered brand table; earlier rules take precedence
    static ref BRAND_RULES: Vec<BrandRule> = vec![
        brand_rule(r"(?i)special\s*k", "Kellogg's", "Cereal"),
        brand_rule(r"(?i)frosted\s*flakes|corn\s*flakes|froot\s*loops|rice\s*krispies", "Kellogg's", "Cereal"),
        brand_rule(r"(?i)kellogg'?s?", "Kellogg's", "Cereal"),
        brand_rule(r"(?i)nature\s*valley", "Nature Valley", "Granola Bar"),
        brand_rule(r"(?i)quaker", "Quaker", "Oats"),
        brand_rule(r"(?i)cheerios", "General Mills", "Cereal"),
        brand_rule(r"(?i)general\s*mills", "General Mills", "Cereal"),
        brand_rule(r"(?i)clif\s*bar|\bclif\b", "Clif Bar", "Energy Bar"),
        brand_rule(r"(?i)\bkind\s+(?:bar|snacks?|healthy)", "KIND", "Snack Bar"),
        brand_rule(r"(?i)rxbar", "RXBAR", "Protein Bar"),
        brand_rule(r"(?i)larabar", "Larabar", "Snack Bar"),
        brand_rule(r"(?i)\boreo", "Nabisco", "Cookies"),
        brand_rule(r"(?i)doritos|\blay'?s\b|cheetos", "Frito-Lay", "Chips"),
        brand_rule(r"(?i)coca[\s-]*cola|\bcoke\b", "Coca-Cola", "Beverage"),
        brand_rule(r"(?i)\bpepsi", "PepsiCo", "Beverage"),
        brand_rule(r"(?i)nestl[eé]", "Nestlé", "Food Product"),
        brand_rule(r"(?i)\bheinz\b", "Heinz", "Condiment"),
        brand_rule(r"(?i)campbell'?s", "Campbell's", "Soup"),
        brand_rule(r"(?i)\bpost\s+(?:honey|grape|raisin|fruity|cocoa)", "Post", "Cereal"),
        brand_rule(r"(?i)annie'?s", "Annie's", "Snack"),
        brand_rule(r"(?i)chobani", "Chobani", "Dairy"),
    ];
}

/// A line scored as a plausible product title
#[derive(Debug, Clone, PartialEq)]
pub struct TitleCandidate {
    pub line: String,
    pub index: usize,
    pub score: i32,
}

/// Identify the product described by raw OCR text
pub fn identify_product(text: &str) -> ProductInfo {
    let lower = text.to_lowercase();

    if let Some(info) = detect_cosmetic(&lower) {
        info!("Identified cosmetic product: {} ({})", info.product_name, info.category);
        return info;
    }

    let candidates = score_title_candidates(text);
    debug!("Found {} title candidates", candidates.len());

    if let Some(info) = match_brand_table(text, &candidates) {
        info!("Identified product via brand table: {} by {}", info.product_name, info.brand);
        return info;
    }

    if let Some(best) = candidates.first() {
        let (brand, product_type) = infer_brand_and_type(&best.line);
        let info = product_info(clean_product_name(&best.line), brand, product_type);
        info!("Identified product from title candidate: {}", info.product_name);
        return info;
    }

    if let Some(line) = best_meaningful_line(text) {
        let (brand, product_type) = infer_brand_and_type(line);
        let info = product_info(clean_product_name(line), brand, product_type);
        info!("Identified product from meaningful line: {}", info.product_name);
        return info;
    }

    info!("No product cues found in text, returning {}", UNKNOWN_PRODUCT);
    ProductInfo::unknown()
}

/// Count (ingredient-keyword, context-keyword) hits in lowercased text
pub fn cosmetic_signal(lower_text: &str) -> (usize, usize) {
    let ingredient_hits = count_keyword_hits(lower_text, COSMETIC_INGREDIENT_KEYWORDS);

    let mut context_text = lower_text.to_string();
    for phrase in FOOD_CREAM_PHRASES {
        context_text = context_text.replace(phrase, " ");
    }
    let context_hits = count_keyword_hits(&context_text, COSMETIC_CONTEXT_KEYWORDS);
    (ingredient_hits, context_hits)
}

/// Whether the text reads like a cosmetic label
pub fn is_cosmetic_text(text: &str) -> bool {
    let (ingredient_hits, context_hits) = cosmetic_signal(&text.to_lowercase());
    ingredient_hits >= 3 || context_hits >= 1
}

fn detect_cosmetic(lower: &str) -> Option<ProductInfo> {
    let (ingredient_hits, context_hits) = cosmetic_signal(lower);
    trace!("Cosmetic signal: {ingredient_hits} ingredient hits, {context_hits} context hits");
    if ingredient_hits < 3 && context_hits < 1 {
        return None;
    }

    let (label, noun) = COSMETIC_SUBTYPES
        .iter()
        .find(|(keywords, _, _)| keywords.iter().any(|kw| lower.contains(kw)))
        .map(|(_, label, noun)| (*label, *noun))
        .unwrap_or(("Skincare Product", "Skincare Product"));

    let brand = COSMETIC_BRANDS
        .iter()
        .find(|(needle, _)| lower.contains(needle))
        .map(|(_, brand)| *brand);

    let hero = COSMETIC_HERO_INGREDIENTS
        .iter()
        .find(|(needle, _)| lower.contains(needle))
        .map(|(_, name)| *name);

    let product_name = match (brand, hero) {
        (Some(brand), Some(hero)) => format!("{brand} {hero} {noun}"),
        (Some(brand), None) => format!("{brand} {noun}"),
        (None, Some(hero)) => format!("{hero} {noun}"),
        (None, None) => label.to_string(),
    };

    Some(ProductInfo {
        product_name,
        brand: brand.unwrap_or("Unknown").to_string(),
        product_type: COSMETIC_PRODUCT.to_string(),
        category: label.to_string(),
    })
}

/// Score the first lines of the label for title likelihood
///
/// Returns the lines scoring above the threshold, best first. Ties keep the
/// earlier line first.
pub fn score_title_candidates(text: &str) -> Vec<TitleCandidate> {
    let mut candidates: Vec<TitleCandidate> = non_empty_lines(text)
        .into_iter()
        .take(TITLE_SCAN_LINES)
        .enumerate()
        .filter(|(_, line)| !is_excluded_title_line(line))
        .map(|(index, line)| TitleCandidate {
            line: line.to_string(),
            index,
            score: title_score(line, index),
        })
        .filter(|candidate| candidate.score > TITLE_SCORE_THRESHOLD)
        .collect();

    // sort_by is stable, so equal scores keep their original order
    candidates.sort_by(|a, b| b.score.cmp(&a.score));
    candidates
}

fn is_excluded_title_line(line: &str) -> bool {
    PURE_NUMBER_REGEX.is_match(line)
        || is_measurement_line(line)
        || is_section_header(line)
        || is_panel_line(line)
}

/// Title likelihood score for one line at the given position
pub fn title_score(line: &str, index: usize) -> i32 {
    let mut score = 3 - (index as i32) / 2;

    if has_mixed_case(line) {
        score += 2;
    } else if is_all_caps(line) && line.chars().filter(|c| c.is_alphabetic()).count() >= 2 {
        score += 1;
    } else {
        // Labels print titles capitalised; an all-lowercase line is rarely one
        score -= 2;
    }

    let len = line.chars().count();
    if (8..=40).contains(&len) {
        score += 2;
    }

    let letters = line.chars().filter(|c| c.is_alphabetic()).count();
    let alnum = line.chars().filter(|c| c.is_alphanumeric()).count();
    if alnum > 0 && letters * 10 >= alnum * 7 {
        score += 1;
    }

    score -= 2 * special_char_count(line) as i32;

    let lower = line.to_lowercase();
    let title_word_bonus = 2 * count_keyword_hits(&lower, TITLE_WORDS) as i32;
    score += title_word_bonus.min(4);

    trace!("Title score for line {index} '{line}': {score}");
    score
}

fn match_brand_table(text: &str, candidates: &[TitleCandidate]) -> Option<ProductInfo> {
    for candidate in candidates.iter().take(3) {
        if let Some(rule) = BRAND_RULES.iter().find(|rule| rule.pattern.is_match(&candidate.line)) {
            debug!("Brand rule '{}' matched title candidate '{}'", rule.brand, candidate.line);
            return Some(product_info(clean_product_name(&candidate.line), rule.brand, rule.product_type));
        }
    }

    let rule = BRAND_RULES.iter().find(|rule| rule.pattern.is_match(text))?;
    debug!("Brand rule '{}' matched full text", rule.brand);

    // Prefer the label's own title over the line that merely mentions the brand
    let name = candidates
        .first()
        .map(|candidate| candidate.line.as_str())
        .or_else(|| {
            non_empty_lines(text)
                .into_iter()
                .find(|line| rule.pattern.is_match(line) && line.chars().count() <= 50 && !is_panel_line(line))
        })
        .map(clean_product_name)
        .filter(|name| !name.is_empty())
        .unwrap_or_else(|| format!("{} {}", rule.brand, rule.product_type));

    Some(product_info(name, rule.brand, rule.product_type))
}

/// Infer (brand, product type) from keywords in a single line
fn infer_brand_and_type(line: &str) -> (&'static str, &'static str) {
    let brand = BRAND_RULES
        .iter()
        .find(|rule| rule.pattern.is_match(line))
        .map(|rule| rule.brand)
        .unwrap_or("Unknown");

    let padded = format!(" {} ", line.to_lowercase());
    let product_type = TYPE_KEYWORDS
        .iter()
        .find(|(needle, _)| padded.contains(needle))
        .map(|(_, product_type)| *product_type)
        .unwrap_or("Food Product");

    (brand, product_type)
}

fn best_meaningful_line(text: &str) -> Option<&str> {
    let mut best: Option<(&str, i32)> = None;

    for line in non_empty_lines(text) {
        let len = line.chars().count();
        if !(5..=50).contains(&len) || !has_letters(line) || is_panel_line(line) {
            continue;
        }
        let letters = line.chars().filter(|c| c.is_alphabetic()).count();
        if letters * 10 < len * 6 {
            continue;
        }

        let mut score = 0;
        if has_mixed_case(line) {
            score += 2;
        } else if is_all_caps(line) {
            score += 1;
        }
        if (8..=30).contains(&len) {
            score += 2;
        }
        if digit_count(line) <= 2 {
            score += 1;
        }
        if count_keyword_hits(&line.to_lowercase(), BRAND_WORDS) > 0 {
            score += 3;
        }

        if score >= MEANINGFUL_SCORE_THRESHOLD && best.map_or(true, |(_, s)| score > s) {
            best = Some((line, score));
        }
    }

    best.map(|(line, _)| line)
}

fn product_info(product_name: String, brand: &str, product_type: &str) -> ProductInfo {
    let product_name = if product_name.is_empty() {
        UNKNOWN_PRODUCT.to_string()
    } else {
        product_name
    };
    ProductInfo {
        product_name,
        brand: brand.to_string(),
        product_type: product_type.to_string(),
        category: category_for(product_type).to_string(),
    }
}

/// Broad category for a product type
pub fn category_for(product_type: &str) -> &'static str {
    match product_type {
        "Cereal" | "Oats" | "Granola" => "Cereal",
        "Granola Bar" | "Snack Bar" | "Energy Bar" | "Protein Bar" => "Snack Bar",
        "Beverage" => "Beverage",
        "Dairy" => "Dairy",
        "Chips" | "Cookies" | "Crackers" | "Snack" => "Snack",
        "Soup" | "Condiment" => "Pantry",
        COSMETIC_PRODUCT => "Skincare",
        _ => "Food",
    }
}
