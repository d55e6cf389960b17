//! # Field Extractor
//!
//! Locates the ingredient panel in raw OCR text and assembles the
//! [`ExtractedText`] aggregate together with the product identifier and the
//! nutrition parser.
//!
//! Ingredient text is found with four strategies tried in order; the first one
//! that yields a non-empty ingredient list wins:
//!
//! 1. An explicit "Ingredients:" label, read until a blank line or the next header
//! 2. Cosmetic line scoring, weighted towards INCI names such as aqua and niacinamide
//! 3. Multi-line accumulation of lines that look like ingredient runs
//! 4. The line with the most commas

use lazy_static::lazy_static;
use log::{debug, info, trace};
use regex::Regex;

use crate::ingredient_model::{ExtractedText, ProductInfo, COSMETIC_PRODUCT};
use crate::ingredient_parser::parse_ingredient_list;
use crate::localization::{t_lang, DEFAULT_LANGUAGE};
use crate::nutrition_parser::{nutrition_text, parse_nutrition};
use crate::product_identifier::identify_product;
use crate::text_processing::{
    clean_ocr_text, collapse_whitespace, count_commas, is_all_caps, is_panel_line, is_section_header,
};

/// Minimum score for the cosmetic line strategy
const COSMETIC_LINE_THRESHOLD: i32 = 5;
/// Minimum score for a line to join the accumulated ingredient run
const ACCUMULATION_THRESHOLD: i32 = 6;
/// Minimum commas for the aggressive fallback
const FALLBACK_MIN_COMMAS: usize = 3;

/// Weighted INCI keywords used to spot a cosmetic ingredient line
const COSMETIC_LINE_WEIGHTS: &[(&str, i32)] = &[
    ("aqua", 10),
    ("niacinamide", 8),
    ("zinc pca", 8),
    ("butylene glycol", 6),
    ("propylene glycol", 6),
    ("pentylene glycol", 6),
    ("glycol", 5),
    ("glycerin", 5),
    ("phenoxyethanol", 5),
    ("dimethicone", 4),
    ("tamarindus indica", 4),
    ("hyaluronate", 4),
    ("xanthan gum", 3),
    ("carbomer", 3),
    ("ethylhexylglycerin", 3),
];

/// Words that mark usage instructions or warnings rather than an ingredient line
const DIRECTIVE_WORDS: &[&str] = &[
    "apply",
    "directions",
    "avoid",
    "warning",
    "keep out",
    "rinse",
    "discontinue",
    "external use",
    "store ",
    "massage",
];

/// Section headers whose content is never part of the ingredient list
const SKIPPED_SECTIONS: &[&str] = &[
    "nutrition facts",
    "nutrition information",
    "supplement facts",
    "directions",
    "how to use",
    "warning",
    "caution",
    "storage",
];

/// Common food ingredient terms used by the accumulation strategy
const INGREDIENT_TERMS: &[&str] = &[
    "flour", "sugar", "oil", "salt", "water", "syrup", "starch", "acid", "extract", "vitamin", "flavor",
    "flavour", "milk", "soy", "lecithin", "oats", "wheat", "rice", "corn", "cocoa", "honey", "butter",
    "powder", "gum", "protein", "yeast", "vinegar", "color", "colour", "spice", "juice", "niacin", "iron",
];

lazy_static! {
    static ref INGREDIENT_LABEL: Regex =
        Regex::new(r"(?i)\b(?:ingr[eé]dients?|composition)\s*[:;.\-]\s*(.*)$").expect("Ingredient label pattern should be valid");
    static ref CHEMICAL_TOKEN: Regex =
        Regex::new(r"(?i)\b[a-z]{3,}(?:ate|ide|ine|ose|ol|one|ium)\b").expect("Chemical token pattern should be valid");
    static ref PARENTHETICAL: Regex = Regex::new(r"\([^)]*\)").expect("Parenthetical pattern should be valid");
}

/// Which strategy located the ingredient panel
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExtractionStrategy {
    ExplicitLabel,
    CosmeticLine,
    Accumulated,
    CommaFallback,
}

/// Panel locators in priority order; later ones only run when earlier ones fail
const STRATEGIES: [(ExtractionStrategy, fn(&str) -> Option<String>); 4] = [
    (ExtractionStrategy::ExplicitLabel, from_explicit_label),
    (ExtractionStrategy::CosmeticLine, best_cosmetic_line),
    (ExtractionStrategy::Accumulated, accumulate_ingredient_lines),
    (ExtractionStrategy::CommaFallback, most_commas_line),
];

/// Raw ingredient panel text and its parsed list
#[derive(Debug, Clone, PartialEq)]
pub struct IngredientExtraction {
    pub text: String,
    pub list: Vec<String>,
    pub strategy: ExtractionStrategy,
}

/// Find and parse the ingredient panel
///
/// Returns `None` when no strategy produced a usable list; callers render the
/// localized placeholder in that case.
pub fn extract_ingredients(text: &str, product_type: &str) -> Option<IngredientExtraction> {
    let lower = text.to_lowercase();
    let cosmetic = product_type == COSMETIC_PRODUCT || lower.contains("aqua") || lower.contains("niacinamide");

    for (strategy, locate) in STRATEGIES {
        if strategy == ExtractionStrategy::CosmeticLine && !cosmetic {
            continue;
        }
        let Some(raw) = locate(text) else {
            trace!("Strategy {:?} found nothing", strategy);
            continue;
        };
        let list = parse_ingredient_list(&raw);
        if list.is_empty() {
            trace!("Strategy {:?} text parsed to no ingredients", strategy);
            continue;
        }
        info!("Extracted {} ingredients using {:?}", list.len(), strategy);
        return Some(IngredientExtraction {
            text: collapse_whitespace(&raw),
            list,
            strategy,
        });
    }

    debug!("No ingredient panel found");
    None
}

/// Strategy 1: text after an "Ingredients:" label up to a blank line or header
pub fn from_explicit_label(text: &str) -> Option<String> {
    let lines: Vec<&str> = text.lines().collect();

    for (index, line) in lines.iter().enumerate() {
        let Some(caps) = INGREDIENT_LABEL.captures(line) else {
            continue;
        };

        let mut collected = vec![caps[1].trim().to_string()];
        for next in &lines[index + 1..] {
            let next = next.trim();
            if next.is_empty() || is_header(next) {
                break;
            }
            collected.push(next.to_string());
        }

        let joined = collected.join(" ").trim().to_string();
        if !joined.is_empty() {
            debug!("Found explicit ingredient label on line {}", index);
            return Some(joined);
        }
    }
    None
}

fn is_header(line: &str) -> bool {
    is_section_header(line) || (is_all_caps(line) && line.ends_with(':'))
}

/// Strategy 2: highest scoring cosmetic ingredient line
pub fn best_cosmetic_line(text: &str) -> Option<String> {
    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(|line| (cosmetic_line_score(line), line))
        .filter(|(score, _)| *score > COSMETIC_LINE_THRESHOLD)
        // max_by_key keeps the last maximum; reverse so ties favour the earlier line
        .rev()
        .max_by_key(|(score, _)| *score)
        .map(|(_, line)| line.to_string())
}

pub fn cosmetic_line_score(line: &str) -> i32 {
    let lower = line.to_lowercase();
    let mut score: i32 = COSMETIC_LINE_WEIGHTS
        .iter()
        .filter(|(keyword, _)| lower.contains(keyword))
        .map(|(_, weight)| weight)
        .sum();

    let commas = count_commas(line) as i32;
    score += 2 * commas;
    if commas > 0 && is_all_caps(line) {
        score += 3;
    }
    score -= 5 * DIRECTIVE_WORDS.iter().filter(|w| lower.contains(*w)).count() as i32;
    score
}

/// Strategy 3: join consecutive lines that look like an ingredient run
pub fn accumulate_ingredient_lines(text: &str) -> Option<String> {
    let mut accumulated: Vec<&str> = Vec::new();
    let mut skipping = false;

    for line in text.lines().map(str::trim) {
        if line.is_empty() {
            skipping = false;
            if !accumulated.is_empty() {
                break;
            }
            continue;
        }

        let lower = line.to_lowercase();
        if SKIPPED_SECTIONS.iter().any(|section| lower.starts_with(section)) {
            skipping = true;
            if !accumulated.is_empty() {
                break;
            }
            continue;
        }
        if skipping || is_panel_line(line) {
            continue;
        }

        let score = accumulation_score(line);
        trace!("Accumulation score {} for '{}'", score, line);
        if score >= ACCUMULATION_THRESHOLD {
            accumulated.push(line);
        } else if !accumulated.is_empty() {
            break;
        }
    }

    if accumulated.is_empty() {
        None
    } else {
        Some(accumulated.join(" "))
    }
}

pub fn accumulation_score(line: &str) -> i32 {
    let lower = line.to_lowercase();
    let commas = count_commas(line) as i32;
    let terms = INGREDIENT_TERMS.iter().filter(|term| lower.contains(*term)).count() as i32;
    let chemicals = CHEMICAL_TOKEN.find_iter(line).count() as i32;
    let parentheticals = PARENTHETICAL.find_iter(line).count() as i32;
    let length_bonus = match line.chars().count() {
        n if n > 40 => 2,
        n if n > 20 => 1,
        _ => 0,
    };
    commas * 3 + terms * 4 + chemicals * 2 + parentheticals * 2 + length_bonus
}

/// Strategy 4: the line with the most commas, if it has at least three
pub fn most_commas_line(text: &str) -> Option<String> {
    text.lines()
        .map(str::trim)
        .filter(|line| !is_panel_line(line))
        .filter(|line| {
            let lower = line.to_lowercase();
            !DIRECTIVE_WORDS.iter().any(|w| lower.contains(w))
        })
        .map(|line| (count_commas(line), line))
        .filter(|(commas, _)| *commas >= FALLBACK_MIN_COMMAS)
        .rev()
        .max_by_key(|(commas, _)| *commas)
        .map(|(_, line)| line.to_string())
}

/// Extract every structured field from raw OCR text (English placeholders)
pub fn extract_fields(text: &str) -> ExtractedText {
    extract_fields_with_language(text, DEFAULT_LANGUAGE)
}

/// Extract every structured field, rendering placeholders in `language`
pub fn extract_fields_with_language(text: &str, language: &str) -> ExtractedText {
    extract_product(text, language).1
}

/// Identify the product and extract every field in one pass
pub fn extract_product(text: &str, language: &str) -> (ProductInfo, ExtractedText) {
    let cleaned = clean_ocr_text(text);
    let product = identify_product(&cleaned);

    let (ingredients, ingredients_list) = match extract_ingredients(text, &product.product_type) {
        Some(extraction) => (extraction.text, Some(extraction.list)),
        None => (t_lang("ingredients-not-found", language), None),
    };

    let nutrition_data = parse_nutrition(&cleaned, &product.product_type);
    let nutrition = nutrition_text(&nutrition_data, language);

    let extracted = ExtractedText {
        all_text: cleaned,
        ingredients,
        ingredients_list,
        nutrition,
        nutrition_data,
        brand: product.brand.clone(),
        product_type: product.product_type.clone(),
        category: product.category.clone(),
    };
    (product, extracted)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_explicit_label_single_line() {
        let text = "CeraVe\nIngredients: AQUA, NIACINAMIDE, ZINC PCA, PHENOXYETHANOL\n\nMade in France";
        let extraction = extract_ingredients(text, COSMETIC_PRODUCT).unwrap();
        assert_eq!(extraction.strategy, ExtractionStrategy::ExplicitLabel);
        assert_eq!(
            extraction.list,
            vec!["AQUA", "NIACINAMIDE", "ZINC PCA", "PHENOXYETHANOL"]
        );
    }

    #[test]
    fn test_explicit_label_stops_at_header() {
        let text = "INGREDIENTS: Whole Grain Oats, Sugar,\nCanola Oil, Rice Flour\nNutrition Facts\nCalories 190";
        let raw = from_explicit_label(text).unwrap();
        assert_eq!(raw, "Whole Grain Oats, Sugar, Canola Oil, Rice Flour");
    }

    #[test]
    fn test_cosmetic_line_without_label() {
        let text = "Hydrating Serum\nAQUA, GLYCERIN, NIACINAMIDE, BUTYLENE GLYCOL\nApply to clean skin, avoid eyes.";
        let extraction = extract_ingredients(text, COSMETIC_PRODUCT).unwrap();
        assert_eq!(extraction.strategy, ExtractionStrategy::CosmeticLine);
        assert_eq!(extraction.list.first().map(String::as_str), Some("AQUA"));
    }

    #[test]
    fn test_cosmetic_line_skipped_for_food() {
        let text = "Trail Mix\nPEANUTS, RAISINS, ALMONDS, CASHEWS";
        let extraction = extract_ingredients(text, "food").unwrap();
        assert_ne!(extraction.strategy, ExtractionStrategy::CosmeticLine);
        assert_eq!(extraction.list.first().map(String::as_str), Some("PEANUTS"));
    }

    #[test]
    fn test_strategy_priority() {
        let order: Vec<ExtractionStrategy> = STRATEGIES.iter().map(|(strategy, _)| *strategy).collect();
        assert_eq!(
            order,
            vec![
                ExtractionStrategy::ExplicitLabel,
                ExtractionStrategy::CosmeticLine,
                ExtractionStrategy::Accumulated,
                ExtractionStrategy::CommaFallback,
            ]
        );
    }

    #[test]
    fn test_directive_words_penalised() {
        assert!(cosmetic_line_score("Apply to face, avoid eyes, rinse") < COSMETIC_LINE_THRESHOLD);
        assert!(cosmetic_line_score("AQUA, NIACINAMIDE, ZINC PCA") > COSMETIC_LINE_THRESHOLD);
    }

    #[test]
    fn test_accumulation_skips_nutrition_section() {
        let text = "Granola Bites\nNutrition Facts\nTotal Fat 3g, Sodium 100mg, Sugars 5g\n\n\
                    Whole grain oats, sugar, canola oil,\nrice flour, honey, salt, soy lecithin";
        let raw = accumulate_ingredient_lines(text).unwrap();
        assert!(raw.starts_with("Whole grain oats"));
        assert!(raw.ends_with("soy lecithin"));
    }

    #[test]
    fn test_comma_fallback_needs_three_commas() {
        assert_eq!(most_commas_line("one, two\nthree"), None);
        assert_eq!(most_commas_line("a1, b2, c3, d4"), Some("a1, b2, c3, d4".to_string()));
    }

    #[test]
    fn test_garbage_text_gives_placeholders() {
        let extracted = extract_fields("~~ ## ..\n%%");
        assert!(extracted.ingredients_list.is_none());
        assert_eq!(extracted.ingredients, t_lang("ingredients-not-found", "en"));
        assert_eq!(extracted.nutrition, t_lang("nutrition-not-found", "en"));
        assert!(extracted.nutrition_data.calories.is_none());
    }

    #[test]
    fn test_cosmetic_fields_are_not_applicable() {
        let extracted = extract_fields("Ingredients: AQUA, NIACINAMIDE, ZINC PCA, PHENOXYETHANOL");
        assert_eq!(extracted.product_type, COSMETIC_PRODUCT);
        assert!(extracted.nutrition_data.is_not_applicable());
        assert_eq!(extracted.ingredients_list.as_ref().map(Vec::len), Some(4));
    }

    #[test]
    fn test_food_fields() {
        let extracted = extract_fields(
            "Special K Original\nNet Wt 12 oz\n190 calories, Total Sugars 11g, Added Sugars 10g\n\
             Ingredients: Rice, Wheat Gluten, Sugar, Defatted Wheat Germ, Salt",
        );
        assert_eq!(extracted.brand, "Kellogg's");
        assert!(!extracted.nutrition_data.is_not_applicable());
        assert_eq!(extracted.nutrition_data.sugars.added.as_deref(), Some("10g"));
        assert_eq!(extracted.ingredients_list.as_ref().map(Vec::len), Some(5));
    }

    #[test]
    fn test_french_placeholder() {
        let extracted = extract_fields_with_language("", "fr");
        assert_eq!(extracted.ingredients, t_lang("ingredients-not-found", "fr"));
    }
}
