//! # Nutrition Parser
//!
//! Extracts calories, fat, carbohydrates, protein and sugar figures from label
//! text. Each field has a family of regexes tried in priority order; the first
//! match that passes validation wins. Named sugar sources are detected through
//! a fixed keyword table.
//!
//! Absence is never reported as zero: a field that was not found stays `None`,
//! and a label with no numeric field at all renders as a placeholder message.

use lazy_static::lazy_static;
use log::{debug, info, trace};
use regex::Regex;

use crate::ingredient_model::{
    Calories, NutritionFields, NutritionSummary, SugarFields, SugarType, COSMETIC_PRODUCT,
};
use crate::localization::t_lang;

/// Calories outside this range are treated as OCR noise
pub const CALORIE_RANGE: std::ops::RangeInclusive<u32> = 1..=9999;

/// Sugar source keywords → display label; earlier entries consume their text first
const SUGAR_TYPES: &[(&str, &str)] = &[
    ("high fructose corn syrup", "High Fructose Corn Syrup"),
    ("hfcs", "High Fructose Corn Syrup"),
    ("corn syrup solids", "Corn Syrup Solids"),
    ("corn syrup", "Corn Syrup"),
    ("brown rice syrup", "Brown Rice Syrup"),
    ("rice syrup", "Rice Syrup"),
    ("maple syrup", "Maple Syrup"),
    ("malt syrup", "Malt Syrup"),
    ("barley malt", "Barley Malt"),
    ("glucose syrup", "Glucose Syrup"),
    ("invert sugar", "Invert Sugar"),
    ("cane sugar", "Cane Sugar"),
    ("brown sugar", "Brown Sugar"),
    ("coconut sugar", "Coconut Sugar"),
    ("fruit juice concentrate", "Fruit Juice Concentrate"),
    ("maltodextrin", "Maltodextrin"),
    ("dextrose", "Dextrose"),
    ("fructose", "Fructose"),
    ("glucose", "Glucose"),
    ("sucrose", "Sucrose"),
    ("maltose", "Maltose"),
    ("honey", "Honey"),
    ("molasses", "Molasses"),
    ("agave", "Agave"),
];

const AMOUNT: &str = r"(\d+(?:[.,]\d+)?)\s*(mg|g)?\b";

fn family(patterns: &[&str]) -> Vec<Regex> {
    patterns
        .iter()
        .map(|p| Regex::new(&p.replace("{AMOUNT}", AMOUNT)).expect("Nutrition pattern should be valid"))
        .collect()
}

lazy_static! {
    static ref CALORIE_PATTERNS: Vec<Regex> = family(&[
        r"(?i)\bcalories\s*[:\-]?\s*(\d+)\b",
        r"(?i)\b(\d+)\s*(?:calories|kcal|cal)\b",
        r"(?i)\benergy\s*[:\-]?\s*(?:\d+\s*kj\s*/?\s*)?(\d+)\s*kcal\b",
    ]);
    static ref FAT_PATTERNS: Vec<Regex> = family(&[
        r"(?i)\btotal\s*fat\s*[:\-]?\s*{AMOUNT}",
        r"(?i)\bfat\s*[:\-]?\s*{AMOUNT}",
        r"(?i)\blipides\s*[:\-]?\s*{AMOUNT}",
    ]);
    static ref CARB_PATTERNS: Vec<Regex> = family(&[
        r"(?i)\btotal\s*carb(?:ohydrate)?s?\.?\s*[:\-]?\s*{AMOUNT}",
        r"(?i)\bcarbohydrates?\s*[:\-]?\s*{AMOUNT}",
        r"(?i)\bcarbs\s*[:\-]?\s*{AMOUNT}",
        r"(?i)\bglucides\s*[:\-]?\s*{AMOUNT}",
    ]);
    static ref PROTEIN_PATTERNS: Vec<Regex> = family(&[
        r"(?i)\bprotein\s*[:\-]?\s*{AMOUNT}",
        r"(?i)(\d+(?:[.,]\d+)?)\s*(g)\s*(?:of\s+)?protein\b",
        r"(?i)\bprot[eé]ines?\s*[:\-]?\s*{AMOUNT}",
    ]);
    static ref TOTAL_SUGAR_PATTERNS: Vec<Regex> = family(&[
        r"(?i)\btotal\s*sugars?\s*[:\-]?\s*{AMOUNT}",
        r"(?i)(?:^|[\n,|;])\s*sugars?\s*[:\-]?\s*{AMOUNT}",
        r"(?i)\bsucres\s*[:\-]?\s*{AMOUNT}",
    ]);
    static ref ADDED_SUGAR_PATTERNS: Vec<Regex> = family(&[
        r"(?i)\badded\s*sugars?\s*[:\-]?\s*{AMOUNT}",
        r"(?i)\bincl(?:udes|\.)?\s*(\d+(?:[.,]\d+)?)\s*(mg|g)?\s*(?:of\s+)?added\s*sugars?",
    ]);
}

/// Parse nutrition fields from label text
///
/// Cosmetic products always receive the fixed not-applicable structure; food
/// products never do.
pub fn parse_nutrition(text: &str, product_type: &str) -> NutritionFields {
    if product_type == COSMETIC_PRODUCT {
        debug!("Cosmetic product, returning N/A nutrition");
        return NutritionFields::not_applicable();
    }

    let fields = NutritionFields {
        calories: parse_calories(text).map(Calories::Value),
        total_fat: first_amount(&FAT_PATTERNS, text),
        carbohydrates: first_amount(&CARB_PATTERNS, text),
        protein: first_amount(&PROTEIN_PATTERNS, text),
        sugars: SugarFields {
            total: first_amount(&TOTAL_SUGAR_PATTERNS, text),
            added: first_amount(&ADDED_SUGAR_PATTERNS, text),
            types: detect_sugar_types(text),
        },
    };

    info!(
        "Parsed nutrition: calories={:?}, fat={:?}, carbs={:?}, protein={:?}, sugars={:?}/{:?}, {} sugar types",
        fields.calories,
        fields.total_fat,
        fields.carbohydrates,
        fields.protein,
        fields.sugars.total,
        fields.sugars.added,
        fields.sugars.types.len()
    );
    fields
}

/// First calorie figure within range, trying each pattern family in order
pub fn parse_calories(text: &str) -> Option<u32> {
    for pattern in CALORIE_PATTERNS.iter() {
        for caps in pattern.captures_iter(text) {
            match caps[1].parse::<u32>() {
                Ok(value) if CALORIE_RANGE.contains(&value) => {
                    trace!("Calories {} matched by '{}'", value, pattern.as_str());
                    return Some(value);
                }
                _ => trace!("Discarding out-of-range calories '{}'", &caps[1]),
            }
        }
    }
    None
}

fn first_amount(patterns: &[Regex], text: &str) -> Option<String> {
    patterns.iter().find_map(|pattern| {
        pattern
            .captures(text)
            .map(|caps| normalize_amount(&caps[1], caps.get(2).map(|m| m.as_str())))
    })
}

/// Normalise an amount and optional unit to the compact "11g" form
pub fn normalize_amount(amount: &str, unit: Option<&str>) -> String {
    let amount = amount.replace(',', ".");
    let amount = match amount.parse::<f64>() {
        Ok(value) if value.fract() == 0.0 => format!("{}", value as u64),
        Ok(value) => format!("{value}"),
        Err(_) => amount,
    };
    let unit = unit.map(str::to_lowercase).unwrap_or_else(|| "g".to_string());
    format!("{amount}{unit}")
}

/// Detect named sugar sources; each is reported with amount "varies"
pub fn detect_sugar_types(text: &str) -> Vec<SugarType> {
    let mut remaining = text.to_lowercase();
    let mut types: Vec<SugarType> = Vec::new();

    for (keyword, label) in SUGAR_TYPES {
        if remaining.contains(keyword) {
            remaining = remaining.replace(keyword, " ");
            if !types.iter().any(|t| t.kind == *label) {
                types.push(SugarType {
                    kind: (*label).to_string(),
                    amount: "varies".to_string(),
                });
            }
        }
    }
    types
}

/// Human-readable nutrition text, or the localized placeholder
pub fn nutrition_text(fields: &NutritionFields, language: &str) -> String {
    if fields.is_not_applicable() {
        return t_lang("nutrition-not-applicable", language);
    }
    if !fields.has_numeric_data() {
        return t_lang("nutrition-not-found", language);
    }

    let mut parts = Vec::new();
    if let Some(calories) = fields.calories.and_then(Calories::value) {
        parts.push(format!("Calories: {calories}"));
    }
    let labelled = [
        ("Total Fat", &fields.total_fat),
        ("Carbohydrates", &fields.carbohydrates),
        ("Protein", &fields.protein),
        ("Total Sugars", &fields.sugars.total),
        ("Added Sugars", &fields.sugars.added),
    ];
    for (label, value) in labelled {
        if let Some(value) = value {
            parts.push(format!("{label}: {value}"));
        }
    }
    if !fields.sugars.types.is_empty() {
        let names: Vec<&str> = fields.sugars.types.iter().map(|t| t.kind.as_str()).collect();
        parts.push(format!("Sugar Types: {}", names.join(", ")));
    }
    parts.join(" | ")
}

/// Build the nutrition analysis returned to clients
pub fn summarize_nutrition(fields: &NutritionFields, language: &str) -> NutritionSummary {
    NutritionSummary {
        calories: fields.calories,
        total_sugars: fields.sugars.total.clone(),
        added_sugars: fields.sugars.added.clone(),
        sugar_types: fields.sugars.types.clone(),
        protein: fields.protein.clone(),
        total_fat: fields.total_fat.clone(),
        carbohydrates: fields.carbohydrates.clone(),
        message: nutrition_text(fields, language),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_calories_and_sugars_scenario() {
        let fields = parse_nutrition("190 calories, Total Sugars 11g, Added Sugars 10g", "Cereal");
        assert_eq!(fields.calories, Some(Calories::Value(190)));
        assert_eq!(fields.sugars.total.as_deref(), Some("11g"));
        assert_eq!(fields.sugars.added.as_deref(), Some("10g"));
    }

    #[test]
    fn test_calorie_range_enforced() {
        assert_eq!(parse_calories("Calories 0"), None);
        assert_eq!(parse_calories("Calories 12345"), None);
        assert_eq!(parse_calories("Calories 12345\n250 kcal"), Some(250));
        assert_eq!(parse_calories("Calories: 9999"), Some(9999));
    }

    #[test]
    fn test_nutrition_panel() {
        let text = "Nutrition Facts\nServing size 1 cup (31g)\nCalories 120\nTotal Fat 0.5g\n\
                    Sodium 220mg\nTotal Carbohydrate 23g\nTotal Sugars 4g\nIncludes 4g Added Sugars\nProtein 6g";
        let fields = parse_nutrition(text, "Cereal");
        assert_eq!(fields.calories, Some(Calories::Value(120)));
        assert_eq!(fields.total_fat.as_deref(), Some("0.5g"));
        assert_eq!(fields.carbohydrates.as_deref(), Some("23g"));
        assert_eq!(fields.protein.as_deref(), Some("6g"));
        assert_eq!(fields.sugars.total.as_deref(), Some("4g"));
        assert_eq!(fields.sugars.added.as_deref(), Some("4g"));
    }

    #[test]
    fn test_added_sugars_not_taken_as_total() {
        let fields = parse_nutrition("Calories 90\nAdded Sugars 6g", "Snack");
        assert_eq!(fields.sugars.total, None);
        assert_eq!(fields.sugars.added.as_deref(), Some("6g"));
    }

    #[test]
    fn test_cosmetic_short_circuits() {
        let fields = parse_nutrition("Calories 120", COSMETIC_PRODUCT);
        assert_eq!(fields, NutritionFields::not_applicable());
    }

    #[test]
    fn test_food_never_gets_not_applicable() {
        let fields = parse_nutrition("", "Cereal");
        assert!(!fields.is_not_applicable());
        assert_eq!(fields.calories, None);
    }

    #[test]
    fn test_sugar_types_detected_once() {
        let types = detect_sugar_types("Sugar, High Fructose Corn Syrup, Dextrose, Honey, Corn Syrup");
        let names: Vec<&str> = types.iter().map(|t| t.kind.as_str()).collect();
        assert_eq!(names, vec!["High Fructose Corn Syrup", "Corn Syrup", "Dextrose", "Honey"]);
        assert!(types.iter().all(|t| t.amount == "varies"));
    }

    #[test]
    fn test_placeholder_when_nothing_found() {
        let fields = parse_nutrition("nothing useful here", "Cereal");
        let text = nutrition_text(&fields, "en");
        assert!(text.contains("check the product packaging"));
        assert!(!text.contains('0'));
    }

    #[test]
    fn test_nutrition_text_lists_found_fields() {
        let fields = parse_nutrition("190 calories, Total Sugars 11g, Added Sugars 10g", "Cereal");
        assert_eq!(
            nutrition_text(&fields, "en"),
            "Calories: 190 | Total Sugars: 11g | Added Sugars: 10g"
        );
    }

    #[test]
    fn test_normalize_amount() {
        assert_eq!(normalize_amount("11", Some("G")), "11g");
        assert_eq!(normalize_amount("0,5", None), "0.5g");
        assert_eq!(normalize_amount("220", Some("mg")), "220mg");
    }
}
