//! Rule-based answers about a stored analysis, used when no language model is
//! configured or the configured one fails. Also builds the deterministic
//! product summary.

use log::debug;

use crate::ingredient_classifier::classify_ingredients;
use crate::ingredient_model::{Calories, Ingredient, ProductAnalysis, Safety, UNKNOWN_PRODUCT};
use crate::localization::t_args_lang;
use crate::localization::t_lang;

/// Question topics, checked in order
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChatIntent {
    Harmful,
    Sugar,
    Calories,
    Protein,
    Reviews,
    Ingredients,
    General,
}

const INTENT_RULES: &[(ChatIntent, &[&str])] = &[
    (
        ChatIntent::Harmful,
        &["harmful", "dangerous", "bad for", "unhealthy", "avoid", "safe", "toxic", "nocif"],
    ),
    (ChatIntent::Sugar, &["sugar", "sweet", "sucre"]),
    (ChatIntent::Calories, &["calorie", "kcal", "energy"]),
    (ChatIntent::Protein, &["protein", "protéine"]),
    (
        ChatIntent::Reviews,
        &["review", "rating", "reddit", "people think", "opinion", "avis"],
    ),
    (ChatIntent::Ingredients, &["ingredient", "contain", "made of", "ingrédient"]),
];

/// Detect what a question is about
pub fn detect_intent(question: &str) -> ChatIntent {
    let lower = question.to_lowercase();
    INTENT_RULES
        .iter()
        .find(|(_, keywords)| keywords.iter().any(|kw| lower.contains(kw)))
        .map(|(intent, _)| *intent)
        .unwrap_or(ChatIntent::General)
}

/// Classified ingredients of an analysis, computing them when not attached yet
fn ingredients_of(analysis: &ProductAnalysis) -> Vec<Ingredient> {
    match (&analysis.ingredients_data, &analysis.extracted_text.ingredients_list) {
        (Some(ingredients), _) => ingredients.clone(),
        (None, Some(list)) => classify_ingredients(list),
        (None, None) => Vec::new(),
    }
}

fn names(ingredients: &[&Ingredient]) -> String {
    ingredients.iter().map(|i| i.name.as_str()).collect::<Vec<_>>().join(", ")
}

/// Answer a question from the stored analysis alone
pub fn rule_based_answer(analysis: &ProductAnalysis, question: &str, language: &str) -> String {
    let product = analysis.product_name.as_str();
    let intent = detect_intent(question);
    debug!("Chat intent {:?} for '{}'", intent, question);

    match intent {
        ChatIntent::Harmful => {
            let ingredients = ingredients_of(analysis);
            let harmful: Vec<&Ingredient> = ingredients.iter().filter(|i| i.safety == Safety::Harmful).collect();
            let moderate: Vec<&Ingredient> = ingredients.iter().filter(|i| i.safety == Safety::Moderate).collect();

            let mut answer = if harmful.is_empty() {
                t_args_lang("chat-no-harmful", &[("product", product)], language)
            } else {
                t_args_lang(
                    "chat-harmful",
                    &[("product", product), ("list", &names(&harmful))],
                    language,
                )
            };
            if !moderate.is_empty() {
                answer.push(' ');
                answer.push_str(&t_args_lang("chat-moderate", &[("list", &names(&moderate))], language));
            }
            answer
        }
        ChatIntent::Sugar => {
            let sugars = &analysis.extracted_text.nutrition_data.sugars;
            match (&sugars.total, &sugars.added) {
                (None, None) => t_args_lang("chat-no-sugar", &[("product", product)], language),
                (total, added) => t_args_lang(
                    "chat-sugar",
                    &[
                        ("product", product),
                        ("total", total.as_deref().unwrap_or("?")),
                        ("added", added.as_deref().unwrap_or("?")),
                    ],
                    language,
                ),
            }
        }
        ChatIntent::Calories => match analysis.extracted_text.nutrition_data.calories {
            Some(Calories::Value(calories)) => t_args_lang(
                "chat-calories",
                &[("product", product), ("calories", &calories.to_string())],
                language,
            ),
            _ => t_args_lang("chat-no-calories", &[("product", product)], language),
        },
        ChatIntent::Protein => match &analysis.extracted_text.nutrition_data.protein {
            Some(protein) if protein != "N/A" => t_args_lang(
                "chat-protein",
                &[("product", product), ("protein", protein)],
                language,
            ),
            _ => t_args_lang("chat-default", &[("product", product)], language),
        },
        ChatIntent::Reviews => match &analysis.reddit_data {
            Some(reviews) => t_args_lang(
                "chat-reviews",
                &[
                    ("product", product),
                    ("rating", &format!("{:.1}", reviews.average_rating)),
                    ("mentions", &reviews.total_mentions.to_string()),
                    ("pros", &reviews.pros.join("; ")),
                    ("cons", &reviews.cons.join("; ")),
                ],
                language,
            ),
            None => t_args_lang("chat-no-reviews", &[("product", product)], language),
        },
        ChatIntent::Ingredients => match &analysis.extracted_text.ingredients_list {
            Some(list) if !list.is_empty() => t_args_lang(
                "chat-ingredients",
                &[
                    ("product", product),
                    ("count", &list.len().to_string()),
                    ("list", &list.join(", ")),
                ],
                language,
            ),
            _ => t_args_lang("chat-no-ingredients", &[("product", product)], language),
        },
        ChatIntent::General => t_args_lang("chat-default", &[("product", product)], language),
    }
}

/// Deterministic product summary built from the extracted fields
pub fn fallback_summary(
    product_name: &str,
    extracted: &crate::ingredient_model::ExtractedText,
    language: &str,
) -> String {
    if product_name == UNKNOWN_PRODUCT {
        return t_lang("summary-unknown", language);
    }

    let mut parts = vec![t_args_lang(
        "summary-product",
        &[
            ("product", product_name),
            ("brand", &extracted.brand),
            ("category", &extracted.category),
        ],
        language,
    )];

    match &extracted.ingredients_list {
        Some(list) => parts.push(t_args_lang(
            "summary-ingredients",
            &[("count", &list.len().to_string())],
            language,
        )),
        None => parts.push(t_lang("summary-no-ingredients", language)),
    }
    if extracted.is_cosmetic() {
        parts.push(t_lang("summary-cosmetic", language));
    }
    parts.join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::field_extractor::extract_fields;
    use crate::ingredient_model::ReviewSummary;

    fn analysis(text: &str, name: &str) -> ProductAnalysis {
        let extracted = extract_fields(text);
        ProductAnalysis::new(name, "summary", extracted)
    }

    #[test]
    fn test_detect_intent_order() {
        assert_eq!(detect_intent("Is the sugar in this safe?"), ChatIntent::Harmful);
        assert_eq!(detect_intent("How much sugar?"), ChatIntent::Sugar);
        assert_eq!(detect_intent("What are the reviews like"), ChatIntent::Reviews);
        assert_eq!(detect_intent("hello"), ChatIntent::General);
    }

    #[test]
    fn test_sugar_answer() {
        let analysis = analysis("Special K\n190 calories, Total Sugars 11g, Added Sugars 10g", "Special K");
        let answer = rule_based_answer(&analysis, "how much sugar is in it?", "en");
        assert_eq!(answer, "Special K has 11g of total sugars (10g added).");
    }

    #[test]
    fn test_harmful_answer_lists_moderate() {
        let analysis = analysis(
            "Ingredients: AQUA, NIACINAMIDE, ZINC PCA, PHENOXYETHANOL",
            "Niacinamide Serum",
        );
        let answer = rule_based_answer(&analysis, "anything harmful?", "en");
        assert!(answer.starts_with("None of the ingredients detected in Niacinamide Serum"));
        assert!(answer.contains("PHENOXYETHANOL"));
    }

    #[test]
    fn test_reviews_answer_needs_data() {
        let mut analysis = analysis("Granola Bar", "Granola Bar");
        let answer = rule_based_answer(&analysis, "reviews?", "en");
        assert_eq!(answer, "Review data for Granola Bar has not been loaded yet.");

        analysis.reddit_data = Some(ReviewSummary::new(vec!["Tasty".into()], vec!["Crumbly".into()], 4.2, 120));
        let answer = rule_based_answer(&analysis, "reviews?", "en");
        assert!(answer.contains("4.2 out of 5"));
        assert!(answer.contains("120 mentions"));
    }

    #[test]
    fn test_fallback_summary() {
        let unknown = extract_fields("");
        assert_eq!(fallback_summary(UNKNOWN_PRODUCT, &unknown, "en"), t_lang("summary-unknown", "en"));

        let extracted = extract_fields("Ingredients: AQUA, NIACINAMIDE, ZINC PCA, PHENOXYETHANOL");
        let summary = fallback_summary("Niacinamide Serum", &extracted, "en");
        assert!(summary.contains("4 ingredients detected"));
        assert!(summary.contains("Cosmetic product detected"));
    }
}
