//! # Ingredient Classifier
//!
//! Assigns a [`Safety`] tier and a short reason to each ingredient name using a
//! fixed, ordered decision list. Rule families are checked in this order:
//!
//! 1. cosmetic safe
//! 2. cosmetic moderate
//! 3. food harmful
//! 4. food moderate
//! 5. food safe
//!
//! The first matching rule wins, except that a food-harmful match always
//! replaces an earlier cosmetic match on the same string. Names matching no
//! rule are Safe with a generic reason.

use log::{debug, trace};

use crate::ingredient_model::{Ingredient, Safety};

const DEFAULT_REASON: &str = "Generally recognized as safe";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RuleFamily {
    CosmeticSafe,
    CosmeticModerate,
    FoodHarmful,
    FoodModerate,
    FoodSafe,
}

/// One entry of the decision list
struct Rule {
    family: RuleFamily,
    keywords: &'static [&'static str],
    /// The rule is skipped when any of these also occur in the name
    unless: &'static [&'static str],
    safety: Safety,
    reason: &'static str,
}

const fn rule(
    family: RuleFamily,
    keywords: &'static [&'static str],
    safety: Safety,
    reason: &'static str,
) -> Rule {
    Rule {
        family,
        keywords,
        unless: &[],
        safety,
        reason,
    }
}

impl Rule {
    fn matches(&self, lower: &str) -> bool {
        self.keywords.iter().any(|kw| lower.contains(kw)) && !self.unless.iter().any(|kw| lower.contains(kw))
    }
}

use RuleFamily::*;

static RULES: &[Rule] = &[
    // Cosmetic safe
    rule(CosmeticSafe, &["aqua", "water"], Safety::Safe, "Water, used as the base solvent"),
    rule(CosmeticSafe, &["niacinamide"], Safety::Safe, "Vitamin B3, soothes and brightens skin"),
    rule(CosmeticSafe, &["zinc pca"], Safety::Safe, "Zinc salt that helps regulate sebum"),
    rule(
        CosmeticSafe,
        &["glycerin", "hyaluronic", "hyaluronate", "panthenol", "squalane", "allantoin", "ceramide"],
        Safety::Safe,
        "Well-tolerated humectant or skin-conditioning agent",
    ),
    rule(
        CosmeticSafe,
        &["pentylene glycol", "butylene glycol", "propanediol", "caprylyl glycol"],
        Safety::Safe,
        "Mild solvent and humectant",
    ),
    rule(CosmeticSafe, &["tamarindus indica"], Safety::Safe, "Plant-derived moisturizing extract"),
    rule(
        CosmeticSafe,
        &["xanthan gum", "carbomer", "isoceteth"],
        Safety::Safe,
        "Thickener or stabilizer, low irritation potential",
    ),
    // Cosmetic moderate
    rule(
        CosmeticModerate,
        &["phenoxyethanol"],
        Safety::Moderate,
        "Preservative, may irritate sensitive skin at high concentrations",
    ),
    rule(CosmeticModerate, &["chlorphenesin"], Safety::Moderate, "Preservative, potential sensitizer"),
    rule(
        CosmeticModerate,
        &["peg-", "peg ", "ppg-", "polysorbate"],
        Safety::Moderate,
        "Synthetic emulsifier, may carry impurities",
    ),
    rule(
        CosmeticModerate,
        &["fragrance", "parfum"],
        Safety::Moderate,
        "Fragrance blend, common cause of skin sensitivity",
    ),
    // Food harmful
    rule(
        FoodHarmful,
        &["partially hydrogenated", "trans fat"],
        Safety::Harmful,
        "Source of trans fats linked to heart disease",
    ),
    rule(
        FoodHarmful,
        &["high fructose corn syrup", "hfcs"],
        Safety::Harmful,
        "Highly processed sweetener linked to metabolic issues",
    ),
    rule(
        FoodHarmful,
        &["sodium nitrite", "sodium nitrate"],
        Safety::Harmful,
        "Curing agent that can form nitrosamines",
    ),
    rule(
        FoodHarmful,
        &["bha", "bht", "butylated hydroxy", "tbhq"],
        Safety::Harmful,
        "Synthetic antioxidant preservative with health concerns",
    ),
    rule(
        FoodHarmful,
        &["monosodium glutamate", "msg"],
        Safety::Harmful,
        "Flavor enhancer some people react to",
    ),
    rule(
        FoodHarmful,
        &["aspartame", "sucralose", "acesulfame", "saccharin"],
        Safety::Harmful,
        "Artificial sweetener",
    ),
    rule(
        FoodHarmful,
        &["red 40", "yellow 5", "yellow 6", "blue 1", "potassium bromate"],
        Safety::Harmful,
        "Synthetic additive with health concerns",
    ),
    // Food moderate
    rule(
        FoodModerate,
        &["sugar", "syrup", "dextrose", "fructose", "maltodextrin", "glucose"],
        Safety::Moderate,
        "Added sugar, limit intake",
    ),
    Rule {
        family: FoodModerate,
        keywords: &["salt", "sodium"],
        unless: &["sea salt"],
        safety: Safety::Moderate,
        reason: "Sodium source, limit intake",
    },
    rule(
        FoodModerate,
        &["artificial flavor", "artificial flavour", "artificial color", "caramel color"],
        Safety::Moderate,
        "Artificial additive",
    ),
    rule(
        FoodModerate,
        &["preservative", "benzoate", "sorbate", "sulfite"],
        Safety::Moderate,
        "Preservative, generally safe in small amounts",
    ),
    rule(FoodModerate, &["modified", "palm oil"], Safety::Moderate, "Highly processed ingredient"),
    // Food safe
    rule(
        FoodSafe,
        &["whole grain", "whole wheat", "oats", "brown rice", "quinoa"],
        Safety::Safe,
        "Whole grain, source of fiber",
    ),
    rule(
        FoodSafe,
        &["vitamin", "niacin", "riboflavin", "thiamin", "folic acid", "iron", "zinc", "calcium"],
        Safety::Safe,
        "Vitamin or mineral fortification",
    ),
    rule(FoodSafe, &["fiber", "fibre", "inulin"], Safety::Safe, "Dietary fiber"),
    rule(FoodSafe, &["natural flavor", "natural flavour"], Safety::Safe, "Natural flavoring"),
    rule(
        FoodSafe,
        &["honey", "stevia", "monk fruit", "dates"],
        Safety::Safe,
        "Natural sweetener, fine in moderation",
    ),
    rule(
        FoodSafe,
        &["olive oil", "canola oil", "sunflower oil", "avocado oil", "almond", "nuts"],
        Safety::Safe,
        "Source of healthy fats",
    ),
    rule(FoodSafe, &["sea salt"], Safety::Safe, "Minimally processed salt"),
];

/// Classify one ingredient name
pub fn classify_ingredient(name: &str) -> Ingredient {
    let lower = name.to_lowercase();

    let Some(first) = RULES.iter().find(|rule| rule.matches(&lower)) else {
        trace!("No rule for '{}', defaulting to Safe", name);
        return Ingredient::new(name, Safety::Safe, DEFAULT_REASON);
    };

    let chosen = if first.safety == Safety::Harmful {
        first
    } else {
        RULES
            .iter()
            .filter(|rule| rule.family == FoodHarmful)
            .find(|rule| rule.matches(&lower))
            .unwrap_or(first)
    };

    trace!("Classified '{}' as {} ({:?})", name, chosen.safety, chosen.family);
    Ingredient::new(name, chosen.safety, chosen.reason)
}

/// Classify every ingredient, sorted Safe → Moderate → Harmful
///
/// The sort is stable, so ingredients keep their label order within a tier.
pub fn classify_ingredients(names: &[String]) -> Vec<Ingredient> {
    let mut classified: Vec<Ingredient> = names.iter().map(|name| classify_ingredient(name)).collect();
    classified.sort_by_key(|ingredient| ingredient.safety.rank());

    debug!(
        "Classified {} ingredients: {} harmful, {} moderate",
        classified.len(),
        classified.iter().filter(|i| i.safety == Safety::Harmful).count(),
        classified.iter().filter(|i| i.safety == Safety::Moderate).count()
    );
    classified
}
