//! # Review Synthesizer
//!
//! Produces a plausible crowd-review summary when live review data is not
//! available. Products are sorted into a bucket by name and ingredient cues;
//! each bucket owns a fixed pool of pros and cons from which exactly four of
//! each are drawn at random, plus a rating and mention count from a
//! bucket-specific range.
//!
//! The random source is injected, so a seeded `StdRng` gives repeatable output.

use log::debug;
use rand::seq::SliceRandom;
use rand::Rng;
use std::ops::RangeInclusive;

use crate::ingredient_model::ReviewSummary;
use crate::product_identifier::FOOD_CREAM_PHRASES;

/// Number of pros and of cons in every synthesized summary
pub const SAMPLE_SIZE: usize = 4;

const COSMETIC_CUES: &[&str] = &[
    "serum",
    "cream",
    "moistur",
    "cleanser",
    "toner",
    "lotion",
    "sunscreen",
    "spf",
    "skincare",
    "skin care",
];
// Only ingredients that do not also appear on food labels
const COSMETIC_INGREDIENT_CUES: &[&str] = &["aqua", "niacinamide", "zinc pca", "phenoxyethanol"];

/// Review bucket a product falls into
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReviewBucket {
    Skincare,
    SpecialK,
    Granola,
    Generic,
}

struct BucketProfile {
    pros: &'static [&'static str],
    cons: &'static [&'static str],
    rating: RangeInclusive<f32>,
    mentions: RangeInclusive<u32>,
}

static SKINCARE: BucketProfile = BucketProfile {
    pros: &[
        "Lightweight texture that absorbs quickly",
        "Visibly reduces redness and blemishes",
        "Fragrance-free formula suits sensitive skin",
        "Layers well under moisturizer and sunscreen",
        "Great value for the amount of product",
        "Noticeable improvement in skin texture after a few weeks",
        "Does not clog pores",
    ],
    cons: &[
        "Can pill when layered with some products",
        "Some users report initial breakouts",
        "Slightly sticky finish",
        "Dropper packaging makes it hard to get the last drops",
        "Results take several weeks to show",
        "May sting on freshly exfoliated skin",
    ],
    rating: 4.0..=4.7,
    mentions: 80..=400,
};

static SPECIAL_K: BucketProfile = BucketProfile {
    pros: &[
        "Light and crispy texture",
        "Lower calorie option for breakfast",
        "Good source of added vitamins and minerals",
        "Pairs well with fruit and yogurt",
        "Convenient portion-controlled meal",
        "Mild flavor the whole family eats",
    ],
    cons: &[
        "Gets soggy quickly in milk",
        "Not very filling on its own",
        "Contains more added sugar than expected",
        "Low in fiber compared to bran cereals",
        "Price has gone up noticeably",
        "Flavor can feel bland",
        "Smaller box sizes than before",
    ],
    rating: 3.4..=4.1,
    mentions: 120..=450,
};

static GRANOLA: BucketProfile = BucketProfile {
    pros: &[
        "Satisfying crunch",
        "Convenient on-the-go snack",
        "Made with whole grain oats",
        "Keeps well in a bag or desk drawer",
        "Tastes great with honey flavor",
        "Good pre-workout energy",
        "Kids love them",
    ],
    cons: &[
        "Crumbles easily and makes a mess",
        "Higher in sugar than expected",
        "Very hard texture",
        "Small serving size",
        "Contains added oils",
        "Can get stale after opening",
    ],
    rating: 3.6..=4.4,
    mentions: 60..=300,
};

static GENERIC: BucketProfile = BucketProfile {
    pros: &[
        "Good taste overall",
        "Reasonably priced",
        "Easy to find in most stores",
        "Consistent quality",
        "Convenient packaging",
        "Simple ingredient list",
    ],
    cons: &[
        "Could be healthier",
        "Packaging is hard to reseal",
        "Portion sizes are small",
        "Some find it too salty or sweet",
        "Limited flavor options",
        "Price varies a lot between stores",
    ],
    rating: 3.0..=4.3,
    mentions: 20..=200,
};

impl ReviewBucket {
    fn profile(self) -> &'static BucketProfile {
        match self {
            ReviewBucket::Skincare => &SKINCARE,
            ReviewBucket::SpecialK => &SPECIAL_K,
            ReviewBucket::Granola => &GRANOLA,
            ReviewBucket::Generic => &GENERIC,
        }
    }

    /// The fixed pros pool of this bucket
    pub fn pros_pool(self) -> &'static [&'static str] {
        self.profile().pros
    }

    /// The fixed cons pool of this bucket
    pub fn cons_pool(self) -> &'static [&'static str] {
        self.profile().cons
    }

    pub fn rating_range(self) -> RangeInclusive<f32> {
        self.profile().rating.clone()
    }

    pub fn mentions_range(self) -> RangeInclusive<u32> {
        self.profile().mentions.clone()
    }
}

/// Pick the review bucket for a product name and its ingredients
pub fn review_bucket(product_name: &str, ingredients: &[String]) -> ReviewBucket {
    let name = product_name.to_lowercase();

    let mut cue_text = name.clone();
    for phrase in FOOD_CREAM_PHRASES {
        cue_text = cue_text.replace(phrase, " ");
    }
    let cosmetic_name = COSMETIC_CUES.iter().any(|cue| cue_text.contains(cue));
    let cosmetic_ingredients = ingredients.iter().any(|ingredient| {
        let lower = ingredient.to_lowercase();
        COSMETIC_INGREDIENT_CUES.iter().any(|cue| lower.contains(cue))
    });

    if cosmetic_name || cosmetic_ingredients {
        ReviewBucket::Skincare
    } else if name.contains("special k") {
        ReviewBucket::SpecialK
    } else if name.contains("granola") || name.split_whitespace().any(|w| w == "bar" || w == "bars") {
        ReviewBucket::Granola
    } else {
        ReviewBucket::Generic
    }
}

/// Synthesize a review summary using the supplied random source
pub fn synthesize_reviews<R: Rng + ?Sized>(product_name: &str, ingredients: &[String], rng: &mut R) -> ReviewSummary {
    let bucket = review_bucket(product_name, ingredients);
    let profile = bucket.profile();

    let pros = sample(profile.pros, rng);
    let cons = sample(profile.cons, rng);
    let rating = rng.gen_range(profile.rating.clone());
    let mentions = rng.gen_range(profile.mentions.clone());

    debug!(
        "Synthesized {:?} reviews for '{}': rating {:.1}, {} mentions",
        bucket, product_name, rating, mentions
    );
    ReviewSummary::new(pros, cons, rating, mentions)
}

fn sample<R: Rng + ?Sized>(pool: &[&str], rng: &mut R) -> Vec<String> {
    let mut shuffled: Vec<&str> = pool.to_vec();
    shuffled.shuffle(rng);
    shuffled.into_iter().take(SAMPLE_SIZE).map(str::to_string).collect()
}
