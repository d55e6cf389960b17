//! # Product Analysis Data Model
//!
//! This module defines the data structures shared by every stage of the scan
//! pipeline: the text extracted from a label, nutrition figures, classified
//! ingredients, review sentiment and the persisted analysis aggregate.
//!
//! ## Core Concepts
//!
//! - **ExtractedText**: everything the extractor pulled out of one OCR pass
//! - **NutritionFields**: nutrition figures, where `None` means "not detected"
//! - **Ingredient**: an ingredient name with its safety tier and a reason
//! - **ReviewSummary**: pros, cons and rating drawn from crowd reviews
//! - **ProductAnalysis**: the stored aggregate one scan produces
//!
//! ## Usage
//!
//! ```rust
//! use scan_it_know_it::ingredient_model::{Ingredient, Safety};
//!
//! let water = Ingredient::new("Aqua", Safety::Safe, "Water, used as a solvent");
//! assert_eq!(water.safety.rank(), 0);
//! ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Product type assigned when cosmetic cues dominate the label text
pub const COSMETIC_PRODUCT: &str = "Cosmetic Product";

/// Product name used when nothing on the label looks like a title
pub const UNKNOWN_PRODUCT: &str = "Unknown Product";

/// Ephemeral upload, discarded once text has been extracted
#[derive(Debug, Clone)]
pub struct RawScan {
    /// Raw image bytes as uploaded
    pub image_bytes: Vec<u8>,
    /// Original file name reported by the client
    pub file_name: String,
}

impl RawScan {
    pub fn new(image_bytes: Vec<u8>, file_name: impl Into<String>) -> Self {
        Self {
            image_bytes,
            file_name: file_name.into(),
        }
    }
}

/// Safety tier of a single ingredient
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Safety {
    Safe,
    Moderate,
    Harmful,
}

impl Safety {
    /// Severity rank used for display ordering (Safe < Moderate < Harmful)
    pub fn rank(self) -> u8 {
        match self {
            Safety::Safe => 0,
            Safety::Moderate => 1,
            Safety::Harmful => 2,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Safety::Safe => "Safe",
            Safety::Moderate => "Moderate",
            Safety::Harmful => "Harmful",
        }
    }
}

impl fmt::Display for Safety {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A classified ingredient
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Ingredient {
    /// The ingredient as printed on the label (e.g., "AQUA", "High Fructose Corn Syrup")
    pub name: String,
    /// Safety tier
    pub safety: Safety,
    /// Short human-readable justification for the tier
    pub reason: String,
}

impl Ingredient {
    pub fn new(name: &str, safety: Safety, reason: &str) -> Self {
        Self {
            name: name.to_string(),
            safety,
            reason: reason.to_string(),
        }
    }
}

impl fmt::Display for Ingredient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} [{}] {}", self.name, self.safety, self.reason)
    }
}

/// Calorie figure: either a parsed number or explicitly not applicable
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Calories {
    Value(u32),
    NotApplicable,
}

impl Calories {
    pub fn value(self) -> Option<u32> {
        match self {
            Calories::Value(v) => Some(v),
            Calories::NotApplicable => None,
        }
    }
}

impl Serialize for Calories {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Calories::Value(v) => serializer.serialize_u32(*v),
            Calories::NotApplicable => serializer.serialize_str("N/A"),
        }
    }
}

impl<'de> Deserialize<'de> for Calories {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Number(u32),
            Text(String),
        }

        match Raw::deserialize(deserializer)? {
            Raw::Number(v) => Ok(Calories::Value(v)),
            Raw::Text(s) if s.eq_ignore_ascii_case("n/a") => Ok(Calories::NotApplicable),
            Raw::Text(s) => s
                .trim()
                .parse()
                .map(Calories::Value)
                .map_err(|_| serde::de::Error::custom(format!("invalid calories value: {s}"))),
        }
    }
}

/// A named sugar source detected on the label
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SugarType {
    #[serde(rename = "type")]
    pub kind: String,
    pub amount: String,
}

/// Sugar breakdown
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SugarFields {
    pub total: Option<String>,
    pub added: Option<String>,
    pub types: Vec<SugarType>,
}

/// Nutrition figures; every field is optional and `None` means "not detected"
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NutritionFields {
    pub calories: Option<Calories>,
    pub total_fat: Option<String>,
    pub carbohydrates: Option<String>,
    pub protein: Option<String>,
    pub sugars: SugarFields,
}

impl NutritionFields {
    /// Fixed structure reported for products that carry no nutrition panel
    pub fn not_applicable() -> Self {
        let na = || Some("N/A".to_string());
        Self {
            calories: Some(Calories::NotApplicable),
            total_fat: na(),
            carbohydrates: na(),
            protein: na(),
            sugars: SugarFields {
                total: na(),
                added: na(),
                types: Vec::new(),
            },
        }
    }

    pub fn is_not_applicable(&self) -> bool {
        self.calories == Some(Calories::NotApplicable)
    }

    /// Whether any numeric field was actually read from the label
    pub fn has_numeric_data(&self) -> bool {
        if self.is_not_applicable() {
            return false;
        }
        self.calories.and_then(Calories::value).is_some()
            || self.total_fat.is_some()
            || self.carbohydrates.is_some()
            || self.protein.is_some()
            || self.sugars.total.is_some()
            || self.sugars.added.is_some()
    }
}

/// Output of the product identifier
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductInfo {
    pub product_name: String,
    pub brand: String,
    pub product_type: String,
    pub category: String,
}

impl ProductInfo {
    pub fn unknown() -> Self {
        Self {
            product_name: UNKNOWN_PRODUCT.to_string(),
            brand: "Unknown".to_string(),
            product_type: "Food Product".to_string(),
            category: "Food".to_string(),
        }
    }

    pub fn is_cosmetic(&self) -> bool {
        self.product_type == COSMETIC_PRODUCT
    }
}

/// Structured fields pulled out of one OCR pass; immutable once built
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtractedText {
    pub all_text: String,
    pub ingredients: String,
    pub ingredients_list: Option<Vec<String>>,
    pub nutrition: String,
    pub nutrition_data: NutritionFields,
    pub brand: String,
    pub product_type: String,
    pub category: String,
}

impl ExtractedText {
    pub fn is_cosmetic(&self) -> bool {
        self.product_type == COSMETIC_PRODUCT
    }
}

/// Pros, cons and rating synthesised from crowd reviews
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewSummary {
    pub pros: Vec<String>,
    pub cons: Vec<String>,
    /// Always within 0.0..=5.0
    pub average_rating: f32,
    pub total_mentions: u32,
}

impl ReviewSummary {
    /// Build a summary, clamping the rating into the 0-5 range
    pub fn new(pros: Vec<String>, cons: Vec<String>, average_rating: f32, total_mentions: u32) -> Self {
        let rating = if average_rating.is_finite() {
            average_rating.clamp(0.0, 5.0)
        } else {
            0.0
        };
        Self {
            pros,
            cons,
            average_rating: (rating * 10.0).round() / 10.0,
            total_mentions,
        }
    }
}

/// Nutrition analysis as returned to clients
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NutritionSummary {
    pub calories: Option<Calories>,
    pub total_sugars: Option<String>,
    pub added_sugars: Option<String>,
    pub sugar_types: Vec<SugarType>,
    pub protein: Option<String>,
    pub total_fat: Option<String>,
    pub carbohydrates: Option<String>,
    /// Human-readable summary, or a placeholder when nothing was detected
    pub message: String,
}

/// Persisted aggregate for one scan
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductAnalysis {
    pub id: Uuid,
    pub product_name: String,
    pub product_summary: String,
    pub extracted_text: ExtractedText,
    pub ingredients_data: Option<Vec<Ingredient>>,
    pub nutrition_data: Option<NutritionSummary>,
    pub reddit_data: Option<ReviewSummary>,
    pub created_at: DateTime<Utc>,
}

impl ProductAnalysis {
    pub fn new(product_name: &str, product_summary: &str, extracted_text: ExtractedText) -> Self {
        Self {
            id: Uuid::new_v4(),
            product_name: product_name.to_string(),
            product_summary: product_summary.to_string(),
            extracted_text,
            ingredients_data: None,
            nutrition_data: None,
            reddit_data: None,
            created_at: Utc::now(),
        }
    }
}

/// One question/answer exchange attached to an analysis
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatMessage {
    pub id: Uuid,
    pub analysis_id: Uuid,
    pub message: String,
    pub response: String,
    pub timestamp: DateTime<Utc>,
}

impl ChatMessage {
    pub fn new(analysis_id: Uuid, message: &str, response: &str) -> Self {
        Self {
            id: Uuid::new_v4(),
            analysis_id,
            message: message.to_string(),
            response: response.to_string(),
            timestamp: Utc::now(),
        }
    }
}
