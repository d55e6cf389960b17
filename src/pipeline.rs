//! # Scan Pipeline
//!
//! Wires the stages of one scan together: upload validation, text
//! acquisition, product identification and field extraction, then the
//! product summary. Ingredient classification and nutrition summaries run on
//! demand against the extracted fields; reviews are looked up separately by
//! product name.
//!
//! The pipeline owns the [`PipelineConfig`] and builds the assistant and the
//! review service from it, so demo mode and the model provider have a single
//! source.

use std::sync::Arc;

use rand::rngs::StdRng;
use rand::SeedableRng;
use tracing::{info, instrument};

use crate::circuit_breaker::CircuitBreaker;
use crate::field_extractor::extract_product;
use crate::ingredient_classifier::classify_ingredients;
use crate::ingredient_model::{ExtractedText, Ingredient, NutritionSummary, ProductAnalysis, RawScan};
use crate::llm::{Assistant, LanguageModel, LlmProvider};
use crate::nutrition_parser::summarize_nutrition;
use crate::ocr::{acquire_text, validate_image, ImageRejection, TextRecognizer, TextSource};
use crate::ocr_config::{OcrConfig, RecoveryConfig};
use crate::reddit::{ReviewService, ReviewSource};

/// Behaviour switches for a pipeline instance
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PipelineConfig {
    /// No upstream calls: OCR, model and review lookups all use their fallbacks
    pub demo_mode: bool,
    pub provider: LlmProvider,
}

/// Upstream clients available to a pipeline; demo mode leaves all of them unused
#[derive(Default, Clone)]
pub struct Upstreams {
    pub recognizer: Option<Arc<dyn TextRecognizer>>,
    pub model: Option<Arc<dyn LanguageModel>>,
    pub reviews: Option<Arc<dyn ReviewSource>>,
}

/// A stored-ready analysis plus where its text came from
#[derive(Debug, Clone)]
pub struct ScanResult {
    pub analysis: ProductAnalysis,
    pub source: TextSource,
}

pub struct ScanPipeline {
    config: PipelineConfig,
    ocr: OcrConfig,
    recognizer: Option<Arc<dyn TextRecognizer>>,
    ocr_breaker: CircuitBreaker,
    assistant: Arc<Assistant>,
    reviews: Arc<ReviewService>,
}

impl ScanPipeline {
    pub fn new(config: PipelineConfig, ocr: OcrConfig, upstreams: Upstreams) -> Self {
        Self::with_rng(config, ocr, upstreams, StdRng::from_entropy())
    }

    /// Pipeline with an explicit random source for the review fallback
    pub fn with_rng(config: PipelineConfig, ocr: OcrConfig, upstreams: Upstreams, rng: StdRng) -> Self {
        let ocr_breaker = CircuitBreaker::new("ocr", ocr.recovery.clone());
        let assistant = Arc::new(Assistant::new(
            upstreams.model,
            CircuitBreaker::new("llm", RecoveryConfig::interactive()),
            config,
        ));
        let reviews = Arc::new(ReviewService::with_rng(
            upstreams.reviews,
            CircuitBreaker::new("reddit", RecoveryConfig::interactive()),
            config,
            rng,
        ));
        Self {
            config,
            ocr,
            recognizer: upstreams.recognizer,
            ocr_breaker,
            assistant,
            reviews,
        }
    }

    pub fn config(&self) -> PipelineConfig {
        self.config
    }

    pub fn ocr_config(&self) -> &OcrConfig {
        &self.ocr
    }

    pub fn assistant(&self) -> Arc<Assistant> {
        Arc::clone(&self.assistant)
    }

    pub fn reviews(&self) -> Arc<ReviewService> {
        Arc::clone(&self.reviews)
    }

    /// Run a scan through validation, OCR, extraction and summary
    ///
    /// Only a rejected upload is an error; every upstream failure degrades
    /// to its fallback.
    #[instrument(skip_all, fields(file = %scan.file_name, bytes = scan.image_bytes.len()))]
    pub async fn scan(&self, scan: &RawScan, language: &str) -> Result<ScanResult, ImageRejection> {
        validate_image(&scan.image_bytes, &self.ocr)?;

        let recognizer = if self.config.demo_mode {
            None
        } else {
            self.recognizer.as_deref()
        };
        let acquisition = acquire_text(recognizer, &self.ocr_breaker, scan).await;

        let (product, extracted) = extract_product(&acquisition.text, language);
        let summary = self
            .assistant
            .product_summary(&product.product_name, &extracted, language)
            .await;

        let analysis = ProductAnalysis::new(&product.product_name, &summary, extracted);
        info!(
            analysis_id = %analysis.id,
            product = %analysis.product_name,
            source = ?acquisition.source,
            "Scan analysed"
        );
        Ok(ScanResult {
            analysis,
            source: acquisition.source,
        })
    }
}

/// Classified ingredients, safest first; empty when no list was extracted
pub fn analyze_ingredients(extracted: &ExtractedText) -> Vec<Ingredient> {
    extracted
        .ingredients_list
        .as_deref()
        .map(classify_ingredients)
        .unwrap_or_default()
}

pub fn analyze_nutrition(extracted: &ExtractedText, language: &str) -> NutritionSummary {
    summarize_nutrition(&extracted.nutrition_data, language)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::field_extractor::extract_fields;
    use crate::ingredient_model::{Safety, COSMETIC_PRODUCT};
    use crate::ocr_errors::OcrError;
    use crate::reddit::RedditPost;
    use crate::review_synthesizer::SAMPLE_SIZE;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    const PNG: &[u8] = &[0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A, 0, 0, 0, 0x0D];

    struct LabelText(&'static str);

    #[async_trait]
    impl TextRecognizer for LabelText {
        fn name(&self) -> &str {
            "fixed"
        }

        async fn recognize(&self, _bytes: &[u8], _file_name: &str) -> Result<String, OcrError> {
            Ok(self.0.to_string())
        }
    }

    /// Upstream fake that counts every call it receives
    #[derive(Default)]
    struct Counting(AtomicUsize);

    impl Counting {
        fn hit(&self) {
            self.0.fetch_add(1, Ordering::SeqCst);
        }

        fn calls(&self) -> usize {
            self.0.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl TextRecognizer for Counting {
        fn name(&self) -> &str {
            "counting"
        }

        async fn recognize(&self, _bytes: &[u8], _file_name: &str) -> Result<String, OcrError> {
            self.hit();
            Ok("Special K\nIngredients: Rice, Sugar".to_string())
        }
    }

    #[async_trait]
    impl LanguageModel for Counting {
        fn name(&self) -> &str {
            "counting"
        }

        async fn complete(&self, _system: &str, _prompt: &str) -> Result<String, OcrError> {
            self.hit();
            Ok("model answer".to_string())
        }
    }

    #[async_trait]
    impl ReviewSource for Counting {
        async fn search(&self, query: &str) -> Result<Vec<RedditPost>, OcrError> {
            self.hit();
            Ok((0..5)
                .map(|n| RedditPost {
                    title: format!("{query} is great, bowl {n}"),
                    selftext: String::new(),
                    num_comments: 1,
                    subreddit: "food".to_string(),
                })
                .collect())
        }
    }

    fn pipeline(config: PipelineConfig, recognizer: Option<Arc<dyn TextRecognizer>>) -> ScanPipeline {
        let upstreams = Upstreams {
            recognizer,
            ..Upstreams::default()
        };
        ScanPipeline::new(config, OcrConfig::default(), upstreams)
    }

    fn counting_pipeline(config: PipelineConfig, counter: &Arc<Counting>) -> ScanPipeline {
        let upstreams = Upstreams {
            recognizer: Some(Arc::clone(counter) as Arc<dyn TextRecognizer>),
            model: Some(Arc::clone(counter) as Arc<dyn LanguageModel>),
            reviews: Some(Arc::clone(counter) as Arc<dyn ReviewSource>),
        };
        ScanPipeline::with_rng(config, OcrConfig::default(), upstreams, StdRng::seed_from_u64(11))
    }

    #[tokio::test]
    async fn test_scan_uses_recognized_text() {
        let recognizer: Arc<dyn TextRecognizer> =
            Arc::new(LabelText("CeraVe\nIngredients: AQUA, NIACINAMIDE, ZINC PCA, PHENOXYETHANOL"));
        let pipeline = pipeline(PipelineConfig::default(), Some(recognizer));

        let result = pipeline.scan(&RawScan::new(PNG.to_vec(), "serum.png"), "en").await.unwrap();
        assert_eq!(result.source, TextSource::Ocr);
        assert_eq!(result.analysis.extracted_text.product_type, COSMETIC_PRODUCT);
        assert!(result.analysis.extracted_text.nutrition_data.is_not_applicable());
    }

    #[tokio::test]
    async fn test_demo_mode_skips_recognizer() {
        let recognizer: Arc<dyn TextRecognizer> = Arc::new(LabelText("Ingredients: Oats"));
        let config = PipelineConfig {
            demo_mode: true,
            provider: LlmProvider::None,
        };
        let pipeline = pipeline(config, Some(recognizer));

        let result = pipeline
            .scan(&RawScan::new(PNG.to_vec(), "granola-bar.png"), "en")
            .await
            .unwrap();
        assert_eq!(result.source, TextSource::VisualFallback);
        assert_eq!(result.analysis.extracted_text.all_text, "Granola Bar");
    }

    #[tokio::test]
    async fn test_demo_mode_disables_every_upstream() {
        let counter = Arc::new(Counting::default());
        let config = PipelineConfig {
            demo_mode: true,
            provider: LlmProvider::OpenRouter,
        };
        let pipeline = counting_pipeline(config, &counter);

        let result = pipeline
            .scan(&RawScan::new(PNG.to_vec(), "special-k-original.png"), "en")
            .await
            .unwrap();
        assert_eq!(result.source, TextSource::VisualFallback);
        assert!(!pipeline.assistant().has_model());
        let answer = pipeline.assistant().answer(&result.analysis, "Is it healthy?", "en").await;
        assert_ne!(answer, "model answer");
        let reviews = pipeline.reviews().reviews_for(&result.analysis.product_name, &[]).await;
        assert_eq!(reviews.pros.len(), SAMPLE_SIZE);

        assert_eq!(counter.calls(), 0);
    }

    #[tokio::test]
    async fn test_live_mode_reaches_every_upstream() {
        let counter = Arc::new(Counting::default());
        let config = PipelineConfig {
            demo_mode: false,
            provider: LlmProvider::OpenRouter,
        };
        let pipeline = counting_pipeline(config, &counter);

        let result = pipeline.scan(&RawScan::new(PNG.to_vec(), "cereal.png"), "en").await.unwrap();
        assert_eq!(result.source, TextSource::Ocr);
        assert!(pipeline.assistant().has_model());
        let answer = pipeline.assistant().answer(&result.analysis, "Is it healthy?", "en").await;
        assert_eq!(answer, "model answer");
        let reviews = pipeline.reviews().reviews_for("Special K", &[]).await;
        assert!(reviews.pros[0].starts_with("Special K is great"));

        assert!(counter.calls() >= 3);
    }

    #[tokio::test]
    async fn test_rejected_upload() {
        let pipeline = pipeline(PipelineConfig::default(), None);
        let rejection = pipeline.scan(&RawScan::new(Vec::new(), "empty.png"), "en").await.unwrap_err();
        assert_eq!(rejection, ImageRejection::Empty);
    }

    #[test]
    fn test_analyze_ingredients_sorted_by_safety() {
        let extracted = extract_fields("Ingredients: High Fructose Corn Syrup, Whole Grain Oats, Sugar");
        let ingredients = analyze_ingredients(&extracted);
        let ranks: Vec<Safety> = ingredients.iter().map(|i| i.safety).collect();
        assert_eq!(ranks, vec![Safety::Safe, Safety::Moderate, Safety::Harmful]);
    }

    #[test]
    fn test_analyze_ingredients_without_list() {
        let extracted = extract_fields("~~ ##");
        assert!(analyze_ingredients(&extracted).is_empty());
    }
}
