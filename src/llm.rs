//! # LLM Module
//!
//! Optional language model used for product summaries and chat answers.
//! OpenRouter (chat completions) and HuggingFace (text generation inference)
//! are supported. Every call goes through [`with_resilience`]; when no
//! provider is configured, in demo mode, or when the call fails, the
//! deterministic answers from [`crate::chat`] are used instead.

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument, warn};

use crate::chat::{fallback_summary, rule_based_answer};
use crate::circuit_breaker::CircuitBreaker;
use crate::ingredient_model::{ExtractedText, ProductAnalysis, UNKNOWN_PRODUCT};
use crate::ocr_errors::OcrError;
use crate::pipeline::PipelineConfig;
use crate::retry::with_resilience;

pub const OPENROUTER_URL: &str = "https://openrouter.ai/api/v1/chat/completions";
pub const OPENROUTER_MODEL: &str = "mistralai/mistral-7b-instruct";
pub const HUGGINGFACE_URL: &str = "https://api-inference.huggingface.co/models";
pub const HUGGINGFACE_MODEL: &str = "mistralai/Mistral-7B-Instruct-v0.2";

/// Prompt text sent with OCR output is capped to keep requests small
const MAX_PROMPT_TEXT_CHARS: usize = 2000;

const SUMMARY_SYSTEM: &str = "You summarise product labels for shoppers. Answer in two or three short \
sentences using only the label text provided. Do not invent ingredients or numbers.";
const CHAT_SYSTEM: &str = "You answer questions about one scanned product using only the analysis \
provided. Be brief and factual. If the analysis does not contain the answer, say so.";

/// Which hosted model API to use
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LlmProvider {
    OpenRouter,
    HuggingFace,
    #[default]
    None,
}

impl LlmProvider {
    /// Parse an `LLM_PROVIDER` value; unknown values disable the model
    pub fn parse(value: &str) -> Self {
        match value.trim().to_lowercase().as_str() {
            "openrouter" => LlmProvider::OpenRouter,
            "huggingface" | "hf" => LlmProvider::HuggingFace,
            _ => LlmProvider::None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            LlmProvider::OpenRouter => "openrouter",
            LlmProvider::HuggingFace => "huggingface",
            LlmProvider::None => "none",
        }
    }
}

/// Connection settings for the hosted model client
///
/// Which provider is used is part of [`PipelineConfig`]; these are its
/// endpoint, credentials and limits.
#[derive(Debug, Clone)]
pub struct LlmConfig {
    pub api_key: Option<String>,
    pub base_url: String,
    pub model: String,
    pub max_tokens: u32,
    /// Timeout in seconds (default: 20)
    pub timeout_secs: u64,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self::for_provider(LlmProvider::None, None)
    }
}

impl LlmConfig {
    /// Defaults for a provider
    pub fn for_provider(provider: LlmProvider, api_key: Option<String>) -> Self {
        let (base_url, model) = match provider {
            LlmProvider::HuggingFace => (HUGGINGFACE_URL, HUGGINGFACE_MODEL),
            LlmProvider::OpenRouter | LlmProvider::None => (OPENROUTER_URL, OPENROUTER_MODEL),
        };
        Self {
            api_key,
            base_url: base_url.to_string(),
            model: model.to_string(),
            max_tokens: 300,
            timeout_secs: 20,
        }
    }
}

/// A text completion backend
#[async_trait]
pub trait LanguageModel: Send + Sync {
    fn name(&self) -> &str;

    async fn complete(&self, system: &str, prompt: &str) -> Result<String, OcrError>;
}

/// Build the model for `provider`; `None` when disabled or missing its key
pub fn build_model(provider: LlmProvider, config: &LlmConfig) -> anyhow::Result<Option<Arc<dyn LanguageModel>>> {
    if provider == LlmProvider::None {
        return Ok(None);
    }
    let Some(api_key) = config.api_key.clone().filter(|key| !key.trim().is_empty()) else {
        warn!(provider = provider.as_str(), "LLM provider configured without an API key");
        return Ok(None);
    };
    let client = reqwest::Client::builder()
        .timeout(std::time::Duration::from_secs(config.timeout_secs))
        .build()?;

    let model: Option<Arc<dyn LanguageModel>> = match provider {
        LlmProvider::OpenRouter => Some(Arc::new(OpenRouterClient {
            config: config.clone(),
            api_key,
            client,
        })),
        LlmProvider::HuggingFace => Some(Arc::new(HuggingFaceClient {
            config: config.clone(),
            api_key,
            client,
        })),
        LlmProvider::None => None,
    };
    Ok(model)
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub role: String,
    pub content: String,
}

/// OpenRouter chat completion request
#[derive(Debug, Clone, Serialize)]
pub struct CompletionRequest {
    pub model: String,
    pub messages: Vec<Message>,
    pub max_tokens: u32,
    pub temperature: f32,
}

#[derive(Debug, Deserialize)]
struct CompletionResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: Message,
}

pub struct OpenRouterClient {
    config: LlmConfig,
    api_key: String,
    client: reqwest::Client,
}

#[async_trait]
impl LanguageModel for OpenRouterClient {
    fn name(&self) -> &str {
        "openrouter"
    }

    async fn complete(&self, system: &str, prompt: &str) -> Result<String, OcrError> {
        let request = CompletionRequest {
            model: self.config.model.clone(),
            messages: vec![
                Message {
                    role: "system".to_string(),
                    content: system.to_string(),
                },
                Message {
                    role: "user".to_string(),
                    content: prompt.to_string(),
                },
            ],
            max_tokens: self.config.max_tokens,
            temperature: 0.3,
        };

        let response = self
            .client
            .post(&self.config.base_url)
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(OcrError::Provider(format!("OpenRouter API error: {}", response.status())));
        }

        let body: CompletionResponse = response.json().await?;
        body.choices
            .into_iter()
            .next()
            .map(|choice| choice.message.content.trim().to_string())
            .filter(|content| !content.is_empty())
            .ok_or_else(|| OcrError::Extraction("OpenRouter returned no completion".to_string()))
    }
}

/// HuggingFace text generation request
#[derive(Debug, Clone, Serialize)]
pub struct GenerationRequest {
    pub inputs: String,
    pub parameters: GenerationParameters,
}

#[derive(Debug, Clone, Serialize)]
pub struct GenerationParameters {
    pub max_new_tokens: u32,
    pub return_full_text: bool,
}

#[derive(Debug, Deserialize)]
struct Generation {
    #[serde(default)]
    generated_text: String,
}

pub struct HuggingFaceClient {
    config: LlmConfig,
    api_key: String,
    client: reqwest::Client,
}

#[async_trait]
impl LanguageModel for HuggingFaceClient {
    fn name(&self) -> &str {
        "huggingface"
    }

    async fn complete(&self, system: &str, prompt: &str) -> Result<String, OcrError> {
        let url = format!("{}/{}", self.config.base_url.trim_end_matches('/'), self.config.model);
        let request = GenerationRequest {
            inputs: format!("<s>[INST] {system}\n\n{prompt} [/INST]"),
            parameters: GenerationParameters {
                max_new_tokens: self.config.max_tokens,
                return_full_text: false,
            },
        };

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(OcrError::Provider(format!("HuggingFace API error: {}", response.status())));
        }

        let generations: Vec<Generation> = response.json().await?;
        generations
            .into_iter()
            .next()
            .map(|generation| generation.generated_text.trim().to_string())
            .filter(|text| !text.is_empty())
            .ok_or_else(|| OcrError::Extraction("HuggingFace returned no text".to_string()))
    }
}

fn truncate(text: &str, max_chars: usize) -> String {
    text.chars().take(max_chars).collect()
}

/// User prompt for a product summary
pub fn summary_prompt(product_name: &str, extracted: &ExtractedText) -> String {
    format!(
        "Product: {product_name}\nBrand: {}\nType: {}\nIngredients: {}\nNutrition: {}\n\nLabel text:\n{}",
        extracted.brand,
        extracted.product_type,
        extracted.ingredients,
        extracted.nutrition,
        truncate(&extracted.all_text, MAX_PROMPT_TEXT_CHARS)
    )
}

/// User prompt for a chat question about an analysis
pub fn chat_prompt(analysis: &ProductAnalysis, question: &str) -> String {
    let mut prompt = format!(
        "Product: {}\nSummary: {}\nIngredients: {}\nNutrition: {}\n",
        analysis.product_name,
        analysis.product_summary,
        analysis.extracted_text.ingredients,
        analysis.extracted_text.nutrition
    );
    if let Some(ingredients) = &analysis.ingredients_data {
        let flagged: Vec<String> = ingredients
            .iter()
            .filter(|ingredient| ingredient.safety.rank() > 0)
            .map(ToString::to_string)
            .collect();
        if !flagged.is_empty() {
            prompt.push_str(&format!("Flagged ingredients: {}\n", flagged.join("; ")));
        }
    }
    if let Some(reviews) = &analysis.reddit_data {
        prompt.push_str(&format!(
            "Reviews: rated {:.1}/5 over {} mentions. Pros: {}. Cons: {}.\n",
            reviews.average_rating,
            reviews.total_mentions,
            reviews.pros.join("; "),
            reviews.cons.join("; ")
        ));
    }
    prompt.push_str(&format!("\nQuestion: {question}"));
    prompt
}

/// Summaries and chat answers with a rule-based fallback
pub struct Assistant {
    model: Option<Arc<dyn LanguageModel>>,
    breaker: CircuitBreaker,
    config: PipelineConfig,
}

impl Assistant {
    pub fn new(model: Option<Arc<dyn LanguageModel>>, breaker: CircuitBreaker, config: PipelineConfig) -> Self {
        Self { model, breaker, config }
    }

    /// Whether answers can come from a model
    pub fn has_model(&self) -> bool {
        self.model.is_some() && !self.config.demo_mode
    }

    /// Short product summary
    #[instrument(skip(self, extracted))]
    pub async fn product_summary(&self, product_name: &str, extracted: &ExtractedText, language: &str) -> String {
        if product_name != UNKNOWN_PRODUCT {
            if let Some(summary) = self.ask(SUMMARY_SYSTEM, summary_prompt(product_name, extracted)).await {
                return summary;
            }
        }
        fallback_summary(product_name, extracted, language)
    }

    /// Answer a chat question about a stored analysis
    #[instrument(skip(self, analysis), fields(analysis_id = %analysis.id))]
    pub async fn answer(&self, analysis: &ProductAnalysis, question: &str, language: &str) -> String {
        if let Some(answer) = self.ask(CHAT_SYSTEM, chat_prompt(analysis, question)).await {
            return answer;
        }
        rule_based_answer(analysis, question, language)
    }

    async fn ask(&self, system: &str, prompt: String) -> Option<String> {
        if self.config.demo_mode {
            debug!("Demo mode, skipping language model");
            return None;
        }
        let model = self.model.as_ref()?;
        let prompt = prompt.as_str();

        match with_resilience(&self.breaker, move || model.complete(system, prompt)).await {
            Ok(text) => {
                info!(provider = model.name(), chars = text.len(), "Language model answered");
                Some(text)
            }
            Err(err) => {
                warn!(provider = model.name(), "Language model failed, using rule-based answer: {err}");
                None
            }
        }
    }
}
