//! # OCR Module
//!
//! Turns an uploaded label photo into raw text.
//!
//! - Upload validation: magic-byte format detection with `image::guess_format`
//!   and format-specific size limits
//! - Recognition through an OCR.space-compatible HTTP provider behind
//!   [`with_resilience`](crate::retry::with_resilience)
//! - Filename fallback when the provider is unavailable, fails or times out
//!
//! Only validation failures are reported to the caller; every other failure
//! degrades to the visual fallback.

use async_trait::async_trait;
use image::ImageFormat;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument, warn};

use crate::circuit_breaker::CircuitBreaker;
use crate::ingredient_model::RawScan;
use crate::ocr_config::OcrConfig;
use crate::ocr_errors::OcrError;
use crate::retry::with_resilience;
use crate::text_processing::{clean_ocr_text, title_case};

/// File name tokens produced by cameras and phones rather than by people
const CAMERA_TOKENS: &[&str] = &[
    "img", "image", "dsc", "dscn", "dcim", "pxl", "photo", "pic", "scan", "screenshot", "whatsapp", "jpeg",
    "jpg", "png", "webp", "heic", "edited", "copy", "final", "label",
];

/// Why an upload was rejected before recognition
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImageRejection {
    Empty,
    Unsupported,
    TooLarge { size: u64, limit: u64 },
}

impl ImageRejection {
    /// Localization key for the user-facing message
    pub fn message_key(&self) -> &'static str {
        match self {
            ImageRejection::Empty => "error-empty-image",
            ImageRejection::Unsupported => "error-unsupported-format",
            ImageRejection::TooLarge { .. } => "error-image-too-large",
        }
    }
}

impl std::fmt::Display for ImageRejection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ImageRejection::Empty => write!(f, "image is empty"),
            ImageRejection::Unsupported => write!(f, "unsupported image format"),
            ImageRejection::TooLarge { size, limit } => {
                write!(f, "image is {size} bytes, limit is {limit} bytes")
            }
        }
    }
}

impl From<ImageRejection> for OcrError {
    fn from(rejection: ImageRejection) -> Self {
        OcrError::Validation(rejection.to_string())
    }
}

/// Validate uploaded bytes and detect their format
///
/// Supported formats: PNG, JPEG, BMP, TIFF and WebP, each with its own size limit.
pub fn validate_image(bytes: &[u8], config: &OcrConfig) -> Result<ImageFormat, ImageRejection> {
    let size = bytes.len() as u64;
    if bytes.is_empty() {
        return Err(ImageRejection::Empty);
    }
    if size > config.format_limits.min_quick_reject {
        info!("Quick rejecting upload of {size} bytes");
        return Err(ImageRejection::TooLarge {
            size,
            limit: config.format_limits.min_quick_reject,
        });
    }
    if bytes.len() < config.min_format_bytes {
        debug!("Upload of {size} bytes is too short for format detection");
        return Err(ImageRejection::Unsupported);
    }

    let format = image::guess_format(bytes).map_err(|_| ImageRejection::Unsupported)?;
    let limits = &config.format_limits;
    let limit = match format {
        ImageFormat::Png => limits.png_max,
        ImageFormat::Jpeg => limits.jpeg_max,
        ImageFormat::Bmp => limits.bmp_max,
        ImageFormat::Tiff => limits.tiff_max,
        ImageFormat::WebP => limits.webp_max,
        other => {
            info!("Detected unsupported format {other:?}");
            return Err(ImageRejection::Unsupported);
        }
    };

    if size > limit {
        info!("Upload of {size} bytes exceeds {format:?} limit of {limit} bytes");
        return Err(ImageRejection::TooLarge { size, limit });
    }
    debug!("Detected {format:?} upload of {size} bytes");
    Ok(format)
}

/// MIME type sent to the provider for a detected format
pub fn mime_type(format: ImageFormat) -> &'static str {
    match format {
        ImageFormat::Png => "image/png",
        ImageFormat::Jpeg => "image/jpeg",
        ImageFormat::Bmp => "image/bmp",
        ImageFormat::Tiff => "image/tiff",
        ImageFormat::WebP => "image/webp",
        _ => "application/octet-stream",
    }
}

/// A text recognition backend
#[async_trait]
pub trait TextRecognizer: Send + Sync {
    /// Short name used in logs
    fn name(&self) -> &str;

    /// Recognize the text in one image
    async fn recognize(&self, bytes: &[u8], file_name: &str) -> Result<String, OcrError>;
}

/// OCR.space-compatible HTTP client
pub struct OcrSpaceClient {
    config: OcrConfig,
    api_key: String,
    client: reqwest::Client,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct OcrSpaceResponse {
    #[serde(default)]
    parsed_results: Vec<ParsedResult>,
    #[serde(default)]
    is_errored_on_processing: bool,
    #[serde(default)]
    error_message: Option<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct ParsedResult {
    #[serde(default)]
    parsed_text: String,
}

impl OcrSpaceClient {
    /// Create a client; returns `None` when no API key is configured
    pub fn from_config(config: OcrConfig) -> anyhow::Result<Option<Self>> {
        let Some(api_key) = config.api_key.clone().filter(|key| !key.trim().is_empty()) else {
            return Ok(None);
        };
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(config.recovery.operation_timeout_secs))
            .build()?;
        Ok(Some(Self {
            config,
            api_key,
            client,
        }))
    }
}

#[async_trait]
impl TextRecognizer for OcrSpaceClient {
    fn name(&self) -> &str {
        "ocr.space"
    }

    async fn recognize(&self, bytes: &[u8], file_name: &str) -> Result<String, OcrError> {
        let mime = image::guess_format(bytes).map(mime_type).unwrap_or("application/octet-stream");
        let part = reqwest::multipart::Part::bytes(bytes.to_vec())
            .file_name(file_name.to_string())
            .mime_str(mime)?;
        let form = reqwest::multipart::Form::new()
            .text("language", self.config.language.clone())
            .text("OCREngine", "2")
            .text("scale", "true")
            .text("detectOrientation", "true")
            .part("file", part);

        let response = self
            .client
            .post(&self.config.api_url)
            .header("apikey", &self.api_key)
            .multipart(form)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(OcrError::Provider(format!("OCR API error: {}", response.status())));
        }

        let body: OcrSpaceResponse = response.json().await?;
        if body.is_errored_on_processing {
            let message = body
                .error_message
                .map(|value| value.to_string())
                .unwrap_or_else(|| "unknown provider error".to_string());
            return Err(OcrError::Provider(message));
        }

        let text = body
            .parsed_results
            .iter()
            .map(|result| result.parsed_text.as_str())
            .collect::<Vec<&str>>()
            .join("\n");
        let cleaned = clean_ocr_text(&text);
        if cleaned.is_empty() {
            return Err(OcrError::Extraction("provider returned no text".to_string()));
        }
        Ok(cleaned)
    }
}

/// Where the raw text of a scan came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum TextSource {
    Ocr,
    VisualFallback,
}

/// Raw text for one scan
#[derive(Debug, Clone, PartialEq)]
pub struct TextAcquisition {
    pub text: String,
    pub source: TextSource,
}

/// Recognize the text of a validated scan, degrading to the filename fallback
#[instrument(skip_all, fields(file = %scan.file_name))]
pub async fn acquire_text(
    recognizer: Option<&dyn TextRecognizer>,
    breaker: &CircuitBreaker,
    scan: &RawScan,
) -> TextAcquisition {
    let Some(recognizer) = recognizer else {
        info!("No OCR provider configured, using visual fallback");
        return fallback(scan);
    };

    let result = with_resilience(breaker, move || recognizer.recognize(&scan.image_bytes, &scan.file_name)).await;
    match result {
        Ok(text) => {
            info!(provider = recognizer.name(), chars = text.len(), "OCR extraction completed");
            TextAcquisition {
                text,
                source: TextSource::Ocr,
            }
        }
        Err(err) => {
            warn!(provider = recognizer.name(), "OCR failed, using visual fallback: {err}");
            fallback(scan)
        }
    }
}

fn fallback(scan: &RawScan) -> TextAcquisition {
    TextAcquisition {
        text: visual_fallback(&scan.file_name),
        source: TextSource::VisualFallback,
    }
}

/// Derive label-like text from an upload's file name
///
/// Camera prefixes, extensions and numeric tokens are dropped; the remaining
/// words are title-cased. Returns an empty string when nothing is left.
pub fn visual_fallback(file_name: &str) -> String {
    let stem = std::path::Path::new(file_name)
        .file_stem()
        .and_then(|stem| stem.to_str())
        .unwrap_or(file_name);

    let words: Vec<String> = stem
        .split(|c: char| !c.is_alphanumeric() && c != '\'')
        .filter(|token| !token.is_empty())
        .filter(|token| token.chars().any(char::is_alphabetic))
        .filter(|token| !CAMERA_TOKENS.contains(&token.to_lowercase().as_str()))
        .map(str::to_lowercase)
        .collect();

    let text = title_case(&words.join(" "));
    debug!("Visual fallback for '{file_name}' produced '{text}'");
    text
}
