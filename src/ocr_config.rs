//! # OCR Configuration Module
//!
//! This module defines configuration structures for OCR processing and for
//! the resilience wrapper shared by every upstream: recovery settings,
//! format-specific size limits and OCR provider parameters.

// Constants for OCR configuration
pub const DEFAULT_OCR_API_URL: &str = "https://api.ocr.space/parse/image";
pub const DEFAULT_OCR_LANGUAGE: &str = "eng";
pub const MIN_FORMAT_BYTES: usize = 8;
pub const MAX_FILE_SIZE: u64 = 25 * 1024 * 1024; // 25MB upload body limit, above every format limit

/// Recovery configuration for error handling
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecoveryConfig {
    /// Maximum number of retry attempts
    pub max_retries: u32,
    /// Base delay between retries in milliseconds
    pub base_retry_delay_ms: u64,
    /// Maximum delay between retries in milliseconds
    pub max_retry_delay_ms: u64,
    /// Timeout for a single attempt in seconds
    pub operation_timeout_secs: u64,
    /// Circuit breaker failure threshold
    pub circuit_breaker_threshold: u32,
    /// Circuit breaker reset timeout in seconds
    pub circuit_breaker_reset_secs: u64,
}

impl Default for RecoveryConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            base_retry_delay_ms: 1000,  // 1 second
            max_retry_delay_ms: 10000,  // 10 seconds
            operation_timeout_secs: 30, // 30 seconds
            circuit_breaker_threshold: 5,
            circuit_breaker_reset_secs: 60, // 1 minute
        }
    }
}

impl RecoveryConfig {
    /// Settings for interactive upstreams (LLM, Reddit) where the user is waiting
    pub fn interactive() -> Self {
        Self {
            max_retries: 1,
            base_retry_delay_ms: 500,
            max_retry_delay_ms: 2000,
            operation_timeout_secs: 15,
            ..Self::default()
        }
    }
}

/// Format-specific file size limits for uploaded images
#[derive(Debug, Clone)]
pub struct FormatSizeLimits {
    /// PNG format limit (higher due to better compression)
    pub png_max: u64,
    /// JPEG format limit (moderate due to lossy compression)
    pub jpeg_max: u64,
    /// BMP format limit (lower due to uncompressed nature)
    pub bmp_max: u64,
    /// TIFF format limit (can be large, multi-page support)
    pub tiff_max: u64,
    /// WebP format limit (phone cameras and browsers)
    pub webp_max: u64,
    /// Anything above this is rejected before format detection
    pub min_quick_reject: u64,
}

impl Default for FormatSizeLimits {
    fn default() -> Self {
        Self {
            png_max: 15 * 1024 * 1024,          // 15MB for PNG
            jpeg_max: 10 * 1024 * 1024,         // 10MB for JPEG
            bmp_max: 5 * 1024 * 1024,           // 5MB for BMP
            tiff_max: 20 * 1024 * 1024,         // 20MB for TIFF
            webp_max: 10 * 1024 * 1024,         // 10MB for WebP
            min_quick_reject: 50 * 1024 * 1024, // 50MB quick reject
        }
    }
}

/// Configuration structure for OCR processing
#[derive(Debug, Clone)]
pub struct OcrConfig {
    /// OCR.space-compatible endpoint
    pub api_url: String,
    /// Provider API key; without one the service goes straight to the filename fallback
    pub api_key: Option<String>,
    /// Provider language code (e.g., "eng", "fre")
    pub language: String,
    /// Minimum bytes required for format detection
    pub min_format_bytes: usize,
    /// Maximum upload request body in bytes; format limits apply after detection
    pub max_file_size: u64,
    /// Format-specific size limits
    pub format_limits: FormatSizeLimits,
    /// Recovery and error handling configuration
    pub recovery: RecoveryConfig,
}

impl Default for OcrConfig {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_OCR_API_URL.to_string(),
            api_key: None,
            language: DEFAULT_OCR_LANGUAGE.to_string(),
            min_format_bytes: MIN_FORMAT_BYTES,
            max_file_size: MAX_FILE_SIZE,
            format_limits: FormatSizeLimits::default(),
            recovery: RecoveryConfig::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recovery_defaults() {
        let config = RecoveryConfig::default();
        assert_eq!(config.max_retries, 3);
        assert_eq!(config.base_retry_delay_ms, 1000);
        assert_eq!(config.circuit_breaker_threshold, 5);
    }

    #[test]
    fn test_interactive_keeps_breaker_settings() {
        let config = RecoveryConfig::interactive();
        assert_eq!(config.max_retries, 1);
        assert_eq!(config.circuit_breaker_reset_secs, 60);
    }

    #[test]
    fn test_ocr_config_default_has_no_key() {
        let config = OcrConfig::default();
        assert!(config.api_key.is_none());
        assert_eq!(config.api_url, DEFAULT_OCR_API_URL);
    }
}
