//! # OCR Tests Module
//!
//! Test suite for upload validation, recovery configuration, the circuit
//! breaker and text acquisition with its filename fallback.

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicU32, Ordering};

    use async_trait::async_trait;
    use image::ImageFormat;
    use scan_it_know_it::circuit_breaker::CircuitBreaker;
    use scan_it_know_it::ingredient_model::RawScan;
    use scan_it_know_it::ocr::{acquire_text, validate_image, visual_fallback, ImageRejection, TextRecognizer, TextSource};
    use scan_it_know_it::ocr_config::{FormatSizeLimits, OcrConfig, RecoveryConfig};
    use scan_it_know_it::ocr_errors::OcrError;
    use scan_it_know_it::retry::calculate_retry_delay;

    const PNG_HEADER: &[u8] = &[0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A, 0, 0, 0, 0x0D];
    const BMP_HEADER: &[u8] = &[b'B', b'M', 0x36, 0, 0, 0, 0, 0, 0, 0, 0x36, 0];

    fn fast_recovery() -> RecoveryConfig {
        RecoveryConfig {
            max_retries: 1,
            base_retry_delay_ms: 1,
            max_retry_delay_ms: 2,
            operation_timeout_secs: 1,
            circuit_breaker_threshold: 2,
            circuit_breaker_reset_secs: 60,
        }
    }

    /// Recognizer that always fails and counts its calls
    struct Unavailable {
        calls: AtomicU32,
    }

    #[async_trait]
    impl TextRecognizer for Unavailable {
        fn name(&self) -> &str {
            "unavailable"
        }

        async fn recognize(&self, _bytes: &[u8], _file_name: &str) -> Result<String, OcrError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Err(OcrError::Network("connection refused".to_string()))
        }
    }

    struct Fixed(&'static str);

    #[async_trait]
    impl TextRecognizer for Fixed {
        fn name(&self) -> &str {
            "fixed"
        }

        async fn recognize(&self, _bytes: &[u8], _file_name: &str) -> Result<String, OcrError> {
            Ok(self.0.to_string())
        }
    }

    /// Test OCR configuration defaults
    #[test]
    fn test_ocr_config_defaults() {
        let config = OcrConfig::default();

        assert_eq!(config.language, "eng");
        assert_eq!(config.min_format_bytes, 8);
        assert_eq!(config.max_file_size, 25 * 1024 * 1024);
        assert!(config.recovery.max_retries > 0);
        assert!(config.recovery.operation_timeout_secs > 0);
    }

    /// Test format-specific size limits
    #[test]
    fn test_format_size_limits() {
        let limits = FormatSizeLimits::default();

        assert_eq!(limits.png_max, 15 * 1024 * 1024);
        assert_eq!(limits.jpeg_max, 10 * 1024 * 1024);
        assert_eq!(limits.bmp_max, 5 * 1024 * 1024);
        assert_eq!(limits.tiff_max, 20 * 1024 * 1024);
        assert_eq!(limits.webp_max, 10 * 1024 * 1024);
        assert_eq!(limits.min_quick_reject, 50 * 1024 * 1024);
    }

    #[test]
    fn test_validate_bmp_limit() {
        let mut config = OcrConfig::default();
        assert_eq!(validate_image(BMP_HEADER, &config), Ok(ImageFormat::Bmp));

        config.format_limits.bmp_max = 4;
        assert!(matches!(
            validate_image(BMP_HEADER, &config),
            Err(ImageRejection::TooLarge { limit: 4, .. })
        ));
    }

    #[test]
    fn test_quick_reject_before_detection() {
        let mut config = OcrConfig::default();
        config.format_limits.min_quick_reject = 10;
        let rejection = validate_image(PNG_HEADER, &config).unwrap_err();
        assert_eq!(rejection, ImageRejection::TooLarge { size: 12, limit: 10 });
        assert_eq!(rejection.message_key(), "error-image-too-large");
    }

    #[test]
    fn test_rejection_message_keys() {
        assert_eq!(ImageRejection::Empty.message_key(), "error-empty-image");
        assert_eq!(ImageRejection::Unsupported.message_key(), "error-unsupported-format");
    }

    #[test]
    fn test_retry_delay_is_capped() {
        let config = RecoveryConfig::default();
        for attempt in 1..10 {
            let delay = calculate_retry_delay(attempt, &config);
            assert!(delay >= config.base_retry_delay_ms);
            assert!(delay <= config.max_retry_delay_ms + config.max_retry_delay_ms / 4);
        }
    }

    #[test]
    fn test_circuit_breaker_transitions() {
        let breaker = CircuitBreaker::new("ocr", fast_recovery());
        assert!(!breaker.is_open());
        breaker.record_failure();
        assert!(!breaker.is_open());
        breaker.record_failure();
        assert!(breaker.is_open());
        assert_eq!(breaker.failure_count(), 2);
        breaker.record_success();
        assert!(!breaker.is_open());
    }

    #[test]
    fn test_visual_fallback_names() {
        assert_eq!(visual_fallback("special-k_original.jpg"), "Special K Original");
        assert_eq!(visual_fallback("IMG_20240101_1234.jpg"), "");
        assert_eq!(visual_fallback("PXL_cerave-foaming-cleanser.png"), "Cerave Foaming Cleanser");
    }

    #[tokio::test]
    async fn test_acquire_text_from_recognizer() {
        let breaker = CircuitBreaker::new("ocr", fast_recovery());
        let scan = RawScan::new(PNG_HEADER.to_vec(), "IMG_0001.png");
        let recognizer: &dyn TextRecognizer = &Fixed("Special K Original\nIngredients: Rice, Sugar");

        let acquisition = acquire_text(Some(recognizer), &breaker, &scan).await;
        assert_eq!(acquisition.source, TextSource::Ocr);
        assert!(acquisition.text.starts_with("Special K Original"));
    }

    #[tokio::test]
    async fn test_failing_recognizer_falls_back_and_opens_breaker() {
        let breaker = CircuitBreaker::new("ocr", fast_recovery());
        let scan = RawScan::new(PNG_HEADER.to_vec(), "granola-bar.png");
        let unavailable = Unavailable { calls: AtomicU32::new(0) };
        let recognizer: &dyn TextRecognizer = &unavailable;

        for _ in 0..2 {
            let acquisition = acquire_text(Some(recognizer), &breaker, &scan).await;
            assert_eq!(acquisition.source, TextSource::VisualFallback);
            assert_eq!(acquisition.text, "Granola Bar");
        }
        // Two scans with one retry each
        assert_eq!(unavailable.calls.load(Ordering::SeqCst), 4);
        assert!(breaker.is_open());

        // Open breaker: no further upstream calls
        let acquisition = acquire_text(Some(recognizer), &breaker, &scan).await;
        assert_eq!(acquisition.source, TextSource::VisualFallback);
        assert_eq!(unavailable.calls.load(Ordering::SeqCst), 4);
    }

    #[tokio::test]
    async fn test_no_recognizer_uses_fallback() {
        let breaker = CircuitBreaker::new("ocr", RecoveryConfig::default());
        let scan = RawScan::new(PNG_HEADER.to_vec(), "oreo.png");
        let acquisition = acquire_text(None, &breaker, &scan).await;
        assert_eq!(acquisition.source, TextSource::VisualFallback);
        assert_eq!(acquisition.text, "Oreo");
    }
}
