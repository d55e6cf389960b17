//! # OCR Error Types Module
//!
//! Error type shared by OCR acquisition and the resilience wrapper around
//! every upstream call.

/// Custom error types for OCR and upstream operations
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OcrError {
    /// Upload validation errors (missing, empty, unsupported or oversized image)
    Validation(String),
    /// Transport errors talking to an upstream
    Network(String),
    /// Upstream answered but reported an error
    Provider(String),
    /// Upstream answered without usable text
    Extraction(String),
    /// A single attempt exceeded its time limit
    Timeout(String),
    /// The circuit breaker is open and the call was not attempted
    CircuitOpen(String),
}

impl OcrError {
    /// Whether the error is caused by the upload itself rather than an upstream
    pub fn is_client_error(&self) -> bool {
        matches!(self, OcrError::Validation(_))
    }
}

impl std::fmt::Display for OcrError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OcrError::Validation(msg) => write!(f, "Validation error: {msg}"),
            OcrError::Network(msg) => write!(f, "Network error: {msg}"),
            OcrError::Provider(msg) => write!(f, "Provider error: {msg}"),
            OcrError::Extraction(msg) => write!(f, "Extraction error: {msg}"),
            OcrError::Timeout(msg) => write!(f, "Timeout error: {msg}"),
            OcrError::CircuitOpen(msg) => write!(f, "Circuit open: {msg}"),
        }
    }
}

impl std::error::Error for OcrError {}

impl From<anyhow::Error> for OcrError {
    fn from(err: anyhow::Error) -> Self {
        OcrError::Extraction(err.to_string())
    }
}

impl From<reqwest::Error> for OcrError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            OcrError::Timeout(err.to_string())
        } else {
            OcrError::Network(err.to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_prefixes() {
        assert_eq!(
            OcrError::Validation("empty".into()).to_string(),
            "Validation error: empty"
        );
        assert_eq!(OcrError::CircuitOpen("ocr".into()).to_string(), "Circuit open: ocr");
    }

    #[test]
    fn test_from_anyhow_is_extraction() {
        let err: OcrError = anyhow::anyhow!("no text").into();
        assert_eq!(err, OcrError::Extraction("no text".into()));
        assert!(!err.is_client_error());
    }
}
