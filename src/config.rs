//! Service configuration read from the environment (and `.env`).

use std::collections::HashMap;
use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};

use crate::cache::DEFAULT_CACHE_TTL_SECS;
use crate::llm::{LlmConfig, LlmProvider};
use crate::ocr_config::OcrConfig;
use crate::pipeline::PipelineConfig;

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    /// Absent means analyses live in memory only
    pub database_url: Option<String>,
    /// Demo mode and model provider, shared by every upstream
    pub pipeline: PipelineConfig,
    pub llm: LlmConfig,
    pub ocr: OcrConfig,
    pub cache_ttl: Duration,
}

impl AppConfig {
    /// Load `.env` if present, then read the process environment
    pub fn from_env() -> Result<Self> {
        dotenv::dotenv().ok();
        let vars: HashMap<String, String> = std::env::vars().collect();
        Self::from_vars(&vars)
    }

    /// Read a `.env`-style file without touching the process environment
    pub fn from_file(path: &Path) -> Result<Self> {
        let vars = dotenv::from_path_iter(path)
            .with_context(|| format!("Failed to open {}", path.display()))?
            .collect::<Result<HashMap<String, String>, _>>()
            .with_context(|| format!("Failed to parse {}", path.display()))?;
        Self::from_vars(&vars)
    }

    pub fn from_vars(vars: &HashMap<String, String>) -> Result<Self> {
        let get = |key: &str| vars.get(key).map(|value| value.trim()).filter(|value| !value.is_empty());

        let port = match get("APP_PORT") {
            Some(port) => port.parse::<u16>().with_context(|| format!("Invalid APP_PORT: {port}"))?,
            None => 8080,
        };
        let cache_ttl_secs = match get("CACHE_TTL_SECS") {
            Some(ttl) => ttl.parse::<u64>().with_context(|| format!("Invalid CACHE_TTL_SECS: {ttl}"))?,
            None => DEFAULT_CACHE_TTL_SECS,
        };

        let provider = get("LLM_PROVIDER").map(LlmProvider::parse).unwrap_or_default();
        let llm_key = match provider {
            LlmProvider::OpenRouter => get("OPENROUTER_API_KEY"),
            LlmProvider::HuggingFace => get("HUGGINGFACE_API_KEY"),
            LlmProvider::None => None,
        };
        let mut llm = LlmConfig::for_provider(provider, llm_key.map(str::to_string));
        if let Some(model) = get("LLM_MODEL") {
            llm.model = model.to_string();
        }

        let mut ocr = OcrConfig {
            api_key: get("OCR_SPACE_API_KEY").map(str::to_string),
            ..OcrConfig::default()
        };
        if let Some(url) = get("OCR_API_URL") {
            ocr.api_url = url.to_string();
        }

        Ok(Self {
            host: get("APP_HOST").unwrap_or("0.0.0.0").to_string(),
            port,
            database_url: get("DATABASE_URL").map(str::to_string),
            pipeline: PipelineConfig {
                demo_mode: get("DEMO_MODE").map(parse_flag).unwrap_or(false),
                provider,
            },
            llm,
            ocr,
            cache_ttl: Duration::from_secs(cache_ttl_secs),
        })
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

fn parse_flag(value: &str) -> bool {
    matches!(value.to_lowercase().as_str(), "1" | "true" | "yes" | "on")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn vars(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect()
    }

    #[test]
    fn test_defaults() -> Result<()> {
        let config = AppConfig::from_vars(&HashMap::new())?;
        assert_eq!(config.bind_address(), "0.0.0.0:8080");
        assert!(config.database_url.is_none());
        assert!(!config.pipeline.demo_mode);
        assert_eq!(config.pipeline.provider, LlmProvider::None);
        assert!(config.ocr.api_key.is_none());
        assert_eq!(config.cache_ttl, Duration::from_secs(DEFAULT_CACHE_TTL_SECS));
        Ok(())
    }

    #[test]
    fn test_provider_key_selection() -> Result<()> {
        let config = AppConfig::from_vars(&vars(&[
            ("LLM_PROVIDER", "huggingface"),
            ("OPENROUTER_API_KEY", "or-key"),
            ("HUGGINGFACE_API_KEY", "hf-key"),
            ("DEMO_MODE", "true"),
        ]))?;
        assert_eq!(config.pipeline.provider, LlmProvider::HuggingFace);
        assert_eq!(config.llm.api_key.as_deref(), Some("hf-key"));
        assert!(config.pipeline.demo_mode);
        Ok(())
    }

    #[test]
    fn test_invalid_port_is_an_error() {
        assert!(AppConfig::from_vars(&vars(&[("APP_PORT", "eighty")])).is_err());
    }

    #[test]
    fn test_from_file() -> Result<()> {
        let mut file = NamedTempFile::new()?;
        writeln!(file, "APP_PORT=3000")?;
        writeln!(file, "OCR_SPACE_API_KEY=K123")?;
        writeln!(file, "OCR_API_URL=http://localhost:9000/parse")?;
        writeln!(file, "CACHE_TTL_SECS=5")?;

        let config = AppConfig::from_file(file.path())?;
        assert_eq!(config.port, 3000);
        assert_eq!(config.ocr.api_key.as_deref(), Some("K123"));
        assert_eq!(config.ocr.api_url, "http://localhost:9000/parse");
        assert_eq!(config.cache_ttl, Duration::from_secs(5));
        Ok(())
    }
}
