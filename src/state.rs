use std::sync::Arc;
use std::time::Instant;

use anyhow::Context;
use rand::rngs::StdRng;
use rand::SeedableRng;
use tracing::{info, warn};

use crate::cache::AnalysisCache;
use crate::config::AppConfig;
use crate::db::{AnalysisStore, MemoryStore, PgStore};
use crate::llm::{build_model, Assistant, LlmProvider};
use crate::ocr::{OcrSpaceClient, TextRecognizer};
use crate::ocr_config::{OcrConfig, RecoveryConfig};
use crate::pipeline::{PipelineConfig, ScanPipeline, Upstreams};
use crate::reddit::{RedditClient, ReviewService, ReviewSource, DEFAULT_REDDIT_URL};

/// Shared service state handed to every handler
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn AnalysisStore>,
    pub cache: Arc<AnalysisCache>,
    pub pipeline: Arc<ScanPipeline>,
    pub assistant: Arc<Assistant>,
    pub reviews: Arc<ReviewService>,
    pub started_at: Instant,
}

impl AppState {
    pub async fn init(config: &AppConfig) -> anyhow::Result<Self> {
        let store: Arc<dyn AnalysisStore> = match &config.database_url {
            Some(url) => Arc::new(PgStore::connect(url).await.context("connect to database")?),
            None => {
                warn!("DATABASE_URL not set, analyses are kept in memory");
                Arc::new(MemoryStore::new())
            }
        };

        let recognizer = OcrSpaceClient::from_config(config.ocr.clone())?
            .map(|client| Arc::new(client) as Arc<dyn TextRecognizer>);
        if recognizer.is_none() {
            warn!("OCR_SPACE_API_KEY not set, scans use the filename fallback");
        }
        let reddit = RedditClient::new(DEFAULT_REDDIT_URL, RecoveryConfig::interactive().operation_timeout_secs)?;
        let upstreams = Upstreams {
            recognizer,
            model: build_model(config.pipeline.provider, &config.llm)?,
            reviews: Some(Arc::new(reddit) as Arc<dyn ReviewSource>),
        };
        let pipeline = Arc::new(ScanPipeline::new(config.pipeline, config.ocr.clone(), upstreams));

        info!(
            demo_mode = config.pipeline.demo_mode,
            llm = config.pipeline.provider.as_str(),
            has_model = pipeline.assistant().has_model(),
            "Service state initialised"
        );
        Ok(Self::from_parts(
            store,
            Arc::new(AnalysisCache::new(config.cache_ttl)),
            pipeline,
        ))
    }

    /// State around a pipeline; the assistant and reviews come from it
    pub fn from_parts(store: Arc<dyn AnalysisStore>, cache: Arc<AnalysisCache>, pipeline: Arc<ScanPipeline>) -> Self {
        Self {
            store,
            cache,
            assistant: pipeline.assistant(),
            reviews: pipeline.reviews(),
            pipeline,
            started_at: Instant::now(),
        }
    }

    /// Offline state: in-memory store, no upstreams, seeded review fallback
    pub fn fake() -> Self {
        let config = PipelineConfig {
            demo_mode: true,
            provider: LlmProvider::None,
        };
        let pipeline = Arc::new(ScanPipeline::with_rng(
            config,
            OcrConfig::default(),
            Upstreams::default(),
            StdRng::seed_from_u64(7),
        ));
        Self::from_parts(Arc::new(MemoryStore::new()), Arc::new(AnalysisCache::default()), pipeline)
    }
}
