//! # Reddit Reviews
//!
//! Live review lookup with a synthesized fallback. Posts found by a Reddit
//! search are scored with a small keyword sentiment lexicon; pros come from
//! positive posts, cons from negative ones, and the rating from the overall
//! balance. Demo mode, upstream failures and thin results (fewer than three
//! relevant posts) fall back to [`synthesize_reviews`].

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::Deserialize;
use tracing::{debug, info, instrument, warn};

use crate::circuit_breaker::CircuitBreaker;
use crate::ingredient_model::ReviewSummary;
use crate::ocr_errors::OcrError;
use crate::pipeline::PipelineConfig;
use crate::retry::with_resilience;
use crate::review_synthesizer::{synthesize_reviews, SAMPLE_SIZE};

pub const DEFAULT_REDDIT_URL: &str = "https://www.reddit.com";
const USER_AGENT: &str = "scan-it-know-it/0.1 (product review lookup)";
/// Fewer relevant posts than this and the synthesizer is used instead
pub const MIN_RELEVANT_POSTS: usize = 3;
const MAX_SNIPPET_CHARS: usize = 120;

const POSITIVE_WORDS: &[&str] = &[
    "love", "great", "delicious", "tasty", "favorite", "favourite", "amazing", "awesome", "healthy", "best",
    "recommend", "perfect", "works", "gentle", "holy grail", "glowing", "satisfying", "crunchy", "good",
];
const NEGATIVE_WORDS: &[&str] = &[
    "hate", "bland", "too sweet", "sugary", "soggy", "overpriced", "expensive", "disappoint", "gross", "awful",
    "worst", "broke me out", "breakout", "irritat", "sticky", "stale", "bad", "terrible",
];

/// One search result
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct RedditPost {
    pub title: String,
    #[serde(default)]
    pub selftext: String,
    #[serde(default)]
    pub num_comments: u32,
    #[serde(default)]
    pub subreddit: String,
}

/// Source of posts mentioning a product
#[async_trait]
pub trait ReviewSource: Send + Sync {
    async fn search(&self, query: &str) -> Result<Vec<RedditPost>, OcrError>;
}

/// Reddit search over the public JSON endpoint
pub struct RedditClient {
    base_url: String,
    client: reqwest::Client,
}

#[derive(Debug, Deserialize)]
struct Listing {
    data: ListingData,
}

#[derive(Debug, Deserialize)]
struct ListingData {
    #[serde(default)]
    children: Vec<Child>,
}

#[derive(Debug, Deserialize)]
struct Child {
    data: RedditPost,
}

impl RedditClient {
    pub fn new(base_url: impl Into<String>, timeout_secs: u64) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(std::time::Duration::from_secs(timeout_secs))
            .build()?;
        Ok(Self {
            base_url: base_url.into(),
            client,
        })
    }
}

#[async_trait]
impl ReviewSource for RedditClient {
    async fn search(&self, query: &str) -> Result<Vec<RedditPost>, OcrError> {
        let url = format!("{}/search.json", self.base_url.trim_end_matches('/'));
        let response = self
            .client
            .get(&url)
            .query(&[("q", query), ("limit", "25"), ("sort", "relevance")])
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(OcrError::Provider(format!("Reddit API error: {}", response.status())));
        }

        let listing: Listing = response.json().await?;
        Ok(listing.data.children.into_iter().map(|child| child.data).collect())
    }
}

/// Review lookup with synthesized fallback
pub struct ReviewService {
    source: Option<Arc<dyn ReviewSource>>,
    breaker: CircuitBreaker,
    config: PipelineConfig,
    rng: Mutex<StdRng>,
}

impl ReviewService {
    pub fn new(source: Option<Arc<dyn ReviewSource>>, breaker: CircuitBreaker, config: PipelineConfig) -> Self {
        Self::with_rng(source, breaker, config, StdRng::from_entropy())
    }

    /// Service with an explicit random source, for repeatable fallback output
    pub fn with_rng(
        source: Option<Arc<dyn ReviewSource>>,
        breaker: CircuitBreaker,
        config: PipelineConfig,
        rng: StdRng,
    ) -> Self {
        Self {
            source,
            breaker,
            config,
            rng: Mutex::new(rng),
        }
    }

    /// Reviews for a product, live when possible
    #[instrument(skip(self, ingredients))]
    pub async fn reviews_for(&self, product_name: &str, ingredients: &[String]) -> ReviewSummary {
        if let Some(summary) = self.live_reviews(product_name).await {
            return summary;
        }
        self.synthesize(product_name, ingredients)
    }

    async fn live_reviews(&self, product_name: &str) -> Option<ReviewSummary> {
        if self.config.demo_mode {
            debug!("Demo mode, skipping live review search");
            return None;
        }
        let source = self.source.as_ref()?;

        let posts = match with_resilience(&self.breaker, move || source.search(product_name)).await {
            Ok(posts) => posts,
            Err(err) => {
                warn!("Review search failed, using synthesized reviews: {err}");
                return None;
            }
        };

        let relevant = relevant_posts(product_name, &posts);
        if relevant.len() < MIN_RELEVANT_POSTS {
            info!(
                found = relevant.len(),
                "Too few relevant posts, using synthesized reviews"
            );
            return None;
        }

        let summary = summarize_posts(&relevant);
        if summary.pros.is_empty() && summary.cons.is_empty() {
            debug!("Relevant posts carried no sentiment, using synthesized reviews");
            return None;
        }
        info!(posts = relevant.len(), rating = summary.average_rating, "Built live review summary");
        Some(summary)
    }

    fn synthesize(&self, product_name: &str, ingredients: &[String]) -> ReviewSummary {
        let mut rng = self.rng.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        synthesize_reviews(product_name, ingredients, &mut *rng)
    }
}

/// Posts whose title or body mention a significant word of the product name
pub fn relevant_posts<'a>(product_name: &str, posts: &'a [RedditPost]) -> Vec<&'a RedditPost> {
    let keywords: Vec<String> = product_name
        .split_whitespace()
        .map(|word| word.trim_matches(|c: char| !c.is_alphanumeric()).to_lowercase())
        .filter(|word| word.len() >= 3)
        .collect();
    if keywords.is_empty() {
        return Vec::new();
    }

    posts
        .iter()
        .filter(|post| {
            let text = format!("{} {}", post.title, post.selftext).to_lowercase();
            keywords.iter().any(|keyword| text.contains(keyword.as_str()))
        })
        .collect()
}

/// (positive, negative) lexicon hits in a text
pub fn sentiment(text: &str) -> (u32, u32) {
    let lower = text.to_lowercase();
    let count = |words: &[&str]| words.iter().filter(|word| lower.contains(*word)).count() as u32;
    (count(POSITIVE_WORDS), count(NEGATIVE_WORDS))
}

/// Build a summary from relevant posts
pub fn summarize_posts(posts: &[&RedditPost]) -> ReviewSummary {
    let mut pros = Vec::new();
    let mut cons = Vec::new();
    let mut positive_total = 0;
    let mut negative_total = 0;
    let mut mentions = 0;

    for post in posts {
        let (positive, negative) = sentiment(&format!("{} {}", post.title, post.selftext));
        positive_total += positive;
        negative_total += negative;
        mentions += 1 + post.num_comments;

        let snippet = snippet(&post.title);
        if positive > negative && pros.len() < SAMPLE_SIZE && !pros.contains(&snippet) {
            pros.push(snippet);
        } else if negative > positive && cons.len() < SAMPLE_SIZE && !cons.contains(&snippet) {
            cons.push(snippet);
        }
    }

    let total = positive_total + negative_total;
    let rating = if total == 0 {
        3.0
    } else {
        2.5 + 2.5 * (positive_total as f32 - negative_total as f32) / total as f32
    };
    ReviewSummary::new(pros, cons, rating, mentions)
}

fn snippet(title: &str) -> String {
    let trimmed = title.trim();
    if trimmed.chars().count() <= MAX_SNIPPET_CHARS {
        return trimmed.to_string();
    }
    let cut: String = trimmed.chars().take(MAX_SNIPPET_CHARS).collect();
    format!("{}...", cut.trim_end())
}
