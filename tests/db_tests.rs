use anyhow::{Context, Result};
use scan_it_know_it::cache::AnalysisCache;
use scan_it_know_it::db::{AnalysisStore, MemoryStore, PgStore};
use scan_it_know_it::field_extractor::extract_fields;
use scan_it_know_it::ingredient_model::{ChatMessage, Ingredient, ProductAnalysis, ReviewSummary, Safety};
use scan_it_know_it::nutrition_parser::summarize_nutrition;
use std::env;
use std::time::Duration;
use uuid::Uuid;

/// Helper macro to skip tests when database is not available
macro_rules! skip_if_no_db {
    ($test_fn:expr) => {
        match setup_test_db().await {
            Ok(store) => $test_fn(&store).await,
            Err(_) => {
                eprintln!("Skipping test: Database not available");
                Ok(())
            }
        }
    };
}

async fn setup_test_db() -> Result<PgStore> {
    // Skip tests if no DATABASE_URL is provided
    let database_url = match env::var("DATABASE_URL") {
        Ok(url) => url,
        Err(_) => {
            eprintln!("Skipping database tests: DATABASE_URL not set");
            return Err(anyhow::anyhow!("Test database not configured"));
        }
    };

    PgStore::connect(&database_url)
        .await
        .context("Failed to connect to test database")
}

fn sample_analysis() -> ProductAnalysis {
    let extracted = extract_fields(
        "Special K Original\nIngredients: Rice, Whole Wheat, Sugar, Salt\nCalories 120\nTotal Sugars 4g\nProtein 6g",
    );
    ProductAnalysis::new("Special K Original", "A crisp rice cereal.", extracted)
}

async fn exercise_store(store: &dyn AnalysisStore) -> Result<()> {
    let analysis = sample_analysis();
    store.create_analysis(&analysis).await?;

    let stored = store.get_analysis(analysis.id).await?.context("analysis should exist")?;
    assert_eq!(stored.product_name, "Special K Original");
    assert_eq!(stored.extracted_text, analysis.extracted_text);
    assert!(stored.ingredients_data.is_none());

    let ingredients = vec![
        Ingredient::new("Rice", Safety::Safe, "Whole food grain"),
        Ingredient::new("Sugar", Safety::Moderate, "Added sugar"),
    ];
    assert!(store.attach_ingredients(analysis.id, &ingredients).await?);

    let nutrition = summarize_nutrition(&analysis.extracted_text.nutrition_data, "en");
    assert!(store.attach_nutrition(analysis.id, &nutrition).await?);

    let reviews = ReviewSummary::new(
        vec!["Crunchy".to_string()],
        vec!["Pricey".to_string()],
        4.1,
        12,
    );
    assert!(store.attach_reviews(analysis.id, &reviews).await?);

    let stored = store.get_analysis(analysis.id).await?.context("analysis should exist")?;
    assert_eq!(stored.ingredients_data, Some(ingredients));
    assert_eq!(stored.nutrition_data, Some(nutrition));
    assert_eq!(stored.reddit_data, Some(reviews));

    // Unknown ids are reported, not created
    let missing = Uuid::new_v4();
    assert!(!store.attach_reviews(missing, &ReviewSummary::new(Vec::new(), Vec::new(), 0.0, 0)).await?);
    assert!(store.get_analysis(missing).await?.is_none());

    store
        .add_chat_message(&ChatMessage::new(analysis.id, "Is it sugary?", "A little."))
        .await?;
    store
        .add_chat_message(&ChatMessage::new(analysis.id, "Any protein?", "6g per serving."))
        .await?;
    let history = store.chat_history(analysis.id).await?;
    let questions: Vec<&str> = history.iter().map(|m| m.message.as_str()).collect();
    assert_eq!(questions, vec!["Is it sugary?", "Any protein?"]);
    assert!(store.chat_history(missing).await?.is_empty());

    Ok(())
}

#[tokio::test]
async fn test_memory_store_operations() -> Result<()> {
    exercise_store(&MemoryStore::new()).await
}

#[tokio::test]
async fn test_pg_store_operations() -> Result<()> {
    skip_if_no_db!(test_pg_store_operations_impl)
}

async fn test_pg_store_operations_impl(store: &PgStore) -> Result<()> {
    exercise_store(store).await
}

#[tokio::test]
async fn test_pg_schema_is_idempotent() -> Result<()> {
    skip_if_no_db!(test_pg_schema_is_idempotent_impl)
}

async fn test_pg_schema_is_idempotent_impl(store: &PgStore) -> Result<()> {
    store.init_schema().await?;
    store.init_schema().await?;
    Ok(())
}

#[tokio::test]
async fn test_cache_in_front_of_store() -> Result<()> {
    let store = MemoryStore::new();
    let cache = AnalysisCache::new(Duration::from_secs(60));
    let analysis = sample_analysis();
    store.create_analysis(&analysis).await?;
    cache.insert(analysis.clone()).await;

    // A write goes to the store and drops the cached copy
    let ingredients = vec![Ingredient::new("Salt", Safety::Moderate, "Sodium")];
    assert!(store.attach_ingredients(analysis.id, &ingredients).await?);
    cache.invalidate(analysis.id).await;
    assert!(cache.get(analysis.id).await.is_none());

    let fresh = store.get_analysis(analysis.id).await?.context("analysis should exist")?;
    cache.insert(fresh).await;
    let cached = cache.get(analysis.id).await.context("analysis should be cached")?;
    assert_eq!(cached.ingredients_data, Some(ingredients));
    Ok(())
}

#[tokio::test]
async fn test_cache_expiry() {
    let cache = AnalysisCache::new(Duration::from_millis(20));
    let analysis = sample_analysis();
    cache.insert(analysis.clone()).await;
    assert!(cache.get(analysis.id).await.is_some());

    tokio::time::sleep(Duration::from_millis(40)).await;
    assert!(cache.get(analysis.id).await.is_none());
    assert!(cache.is_empty().await);
}
