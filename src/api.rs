//! # HTTP API
//!
//! axum routes for scanning a label and loading each analysis card:
//!
//! | Route | Body | Response |
//! |---|---|---|
//! | `POST /api/analyze-product` | multipart `image` | analysis id, product name, summary, extracted text |
//! | `POST /api/analyze-ingredients/:id` | `{extractedText?}` | `{ingredients}` |
//! | `POST /api/analyze-nutrition/:id` | `{extractedText?}` | nutrition summary |
//! | `POST /api/analyze-reddit/:id` | `{productName?}` | review summary |
//! | `POST /api/chat/:id` | `{message}` | `{message, response, timestamp}` |
//! | `GET /api/chat/:id` | | chat history |
//! | `GET /api/health` | | `{status, timestamp, uptime}` |
//!
//! Optional bodies fall back to the stored analysis. Errors are JSON
//! `{error}` objects with localized messages; the language comes from the
//! `Accept-Language` header.

use std::net::SocketAddr;

use axum::{
    async_trait,
    body::Bytes,
    extract::{DefaultBodyLimit, FromRequestParts, Multipart, Path, State},
    http::{header, request::Parts, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{debug, error, info, instrument, warn};
use uuid::Uuid;

use crate::field_extractor::extract_fields_with_language;
use crate::ingredient_model::{
    ChatMessage, ExtractedText, Ingredient, NutritionFields, ProductAnalysis, RawScan,
};
use crate::localization::{t_lang, DEFAULT_LANGUAGE};
use crate::ocr::TextSource;
use crate::pipeline::{analyze_ingredients, analyze_nutrition};
use crate::state::AppState;

/// Failures reported to clients
#[derive(Debug)]
pub enum ApiError {
    BadRequest(String),
    NotFound(String),
    Internal(anyhow::Error),
}

#[derive(Serialize)]
struct ErrorBody {
    error: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::BadRequest(message) => (StatusCode::BAD_REQUEST, message),
            ApiError::NotFound(message) => (StatusCode::NOT_FOUND, message),
            ApiError::Internal(err) => {
                error!(error = %err, "request failed");
                (StatusCode::INTERNAL_SERVER_ERROR, t_lang("error-internal", DEFAULT_LANGUAGE))
            }
        };
        (status, Json(ErrorBody { error: message })).into_response()
    }
}

impl From<anyhow::Error> for ApiError {
    fn from(err: anyhow::Error) -> Self {
        ApiError::Internal(err)
    }
}

// --- DTOs ---

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalyzeProductResponse {
    pub analysis_id: Uuid,
    pub product_name: String,
    pub summary: String,
    pub extracted_text: ExtractedText,
    pub text_source: TextSource,
}

/// Extracted text sent back by a client: plain label text or the fields
/// returned by `analyze-product`
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum ExtractedTextInput {
    Text(String),
    Fields(ExtractedTextFields),
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ExtractedTextFields {
    pub all_text: String,
    pub ingredients: String,
    pub ingredients_list: Option<Vec<String>>,
    pub nutrition_data: Option<NutritionFields>,
}

impl ExtractedTextInput {
    /// Re-run extraction on the supplied text, keeping any structured fields the client sent
    pub fn into_extracted(self, language: &str) -> ExtractedText {
        match self {
            ExtractedTextInput::Text(text) => extract_fields_with_language(&text, language),
            ExtractedTextInput::Fields(fields) => {
                let source = if fields.all_text.trim().is_empty() {
                    &fields.ingredients
                } else {
                    &fields.all_text
                };
                let mut extracted = extract_fields_with_language(source, language);
                if let Some(list) = fields.ingredients_list.filter(|list| !list.is_empty()) {
                    extracted.ingredients_list = Some(list);
                }
                if let Some(nutrition) = fields.nutrition_data {
                    extracted.nutrition_data = nutrition;
                }
                extracted
            }
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ExtractedTextRequest {
    pub extracted_text: Option<ExtractedTextInput>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct IngredientsResponse {
    pub ingredients: Vec<Ingredient>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RedditRequest {
    pub product_name: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ChatRequest {
    #[serde(default)]
    pub message: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ChatResponse {
    pub message: String,
    pub response: String,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub timestamp: DateTime<Utc>,
    /// Seconds since the service started
    pub uptime: f64,
}

// --- router ---

pub fn build_app(state: AppState) -> Router {
    let upload_limit = state.pipeline.ocr_config().max_file_size as usize;

    Router::new()
        .nest(
            "/api",
            Router::new()
                .route(
                    "/analyze-product",
                    post(analyze_product).layer(DefaultBodyLimit::max(upload_limit)),
                )
                .route("/analyze-ingredients/:id", post(analyze_ingredients_handler))
                .route("/analyze-nutrition/:id", post(analyze_nutrition_handler))
                .route("/analyze-reddit/:id", post(analyze_reddit))
                .route("/chat/:id", post(post_chat).get(get_chat))
                .route("/health", get(health)),
        )
        .with_state(state)
        .layer(CorsLayer::permissive())
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(|req: &axum::http::Request<_>| {
                    let method = req.method().clone();
                    let uri = req.uri().clone();
                    tracing::info_span!("http_request", %method, uri = %uri)
                })
                .on_response(
                    |res: &axum::http::Response<_>, _latency: std::time::Duration, span: &tracing::Span| {
                        let status = res.status();
                        span.record("status", tracing::field::display(status));
                        if status.is_server_error() {
                            tracing::error!(%status, "response");
                        } else {
                            tracing::info!(%status, "response");
                        }
                    },
                ),
        )
}

pub async fn serve(app: Router, address: &str) -> anyhow::Result<()> {
    let addr: SocketAddr = address.parse()?;

    info!("listening on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}

// --- helpers ---

/// Analysis id from the `:id` path segment; a malformed id is a JSON 400
pub struct AnalysisId(pub Uuid);

#[async_trait]
impl<S: Send + Sync> FromRequestParts<S> for AnalysisId {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        match Path::<Uuid>::from_request_parts(parts, state).await {
            Ok(Path(id)) => Ok(Self(id)),
            Err(rejection) => {
                debug!("Rejected analysis id: {rejection}");
                let language = request_language(&parts.headers);
                Err(ApiError::BadRequest(t_lang("error-invalid-id", &language)))
            }
        }
    }
}

/// Primary language subtag of the `Accept-Language` header
fn request_language(headers: &HeaderMap) -> String {
    headers
        .get(header::ACCEPT_LANGUAGE)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.split([',', ';']).next())
        .map(|tag| tag.trim().to_lowercase())
        .filter(|tag| !tag.is_empty() && tag != "*")
        .unwrap_or_else(|| DEFAULT_LANGUAGE.to_string())
}

/// Parse a JSON body, treating an empty body as the default request
fn parse_body<T: DeserializeOwned + Default>(body: &Bytes) -> Result<T, ApiError> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(T::default());
    }
    serde_json::from_slice(body).map_err(|err| ApiError::BadRequest(format!("Invalid request body: {err}")))
}

/// Analysis from the cache, or from the store (and then cached)
async fn load_analysis(state: &AppState, id: Uuid, language: &str) -> Result<ProductAnalysis, ApiError> {
    if let Some(analysis) = state.cache.get(id).await {
        return Ok(analysis);
    }
    match state.store.get_analysis(id).await? {
        Some(analysis) => {
            state.cache.insert(analysis.clone()).await;
            Ok(analysis)
        }
        None => {
            warn!(%id, "analysis not found");
            Err(ApiError::NotFound(t_lang("error-analysis-not-found", language)))
        }
    }
}

// --- handlers ---

#[instrument(skip(state, headers, multipart))]
pub async fn analyze_product(
    State(state): State<AppState>,
    headers: HeaderMap,
    mut multipart: Multipart,
) -> Result<Json<AnalyzeProductResponse>, ApiError> {
    let language = request_language(&headers);

    let mut upload = None;
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|err| ApiError::BadRequest(err.body_text()))?
    {
        if field.name() != Some("image") {
            continue;
        }
        let file_name = field.file_name().unwrap_or("upload").to_string();
        let bytes = field
            .bytes()
            .await
            .map_err(|err| ApiError::BadRequest(err.body_text()))?;
        upload = Some(RawScan::new(bytes.to_vec(), file_name));
        break;
    }
    let scan = upload.ok_or_else(|| ApiError::BadRequest(t_lang("error-missing-image", &language)))?;

    let result = state.pipeline.scan(&scan, &language).await.map_err(|rejection| {
        warn!(%rejection, "upload rejected");
        ApiError::BadRequest(t_lang(rejection.message_key(), &language))
    })?;

    let analysis = result.analysis;
    state.store.create_analysis(&analysis).await?;
    state.cache.insert(analysis.clone()).await;

    Ok(Json(AnalyzeProductResponse {
        analysis_id: analysis.id,
        product_name: analysis.product_name,
        summary: analysis.product_summary,
        extracted_text: analysis.extracted_text,
        text_source: result.source,
    }))
}

#[instrument(skip(state, headers, body))]
pub async fn analyze_ingredients_handler(
    State(state): State<AppState>,
    AnalysisId(id): AnalysisId,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<IngredientsResponse>, ApiError> {
    let language = request_language(&headers);
    let request: ExtractedTextRequest = parse_body(&body)?;
    let analysis = load_analysis(&state, id, &language).await?;

    let extracted = match request.extracted_text {
        Some(input) => input.into_extracted(&language),
        None => analysis.extracted_text,
    };
    let ingredients = analyze_ingredients(&extracted);

    state.store.attach_ingredients(id, &ingredients).await?;
    state.cache.invalidate(id).await;
    Ok(Json(IngredientsResponse { ingredients }))
}

#[instrument(skip(state, headers, body))]
pub async fn analyze_nutrition_handler(
    State(state): State<AppState>,
    AnalysisId(id): AnalysisId,
    headers: HeaderMap,
    body: Bytes,
) -> Result<impl IntoResponse, ApiError> {
    let language = request_language(&headers);
    let request: ExtractedTextRequest = parse_body(&body)?;
    let analysis = load_analysis(&state, id, &language).await?;

    let extracted = match request.extracted_text {
        Some(input) => input.into_extracted(&language),
        None => analysis.extracted_text,
    };
    let nutrition = analyze_nutrition(&extracted, &language);

    state.store.attach_nutrition(id, &nutrition).await?;
    state.cache.invalidate(id).await;
    Ok(Json(nutrition))
}

#[instrument(skip(state, headers, body))]
pub async fn analyze_reddit(
    State(state): State<AppState>,
    AnalysisId(id): AnalysisId,
    headers: HeaderMap,
    body: Bytes,
) -> Result<impl IntoResponse, ApiError> {
    let language = request_language(&headers);
    let request: RedditRequest = parse_body(&body)?;
    let analysis = load_analysis(&state, id, &language).await?;

    let product_name = request
        .product_name
        .filter(|name| !name.trim().is_empty())
        .unwrap_or(analysis.product_name);
    let ingredients = analysis.extracted_text.ingredients_list.unwrap_or_default();
    let reviews = state.reviews.reviews_for(&product_name, &ingredients).await;

    state.store.attach_reviews(id, &reviews).await?;
    state.cache.invalidate(id).await;
    Ok(Json(reviews))
}

#[instrument(skip(state, headers, body))]
pub async fn post_chat(
    State(state): State<AppState>,
    AnalysisId(id): AnalysisId,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<ChatResponse>, ApiError> {
    let language = request_language(&headers);
    let request: ChatRequest = parse_body(&body)?;
    let question = request.message.trim();
    if question.is_empty() {
        return Err(ApiError::BadRequest(t_lang("error-empty-message", &language)));
    }
    let analysis = load_analysis(&state, id, &language).await?;

    let answer = state.assistant.answer(&analysis, question, &language).await;
    let message = ChatMessage::new(id, question, &answer);
    state.store.add_chat_message(&message).await?;

    Ok(Json(ChatResponse {
        message: message.message,
        response: message.response,
        timestamp: message.timestamp,
    }))
}

#[instrument(skip(state, headers))]
pub async fn get_chat(
    State(state): State<AppState>,
    AnalysisId(id): AnalysisId,
    headers: HeaderMap,
) -> Result<Json<Vec<ChatMessage>>, ApiError> {
    let language = request_language(&headers);
    load_analysis(&state, id, &language).await?;
    Ok(Json(state.store.chat_history(id).await?))
}

pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        timestamp: Utc::now(),
        uptime: state.started_at.elapsed().as_secs_f64(),
    })
}
