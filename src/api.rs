//! HTTP surface: article CRUD plus semantic search.
//!
//! Every create/update re-embeds `title + "\n" + content`; the search endpoint
//! goes through [`SimilarityRanker`].

use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::http::{HeaderValue, StatusCode};
use axum::routing::get;
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tower_http::cors::{AllowHeaders, AllowMethods, AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{error, info, warn};

use crate::article::{Article, ArticleDraft, ArticlePatch};
use crate::error::Error;
use crate::ranker::{SearchHit, SimilarityRanker};
use crate::vector_store::ArticleStore;

const DEFAULT_LIST_LIMIT: usize = 20;
const MAX_LIST_LIMIT: usize = 100;

/// Shared handler state. Built once at startup.
pub struct AppState<S> {
    store: Arc<S>,
    ranker: Arc<SimilarityRanker>,
}

impl<S> AppState<S> {
    /// Wraps the store and ranker for sharing across handlers.
    pub fn new(store: Arc<S>, ranker: SimilarityRanker) -> Self {
        Self {
            store,
            ranker: Arc::new(ranker),
        }
    }
}

impl<S> Clone for AppState<S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            ranker: Arc::clone(&self.ranker),
        }
    }
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    message: String,
}

type ApiError = (StatusCode, Json<ErrorBody>);

#[derive(Debug, Deserialize)]
struct SearchQuery {
    #[serde(default)]
    q: Option<String>,
    #[serde(default)]
    limit: Option<usize>,
    #[serde(default)]
    max_distance: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct ListQuery {
    #[serde(default)]
    limit: Option<usize>,
    #[serde(default)]
    offset: Option<usize>,
}

/// Builds the router with request tracing. CORS is layered on by the caller.
pub fn router<S>(state: AppState<S>) -> Router
where
    S: ArticleStore + 'static,
{
    Router::new()
        .route("/health", get(health))
        .route("/articles", get(list_articles::<S>).post(create_article::<S>))
        .route("/articles/search", get(search_articles::<S>))
        .route(
            "/articles/:id",
            get(get_article::<S>)
                .put(update_article::<S>)
                .delete(delete_article::<S>),
        )
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// CORS policy allowing credentials from the listed origins.
pub fn cors_layer(origins: &[String]) -> CorsLayer {
    let allowed: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                warn!(%origin, "ignoring invalid CORS origin");
                None
            }
        })
        .collect();
    CorsLayer::new()
        .allow_origin(AllowOrigin::list(allowed))
        .allow_credentials(true)
        .allow_methods(AllowMethods::mirror_request())
        .allow_headers(AllowHeaders::mirror_request())
}

async fn health() -> Json<Value> {
    Json(json!({ "ok": true }))
}

async fn list_articles<S>(
    State(state): State<AppState<S>>,
    Query(query): Query<ListQuery>,
) -> Result<Json<Vec<Article>>, ApiError>
where
    S: ArticleStore + 'static,
{
    let limit = query.limit.unwrap_or(DEFAULT_LIST_LIMIT);
    if !(1..=MAX_LIST_LIMIT).contains(&limit) {
        return Err(error_response(Error::LimitOutOfRange {
            value: limit,
            min: 1,
            max: MAX_LIST_LIMIT,
        }));
    }
    let offset = query.offset.unwrap_or(0);
    let articles = state
        .store
        .list(limit, offset)
        .await
        .map_err(error_response)?;
    Ok(Json(articles))
}

async fn search_articles<S>(
    State(state): State<AppState<S>>,
    Query(query): Query<SearchQuery>,
) -> Result<Json<Vec<SearchHit>>, ApiError>
where
    S: ArticleStore + 'static,
{
    let params = state
        .ranker
        .params(query.limit, query.max_distance)
        .map_err(error_response)?;
    let text = query.q.unwrap_or_default();
    if text.is_empty() {
        return Err(error_response(Error::EmptyQuery));
    }
    let hits = state
        .ranker
        .search(state.store.as_ref(), &text, params)
        .await
        .map_err(error_response)?;
    Ok(Json(hits))
}

async fn get_article<S>(
    State(state): State<AppState<S>>,
    Path(id): Path<i64>,
) -> Result<Json<Article>, ApiError>
where
    S: ArticleStore + 'static,
{
    match state.store.get(id).await.map_err(error_response)? {
        Some(article) => Ok(Json(article)),
        None => Err(not_found()),
    }
}

async fn create_article<S>(
    State(state): State<AppState<S>>,
    Json(draft): Json<ArticleDraft>,
) -> Result<(StatusCode, Json<Article>), ApiError>
where
    S: ArticleStore + 'static,
{
    draft.validate().map_err(error_response)?;
    let embedding = state.ranker.embedder().embed(&draft.embedding_text());
    let article = state
        .store
        .insert(&draft, &embedding)
        .await
        .map_err(error_response)?;
    info!(id = article.id, "created article");
    Ok((StatusCode::CREATED, Json(article)))
}

async fn update_article<S>(
    State(state): State<AppState<S>>,
    Path(id): Path<i64>,
    Json(patch): Json<ArticlePatch>,
) -> Result<Json<Article>, ApiError>
where
    S: ArticleStore + 'static,
{
    let Some(mut article) = state.store.get(id).await.map_err(error_response)? else {
        return Err(not_found());
    };
    article.apply(patch);
    let embedding = state.ranker.embedder().embed(&article.embedding_text());
    match state
        .store
        .replace(&article, &embedding)
        .await
        .map_err(error_response)?
    {
        Some(updated) => Ok(Json(updated)),
        None => Err(not_found()),
    }
}

async fn delete_article<S>(
    State(state): State<AppState<S>>,
    Path(id): Path<i64>,
) -> Result<StatusCode, ApiError>
where
    S: ArticleStore + 'static,
{
    if state.store.delete(id).await.map_err(error_response)? {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(not_found())
    }
}

fn not_found() -> ApiError {
    (
        StatusCode::NOT_FOUND,
        Json(ErrorBody {
            message: "Article not found".to_string(),
        }),
    )
}

fn error_response(err: Error) -> ApiError {
    let status = if err.is_invalid_input() {
        StatusCode::UNPROCESSABLE_ENTITY
    } else {
        error!(error = %err, "request failed");
        StatusCode::INTERNAL_SERVER_ERROR
    };
    (
        status,
        Json(ErrorBody {
            message: err.to_string(),
        }),
    )
}
