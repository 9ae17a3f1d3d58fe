use axum::extract::{Path, Query, State};
use serde::Deserialize;

use crate::content::{board, gallery, history, news, press};
use crate::content::{BoardMember, GalleryImage, HistoryEvent, NewsArticle, PressArticle};
use crate::error::ApiError;
use crate::middleware::{ApiResponse, ApiResult, IntoApiResponse};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct ListQuery {
    pub limit: Option<usize>,
}

#[derive(Debug, Deserialize)]
pub struct GalleryQuery {
    pub category: Option<String>,
    pub limit: Option<usize>,
}

/// GET /api/news - Published articles, newest first
pub async fn news_list(State(state): State<AppState>, Query(query): Query<ListQuery>) -> ApiResponse<Vec<NewsArticle>> {
    news::latest(state.store.as_ref(), query.limit).await.into_api_response()
}

/// GET /api/news/:slug - One published article
pub async fn news_get(State(state): State<AppState>, Path(slug): Path<String>) -> ApiResult<NewsArticle> {
    match news::by_slug(state.store.as_ref(), &slug).await {
        Some(article) if article.published => Ok(ApiResponse::success(article)),
        _ => Err(ApiError::not_found(format!("No article '{}'", slug))),
    }
}

/// GET /api/press
pub async fn press_list(State(state): State<AppState>, Query(query): Query<ListQuery>) -> ApiResponse<Vec<PressArticle>> {
    press::latest(state.store.as_ref(), query.limit).await.into_api_response()
}

/// GET /api/gallery - Optionally filtered by category
pub async fn gallery_list(
    State(state): State<AppState>,
    Query(query): Query<GalleryQuery>,
) -> ApiResponse<Vec<GalleryImage>> {
    let store = state.store.as_ref();
    let images = match query.category.as_deref().filter(|c| !c.is_empty()) {
        Some(category) => gallery::by_category(store, category, query.limit).await,
        None => gallery::images(store, query.limit).await,
    };
    images.into_api_response()
}

/// GET /api/board
pub async fn board_list(State(state): State<AppState>) -> ApiResponse<Vec<BoardMember>> {
    board::members(state.store.as_ref()).await.into_api_response()
}

/// GET /api/history
pub async fn history_list(State(state): State<AppState>) -> ApiResponse<Vec<HistoryEvent>> {
    history::timeline(state.store.as_ref()).await.into_api_response()
}
