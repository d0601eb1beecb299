//! Article API endpoints
//!
//! Handles HTTP requests for articles:
//! - GET /api/articles - List articles (tag/author/favorited filters)
//! - GET /api/articles/feed - Articles by followed authors
//! - GET /api/articles/{slug} - Get article by slug
//! - POST /api/articles - Create article
//! - PUT /api/articles/{slug} - Update article (author only)
//! - DELETE /api/articles/{slug} - Delete article (author only)
//! - POST/DELETE /api/articles/{slug}/favorite - Favorite / unfavorite

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};

use crate::api::common::{ApiJson, ApiQuery, PaginationQuery};
use crate::api::error::ApiError;
use crate::api::middleware::{AppState, AuthenticatedUser, MaybeUser};
use crate::api::requests::{ArticleUpdate, ListArticlesQuery, NewArticle};
use crate::api::responses::{ArticleBody, ArticleEnvelope, ArticleList};
use crate::models::{ArticleDetails, ArticleFilter, ListParams, PagedResult};

type ArticleResponse = Json<ArticleEnvelope<ArticleBody>>;

fn single(details: ArticleDetails) -> ArticleResponse {
    Json(ArticleEnvelope {
        article: details.into(),
    })
}

fn list(result: PagedResult<ArticleDetails>) -> Json<ArticleList> {
    let result = result.map(ArticleBody::from);
    Json(ArticleList {
        articles: result.items,
        articles_count: result.total,
    })
}

/// GET /api/articles
pub async fn list_articles(
    State(state): State<AppState>,
    viewer: MaybeUser,
    ApiQuery(query): ApiQuery<ListArticlesQuery>,
) -> Result<Json<ArticleList>, ApiError> {
    let filter = ArticleFilter {
        tag: query.tag,
        author: query.author,
        favorited: query.favorited,
    };
    let params = ListParams::new(query.limit, query.offset);

    let result = state.article_service.list(filter, params, viewer.id()).await?;
    Ok(list(result))
}

/// GET /api/articles/feed
pub async fn feed(
    State(state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
    ApiQuery(query): ApiQuery<PaginationQuery>,
) -> Result<Json<ArticleList>, ApiError> {
    let result = state.article_service.feed(user.id, query.params()).await?;
    Ok(list(result))
}

/// GET /api/articles/{slug}
pub async fn get_article(
    State(state): State<AppState>,
    viewer: MaybeUser,
    Path(slug): Path<String>,
) -> Result<ArticleResponse, ApiError> {
    let details = state.article_service.get(&slug, viewer.id()).await?;
    Ok(single(details))
}

/// POST /api/articles
pub async fn create_article(
    State(state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
    ApiJson(body): ApiJson<ArticleEnvelope<NewArticle>>,
) -> Result<(StatusCode, ArticleResponse), ApiError> {
    let details = state.article_service.create(&user, body.article.into()).await?;
    Ok((StatusCode::CREATED, single(details)))
}

/// PUT /api/articles/{slug}
pub async fn update_article(
    State(state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
    Path(slug): Path<String>,
    ApiJson(body): ApiJson<ArticleEnvelope<ArticleUpdate>>,
) -> Result<ArticleResponse, ApiError> {
    let details = state
        .article_service
        .update(&slug, user.id, body.article.into())
        .await?;
    Ok(single(details))
}

/// DELETE /api/articles/{slug}
pub async fn delete_article(
    State(state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
    Path(slug): Path<String>,
) -> Result<StatusCode, ApiError> {
    state.article_service.delete(&slug, user.id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// POST /api/articles/{slug}/favorite
pub async fn favorite(
    State(state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
    Path(slug): Path<String>,
) -> Result<ArticleResponse, ApiError> {
    let details = state.article_service.favorite(&slug, user.id).await?;
    Ok(single(details))
}

/// DELETE /api/articles/{slug}/favorite
pub async fn unfavorite(
    State(state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
    Path(slug): Path<String>,
) -> Result<ArticleResponse, ApiError> {
    let details = state.article_service.unfavorite(&slug, user.id).await?;
    Ok(single(details))
}
