//! Comment API endpoints
//!
//! - GET /api/articles/{slug}/comments
//! - POST /api/articles/{slug}/comments
//! - DELETE /api/articles/{slug}/comments/{id}

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};

use crate::api::common::ApiJson;
use crate::api::error::ApiError;
use crate::api::middleware::{AppState, AuthenticatedUser, MaybeUser};
use crate::api::requests::NewComment;
use crate::api::responses::{CommentBody, CommentEnvelope, CommentList};

pub async fn list_comments(
    State(state): State<AppState>,
    viewer: MaybeUser,
    Path(slug): Path<String>,
) -> Result<Json<CommentList>, ApiError> {
    let comments = state.comment_service.list(&slug, viewer.id()).await?;
    Ok(Json(CommentList {
        comments: comments.into_iter().map(CommentBody::from).collect(),
    }))
}

pub async fn add_comment(
    State(state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
    Path(slug): Path<String>,
    ApiJson(body): ApiJson<CommentEnvelope<NewComment>>,
) -> Result<(StatusCode, Json<CommentEnvelope<CommentBody>>), ApiError> {
    let comment = state
        .comment_service
        .add(&slug, &user, body.comment.into())
        .await?;
    Ok((
        StatusCode::CREATED,
        Json(CommentEnvelope {
            comment: comment.into(),
        }),
    ))
}

/// A non-numeric id cannot name a comment, so it is a 404 like any unknown id
pub async fn delete_comment(
    State(state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
    Path((slug, id)): Path<(String, String)>,
) -> Result<StatusCode, ApiError> {
    let id: i64 = id.parse().map_err(|_| ApiError::not_found("comment"))?;
    state.comment_service.delete(&slug, id, user.id).await?;
    Ok(StatusCode::NO_CONTENT)
}
