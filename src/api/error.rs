//! API errors
//!
//! Every failure leaves the API as `{"errors": {"<field>": ["<message>"]}}`.
//! Service errors are mapped here; internal errors are logged and hidden
//! behind a generic `server` message.

use axum::{
    extract::rejection::{JsonRejection, QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::services::validation::{MALFORMED, TAKEN};
use crate::services::{
    ArticleServiceError, CommentServiceError, ProfileServiceError, TagServiceError, TokenError,
    UserServiceError,
};

pub const NOT_FOUND: &str = "not found";
pub const UNEXPECTED: &str = "An unexpected error occurred";

/// Wire form of an error response
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorBody {
    pub errors: BTreeMap<String, Vec<String>>,
}

impl ErrorBody {
    pub fn single(field: impl Into<String>, message: impl Into<String>) -> Self {
        let mut errors = BTreeMap::new();
        errors.insert(field.into(), vec![message.into()]);
        Self { errors }
    }
}

/// An error answered to the client
#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub field: String,
    pub message: String,
}

impl ApiError {
    pub fn new(status: StatusCode, field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            status,
            field: field.into(),
            message: message.into(),
        }
    }

    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(StatusCode::UNPROCESSABLE_ENTITY, field, message)
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new(StatusCode::UNAUTHORIZED, "token", message)
    }

    pub fn forbidden(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(StatusCode::FORBIDDEN, field, message)
    }

    pub fn not_found(field: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, field, NOT_FOUND)
    }

    /// Log the cause and answer with the generic 500 body
    pub fn internal(cause: impl std::fmt::Display) -> Self {
        tracing::error!(error = %cause, "Unexpected error while handling request");
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, "server", UNEXPECTED)
    }

    pub fn body(&self) -> ErrorBody {
        ErrorBody::single(self.field.clone(), self.message.clone())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = self.body();
        (self.status, Json(body)).into_response()
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        tracing::debug!(error = %rejection.body_text(), "Rejected request body");
        ApiError::validation("body", MALFORMED)
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        tracing::debug!(error = %rejection.body_text(), "Rejected query string");
        ApiError::validation("query", MALFORMED)
    }
}

impl From<TokenError> for ApiError {
    fn from(e: TokenError) -> Self {
        match e {
            TokenError::Expired => ApiError::unauthorized("has expired"),
            TokenError::Invalid(_) => ApiError::unauthorized("is invalid"),
            TokenError::Signing(reason) => ApiError::internal(format!("Failed to sign token: {}", reason)),
        }
    }
}

impl From<UserServiceError> for ApiError {
    fn from(e: UserServiceError) -> Self {
        match e {
            UserServiceError::InvalidCredentials => ApiError::new(
                StatusCode::UNAUTHORIZED,
                "credentials",
                "email or password is invalid",
            ),
            UserServiceError::ValidationError { field, message } => ApiError::validation(field, message),
            UserServiceError::Taken(field) => ApiError::validation(field, TAKEN),
            UserServiceError::NotFound => ApiError::not_found("user"),
            UserServiceError::InternalError(e) => ApiError::internal(format!("{:#}", e)),
        }
    }
}

impl From<ProfileServiceError> for ApiError {
    fn from(e: ProfileServiceError) -> Self {
        match e {
            ProfileServiceError::NotFound(_) => ApiError::not_found("profile"),
            ProfileServiceError::CannotFollowSelf => ApiError::validation("profile", "cannot follow yourself"),
            ProfileServiceError::InternalError(e) => ApiError::internal(format!("{:#}", e)),
        }
    }
}

impl From<ArticleServiceError> for ApiError {
    fn from(e: ArticleServiceError) -> Self {
        match e {
            ArticleServiceError::NotFound(_) => ApiError::not_found("article"),
            ArticleServiceError::Forbidden => {
                ApiError::forbidden("article", "can only be changed by its author")
            }
            ArticleServiceError::ValidationError { field, message } => ApiError::validation(field, message),
            ArticleServiceError::InternalError(e) => ApiError::internal(format!("{:#}", e)),
        }
    }
}

impl From<CommentServiceError> for ApiError {
    fn from(e: CommentServiceError) -> Self {
        match e {
            CommentServiceError::ArticleNotFound(_) => ApiError::not_found("article"),
            CommentServiceError::CommentNotFound(_) => ApiError::not_found("comment"),
            CommentServiceError::Forbidden => {
                ApiError::forbidden("comment", "can only be deleted by its author")
            }
            CommentServiceError::ValidationError { field, message } => ApiError::validation(field, message),
            CommentServiceError::InternalError(e) => ApiError::internal(format!("{:#}", e)),
        }
    }
}

impl From<TagServiceError> for ApiError {
    fn from(e: TagServiceError) -> Self {
        match e {
            TagServiceError::InternalError(e) => ApiError::internal(format!("{:#}", e)),
        }
    }
}
