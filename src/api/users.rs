//! User API endpoints
//!
//! - POST /api/users - Register
//! - POST /api/users/login - Login
//! - GET /api/user - Current user
//! - PUT /api/user - Update current user
//!
//! Every response carries a freshly issued token.

use axum::{extract::State, Json};

use crate::api::common::ApiJson;
use crate::api::error::ApiError;
use crate::api::middleware::{AppState, AuthenticatedUser};
use crate::api::requests::{LoginUser, NewUser, UserUpdate};
use crate::api::responses::{UserBody, UserEnvelope};
use crate::models::User;

fn respond(state: &AppState, user: User) -> Result<Json<UserEnvelope<UserBody>>, ApiError> {
    let token = state.issue_token(&user)?;
    Ok(Json(UserEnvelope {
        user: UserBody::new(user, token),
    }))
}

/// POST /api/users
pub async fn register(
    State(state): State<AppState>,
    ApiJson(body): ApiJson<UserEnvelope<NewUser>>,
) -> Result<Json<UserEnvelope<UserBody>>, ApiError> {
    let user = state.user_service.register(body.user.into()).await?;
    respond(&state, user)
}

/// POST /api/users/login
pub async fn login(
    State(state): State<AppState>,
    ApiJson(body): ApiJson<UserEnvelope<LoginUser>>,
) -> Result<Json<UserEnvelope<UserBody>>, ApiError> {
    let user = state.user_service.login(body.user.into()).await?;
    tracing::debug!(user_id = user.id, "User logged in");
    respond(&state, user)
}

/// GET /api/user
pub async fn current_user(
    State(state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
) -> Result<Json<UserEnvelope<UserBody>>, ApiError> {
    respond(&state, user)
}

/// PUT /api/user
pub async fn update_user(
    State(state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
    ApiJson(body): ApiJson<UserEnvelope<UserUpdate>>,
) -> Result<Json<UserEnvelope<UserBody>>, ApiError> {
    let updated = state.user_service.update(user.id, body.user.into()).await?;
    respond(&state, updated)
}
