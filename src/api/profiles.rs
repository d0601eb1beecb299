//! Profile API endpoints
//!
//! - GET /api/profiles/{username}
//! - POST /api/profiles/{username}/follow
//! - DELETE /api/profiles/{username}/follow

use axum::{
    extract::{Path, State},
    Json,
};

use crate::api::error::ApiError;
use crate::api::middleware::{AppState, AuthenticatedUser, MaybeUser};
use crate::api::responses::ProfileEnvelope;

pub async fn get_profile(
    State(state): State<AppState>,
    viewer: MaybeUser,
    Path(username): Path<String>,
) -> Result<Json<ProfileEnvelope>, ApiError> {
    let profile = state.profile_service.get(&username, viewer.id()).await?;
    Ok(Json(ProfileEnvelope { profile }))
}

pub async fn follow(
    State(state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
    Path(username): Path<String>,
) -> Result<Json<ProfileEnvelope>, ApiError> {
    let profile = state.profile_service.follow(user.id, &username).await?;
    Ok(Json(ProfileEnvelope { profile }))
}

pub async fn unfollow(
    State(state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
    Path(username): Path<String>,
) -> Result<Json<ProfileEnvelope>, ApiError> {
    let profile = state.profile_service.unfollow(user.id, &username).await?;
    Ok(Json(ProfileEnvelope { profile }))
}
