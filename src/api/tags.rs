//! Tag API endpoints
//!
//! - GET /api/tags - All tag names, sorted and distinct

use axum::{extract::State, Json};

use crate::api::error::ApiError;
use crate::api::middleware::AppState;
use crate::api::responses::TagList;

pub async fn list_tags(State(state): State<AppState>) -> Result<Json<TagList>, ApiError> {
    let tags = state.tag_service.list().await?;
    Ok(Json(TagList { tags }))
}
