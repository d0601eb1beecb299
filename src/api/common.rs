//! Common API utilities and shared types
//!
//! Extractors whose rejections use the API error body, pagination query
//! parameters, and the timestamp format used on the wire.

use axum::extract::{FromRequest, FromRequestParts};
use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serializer};

use crate::api::error::ApiError;
use crate::models::ListParams;

/// `Json` whose rejection is a 422 on `body`
#[derive(Debug, FromRequest)]
#[from_request(via(axum::Json), rejection(ApiError))]
pub struct ApiJson<T>(pub T);

/// `Query` whose rejection is a 422 on `query`
#[derive(Debug, FromRequestParts)]
#[from_request(via(axum::extract::Query), rejection(ApiError))]
pub struct ApiQuery<T>(pub T);

// ============================================================================
// Pagination
// ============================================================================

/// `limit`/`offset` query parameters
#[derive(Debug, Default, Deserialize)]
pub struct PaginationQuery {
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

impl PaginationQuery {
    pub fn params(&self) -> ListParams {
        ListParams::new(self.limit, self.offset)
    }
}

// ============================================================================
// Timestamps
// ============================================================================

/// Format a timestamp as ISO-8601 UTC with milliseconds, e.g. `2024-01-01T10:00:00.000Z`
pub fn format_timestamp(dt: &DateTime<Utc>) -> String {
    dt.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// serde `serialize_with` helper for `format_timestamp`
pub fn serialize_timestamp<S: Serializer>(dt: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(&format_timestamp(dt))
}
