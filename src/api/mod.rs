//! API layer - HTTP handlers and routing
//!
//! This module contains all HTTP API endpoints of the conduit backend.
//! It includes:
//! - User endpoints (register, login, current user)
//! - Profile and follow endpoints
//! - Article, feed and favorite endpoints
//! - Comment endpoints
//! - Tag endpoint

pub mod articles;
pub mod comments;
pub mod common;
pub mod error;
pub mod middleware;
pub mod profiles;
pub mod requests;
pub mod responses;
pub mod tags;
pub mod users;

use axum::{
    http::{header, HeaderValue, Method},
    middleware as axum_middleware,
    routing::{get, post},
    Router,
};
use tower::ServiceBuilder;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;

pub use error::{ApiError, ErrorBody};
pub use middleware::{AppState, AuthenticatedUser, MaybeUser};

/// Build the API router (mounted under `/api`)
pub fn build_api_router(state: AppState) -> Router<AppState> {
    // Routes that need a valid token
    let protected_routes = Router::new()
        .route("/user", get(users::current_user).put(users::update_user))
        .route(
            "/profiles/{username}/follow",
            post(profiles::follow).delete(profiles::unfollow),
        )
        .route("/articles", post(articles::create_article))
        .route("/articles/feed", get(articles::feed))
        .route(
            "/articles/{slug}",
            axum::routing::put(articles::update_article).delete(articles::delete_article),
        )
        .route(
            "/articles/{slug}/favorite",
            post(articles::favorite).delete(articles::unfavorite),
        )
        .route("/articles/{slug}/comments", post(comments::add_comment))
        .route(
            "/articles/{slug}/comments/{id}",
            axum::routing::delete(comments::delete_comment),
        )
        .route_layer(axum_middleware::from_fn_with_state(
            state.clone(),
            middleware::require_auth,
        ));

    // Routes that read the user when a token is sent
    let viewer_routes = Router::new()
        .route("/profiles/{username}", get(profiles::get_profile))
        .route("/articles", get(articles::list_articles))
        .route("/articles/{slug}", get(articles::get_article))
        .route("/articles/{slug}/comments", get(comments::list_comments))
        .route_layer(axum_middleware::from_fn_with_state(
            state.clone(),
            middleware::optional_auth,
        ));

    // Public routes
    Router::new()
        .route("/users", post(users::register))
        .route("/users/login", post(users::login))
        .route("/tags", get(tags::list_tags))
        .merge(viewer_routes)
        .merge(protected_routes)
}

fn cors_layer(cors_origin: &str) -> CorsLayer {
    let cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION]);

    if cors_origin == "*" {
        return cors.allow_origin(AllowOrigin::any());
    }
    match cors_origin.parse::<HeaderValue>() {
        Ok(origin) => cors.allow_origin(origin),
        Err(e) => {
            tracing::warn!(origin = cors_origin, error = %e, "Invalid CORS origin, cross-origin requests disabled");
            cors
        }
    }
}

async fn route_not_found() -> ApiError {
    ApiError::not_found("route")
}

/// Build the complete router with middleware
pub fn build_router(state: AppState, cors_origin: &str) -> Router {
    Router::new()
        .nest("/api", build_api_router(state.clone()))
        .fallback(route_not_found)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(cors_layer(cors_origin)),
        )
        .with_state(state)
}
