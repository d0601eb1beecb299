//! End-to-end tests against the full router

use axum::http::{header, HeaderValue, StatusCode};
use axum_test::{TestResponse, TestServer};
use serde_json::{json, Value};

use conduit::api::{build_router, AppState};
use conduit::api::requests::{ListArticlesQuery, NewArticle, UserUpdate};
use conduit::api::responses::{ArticleBody, UserBody};
use conduit::client::{keys, AuthSession, ConduitClient};
use conduit::config::{Config, DEV_JWT_SECRET};
use conduit::db::{create_test_pool, migrations};
use conduit::models::{Profile, User};
use conduit::services::TokenService;

async fn app() -> axum::Router {
    let pool = create_test_pool().await.unwrap();
    migrations::run_migrations(&pool).await.unwrap();
    build_router(AppState::new(pool, &Config::default()), "*")
}

async fn server() -> TestServer {
    TestServer::new(app().await).unwrap()
}

fn auth(token: &str) -> HeaderValue {
    HeaderValue::from_str(&format!("Token {}", token)).unwrap()
}

fn errors(response: &TestResponse, field: &str) -> Vec<String> {
    let body: Value = response.json();
    serde_json::from_value(body["errors"][field].clone()).unwrap_or_default()
}

async fn register(server: &TestServer, username: &str) -> String {
    let response = server
        .post("/api/users")
        .json(&json!({"user": {
            "username": username,
            "email": format!("{}@example.com", username),
            "password": "secret-password"
        }}))
        .await;
    assert_eq!(response.status_code(), StatusCode::OK);
    let body: Value = response.json();
    body["user"]["token"].as_str().unwrap().to_string()
}

async fn create_article(server: &TestServer, token: &str, title: &str, tags: &[&str]) -> Value {
    let response = server
        .post("/api/articles")
        .add_header(header::AUTHORIZATION, auth(token))
        .json(&json!({"article": {
            "title": title,
            "description": "About it",
            "body": "Long text",
            "tagList": tags
        }}))
        .await;
    assert_eq!(response.status_code(), StatusCode::CREATED);
    let body: Value = response.json();
    body["article"].clone()
}

#[tokio::test]
async fn test_register_login_and_current_user() {
    let server = server().await;
    register(&server, "jake").await;

    let response = server
        .post("/api/users/login")
        .json(&json!({"user": {"email": "jake@example.com", "password": "secret-password"}}))
        .await;
    assert_eq!(response.status_code(), StatusCode::OK);
    let body: Value = response.json();
    assert_eq!(body["user"]["username"], "jake");
    assert!(body["user"]["bio"].is_null());
    let token = body["user"]["token"].as_str().unwrap().to_string();

    let response = server
        .get("/api/user")
        .add_header(header::AUTHORIZATION, auth(&token))
        .await;
    assert_eq!(response.status_code(), StatusCode::OK);
    let body: Value = response.json();
    assert_eq!(body["user"]["email"], "jake@example.com");
}

#[tokio::test]
async fn test_duplicate_email_is_rejected() {
    let server = server().await;
    register(&server, "jake").await;

    let response = server
        .post("/api/users")
        .json(&json!({"user": {"username": "other", "email": "jake@example.com", "password": "pw"}}))
        .await;

    assert_eq!(response.status_code(), StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(errors(&response, "email"), vec!["has already been taken"]);
}

#[tokio::test]
async fn test_wrong_password() {
    let server = server().await;
    register(&server, "jake").await;

    let response = server
        .post("/api/users/login")
        .json(&json!({"user": {"email": "jake@example.com", "password": "nope"}}))
        .await;

    assert_eq!(response.status_code(), StatusCode::UNAUTHORIZED);
    assert_eq!(errors(&response, "credentials"), vec!["email or password is invalid"]);
}

#[tokio::test]
async fn test_protected_route_without_token() {
    let server = server().await;

    let response = server.get("/api/user").await;

    assert_eq!(response.status_code(), StatusCode::UNAUTHORIZED);
    assert_eq!(errors(&response, "token"), vec!["is missing"]);
}

#[tokio::test]
async fn test_malformed_json_body() {
    let server = server().await;

    let response = server
        .post("/api/users")
        .content_type("application/json")
        .bytes("{not json".into())
        .await;

    assert_eq!(response.status_code(), StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(errors(&response, "body"), vec!["is invalid"]);
}

#[tokio::test]
async fn test_unknown_article_and_route() {
    let server = server().await;

    let response = server.get("/api/articles/does-not-exist").await;
    assert_eq!(response.status_code(), StatusCode::NOT_FOUND);
    assert_eq!(errors(&response, "article"), vec!["not found"]);

    let response = server.get("/api/nothing-here").await;
    assert_eq!(response.status_code(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_article_lifecycle_and_tags() {
    let server = server().await;
    let token = register(&server, "jake").await;

    let article = create_article(&server, &token, "How to train your dragon", &["dragons", "training"]).await;
    assert_eq!(article["slug"], "how-to-train-your-dragon");
    assert_eq!(article["tagList"], json!(["dragons", "training"]));
    assert_eq!(article["favorited"], false);
    assert_eq!(article["favoritesCount"], 0);
    assert!(article["createdAt"].as_str().unwrap().ends_with('Z'));

    let response = server.get("/api/tags").await;
    let body: Value = response.json();
    assert_eq!(body["tags"], json!(["dragons", "training"]));

    let response = server
        .get("/api/articles")
        .add_query_param("tag", "dragons")
        .await;
    let body: Value = response.json();
    assert_eq!(body["articlesCount"], 1);

    let response = server
        .put("/api/articles/how-to-train-your-dragon")
        .add_header(header::AUTHORIZATION, auth(&token))
        .json(&json!({"article": {"title": "Taming dragons"}}))
        .await;
    assert_eq!(response.status_code(), StatusCode::OK);
    let body: Value = response.json();
    assert_eq!(body["article"]["slug"], "taming-dragons");

    let response = server
        .delete("/api/articles/taming-dragons")
        .add_header(header::AUTHORIZATION, auth(&token))
        .await;
    assert_eq!(response.status_code(), StatusCode::NO_CONTENT);

    let response = server.get("/api/articles/taming-dragons").await;
    assert_eq!(response.status_code(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_only_author_can_change_article() {
    let server = server().await;
    let jake = register(&server, "jake").await;
    let jane = register(&server, "jane").await;
    create_article(&server, &jake, "Dragons", &[]).await;

    let response = server
        .delete("/api/articles/dragons")
        .add_header(header::AUTHORIZATION, auth(&jane))
        .await;

    assert_eq!(response.status_code(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_favorite_is_idempotent() {
    let server = server().await;
    let jake = register(&server, "jake").await;
    let jane = register(&server, "jane").await;
    create_article(&server, &jake, "Dragons", &[]).await;

    for _ in 0..2 {
        let response = server
            .post("/api/articles/dragons/favorite")
            .add_header(header::AUTHORIZATION, auth(&jane))
            .await;
        let body: Value = response.json();
        assert_eq!(body["article"]["favorited"], true);
        assert_eq!(body["article"]["favoritesCount"], 1);
    }

    let response = server
        .get("/api/articles")
        .add_query_param("favorited", "jane")
        .await;
    let body: Value = response.json();
    assert_eq!(body["articlesCount"], 1);

    let response = server
        .delete("/api/articles/dragons/favorite")
        .add_header(header::AUTHORIZATION, auth(&jane))
        .await;
    let body: Value = response.json();
    assert_eq!(body["article"]["favorited"], false);
    assert_eq!(body["article"]["favoritesCount"], 0);
}

#[tokio::test]
async fn test_follow_and_feed() {
    let server = server().await;
    let jake = register(&server, "jake").await;
    let jane = register(&server, "jane").await;
    create_article(&server, &jake, "Dragons", &[]).await;

    let response = server
        .get("/api/articles/feed")
        .add_header(header::AUTHORIZATION, auth(&jane))
        .await;
    let body: Value = response.json();
    assert_eq!(body["articlesCount"], 0);

    let response = server
        .post("/api/profiles/jake/follow")
        .add_header(header::AUTHORIZATION, auth(&jane))
        .await;
    let body: Value = response.json();
    assert_eq!(body["profile"]["following"], true);

    let response = server
        .get("/api/articles/feed")
        .add_header(header::AUTHORIZATION, auth(&jane))
        .await;
    let body: Value = response.json();
    assert_eq!(body["articlesCount"], 1);
    assert_eq!(body["articles"][0]["author"]["following"], true);

    // Anonymous viewers never follow
    let response = server.get("/api/profiles/jake").await;
    let body: Value = response.json();
    assert_eq!(body["profile"]["following"], false);

    let response = server
        .post("/api/profiles/jane/follow")
        .add_header(header::AUTHORIZATION, auth(&jane))
        .await;
    assert_eq!(response.status_code(), StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn test_comment_lifecycle() {
    let server = server().await;
    let jake = register(&server, "jake").await;
    let jane = register(&server, "jane").await;
    create_article(&server, &jake, "Dragons", &[]).await;

    let response = server
        .post("/api/articles/dragons/comments")
        .add_header(header::AUTHORIZATION, auth(&jane))
        .json(&json!({"comment": {"body": "Great read"}}))
        .await;
    assert_eq!(response.status_code(), StatusCode::CREATED);
    let body: Value = response.json();
    let id = body["comment"]["id"].as_i64().unwrap();
    assert_eq!(body["comment"]["author"]["username"], "jane");

    let response = server.get("/api/articles/dragons/comments").await;
    let body: Value = response.json();
    assert_eq!(body["comments"].as_array().unwrap().len(), 1);

    let response = server
        .delete(&format!("/api/articles/dragons/comments/{}", id))
        .add_header(header::AUTHORIZATION, auth(&jake))
        .await;
    assert_eq!(response.status_code(), StatusCode::FORBIDDEN);

    let response = server
        .delete(&format!("/api/articles/dragons/comments/{}", id))
        .add_header(header::AUTHORIZATION, auth(&jane))
        .await;
    assert_eq!(response.status_code(), StatusCode::NO_CONTENT);

    let response = server
        .delete("/api/articles/dragons/comments/abc")
        .add_header(header::AUTHORIZATION, auth(&jane))
        .await;
    assert_eq!(response.status_code(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_protected_route_rejects_bad_tokens() {
    let server = server().await;
    register(&server, "jake").await;

    let response = server
        .get("/api/user")
        .add_header(header::AUTHORIZATION, auth("not-a-jwt"))
        .await;
    assert_eq!(response.status_code(), StatusCode::UNAUTHORIZED);
    assert_eq!(errors(&response, "token"), vec!["is invalid"]);

    // Signed by someone else
    let mut jake = User::new("jake".into(), "jake@example.com".into(), "hash".into());
    jake.id = 1;
    let forged = TokenService::new("another-secret", chrono::Duration::hours(1))
        .issue(&jake)
        .unwrap();
    let response = server
        .get("/api/user")
        .add_header(header::AUTHORIZATION, auth(&forged))
        .await;
    assert_eq!(response.status_code(), StatusCode::UNAUTHORIZED);
    assert_eq!(errors(&response, "token"), vec!["is invalid"]);

    let expired = TokenService::new(DEV_JWT_SECRET, chrono::Duration::hours(-1))
        .issue(&jake)
        .unwrap();
    let response = server
        .get("/api/user")
        .add_header(header::AUTHORIZATION, auth(&expired))
        .await;
    assert_eq!(response.status_code(), StatusCode::UNAUTHORIZED);
    assert_eq!(errors(&response, "token"), vec!["has expired"]);
}

#[tokio::test]
async fn test_optional_route_ignores_garbage_token() {
    let server = server().await;
    let jake = register(&server, "jake").await;
    create_article(&server, &jake, "Dragons", &[]).await;

    let response = server
        .get("/api/articles/dragons")
        .add_header(header::AUTHORIZATION, auth("garbage"))
        .await;
    assert_eq!(response.status_code(), StatusCode::OK);
    let body: Value = response.json();
    assert_eq!(body["article"]["favorited"], false);

    let response = server
        .get("/api/profiles/jake")
        .add_header(header::AUTHORIZATION, HeaderValue::from_static("Basic dXNlcjpwYXNz"))
        .await;
    assert_eq!(response.status_code(), StatusCode::OK);
    let body: Value = response.json();
    assert_eq!(body["profile"]["following"], false);
}

#[tokio::test]
async fn test_malformed_query_string() {
    let server = server().await;

    let response = server.get("/api/articles").add_query_param("limit", "abc").await;

    assert_eq!(response.status_code(), StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(errors(&response, "query"), vec!["is invalid"]);
}

// ============================================================================
// Typed client against a live server
// ============================================================================

async fn spawn_server() -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let app = app().await;
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{}/api", addr)
}

#[tokio::test]
async fn test_client_session_and_optimistic_favorite() {
    let base = spawn_server().await;
    let client = ConduitClient::new(&base, AuthSession::in_memory()).unwrap();

    let user = client.register("jake", "jake@example.com", "secret-password").await.unwrap();
    assert!(client.session().is_logged_in());
    assert_eq!(client.query_current_user().await.unwrap().username, user.username);

    let created = client
        .create_article(&NewArticle {
            title: "Dragons".into(),
            description: "About dragons".into(),
            body: "Text".into(),
            tag_list: vec!["dragons".into()],
        })
        .await
        .unwrap();

    let cached = client.query_article(&created.slug).await.unwrap();
    assert!(!cached.favorited);

    let favorited = client.favorite_optimistic(&created.slug).await.unwrap();
    assert!(favorited.favorited);
    assert_eq!(favorited.favorites_count, 1);

    let cached = client.cache().get::<ArticleBody>(&keys::article(&created.slug)).unwrap();
    assert!(cached.favorited);
    assert_eq!(cached.favorites_count, 1);

    let list = client
        .query_articles(&ListArticlesQuery {
            favorited: Some("jake".into()),
            ..Default::default()
        })
        .await
        .unwrap();
    assert_eq!(list.articles_count, 1);

    assert_eq!(client.query_tags().await.unwrap(), vec!["dragons"]);
}

#[tokio::test]
async fn test_client_rolls_back_failed_update() {
    let base = spawn_server().await;
    let other = ConduitClient::new(&base, AuthSession::in_memory()).unwrap();
    other.register("jane", "jane@example.com", "pw").await.unwrap();

    let client = ConduitClient::new(&base, AuthSession::in_memory()).unwrap();
    client.register("jake", "jake@example.com", "pw").await.unwrap();

    let before = client.query_current_user().await.unwrap();

    let error = client
        .update_user_optimistic(&UserUpdate {
            email: Some("jane@example.com".into()),
            ..Default::default()
        })
        .await
        .unwrap_err();

    assert_eq!(error.status(), Some(StatusCode::UNPROCESSABLE_ENTITY));
    assert_eq!(error.messages(), vec!["email has already been taken"]);
    let cached = client.cache().get::<UserBody>(&keys::current_user()).unwrap();
    assert_eq!(cached.email, before.email);
}

#[tokio::test]
async fn test_client_optimistic_follow_and_unfavorite() {
    let base = spawn_server().await;
    let author = ConduitClient::new(&base, AuthSession::in_memory()).unwrap();
    author.register("jake", "jake@example.com", "pw").await.unwrap();
    let created = author
        .create_article(&NewArticle {
            title: "Dragons".into(),
            description: "d".into(),
            body: "b".into(),
            tag_list: vec![],
        })
        .await
        .unwrap();

    let client = ConduitClient::new(&base, AuthSession::in_memory()).unwrap();
    client.register("jane", "jane@example.com", "pw").await.unwrap();

    assert!(!client.query_profile("jake").await.unwrap().following);
    let followed = client.follow_optimistic("jake").await.unwrap();
    assert!(followed.following);
    assert!(client.cache().get::<Profile>(&keys::profile("jake")).unwrap().following);
    assert_eq!(client.query_feed(None, None).await.unwrap().articles_count, 1);

    let unfollowed = client.unfollow_optimistic("jake").await.unwrap();
    assert!(!unfollowed.following);
    assert!(!client.cache().get::<Profile>(&keys::profile("jake")).unwrap().following);
    assert_eq!(client.query_feed(None, None).await.unwrap().articles_count, 0);

    client.query_article(&created.slug).await.unwrap();
    client.favorite_optimistic(&created.slug).await.unwrap();
    let unfavorited = client.unfavorite_optimistic(&created.slug).await.unwrap();
    assert!(!unfavorited.favorited);
    assert_eq!(unfavorited.favorites_count, 0);
    let cached = client.cache().get::<ArticleBody>(&keys::article(&created.slug)).unwrap();
    assert!(!cached.favorited);
    assert_eq!(cached.favorites_count, 0);
}

#[tokio::test]
async fn test_client_rolls_back_follow_of_unknown_user() {
    let base = spawn_server().await;
    let client = ConduitClient::new(&base, AuthSession::in_memory()).unwrap();
    client.register("jane", "jane@example.com", "pw").await.unwrap();
    let ghost = Profile {
        username: "ghost".into(),
        bio: None,
        image: None,
        following: false,
    };
    client.cache().set(keys::profile("ghost"), &ghost);

    let error = client.follow_optimistic("ghost").await.unwrap_err();

    assert_eq!(error.status(), Some(StatusCode::NOT_FOUND));
    assert_eq!(error.messages(), vec!["profile not found"]);
    assert_eq!(client.cache().get::<Profile>(&keys::profile("ghost")), Some(ghost));
}

#[tokio::test]
async fn test_client_register_drops_previous_users_cache() {
    let base = spawn_server().await;
    let client = ConduitClient::new(&base, AuthSession::in_memory()).unwrap();
    client.register("jake", "jake@example.com", "pw").await.unwrap();
    let created = client
        .create_article(&NewArticle {
            title: "Dragons".into(),
            description: "d".into(),
            body: "b".into(),
            tag_list: vec![],
        })
        .await
        .unwrap();
    client.query_article(&created.slug).await.unwrap();
    client.favorite_optimistic(&created.slug).await.unwrap();

    client.register("jane", "jane@example.com", "pw").await.unwrap();

    let seen = client.query_article(&created.slug).await.unwrap();
    assert!(!seen.favorited);
    assert_eq!(seen.favorites_count, 1);
}
