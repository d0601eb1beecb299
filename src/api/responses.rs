//! JSON envelopes returned by the API
//!
//! Every resource is wrapped in a named root key (`{"article": ...}`).
//! The same types are decoded by the client.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::api::common::serialize_timestamp;
use crate::models::{ArticleDetails, CommentWithAuthor, Profile, User};

// ============================================================================
// Users and profiles
// ============================================================================

/// The current user, with a freshly issued token
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserBody {
    pub email: String,
    pub token: String,
    pub username: String,
    pub bio: Option<String>,
    pub image: Option<String>,
}

impl UserBody {
    pub fn new(user: User, token: String) -> Self {
        Self {
            email: user.email,
            token,
            username: user.username,
            bio: user.bio,
            image: user.image,
        }
    }
}

/// `{"user": ...}`, for requests and responses alike
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserEnvelope<T> {
    pub user: T,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProfileEnvelope {
    pub profile: Profile,
}

// ============================================================================
// Articles
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ArticleBody {
    pub slug: String,
    pub title: String,
    pub description: String,
    pub body: String,
    pub tag_list: Vec<String>,
    #[serde(serialize_with = "serialize_timestamp")]
    pub created_at: DateTime<Utc>,
    #[serde(serialize_with = "serialize_timestamp")]
    pub updated_at: DateTime<Utc>,
    pub favorited: bool,
    pub favorites_count: i64,
    pub author: Profile,
}

impl From<ArticleDetails> for ArticleBody {
    fn from(details: ArticleDetails) -> Self {
        let article = details.article;
        Self {
            slug: article.slug,
            title: article.title,
            description: article.description,
            body: article.body,
            tag_list: details.tag_list,
            created_at: article.created_at,
            updated_at: article.updated_at,
            favorited: details.favorited,
            favorites_count: details.favorites_count,
            author: details.author,
        }
    }
}

/// `{"article": ...}`, for requests and responses alike
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArticleEnvelope<T> {
    pub article: T,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ArticleList {
    pub articles: Vec<ArticleBody>,
    /// Matching articles before pagination
    pub articles_count: i64,
}

// ============================================================================
// Comments and tags
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommentBody {
    pub id: i64,
    #[serde(serialize_with = "serialize_timestamp")]
    pub created_at: DateTime<Utc>,
    #[serde(serialize_with = "serialize_timestamp")]
    pub updated_at: DateTime<Utc>,
    pub body: String,
    pub author: Profile,
}

impl From<CommentWithAuthor> for CommentBody {
    fn from(c: CommentWithAuthor) -> Self {
        Self {
            id: c.comment.id,
            created_at: c.comment.created_at,
            updated_at: c.comment.updated_at,
            body: c.comment.body,
            author: c.author,
        }
    }
}

/// `{"comment": ...}`, for requests and responses alike
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommentEnvelope<T> {
    pub comment: T,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommentList {
    pub comments: Vec<CommentBody>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TagList {
    pub tags: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Article;
    use chrono::TimeZone;

    #[test]
    fn test_article_body_wire_shape() {
        let mut article = Article::new(
            "how-to-train-your-dragon".into(),
            "How to train your dragon".into(),
            "Ever wonder how?".into(),
            "You have to believe".into(),
            1,
        );
        article.created_at = Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap();
        article.updated_at = article.created_at;

        let body = ArticleBody::from(ArticleDetails {
            article,
            tag_list: vec!["dragons".into()],
            favorited: false,
            favorites_count: 2,
            author: Profile {
                username: "jake".into(),
                bio: None,
                image: None,
                following: false,
            },
        });
        let json = serde_json::to_value(ArticleEnvelope { article: body }).unwrap();

        assert_eq!(json["article"]["tagList"], serde_json::json!(["dragons"]));
        assert_eq!(json["article"]["favoritesCount"], 2);
        assert_eq!(json["article"]["createdAt"], "2024-05-01T12:00:00.000Z");
        assert_eq!(json["article"]["author"]["username"], "jake");
        assert!(json["article"].get("authorId").is_none());
    }

    #[test]
    fn test_user_body_has_no_password() {
        let user = User::new("jake".into(), "jake@jake.jake".into(), "secret-hash".into());

        let json = serde_json::to_string(&UserEnvelope {
            user: UserBody::new(user, "jwt".into()),
        })
        .unwrap();

        assert!(json.contains("\"token\":\"jwt\""));
        assert!(!json.contains("secret-hash"));
    }
}
