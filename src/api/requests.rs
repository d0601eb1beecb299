//! Request bodies accepted by the API
//!
//! Required text fields default to empty so a missing field is reported
//! as `"<field>": ["can't be blank"]` instead of a malformed body.

use serde::{Deserialize, Serialize};

use crate::models::{CreateArticleInput, CreateCommentInput, UpdateArticleInput, UpdateUserInput};
use crate::services::{LoginInput, RegisterInput};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NewUser {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

impl From<NewUser> for RegisterInput {
    fn from(u: NewUser) -> Self {
        RegisterInput::new(u.username, u.email, u.password)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LoginUser {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

impl From<LoginUser> for LoginInput {
    fn from(u: LoginUser) -> Self {
        LoginInput::new(u.email, u.password)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UserUpdate {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bio: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
}

impl From<UserUpdate> for UpdateUserInput {
    fn from(u: UserUpdate) -> Self {
        UpdateUserInput {
            email: u.email,
            username: u.username,
            password: u.password,
            bio: u.bio,
            image: u.image,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewArticle {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub body: String,
    #[serde(default)]
    pub tag_list: Vec<String>,
}

impl From<NewArticle> for CreateArticleInput {
    fn from(a: NewArticle) -> Self {
        CreateArticleInput {
            title: a.title,
            description: a.description,
            body: a.body,
            tag_list: a.tag_list,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ArticleUpdate {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tag_list: Option<Vec<String>>,
}

impl From<ArticleUpdate> for UpdateArticleInput {
    fn from(a: ArticleUpdate) -> Self {
        UpdateArticleInput {
            title: a.title,
            description: a.description,
            body: a.body,
            tag_list: a.tag_list,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NewComment {
    #[serde(default)]
    pub body: String,
}

impl From<NewComment> for CreateCommentInput {
    fn from(c: NewComment) -> Self {
        CreateCommentInput { body: c.body }
    }
}

/// Article list filters and pagination (`GET /api/articles`)
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ListArticlesQuery {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tag: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub favorited: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub limit: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub offset: Option<i64>,
}
