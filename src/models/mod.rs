//! Data models
//!
//! This module contains the data structures used throughout conduit:
//! - Database entities (User, Article, Comment, Tag)
//! - Viewer-specific views (Profile, ArticleDetails, CommentWithAuthor)
//! - Service input types and list parameters

mod article;
mod comment;
mod profile;
mod tag;
mod user;

pub use article::{
    Article, ArticleDetails, ArticleFilter, ArticleQuery, CreateArticleInput, ListParams,
    PagedResult, UpdateArticleInput, DEFAULT_LIMIT, MAX_LIMIT,
};
pub use comment::{Comment, CommentWithAuthor, CreateCommentInput};
pub use profile::{Follow, Profile};
pub use tag::{normalize_tag_list, Tag};
pub use user::{UpdateUserInput, User};
