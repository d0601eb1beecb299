//! Comment service
//!
//! Comments hang off an article, are listed newest first, and can only be
//! deleted by their author.

use crate::db::repositories::{ArticleRepository, CommentRepository, UserRepository};
use crate::models::{Article, Comment, CommentWithAuthor, CreateCommentInput, Profile, User};
use crate::services::profile::{ProfileService, ProfileServiceError};
use crate::services::validation::{self, Invalid};
use anyhow::Context;
use std::collections::HashMap;
use std::sync::Arc;

/// Error types for comment service operations
#[derive(Debug, thiserror::Error)]
pub enum CommentServiceError {
    #[error("Article not found: {0}")]
    ArticleNotFound(String),

    #[error("Comment not found: {0}")]
    CommentNotFound(i64),

    /// The user is not the comment's author
    #[error("Only the author can delete this comment")]
    Forbidden,

    #[error("{field} {message}")]
    ValidationError {
        field: &'static str,
        message: &'static str,
    },

    #[error("Internal error: {0}")]
    InternalError(#[from] anyhow::Error),
}

impl From<Invalid> for CommentServiceError {
    fn from(e: Invalid) -> Self {
        CommentServiceError::ValidationError {
            field: e.field,
            message: e.message,
        }
    }
}

impl From<ProfileServiceError> for CommentServiceError {
    fn from(e: ProfileServiceError) -> Self {
        match e {
            ProfileServiceError::InternalError(e) => CommentServiceError::InternalError(e),
            other => CommentServiceError::InternalError(anyhow::anyhow!(other)),
        }
    }
}

pub struct CommentService {
    repo: Arc<dyn CommentRepository>,
    article_repo: Arc<dyn ArticleRepository>,
    user_repo: Arc<dyn UserRepository>,
    profiles: Arc<ProfileService>,
}

impl CommentService {
    pub fn new(
        repo: Arc<dyn CommentRepository>,
        article_repo: Arc<dyn ArticleRepository>,
        user_repo: Arc<dyn UserRepository>,
        profiles: Arc<ProfileService>,
    ) -> Self {
        Self {
            repo,
            article_repo,
            user_repo,
            profiles,
        }
    }

    /// Add a comment to the article with `slug`
    pub async fn add(
        &self,
        slug: &str,
        author: &User,
        input: CreateCommentInput,
    ) -> Result<CommentWithAuthor, CommentServiceError> {
        validation::require("body", &input.body)?;
        let article = self.find_article(slug).await?;

        let comment = self
            .repo
            .create(&Comment::new(input.body, article.id, author.id))
            .await
            .context("Failed to create comment")?;

        tracing::info!(comment_id = comment.id, article_id = article.id, author_id = author.id, "Comment added");

        let author = self.profiles.profile_of(author, Some(author.id)).await?;
        Ok(CommentWithAuthor { comment, author })
    }

    /// All comments of an article, newest first
    pub async fn list(
        &self,
        slug: &str,
        viewer_id: Option<i64>,
    ) -> Result<Vec<CommentWithAuthor>, CommentServiceError> {
        let article = self.find_article(slug).await?;
        let comments = self
            .repo
            .list_by_article(article.id)
            .await
            .context("Failed to list comments")?;

        // One lookup per distinct author
        let mut authors: HashMap<i64, Profile> = HashMap::new();
        let mut result = Vec::with_capacity(comments.len());
        for comment in comments {
            let author = match authors.get(&comment.author_id) {
                Some(profile) => profile.clone(),
                None => {
                    let user = self
                        .user_repo
                        .get_by_id(comment.author_id)
                        .await
                        .context("Failed to load comment author")?
                        .ok_or_else(|| anyhow::anyhow!("Author {} of comment {} is missing", comment.author_id, comment.id))?;
                    let profile = self.profiles.profile_of(&user, viewer_id).await?;
                    authors.insert(comment.author_id, profile.clone());
                    profile
                }
            };
            result.push(CommentWithAuthor { comment, author });
        }

        Ok(result)
    }

    /// Delete a comment. The comment must belong to the article and to the user.
    pub async fn delete(&self, slug: &str, comment_id: i64, user_id: i64) -> Result<(), CommentServiceError> {
        let article = self.find_article(slug).await?;
        let comment = self
            .repo
            .get_by_id(comment_id)
            .await
            .context("Failed to get comment")?
            .filter(|c| c.article_id == article.id)
            .ok_or(CommentServiceError::CommentNotFound(comment_id))?;

        if comment.author_id != user_id {
            return Err(CommentServiceError::Forbidden);
        }

        self.repo
            .delete(comment.id)
            .await
            .context("Failed to delete comment")?;

        tracing::info!(comment_id, article_id = article.id, "Comment deleted");
        Ok(())
    }

    async fn find_article(&self, slug: &str) -> Result<Article, CommentServiceError> {
        self.article_repo
            .get_by_slug(slug)
            .await
            .context("Failed to get article by slug")?
            .ok_or_else(|| CommentServiceError::ArticleNotFound(slug.to_string()))
    }
}
