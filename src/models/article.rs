//! Article model
//!
//! This module defines the Article entity, the viewer-specific
//! `ArticleDetails` assembled by the article service, and the inputs and
//! list parameters used by the API.

use chrono::{DateTime, SubsecRound, Utc};
use serde::{Deserialize, Serialize};

use super::Profile;

/// Default page size for article lists
pub const DEFAULT_LIMIT: i64 = 20;
/// Largest page size a client may request
pub const MAX_LIMIT: i64 = 100;

/// Article entity as stored in the database.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Article {
    /// Unique identifier
    pub id: i64,
    /// URL-friendly slug derived from the title (unique)
    pub slug: String,
    pub title: String,
    pub description: String,
    /// Markdown body, stored as-is
    pub body: String,
    /// Author user ID
    pub author_id: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Article {
    /// Create a new Article with the given parameters.
    ///
    /// The ID will be set to 0 and should be assigned by the database.
    pub fn new(
        slug: String,
        title: String,
        description: String,
        body: String,
        author_id: i64,
    ) -> Self {
        let now = Utc::now().trunc_subsecs(3);
        Self {
            id: 0, // Will be set by the database
            slug,
            title,
            description,
            body,
            author_id,
            created_at: now,
            updated_at: now,
        }
    }

    /// Check if the given user wrote this article
    pub fn is_authored_by(&self, user_id: i64) -> bool {
        self.author_id == user_id
    }
}

/// An article decorated for a particular viewer
#[derive(Debug, Clone, PartialEq)]
pub struct ArticleDetails {
    pub article: Article,
    /// Tag names in insertion order
    pub tag_list: Vec<String>,
    /// Whether the viewer has favorited the article
    pub favorited: bool,
    pub favorites_count: i64,
    pub author: Profile,
}

/// Input for creating a new article
#[derive(Debug, Clone, Default)]
pub struct CreateArticleInput {
    pub title: String,
    pub description: String,
    pub body: String,
    pub tag_list: Vec<String>,
}

/// Input for updating an existing article
#[derive(Debug, Clone, Default)]
pub struct UpdateArticleInput {
    pub title: Option<String>,
    pub description: Option<String>,
    pub body: Option<String>,
    /// Replaces the whole tag set when present
    pub tag_list: Option<Vec<String>>,
}

impl UpdateArticleInput {
    /// Check if any field is set
    pub fn has_changes(&self) -> bool {
        self.title.is_some()
            || self.description.is_some()
            || self.body.is_some()
            || self.tag_list.is_some()
    }
}

/// Limit/offset pagination for list queries
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListParams {
    pub limit: i64,
    pub offset: i64,
}

impl Default for ListParams {
    fn default() -> Self {
        Self {
            limit: DEFAULT_LIMIT,
            offset: 0,
        }
    }
}

impl ListParams {
    /// Create new pagination parameters, clamping out-of-range values
    pub fn new(limit: Option<i64>, offset: Option<i64>) -> Self {
        Self {
            limit: limit.unwrap_or(DEFAULT_LIMIT).clamp(1, MAX_LIMIT),
            offset: offset.unwrap_or(0).max(0),
        }
    }
}

/// Filters for the global article list. All set filters must match.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ArticleFilter {
    /// Tag name
    pub tag: Option<String>,
    /// Author username
    pub author: Option<String>,
    /// Username of a user who favorited the article
    pub favorited: Option<String>,
}

/// Filters resolved to IDs for the repository layer
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ArticleQuery {
    pub tag: Option<String>,
    pub author_id: Option<i64>,
    pub favorited_by: Option<i64>,
    /// Only articles by authors this user follows
    pub followed_by: Option<i64>,
}

/// Paginated result container
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PagedResult<T> {
    /// Items in the current page
    pub items: Vec<T>,
    /// Total number of matching items before pagination
    pub total: i64,
}

impl<T> PagedResult<T> {
    pub fn new(items: Vec<T>, total: i64) -> Self {
        Self { items, total }
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Transform every item, keeping the total
    pub fn map<U, F: FnMut(T) -> U>(self, f: F) -> PagedResult<U> {
        PagedResult {
            items: self.items.into_iter().map(f).collect(),
            total: self.total,
        }
    }
}

impl<T> Default for PagedResult<T> {
    fn default() -> Self {
        Self {
            items: Vec::new(),
            total: 0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_article_new() {
        let article = Article::new(
            "how-to-train-your-dragon".to_string(),
            "How to train your dragon".to_string(),
            "Ever wonder how?".to_string(),
            "You have to believe".to_string(),
            7,
        );

        assert_eq!(article.id, 0);
        assert_eq!(article.author_id, 7);
        assert!(article.is_authored_by(7));
        assert!(!article.is_authored_by(8));
    }

    #[test]
    fn test_list_params_defaults() {
        let params = ListParams::new(None, None);
        assert_eq!(params.limit, 20);
        assert_eq!(params.offset, 0);
    }

    #[test]
    fn test_list_params_clamped() {
        assert_eq!(ListParams::new(Some(0), None).limit, 1);
        assert_eq!(ListParams::new(Some(1000), None).limit, 100);
        assert_eq!(ListParams::new(None, Some(-5)).offset, 0);
    }

    #[test]
    fn test_update_input_has_changes() {
        assert!(!UpdateArticleInput::default().has_changes());

        let input = UpdateArticleInput {
            tag_list: Some(vec![]),
            ..Default::default()
        };
        assert!(input.has_changes());
    }

    #[test]
    fn test_paged_result_map_keeps_total() {
        let result = PagedResult::new(vec![1, 2], 10).map(|n| n * 2);
        assert_eq!(result.items, vec![2, 4]);
        assert_eq!(result.total, 10);
        assert_eq!(result.len(), 2);
    }
}
