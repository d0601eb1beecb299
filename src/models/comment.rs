use chrono::{DateTime, SubsecRound, Utc};
use serde::{Deserialize, Serialize};

use super::Profile;

/// Comment entity
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Comment {
    pub id: i64,
    pub body: String,
    pub article_id: i64,
    pub author_id: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Comment {
    pub fn new(body: String, article_id: i64, author_id: i64) -> Self {
        let now = Utc::now().trunc_subsecs(3);
        Self {
            id: 0,
            body,
            article_id,
            author_id,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Comment with its author's profile for display
#[derive(Debug, Clone, PartialEq)]
pub struct CommentWithAuthor {
    pub comment: Comment,
    pub author: Profile,
}

/// Input for creating a comment
#[derive(Debug, Clone, Deserialize)]
pub struct CreateCommentInput {
    pub body: String,
}
