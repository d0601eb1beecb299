//! Database repositories
//!
//! Repository pattern implementations for database access.
//! Each repository handles the queries for one entity or relation.

pub mod article;
pub mod comment;
pub mod favorite;
pub mod follow;
pub mod tag;
pub mod user;

pub use article::{ArticleRepository, SqlxArticleRepository};
pub use comment::{CommentRepository, SqlxCommentRepository};
pub use favorite::{FavoriteRepository, SqlxFavoriteRepository};
pub use follow::{FollowRepository, SqlxFollowRepository};
pub use tag::{SqlxTagRepository, TagRepository};
pub use user::{SqlxUserRepository, UserRepository};

/// A write was rejected by a UNIQUE constraint
#[derive(Debug, thiserror::Error)]
#[error("{table}.{column} is already taken")]
pub struct UniqueViolation {
    pub table: String,
    pub column: String,
}

impl UniqueViolation {
    /// The unique violation somewhere in `error`'s chain, if any
    pub fn find(error: &anyhow::Error) -> Option<&UniqueViolation> {
        error.chain().find_map(|e| e.downcast_ref::<UniqueViolation>())
    }
}

/// Turn a SQLite UNIQUE failure into a `UniqueViolation`; other errors pass through
pub(crate) fn unique_violation(error: sqlx::Error) -> anyhow::Error {
    if let sqlx::Error::Database(db) = &error {
        if db.is_unique_violation() {
            // "UNIQUE constraint failed: users.email"
            let columns = db.message().rsplit(": ").next().unwrap_or_default();
            if let Some((table, column)) = columns.split(", ").next().and_then(|c| c.split_once('.')) {
                return UniqueViolation {
                    table: table.to_string(),
                    column: column.to_string(),
                }
                .into();
            }
        }
    }
    error.into()
}
