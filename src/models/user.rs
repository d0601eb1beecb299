//! User model
//!
//! A registered account. The JWT handed to clients is derived from the user
//! on every response and never persisted.

use chrono::{DateTime, SubsecRound, Utc};
use serde::{Deserialize, Serialize};

/// User entity representing a registered user in the system.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    /// Unique identifier
    pub id: i64,
    /// Username (unique)
    pub username: String,
    /// Email address (unique)
    pub email: String,
    /// Password hash (argon2)
    #[serde(skip_serializing)]
    pub password_hash: String,
    /// Short biography
    pub bio: Option<String>,
    /// Avatar URL
    pub image: Option<String>,
    /// Creation timestamp
    pub created_at: DateTime<Utc>,
    /// Last update timestamp
    pub updated_at: DateTime<Utc>,
}

impl User {
    /// Create a new User with the given parameters.
    ///
    /// The password should already be hashed with
    /// `services::password::hash_password()`.
    pub fn new(username: String, email: String, password_hash: String) -> Self {
        let now = Utc::now().trunc_subsecs(3);
        Self {
            id: 0, // Will be set by the database
            username,
            email,
            password_hash,
            bio: None,
            image: None,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Input for updating the current user
///
/// Every field is optional. A blank password keeps the old one; an empty
/// `bio` or `image` clears the stored value.
#[derive(Debug, Clone, Default)]
pub struct UpdateUserInput {
    pub email: Option<String>,
    pub username: Option<String>,
    pub password: Option<String>,
    pub bio: Option<String>,
    pub image: Option<String>,
}

impl UpdateUserInput {
    /// Check if any field is set
    pub fn has_changes(&self) -> bool {
        self.email.is_some()
            || self.username.is_some()
            || self.password.is_some()
            || self.bio.is_some()
            || self.image.is_some()
    }
}
