//! Profile model
//!
//! The public view of a user, as seen by the (possibly anonymous) viewer.

use serde::{Deserialize, Serialize};

use super::User;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Profile {
    pub username: String,
    pub bio: Option<String>,
    pub image: Option<String>,
    /// Whether the viewer follows this user. Always false for anonymous viewers.
    pub following: bool,
}

impl Profile {
    pub fn from_user(user: &User, following: bool) -> Self {
        Self {
            username: user.username.clone(),
            bio: user.bio.clone(),
            image: user.image.clone(),
            following,
        }
    }
}

/// A follow relation between two users
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Follow {
    pub follower_id: i64,
    pub followee_id: i64,
}
