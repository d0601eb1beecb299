//! Profile service
//!
//! Public profiles and the follow relation between users.

use crate::db::repositories::{FollowRepository, UserRepository};
use crate::models::{Profile, User};
use anyhow::Context;
use std::sync::Arc;

#[derive(Debug, thiserror::Error)]
pub enum ProfileServiceError {
    #[error("Profile not found: {0}")]
    NotFound(String),

    #[error("You cannot follow yourself")]
    CannotFollowSelf,

    #[error("Internal error: {0}")]
    InternalError(#[from] anyhow::Error),
}

pub struct ProfileService {
    user_repo: Arc<dyn UserRepository>,
    follow_repo: Arc<dyn FollowRepository>,
}

impl ProfileService {
    pub fn new(user_repo: Arc<dyn UserRepository>, follow_repo: Arc<dyn FollowRepository>) -> Self {
        Self {
            user_repo,
            follow_repo,
        }
    }

    /// Build the profile of `user` as seen by `viewer_id`
    pub async fn profile_of(
        &self,
        user: &User,
        viewer_id: Option<i64>,
    ) -> Result<Profile, ProfileServiceError> {
        let following = match viewer_id {
            Some(viewer) if viewer != user.id => self
                .follow_repo
                .is_following(viewer, user.id)
                .await
                .context("Failed to check follow relation")?,
            _ => false,
        };
        Ok(Profile::from_user(user, following))
    }

    /// Get a profile by username
    pub async fn get(
        &self,
        username: &str,
        viewer_id: Option<i64>,
    ) -> Result<Profile, ProfileServiceError> {
        let user = self.find(username).await?;
        self.profile_of(&user, viewer_id).await
    }

    /// Follow a user. Following twice is a no-op.
    pub async fn follow(&self, follower_id: i64, username: &str) -> Result<Profile, ProfileServiceError> {
        let followee = self.find(username).await?;
        if followee.id == follower_id {
            return Err(ProfileServiceError::CannotFollowSelf);
        }

        self.follow_repo
            .follow(follower_id, followee.id)
            .await
            .context("Failed to follow user")?;

        tracing::info!(follower_id, followee_id = followee.id, "User followed");
        Ok(Profile::from_user(&followee, true))
    }

    /// Unfollow a user. Not following is a no-op.
    pub async fn unfollow(&self, follower_id: i64, username: &str) -> Result<Profile, ProfileServiceError> {
        let followee = self.find(username).await?;

        self.follow_repo
            .unfollow(follower_id, followee.id)
            .await
            .context("Failed to unfollow user")?;

        tracing::info!(follower_id, followee_id = followee.id, "User unfollowed");
        Ok(Profile::from_user(&followee, false))
    }

    async fn find(&self, username: &str) -> Result<User, ProfileServiceError> {
        self.user_repo
            .get_by_username(username)
            .await
            .context("Failed to get user by username")?
            .ok_or_else(|| ProfileServiceError::NotFound(username.to_string()))
    }
}
