//! User service
//!
//! Implements business logic for accounts:
//! - Registration with unique username and email
//! - Login by email and password
//! - Loading and updating the current user

use crate::db::repositories::{UniqueViolation, UserRepository};
use crate::models::{UpdateUserInput, User};
use crate::services::password::{hash_password_async, verify_password_async};
use crate::services::validation::{self, Invalid};
use anyhow::Context;
use std::sync::Arc;

/// Error types for user service operations
#[derive(Debug, thiserror::Error)]
pub enum UserServiceError {
    /// Login failed; never says which of email or password was wrong
    #[error("email or password is invalid")]
    InvalidCredentials,

    /// Validation error (invalid input)
    #[error("{field} {message}")]
    ValidationError {
        field: &'static str,
        message: &'static str,
    },

    /// Username or email already used by another account
    #[error("{0} has already been taken")]
    Taken(&'static str),

    /// User not found
    #[error("User not found")]
    NotFound,

    /// Internal error
    #[error("Internal error: {0}")]
    InternalError(#[from] anyhow::Error),
}

impl From<Invalid> for UserServiceError {
    fn from(e: Invalid) -> Self {
        UserServiceError::ValidationError {
            field: e.field,
            message: e.message,
        }
    }
}

/// Input for user registration
#[derive(Debug, Clone)]
pub struct RegisterInput {
    pub username: String,
    pub email: String,
    pub password: String,
}

impl RegisterInput {
    pub fn new(username: impl Into<String>, email: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            email: email.into(),
            password: password.into(),
        }
    }
}

/// Input for user login
#[derive(Debug, Clone)]
pub struct LoginInput {
    pub email: String,
    pub password: String,
}

impl LoginInput {
    pub fn new(email: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            password: password.into(),
        }
    }
}

/// User service for managing accounts and credentials
pub struct UserService {
    user_repo: Arc<dyn UserRepository>,
}

impl UserService {
    /// Create a new user service with the given repository
    pub fn new(user_repo: Arc<dyn UserRepository>) -> Self {
        Self { user_repo }
    }

    /// Register a new user
    ///
    /// # Errors
    ///
    /// - `ValidationError` if a field is blank or the email is malformed
    /// - `Taken` if the email or username is already used
    /// - `InternalError` for database errors
    pub async fn register(&self, input: RegisterInput) -> Result<User, UserServiceError> {
        let username = input.username.trim().to_string();
        let email = input.email.trim().to_string();

        validation::require("username", &username)?;
        validation::email(&email)?;
        validation::require("password", &input.password)?;

        if self
            .user_repo
            .get_by_email(&email)
            .await
            .context("Failed to check email")?
            .is_some()
        {
            return Err(UserServiceError::Taken("email"));
        }

        if self
            .user_repo
            .get_by_username(&username)
            .await
            .context("Failed to check username")?
            .is_some()
        {
            return Err(UserServiceError::Taken("username"));
        }

        let password_hash = hash_password_async(input.password).await?;
        let user = User::new(username, email, password_hash);

        // A concurrent registration can still win between the checks and the insert
        let created = self
            .user_repo
            .create(&user)
            .await
            .map_err(|e| taken_or_internal(e, "Failed to create user"))?;

        tracing::info!(user_id = created.id, username = %created.username, "User registered");
        Ok(created)
    }

    /// Login with email and password
    ///
    /// Unknown email and wrong password produce the same error.
    pub async fn login(&self, input: LoginInput) -> Result<User, UserServiceError> {
        let email = input.email.trim();
        validation::require("email", email)?;
        validation::require("password", &input.password)?;

        let user = self
            .user_repo
            .get_by_email(email)
            .await
            .context("Failed to look up user")?
            .ok_or(UserServiceError::InvalidCredentials)?;

        let valid = verify_password_async(input.password, user.password_hash.clone()).await?;
        if !valid {
            tracing::debug!(user_id = user.id, "Login rejected: wrong password");
            return Err(UserServiceError::InvalidCredentials);
        }

        Ok(user)
    }

    /// Get user by ID
    pub async fn get_by_id(&self, id: i64) -> Result<Option<User>, UserServiceError> {
        let user = self
            .user_repo
            .get_by_id(id)
            .await
            .context("Failed to get user by ID")?;
        Ok(user)
    }

    /// Get user by username
    pub async fn get_by_username(&self, username: &str) -> Result<Option<User>, UserServiceError> {
        let user = self
            .user_repo
            .get_by_username(username)
            .await
            .context("Failed to get user by username")?;
        Ok(user)
    }

    /// Update the user with the given ID
    ///
    /// A blank password keeps the current hash. An empty `bio` or `image`
    /// is stored as null. Changing email or username to one held by another
    /// account fails with `Taken`.
    pub async fn update(&self, id: i64, input: UpdateUserInput) -> Result<User, UserServiceError> {
        let mut user = self
            .get_by_id(id)
            .await?
            .ok_or(UserServiceError::NotFound)?;

        if let Some(email) = input.email {
            let email = email.trim().to_string();
            validation::email(&email)?;
            if email != user.email {
                if let Some(other) = self
                    .user_repo
                    .get_by_email(&email)
                    .await
                    .context("Failed to check email")?
                {
                    if other.id != user.id {
                        return Err(UserServiceError::Taken("email"));
                    }
                }
                user.email = email;
            }
        }

        if let Some(username) = input.username {
            let username = username.trim().to_string();
            validation::require("username", &username)?;
            if username != user.username {
                if let Some(other) = self
                    .user_repo
                    .get_by_username(&username)
                    .await
                    .context("Failed to check username")?
                {
                    if other.id != user.id {
                        return Err(UserServiceError::Taken("username"));
                    }
                }
                user.username = username;
            }
        }

        if let Some(password) = input.password {
            if !password.trim().is_empty() {
                user.password_hash = hash_password_async(password).await?;
            }
        }

        if let Some(bio) = input.bio {
            user.bio = non_empty(bio);
        }
        if let Some(image) = input.image {
            user.image = non_empty(image);
        }

        let updated = self
            .user_repo
            .update(&user)
            .await
            .map_err(|e| taken_or_internal(e, "Failed to update user"))?;

        tracing::debug!(user_id = updated.id, "User updated");
        Ok(updated)
    }
}

/// Map a UNIQUE failure on email or username to `Taken`
fn taken_or_internal(error: anyhow::Error, context: &'static str) -> UserServiceError {
    let field = match UniqueViolation::find(&error).map(|v| v.column.as_str()) {
        Some("email") => Some("email"),
        Some("username") => Some("username"),
        _ => None,
    };
    match field {
        Some(field) => UserServiceError::Taken(field),
        None => UserServiceError::InternalError(error.context(context)),
    }
}

fn non_empty(value: String) -> Option<String> {
    if value.trim().is_empty() {
        None
    } else {
        Some(value)
    }
}
