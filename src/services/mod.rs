//! Services layer - Business logic
//!
//! Services sit between the HTTP handlers and the repositories. They:
//! - Validate input and enforce ownership rules
//! - Decorate entities for the viewing user
//! - Keep the tag cache consistent with article writes

pub mod article;
pub mod comment;
pub mod password;
pub mod profile;
pub mod tag;
pub mod token;
pub mod user;
pub mod validation;

pub use article::{base_slug, ArticleService, ArticleServiceError};
pub use comment::{CommentService, CommentServiceError};
pub use password::{hash_password, verify_password};
pub use profile::{ProfileService, ProfileServiceError};
pub use tag::{TagService, TagServiceError};
pub use token::{parse_authorization, Claims, TokenError, TokenService};
pub use user::{LoginInput, RegisterInput, UserService, UserServiceError};
