//! Database layer
//!
//! Conduit stores its data in SQLite. This module provides the connection
//! pool, the embedded migrations and one repository per entity.
//!
//! # Usage
//!
//! ```ignore
//! use conduit::config::DatabaseConfig;
//! use conduit::db::{create_pool, migrations};
//!
//! let pool = create_pool(&DatabaseConfig::default()).await?;
//! migrations::run_migrations(&pool).await?;
//! pool.ping().await?;
//! ```

pub mod migrations;
pub mod pool;
pub mod repositories;

pub use pool::{create_pool, create_test_pool, DatabasePool, DynDatabasePool, SqliteDatabase};
