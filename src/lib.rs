//! Conduit - RealWorld social blogging platform
//!
//! This library provides the HTTP backend (users, profiles, articles,
//! comments, tags) and a typed client with a query cache.

pub mod api;
pub mod cache;
pub mod client;
pub mod config;
pub mod db;
pub mod models;
pub mod services;
