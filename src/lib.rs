//! Publishing core for a small blog CMS.
//!
//! Authors submit posts through [`application::posts::PostPublisher`], which
//! validates and sanitises them, files them under a category from
//! [`application::categories::CategoryDirectory`] and invalidates the cached
//! views kept by [`cache::CacheLayer`]. Storage sits behind the traits in
//! [`application::repos`]; [`infra::db::PostgresRepositories`] implements them
//! for Postgres.

pub mod application;
pub mod cache;
pub mod config;
pub mod domain;
pub mod infra;
pub mod util;
