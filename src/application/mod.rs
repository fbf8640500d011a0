//! Services that implement the publishing workflows over repository traits.

pub mod actor;
pub mod categories;
pub mod context;
pub mod error;
pub mod feed;
pub mod pagination;
pub mod posts;
pub mod repos;
pub mod sanitize;
pub mod stats;
pub mod users;
