//! Repository traits describing persistence adapters.

use async_trait::async_trait;
use thiserror::Error;
use time::OffsetDateTime;

use crate::application::pagination::PageRequest;
use crate::application::sanitize::SanitizedHtml;
use crate::domain::entities::{CategoryRecord, CategoryWithCounts, PostRecord, UserRecord};
use crate::domain::types::PostStatus;

#[derive(Debug, Error)]
pub enum RepoError {
    #[error("persistence error: {0}")]
    Persistence(String),
    #[error("duplicate record violates unique constraint `{constraint}`")]
    Duplicate { constraint: String },
    #[error("resource not found")]
    NotFound,
    #[error("invalid input: {message}")]
    InvalidInput { message: String },
    #[error("integrity error: {message}")]
    Integrity { message: String },
    #[error("database timeout")]
    Timeout,
}

impl RepoError {
    pub fn from_persistence(err: impl std::fmt::Display) -> Self {
        Self::Persistence(err.to_string())
    }

    /// Whether this is a unique violation on a constraint whose name mentions `column`.
    pub fn is_duplicate_on(&self, column: &str) -> bool {
        matches!(self, RepoError::Duplicate { constraint } if constraint.contains(column))
    }
}

/// Which posts a listing may see.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PostListScope {
    /// Published posts only.
    Public,
    /// Every post, optionally narrowed to one status.
    Admin { status: Option<PostStatus> },
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PostQueryFilter {
    pub category_id: Option<i64>,
    /// Case-insensitive substring match on the title.
    pub search: Option<String>,
}

#[derive(Debug, Clone)]
pub struct CreatePostParams {
    pub title: String,
    pub slug: String,
    pub content: SanitizedHtml,
    pub description: Option<String>,
    pub thumbnail: Option<String>,
    pub status: PostStatus,
    pub category_id: i64,
    pub author_id: i64,
}

/// Full replacement of a post's editable fields. `updated_at` is set by the adapter.
#[derive(Debug, Clone)]
pub struct UpdatePostParams {
    pub id: i64,
    pub title: String,
    pub slug: String,
    pub content: SanitizedHtml,
    pub description: Option<String>,
    pub thumbnail: Option<String>,
    pub status: PostStatus,
    pub category_id: i64,
}

#[derive(Debug, Clone)]
pub struct CreateCategoryParams {
    pub name: String,
    pub slug: String,
    pub description: Option<String>,
}

#[derive(Debug, Clone)]
pub struct UpdateCategoryParams {
    pub id: i64,
    pub name: String,
    pub slug: String,
    pub description: Option<String>,
}

#[derive(Debug, Clone)]
pub struct CreateUserParams {
    pub username: String,
    pub email: String,
    pub password_hash: String,
    pub is_admin: bool,
}

#[async_trait]
pub trait PostsRepo: Send + Sync {
    /// Newest first (`created_at DESC, id DESC`).
    async fn list_posts(
        &self,
        scope: PostListScope,
        filter: &PostQueryFilter,
        page: PageRequest,
    ) -> Result<Vec<PostRecord>, RepoError>;

    async fn count_posts(
        &self,
        scope: PostListScope,
        filter: &PostQueryFilter,
    ) -> Result<u64, RepoError>;

    async fn find_by_id(&self, id: i64) -> Result<Option<PostRecord>, RepoError>;

    async fn find_by_slug(&self, slug: &str) -> Result<Option<PostRecord>, RepoError>;
}

#[async_trait]
pub trait PostsWriteRepo: Send + Sync {
    async fn create_post(&self, params: CreatePostParams) -> Result<PostRecord, RepoError>;

    /// `NotFound` when the post no longer exists.
    async fn update_post(&self, params: UpdatePostParams) -> Result<PostRecord, RepoError>;

    /// `NotFound` when the post no longer exists.
    async fn delete_post(&self, id: i64) -> Result<(), RepoError>;
}

#[async_trait]
pub trait CategoriesRepo: Send + Sync {
    /// Every category ordered by name.
    async fn list_categories(&self) -> Result<Vec<CategoryRecord>, RepoError>;

    /// Every category with its published and total post counts, ordered by name.
    async fn list_with_counts(&self) -> Result<Vec<CategoryWithCounts>, RepoError>;

    /// Categories with at least one published post, ordered by name.
    async fn list_with_published_posts(&self) -> Result<Vec<CategoryRecord>, RepoError>;

    async fn count_categories(&self) -> Result<u64, RepoError>;

    async fn find_by_id(&self, id: i64) -> Result<Option<CategoryRecord>, RepoError>;

    async fn find_by_slug(&self, slug: &str) -> Result<Option<CategoryRecord>, RepoError>;
}

#[async_trait]
pub trait CategoriesWriteRepo: Send + Sync {
    async fn create_category(
        &self,
        params: CreateCategoryParams,
    ) -> Result<CategoryRecord, RepoError>;

    async fn update_category(
        &self,
        params: UpdateCategoryParams,
    ) -> Result<CategoryRecord, RepoError>;

    /// Move every post of `id` to `fallback_id`, then delete `id`, atomically.
    ///
    /// Returns the number of posts moved. `NotFound` when `id` does not exist;
    /// nothing changes on any error.
    async fn delete_category_reassigning(
        &self,
        id: i64,
        fallback_id: i64,
    ) -> Result<u64, RepoError>;
}

#[async_trait]
pub trait UsersRepo: Send + Sync {
    async fn create_user(&self, params: CreateUserParams) -> Result<UserRecord, RepoError>;

    async fn find_by_id(&self, id: i64) -> Result<Option<UserRecord>, RepoError>;

    async fn find_by_email(&self, email: &str) -> Result<Option<UserRecord>, RepoError>;

    async fn touch_last_login(&self, id: i64, at: OffsetDateTime) -> Result<(), RepoError>;
}
