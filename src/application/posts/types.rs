use serde::Serialize;
use thiserror::Error;

use crate::application::categories::CategoryError;
use crate::application::repos::RepoError;
use crate::domain::types::PostStatus;
use crate::domain::validation::FieldErrors;

pub const DUPLICATE_SLUG_MESSAGE: &str =
    "This slug is already in use. Please choose a different one.";
pub const INVALID_CATEGORY_MESSAGE: &str = "Select a valid choice.";

#[derive(Debug, Error)]
pub enum PublishError {
    #[error("post validation failed: {0}")]
    Validation(FieldErrors),
    #[error("slug `{slug}` is already used by another post")]
    DuplicateSlug { slug: String },
    #[error("you do not have permission to modify this post")]
    Forbidden,
    #[error("post not found")]
    NotFound,
    #[error(transparent)]
    Repo(#[from] RepoError),
}

impl PublishError {
    /// Per-field messages for form redisplay, when the failure is field-specific.
    pub fn field_errors(&self) -> Option<FieldErrors> {
        match self {
            PublishError::Validation(errors) => Some(errors.clone()),
            PublishError::DuplicateSlug { .. } => {
                Some(FieldErrors::single("slug", DUPLICATE_SLUG_MESSAGE))
            }
            _ => None,
        }
    }
}

impl From<CategoryError> for PublishError {
    fn from(err: CategoryError) -> Self {
        match err {
            CategoryError::Repo(err) => PublishError::Repo(err),
            CategoryError::Validation(errors) => PublishError::Validation(errors),
            CategoryError::NotFound => PublishError::Validation(FieldErrors::single(
                "category_id",
                INVALID_CATEGORY_MESSAGE,
            )),
            other => PublishError::Repo(RepoError::Integrity {
                message: other.to_string(),
            }),
        }
    }
}

/// What a successful submission produced.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PublishOutcome {
    pub post_id: i64,
    pub slug: String,
    pub status: PostStatus,
}

/// Narrowing for the admin post listing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AdminPostFilter {
    pub status: Option<PostStatus>,
    pub search: Option<String>,
}
