use thiserror::Error;

use crate::{application::repos::RepoError, domain::error::DomainError, infra::error::InfraError};

/// Catch-all error for host-facing operations that do not need a dedicated enum.
#[derive(Debug, Error)]
pub enum AppError {
    #[error(transparent)]
    Domain(#[from] DomainError),
    #[error(transparent)]
    Infra(#[from] InfraError),
    #[error(transparent)]
    Repo(#[from] RepoError),
    #[error("resource not found")]
    NotFound,
    #[error("validation failed: {0}")]
    Validation(String),
    #[error("unexpected error: {0}")]
    Unexpected(String),
}

impl AppError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    pub fn unexpected(message: impl Into<String>) -> Self {
        Self::Unexpected(message.into())
    }

    /// Whether retrying later could succeed (storage trouble rather than bad input).
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            AppError::Infra(InfraError::Database { .. })
                | AppError::Repo(RepoError::Timeout | RepoError::Persistence(_))
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn storage_failures_are_transient() {
        assert!(AppError::from(RepoError::Timeout).is_transient());
        assert!(AppError::from(InfraError::database("down")).is_transient());
        assert!(!AppError::NotFound.is_transient());
        assert!(!AppError::from(DomainError::validation("bad")).is_transient());
    }
}
