use crate::application::repos::RepoError;

/// Postgres SQLSTATE for `unique_violation`.
const UNIQUE_VIOLATION: &str = "23505";
/// Postgres SQLSTATE for `query_canceled` (raised by `statement_timeout`).
const QUERY_CANCELED: &str = "57014";

pub fn map_sqlx_error(err: sqlx::Error) -> RepoError {
    match err {
        sqlx::Error::RowNotFound => RepoError::NotFound,
        sqlx::Error::PoolTimedOut => RepoError::Timeout,
        sqlx::Error::Database(db) => {
            let code = db.code();
            match code.as_deref() {
                Some(UNIQUE_VIOLATION) => RepoError::Duplicate {
                    constraint: db.constraint().unwrap_or("unknown").to_string(),
                },
                Some(QUERY_CANCELED) => RepoError::Timeout,
                _ if db.is_foreign_key_violation() => RepoError::InvalidInput {
                    message: db.message().to_string(),
                },
                _ if db.message().contains("invalid input syntax") => RepoError::InvalidInput {
                    message: db.message().to_string(),
                },
                _ if db.message().contains("violates") => RepoError::Integrity {
                    message: db.message().to_string(),
                },
                _ => RepoError::from_persistence(db.message()),
            }
        }
        other => RepoError::from_persistence(other),
    }
}
