//! Connecting the Postgres adapter from loaded settings.

use tracing::info;

use crate::config::Settings;
use crate::infra::db::PostgresRepositories;
use crate::infra::error::InfraError;

/// Open the pool described by `[database]` and bring the schema up to date.
pub async fn connect(settings: &Settings) -> Result<PostgresRepositories, InfraError> {
    let url = settings.database.url.as_deref().ok_or_else(|| {
        InfraError::configuration("database.url is not set (QUIRE__DATABASE__URL)")
    })?;

    let pool =
        PostgresRepositories::connect(url, settings.database.max_connections.get()).await?;
    PostgresRepositories::run_migrations(&pool).await?;
    info!(
        max_connections = settings.database.max_connections.get(),
        "database connected and migrated"
    );

    Ok(PostgresRepositories::new(pool))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn missing_url_is_a_configuration_error() {
        let settings = Settings::default();
        let err = connect(&settings).await.err().expect("no url configured");
        assert!(matches!(err, InfraError::Configuration { .. }));
    }
}
