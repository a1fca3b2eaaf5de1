use async_trait::async_trait;
use sqlx::query_scalar;

use super::{PostgresRepositories, map_sqlx_error};
use crate::cache::{INITIAL_VERSION, VersionStore, VersionStoreError};

#[async_trait]
impl VersionStore for PostgresRepositories {
    async fn version(&self, prefix: &str) -> Result<i64, VersionStoreError> {
        let version: Option<i64> =
            query_scalar("SELECT version FROM cache_versions WHERE prefix = $1")
                .bind(prefix)
                .fetch_optional(self.pool())
                .await
                .map_err(map_sqlx_error)?;
        Ok(version.unwrap_or(INITIAL_VERSION))
    }

    async fn bump(&self, prefix: &str) -> Result<i64, VersionStoreError> {
        query_scalar(
            r#"
            INSERT INTO cache_versions (prefix, version, updated_at)
            VALUES ($1, $2, now())
            ON CONFLICT (prefix) DO UPDATE
            SET version = cache_versions.version + 1,
                updated_at = now()
            RETURNING version
            "#,
        )
        .bind(prefix)
        .bind(INITIAL_VERSION + 1)
        .fetch_one(self.pool())
        .await
        .map_err(map_sqlx_error)
    }
}
