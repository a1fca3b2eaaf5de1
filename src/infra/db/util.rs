use crate::cache::VersionStoreError;

pub fn map_sqlx_error(err: sqlx::Error) -> VersionStoreError {
    match err {
        sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed | sqlx::Error::Io(_) => {
            VersionStoreError::Unavailable(err.to_string())
        }
        sqlx::Error::Database(db)
            if db
                .message()
                .contains("canceling statement due to user request") =>
        {
            VersionStoreError::Unavailable(db.message().to_string())
        }
        other => VersionStoreError::from_persistence(other),
    }
}
