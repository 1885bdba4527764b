//! Database utilities and repositories (Core DB Layer)

use sqlx::{Pool, Postgres};

pub mod repositories;

pub type DbPool = Pool<Postgres>;

pub async fn create_pool(database_url: &str, max_size: u32) -> Result<DbPool, sqlx::Error> {
    sqlx::postgres::PgPoolOptions::new()
        .max_connections(max_size)
        .connect(database_url)
        .await
}

/// 映射SQL错误到仓储错误
pub(crate) fn map_sqlx_err(err: sqlx::Error) -> domain::RepositoryError {
    match err {
        sqlx::Error::RowNotFound => domain::RepositoryError::NotFound,
        sqlx::Error::Database(ref db_err) if db_err.code().is_some_and(|code| code == "23505") => {
            domain::RepositoryError::Conflict
        }
        other => {
            let message = other.to_string();
            domain::RepositoryError::storage_with_source(message, other)
        }
    }
}
