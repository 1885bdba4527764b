//! 用户Repository实现

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use domain::{
    PasswordHash, RepositoryError, RepositoryResult, User, UserId, UserRepository, Username,
};
use sqlx::FromRow;
use uuid::Uuid;

use crate::db::{map_sqlx_err, DbPool};

/// 数据库用户模型
#[derive(Debug, Clone, FromRow)]
struct DbUser {
    pub id: Uuid,
    pub username: String,
    pub password_hash: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl DbUser {
    fn into_user(self) -> RepositoryResult<User> {
        let username = Username::parse(self.username)
            .map_err(|err| RepositoryError::storage(format!("corrupt username row: {err}")))?;
        let password_hash = PasswordHash::new(self.password_hash)
            .map_err(|err| RepositoryError::storage(format!("corrupt password row: {err}")))?;
        Ok(User {
            id: UserId::from(self.id),
            username,
            password_hash,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

/// 用户Repository实现
pub struct PgUserRepository {
    pool: DbPool,
}

impl PgUserRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl UserRepository for PgUserRepository {
    async fn create(&self, user: User) -> RepositoryResult<User> {
        let row = sqlx::query_as::<_, DbUser>(
            r#"
            INSERT INTO users (id, username, password_hash, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id, username, password_hash, created_at, updated_at
            "#,
        )
        .bind(Uuid::from(user.id))
        .bind(user.username.as_str())
        .bind(user.password_hash.as_str())
        .bind(user.created_at)
        .bind(user.updated_at)
        .fetch_one(&self.pool)
        .await
        .map_err(map_sqlx_err)?;

        row.into_user()
    }

    async fn update(&self, user: User) -> RepositoryResult<User> {
        let row = sqlx::query_as::<_, DbUser>(
            r#"
            UPDATE users
            SET username = $2, password_hash = $3, updated_at = $4
            WHERE id = $1
            RETURNING id, username, password_hash, created_at, updated_at
            "#,
        )
        .bind(Uuid::from(user.id))
        .bind(user.username.as_str())
        .bind(user.password_hash.as_str())
        .bind(user.updated_at)
        .fetch_one(&self.pool)
        .await
        .map_err(map_sqlx_err)?;

        row.into_user()
    }

    async fn delete(&self, id: UserId) -> RepositoryResult<()> {
        let result = sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(Uuid::from(id))
            .execute(&self.pool)
            .await
            .map_err(map_sqlx_err)?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }

    async fn find_by_id(&self, id: UserId) -> RepositoryResult<Option<User>> {
        let row = sqlx::query_as::<_, DbUser>(
            r#"
            SELECT id, username, password_hash, created_at, updated_at
            FROM users
            WHERE id = $1
            "#,
        )
        .bind(Uuid::from(id))
        .fetch_optional(&self.pool)
        .await
        .map_err(map_sqlx_err)?;

        row.map(DbUser::into_user).transpose()
    }

    async fn find_by_username(&self, username: &Username) -> RepositoryResult<Option<User>> {
        let row = sqlx::query_as::<_, DbUser>(
            r#"
            SELECT id, username, password_hash, created_at, updated_at
            FROM users
            WHERE username = $1
            "#,
        )
        .bind(username.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(map_sqlx_err)?;

        row.map(DbUser::into_user).transpose()
    }

    async fn count(&self) -> RepositoryResult<u64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM users")
            .fetch_one(&self.pool)
            .await
            .map_err(map_sqlx_err)?;

        Ok(count as u64)
    }
}
