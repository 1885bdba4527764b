//! 消息Repository实现

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use domain::{ChatMessage, MessageId, MessageRepository, RepositoryResult, UserId};
use sqlx::FromRow;
use uuid::Uuid;

use crate::db::{map_sqlx_err, DbPool};

/// 数据库消息模型
#[derive(Debug, Clone, FromRow)]
struct DbMessage {
    pub id: Uuid,
    pub text: String,
    pub username: String,
    pub user_id: Uuid,
    pub created_at: DateTime<Utc>,
}

impl From<DbMessage> for ChatMessage {
    fn from(row: DbMessage) -> Self {
        ChatMessage::new(
            MessageId::from(row.id),
            row.text,
            row.username,
            UserId::from(row.user_id),
            row.created_at,
        )
    }
}

/// 消息Repository实现
pub struct PgMessageRepository {
    pool: DbPool,
}

impl PgMessageRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl MessageRepository for PgMessageRepository {
    async fn append(&self, message: ChatMessage) -> RepositoryResult<ChatMessage> {
        let row = sqlx::query_as::<_, DbMessage>(
            r#"
            INSERT INTO messages (id, text, username, user_id, created_at)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id, text, username, user_id, created_at
            "#,
        )
        .bind(Uuid::from(message.id))
        .bind(&message.text)
        .bind(&message.username)
        .bind(Uuid::from(message.user_id))
        .bind(message.created_at)
        .fetch_one(&self.pool)
        .await
        .map_err(map_sqlx_err)?;

        Ok(row.into())
    }

    async fn list_history(&self, limit: u32) -> RepositoryResult<Vec<ChatMessage>> {
        let rows = sqlx::query_as::<_, DbMessage>(
            r#"
            SELECT id, text, username, user_id, created_at
            FROM messages
            ORDER BY created_at ASC, id ASC
            LIMIT $1
            "#,
        )
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await
        .map_err(map_sqlx_err)?;

        Ok(rows.into_iter().map(ChatMessage::from).collect())
    }

    async fn delete_all(&self) -> RepositoryResult<u64> {
        let result = sqlx::query("DELETE FROM messages")
            .execute(&self.pool)
            .await
            .map_err(map_sqlx_err)?;

        Ok(result.rows_affected())
    }

    async fn count(&self) -> RepositoryResult<u64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM messages")
            .fetch_one(&self.pool)
            .await
            .map_err(map_sqlx_err)?;

        Ok(count as u64)
    }
}
