use async_trait::async_trait;

use crate::errors::RepositoryResult;
use crate::message::ChatMessage;
use crate::user::User;
use crate::value_objects::{UserId, Username};

#[async_trait]
pub trait UserRepository: Send + Sync {
    async fn create(&self, user: User) -> RepositoryResult<User>;
    async fn update(&self, user: User) -> RepositoryResult<User>;
    async fn delete(&self, id: UserId) -> RepositoryResult<()>;
    async fn find_by_id(&self, id: UserId) -> RepositoryResult<Option<User>>;
    async fn find_by_username(&self, username: &Username) -> RepositoryResult<Option<User>>;
    async fn count(&self) -> RepositoryResult<u64>;
}

/// 消息存储接口：只追加，按创建时间升序查询，支持整体清空。
#[async_trait]
pub trait MessageRepository: Send + Sync {
    async fn append(&self, message: ChatMessage) -> RepositoryResult<ChatMessage>;
    /// 按创建时间升序返回最早的 `limit` 条消息
    async fn list_history(&self, limit: u32) -> RepositoryResult<Vec<ChatMessage>>;
    async fn delete_all(&self) -> RepositoryResult<u64>;
    async fn count(&self) -> RepositoryResult<u64>;
}
