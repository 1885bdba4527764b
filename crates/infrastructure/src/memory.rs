//! 内存实现的仓储（用于测试和无数据库环境）

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use tokio::sync::RwLock;
use uuid::Uuid;

use domain::{
    ChatMessage, MessageRepository, RepositoryError, RepositoryResult, User, UserId,
    UserRepository, Username,
};

#[derive(Default)]
pub struct MemoryUserRepository {
    users: RwLock<HashMap<Uuid, User>>,
}

impl MemoryUserRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// 直接放入一个用户，绕过唯一性检查（测试装配用）
    pub async fn seed(&self, user: User) {
        self.users.write().await.insert(user.id.into(), user);
    }
}

#[async_trait]
impl UserRepository for MemoryUserRepository {
    async fn create(&self, user: User) -> RepositoryResult<User> {
        let mut users = self.users.write().await;
        if users.values().any(|u| u.username == user.username) {
            return Err(RepositoryError::Conflict);
        }
        users.insert(user.id.into(), user.clone());
        Ok(user)
    }

    async fn update(&self, user: User) -> RepositoryResult<User> {
        let mut users = self.users.write().await;
        let id: Uuid = user.id.into();
        if !users.contains_key(&id) {
            return Err(RepositoryError::NotFound);
        }
        if users
            .iter()
            .any(|(other_id, u)| *other_id != id && u.username == user.username)
        {
            return Err(RepositoryError::Conflict);
        }
        users.insert(id, user.clone());
        Ok(user)
    }

    async fn delete(&self, id: UserId) -> RepositoryResult<()> {
        self.users
            .write()
            .await
            .remove(&id.into())
            .map(|_| ())
            .ok_or(RepositoryError::NotFound)
    }

    async fn find_by_id(&self, id: UserId) -> RepositoryResult<Option<User>> {
        Ok(self.users.read().await.get(&id.into()).cloned())
    }

    async fn find_by_username(&self, username: &Username) -> RepositoryResult<Option<User>> {
        Ok(self
            .users
            .read()
            .await
            .values()
            .find(|u| u.username == *username)
            .cloned())
    }

    async fn count(&self) -> RepositoryResult<u64> {
        Ok(self.users.read().await.len() as u64)
    }
}

#[derive(Default)]
pub struct MemoryMessageRepository {
    messages: RwLock<Vec<ChatMessage>>,
    /// 置位后所有写入/查询都返回存储错误，用于演练故障路径
    failing: AtomicBool,
}

impl MemoryMessageRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    fn check_available(&self) -> RepositoryResult<()> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(RepositoryError::storage("message store unavailable"));
        }
        Ok(())
    }
}

#[async_trait]
impl MessageRepository for MemoryMessageRepository {
    async fn append(&self, message: ChatMessage) -> RepositoryResult<ChatMessage> {
        self.check_available()?;
        self.messages.write().await.push(message.clone());
        Ok(message)
    }

    async fn list_history(&self, limit: u32) -> RepositoryResult<Vec<ChatMessage>> {
        self.check_available()?;
        let messages = self.messages.read().await;
        let mut ordered: Vec<ChatMessage> = messages.clone();
        ordered.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        ordered.truncate(limit as usize);
        Ok(ordered)
    }

    async fn delete_all(&self) -> RepositoryResult<u64> {
        self.check_available()?;
        let mut messages = self.messages.write().await;
        let deleted = messages.len() as u64;
        messages.clear();
        Ok(deleted)
    }

    async fn count(&self) -> RepositoryResult<u64> {
        self.check_available()?;
        Ok(self.messages.read().await.len() as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use domain::MessageId;

    fn message(text: &str) -> ChatMessage {
        ChatMessage::new(
            MessageId::from(Uuid::new_v4()),
            text.to_string(),
            "alice".to_string(),
            UserId::from(Uuid::new_v4()),
            Utc::now(),
        )
    }

    #[tokio::test]
    async fn history_is_oldest_first_and_limited() {
        let repo = MemoryMessageRepository::new();
        for i in 0..5 {
            repo.append(message(&format!("msg-{i}"))).await.unwrap();
        }

        let history = repo.list_history(3).await.unwrap();
        assert_eq!(history.len(), 3);
        assert_eq!(history[0].text, "msg-0");
        assert_eq!(history[2].text, "msg-2");
    }

    #[tokio::test]
    async fn failing_mode_surfaces_storage_errors() {
        let repo = MemoryMessageRepository::new();
        repo.set_failing(true);

        assert!(repo.append(message("boom")).await.is_err());
        assert!(repo.list_history(10).await.is_err());

        repo.set_failing(false);
        assert_eq!(repo.count().await.unwrap(), 0);
    }
}
