use std::sync::Arc;

use serde::Serialize;

use domain::{MessageRepository, UserRepository};

use crate::error::ApplicationError;

/// 只读统计快照：注册用户总数与消息总数
#[derive(Debug, Clone, Serialize)]
pub struct StatsSnapshot {
    pub users: u64,
    pub chats: u64,
}

pub struct StatsService {
    users: Arc<dyn UserRepository>,
    messages: Arc<dyn MessageRepository>,
}

impl StatsService {
    pub fn new(users: Arc<dyn UserRepository>, messages: Arc<dyn MessageRepository>) -> Self {
        Self { users, messages }
    }

    pub async fn overview(&self) -> Result<StatsSnapshot, ApplicationError> {
        let users = self.users.count().await?;
        let chats = self.messages.count().await?;
        Ok(StatsSnapshot { users, chats })
    }
}
