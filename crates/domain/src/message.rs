use crate::value_objects::{MessageId, Timestamp, UserId};

/// 一条已持久化的聊天消息。
///
/// `username` 是创建时刻抓取的冗余副本：用户之后改名不会改写历史消息，
/// 这是有意保留的不变量。正文允许为空字符串，但永远不为 null。
/// 消息创建后不可变，只能被批量清空操作整体删除。
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct ChatMessage {
    pub id: MessageId,
    pub text: String,
    pub username: String,
    pub user_id: UserId,
    pub created_at: Timestamp,
}

impl ChatMessage {
    pub fn new(
        id: MessageId,
        text: String,
        username: String,
        user_id: UserId,
        created_at: Timestamp,
    ) -> Self {
        Self {
            id,
            text,
            username,
            user_id,
            created_at,
        }
    }
}
