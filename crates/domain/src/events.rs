//! 客户端与服务端之间的实时事件协议。

use serde::{Deserialize, Serialize};

use crate::message::ChatMessage;

/// 客户端发来的事件
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ClientEvent {
    /// 发送消息。正文缺失时视为空字符串
    #[serde(rename = "message")]
    Message {
        #[serde(default)]
        text: String,
    },
    /// 按需拉取历史消息
    #[serde(rename = "get:history")]
    GetHistory {
        #[serde(default)]
        limit: Option<i64>,
    },
    /// 输入状态上报
    #[serde(rename = "typing")]
    Typing { typing: bool },
}

/// 服务端推送的事件
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ServerEvent {
    /// 用户上线（该用户的第一个会话）
    #[serde(rename = "user:join")]
    UserJoin { username: String },
    /// 用户离线（该用户的最后一个会话）
    #[serde(rename = "user:left")]
    UserLeft { username: String },
    /// 在线用户全量快照
    #[serde(rename = "online:update")]
    OnlineUpdate { users: Vec<String> },
    /// 新消息，推送给包括发送者在内的所有会话
    #[serde(rename = "message")]
    Message(ChatMessage),
    /// 消息持久化失败，仅发给发送者
    #[serde(rename = "message:error")]
    MessageError { message: String },
    /// 历史消息应答，仅发给请求者
    #[serde(rename = "chat:history")]
    ChatHistory { messages: Vec<ChatMessage> },
    /// 输入状态转发
    #[serde(rename = "user:typing")]
    UserTyping { username: String, typing: bool },
    /// 历史记录已被清空
    #[serde(rename = "history:deleted")]
    HistoryDeleted,
}
