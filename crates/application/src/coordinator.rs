//! 广播协调器。
//!
//! 每条连接的生命周期：认证通过后注册会话，之后路由入站事件
//! （消息 → 持久化后全员广播；历史请求 → 仅回复请求者；
//! 输入状态 → 转发给除发送者外的所有会话），断开时做完整清理。
//! 持久化和存储查询都带超时上限，超时按对应操作的失败处理。

use std::sync::Arc;
use std::time::Duration;

use tokio::time::timeout;
use uuid::Uuid;

use domain::{ChatMessage, MessageId, MessageRepository, ServerEvent, Session, SessionId};

use crate::clock::Clock;
use crate::error::ApplicationError;
use crate::identity::Identity;
use crate::registry::{DeliveryScope, Mailbox, SessionRegistry};

/// 历史查询未指定或非正数时的默认条数
pub const HISTORY_DEFAULT_LIMIT: u32 = 50;
/// 历史查询允许的最大条数
pub const HISTORY_MAX_LIMIT: u32 = 200;

pub struct ChatCoordinator {
    registry: Arc<SessionRegistry>,
    messages: Arc<dyn MessageRepository>,
    clock: Arc<dyn Clock>,
    /// 存储调用的超时上限
    op_timeout: Duration,
}

impl ChatCoordinator {
    pub fn new(
        registry: Arc<SessionRegistry>,
        messages: Arc<dyn MessageRepository>,
        clock: Arc<dyn Clock>,
        op_timeout: Duration,
    ) -> Self {
        Self {
            registry,
            messages,
            clock,
            op_timeout,
        }
    }

    pub fn registry(&self) -> &Arc<SessionRegistry> {
        &self.registry
    }

    /// 认证成功的连接进入注册表。该用户名首次上线时广播 `user:join`，
    /// 任何连接建立后都广播一次在线快照。
    pub async fn connect(&self, identity: Identity, mailbox: Mailbox) -> SessionId {
        let session = Session::new(identity.user_id, identity.username);
        let session_id = session.id;
        let username = session.username.clone();

        let registration = self.registry.register(session, mailbox).await;

        if registration.first_for_user {
            self.fan_out(
                ServerEvent::UserJoin {
                    username: username.clone(),
                },
                DeliveryScope::All,
            )
            .await;
        }
        self.fan_out(
            ServerEvent::OnlineUpdate {
                users: registration.online,
            },
            DeliveryScope::All,
        )
        .await;

        tracing::info!(session_id = %session_id, username = %username, "会话已注册");
        session_id
    }

    /// 断开清理。幂等：会话已注销时直接返回。
    /// 最后一个会话离线时广播 `user:left`；无论如何都补发一次
    /// `typing: false`，覆盖用户在输入途中断开的情况。
    pub async fn disconnect(&self, session_id: SessionId) {
        let Some(departure) = self.registry.deregister(session_id).await else {
            return;
        };

        if departure.last_for_user {
            self.fan_out(
                ServerEvent::UserLeft {
                    username: departure.username.clone(),
                },
                DeliveryScope::All,
            )
            .await;
        }
        self.fan_out(
            ServerEvent::OnlineUpdate {
                users: departure.online,
            },
            DeliveryScope::All,
        )
        .await;
        self.fan_out(
            ServerEvent::UserTyping {
                username: departure.username.clone(),
                typing: false,
            },
            DeliveryScope::All,
        )
        .await;

        tracing::info!(session_id = %session_id, username = %departure.username, "会话已注销");
    }

    /// 发消息：作者信息取自会话身份，绝不信任客户端自报的作者字段。
    /// 持久化成功后才广播给所有会话（包括发送者）；
    /// 失败只通知发送者，不广播、不留下部分状态。
    pub async fn post_message(&self, session_id: SessionId, text: String) {
        let Some((user_id, username)) = self.registry.session_identity(session_id).await else {
            tracing::warn!(session_id = %session_id, "未注册会话发来消息");
            return;
        };

        let message = ChatMessage::new(
            MessageId::new(Uuid::new_v4()),
            text,
            username,
            user_id,
            self.clock.now(),
        );

        match timeout(self.op_timeout, self.messages.append(message)).await {
            Ok(Ok(saved)) => {
                self.fan_out(ServerEvent::Message(saved), DeliveryScope::All)
                    .await;
            }
            Ok(Err(err)) => {
                tracing::warn!(session_id = %session_id, error = %err, "消息持久化失败");
                self.fan_out(
                    ServerEvent::MessageError {
                        message: "Failed to save message".to_string(),
                    },
                    DeliveryScope::Only(session_id),
                )
                .await;
            }
            Err(_) => {
                tracing::warn!(session_id = %session_id, "消息持久化超时");
                self.fan_out(
                    ServerEvent::MessageError {
                        message: "Failed to save message".to_string(),
                    },
                    DeliveryScope::Only(session_id),
                )
                .await;
            }
        }
    }

    /// 历史查询：限额收敛到 [1, 200]，未指定或非正数取 50。
    /// 查询失败降级为空结果，只回复请求者，从不广播。
    pub async fn request_history(&self, session_id: SessionId, limit: Option<i64>) {
        let limit = clamp_history_limit(limit);

        let messages = match timeout(self.op_timeout, self.messages.list_history(limit)).await {
            Ok(Ok(messages)) => messages,
            Ok(Err(err)) => {
                tracing::warn!(session_id = %session_id, error = %err, "历史查询失败，返回空结果");
                Vec::new()
            }
            Err(_) => {
                tracing::warn!(session_id = %session_id, "历史查询超时，返回空结果");
                Vec::new()
            }
        };

        self.fan_out(
            ServerEvent::ChatHistory { messages },
            DeliveryScope::Only(session_id),
        )
        .await;
    }

    /// 输入状态：更新会话标记后转发给除发送者外的所有会话，不持久化。
    pub async fn set_typing(&self, session_id: SessionId, typing: bool) {
        let Some(username) = self.registry.set_typing(session_id, typing).await else {
            return;
        };

        self.fan_out(
            ServerEvent::UserTyping { username, typing },
            DeliveryScope::AllExcept(session_id),
        )
        .await;
    }

    /// 管理端批量清空历史。必须显式传入 `confirm: true`，
    /// 否则拒绝且不产生任何副作用。成功后广播 `history:deleted`。
    pub async fn purge_history(&self, confirm: bool) -> Result<(), ApplicationError> {
        if !confirm {
            return Err(ApplicationError::validation(
                "confirm",
                "confirm deletion by sending { confirm: true }",
            ));
        }

        match timeout(self.op_timeout, self.messages.delete_all()).await {
            Ok(Ok(deleted)) => {
                tracing::info!(deleted, "聊天历史已清空");
            }
            Ok(Err(err)) => return Err(err.into()),
            Err(_) => {
                return Err(ApplicationError::infrastructure(
                    "message store timed out while deleting history",
                ))
            }
        }

        self.fan_out(ServerEvent::HistoryDeleted, DeliveryScope::All)
            .await;
        Ok(())
    }

    /// 按范围投递事件。逐个接收端非阻塞发送：
    /// 单个信箱已满或已关闭只影响它自己，广播继续。
    async fn fan_out(&self, event: ServerEvent, scope: DeliveryScope) {
        for (session_id, mailbox) in self.registry.recipients(scope).await {
            if let Err(err) = mailbox.try_send(event.clone()) {
                tracing::warn!(session_id = %session_id, error = %err, "事件投递失败");
            }
        }
    }
}

fn clamp_history_limit(limit: Option<i64>) -> u32 {
    match limit {
        Some(n) if n > 0 => (n as u64).min(HISTORY_MAX_LIMIT as u64) as u32,
        _ => HISTORY_DEFAULT_LIMIT,
    }
}
