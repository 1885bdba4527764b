//! 会话注册表。
//!
//! 维护当前所有活跃会话以及按用户名引用计数的在线集合。
//! 全部状态位于单个互斥锁之后：注册、注销、快照在同一个锁内完成，
//! 不存在两次在线状态广播能观察到不一致集合的窗口。

use std::collections::HashMap;

use tokio::sync::{mpsc, Mutex};

use domain::{ServerEvent, Session, SessionId, UserId};

/// 每个会话的出站信箱，由发送任务消费后写入 WebSocket。
pub type Mailbox = mpsc::Sender<ServerEvent>;

/// 事件投递范围
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeliveryScope {
    /// 所有活跃会话
    All,
    /// 除指定会话外的所有会话
    AllExcept(SessionId),
    /// 仅指定会话
    Only(SessionId),
}

/// 注册结果
#[derive(Debug)]
pub struct Registration {
    /// 是否是该用户名的第一个活跃会话
    pub first_for_user: bool,
    /// 注册完成后的在线用户名快照
    pub online: Vec<String>,
}

/// 注销结果
#[derive(Debug)]
pub struct Departure {
    pub username: String,
    /// 是否是该用户名的最后一个活跃会话
    pub last_for_user: bool,
    /// 注销完成后的在线用户名快照
    pub online: Vec<String>,
}

struct ConnectedSession {
    session: Session,
    mailbox: Mailbox,
}

#[derive(Default)]
struct RegistryState {
    sessions: HashMap<SessionId, ConnectedSession>,
    /// 用户名 → 活跃会话数。计数归零即离线
    presence: HashMap<String, usize>,
}

impl RegistryState {
    fn snapshot(&self) -> Vec<String> {
        let mut users: Vec<String> = self.presence.keys().cloned().collect();
        users.sort();
        users
    }
}

pub struct SessionRegistry {
    state: Mutex<RegistryState>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(RegistryState::default()),
        }
    }

    /// 注册会话。用户名首次出现时进入在线集合。
    pub async fn register(&self, session: Session, mailbox: Mailbox) -> Registration {
        let mut state = self.state.lock().await;
        let count = state
            .presence
            .entry(session.username.clone())
            .or_insert(0);
        *count += 1;
        let first_for_user = *count == 1;
        state
            .sessions
            .insert(session.id, ConnectedSession { session, mailbox });

        Registration {
            first_for_user,
            online: state.snapshot(),
        }
    }

    /// 注销会话。幂等：重复注销同一会话返回 `None`，不产生第二次离线转换。
    pub async fn deregister(&self, session_id: SessionId) -> Option<Departure> {
        let mut state = self.state.lock().await;
        let removed = state.sessions.remove(&session_id)?;
        let username = removed.session.username;

        let remaining = state
            .presence
            .get(&username)
            .copied()
            .unwrap_or(0)
            .saturating_sub(1);
        let last_for_user = remaining == 0;
        if last_for_user {
            state.presence.remove(&username);
        } else {
            state.presence.insert(username.clone(), remaining);
        }

        Some(Departure {
            username,
            last_for_user,
            online: state.snapshot(),
        })
    }

    /// 更新会话的输入状态，返回其用户名。会话不存在时返回 `None`。
    pub async fn set_typing(&self, session_id: SessionId, typing: bool) -> Option<String> {
        let mut state = self.state.lock().await;
        let connected = state.sessions.get_mut(&session_id)?;
        connected.session.typing = typing;
        Some(connected.session.username.clone())
    }

    /// 查询会话归属的用户身份
    pub async fn session_identity(&self, session_id: SessionId) -> Option<(UserId, String)> {
        let state = self.state.lock().await;
        state
            .sessions
            .get(&session_id)
            .map(|c| (c.session.user_id, c.session.username.clone()))
    }

    /// 当前在线用户名快照（去重、有序）
    pub async fn snapshot(&self) -> Vec<String> {
        self.state.lock().await.snapshot()
    }

    /// 按投递范围选出接收端。信箱克隆后在锁外投递，锁内不做任何发送。
    pub async fn recipients(&self, scope: DeliveryScope) -> Vec<(SessionId, Mailbox)> {
        let state = self.state.lock().await;
        state
            .sessions
            .iter()
            .filter(|(id, _)| match scope {
                DeliveryScope::All => true,
                DeliveryScope::AllExcept(excluded) => **id != excluded,
                DeliveryScope::Only(target) => **id == target,
            })
            .map(|(id, c)| (*id, c.mailbox.clone()))
            .collect()
    }

    pub async fn session_count(&self) -> usize {
        self.state.lock().await.sessions.len()
    }

    pub async fn is_online(&self, username: &str) -> bool {
        self.state.lock().await.presence.contains_key(username)
    }
}

impl Default for SessionRegistry {
    fn default() -> Self {
        Self::new()
    }
}
