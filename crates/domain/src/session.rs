use crate::value_objects::{SessionId, UserId};

/// 一条已认证的活跃连接。
///
/// 会话在认证成功后创建，连接断开时销毁，归广播协调器独占所有，
/// 生命周期内用户身份不可变。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub id: SessionId,
    pub user_id: UserId,
    pub username: String,
    /// 最近一次上报的输入状态
    pub typing: bool,
}

impl Session {
    pub fn new(user_id: UserId, username: impl Into<String>) -> Self {
        Self {
            id: SessionId::generate(),
            user_id,
            username: username.into(),
            typing: false,
        }
    }
}
