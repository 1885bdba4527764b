use crate::value_objects::{PasswordHash, Timestamp, UserId, Username};

#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct User {
    pub id: UserId,
    pub username: Username,
    #[serde(skip_serializing)] // 密码字段不暴露给客户端
    pub password_hash: PasswordHash,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl User {
    pub fn register(
        id: UserId,
        username: Username,
        password_hash: PasswordHash,
        now: Timestamp,
    ) -> Self {
        Self {
            id,
            username,
            password_hash,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn rename(&mut self, username: Username, now: Timestamp) {
        self.username = username;
        self.updated_at = now;
    }

    pub fn set_password(&mut self, password_hash: PasswordHash, now: Timestamp) {
        self.password_hash = password_hash;
        self.updated_at = now;
    }
}
