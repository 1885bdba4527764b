//! 身份验证端口。
//!
//! 凭据校验对广播协调器是一个外部协作方：给定一个 bearer 凭据，
//! 返回用户身份或失败。校验必须既能用于普通请求认证，
//! 也能在连接升级时使用（凭据作为连接参数而非请求头传入）。

use async_trait::async_trait;
use domain::{User, UserId};
use thiserror::Error;

/// 校验通过后的用户身份
#[derive(Debug, Clone)]
pub struct Identity {
    pub user_id: UserId,
    pub username: String,
}

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("missing credential")]
    MissingCredential,
    #[error("invalid or expired credential")]
    InvalidCredential,
    #[error("token error: {0}")]
    Token(String),
}

/// 凭据校验端口。失败必须发生在任何会话创建之前，
/// 绝不允许注册一个半认证的会话。
#[async_trait]
pub trait IdentityVerifier: Send + Sync {
    async fn verify(&self, credential: &str) -> Result<Identity, AuthError>;
}

/// 凭据签发端口，注册和登录时使用。
pub trait TokenIssuer: Send + Sync {
    fn issue(&self, user: &User) -> Result<String, AuthError>;
}
