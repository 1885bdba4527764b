//! JWT认证基础设施实现
//!
//! 负责令牌签发与校验。校验通过后回源加载用户，
//! 使身份始终反映账号的当前状态（被删除的账号凭据立即失效）。

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use application::{AuthError, Identity, IdentityVerifier, TokenIssuer};
use config::JwtConfig;
use domain::{User, UserId, UserRepository};

/// JWT Claims 结构
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    /// 用户ID
    pub sub: Uuid,
    pub username: String,
    /// 过期时间 (Unix timestamp)
    pub exp: i64,
}

/// JWT 认证服务，同时实现令牌签发与身份校验两个端口。
pub struct JwtAuthService {
    config: JwtConfig,
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    users: Arc<dyn UserRepository>,
}

impl JwtAuthService {
    pub fn new(config: JwtConfig, users: Arc<dyn UserRepository>) -> Self {
        let encoding_key = EncodingKey::from_secret(config.secret.as_ref());
        let decoding_key = DecodingKey::from_secret(config.secret.as_ref());

        Self {
            config,
            encoding_key,
            decoding_key,
            users,
        }
    }

    fn decode_claims(&self, token: &str) -> Result<Claims, AuthError> {
        decode::<Claims>(token, &self.decoding_key, &Validation::default())
            .map(|data| data.claims)
            .map_err(|_| AuthError::InvalidCredential)
    }
}

impl TokenIssuer for JwtAuthService {
    fn issue(&self, user: &User) -> Result<String, AuthError> {
        let exp = Utc::now() + chrono::Duration::hours(self.config.expiration_hours);
        let claims = Claims {
            sub: user.id.into(),
            username: user.username.as_str().to_string(),
            exp: exp.timestamp(),
        };

        encode(&Header::default(), &claims, &self.encoding_key)
            .map_err(|err| AuthError::Token(err.to_string()))
    }
}

#[async_trait]
impl IdentityVerifier for JwtAuthService {
    async fn verify(&self, credential: &str) -> Result<Identity, AuthError> {
        if credential.is_empty() {
            return Err(AuthError::MissingCredential);
        }

        let claims = self.decode_claims(credential)?;

        let user = self
            .users
            .find_by_id(UserId::from(claims.sub))
            .await
            .map_err(|err| AuthError::Token(err.to_string()))?
            .ok_or(AuthError::InvalidCredential)?;

        Ok(Identity {
            user_id: user.id,
            username: user.username.as_str().to_string(),
        })
    }
}
