//! 应用层实现。
//!
//! 这里提供围绕领域模型的用例服务、会话注册表与广播协调器，
//! 以及对外部适配器（密码哈希、身份验证、时钟）的抽象。

pub mod clock;
pub mod coordinator;
pub mod dto;
pub mod error;
pub mod identity;
pub mod password;
pub mod registry;
pub mod services;

pub use clock::{Clock, SystemClock};
pub use coordinator::{ChatCoordinator, HISTORY_DEFAULT_LIMIT, HISTORY_MAX_LIMIT};
pub use dto::UserDto;
pub use error::ApplicationError;
pub use identity::{AuthError, Identity, IdentityVerifier, TokenIssuer};
pub use password::{PasswordHasher, PasswordHasherError};
pub use registry::{DeliveryScope, Mailbox, SessionRegistry};
pub use services::{
    AuthenticateUserRequest, RegisterUserRequest, StatsService, StatsSnapshot,
    UpdateProfileRequest, UserService, UserServiceDependencies,
};
