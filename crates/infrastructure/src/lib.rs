//! 基础设施层实现。
//!
//! 提供数据库仓储、密码哈希、JWT 身份验证等适配器，实现应用/领域层定义的接口。

pub mod auth;
pub mod db;
pub mod memory;
pub mod password;

pub use auth::JwtAuthService;
pub use db::repositories::{PgMessageRepository, PgUserRepository};
pub use db::{create_pool, DbPool};
pub use memory::{MemoryMessageRepository, MemoryUserRepository};
pub use password::BcryptPasswordHasher;
