//! 聊天服务核心领域模型
//!
//! 包含用户、消息、会话等核心实体，协议事件定义，以及仓储接口。

pub mod errors;
pub mod events;
pub mod message;
pub mod repository;
pub mod session;
pub mod user;
pub mod value_objects;

// 重新导出常用类型
pub use errors::*;
pub use events::*;
pub use message::*;
pub use repository::*;
pub use session::*;
pub use user::*;
pub use value_objects::*;
