//! Repository实现模块
//!
//! 包含所有数据访问层的具体实现

pub mod message_repository_impl;
pub mod user_repository_impl;

// 重新导出所有Repository实现
pub use message_repository_impl::*;
pub use user_repository_impl::*;
