//! 数据模型模块
//! 角色、账户与认证请求/响应

pub mod account;
pub mod role;

pub use account::*;
pub use role::{LegacyAction, Role, UnknownRole};
