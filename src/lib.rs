//! CSN 账户服务库
//! 四类角色（管理员、志愿者、普通用户、组织）的注册、登录与会话认证

pub mod auth;
pub mod config;
pub mod db;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod repository;
pub mod routes;
pub mod server;
pub mod services;
pub mod telemetry;
