//! 账户存储层
//! `AccountStore` 抽象出 Postgres 与内存两种实现

pub mod account_repo;
pub mod memory_repo;

pub use account_repo::PgAccountRepository;
pub use memory_repo::InMemoryAccountStore;

use crate::{
    db::HealthStatus,
    error::AppError,
    models::{Account, NewAccount, Role},
};
use async_trait::async_trait;
use serde_json::Value;
use uuid::Uuid;

/// Credential store.
///
/// `insert` is the final arbiter of (role, email) uniqueness: implementations
/// must reject a duplicate atomically with `AppError::DuplicateAccount`
/// rather than relying on a prior lookup.
#[async_trait]
pub trait AccountStore: Send + Sync {
    async fn insert(&self, account: NewAccount) -> Result<Account, AppError>;

    async fn find_by_email(&self, role: Role, email: &str) -> Result<Option<Account>, AppError>;

    async fn find_by_id(&self, role: Role, id: Uuid) -> Result<Option<Account>, AppError>;

    /// Replace the profile document; `None` when the account does not exist
    async fn update_profile(
        &self,
        role: Role,
        id: Uuid,
        profile: Value,
    ) -> Result<Option<Account>, AppError>;

    async fn health_check(&self) -> HealthStatus;
}
