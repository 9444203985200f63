//! Account repository (数据库访问层)

use super::AccountStore;
use crate::{
    db::{self, HealthStatus},
    error::AppError,
    models::{Account, NewAccount, Role},
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::Value;
use sqlx::{types::Json, PgPool};
use uuid::Uuid;

const ACCOUNT_COLUMNS: &str = "id, role, email, password_hash, profile, created_at, updated_at";

/// 数据库行
#[derive(Debug, sqlx::FromRow)]
struct AccountRow {
    id: Uuid,
    role: String,
    email: String,
    password_hash: String,
    profile: Json<Value>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<AccountRow> for Account {
    type Error = AppError;

    fn try_from(row: AccountRow) -> Result<Self, Self::Error> {
        let role = row
            .role
            .parse::<Role>()
            .map_err(|e| AppError::Internal(format!("Corrupt account row {}: {}", row.id, e)))?;

        Ok(Account {
            id: row.id,
            role,
            email: row.email,
            password_hash: row.password_hash,
            profile: row.profile.0,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

pub struct PgAccountRepository {
    db: PgPool,
}

impl PgAccountRepository {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

#[async_trait]
impl AccountStore for PgAccountRepository {
    /// 创建账户
    ///
    /// 唯一约束 (role, email) 冲突时不返回行，视为重复注册
    async fn insert(&self, account: NewAccount) -> Result<Account, AppError> {
        let row = sqlx::query_as::<_, AccountRow>(&format!(
            r#"
            INSERT INTO accounts (id, role, email, password_hash, profile)
            VALUES ($1, $2, $3, $4, $5)
            ON CONFLICT (role, email) DO NOTHING
            RETURNING {}
            "#,
            ACCOUNT_COLUMNS
        ))
        .bind(Uuid::new_v4())
        .bind(account.role.as_str())
        .bind(&account.email)
        .bind(&account.password_hash)
        .bind(Json(account.profile))
        .fetch_optional(&self.db)
        .await?;

        row.ok_or(AppError::DuplicateAccount)?.try_into()
    }

    /// 根据角色和邮箱查找账户
    async fn find_by_email(&self, role: Role, email: &str) -> Result<Option<Account>, AppError> {
        let row = sqlx::query_as::<_, AccountRow>(&format!(
            "SELECT {} FROM accounts WHERE role = $1 AND email = $2",
            ACCOUNT_COLUMNS
        ))
        .bind(role.as_str())
        .bind(email)
        .fetch_optional(&self.db)
        .await?;

        row.map(Account::try_from).transpose()
    }

    /// 根据角色和 ID 查找账户
    async fn find_by_id(&self, role: Role, id: Uuid) -> Result<Option<Account>, AppError> {
        let row = sqlx::query_as::<_, AccountRow>(&format!(
            "SELECT {} FROM accounts WHERE role = $1 AND id = $2",
            ACCOUNT_COLUMNS
        ))
        .bind(role.as_str())
        .bind(id)
        .fetch_optional(&self.db)
        .await?;

        row.map(Account::try_from).transpose()
    }

    /// 更新资料
    async fn update_profile(
        &self,
        role: Role,
        id: Uuid,
        profile: Value,
    ) -> Result<Option<Account>, AppError> {
        let row = sqlx::query_as::<_, AccountRow>(&format!(
            r#"
            UPDATE accounts
            SET profile = $3, updated_at = NOW()
            WHERE role = $1 AND id = $2
            RETURNING {}
            "#,
            ACCOUNT_COLUMNS
        ))
        .bind(role.as_str())
        .bind(id)
        .bind(Json(profile))
        .fetch_optional(&self.db)
        .await?;

        row.map(Account::try_from).transpose()
    }

    async fn health_check(&self) -> HealthStatus {
        db::health_check(&self.db).await
    }
}
