//! 内存账户存储
//! 用于开发环境与测试，进程退出即丢失

use super::AccountStore;
use crate::{
    db::HealthStatus,
    error::AppError,
    models::{Account, NewAccount, Role},
};
use async_trait::async_trait;
use chrono::Utc;
use dashmap::{mapref::entry::Entry, DashMap};
use serde_json::Value;
use uuid::Uuid;

/// (role, email) -> account id 索引 + id -> account 主表
#[derive(Default)]
pub struct InMemoryAccountStore {
    emails: DashMap<(Role, String), Uuid>,
    accounts: DashMap<Uuid, Account>,
}

impl InMemoryAccountStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.accounts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.accounts.is_empty()
    }
}

#[async_trait]
impl AccountStore for InMemoryAccountStore {
    async fn insert(&self, account: NewAccount) -> Result<Account, AppError> {
        // entry 持有分片写锁，检查与写入是同一个原子步骤
        match self.emails.entry((account.role, account.email.clone())) {
            Entry::Occupied(_) => Err(AppError::DuplicateAccount),
            Entry::Vacant(slot) => {
                let account = account.into_account(Uuid::new_v4(), Utc::now());
                self.accounts.insert(account.id, account.clone());
                slot.insert(account.id);
                Ok(account)
            }
        }
    }

    async fn find_by_email(&self, role: Role, email: &str) -> Result<Option<Account>, AppError> {
        let Some(id) = self.emails.get(&(role, email.to_string())).map(|id| *id) else {
            return Ok(None);
        };
        Ok(self.accounts.get(&id).map(|a| a.value().clone()))
    }

    async fn find_by_id(&self, role: Role, id: Uuid) -> Result<Option<Account>, AppError> {
        Ok(self
            .accounts
            .get(&id)
            .filter(|a| a.role == role)
            .map(|a| a.value().clone()))
    }

    async fn update_profile(
        &self,
        role: Role,
        id: Uuid,
        profile: Value,
    ) -> Result<Option<Account>, AppError> {
        let Some(mut account) = self.accounts.get_mut(&id) else {
            return Ok(None);
        };
        if account.role != role {
            return Ok(None);
        }
        account.profile = profile;
        account.updated_at = Utc::now();
        Ok(Some(account.value().clone()))
    }

    async fn health_check(&self) -> HealthStatus {
        HealthStatus::Healthy
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::Arc;

    fn new_account(role: Role, email: &str) -> NewAccount {
        NewAccount {
            role,
            email: email.to_string(),
            password_hash: "$argon2id$hash".to_string(),
            profile: json!({ "name": "A" }),
        }
    }

    #[tokio::test]
    async fn test_insert_and_find() {
        let store = InMemoryAccountStore::new();
        let created = store.insert(new_account(Role::Volunteer, "a@b.com")).await.unwrap();

        let by_email = store
            .find_by_email(Role::Volunteer, "a@b.com")
            .await
            .unwrap()
            .expect("account by email");
        assert_eq!(by_email.id, created.id);

        let by_id = store.find_by_id(Role::Volunteer, created.id).await.unwrap();
        assert!(by_id.is_some());

        // 角色不匹配时查不到
        assert!(store.find_by_id(Role::Admin, created.id).await.unwrap().is_none());
        assert!(store.find_by_email(Role::Admin, "a@b.com").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_duplicate_rejected_per_role() {
        let store = InMemoryAccountStore::new();
        store.insert(new_account(Role::Volunteer, "a@b.com")).await.unwrap();

        let err = store
            .insert(new_account(Role::Volunteer, "a@b.com"))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::DuplicateAccount));

        // 同一邮箱可以注册不同角色
        store.insert(new_account(Role::Organization, "a@b.com")).await.unwrap();
        assert_eq!(store.len(), 2);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_inserts_single_winner() {
        let store = Arc::new(InMemoryAccountStore::new());

        let tasks: Vec<_> = (0..16)
            .map(|_| {
                let store = store.clone();
                tokio::spawn(async move { store.insert(new_account(Role::Admin, "x@y.com")).await })
            })
            .collect();

        let results = futures::future::join_all(tasks).await;
        let ok = results.iter().filter(|r| matches!(r, Ok(Ok(_)))).count();
        let dup = results
            .iter()
            .filter(|r| matches!(r, Ok(Err(AppError::DuplicateAccount))))
            .count();

        assert_eq!(ok, 1);
        assert_eq!(dup, 15);
        assert_eq!(store.len(), 1);
    }

    #[tokio::test]
    async fn test_update_profile() {
        let store = InMemoryAccountStore::new();
        let created = store.insert(new_account(Role::GeneralUser, "u@b.com")).await.unwrap();

        let updated = store
            .update_profile(Role::GeneralUser, created.id, json!({ "name": "B" }))
            .await
            .unwrap()
            .expect("updated");
        assert_eq!(updated.profile["name"], "B");
        assert!(updated.updated_at >= created.updated_at);

        assert!(store
            .update_profile(Role::Admin, created.id, json!({}))
            .await
            .unwrap()
            .is_none());
    }
}
