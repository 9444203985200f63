//! 认证服务：注册、登录、个人资料
//! 四种角色共用同一套流程，按 Role 参数化

use crate::{
    auth::{jwt::JwtService, middleware::AuthContext, password::PasswordHasher},
    config::AppConfig,
    error::AppError,
    models::{
        normalize_email, validate_profile, AccountView, AuthResponse, LoginRequest, NewAccount,
        ProfileResponse, RegisterRequest, Role, SessionContext, UpdateProfileRequest,
    },
    repository::AccountStore,
};
use std::sync::Arc;

pub struct AuthService {
    store: Arc<dyn AccountStore>,
    jwt_service: Arc<JwtService>,
    hasher: PasswordHasher,
    /// 未知邮箱登录时用于校验的占位哈希
    dummy_hash: String,
    config: Arc<AppConfig>,
}

impl AuthService {
    pub fn new(
        store: Arc<dyn AccountStore>,
        jwt_service: Arc<JwtService>,
        config: Arc<AppConfig>,
    ) -> Result<Self, AppError> {
        let hasher = PasswordHasher::from_config(&config.security)?;
        let dummy_hash = hasher.hash("csn-dummy-password")?;
        Ok(Self {
            store,
            jwt_service,
            hasher,
            dummy_hash,
            config,
        })
    }

    /// 注册
    pub async fn register(&self, role: Role, req: RegisterRequest) -> Result<AuthResponse, AppError> {
        let result = self.try_register(role, req).await;
        record_outcome("auth_register_total", role, &result);
        result
    }

    async fn try_register(&self, role: Role, req: RegisterRequest) -> Result<AuthResponse, AppError> {
        let email = normalize_email(&req.email)?;

        if req.password.is_empty() {
            return Err(AppError::invalid_input("Password is required"));
        }
        PasswordHasher::validate_password_policy(&req.password, &self.config.security)?;

        let profile = validate_profile(role, req.profile)?;

        // 应用层预检，真正的唯一性由存储层保证
        if self.store.find_by_email(role, &email).await?.is_some() {
            tracing::debug!(%role, %email, "Registration rejected: email already registered");
            return Err(AppError::DuplicateAccount);
        }

        let password_hash = self.hash_password(req.password).await?;

        let account = self
            .store
            .insert(NewAccount {
                role,
                email,
                password_hash,
                profile,
            })
            .await?;

        let issued = self.jwt_service.issue(role, account.id)?;

        tracing::info!(account_id = %account.id, %role, "Account registered");

        Ok(AuthResponse {
            msg: format!("{} registered successfully", role.display_name()),
            token: issued.token,
            expires_in: issued.expires_in,
            account: AccountView::from(account),
        })
    }

    /// 登录
    ///
    /// 账户不存在与密码错误返回同一个错误，避免泄露已注册邮箱
    pub async fn login(&self, role: Role, req: LoginRequest) -> Result<AuthResponse, AppError> {
        let result = self.try_login(role, req).await;
        record_outcome("auth_login_total", role, &result);
        result
    }

    async fn try_login(&self, role: Role, req: LoginRequest) -> Result<AuthResponse, AppError> {
        let email = normalize_email(&req.email)?;

        let Some(account) = self.store.find_by_email(role, &email).await? else {
            // 与真实校验耗时一致，使两种失败不可区分
            let _ = self
                .verify_password(req.password, self.dummy_hash.clone())
                .await;
            tracing::debug!(%role, %email, "Login failed: unknown email");
            return Err(AppError::InvalidCredentials);
        };

        if !self
            .verify_password(req.password, account.password_hash.clone())
            .await?
        {
            tracing::debug!(account_id = %account.id, %role, "Login failed: password mismatch");
            return Err(AppError::InvalidCredentials);
        }

        let issued = self.jwt_service.issue(role, account.id)?;

        tracing::info!(account_id = %account.id, %role, "Login successful");

        Ok(AuthResponse {
            msg: "Login successful".to_string(),
            token: issued.token,
            expires_in: issued.expires_in,
            account: AccountView::from(account),
        })
    }

    /// 获取当前账户资料
    pub async fn profile(&self, ctx: &AuthContext, role: Role) -> Result<ProfileResponse, AppError> {
        let account = self.load_own_account(ctx, role).await?;

        Ok(ProfileResponse {
            msg: format!("Welcome to the {} profile", role.display_name().to_lowercase()),
            account: AccountView::from(account),
            context: SessionContext {
                role: ctx.role,
                account_id: ctx.account_id,
            },
        })
    }

    /// 更新当前账户资料
    pub async fn update_profile(
        &self,
        ctx: &AuthContext,
        role: Role,
        req: UpdateProfileRequest,
    ) -> Result<AccountView, AppError> {
        ensure_role(ctx, role)?;

        let profile = validate_profile(role, req.profile)?;

        let account = self
            .store
            .update_profile(role, ctx.account_id, profile)
            .await?
            .ok_or(AppError::Unauthorized)?;

        tracing::info!(account_id = %account.id, %role, "Profile updated");

        Ok(AccountView::from(account))
    }

    async fn load_own_account(
        &self,
        ctx: &AuthContext,
        role: Role,
    ) -> Result<crate::models::Account, AppError> {
        ensure_role(ctx, role)?;

        // 令牌签发后账户被删除的情况同样视为未认证
        self.store
            .find_by_id(role, ctx.account_id)
            .await?
            .ok_or(AppError::Unauthorized)
    }

    /// Argon2 是 CPU 密集操作，放到阻塞线程池执行
    async fn hash_password(&self, password: String) -> Result<String, AppError> {
        let hasher = self.hasher.clone();
        tokio::task::spawn_blocking(move || hasher.hash(&password))
            .await
            .map_err(|e| AppError::Internal(format!("Hashing task failed: {}", e)))?
    }

    async fn verify_password(&self, password: String, hash: String) -> Result<bool, AppError> {
        let hasher = self.hasher.clone();
        tokio::task::spawn_blocking(move || hasher.verify(&password, &hash))
            .await
            .map_err(|e| AppError::Internal(format!("Verification task failed: {}", e)))
    }
}

/// 令牌角色必须与访问的资源角色一致
fn ensure_role(ctx: &AuthContext, role: Role) -> Result<(), AppError> {
    if ctx.role != role {
        tracing::debug!(token_role = %ctx.role, path_role = %role, "Role mismatch");
        return Err(AppError::Unauthorized);
    }
    Ok(())
}

fn record_outcome<T>(metric: &'static str, role: Role, result: &Result<T, AppError>) {
    let outcome = match result {
        Ok(_) => "success",
        Err(e) => e.kind(),
    };
    metrics::counter!(metric, "role" => role.as_str(), "outcome" => outcome).increment(1);

    if let Err(e) = result {
        tracing::info!(%role, kind = e.kind(), "{} failed", metric);
    }
}
