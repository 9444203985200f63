//! 测试公共模块
//! 提供测试配置、应用状态与请求辅助函数

#![allow(dead_code)]

use axum::{
    body::Body,
    http::{header, Request, StatusCode},
    Router,
};
use csn_backend::{
    auth::jwt::JwtService,
    config::{
        AppConfig, DatabaseConfig, LoggingConfig, SecurityConfig, ServerConfig, StorageBackend,
        StorageConfig,
    },
    middleware::AppState,
    repository::{AccountStore, InMemoryAccountStore},
    services::AuthService,
};
use http_body_util::BodyExt;
use secrecy::Secret;
use serde_json::{json, Value};
use std::sync::Arc;
use tower::ServiceExt;

pub const TEST_SECRET: &str = "test-secret-key-for-testing-only-min-32-chars";
pub const TEST_PASSWORD: &str = "TestPass123";

/// 创建测试配置（内存存储，低成本 Argon2 参数）
pub fn create_test_config() -> AppConfig {
    let database_url = std::env::var("TEST_DATABASE_URL").ok().map(Secret::new);

    AppConfig {
        server: ServerConfig {
            addr: "127.0.0.1:0".to_string(), // 使用随机端口
            graceful_shutdown_timeout_secs: 5,
            cors_allowed_origins: Vec::new(),
        },
        database: DatabaseConfig {
            url: database_url,
            max_connections: 5,
            min_connections: 1,
            acquire_timeout_secs: 5,
            idle_timeout_secs: 300,
            max_lifetime_secs: 1800,
        },
        storage: StorageConfig {
            backend: StorageBackend::Memory,
        },
        logging: LoggingConfig {
            level: "debug".to_string(),
            format: "pretty".to_string(),
        },
        security: SecurityConfig {
            jwt_secret: Secret::new(TEST_SECRET.to_string()),
            token_ttl_secs: 3600,
            argon2_memory_kib: 1024,
            argon2_iterations: 1,
            argon2_parallelism: 1,
            password_min_length: 8,
            password_require_uppercase: true,
            password_require_digit: true,
            password_require_special: false,
        },
    }
}

/// 创建测试应用状态
pub fn create_test_app_state() -> Arc<AppState> {
    let store: Arc<dyn AccountStore> = Arc::new(InMemoryAccountStore::new());
    Arc::new(AppState::build(create_test_config(), store).expect("Failed to build app state"))
}

/// 创建测试路由
pub fn create_test_app() -> Router {
    csn_backend::routes::create_router(create_test_app_state())
}

/// 基于给定存储创建认证服务
pub fn create_auth_service(store: Arc<dyn AccountStore>) -> AuthService {
    let config = create_test_config();
    let jwt_service =
        Arc::new(JwtService::from_config(&config.security).expect("Failed to create JWT service"));
    AuthService::new(store, jwt_service, Arc::new(config)).expect("Failed to create auth service")
}

/// 志愿者注册请求体
pub fn volunteer_body(email: &str) -> Value {
    json!({
        "email": email,
        "password": TEST_PASSWORD,
        "name": "Nimal Perera",
        "contactNumber": "0771234567",
        "address": "12 Temple Road, Kandy",
        "age": 29,
        "skills": ["first aid", "logistics"],
        "availability": "weekends"
    })
}

/// 发送 JSON 请求并解析响应
pub async fn send_json(
    app: &Router,
    method: &str,
    uri: &str,
    body: Option<Value>,
    token: Option<&str>,
) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
    }

    let request = match body {
        Some(body) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let json = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or(Value::Null)
    };

    (status, json)
}
