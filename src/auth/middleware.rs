//! JWT 认证中间件

use crate::{auth::jwt::JwtService, error::AppError, models::Role};
use axum::{
    extract::{FromRequestParts, Request, State},
    http::{header, HeaderMap},
    middleware::Next,
    response::Response,
};
use chrono::{DateTime, Utc};
use std::sync::Arc;
use uuid::Uuid;

/// 认证上下文（附加到请求扩展）
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthContext {
    pub account_id: Uuid,
    pub role: Role,
    pub expires_at: Option<DateTime<Utc>>,
}

// 实现 FromRequestParts 以便在 handler 中直接提取 AuthContext
impl<S> FromRequestParts<S> for AuthContext
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut axum::http::request::Parts,
        _state: &S,
    ) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<AuthContext>()
            .cloned()
            .ok_or(AppError::Unauthorized)
    }
}

/// 从 Authorization 头提取令牌
pub fn extract_token(headers: &HeaderMap) -> Result<String, AppError> {
    let value = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .ok_or(AppError::Unauthorized)?;

    let (scheme, token) = value.split_once(' ').ok_or(AppError::Unauthorized)?;
    let token = token.trim();

    if !scheme.eq_ignore_ascii_case("bearer") || token.is_empty() {
        return Err(AppError::Unauthorized);
    }

    Ok(token.to_string())
}

/// 校验令牌并构建认证上下文
pub fn authenticate(jwt_service: &JwtService, headers: &HeaderMap) -> Result<AuthContext, AppError> {
    let token = extract_token(headers)?;

    let claims = jwt_service
        .verify(&token)
        .map_err(|_| AppError::Unauthorized)?;

    let account_id = claims.account_id().map_err(|_| AppError::Unauthorized)?;

    Ok(AuthContext {
        account_id,
        role: claims.role,
        expires_at: claims.expires_at(),
    })
}

/// JWT 认证中间件 - 必须认证
pub async fn jwt_auth_middleware(
    State(jwt_service): State<Arc<JwtService>>,
    mut req: Request,
    next: Next,
) -> Result<Response, AppError> {
    let auth_context = authenticate(&jwt_service, req.headers())?;

    tracing::debug!(
        account_id = %auth_context.account_id,
        role = %auth_context.role,
        "Request authenticated"
    );

    // 附加到请求扩展
    req.extensions_mut().insert(auth_context);

    Ok(next.run(req).await)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &str = "test_secret_key_32_characters_long!";

    #[test]
    fn test_extract_token_valid() {
        let mut headers = HeaderMap::new();
        headers.insert("authorization", "Bearer test_token_123".parse().unwrap());

        let token = extract_token(&headers).unwrap();
        assert_eq!(token, "test_token_123");
    }

    #[test]
    fn test_extract_token_scheme_case_insensitive() {
        let mut headers = HeaderMap::new();
        headers.insert("authorization", "bearer abc".parse().unwrap());
        assert_eq!(extract_token(&headers).unwrap(), "abc");
    }

    #[test]
    fn test_extract_token_missing() {
        let headers = HeaderMap::new();
        assert!(matches!(extract_token(&headers), Err(AppError::Unauthorized)));
    }

    #[test]
    fn test_extract_token_invalid_format() {
        let mut headers = HeaderMap::new();
        headers.insert("authorization", "InvalidFormat".parse().unwrap());
        assert!(extract_token(&headers).is_err());

        headers.insert("authorization", "Basic dXNlcjpwYXNz".parse().unwrap());
        assert!(extract_token(&headers).is_err());

        headers.insert("authorization", "Bearer ".parse().unwrap());
        assert!(extract_token(&headers).is_err());
    }

    #[test]
    fn test_authenticate_builds_context() {
        let jwt = JwtService::new(SECRET, 3600).unwrap();
        let account_id = Uuid::new_v4();
        let issued = jwt.issue(Role::Organization, account_id).unwrap();

        let mut headers = HeaderMap::new();
        headers.insert(
            "authorization",
            format!("Bearer {}", issued.token).parse().unwrap(),
        );

        let ctx = authenticate(&jwt, &headers).unwrap();
        assert_eq!(ctx.account_id, account_id);
        assert_eq!(ctx.role, Role::Organization);
    }

    #[test]
    fn test_authenticate_maps_bad_token_to_unauthorized() {
        let jwt = JwtService::new(SECRET, 3600).unwrap();
        let mut headers = HeaderMap::new();
        headers.insert("authorization", "Bearer nope".parse().unwrap());

        assert!(matches!(authenticate(&jwt, &headers), Err(AppError::Unauthorized)));
    }
}
