//! 认证相关的 HTTP 处理器

use crate::{
    auth::middleware::AuthContext,
    error::AppError,
    middleware::AppState,
    models::{LegacyAction, LoginRequest, RegisterRequest, Role, UpdateProfileRequest},
};
use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::de::DeserializeOwned;
use serde_json::{json, Value};
use std::sync::Arc;

/// 注册
pub async fn register(
    State(state): State<Arc<AppState>>,
    Path(role): Path<String>,
    payload: Result<Json<RegisterRequest>, JsonRejection>,
) -> Result<impl IntoResponse, AppError> {
    let role = parse_role(&role)?;
    let Json(req) = payload.map_err(json_error)?;

    let response = state.auth_service.register(role, req).await?;

    Ok((StatusCode::CREATED, Json(response)))
}

/// 登录
pub async fn login(
    State(state): State<Arc<AppState>>,
    Path(role): Path<String>,
    payload: Result<Json<LoginRequest>, JsonRejection>,
) -> Result<impl IntoResponse, AppError> {
    let role = parse_role(&role)?;
    let Json(req) = payload.map_err(json_error)?;

    let response = state.auth_service.login(role, req).await?;

    Ok(Json(response))
}

/// 获取当前账户资料
pub async fn get_profile(
    State(state): State<Arc<AppState>>,
    auth_context: AuthContext,
    Path(role): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    // 未知角色与角色不匹配一样按未认证处理
    let role = role.parse::<Role>().map_err(|_| AppError::Unauthorized)?;

    let response = state.auth_service.profile(&auth_context, role).await?;

    Ok(Json(response))
}

/// 更新当前账户资料
pub async fn update_profile(
    State(state): State<Arc<AppState>>,
    auth_context: AuthContext,
    Path(role): Path<String>,
    payload: Result<Json<UpdateProfileRequest>, JsonRejection>,
) -> Result<impl IntoResponse, AppError> {
    let role = role.parse::<Role>().map_err(|_| AppError::Unauthorized)?;
    let Json(req) = payload.map_err(json_error)?;

    let account = state
        .auth_service
        .update_profile(&auth_context, role, req)
        .await?;

    Ok(Json(json!({
        "msg": "Profile updated successfully",
        "account": account,
    })))
}

/// 兼容前端旧接口：/api/auth/volunteer-login、/api/auth/registerVolunteer 等
pub async fn legacy_auth(
    State(state): State<Arc<AppState>>,
    Path(action): Path<String>,
    payload: Result<Json<Value>, JsonRejection>,
) -> Result<Response, AppError> {
    let action = action
        .parse::<LegacyAction>()
        .map_err(|_| AppError::not_found(&format!("auth endpoint {}", action)))?;
    let Json(body) = payload.map_err(json_error)?;

    match action {
        LegacyAction::Login(role) => {
            let response = state.auth_service.login(role, from_body(body)?).await?;
            Ok(Json(response).into_response())
        }
        LegacyAction::Register(role) => {
            let response = state.auth_service.register(role, from_body(body)?).await?;
            Ok((StatusCode::CREATED, Json(response)).into_response())
        }
    }
}

fn parse_role(raw: &str) -> Result<Role, AppError> {
    raw.parse::<Role>()
        .map_err(|_| AppError::not_found(&format!("role {}", raw)))
}

fn from_body<T: DeserializeOwned>(body: Value) -> Result<T, AppError> {
    serde_json::from_value(body).map_err(|e| AppError::invalid_input(format!("Invalid request body: {}", e)))
}

fn json_error(rejection: JsonRejection) -> AppError {
    AppError::invalid_input(rejection.body_text())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_role_unknown_is_not_found() {
        assert_eq!(parse_role("Volunteer").unwrap(), Role::Volunteer);
        assert!(matches!(parse_role("root"), Err(AppError::NotFound(_))));
    }

    #[test]
    fn test_from_body_rejects_wrong_shape() {
        let result: Result<LoginRequest, _> = from_body(json!({ "email": 42 }));
        assert!(matches!(result, Err(AppError::InvalidInput(_))));
    }
}
