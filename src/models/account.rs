//! Account domain models

use super::role::Role;
use crate::error::AppError;
use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;
use validator::Validate;

static EMAIL_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("email pattern is valid")
});

/// Trim and lowercase an email, then check it against the accepted shape.
pub fn normalize_email(raw: &str) -> Result<String, AppError> {
    let email = raw.trim().to_lowercase();
    if !EMAIL_RE.is_match(&email) {
        return Err(AppError::invalid_input("Invalid email format"));
    }
    Ok(email)
}

/// Persisted account
#[derive(Debug, Clone)]
pub struct Account {
    pub id: Uuid,
    pub role: Role,
    pub email: String,
    pub password_hash: String,
    pub profile: Value,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Data handed to the store when creating an account
#[derive(Debug, Clone)]
pub struct NewAccount {
    pub role: Role,
    pub email: String,
    pub password_hash: String,
    pub profile: Value,
}

impl NewAccount {
    pub fn into_account(self, id: Uuid, now: DateTime<Utc>) -> Account {
        Account {
            id,
            role: self.role,
            email: self.email,
            password_hash: self.password_hash,
            profile: self.profile,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Account as returned to clients (no password hash)
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountView {
    pub id: Uuid,
    pub role: Role,
    pub email: String,
    pub profile: Value,
    pub created_at: DateTime<Utc>,
}

impl From<Account> for AccountView {
    fn from(account: Account) -> Self {
        Self {
            id: account.id,
            role: account.role,
            email: account.email,
            profile: account.profile,
            created_at: account.created_at,
        }
    }
}

// ==================== 角色资料 ====================

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct VolunteerProfile {
    #[validate(length(min = 1, message = "is required"))]
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub contact_number: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    /// 表单提交的年龄可能是字符串
    #[serde(default, deserialize_with = "deserialize_age", skip_serializing_if = "Option::is_none")]
    #[validate(range(max = 150, message = "must be between 0 and 150"))]
    pub age: Option<u32>,
    #[serde(default)]
    pub skills: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub availability: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct GeneralUserProfile {
    #[validate(length(min = 1, message = "is required"))]
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub contact_number: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct OrganizationProfile {
    #[validate(length(min = 1, message = "is required"))]
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub contact_number: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub website: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct AdminProfile {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

/// Validate the free-form profile fields of a request against the role's
/// schema and return the canonical profile document to store.
pub fn validate_profile(role: Role, fields: Map<String, Value>) -> Result<Value, AppError> {
    let fields = Value::Object(trim_strings(fields));
    match role {
        Role::Volunteer => canonical::<VolunteerProfile>(fields),
        Role::GeneralUser => canonical::<GeneralUserProfile>(fields),
        Role::Organization => canonical::<OrganizationProfile>(fields),
        Role::Admin => canonical::<AdminProfile>(fields),
    }
}

fn canonical<P>(fields: Value) -> Result<Value, AppError>
where
    P: for<'de> Deserialize<'de> + Serialize + Validate,
{
    let profile: P = serde_json::from_value(fields)
        .map_err(|e| AppError::invalid_input(format!("Invalid profile fields: {}", e)))?;
    profile.validate()?;
    serde_json::to_value(&profile)
        .map_err(|e| AppError::Internal(format!("Failed to encode profile: {}", e)))
}

fn trim_strings(fields: Map<String, Value>) -> Map<String, Value> {
    fields
        .into_iter()
        .map(|(key, value)| {
            let value = match value {
                Value::String(s) => Value::String(s.trim().to_string()),
                Value::Array(items) => Value::Array(
                    items
                        .into_iter()
                        .map(|item| match item {
                            Value::String(s) => Value::String(s.trim().to_string()),
                            other => other,
                        })
                        .collect(),
                ),
                other => other,
            };
            (key, value)
        })
        .collect()
}

/// 年龄既接受数字也接受数字字符串，空字符串视为未填写
fn deserialize_age<'de, D>(deserializer: D) -> Result<Option<u32>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum NumberOrText {
        Number(u32),
        Text(String),
    }

    match Option::<NumberOrText>::deserialize(deserializer)? {
        None => Ok(None),
        Some(NumberOrText::Number(age)) => Ok(Some(age)),
        Some(NumberOrText::Text(text)) => {
            let text = text.trim();
            if text.is_empty() {
                return Ok(None);
            }
            text.parse::<u32>()
                .map(Some)
                .map_err(|_| serde::de::Error::custom(format!("invalid age: {}", text)))
        }
    }
}

// ==================== 请求/响应 ====================

/// Registration request: credentials plus role-specific profile fields
#[derive(Debug, Clone, Deserialize)]
pub struct RegisterRequest {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
    #[serde(flatten)]
    pub profile: Map<String, Value>,
}

/// Login request
#[derive(Debug, Clone, Deserialize)]
pub struct LoginRequest {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

/// Profile update request
#[derive(Debug, Clone, Deserialize)]
pub struct UpdateProfileRequest {
    #[serde(flatten)]
    pub profile: Map<String, Value>,
}

/// Returned by register and login
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthResponse {
    pub msg: String,
    pub token: String,
    pub expires_in: u64,
    pub account: AccountView,
}

/// Identity attached to an authenticated request
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionContext {
    pub role: Role,
    pub account_id: Uuid,
}

/// Returned by the profile endpoint
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileResponse {
    pub msg: String,
    pub account: AccountView,
    pub context: SessionContext,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn map(value: Value) -> Map<String, Value> {
        match value {
            Value::Object(m) => m,
            _ => panic!("expected object"),
        }
    }

    #[test]
    fn test_normalize_email() {
        assert_eq!(normalize_email("  A@B.com ").unwrap(), "a@b.com");
        assert!(normalize_email("a@b").is_err());
        assert!(normalize_email("a b@c.com").is_err());
        assert!(normalize_email("").is_err());
        assert!(normalize_email("@b.com").is_err());
    }

    #[test]
    fn test_volunteer_profile_fields() {
        let err = validate_profile(Role::Volunteer, map(json!({ "age": 30 }))).unwrap_err();
        assert!(matches!(err, AppError::InvalidInput(_)));

        // 只有姓名是必填项
        let minimal = validate_profile(Role::Volunteer, map(json!({ "name": "A" }))).unwrap();
        assert_eq!(minimal, json!({ "name": "A", "skills": [] }));

        let profile = validate_profile(
            Role::Volunteer,
            map(json!({
                "name": " A ",
                "contactNumber": "0771234567",
                "address": "Colombo",
                "age": 30,
                "skills": ["first aid"],
                "ignored": true
            })),
        )
        .unwrap();
        assert_eq!(profile["name"], "A");
        assert_eq!(profile["skills"][0], "first aid");
        assert!(profile.get("ignored").is_none());
    }

    #[test]
    fn test_volunteer_age_out_of_range() {
        let err = validate_profile(
            Role::Volunteer,
            map(json!({
                "name": "A",
                "contactNumber": "1",
                "address": "x",
                "age": 200
            })),
        )
        .unwrap_err();
        match err {
            AppError::InvalidInput(msg) => assert!(msg.contains("age")),
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn test_volunteer_age_accepts_numeric_string() {
        let profile =
            validate_profile(Role::Volunteer, map(json!({ "name": "A", "age": " 30 " }))).unwrap();
        assert_eq!(profile["age"], 30);

        let profile = validate_profile(Role::Volunteer, map(json!({ "name": "A", "age": "" }))).unwrap();
        assert!(profile.get("age").is_none());

        let err = validate_profile(Role::Volunteer, map(json!({ "name": "A", "age": "thirty" })))
            .unwrap_err();
        assert!(matches!(err, AppError::InvalidInput(_)));

        let err = validate_profile(Role::Volunteer, map(json!({ "name": "A", "age": "200" })))
            .unwrap_err();
        assert!(matches!(err, AppError::InvalidInput(_)));
    }

    #[test]
    fn test_organization_contact_fields_optional() {
        let profile =
            validate_profile(Role::Organization, map(json!({ "name": "Relief Org" }))).unwrap();
        assert_eq!(profile, json!({ "name": "Relief Org" }));
    }

    #[test]
    fn test_admin_profile_is_optional() {
        let profile = validate_profile(Role::Admin, Map::new()).unwrap();
        assert_eq!(profile, json!({}));
    }

    #[test]
    fn test_blank_name_rejected_after_trim() {
        let err = validate_profile(Role::GeneralUser, map(json!({ "name": "   " }))).unwrap_err();
        assert!(matches!(err, AppError::InvalidInput(_)));
    }

    #[test]
    fn test_account_view_hides_password_hash() {
        let account = NewAccount {
            role: Role::Admin,
            email: "a@b.com".to_string(),
            password_hash: "$argon2id$secret".to_string(),
            profile: json!({}),
        }
        .into_account(Uuid::new_v4(), Utc::now());

        let json = serde_json::to_value(AccountView::from(account)).unwrap();
        assert!(json.get("passwordHash").is_none());
        assert!(!json.to_string().contains("argon2"));
        assert_eq!(json["role"], "admin");
    }
}
