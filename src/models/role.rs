//! Actor roles

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// The four kinds of account the platform knows about.
///
/// Every role shares one credential flow; only the profile document differs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    Volunteer,
    GeneralUser,
    Organization,
}

impl Role {
    pub const ALL: [Role; 4] = [
        Role::Admin,
        Role::Volunteer,
        Role::GeneralUser,
        Role::Organization,
    ];

    /// Path segment and storage tag
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::Volunteer => "volunteer",
            Role::GeneralUser => "generaluser",
            Role::Organization => "organization",
        }
    }

    /// Human readable name used in response messages
    pub fn display_name(&self) -> &'static str {
        match self {
            Role::Admin => "Admin",
            Role::Volunteer => "Volunteer",
            Role::GeneralUser => "User",
            Role::Organization => "Organization",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown role: {0}")]
pub struct UnknownRole(pub String);

impl FromStr for Role {
    type Err = UnknownRole;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "admin" => Ok(Role::Admin),
            "volunteer" => Ok(Role::Volunteer),
            "generaluser" | "general-user" | "general_user" | "user" => Ok(Role::GeneralUser),
            "organization" | "organisation" => Ok(Role::Organization),
            _ => Err(UnknownRole(s.to_string())),
        }
    }
}

/// Operation requested through the legacy `/api/auth/{action}` endpoints
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LegacyAction {
    Login(Role),
    Register(Role),
}

impl FromStr for LegacyAction {
    type Err = UnknownRole;

    /// Accepts `volunteer-login` style and `registerVolunteer` style names.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if let Some(role) = s.strip_suffix("-login") {
            return role.parse().map(LegacyAction::Login);
        }
        if let Some(role) = s.strip_prefix("register") {
            return role.parse().map(LegacyAction::Register);
        }
        Err(UnknownRole(s.to_string()))
    }
}
