//! Session identity derived from a bearer token.

use std::fmt;

use chrono::{DateTime, Utc};

use super::AuthError;
use super::jwt::decode_claims;

/// Role name granting full administrative access.
pub const ROLE_ADMIN: &str = "Admin";
/// Role name granting support access.
pub const ROLE_SUPPORT: &str = "Support";

/// User role carried in the `role` claim.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Role {
    Admin,
    Support,
    Other(String),
}

impl Role {
    pub fn from_claim(value: &str) -> Self {
        match value {
            ROLE_ADMIN => Role::Admin,
            ROLE_SUPPORT => Role::Support,
            other => Role::Other(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Role::Admin => ROLE_ADMIN,
            Role::Support => ROLE_SUPPORT,
            Role::Other(name) => name,
        }
    }

    /// Admin and Support may read full access point records.
    pub fn has_full_permission(&self) -> bool {
        matches!(self, Role::Admin | Role::Support)
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The authenticated identity.
#[derive(Clone, PartialEq, Eq)]
pub struct Session {
    pub subject_id: String,
    pub role: Role,
    pub email: String,
    pub display_name: String,
    /// Raw bearer token the identity was decoded from.
    pub token: String,
    pub expires_at: Option<DateTime<Utc>>,
}

impl Session {
    /// Derive a session from a bearer token.
    ///
    /// Only an undecodable token fails. Absent claims map to empty fields.
    pub fn from_token(token: &str) -> Result<Self, AuthError> {
        let claims = decode_claims(token)?;

        Ok(Self {
            subject_id: claims.nameid.unwrap_or_default(),
            role: Role::from_claim(claims.role.as_deref().unwrap_or_default()),
            email: claims.email.unwrap_or_default(),
            display_name: claims.unique_name.unwrap_or_default(),
            token: token.to_string(),
            expires_at: claims.exp.and_then(|exp| DateTime::from_timestamp(exp, 0)),
        })
    }

    /// `Authorization` header value.
    pub fn bearer(&self) -> String {
        format!("Bearer {}", self.token)
    }
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("subject_id", &self.subject_id)
            .field("role", &self.role)
            .field("email", &self.email)
            .field("display_name", &self.display_name)
            .field("token", &"<redacted>")
            .field("expires_at", &self.expires_at)
            .finish()
    }
}
