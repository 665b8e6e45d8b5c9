use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize, Deserialize)]
pub struct JwtHeader {
    pub alg: String,
    pub typ: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct JwtClaims {
    pub sub: String,
    pub exp: Option<u64>,
    pub email: Option<String>,
    pub role: Option<String>,
    pub app_metadata: Option<serde_json::Value>,
    pub user_metadata: Option<serde_json::Value>,
    pub aud: Option<String>,
    pub iat: Option<u64>,
}

/// Roles the clinic backend distinguishes between. Customers book for
/// themselves; staff book on behalf of customers; dentists decide on
/// their own appointments; admins manage working rules.
pub const ROLE_CUSTOMER: &str = "customer";
pub const ROLE_DENTIST: &str = "dentist";
pub const ROLE_STAFF: &str = "staff";
pub const ROLE_ADMIN: &str = "admin";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    pub email: Option<String>,
    pub role: Option<String>,
    pub metadata: Option<serde_json::Value>,
    pub created_at: Option<DateTime<Utc>>,
}

impl User {
    pub fn has_role(&self, role: &str) -> bool {
        self.role.as_deref() == Some(role)
    }

    pub fn is_admin(&self) -> bool {
        self.has_role(ROLE_ADMIN)
    }

    pub fn is_staff(&self) -> bool {
        self.has_role(ROLE_STAFF)
    }

    pub fn is_dentist(&self) -> bool {
        self.has_role(ROLE_DENTIST)
    }

    pub fn is_customer(&self) -> bool {
        self.has_role(ROLE_CUSTOMER)
    }

    /// Staff and admins act on behalf of other users.
    pub fn can_act_for_others(&self) -> bool {
        self.is_staff() || self.is_admin()
    }
}
