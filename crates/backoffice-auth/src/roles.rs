//! Signed-in user profile and back-office roles
//!
//! The backend returns the user object at login; only the role id matters to
//! the client, everything else is carried through untouched.

use serde::{Deserialize, Serialize};

pub const SUPER_USER_ROLE_ID: &str = "09f145c3-9bcc-4573-aa43-7f72f033a28f";
pub const ADMIN_ROLE_ID: &str = "e5c7c4cf-713c-4327-866b-4ee54cb76246";
pub const DATA_ENTRY_ROLE_ID: &str = "0a68bf0d-1458-45cc-97dc-e89f1b5562ab";

/// Back-office roles known to the client.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    SuperUser,
    Admin,
    /// Capture-only operator
    DataEntry,
}

impl Role {
    pub fn from_id(id: &str) -> Option<Self> {
        match id {
            SUPER_USER_ROLE_ID => Some(Role::SuperUser),
            ADMIN_ROLE_ID => Some(Role::Admin),
            DATA_ENTRY_ROLE_ID => Some(Role::DataEntry),
            _ => None,
        }
    }

    pub fn id(&self) -> &'static str {
        match self {
            Role::SuperUser => SUPER_USER_ROLE_ID,
            Role::Admin => ADMIN_ROLE_ID,
            Role::DataEntry => DATA_ENTRY_ROLE_ID,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Role::SuperUser => "super_user",
            Role::Admin => "admin",
            Role::DataEntry => "data_entry",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoleRef {
    pub id: String,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

/// The user object stored next to the credentials.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionUser {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<RoleRef>,
    #[serde(flatten)]
    pub profile: serde_json::Map<String, serde_json::Value>,
}

impl SessionUser {
    pub fn role_id(&self) -> Option<&str> {
        self.role.as_ref().map(|r| r.id.as_str())
    }

    pub fn role(&self) -> Option<Role> {
        self.role_id().and_then(Role::from_id)
    }

    pub fn is_super_user(&self) -> bool {
        self.role() == Some(Role::SuperUser)
    }

    pub fn is_admin(&self) -> bool {
        self.role() == Some(Role::Admin)
    }

    pub fn is_data_entry(&self) -> bool {
        self.role() == Some(Role::DataEntry)
    }

    /// Super users and admins may manage every record.
    pub fn can_manage_all(&self) -> bool {
        matches!(self.role(), Some(Role::SuperUser | Role::Admin))
    }
}
