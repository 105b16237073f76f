//! User domain model — a platform account linked 1:1 to a member.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::member::{FamilyBranch, FamilyRelationship};

/// Account review status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum UserStatus {
    #[serde(rename = "قيد المراجعة")]
    Pending,
    #[serde(rename = "مقبول")]
    Accepted,
    #[serde(rename = "مرفوض")]
    Rejected,
}

impl UserStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            UserStatus::Pending => "قيد المراجعة",
            UserStatus::Accepted => "مقبول",
            UserStatus::Rejected => "مرفوض",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "قيد المراجعة" => Some(UserStatus::Pending),
            "مقبول" => Some(UserStatus::Accepted),
            "مرفوض" => Some(UserStatus::Rejected),
            _ => None,
        }
    }
}

/// One of the four capability flags a permission grant can carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PermissionAction {
    View,
    Create,
    Update,
    Delete,
}

impl PermissionAction {
    /// Name of the boolean field holding this flag on a grant.
    pub fn as_field(&self) -> &'static str {
        match self {
            PermissionAction::View => "view",
            PermissionAction::Create => "create",
            PermissionAction::Update => "update",
            PermissionAction::Delete => "delete",
        }
    }
}

/// Capabilities a user holds on one entity type.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PermissionGrant {
    pub entity: String,
    #[serde(default)]
    pub view: bool,
    #[serde(default)]
    pub create: bool,
    #[serde(default)]
    pub update: bool,
    #[serde(default)]
    pub delete: bool,
}

impl PermissionGrant {
    pub fn allows(&self, action: PermissionAction) -> bool {
        match action {
            PermissionAction::View => self.view,
            PermissionAction::Create => self.create,
            PermissionAction::Update => self.update,
            PermissionAction::Delete => self.delete,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: Uuid,
    pub tenant_id: Uuid,
    pub member_id: Uuid,
    pub email: String,
    pub password_hash: String,
    pub phone: String,
    pub roles: Vec<String>,
    pub family_branch: FamilyBranch,
    pub family_relationship: FamilyRelationship,
    pub status: UserStatus,
    pub address: Option<String>,
    pub permissions: Vec<PermissionGrant>,
    /// SHA-256 hex hash of the outstanding password-reset token.
    pub reset_token_hash: Option<String>,
    pub reset_token_expires_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    pub fn has_role(&self, role: &str) -> bool {
        self.roles.iter().any(|r| r == role)
    }

    pub fn has_any_role(&self, roles: &[&str]) -> bool {
        roles.iter().any(|r| self.has_role(r))
    }

    pub fn can(&self, entity: &str, action: PermissionAction) -> bool {
        self.permissions
            .iter()
            .any(|g| g.entity == entity && g.allows(action))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateUser {
    pub tenant_id: Uuid,
    pub member_id: Uuid,
    pub email: String,
    /// Raw password (hashed with Argon2id before storage).
    pub password: String,
    pub phone: String,
    pub roles: Vec<String>,
    pub family_branch: FamilyBranch,
    pub family_relationship: FamilyRelationship,
    pub address: Option<String>,
    pub permissions: Vec<PermissionGrant>,
}
