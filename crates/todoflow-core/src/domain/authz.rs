//! Authorization - 権限と呼び出し元コンテキスト
//!
//! ActorContext は呼び出し側が作って渡すもので、コア内部では生成しません
//! （`guest()` は権限なしの明示的な既定値）。

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Permission {
    #[serde(rename = "todo:create")]
    TodoCreate,
    #[serde(rename = "todo:read")]
    TodoRead,
    #[serde(rename = "todo:update")]
    TodoUpdate,
    #[serde(rename = "todo:delete")]
    TodoDelete,
    #[serde(rename = "role:manage")]
    RoleManage,
    #[serde(rename = "permission:manage")]
    PermissionManage,
}

impl Permission {
    pub const ALL: [Permission; 6] = [
        Permission::TodoCreate,
        Permission::TodoRead,
        Permission::TodoUpdate,
        Permission::TodoDelete,
        Permission::RoleManage,
        Permission::PermissionManage,
    ];

    pub fn code(self) -> &'static str {
        match self {
            Permission::TodoCreate => "todo:create",
            Permission::TodoRead => "todo:read",
            Permission::TodoUpdate => "todo:update",
            Permission::TodoDelete => "todo:delete",
            Permission::RoleManage => "role:manage",
            Permission::PermissionManage => "permission:manage",
        }
    }
}

impl fmt::Display for Permission {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// Caller identity plus its resolved permission set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActorContext {
    pub user_id: String,
    #[serde(default)]
    pub roles: Vec<String>,
    #[serde(default)]
    pub permissions: BTreeSet<Permission>,
}

impl ActorContext {
    pub fn new(
        user_id: impl Into<String>,
        permissions: impl IntoIterator<Item = Permission>,
    ) -> Self {
        Self {
            user_id: user_id.into(),
            roles: Vec::new(),
            permissions: permissions.into_iter().collect(),
        }
    }

    pub fn with_roles(mut self, roles: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.roles = roles.into_iter().map(Into::into).collect();
        self
    }

    /// Anonymous caller with no permissions.
    pub fn guest() -> Self {
        Self::new("guest", [])
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("user '{user_id}' lacks permission '{permission}'")]
pub struct PermissionDenied {
    pub permission: Permission,
    pub user_id: String,
}

pub fn has_permission(actor: &ActorContext, permission: Permission) -> bool {
    actor.permissions.contains(&permission)
}

pub fn has_any_permission(actor: &ActorContext, permissions: &[Permission]) -> bool {
    permissions.iter().any(|p| has_permission(actor, *p))
}

pub fn has_all_permissions(actor: &ActorContext, permissions: &[Permission]) -> bool {
    permissions.iter().all(|p| has_permission(actor, *p))
}

pub fn require_permission(
    actor: &ActorContext,
    permission: Permission,
) -> Result<(), PermissionDenied> {
    if has_permission(actor, permission) {
        Ok(())
    } else {
        Err(PermissionDenied {
            permission,
            user_id: actor.user_id.clone(),
        })
    }
}
