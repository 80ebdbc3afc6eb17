//! The authenticated caller and the capabilities it holds.

use std::fmt;

use serde::Serialize;

use crate::db::TokenPermissions;

/// A single operation class a tool may require.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum Capability {
    ReadTasks,
    CreateTasks,
    UpdateTasks,
    DeleteTasks,
    ReadCategories,
    CreateCategories,
}

impl Capability {
    /// Name of the permission flag backing this capability.
    pub fn as_str(&self) -> &'static str {
        match self {
            Capability::ReadTasks => "canReadTasks",
            Capability::CreateTasks => "canCreateTasks",
            Capability::UpdateTasks => "canUpdateTasks",
            Capability::DeleteTasks => "canDeleteTasks",
            Capability::ReadCategories => "canReadCategories",
            Capability::CreateCategories => "canCreateCategories",
        }
    }
}

impl fmt::Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What a principal is allowed to do.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Capabilities {
    /// Primary login credential: every capability.
    Full,
    /// Scoped API token: exactly the stored flags.
    Scoped(TokenPermissions),
}

impl Capabilities {
    pub fn allows(&self, capability: Capability) -> bool {
        let perms = match self {
            Capabilities::Full => return true,
            Capabilities::Scoped(perms) => perms,
        };
        match capability {
            Capability::ReadTasks => perms.can_read_tasks,
            Capability::CreateTasks => perms.can_create_tasks,
            Capability::UpdateTasks => perms.can_update_tasks,
            Capability::DeleteTasks => perms.can_delete_tasks,
            Capability::ReadCategories => perms.can_read_categories,
            Capability::CreateCategories => perms.can_create_categories,
        }
    }

    /// The flag set these capabilities amount to.
    pub fn permissions(&self) -> TokenPermissions {
        match self {
            Capabilities::Full => TokenPermissions::all(),
            Capabilities::Scoped(perms) => *perms,
        }
    }
}

/// An authenticated caller, fixed for the lifetime of the session it opens.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Principal {
    pub user_id: String,
    pub username: String,
    pub is_active: bool,
    pub capabilities: Capabilities,
    /// Id of the API token used, when authenticated with one.
    pub token_id: Option<String>,
}

impl Principal {
    pub fn can(&self, capability: Capability) -> bool {
        self.capabilities.allows(capability)
    }

    /// Whether two principals refer to the same account.
    pub fn same_user(&self, other: &Principal) -> bool {
        self.user_id == other.user_id
    }

    /// Short description of the credential kind, for logs.
    pub fn auth_method(&self) -> &'static str {
        match self.capabilities {
            Capabilities::Full => "login",
            Capabilities::Scoped(_) => "pat",
        }
    }
}
