//! In-process permission store.
//!
//! Hosts with their own permission system implement
//! [`invlock_core::PermissionCheck`] directly; this store covers embedded
//! use and tests. Permissions must be registered before they can be granted.

use std::collections::{HashMap, HashSet};

use invlock_core::types::{Permission, UserId};
use invlock_core::PermissionCheck;
use parking_lot::RwLock;
use tracing::{debug, warn};

/// Registered permissions and per-user grants.
#[derive(Debug, Default)]
pub struct PermissionStore {
    registered: RwLock<HashSet<Permission>>,
    grants: RwLock<HashMap<UserId, HashSet<Permission>>>,
}

impl PermissionStore {
    /// Empty store with nothing registered.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register both plugin permissions.
    pub fn register_all(&self) {
        let mut registered = self.registered.write();
        for permission in Permission::ALL {
            if registered.insert(permission) {
                debug!(permission = %permission, "Permission registered");
            }
        }
    }

    /// Whether `permission` is registered.
    #[must_use]
    pub fn is_registered(&self, permission: Permission) -> bool {
        self.registered.read().contains(&permission)
    }

    /// Grant `permission` to `user`. Returns `false` if the permission is not
    /// registered.
    pub fn grant(&self, user: UserId, permission: Permission) -> bool {
        if !self.is_registered(permission) {
            warn!(permission = %permission, "Grant of unregistered permission ignored");
            return false;
        }
        self.grants.write().entry(user).or_default().insert(permission);
        true
    }

    /// Revoke `permission` from `user`.
    pub fn revoke(&self, user: UserId, permission: Permission) {
        if let Some(set) = self.grants.write().get_mut(&user) {
            set.remove(&permission);
        }
    }
}

impl PermissionCheck for PermissionStore {
    fn has_permission(&self, user: UserId, permission: Permission) -> bool {
        self.grants
            .read()
            .get(&user)
            .is_some_and(|set| set.contains(&permission))
    }
}
