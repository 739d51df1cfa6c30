// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! ACL manager implementations

use super::roles::builtin_role;
use super::{AclError, AclManager, Permission};
use crate::config::Config;
use std::collections::HashSet;

/// ACL manager resolving a principal's roles from configuration
#[derive(Debug, Clone)]
pub struct ServerAclManager {
    principal: String,
    roles: Vec<String>,
    permissions: HashSet<Permission>,
}

impl ServerAclManager {
    /// Build the manager for `principal`
    ///
    /// An empty or malformed principal is rejected. A well-formed principal
    /// that is not listed in the configuration holds no permissions.
    pub fn new(config: &Config, principal: &str) -> Result<Self, AclError> {
        validate_principal(principal)?;

        let roles = match config.acl.users.get(principal) {
            Some(roles) => roles.clone(),
            None => {
                log::debug!("Principal '{}' has no configured roles", principal);
                Vec::new()
            }
        };

        let mut permissions = HashSet::new();
        for role in &roles {
            if let Some(configured) = config.acl.roles.get(role) {
                permissions.extend(configured.iter().copied());
            } else if let Some(builtin) = builtin_role(role) {
                permissions.extend(builtin.iter().copied());
            } else {
                return Err(AclError::UnknownRole(role.clone()));
            }
        }

        Ok(Self {
            principal: principal.to_string(),
            roles,
            permissions,
        })
    }

    pub fn roles(&self) -> &[String] {
        &self.roles
    }
}

impl AclManager for ServerAclManager {
    fn principal(&self) -> &str {
        &self.principal
    }

    fn check_access(&self, permission: Permission) -> Result<bool, AclError> {
        Ok(self.permissions.contains(&permission))
    }
}

/// ACL manager granting every permission
///
/// For trusted local tooling only; server entry points always go through
/// `ServerAclManager`.
#[derive(Debug, Clone, Default)]
pub struct NullAclManager;

impl AclManager for NullAclManager {
    fn principal(&self) -> &str {
        "<local>"
    }

    fn check_access(&self, _permission: Permission) -> Result<bool, AclError> {
        Ok(true)
    }
}

fn validate_principal(principal: &str) -> Result<(), AclError> {
    if principal.trim().is_empty() {
        return Err(AclError::InvalidPrincipal(
            "principal must not be empty".to_string(),
        ));
    }
    if let Some(c) = principal
        .chars()
        .find(|c| !(c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | '@' | '-')))
    {
        return Err(AclError::InvalidPrincipal(format!(
            "'{}' contains invalid character {:?}",
            principal, c
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_role_permissions() {
        let config = Config::default().with_user("alice", &["analyst"]);
        let acl = ServerAclManager::new(&config, "alice").unwrap();

        assert_eq!(acl.principal(), "alice");
        assert!(acl.check_access(Permission::FilesystemRead).unwrap());
        assert!(!acl.check_access(Permission::MachineState).unwrap());
    }

    #[test]
    fn test_configured_role_overrides_builtin() {
        let mut config = Config::default().with_user("bob", &["reader"]);
        config
            .acl
            .roles
            .insert("reader".to_string(), vec![Permission::MachineState]);

        let acl = ServerAclManager::new(&config, "bob").unwrap();
        assert!(acl.check_access(Permission::MachineState).unwrap());
        assert!(!acl.check_access(Permission::FilesystemRead).unwrap());
    }

    #[test]
    fn test_unknown_principal_has_no_permissions() {
        let acl = ServerAclManager::new(&Config::default(), "stranger").unwrap();
        assert!(acl.roles().is_empty());
        for perm in Permission::all() {
            assert!(!acl.check_access(*perm).unwrap());
        }
    }

    #[test]
    fn test_empty_principal_is_rejected() {
        let result = ServerAclManager::new(&Config::default(), "  ");
        assert!(matches!(result, Err(AclError::InvalidPrincipal(_))));
    }

    #[test]
    fn test_malformed_principal_is_rejected() {
        let result = ServerAclManager::new(&Config::default(), "admin\n");
        assert!(matches!(result, Err(AclError::InvalidPrincipal(_))));
        let result = ServerAclManager::new(&Config::default(), "a b");
        assert!(result.is_err());
    }

    #[test]
    fn test_unknown_role_is_rejected() {
        let config = Config::default().with_user("carol", &["wizard"]);
        let result = ServerAclManager::new(&config, "carol");
        assert_eq!(result.unwrap_err(), AclError::UnknownRole("wizard".to_string()));
    }

    #[test]
    fn test_null_manager_allows_all() {
        let acl = NullAclManager;
        assert!(acl.check_access(Permission::MachineState).unwrap());
    }
}
