// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Access control for query evaluation
//!
//! An `AclManager` is attached to every `Scope`. The evaluator consults it
//! before running privileged plugins and functions; the execution pipeline
//! itself only wires it in.

pub mod manager;
pub mod roles;

pub use manager::{NullAclManager, ServerAclManager};

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Access control errors
#[derive(Error, Debug, Clone, PartialEq)]
pub enum AclError {
    #[error("Invalid principal: {0}")]
    InvalidPrincipal(String),

    #[error("Unknown role: {0}")]
    UnknownRole(String),
}

/// Privileges a query may require
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Permission {
    /// Inspect the state of the host (environment, processes)
    MachineState,
    /// Read files from the local filesystem
    FilesystemRead,
}

impl Permission {
    pub fn all() -> &'static [Permission] {
        &[Permission::MachineState, Permission::FilesystemRead]
    }

    pub fn name(&self) -> &'static str {
        match self {
            Permission::MachineState => "MACHINE_STATE",
            Permission::FilesystemRead => "FILESYSTEM_READ",
        }
    }
}

impl fmt::Display for Permission {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Permission checks for one principal
pub trait AclManager: Send + Sync + fmt::Debug {
    /// Name of the principal the checks are made for
    fn principal(&self) -> &str;

    /// Whether the principal holds `permission`
    fn check_access(&self, permission: Permission) -> Result<bool, AclError>;
}
