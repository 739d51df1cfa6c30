// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Built-in role definitions

use super::Permission;

const INVESTIGATOR: &[Permission] = &[Permission::MachineState, Permission::FilesystemRead];

const ANALYST: &[Permission] = &[Permission::FilesystemRead];

// queries over bindings and generated rows only
const READER: &[Permission] = &[];

/// Permissions granted by a built-in role, or `None` if the role is not built in
pub fn builtin_role(name: &str) -> Option<&'static [Permission]> {
    match name {
        "administrator" => Some(Permission::all()),
        "investigator" => Some(INVESTIGATOR),
        "analyst" => Some(ANALYST),
        "reader" => Some(READER),
        _ => None,
    }
}
