// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Execution error types

use crate::acl::{AclError, Permission};
use thiserror::Error;

/// Errors raised while evaluating a query
#[derive(Error, Debug)]
pub enum ExecutionError {
    #[error("Expression evaluation error: {0}")]
    ExpressionError(String),

    #[error("Type error: {0}")]
    TypeError(String),

    #[error("Runtime error: {0}")]
    RuntimeError(String),

    #[error("Permission denied: {principal} lacks {permission} required by {operation}")]
    PermissionDenied {
        principal: String,
        permission: Permission,
        operation: String,
    },

    #[error("Access control error: {0}")]
    AclError(#[from] AclError),

    #[error("Unknown function: {0}")]
    UnknownFunction(String),

    #[error("Unknown plugin: {0}")]
    UnknownPlugin(String),

    #[error("Unknown row source: {0}")]
    UnknownSource(String),

    #[error("Invalid argument '{argument}' for {callee}: {message}")]
    InvalidArgument {
        callee: String,
        argument: String,
        message: String,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
