// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Evaluation environment
//!
//! A `Scope` is built once per query invocation. It carries the caller's
//! bindings, the ACL manager and logger for the principal, and the
//! destructors registered while the query runs. Closing the scope runs the
//! destructors; dropping an open scope closes it.

mod builder;
#[allow(clippy::module_inception)]
mod scope;

pub use builder::ScopeBuilder;
pub use scope::Scope;
