// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Function execution system for expression evaluation
//!
//! Functions implement the `Function` trait and are registered by name in a
//! `FunctionRegistry`. Names are case-insensitive.

mod function_trait;
mod list_functions;
mod special_functions;
mod string_functions;
mod temporal_functions;

pub use function_trait::{Function, FunctionContext, FunctionError, FunctionResult};

use crate::exec::error::ExecutionError;
use crate::scope::Scope;
use crate::types::{Dict, Value};
use once_cell::sync::Lazy;
use std::collections::HashMap;

/// Registry shared by every evaluation
pub static DEFAULT_REGISTRY: Lazy<FunctionRegistry> = Lazy::new(FunctionRegistry::new);

/// Registry of all available functions
#[derive(Debug)]
pub struct FunctionRegistry {
    functions: HashMap<String, Box<dyn Function + 'static>>,
}

impl FunctionRegistry {
    /// Create a new function registry with the built-in functions
    pub fn new() -> Self {
        let mut registry = Self {
            functions: HashMap::new(),
        };

        registry.register("upper", Box::new(string_functions::UpperFunction::new()));
        registry.register("lower", Box::new(string_functions::LowerFunction::new()));
        registry.register("str", Box::new(string_functions::StrFunction::new()));
        registry.register("format", Box::new(string_functions::FormatFunction::new()));

        registry.register("len", Box::new(list_functions::LenFunction::new()));
        registry.register("dict", Box::new(list_functions::DictFunction::new()));

        registry.register("if", Box::new(special_functions::IfFunction::new()));
        registry.register("getenv", Box::new(special_functions::GetenvFunction::new()));

        registry.register("now", Box::new(temporal_functions::NowFunction::new()));
        registry.register(
            "timestamp",
            Box::new(temporal_functions::TimestampFunction::new()),
        );

        registry
    }

    /// Register a new function
    pub fn register(&mut self, name: &str, function: Box<dyn Function + 'static>) {
        self.functions.insert(name.to_lowercase(), function);
    }

    /// Get a function by name
    pub fn get(&self, name: &str) -> Option<&dyn Function> {
        self.functions.get(&name.to_lowercase()).map(|f| f.as_ref())
    }

    /// Get all available function names
    pub fn function_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.functions.keys().cloned().collect();
        names.sort();
        names
    }

    /// Look up, validate and execute a function call
    ///
    /// Argument names are checked against the function's signature and the
    /// caller's permission is checked before the function runs.
    pub fn call(&self, name: &str, arguments: Dict, scope: &Scope) -> Result<Value, ExecutionError> {
        let function = self
            .get(name)
            .ok_or_else(|| ExecutionError::UnknownFunction(name.to_string()))?;

        if !function.is_variadic() {
            if let Some(unexpected) = arguments
                .keys()
                .find(|arg| !function.argument_names().iter().any(|known| known == arg))
            {
                return Err(FunctionError::UnexpectedArgument {
                    argument: unexpected.to_string(),
                }
                .into_execution_error(function.name()));
            }
        }

        if let Some(permission) = function.required_permission() {
            scope.check_access(permission, &format!("{}()", function.name()))?;
        }

        let context = FunctionContext::new(arguments, scope);
        function
            .execute(&context)
            .map_err(|e| e.into_execution_error(function.name()))
    }
}

impl Default for FunctionRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
pub(crate) fn test_scope() -> Scope {
    use crate::acl::NullAclManager;
    use crate::config::Config;
    use crate::scope::ScopeBuilder;
    use std::sync::Arc;

    ScopeBuilder::new(Arc::new(Config::default()), Arc::new(NullAclManager)).build()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::acl::ServerAclManager;
    use crate::config::Config;
    use crate::scope::ScopeBuilder;
    use std::sync::Arc;

    #[test]
    fn test_lookup_is_case_insensitive() {
        let registry = FunctionRegistry::new();
        assert!(registry.get("upper").is_some());
        assert!(registry.get("UPPER").is_some());
        assert!(registry.get("Format").is_some());
        assert!(registry.get("nope").is_none());
    }

    #[test]
    fn test_call_unknown_function() {
        let scope = test_scope();
        let err = DEFAULT_REGISTRY.call("nope", Dict::new(), &scope).unwrap_err();
        assert!(matches!(err, ExecutionError::UnknownFunction(name) if name == "nope"));
    }

    #[test]
    fn test_call_rejects_unexpected_argument() {
        let scope = test_scope();
        let err = DEFAULT_REGISTRY
            .call("upper", Dict::new().set("text", "a"), &scope)
            .unwrap_err();
        assert!(
            matches!(err, ExecutionError::InvalidArgument { ref argument, .. } if argument == "text")
        );
    }

    #[test]
    fn test_call_type_error() {
        let scope = test_scope();
        let err = DEFAULT_REGISTRY
            .call("lower", Dict::new().set("string", 3), &scope)
            .unwrap_err();
        assert!(matches!(err, ExecutionError::TypeError(_)));
    }

    #[test]
    fn test_call_checks_permission() {
        let config = Config::default().with_user("reader1", &["reader"]);
        let acl = ServerAclManager::new(&config, "reader1").unwrap();
        let scope = ScopeBuilder::new(Arc::new(config), Arc::new(acl)).build();

        let err = DEFAULT_REGISTRY
            .call("getenv", Dict::new().set("var", "PATH"), &scope)
            .unwrap_err();
        assert!(matches!(
            err,
            ExecutionError::PermissionDenied {
                permission: crate::acl::Permission::MachineState,
                ..
            }
        ));
    }

    #[test]
    fn test_function_names_sorted() {
        let names = FunctionRegistry::new().function_names();
        assert_eq!(names.first().map(String::as_str), Some("dict"));
        assert!(names.contains(&"timestamp".to_string()));
    }
}
