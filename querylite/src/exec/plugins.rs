// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Row source plugins
//!
//! A plugin turns its evaluated named arguments into a lazy row stream.
//! Plugins are registered by name in a `PluginRegistry`; the registry checks
//! argument names and permissions before a plugin runs, and wraps every
//! stream so it ends once the context is cancelled.

use crate::acl::Permission;
use crate::exec::context::Context;
use crate::exec::error::ExecutionError;
use crate::exec::row_stream::{Cancellable, RowStream};
use crate::logging::Component;
use crate::scope::Scope;
use crate::types::{Dict, Value};
use once_cell::sync::Lazy;
use std::collections::HashMap;
use std::fs::File;
use std::io::{BufRead, BufReader};

/// Registry shared by every evaluation
pub static DEFAULT_PLUGINS: Lazy<PluginRegistry> = Lazy::new(PluginRegistry::new);

/// A row source callable from a FROM clause
pub trait Plugin: Send + Sync + std::fmt::Debug {
    fn name(&self) -> &str;

    fn description(&self) -> &str;

    /// Accepted argument names
    fn argument_names(&self) -> &'static [&'static str];

    /// Permission the caller must hold, if any
    fn required_permission(&self) -> Option<Permission> {
        None
    }

    /// Open the row stream for one call
    fn open<'a>(&self, args: &PluginArgs, scope: &'a Scope) -> Result<RowStream<'a>, ExecutionError>;
}

/// Evaluated plugin arguments with typed accessors
#[derive(Debug)]
pub struct PluginArgs {
    plugin: String,
    values: Dict,
}

impl PluginArgs {
    pub fn new(plugin: &str, values: Dict) -> Self {
        Self {
            plugin: plugin.to_string(),
            values,
        }
    }

    fn invalid(&self, argument: &str, message: String) -> ExecutionError {
        ExecutionError::InvalidArgument {
            callee: format!("{}()", self.plugin),
            argument: argument.to_string(),
            message,
        }
    }

    /// Optional integer argument; NULL counts as absent
    pub fn int(&self, name: &str) -> Result<Option<i64>, ExecutionError> {
        match self.values.get(name) {
            None | Some(Value::Null) => Ok(None),
            Some(Value::Int(n)) => Ok(Some(*n)),
            Some(Value::Float(x)) if x.fract() == 0.0 && x.is_finite() => Ok(Some(*x as i64)),
            Some(other) => Err(self.invalid(
                name,
                format!("expected an integer, got {}", other.type_name()),
            )),
        }
    }

    /// Optional string argument; NULL counts as absent
    pub fn string(&self, name: &str) -> Result<Option<&str>, ExecutionError> {
        match self.values.get(name) {
            None | Some(Value::Null) => Ok(None),
            Some(Value::String(s)) => Ok(Some(s)),
            Some(other) => Err(self.invalid(
                name,
                format!("expected a string, got {}", other.type_name()),
            )),
        }
    }

    pub fn required_string(&self, name: &str) -> Result<&str, ExecutionError> {
        self.string(name)?
            .ok_or_else(|| self.invalid(name, "missing required argument".to_string()))
    }
}

/// Registry of all available plugins
#[derive(Debug)]
pub struct PluginRegistry {
    plugins: HashMap<String, Box<dyn Plugin + 'static>>,
}

impl PluginRegistry {
    pub fn new() -> Self {
        let mut registry = Self {
            plugins: HashMap::new(),
        };
        registry.register(Box::new(RangePlugin));
        registry.register(Box::new(EnvironPlugin));
        registry.register(Box::new(ReadFilePlugin));
        registry
    }

    pub fn register(&mut self, plugin: Box<dyn Plugin + 'static>) {
        self.plugins.insert(plugin.name().to_lowercase(), plugin);
    }

    pub fn get(&self, name: &str) -> Option<&dyn Plugin> {
        self.plugins.get(&name.to_lowercase()).map(|p| p.as_ref())
    }

    /// Validate a call and open its row stream
    pub fn call<'a>(
        &self,
        name: &str,
        arguments: Dict,
        ctx: &Context,
        scope: &'a Scope,
    ) -> Result<RowStream<'a>, ExecutionError> {
        let plugin = self
            .get(name)
            .ok_or_else(|| ExecutionError::UnknownPlugin(name.to_string()))?;

        if let Some(unexpected) = arguments
            .keys()
            .find(|arg| !plugin.argument_names().iter().any(|known| known == arg))
        {
            return Err(ExecutionError::InvalidArgument {
                callee: format!("{}()", plugin.name()),
                argument: unexpected.to_string(),
                message: "unexpected argument".to_string(),
            });
        }

        if let Some(permission) = plugin.required_permission() {
            scope.check_access(permission, &format!("{}()", plugin.name()))?;
        }

        log::debug!(
            target: Component::Vql.target(),
            "Opening plugin {}() in scope {}",
            plugin.name(),
            scope.id()
        );
        let rows = plugin.open(&PluginArgs::new(plugin.name(), arguments), scope)?;
        Ok(Box::new(Cancellable::new(rows, ctx)))
    }
}

impl Default for PluginRegistry {
    fn default() -> Self {
        Self::new()
    }
}

// ==============================================================================
// RANGE PLUGIN
// ==============================================================================

/// range(start=, end=, step=) - rows `{ "_value": n }`; unbounded without `end`
#[derive(Debug)]
pub struct RangePlugin;

struct RangeRows {
    next: Option<i64>,
    end: Option<i64>,
    step: i64,
}

impl Iterator for RangeRows {
    type Item = Result<Value, ExecutionError>;

    fn next(&mut self) -> Option<Self::Item> {
        let current = self.next?;
        let in_range = match self.end {
            Some(end) if self.step > 0 => current <= end,
            Some(end) => current >= end,
            None => true,
        };
        if !in_range {
            self.next = None;
            return None;
        }
        self.next = current.checked_add(self.step);
        Some(Ok(Value::Dict(Dict::new().set("_value", current))))
    }
}

impl Plugin for RangePlugin {
    fn name(&self) -> &str {
        "range"
    }

    fn description(&self) -> &str {
        "Generates integers from start to end inclusive"
    }

    fn argument_names(&self) -> &'static [&'static str] {
        &["start", "end", "step"]
    }

    fn open<'a>(&self, args: &PluginArgs, _scope: &'a Scope) -> Result<RowStream<'a>, ExecutionError> {
        let start = args.int("start")?.unwrap_or(0);
        let end = args.int("end")?;
        let step = args.int("step")?.unwrap_or(1);
        if step == 0 {
            return Err(args.invalid("step", "must not be zero".to_string()));
        }
        Ok(Box::new(RangeRows {
            next: Some(start),
            end,
            step,
        }))
    }
}

// ==============================================================================
// ENVIRON PLUGIN
// ==============================================================================

/// environ(var=) - rows `{ "Name", "Value" }` for process environment variables
#[derive(Debug)]
pub struct EnvironPlugin;

impl Plugin for EnvironPlugin {
    fn name(&self) -> &str {
        "environ"
    }

    fn description(&self) -> &str {
        "Lists process environment variables sorted by name"
    }

    fn argument_names(&self) -> &'static [&'static str] {
        &["var"]
    }

    fn required_permission(&self) -> Option<Permission> {
        Some(Permission::MachineState)
    }

    fn open<'a>(&self, args: &PluginArgs, _scope: &'a Scope) -> Result<RowStream<'a>, ExecutionError> {
        let mut vars: Vec<(String, String)> = match args.string("var")? {
            Some(name) => std::env::var_os(name)
                .map(|value| (name.to_string(), value.to_string_lossy().into_owned()))
                .into_iter()
                .collect(),
            None => std::env::vars_os()
                .map(|(name, value)| {
                    (
                        name.to_string_lossy().into_owned(),
                        value.to_string_lossy().into_owned(),
                    )
                })
                .collect(),
        };
        vars.sort();

        let rows = vars.into_iter().map(|(name, value)| -> Result<Value, ExecutionError> {
            Ok(Value::Dict(Dict::new().set("Name", name).set("Value", value)))
        });
        Ok(Box::new(rows))
    }
}

// ==============================================================================
// READ_FILE PLUGIN
// ==============================================================================

/// read_file(filename=) - rows `{ "Line": n, "Data": text }`, read lazily
#[derive(Debug)]
pub struct ReadFilePlugin;

impl Plugin for ReadFilePlugin {
    fn name(&self) -> &str {
        "read_file"
    }

    fn description(&self) -> &str {
        "Reads a UTF-8 text file line by line"
    }

    fn argument_names(&self) -> &'static [&'static str] {
        &["filename"]
    }

    fn required_permission(&self) -> Option<Permission> {
        Some(Permission::FilesystemRead)
    }

    fn open<'a>(&self, args: &PluginArgs, scope: &'a Scope) -> Result<RowStream<'a>, ExecutionError> {
        let filename = args.required_string("filename")?;
        let file = File::open(filename).map_err(|e| {
            ExecutionError::RuntimeError(format!("read_file(): cannot open '{}': {}", filename, e))
        })?;
        scope.logger().debug(&format!("read_file(): reading {}", filename));

        let lines = BufReader::new(file)
            .lines()
            .enumerate()
            .map(|(index, line)| -> Result<Value, ExecutionError> {
                let data = line?;
                Ok(Value::Dict(Dict::new().set("Line", index + 1).set("Data", data)))
            });
        Ok(Box::new(lines))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::acl::{NullAclManager, ServerAclManager};
    use crate::config::Config;
    use crate::scope::ScopeBuilder;
    use serial_test::serial;
    use std::io::Write;
    use std::sync::Arc;

    fn local_scope() -> Scope {
        ScopeBuilder::new(Arc::new(Config::default()), Arc::new(NullAclManager)).build()
    }

    fn values(rows: RowStream<'_>, key: &str) -> Vec<Value> {
        rows.map(|row| row.unwrap().as_dict().unwrap().get(key).cloned().unwrap())
            .collect()
    }

    #[test]
    fn test_range_inclusive_with_step() {
        let scope = local_scope();
        let args = Dict::new().set("start", 1).set("end", 9).set("step", 3);
        let rows = DEFAULT_PLUGINS
            .call("range", args, &Context::background(), &scope)
            .unwrap();
        assert_eq!(values(rows, "_value"), vec![Value::Int(1), Value::Int(4), Value::Int(7)]);
    }

    #[test]
    fn test_range_descending() {
        let scope = local_scope();
        let args = Dict::new().set("start", 3).set("end", 1).set("step", -1);
        let rows = DEFAULT_PLUGINS
            .call("range", args, &Context::background(), &scope)
            .unwrap();
        assert_eq!(values(rows, "_value"), vec![Value::Int(3), Value::Int(2), Value::Int(1)]);
    }

    #[test]
    fn test_range_without_end_stops_on_cancel() {
        let scope = local_scope();
        let (ctx, guard) = Context::background().with_cancel();
        let mut rows = DEFAULT_PLUGINS.call("range", Dict::new(), &ctx, &scope).unwrap();
        for _ in 0..1000 {
            assert!(rows.next().is_some());
        }
        guard.cancel();
        assert!(rows.next().is_none());
    }

    #[test]
    fn test_range_argument_errors() {
        let scope = local_scope();
        let ctx = Context::background();
        let err = DEFAULT_PLUGINS
            .call("range", Dict::new().set("step", 0), &ctx, &scope)
            .err()
            .unwrap();
        assert!(matches!(err, ExecutionError::InvalidArgument { .. }));

        let err = DEFAULT_PLUGINS
            .call("range", Dict::new().set("stop", 3), &ctx, &scope)
            .err()
            .unwrap();
        assert!(err.to_string().contains("stop"));

        let err = DEFAULT_PLUGINS
            .call("range", Dict::new().set("end", "x"), &ctx, &scope)
            .err()
            .unwrap();
        assert!(matches!(err, ExecutionError::InvalidArgument { .. }));
    }

    #[test]
    fn test_unknown_plugin() {
        let scope = local_scope();
        let err = DEFAULT_PLUGINS
            .call("nope", Dict::new(), &Context::background(), &scope)
            .err()
            .unwrap();
        assert!(matches!(err, ExecutionError::UnknownPlugin(_)));
    }

    #[test]
    #[serial]
    fn test_environ_single_variable() {
        std::env::set_var("QUERYLITE_ENVIRON_TEST", "yes");
        let scope = local_scope();
        let rows = DEFAULT_PLUGINS
            .call(
                "environ",
                Dict::new().set("var", "QUERYLITE_ENVIRON_TEST"),
                &Context::background(),
                &scope,
            )
            .unwrap();
        assert_eq!(values(rows, "Value"), vec![Value::from("yes")]);
        std::env::remove_var("QUERYLITE_ENVIRON_TEST");
    }

    #[test]
    fn test_environ_requires_machine_state() {
        let config = Config::default().with_user("analyst1", &["analyst"]);
        let acl = ServerAclManager::new(&config, "analyst1").unwrap();
        let scope = ScopeBuilder::new(Arc::new(config), Arc::new(acl)).build();
        let err = DEFAULT_PLUGINS
            .call("environ", Dict::new(), &Context::background(), &scope)
            .err()
            .unwrap();
        assert!(matches!(
            err,
            ExecutionError::PermissionDenied {
                permission: Permission::MachineState,
                ..
            }
        ));
    }

    #[test]
    fn test_read_file_lines() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "first").unwrap();
        writeln!(file, "second").unwrap();
        let path = file.path().to_string_lossy().into_owned();

        let scope = local_scope();
        let rows: Vec<Value> = DEFAULT_PLUGINS
            .call(
                "read_file",
                Dict::new().set("filename", path),
                &Context::background(),
                &scope,
            )
            .unwrap()
            .map(Result::unwrap)
            .collect();
        assert_eq!(
            rows,
            vec![
                Value::Dict(Dict::new().set("Line", 1).set("Data", "first")),
                Value::Dict(Dict::new().set("Line", 2).set("Data", "second")),
            ]
        );
    }

    #[test]
    fn test_read_file_missing() {
        let scope = local_scope();
        let err = DEFAULT_PLUGINS
            .call(
                "read_file",
                Dict::new().set("filename", "/definitely/not/here.txt"),
                &Context::background(),
                &scope,
            )
            .err()
            .unwrap();
        assert!(matches!(err, ExecutionError::RuntimeError(_)));
    }
}
