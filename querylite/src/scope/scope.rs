// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//

use crate::acl::{AclManager, Permission};
use crate::config::Config;
use crate::exec::error::ExecutionError;
use crate::logging::QueryLogger;
use crate::types::{Associative, Dict, Value};
use parking_lot::Mutex;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use uuid::Uuid;

type Destructor = Box<dyn FnOnce() + Send>;

/// Per-invocation evaluation environment
pub struct Scope {
    id: Uuid,
    config: Arc<Config>,
    bindings: Dict,
    acl: Arc<dyn AclManager>,
    logger: Arc<dyn QueryLogger>,
    destructors: Mutex<Vec<Destructor>>,
    closed: AtomicBool,
}

impl Scope {
    pub(crate) fn new(
        config: Arc<Config>,
        bindings: Dict,
        acl: Arc<dyn AclManager>,
        logger: Arc<dyn QueryLogger>,
    ) -> Self {
        let scope = Self {
            id: Uuid::new_v4(),
            config,
            bindings,
            acl,
            logger,
            destructors: Mutex::new(Vec::new()),
            closed: AtomicBool::new(false),
        };
        log::debug!(
            "Created scope {} for principal '{}'",
            scope.id,
            scope.acl.principal()
        );
        scope
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn acl(&self) -> &dyn AclManager {
        self.acl.as_ref()
    }

    pub fn logger(&self) -> &dyn QueryLogger {
        self.logger.as_ref()
    }

    /// Member names of a row, in the row's own order
    pub fn get_members(&self, row: &dyn Associative) -> Vec<String> {
        row.members()
    }

    /// Look up one member of a row
    pub fn associative(&self, row: &dyn Associative, name: &str) -> Option<Value> {
        row.associative(name)
    }

    /// Value bound to `name` in the environment
    pub fn resolve(&self, name: &str) -> Option<Value> {
        self.bindings.get(name).cloned()
    }

    /// Fail with `PermissionDenied` unless the principal holds `permission`
    pub fn check_access(&self, permission: Permission, operation: &str) -> Result<(), ExecutionError> {
        if self.acl.check_access(permission)? {
            return Ok(());
        }
        self.logger.warn(&format!(
            "{} denied: principal '{}' lacks {}",
            operation,
            self.acl.principal(),
            permission
        ));
        Err(ExecutionError::PermissionDenied {
            principal: self.acl.principal().to_string(),
            permission,
            operation: operation.to_string(),
        })
    }

    /// Register cleanup to run when the scope closes
    ///
    /// Destructors run in reverse registration order. A destructor added
    /// after close runs immediately.
    pub fn add_destructor(&self, destructor: impl FnOnce() + Send + 'static) {
        if self.is_closed() {
            log::debug!("Scope {} already closed, running destructor now", self.id);
            destructor();
            return;
        }
        self.destructors.lock().push(Box::new(destructor));
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    /// Run destructors and mark the scope closed; later calls do nothing
    pub fn close(&self) {
        if self.closed.swap(true, Ordering::SeqCst) {
            return;
        }
        let destructors = std::mem::take(&mut *self.destructors.lock());
        log::debug!(
            "Closing scope {} ({} destructors)",
            self.id,
            destructors.len()
        );
        for destructor in destructors.into_iter().rev() {
            destructor();
        }
    }
}

impl Drop for Scope {
    fn drop(&mut self) {
        self.close();
    }
}

impl fmt::Debug for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Scope")
            .field("id", &self.id)
            .field("principal", &self.acl.principal())
            .field("closed", &self.is_closed())
            .finish()
    }
}
