// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//

use super::Scope;
use crate::acl::{AclError, AclManager, ServerAclManager};
use crate::config::Config;
use crate::logging::{Component, PlainLogger, QueryLogger};
use crate::types::Dict;
use std::sync::Arc;

/// Inputs for building a `Scope`
pub struct ScopeBuilder {
    pub config: Arc<Config>,
    pub env: Dict,
    pub acl_manager: Arc<dyn AclManager>,
    pub logger: Arc<dyn QueryLogger>,
}

impl ScopeBuilder {
    /// Builder with an empty environment and a plain tool logger
    pub fn new(config: Arc<Config>, acl_manager: Arc<dyn AclManager>) -> Self {
        Self {
            config,
            env: Dict::new(),
            acl_manager,
            logger: Arc::new(PlainLogger::new(Component::Tool)),
        }
    }

    /// Builder whose ACL manager is resolved for `principal` from the config
    pub fn for_principal(
        config: Arc<Config>,
        principal: &str,
        env: Dict,
        logger: Arc<dyn QueryLogger>,
    ) -> Result<Self, AclError> {
        let acl_manager = ServerAclManager::new(&config, principal)?;
        Ok(Self {
            config,
            env,
            acl_manager: Arc::new(acl_manager),
            logger,
        })
    }

    pub fn with_env(mut self, env: Dict) -> Self {
        self.env = env;
        self
    }

    pub fn with_logger(mut self, logger: Arc<dyn QueryLogger>) -> Self {
        self.logger = logger;
        self
    }

    pub fn build(self) -> Scope {
        Scope::new(self.config, self.env, self.acl_manager, self.logger)
    }
}
