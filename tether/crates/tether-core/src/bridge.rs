//! Bridge context
//!
//! [`Tether`] ties a host runtime, a configuration and a class registry
//! together and is the usual way collaborators construct native objects.

use crate::class::{ClassInfo, ClassRegistry};
use crate::config::TetherConfig;
use crate::error::Result;
use crate::handle::HostRuntime;
use crate::mode::PersistenceMode;
use crate::object::NativeObject;
use std::sync::Arc;

pub struct Tether<H: HostRuntime> {
    host: Arc<H>,
    config: Arc<TetherConfig>,
    classes: ClassRegistry,
}

impl<H: HostRuntime> Tether<H> {
    /// Create a bridge with default configuration
    pub fn new(host: Arc<H>) -> Self {
        Self {
            host,
            config: Arc::new(TetherConfig::default()),
            classes: ClassRegistry::new(),
        }
    }

    /// Create a bridge with the given configuration
    pub fn with_config(host: Arc<H>, config: TetherConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            host,
            config: Arc::new(config),
            classes: ClassRegistry::new(),
        })
    }

    pub fn host(&self) -> &Arc<H> {
        &self.host
    }

    pub fn config(&self) -> &TetherConfig {
        &self.config
    }

    pub fn classes(&self) -> &ClassRegistry {
        &self.classes
    }

    /// Register a class using the configured default mode
    pub fn register_class(&self, name: &str) -> Result<Arc<ClassInfo>> {
        self.classes
            .register(ClassInfo::new(name, self.config.default_mode))
    }

    /// Construct a native object for `managed` with an explicit mode
    pub fn construct(
        &self,
        class: &str,
        mode: PersistenceMode,
        managed: &H::Local,
    ) -> Result<Arc<NativeObject<H>>> {
        let class = self.classes.get(class)?;
        Ok(NativeObject::construct(
            Arc::clone(&self.host),
            class,
            mode,
            managed,
            Arc::clone(&self.config),
        ))
    }

    /// Construct a native object for `managed` using its class's mode
    pub fn wrap(&self, class: &str, managed: &H::Local) -> Result<Arc<NativeObject<H>>> {
        let class = self.classes.get(class)?;
        let mode = class.mode();
        Ok(NativeObject::construct(
            Arc::clone(&self.host),
            class,
            mode,
            managed,
            Arc::clone(&self.config),
        ))
    }
}
