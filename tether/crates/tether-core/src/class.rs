//! Class registry
//!
//! Every native object is bound to a registered class. A class carries its
//! default persistence mode, an optional base class, and the instance and
//! static methods the method proxy is allowed to forward.
//!
//! Names are canonicalized to slash-separated form (`ag.example.Widget`
//! becomes `ag/example/Widget`), so either spelling finds the same class.

use crate::error::{Result, TetherError};
use crate::mode::PersistenceMode;
use indexmap::IndexMap;
use parking_lot::RwLock;
use rustc_hash::FxHashMap;
use std::sync::Arc;

/// Normalize a dotted class name to slash-separated form
pub fn canonical_name(name: &str) -> String {
    name.replace('.', "/")
}

/// A method the proxy may forward to the managed side
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MethodSpec {
    pub name: String,
    pub is_static: bool,
}

/// Registered class description
#[derive(Debug, Clone)]
pub struct ClassInfo {
    name: String,
    base: Option<Arc<ClassInfo>>,
    mode: PersistenceMode,
    methods: FxHashMap<String, MethodSpec>,
}

impl ClassInfo {
    pub fn new(name: &str, mode: PersistenceMode) -> Self {
        Self {
            name: canonical_name(name),
            base: None,
            mode,
            methods: FxHashMap::default(),
        }
    }

    /// Register an instance method
    pub fn with_method(mut self, name: &str) -> Self {
        self.add_method(name, false);
        self
    }

    /// Register a static method
    pub fn with_static_method(mut self, name: &str) -> Self {
        self.add_method(name, true);
        self
    }

    fn add_method(&mut self, name: &str, is_static: bool) {
        self.methods.insert(
            name.to_string(),
            MethodSpec {
                name: name.to_string(),
                is_static,
            },
        );
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn base(&self) -> Option<&Arc<ClassInfo>> {
        self.base.as_ref()
    }

    pub fn mode(&self) -> PersistenceMode {
        self.mode
    }

    /// Find a method on this class or the nearest base that declares it
    ///
    /// Returns the declaring class together with the method.
    pub fn find_method(&self, name: &str) -> Option<(&ClassInfo, &MethodSpec)> {
        let mut class = Some(self);
        while let Some(current) = class {
            if let Some(method) = current.methods.get(name) {
                return Some((current, method));
            }
            class = current.base.as_deref();
        }
        None
    }

    /// Topmost class in the inheritance chain
    pub fn root(&self) -> &ClassInfo {
        let mut class = self;
        while let Some(base) = class.base.as_deref() {
            class = base;
        }
        class
    }

    /// Whether this class is `name` or derives from it
    pub fn is_a(&self, name: &str) -> bool {
        let name = canonical_name(name);
        let mut class = Some(self);
        while let Some(current) = class {
            if current.name == name {
                return true;
            }
            class = current.base.as_deref();
        }
        false
    }
}

/// Thread-safe table of registered classes, kept in registration order
#[derive(Debug, Default)]
pub struct ClassRegistry {
    classes: RwLock<IndexMap<String, Arc<ClassInfo>>>,
}

impl ClassRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a root class
    pub fn register(&self, class: ClassInfo) -> Result<Arc<ClassInfo>> {
        let mut classes = self.classes.write();
        if classes.contains_key(class.name()) {
            return Err(TetherError::DuplicateClass(class.name().to_string()));
        }

        let class = Arc::new(class);
        classes.insert(class.name().to_string(), Arc::clone(&class));
        log::debug!("Registered class {} ({})", class.name(), class.mode());
        Ok(class)
    }

    /// Register `class` as derived from the already registered `base`
    ///
    /// The derived class inherits the base's persistence mode.
    pub fn register_derived(&self, class: ClassInfo, base: &str) -> Result<Arc<ClassInfo>> {
        let base_name = canonical_name(base);
        let mut classes = self.classes.write();
        if classes.contains_key(class.name()) {
            return Err(TetherError::DuplicateClass(class.name().to_string()));
        }
        let base = classes
            .get(&base_name)
            .cloned()
            .ok_or(TetherError::UnknownClass(base_name))?;

        let class = Arc::new(ClassInfo {
            mode: base.mode,
            base: Some(base),
            ..class
        });
        classes.insert(class.name().to_string(), Arc::clone(&class));
        log::debug!(
            "Registered class {} derived from {}",
            class.name(),
            class.root().name()
        );
        Ok(class)
    }

    pub fn get(&self, name: &str) -> Result<Arc<ClassInfo>> {
        let name = canonical_name(name);
        self.classes
            .read()
            .get(&name)
            .cloned()
            .ok_or(TetherError::UnknownClass(name))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.classes.read().contains_key(&canonical_name(name))
    }

    /// Registered class names, in registration order
    pub fn names(&self) -> Vec<String> {
        self.classes.read().keys().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.classes.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.classes.read().is_empty()
    }
}
