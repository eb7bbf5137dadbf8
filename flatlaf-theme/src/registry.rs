//! Factory registry for objects named in theme files.
//!
//! Icons, border painters and other objects are outside of this crate. Theme
//! files refer to them by name (`Tree.closedIcon = TreeClosedIcon`, or with
//! arguments `Button.border = FlatButtonBorder,2,#ff0000`). The host registers
//! a constructor per name and the defaults table builds the object lazily the
//! first time the key is read.

use std::any::Any;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use crate::value::{Arg, Instance};

/// Result of an instance constructor.
pub type FactoryResult = Result<Arc<dyn Any + Send + Sync>, String>;

type Factory = Arc<dyn Fn(&[Arg]) -> FactoryResult + Send + Sync>;

/// Maps names used in theme files to constructors.
#[derive(Clone, Default)]
pub struct InstanceRegistry {
    factories: HashMap<String, Factory>,
}

impl InstanceRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a constructor for `name`, replacing any previous one.
    pub fn register<F>(&mut self, name: impl Into<String>, factory: F)
    where
        F: Fn(&[Arg]) -> FactoryResult + Send + Sync + 'static,
    {
        self.factories.insert(name.into(), Arc::new(factory));
    }

    /// Builder variant of [InstanceRegistry::register].
    pub fn with<F>(mut self, name: impl Into<String>, factory: F) -> Self
    where
        F: Fn(&[Arg]) -> FactoryResult + Send + Sync + 'static,
    {
        self.register(name, factory);
        self
    }

    /// Whether a constructor is registered for `name`.
    pub fn contains(&self, name: &str) -> bool {
        self.factories.contains_key(name)
    }

    /// Registered names, sorted.
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.factories.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// Build an instance.
    pub fn create(&self, name: &str, args: &[Arg]) -> Result<Instance, String> {
        let factory = self
            .factories
            .get(name)
            .ok_or_else(|| format!("no factory registered for '{}'", name))?;
        let object = factory(args)?;
        Ok(Instance::new(name, args.to_vec(), object))
    }

    /// Build an instance, or a placeholder if that fails.
    ///
    /// Failures are logged, never returned.
    pub fn create_or_placeholder(&self, name: &str, args: &[Arg]) -> Instance {
        match self.create(name, args) {
            Ok(instance) => instance,
            Err(e) => {
                log::error!("Failed to instantiate '{}': {}", name, e);
                Instance::placeholder(name, args.to_vec())
            },
        }
    }
}

impl fmt::Debug for InstanceRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InstanceRegistry")
            .field("names", &self.names())
            .finish()
    }
}
