//! Command modules and the registries that hold them.
//!
//! A [`ModuleCatalog`] knows every module the process can build. Each tenant
//! context owns a [`ModuleRegistry`] with the modules currently loaded into
//! it, and every loaded module carries its own [`Predicate`].

use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, PoisonError, RwLock};

use async_trait::async_trait;

use warden_auth::Predicate;
use warden_events::{InboundEvent, Invocation};

use crate::context::CommandContext;
use crate::error::{CommandError, CompositionError};

/// A command a module answers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CommandSpec {
    pub name: &'static str,
    pub usage: &'static str,
}

impl CommandSpec {
    pub const fn new(name: &'static str, usage: &'static str) -> Self {
        Self { name, usage }
    }
}

/// A named group of commands.
#[async_trait]
pub trait Module: Send + Sync {
    fn name(&self) -> &str;

    fn commands(&self) -> &[CommandSpec];

    /// Check applied to every command in the context while this module is
    /// loaded. Returning `false` drops the event silently.
    fn allows(&self, _event: &InboundEvent) -> bool {
        true
    }

    /// Run `invocation` and produce the reply text.
    async fn execute(
        &self,
        cx: &mut CommandContext<'_>,
        invocation: &Invocation,
    ) -> Result<String, CommandError>;
}

/// A loaded module together with its current authorization predicate.
#[derive(Clone)]
pub struct ModuleHandle {
    module: Arc<dyn Module>,
    predicate: Predicate,
}

impl ModuleHandle {
    pub fn new(module: Arc<dyn Module>) -> Self {
        Self {
            module,
            predicate: Predicate::protection_set(),
        }
    }

    pub fn name(&self) -> &str {
        self.module.name()
    }

    pub fn commands(&self) -> &[CommandSpec] {
        self.module.commands()
    }

    pub fn module(&self) -> &Arc<dyn Module> {
        &self.module
    }

    pub fn predicate(&self) -> &Predicate {
        &self.predicate
    }

    pub fn set_predicate(&mut self, predicate: Predicate) {
        self.predicate = predicate;
    }
}

impl core::fmt::Debug for ModuleHandle {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("ModuleHandle")
            .field("name", &self.name())
            .field("predicate", &self.predicate)
            .finish()
    }
}

/// Modules loaded into one tenant context.
#[derive(Debug, Default)]
pub struct ModuleRegistry {
    modules: RwLock<BTreeMap<String, ModuleHandle>>,
}

impl ModuleRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn exists(&self, name: &str) -> bool {
        self.read().contains_key(name)
    }

    pub fn get(&self, name: &str) -> Option<ModuleHandle> {
        self.read().get(name).cloned()
    }

    /// Load `module` with the default predicate. Returns `false` (and leaves
    /// the registry untouched) when a module of that name is already loaded.
    pub fn load(&self, module: Arc<dyn Module>) -> bool {
        let name = module.name().to_string();
        let mut modules = self.write();
        if modules.contains_key(&name) {
            return false;
        }
        modules.insert(name, ModuleHandle::new(module));
        true
    }

    /// Swap in a fresh instance, resetting the predicate to the default.
    pub fn replace(&self, module: Arc<dyn Module>) -> Option<ModuleHandle> {
        let name = module.name().to_string();
        self.write().insert(name, ModuleHandle::new(module))
    }

    pub fn unload(&self, name: &str) -> Option<ModuleHandle> {
        self.write().remove(name)
    }

    pub fn names(&self) -> Vec<String> {
        self.read().keys().cloned().collect()
    }

    pub fn handles(&self) -> Vec<ModuleHandle> {
        self.read().values().cloned().collect()
    }

    /// The module that answers to `command`, if any is loaded.
    pub fn find_command(&self, command: &str) -> Option<ModuleHandle> {
        self.read()
            .values()
            .find(|handle| handle.commands().iter().any(|c| c.name == command))
            .cloned()
    }

    pub fn predicate(&self, name: &str) -> Option<Predicate> {
        self.read().get(name).map(|h| h.predicate.clone())
    }

    pub fn set_predicate(&self, name: &str, predicate: Predicate) -> Result<(), CompositionError> {
        let mut modules = self.write();
        let handle = modules
            .get_mut(name)
            .ok_or_else(|| CompositionError::UnknownModule(name.to_string()))?;
        handle.set_predicate(predicate);
        Ok(())
    }

    /// Put `extra` in front of the module's current predicate.
    ///
    /// The result is `extra AND current`: `extra` runs first and a failure
    /// short-circuits. Wrapping again stacks another check on top.
    pub fn wrap(&self, name: &str, extra: Predicate) -> Result<(), CompositionError> {
        let mut modules = self.write();
        let handle = modules
            .get_mut(name)
            .ok_or_else(|| CompositionError::UnknownModule(name.to_string()))?;
        let composed = extra.and(handle.predicate.clone());
        tracing::debug!(module = name, predicate = composed.label(), "predicate composed");
        handle.set_predicate(composed);
        Ok(())
    }

    fn read(&self) -> std::sync::RwLockReadGuard<'_, BTreeMap<String, ModuleHandle>> {
        self.modules.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> std::sync::RwLockWriteGuard<'_, BTreeMap<String, ModuleHandle>> {
        self.modules.write().unwrap_or_else(PoisonError::into_inner)
    }
}

type ModuleFactory = dyn Fn() -> Arc<dyn Module> + Send + Sync;

/// Every module the process can load, by name.
#[derive(Default)]
pub struct ModuleCatalog {
    factories: HashMap<String, Arc<ModuleFactory>>,
}

impl ModuleCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// The catalog with the built-in modules registered.
    pub fn standard() -> Self {
        let mut catalog = Self::new();
        catalog.register(warden_auth::ADMIN_MODULE, || {
            Arc::new(crate::modules::AdminModule)
        });
        catalog.register(crate::modules::SAFETY_MODULE, || {
            Arc::new(crate::modules::SafetyModule)
        });
        catalog.register(crate::modules::UTILITY_MODULE, || {
            Arc::new(crate::modules::UtilityModule)
        });
        catalog
    }

    pub fn register<F>(&mut self, name: impl Into<String>, factory: F)
    where
        F: Fn() -> Arc<dyn Module> + Send + Sync + 'static,
    {
        self.factories.insert(name.into(), Arc::new(factory));
    }

    pub fn contains(&self, name: &str) -> bool {
        self.factories.contains_key(name)
    }

    pub fn instantiate(&self, name: &str) -> Option<Arc<dyn Module>> {
        self.factories.get(name).map(|factory| factory())
    }

    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.factories.keys().cloned().collect();
        names.sort();
        names
    }
}

impl core::fmt::Debug for ModuleCatalog {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("ModuleCatalog")
            .field("modules", &self.names())
            .finish()
    }
}
