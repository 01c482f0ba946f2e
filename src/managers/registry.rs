//! # Manager registry.
//!
//! Explicit table of the managers a program runs, indexed by manager type.
//! Replaces a process-global "effect managers" table: each program owns one.
//!
//! ## Rules
//! - [`Registry::new`] pre-registers the built-in [`TaskManager`] and [`PortsManager`].
//! - Ids are assigned in registration order; the runtime delivers effects in id order.
//! - A manager type can be registered once; a second registration is an error.

use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

use crate::error::RuntimeError;
use crate::managers::manager::{AnyManager, Manager};
use crate::managers::ports::PortsManager;
use crate::managers::task_manager::TaskManager;

/// Position of a manager in its registry.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ManagerId(pub(crate) usize);

impl fmt::Display for ManagerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "manager#{}", self.0)
    }
}

/// Address an effect leaf carries: the manager type plus its name for diagnostics.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ManagerKey {
    id: TypeId,
    name: &'static str,
}

impl ManagerKey {
    /// Key of manager type `M`.
    pub fn of<M: Manager>() -> Self {
        Self {
            id: TypeId::of::<M>(),
            name: <M as Manager>::name(),
        }
    }

    /// Manager name.
    pub fn name(&self) -> &'static str {
        self.name
    }
}

struct Entry {
    manager: Rc<dyn AnyManager>,
    typed: Rc<dyn Any>,
}

/// Managers of one program.
pub struct Registry {
    entries: Vec<Entry>,
    index: HashMap<TypeId, ManagerId>,
}

impl Registry {
    /// Creates a registry holding the built-in task and ports managers.
    pub fn new() -> Self {
        let mut registry = Self::empty();
        registry.insert(TaskManager);
        registry.insert(PortsManager::default());
        registry
    }

    /// Creates a registry without any managers.
    pub fn empty() -> Self {
        Self {
            entries: Vec::new(),
            index: HashMap::new(),
        }
    }

    /// Registers `manager`.
    ///
    /// # Errors
    /// [`RuntimeError::DuplicateManager`] if a manager of the same type is present.
    pub fn register<M: Manager>(&mut self, manager: M) -> Result<ManagerId, RuntimeError> {
        if self.index.contains_key(&TypeId::of::<M>()) {
            return Err(RuntimeError::DuplicateManager {
                name: <M as Manager>::name(),
            });
        }
        Ok(self.insert(manager))
    }

    fn insert<M: Manager>(&mut self, manager: M) -> ManagerId {
        let id = ManagerId(self.entries.len());
        let manager = Rc::new(manager);
        self.entries.push(Entry {
            manager: manager.clone(),
            typed: manager,
        });
        self.index.insert(TypeId::of::<M>(), id);
        id
    }

    /// Shared handle to the registered manager of type `M`.
    pub fn get<M: Manager>(&self) -> Option<Rc<M>> {
        let id = self.index.get(&TypeId::of::<M>())?;
        self.entries.get(id.0)?.typed.clone().downcast::<M>().ok()
    }

    /// Id of the manager of type `M`.
    pub fn id_of<M: Manager>(&self) -> Option<ManagerId> {
        self.index.get(&TypeId::of::<M>()).copied()
    }

    /// Number of registered managers.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether no manager is registered.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Manager names in id order.
    pub fn names(&self) -> Vec<&'static str> {
        self.entries.iter().map(|e| e.manager.name()).collect()
    }

    pub(crate) fn resolve(&self, key: &ManagerKey) -> Option<ManagerId> {
        self.index.get(&key.id).copied()
    }

    pub(crate) fn iter(&self) -> impl Iterator<Item = (ManagerId, &Rc<dyn AnyManager>)> {
        self.entries
            .iter()
            .enumerate()
            .map(|(i, e)| (ManagerId(i), &e.manager))
    }
}

impl Default for Registry {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Registry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.names()).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtins_come_first() {
        let registry = Registry::new();
        assert_eq!(registry.names(), vec!["task", "ports"]);
        assert_eq!(registry.id_of::<TaskManager>(), Some(ManagerId(0)));
        assert_eq!(registry.id_of::<PortsManager>(), Some(ManagerId(1)));
        assert!(registry.get::<PortsManager>().is_some());
    }

    #[test]
    fn duplicate_registration_is_rejected() {
        let mut registry = Registry::new();
        let err = registry.register(TaskManager).unwrap_err();
        assert_eq!(err, RuntimeError::DuplicateManager { name: "task" });
        assert_eq!(registry.len(), 2);
    }

    #[test]
    fn empty_registry_routes_nothing() {
        let registry = Registry::empty();
        assert!(registry.is_empty());
        assert_eq!(registry.resolve(&ManagerKey::of::<TaskManager>()), None);
    }
}
