//! Per-slot protocol prototypes.
//!
//! Each protocol slot carries a factory; new nodes are populated by
//! invoking every slot's factory in order. This replaces clone-based
//! prototype copying: a per-node factory constructs an independent
//! instance, while a shared-singleton factory hands out clones of the
//! same cell.

use crate::error::ConfigError;
use crate::protocol::{ProtocolCell, ProtocolFactory};
use std::rc::Rc;

/// Maps protocol slots to the factories that populate new nodes.
pub struct PrototypeRegistry {
    factories: Vec<Option<Box<dyn ProtocolFactory>>>,
}

impl PrototypeRegistry {
    /// Create a registry with `slots` protocol slots, all unregistered.
    pub fn new(slots: usize) -> Self {
        Self {
            factories: (0..slots).map(|_| None).collect(),
        }
    }

    /// Number of configured protocol slots.
    pub fn slots(&self) -> usize {
        self.factories.len()
    }

    /// Register the factory for one slot.
    ///
    /// Fails if the slot is out of range or already registered.
    pub fn register(
        &mut self,
        slot: usize,
        factory: Box<dyn ProtocolFactory>,
    ) -> Result<(), ConfigError> {
        let slots = self.factories.len();
        let entry = self
            .factories
            .get_mut(slot)
            .ok_or(ConfigError::SlotOutOfRange { slot, slots })?;
        if entry.is_some() {
            return Err(ConfigError::DuplicatePrototype { slot });
        }
        *entry = Some(factory);
        Ok(())
    }

    /// Register a closure building a fresh instance per node.
    pub fn register_fn<F>(&mut self, slot: usize, factory: F) -> Result<(), ConfigError>
    where
        F: Fn() -> ProtocolCell + 'static,
    {
        self.register(slot, Box::new(factory))
    }

    /// Register a shared-singleton instance: every node gets a clone of
    /// the same cell. Valid for stateless protocols.
    pub fn register_shared(&mut self, slot: usize, cell: ProtocolCell) -> Result<(), ConfigError> {
        self.register(slot, Box::new(move || Rc::clone(&cell)))
    }

    /// Build the full protocol array for one new node.
    ///
    /// Fails with [`ConfigError::MissingPrototype`] if any slot has no
    /// factory yet.
    pub fn instantiate_all(&self) -> Result<Box<[ProtocolCell]>, ConfigError> {
        self.factories
            .iter()
            .enumerate()
            .map(|(slot, factory)| {
                factory
                    .as_ref()
                    .map(|f| f.build())
                    .ok_or(ConfigError::MissingPrototype { slot })
            })
            .collect()
    }
}

impl std::fmt::Debug for PrototypeRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PrototypeRegistry")
            .field("slots", &self.factories.len())
            .field(
                "registered",
                &self.factories.iter().filter(|f| f.is_some()).count(),
            )
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::{protocol_cell, Protocol};
    use std::any::Any;

    struct Inert;

    impl Protocol for Inert {
        fn as_any(&self) -> &dyn Any {
            self
        }
        fn as_any_mut(&mut self) -> &mut dyn Any {
            self
        }
    }

    #[test]
    fn test_missing_prototype_is_a_config_error() {
        let mut registry = PrototypeRegistry::new(2);
        registry.register_fn(0, || protocol_cell(Inert)).unwrap();

        assert!(matches!(
            registry.instantiate_all(),
            Err(ConfigError::MissingPrototype { slot: 1 })
        ));
    }

    #[test]
    fn test_duplicate_registration_fails() {
        let mut registry = PrototypeRegistry::new(1);
        registry.register_fn(0, || protocol_cell(Inert)).unwrap();

        assert!(matches!(
            registry.register_fn(0, || protocol_cell(Inert)),
            Err(ConfigError::DuplicatePrototype { slot: 0 })
        ));
    }

    #[test]
    fn test_slot_out_of_range_fails() {
        let mut registry = PrototypeRegistry::new(1);
        assert!(matches!(
            registry.register_fn(3, || protocol_cell(Inert)),
            Err(ConfigError::SlotOutOfRange { slot: 3, slots: 1 })
        ));
    }

    #[test]
    fn test_per_node_factories_build_independent_instances() {
        let mut registry = PrototypeRegistry::new(1);
        registry.register_fn(0, || protocol_cell(Inert)).unwrap();

        let a = registry.instantiate_all().unwrap();
        let b = registry.instantiate_all().unwrap();
        assert!(!Rc::ptr_eq(&a[0], &b[0]));
    }

    #[test]
    fn test_shared_singleton_is_one_instance() {
        let mut registry = PrototypeRegistry::new(1);
        registry.register_shared(0, protocol_cell(Inert)).unwrap();

        let a = registry.instantiate_all().unwrap();
        let b = registry.instantiate_all().unwrap();
        assert!(Rc::ptr_eq(&a[0], &b[0]));
    }
}
