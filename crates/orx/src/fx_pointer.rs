//! # FX Pointers
//!
//! List-stored holders of up to [`FX_SLOT_NUMBER`] FX references.
//!
//! Reference counting:
//! - A new pointer starts with a counter of 1, held by its creator
//! - Every held FX has its own counter increased until it's removed
//! - `delete` drops the creator's reference and only frees the pointer,
//!   releasing its FX, once nobody else holds it
//!
//! Time only moves through [`StructureRegistry::update`]: the module installs
//! the FX pointer type's update hook at init, and the hook shares the
//! module's pointer table.

use std::cell::RefCell;
use std::rc::Rc;

use bitflags::bitflags;
use orx_core::error::{StructureError, StructureResult};
use orx_core::memory::MemoryType;
use orx_core::object::{Guid, StorageKind, StructureId, StructureRegistry, UpdateHook};
use tracing::{debug, trace, warn};

use crate::error::{expect_type, OrxError, OrxResult};
use crate::slots::Slots;

/// Number of FX a pointer can hold.
pub const FX_SLOT_NUMBER: usize = 8;

/// Header bank segment size used when FX pointers aren't registered yet.
pub const FX_POINTER_BANK_SIZE: u32 = 1024;

bitflags! {
    /// Structure flags of an FX pointer.
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
    pub struct FxPointerFlags: u32 {
        /// The pointer's FX are played.
        const ENABLED = 0x1000_0000;
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
struct Holder {
    fx: Guid,
    start_time: f32,
    played: bool,
}

#[derive(Debug, Default)]
struct FxPointerData {
    time: f32,
    holders: [Option<Holder>; FX_SLOT_NUMBER],
    /// FX reached since the last `take_started`.
    started: Vec<Guid>,
}

impl FxPointerData {
    fn step(&mut self, dt: f32) {
        self.time += dt;
        let time = self.time;
        for holder in self.holders.iter_mut().flatten() {
            if !holder.played && time >= holder.start_time {
                holder.played = true;
                self.started.push(holder.fx);
            }
        }
    }
}

type PointerTable = Rc<RefCell<Slots<FxPointerData>>>;

fn update_hook(pointers: PointerTable) -> UpdateHook {
    Rc::new(
        move |registry: &mut StructureRegistry,
              guid: Guid,
              _caller: Option<Guid>,
              dt: f32|
              -> StructureResult<()> {
            let enabled = registry.test_flags(guid, FxPointerFlags::ENABLED.bits());
            let mut pointers = pointers.borrow_mut();
            let pointer = pointers
                .get_mut(guid)
                .ok_or(StructureError::StaleGuid(guid))?;
            if enabled {
                pointer.step(dt);
            }
            Ok(())
        },
    )
}

/// FX pointer module.
#[derive(Debug)]
pub struct FxPointerModule {
    pointers: PointerTable,
}

impl FxPointerModule {
    /// Registers FX pointers as list-stored if needed and installs their
    /// update hook.
    ///
    /// # Errors
    ///
    /// Returns an error if FX pointers are registered as tree-stored, or if
    /// another module already drives them.
    pub fn init(registry: &mut StructureRegistry) -> OrxResult<Self> {
        let pointers = PointerTable::default();
        let hook = update_hook(Rc::clone(&pointers));

        match registry.get_storage_kind(StructureId::FxPointer) {
            None => registry.register_with_update(
                StructureId::FxPointer,
                StorageKind::List,
                MemoryType::Main,
                FX_POINTER_BANK_SIZE,
                Some(hook),
            )?,
            Some(StorageKind::List) => {
                if registry.has_update_hook(StructureId::FxPointer) {
                    warn!("FX pointers are already driven by another module");
                    return Err(OrxError::AlreadyInitialized(StructureId::FxPointer));
                }
                registry.set_update_hook(StructureId::FxPointer, Some(hook))?;
            }
            Some(actual) => {
                warn!(?actual, "FX pointers must be stored as a list");
                return Err(StructureError::WrongStorage {
                    id: StructureId::FxPointer,
                    expected: StorageKind::List,
                    actual,
                }
                .into());
            }
        }

        debug!("FX pointer module initialized");
        Ok(Self { pointers })
    }

    /// Returns the number of live FX pointers.
    #[inline]
    #[must_use]
    pub fn count(&self) -> usize {
        self.pointers.borrow().len()
    }

    /// Creates an enabled FX pointer, referenced once by its creator.
    ///
    /// # Errors
    ///
    /// Returns the structure layer's error if the pointer can't be created.
    pub fn create(&mut self, registry: &mut StructureRegistry) -> OrxResult<Guid> {
        let guid = registry.create(StructureId::FxPointer)?;
        registry.set_flags(guid, FxPointerFlags::ENABLED.bits(), u32::MAX)?;
        registry.increase_counter(guid)?;
        self.pointers
            .borrow_mut()
            .insert(guid, FxPointerData::default());

        trace!(%guid, "FX pointer created");
        Ok(guid)
    }

    /// Drops a reference to an FX pointer, deleting it with the last one.
    ///
    /// # Errors
    ///
    /// Returns [`StructureError::Referenced`] if other references remain; the
    /// reference is still dropped.
    ///
    /// # Panics
    ///
    /// Panics if the pointer's counter is already zero.
    pub fn delete(&mut self, registry: &mut StructureRegistry, guid: Guid) -> OrxResult<()> {
        expect_type(guid, StructureId::FxPointer)?;

        let count = registry.decrease_counter(guid)?;
        if count > 0 {
            return Err(StructureError::Referenced { guid, count }.into());
        }

        self.release(registry, guid)
    }

    /// Enables or disables an FX pointer.
    ///
    /// # Errors
    ///
    /// Returns [`StructureError::StaleGuid`] if the pointer doesn't exist.
    pub fn enable(&mut self, registry: &mut StructureRegistry, guid: Guid, enable: bool) -> OrxResult<()> {
        expect_type(guid, StructureId::FxPointer)?;
        let enabled = FxPointerFlags::ENABLED.bits();
        if enable {
            registry.set_flags(guid, enabled, 0)?;
        } else {
            registry.set_flags(guid, 0, enabled)?;
        }
        Ok(())
    }

    /// Checks whether an FX pointer is enabled.
    #[must_use]
    pub fn is_enabled(&self, registry: &StructureRegistry, guid: Guid) -> bool {
        registry.test_flags(guid, FxPointerFlags::ENABLED.bits())
    }

    /// Adds an FX starting now.
    ///
    /// # Errors
    ///
    /// See [`add_delayed_fx`](Self::add_delayed_fx).
    pub fn add_fx(&mut self, registry: &mut StructureRegistry, guid: Guid, fx: Guid) -> OrxResult<()> {
        self.add_delayed_fx(registry, guid, fx, 0.0)
    }

    /// Adds an FX starting `delay` seconds from the pointer's current time.
    ///
    /// # Errors
    ///
    /// Returns [`OrxError::NoFreeSlot`] if every slot is taken, or a
    /// structure error if either GUID is stale or of the wrong type.
    ///
    /// # Panics
    ///
    /// Panics if `delay` is negative.
    pub fn add_delayed_fx(
        &mut self,
        registry: &mut StructureRegistry,
        guid: Guid,
        fx: Guid,
        delay: f32,
    ) -> OrxResult<()> {
        assert!(delay >= 0.0, "FX delay must not be negative, got {delay}");
        expect_type(guid, StructureId::FxPointer)?;
        expect_type(fx, StructureId::Fx)?;

        let mut pointers = self.pointers.borrow_mut();
        let pointer = pointers
            .get_mut(guid)
            .ok_or(OrxError::Structure(StructureError::StaleGuid(guid)))?;
        let start_time = pointer.time + delay;
        let Some(slot) = pointer.holders.iter_mut().find(|holder| holder.is_none()) else {
            warn!(%guid, "no available slots for FX");
            return Err(OrxError::NoFreeSlot { guid });
        };

        registry.increase_counter(fx)?;
        *slot = Some(Holder {
            fx,
            start_time,
            played: false,
        });
        Ok(())
    }

    /// Removes the first slot holding `fx`, returning whether one was found.
    ///
    /// # Errors
    ///
    /// Returns a structure error if either GUID is stale.
    pub fn remove_fx(&mut self, registry: &mut StructureRegistry, guid: Guid, fx: Guid) -> OrxResult<bool> {
        expect_type(guid, StructureId::FxPointer)?;

        let mut pointers = self.pointers.borrow_mut();
        let pointer = pointers
            .get_mut(guid)
            .ok_or(OrxError::Structure(StructureError::StaleGuid(guid)))?;
        let Some(slot) = pointer
            .holders
            .iter_mut()
            .find(|holder| holder.is_some_and(|holder| holder.fx == fx))
        else {
            return Ok(false);
        };

        registry.decrease_counter(fx)?;
        *slot = None;
        Ok(true)
    }

    /// Returns the FX held by a pointer, in slot order.
    #[must_use]
    pub fn fx(&self, guid: Guid) -> Vec<Guid> {
        self.pointers.borrow().get(guid).map_or_else(Vec::new, |pointer| {
            pointer.holders.iter().flatten().map(|holder| holder.fx).collect()
        })
    }

    /// Returns a pointer's time cursor.
    #[must_use]
    pub fn time(&self, guid: Guid) -> Option<f32> {
        self.pointers.borrow().get(guid).map(|pointer| pointer.time)
    }

    /// Returns and forgets the FX reached for the first time since the last call.
    #[must_use]
    pub fn take_started(&mut self, guid: Guid) -> Vec<Guid> {
        self.pointers
            .borrow_mut()
            .get_mut(guid)
            .map(|pointer| std::mem::take(&mut pointer.started))
            .unwrap_or_default()
    }

    /// Updates a pointer through the registry and returns the FX it reached
    /// for the first time.
    ///
    /// Disabled pointers don't move.
    ///
    /// # Errors
    ///
    /// Returns [`StructureError::StaleGuid`] if the pointer doesn't exist.
    pub fn advance(&mut self, registry: &mut StructureRegistry, guid: Guid, dt: f32) -> OrxResult<Vec<Guid>> {
        expect_type(guid, StructureId::FxPointer)?;
        registry.update(guid, None, dt)?;
        Ok(self.take_started(guid))
    }

    /// Copies the model's time cursor and the start times of the FX both hold.
    ///
    /// Returns whether any FX matched; nothing changes otherwise.
    #[must_use]
    pub fn synchronize(&mut self, guid: Guid, model: Guid) -> bool {
        let mut pointers = self.pointers.borrow_mut();
        let Some(source) = pointers.get(model) else {
            return false;
        };
        let time = source.time;
        let starts: Vec<(Guid, f32)> = source
            .holders
            .iter()
            .flatten()
            .map(|holder| (holder.fx, holder.start_time))
            .collect();

        let Some(pointer) = pointers.get_mut(guid) else {
            return false;
        };
        let mut matched = false;
        for holder in pointer.holders.iter_mut().flatten() {
            if let Some(&(_, start)) = starts.iter().find(|(fx, _)| *fx == holder.fx) {
                holder.start_time = start;
                matched = true;
            } else {
                debug!(fx = %holder.fx, "FX not found on model, not synchronized");
            }
        }
        if matched {
            pointer.time = time;
        }
        matched
    }

    /// Deletes every FX pointer, referenced or not, and removes the update hook.
    ///
    /// # Errors
    ///
    /// Returns the structure layer's error if a pointer can't be removed.
    pub fn exit(&mut self, registry: &mut StructureRegistry) -> OrxResult<()> {
        let live: Vec<Guid> = registry.iter(StructureId::FxPointer).collect();
        for guid in live {
            self.release(registry, guid)?;
        }
        registry.set_update_hook(StructureId::FxPointer, None)?;

        debug!("FX pointer module exited");
        Ok(())
    }

    fn release(&mut self, registry: &mut StructureRegistry, guid: Guid) -> OrxResult<()> {
        let removed = self.pointers.borrow_mut().remove(guid);
        if let Some(pointer) = removed {
            for holder in pointer.holders.iter().flatten() {
                if let Err(error) = registry.decrease_counter(holder.fx) {
                    warn!(%guid, fx = %holder.fx, %error, "can't release held FX");
                }
            }
        }
        registry.delete(guid)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn setup() -> (StructureRegistry, FxPointerModule) {
        let mut registry = StructureRegistry::new();
        registry
            .register(StructureId::Fx, StorageKind::List, MemoryType::Main, 16)
            .unwrap();
        let pointers = FxPointerModule::init(&mut registry).unwrap();
        (registry, pointers)
    }

    #[test]
    fn test_create_is_enabled_and_held() {
        let (mut registry, mut pointers) = setup();
        let pointer = pointers.create(&mut registry).unwrap();

        assert!(pointers.is_enabled(&registry, pointer));
        assert_eq!(registry.get_counter(pointer), Some(1));

        pointers.enable(&mut registry, pointer, false).unwrap();
        assert!(!pointers.is_enabled(&registry, pointer));
        pointers.enable(&mut registry, pointer, true).unwrap();
        assert!(pointers.is_enabled(&registry, pointer));
    }

    #[test]
    fn test_held_fx_are_referenced() {
        let (mut registry, mut pointers) = setup();
        let pointer = pointers.create(&mut registry).unwrap();
        let fx = registry.create(StructureId::Fx).unwrap();

        pointers.add_fx(&mut registry, pointer, fx).unwrap();
        pointers.add_fx(&mut registry, pointer, fx).unwrap();
        assert_eq!(registry.get_counter(fx), Some(2));
        assert_eq!(pointers.fx(pointer).len(), 2);

        assert!(pointers.remove_fx(&mut registry, pointer, fx).unwrap());
        assert_eq!(registry.get_counter(fx), Some(1));

        pointers.delete(&mut registry, pointer).unwrap();
        assert_eq!(registry.get_counter(fx), Some(0));
        assert!(!registry.contains(pointer));
        assert_eq!(pointers.count(), 0);
    }

    #[test]
    fn test_slots_run_out() {
        let (mut registry, mut pointers) = setup();
        let pointer = pointers.create(&mut registry).unwrap();
        let fx = registry.create(StructureId::Fx).unwrap();

        for _ in 0..FX_SLOT_NUMBER {
            pointers.add_fx(&mut registry, pointer, fx).unwrap();
        }
        assert_eq!(
            pointers.add_fx(&mut registry, pointer, fx),
            Err(OrxError::NoFreeSlot { guid: pointer })
        );
        assert_eq!(registry.get_counter(fx), Some(FX_SLOT_NUMBER as u32));
    }

    #[test]
    fn test_remove_missing_fx() {
        let (mut registry, mut pointers) = setup();
        let pointer = pointers.create(&mut registry).unwrap();
        let fx = registry.create(StructureId::Fx).unwrap();

        assert!(!pointers.remove_fx(&mut registry, pointer, fx).unwrap());
        assert_eq!(registry.get_counter(fx), Some(0));
    }

    #[test]
    fn test_shared_pointer_survives_delete() {
        let (mut registry, mut pointers) = setup();
        let pointer = pointers.create(&mut registry).unwrap();
        let fx = registry.create(StructureId::Fx).unwrap();
        pointers.add_fx(&mut registry, pointer, fx).unwrap();
        registry.increase_counter(pointer).unwrap();

        assert_eq!(
            pointers.delete(&mut registry, pointer),
            Err(OrxError::Structure(StructureError::Referenced { guid: pointer, count: 1 }))
        );
        assert!(registry.contains(pointer));
        assert_eq!(registry.get_counter(fx), Some(1));

        pointers.delete(&mut registry, pointer).unwrap();
        assert_eq!(registry.get_counter(fx), Some(0));
    }

    #[test]
    fn test_non_fx_refused() {
        let (mut registry, mut pointers) = setup();
        let pointer = pointers.create(&mut registry).unwrap();
        let other = pointers.create(&mut registry).unwrap();

        assert_eq!(
            pointers.add_fx(&mut registry, pointer, other),
            Err(OrxError::WrongType {
                guid: other,
                expected: StructureId::Fx
            })
        );
    }

    #[test]
    fn test_delayed_fx_start_on_time() {
        let (mut registry, mut pointers) = setup();
        let pointer = pointers.create(&mut registry).unwrap();
        let now = registry.create(StructureId::Fx).unwrap();
        let later = registry.create(StructureId::Fx).unwrap();
        pointers.add_fx(&mut registry, pointer, now).unwrap();
        pointers.add_delayed_fx(&mut registry, pointer, later, 1.0).unwrap();

        assert_eq!(pointers.advance(&mut registry, pointer, 0.5).unwrap(), vec![now]);
        assert!(pointers.advance(&mut registry, pointer, 0.25).unwrap().is_empty());

        pointers.enable(&mut registry, pointer, false).unwrap();
        assert!(pointers.advance(&mut registry, pointer, 1.0).unwrap().is_empty());
        assert_eq!(pointers.time(pointer), Some(0.75));

        pointers.enable(&mut registry, pointer, true).unwrap();
        assert_eq!(pointers.advance(&mut registry, pointer, 0.25).unwrap(), vec![later]);
    }

    #[test]
    fn test_synchronize_with_model() {
        let (mut registry, mut pointers) = setup();
        let model = pointers.create(&mut registry).unwrap();
        let copy = pointers.create(&mut registry).unwrap();
        let fx = registry.create(StructureId::Fx).unwrap();
        pointers.add_delayed_fx(&mut registry, model, fx, 2.0).unwrap();
        pointers.advance(&mut registry, model, 1.5).unwrap();
        pointers.add_fx(&mut registry, copy, fx).unwrap();

        assert!(pointers.synchronize(copy, model));
        assert_eq!(pointers.time(copy), Some(1.5));
        assert!(pointers.advance(&mut registry, copy, 0.25).unwrap().is_empty());
        assert_eq!(pointers.advance(&mut registry, copy, 0.25).unwrap(), vec![fx]);
    }

    #[test]
    fn test_registry_update_drives_pointers() {
        let (mut registry, mut pointers) = setup();
        let pointer = pointers.create(&mut registry).unwrap();
        let fx = registry.create(StructureId::Fx).unwrap();
        pointers.add_delayed_fx(&mut registry, pointer, fx, 0.5).unwrap();

        assert!(registry.has_update_hook(StructureId::FxPointer));
        registry.update(pointer, None, 0.25).unwrap();
        registry.update(pointer, Some(fx), 0.25).unwrap();
        assert_eq!(pointers.time(pointer), Some(0.5));
        assert_eq!(pointers.take_started(pointer), vec![fx]);
        assert!(pointers.take_started(pointer).is_empty());

        // FX structures have no hook
        registry.update(fx, None, 1.0).unwrap();

        pointers.delete(&mut registry, pointer).unwrap();
        assert_eq!(
            registry.update(pointer, None, 0.25),
            Err(StructureError::StaleGuid(pointer))
        );
    }

    #[test]
    fn test_second_init_refused() {
        let (mut registry, mut pointers) = setup();
        let pointer = pointers.create(&mut registry).unwrap();

        assert_eq!(
            FxPointerModule::init(&mut registry).unwrap_err(),
            OrxError::AlreadyInitialized(StructureId::FxPointer)
        );
        assert!(pointers.advance(&mut registry, pointer, 1.0).unwrap().is_empty());
        assert_eq!(pointers.time(pointer), Some(1.0));

        // Exiting hands the type over to a new module
        pointers.exit(&mut registry).unwrap();
        assert!(!registry.has_update_hook(StructureId::FxPointer));
        let mut next = FxPointerModule::init(&mut registry).unwrap();
        let pointer = next.create(&mut registry).unwrap();
        next.advance(&mut registry, pointer, 0.5).unwrap();
        assert_eq!(next.time(pointer), Some(0.5));
    }

    #[test]
    fn test_exit_releases_held_fx() {
        let (mut registry, mut pointers) = setup();
        let fx = registry.create(StructureId::Fx).unwrap();
        for _ in 0..3 {
            let pointer = pointers.create(&mut registry).unwrap();
            pointers.add_fx(&mut registry, pointer, fx).unwrap();
        }

        pointers.exit(&mut registry).unwrap();
        assert_eq!(registry.get_counter(fx), Some(0));
        assert_eq!(registry.get_number(StructureId::FxPointer), Some(0));
    }
}
