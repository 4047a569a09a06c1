//! # Bodies
//!
//! List-stored physical bodies over a pluggable physics back-end.
//!
//! The module only keeps the scaffolding: a body structure, its owner and the
//! opaque handle the back-end returned for it. Simulation belongs to the
//! back-end.

use bitflags::bitflags;
use orx_core::error::StructureError;
use orx_core::memory::{Bank, BankFlags, MemoryType};
use orx_core::object::{Guid, StorageKind, StructureId, StructureRegistry};
use tracing::{debug, trace, warn};

use crate::error::{expect_type, OrxError, OrxResult};
use crate::math::Vector;
use crate::slots::Slots;

/// Header bank segment size used when bodies aren't registered yet.
pub const BODY_BANK_SIZE: u32 = 512;

bitflags! {
    /// Body definition flags.
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
    pub struct BodyDefFlags: u32 {
        /// Body lives in the X/Y plane.
        const TWO_D = 0x0000_0001;
        /// Body is moved by the simulation.
        const DYNAMIC = 0x0000_0002;
        /// Body needs continuous collision detection.
        const HIGH_SPEED = 0x0000_0004;
        /// Body never rotates.
        const FIXED_ROTATION = 0x0000_0008;
        /// Body can slide on the ground.
        const CAN_SLIDE = 0x0000_0010;
        /// Body can be moved by the user.
        const CAN_MOVE = 0x0000_0020;
        /// Body can be put to sleep.
        const ALLOW_SLEEP = 0x0000_0040;
    }
}

/// Body creation parameters handed to the back-end.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BodyDef {
    /// Initial position.
    pub position: Vector,
    /// Initial rotation in radians.
    pub rotation: f32,
    /// Rotational inertia.
    pub inertia: f32,
    /// Mass.
    pub mass: f32,
    /// Linear damping.
    pub linear_damping: f32,
    /// Angular damping.
    pub angular_damping: f32,
    /// Definition flags.
    pub flags: BodyDefFlags,
}

impl Default for BodyDef {
    fn default() -> Self {
        Self {
            position: Vector::ZERO,
            rotation: 0.0,
            inertia: 0.0,
            mass: 0.0,
            linear_damping: 0.0,
            angular_damping: 0.0,
            flags: BodyDefFlags::TWO_D,
        }
    }
}

/// Opaque body reference issued by a physics back-end.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct PhysicsHandle(pub u32);

/// Physics back-end driven by [`BodyModule`].
pub trait PhysicsBackend {
    /// Creates a back-end body for `owner`.
    ///
    /// # Errors
    ///
    /// Returns [`OrxError::Physics`] if the back-end can't host another body.
    fn create_body(&mut self, owner: Guid, def: &BodyDef) -> OrxResult<PhysicsHandle>;

    /// Releases a back-end body.
    fn delete_body(&mut self, handle: PhysicsHandle);

    /// Moves a body.
    fn set_position(&mut self, handle: PhysicsHandle, position: Vector);

    /// Returns a body's position.
    fn position(&self, handle: PhysicsHandle) -> Option<Vector>;

    /// Rotates a body.
    fn set_rotation(&mut self, handle: PhysicsHandle, rotation: f32);

    /// Returns a body's rotation.
    fn rotation(&self, handle: PhysicsHandle) -> Option<f32>;

    /// Sets a body's linear speed.
    fn set_speed(&mut self, handle: PhysicsHandle, speed: Vector);

    /// Returns a body's linear speed.
    fn speed(&self, handle: PhysicsHandle) -> Option<Vector>;
}

#[derive(Clone, Copy, Debug, Default)]
struct NullBody {
    owner: Guid,
    position: Vector,
    rotation: f32,
    speed: Vector,
}

/// Back-end that stores body state and never simulates.
#[derive(Debug)]
pub struct NullPhysics {
    bodies: Bank<NullBody>,
}

impl NullPhysics {
    /// Creates a back-end storing bodies in segments of `segment_size`.
    ///
    /// # Errors
    ///
    /// Returns the bank's error if the first segment can't be allocated.
    pub fn new(segment_size: u32, flags: BankFlags) -> OrxResult<Self> {
        let bodies = Bank::new(segment_size, flags, MemoryType::Physics).map_err(StructureError::from)?;
        Ok(Self { bodies })
    }

    /// Returns the number of live back-end bodies.
    #[inline]
    #[must_use]
    pub const fn count(&self) -> u32 {
        self.bodies.count()
    }

    /// Returns the owner a back-end body was created for.
    #[must_use]
    pub fn owner(&self, handle: PhysicsHandle) -> Option<Guid> {
        self.bodies.get_at_index(handle.0).map(|body| body.owner)
    }

    fn body_mut(&mut self, handle: PhysicsHandle) -> Option<&mut NullBody> {
        self.bodies.get_at_index_mut(handle.0).map(|cell| &mut **cell)
    }
}

impl PhysicsBackend for NullPhysics {
    fn create_body(&mut self, owner: Guid, def: &BodyDef) -> OrxResult<PhysicsHandle> {
        let allocated = self
            .bodies
            .allocate_indexed()
            .map_err(|error| OrxError::Physics(error.to_string()))?;
        **allocated.cell = NullBody {
            owner,
            position: def.position,
            rotation: def.rotation,
            speed: Vector::ZERO,
        };
        Ok(PhysicsHandle(allocated.index))
    }

    fn delete_body(&mut self, handle: PhysicsHandle) {
        self.bodies.free(handle.0);
    }

    fn set_position(&mut self, handle: PhysicsHandle, position: Vector) {
        if let Some(body) = self.body_mut(handle) {
            body.position = position;
        }
    }

    fn position(&self, handle: PhysicsHandle) -> Option<Vector> {
        self.bodies.get_at_index(handle.0).map(|body| body.position)
    }

    fn set_rotation(&mut self, handle: PhysicsHandle, rotation: f32) {
        if let Some(body) = self.body_mut(handle) {
            body.rotation = rotation;
        }
    }

    fn rotation(&self, handle: PhysicsHandle) -> Option<f32> {
        self.bodies.get_at_index(handle.0).map(|body| body.rotation)
    }

    fn set_speed(&mut self, handle: PhysicsHandle, speed: Vector) {
        if let Some(body) = self.body_mut(handle) {
            body.speed = speed;
        }
    }

    fn speed(&self, handle: PhysicsHandle) -> Option<Vector> {
        self.bodies.get_at_index(handle.0).map(|body| body.speed)
    }
}

#[derive(Clone, Copy, Debug)]
struct BodyData {
    handle: PhysicsHandle,
    def_flags: BodyDefFlags,
}

/// Body module: bodies, their owners and their back-end handles.
#[derive(Debug)]
pub struct BodyModule<P> {
    physics: P,
    bodies: Slots<BodyData>,
}

impl<P: PhysicsBackend> BodyModule<P> {
    /// Registers bodies as list-stored if needed.
    ///
    /// # Errors
    ///
    /// Returns an error if bodies are registered as tree-stored.
    pub fn init(registry: &mut StructureRegistry, physics: P) -> OrxResult<Self> {
        match registry.get_storage_kind(StructureId::Body) {
            None => registry.register(
                StructureId::Body,
                StorageKind::List,
                MemoryType::Physics,
                BODY_BANK_SIZE,
            )?,
            Some(StorageKind::List) => {}
            Some(actual) => {
                warn!(?actual, "bodies must be stored as a list");
                return Err(StructureError::WrongStorage {
                    id: StructureId::Body,
                    expected: StorageKind::List,
                    actual,
                }
                .into());
            }
        }

        debug!("body module initialized");
        Ok(Self {
            physics,
            bodies: Slots::new(),
        })
    }

    /// Returns the physics back-end.
    #[inline]
    pub const fn physics(&self) -> &P {
        &self.physics
    }

    /// Returns the physics back-end mutably.
    #[inline]
    pub fn physics_mut(&mut self) -> &mut P {
        &mut self.physics
    }

    /// Returns the number of live bodies.
    #[inline]
    #[must_use]
    pub const fn count(&self) -> usize {
        self.bodies.len()
    }

    /// Creates a body owned by `owner`, [`Guid::NONE`] for none.
    ///
    /// # Errors
    ///
    /// Returns the structure layer's error, or the back-end's refusal. Nothing
    /// is left allocated on error.
    pub fn create(
        &mut self,
        registry: &mut StructureRegistry,
        owner: Guid,
        def: &BodyDef,
    ) -> OrxResult<Guid> {
        let guid = registry.create(StructureId::Body)?;

        let handle = match self.physics.create_body(guid, def) {
            Ok(handle) => handle,
            Err(error) => {
                warn!(%guid, %error, "physics back-end refused body");
                registry.delete(guid)?;
                return Err(error);
            }
        };
        registry.set_owner(guid, owner)?;
        self.bodies.insert(
            guid,
            BodyData {
                handle,
                def_flags: def.flags,
            },
        );

        trace!(%guid, %owner, "body created");
        Ok(guid)
    }

    /// Deletes an unreferenced body and its back-end body.
    ///
    /// # Errors
    ///
    /// Returns [`StructureError::Referenced`] if the body is still referenced.
    pub fn delete(&mut self, registry: &mut StructureRegistry, guid: Guid) -> OrxResult<()> {
        expect_type(guid, StructureId::Body)?;
        match registry.get_counter(guid) {
            Some(0) => {}
            Some(count) => {
                warn!(%guid, count, "tried to delete body when it was still referenced");
                return Err(StructureError::Referenced { guid, count }.into());
            }
            None => return Err(StructureError::StaleGuid(guid).into()),
        }

        registry.delete(guid)?;
        if let Some(data) = self.bodies.remove(guid) {
            self.physics.delete_body(data.handle);
        }
        Ok(())
    }

    /// Returns a body's owner.
    #[must_use]
    pub fn owner(&self, registry: &StructureRegistry, guid: Guid) -> Option<Guid> {
        self.bodies.get(guid)?;
        registry.get_owner(guid)
    }

    /// Checks whether a body was defined with any of `flags`.
    #[must_use]
    pub fn test_def_flags(&self, guid: Guid, flags: BodyDefFlags) -> bool {
        self.bodies
            .get(guid)
            .is_some_and(|data| data.def_flags.intersects(flags))
    }

    /// Returns a body's definition flags.
    #[must_use]
    pub fn def_flags(&self, guid: Guid) -> Option<BodyDefFlags> {
        self.bodies.get(guid).map(|data| data.def_flags)
    }

    /// Returns the back-end handle of a body.
    #[must_use]
    pub fn handle(&self, guid: Guid) -> Option<PhysicsHandle> {
        self.bodies.get(guid).map(|data| data.handle)
    }

    /// Moves a body.
    ///
    /// # Errors
    ///
    /// Returns [`StructureError::StaleGuid`] if the body doesn't exist.
    pub fn set_position(&mut self, guid: Guid, position: Vector) -> OrxResult<()> {
        let handle = self.live_handle(guid)?;
        self.physics.set_position(handle, position);
        Ok(())
    }

    /// Returns a body's position.
    #[must_use]
    pub fn position(&self, guid: Guid) -> Option<Vector> {
        self.physics.position(self.handle(guid)?)
    }

    /// Rotates a body.
    ///
    /// # Errors
    ///
    /// Returns [`StructureError::StaleGuid`] if the body doesn't exist.
    pub fn set_rotation(&mut self, guid: Guid, rotation: f32) -> OrxResult<()> {
        let handle = self.live_handle(guid)?;
        self.physics.set_rotation(handle, rotation);
        Ok(())
    }

    /// Returns a body's rotation.
    #[must_use]
    pub fn rotation(&self, guid: Guid) -> Option<f32> {
        self.physics.rotation(self.handle(guid)?)
    }

    /// Sets a body's linear speed.
    ///
    /// # Errors
    ///
    /// Returns [`StructureError::StaleGuid`] if the body doesn't exist.
    pub fn set_speed(&mut self, guid: Guid, speed: Vector) -> OrxResult<()> {
        let handle = self.live_handle(guid)?;
        self.physics.set_speed(handle, speed);
        Ok(())
    }

    /// Returns a body's linear speed.
    #[must_use]
    pub fn speed(&self, guid: Guid) -> Option<Vector> {
        self.physics.speed(self.handle(guid)?)
    }

    /// Deletes every body, referenced or not.
    ///
    /// # Errors
    ///
    /// Returns the structure layer's error if a body can't be removed.
    pub fn exit(&mut self, registry: &mut StructureRegistry) -> OrxResult<()> {
        let live: Vec<Guid> = registry.iter(StructureId::Body).collect();
        for guid in live {
            registry.delete(guid)?;
            if let Some(data) = self.bodies.remove(guid) {
                self.physics.delete_body(data.handle);
            }
        }

        debug!("body module exited");
        Ok(())
    }

    fn live_handle(&self, guid: Guid) -> OrxResult<PhysicsHandle> {
        self.handle(guid)
            .ok_or(OrxError::Structure(StructureError::StaleGuid(guid)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn setup() -> (StructureRegistry, BodyModule<NullPhysics>) {
        let mut registry = StructureRegistry::new();
        let physics = NullPhysics::new(4, BankFlags::empty()).unwrap();
        let bodies = BodyModule::init(&mut registry, physics).unwrap();
        (registry, bodies)
    }

    #[test]
    fn test_create_sets_owner_and_handle() {
        let (mut registry, mut bodies) = setup();
        let owner = Guid::new(StructureId::Object, 7, 1);
        let def = BodyDef {
            position: Vector::new(1.0, 2.0, 0.0),
            flags: BodyDefFlags::TWO_D | BodyDefFlags::DYNAMIC,
            ..BodyDef::default()
        };

        let body = bodies.create(&mut registry, owner, &def).unwrap();
        assert_eq!(bodies.owner(&registry, body), Some(owner));
        assert_eq!(bodies.position(body), Some(Vector::new(1.0, 2.0, 0.0)));
        assert!(bodies.test_def_flags(body, BodyDefFlags::DYNAMIC));
        assert!(!bodies.test_def_flags(body, BodyDefFlags::HIGH_SPEED));

        let handle = bodies.handle(body).unwrap();
        assert_eq!(bodies.physics().owner(handle), Some(body));
    }

    #[test]
    fn test_state_goes_through_backend() {
        let (mut registry, mut bodies) = setup();
        let body = bodies
            .create(&mut registry, Guid::NONE, &BodyDef::default())
            .unwrap();

        bodies.set_speed(body, Vector::new(0.0, -9.8, 0.0)).unwrap();
        bodies.set_rotation(body, 1.5).unwrap();
        assert_eq!(bodies.speed(body), Some(Vector::new(0.0, -9.8, 0.0)));
        assert_eq!(bodies.rotation(body), Some(1.5));
        assert_eq!(bodies.owner(&registry, body), None);
    }

    #[test]
    fn test_delete_releases_backend_body() {
        let (mut registry, mut bodies) = setup();
        let body = bodies
            .create(&mut registry, Guid::NONE, &BodyDef::default())
            .unwrap();

        registry.increase_counter(body).unwrap();
        assert_eq!(
            bodies.delete(&mut registry, body),
            Err(OrxError::Structure(StructureError::Referenced { guid: body, count: 1 }))
        );
        assert_eq!(bodies.physics().count(), 1);

        registry.decrease_counter(body).unwrap();
        bodies.delete(&mut registry, body).unwrap();
        assert_eq!(bodies.physics().count(), 0);
        assert_eq!(bodies.count(), 0);
        assert!(!registry.contains(body));
        assert_eq!(
            bodies.set_position(body, Vector::ONE),
            Err(OrxError::Structure(StructureError::StaleGuid(body)))
        );
    }

    #[test]
    fn test_backend_refusal_rolls_back() {
        let mut registry = StructureRegistry::new();
        let physics = NullPhysics::new(1, BankFlags::NOT_EXPANDABLE).unwrap();
        let mut bodies = BodyModule::init(&mut registry, physics).unwrap();

        bodies
            .create(&mut registry, Guid::NONE, &BodyDef::default())
            .unwrap();
        assert!(matches!(
            bodies.create(&mut registry, Guid::NONE, &BodyDef::default()),
            Err(OrxError::Physics(_))
        ));
        assert_eq!(registry.get_number(StructureId::Body), Some(1));
        assert_eq!(bodies.count(), 1);
    }

    #[test]
    fn test_exit_releases_everything() {
        let (mut registry, mut bodies) = setup();
        for _ in 0..6 {
            let body = bodies
                .create(&mut registry, Guid::NONE, &BodyDef::default())
                .unwrap();
            registry.increase_counter(body).unwrap();
        }

        bodies.exit(&mut registry).unwrap();
        assert_eq!(registry.get_number(StructureId::Body), Some(0));
        assert_eq!(bodies.physics().count(), 0);
    }

    #[test]
    fn test_tree_registration_refused() {
        let mut registry = StructureRegistry::new();
        registry
            .register(StructureId::Body, StorageKind::Tree, MemoryType::Physics, 8)
            .unwrap();
        let physics = NullPhysics::new(4, BankFlags::empty()).unwrap();
        assert!(matches!(
            BodyModule::init(&mut registry, physics),
            Err(OrxError::Structure(StructureError::WrongStorage { .. }))
        ));
    }
}
