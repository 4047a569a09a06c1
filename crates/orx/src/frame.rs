//! # Frames
//!
//! Tree-stored spatial hierarchy.
//!
//! Frames are stored as a tree in the structure registry. A root frame is
//! created at init and every new frame starts as one of its children. Global
//! data composes each ancestor's transform, top-down:
//!
//! ```text
//!   rotation = parent.rotation + local.rotation
//!   scale    = parent.scale * local.scale
//!   position = parent.position + rotate(parent.scale * local.position, parent.rotation)
//! ```

use orx_core::error::StructureError;
use orx_core::memory::MemoryType;
use orx_core::object::{Guid, StorageKind, StructureId, StructureRegistry};
use tracing::{debug, warn};

use crate::error::{expect_type, OrxError, OrxResult};
use crate::math::Vector;
use crate::slots::Slots;

/// Header bank segment size used when frames aren't registered yet.
pub const FRAME_BANK_SIZE: u32 = 1024;

/// Position, rotation and scale of a frame.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Transform {
    /// Position. Z is depth and only ever offset.
    pub position: Vector,
    /// Rotation in radians around Z.
    pub rotation: f32,
    /// Scale on X/Y. Z is ignored.
    pub scale: Vector,
}

impl Default for Transform {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl Transform {
    /// No offset, no rotation, unit scale.
    pub const IDENTITY: Self = Self {
        position: Vector::ZERO,
        rotation: 0.0,
        scale: Vector::ONE,
    };

    /// Creates a transform at `position`.
    #[inline]
    #[must_use]
    pub const fn at(position: Vector) -> Self {
        Self {
            position,
            ..Self::IDENTITY
        }
    }

    /// Places `local` in the space of `self`.
    #[must_use]
    pub fn compose(&self, local: &Self) -> Self {
        let planar = Vector::new(local.position.x, local.position.y, 0.0)
            .scaled(self.scale)
            .rotated_2d(self.rotation);

        Self {
            position: Vector::new(
                self.position.x + planar.x,
                self.position.y + planar.y,
                self.position.z + local.position.z,
            ),
            rotation: self.rotation + local.rotation,
            scale: Vector::new(self.scale.x * local.scale.x, self.scale.y * local.scale.y, 1.0),
        }
    }
}

/// Frame module: owns the root frame and every frame's local transform.
#[derive(Debug)]
pub struct FrameModule {
    root: Guid,
    frames: Slots<Transform>,
}

impl FrameModule {
    /// Registers frames as tree-stored if needed and creates the root frame.
    ///
    /// # Errors
    ///
    /// Returns an error if frames are registered as list-stored, if a frame
    /// tree already exists, or if the root can't be created.
    pub fn init(registry: &mut StructureRegistry) -> OrxResult<Self> {
        match registry.get_storage_kind(StructureId::Frame) {
            None => registry.register(
                StructureId::Frame,
                StorageKind::Tree,
                MemoryType::Main,
                FRAME_BANK_SIZE,
            )?,
            Some(StorageKind::Tree) => {
                if let Some(root) = registry.get_first(StructureId::Frame) {
                    warn!(%root, "frame tree already has a root");
                    return Err(OrxError::AlreadyInitialized(StructureId::Frame));
                }
            }
            Some(actual) => {
                warn!(?actual, "frames must be stored as a tree");
                return Err(StructureError::WrongStorage {
                    id: StructureId::Frame,
                    expected: StorageKind::Tree,
                    actual,
                }
                .into());
            }
        }

        let root = registry.create(StructureId::Frame)?;
        let mut frames = Slots::new();
        frames.insert(root, Transform::IDENTITY);

        debug!(%root, "frame module initialized");
        Ok(Self { root, frames })
    }

    /// Returns the root frame.
    #[inline]
    #[must_use]
    pub const fn root(&self) -> Guid {
        self.root
    }

    /// Returns the number of frames, root included.
    #[inline]
    #[must_use]
    pub const fn count(&self) -> usize {
        self.frames.len()
    }

    /// Creates a frame under the root.
    ///
    /// # Errors
    ///
    /// Returns the structure layer's error if the frame can't be created.
    pub fn create(&mut self, registry: &mut StructureRegistry, local: Transform) -> OrxResult<Guid> {
        let guid = registry.create(StructureId::Frame)?;
        self.frames.insert(guid, local);
        Ok(guid)
    }

    /// Deletes an unreferenced frame. Its children move up to its parent.
    ///
    /// # Errors
    ///
    /// Returns [`StructureError::Referenced`] if the frame is still referenced,
    /// or the structure layer's error (the root can only go last).
    pub fn delete(&mut self, registry: &mut StructureRegistry, guid: Guid) -> OrxResult<()> {
        expect_type(guid, StructureId::Frame)?;
        match registry.get_counter(guid) {
            Some(0) => {}
            Some(count) => {
                warn!(%guid, count, "tried to delete frame when it was still referenced");
                return Err(StructureError::Referenced { guid, count }.into());
            }
            None => return Err(StructureError::StaleGuid(guid).into()),
        }

        registry.delete(guid)?;
        self.frames.remove(guid);
        Ok(())
    }

    /// Moves a frame and its children under `parent`, or under the root for `None`.
    ///
    /// # Errors
    ///
    /// Returns an error for non-frame GUIDs, or if `parent` is inside the
    /// moved branch.
    pub fn set_parent(
        &mut self,
        registry: &mut StructureRegistry,
        guid: Guid,
        parent: Option<Guid>,
    ) -> OrxResult<()> {
        let parent = parent.unwrap_or(self.root);
        expect_type(guid, StructureId::Frame)?;
        expect_type(parent, StructureId::Frame)?;
        registry.set_parent(guid, parent).map_err(OrxError::from)
    }

    /// Returns a frame's parent, `None` for the root.
    #[must_use]
    pub fn parent(&self, registry: &StructureRegistry, guid: Guid) -> Option<Guid> {
        registry.get_parent(guid)
    }

    /// Iterates over a frame's children.
    pub fn children<'a>(
        &self,
        registry: &'a StructureRegistry,
        guid: Guid,
    ) -> impl Iterator<Item = Guid> + 'a {
        std::iter::successors(registry.get_child(guid), move |&child| {
            registry.get_right_sibling(child)
        })
    }

    /// Checks whether a frame hangs right under the root.
    #[must_use]
    pub fn is_root_child(&self, registry: &StructureRegistry, guid: Guid) -> bool {
        registry.get_parent(guid) == Some(self.root)
    }

    /// Returns a frame's local transform.
    #[must_use]
    pub fn local(&self, guid: Guid) -> Option<&Transform> {
        self.frames.get(guid)
    }

    /// Replaces a frame's local transform.
    ///
    /// # Errors
    ///
    /// Returns [`StructureError::StaleGuid`] if the frame doesn't exist.
    pub fn set_local(&mut self, guid: Guid, local: Transform) -> OrxResult<()> {
        let frame = self.frame_mut(guid)?;
        *frame = local;
        Ok(())
    }

    /// Sets a frame's local position.
    ///
    /// # Errors
    ///
    /// Returns [`StructureError::StaleGuid`] if the frame doesn't exist.
    pub fn set_position(&mut self, guid: Guid, position: Vector) -> OrxResult<()> {
        self.frame_mut(guid)?.position = position;
        Ok(())
    }

    /// Sets a frame's local rotation.
    ///
    /// # Errors
    ///
    /// Returns [`StructureError::StaleGuid`] if the frame doesn't exist.
    pub fn set_rotation(&mut self, guid: Guid, rotation: f32) -> OrxResult<()> {
        self.frame_mut(guid)?.rotation = rotation;
        Ok(())
    }

    /// Sets a frame's local scale.
    ///
    /// # Errors
    ///
    /// Returns [`StructureError::StaleGuid`] if the frame doesn't exist.
    pub fn set_scale(&mut self, guid: Guid, scale: Vector) -> OrxResult<()> {
        self.frame_mut(guid)?.scale = scale;
        Ok(())
    }

    /// Resolves a frame's global transform by walking its ancestors.
    #[must_use]
    pub fn global(&self, registry: &StructureRegistry, guid: Guid) -> Option<Transform> {
        let mut chain = vec![guid];
        while let Some(parent) = chain.last().and_then(|&last| registry.get_parent(last)) {
            chain.push(parent);
        }

        chain.iter().rev().try_fold(None, |parent: Option<Transform>, &frame| {
            let local = self.frames.get(frame)?;
            Some(Some(match parent {
                Some(parent) => parent.compose(local),
                None => *local,
            }))
        })?
    }

    /// Deletes every frame, referenced or not, then the root.
    ///
    /// # Errors
    ///
    /// Returns the structure layer's error if a frame can't be removed.
    pub fn exit(&mut self, registry: &mut StructureRegistry) -> OrxResult<()> {
        while let Some(child) = registry.get_child(self.root) {
            registry.delete(child)?;
        }
        registry.delete(self.root)?;
        self.frames.clear();

        debug!("frame module exited");
        Ok(())
    }

    fn frame_mut(&mut self, guid: Guid) -> OrxResult<&mut Transform> {
        self.frames
            .get_mut(guid)
            .ok_or(OrxError::Structure(StructureError::StaleGuid(guid)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use orx_core::error::TreeError;
    use std::f32::consts::FRAC_PI_2;

    fn setup() -> (StructureRegistry, FrameModule) {
        let mut registry = StructureRegistry::new();
        let frames = FrameModule::init(&mut registry).unwrap();
        (registry, frames)
    }

    fn close(a: Vector, b: Vector) -> bool {
        a.distance_squared(b) < 1e-8
    }

    #[test]
    fn test_new_frames_hang_under_root() {
        let (mut registry, mut frames) = setup();
        let a = frames.create(&mut registry, Transform::IDENTITY).unwrap();
        let b = frames.create(&mut registry, Transform::IDENTITY).unwrap();

        assert!(frames.is_root_child(&registry, a));
        assert_eq!(frames.parent(&registry, frames.root()), None);
        assert_eq!(
            frames.children(&registry, frames.root()).collect::<Vec<_>>(),
            vec![b, a]
        );
        assert_eq!(frames.count(), 3);
    }

    #[test]
    fn test_set_parent_and_cycle() {
        let (mut registry, mut frames) = setup();
        let a = frames.create(&mut registry, Transform::IDENTITY).unwrap();
        let b = frames.create(&mut registry, Transform::IDENTITY).unwrap();

        frames.set_parent(&mut registry, b, Some(a)).unwrap();
        assert_eq!(frames.parent(&registry, b), Some(a));
        assert_eq!(
            frames.set_parent(&mut registry, a, Some(b)),
            Err(OrxError::Structure(StructureError::Tree(TreeError::Cycle)))
        );

        frames.set_parent(&mut registry, b, None).unwrap();
        assert!(frames.is_root_child(&registry, b));
    }

    #[test]
    fn test_delete_is_reference_gated() {
        let (mut registry, mut frames) = setup();
        let a = frames.create(&mut registry, Transform::IDENTITY).unwrap();
        let b = frames.create(&mut registry, Transform::IDENTITY).unwrap();
        frames.set_parent(&mut registry, b, Some(a)).unwrap();

        registry.increase_counter(a).unwrap();
        assert_eq!(
            frames.delete(&mut registry, a),
            Err(OrxError::Structure(StructureError::Referenced { guid: a, count: 1 }))
        );
        assert!(frames.local(a).is_some());

        registry.decrease_counter(a).unwrap();
        frames.delete(&mut registry, a).unwrap();
        assert!(frames.local(a).is_none());
        assert!(frames.is_root_child(&registry, b));
    }

    #[test]
    fn test_wrong_type_refused() {
        let (mut registry, mut frames) = setup();
        let foreign = Guid::new(StructureId::Body, 0, 1);
        assert_eq!(
            frames.delete(&mut registry, foreign),
            Err(OrxError::WrongType {
                guid: foreign,
                expected: StructureId::Frame
            })
        );
    }

    #[test]
    fn test_global_transform() {
        let (mut registry, mut frames) = setup();
        let arm = frames
            .create(
                &mut registry,
                Transform {
                    position: Vector::new(10.0, 0.0, 1.0),
                    rotation: FRAC_PI_2,
                    scale: Vector::new(2.0, 2.0, 1.0),
                },
            )
            .unwrap();
        let hand = frames
            .create(&mut registry, Transform::at(Vector::new(1.0, 0.0, 0.5)))
            .unwrap();
        frames.set_parent(&mut registry, hand, Some(arm)).unwrap();

        let global = frames.global(&registry, hand).unwrap();
        assert!(close(global.position, Vector::new(10.0, 2.0, 1.5)));
        assert!((global.rotation - FRAC_PI_2).abs() < 1e-6);
        assert_eq!(global.scale, Vector::new(2.0, 2.0, 1.0));

        frames.set_rotation(arm, 0.0).unwrap();
        frames.set_scale(arm, Vector::ONE).unwrap();
        frames.set_position(hand, Vector::new(0.0, 3.0, 0.0)).unwrap();
        let global = frames.global(&registry, hand).unwrap();
        assert!(close(global.position, Vector::new(10.0, 3.0, 1.0)));
    }

    #[test]
    fn test_second_init_refused() {
        let (mut registry, mut frames) = setup();
        let a = frames.create(&mut registry, Transform::IDENTITY).unwrap();

        assert_eq!(
            FrameModule::init(&mut registry).unwrap_err(),
            OrxError::AlreadyInitialized(StructureId::Frame)
        );
        assert_eq!(registry.get_number(StructureId::Frame), Some(2));
        assert_eq!(registry.get_first(StructureId::Frame), Some(frames.root()));

        let b = frames.create(&mut registry, Transform::IDENTITY).unwrap();
        assert!(frames.is_root_child(&registry, a));
        assert!(frames.is_root_child(&registry, b));

        // A new module takes over once the tree is gone
        frames.exit(&mut registry).unwrap();
        let mut next = FrameModule::init(&mut registry).unwrap();
        assert_eq!(registry.get_parent(next.root()), None);
        let c = next.create(&mut registry, Transform::IDENTITY).unwrap();
        assert!(next.is_root_child(&registry, c));
        next.exit(&mut registry).unwrap();
        assert_eq!(registry.get_number(StructureId::Frame), Some(0));
    }

    #[test]
    fn test_exit_deletes_referenced_frames() {
        let (mut registry, mut frames) = setup();
        let a = frames.create(&mut registry, Transform::IDENTITY).unwrap();
        frames.create(&mut registry, Transform::IDENTITY).unwrap();
        registry.increase_counter(a).unwrap();

        frames.exit(&mut registry).unwrap();
        assert_eq!(registry.get_number(StructureId::Frame), Some(0));
        assert_eq!(frames.count(), 0);
    }

    #[test]
    fn test_list_registration_refused() {
        let mut registry = StructureRegistry::new();
        registry
            .register(StructureId::Frame, StorageKind::List, MemoryType::Main, 8)
            .unwrap();
        assert!(matches!(
            FrameModule::init(&mut registry),
            Err(OrxError::Structure(StructureError::WrongStorage { .. }))
        ));
    }
}
