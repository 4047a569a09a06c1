//! # ORX
//!
//! Engine objects built on the `orx_core` structure registry:
//! - [`FrameModule`]: tree-stored spatial hierarchy under a root frame
//! - [`BodyModule`]: list-stored bodies over a [`PhysicsBackend`]
//! - [`FxPointerModule`]: list-stored holders referencing shared FX
//!
//! Modules don't own the registry. Every operation borrows it, so several
//! modules share one registry and see each other's structures.
//!
//! ## Example
//!
//! ```rust
//! use orx::{FrameModule, Transform, Vector};
//! use orx_core::object::StructureRegistry;
//!
//! let mut registry = StructureRegistry::new();
//! let mut frames = FrameModule::init(&mut registry)?;
//!
//! let parent = frames.create(&mut registry, Transform::at(Vector::new(5.0, 0.0, 0.0)))?;
//! let child = frames.create(&mut registry, Transform::at(Vector::new(1.0, 1.0, 0.0)))?;
//! frames.set_parent(&mut registry, child, Some(parent))?;
//!
//! let global = frames.global(&registry, child).unwrap();
//! assert_eq!(global.position, Vector::new(6.0, 1.0, 0.0));
//! # Ok::<(), orx::OrxError>(())
//! ```

#![deny(missing_docs)]
#![deny(unsafe_code)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![deny(clippy::perf)]

pub mod body;
pub mod error;
pub mod frame;
pub mod fx_pointer;
pub mod math;
pub mod slots;

pub use body::{BodyDef, BodyDefFlags, BodyModule, NullPhysics, PhysicsBackend, PhysicsHandle};
pub use error::{OrxError, OrxResult};
pub use frame::{FrameModule, Transform};
pub use fx_pointer::{FxPointerFlags, FxPointerModule, FX_SLOT_NUMBER};
pub use math::Vector;
pub use slots::Slots;
