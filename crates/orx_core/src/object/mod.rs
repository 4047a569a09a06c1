//! # Structures
//!
//! Generic header and storage shared by every engine entity.
//!
//! ## Lifecycle
//!
//! 1. A type is registered with a list or tree backend
//! 2. [`StructureRegistry::create`] allocates a header and links a node
//! 3. [`StructureRegistry::delete`] unlinks the node and frees both cells
//!
//! Reference counting is cooperative: the registry counts, owners decide.

mod id;
mod structure;

pub use id::{Guid, StorageKind, StructureId};
pub use structure::{StorageHandle, StructureHeader, StructureRegistry, TypeInfo, UpdateHook};
