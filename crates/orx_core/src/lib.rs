//! # ORX Core
//!
//! Storage substrate of the engine:
//! - Segmented bank allocator with stable cell indices
//! - Index-linked trees and lists over caller-owned nodes
//! - Structure registry mapping each structure type to a list or tree backend
//!
//! ## Architecture Rules
//!
//! 1. **Handles, not pointers** - cells, nodes and structures are addressed by index or GUID
//! 2. **Two-tier errors** - corrupted invariants panic, expected failures return `Result`
//! 3. **Single owner** - nothing here is shared across threads
//!
//! ## Example
//!
//! ```rust
//! use orx_core::memory::MemoryType;
//! use orx_core::object::{StorageKind, StructureId, StructureRegistry};
//!
//! let mut registry = StructureRegistry::new();
//! registry.register(StructureId::Body, StorageKind::List, MemoryType::Physics, 32)?;
//! let body = registry.create(StructureId::Body)?;
//! assert_eq!(registry.get_first(StructureId::Body), Some(body));
//! # Ok::<(), orx_core::error::StructureError>(())
//! ```

#![deny(missing_docs)]
#![deny(unsafe_code)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![deny(clippy::perf)]

pub mod config;
pub mod error;
pub mod memory;
pub mod object;
pub mod utils;

pub use config::CoreConfig;
pub use error::{BankError, ConfigError, ListError, StructureError, TreeError};
pub use memory::{Bank, BankCell, BankFlags, MemoryType};
pub use object::{Guid, StorageKind, StructureId, StructureRegistry};
pub use utils::{LinkList, NodeId, Tree, TreeId, TreeNode};
