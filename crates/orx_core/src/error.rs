//! # Core Error Types
//!
//! Recoverable failures of the storage substrate.
//!
//! Invariant violations (double free, corrupted links, zero-sized banks) are
//! not represented here: they panic at the point of detection.

use thiserror::Error;

use crate::object::{Guid, StorageKind, StructureId};

/// Errors returned by [`Bank`](crate::memory::Bank) operations.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum BankError {
    /// The allocator refused to provide memory for a new segment.
    #[error("out of memory: could not allocate a segment of {segment_cells} cells ({cell_size} bytes each)")]
    OutOfMemory {
        /// Cells per segment.
        segment_cells: u32,
        /// Physical size of one cell.
        cell_size: usize,
    },

    /// The bank is full and was created with the not-expandable flag.
    #[error("bank is not expandable and all {capacity} cells are in use")]
    NotExpandable {
        /// Total number of cells the bank can hold.
        capacity: u32,
    },

    /// Another segment would overflow the 32-bit cell index space.
    #[error("bank index space exhausted at {capacity} cells")]
    IndexSpaceExhausted {
        /// Total number of cells the bank can hold.
        capacity: u32,
    },
}

/// Result type for bank operations.
pub type BankResult<T> = Result<T, BankError>;

/// Errors returned by [`Tree`](crate::utils::Tree) operations.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum TreeError {
    /// The node to insert already belongs to a tree.
    #[error("node is already in a tree, remove it from there first or use move_as_child")]
    AlreadyLinked,

    /// The node is not linked into any tree.
    #[error("node is not linked into a tree")]
    NotLinked,

    /// The reference node belongs to another tree (or to none).
    #[error("reference node does not belong to this tree")]
    ForeignTree,

    /// Roots cannot have siblings.
    #[error("can't add a node as a sibling of the root node")]
    RootSibling,

    /// A root can only be removed when it is the last node of its tree.
    #[error("can't remove node: node is root and not the last one in the tree")]
    RootNotAlone,

    /// A branch move would make a node its own ancestor.
    #[error("graph cycle found, invalid move")]
    Cycle,
}

/// Result type for tree operations.
pub type TreeResult<T> = Result<T, TreeError>;

/// Errors returned by [`LinkList`](crate::utils::LinkList) operations.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListError {
    /// The node to insert already belongs to a list.
    #[error("node is already in a list, remove it from there first")]
    AlreadyLinked,

    /// The node is not linked into any list.
    #[error("node is not linked into a list")]
    NotLinked,

    /// The reference node belongs to another list (or to none).
    #[error("reference node does not belong to this list")]
    ForeignList,
}

/// Result type for list operations.
pub type ListResult<T> = Result<T, ListError>;

/// Errors returned by the [`StructureRegistry`](crate::object::StructureRegistry).
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum StructureError {
    /// The structure type has no storage bound to it yet.
    #[error("structure type {0:?} is not registered")]
    NotRegistered(StructureId),

    /// The structure type was already bound to a storage.
    #[error("structure type {0:?} is already registered")]
    AlreadyRegistered(StructureId),

    /// The GUID does not designate a live structure.
    #[error("GUID {0} does not designate a live structure")]
    StaleGuid(Guid),

    /// The operation needs another storage kind.
    #[error("structure type {id:?} is stored as {actual:?}, operation needs {expected:?}")]
    WrongStorage {
        /// Concerned type.
        id: StructureId,
        /// Storage the operation works on.
        expected: StorageKind,
        /// Storage the type was registered with.
        actual: StorageKind,
    },

    /// Parent and child are of different structure types.
    #[error("can't link {child:?} under {parent:?}: structure types differ")]
    TypeMismatch {
        /// Type of the would-be child.
        child: StructureId,
        /// Type of the would-be parent.
        parent: StructureId,
    },

    /// The structure is still referenced and can't be deleted.
    #[error("structure {guid} is still referenced {count} time(s)")]
    Referenced {
        /// Concerned structure.
        guid: Guid,
        /// Current reference counter.
        count: u32,
    },

    /// Cell allocation failed.
    #[error(transparent)]
    Bank(#[from] BankError),

    /// Tree backend refused the operation.
    #[error(transparent)]
    Tree(#[from] TreeError),

    /// List backend refused the operation.
    #[error(transparent)]
    List(#[from] ListError),
}

/// Result type for structure operations.
pub type StructureResult<T> = Result<T, StructureError>;

/// Errors raised while loading a [`CoreConfig`](crate::config::CoreConfig).
#[derive(Error, Debug)]
pub enum ConfigError {
    /// The configuration file could not be read.
    #[error("can't read configuration: {0}")]
    Io(#[from] std::io::Error),

    /// The configuration is not valid TOML or doesn't match the schema.
    #[error("invalid configuration: {0}")]
    Parse(#[from] toml::de::Error),

    /// The configuration is well formed but semantically wrong.
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

/// Result type for configuration loading.
pub type ConfigResult<T> = Result<T, ConfigError>;
