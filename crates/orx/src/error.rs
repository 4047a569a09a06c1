//! # Error Types
//!
//! Failures of the engine object modules.

use orx_core::error::StructureError;
use orx_core::object::{Guid, StructureId};
use thiserror::Error;

/// Errors returned by engine object modules.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum OrxError {
    /// The structure layer refused the operation.
    #[error(transparent)]
    Structure(#[from] StructureError),

    /// The GUID designates a structure of another type.
    #[error("structure {guid} is not a {expected}")]
    WrongType {
        /// Offending GUID.
        guid: Guid,
        /// Type the operation works on.
        expected: StructureId,
    },

    /// Every holder slot is already in use.
    #[error("no free slot left in {guid}")]
    NoFreeSlot {
        /// Concerned holder.
        guid: Guid,
    },

    /// The module's structures are already managed by a live module.
    #[error("{0} module is already initialized")]
    AlreadyInitialized(StructureId),

    /// The physics back-end refused the operation.
    #[error("physics back-end error: {0}")]
    Physics(String),
}

/// Result type for engine object operations.
pub type OrxResult<T> = Result<T, OrxError>;

/// Checks that `guid` designates a structure of type `expected`.
pub(crate) fn expect_type(guid: Guid, expected: StructureId) -> OrxResult<()> {
    if guid.structure_id() == Some(expected) && !guid.is_none() {
        Ok(())
    } else {
        tracing::warn!(%guid, %expected, "structure has the wrong type");
        Err(OrxError::WrongType { guid, expected })
    }
}
