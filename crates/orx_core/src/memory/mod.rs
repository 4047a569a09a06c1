//! # Memory Management
//!
//! Segmented banks of fixed-size cells.
//!
//! ## Design Philosophy
//!
//! Structures never live in loose heap allocations:
//! - Cells are handed out from pre-allocated segments
//! - A cell keeps its index for as long as it is allocated
//! - Segments are only released by an explicit compaction

mod bank;
mod memory_type;

pub use bank::{
    compact_all, physical_cell_size, Allocated, Bank, BankCell, BankFlags, BankIter, Compact,
    CACHE_LINE_SIZE, TAG_SIZE,
};
pub use memory_type::MemoryType;
