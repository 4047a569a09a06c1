//! # Payload Slots
//!
//! Module-side data of structures, indexed by the GUID's item index.
//!
//! The structure registry only stores headers. Each module keeps what its
//! structures carry in a `Slots` table:
//! - O(1) access by GUID
//! - Stale GUIDs miss, since the whole GUID is compared
//! - Slots are reused as the registry reuses item indices

use orx_core::object::Guid;

/// Sparse table of `T` keyed by GUID.
#[derive(Debug)]
pub struct Slots<T> {
    entries: Vec<Option<(Guid, T)>>,
    len: usize,
}

impl<T> Default for Slots<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Slots<T> {
    /// Creates an empty table.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            entries: Vec::new(),
            len: 0,
        }
    }

    /// Stores `value` for `guid`, returning what was in its slot.
    pub fn insert(&mut self, guid: Guid, value: T) -> Option<(Guid, T)> {
        let index = guid.item() as usize;
        if index >= self.entries.len() {
            self.entries.resize_with(index + 1, || None);
        }
        let previous = self.entries[index].replace((guid, value));
        if previous.is_none() {
            self.len += 1;
        }
        previous
    }

    /// Returns the value stored for `guid`.
    #[inline]
    #[must_use]
    pub fn get(&self, guid: Guid) -> Option<&T> {
        match self.entries.get(guid.item() as usize)? {
            Some((stored, value)) if *stored == guid => Some(value),
            _ => None,
        }
    }

    /// Returns the value stored for `guid` mutably.
    #[inline]
    pub fn get_mut(&mut self, guid: Guid) -> Option<&mut T> {
        match self.entries.get_mut(guid.item() as usize)? {
            Some((stored, value)) if *stored == guid => Some(value),
            _ => None,
        }
    }

    /// Removes and returns the value stored for `guid`.
    pub fn remove(&mut self, guid: Guid) -> Option<T> {
        let slot = self.entries.get_mut(guid.item() as usize)?;
        if !matches!(slot, Some((stored, _)) if *stored == guid) {
            return None;
        }
        self.len -= 1;
        slot.take().map(|(_, value)| value)
    }

    /// Returns the number of stored values.
    #[inline]
    #[must_use]
    pub const fn len(&self) -> usize {
        self.len
    }

    /// Checks whether the table is empty.
    #[inline]
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Drops every value.
    pub fn clear(&mut self) {
        self.entries.clear();
        self.len = 0;
    }
}
