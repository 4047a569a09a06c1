//! # Bank Allocator
//!
//! Growable slab allocator handing out fixed-size cells.
//!
//! A bank is an ordered list of segments. Each segment holds the same number
//! of cells and a cell map with one bit per cell (set = free). Allocation
//! picks the first segment with a free cell and, inside it, the lowest free
//! index, so indices are handed out in increasing order within a segment.
//!
//! Every cell is stamped with its global index when allocated. The index
//! stays valid until that cell is freed, whatever happens to other cells.
//!
//! ```text
//!   index = segment_index * segment_size + cell_index
//!
//!   segment 0: [cells 0..N)   map: [u32; ceil(N / 32)]   free: N
//!   segment 1: [cells N..2N)  map: ...                   free: ...
//! ```

use std::mem;
use std::ops::{Deref, DerefMut};

use bitflags::bitflags;
use tracing::{debug, trace, warn};

use super::MemoryType;
use crate::error::{BankError, BankResult};

/// Size of the hidden index tag carried by every cell.
pub const TAG_SIZE: usize = 8;

/// Alignment granularity for cells larger than a cache line.
#[cfg(any(target_os = "android", target_os = "ios"))]
pub const CACHE_LINE_SIZE: usize = 32;

/// Alignment granularity for cells larger than a cache line.
#[cfg(not(any(target_os = "android", target_os = "ios")))]
pub const CACHE_LINE_SIZE: usize = 64;

/// Bits per cell map word.
const MAP_WORD_BITS: u32 = u32::BITS;

bitflags! {
    /// Creation flags of a bank.
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
    pub struct BankFlags: u32 {
        /// The bank never grows past its first segment.
        const NOT_EXPANDABLE = 0x0000_0001;
    }
}

/// Computes the physical size of a cell holding `requested` bytes.
///
/// The tag is added first. Sizes above a cache line are rounded up to a
/// multiple of it, smaller ones to the next power of two.
#[must_use]
pub const fn physical_cell_size(requested: usize) -> usize {
    let size = requested + TAG_SIZE;
    if size > CACHE_LINE_SIZE {
        (size + CACHE_LINE_SIZE - 1) & !(CACHE_LINE_SIZE - 1)
    } else {
        size.next_power_of_two()
    }
}

/// Free bits of map word `word` in a fresh segment of `segment_size` cells.
///
/// Padding bits past the last cell stay cleared so they are never handed out.
const fn full_word(segment_size: u32, word: usize) -> u32 {
    let first = word as u32 * MAP_WORD_BITS;
    let bits = segment_size - first;
    if bits >= MAP_WORD_BITS {
        u32::MAX
    } else {
        (1 << bits) - 1
    }
}

/// A bank cell: the stored value behind its index tag.
#[derive(Clone, Debug, Default)]
pub struct BankCell<T> {
    tag: u32,
    value: T,
}

impl<T> BankCell<T> {
    /// Returns the global index stamped on this cell at allocation.
    #[inline]
    #[must_use]
    pub const fn index(&self) -> u32 {
        self.tag
    }

    /// Returns the stored value.
    #[inline]
    #[must_use]
    pub const fn value(&self) -> &T {
        &self.value
    }
}

impl<T> Deref for BankCell<T> {
    type Target = T;

    #[inline]
    fn deref(&self) -> &T {
        &self.value
    }
}

impl<T> DerefMut for BankCell<T> {
    #[inline]
    fn deref_mut(&mut self) -> &mut T {
        &mut self.value
    }
}

/// Result of [`Bank::allocate_indexed`].
#[derive(Debug)]
pub struct Allocated<'a, T> {
    /// The freshly allocated cell, holding `T::default()`.
    pub cell: &'a mut BankCell<T>,
    /// Global index of the cell.
    pub index: u32,
    /// Slot right before this one in storage order, if any.
    ///
    /// This is the preceding slot of the same segment, or the last slot of
    /// the previous segment for a segment's first cell. It may be free.
    pub previous: Option<u32>,
}

/// One contiguous block of cells with its cell map.
#[derive(Debug)]
struct Segment<T> {
    cells: Box<[BankCell<T>]>,
    /// One bit per cell, set = free.
    map: Box<[u32]>,
    free: u32,
}

impl<T: Default> Segment<T> {
    /// Allocates a segment, reporting allocator refusal instead of aborting.
    fn try_new(segment_size: u32, map_words: usize) -> Option<Self> {
        let mut cells = Vec::new();
        cells.try_reserve_exact(segment_size as usize).ok()?;
        cells.resize_with(segment_size as usize, BankCell::default);

        let mut map = Vec::new();
        map.try_reserve_exact(map_words).ok()?;
        map.extend((0..map_words).map(|word| full_word(segment_size, word)));

        Some(Self {
            cells: cells.into_boxed_slice(),
            map: map.into_boxed_slice(),
            free: segment_size,
        })
    }
}

impl<T> Segment<T> {
    #[inline]
    fn is_free(&self, cell_index: u32) -> bool {
        self.map[(cell_index / MAP_WORD_BITS) as usize] & (1 << (cell_index % MAP_WORD_BITS)) != 0
    }
}

/// A segmented allocator of `T` cells with stable indices.
///
/// Free cells always hold `T::default()`. Freeing a cell hands its value
/// back to the caller.
///
/// # Thread Safety
///
/// Banks are NOT thread-safe. They are owned by the engine thread.
///
/// # Example
///
/// ```rust
/// use orx_core::memory::{Bank, BankFlags, MemoryType};
///
/// let mut bank: Bank<u64> = Bank::new(4, BankFlags::empty(), MemoryType::Main)?;
/// let index = {
///     let cell = bank.allocate()?;
///     **cell = 42;
///     cell.index()
/// };
/// assert_eq!(bank.get_at_index(index).map(|cell| **cell), Some(42));
/// assert_eq!(bank.free(index), 42);
/// # Ok::<(), orx_core::error::BankError>(())
/// ```
#[derive(Debug)]
pub struct Bank<T> {
    segments: Vec<Segment<T>>,
    segment_size: u32,
    map_words: usize,
    count: u32,
    flags: BankFlags,
    memory_type: MemoryType,
}

impl<T: Default> Bank<T> {
    /// Creates a bank and its first segment.
    ///
    /// # Arguments
    ///
    /// * `segment_size` - Number of cells per segment
    /// * `flags` - Creation flags
    /// * `memory_type` - Diagnostic memory tag
    ///
    /// # Errors
    ///
    /// Returns [`BankError::OutOfMemory`] if the first segment can't be allocated.
    ///
    /// # Panics
    ///
    /// Panics if `segment_size` is zero.
    pub fn new(segment_size: u32, flags: BankFlags, memory_type: MemoryType) -> BankResult<Self> {
        assert!(segment_size > 0, "Segment size must be greater than zero");

        let mut bank = Self {
            segments: Vec::new(),
            segment_size,
            map_words: segment_size.div_ceil(MAP_WORD_BITS) as usize,
            count: 0,
            flags,
            memory_type,
        };
        bank.push_segment()?;

        debug!(
            segment_size,
            cell_size = bank.cell_size(),
            memory = %memory_type,
            "bank created"
        );

        Ok(bank)
    }

    /// Allocates a cell.
    ///
    /// # Errors
    ///
    /// Returns an error if every segment is full and no new one can be added.
    pub fn allocate(&mut self) -> BankResult<&mut BankCell<T>> {
        self.allocate_indexed().map(|allocated| allocated.cell)
    }

    /// Allocates a cell and reports its index and previous neighbour.
    ///
    /// Segments are scanned in order; inside the first one with room, the
    /// lowest free cell wins. A new segment is appended when all are full.
    ///
    /// # Errors
    ///
    /// Returns [`BankError::NotExpandable`] if the bank is full and may not
    /// grow, or [`BankError::OutOfMemory`] if a new segment can't be allocated.
    pub fn allocate_indexed(&mut self) -> BankResult<Allocated<'_, T>> {
        let segment_index = match self.segments.iter().position(|segment| segment.free > 0) {
            Some(segment_index) => segment_index,
            None => {
                self.grow()?;
                self.segments.len() - 1
            }
        };

        let segment = &mut self.segments[segment_index];
        let Some((word_index, word)) = segment
            .map
            .iter()
            .copied()
            .enumerate()
            .find(|&(_, word)| word != 0)
        else {
            panic!("cell map of segment {segment_index} disagrees with its free count");
        };

        let cell_index = word_index as u32 * MAP_WORD_BITS + word.trailing_zeros();
        segment.map[word_index] &= !(1 << word.trailing_zeros());
        segment.free -= 1;
        self.count += 1;

        let index = segment_index as u32 * self.segment_size + cell_index;
        let cell = &mut segment.cells[cell_index as usize];
        cell.tag = index;

        trace!(index, "bank cell allocated");

        Ok(Allocated {
            cell,
            index,
            // Storage order is global index order
            previous: index.checked_sub(1),
        })
    }

    /// Frees the cell at `index` and returns its value.
    ///
    /// # Panics
    ///
    /// Panics if `index` lies outside every segment or the cell is already free.
    pub fn free(&mut self, index: u32) -> T {
        let (segment_index, cell_index) = self.locate(index);
        let segment_count = self.segments.len();
        let Some(segment) = self.segments.get_mut(segment_index) else {
            panic!("bank cell {index} lies outside the bank's {segment_count} segment(s)");
        };

        let word = (cell_index / MAP_WORD_BITS) as usize;
        let bit = 1 << (cell_index % MAP_WORD_BITS);
        assert!(segment.map[word] & bit == 0, "double free of bank cell {index}");

        segment.map[word] |= bit;
        segment.free += 1;
        self.count -= 1;

        trace!(index, "bank cell freed");

        let cell = &mut segment.cells[cell_index as usize];
        cell.tag = 0;
        mem::take(&mut cell.value)
    }

    /// Frees every cell without releasing any segment.
    ///
    /// Stored values are dropped.
    pub fn clear(&mut self) {
        for segment in &mut self.segments {
            for (word, bits) in segment.map.iter_mut().enumerate() {
                *bits = full_word(self.segment_size, word);
            }
            for cell in segment.cells.iter_mut() {
                *cell = BankCell::default();
            }
            segment.free = self.segment_size;
        }
        self.count = 0;
    }

    /// Releases trailing segments that hold no live cell.
    ///
    /// Segments before the last live one are kept so that indices stay
    /// stable. The first segment is never released.
    pub fn compact(&mut self) {
        let keep = self
            .segments
            .iter()
            .rposition(|segment| segment.free < self.segment_size)
            .map_or(1, |last_used| last_used + 1);

        if keep < self.segments.len() {
            debug!(
                released = self.segments.len() - keep,
                kept = keep,
                "bank compacted"
            );
            self.segments.truncate(keep);
            self.segments.shrink_to_fit();
        }
    }

    fn grow(&mut self) -> BankResult<()> {
        if self.flags.contains(BankFlags::NOT_EXPANDABLE) {
            warn!(capacity = self.capacity(), "bank is full and not expandable");
            return Err(BankError::NotExpandable {
                capacity: self.capacity(),
            });
        }
        self.push_segment()?;
        debug!(segments = self.segments.len(), "bank segment added");
        Ok(())
    }

    fn push_segment(&mut self) -> BankResult<()> {
        let capacity = u64::from(self.capacity()) + u64::from(self.segment_size);
        if capacity > u64::from(u32::MAX) {
            warn!(capacity = self.capacity(), "bank index space exhausted");
            return Err(BankError::IndexSpaceExhausted {
                capacity: self.capacity(),
            });
        }

        let out_of_memory = BankError::OutOfMemory {
            segment_cells: self.segment_size,
            cell_size: self.cell_size(),
        };
        let segment = Segment::try_new(self.segment_size, self.map_words).ok_or_else(|| {
            warn!(segment_size = self.segment_size, "can't allocate bank segment");
            out_of_memory
        })?;
        self.segments.try_reserve(1).map_err(|_| out_of_memory)?;
        self.segments.push(segment);
        Ok(())
    }
}

impl<T> Bank<T> {
    /// Returns the next allocated cell index after `current`.
    ///
    /// `None` starts from the first allocated cell. Order is segment first,
    /// then cell index. Returns `None` once every allocated cell was visited.
    ///
    /// # Panics
    ///
    /// Panics if `current` lies outside every segment.
    #[must_use]
    pub fn get_next(&self, current: Option<u32>) -> Option<u32> {
        if self.count == 0 {
            return None;
        }

        let (mut segment_index, mut word_index, mut mask) = match current {
            None => (0, 0, u32::MAX),
            Some(index) => {
                let (segment_index, cell_index) = self.locate(index);
                assert!(
                    segment_index < self.segments.len(),
                    "bank cell {index} lies outside the bank"
                );
                let bit = cell_index % MAP_WORD_BITS;
                // Skip the current bit and every one below it
                let mask = if bit == MAP_WORD_BITS - 1 {
                    0
                } else {
                    !((1 << (bit + 1)) - 1)
                };
                (segment_index, (cell_index / MAP_WORD_BITS) as usize, mask)
            }
        };

        while let Some(segment) = self.segments.get(segment_index) {
            while word_index < self.map_words {
                let used =
                    !segment.map[word_index] & full_word(self.segment_size, word_index) & mask;
                if used != 0 {
                    let cell_index = word_index as u32 * MAP_WORD_BITS + used.trailing_zeros();
                    return Some(segment_index as u32 * self.segment_size + cell_index);
                }
                word_index += 1;
                mask = u32::MAX;
            }
            segment_index += 1;
            word_index = 0;
        }

        None
    }

    /// Returns the cell at `index` if it is currently allocated.
    #[must_use]
    pub fn get_at_index(&self, index: u32) -> Option<&BankCell<T>> {
        let (segment_index, cell_index) = self.locate(index);
        let segment = self.segments.get(segment_index)?;
        (!segment.is_free(cell_index)).then(|| &segment.cells[cell_index as usize])
    }

    /// Returns the cell at `index` mutably if it is currently allocated.
    #[must_use]
    pub fn get_at_index_mut(&mut self, index: u32) -> Option<&mut BankCell<T>> {
        let (segment_index, cell_index) = self.locate(index);
        let segment = self.segments.get_mut(segment_index)?;
        if segment.is_free(cell_index) {
            None
        } else {
            Some(&mut segment.cells[cell_index as usize])
        }
    }

    /// Reads a cell's tag, or `None` if that slot is not allocated anymore.
    #[must_use]
    pub fn get_index(&self, cell: &BankCell<T>) -> Option<u32> {
        self.get_at_index(cell.tag).map(|_| cell.tag)
    }

    /// Checks whether `index` is currently allocated.
    #[inline]
    #[must_use]
    pub fn is_allocated(&self, index: u32) -> bool {
        self.get_at_index(index).is_some()
    }

    /// Returns the number of allocated cells.
    #[inline]
    #[must_use]
    pub const fn count(&self) -> u32 {
        self.count
    }

    /// Returns the number of segments.
    #[inline]
    #[must_use]
    pub fn segment_count(&self) -> usize {
        self.segments.len()
    }

    /// Returns the number of cells per segment.
    #[inline]
    #[must_use]
    pub const fn segment_size(&self) -> u32 {
        self.segment_size
    }

    /// Returns the number of cells the current segments can hold.
    #[inline]
    #[must_use]
    pub fn capacity(&self) -> u32 {
        self.segments.len() as u32 * self.segment_size
    }

    /// Returns the physical size of one cell, tag included.
    #[inline]
    #[must_use]
    pub const fn cell_size(&self) -> usize {
        physical_cell_size(mem::size_of::<T>())
    }

    /// Returns the creation flags.
    #[inline]
    #[must_use]
    pub const fn flags(&self) -> BankFlags {
        self.flags
    }

    /// Returns the diagnostic memory tag.
    #[inline]
    #[must_use]
    pub const fn memory_type(&self) -> MemoryType {
        self.memory_type
    }

    /// Iterates over allocated cells in storage order.
    #[must_use]
    pub fn iter(&self) -> BankIter<'_, T> {
        BankIter {
            bank: self,
            current: None,
            done: false,
        }
    }

    /// Iterates mutably over allocated cells in storage order.
    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut BankCell<T>> {
        self.segments.iter_mut().flat_map(|segment| {
            let Segment { cells, map, .. } = segment;
            let map: &[u32] = map;
            cells.iter_mut().enumerate().filter_map(move |(cell_index, cell)| {
                let used = map[cell_index / MAP_WORD_BITS as usize]
                    & (1 << (cell_index as u32 % MAP_WORD_BITS))
                    == 0;
                used.then_some(cell)
            })
        })
    }

    /// Logs every segment's free count and cell map at debug level.
    pub fn debug_dump(&self) {
        debug!(
            segment_size = self.segment_size,
            cell_size = self.cell_size(),
            flags = ?self.flags,
            memory = %self.memory_type,
            count = self.count,
            "bank"
        );
        for (segment_index, segment) in self.segments.iter().enumerate() {
            debug!(segment = segment_index, free = segment.free, map = ?segment.map, "bank segment");
        }
    }

    #[inline]
    fn locate(&self, index: u32) -> (usize, u32) {
        (
            (index / self.segment_size) as usize,
            index % self.segment_size,
        )
    }
}

impl<'a, T> IntoIterator for &'a Bank<T> {
    type Item = &'a BankCell<T>;
    type IntoIter = BankIter<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// Iterator over a bank's allocated cells, driven by [`Bank::get_next`].
#[derive(Debug)]
pub struct BankIter<'a, T> {
    bank: &'a Bank<T>,
    current: Option<u32>,
    done: bool,
}

impl<'a, T> Iterator for BankIter<'a, T> {
    type Item = &'a BankCell<T>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        match self.bank.get_next(self.current) {
            Some(index) => {
                self.current = Some(index);
                self.bank.get_at_index(index)
            }
            None => {
                self.done = true;
                None
            }
        }
    }
}

/// Banks that can release their unused trailing segments.
pub trait Compact {
    /// Releases trailing segments that hold no live cell.
    fn compact(&mut self);
}

impl<T: Default> Compact for Bank<T> {
    fn compact(&mut self) {
        Bank::compact(self);
    }
}

/// Compacts every bank of a heterogeneous set.
pub fn compact_all(banks: &mut [&mut dyn Compact]) {
    for bank in banks.iter_mut() {
        bank.compact();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bank<T: Default>(segment_size: u32) -> Bank<T> {
        Bank::new(segment_size, BankFlags::empty(), MemoryType::Main).unwrap()
    }

    #[test]
    fn test_cell_size_rounding() {
        assert_eq!(physical_cell_size(1), 16);
        assert_eq!(physical_cell_size(8), 16);
        assert_eq!(physical_cell_size(9), 32);
        assert_eq!(physical_cell_size(CACHE_LINE_SIZE), 2 * CACHE_LINE_SIZE);
        assert_eq!(physical_cell_size(CACHE_LINE_SIZE - TAG_SIZE), CACHE_LINE_SIZE);
    }

    #[test]
    fn test_allocate_grows_segments() {
        let mut bank: Bank<u64> = bank(4);
        for expected in 0..6 {
            assert_eq!(bank.allocate().unwrap().index(), expected);
        }
        assert_eq!(bank.segment_count(), 2);
        assert_eq!(bank.count(), 6);

        bank.free(2);
        assert!(bank.get_at_index(2).is_none());
        assert_eq!(bank.count(), 5);
    }

    #[test]
    fn test_lowest_free_index_reused() {
        let mut bank: Bank<u32> = bank(64);
        for _ in 0..40 {
            bank.allocate().unwrap();
        }
        bank.free(35);
        bank.free(3);
        assert_eq!(bank.allocate().unwrap().index(), 3);
        assert_eq!(bank.allocate().unwrap().index(), 35);
        assert_eq!(bank.allocate().unwrap().index(), 40);
    }

    #[test]
    fn test_free_returns_value_and_resets_cell() {
        let mut bank: Bank<String> = bank(2);
        let index = {
            let cell = bank.allocate().unwrap();
            cell.push_str("frame");
            cell.index()
        };
        assert_eq!(bank.free(index), "frame");
        assert!(bank.allocate().unwrap().is_empty());
    }

    // Lookups must stay available without `T: Default`
    fn live_indices<T>(bank: &mut Bank<T>, upto: u32) -> Vec<u32> {
        let mut live = Vec::new();
        for index in 0..upto {
            let found = bank.get_at_index_mut(index).is_some();
            assert_eq!(found, bank.get_at_index(index).is_some());
            if found {
                live.push(index);
            }
        }
        live
    }

    #[test]
    fn test_lookup_without_default_bound() {
        let mut bank: Bank<u16> = bank(4);
        for _ in 0..5 {
            bank.allocate().unwrap();
        }
        bank.free(1);
        assert_eq!(live_indices(&mut bank, 8), vec![0, 2, 3, 4]);
    }

    #[test]
    fn test_previous_neighbour() {
        let mut bank: Bank<u8> = bank(2);
        assert_eq!(bank.allocate_indexed().unwrap().previous, None);
        assert_eq!(bank.allocate_indexed().unwrap().previous, Some(0));
        // First slot of second segment points at last slot of the first one
        let allocated = bank.allocate_indexed().unwrap();
        assert_eq!((allocated.index, allocated.previous), (2, Some(1)));
    }

    #[test]
    fn test_not_expandable() {
        let mut bank: Bank<u8> = Bank::new(3, BankFlags::NOT_EXPANDABLE, MemoryType::Temp).unwrap();
        for _ in 0..3 {
            bank.allocate().unwrap();
        }
        assert_eq!(
            bank.allocate().unwrap_err(),
            BankError::NotExpandable { capacity: 3 }
        );
        assert_eq!(bank.segment_count(), 1);
    }

    #[test]
    fn test_get_next_order_and_word_boundaries() {
        let mut bank: Bank<u16> = bank(40);
        for _ in 0..80 {
            bank.allocate().unwrap();
        }
        for index in (0..80).filter(|index| index % 3 != 0) {
            bank.free(index);
        }
        let visited: Vec<u32> = std::iter::successors(bank.get_next(None), |&index| {
            bank.get_next(Some(index))
        })
        .collect();
        let expected: Vec<u32> = (0..80).filter(|index| index % 3 == 0).collect();
        assert_eq!(visited, expected);
        assert_eq!(visited.len(), bank.count() as usize);
        assert_eq!(bank.iter().map(BankCell::index).collect::<Vec<_>>(), expected);
    }

    #[test]
    fn test_get_next_on_empty_bank() {
        let bank: Bank<u8> = bank(8);
        assert_eq!(bank.get_next(None), None);
    }

    #[test]
    fn test_get_index_reads_tag() {
        let mut bank: Bank<u8> = bank(4);
        for _ in 0..7 {
            bank.allocate().unwrap();
        }
        let cell = bank.get_at_index(6).unwrap();
        assert_eq!(bank.get_index(cell), Some(6));
        assert!(bank.get_at_index(7).is_none());
        assert!(bank.get_at_index(1_000).is_none());
    }

    #[test]
    fn test_clear_keeps_segments() {
        let mut bank: Bank<u8> = bank(2);
        for _ in 0..5 {
            bank.allocate().unwrap();
        }
        bank.clear();
        assert_eq!(bank.count(), 0);
        assert_eq!(bank.segment_count(), 3);
        assert_eq!(bank.get_next(None), None);
        assert_eq!(bank.allocate().unwrap().index(), 0);
    }

    #[test]
    fn test_compact_releases_trailing_segments_only() {
        let mut bank: Bank<u8> = bank(2);
        for _ in 0..8 {
            bank.allocate().unwrap();
        }
        // Segment 1 empty but followed by a live one, segments 3 empty
        bank.free(2);
        bank.free(3);
        bank.free(6);
        bank.free(7);
        bank.compact();
        assert_eq!(bank.segment_count(), 3);
        assert!(bank.get_at_index(4).is_some());

        bank.compact();
        assert_eq!(bank.segment_count(), 3);

        bank.free(4);
        bank.free(5);
        bank.free(0);
        bank.free(1);
        bank.compact();
        assert_eq!(bank.segment_count(), 1);
    }

    #[test]
    fn test_compact_all() {
        let mut first: Bank<u8> = bank(1);
        let mut second: Bank<u64> = bank(1);
        for _ in 0..3 {
            first.allocate().unwrap();
            second.allocate().unwrap();
        }
        first.free(2);
        second.free(1);
        second.free(2);
        let mut banks: [&mut dyn Compact; 2] = [&mut first, &mut second];
        compact_all(&mut banks);
        assert_eq!(first.segment_count(), 2);
        assert_eq!(second.segment_count(), 1);
    }

    #[test]
    fn test_iter_mut_visits_live_cells() {
        let mut bank: Bank<u32> = bank(3);
        for _ in 0..5 {
            bank.allocate().unwrap();
        }
        bank.free(1);
        for cell in bank.iter_mut() {
            **cell = cell.index() * 10;
        }
        let values: Vec<u32> = bank.iter().map(|cell| **cell).collect();
        assert_eq!(values, vec![0, 20, 30, 40]);
    }

    #[test]
    #[should_panic(expected = "double free")]
    fn test_double_free_panics() {
        let mut bank: Bank<u8> = bank(4);
        let index = bank.allocate().unwrap().index();
        bank.free(index);
        bank.free(index);
    }

    #[test]
    #[should_panic(expected = "Segment size must be greater than zero")]
    fn test_zero_segment_size_panics() {
        let _ = Bank::<u8>::new(0, BankFlags::empty(), MemoryType::Main);
    }
}
