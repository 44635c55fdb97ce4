//! Fixed-capacity arena backing all managed allocations.
//!
//! One contiguous region is acquired from the unmanaged bridge at startup
//! and never grows. Allocation is bump-pointer with a first-fit free list
//! fed by the sweep phase. All bookkeeping is offset-based: the arena
//! hands out byte offsets from its base and converts to pointers only at
//! the edge, so no arithmetic is done on raw addresses.

use crate::bridge::UnmanagedAlloc;
use std::alloc::Layout;
use std::cell::{Cell, RefCell};
use std::ptr::NonNull;

/// Alignment of the arena base and of every allocation inside it.
pub const ALIGN: usize = 16;

/// A reclaimed region, identified by offset from the arena base.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) struct FreeBlock {
    pub offset: usize,
    pub size: usize,
}

/// Smallest block worth splitting off the free list: a header plus one
/// aligned payload word.
const MIN_BLOCK: usize = 2 * ALIGN;

/// Contiguous pre-reserved region serving all managed allocations.
pub struct Arena {
    base: NonNull<u8>,
    capacity: usize,
    /// Bump cursor, as an offset from `base`.
    cursor: Cell<usize>,
    /// Reclaimed blocks, kept sorted by offset and coalesced.
    free: RefCell<Vec<FreeBlock>>,
    bridge: UnmanagedAlloc,
    layout: Layout,
}

impl Arena {
    /// Reserve `capacity` bytes through the bridge.
    ///
    /// Panics if the host cannot supply the buffer; there is no fallback
    /// source of managed memory.
    pub fn new(capacity: usize, bridge: UnmanagedAlloc) -> Self {
        debug_assert!(capacity > 0);
        let capacity = align_up(capacity, ALIGN);
        let layout = Layout::from_size_align(capacity, ALIGN).expect("invalid arena layout");

        let base = unsafe { (bridge.alloc)(layout) };
        let base = NonNull::new(base)
            .unwrap_or_else(|| panic!("failed to reserve arena of {} bytes", capacity));
        debug_assert_eq!(base.as_ptr() as usize % ALIGN, 0);

        Self {
            base,
            capacity,
            cursor: Cell::new(0),
            free: RefCell::new(Vec::new()),
            bridge,
            layout,
        }
    }

    /// Allocate `size` bytes (rounded up to [`ALIGN`]).
    ///
    /// Returns the offset of the block and its actual size, which may
    /// exceed the request when an unsplittable free block is handed out.
    /// Returns `None` when neither the free list nor the remaining
    /// capacity can satisfy the request.
    pub fn alloc(&self, size: usize) -> Option<(usize, usize)> {
        debug_assert!(size > 0);
        let size = align_up(size, ALIGN);

        // First fit from reclaimed space.
        {
            let mut free = self.free.borrow_mut();
            for i in 0..free.len() {
                let block = free[i];
                if block.size < size {
                    continue;
                }
                if block.size - size >= MIN_BLOCK {
                    // Split; the remainder stays in place.
                    free[i] = FreeBlock {
                        offset: block.offset + size,
                        size: block.size - size,
                    };
                    return Some((block.offset, size));
                }
                free.remove(i);
                return Some((block.offset, block.size));
            }
        }

        // Bump path.
        let cursor = self.cursor.get();
        if self.capacity - cursor >= size {
            self.cursor.set(cursor + size);
            return Some((cursor, size));
        }
        None
    }

    /// Return swept blocks to the arena, coalescing adjacent regions.
    ///
    /// A trailing region that ends at the bump cursor retreats the cursor
    /// instead of entering the free list.
    pub(crate) fn release(&self, mut blocks: Vec<FreeBlock>) {
        if blocks.is_empty() {
            return;
        }
        let mut free = self.free.borrow_mut();
        free.append(&mut blocks);
        free.sort_unstable_by_key(|b| b.offset);

        let mut merged: Vec<FreeBlock> = Vec::with_capacity(free.len());
        for block in free.drain(..) {
            if let Some(last) = merged.last_mut() {
                if last.offset + last.size == block.offset {
                    last.size += block.size;
                    continue;
                }
            }
            merged.push(block);
        }

        if let Some(last) = merged.last() {
            if last.offset + last.size == self.cursor.get() {
                self.cursor.set(last.offset);
                merged.pop();
            }
        }

        *free = merged;
    }

    /// Check whether a pointer falls inside the reserved region.
    #[inline]
    pub fn contains(&self, ptr: *const u8) -> bool {
        let addr = ptr as usize;
        let base = self.base.as_ptr() as usize;
        addr >= base && addr < base + self.capacity
    }

    /// Convert an in-range pointer to its offset from the base.
    #[inline]
    pub fn offset_of(&self, ptr: *const u8) -> Option<usize> {
        if self.contains(ptr) {
            Some(ptr as usize - self.base.as_ptr() as usize)
        } else {
            None
        }
    }

    /// Convert an offset back to a pointer.
    #[inline]
    pub fn ptr_at(&self, offset: usize) -> *mut u8 {
        debug_assert!(offset < self.capacity);
        unsafe { self.base.as_ptr().add(offset) }
    }

    /// Total reserved capacity in bytes.
    #[inline]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Bytes currently handed out.
    pub fn used(&self) -> usize {
        self.cursor.get() - self.free_list_bytes()
    }

    /// Bytes still available (free list plus untouched tail).
    pub fn available(&self) -> usize {
        self.capacity - self.used()
    }

    fn free_list_bytes(&self) -> usize {
        self.free.borrow().iter().map(|b| b.size).sum()
    }
}

impl Drop for Arena {
    fn drop(&mut self) {
        unsafe { (self.bridge.free)(self.base.as_ptr(), self.layout) };
    }
}

/// Align a size up to the given alignment.
#[inline]
pub const fn align_up(size: usize, align: usize) -> usize {
    (size + align - 1) & !(align - 1)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn arena(capacity: usize) -> Arena {
        Arena::new(capacity, UnmanagedAlloc::default())
    }

    #[test]
    fn test_align_up() {
        assert_eq!(align_up(0, 16), 0);
        assert_eq!(align_up(1, 16), 16);
        assert_eq!(align_up(16, 16), 16);
        assert_eq!(align_up(17, 16), 32);
    }

    #[test]
    fn test_bump_allocations_are_disjoint() {
        let arena = arena(1024);

        let (a, a_size) = arena.alloc(64).expect("alloc a");
        let (b, _) = arena.alloc(64).expect("alloc b");

        assert_eq!(b, a + a_size);
        assert_eq!(arena.used(), 128);
    }

    #[test]
    fn test_exhaustion() {
        let arena = arena(128);

        assert!(arena.alloc(64).is_some());
        assert!(arena.alloc(64).is_some());
        assert!(arena.alloc(16).is_none());
    }

    #[test]
    fn test_release_and_reuse() {
        let arena = arena(256);

        let (a, a_size) = arena.alloc(64).unwrap();
        let (_b, _) = arena.alloc(64).unwrap();

        arena.release(vec![FreeBlock {
            offset: a,
            size: a_size,
        }]);

        // The freed block is handed out again before the cursor moves.
        let (c, _) = arena.alloc(64).unwrap();
        assert_eq!(c, a);
    }

    #[test]
    fn test_release_coalesces_adjacent_blocks() {
        let arena = arena(512);

        let (a, a_size) = arena.alloc(32).unwrap();
        let (b, b_size) = arena.alloc(32).unwrap();
        let (_live, _) = arena.alloc(32).unwrap();

        arena.release(vec![
            FreeBlock {
                offset: b,
                size: b_size,
            },
            FreeBlock {
                offset: a,
                size: a_size,
            },
        ]);

        // Both blocks merged; a 64-byte request fits in the merged region.
        let (c, _) = arena.alloc(64).unwrap();
        assert_eq!(c, a);
    }

    #[test]
    fn test_trailing_release_retreats_cursor() {
        let arena = arena(256);

        let (a, a_size) = arena.alloc(64).unwrap();
        let used_before = arena.used();
        assert_eq!(used_before, 64);

        arena.release(vec![FreeBlock {
            offset: a,
            size: a_size,
        }]);

        assert_eq!(arena.used(), 0);
        assert_eq!(arena.available(), 256);
    }

    #[test]
    fn test_offset_round_trip() {
        let arena = arena(256);
        let (off, _) = arena.alloc(32).unwrap();

        let ptr = arena.ptr_at(off);
        assert!(arena.contains(ptr));
        assert_eq!(arena.offset_of(ptr), Some(off));

        let outside = 0x10usize as *const u8;
        assert_eq!(arena.offset_of(outside), None);
    }
}
