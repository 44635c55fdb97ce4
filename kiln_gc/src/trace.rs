//! Marking interface handed to per-type trace functions.
//!
//! During the tracing phase the collector pops objects off a worklist
//! and invokes their registered trace function with a [`Marker`]. The
//! trace function reports each reference field through [`Marker::mark`];
//! unvisited targets are stamped with the current generation and queued.

use crate::arena::Arena;
use crate::header::ObjectHeader;
use std::collections::VecDeque;

/// Visitor passed to trace functions during a collection cycle.
pub struct Marker<'a> {
    generation: u8,
    worklist: &'a mut VecDeque<*mut u8>,
    arena: &'a Arena,
}

impl<'a> Marker<'a> {
    pub(crate) fn new(
        generation: u8,
        worklist: &'a mut VecDeque<*mut u8>,
        arena: &'a Arena,
    ) -> Self {
        Self {
            generation,
            worklist,
            arena,
        }
    }

    /// The generation being stamped this cycle.
    #[inline]
    pub fn generation(&self) -> u8 {
        self.generation
    }

    /// Report a reference field.
    ///
    /// Null pointers are ignored. An already-stamped target is skipped,
    /// so shared and cyclic structures are traced once. The pointer must
    /// be null or the start of a live managed payload; trace functions
    /// get this for free since their fields only ever hold values
    /// returned by the allocator.
    #[inline]
    pub fn mark(&mut self, payload: *const u8) {
        if payload.is_null() {
            return;
        }
        debug_assert!(self.arena.contains(payload), "marked non-arena pointer");

        let header = unsafe { &mut *ObjectHeader::of(payload as *mut u8) };
        if header.mark() == self.generation {
            return;
        }
        header.set_mark(self.generation);
        self.worklist.push_back(payload as *mut u8);
    }

    /// Number of objects waiting to be traced.
    #[inline]
    pub fn pending(&self) -> usize {
        self.worklist.len()
    }
}
