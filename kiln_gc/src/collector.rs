//! Stop-the-world mark-sweep collector over the managed arena.
//!
//! A cycle walks four phases, `Idle → RootScan → Tracing → Sweeping →
//! Idle`, triggered only by allocation pressure or an explicit request,
//! and always runs to completion. Roots come from a conservative scan of
//! the stack between a recorded base and the collector's own position,
//! plus registered static slots and implicit roots.
//!
//! # Mark generations
//!
//! Instead of a mark bit plus a clear pass, each object carries a
//! rotating generation stamp. New objects are stamped with the previous
//! cycle's generation, so anything the tracing phase does not restamp is
//! dead by construction when the sweep runs.
//!
//! # Conservatism
//!
//! A stack word is treated as a root when it is the exact start of a
//! live allocation. False positives over-retain; a reachable object is
//! never reclaimed. Objects never move.

use crate::arena::{align_up, Arena, FreeBlock, ALIGN};
use crate::config::GcConfig;
use crate::header::{ObjectHeader, TraceHooks, HEADER_SIZE};
use crate::stats::{GcStats, GcTimer};
use crate::trace::Marker;

use rustc_hash::FxHashSet;
use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::mem;
use std::ptr::{self, NonNull};

/// Collection cycle phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GcPhase {
    /// Mutator running; allocation permitted.
    Idle,
    /// Conservative stack walk and root registration.
    RootScan,
    /// Transitive marking through per-type trace functions.
    Tracing,
    /// Reclaiming unmarked allocation records.
    Sweeping,
}

/// Allocation failure. The arena is exhausted even after a full
/// collection; there is no resize or retry path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GcError {
    /// Arena exhausted after a full collection.
    OutOfMemory,
}

impl std::fmt::Display for GcError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            GcError::OutOfMemory => write!(f, "arena exhausted after full collection"),
        }
    }
}

impl std::error::Error for GcError {}

/// Record the caller's stack position for [`GcManager::set_top_of_stack`].
///
/// Expands to the address of a fresh local in the calling frame, so
/// every frame entered afterwards lies below the recorded base and is
/// covered by the conservative scan. Call it in the outermost frame of
/// managed execution, before any managed allocation; managed references
/// held in that same frame are not guaranteed to be seen.
#[macro_export]
macro_rules! stack_base {
    () => {{
        let probe: usize = 0;
        &probe as *const usize as usize
    }};
}

/// Orchestrates allocation and collection over a single arena.
///
/// One logical mutator thread; the manager is deliberately neither
/// `Send` nor `Sync`.
pub struct GcManager {
    arena: Arena,
    config: GcConfig,
    phase: Cell<GcPhase>,
    /// Stamp of the last completed cycle. New objects default to it.
    generation: Cell<u8>,
    /// Conservative scan boundary; zero until recorded.
    stack_base: Cell<usize>,
    /// Payload offsets of every live allocation record.
    live: RefCell<FxHashSet<usize>>,
    /// Registered static slots, read at every root scan.
    static_roots: RefCell<Vec<*const *mut u8>>,
    /// Objects excluded from ordinary reclamation (type descriptors).
    implicit_roots: RefCell<Vec<*mut u8>>,
    stats: GcStats,
}

impl GcManager {
    /// Validate the configuration and reserve the arena.
    pub fn new(config: GcConfig) -> Result<Self, crate::config::ConfigError> {
        config.validate()?;
        let arena = Arena::new(config.arena_size, config.unmanaged);
        Ok(Self {
            arena,
            config,
            phase: Cell::new(GcPhase::Idle),
            generation: Cell::new(0),
            stack_base: Cell::new(0),
            live: RefCell::new(FxHashSet::default()),
            static_roots: RefCell::new(Vec::new()),
            implicit_roots: RefCell::new(Vec::new()),
            stats: GcStats::new(),
        })
    }

    // =========================================================================
    // Lifecycle
    // =========================================================================

    /// Record the conservative scan boundary.
    ///
    /// Must be called exactly once, with an address from [`stack_base!`]
    /// taken as close as possible to the true base of the call stack,
    /// before any managed allocation. Until it is called, collections
    /// see only registered roots.
    pub fn set_top_of_stack(&self, base: usize) {
        assert!(base != 0, "null stack base");
        assert!(
            self.stack_base.get() == 0,
            "top of stack already recorded"
        );
        self.stack_base.set(base);
    }

    // =========================================================================
    // Allocation
    // =========================================================================

    /// Allocate a managed object of `size` payload bytes.
    ///
    /// `map` becomes the object's type tag; it may be null only inside
    /// the registry bootstrap window and must be patched before the next
    /// collection can trace the object.
    ///
    /// On exhaustion a full collection runs and the allocation is
    /// retried once. Panics if called while a cycle is in progress;
    /// destruction hooks therefore cannot allocate.
    pub fn try_alloc(
        &self,
        size: usize,
        map: *const TraceHooks,
    ) -> Result<NonNull<u8>, GcError> {
        assert!(size > 0, "zero-size managed allocation");
        assert!(
            self.phase.get() == GcPhase::Idle,
            "allocation during collection"
        );

        // A request larger than the arena can never succeed, and would
        // overflow the block-size computation below.
        if size > self.arena.capacity() {
            return Err(GcError::OutOfMemory);
        }

        if let Some(ptr) = self.bump(size, map) {
            return Ok(ptr);
        }

        self.collect();

        if let Some(ptr) = self.bump(size, map) {
            return Ok(ptr);
        }
        if let Some(hook) = self.config.alloc_after_gc {
            hook(size);
        }
        Err(GcError::OutOfMemory)
    }

    /// Infallible variant of [`try_alloc`](Self::try_alloc).
    ///
    /// Out-of-memory is fatal at this level of the runtime; there is no
    /// exception mechanism beneath generated code to recover through.
    pub fn alloc(&self, size: usize, map: *const TraceHooks) -> NonNull<u8> {
        match self.try_alloc(size, map) {
            Ok(ptr) => ptr,
            Err(err) => panic!("managed allocation of {} bytes failed: {}", size, err),
        }
    }

    fn bump(&self, size: usize, map: *const TraceHooks) -> Option<NonNull<u8>> {
        let block = HEADER_SIZE + align_up(size, ALIGN);
        let (offset, actual) = self.arena.alloc(block)?;

        let header = unsafe { &mut *(self.arena.ptr_at(offset) as *mut ObjectHeader) };
        header.init(map, self.generation.get(), actual as u32);

        let payload = offset + HEADER_SIZE;
        self.live.borrow_mut().insert(payload);
        self.stats.record_allocation(actual);
        NonNull::new(self.arena.ptr_at(payload))
    }

    // =========================================================================
    // Roots
    // =========================================================================

    /// Register a static slot as a root.
    ///
    /// The slot is re-read at every root scan, so mutating it between
    /// cycles is fine; it must hold null or a managed payload pointer.
    /// Any arena reference retained in unmanaged storage that is *not*
    /// registered here is silently reclaimable — the collector cannot
    /// detect the hazard.
    pub fn register_static_root(&self, slot: *const *mut u8) {
        self.static_roots.borrow_mut().push(slot);
    }

    /// Remove a previously registered static slot.
    pub fn unregister_static_root(&self, slot: *const *mut u8) {
        self.static_roots.borrow_mut().retain(|&s| s != slot);
    }

    /// Permanently exclude an object from reclamation.
    ///
    /// Used for lazily created type descriptors, which stay live for the
    /// process lifetime once materialized.
    pub fn register_implicit_root(&self, object: *mut u8) {
        debug_assert!(self.is_live(object));
        self.implicit_roots.borrow_mut().push(object);
    }

    // =========================================================================
    // Collection
    // =========================================================================

    /// Run a full collection cycle.
    pub fn collect(&self) {
        assert!(
            self.phase.get() == GcPhase::Idle,
            "collection already in progress"
        );
        let timer = GcTimer::start();
        let generation = self.generation.get().wrapping_add(1);
        self.generation.set(generation);

        let mut worklist: VecDeque<*mut u8> = VecDeque::with_capacity(256);

        self.phase.set(GcPhase::RootScan);
        {
            let mut marker = Marker::new(generation, &mut worklist, &self.arena);
            self.scan_stack(&mut marker);

            for &slot in self.static_roots.borrow().iter() {
                let value = unsafe { *slot };
                marker.mark(value as *const u8);
            }
            for &object in self.implicit_roots.borrow().iter() {
                marker.mark(object as *const u8);
            }
            if let Some(main_trace) = self.config.main_trace {
                main_trace(&mut marker);
            }
        }

        self.phase.set(GcPhase::Tracing);
        while let Some(object) = worklist.pop_front() {
            let map = unsafe { (*ObjectHeader::of(object)).map() };
            if map.is_null() {
                // Bootstrap window; nothing to trace yet.
                continue;
            }
            let hooks = unsafe { &*map };
            let mut marker = Marker::new(generation, &mut worklist, &self.arena);
            unsafe { (hooks.trace)(object, &mut marker) };
        }

        self.phase.set(GcPhase::Sweeping);
        let mut dead: Vec<usize> = Vec::new();
        {
            let mut live = self.live.borrow_mut();
            live.retain(|&payload| {
                let header = unsafe { &*ObjectHeader::of(self.arena.ptr_at(payload)) };
                if header.mark() == generation {
                    return true;
                }
                dead.push(payload);
                false
            });
        }

        // Hooks run with the live-set borrow released so they may query
        // the collector; the dead objects already read as not live.
        let mut blocks: Vec<FreeBlock> = Vec::with_capacity(dead.len());
        let mut freed_bytes = 0usize;
        for &payload in &dead {
            let object = self.arena.ptr_at(payload);
            let header = unsafe { &*ObjectHeader::of(object) };
            let size = header.size() as usize;
            let map = header.map();

            if !map.is_null() {
                if let Some(finalize) = unsafe { (*map).finalize } {
                    unsafe { finalize(object) };
                }
            }
            if let Some(destruct) = self.config.destruct {
                unsafe { destruct(object) };
            }

            // Recycled payloads must read as zeroed, like fresh memory
            // from the default bridge.
            let offset = payload - HEADER_SIZE;
            unsafe { ptr::write_bytes(self.arena.ptr_at(offset), 0, size) };
            blocks.push(FreeBlock { offset, size });
            freed_bytes += size;
        }
        let freed_objects = dead.len();
        self.arena.release(blocks);

        if self.config.verify_heap {
            self.verify(generation);
        }

        self.phase.set(GcPhase::Idle);
        let live_objects = self.live.borrow().len();
        let live_bytes = self.arena.used();
        let elapsed = timer.stop();
        self.stats
            .record_collection(elapsed, freed_bytes, freed_objects, live_bytes, live_objects);

        if self.config.trace {
            eprintln!(
                "gc: {:?}, freed {} objects / {} bytes, {} objects live",
                elapsed, freed_objects, freed_bytes, live_objects
            );
        }
    }

    /// Conservative scan between the collector's position and the
    /// recorded base. Every word-aligned slot whose value is the exact
    /// start of a live allocation is a root.
    #[inline(never)]
    fn scan_stack(&self, marker: &mut Marker<'_>) {
        let base = self.stack_base.get();
        if base == 0 {
            return;
        }

        let probe: usize = 0;
        let current = &probe as *const usize as usize;
        let word = mem::size_of::<usize>();
        let (low, high) = if current < base {
            (current, base)
        } else {
            (base, current)
        };

        let live = self.live.borrow();
        let mut addr = align_up(low, word);
        while addr + word <= high {
            let value = unsafe { std::ptr::read_volatile(addr as *const usize) };
            if let Some(offset) = self.arena.offset_of(value as *const u8) {
                if live.contains(&offset) {
                    marker.mark(value as *const u8);
                }
            }
            addr += word;
        }
    }

    /// Walk all allocation records checking header sanity.
    fn verify(&self, generation: u8) {
        for &payload in self.live.borrow().iter() {
            assert!(payload >= HEADER_SIZE);
            let header = unsafe { &*ObjectHeader::of(self.arena.ptr_at(payload)) };
            let size = header.size() as usize;
            assert!(size >= HEADER_SIZE + ALIGN, "corrupt header size");
            assert!(payload - HEADER_SIZE + size <= self.arena.capacity());
            assert!(header.mark() == generation, "survivor with stale mark");
        }
    }

    // =========================================================================
    // Queries
    // =========================================================================

    /// Whether `object` is the start of a live allocation.
    #[inline]
    pub fn is_live(&self, object: *const u8) -> bool {
        match self.arena.offset_of(object) {
            Some(offset) => self.live.borrow().contains(&offset),
            None => false,
        }
    }

    /// Read an object's type tag.
    ///
    /// # Safety
    ///
    /// `object` must be the start of a live allocation.
    pub unsafe fn object_map(&self, object: *const u8) -> *const TraceHooks {
        debug_assert!(self.is_live(object));
        (*ObjectHeader::of(object as *mut u8)).map()
    }

    /// Patch an object's type tag.
    ///
    /// Only the registry bootstrap uses this: the system type's first
    /// instance exists before its own map does.
    ///
    /// # Safety
    ///
    /// `object` must be the start of a live allocation and `map` must be
    /// a permanently registered entry.
    pub unsafe fn set_object_map(&self, object: *mut u8, map: *const TraceHooks) {
        debug_assert!(self.is_live(object));
        (*ObjectHeader::of(object)).set_map(map);
    }

    /// Current phase.
    #[inline]
    pub fn phase(&self) -> GcPhase {
        self.phase.get()
    }

    /// Stamp of the last completed cycle.
    #[inline]
    pub fn generation(&self) -> u8 {
        self.generation.get()
    }

    /// Collector statistics.
    pub fn stats(&self) -> &GcStats {
        &self.stats
    }

    /// The managed arena.
    pub fn arena(&self) -> &Arena {
        &self.arena
    }

    /// Number of live allocation records.
    pub fn live_count(&self) -> usize {
        self.live.borrow().len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::header::TraceHooks;
    use std::sync::atomic::{AtomicUsize, Ordering};

    static LEAF_HOOKS: TraceHooks = TraceHooks {
        trace: leaf_trace,
        finalize: None,
    };

    unsafe fn leaf_trace(_object: *mut u8, _marker: &mut Marker<'_>) {}

    /// Payload with a single reference field.
    #[repr(C)]
    struct Node {
        next: *mut u8,
        value: u64,
    }

    static NODE_HOOKS: TraceHooks = TraceHooks {
        trace: node_trace,
        finalize: None,
    };

    unsafe fn node_trace(object: *mut u8, marker: &mut Marker<'_>) {
        let node = object as *mut Node;
        marker.mark((*node).next as *const u8);
    }

    fn manager(arena_size: usize) -> GcManager {
        GcManager::new(GcConfig {
            arena_size,
            ..Default::default()
        })
        .expect("valid config")
    }

    #[test]
    fn test_alloc_basic() {
        let gc = manager(4096);

        let a = gc.alloc(24, &LEAF_HOOKS);
        let b = gc.alloc(24, &LEAF_HOOKS);

        assert!(gc.is_live(a.as_ptr()));
        assert!(gc.is_live(b.as_ptr()));
        assert_ne!(a, b);
        assert_eq!(gc.live_count(), 2);
    }

    #[test]
    fn test_allocations_do_not_overlap() {
        let gc = manager(16 * 1024);

        let mut blocks: Vec<(usize, usize)> = Vec::new();
        for i in 1..=32 {
            let size = i * 8;
            let ptr = gc.alloc(size, &LEAF_HOOKS);
            blocks.push((ptr.as_ptr() as usize, size));
        }

        blocks.sort_unstable();
        for pair in blocks.windows(2) {
            assert!(pair[0].0 + pair[0].1 <= pair[1].0, "regions overlap");
        }
    }

    #[test]
    fn test_unrooted_objects_are_swept() {
        let gc = manager(4096);

        let a = gc.alloc(32, &LEAF_HOOKS);
        let b = gc.alloc(32, &LEAF_HOOKS);
        gc.collect();

        assert!(!gc.is_live(a.as_ptr()));
        assert!(!gc.is_live(b.as_ptr()));
        assert_eq!(gc.stats().objects_freed.get(), 2);
    }

    #[test]
    fn test_static_root_survives() {
        let gc = manager(4096);

        let slot: *mut u8 = gc.alloc(32, &LEAF_HOOKS).as_ptr();
        gc.register_static_root(&slot);

        gc.collect();
        assert!(gc.is_live(slot));

        gc.unregister_static_root(&slot);
        gc.collect();
        assert!(!gc.is_live(slot));
    }

    #[test]
    fn test_reference_fields_are_traced() {
        let gc = manager(4096);

        let q = gc.alloc(mem::size_of::<Node>(), &NODE_HOOKS);
        let p = gc.alloc(mem::size_of::<Node>(), &NODE_HOOKS);
        unsafe {
            (*(p.as_ptr() as *mut Node)).next = q.as_ptr();
            (*(p.as_ptr() as *mut Node)).value = 7;
            (*(q.as_ptr() as *mut Node)).next = std::ptr::null_mut();
            (*(q.as_ptr() as *mut Node)).value = 9;
        }

        let slot: *mut u8 = p.as_ptr();
        gc.register_static_root(&slot);
        gc.collect();

        assert!(gc.is_live(p.as_ptr()));
        assert!(gc.is_live(q.as_ptr()));
        unsafe {
            assert_eq!((*(p.as_ptr() as *const Node)).value, 7);
            assert_eq!((*(q.as_ptr() as *const Node)).value, 9);
        }
    }

    #[test]
    fn test_cycle_does_not_loop() {
        let gc = manager(4096);

        let a = gc.alloc(mem::size_of::<Node>(), &NODE_HOOKS);
        let b = gc.alloc(mem::size_of::<Node>(), &NODE_HOOKS);
        unsafe {
            (*(a.as_ptr() as *mut Node)).next = b.as_ptr();
            (*(b.as_ptr() as *mut Node)).next = a.as_ptr();
        }

        let slot: *mut u8 = a.as_ptr();
        gc.register_static_root(&slot);
        gc.collect();

        assert!(gc.is_live(a.as_ptr()));
        assert!(gc.is_live(b.as_ptr()));
    }

    #[test]
    fn test_implicit_root_is_permanent() {
        let gc = manager(4096);

        let d = gc.alloc(32, &LEAF_HOOKS);
        gc.register_implicit_root(d.as_ptr());

        gc.collect();
        gc.collect();
        assert!(gc.is_live(d.as_ptr()));
    }

    #[test]
    fn test_exhaustion_triggers_collection() {
        // Arena holds 4096 / 48 = 85 blocks of 32-byte payloads. With no
        // roots every collection frees everything, so allocation far past
        // capacity keeps succeeding.
        let gc = manager(4096);

        for _ in 0..1000 {
            gc.alloc(32, &LEAF_HOOKS);
        }
        assert!(gc.stats().collections.get() > 0);
    }

    #[test]
    fn test_out_of_memory_with_rooted_objects() {
        // 48-byte payloads make 64-byte blocks: 4096 / 64 fills the
        // arena exactly, with no collection along the way.
        let gc = manager(4096);

        let mut slots: Vec<*mut u8> = Vec::with_capacity(64);
        for _ in 0..64 {
            slots.push(gc.try_alloc(48, &LEAF_HOOKS).expect("within capacity").as_ptr());
        }
        for slot in &slots {
            gc.register_static_root(slot);
        }

        // The triggered collection frees nothing.
        let result = gc.try_alloc(48, &LEAF_HOOKS);
        assert_eq!(result, Err(GcError::OutOfMemory));
        assert_eq!(gc.stats().objects_freed.get(), 0);

        // Existing objects are untouched.
        for &slot in &slots {
            assert!(gc.is_live(slot));
        }
    }

    #[test]
    fn test_alloc_after_gc_hook_fires() {
        static HITS: AtomicUsize = AtomicUsize::new(0);
        fn hook(_requested: usize) {
            HITS.fetch_add(1, Ordering::Relaxed);
        }

        let gc = GcManager::new(GcConfig {
            arena_size: 4096,
            alloc_after_gc: Some(hook),
            ..Default::default()
        })
        .unwrap();

        let mut slots: Vec<*mut u8> = Vec::with_capacity(64);
        for _ in 0..64 {
            slots.push(gc.try_alloc(48, &LEAF_HOOKS).expect("within capacity").as_ptr());
        }
        for slot in &slots {
            gc.register_static_root(slot);
        }

        assert_eq!(gc.try_alloc(48, &LEAF_HOOKS), Err(GcError::OutOfMemory));
        assert_eq!(HITS.load(Ordering::Relaxed), 1);
    }

    #[test]
    fn test_destruct_hook_runs_per_reclaimed_object() {
        static DESTROYED: AtomicUsize = AtomicUsize::new(0);
        unsafe fn destruct(_object: *mut u8) {
            DESTROYED.fetch_add(1, Ordering::Relaxed);
        }

        let gc = GcManager::new(GcConfig {
            arena_size: 4096,
            destruct: Some(destruct),
            ..Default::default()
        })
        .unwrap();

        gc.alloc(32, &LEAF_HOOKS);
        gc.alloc(32, &LEAF_HOOKS);
        gc.collect();

        assert_eq!(DESTROYED.load(Ordering::Relaxed), 2);
    }

    #[test]
    fn test_finalize_hook_runs_before_reclaim() {
        static FINALIZED: AtomicUsize = AtomicUsize::new(0);
        unsafe fn finalize(_object: *mut u8) {
            FINALIZED.fetch_add(1, Ordering::Relaxed);
        }
        static FINAL_HOOKS: TraceHooks = TraceHooks {
            trace: leaf_trace,
            finalize: Some(finalize),
        };

        let gc = manager(4096);
        gc.alloc(32, &FINAL_HOOKS);
        gc.collect();

        assert_eq!(FINALIZED.load(Ordering::Relaxed), 1);
    }

    #[test]
    fn test_main_trace_hook_marks_roots() {
        static SLOT: AtomicUsize = AtomicUsize::new(0);
        fn main_trace(marker: &mut Marker<'_>) {
            marker.mark(SLOT.load(Ordering::Relaxed) as *const u8);
        }

        let gc = GcManager::new(GcConfig {
            arena_size: 4096,
            main_trace: Some(main_trace),
            ..Default::default()
        })
        .unwrap();

        let kept = gc.alloc(32, &LEAF_HOOKS);
        let dropped = gc.alloc(32, &LEAF_HOOKS);
        SLOT.store(kept.as_ptr() as usize, Ordering::Relaxed);

        gc.collect();
        assert!(gc.is_live(kept.as_ptr()));
        assert!(!gc.is_live(dropped.as_ptr()));
    }

    #[test]
    fn test_space_is_reused_after_sweep() {
        let gc = manager(4096);

        let first = gc.alloc(64, &LEAF_HOOKS).as_ptr() as usize;
        gc.collect();
        let second = gc.alloc(64, &LEAF_HOOKS).as_ptr() as usize;

        assert_eq!(first, second);
    }

    #[test]
    fn test_recycled_blocks_are_zeroed() {
        let gc = manager(4096);

        let first = gc.alloc(64, &LEAF_HOOKS);
        unsafe { std::ptr::write_bytes(first.as_ptr(), 0xAB, 64) };
        gc.collect();

        // Same slot handed out again, with no stale bytes.
        let second = gc.alloc(64, &LEAF_HOOKS);
        assert_eq!(first, second);
        for i in 0..64 {
            assert_eq!(unsafe { *second.as_ptr().add(i) }, 0, "stale byte at {}", i);
        }
    }

    #[test]
    fn test_destruct_hook_may_query_the_collector() {
        static GC_ADDR: AtomicUsize = AtomicUsize::new(0);
        static QUERIES: AtomicUsize = AtomicUsize::new(0);
        unsafe fn destruct(object: *mut u8) {
            let gc = &*(GC_ADDR.load(Ordering::Relaxed) as *const GcManager);
            assert!(!gc.is_live(object));
            let _ = gc.live_count();
            QUERIES.fetch_add(1, Ordering::Relaxed);
        }

        let gc = GcManager::new(GcConfig {
            arena_size: 4096,
            destruct: Some(destruct),
            ..Default::default()
        })
        .unwrap();
        GC_ADDR.store(&gc as *const GcManager as usize, Ordering::Relaxed);

        gc.alloc(32, &LEAF_HOOKS);
        gc.collect();

        assert_eq!(QUERIES.load(Ordering::Relaxed), 1);
    }

    #[test]
    fn test_oversize_request_is_rejected() {
        let gc = manager(4096);

        // Larger than the arena, and large enough that the block-size
        // computation would wrap without the capacity guard.
        let result = gc.try_alloc(usize::MAX - ALIGN, &LEAF_HOOKS);
        assert_eq!(result, Err(GcError::OutOfMemory));

        // No cycle runs for a request that could never fit.
        assert_eq!(gc.stats().collections.get(), 0);
    }

    #[test]
    #[should_panic(expected = "top of stack already recorded")]
    fn test_double_stack_base_panics() {
        let gc = manager(4096);
        gc.set_top_of_stack(stack_base!());
        gc.set_top_of_stack(stack_base!());
    }

    #[test]
    #[should_panic(expected = "zero-size managed allocation")]
    fn test_zero_size_alloc_panics() {
        let gc = manager(4096);
        let _ = gc.try_alloc(0, &LEAF_HOOKS);
    }
}
