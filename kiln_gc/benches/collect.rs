//! Allocation and collection throughput benchmarks.
//!
//! Mirrors the workload shape of the reference benchmarks: tight
//! allocation of small short-lived objects, and full cycles over a heap
//! of long-lived rooted objects.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use kiln_gc::{GcConfig, GcManager, Marker, TraceHooks};

static LEAF_HOOKS: TraceHooks = TraceHooks {
    trace: leaf_trace,
    finalize: None,
};

unsafe fn leaf_trace(_object: *mut u8, _marker: &mut Marker<'_>) {}

fn bench_config(arena_size: usize) -> GcConfig {
    GcConfig {
        arena_size,
        verify_heap: false,
        ..Default::default()
    }
}

fn bench_allocation(c: &mut Criterion) {
    let mut group = c.benchmark_group("allocation");
    group.throughput(Throughput::Elements(1));

    // Unrooted objects: the arena refills itself through collection,
    // so the loop measures steady-state alloc cost including the
    // amortized cycles.
    group.bench_function("leaf_64b_steady_state", |b| {
        let gc = GcManager::new(bench_config(16 * 1024 * 1024)).unwrap();
        b.iter(|| black_box(gc.alloc(64, &LEAF_HOOKS)))
    });

    group.finish();
}

fn bench_collection(c: &mut Criterion) {
    let mut group = c.benchmark_group("collection");

    for live_objects in [1_000usize, 10_000, 100_000] {
        group.bench_with_input(
            BenchmarkId::new("rooted_live_set", live_objects),
            &live_objects,
            |b, &count| {
                let gc = GcManager::new(bench_config(64 * 1024 * 1024)).unwrap();
                let slots: Vec<*mut u8> = (0..count)
                    .map(|_| gc.alloc(48, &LEAF_HOOKS).as_ptr())
                    .collect();
                for slot in &slots {
                    gc.register_static_root(slot);
                }

                b.iter(|| gc.collect());

                black_box(slots);
            },
        );
    }

    group.finish();
}

criterion_group!(benches, bench_allocation, bench_collection);
criterion_main!(benches);
