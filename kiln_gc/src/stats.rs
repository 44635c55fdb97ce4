//! Collection statistics.
//!
//! Tracks allocation volume, cycle counts, and pause times for
//! monitoring and tuning. The mutator is single-threaded by contract, so
//! counters are plain cells rather than atomics.

use std::cell::Cell;
use std::time::{Duration, Instant};

/// Statistics about allocator and collector activity.
#[derive(Debug, Default)]
pub struct GcStats {
    /// Total bytes handed out since start (block sizes, header
    /// included).
    pub bytes_allocated: Cell<u64>,
    /// Total objects handed out since start.
    pub objects_allocated: Cell<u64>,
    /// Completed collection cycles.
    pub collections: Cell<u64>,
    /// Total bytes reclaimed by sweeps.
    pub bytes_freed: Cell<u64>,
    /// Total objects reclaimed by sweeps.
    pub objects_freed: Cell<u64>,
    /// Live objects after the last cycle.
    pub live_objects: Cell<u64>,
    /// Live bytes after the last cycle.
    pub live_bytes: Cell<u64>,
    /// Total time spent collecting (nanoseconds).
    pub gc_time_ns: Cell<u64>,
}

impl GcStats {
    /// Create new empty statistics.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record an allocation of `size` bytes.
    #[inline]
    pub fn record_allocation(&self, size: usize) {
        self.bytes_allocated
            .set(self.bytes_allocated.get() + size as u64);
        self.objects_allocated.set(self.objects_allocated.get() + 1);
    }

    /// Record a completed collection cycle.
    pub fn record_collection(
        &self,
        duration: Duration,
        freed_bytes: usize,
        freed_objects: usize,
        live_bytes: usize,
        live_objects: usize,
    ) {
        self.collections.set(self.collections.get() + 1);
        self.bytes_freed.set(self.bytes_freed.get() + freed_bytes as u64);
        self.objects_freed
            .set(self.objects_freed.get() + freed_objects as u64);
        self.live_bytes.set(live_bytes as u64);
        self.live_objects.set(live_objects as u64);
        self.gc_time_ns
            .set(self.gc_time_ns.get() + duration.as_nanos() as u64);
    }

    /// Total time spent in collection cycles.
    pub fn total_gc_time(&self) -> Duration {
        Duration::from_nanos(self.gc_time_ns.get())
    }

    /// Average pause per cycle.
    pub fn avg_pause(&self) -> Duration {
        let count = self.collections.get();
        if count == 0 {
            return Duration::ZERO;
        }
        Duration::from_nanos(self.gc_time_ns.get() / count)
    }

    /// Reset all counters.
    pub fn reset(&self) {
        self.bytes_allocated.set(0);
        self.objects_allocated.set(0);
        self.collections.set(0);
        self.bytes_freed.set(0);
        self.objects_freed.set(0);
        self.live_objects.set(0);
        self.live_bytes.set(0);
        self.gc_time_ns.set(0);
    }

    /// Print a summary to stderr.
    pub fn print_summary(&self) {
        eprintln!("=== GC Statistics ===");
        eprintln!(
            "Allocations: {} objects, {}",
            self.objects_allocated.get(),
            format_bytes(self.bytes_allocated.get())
        );
        eprintln!(
            "Live: {} objects, {}",
            self.live_objects.get(),
            format_bytes(self.live_bytes.get())
        );
        eprintln!(
            "Collections: {} ({} freed, {} objects)",
            self.collections.get(),
            format_bytes(self.bytes_freed.get()),
            self.objects_freed.get()
        );
        eprintln!(
            "GC Time: {:?} total, {:?} avg pause",
            self.total_gc_time(),
            self.avg_pause()
        );
    }
}

/// Format bytes in human-readable form.
fn format_bytes(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;
    const GB: u64 = MB * 1024;

    if bytes >= GB {
        format!("{:.2} GB", bytes as f64 / GB as f64)
    } else if bytes >= MB {
        format!("{:.2} MB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.2} KB", bytes as f64 / KB as f64)
    } else {
        format!("{} bytes", bytes)
    }
}

/// Timer for measuring a collection cycle.
pub struct GcTimer {
    start: Instant,
}

impl GcTimer {
    /// Start a new timer.
    pub fn start() -> Self {
        Self {
            start: Instant::now(),
        }
    }

    /// Stop the timer and return the elapsed duration.
    pub fn stop(self) -> Duration {
        self.start.elapsed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stats_recording() {
        let stats = GcStats::new();

        stats.record_allocation(1024);
        stats.record_allocation(2048);

        assert_eq!(stats.bytes_allocated.get(), 3072);
        assert_eq!(stats.objects_allocated.get(), 2);
    }

    #[test]
    fn test_collection_recording() {
        let stats = GcStats::new();

        stats.record_collection(Duration::from_micros(100), 4096, 8, 1024, 2);
        stats.record_collection(Duration::from_micros(300), 0, 0, 1024, 2);

        assert_eq!(stats.collections.get(), 2);
        assert_eq!(stats.bytes_freed.get(), 4096);
        assert_eq!(stats.objects_freed.get(), 8);
        assert_eq!(stats.live_objects.get(), 2);
        assert_eq!(stats.avg_pause(), Duration::from_micros(200));
    }

    #[test]
    fn test_format_bytes() {
        assert_eq!(format_bytes(512), "512 bytes");
        assert_eq!(format_bytes(2048), "2.00 KB");
        assert_eq!(format_bytes(1048576), "1.00 MB");
    }
}
