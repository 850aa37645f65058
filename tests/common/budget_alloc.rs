use std::alloc::{GlobalAlloc, Layout, System};
use std::cell::Cell;

/// Heap activity observed on one thread.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct HeapStats {
    pub allocations: usize,
    pub peak_bytes: usize,
    current_bytes: usize,
}

thread_local! {
    static STATS: Cell<HeapStats> = const {
        Cell::new(HeapStats {
            allocations: 0,
            peak_bytes: 0,
            current_bytes: 0,
        })
    };
}

/// System allocator that counts allocations per thread, so tests running in
/// parallel do not see each other's heap traffic.
pub struct BudgetAlloc;

impl BudgetAlloc {
    pub const fn new() -> Self {
        Self
    }

    /// Run `op` and report the heap activity it caused on this thread.
    pub fn measure<T>(&self, op: impl FnOnce() -> T) -> (T, HeapStats) {
        STATS.with(|stats| stats.set(HeapStats::default()));
        let out = op();
        let stats = STATS.with(Cell::get);
        (out, stats)
    }

    fn record_alloc(bytes: usize) {
        let _ = STATS.try_with(|cell| {
            let mut stats = cell.get();
            stats.allocations += 1;
            stats.current_bytes += bytes;
            stats.peak_bytes = stats.peak_bytes.max(stats.current_bytes);
            cell.set(stats);
        });
    }

    fn record_free(bytes: usize) {
        let _ = STATS.try_with(|cell| {
            let mut stats = cell.get();
            stats.current_bytes = stats.current_bytes.saturating_sub(bytes);
            cell.set(stats);
        });
    }
}

unsafe impl GlobalAlloc for BudgetAlloc {
    unsafe fn alloc(&self, layout: Layout) -> *mut u8 {
        let ptr = unsafe { System.alloc(layout) };
        if !ptr.is_null() {
            Self::record_alloc(layout.size());
        }
        ptr
    }

    unsafe fn dealloc(&self, ptr: *mut u8, layout: Layout) {
        unsafe { System.dealloc(ptr, layout) };
        Self::record_free(layout.size());
    }

    unsafe fn alloc_zeroed(&self, layout: Layout) -> *mut u8 {
        let ptr = unsafe { System.alloc_zeroed(layout) };
        if !ptr.is_null() {
            Self::record_alloc(layout.size());
        }
        ptr
    }

    unsafe fn realloc(&self, ptr: *mut u8, layout: Layout, new_size: usize) -> *mut u8 {
        let new_ptr = unsafe { System.realloc(ptr, layout, new_size) };
        if !new_ptr.is_null() {
            Self::record_free(layout.size());
            Self::record_alloc(new_size);
        }
        new_ptr
    }
}
