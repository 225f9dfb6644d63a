//! The Allocation Interposer: wraps the process-wide allocation
//! and byte-copy entry points, routing accepted events through the
//! recursion guard, the backing allocator, the threshold sampler, the
//! attribution hook, and the sample channel.
//!
//! [`Interposer`] is the library-level entry point: a host binding that
//! hooks allocation through a language-level allocator API calls
//! [`Interposer::record_malloc`]/[`Interposer::record_free`] directly. The
//! `malloc`/`free`/`memalign`/`realloc`/`memcpy`/`memmove`/`strcpy` methods
//! are the raw entry-point wrappers for platforms that interpose at the
//! symbol level; the `interpose` feature additionally exports them as `extern
//! "C"` symbols (see [`abi`]) for a `cdylib` loaded via
//! `LD_PRELOAD`/`DYLD_INSERT_LIBRARIES`.

mod backing;
mod recursion_guard;

#[cfg(feature = "interpose")]
mod abi;


pub use backing::{BackingAllocator, SystemAllocator};
pub use recursion_guard::RecursionGuard;

use std::ptr;

use libc::c_char;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;

use crate::attribution::AttributionHook;
use crate::channel::SampleChannel;
use crate::host::DoneFlag;
use crate::pathfilter::PathFilter;
use crate::record::{Action, MemcpyRecord, Record};
use crate::sampler::{Sampler, ThresholdSampler};

/// Bytes of allocation traffic to let pass unsampled from process start:
/// interpreter bootstrap allocations would otherwise dominate the first few
/// samples.
pub const DEFAULT_ON_RAMP_BYTES: u64 = 32 * 1024 * 1024;

/// Default malloc-channel threshold: a prime near 1 MiB, chosen so periodic
/// allocation patterns don't always land on the same phase.
pub const DEFAULT_MALLOC_THRESHOLD: u64 = 1_048_549;

/// Default memcpy-channel threshold: the next prime after twice the malloc threshold.
pub const DEFAULT_MEMCPY_THRESHOLD: u64 = 2_097_131;

/// A request size the host's per-line tracer uses for its own scratch
/// bookkeeping object; excluded from sampling (and from the accumulation
/// counters) entirely. No ordinary allocation legitimately
/// requests this exact size, so it is safe to use as an out-of-band marker.
pub const EXCLUDED_SENTINEL_SIZE: usize = 0xFFFF_FFFF;

/// Signals raised to notify the host-side orchestrator of a new record.
/// Unix only; the Windows equivalent is a named auto-reset event
/// (`Local\scalene-{malloc,free,memcpy}-event%d`), out of scope for this
/// `cfg(unix)`-only interposer.
#[cfg(unix)]
pub mod signal {
    pub const MALLOC_TRIGGER: i32 = libc::SIGXCPU;
    pub const FREE_TRIGGER: i32 = libc::SIGXFSZ;
    pub const MEMCPY_TRIGGER: i32 = libc::SIGPROF;
}

/// Cross-thread races on `python_count`/`c_count` are an accepted bounded
/// error (a sample's reported fraction can be slightly stale under
/// concurrent allocation), but `last_malloc_trigger` and
/// `freed_last_malloc_trigger` are read-modify-written under `counts`'s lock
/// so the free-of-last-trigger pairing always holds exactly.
#[derive(Default)]
struct Counts {
    python_count: u64,
    c_count: u64,
    last_malloc_trigger: usize,
    freed_last_malloc_trigger: bool,
}

/// The allocation interposer: owns the backing allocator, both threshold
/// samplers, the path filter, the attribution hook, the done flag, and the
/// two sample channels.
pub struct Interposer<A: BackingAllocator = SystemAllocator> {
    backing: A,
    alloc_sampler: Mutex<ThresholdSampler>,
    memcpy_sampler: Mutex<ThresholdSampler>,
    path_filter: PathFilter,
    attribution: AttributionHook,
    done: DoneFlag,
    counts: Mutex<Counts>,
    malloc_triggered: AtomicU64,
    free_triggered: AtomicU64,
    memcpy_ops: AtomicU64,
    memcpy_triggered: AtomicU64,
    alloc_seq: AtomicU64,
    memcpy_seq: AtomicU64,
    on_ramp_remaining: AtomicU64,
    pid: i32,
    malloc_channel: SampleChannel,
    memcpy_channel: SampleChannel,
}

impl<A: BackingAllocator> Interposer<A> {
    pub fn new(
        backing: A,
        malloc_channel: SampleChannel,
        memcpy_channel: SampleChannel,
        malloc_threshold: u64,
        memcpy_threshold: u64,
    ) -> Self {
        // `signal_host` raises these the moment a sample first fires; if
        // nobody has installed a handler yet, their default disposition is
        // "terminate the process" (`SIGXCPU`/`SIGXFSZ`) or "ignore"
        // (`SIGPROF` on most platforms, but not guaranteed everywhere). Ignore
        // each one until a real handler replaces it, mirroring the
        // constructor-time neutralization the original implementation does
        // for the same three signals before any sample can be raised.
        #[cfg(unix)]
        {
            crate::sys::ignore_signal_if_default(signal::MALLOC_TRIGGER);
            crate::sys::ignore_signal_if_default(signal::FREE_TRIGGER);
            crate::sys::ignore_signal_if_default(signal::MEMCPY_TRIGGER);
        }

        Self {
            backing,
            alloc_sampler: Mutex::new(ThresholdSampler::new(malloc_threshold)),
            memcpy_sampler: Mutex::new(ThresholdSampler::new(memcpy_threshold)),
            path_filter: PathFilter::default(),
            attribution: AttributionHook::new(),
            done: DoneFlag::new(),
            counts: Mutex::new(Counts::default()),
            malloc_triggered: AtomicU64::new(0),
            free_triggered: AtomicU64::new(0),
            memcpy_ops: AtomicU64::new(0),
            memcpy_triggered: AtomicU64::new(0),
            alloc_seq: AtomicU64::new(0),
            memcpy_seq: AtomicU64::new(0),
            on_ramp_remaining: AtomicU64::new(DEFAULT_ON_RAMP_BYTES),
            pid: crate::sys::getpid(),
            malloc_channel,
            memcpy_channel,
        }
    }

    /// Overrides the on-ramp byte budget; `0` disables
    /// the on-ramp so sampling is active from the very first allocation.
    pub fn with_on_ramp(self, bytes: u64) -> Self {
        self.on_ramp_remaining.store(bytes, Ordering::Relaxed);
        self
    }

    pub fn path_filter(&self) -> &PathFilter {
        &self.path_filter
    }

    pub fn attribution_hook(&self) -> &AttributionHook {
        &self.attribution
    }

    pub fn done_flag(&self) -> &DoneFlag {
        &self.done
    }

    pub fn malloc_triggered(&self) -> u64 {
        self.malloc_triggered.load(Ordering::Relaxed)
    }

    pub fn free_triggered(&self) -> u64 {
        self.free_triggered.load(Ordering::Relaxed)
    }

    pub fn memcpy_triggered(&self) -> u64 {
        self.memcpy_triggered.load(Ordering::Relaxed)
    }

    pub fn memcpy_ops(&self) -> u64 {
        self.memcpy_ops.load(Ordering::Relaxed)
    }

    /// The process id stamped into every emitted record's `pid` field.
    pub fn pid(&self) -> i32 {
        self.pid
    }

    // ---- raw entry-point wrappers ----

    pub fn malloc(&self, size: usize) -> *mut u8 {
        let guard = RecursionGuard::enter();
        let ptr = self.backing.malloc(size);
        if guard.was_in_allocator() || ptr.is_null() {
            return ptr;
        }
        let real_size = unsafe { self.backing.usable_size(ptr) };
        self.record_malloc(real_size, ptr as usize, false);
        ptr
    }

    pub fn memalign(&self, alignment: usize, size: usize) -> *mut u8 {
        let guard = RecursionGuard::enter();
        let ptr = self.backing.memalign(alignment, size);
        if guard.was_in_allocator() || ptr.is_null() {
            return ptr;
        }
        let real_size = unsafe { self.backing.usable_size(ptr) };
        self.record_malloc(real_size, ptr as usize, false);
        ptr
    }

    /// # Safety
    /// `ptr` must be null or a pointer previously returned by this
    /// interposer's backing allocator that has not yet been freed.
    pub unsafe fn free(&self, ptr: *mut u8) {
        if ptr.is_null() {
            return;
        }
        let guard = RecursionGuard::enter();
        let real_size = unsafe { self.backing.usable_size(ptr) };
        unsafe { self.backing.free(ptr) };
        if !guard.was_in_allocator() {
            self.record_free(real_size, ptr as usize);
        }
    }

    /// # Safety
    /// `ptr` must be null or a pointer previously returned by this
    /// interposer's backing allocator that has not yet been freed.
    pub unsafe fn realloc(&self, ptr: *mut u8, new_size: usize) -> *mut u8 {
        let guard = RecursionGuard::enter();
        let old_size = if ptr.is_null() {
            0
        } else {
            unsafe { self.backing.usable_size(ptr) }
        };
        let new_ptr = unsafe { self.backing.realloc(ptr, new_size) };
        if guard.was_in_allocator() || new_ptr.is_null() {
            return new_ptr;
        }
        let actual_new = unsafe { self.backing.usable_size(new_ptr) };
        // realloc is malloc + copy + free, but only the net footprint change
        // is recorded, never both sides.
        if actual_new > old_size {
            self.record_malloc(actual_new - old_size, new_ptr as usize, false);
        } else if old_size > actual_new {
            self.record_free(old_size - actual_new, new_ptr as usize);
        }
        new_ptr
    }

    /// # Safety
    /// `dst`/`src` must be valid for `n` bytes and must not overlap.
    pub unsafe fn memcpy(&self, dst: *mut u8, src: *const u8, n: usize) -> *mut u8 {
        let guard = RecursionGuard::enter();
        unsafe { ptr::copy_nonoverlapping(src, dst, n) };
        if !guard.was_in_allocator() {
            self.record_copy(n);
        }
        dst
    }

    /// # Safety
    /// `dst`/`src` must be valid for `n` bytes; may overlap.
    pub unsafe fn memmove(&self, dst: *mut u8, src: *const u8, n: usize) -> *mut u8 {
        let guard = RecursionGuard::enter();
        unsafe { ptr::copy(src, dst, n) };
        if !guard.was_in_allocator() {
            self.record_copy(n);
        }
        dst
    }

    /// # Safety
    /// `src` must be a valid NUL-terminated C string; `dst` must have room
    /// for `strlen(src) + 1` bytes.
    pub unsafe fn strcpy(&self, dst: *mut c_char, src: *const c_char) -> *mut c_char {
        let guard = RecursionGuard::enter();
        let n = unsafe { libc::strlen(src) } + 1;
        unsafe { ptr::copy_nonoverlapping(src as *const u8, dst as *mut u8, n) };
        if !guard.was_in_allocator() {
            self.record_copy(n);
        }
        dst
    }

    // ---- register_*: the plain Rust API host bindings call ----

    /// `register_malloc(size, ptr, in_host_allocator)`.
    pub fn record_malloc(&self, size: usize, ptr: usize, in_host_allocator: bool) {
        if self.done.is_done() {
            return;
        }
        if size == EXCLUDED_SENTINEL_SIZE {
            return;
        }
        if self.consume_on_ramp(size) {
            return;
        }

        {
            let mut counts = self.counts.lock().unwrap();
            if in_host_allocator {
                counts.python_count += size as u64;
            } else {
                counts.c_count += size as u64;
            }
        }

        let fire = self.alloc_sampler.lock().unwrap().increment(size as u64);
        let Some(fire) = fire else { return };

        let Some(attribution) = self.attribution.call() else {
            return;
        };

        let fraction;
        {
            let mut counts = self.counts.lock().unwrap();
            let python = counts.python_count.max(1);
            fraction = python as f64 / (python + counts.c_count) as f64;
            counts.python_count = 0;
            counts.c_count = 0;
            counts.last_malloc_trigger = ptr;
            counts.freed_last_malloc_trigger = false;
        }

        let seq = self.alloc_seq.fetch_add(1, Ordering::Relaxed) + 1;
        let record = Record {
            action: Action::Malloc,
            seq,
            size: fire.interval,
            python_fraction: fraction,
            pid: self.pid,
            pointer: ptr,
            file: attribution.file,
            line: attribution.line,
            bytei: attribution.bytei,
        };
        self.malloc_channel.write(record.format().as_bytes());
        self.malloc_triggered.fetch_add(1, Ordering::Relaxed);
        self.signal_host(Trigger::Malloc);
    }

    /// `register_free(size, ptr)`.
    pub fn record_free(&self, size: usize, ptr: usize) {
        if self.done.is_done() {
            return;
        }
        if size == EXCLUDED_SENTINEL_SIZE {
            return;
        }

        {
            let mut counts = self.counts.lock().unwrap();
            if ptr == counts.last_malloc_trigger {
                counts.freed_last_malloc_trigger = true;
            }
        }

        let fire = self.alloc_sampler.lock().unwrap().decrement(size as u64);
        let Some(fire) = fire else { return };

        let Some(attribution) = self.attribution.call() else {
            return;
        };

        let (action, pointer, fraction);
        {
            let mut counts = self.counts.lock().unwrap();
            (action, pointer) = if counts.freed_last_malloc_trigger {
                (Action::FreeOfLastTrigger, counts.last_malloc_trigger)
            } else {
                (Action::Free, ptr)
            };
            let python = counts.python_count.max(1);
            fraction = python as f64 / (python + counts.c_count) as f64;
            counts.freed_last_malloc_trigger = false;
        }

        let seq = self.alloc_seq.fetch_add(1, Ordering::Relaxed) + 1;
        let record = Record {
            action,
            seq,
            size: fire.interval,
            python_fraction: fraction,
            pid: self.pid,
            pointer,
            file: attribution.file,
            line: attribution.line,
            bytei: attribution.bytei,
        };
        self.malloc_channel.write(record.format().as_bytes());
        self.free_triggered.fetch_add(1, Ordering::Relaxed);
        self.signal_host(Trigger::Free);
    }

    /// Byte-copy sampling shared by `memcpy`/`memmove`/`strcpy`.
    pub fn record_copy(&self, n: usize) {
        if self.done.is_done() {
            return;
        }
        self.memcpy_ops.fetch_add(1, Ordering::Relaxed);

        let fire = self.memcpy_sampler.lock().unwrap().increment(n as u64);
        let Some(fire) = fire else { return };

        let Some(attribution) = self.attribution.call() else {
            return;
        };

        let seq = self.memcpy_seq.fetch_add(1, Ordering::Relaxed) + 1;
        let record = MemcpyRecord {
            seq,
            bytes: fire.interval,
            pid: self.pid,
            file: attribution.file,
            line: attribution.line,
            bytei: attribution.bytei,
        };
        self.memcpy_channel.write(record.format().as_bytes());
        self.memcpy_triggered.fetch_add(1, Ordering::Relaxed);
        self.signal_host(Trigger::Memcpy);
    }

    /// Consumes `size` bytes from the on-ramp budget; returns `true` while
    /// this (or any prior, concurrent) allocation is still within the
    /// on-ramp window, in which case the caller must skip sampling it
    /// entirely.
    fn consume_on_ramp(&self, size: usize) -> bool {
        loop {
            let remaining = self.on_ramp_remaining.load(Ordering::Relaxed);
            if remaining == 0 {
                return false;
            }
            let next = remaining.saturating_sub(size as u64);
            if self
                .on_ramp_remaining
                .compare_exchange_weak(remaining, next, Ordering::Relaxed, Ordering::Relaxed)
                .is_ok()
            {
                return true;
            }
        }
    }

    fn signal_host(&self, _trigger: Trigger) {
        #[cfg(unix)]
        {
            let sig = match _trigger {
                Trigger::Malloc => signal::MALLOC_TRIGGER,
                Trigger::Free => signal::FREE_TRIGGER,
                Trigger::Memcpy => signal::MEMCPY_TRIGGER,
            };
            crate::sys::raise(sig);
        }
    }
}

enum Trigger {
    Malloc,
    Free,
    Memcpy,
}
