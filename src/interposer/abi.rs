//! `extern "C"` exports for LD_PRELOAD/DYLD_INSERT_LIBRARIES-style symbol
//! interposition, gated behind the `interpose` feature so a
//! library consumer embedding this crate as a plain Rust dependency never
//! pulls in a process-wide allocator override by accident.
//!
//! A single process-wide [`Interposer`] is lazily constructed on first call
//! and lives for the process lifetime, opening both sample channels against
//! the current pid. Host bindings reach it via [`global`] to install the
//! path filter and attribution hook.

use std::os::raw::c_void;
use std::sync::OnceLock;

use libc::c_char;

use super::{
    Interposer, SystemAllocator, DEFAULT_MALLOC_THRESHOLD, DEFAULT_MEMCPY_THRESHOLD,
};
use crate::channel::{
    SampleChannel, MALLOC_INIT_TEMPLATE, MALLOC_LOCK_TEMPLATE, MALLOC_SIGNAL_TEMPLATE,
    MEMCPY_INIT_TEMPLATE, MEMCPY_LOCK_TEMPLATE, MEMCPY_SIGNAL_TEMPLATE,
};

static GLOBAL: OnceLock<Interposer<SystemAllocator>> = OnceLock::new();

/// The process-wide interposer instance backing the exported symbols below.
/// Host bindings use this to reach [`Interposer::path_filter`] /
/// [`Interposer::attribution_hook`] / [`Interposer::done_flag`].
pub fn global() -> &'static Interposer<SystemAllocator> {
    GLOBAL.get_or_init(|| {
        let pid = crate::sys::getpid();
        let malloc_channel = SampleChannel::open_or_abort(
            pid,
            MALLOC_SIGNAL_TEMPLATE,
            MALLOC_LOCK_TEMPLATE,
            MALLOC_INIT_TEMPLATE,
        );
        let memcpy_channel = SampleChannel::open_or_abort(
            pid,
            MEMCPY_SIGNAL_TEMPLATE,
            MEMCPY_LOCK_TEMPLATE,
            MEMCPY_INIT_TEMPLATE,
        );
        Interposer::new(
            SystemAllocator,
            malloc_channel,
            memcpy_channel,
            DEFAULT_MALLOC_THRESHOLD,
            DEFAULT_MEMCPY_THRESHOLD,
        )
    })
}

/// # Safety
/// Standard `malloc` contract.
#[no_mangle]
pub unsafe extern "C" fn malloc(size: usize) -> *mut c_void {
    global().malloc(size) as *mut c_void
}

/// # Safety
/// Standard `free` contract: `ptr` must be null or a pointer this crate's
/// `malloc`/`calloc`/`realloc`/`memalign` previously returned.
#[no_mangle]
pub unsafe extern "C" fn free(ptr: *mut c_void) {
    unsafe { global().free(ptr as *mut u8) }
}

/// # Safety
/// Standard `realloc` contract.
#[no_mangle]
pub unsafe extern "C" fn realloc(ptr: *mut c_void, size: usize) -> *mut c_void {
    unsafe { global().realloc(ptr as *mut u8, size) as *mut c_void }
}

/// # Safety
/// Standard `memalign` contract.
#[no_mangle]
pub unsafe extern "C" fn memalign(alignment: usize, size: usize) -> *mut c_void {
    global().memalign(alignment, size) as *mut c_void
}

/// # Safety
/// Standard `aligned_alloc` contract; forwards to the same path as
/// `memalign` since the backing allocator's `posix_memalign` satisfies both
/// contracts.
#[no_mangle]
pub unsafe extern "C" fn aligned_alloc(alignment: usize, size: usize) -> *mut c_void {
    global().memalign(alignment, size) as *mut c_void
}

/// # Safety
/// Standard `memcpy` contract: `dst`/`src` valid for `n` bytes, non-overlapping.
#[no_mangle]
pub unsafe extern "C" fn memcpy(dst: *mut c_void, src: *const c_void, n: usize) -> *mut c_void {
    unsafe { global().memcpy(dst as *mut u8, src as *const u8, n) as *mut c_void }
}

/// # Safety
/// Standard `memmove` contract: `dst`/`src` valid for `n` bytes, may overlap.
#[no_mangle]
pub unsafe extern "C" fn memmove(dst: *mut c_void, src: *const c_void, n: usize) -> *mut c_void {
    unsafe { global().memmove(dst as *mut u8, src as *const u8, n) as *mut c_void }
}

/// # Safety
/// Standard `strcpy` contract: `src` NUL-terminated, `dst` has room for it.
#[no_mangle]
pub unsafe extern "C" fn strcpy(dst: *mut c_char, src: *const c_char) -> *mut c_char {
    unsafe { global().strcpy(dst, src) }
}
