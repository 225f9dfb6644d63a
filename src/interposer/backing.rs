//! The backing allocator seam.
//!
//! The interposer never manages memory itself — it delegates every real
//! allocation decision to whatever sits underneath, and only observes sizes
//! and pointers to decide what to sample. This trait is that seam: in
//! production it's `libc::malloc` and friends; in tests it's a fake that
//! hands out predictable sizes without touching the real heap.

use std::ptr;

/// Backing heap contract: serves raw allocation requests, opaque to the
/// profiler beyond the sizes it reports.
///
/// # Safety
/// Implementors must behave like a real allocator: pointers returned from
/// `malloc`/`memalign`/`realloc` must be valid for `usable_size(ptr)` bytes
/// until passed to `free`, and `free`/`realloc` must accept exactly the
/// pointers this allocator itself returned (or null, for `free`).
pub unsafe trait BackingAllocator: Send + Sync {
    fn malloc(&self, size: usize) -> *mut u8;
    fn memalign(&self, alignment: usize, size: usize) -> *mut u8;
    /// # Safety
    /// `ptr` must be null or a pointer previously returned by this allocator
    /// that has not yet been freed.
    unsafe fn realloc(&self, ptr: *mut u8, new_size: usize) -> *mut u8;
    /// # Safety
    /// `ptr` must be null or a pointer previously returned by this allocator
    /// that has not yet been freed.
    unsafe fn free(&self, ptr: *mut u8);
    /// # Safety
    /// `ptr` must be a live pointer previously returned by this allocator.
    unsafe fn usable_size(&self, ptr: *mut u8) -> usize;
}

/// Delegates straight to the platform's `malloc`/`free`/`realloc`/
/// `posix_memalign`/`malloc_usable_size` family via `libc`.
#[derive(Default)]
pub struct SystemAllocator;

unsafe impl BackingAllocator for SystemAllocator {
    fn malloc(&self, size: usize) -> *mut u8 {
        unsafe { libc::malloc(size) as *mut u8 }
    }

    fn memalign(&self, alignment: usize, size: usize) -> *mut u8 {
        let mut out: *mut libc::c_void = ptr::null_mut();
        let rc = unsafe { libc::posix_memalign(&mut out, alignment, size) };
        if rc == 0 {
            out as *mut u8
        } else {
            ptr::null_mut()
        }
    }

    unsafe fn realloc(&self, ptr: *mut u8, new_size: usize) -> *mut u8 {
        unsafe { libc::realloc(ptr as *mut libc::c_void, new_size) as *mut u8 }
    }

    unsafe fn free(&self, ptr: *mut u8) {
        unsafe { libc::free(ptr as *mut libc::c_void) }
    }

    unsafe fn usable_size(&self, ptr: *mut u8) -> usize {
        usable_size_impl(ptr)
    }
}

#[cfg(all(unix, not(target_os = "macos")))]
unsafe fn usable_size_impl(ptr: *mut u8) -> usize {
    unsafe { libc::malloc_usable_size(ptr as *mut libc::c_void) }
}

#[cfg(target_os = "macos")]
unsafe fn usable_size_impl(ptr: *mut u8) -> usize {
    unsafe { libc::malloc_size(ptr as *const libc::c_void) }
}

#[cfg(not(unix))]
unsafe fn usable_size_impl(_ptr: *mut u8) -> usize {
    0
}

#[cfg(test)]
pub(crate) mod test_allocator {
    use super::BackingAllocator;
    use std::alloc::{alloc, dealloc, realloc, Layout};
    use std::collections::HashMap;
    use std::sync::Mutex;

    /// A backing allocator for tests: uses the Rust global allocator
    /// directly (bypassing libc) and remembers each live pointer's layout so
    /// `usable_size` and `free` stay consistent without any unsafe reliance
    /// on libc internals.
    #[derive(Default)]
    pub struct TestAllocator {
        live: Mutex<HashMap<usize, Layout>>,
    }

    unsafe impl BackingAllocator for TestAllocator {
        fn malloc(&self, size: usize) -> *mut u8 {
            let layout = Layout::from_size_align(size.max(1), 8).unwrap();
            let ptr = unsafe { alloc(layout) };
            if !ptr.is_null() {
                self.live.lock().unwrap().insert(ptr as usize, layout);
            }
            ptr
        }

        fn memalign(&self, alignment: usize, size: usize) -> *mut u8 {
            let layout = Layout::from_size_align(size.max(1), alignment).unwrap();
            let ptr = unsafe { alloc(layout) };
            if !ptr.is_null() {
                self.live.lock().unwrap().insert(ptr as usize, layout);
            }
            ptr
        }

        unsafe fn realloc(&self, ptr: *mut u8, new_size: usize) -> *mut u8 {
            if ptr.is_null() {
                return self.malloc(new_size);
            }
            let old_layout = self
                .live
                .lock()
                .unwrap()
                .remove(&(ptr as usize))
                .expect("realloc of untracked pointer");
            let new_ptr = unsafe { realloc(ptr, old_layout, new_size.max(1)) };
            if !new_ptr.is_null() {
                let new_layout = Layout::from_size_align(new_size.max(1), old_layout.align()).unwrap();
                self.live.lock().unwrap().insert(new_ptr as usize, new_layout);
            }
            new_ptr
        }

        unsafe fn free(&self, ptr: *mut u8) {
            if ptr.is_null() {
                return;
            }
            if let Some(layout) = self.live.lock().unwrap().remove(&(ptr as usize)) {
                unsafe { dealloc(ptr, layout) };
            }
        }

        unsafe fn usable_size(&self, ptr: *mut u8) -> usize {
            self.live
                .lock()
                .unwrap()
                .get(&(ptr as usize))
                .map(|l| l.size())
                .unwrap_or(0)
        }
    }
}
