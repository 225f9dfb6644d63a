//! Thread-local "already inside our allocator" flag.
//!
//! This can't be a plain `std::thread_local!` on the interposition path:
//! the thread-local's own lazy initialization may itself call into
//! `malloc` (to create the OS thread-specific-data slot), which would
//! recurse into the very guard being constructed. The fix is a tri-state
//! double-checked-locking scheme around a raw `pthread_key_t`: while the key
//! itself is being created, every thread conservatively reports "in
//! allocator" so the allocation that creates the key is forwarded to the
//! backing allocator untracked.

#[cfg(unix)]
mod imp {
    use std::cell::UnsafeCell;
    use std::sync::atomic::{AtomicU8, Ordering};
    use std::sync::Mutex;

    const NEEDS_KEY: u8 = 0;
    const CREATING_KEY: u8 = 1;
    const DONE: u8 = 2;

    struct KeyCell(UnsafeCell<libc::pthread_key_t>);
    unsafe impl Sync for KeyCell {}

    static KEY_STATE: AtomicU8 = AtomicU8::new(NEEDS_KEY);
    static KEY_INIT_LOCK: Mutex<()> = Mutex::new(());
    static KEY_CELL: KeyCell = KeyCell(UnsafeCell::new(0));

    fn key_value() -> libc::pthread_key_t {
        unsafe { *KEY_CELL.0.get() }
    }

    /// Returns `CREATING_KEY` if this call itself constructed the key (the
    /// caller must then treat the current allocation as "in allocator"),
    /// otherwise `DONE`.
    fn ensure_key(state: u8) -> u8 {
        let _guard = KEY_INIT_LOCK.lock().unwrap();
        let state = if state == NEEDS_KEY {
            KEY_STATE.load(Ordering::Relaxed)
        } else {
            state
        };
        if state != NEEDS_KEY {
            return state;
        }
        KEY_STATE.store(CREATING_KEY, Ordering::Relaxed);
        let rc = unsafe { libc::pthread_key_create(KEY_CELL.0.get(), None) };
        if rc != 0 {
            // Without a TLS slot there is no way to break reentrancy safely.
            std::process::abort();
        }
        KEY_STATE.store(DONE, Ordering::Release);
        DONE
    }

    pub(super) fn is_in_allocator() -> bool {
        let state = KEY_STATE.load(Ordering::Acquire);
        if state != DONE && ensure_key(state) == CREATING_KEY {
            return true;
        }
        unsafe { !libc::pthread_getspecific(key_value()).is_null() }
    }

    pub(super) fn set_in_allocator(value: bool) {
        let ptr = if value {
            1usize as *mut libc::c_void
        } else {
            std::ptr::null_mut()
        };
        unsafe {
            libc::pthread_setspecific(key_value(), ptr);
        }
    }
}

#[cfg(not(unix))]
mod imp {
    std::thread_local! {
        static IN_ALLOCATOR: std::cell::Cell<bool> = const { std::cell::Cell::new(false) };
    }

    pub(super) fn is_in_allocator() -> bool {
        IN_ALLOCATOR.with(|f| f.get())
    }

    pub(super) fn set_in_allocator(value: bool) {
        IN_ALLOCATOR.with(|f| f.set(value));
    }
}

/// RAII scope marking the current thread as "inside the allocator" for its
/// lifetime, unless the thread already was — in which case this scope is a
/// no-op observer (`was_in_allocator()` returns `true`) so nested calls don't
/// clear the flag early.
pub struct RecursionGuard {
    was_in_allocator: bool,
}

impl RecursionGuard {
    pub fn enter() -> Self {
        let was_in_allocator = imp::is_in_allocator();
        if !was_in_allocator {
            imp::set_in_allocator(true);
        }
        Self { was_in_allocator }
    }

    /// `true` if this thread was already inside the allocator when this
    /// guard was entered — the caller must forward the current operation to
    /// the backing allocator without sampling it.
    pub fn was_in_allocator(&self) -> bool {
        self.was_in_allocator
    }
}

impl Drop for RecursionGuard {
    fn drop(&mut self) {
        if !self.was_in_allocator {
            imp::set_in_allocator(false);
        }
    }
}

#[cfg(test)]
mod test;
