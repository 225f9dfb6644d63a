use std::hint;
use std::mem::align_of;
use std::sync::atomic::{AtomicU32, Ordering};

const UNLOCKED: u32 = 0;
const LOCKED: u32 = 1;

/// A cross-process spin lock living directly in shared memory.
///
/// This cannot be a `std::sync::Mutex` — those rely on futex/OS-mutex
/// machinery scoped to a single process's address space. Instead this is a
/// bare `AtomicU32` CAS loop over a location inside the mapped lock region,
/// the same `AtomicU32::from_ptr`/`AtomicU64::from_ptr` trick used to treat
/// raw mmap'd ring-buffer head/tail cursors as atomics shared across
/// processes.
#[derive(Clone)]
pub(crate) struct SpinLock {
    word: *const AtomicU32,
}

impl SpinLock {
    /// # Safety
    /// `ptr` must point to a valid, `AtomicU32`-aligned, 4-byte location
    /// inside memory that outlives this `SpinLock` and that no other code
    /// writes to except through [`SpinLock`] operations.
    pub(crate) unsafe fn at(ptr: *mut u32) -> Self {
        debug_assert_eq!(ptr as usize % align_of::<u32>(), 0);
        Self {
            word: AtomicU32::from_ptr(ptr),
        }
    }

    /// Initializes the lock word to the unlocked state. Must be called
    /// exactly once, by whichever process wins the one-shot init handshake.
    ///
    /// # Safety
    /// Same requirements as [`SpinLock::at`], and must not race a concurrent
    /// `lock`/`unlock` call on the same memory.
    pub(crate) unsafe fn init(ptr: *mut u32) {
        (*ptr) = UNLOCKED;
    }

    pub(crate) fn lock(&self) {
        let word = unsafe { &*self.word };
        let mut spins = 0u32;
        while word
            .compare_exchange_weak(UNLOCKED, LOCKED, Ordering::Acquire, Ordering::Relaxed)
            .is_err()
        {
            spins += 1;
            if spins < 64 {
                hint::spin_loop();
            } else {
                std::thread::yield_now();
            }
        }
    }

    pub(crate) fn unlock(&self) {
        let word = unsafe { &*self.word };
        word.store(UNLOCKED, Ordering::Release);
    }

    /// A cheap, shared handle to the same underlying lock word.
    pub(crate) fn share(&self) -> Self {
        self.clone()
    }
}

unsafe impl Send for SpinLock {}
unsafe impl Sync for SpinLock {}
