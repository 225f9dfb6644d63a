//! The cross-process sample channel.
//!
//! Three named backing files per channel, substituted from `%d` templates
//! with the current process id:
//!   - *signal* file: a large append-only text region.
//!   - *lock* file: an 8-byte write offset followed by a spin lock.
//!   - *init* file: a 3-byte magic gating one-time construction of the lock,
//!     shared by every process that attaches to this channel.

mod arena;
mod reader;
mod spinlock;

#[cfg(test)]
mod test;

use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

use arena::Arena;
use spinlock::SpinLock;

use crate::error::{Error, Result};

pub use reader::{get_line_atomic, ChannelReader};

/// Size of the mapped signal region: 4096 * 65536 bytes (256 MiB), matching
/// a generous, fixed-size region that never needs to grow.
pub const SIGNAL_REGION_LEN: usize = 4096 * 65536;

/// Size of the mapped lock region: an 8-byte offset plus spin-lock body,
/// rounded up to a page.
pub const LOCK_REGION_LEN: usize = 4096;

/// Each write is expected to atomically append up to a small maximum (≤ 4096 bytes).
pub const MAX_LINE_LEN: usize = 4096;

const INIT_MAGIC: [u8; 3] = *b"q&\0";

/// Named templates for the malloc/free sample channel, each
/// containing a `%d` substituted with the current process id at `open`.
pub const MALLOC_SIGNAL_TEMPLATE: &str = "/tmp/scalene-malloc-signal%d";
pub const MALLOC_LOCK_TEMPLATE: &str = "/tmp/scalene-malloc-lock%d";
pub const MALLOC_INIT_TEMPLATE: &str = "/tmp/scalene-malloc-init%d";

/// Named templates for the independent memcpy/memmove/strcpy sample channel.
pub const MEMCPY_SIGNAL_TEMPLATE: &str = "/tmp/scalene-memcpy-signal%d";
pub const MEMCPY_LOCK_TEMPLATE: &str = "/tmp/scalene-memcpy-lock%d";
pub const MEMCPY_INIT_TEMPLATE: &str = "/tmp/scalene-memcpy-init%d";

/// The writer side of a sample channel.
pub struct SampleChannel {
    signal_arena: Arena,
    lock_arena: Arena,
    spin_lock: SpinLock,
    write_offset: *const AtomicU64,
    init_path: PathBuf,
}

// `write_offset` points into `lock_arena`, which outlives every use of it.
unsafe impl Send for SampleChannel {}
unsafe impl Sync for SampleChannel {}

impl SampleChannel {
    /// Materializes the three backing files, substituting `pid` into each
    /// `%d` template, and either binds to an already-constructed lock or
    /// constructs a fresh one, per the one-shot init protocol.
    ///
    /// Any syscall failure here is unrecoverable for the channel: callers
    /// that want the documented abort-on-failure behavior should call
    /// [`SampleChannel::open_or_abort`] instead.
    pub fn open(pid: i32, signal_template: &str, lock_template: &str, init_template: &str) -> Result<Self> {
        let signal_path = substitute_pid(signal_template, pid);
        let lock_path = substitute_pid(lock_template, pid);
        let init_path = substitute_pid(init_template, pid);

        let chan_err = |template: &Path| {
            move |source: std::io::Error| Error::ChannelInit {
                template: template.to_path_buf(),
                source,
            }
        };

        let signal_file = crate::sys::open_rw_create(&signal_path).map_err(chan_err(&signal_path))?;
        crate::sys::ftruncate(&signal_file, SIGNAL_REGION_LEN as u64).map_err(chan_err(&signal_path))?;
        let signal_arena = Arena::new(&signal_file, SIGNAL_REGION_LEN).map_err(chan_err(&signal_path))?;

        let lock_file = crate::sys::open_rw_create(&lock_path).map_err(chan_err(&lock_path))?;
        crate::sys::ftruncate(&lock_file, LOCK_REGION_LEN as u64).map_err(chan_err(&lock_path))?;
        let lock_arena = Arena::new(&lock_file, LOCK_REGION_LEN).map_err(chan_err(&lock_path))?;

        let spin_lock = init_handshake(&init_path, &signal_arena, &lock_arena)?;

        let write_offset = lock_arena.as_mut_ptr() as *const AtomicU64;

        Ok(Self {
            signal_arena,
            lock_arena,
            spin_lock,
            write_offset,
            init_path,
        })
    }

    /// Same as [`SampleChannel::open`], but logs and aborts the process on
    /// any failure: tracing is moot without the channel, so a host binding
    /// that can't construct one has nothing useful left to do.
    pub fn open_or_abort(pid: i32, signal_template: &str, lock_template: &str, init_template: &str) -> Self {
        match Self::open(pid, signal_template, lock_template, init_template) {
            Ok(channel) => channel,
            Err(e) => {
                log::error!(
                    "unrecoverable error constructing sample channel ({signal_template}): {e}"
                );
                std::process::abort();
            }
        }
    }

    fn offset(&self) -> &AtomicU64 {
        unsafe { &*self.write_offset }
    }

    /// Appends `line` at the channel's current write offset under the
    /// cross-process spin lock. Lines longer than [`MAX_LINE_LEN`], or that
    /// would overflow the remaining room in the signal region, are
    /// truncated to whatever fits; the returned count lets the caller detect
    /// truncation.
    pub fn write(&self, line: &[u8]) -> usize {
        let line = &line[..line.len().min(MAX_LINE_LEN)];

        self.spin_lock.lock();
        let offset = self.offset().load(Ordering::Relaxed) as usize;
        let room = self.signal_arena.len().saturating_sub(offset);
        let n = line.len().min(room);

        if n > 0 {
            let dst = unsafe { self.signal_arena.as_mut_ptr().add(offset) };
            unsafe {
                std::ptr::copy_nonoverlapping(line.as_ptr(), dst, n);
            }
        }

        // Release barrier: readers that observe the advanced offset must
        // also observe the bytes just written.
        self.offset().store((offset + n) as u64, Ordering::Release);
        self.spin_lock.unlock();

        n
    }

    /// Unmaps the regions and removes the init file. The signal and lock
    /// files are intentionally left behind for the host-side drain to finish
    /// reading.
    pub fn close(self) {
        if let Err(e) = std::fs::remove_file(&self.init_path) {
            log::warn!("failed to remove init file {:?}: {e}", self.init_path);
        }
        // `signal_arena`/`lock_arena` unmap on drop.
    }

    pub(crate) fn signal_arena(&self) -> &Arena {
        &self.signal_arena
    }

    pub(crate) fn lock_arena(&self) -> &Arena {
        &self.lock_arena
    }

    pub(crate) fn spin_lock(&self) -> &SpinLock {
        &self.spin_lock
    }
}

/// Binds to (or constructs) the spin lock living at `lock_arena + 8`,
/// serialized across processes by an exclusive advisory lock on `init_path`.
///
/// The winner of this handshake also stamps the entire signal region with
/// `\n`. The region starts out zero-filled (it's backed by a freshly
/// `ftruncate`d file), and `\n` is the byte [`get_line_atomic`] treats as
/// "nothing written here yet" when it finds the read position sitting at the
/// write offset — `\0` would read as ordinary, unterminated line content and
/// never short-circuit. Stamping once at construction, instead of per-write,
/// keeps the hot append path a plain byte copy.
fn init_handshake(init_path: &Path, signal_arena: &Arena, lock_arena: &Arena) -> Result<SpinLock> {
    let chan_err = |source: std::io::Error| Error::ChannelInit {
        template: init_path.to_path_buf(),
        source,
    };

    let mut init_file = crate::sys::open_rw_create(init_path).map_err(chan_err)?;
    crate::sys::flock_exclusive(&init_file).map_err(chan_err)?;

    let mut buf = [0u8; 3];
    let read = init_file.read(&mut buf).unwrap_or(0);

    let lock_word = unsafe { lock_arena.as_mut_ptr().add(std::mem::size_of::<u64>()) } as *mut u32;

    let spin_lock = if read == 0 {
        unsafe {
            std::ptr::write_bytes(signal_arena.as_mut_ptr(), b'\n', signal_arena.len());
        }
        init_file.write_all(&INIT_MAGIC).map_err(chan_err)?;
        init_file.sync_all().map_err(chan_err)?;
        unsafe {
            SpinLock::init(lock_word);
        }
        let offset_word = lock_arena.as_mut_ptr() as *mut u64;
        unsafe {
            *offset_word = 0;
        }
        unsafe { SpinLock::at(lock_word) }
    } else if buf == INIT_MAGIC {
        // Already constructed by some other process sharing this channel.
        unsafe { SpinLock::at(lock_word) }
    } else {
        let _ = crate::sys::flock_unlock(&init_file);
        return Err(Error::BadInitMagic {
            path: init_path.to_path_buf(),
        });
    };

    crate::sys::flock_unlock(&init_file).map_err(chan_err)?;
    Ok(spin_lock)
}

fn substitute_pid(template: &str, pid: i32) -> PathBuf {
    PathBuf::from(template.replacen("%d", &pid.to_string(), 1))
}
