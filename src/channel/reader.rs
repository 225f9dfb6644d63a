//! The Line-Bounded Reader: the host-side companion to
//! [`super::SampleChannel`] that atomically consumes one line at a time.

use super::arena::Arena;
use super::spinlock::SpinLock;
use super::SampleChannel;
use crate::error::Result;

/// Consumes at most one line from `signal`, starting at `*pos`, under
/// `lock`. Returns the number of bytes copied into `out` (including the
/// trailing `\n`), or `None` if the byte at the current read position is
/// already a newline (no new record available yet).
///
/// The "already a newline" check relies on the signal region being
/// pre-stamped with `\n` out to its full length at channel construction
/// (see `SampleChannel`'s init handshake) rather than left zero-filled: a
/// writer only ever overwrites the bytes of the line it appends, so every
/// byte at or past the current write offset reads as `\n` until a writer
/// gets there.
///
/// Mirrors the external `get_line_atomic(lock_region, signal_region,
/// scratch_buffer, last_read_position)` contract directly over
/// the already-mapped regions, without any host-language buffer protocol.
pub fn get_line_atomic(lock: &SpinLock, signal: &[u8], out: &mut [u8], pos: &mut u64) -> Option<usize> {
    lock.lock();
    let start = *pos as usize;

    if start >= signal.len() || signal[start] == b'\n' {
        lock.unlock();
        return None;
    }

    let rest = &signal[start..];
    let newline_at = rest.iter().position(|&b| b == b'\n');
    let copy_len = match newline_at {
        Some(idx) => idx + 1,
        None => rest.len(),
    };
    let copy_len = copy_len.min(out.len());

    out[..copy_len].copy_from_slice(&rest[..copy_len]);
    *pos += copy_len as u64;

    lock.unlock();
    Some(copy_len)
}

/// A convenience, stateful reader that owns its read-position cursor and the
/// mapped regions of an already-open [`SampleChannel`] (or of a channel
/// attached to from a separate process via [`ChannelReader::attach`]).
pub struct ChannelReader {
    signal_arena: Arena,
    lock_arena: Arena,
    spin_lock: SpinLock,
    pos: u64,
}

impl ChannelReader {
    /// Attaches to a channel already opened in this process, sharing its
    /// mapped regions and lock but keeping an independent read cursor.
    pub fn from_channel(channel: &SampleChannel) -> Self {
        Self {
            signal_arena: Arena::new_view(channel.signal_arena()),
            lock_arena: Arena::new_view(channel.lock_arena()),
            spin_lock: channel.spin_lock().share(),
            pos: 0,
        }
    }

    /// Attaches to a channel created by another process, from the same
    /// `%d`-substituted templates, running the same one-shot handshake
    /// (binding to the lock if it already exists).
    pub fn attach(pid: i32, signal_template: &str, lock_template: &str, init_template: &str) -> Result<Self> {
        let channel = SampleChannel::open(pid, signal_template, lock_template, init_template)?;
        Ok(Self {
            signal_arena: Arena::new_view(channel.signal_arena()),
            lock_arena: Arena::new_view(channel.lock_arena()),
            spin_lock: channel.spin_lock().share(),
            pos: 0,
        })
    }

    /// Reads the next available line, if any. Returns `None` with no state
    /// change if no complete line is currently available.
    pub fn next_line(&mut self) -> Option<Vec<u8>> {
        let mut scratch = vec![0u8; super::MAX_LINE_LEN];
        let signal = self.signal_arena.as_slice();
        let n = get_line_atomic(&self.spin_lock, signal, &mut scratch, &mut self.pos)?;
        scratch.truncate(n);
        Some(scratch)
    }

    pub fn position(&self) -> u64 {
        self.pos
    }
}

// `signal_arena`/`lock_arena` are views over memory the channel keeps mapped
// for the process's lifetime; `spin_lock` is a raw pointer into the same
// shared page, valid for as long as the arena views are.
unsafe impl Send for ChannelReader {}
