//! Native runtime core of a sampling memory profiler for a dynamic,
//! reference-counted host language: the allocator interposer, the
//! net-footprint threshold sampler, and the cross-process sample channel
//! through which attributed records reach the host-side orchestrator.
//!
//! Three subsystems compose into a single sampling allocator with host-stack
//! attribution:
//!
//! - [`interposer`] wraps the process-wide `malloc`/`free`/`memalign`/
//!   `realloc`/`memcpy`/`memmove`/`strcpy` entry points, forwarding every
//!   call to a [`interposer::BackingAllocator`] and deciding, via the
//!   sampler, which calls surface as attributed samples.
//! - [`sampler`] is the net-footprint threshold decision: cheap on the hot
//!   path, and robust against allocate/free bursts that never cross the
//!   threshold.
//! - [`channel`] is the bounded, shared-memory, single-writer-at-a-time
//!   textual channel the native side appends records to and the host-side
//!   process drains from, guarded by a spin lock and a one-shot
//!   cross-process init handshake.
//!
//! [`attribution`] and [`pathfilter`] supply the host-stack attribution seam
//! — a callable the host installs that walks its own stack and resolves a
//! `(file, line, bytecode offset)` triple for the innermost frame the path
//! filter considers in scope. [`host`] covers the remaining handshakes
//! (`register_files_to_profile`, the done flag, line-tracer invalidation)
//! that the host-side orchestrator drives. [`record`] is the wire format
//! both channels carry.
//!
//! # Example
//!
//! Driving the interposer directly, the way a host binding that hooks
//! allocation through a language-level allocator API (rather than process-
//! wide symbol interposition) would:
//!
//! ```no_run
//! use sampling_heap_core::channel::{
//!     SampleChannel, MALLOC_INIT_TEMPLATE, MALLOC_LOCK_TEMPLATE, MALLOC_SIGNAL_TEMPLATE,
//!     MEMCPY_INIT_TEMPLATE, MEMCPY_LOCK_TEMPLATE, MEMCPY_SIGNAL_TEMPLATE,
//! };
//! use sampling_heap_core::interposer::{
//!     Interposer, SystemAllocator, DEFAULT_MALLOC_THRESHOLD, DEFAULT_MEMCPY_THRESHOLD,
//! };
//!
//! let pid = std::process::id() as i32;
//! let malloc_channel =
//!     SampleChannel::open_or_abort(pid, MALLOC_SIGNAL_TEMPLATE, MALLOC_LOCK_TEMPLATE, MALLOC_INIT_TEMPLATE);
//! let memcpy_channel =
//!     SampleChannel::open_or_abort(pid, MEMCPY_SIGNAL_TEMPLATE, MEMCPY_LOCK_TEMPLATE, MEMCPY_INIT_TEMPLATE);
//!
//! let interposer = Interposer::new(
//!     SystemAllocator,
//!     malloc_channel,
//!     memcpy_channel,
//!     DEFAULT_MALLOC_THRESHOLD,
//!     DEFAULT_MEMCPY_THRESHOLD,
//! );
//!
//! // A host binding resolving a frame via its own FFI layer would install
//! // its own attribution callback and path filter here, then call
//! // interposer.record_malloc(size, ptr, true) from its allocator hook.
//! let _ = interposer.path_filter();
//! ```
//!
//! # Platform support
//!
//! The allocation interposer and sample channel are Unix-only: they rely on
//! `mmap`-backed shared memory, `flock` advisory locking, and `SIGXCPU`/
//! `SIGXFSZ`/`SIGPROF` signal delivery, none of which have a direct
//! equivalent on other platforms. The record format, threshold sampler, and
//! path filter build everywhere and are independently testable.

pub mod attribution;
pub mod channel;
pub mod error;
pub mod host;
pub mod interposer;
pub mod pathfilter;
pub mod record;
pub mod sampler;
mod sys;

pub use error::{Error, Result};
