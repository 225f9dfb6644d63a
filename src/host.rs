//! Host-side handshake surface.
//!
//! The actual host-language object graph (line tracer frame objects, strong
//! references the host keeps alive while profiling) is out of scope for
//! this crate; what's in scope is the *contract* the orchestrator relies on.
//! [`HostBindings`] captures that contract as a trait so a real host binding
//! can implement it, and [`NullHostBindings`] is a reference implementation
//! for tests and for hosts that don't need line-precise invalidation.

use crate::attribution::AttributionFn;
use crate::pathfilter::TraceConfig;
use std::sync::atomic::{AtomicBool, Ordering};

/// Process-wide "stop recording" flag, checked at the start of every
/// `register_*` call.
#[derive(Default)]
pub struct DoneFlag(AtomicBool);

impl DoneFlag {
    pub const fn new() -> Self {
        Self(AtomicBool::new(false))
    }

    pub fn set(&self, done: bool) {
        self.0.store(done, Ordering::Release);
    }

    pub fn is_done(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }
}

/// The handshake operations the host-side orchestrator drives.
///
/// `register_files_to_profile` is handled directly by [`crate::pathfilter::PathFilter`]
/// and [`crate::attribution::AttributionHook`] rather than through this
/// trait, since those already expose the right shape; this trait covers the
/// remaining handshakes that need host-specific behavior.
pub trait HostBindings: Send + Sync {
    /// Tri-state coordination for line-precise attribution invalidation:
    /// the host calls this when the last-profiled location is no longer
    /// valid (e.g. the line tracer moved on).
    fn set_last_profiled_invalidated(&self, invalidated: bool);

    /// Acquire a strong reference to whatever host-side object the line
    /// tracer needs kept alive for the duration of profiling.
    fn populate_struct(&self);

    /// Release the reference acquired by `populate_struct`.
    fn depopulate_struct(&self);

    /// Install a per-line tracer that, on a line change, invalidates the
    /// last-profiled location and enqueues the pair for the host aggregator.
    fn enable_settrace(&self);

    /// Remove the tracer installed by `enable_settrace`.
    fn disable_settrace(&self);
}

/// A no-op reference implementation: accepts every handshake call and does
/// nothing, which is enough for tests and for hosts that don't implement
/// line-precise invalidation.
#[derive(Default)]
pub struct NullHostBindings;

impl HostBindings for NullHostBindings {
    fn set_last_profiled_invalidated(&self, _invalidated: bool) {}
    fn populate_struct(&self) {}
    fn depopulate_struct(&self) {}
    fn enable_settrace(&self) {}
    fn disable_settrace(&self) {}
}

/// `register_files_to_profile(list_of_substrings, base_path, profile_all)`:
/// installs a new path filter and, as a side effect, installs the
/// attribution hook. Kept as a free function rather than a method
/// since it operates on the two independent singletons the interposer
/// already owns.
pub fn register_files_to_profile(
    filter: &crate::pathfilter::PathFilter,
    hook: &crate::attribution::AttributionHook,
    attribution_fn: AttributionFn,
    user_substrings: Vec<String>,
    base_path: impl Into<std::path::PathBuf>,
    profile_all: bool,
) {
    filter.register(TraceConfig::new(base_path, user_substrings, profile_all));
    hook.install(attribution_fn);
}

#[cfg(test)]
mod test;
