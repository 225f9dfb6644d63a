//! Net-footprint threshold sampling.
//!
//! A sampler accumulates signed byte flow (`increment`/`decrement`) and
//! "fires" when the net magnitude crosses a threshold, returning exactly the
//! crossing size. Transient allocate/free pairs that never cross the
//! threshold never fire, which damps noise from short-lived objects without
//! any bookkeeping beyond two running counters.

#[cfg(feature = "geometric-sampler")]
mod geometric;
#[cfg(feature = "geometric-sampler")]
pub use geometric::GeometricSampler;


/// Outcome of feeding a sample amount into a [`Sampler`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Fire {
    /// The accumulated net crossing size. Always `>= threshold`.
    pub interval: u64,
}

/// Common interface so the interposer doesn't care which sampling policy is
/// installed (deterministic net-footprint, or the geometric-distribution
/// variant behind `geometric-sampler`).
pub trait Sampler {
    fn threshold(&self) -> u64;
    fn increment(&mut self, size: u64) -> Option<Fire>;
    fn decrement(&mut self, size: u64) -> Option<Fire>;
}

/// The default, deterministic net-footprint sampler.
///
/// Invariant: after every `reset()` (which happens on every fire),
/// `increments == decrements == 0`.
#[derive(Clone, Debug)]
pub struct ThresholdSampler {
    threshold: u64,
    increments: u64,
    decrements: u64,
}

impl ThresholdSampler {
    /// # Panics
    /// Panics if `threshold == 0`: a zero threshold would fire on every
    /// single byte, which is never a useful sampling rate.
    pub fn new(threshold: u64) -> Self {
        assert!(threshold > 0, "sampler threshold must be > 0");
        Self {
            threshold,
            increments: 0,
            decrements: 0,
        }
    }

    fn reset(&mut self) {
        self.increments = 0;
        self.decrements = 0;
    }
}

impl Sampler for ThresholdSampler {
    fn threshold(&self) -> u64 {
        self.threshold
    }

    fn increment(&mut self, size: u64) -> Option<Fire> {
        self.increments += size;
        if self.increments >= self.decrements + self.threshold {
            let interval = self.increments - self.decrements;
            self.reset();
            Some(Fire { interval })
        } else {
            None
        }
    }

    fn decrement(&mut self, size: u64) -> Option<Fire> {
        self.decrements += size;
        if self.decrements >= self.increments + self.threshold {
            let interval = self.decrements - self.increments;
            self.reset();
            Some(Fire { interval })
        } else {
            None
        }
    }
}
