use rand::rngs::ThreadRng;
use rand::Rng;

use super::{Fire, Sampler};

/// Geometric-distribution variant.
///
/// Instead of firing on a fixed threshold crossing, this counts down a
/// countdown drawn from a geometric distribution with parameter `1 /
/// threshold`, so the expected interval between fires equals `threshold`
/// while individual intervals vary. This trades determinism (useful for
/// tests) for resistance to adversarial or periodic allocation patterns that
/// could otherwise always land on the same side of a fixed threshold.
pub struct GeometricSampler {
    threshold: u64,
    till_next_alloc: u64,
    till_next_free: u64,
    rng: ThreadRng,
}

impl GeometricSampler {
    pub fn new(threshold: u64) -> Self {
        assert!(threshold > 0, "sampler threshold must be > 0");
        let mut rng = rand::thread_rng();
        let till_next_alloc = draw(&mut rng, threshold);
        let till_next_free = draw(&mut rng, threshold);
        Self {
            threshold,
            till_next_alloc,
            till_next_free,
            rng,
        }
    }
}

impl Sampler for GeometricSampler {
    fn threshold(&self) -> u64 {
        self.threshold
    }

    fn increment(&mut self, size: u64) -> Option<Fire> {
        if size >= self.till_next_alloc {
            let overshoot = size - self.till_next_alloc;
            let interval = self.threshold + overshoot;
            self.till_next_alloc = draw(&mut self.rng, self.threshold);
            Some(Fire { interval })
        } else {
            self.till_next_alloc -= size;
            None
        }
    }

    fn decrement(&mut self, size: u64) -> Option<Fire> {
        if size >= self.till_next_free {
            let overshoot = size - self.till_next_free;
            let interval = self.threshold + overshoot;
            self.till_next_free = draw(&mut self.rng, self.threshold);
            Some(Fire { interval })
        } else {
            self.till_next_free -= size;
            None
        }
    }
}

/// Draws a positive geometric-ish countdown with mean `threshold`, without
/// pulling in `rand_distr` for a single distribution: we build the
/// equivalent of `Geometric(1/threshold)` from the RNG's uniform draw via
/// inverse-CDF sampling, retrying the degenerate zero outcome the same way
/// C++'s `std::geometric_distribution` does when it draws a zero.
fn draw(rng: &mut ThreadRng, threshold: u64) -> u64 {
    let p = 1.0 / threshold as f64;
    loop {
        let u: f64 = rng.gen_range(0.0..1.0);
        let value = (u.ln() / (1.0 - p).ln()).floor() as u64;
        if value != 0 {
            return value;
        }
    }
}
