use rand::rngs::StdRng;
use rand::{Rng, RngCore, SeedableRng};

/// Uniform random numbers for probability rolls and humanize jitter.
///
/// Any `rand` generator works; tests inject seeded or scripted sources so
/// resolution is reproducible.
pub trait RandomSource {
    /// Next sample in `[0, 1)`.
    fn next_unit(&mut self) -> f64;
}

impl<R: RngCore> RandomSource for R {
    #[inline]
    fn next_unit(&mut self) -> f64 {
        self.gen::<f64>()
    }
}

/// Generator used for live playback.
pub fn entropy_source() -> StdRng {
    StdRng::from_entropy()
}

/// Deterministic generator, for offline simulation and tests.
pub fn seeded_source(seed: u64) -> StdRng {
    StdRng::seed_from_u64(seed)
}
