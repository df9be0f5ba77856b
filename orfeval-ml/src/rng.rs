//! Seeded linear congruential generator for shuffling and initialisation.

pub(crate) struct LcgRng {
    state: u64,
}

impl LcgRng {
    pub(crate) fn new(seed: u64) -> Self {
        Self {
            state: seed.wrapping_add(1), // avoid zero state
        }
    }

    pub(crate) fn next_u64(&mut self) -> u64 {
        self.state = self
            .state
            .wrapping_mul(6364136223846793005)
            .wrapping_add(1442695040888963407);
        self.state
    }

    pub(crate) fn next_bounded(&mut self, bound: u64) -> u64 {
        self.next_u64() % bound
    }

    /// Uniform in `[0, 1)` from the top 53 bits.
    pub(crate) fn next_f64(&mut self) -> f64 {
        (self.next_u64() >> 11) as f64 / (1u64 << 53) as f64
    }

    /// Uniform in `[-bound, bound)`.
    pub(crate) fn next_symmetric(&mut self, bound: f64) -> f64 {
        (2.0 * self.next_f64() - 1.0) * bound
    }
}

/// Fisher-Yates shuffle using LCG.
pub(crate) fn shuffle(rng: &mut LcgRng, data: &mut [usize]) {
    let n = data.len();
    for i in (1..n).rev() {
        let j = rng.next_bounded((i + 1) as u64) as usize;
        data.swap(i, j);
    }
}
