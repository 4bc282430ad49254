//! Seeded draws for the synthetic generator.
//!
//! RULE: the generator never touches a platform RNG. One master seed
//! fans out into a fixed set of streams, one per kind of draw, so a
//! change in how orders are drawn leaves customer draws untouched.

use rand::{Rng, SeedableRng};
use rand_pcg::Pcg64Mcg;

/// The kinds of draw a generation run makes.
/// Discriminants feed the seed mix: append only.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(u64)]
pub enum DrawKind {
    Customers = 0,
    Orders    = 1,
    Amounts   = 2,
    Discounts = 3,
}

/// Splitmix64 finaliser over (seed, kind).
fn mix(seed: u64, kind: DrawKind) -> u64 {
    let mut z = seed.wrapping_add((kind as u64 + 1).wrapping_mul(0x9e37_79b9_7f4a_7c15));
    z = (z ^ (z >> 30)).wrapping_mul(0xbf58_476d_1ce4_e5b9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94d0_49bb_1331_11eb);
    z ^ (z >> 31)
}

pub struct DrawStream {
    inner: Pcg64Mcg,
}

impl DrawStream {
    pub fn new(seed: u64, kind: DrawKind) -> Self {
        Self {
            inner: Pcg64Mcg::seed_from_u64(mix(seed, kind)),
        }
    }

    /// Uniform in [0, 1).
    pub fn unit(&mut self) -> f64 {
        self.inner.gen::<f64>()
    }

    /// True with probability `p`; `p` outside [0, 1] saturates.
    pub fn chance(&mut self, p: f64) -> bool {
        self.unit() < p
    }

    /// Uniform integer in [0, n). Zero when `n` is zero.
    pub fn below(&mut self, n: u64) -> u64 {
        if n == 0 {
            0
        } else {
            self.inner.gen_range(0..n)
        }
    }

    /// Uniform in [lo, hi).
    pub fn between(&mut self, lo: f64, hi: f64) -> f64 {
        lo + (hi - lo) * self.unit()
    }

    /// Pareto ticket size, clipped at `cap`.
    pub fn ticket(&mut self, x_min: f64, alpha: f64, cap: f64) -> f64 {
        let u = self.unit().max(1e-10);
        (x_min * u.powf(-1.0 / alpha)).min(cap)
    }

    /// Whole days until the next order: at least one, exponential tail
    /// around `mean_days`.
    pub fn gap_days(&mut self, mean_days: f64) -> i64 {
        let u = self.unit().max(1e-10);
        1 + (-u.ln() * mean_days).floor() as i64
    }
}

/// Hands out the streams of one generation run.
pub struct SeedBank {
    seed: u64,
}

impl SeedBank {
    pub fn new(seed: u64) -> Self {
        Self { seed }
    }

    pub fn stream(&self, kind: DrawKind) -> DrawStream {
        DrawStream::new(self.seed, kind)
    }
}
