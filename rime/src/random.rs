//! Deterministic seed generation.
//!
//! Table construction needs a stream of trial seeds: one per first-level attempt and one per
//! displacement attempt. The stream has to be deterministic, so that rebuilding a table from the
//! same keys is a no-op, and cheap, as the displacement search may draw many candidates.
//!
//! Two generators are provided:
//!
//! - [`LinearCongruentialEngine`], a stateful engine bit-for-bit compatible with the classic
//!   `x' = (a * x + c) mod m` engines, e.g. [`MinStdRand`].
//! - [`next_candidate`], a stateless step function used for fast displacement retries, and
//!   [`Lcg`], a tiny stateful wrapper around it that is the default seed source.

/// A source of trial seeds.
///
/// Implementations must be deterministic: two sources constructed the same way yield the same
/// sequence.
pub trait SeedSource {
    /// Produce the next seed.
    fn next_seed(&mut self) -> u64;
}

impl<S: ?Sized + SeedSource> SeedSource for &mut S {
    #[inline]
    fn next_seed(&mut self) -> u64 {
        (**self).next_seed()
    }
}

/// A seed source that calls a closure.
///
/// Created by [`from_fn`].
#[derive(Clone, Debug)]
pub struct FromFn<F>(F);

/// Create a seed source from a closure, much like [`core::iter::from_fn`].
///
/// Useful for scripting the seeds tried during construction.
#[inline]
pub const fn from_fn<F: FnMut() -> u64>(f: F) -> FromFn<F> {
    FromFn(f)
}

impl<F: FnMut() -> u64> SeedSource for FromFn<F> {
    #[inline]
    fn next_seed(&mut self) -> u64 {
        (self.0)()
    }
}

/// Multiplier of [`next_candidate`], from Knuth's MMIX.
const CANDIDATE_MULTIPLIER: u64 = 6_364_136_223_846_793_005;

/// Increment of [`next_candidate`], from Knuth's MMIX.
const CANDIDATE_INCREMENT: u64 = 1_442_695_040_888_963_407;

/// Compute the seed following `seed`.
///
/// This is one step of a full-period LCG modulo `2^64`. Being a pure function, it lets the
/// displacement search retry without carrying a generator object around.
#[inline]
#[must_use]
pub const fn next_candidate(seed: u64) -> u64 {
    seed.wrapping_mul(CANDIDATE_MULTIPLIER)
        .wrapping_add(CANDIDATE_INCREMENT)
}

/// The default seed source for table construction.
///
/// Steps through [`next_candidate`] starting from a fixed state.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Lcg {
    /// The last produced value.
    state: u64,
}

impl Lcg {
    /// Hexadecimal digits of pi - 3.
    const DEFAULT_STATE: u64 = 0x243f_6a88_85a3_08d3;

    /// Create a generator starting from `state`.
    ///
    /// The first produced value is `next_candidate(state)`.
    #[inline]
    #[must_use]
    pub const fn new(state: u64) -> Self {
        Self { state }
    }

    /// Produce the next value.
    #[inline]
    pub fn next(&mut self) -> u64 {
        self.state = next_candidate(self.state);
        self.state
    }
}

impl Default for Lcg {
    #[inline]
    fn default() -> Self {
        Self::new(Self::DEFAULT_STATE)
    }
}

impl SeedSource for Lcg {
    #[inline]
    fn next_seed(&mut self) -> u64 {
        self.next()
    }
}

/// A linear congruential engine `x' = (A * x + C) mod M`.
///
/// `M == 0` denotes the modulus `2^64`. Outputs match the standard engine with the same
/// parameters, including seeding rules and `min`/`max`.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct LinearCongruentialEngine<const A: u64, const C: u64, const M: u64> {
    /// The last produced value, or the seed if nothing was produced yet.
    state: u64,
}

/// The "minimal standard" engine from Park and Miller, 1988.
pub type MinStdRand0 = LinearCongruentialEngine<16_807, 0, 2_147_483_647>;

/// The "minimal standard" engine from Park, Miller, and Stockmeyer, 1993.
pub type MinStdRand = LinearCongruentialEngine<48_271, 0, 2_147_483_647>;

impl<const A: u64, const C: u64, const M: u64> LinearCongruentialEngine<A, C, M> {
    /// The multiplier.
    pub const MULTIPLIER: u64 = A;

    /// The increment.
    pub const INCREMENT: u64 = C;

    /// The modulus, `0` meaning `2^64`.
    pub const MODULUS: u64 = M;

    /// The seed used by [`Default`].
    pub const DEFAULT_SEED: u64 = 1;

    /// Create an engine from a seed.
    #[inline]
    #[must_use]
    pub const fn new(seed: u64) -> Self {
        Self {
            state: Self::normalize_seed(seed),
        }
    }

    /// Reset the engine to a seed.
    #[inline]
    pub fn seed(&mut self, seed: u64) {
        self.state = Self::normalize_seed(seed);
    }

    /// Reduce `value` modulo `M`.
    #[allow(clippy::cast_possible_truncation, reason = "reduced below M <= u64::MAX")]
    const fn reduce(value: u128) -> u64 {
        if M == 0 {
            value as u64
        } else {
            (value % M as u128) as u64
        }
    }

    /// Apply the seeding rules: the state is `seed mod M`, but a zero state is replaced by 1 if
    /// the increment is zero too, as such an engine would otherwise be stuck at zero.
    const fn normalize_seed(seed: u64) -> u64 {
        let state = Self::reduce(seed as u128);
        if Self::reduce(C as u128) == 0 && state == 0 {
            1
        } else {
            state
        }
    }

    /// The smallest value [`next`](Self::next) can return.
    #[inline]
    #[must_use]
    pub const fn min() -> u64 {
        if Self::reduce(C as u128) == 0 {
            1
        } else {
            0
        }
    }

    /// The largest value [`next`](Self::next) can return.
    #[inline]
    #[must_use]
    pub const fn max() -> u64 {
        M.wrapping_sub(1)
    }

    /// Advance the engine and return the new state.
    #[inline]
    #[allow(clippy::should_implement_trait, reason = "also exposed via Iterator")]
    pub fn next(&mut self) -> u64 {
        #[allow(clippy::arithmetic_side_effects, reason = "A * x + C < 2^128")]
        let product = A as u128 * self.state as u128 + C as u128;
        self.state = Self::reduce(product);
        self.state
    }

    /// Skip `n` outputs.
    #[inline]
    pub fn discard(&mut self, n: u64) {
        for _ in 0..n {
            self.next();
        }
    }
}

impl<const A: u64, const C: u64, const M: u64> Default for LinearCongruentialEngine<A, C, M> {
    #[inline]
    fn default() -> Self {
        Self::new(Self::DEFAULT_SEED)
    }
}

impl<const A: u64, const C: u64, const M: u64> Iterator for LinearCongruentialEngine<A, C, M> {
    type Item = u64;

    #[inline]
    fn next(&mut self) -> Option<u64> {
        Some(Self::next(self))
    }

    #[inline]
    fn size_hint(&self) -> (usize, Option<usize>) {
        (usize::MAX, None)
    }
}

impl<const A: u64, const C: u64, const M: u64> SeedSource for LinearCongruentialEngine<A, C, M> {
    #[inline]
    fn next_seed(&mut self) -> u64 {
        Self::next(self)
    }
}
