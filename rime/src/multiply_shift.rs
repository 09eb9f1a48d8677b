//! Multiply-shift finalizer.

use super::hash::{AdaptHash, PlainHash, SeededHash};

/// A seeded hash derived from a plain one.
///
/// Computes `(hash(key) * seed) >> (64 - num_bits)`, i.e. takes the top `num_bits` bits of the
/// 64-bit product. For a table of `2^num_bits` slots this lands directly in range without a
/// modulo, and the top bits of a product are the well-mixed ones.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct MultiplyShift<H> {
    /// The plain hash.
    hash: H,

    /// Width of the output.
    num_bits: u32,
}

impl<H> MultiplyShift<H> {
    /// Wrap `hash`, producing `num_bits`-bit outputs.
    ///
    /// # Panics
    ///
    /// Panics if `num_bits > 64`.
    #[inline]
    #[must_use]
    pub const fn new(hash: H, num_bits: u32) -> Self {
        assert!(num_bits <= 64, "multiply-shift output is at most 64 bits wide");
        Self { hash, num_bits }
    }

    /// Width of the output.
    #[inline]
    #[must_use]
    pub const fn num_bits(&self) -> u32 {
        self.num_bits
    }

    /// The wrapped plain hash.
    #[inline]
    #[must_use]
    pub const fn inner(&self) -> &H {
        &self.hash
    }

    /// Project a base hash to `num_bits` bits using `seed` as the multiplier.
    #[inline]
    #[must_use]
    pub const fn finalize(&self, base: u64, seed: u64) -> u64 {
        // A zero-bit output would need a shift by 64, which overflows.
        match base.wrapping_mul(seed).checked_shr(64 - self.num_bits) {
            Some(x) if self.num_bits > 0 => x,
            _ => 0,
        }
    }
}

impl<T: ?Sized, H: PlainHash<T>> SeededHash<T> for MultiplyShift<H> {
    #[inline]
    fn hash(&self, key: &T, seed: u64) -> u64 {
        self.finalize(PlainHash::hash(&self.hash, key), seed)
    }
}

/// Re-targets the finalizer to the table size, whatever width it was created with.
impl<T: ?Sized, H: PlainHash<T>> AdaptHash<T> for MultiplyShift<H> {
    type Adapted = Self;

    #[inline]
    fn adapt(self, num_bits: u32) -> Self {
        Self::new(self.hash, num_bits)
    }
}

#[cfg(feature = "codegen")]
impl<H: super::codegen::ToCode> super::codegen::ToCode for MultiplyShift<H> {
    #[inline]
    fn to_code(&self, gen: &mut super::codegen::CodeGenerator) -> proc_macro2::TokenStream {
        let multiply_shift = gen.import("rime::multiply_shift::MultiplyShift");
        let hash = gen.expr(&self.hash);
        let num_bits = gen.expr(&self.num_bits);
        quote::quote!(#multiply_shift::new(#hash, #num_bits))
    }
}
