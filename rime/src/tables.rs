//! Two-level perfect hash tables.
//!
//! A lookup evaluates at most two hashes. The first one, under a global seed, selects an entry of
//! the first table. That entry either names an item directly, or carries a displacement seed
//! under which a second hash selects a slot of the second table, which in turn names an item.
//!
//! The tables never reject a key: a key outside the training set still resolves to *some* item
//! index, so callers must compare the key against the item stored at that index.

use super::{
    const_array::ConstArray,
    hash::{AdaptHash, SeededHash},
    Error,
};
use core::fmt;

/// A first-table entry: either a displacement seed or an item index.
///
/// Packed into 64 bits, with the top bit set for seeds. Seeds are therefore 63 bits wide, which
/// [`seed`](Self::seed) takes care of.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(transparent))]
#[repr(transparent)]
pub struct SeedOrIndex(u64);

/// Decoded form of [`SeedOrIndex`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[allow(clippy::exhaustive_enums, reason = "an entry is either one or the other")]
pub enum Probe {
    /// Hash the key again under this seed and consult the second table.
    Seed(u64),

    /// The candidate item index.
    Index(usize),
}

impl SeedOrIndex {
    /// The tag bit.
    const SEED_FLAG: u64 = 1 << 63;

    /// An entry holding a displacement seed.
    ///
    /// The top bit of `seed` is discarded.
    #[inline]
    #[must_use]
    pub const fn seed(seed: u64) -> Self {
        Self(seed | Self::SEED_FLAG)
    }

    /// An entry holding an item index.
    ///
    /// # Panics
    ///
    /// Panics if `index` doesn't fit in 63 bits.
    #[inline]
    #[must_use]
    pub const fn index(index: usize) -> Self {
        let index = index as u64;
        assert!(index & Self::SEED_FLAG == 0, "item index out of range");
        Self(index)
    }

    /// Whether the entry holds a seed.
    #[inline]
    #[must_use]
    pub const fn is_seed(self) -> bool {
        self.0 & Self::SEED_FLAG != 0
    }

    /// The stored seed or index, without the tag.
    #[inline]
    #[must_use]
    pub const fn value(self) -> u64 {
        self.0 & !Self::SEED_FLAG
    }

    /// Decode the entry.
    #[inline]
    #[must_use]
    #[expect(
        clippy::cast_possible_truncation,
        reason = "indices are only ever produced from usize"
    )]
    pub const fn probe(self) -> Probe {
        if self.is_seed() {
            Probe::Seed(self.value())
        } else {
            Probe::Index(self.value() as usize)
        }
    }

    /// The packed representation.
    #[inline]
    #[must_use]
    pub const fn to_bits(self) -> u64 {
        self.0
    }

    /// Unpack an entry. Every bit pattern is a valid entry.
    #[inline]
    #[must_use]
    pub const fn from_bits(bits: u64) -> Self {
        Self(bits)
    }
}

impl fmt::Debug for SeedOrIndex {
    #[inline]
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.probe() {
            Probe::Seed(seed) => write!(f, "Seed({seed:#x})"),
            Probe::Index(index) => write!(f, "Index({index})"),
        }
    }
}

#[cfg(feature = "codegen")]
impl super::codegen::ToCode for SeedOrIndex {
    #[inline]
    fn to_code(&self, gen: &mut super::codegen::CodeGenerator) -> proc_macro2::TokenStream {
        let seed_or_index = gen.import("rime::low_level::SeedOrIndex");
        let bits = gen.expr(&self.0);
        quote::quote!(#seed_or_index::from_bits(#bits))
    }
}

/// The table size chosen for `item_count` items.
///
/// The smallest power of two not below `item_count`, doubled for fewer than 32 items: small
/// tables are cheap, and a sparser table makes collisions less likely.
///
/// # Panics
///
/// Panics if the table size doesn't fit in `usize`.
#[inline]
#[must_use]
pub const fn table_size_for(item_count: usize) -> usize {
    let Some(size) = item_count.checked_next_power_of_two() else {
        panic!("too many items");
    };
    if item_count < 32 {
        size * 2
    } else {
        size
    }
}

/// Check that a table of `table_size` slots can index `item_count` items.
const fn check_table_size(table_size: usize, item_count: usize) -> Result<(), Error> {
    if !table_size.is_power_of_two() {
        return Err(Error::TableSizeNotPowerOfTwo(table_size));
    }
    if table_size < 2 || table_size < item_count {
        return Err(Error::TableTooSmall {
            table_size,
            item_count,
        });
    }
    Ok(())
}

/// Minimal perfect hash tables.
///
/// Maps each key of the set the tables were built from to a distinct item index, in O(1) and
/// without allocation. See the [module-level documentation](self) for the lookup procedure.
///
/// Immutable after construction, and thus safe to share between threads if `H` is.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
#[cfg_attr(all(feature = "alloc", feature = "serde"), derive(serde::Deserialize))]
#[cfg_attr(
    all(feature = "alloc", feature = "serde"),
    serde(try_from = "serde_support::RawTables<H>")
)]
pub struct PmhTables<H> {
    /// Seed of the first-level hash.
    first_seed: u64,

    /// Seed or index per first-level hash value.
    first_table: ConstArray<SeedOrIndex>,

    /// Item index per second-level hash value.
    second_table: ConstArray<usize>,

    /// The hash function, already adapted to take seeds.
    hash: H,
}

#[cfg(feature = "build")]
impl<H> PmhTables<H> {
    /// Build tables for `items`, choosing the table size with [`table_size_for`].
    ///
    /// `key` extracts the key from an item and `prg` supplies trial seeds. `hasher` is adapted to
    /// the table size, and the adapted hash is stored in the tables for lookups. The result only
    /// depends on these inputs.
    ///
    /// # Errors
    ///
    /// Returns [`Error::DuplicateKey`] if two items have equal keys.
    ///
    /// # Panics
    ///
    /// May never return if `hash` maps two distinct keys to the same value under every seed.
    #[inline]
    pub fn build<T, K: ?Sized + Eq>(
        items: &[T],
        key: impl Fn(&T) -> &K,
        hasher: impl AdaptHash<K, Adapted = H>,
        prg: &mut impl super::random::SeedSource,
    ) -> Result<Self, Error>
    where
        H: SeededHash<K>,
    {
        Self::build_with_size(items, key, hasher, prg, table_size_for(items.len()))
    }

    /// Build tables of a given size for `items`.
    ///
    /// See [`build`](Self::build).
    ///
    /// # Errors
    ///
    /// Returns an error if `table_size` is not a power of two, is less than 2 or less than the
    /// number of items, or if two items have equal keys.
    #[inline]
    pub fn build_with_size<T, K: ?Sized + Eq>(
        items: &[T],
        key: impl Fn(&T) -> &K,
        hasher: impl AdaptHash<K, Adapted = H>,
        prg: &mut impl super::random::SeedSource,
        table_size: usize,
    ) -> Result<Self, Error>
    where
        H: SeededHash<K>,
    {
        use super::{bounded::Arena, buckets::Buckets, displace::displace};
        use alloc::vec;

        check_table_size(table_size, items.len())?;
        // Narrower outputs would leave part of the second table unreachable.
        let hash = hasher.adapt(table_size.ilog2());

        if items.is_empty() {
            return Ok(Self {
                first_seed: 0,
                first_table: vec![SeedOrIndex::index(0); table_size].into(),
                second_table: vec![0; table_size].into(),
                hash,
            });
        }

        let mut arena = Arena::new(items.len());
        let buckets = Buckets::build(&mut arena, table_size, items, &key, &hash, prg)?;
        let placement = displace(&buckets, items, &key, &hash, prg);

        log::debug!(
            "built tables for {} items: table size {table_size}, first seed {:#018x}, {} \
             rejected displacement(s)",
            items.len(),
            buckets.seed,
            placement.rejected,
        );

        Ok(Self {
            first_seed: buckets.seed,
            first_table: placement.first_table.into(),
            second_table: placement.second_table.into(),
            hash,
        })
    }
}

impl<H> PmhTables<H> {
    /// Assemble tables without validation.
    ///
    /// Meant for codegen. Malformed tables don't cause undefined behavior, but lookups may
    /// return out-of-range indices or panic. Use [`try_from_parts`](Self::try_from_parts) for
    /// untrusted data.
    #[doc(hidden)]
    #[inline]
    #[must_use]
    pub const fn from_raw_parts(
        first_seed: u64,
        first_table: ConstArray<SeedOrIndex>,
        second_table: ConstArray<usize>,
        hash: H,
    ) -> Self {
        Self {
            first_seed,
            first_table,
            second_table,
            hash,
        }
    }

    /// Assemble tables for `item_count` items, checking that they are well-formed.
    ///
    /// This checks the shape of the tables and that every index is in range. It does not check
    /// that the tables are a perfect hash for any particular key set.
    ///
    /// # Errors
    ///
    /// Returns an error describing the first violated condition.
    #[inline]
    pub fn try_from_parts(
        first_seed: u64,
        first_table: ConstArray<SeedOrIndex>,
        second_table: ConstArray<usize>,
        hash: H,
        item_count: usize,
    ) -> Result<Self, Error> {
        let tables = Self::from_raw_parts(first_seed, first_table, second_table, hash);
        tables.validate(item_count)?;
        Ok(tables)
    }

    /// Check that the tables are well-formed for `item_count` items.
    ///
    /// Index 0 is accepted for empty item sets, as it's the filler of unused entries.
    ///
    /// # Errors
    ///
    /// Returns an error describing the first violated condition.
    #[inline]
    pub fn validate(&self, item_count: usize) -> Result<(), Error> {
        self.validate_shape()?;
        if self.table_size() < item_count {
            return Err(Error::TableTooSmall {
                table_size: self.table_size(),
                item_count,
            });
        }

        let limit = item_count.max(1);
        let first = self.first_table.iter().filter_map(|entry| match entry.probe() {
            Probe::Index(index) => Some(index),
            Probe::Seed(_) => None,
        });
        let second = self.second_table.iter().copied();
        match first.chain(second).find(|&index| index >= limit) {
            Some(index) => Err(Error::IndexOutOfRange { index, item_count }),
            None => Ok(()),
        }
    }

    /// Check the table lengths.
    fn validate_shape(&self) -> Result<(), Error> {
        let table_size = self.first_table.len();
        check_table_size(table_size, 0)?;
        if self.second_table.len() != table_size {
            return Err(Error::TableLengthMismatch { table_size });
        }
        Ok(())
    }

    /// Resolve `key` to a candidate item index.
    ///
    /// For keys from the training set, this is the index of the item with that key. For other
    /// keys, this is an arbitrary index, possibly out of range if the tables were built for an
    /// empty set.
    #[inline]
    pub fn lookup<K: ?Sized>(&self, key: &K) -> usize
    where
        H: SeededHash<K>,
    {
        self.lookup_with(key, &self.hash)
    }

    /// Resolve `key` with an explicitly given hash function.
    ///
    /// `hash` must produce the same values as the hash the tables were built with. This is useful
    /// when the stored hash only knows about the owned key type.
    #[inline]
    #[expect(
        clippy::cast_possible_truncation,
        reason = "we mask out higher bits anyway"
    )]
    pub fn lookup_with<K: ?Sized>(&self, key: &K, hash: &impl SeededHash<K>) -> usize {
        let mask = self.table_size().wrapping_sub(1);
        let first_slot = hash.hash(key, self.first_seed) as usize & mask;
        match self.first_table[first_slot].probe() {
            Probe::Index(index) => index,
            Probe::Seed(seed) => self.second_table[hash.hash(key, seed) as usize & mask],
        }
    }

    /// The number of slots in each table.
    #[inline]
    #[must_use]
    pub fn table_size(&self) -> usize {
        self.first_table.len()
    }

    /// Seed of the first-level hash.
    #[inline]
    #[must_use]
    pub const fn first_seed(&self) -> u64 {
        self.first_seed
    }

    /// The first table, indexed by first-level hash.
    #[inline]
    #[must_use]
    pub fn first_table(&self) -> &[SeedOrIndex] {
        &self.first_table
    }

    /// The second table, indexed by second-level hash.
    #[inline]
    #[must_use]
    pub fn second_table(&self) -> &[usize] {
        &self.second_table
    }

    /// The hash function.
    #[inline]
    #[must_use]
    pub const fn hash_function(&self) -> &H {
        &self.hash
    }
}

#[cfg(feature = "codegen")]
impl<H: super::codegen::ToCode> super::codegen::ToCode for PmhTables<H> {
    #[inline]
    fn to_code(&self, gen: &mut super::codegen::CodeGenerator) -> proc_macro2::TokenStream {
        let pmh_tables = gen.import("rime::low_level::PmhTables");
        let first_seed = gen.expr(&self.first_seed);
        let first_table = gen.expr(&self.first_table);
        let second_table = gen.expr(&self.second_table);
        let hash = gen.expr(&self.hash);
        quote::quote!(#pmh_tables::from_raw_parts(#first_seed, #first_table, #second_table, #hash))
    }
}

/// Scope for `serde`-related code.
#[cfg(all(feature = "alloc", feature = "serde"))]
mod serde_support {
    use super::{ConstArray, Error, PmhTables, SeedOrIndex};

    /// Unvalidated tables.
    ///
    /// Deserialization goes through this type so that the shape of the tables can be checked
    /// with [`TryFrom`]. Index ranges are checked by the containers, which know the item count.
    #[derive(serde::Deserialize)]
    #[serde(rename = "PmhTables")]
    pub(super) struct RawTables<H> {
        /// See [`PmhTables`].
        first_seed: u64,
        /// See [`PmhTables`].
        first_table: ConstArray<SeedOrIndex>,
        /// See [`PmhTables`].
        second_table: ConstArray<usize>,
        /// See [`PmhTables`].
        hash: H,
    }

    impl<H> TryFrom<RawTables<H>> for PmhTables<H> {
        type Error = Error;

        #[inline]
        fn try_from(raw: RawTables<H>) -> Result<Self, Error> {
            let tables =
                Self::from_raw_parts(raw.first_seed, raw.first_table, raw.second_table, raw.hash);
            tables.validate_shape()?;
            Ok(tables)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hash::Elsa;

    #[test]
    fn seed_or_index_tagging() {
        let seed = SeedOrIndex::seed(0x1234);
        assert!(seed.is_seed());
        assert_eq!(seed.value(), 0x1234);
        assert_eq!(seed.probe(), Probe::Seed(0x1234));

        let index = SeedOrIndex::index(17);
        assert!(!index.is_seed());
        assert_eq!(index.probe(), Probe::Index(17));

        // The tag bit is not part of the seed.
        assert_eq!(SeedOrIndex::seed(u64::MAX).value(), u64::MAX >> 1);
        assert_eq!(SeedOrIndex::from_bits(seed.to_bits()), seed);
        assert_ne!(SeedOrIndex::seed(3), SeedOrIndex::index(3));
    }

    #[test]
    fn table_sizes() {
        assert_eq!(table_size_for(0), 2);
        assert_eq!(table_size_for(1), 2);
        assert_eq!(table_size_for(3), 8);
        assert_eq!(table_size_for(16), 32);
        assert_eq!(table_size_for(31), 64);
        assert_eq!(table_size_for(32), 32);
        assert_eq!(table_size_for(33), 64);
        assert_eq!(table_size_for(1000), 1024);
    }

    #[test]
    fn raw_parts_validation() {
        const FIRST: [SeedOrIndex; 2] = [SeedOrIndex::index(1), SeedOrIndex::seed(5)];
        const ODD: [SeedOrIndex; 3] = [SeedOrIndex::index(0); 3];
        let first = || ConstArray::from_static(&FIRST);
        let second = |data: &'static [usize]| ConstArray::from_static(data);

        let tables = PmhTables::try_from_parts(0, first(), second(&[0, 1]), Elsa, 2).unwrap();
        assert_eq!(tables.table_size(), 2);
        assert_eq!(tables.first_seed(), 0);

        assert_eq!(
            PmhTables::try_from_parts(0, first(), second(&[0, 2]), Elsa, 2),
            Err(Error::IndexOutOfRange {
                index: 2,
                item_count: 2
            }),
        );
        assert_eq!(
            PmhTables::try_from_parts(0, first(), second(&[0, 0]), Elsa, 1),
            Err(Error::IndexOutOfRange {
                index: 1,
                item_count: 1
            }),
        );
        assert_eq!(
            PmhTables::try_from_parts(0, first(), second(&[0]), Elsa, 1),
            Err(Error::TableLengthMismatch { table_size: 2 }),
        );
        assert_eq!(
            PmhTables::try_from_parts(0, first(), second(&[0, 0]), Elsa, 3),
            Err(Error::TableTooSmall {
                table_size: 2,
                item_count: 3
            }),
        );
        assert_eq!(
            PmhTables::try_from_parts(0, ConstArray::from_static(&ODD), second(&[0; 3]), Elsa, 1),
            Err(Error::TableSizeNotPowerOfTwo(3)),
        );
    }

    #[test]
    fn hand_made_lookup() {
        // First-level hash of every key is `key`, second-level is `key + seed`.
        let hash = crate::hash::Seeded(|key: &u64, seed: u64| key.wrapping_add(seed));
        const FIRST: [SeedOrIndex; 4] = [
            SeedOrIndex::index(2),
            SeedOrIndex::seed(2),
            SeedOrIndex::index(0),
            SeedOrIndex::index(0),
        ];
        let tables = PmhTables::from_raw_parts(
            0,
            ConstArray::from_static(&FIRST),
            ConstArray::from_static(&[0, 0, 0, 1]),
            hash,
        );
        assert_eq!(tables.lookup(&0), 2);
        assert_eq!(tables.lookup(&1), 1);
        assert_eq!(tables.lookup(&5), 1);
        assert_eq!(tables.lookup(&2), 0);
    }

    #[cfg(feature = "build")]
    #[test]
    fn size_preconditions() {
        use crate::random::Lcg;
        let items = [1u64, 2, 3];
        let build = |size| PmhTables::build_with_size(&items, |x| x, Elsa, &mut Lcg::default(), size);
        assert_eq!(build(6).err(), Some(Error::TableSizeNotPowerOfTwo(6)));
        assert_eq!(
            build(2).err(),
            Some(Error::TableTooSmall {
                table_size: 2,
                item_count: 3
            }),
        );
        assert_eq!(build(4).map(|tables| tables.table_size()), Ok(4));
    }

    #[cfg(feature = "build")]
    #[test]
    fn narrow_finalizer_is_widened() {
        use crate::{multiply_shift::MultiplyShift, random::Lcg};
        let items: alloc::vec::Vec<u64> = (0..40).collect();
        let narrow = MultiplyShift::new(|key: &u64| *key, 3);
        let tables =
            PmhTables::build_with_size(&items, |x| x, narrow, &mut Lcg::default(), 64).unwrap();
        assert_eq!(tables.hash_function().num_bits(), 6);
        for (index, item) in items.iter().enumerate() {
            assert_eq!(tables.lookup(item), index);
        }
    }

    #[cfg(feature = "build")]
    #[test]
    fn empty_build() {
        let tables =
            PmhTables::build(&[] as &[u64], |x| x, Elsa, &mut crate::random::Lcg::default())
                .unwrap();
        assert_eq!(tables.table_size(), 2);
        assert_eq!(tables.lookup(&42u64), 0);
        assert_eq!(tables.validate(0), Ok(()));
    }
}
