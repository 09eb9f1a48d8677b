//! First-level bucketing.
//!
//! Items are split into `table_size` buckets by `hash(key, seed) mod table_size`. Each bucket is
//! capped at [`bucket_max`] items so that the displacement search stays tractable: a seed that
//! overflows any bucket is rejected as a whole and a fresh one is drawn.

#![cfg(feature = "build")]

use super::{
    bounded::{Arena, BoundedVec},
    hash::SeededHash,
    random::SeedSource,
    Error,
};
use alloc::{vec, vec::Vec};
use log::trace;

/// The largest bucket accepted for a table of `table_size` slots, `2 * sqrt(table_size)` rounded
/// down to a power of two.
///
/// # Panics
///
/// Panics if `table_size` is zero.
#[must_use]
pub(crate) const fn bucket_max(table_size: usize) -> usize {
    2 << (table_size.ilog2() / 2)
}

/// Items grouped by first-level hash.
pub(crate) struct Buckets<'arena> {
    /// The accepted first-level seed.
    pub seed: u64,

    /// Item indices, one bucket per first-table slot.
    pub buckets: Vec<BoundedVec<'arena, usize>>,

    /// Bucket positions ordered by descending size. Buckets of equal size keep their relative
    /// order.
    pub order: Vec<usize>,
}

impl<'arena> Buckets<'arena> {
    /// Distribute `items` over `table_size` buckets, drawing seeds from `prg` until none
    /// overflows.
    ///
    /// `arena` must hold at least `items.len()` elements, and `table_size` must be a power of
    /// two.
    ///
    /// # Errors
    ///
    /// Returns [`Error::DuplicateKey`] if two items have equal keys.
    ///
    /// # Panics
    ///
    /// Panics if `items` is empty.
    pub fn build<T, K: ?Sized + Eq>(
        arena: &'arena mut Arena<usize>,
        table_size: usize,
        items: &[T],
        key: impl Fn(&T) -> &K,
        hash: &impl SeededHash<K>,
        prg: &mut impl SeedSource,
    ) -> Result<Self, Error> {
        assert!(!items.is_empty(), "cannot bucket an empty key set");
        debug_assert!(table_size.is_power_of_two());
        debug_assert!(arena.len() >= items.len());

        let capacity = bucket_max(table_size);
        let mask = table_size - 1;

        // First-level hash of each item under the current seed.
        let mut positions = vec![0; items.len()];
        let mut counts = vec![0usize; table_size];

        let mut attempts: u64 = 0;
        let seed = 'seed: loop {
            attempts += 1;
            let seed = prg.next_seed();
            counts.fill(0);

            for (index, item) in items.iter().enumerate() {
                #[expect(
                    clippy::cast_possible_truncation,
                    reason = "we mask out higher bits anyway"
                )]
                let bucket = hash.hash(key(item), seed) as usize & mask;
                positions[index] = bucket;
                counts[bucket] += 1;
                if counts[bucket] > capacity {
                    // Equal keys land in one bucket under every seed. Catch them here, or a
                    // heavily duplicated key would make every seed overflow.
                    if positions[..index]
                        .iter()
                        .zip(items)
                        .any(|(&other, other_item)| other == bucket && key(other_item) == key(item))
                    {
                        return Err(Error::DuplicateKey);
                    }
                    trace!(
                        "seed {seed:#018x} overflows bucket {bucket} (capacity {capacity}), \
                         attempt {attempts}",
                    );
                    continue 'seed;
                }
            }

            break seed;
        };

        let mut buckets = arena.partition(counts.iter().copied());
        for (index, &bucket) in positions.iter().enumerate() {
            if buckets[bucket].try_push(index).is_err() {
                unreachable!("bucket capacities are exact counts");
            }
        }

        for bucket in &buckets {
            for (i, &first) in bucket.iter().enumerate() {
                if bucket[i + 1..]
                    .iter()
                    .any(|&second| key(&items[first]) == key(&items[second]))
                {
                    return Err(Error::DuplicateKey);
                }
            }
        }

        let mut order: Vec<usize> = (0..table_size).collect();
        radsort::sort_by_key(&mut order, |&index| usize::MAX - counts[index]);

        trace!(
            "bucketed {} items into {table_size} buckets with seed {seed:#018x} after {attempts} \
             attempt(s), largest bucket has {} items",
            items.len(),
            order.first().map_or(0, |&index| counts[index]),
        );

        Ok(Self {
            seed,
            buckets,
            order,
        })
    }

    /// Buckets in processing order, with their first-table slots.
    pub fn iter(&self) -> impl Iterator<Item = (usize, &[usize])> + '_ {
        self.order
            .iter()
            .map(|&index| (index, &self.buckets[index][..]))
    }

    /// Number of buckets, i.e. the table size.
    pub fn len(&self) -> usize {
        self.buckets.len()
    }
}
