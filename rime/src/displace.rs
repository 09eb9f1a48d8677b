//! Second-level placement.
//!
//! Buckets are placed largest-first, while the second table is still mostly free. A bucket with
//! several items searches for a displacement seed under which all of its items land in distinct
//! free slots; once found, these slots are claimed for good. A bucket with a single item skips
//! the search and stores the item index directly in the first table.

#![cfg(feature = "build")]

use super::{
    bitmap::BitMap,
    bounded::{self, BoundedVec},
    buckets::Buckets,
    hash::SeededHash,
    random::{next_candidate, SeedSource},
    tables::SeedOrIndex,
};
use alloc::{vec, vec::Vec};
use log::trace;

/// The result of placement.
pub(crate) struct Displacement {
    /// One entry per first-level hash value.
    pub first_table: Vec<SeedOrIndex>,

    /// One item index per second-level slot. Unclaimed slots hold 0.
    pub second_table: Vec<usize>,

    /// Total number of rejected displacement candidates.
    pub rejected: u64,
}

/// Place every bucket.
///
/// The first candidate for each multi-item bucket is drawn from `prg`, later ones are derived with
/// [`next_candidate`].
pub(crate) fn displace<T, K: ?Sized>(
    buckets: &Buckets<'_>,
    items: &[T],
    key: impl Fn(&T) -> &K,
    hash: &impl SeededHash<K>,
    prg: &mut impl SeedSource,
) -> Displacement {
    let table_size = buckets.len();
    let mask = table_size - 1;

    let mut first_table = vec![SeedOrIndex::index(0); table_size];
    let mut second_table = vec![0; table_size];
    let mut occupied = BitMap::new_zeros(table_size);

    let largest = buckets.iter().next().map_or(0, |(_, bucket)| bucket.len());
    let mut storage = bounded::storage::<usize>(largest);
    let mut slots = BoundedVec::new(&mut storage);

    let mut rejected: u64 = 0;

    for (first_slot, bucket) in buckets.iter() {
        match *bucket {
            // Buckets are sorted, so the remaining ones are empty too.
            [] => break,
            [item] => first_table[first_slot] = SeedOrIndex::index(item),
            _ => {
                let mut candidate = prg.next_seed();
                let mut attempts: u64 = 1;
                let entry = loop {
                    let entry = SeedOrIndex::seed(candidate);
                    slots.clear();
                    let seed = entry.value();
                    if try_place(bucket, items, &key, hash, seed, mask, &occupied, &mut slots) {
                        break entry;
                    }
                    candidate = next_candidate(candidate);
                    attempts += 1;
                };
                rejected += attempts - 1;

                trace!(
                    "bucket {first_slot} ({} items) placed with seed {:#018x} after {attempts} \
                     attempt(s)",
                    bucket.len(),
                    entry.value(),
                );

                first_table[first_slot] = entry;
                for (&item, &slot) in bucket.iter().zip(slots.iter()) {
                    occupied.set(slot);
                    second_table[slot] = item;
                }
            }
        }
    }

    trace!(
        "claimed {} of {table_size} second-level slots, {rejected} rejected candidate(s)",
        occupied.count_ones(),
    );

    Displacement {
        first_table,
        second_table,
        rejected,
    }
}

/// Compute the second-level slots of `bucket` under `seed`.
///
/// Succeeds if the slots are pairwise distinct and unoccupied. The slots are left in `slots`, in
/// the order of `bucket`.
#[expect(clippy::too_many_arguments, reason = "internal helper")]
fn try_place<T, K: ?Sized>(
    bucket: &[usize],
    items: &[T],
    key: &impl Fn(&T) -> &K,
    hash: &impl SeededHash<K>,
    seed: u64,
    mask: usize,
    occupied: &BitMap,
    slots: &mut BoundedVec<'_, usize>,
) -> bool {
    for &item in bucket {
        #[expect(
            clippy::cast_possible_truncation,
            reason = "we mask out higher bits anyway"
        )]
        let slot = hash.hash(key(&items[item]), seed) as usize & mask;
        if occupied.get(slot) || slots.contains(&slot) {
            return false;
        }
        if slots.try_push(slot).is_err() {
            unreachable!("scratch space is sized for the largest bucket");
        }
    }
    true
}
