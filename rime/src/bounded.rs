//! Bounded containers for the build phase.
//!
//! Construction never grows a container: every vector gets a hard capacity up front, and all
//! vectors of one kind are carved out of a single allocation.

#![cfg(feature = "build")]

use alloc::{vec, vec::Vec};
use core::mem::MaybeUninit;
use fixed_slice_vec::FixedSliceVec;

/// A vector with a fixed capacity, backed by borrowed storage.
pub(crate) type BoundedVec<'storage, T> = FixedSliceVec<'storage, T>;

/// Allocate uninitialized storage for a [`BoundedVec`] of capacity `len`.
pub(crate) fn storage<T: Copy>(len: usize) -> Vec<MaybeUninit<T>> {
    vec![MaybeUninit::uninit(); len]
}

/// Storage for several bounded vectors of varying capacity.
pub(crate) struct Arena<T> {
    /// One allocation, partitioned on demand.
    storage: Vec<MaybeUninit<T>>,
}

impl<T: Copy> Arena<T> {
    /// Reserve space for `len` elements in total.
    pub fn new(len: usize) -> Self {
        Self {
            storage: storage(len),
        }
    }

    /// Total number of elements the arena can hold.
    pub fn len(&self) -> usize {
        self.storage.len()
    }

    /// Split the arena into empty bounded vectors with the given capacities.
    ///
    /// # Panics
    ///
    /// Panics if the capacities add up to more than [`len`](Self::len).
    pub fn partition(
        &mut self,
        capacities: impl IntoIterator<Item = usize>,
    ) -> Vec<BoundedVec<'_, T>> {
        let mut rest = &mut self.storage[..];
        capacities
            .into_iter()
            .map(|capacity| {
                assert!(capacity <= rest.len(), "arena is too small for the requested capacities");
                let (chunk, tail) = core::mem::take(&mut rest).split_at_mut(capacity);
                rest = tail;
                BoundedVec::new(chunk)
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn vectors_are_bounded() {
        let mut arena = Arena::<usize>::new(5);
        assert_eq!(arena.len(), 5);
        let mut vectors = arena.partition([1, 0, 3]);
        assert_eq!(vectors.len(), 3);
        assert_eq!(vectors[2].capacity(), 3);

        assert!(vectors[2].try_push(10).is_ok());
        assert!(vectors[2].try_push(11).is_ok());
        assert!(vectors[2].try_push(12).is_ok());
        assert_eq!(vectors[2].try_push(13).map_err(|err| err.0), Err(13));
        assert_eq!(&vectors[2][..], &[10, 11, 12]);
        assert_eq!(vectors[1].try_push(20).map_err(|err| err.0), Err(20));
        assert!(vectors[0].is_empty());

        vectors[2].clear();
        assert!(vectors[2].is_empty());
    }

    #[test]
    #[should_panic(expected = "arena is too small")]
    fn overcommit() {
        let mut arena = Arena::<usize>::new(2);
        let _vectors = arena.partition([1, 2]);
    }
}
