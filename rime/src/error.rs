//! Construction and validation errors.

use displaydoc::Display;
use thiserror::Error;

/// A violated precondition of table construction or validation.
///
/// Lookups never fail: this type only describes inputs that would produce a malformed table.
#[derive(Clone, Copy, Debug, Display, Error, PartialEq, Eq)]
#[non_exhaustive]
pub enum Error {
    /// the key sequence declared {declared} items but yielded {actual}
    LengthMismatch {
        /// The length reported by the iterator.
        declared: usize,
        /// The number of items actually produced.
        actual: usize,
    },

    /// the key sequence contains a duplicate key
    DuplicateKey,

    /// table size {0} is not a power of two
    TableSizeNotPowerOfTwo(usize),

    /// table size {table_size} cannot hold {item_count} items
    TableTooSmall {
        /// The requested table size.
        table_size: usize,
        /// The number of items to hold.
        item_count: usize,
    },

    /// first and second tables must both have length {table_size}
    TableLengthMismatch {
        /// The expected length of both tables.
        table_size: usize,
    },

    /// table entry {index} is out of range for {item_count} items
    IndexOutOfRange {
        /// The offending item index.
        index: usize,
        /// The number of items.
        item_count: usize,
    },

    /// item {index} does not resolve to itself
    MisplacedItem {
        /// Position of the item.
        index: usize,
    },
}
