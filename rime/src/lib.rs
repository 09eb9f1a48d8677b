//! Immutable lookup tables built from a fixed key set.
//!
//! This crate builds [minimal perfect hash][mph] tables: given a set of distinct keys, it finds a
//! hash function that maps every key to a distinct index without collisions. Lookups then take at
//! most two hash evaluations and a single key comparison, never probe, and never allocate.
//!
//! [mph]: https://en.wikipedia.org/wiki/Perfect_hash_function
//!
//!
//! # Usage
//!
//! [`UnorderedSet`] and [`UnorderedMap`] are the containers built on top of the tables. The
//! tables themselves are available as [`PmhTables`] for custom containers.
//!
//! These types can be initialized in several ways:
//!
//! 1. They can be built at runtime by calling `from_*` methods. Construction time is linear in
//!    the number of keys, but with a large constant, so consider
//!    [`HashMap`](std::collections::HashMap) for short-lived tables.
//! 2. They can be built in `build.rs` with `from_*`, translated to code with [`codegen`], and then
//!    `include!`d into a `const` or `static` item. Zero-cost at runtime.
//! 3. With the `serde` feature, they can be serialized and loaded back. Deserialization validates
//!    the tables, so untrusted input can't produce an inconsistent container.
//!
//!
//! # Hashing
//!
//! Construction is deterministic: the same keys, hash function, and [seed source](random) always
//! produce the same tables. The default hash, [`Elsa`](hash::Elsa), is portable, so tables built
//! on one platform work on another.
//!
//! Custom hashes are supported with [`Seeded`](hash::Seeded) for hashes that take a seed, and with
//! [`Unseeded`](hash::Unseeded) for plain hashes, which are combined with a
//! [multiply-shift](multiply_shift) finalizer.
//!
//!
//! # Features
//!
//! - `std` (default): implement `std::error::Error` for [`Error`].
//! - `alloc` (implied by `std`): allow containers to own heap data.
//! - `build` (default): table construction.
//! - `codegen`: the [`codegen`] module.
//! - `serde`: serialization support.

#![no_std]
#![cfg_attr(docsrs, feature(doc_cfg))]
#![deny(unsafe_op_in_unsafe_fn)]

#[cfg(feature = "alloc")]
extern crate alloc;

#[cfg(feature = "std")]
extern crate std;

#[cfg(feature = "build")]
pub(crate) mod bitmap;
#[cfg(feature = "build")]
pub(crate) mod bounded;
#[cfg(feature = "build")]
pub(crate) mod buckets;
pub mod codegen;
mod const_array;
#[cfg(feature = "build")]
pub(crate) mod displace;
mod error;
pub mod hash;
mod map;
pub mod multiply_shift;
pub mod random;
mod set;
mod tables;

pub use error::Error;
pub use map::UnorderedMap;
pub use set::UnorderedSet;
pub use tables::PmhTables;

/// Building blocks of the tables, mostly useful for generated code.
pub mod low_level {
    #[doc(hidden)]
    pub use super::const_array::ConstArray;
    pub use super::tables::{table_size_for, PmhTables, Probe, SeedOrIndex};
}

#[cfg(test)]
mod tests;
