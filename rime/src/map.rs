//! Perfect hash maps.

use super::{
    const_array::ConstArray,
    hash::{Elsa, SeededHash},
    tables::PmhTables,
    Error,
};
use core::{borrow::Borrow, fmt, ops::Index};

/// An immutable map backed by minimal perfect hash tables.
///
/// The key set is fixed at construction, but values can be modified in place through `&mut`
/// methods. Entries are stored in the order they were given.
///
/// Maps generated with [`codegen`](crate::codegen) in immutable mode keep their entries in static
/// memory; calling a `&mut` method on such a map panics.
#[derive(Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
#[cfg_attr(all(feature = "alloc", feature = "serde"), derive(serde::Deserialize))]
#[cfg_attr(
    all(feature = "alloc", feature = "serde"),
    serde(
        bound(
            deserialize = "K: serde::Deserialize<'de> + Eq, V: serde::Deserialize<'de>, H: serde::Deserialize<'de> + SeededHash<K>"
        ),
        try_from = "serde_support::RawMap<K, V, H>"
    )
)]
pub struct UnorderedMap<K, V, H = Elsa> {
    /// Maps keys to their positions in [`entries`](Self::entries).
    tables: PmhTables<H>,

    /// The entries, in construction order.
    entries: ConstArray<(K, V)>,
}

#[cfg(feature = "build")]
impl<K: Eq + super::hash::PortableHash, V> UnorderedMap<K, V> {
    /// Build a map with the default hash.
    ///
    /// # Errors
    ///
    /// Fails if `entries` contains duplicate keys or yields a different number of entries than
    /// it declares.
    #[inline]
    pub fn try_from_entries(
        entries: impl IntoIterator<Item = (K, V), IntoIter: ExactSizeIterator>,
    ) -> Result<Self, Error> {
        Self::try_from_entries_with(entries, Elsa, &mut super::random::Lcg::default(), None)
    }

    /// Build a map with the default hash.
    ///
    /// # Panics
    ///
    /// Panics if `entries` contains duplicate keys or yields a different number of entries than
    /// it declares.
    #[inline]
    #[must_use]
    pub fn from_entries(
        entries: impl IntoIterator<Item = (K, V), IntoIter: ExactSizeIterator>,
    ) -> Self {
        Self::try_from_entries(entries).unwrap_or_else(|error| panic!("{error}"))
    }
}

#[cfg(feature = "build")]
impl<K: Eq, V, H: SeededHash<K>> UnorderedMap<K, V, H> {
    /// Build a map with a custom hash.
    ///
    /// # Panics
    ///
    /// Panics if `entries` contains duplicate keys or yields a different number of entries than
    /// it declares.
    #[inline]
    #[must_use]
    pub fn from_entries_with_hasher(
        entries: impl IntoIterator<Item = (K, V), IntoIter: ExactSizeIterator>,
        hasher: impl super::hash::AdaptHash<K, Adapted = H>,
    ) -> Self {
        Self::try_from_entries_with(entries, hasher, &mut super::random::Lcg::default(), None)
            .unwrap_or_else(|error| panic!("{error}"))
    }

    /// Build a map, controlling every construction parameter.
    ///
    /// See [`UnorderedSet::try_from_elements_with`](crate::UnorderedSet::try_from_elements_with).
    ///
    /// # Errors
    ///
    /// Fails if `entries` contains duplicate keys, yields a different number of entries than it
    /// declares, or if `table_size` is unsuitable.
    #[inline]
    pub fn try_from_entries_with(
        entries: impl IntoIterator<Item = (K, V), IntoIter: ExactSizeIterator>,
        hasher: impl super::hash::AdaptHash<K, Adapted = H>,
        prg: &mut impl super::random::SeedSource,
        table_size: Option<usize>,
    ) -> Result<Self, Error> {
        let entries = super::set::collect_exact(entries)?;
        let table_size =
            table_size.unwrap_or_else(|| super::tables::table_size_for(entries.len()));
        let tables =
            PmhTables::build_with_size(&entries, |(key, _)| key, hasher, prg, table_size)?;
        Ok(Self {
            tables,
            entries: entries.into(),
        })
    }
}

impl<K, V, H> UnorderedMap<K, V, H> {
    /// Assemble a map without validation.
    ///
    /// Meant for codegen, not for public use.
    #[doc(hidden)]
    #[inline]
    #[must_use]
    pub const fn from_raw_parts(tables: PmhTables<H>, entries: ConstArray<(K, V)>) -> Self {
        Self { tables, entries }
    }

    /// Assemble a map from tables and entries, checking that every key is found.
    ///
    /// # Errors
    ///
    /// Fails if the tables are malformed or if some key doesn't resolve to its own position.
    #[inline]
    pub fn try_from_parts(tables: PmhTables<H>, entries: ConstArray<(K, V)>) -> Result<Self, Error>
    where
        K: Eq,
        H: SeededHash<K>,
    {
        tables.validate(entries.len())?;
        for (index, (key, _)) in entries.iter().enumerate() {
            if tables.lookup(key) != index {
                return Err(Error::MisplacedItem { index });
            }
        }
        Ok(Self { tables, entries })
    }

    /// Find the position of `key` in construction order.
    #[inline]
    pub fn find<Q>(&self, key: &Q) -> Option<usize>
    where
        K: Borrow<Q>,
        Q: ?Sized + Eq,
        H: SeededHash<Q>,
    {
        self.find_with(key, self.tables.hash_function(), |k, key| k.borrow() == key)
    }

    /// Find the position of `key` with a custom hash and key equality.
    ///
    /// `hash` must produce the same values as the hash the map was built with, and keys `eq`
    /// considers equal to `key` must hash like `key`.
    #[inline]
    pub fn find_with<Q: ?Sized>(
        &self,
        key: &Q,
        hash: &impl SeededHash<Q>,
        eq: impl Fn(&K, &Q) -> bool,
    ) -> Option<usize> {
        if self.entries.is_empty() {
            return None;
        }
        let index = self.tables.lookup_with(key, hash);
        self.entries
            .get(index)
            .filter(|(k, _)| eq(k, key))
            .map(|_| index)
    }

    /// Get a value with a custom hash and key equality.
    ///
    /// See [`find_with`](Self::find_with).
    #[inline]
    pub fn get_with<Q: ?Sized>(
        &self,
        key: &Q,
        hash: &impl SeededHash<Q>,
        eq: impl Fn(&K, &Q) -> bool,
    ) -> Option<&V> {
        let index = self.find_with(key, hash, eq)?;
        Some(&self.entries[index].1)
    }

    /// Get a key-value pair by key.
    #[inline]
    pub fn get_key_value<Q>(&self, key: &Q) -> Option<(&K, &V)>
    where
        K: Borrow<Q>,
        Q: ?Sized + Eq,
        H: SeededHash<Q>,
    {
        let (k, v) = &self.entries[self.find(key)?];
        Some((k, v))
    }

    /// Get a key-value pair by key, with a mutable reference to the value.
    ///
    /// # Panics
    ///
    /// Panics if the key is present and the entries are in static memory.
    #[inline]
    pub fn get_key_value_mut<Q>(&mut self, key: &Q) -> Option<(&K, &mut V)>
    where
        K: Borrow<Q>,
        Q: ?Sized + Eq,
        H: SeededHash<Q>,
    {
        let index = self.find(key)?;
        let (k, v) = &mut self.entries[index];
        Some((&*k, v))
    }

    /// Get a value by key.
    #[inline]
    pub fn get<Q>(&self, key: &Q) -> Option<&V>
    where
        K: Borrow<Q>,
        Q: ?Sized + Eq,
        H: SeededHash<Q>,
    {
        self.get_key_value(key).map(|(_, v)| v)
    }

    /// Get a mutable reference to the value by key.
    ///
    /// # Panics
    ///
    /// Panics if the key is present and the entries are in static memory.
    #[inline]
    pub fn get_mut<Q>(&mut self, key: &Q) -> Option<&mut V>
    where
        K: Borrow<Q>,
        Q: ?Sized + Eq,
        H: SeededHash<Q>,
    {
        self.get_key_value_mut(key).map(|(_, v)| v)
    }

    /// Check if the map contains a key.
    #[inline]
    pub fn contains_key<Q>(&self, key: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: ?Sized + Eq,
        H: SeededHash<Q>,
    {
        self.find(key).is_some()
    }

    /// The number of entries with key `key`, i.e. 0 or 1.
    #[inline]
    pub fn count<Q>(&self, key: &Q) -> usize
    where
        K: Borrow<Q>,
        Q: ?Sized + Eq,
        H: SeededHash<Q>,
    {
        usize::from(self.contains_key(key))
    }

    /// Get number of entries.
    #[inline]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check if the map is empty.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterate through entries in construction order.
    #[inline]
    pub fn iter(&self) -> impl Iterator<Item = (&K, &V)> {
        self.entries.iter().map(|(k, v)| (k, v))
    }

    /// Iterate through entries mutably, in construction order.
    ///
    /// # Panics
    ///
    /// Panics if the entries are in static memory.
    #[inline]
    pub fn iter_mut(&mut self) -> impl Iterator<Item = (&K, &mut V)> {
        self.entries.iter_mut().map(|(k, v)| (&*k, v))
    }

    /// Iterate through keys in construction order.
    #[inline]
    pub fn keys(&self) -> impl Iterator<Item = &K> {
        self.iter().map(|(k, _)| k)
    }

    /// Iterate through values in construction order.
    #[inline]
    pub fn values(&self) -> impl Iterator<Item = &V> {
        self.iter().map(|(_, v)| v)
    }

    /// Iterate through values mutably, in construction order.
    ///
    /// # Panics
    ///
    /// Panics if the entries are in static memory.
    #[inline]
    pub fn values_mut(&mut self) -> impl Iterator<Item = &mut V> {
        self.iter_mut().map(|(_, v)| v)
    }

    /// The number of slots in the hash tables.
    #[inline]
    pub fn bucket_count(&self) -> usize {
        self.tables.table_size()
    }

    /// The hash function.
    #[inline]
    pub const fn hash_function(&self) -> &H {
        self.tables.hash_function()
    }

    /// The underlying hash tables.
    #[inline]
    pub const fn tables(&self) -> &PmhTables<H> {
        &self.tables
    }
}

impl<K, V, H, Q> Index<&Q> for UnorderedMap<K, V, H>
where
    K: Borrow<Q>,
    Q: ?Sized + Eq,
    H: SeededHash<Q>,
{
    type Output = V;

    /// # Panics
    ///
    /// Panics if the key is not present.
    #[inline]
    fn index(&self, key: &Q) -> &V {
        self.get(key).expect("key not found")
    }
}

impl<K: fmt::Debug, V: fmt::Debug, H> fmt::Debug for UnorderedMap<K, V, H> {
    #[inline]
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.iter()).finish()
    }
}

/// Scope for `serde`-related code.
#[cfg(all(feature = "alloc", feature = "serde"))]
mod serde_support {
    use super::{ConstArray, Error, PmhTables, SeededHash, UnorderedMap};

    /// Unvalidated map contents.
    #[derive(serde::Deserialize)]
    #[serde(rename = "UnorderedMap")]
    pub(super) struct RawMap<K, V, H> {
        /// See [`UnorderedMap`].
        tables: PmhTables<H>,
        /// See [`UnorderedMap`].
        entries: ConstArray<(K, V)>,
    }

    impl<K: Eq, V, H: SeededHash<K>> TryFrom<RawMap<K, V, H>> for UnorderedMap<K, V, H> {
        type Error = Error;

        #[inline]
        fn try_from(raw: RawMap<K, V, H>) -> Result<Self, Error> {
            Self::try_from_parts(raw.tables, raw.entries)
        }
    }
}

#[cfg(feature = "codegen")]
impl<K: super::codegen::ToCode, V: super::codegen::ToCode, H: super::codegen::ToCode>
    super::codegen::ToCode for UnorderedMap<K, V, H>
{
    #[inline]
    fn to_code(&self, gen: &mut super::codegen::CodeGenerator) -> proc_macro2::TokenStream {
        let map = gen.import("rime::UnorderedMap");
        let tables = gen.expr(&self.tables);
        let entries = gen.expr(&self.entries);
        quote::quote!(#map::from_raw_parts(#tables, #entries))
    }
}
