//! Perfect hash sets.

use super::{
    const_array::ConstArray,
    hash::{Elsa, SeededHash},
    tables::PmhTables,
    Error,
};
use core::{borrow::Borrow, fmt};

/// An immutable set backed by minimal perfect hash tables.
///
/// Elements are stored in the order they were given. A lookup hashes the query at most twice and
/// then compares it against a single candidate element.
///
/// `H` is the seeded hash the tables were built with. It defaults to [`Elsa`]; sets built from a
/// plain hash through [`Unseeded`](crate::hash::Unseeded) store a
/// [`MultiplyShift`](crate::multiply_shift::MultiplyShift) here.
#[derive(Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
#[cfg_attr(all(feature = "alloc", feature = "serde"), derive(serde::Deserialize))]
#[cfg_attr(
    all(feature = "alloc", feature = "serde"),
    serde(
        bound(
            deserialize = "T: serde::Deserialize<'de> + Eq, H: serde::Deserialize<'de> + SeededHash<T>"
        ),
        try_from = "serde_support::RawSet<T, H>"
    )
)]
pub struct UnorderedSet<T, H = Elsa> {
    /// Maps elements to their positions in [`items`](Self::items).
    tables: PmhTables<H>,

    /// The elements, in construction order.
    items: ConstArray<T>,
}

/// Collect an exact-size iterator, checking that it yields as many items as it declares.
#[cfg(feature = "build")]
pub(crate) fn collect_exact<T>(
    items: impl IntoIterator<Item = T, IntoIter: ExactSizeIterator>,
) -> Result<alloc::vec::Vec<T>, Error> {
    let items = items.into_iter();
    let declared = items.len();
    let items: alloc::vec::Vec<T> = items.collect();
    if items.len() == declared {
        Ok(items)
    } else {
        Err(Error::LengthMismatch {
            declared,
            actual: items.len(),
        })
    }
}

#[cfg(feature = "build")]
impl<T: Eq + super::hash::PortableHash> UnorderedSet<T> {
    /// Build a set with the default hash.
    ///
    /// # Errors
    ///
    /// Fails if `elements` contains duplicates or yields a different number of elements than it
    /// declares.
    #[inline]
    pub fn try_from_elements(
        elements: impl IntoIterator<Item = T, IntoIter: ExactSizeIterator>,
    ) -> Result<Self, Error> {
        Self::try_from_elements_with(elements, Elsa, &mut super::random::Lcg::default(), None)
    }

    /// Build a set with the default hash.
    ///
    /// # Panics
    ///
    /// Panics if `elements` contains duplicates or yields a different number of elements than it
    /// declares.
    #[inline]
    #[must_use]
    pub fn from_elements(
        elements: impl IntoIterator<Item = T, IntoIter: ExactSizeIterator>,
    ) -> Self {
        Self::try_from_elements(elements).unwrap_or_else(|error| panic!("{error}"))
    }
}

#[cfg(feature = "build")]
impl<T: Eq, H: SeededHash<T>> UnorderedSet<T, H> {
    /// Build a set with a custom hash.
    ///
    /// # Panics
    ///
    /// Panics if `elements` contains duplicates or yields a different number of elements than it
    /// declares.
    #[inline]
    #[must_use]
    pub fn from_elements_with_hasher(
        elements: impl IntoIterator<Item = T, IntoIter: ExactSizeIterator>,
        hasher: impl super::hash::AdaptHash<T, Adapted = H>,
    ) -> Self {
        Self::try_from_elements_with(elements, hasher, &mut super::random::Lcg::default(), None)
            .unwrap_or_else(|error| panic!("{error}"))
    }

    /// Build a set, controlling every construction parameter.
    ///
    /// `hasher` is adapted to the table size first. Seeds are drawn from `prg`. If `table_size` is
    /// `None`, [`table_size_for`](crate::low_level::table_size_for) picks one.
    ///
    /// # Errors
    ///
    /// Fails if `elements` contains duplicates, yields a different number of elements than it
    /// declares, or if `table_size` is unsuitable.
    #[inline]
    pub fn try_from_elements_with(
        elements: impl IntoIterator<Item = T, IntoIter: ExactSizeIterator>,
        hasher: impl super::hash::AdaptHash<T, Adapted = H>,
        prg: &mut impl super::random::SeedSource,
        table_size: Option<usize>,
    ) -> Result<Self, Error> {
        let items = collect_exact(elements)?;
        let table_size =
            table_size.unwrap_or_else(|| super::tables::table_size_for(items.len()));
        let tables = PmhTables::build_with_size(&items, |item| item, hasher, prg, table_size)?;
        Ok(Self {
            tables,
            items: items.into(),
        })
    }
}

impl<T, H> UnorderedSet<T, H> {
    /// Assemble a set without validation.
    ///
    /// Meant for codegen, not for public use.
    #[doc(hidden)]
    #[inline]
    #[must_use]
    pub const fn from_raw_parts(tables: PmhTables<H>, items: ConstArray<T>) -> Self {
        Self { tables, items }
    }

    /// Assemble a set from tables and elements, checking that every element is found.
    ///
    /// # Errors
    ///
    /// Fails if the tables are malformed or if some element doesn't resolve to its own position.
    #[inline]
    pub fn try_from_parts(tables: PmhTables<H>, items: ConstArray<T>) -> Result<Self, Error>
    where
        T: Eq,
        H: SeededHash<T>,
    {
        tables.validate(items.len())?;
        for (index, item) in items.iter().enumerate() {
            if tables.lookup(item) != index {
                return Err(Error::MisplacedItem { index });
            }
        }
        Ok(Self { tables, items })
    }

    /// Get the stored element equal to `value`.
    #[inline]
    pub fn get<Q>(&self, value: &Q) -> Option<&T>
    where
        T: Borrow<Q>,
        Q: ?Sized + Eq,
        H: SeededHash<Q>,
    {
        self.find(value).map(|index| &self.items[index])
    }

    /// Find the position of `value` in construction order.
    #[inline]
    pub fn find<Q>(&self, value: &Q) -> Option<usize>
    where
        T: Borrow<Q>,
        Q: ?Sized + Eq,
        H: SeededHash<Q>,
    {
        self.find_with(value, self.tables.hash_function(), |item, value| item.borrow() == value)
    }

    /// Find the position of `value` with a custom hash and equality.
    ///
    /// `hash` must produce the same values as the hash the set was built with, and `eq` must agree
    /// with it: elements it considers equal to `value` must hash like `value`.
    #[inline]
    pub fn find_with<Q: ?Sized>(
        &self,
        value: &Q,
        hash: &impl SeededHash<Q>,
        eq: impl Fn(&T, &Q) -> bool,
    ) -> Option<usize> {
        if self.items.is_empty() {
            return None;
        }
        let index = self.tables.lookup_with(value, hash);
        self.items
            .get(index)
            .filter(|item| eq(item, value))
            .map(|_| index)
    }

    /// Check if the set contains `value`, with a custom hash and equality.
    ///
    /// See [`find_with`](Self::find_with).
    #[inline]
    pub fn contains_with<Q: ?Sized>(
        &self,
        value: &Q,
        hash: &impl SeededHash<Q>,
        eq: impl Fn(&T, &Q) -> bool,
    ) -> bool {
        self.find_with(value, hash, eq).is_some()
    }

    /// Check if the set contains `value`.
    #[inline]
    pub fn contains<Q>(&self, value: &Q) -> bool
    where
        T: Borrow<Q>,
        Q: ?Sized + Eq,
        H: SeededHash<Q>,
    {
        self.find(value).is_some()
    }

    /// The number of elements equal to `value`, i.e. 0 or 1.
    #[inline]
    pub fn count<Q>(&self, value: &Q) -> usize
    where
        T: Borrow<Q>,
        Q: ?Sized + Eq,
        H: SeededHash<Q>,
    {
        usize::from(self.contains(value))
    }

    /// Get number of elements.
    #[inline]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Check if the set is empty.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Iterate through elements in construction order.
    #[inline]
    pub fn iter(&self) -> core::slice::Iter<'_, T> {
        self.items.iter()
    }

    /// The elements in construction order.
    #[inline]
    pub fn as_slice(&self) -> &[T] {
        &self.items
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

impl<'a, T, H> IntoIterator for &'a UnorderedSet<T, H> {
    type Item = &'a T;
    type IntoIter = core::slice::Iter<'a, T>;

    #[inline]
    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl<T: fmt::Debug, H> fmt::Debug for UnorderedSet<T, H> {
    #[inline]
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.iter()).finish()
    }
}

/// Scope for `serde`-related code.
#[cfg(all(feature = "alloc", feature = "serde"))]
mod serde_support {
    use super::{ConstArray, Error, PmhTables, SeededHash, UnorderedSet};

    /// Unvalidated set contents.
    #[derive(serde::Deserialize)]
    #[serde(rename = "UnorderedSet")]
    pub(super) struct RawSet<T, H> {
        /// See [`UnorderedSet`].
        tables: PmhTables<H>,
        /// See [`UnorderedSet`].
        items: ConstArray<T>,
    }

    impl<T: Eq, H: SeededHash<T>> TryFrom<RawSet<T, H>> for UnorderedSet<T, H> {
        type Error = Error;

        #[inline]
        fn try_from(raw: RawSet<T, H>) -> Result<Self, Error> {
            Self::try_from_parts(raw.tables, raw.items)
        }
    }
}

#[cfg(feature = "codegen")]
impl<T: super::codegen::ToCode, H: super::codegen::ToCode> super::codegen::ToCode
    for UnorderedSet<T, H>
{
    #[inline]
    fn to_code(&self, gen: &mut super::codegen::CodeGenerator) -> proc_macro2::TokenStream {
        let set = gen.import("rime::UnorderedSet");
        let tables = gen.expr(&self.tables);
        let items = gen.expr(&self.items);
        quote::quote!(#set::from_raw_parts(#tables, #items))
    }
}
