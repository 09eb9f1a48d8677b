//! Fixed-length storage that can live in a `static`.

use core::ops::{Deref, DerefMut};

/// A fixed-length sequence, either borrowed from static data or owned.
///
/// Tables built at run time own their storage. Tables emitted by [`codegen`](crate::codegen) and
/// embedded in the binary point to `static` arrays instead, so that they can be constructed in a
/// `const` context without allocating.
///
/// The length never changes after construction. [`DerefMut`] is implemented so that owned
/// containers can update values in place, but it panics on static data: public APIs hand out
/// `&` references to static containers, so this cannot be triggered from safe user code that
/// goes through them.
#[derive(Debug)]
#[non_exhaustive]
pub enum ConstArray<T> {
    /// Semantically `&'static [T]`. Variants can't carry their own bounds, and `&'static [T]`
    /// requires `T: 'static`, so a raw pointer is stored instead.
    Static(*const [T]),

    /// Data allocated during construction.
    #[cfg(feature = "alloc")]
    Owned(alloc::boxed::Box<[T]>),
}

// SAFETY: `Owned` is `Send` if `T: Send`. `Static` is only constructed from `&'static [T]` with
// `T: Sync`, and `&'static [T]: Send` in that case.
unsafe impl<T: Send> Send for ConstArray<T> {}
// SAFETY: `Owned` is `Sync` if `T: Sync`. `&'static [T]: Sync` if `T: Sync`.
unsafe impl<T: Sync> Sync for ConstArray<T> {}

impl<T> ConstArray<T> {
    /// Wrap static data.
    ///
    /// `T: Sync` is required because the same static slice may back several containers, which
    /// may then be sent to different threads.
    #[inline]
    #[must_use]
    pub const fn from_static(data: &'static [T]) -> Self
    where
        T: Sync,
    {
        Self::Static(data)
    }

    /// Take ownership of a boxed slice.
    #[cfg(feature = "alloc")]
    #[inline]
    #[must_use]
    pub const fn from_boxed(data: alloc::boxed::Box<[T]>) -> Self {
        Self::Owned(data)
    }

    /// Whether the data is borrowed from a `static`.
    #[inline]
    #[must_use]
    pub const fn is_static(&self) -> bool {
        matches!(self, Self::Static(_))
    }
}

#[cfg(feature = "alloc")]
impl<T> From<alloc::vec::Vec<T>> for ConstArray<T> {
    #[inline]
    fn from(data: alloc::vec::Vec<T>) -> Self {
        Self::Owned(data.into_boxed_slice())
    }
}

impl<T> Deref for ConstArray<T> {
    type Target = [T];

    #[inline]
    fn deref(&self) -> &[T] {
        match self {
            // SAFETY: `Static` is only created from `&'static [T]`.
            Self::Static(ptr) => unsafe { &**ptr },
            #[cfg(feature = "alloc")]
            Self::Owned(data) => data,
        }
    }
}

impl<T> DerefMut for ConstArray<T> {
    /// # Panics
    ///
    /// Panics if the data is static.
    #[inline]
    fn deref_mut(&mut self) -> &mut [T] {
        match self {
            Self::Static(_) => panic!("static table data is immutable"),
            #[cfg(feature = "alloc")]
            Self::Owned(data) => data,
        }
    }
}

impl<T: Clone> Clone for ConstArray<T> {
    #[inline]
    fn clone(&self) -> Self {
        match self {
            Self::Static(ptr) => Self::Static(*ptr),
            #[cfg(feature = "alloc")]
            Self::Owned(data) => Self::Owned(data.clone()),
        }
    }
}

impl<T: PartialEq> PartialEq for ConstArray<T> {
    #[inline]
    fn eq(&self, other: &Self) -> bool {
        **self == **other
    }
}

impl<T: Eq> Eq for ConstArray<T> {}

#[cfg(feature = "codegen")]
impl<T: super::codegen::ToCode> super::codegen::ToCode for ConstArray<T> {
    #[inline]
    fn to_code(&self, gen: &mut super::codegen::CodeGenerator) -> proc_macro2::TokenStream {
        let const_array = gen.import("rime::low_level::ConstArray");
        let data = gen.array(&**self);
        if gen.mutability() {
            let vec = gen.import("alloc::vec");
            quote::quote!(#const_array::from(#vec!#data))
        } else {
            quote::quote!(#const_array::from_static(&#data))
        }
    }
}

/// Scope for `serde`-related code.
#[cfg(feature = "serde")]
mod serde_support {
    use super::ConstArray;
    use serde::ser::{Serialize, SerializeSeq, Serializer};

    impl<T: Serialize> Serialize for ConstArray<T> {
        #[inline]
        fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
            let mut seq = serializer.serialize_seq(Some(self.len()))?;
            for element in &**self {
                seq.serialize_element(element)?;
            }
            seq.end()
        }
    }

    #[cfg(feature = "alloc")]
    impl<'de, T: serde::Deserialize<'de>> serde::Deserialize<'de> for ConstArray<T> {
        #[inline]
        fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
            alloc::vec::Vec::<T>::deserialize(deserializer).map(Into::into)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn static_data() {
        let keywords = const { ConstArray::from_static(&["if", "else", "while"]) };
        assert!(keywords.is_static());
        assert_eq!(keywords.len(), 3);
        assert_eq!(keywords.get(1), Some(&"else"));
        assert_eq!(keywords.get(3), None);
    }

    #[test]
    #[should_panic(expected = "static table data is immutable")]
    fn static_data_is_immutable() {
        let mut slots = const { ConstArray::from_static(&[0usize, 1, 2]) };
        slots[0] = 5;
    }

    #[cfg(feature = "alloc")]
    #[test]
    fn owned_data() {
        let mut slots = ConstArray::from(alloc::vec![0usize, 1, 2]);
        assert!(!slots.is_static());
        slots[0] = 5;
        assert_eq!(&*slots, &[5, 1, 2]);
        assert_eq!(slots.clone(), ConstArray::from_static(&[5, 1, 2]));
    }
}
