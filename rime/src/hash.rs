//! Seeded hash functions.
//!
//! Table construction evaluates a hash function under many different seeds: one seed places keys
//! into buckets, and one seed per bucket places the bucket's keys into slots. Hash functions are
//! therefore modeled as `(key, seed) -> u64`, see [`SeededHash`].
//!
//! A hash that doesn't take a seed ([`PlainHash`]) can still be used by wrapping it in
//! [`Unseeded`]; [`AdaptHash`] then turns it into a [`MultiplyShift`] finalizer that derives the
//! seeded hash from the plain one. Seed-aware hashes, like the default [`Elsa`], are passed through
//! unchanged.
//!
//! Tables may be built on one platform and embedded into a program running on another one, so
//! hashes must be portable. [`core::hash::Hash`] doesn't guarantee that, which is why [`Elsa`]
//! works on top of [`PortableHash`] instead.

use super::multiply_shift::MultiplyShift;
use core::hash::Hasher;

/// A hash function parametrized by a 64-bit seed.
///
/// Equal keys must hash equally under every seed. If `T: Borrow<U>` and the hasher implements
/// both `SeededHash<T>` and `SeededHash<U>`, hashing `x` and `x.borrow()` must agree.
///
/// Different keys should collide for only a small fraction of seeds. A hash that collides two
/// keys under every seed makes construction loop forever.
pub trait SeededHash<T: ?Sized> {
    /// Hash `key` under `seed`.
    fn hash(&self, key: &T, seed: u64) -> u64;
}

impl<T: ?Sized, H: ?Sized + SeededHash<T>> SeededHash<T> for &H {
    #[inline]
    fn hash(&self, key: &T, seed: u64) -> u64 {
        SeededHash::hash(&**self, key, seed)
    }
}

/// A hash function without a seed parameter.
///
/// Implemented for closures `Fn(&T) -> u64`.
pub trait PlainHash<T: ?Sized> {
    /// Hash `key`.
    fn hash(&self, key: &T) -> u64;
}

impl<T: ?Sized, F: Fn(&T) -> u64> PlainHash<T> for F {
    #[inline]
    fn hash(&self, key: &T) -> u64 {
        self(key)
    }
}

/// Conversion of a user-supplied hash function to a [`SeededHash`].
///
/// This is the capability check between seed-aware hashes, which are used as-is, and plain
/// hashes, which are combined with a multiply-shift finalizer.
///
/// `num_bits` is `log2` of the table size.
pub trait AdaptHash<T: ?Sized> {
    /// The seeded hash this adapts to.
    type Adapted: SeededHash<T>;

    /// Perform the conversion.
    fn adapt(self, num_bits: u32) -> Self::Adapted;
}

/// Marks a [`PlainHash`] for adaptation with [`MultiplyShift`].
#[derive(Clone, Copy, Debug, Default)]
#[allow(clippy::exhaustive_structs, reason = "newtype")]
pub struct Unseeded<H>(pub H);

impl<T: ?Sized, H: PlainHash<T>> AdaptHash<T> for Unseeded<H> {
    type Adapted = MultiplyShift<H>;

    #[inline]
    fn adapt(self, num_bits: u32) -> MultiplyShift<H> {
        MultiplyShift::new(self.0, num_bits)
    }
}

/// A seeded hash given as a closure `Fn(&T, u64) -> u64`.
#[derive(Clone, Copy, Debug, Default)]
#[allow(clippy::exhaustive_structs, reason = "newtype")]
pub struct Seeded<F>(pub F);

impl<T: ?Sized, F: Fn(&T, u64) -> u64> SeededHash<T> for Seeded<F> {
    #[inline]
    fn hash(&self, key: &T, seed: u64) -> u64 {
        (self.0)(key, seed)
    }
}

impl<T: ?Sized, F: Fn(&T, u64) -> u64> AdaptHash<T> for Seeded<F> {
    type Adapted = Self;

    #[inline]
    fn adapt(self, _num_bits: u32) -> Self {
        self
    }
}

/// The default hash function.
///
/// Scalars (integers up to 64 bits, `bool`, and `char`) are hashed with the murmur3 finalizer
/// applied to `key ^ seed`. Other [`PortableHash`] types are fed into rapidhash seeded with `seed`.
///
/// No stability guarantees are offered regarding the resulting hashes, except that they are equal
/// between platforms for a given version of the crate.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[non_exhaustive]
pub struct Elsa;

impl Elsa {
    /// Create the hasher.
    #[inline]
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

/// The murmur3 64-bit finalizer.
#[inline]
#[must_use]
pub const fn fmix64(mut key: u64) -> u64 {
    key ^= key >> 33i32;
    key = key.wrapping_mul(0xff51_afd7_ed55_8ccd);
    key ^= key >> 33i32;
    key = key.wrapping_mul(0xc4ce_b9fe_1a85_ec53);
    key ^= key >> 33i32;
    key
}

impl<T: ?Sized + PortableHash> SeededHash<T> for Elsa {
    #[inline]
    fn hash(&self, key: &T, seed: u64) -> u64 {
        if let Some(x) = reinterpret_scalar_up_to_64bit(key) {
            fmix64(x ^ seed)
        } else {
            let mut state = rapidhash::RapidHasher::new(seed);
            PortableHash::hash(key, &mut state);
            state.finish()
        }
    }
}

impl<T: ?Sized + PortableHash> AdaptHash<T> for Elsa {
    type Adapted = Self;

    #[inline]
    fn adapt(self, _num_bits: u32) -> Self {
        self
    }
}

#[cfg(feature = "codegen")]
impl super::codegen::ToCode for Elsa {
    #[inline]
    fn to_code(&self, gen: &mut super::codegen::CodeGenerator) -> proc_macro2::TokenStream {
        let elsa = gen.import("rime::hash::Elsa");
        quote::quote!(#elsa::new())
    }
}

/// Portable alternative to [`core::hash::Hash`].
///
/// Much like with [`core::hash::Hash`], `Eq`-equal objects must write equal data to the hasher,
/// and the data must be prefix-free. If `T: Borrow<U>` and both implement [`PortableHash`], `x`
/// and `x.borrow()` must write the same data.
///
/// In addition, the written data must be the same on all platforms. For example, writing `usize`
/// directly into the hasher is a bad idea because of differences in pointer width.
pub trait PortableHash {
    /// Write a value into the hasher.
    fn hash<H: Hasher>(&self, state: &mut H);

    /// Write a slice of values into the hasher.
    ///
    /// This does not write the length of the slice and is equivalent to calling
    /// [`PortableHash::hash`] on each element in order.
    #[inline]
    fn hash_slice<H: Hasher>(data: &[Self], state: &mut H)
    where
        Self: Sized,
    {
        for piece in data {
            PortableHash::hash(piece, state);
        }
    }
}

impl<T: ?Sized + PortableHash> PortableHash for &T {
    #[inline]
    fn hash<H: Hasher>(&self, state: &mut H) {
        PortableHash::hash(&**self, state);
    }
}

impl<T: ?Sized + PortableHash> PortableHash for &mut T {
    #[inline]
    fn hash<H: Hasher>(&self, state: &mut H) {
        PortableHash::hash(&**self, state);
    }
}

/// Implement [`PortableHash`] for fixed-width scalars by calling into [`Hasher`].
macro_rules! impl_write {
    ($($ty:ty => $method:ident,)*) => {
        $(
            impl PortableHash for $ty {
                #[inline]
                fn hash<H: Hasher>(&self, state: &mut H) {
                    state.$method(*self);
                }
            }
        )*
    };
}
impl_write! {
    u8 => write_u8,
    u16 => write_u16,
    u32 => write_u32,
    u64 => write_u64,
    u128 => write_u128,
    i8 => write_i8,
    i16 => write_i16,
    i32 => write_i32,
    i64 => write_i64,
    i128 => write_i128,
}

impl PortableHash for usize {
    #[inline]
    fn hash<H: Hasher>(&self, state: &mut H) {
        state.write_u64(*self as u64);
    }
}

impl PortableHash for isize {
    #[inline]
    fn hash<H: Hasher>(&self, state: &mut H) {
        state.write_i64(*self as i64);
    }
}

impl PortableHash for bool {
    #[inline]
    fn hash<H: Hasher>(&self, state: &mut H) {
        state.write_u8(u8::from(*self));
    }
}

impl PortableHash for char {
    #[inline]
    fn hash<H: Hasher>(&self, state: &mut H) {
        state.write_u32(u32::from(*self));
    }
}

/// Implement [`PortableHash`] for UTF-8 strings.
///
/// The trailing `0xff` byte can't occur in UTF-8, which keeps the encoding prefix-free.
macro_rules! impl_str {
    ($ty:ty) => {
        impl PortableHash for $ty {
            #[inline]
            fn hash<H: Hasher>(&self, state: &mut H) {
                state.write(self.as_bytes());
                state.write_u8(0xff);
            }
        }
    };
}
impl_str!(str);
#[cfg(feature = "alloc")]
impl_str!(alloc::string::String);

impl<T: PortableHash> PortableHash for [T] {
    #[inline]
    fn hash<H: Hasher>(&self, state: &mut H) {
        state.write_u64(self.len() as u64);
        T::hash_slice(self, state);
    }
}

impl<T: PortableHash, const N: usize> PortableHash for [T; N] {
    #[inline]
    fn hash<H: Hasher>(&self, state: &mut H) {
        <[T] as PortableHash>::hash(self, state);
    }
}

#[cfg(feature = "alloc")]
impl<T: PortableHash> PortableHash for alloc::vec::Vec<T> {
    #[inline]
    fn hash<H: Hasher>(&self, state: &mut H) {
        <[T] as PortableHash>::hash(self, state);
    }
}

/// Implement [`PortableHash`] for tuples.
macro_rules! impl_tuple {
    ($($name:ident)*) => {
        impl<$($name: PortableHash),*> PortableHash for ($($name,)*) {
            #[inline]
            #[allow(non_snake_case, reason = "macro")]
            fn hash<H: Hasher>(&self, state: &mut H) {
                let ($($name,)*) = self;
                $(PortableHash::hash($name, state);)*
            }
        }
    };
}
impl_tuple!(A);
impl_tuple!(A B);
impl_tuple!(A B C);
impl_tuple!(A B C D);

/// Cast `&T` to `&U` if the types are statically known to be equal.
///
/// # Safety
///
/// The cast-to type `U` must not contain lifetimes, not even `'static`.
unsafe fn reinterpret_scalar<T: ?Sized, U: ?Sized + 'static>(x: &T) -> Option<&U> {
    let ty = typeid::of::<T>();
    if ty == typeid::of::<U>() {
        // SAFETY: `T` and `U` are the same lifetime-free type.
        return Some(unsafe { core::mem::transmute_copy::<&T, &U>(&x) });
    }
    // Scalars only implement `Borrow` through one level of references, so `&&U` needn't be checked.
    if ty == typeid::of::<&U>() {
        // SAFETY: `T` is `&U`, and `U` is lifetime-free.
        return Some(*unsafe { core::mem::transmute_copy::<&T, &&U>(&x) });
    }
    None
}

/// Widen `x` to `u64` if it's a scalar of at most 64 bits.
///
/// Signed integers are sign-extended, so `-1i8` and `-1i64` hash equally, much like `1u8` and
/// `1u64` do.
fn reinterpret_scalar_up_to_64bit<T: ?Sized>(x: &T) -> Option<u64> {
    /// Try each listed type in turn.
    macro_rules! imp {
        ($($ty:ty),*) => {
            $(
                // SAFETY: Scalars don't contain lifetimes.
                if let Some(&x) = unsafe { reinterpret_scalar::<T, $ty>(x) } {
                    #[allow(clippy::cast_lossless, reason = "generic code")]
                    #[allow(clippy::cast_sign_loss, reason = "intentional")]
                    return Some(x as u64);
                }
            )*
        };
    }
    imp!(u8, u16, u32, u64, usize, i8, i16, i32, i64, isize, bool, char);
    None
}
