#![cfg(feature = "codegen")]

//! Code generation.
//!
//! Tables over a key set known ahead of time can be built once, in `build.rs`, and embedded into
//! the program. [`CodeGenerator`] turns a built set, map, or table into a Rust expression that
//! reconstructs it, to be `include!`d into a `const` or `static` item:
//!
//! ```rust
//! # fn main() -> std::io::Result<()> {
//! let set = rime::UnorderedSet::from_elements(["auto", "break", "case"]);
//! let code = rime::codegen::CodeGenerator::new().generate(&set);
//! std::fs::write(std::env::temp_dir().join("keywords.rs"), code.to_string())?;
//! # Ok(())
//! # }
//! ```
//!
//! ```ignore
//! static KEYWORDS: rime::UnorderedSet<&str> = include!(concat!(env!("OUT_DIR"), "/keywords.rs"));
//! ```
//!
//! Keys and values must implement [`ToCode`]. Integers, `bool`, `char`, strings, arrays, slices,
//! `Vec`, `Option`, and small tuples do. The generated code may be compiled for a different
//! platform than the one it was generated on, so implementations must not bake in
//! platform-specific values.
//!
//!
//! # Output
//!
//! The output is a block that imports every item it refers to under an alias, followed by the
//! expression itself:
//!
//! ```ignore
//! {
//!     use ::rime::UnorderedSet as __UnorderedSet;
//!     use ::rime::low_level::PmhTables as __PmhTables;
//!     // ...
//!     __UnorderedSet::from_raw_parts(__PmhTables::from_raw_parts(/* ... */), /* ... */)
//! }
//! ```
//!
//! Aliases keep the output short and can't clash with names at the include site. If an item from
//! `alloc` is referenced, `extern crate alloc as _Alloc;` is emitted too, so that the code works
//! in `no_std` crates.
//!
//! Literals are unsuffixed and slices are emitted as `&[..]`, so the item the code is included
//! into should be annotated with its type.
//!
//!
//! # Mutability
//!
//! By default, data is emitted as `static` arrays. The result can be evaluated in a `const`
//! context and doesn't allocate, but it can't be modified: for example,
//! [`UnorderedMap::get_mut`](crate::UnorderedMap::get_mut) panics. With
//! [`set_mutability(true)`](CodeGenerator::set_mutability), data is emitted as `vec![..]`
//! instead, which allows modification at the cost of allocation.

use alloc::{
    borrow::ToOwned,
    boxed::Box,
    collections::{BTreeMap, BTreeSet},
    format,
    string::String,
    vec::Vec,
};
use proc_macro2::{Ident, Literal, TokenStream, TokenTree};
use quote::{format_ident, quote};

/// Code generator.
///
/// Create one per generated value, configure it, and call [`generate`](Self::generate).
pub struct CodeGenerator {
    /// Crate name to path overrides, see [`set_crate`](Self::set_crate).
    crate_roots: BTreeMap<String, TokenStream>,

    /// Imported item paths and their aliases. Ordered for reproducible output.
    imports: BTreeMap<String, Ident>,

    /// Aliases in use.
    taken: BTreeSet<String>,

    /// Whether an item from `alloc` was imported.
    uses_alloc: bool,

    /// See [module-level documentation](self).
    mutable: bool,
}

impl CodeGenerator {
    /// Create a code generator for immutable output, with `rime` resolved to `::rime`.
    #[inline]
    #[must_use]
    pub const fn new() -> Self {
        Self {
            crate_roots: BTreeMap::new(),
            imports: BTreeMap::new(),
            taken: BTreeSet::new(),
            uses_alloc: false,
            mutable: false,
        }
    }

    /// Choose between static and heap-allocated data.
    ///
    /// See [module-level documentation](self).
    #[inline]
    pub fn set_mutability(&mut self, mutable: bool) {
        self.mutable = mutable;
    }

    /// Whether heap-allocated data is emitted.
    #[inline]
    #[must_use]
    pub const fn mutability(&self) -> bool {
        self.mutable
    }

    /// Resolve crate `name` to `path` instead of `::name`.
    ///
    /// Useful if `rime` is renamed in `Cargo.toml` or reexported from another crate.
    #[inline]
    pub fn set_crate(&mut self, name: &str, path: TokenStream) {
        self.crate_roots.insert(name.to_owned(), path);
    }

    /// Produce the complete code for `value`.
    #[inline]
    pub fn generate<T: ToCode>(mut self, value: &T) -> TokenStream {
        let expr = self.expr(value);

        let extern_alloc = if self.uses_alloc && !self.crate_roots.contains_key("alloc") {
            self.crate_roots.insert("alloc".to_owned(), quote!(_Alloc));
            Some(quote!(extern crate alloc as _Alloc;))
        } else {
            None
        };

        let uses: Vec<TokenStream> = self
            .imports
            .iter()
            .map(|(path, alias)| {
                let mut segments = path.split("::");
                let krate = segments.next().unwrap_or_default();
                let root = self.crate_roots.get(krate).cloned().unwrap_or_else(|| {
                    let krate = format_ident!("{krate}");
                    quote!(::#krate)
                });
                let segments = segments.map(|segment| format_ident!("{segment}"));
                quote!(use #root #(::#segments)* as #alias;)
            })
            .collect();

        quote!({
            #extern_alloc
            #(#uses)*
            #expr
        })
    }

    /// Produce an expression for `value`, to be embedded into a larger expression.
    ///
    /// Meant for [`ToCode`] implementations.
    #[inline]
    pub fn expr<T: ToCode>(&mut self, value: &T) -> TokenStream {
        value.to_code(self)
    }

    /// Produce an array expression `[a, b, ..]`.
    #[inline]
    pub fn array<'a, T: 'a + ToCode>(
        &mut self,
        elements: impl IntoIterator<Item = &'a T>,
    ) -> TokenStream {
        let elements: Vec<TokenStream> = elements
            .into_iter()
            .map(|element| self.expr(element))
            .collect();
        quote!([#(#elements),*])
    }

    /// Import an item and return its alias.
    ///
    /// `path` looks like `crate_name::module::Item`. The crate is resolved according to
    /// [`set_crate`](Self::set_crate).
    #[inline]
    pub fn import(&mut self, path: &str) -> TokenStream {
        if let Some(alias) = self.imports.get(path) {
            return quote!(#alias);
        }

        if path.split("::").next() == Some("alloc") {
            self.uses_alloc = true;
        }

        let name = path.rsplit("::").next().unwrap_or(path);
        let mut alias = format!("__{name}");
        let mut suffix = 1u32;
        while self.taken.contains(&alias) {
            suffix += 1;
            alias = format!("__{name}{suffix}");
        }

        let ident = format_ident!("{alias}");
        self.taken.insert(alias);
        self.imports.insert(path.to_owned(), ident.clone());
        quote!(#ident)
    }
}

impl Default for CodeGenerator {
    #[inline]
    fn default() -> Self {
        Self::new()
    }
}

/// Conversion of a value to an expression that evaluates to it.
///
/// Only sized types can be produced by an expression, which is why `str` and `[T]` are covered
/// by implementations for `&str` and `&[T]`.
///
/// Types with private fields usually expose a `#[doc(hidden)]` `const fn from_raw_parts` for the
/// generated code to call.
pub trait ToCode: Sized {
    /// Produce an expression for `self`.
    ///
    /// Call [`CodeGenerator::expr`] for nested values, and use [`CodeGenerator::import`] to refer
    /// to items. To generate a whole program fragment, use [`CodeGenerator::generate`] instead.
    fn to_code(&self, gen: &mut CodeGenerator) -> TokenStream;
}

/// [`ToCode`] for types representable as a single unsuffixed literal.
macro_rules! unsuffixed_literals {
    ($($ty:ty: $constructor:ident),* $(,)?) => {
        $(
            impl ToCode for $ty {
                #[inline]
                fn to_code(&self, _gen: &mut CodeGenerator) -> TokenStream {
                    TokenStream::from(TokenTree::Literal(Literal::$constructor(*self)))
                }
            }
        )*
    };
}

unsuffixed_literals! {
    u8: u8_unsuffixed,
    u16: u16_unsuffixed,
    u32: u32_unsuffixed,
    u64: u64_unsuffixed,
    u128: u128_unsuffixed,
    usize: usize_unsuffixed,
    i8: i8_unsuffixed,
    i16: i16_unsuffixed,
    i32: i32_unsuffixed,
    i64: i64_unsuffixed,
    i128: i128_unsuffixed,
    isize: isize_unsuffixed,
    char: character,
    &'_ str: string,
}

impl ToCode for bool {
    #[inline]
    fn to_code(&self, _gen: &mut CodeGenerator) -> TokenStream {
        if *self {
            quote!(true)
        } else {
            quote!(false)
        }
    }
}

impl ToCode for String {
    #[inline]
    fn to_code(&self, gen: &mut CodeGenerator) -> TokenStream {
        let string = gen.import("alloc::string::String");
        let text = Literal::string(self);
        quote!(#string::from(#text))
    }
}

/// View `value` as bytes if `T` is `[u8]`.
///
/// Byte data is emitted as `b"..."` literals, which are much shorter than arrays of integers.
fn bytes_of<T: ?Sized>(value: &T) -> Option<&[u8]> {
    if typeid::of::<T>() != typeid::of::<[u8]>() {
        return None;
    }
    // SAFETY: `T` has the type ID of `[u8]`, which has no lifetimes, so `T` is exactly `[u8]`.
    Some(unsafe { core::mem::transmute_copy::<&T, &[u8]>(&value) })
}

impl<T: ToCode> ToCode for &[T] {
    #[inline]
    fn to_code(&self, gen: &mut CodeGenerator) -> TokenStream {
        match bytes_of(*self) {
            Some(bytes) => TokenStream::from(TokenTree::Literal(Literal::byte_string(bytes))),
            None => {
                let array = gen.array(*self);
                quote!(&#array)
            }
        }
    }
}

impl<T: ToCode, const N: usize> ToCode for [T; N] {
    #[inline]
    fn to_code(&self, gen: &mut CodeGenerator) -> TokenStream {
        gen.array(self)
    }
}

impl<T: ToCode> ToCode for Vec<T> {
    #[inline]
    fn to_code(&self, gen: &mut CodeGenerator) -> TokenStream {
        match bytes_of(self.as_slice()) {
            Some(bytes) => {
                let vec = gen.import("alloc::vec::Vec");
                let bytes = Literal::byte_string(bytes);
                quote!(#vec::from(#bytes))
            }
            None => {
                let vec = gen.import("alloc::vec");
                let array = gen.array(self);
                quote!(#vec!#array)
            }
        }
    }
}

impl<T: ToCode> ToCode for Box<T> {
    #[inline]
    fn to_code(&self, gen: &mut CodeGenerator) -> TokenStream {
        let boxed = gen.import("alloc::boxed::Box");
        let inner = gen.expr(&**self);
        quote!(#boxed::new(#inner))
    }
}

impl<T: ToCode> ToCode for Option<T> {
    #[inline]
    fn to_code(&self, gen: &mut CodeGenerator) -> TokenStream {
        if let Some(inner) = self {
            let some = gen.import("core::option::Option::Some");
            let inner = gen.expr(inner);
            quote!(#some(#inner))
        } else {
            gen.import("core::option::Option::None")
        }
    }
}

impl ToCode for () {
    #[inline]
    fn to_code(&self, _gen: &mut CodeGenerator) -> TokenStream {
        quote!(())
    }
}

/// [`ToCode`] for non-empty tuples. Each field is listed as `Type.index`.
macro_rules! tuples {
    ($(($($field:ident.$index:tt),+))*) => {
        $(
            impl<$($field: ToCode),+> ToCode for ($($field,)+) {
                #[inline]
                #[allow(non_snake_case, reason = "fields are named after their types")]
                fn to_code(&self, gen: &mut CodeGenerator) -> TokenStream {
                    $(let $field = gen.expr(&self.$index);)+
                    quote!(($(#$field,)+))
                }
            }
        )*
    };
}

tuples! {
    (A.0)
    (A.0, B.1)
    (A.0, B.1, C.2)
    (A.0, B.1, C.2, D.3)
    (A.0, B.1, C.2, D.3, E.4)
}

#[cfg(all(test, feature = "build"))]
mod tests {
    use super::*;
    use crate::{hash::Elsa, UnorderedMap, UnorderedSet};
    use alloc::string::ToString;

    /// Render code as a string without whitespace.
    fn compact(code: &TokenStream) -> String {
        code.to_string()
            .chars()
            .filter(|c| !c.is_whitespace())
            .collect()
    }

    #[test]
    fn aliases() {
        let mut gen = CodeGenerator::new();
        assert_eq!(gen.import("rime::UnorderedSet").to_string(), "__UnorderedSet");
        assert_eq!(gen.import("rime::UnorderedSet").to_string(), "__UnorderedSet");
        assert_eq!(gen.import("other::UnorderedSet").to_string(), "__UnorderedSet2");
        assert_eq!(gen.import("other::UnorderedSet2").to_string(), "__UnorderedSet22");
    }

    #[test]
    fn scalars() {
        let code = compact(&CodeGenerator::new().generate(&(1u8, "two", Some('3'), true)));
        assert!(code.contains("(1,\"two\",__Some('3'),true,)"), "{code}");
        assert!(code.contains("use::core::option::Option::Someas__Some;"), "{code}");
        assert!(!code.contains("extern"), "{code}");
    }

    #[test]
    fn alloc_is_requested_on_demand() {
        let code = compact(&CodeGenerator::new().generate(&String::from("x")));
        assert!(code.contains("externcrateallocas_Alloc;"), "{code}");
        assert!(code.contains("use_Alloc::string::Stringas__String;"), "{code}");
    }

    #[test]
    fn byte_slices() {
        let bytes: &[u8] = b"ab";
        let code = compact(&CodeGenerator::new().generate(&bytes));
        assert!(code.ends_with("b\"ab\"}"), "{code}");

        let words: &[u16] = &[1, 2];
        let code = compact(&CodeGenerator::new().generate(&words));
        assert!(code.ends_with("&[1,2]}"), "{code}");
    }

    #[test]
    fn immutable_set() {
        let set = UnorderedSet::from_elements(["auto", "break"]);
        let code = compact(&CodeGenerator::new().generate(&set));
        assert!(code.contains("use::rime::UnorderedSetas__UnorderedSet;"), "{code}");
        assert!(
            code.contains("__UnorderedSet::from_raw_parts(__PmhTables::from_raw_parts("),
            "{code}",
        );
        assert!(code.contains("__ConstArray::from_static(&[\"auto\",\"break\"])"), "{code}");
        assert!(code.contains("__Elsa::new()"), "{code}");
        assert!(!code.contains("vec"), "{code}");
    }

    #[test]
    fn mutable_map() {
        let map = UnorderedMap::<u32, u32, Elsa>::from_entries([(1, 10), (2, 20)]);
        let mut gen = CodeGenerator::new();
        gen.set_mutability(true);
        let code = compact(&gen.generate(&map));
        assert!(code.contains("__ConstArray::from(__vec![(1,10,),(2,20,)])"), "{code}");
        assert!(code.contains("externcrateallocas_Alloc;"), "{code}");
    }

    #[test]
    fn crate_remapping() {
        let mut gen = CodeGenerator::new();
        gen.set_crate("rime", quote!(crate::reexported::rime));
        let code = compact(&gen.generate(&Elsa));
        assert!(code.contains("usecrate::reexported::rime::hash::Elsaas__Elsa;"), "{code}");
    }
}
