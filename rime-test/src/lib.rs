//! Tables generated by `build.rs` and embedded into the binary.

use rime::{UnorderedMap, UnorderedSet};

/// C keywords.
pub static KEYWORDS: UnorderedSet<&str> = include!(concat!(env!("OUT_DIR"), "/keywords.rs"));

/// C keywords mapped to token numbers, in order of appearance in the standard.
pub const TOKENS: UnorderedMap<&str, u32> = include!(concat!(env!("OUT_DIR"), "/tokens.rs"));

/// Integers below 2000 mapped to their squares.
pub static SQUARES: UnorderedMap<u64, u64> = include!(concat!(env!("OUT_DIR"), "/squares.rs"));

/// An owned copy of [`TOKENS`] that can be modified.
#[must_use]
pub fn tokens_mut() -> UnorderedMap<&'static str, u32> {
    include!(concat!(env!("OUT_DIR"), "/tokens_mut.rs"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keywords() {
        assert_eq!(KEYWORDS.len(), 32);
        assert_eq!(KEYWORDS.bucket_count(), 64);
        assert!(KEYWORDS.contains("auto"));
        assert!(KEYWORDS.contains("while"));
        assert!(!KEYWORDS.contains("auto0"));
        assert!(!KEYWORDS.contains(""));
        assert_eq!(KEYWORDS.iter().next(), Some(&"auto"));
    }

    #[test]
    fn tokens() {
        assert_eq!(TOKENS.get("auto"), Some(&0));
        assert_eq!(TOKENS.get("volatile"), Some(&30));
        assert_eq!(TOKENS.get("main"), None);
        assert_eq!(TOKENS.bucket_count(), 32);
    }

    #[test]
    fn squares() {
        for x in 0..2000u64 {
            assert_eq!(SQUARES.get(&x), Some(&(x * x)));
        }
        assert_eq!(SQUARES.get(&2000), None);
        assert_eq!(SQUARES.get(&u64::MAX), None);
    }

    #[test]
    #[should_panic(expected = "static table data is immutable")]
    fn static_data_is_immutable() {
        let mut tokens = TOKENS;
        if let Some(value) = tokens.get_mut("if") {
            *value = 100;
        }
    }

    #[test]
    fn owned_data_is_mutable() {
        let mut tokens = tokens_mut();
        *tokens.get_mut("if").expect("`if` is a keyword") = 100;
        assert_eq!(tokens.get("if"), Some(&100));
        assert_eq!(tokens.get("else"), Some(&9));
        assert_eq!(tokens.tables(), TOKENS.tables());
    }
}
