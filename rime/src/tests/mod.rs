#![cfg(feature = "build")]

use super::{
    hash::{fmix64, Elsa, Seeded, Unseeded},
    low_level::{table_size_for, Probe},
    random::{self, Lcg, SeedSource},
    Error, PmhTables, UnorderedMap, UnorderedSet,
};
use alloc::{string::String, vec, vec::Vec};
use rapidhash::RapidRng;

const C_KEYWORDS: [&str; 32] = [
    "auto", "break", "case", "char", "const", "continue", "default", "do", "double", "else",
    "enum", "extern", "float", "for", "goto", "if", "int", "long", "register", "return", "short",
    "signed", "sizeof", "static", "struct", "switch", "typedef", "union", "unsigned", "void",
    "volatile", "while",
];

fn random_keys(count: usize) -> Vec<u64> {
    // No collisions among the first few thousand outputs of this seed.
    let mut rng = RapidRng::new(0x13c6_ef37_2fe9_4f82);
    (0..count).map(|_| rng.next()).collect()
}

#[test]
fn deterministic() {
    let keys = random_keys(1000);
    let a = UnorderedSet::from_elements(keys.clone());
    let b = UnorderedSet::from_elements(keys);
    assert_eq!(a.tables(), b.tables());
}

#[test]
fn complete_and_injective() {
    let keys = random_keys(5000);
    let set = UnorderedSet::from_elements(keys.clone());
    assert_eq!(set.bucket_count(), 8192);

    let mut seen = vec![false; keys.len()];
    for (index, key) in keys.iter().enumerate() {
        assert_eq!(set.tables().lookup(key), index);
        assert_eq!(set.find(key), Some(index));
        assert!(!seen[index], "index {index} reached twice");
        seen[index] = true;
    }
    assert!(seen.iter().all(|&reached| reached), "some index is unreachable");
}

#[test]
fn sound() {
    let keys = random_keys(2000);
    let set = UnorderedSet::from_elements(keys[..1000].iter().copied());
    for key in &keys[1000..] {
        assert!(set.tables().lookup(key) < 1000, "lookup out of range");
        assert!(!set.contains(key), "{key} is not in the set");
    }
}

#[test]
fn single_key() {
    let set = UnorderedSet::from_elements([42u64]);
    assert_eq!(set.bucket_count(), 2);
    assert!(set.contains(&42));
    assert!(!set.contains(&43));
    assert!(
        set.tables()
            .first_table()
            .iter()
            .all(|entry| entry.probe() == Probe::Index(0)),
        "a single key is resolved directly",
    );
}

#[test]
fn no_keys() {
    let set = UnorderedSet::<u64>::from_elements([]);
    assert!(set.is_empty());
    assert!(!set.contains(&0));
    assert_eq!(set.find(&0), None);
    assert_eq!(set.bucket_count(), 2);

    let map = UnorderedMap::<String, u32>::from_entries([]);
    assert_eq!(map.get("anything"), None);
}

#[test]
fn table_size_boundaries() {
    assert_eq!(table_size_for(0), 2);
    assert_eq!(table_size_for(1), 2);
    assert_eq!(table_size_for(31), 64);
    assert_eq!(table_size_for(32), 32);
    assert_eq!(table_size_for(33), 64);
}

#[test]
fn keywords() {
    let set = UnorderedSet::try_from_elements_with(
        C_KEYWORDS,
        Elsa,
        &mut Lcg::default(),
        Some(64),
    )
    .expect("keywords are distinct");
    assert_eq!(set.bucket_count(), 64);
    for keyword in C_KEYWORDS {
        assert!(set.contains(keyword), "{keyword} is a keyword");
    }
    assert_eq!(set.get("auto"), Some(&"auto"));

    // Unknown keys still land on some keyword, which then fails the comparison.
    let candidate = set.tables().lookup("auto0");
    assert!(candidate < C_KEYWORDS.len(), "lookup out of range");
    assert_ne!(set.as_slice()[candidate], "auto0");
    assert!(!set.contains("auto0"));
    assert_eq!(set.count("auto0"), 0);
}

#[test]
fn keyword_map() {
    let map = UnorderedMap::from_entries(C_KEYWORDS.into_iter().zip(0u32..32));
    assert_eq!(map.get("auto"), Some(&0));
    assert_eq!(map.get("while"), Some(&31));
    assert_eq!(map.get("main"), None);
    assert_eq!(map.len(), 32);
}

#[test]
fn colliding_first_seed() {
    const BAD: u64 = 0x0bad;

    let mut fallback = Lcg::default();
    let mut first = true;
    let mut prg = random::from_fn(move || {
        if core::mem::take(&mut first) {
            BAD
        } else {
            fallback.next()
        }
    });

    // Every key lands in one bucket under `BAD`.
    let hash = Seeded(|key: &u64, seed: u64| if seed == BAD { 0 } else { fmix64(key ^ seed) });

    let keys: Vec<u64> = (0..100).collect();
    let set = UnorderedSet::try_from_elements_with(keys.clone(), hash, &mut prg, None)
        .expect("keys are distinct");
    assert_ne!(set.tables().first_seed(), BAD);
    for key in &keys {
        assert!(set.contains(key), "{key} is in the set");
    }
    assert!(!set.contains(&100));
}

#[test]
fn plain_hash() {
    let keys = random_keys(1000);
    let set = UnorderedSet::from_elements_with_hasher(keys.clone(), Unseeded(|key: &u64| *key));
    assert_eq!(set.hash_function().num_bits(), 10);
    for key in &keys {
        assert!(set.contains(key), "{key} is in the set");
    }
}

#[test]
fn custom_seed_source() {
    struct Counter(u64);

    impl SeedSource for Counter {
        fn next_seed(&mut self) -> u64 {
            self.0 += 1;
            self.0
        }
    }

    let keys = random_keys(300);
    let build = || {
        UnorderedSet::try_from_elements_with(keys.clone(), Elsa, &mut Counter(0), None)
            .expect("keys are distinct")
    };
    let a = build();
    let b = build();
    assert_eq!(a.tables(), b.tables());
    for key in &keys {
        assert!(a.contains(key), "{key} is in the set");
    }
}

#[test]
fn duplicate_keys() {
    assert_eq!(
        UnorderedSet::try_from_elements([1u64, 2, 3, 2]).err(),
        Some(Error::DuplicateKey),
    );
    assert_eq!(
        UnorderedMap::try_from_entries([("a", 1), ("b", 2), ("a", 3)]).err(),
        Some(Error::DuplicateKey),
    );
}

/// An iterator that promises more items than it yields.
struct Liar(core::ops::Range<u64>);

impl Iterator for Liar {
    type Item = u64;

    fn next(&mut self) -> Option<u64> {
        self.0.next()
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (3, Some(3))
    }
}

impl ExactSizeIterator for Liar {}

#[test]
fn length_mismatch() {
    assert_eq!(
        UnorderedSet::try_from_elements(Liar(0..2)).err(),
        Some(Error::LengthMismatch {
            declared: 3,
            actual: 2
        }),
    );
}

#[test]
fn explicit_table_size() {
    let keys = random_keys(40);
    let build = |size| {
        UnorderedSet::try_from_elements_with(
            keys.clone(),
            Elsa,
            &mut Lcg::default(),
            Some(size),
        )
    };
    assert_eq!(build(48).err(), Some(Error::TableSizeNotPowerOfTwo(48)));
    assert_eq!(
        build(32).err(),
        Some(Error::TableTooSmall {
            table_size: 32,
            item_count: 40
        }),
    );
    assert_eq!(build(256).map(|set| set.bucket_count()), Ok(256));
}

#[test]
fn rebuilt_from_parts() {
    let keys = random_keys(500);
    let set = UnorderedSet::from_elements(keys.clone());
    let tables = set.tables();

    let rebuilt = PmhTables::try_from_parts(
        tables.first_seed(),
        tables.first_table().to_vec().into(),
        tables.second_table().to_vec().into(),
        *tables.hash_function(),
        keys.len(),
    )
    .expect("tables are well-formed");
    let rebuilt = UnorderedSet::try_from_parts(rebuilt, keys.clone().into())
        .expect("keys resolve to themselves");
    assert_eq!(rebuilt, set);

    // Swapping two keys breaks the mapping.
    let mut swapped = keys;
    swapped.swap(0, 1);
    assert_eq!(
        UnorderedSet::try_from_parts(set.tables().clone(), swapped.into()).err(),
        Some(Error::MisplacedItem { index: 0 }),
    );
}

#[cfg(feature = "serde")]
mod serde_validation {
    use super::{random_keys, C_KEYWORDS};
    use crate::{Error, UnorderedMap, UnorderedSet};
    use alloc::string::{String, ToString};
    use serde_json::Value;

    fn keyword_map() -> UnorderedMap<String, u32> {
        UnorderedMap::from_entries(C_KEYWORDS.map(ToString::to_string).into_iter().zip(0u32..32))
    }

    /// Deserialization error message, which carries the [`Error`] it was caused by.
    fn rejection<T: serde::de::DeserializeOwned>(value: Value) -> String {
        match serde_json::from_value::<T>(value) {
            Ok(_) => panic!("malformed data was accepted"),
            Err(error) => error.to_string(),
        }
    }

    #[test]
    fn set_round_trip() {
        let set = UnorderedSet::from_elements(random_keys(100));
        let json = serde_json::to_string(&set).expect("serializable");
        let restored: UnorderedSet<u64> = serde_json::from_str(&json).expect("valid data");
        assert_eq!(restored, set);
        assert!(restored.contains(&set.as_slice()[42]));
    }

    #[test]
    fn map_round_trip() {
        let map = keyword_map();
        let json = serde_json::to_string(&map).expect("serializable");
        let restored: UnorderedMap<String, u32> = serde_json::from_str(&json).expect("valid data");
        assert_eq!(restored, map);
        assert_eq!(restored.get("while"), Some(&31));
    }

    #[test]
    fn reordered_items_are_rejected() {
        let set = UnorderedSet::from_elements(random_keys(100));
        let mut value = serde_json::to_value(&set).expect("serializable");
        value["items"]
            .as_array_mut()
            .expect("items are a sequence")
            .swap(0, 1);
        let message = rejection::<UnorderedSet<u64>>(value);
        assert!(
            message.contains(&Error::MisplacedItem { index: 0 }.to_string()),
            "{message}",
        );

        let map = keyword_map();
        let mut value = serde_json::to_value(&map).expect("serializable");
        value["entries"]
            .as_array_mut()
            .expect("entries are a sequence")
            .swap(3, 7);
        let message = rejection::<UnorderedMap<String, u32>>(value);
        assert!(
            message.contains(&Error::MisplacedItem { index: 3 }.to_string()),
            "{message}",
        );
    }

    #[test]
    fn out_of_range_index_is_rejected() {
        let set = UnorderedSet::from_elements(random_keys(100));
        let mut value = serde_json::to_value(&set).expect("serializable");
        value["tables"]["second_table"][0] = Value::from(10_000u64);
        let message = rejection::<UnorderedSet<u64>>(value);
        let expected = Error::IndexOutOfRange {
            index: 10_000,
            item_count: 100,
        };
        assert!(message.contains(&expected.to_string()), "{message}");
    }

    #[test]
    fn truncated_table_is_rejected() {
        let set = UnorderedSet::from_elements(random_keys(100));
        let mut value = serde_json::to_value(&set).expect("serializable");
        value["tables"]["second_table"]
            .as_array_mut()
            .expect("second table is a sequence")
            .pop();
        let message = rejection::<UnorderedSet<u64>>(value);
        let expected = Error::TableLengthMismatch { table_size: 128 };
        assert!(message.contains(&expected.to_string()), "{message}");
    }
}
