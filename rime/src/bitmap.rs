//! Slot occupancy tracking.

#![cfg(feature = "build")]

use alloc::{vec, vec::Vec};

/// Bit-compressed [`Vec<bool>`], used to mark claimed slots of the second table.
pub(crate) struct BitMap {
    /// Underlying container.
    ///
    /// Bit `index` is stored in word `index / 64` at bit `index % 64`, counting from LSB.
    data: Vec<u64>,
}

impl BitMap {
    /// Create a bitmap of a given length, filled with zero bits.
    pub fn new_zeros(len: usize) -> Self {
        Self {
            data: vec![0; len.div_ceil(64)],
        }
    }

    /// Get the bit at `index`.
    ///
    /// # Panics
    ///
    /// Panics if `index` is out of bounds.
    pub fn get(&self, index: usize) -> bool {
        (self.data[index / 64] >> (index % 64)) & 1 == 1
    }

    /// Set the bit at `index` to one.
    ///
    /// # Panics
    ///
    /// Panics if `index` is out of bounds.
    pub fn set(&mut self, index: usize) {
        self.data[index / 64] |= 1 << (index % 64);
    }

    /// Number of one bits.
    pub fn count_ones(&self) -> usize {
        self.data.iter().map(|word| word.count_ones() as usize).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn set_and_get() {
        let mut bitmap = BitMap::new_zeros(130);
        assert!(!bitmap.get(0));
        assert!(!bitmap.get(129));
        bitmap.set(0);
        bitmap.set(64);
        bitmap.set(129);
        assert!(bitmap.get(0));
        assert!(bitmap.get(64));
        assert!(bitmap.get(129));
        assert!(!bitmap.get(63));
        assert_eq!(bitmap.count_ones(), 3);
        bitmap.set(64);
        assert_eq!(bitmap.count_ones(), 3);
    }
}
