//! Growable bitset for per-atom symmetry membership
//!
//! Each atom records which symmetry operation/cell produced or coincides
//! with its position as one bit per (cell, operation) pair. The number of
//! operations is not known when atoms are created, so the set grows on
//! demand.

/// A growable set of bits backed by 64-bit words.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BitSet {
    words: Vec<u64>,
}

impl BitSet {
    /// Create an empty bitset
    pub fn new() -> Self {
        BitSet { words: Vec::new() }
    }

    /// Create a bitset with capacity for at least `bits` bits
    pub fn with_capacity(bits: usize) -> Self {
        BitSet {
            words: Vec::with_capacity(bits.div_ceil(64)),
        }
    }

    /// Set bit `index`, growing the backing store if needed
    pub fn set(&mut self, index: usize) {
        let word = index / 64;
        if word >= self.words.len() {
            self.words.resize(word + 1, 0);
        }
        self.words[word] |= 1u64 << (index % 64);
    }

    /// Clear bit `index` (no-op if beyond the current capacity)
    pub fn clear(&mut self, index: usize) {
        let word = index / 64;
        if word < self.words.len() {
            self.words[word] &= !(1u64 << (index % 64));
        }
    }

    /// Test bit `index`
    pub fn get(&self, index: usize) -> bool {
        let word = index / 64;
        word < self.words.len() && self.words[word] & (1u64 << (index % 64)) != 0
    }

    /// Merge another bitset into this one (bitwise or)
    pub fn or_with(&mut self, other: &BitSet) {
        if other.words.len() > self.words.len() {
            self.words.resize(other.words.len(), 0);
        }
        for (w, o) in self.words.iter_mut().zip(other.words.iter()) {
            *w |= *o;
        }
    }

    /// Number of set bits
    pub fn cardinality(&self) -> usize {
        self.words.iter().map(|w| w.count_ones() as usize).sum()
    }

    /// True if no bit is set
    pub fn is_empty(&self) -> bool {
        self.words.iter().all(|w| *w == 0)
    }

    /// Iterate the indices of set bits in ascending order
    pub fn iter(&self) -> impl Iterator<Item = usize> + '_ {
        self.words.iter().enumerate().flat_map(|(wi, w)| {
            (0..64).filter_map(move |bi| {
                if w & (1u64 << bi) != 0 {
                    Some(wi * 64 + bi)
                } else {
                    None
                }
            })
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_set_get() {
        let mut bs = BitSet::new();
        assert!(!bs.get(0));
        bs.set(0);
        bs.set(67);
        assert!(bs.get(0));
        assert!(bs.get(67));
        assert!(!bs.get(66));
        assert_eq!(bs.cardinality(), 2);
    }

    #[test]
    fn test_clear() {
        let mut bs = BitSet::new();
        bs.set(5);
        bs.clear(5);
        assert!(!bs.get(5));
        assert!(bs.is_empty());
        // Clearing far past the end must not grow or panic
        bs.clear(1000);
    }

    #[test]
    fn test_or_with() {
        let mut a = BitSet::new();
        a.set(1);
        let mut b = BitSet::new();
        b.set(130);
        a.or_with(&b);
        assert!(a.get(1));
        assert!(a.get(130));
    }

    #[test]
    fn test_iter() {
        let mut bs = BitSet::new();
        bs.set(3);
        bs.set(64);
        bs.set(65);
        let indices: Vec<usize> = bs.iter().collect();
        assert_eq!(indices, vec![3, 64, 65]);
    }
}
