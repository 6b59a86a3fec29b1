//! Seeded single-cycle permutations.

use rand::{Rng, SeedableRng};
use rand_xoshiro::Xoshiro256PlusPlus;

/// A permutation of `0..len` forming one cycle through every index.
///
/// Built with Sattolo's algorithm from a fixed seed, so a given seed always
/// produces the same table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Permutation {
    successors: Vec<u32>,
}

impl Permutation {
    /// Generate a cyclic permutation of `len` indices.
    pub fn cyclic(len: usize, seed: u64) -> Self {
        let mut rng = Xoshiro256PlusPlus::seed_from_u64(seed);
        let mut successors: Vec<u32> = (0..len as u32).collect();

        for i in (1..len).rev() {
            let j = rng.random_range(0..i);
            successors.swap(i, j);
        }

        Self { successors }
    }

    /// Index that follows `index` in the cycle.
    #[inline]
    pub fn successor(&self, index: usize) -> usize {
        self.successors[index] as usize
    }

    /// Number of indices.
    pub fn len(&self) -> usize {
        self.successors.len()
    }

    /// Whether the permutation is empty.
    pub fn is_empty(&self) -> bool {
        self.successors.is_empty()
    }

    /// Length of the cycle containing index 0.
    pub fn cycle_len(&self) -> usize {
        if self.is_empty() {
            return 0;
        }
        let mut steps = 1;
        let mut next = self.successor(0);
        while next != 0 && steps <= self.len() {
            next = self.successor(next);
            steps += 1;
        }
        steps
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_cycle() {
        for len in [1, 2, 3, 17, 2048] {
            let perm = Permutation::cyclic(len, 7);
            assert_eq!(perm.len(), len);
            assert_eq!(perm.cycle_len(), len, "len={}", len);
        }
    }

    #[test]
    fn test_is_permutation() {
        let perm = Permutation::cyclic(2048, 42);
        let mut seen = vec![false; perm.len()];
        for i in 0..perm.len() {
            let s = perm.successor(i);
            assert!(!seen[s], "duplicate successor {}", s);
            seen[s] = true;
        }
        assert!(seen.iter().all(|&s| s));
    }

    #[test]
    fn test_no_fixed_points() {
        let perm = Permutation::cyclic(512, 3);
        for i in 0..perm.len() {
            assert_ne!(perm.successor(i), i);
        }
    }

    #[test]
    fn test_seed_reproducible() {
        assert_eq!(Permutation::cyclic(2048, 9), Permutation::cyclic(2048, 9));
        assert_ne!(Permutation::cyclic(2048, 9), Permutation::cyclic(2048, 10));
    }

    #[test]
    fn test_empty() {
        let perm = Permutation::cyclic(0, 1);
        assert!(perm.is_empty());
        assert_eq!(perm.cycle_len(), 0);
    }
}
