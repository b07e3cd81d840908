//! Deterministic Random Number Generator
//!
//! Every table owns one Xorshift128+ generator. All randomness in the rules
//! (dice rolls, reinforcement placement, land seeding, bot choices) draws from
//! it, so a table seeded with a fixed value replays identically in tests.

use serde::{Serialize, Deserialize};
use sha2::{Sha256, Digest};

/// Sides on a die.
pub const DIE_SIDES: u32 = 6;

/// Deterministic PRNG using Xorshift128+ algorithm.
///
/// # Example
///
/// ```
/// use qdice::core::rng::DeterministicRng;
///
/// let mut a = DeterministicRng::new(12345);
/// let mut b = DeterministicRng::new(12345);
/// assert_eq!(a.next_u64(), b.next_u64());
/// ```
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DeterministicRng {
    state: [u64; 2],
}

impl Default for DeterministicRng {
    fn default() -> Self {
        Self::new(0)
    }
}

impl DeterministicRng {
    /// Create a new RNG from a 64-bit seed.
    ///
    /// Uses SplitMix64 to initialize the internal state, ensuring
    /// good distribution even from weak seeds.
    pub fn new(seed: u64) -> Self {
        let mut s = seed;
        let state0 = splitmix64(&mut s);
        let state1 = splitmix64(&mut s);

        // Ensure state is never all zeros
        let state = if state0 == 0 && state1 == 0 {
            [1, 1]
        } else {
            [state0, state1]
        };

        Self { state }
    }

    /// Create the RNG for a table from its tag and a process-level salt.
    pub fn for_table(tag: &str, salt: u64) -> Self {
        Self::new(derive_table_seed(tag, salt))
    }

    /// Generate the next 64-bit random value.
    #[inline]
    pub fn next_u64(&mut self) -> u64 {
        let s0 = self.state[0];
        let mut s1 = self.state[1];
        let result = s0.wrapping_add(s1);

        s1 ^= s0;
        self.state[0] = s0.rotate_left(24) ^ s1 ^ (s1 << 16);
        self.state[1] = s1.rotate_left(37);

        result
    }

    /// Generate a random integer in range [0, max).
    #[inline]
    pub fn next_int(&mut self, max: u32) -> u32 {
        if max == 0 {
            return 0;
        }
        (self.next_u64() % max as u64) as u32
    }

    /// Generate a random integer in range [min, max].
    #[inline]
    pub fn next_int_range(&mut self, min: i32, max: i32) -> i32 {
        if min >= max {
            return min;
        }
        let range = (max - min + 1) as u32;
        min + self.next_int(range) as i32
    }

    /// Uniform value in [0, 1).
    #[inline]
    pub fn next_unit(&mut self) -> f64 {
        // 53 random mantissa bits
        (self.next_u64() >> 11) as f64 / (1u64 << 53) as f64
    }

    /// Percentile roll in [0, 100).
    #[inline]
    pub fn percent(&mut self) -> u32 {
        self.next_int(100)
    }

    /// Roll one six-sided die.
    #[inline]
    pub fn roll_die(&mut self) -> u8 {
        (self.next_int(DIE_SIDES) + 1) as u8
    }

    /// Roll `count` dice.
    pub fn roll_dice(&mut self, count: u8) -> Vec<u8> {
        (0..count).map(|_| self.roll_die()).collect()
    }

    /// Shuffle a slice in place using Fisher-Yates algorithm.
    pub fn shuffle<T>(&mut self, slice: &mut [T]) {
        let len = slice.len();
        for i in (1..len).rev() {
            let j = self.next_int((i + 1) as u32) as usize;
            slice.swap(i, j);
        }
    }

    /// Select a random element from a slice.
    pub fn choose<'a, T>(&mut self, slice: &'a [T]) -> Option<&'a T> {
        if slice.is_empty() {
            None
        } else {
            let idx = self.next_int(slice.len() as u32) as usize;
            Some(&slice[idx])
        }
    }

    /// Sixteen random bytes, used for game ids.
    pub fn next_bytes16(&mut self) -> [u8; 16] {
        let mut out = [0u8; 16];
        out[..8].copy_from_slice(&self.next_u64().to_le_bytes());
        out[8..].copy_from_slice(&self.next_u64().to_le_bytes());
        out
    }

    /// Get current state (for checkpointing/debugging).
    pub fn state(&self) -> [u64; 2] {
        self.state
    }

    /// Restore from saved state.
    pub fn set_state(&mut self, state: [u64; 2]) {
        self.state = state;
    }
}

/// SplitMix64 for seed initialization.
#[inline]
fn splitmix64(state: &mut u64) -> u64 {
    *state = state.wrapping_add(0x9E3779B97F4A7C15);
    let mut z = *state;
    z = (z ^ (z >> 30)).wrapping_mul(0xBF58476D1CE4E5B9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94D049BB133111EB);
    z ^ (z >> 31)
}

/// Derive a table seed from its tag and a salt.
///
/// Tables with different tags never share a dice sequence, and the same
/// (tag, salt) pair always yields the same seed.
pub fn derive_table_seed(tag: &str, salt: u64) -> u64 {
    let mut hasher = Sha256::new();
    hasher.update(b"QDICE_TABLE_SEED_V1");
    hasher.update(tag.as_bytes());
    hasher.update(salt.to_le_bytes());
    let hash = hasher.finalize();

    let mut seed = [0u8; 8];
    seed.copy_from_slice(&hash[0..8]);
    u64::from_le_bytes(seed)
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rng_determinism() {
        let mut rng1 = DeterministicRng::new(12345);
        let mut rng2 = DeterministicRng::new(12345);

        for _ in 0..1000 {
            assert_eq!(rng1.next_u64(), rng2.next_u64());
        }
    }

    #[test]
    fn test_rng_different_seeds() {
        let mut rng1 = DeterministicRng::new(12345);
        let mut rng2 = DeterministicRng::new(54321);
        assert_ne!(rng1.next_u64(), rng2.next_u64());
    }

    #[test]
    fn test_roll_die_range() {
        let mut rng = DeterministicRng::new(7);
        let mut seen = [false; 6];
        for _ in 0..1000 {
            let d = rng.roll_die();
            assert!((1..=6).contains(&d));
            seen[(d - 1) as usize] = true;
        }
        assert!(seen.iter().all(|s| *s));
    }

    #[test]
    fn test_next_int_range() {
        let mut rng = DeterministicRng::new(5678);

        for _ in 0..1000 {
            let val = rng.next_int_range(-10, 10);
            assert!((-10..=10).contains(&val));
        }
        assert_eq!(rng.next_int_range(5, 5), 5);
        assert_eq!(rng.next_int(0), 0);
    }

    #[test]
    fn test_next_unit_bounds() {
        let mut rng = DeterministicRng::new(99);
        for _ in 0..1000 {
            let v = rng.next_unit();
            assert!((0.0..1.0).contains(&v));
        }
    }

    #[test]
    fn test_shuffle_is_permutation() {
        let mut rng = DeterministicRng::new(1111);
        let mut arr = [1, 2, 3, 4, 5, 6, 7, 8, 9, 10];
        rng.shuffle(&mut arr);
        let mut sorted = arr;
        sorted.sort();
        assert_eq!(sorted, [1, 2, 3, 4, 5, 6, 7, 8, 9, 10]);
    }

    #[test]
    fn test_table_seed_depends_on_tag() {
        assert_eq!(derive_table_seed("Planeta", 1), derive_table_seed("Planeta", 1));
        assert_ne!(derive_table_seed("Planeta", 1), derive_table_seed("Melchor", 1));
        assert_ne!(derive_table_seed("Planeta", 1), derive_table_seed("Planeta", 2));
    }

    #[test]
    fn test_state_checkpoint() {
        let mut rng = DeterministicRng::new(5555);
        rng.next_u64();
        let saved = rng.state();
        let a = rng.next_u64();
        rng.set_state(saved);
        assert_eq!(rng.next_u64(), a);
    }
}
