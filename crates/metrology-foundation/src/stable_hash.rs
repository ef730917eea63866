//! Stable hashing for resolution fingerprints.
//!
//! Downstream caching compares the output of two resolution passes by
//! fingerprint, so the hash must be identical across processes, platforms
//! and releases. `std`'s `DefaultHasher` guarantees none of that; these
//! helpers implement 64-bit FNV-1a instead.
//!
//! NOTE: FNV-1a is **not** cryptographically secure.

use std::hash::Hasher;

/// 64-bit FNV-1a offset basis.
pub const FNV1A_OFFSET_BASIS_64: u64 = 0xcbf29ce484222325;
/// 64-bit FNV-1a prime.
pub const FNV1A_PRIME_64: u64 = 0x0000_0100_0000_01B3;

/// Mix bytes into an existing FNV-1a 64-bit hash state.
///
/// # Example
/// ```
/// use metrology_foundation::stable_hash::{fnv1a64, fnv1a64_mix, FNV1A_OFFSET_BASIS_64};
///
/// let hash = fnv1a64_mix(FNV1A_OFFSET_BASIS_64, b"Metre");
/// let hash = fnv1a64_mix(hash, b"Second");
/// assert_eq!(hash, fnv1a64(b"MetreSecond"));
/// ```
#[inline]
pub const fn fnv1a64_mix(mut hash: u64, bytes: &[u8]) -> u64 {
    let mut i = 0usize;
    while i < bytes.len() {
        hash ^= bytes[i] as u64;
        hash = hash.wrapping_mul(FNV1A_PRIME_64);
        i += 1;
    }
    hash
}

/// Hash an arbitrary byte slice with FNV-1a 64-bit.
#[inline]
pub const fn fnv1a64(bytes: &[u8]) -> u64 {
    fnv1a64_mix(FNV1A_OFFSET_BASIS_64, bytes)
}

/// Hash a UTF-8 string with FNV-1a 64-bit.
#[inline]
pub const fn fnv1a64_str(s: &str) -> u64 {
    fnv1a64(s.as_bytes())
}

/// Incremental FNV-1a hasher.
///
/// Implements [`Hasher`] so it can be fed through `Hash` impls, but callers
/// that need cross-platform stability should feed explicit bytes: `Hash`
/// impls for `usize` depend on the target's pointer width.
#[derive(Debug, Clone, Copy)]
pub struct StableHasher {
    state: u64,
}

impl StableHasher {
    /// Starts a fresh hash.
    pub const fn new() -> Self {
        Self {
            state: FNV1A_OFFSET_BASIS_64,
        }
    }

    /// Mixes a string, followed by a `0xff` terminator so that
    /// `("ab", "c")` and `("a", "bc")` hash differently.
    pub fn write_str(&mut self, s: &str) {
        self.state = fnv1a64_mix(self.state, s.as_bytes());
        self.state = fnv1a64_mix(self.state, &[0xff]);
    }

    /// Current hash value.
    pub const fn value(&self) -> u64 {
        self.state
    }
}

impl Default for StableHasher {
    fn default() -> Self {
        Self::new()
    }
}

impl Hasher for StableHasher {
    fn finish(&self) -> u64 {
        self.state
    }

    fn write(&mut self, bytes: &[u8]) {
        self.state = fnv1a64_mix(self.state, bytes);
    }
}
