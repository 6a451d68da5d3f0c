// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Key hashing for partition routing.

/// Signed 32-bit hash of an encoded key.
///
/// Any `Fn(&[u8]) -> i32` is a `KeyHasher`, which keeps tests able to pin
/// the routing of each key.
pub trait KeyHasher {
    fn hash_key(&self, key: &[u8]) -> i32;
}

/// `h = 31 * h + b` over the key bytes with wrapping arithmetic.
///
/// For ASCII keys this equals the managed runtime's string hash, so routing
/// matches what the producing side computes.
#[derive(Debug, Clone, Copy, Default)]
pub struct JavaStringHash;

impl KeyHasher for JavaStringHash {
    fn hash_key(&self, key: &[u8]) -> i32 {
        key.iter()
            .fold(0i32, |h, &b| h.wrapping_mul(31).wrapping_add(i32::from(b)))
    }
}

impl<F> KeyHasher for F
where
    F: Fn(&[u8]) -> i32,
{
    fn hash_key(&self, key: &[u8]) -> i32 {
        self(key)
    }
}

/// Map a signed hash onto `0..count`, negative hashes included.
pub fn route(hash: i32, count: usize) -> usize {
    let count = count as i64;
    let mut pid = i64::from(hash) % count;
    if pid < 0 {
        pid += count;
    }
    pid as usize
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_java_string_hash_values() {
        assert_eq!(JavaStringHash.hash_key(b""), 0);
        assert_eq!(JavaStringHash.hash_key(b"a"), 97);
        assert_eq!(JavaStringHash.hash_key(b"hello"), 99_162_322);
        // Overflows and wraps negative.
        assert_eq!(JavaStringHash.hash_key(b"polygenelubricants"), i32::MIN);
    }

    #[test]
    fn test_route_normalizes_negative() {
        assert_eq!(route(7, 4), 3);
        assert_eq!(route(-7, 4), 1);
        assert_eq!(route(-8, 4), 0);
        assert_eq!(route(i32::MIN, 3), 1);
    }

    #[test]
    fn test_closure_is_a_hasher() {
        let fixed = |_: &[u8]| -5;
        assert_eq!(fixed.hash_key(b"anything"), -5);
    }
}
