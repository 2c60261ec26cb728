//! Hashing-trick projection of tokens onto a fixed number of slots.

use blake2::digest::consts::U8;
use blake2::{Blake2b, Digest};

/// BLAKE2b parameterized for an 8-byte digest (not a truncated 64-byte one).
type Blake2b64 = Blake2b<U8>;

/// Stable 64-bit digest of a token's UTF-8 bytes, read little-endian.
pub fn token_digest(token: &str) -> u64 {
    let digest = Blake2b64::digest(token.as_bytes());
    let mut bytes = [0u8; 8];
    bytes.copy_from_slice(&digest);
    u64::from_le_bytes(bytes)
}

/// Slot index a token accumulates into for a `dim`-wide vector.
///
/// `dim` must be positive; callers go through [`crate::EmbeddingConfig`].
pub fn slot(token: &str, dim: usize) -> usize {
    (token_digest(token) % dim as u64) as usize
}

/// Term-frequency vector of `tokens` under hashed dimensionality reduction.
///
/// Each token adds `1.0` to its slot; distinct tokens that collide share a
/// slot. No tokens (or `dim == 0`) yields the zero vector.
pub fn hash_features<I, T>(tokens: I, dim: usize) -> Vec<f32>
where
    I: IntoIterator<Item = T>,
    T: AsRef<str>,
{
    let mut vector = vec![0.0f32; dim];
    if dim == 0 {
        return vector;
    }
    for token in tokens {
        vector[slot(token.as_ref(), dim)] += 1.0;
    }
    vector
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn digest_is_pinned() {
        // Changing these values invalidates every stored vector.
        assert_eq!(token_digest("hello"), 9_022_087_748_821_825_191);
        assert_eq!(token_digest("rust"), 12_670_075_210_618_624_892);
        assert_eq!(slot("hello", 384), 39);
        assert_eq!(slot("rust", 384), 380);
    }

    #[test]
    fn repeated_token_doubles_its_slot() {
        let once = hash_features(["x"], 384);
        let twice = hash_features(["x", "x"], 384);
        let idx = slot("x", 384);
        assert_eq!(once[idx], 1.0);
        assert_eq!(twice[idx], 2.0 * once[idx]);
        assert_eq!(twice.iter().sum::<f32>(), 2.0);
    }

    #[test]
    fn colliding_tokens_share_a_slot() {
        // "programming" and "cooking" both land in slot 252 at dim 384.
        assert_eq!(slot("programming", 384), slot("cooking", 384));
        let vector = hash_features(["programming", "cooking"], 384);
        assert_eq!(vector[252], 2.0);
    }

    #[test]
    fn empty_tokens_give_zero_vector() {
        let vector = hash_features(Vec::<String>::new(), 16);
        assert_eq!(vector.len(), 16);
        assert!(vector.iter().all(|v| *v == 0.0));
    }
}
