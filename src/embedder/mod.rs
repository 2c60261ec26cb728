//! Deterministic, model-free text embeddings.
//!
//! Text is tokenized by character class, projected onto `dim` slots with the
//! hashing trick and L2-normalized. The result depends only on the text and
//! `dim`, so vectors stored years ago stay comparable with freshly computed
//! query vectors as long as [`EMBEDDING_VERSION`] is unchanged.

pub mod hasher;
pub mod normalize;
pub mod tokenizer;

use crate::config::EmbeddingConfig;

pub use hasher::{hash_features, slot, token_digest};
pub use normalize::{is_zero, l2_norm, normalize};
pub use tokenizer::tokenize;

/// Version of the tokenizer + digest + normalization recipe.
///
/// Bump whenever any of them changes; stored vectors from another version are
/// not comparable and need a full reindex.
pub const EMBEDDING_VERSION: u32 = 1;

/// Embeds `text` into a `dim`-wide unit vector (or the zero vector when no
/// tokens survive tokenization).
pub fn embed(text: &str, dim: usize) -> Vec<f32> {
    normalize(hash_features(tokenize(text), dim))
}

/// Embedding function bound to a validated dimension.
///
/// Cheap to copy and safe to share across threads; it carries no state beyond
/// the dimension.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Embedder {
    dim: usize,
}

impl Embedder {
    /// Builds an embedder for the configured dimension.
    pub fn new(config: &EmbeddingConfig) -> Self {
        Self { dim: config.dim() }
    }

    /// Output dimension.
    pub fn dim(&self) -> usize {
        self.dim
    }

    /// Embeds arbitrary text. Never fails.
    pub fn embed(&self, text: &str) -> Vec<f32> {
        embed(text, self.dim)
    }
}

impl Default for Embedder {
    fn default() -> Self {
        Self::new(&EmbeddingConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DEFAULT_EMBEDDING_DIM;

    #[test]
    fn embedding_is_deterministic() {
        let embedder = Embedder::default();
        let text = "Tokio runtime internals\nwork stealing schedulers";
        assert_eq!(embedder.embed(text), embedder.embed(text));
    }

    #[test]
    fn dimension_is_respected() {
        for dim in [1, 13, 384, 1024] {
            assert_eq!(embed("x y z", dim).len(), dim);
            assert_eq!(embed("", dim).len(), dim);
        }
        assert_eq!(Embedder::default().embed("x").len(), DEFAULT_EMBEDDING_DIM);
    }

    #[test]
    fn non_empty_text_has_unit_norm() {
        for text in ["a", "rust rust rust", "東京 タワー", "mixed CASE words_1 2 3"] {
            let norm = l2_norm(&embed(text, 384));
            assert!((norm - 1.0).abs() < 1e-5, "{text}: norm {norm}");
        }
    }

    #[test]
    fn token_free_text_is_zero_vector() {
        for text in ["", "   ", "!!! ??? ...", "ñ é ü"] {
            assert!(is_zero(&embed(text, 384)), "{text:?}");
        }
    }

    #[test]
    fn case_insensitive() {
        let lower = embed("hello", 384);
        assert_eq!(embed("Hello", 384), lower);
        assert_eq!(embed("HELLO", 384), lower);
    }

    #[test]
    fn single_token_is_one_hot() {
        let v = embed("hello", 384);
        assert_eq!(v[39], 1.0);
        assert_eq!(v.iter().filter(|x| **x != 0.0).count(), 1);
    }

    #[test]
    fn identical_text_gives_bit_identical_vectors() {
        let a = embed("rust systems programming", 384);
        let b = embed("rust systems programming", 384);
        let bits = |v: &[f32]| v.iter().map(|x| x.to_bits()).collect::<Vec<_>>();
        assert_eq!(bits(&a), bits(&b));
    }

    #[test]
    fn parallel_callers_agree() {
        let expected = embed("concurrent embedding", 384);
        let handles: Vec<_> = (0..4)
            .map(|_| std::thread::spawn(|| embed("concurrent embedding", 384)))
            .collect();
        for handle in handles {
            assert_eq!(handle.join().expect("thread"), expected);
        }
    }
}
