//! Deterministic bag-of-trigrams embedding.
//!
//! Good enough to make "kr 81 55 30" and "carrera 81 # 55-30" land near each
//! other once both are normalised, and fully offline. Production deployments
//! swap in a model-backed provider.

use std::collections::hash_map::DefaultHasher;
use std::collections::HashSet;
use std::hash::{Hash, Hasher};

pub const DEFAULT_HASH_DIM: usize = 256;

fn bucket<T: Hash + ?Sized>(value: &T, dim: usize) -> usize {
    let mut hasher = DefaultHasher::new();
    value.hash(&mut hasher);
    (hasher.finish() as usize) % dim
}

pub(crate) fn trigrams(s: &str) -> HashSet<String> {
    let padded = format!("  {}  ", s);
    let chars: Vec<char> = padded.chars().collect();
    chars.windows(3).map(|w| w.iter().collect::<String>()).collect()
}

/// Unit-length vector of hashed trigrams plus double-weighted whole words.
/// Digit-bearing words get extra weight so address numbers dominate.
pub fn hash_text_to_vector(text: &str, dim: usize) -> Vec<f32> {
    let mut vector = vec![0.0f32; dim.max(1)];
    let dim = vector.len();
    let normalized = text.to_lowercase();

    for trigram in trigrams(&normalized) {
        vector[bucket(trigram.as_str(), dim)] += 1.0;
    }

    for word in normalized.split_whitespace() {
        let weight = if word.chars().any(|c| c.is_ascii_digit()) { 3.0 } else { 2.0 };
        vector[bucket(word, dim)] += weight;
    }

    normalize(&mut vector);
    vector
}

pub fn normalize(vector: &mut [f32]) {
    let magnitude: f32 = vector.iter().map(|x| x * x).sum::<f32>().sqrt();
    if magnitude > 0.0 {
        for v in vector.iter_mut() {
            *v /= magnitude;
        }
    }
}

/// Cosine similarity mapped into [0, 1].
pub fn cosine_score(a: &[f32], b: &[f32]) -> f32 {
    let len = a.len().min(b.len());
    let mut dot = 0.0f32;
    let mut na = 0.0f32;
    let mut nb = 0.0f32;
    for i in 0..len {
        dot += a[i] * b[i];
        na += a[i] * a[i];
        nb += b[i] * b[i];
    }
    if na == 0.0 || nb == 0.0 {
        return 0.0;
    }
    let cos = dot / (na.sqrt() * nb.sqrt());
    ((cos + 1.0) / 2.0).clamp(0.0, 1.0)
}
