//! Vector utilities for the document index.
//!
//! Pure-Rust implementations of:
//! - Text embedding via feature hashing over normalized word tokens
//! - Cosine similarity

/// Dimensions of the hashed embedding space.
pub const DEFAULT_DIMENSIONS: usize = 1024;

/// Words that carry no retrieval signal on their own.
const STOPWORDS: &[&str] = &[
    "a", "about", "an", "and", "any", "are", "at", "be", "can", "do", "does", "for", "from", "have",
    "how", "i", "in", "is", "it", "me", "my", "of", "on", "or", "some", "tell", "that", "the",
    "their", "there", "they", "this", "to", "was", "what", "when", "where", "which", "who", "with",
    "you", "your",
];

/// Split text into lowercase alphanumeric tokens, dropping stopwords and
/// folding simple plurals ("kebabs" → "kebab").
pub fn tokenize(text: &str) -> Vec<String> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
        .map(str::to_lowercase)
        .filter(|t| !STOPWORDS.contains(&t.as_str()))
        .map(|t| {
            if t.chars().count() > 3 && t.ends_with('s') && !t.ends_with("ss") {
                t[..t.len() - 1].to_string()
            } else {
                t
            }
        })
        .collect()
}

/// FNV-1a, stable across runs and platforms.
fn hash_token(token: &str) -> u64 {
    const OFFSET: u64 = 0xcbf2_9ce4_8422_2325;
    const PRIME: u64 = 0x0000_0100_0000_01b3;
    token
        .bytes()
        .fold(OFFSET, |h, b| (h ^ b as u64).wrapping_mul(PRIME))
}

/// Embed `text` as an L2-normalized term-frequency vector of `dims` buckets.
///
/// Text with no content tokens embeds to the zero vector.
pub fn embed(text: &str, dims: usize) -> Vec<f32> {
    let mut v = vec![0.0f32; dims.max(1)];
    for token in tokenize(text) {
        let bucket = (hash_token(&token) % v.len() as u64) as usize;
        v[bucket] += 1.0;
    }

    let norm = v.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm > 0.0 {
        v.iter_mut().for_each(|x| *x /= norm);
    }
    v
}

/// Compute cosine similarity between two vectors.
///
/// Returns a value in [-1, 1] where 1 = identical, 0 = orthogonal, -1 = opposite.
/// Returns 0.0 if either vector is zero or the lengths differ.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let mut dot = 0.0f64;
    let mut norm_a = 0.0f64;
    let mut norm_b = 0.0f64;

    for (x, y) in a.iter().zip(b.iter()) {
        let x = *x as f64;
        let y = *y as f64;
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }

    let denom = norm_a.sqrt() * norm_b.sqrt();
    if denom < 1e-10 {
        return 0.0;
    }

    (dot / denom) as f32
}
