use crate::Profile;
use crate::skill_normalizer::normalize_skill_set;

/// Cosine similarity between two embedding vectors, clamped to 0.0..=1.0.
///
/// Fails soft: mismatched lengths or a zero-magnitude vector score 0.0
/// rather than erroring, so a single malformed embedding cannot take down a
/// scoring batch. Embeddings are expected non-negative; a negative raw
/// cosine clamps to 0.0.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f64 {
    if a.len() != b.len() {
        tracing::warn!(
            a_len = a.len(),
            b_len = b.len(),
            "embedding dimension mismatch; returning zero similarity"
        );
        return 0.0;
    }
    if a.is_empty() {
        return 0.0;
    }

    let mut dot = 0.0f64;
    let mut norm_a = 0.0f64;
    let mut norm_b = 0.0f64;
    for (x, y) in a.iter().zip(b.iter()) {
        let (x, y) = (*x as f64, *y as f64);
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }

    let norm_a = norm_a.sqrt();
    let norm_b = norm_b.sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }

    (dot / (norm_a * norm_b)).clamp(0.0, 1.0)
}

/// Jaccard similarity over two name lists, deduplicated case-insensitively.
/// Two empty sets score 0.0.
pub fn jaccard_similarity(a: &[String], b: &[String]) -> f64 {
    let set_a = normalize_skill_set(a);
    let set_b = normalize_skill_set(b);

    let union = set_a.union(&set_b).count();
    if union == 0 {
        return 0.0;
    }

    set_a.intersection(&set_b).count() as f64 / union as f64
}

/// Fraction of the combined skill set that is *not* shared:
/// `(|A\B| + |B\A|) / (|A| + |B|)`. Rewards mutually exclusive skill sets;
/// 0.0 when either profile has no skills.
pub fn skill_complementarity(a: &Profile, b: &Profile) -> f64 {
    let skills_a = a.skill_name_set();
    let skills_b = b.skill_name_set();

    if skills_a.is_empty() || skills_b.is_empty() {
        return 0.0;
    }

    let a_only = skills_a.difference(&skills_b).count();
    let b_only = skills_b.difference(&skills_a).count();

    (a_only + b_only) as f64 / (skills_a.len() + skills_b.len()) as f64
}
