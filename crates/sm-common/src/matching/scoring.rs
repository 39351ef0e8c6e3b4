use serde::Serialize;

use super::similarity::{cosine_similarity, jaccard_similarity, skill_complementarity};
use super::weights::MatchWeights;
use crate::Profile;

/// Per-factor sub-scores, each in 0.0..=1.0.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoreBreakdown {
    pub embeddings: f64,
    pub complementarity: f64,
    pub overlap: f64,
    pub experience: f64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MatchScore {
    pub score: f64,
    pub breakdown: ScoreBreakdown,
}

/// Weighted hybrid score between two profiles. Never fails: missing
/// embeddings zero out that factor instead of erroring, and the final score
/// is clamped to 0.0..=1.0.
pub fn calculate_match_score(a: &Profile, b: &Profile, weights: &MatchWeights) -> MatchScore {
    let embeddings = if a.skill_embedding.is_empty() || b.skill_embedding.is_empty() {
        0.0
    } else {
        cosine_similarity(&a.skill_embedding, &b.skill_embedding)
    };

    let complementarity = skill_complementarity(a, b);

    let names_a: Vec<String> = a.skills.iter().map(|s| s.name.clone()).collect();
    let names_b: Vec<String> = b.skills.iter().map(|s| s.name.clone()).collect();
    let overlap = jaccard_similarity(&names_a, &names_b);

    // Similar experience levels collaborate better than lopsided pairs.
    let xp_a = a.xp.max(0) as f64;
    let xp_b = b.xp.max(0) as f64;
    let experience = 1.0 - (xp_a - xp_b).abs() / xp_a.max(xp_b).max(1.0);

    let breakdown = ScoreBreakdown {
        embeddings,
        complementarity,
        overlap,
        experience,
    };

    let score = (embeddings * weights.embeddings
        + complementarity * weights.complementarity
        + overlap * weights.overlap
        + experience * weights.experience)
        .clamp(0.0, 1.0);

    MatchScore { score, breakdown }
}

/// Human label for a score band, shown on match cards.
pub fn match_label(score: f64) -> &'static str {
    if score >= 0.85 {
        "Perfect Synergy"
    } else if score >= 0.70 {
        "High Compatibility"
    } else if score >= 0.50 {
        "Good Match"
    } else {
        "Potential Connect"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Skill;
    use crate::matching::weights::DEFAULT_MATCH_WEIGHTS;

    fn profile(id: &str, skills: &[&str], xp: i64) -> Profile {
        let mut profile = Profile::new(id, id);
        profile.skills = skills.iter().map(|name| Skill::named(*name)).collect();
        profile.xp = xp;
        profile
    }

    #[test]
    fn disjoint_skills_without_embeddings_score_on_complementarity() {
        let a = profile("a", &["React", "Node"], 100);
        let b = profile("b", &["Python", "Go"], 100);

        let result = calculate_match_score(&a, &b, &DEFAULT_MATCH_WEIGHTS);

        assert_eq!(result.breakdown.embeddings, 0.0);
        assert_eq!(result.breakdown.overlap, 0.0);
        assert_eq!(result.breakdown.complementarity, 1.0);
        assert_eq!(result.breakdown.experience, 1.0);
        // 0.35 * 1.0 + 0.1 * 1.0
        assert!((result.score - 0.45).abs() < 1e-9);
    }

    #[test]
    fn experience_gap_reduces_the_experience_factor() {
        let a = profile("a", &["Rust"], 100);
        let b = profile("b", &["Rust"], 200);

        let result = calculate_match_score(&a, &b, &DEFAULT_MATCH_WEIGHTS);
        assert!((result.breakdown.experience - 0.5).abs() < 1e-9);
    }

    #[test]
    fn score_stays_in_unit_interval_with_oversized_weights() {
        let a = profile("a", &["Rust"], 0);
        let b = profile("b", &["rust"], 0);
        let weights = MatchWeights {
            embeddings: 2.0,
            complementarity: 2.0,
            overlap: 2.0,
            experience: 2.0,
        };

        let result = calculate_match_score(&a, &b, &weights);
        assert!(result.score <= 1.0);
        assert!(result.score >= 0.0);
    }

    #[test]
    fn matching_embeddings_drive_the_embedding_factor() {
        let mut a = profile("a", &["Rust"], 50);
        let mut b = profile("b", &["Go"], 50);
        a.skill_embedding = vec![0.2, 0.4, 0.4];
        b.skill_embedding = vec![0.2, 0.4, 0.4];

        let result = calculate_match_score(&a, &b, &DEFAULT_MATCH_WEIGHTS);
        assert!((result.breakdown.embeddings - 1.0).abs() < 1e-9);
    }

    #[test]
    fn zero_xp_pair_counts_as_equal_experience() {
        let a = profile("a", &["Rust"], 0);
        let b = profile("b", &["Go"], 0);

        let result = calculate_match_score(&a, &b, &DEFAULT_MATCH_WEIGHTS);
        assert_eq!(result.breakdown.experience, 1.0);
    }

    #[test]
    fn labels_follow_score_bands() {
        assert_eq!(match_label(0.9), "Perfect Synergy");
        assert_eq!(match_label(0.75), "High Compatibility");
        assert_eq!(match_label(0.55), "Good Match");
        assert_eq!(match_label(0.2), "Potential Connect");
    }
}
