/// Default factor weights for the hybrid match score. Embedding similarity
/// carries the most signal when both profiles have one; complementarity is
/// deliberately weighted above raw overlap so "frontend meets backend"
/// pairings outrank near-clones.
pub const DEFAULT_MATCH_WEIGHTS: MatchWeights = MatchWeights {
    embeddings: 0.4,
    complementarity: 0.35,
    overlap: 0.15,
    experience: 0.1,
};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MatchWeights {
    pub embeddings: f64,
    pub complementarity: f64,
    pub overlap: f64,
    pub experience: f64,
}

impl Default for MatchWeights {
    fn default() -> Self {
        DEFAULT_MATCH_WEIGHTS
    }
}

impl MatchWeights {
    pub fn sum(&self) -> f64 {
        self.embeddings + self.complementarity + self.overlap + self.experience
    }

    /// Read weight overrides from `SM_MATCH_WEIGHT_*`. Callers remain
    /// responsible for keeping the sum sane; the engine does not normalize.
    pub fn from_env() -> Self {
        fn parse_weight(key: &str, default: f64) -> f64 {
            std::env::var(key)
                .ok()
                .and_then(|raw| raw.parse::<f64>().ok())
                .filter(|value| value.is_finite() && *value >= 0.0)
                .unwrap_or(default)
        }

        Self {
            embeddings: parse_weight("SM_MATCH_WEIGHT_EMBEDDINGS", DEFAULT_MATCH_WEIGHTS.embeddings),
            complementarity: parse_weight(
                "SM_MATCH_WEIGHT_COMPLEMENTARITY",
                DEFAULT_MATCH_WEIGHTS.complementarity,
            ),
            overlap: parse_weight("SM_MATCH_WEIGHT_OVERLAP", DEFAULT_MATCH_WEIGHTS.overlap),
            experience: parse_weight("SM_MATCH_WEIGHT_EXPERIENCE", DEFAULT_MATCH_WEIGHTS.experience),
        }
    }
}
