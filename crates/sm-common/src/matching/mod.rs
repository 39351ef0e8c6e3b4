pub mod pipeline;
pub mod scoring;
pub mod similarity;
pub mod weights;

pub use pipeline::{
    MatchEngine, MatchError, MatchMode, MatchOptions, MatchResult, MatchStatsSummary, MatchedUser,
    SimilarUser,
};
pub use scoring::{MatchScore, ScoreBreakdown, calculate_match_score, match_label};
pub use similarity::{cosine_similarity, jaccard_similarity, skill_complementarity};
pub use weights::{DEFAULT_MATCH_WEIGHTS, MatchWeights};
