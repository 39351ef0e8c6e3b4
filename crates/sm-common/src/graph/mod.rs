pub mod skill_graph;

pub use skill_graph::{
    GraphStatistics, MatchCandidate, MentorCandidate, ProfileSkillGraph, SimilarCandidate,
    SkillGraph, SkillRecommendation,
};

use std::collections::HashMap;

use async_trait::async_trait;
use serde_json::Value;

/// One result row from a graph query: plain key/value records.
pub type GraphRow = HashMap<String, Value>;
/// Named query parameters.
pub type GraphParams = HashMap<String, Value>;

#[derive(Debug, thiserror::Error)]
pub enum GraphStoreError {
    #[error("graph query failed: {0}")]
    Query(String),
    #[error("graph store unavailable: {0}")]
    Unavailable(String),
}

/// Pattern-matching graph store collaborator (Profile and Skill nodes joined
/// by HAS_SKILL edges). The store owns execution and numeric LIMIT coercion;
/// the engine only builds declarative traversal queries.
#[async_trait]
pub trait GraphStore: Send + Sync {
    async fn execute_read(
        &self,
        query: &str,
        params: GraphParams,
    ) -> Result<Vec<GraphRow>, GraphStoreError>;

    async fn execute_write(
        &self,
        query: &str,
        params: GraphParams,
    ) -> Result<Vec<GraphRow>, GraphStoreError>;
}
