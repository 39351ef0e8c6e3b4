use std::cmp::Ordering;
use std::sync::Arc;

use chrono::Utc;
use serde::Serialize;
use tokio::task::JoinSet;
use tracing::{debug, instrument, warn};

use super::scoring::{ScoreBreakdown, calculate_match_score, match_label};
use super::weights::MatchWeights;
use crate::graph::{MatchCandidate, SkillGraph};
use crate::store::{ProfileStore, ProfileStoreError};
use crate::{MatchHistoryEntry, MatchStatus, Profile, Skill};

const MAX_MATCH_LIMIT: usize = 50;
const MAX_MESSAGE_LEN: usize = 500;
/// Over-fetch factor so downstream filtering still leaves enough matches.
const CANDIDATE_FETCH_FACTOR: usize = 3;

#[derive(Debug, thiserror::Error)]
pub enum MatchError {
    #[error("validation failed: {0}")]
    Validation(String),
    #[error("not found: {0}")]
    NotFound(String),
    #[error(transparent)]
    Store(#[from] ProfileStoreError),
}

/// Which graph traversal seeds the candidate pool.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum MatchMode {
    /// Complementary skill sets (frontend meets backend).
    #[default]
    Project,
    /// Advanced/expert holders of skills the requester is learning.
    Mentorship,
    /// Similar skill sets.
    Peer,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MatchOptions {
    pub limit: usize,
    pub min_score: f64,
    pub include_inactive: bool,
    pub mode: MatchMode,
}

impl Default for MatchOptions {
    fn default() -> Self {
        Self {
            limit: 10,
            min_score: 0.3,
            include_inactive: false,
            mode: MatchMode::Project,
        }
    }
}

/// Trimmed candidate view returned on match cards; never exposes the
/// candidate's own match history.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchedUser {
    pub id: String,
    pub username: String,
    pub skills: Vec<Skill>,
    pub xp: i64,
    pub level: u32,
}

impl From<&Profile> for MatchedUser {
    fn from(profile: &Profile) -> Self {
        Self {
            id: profile.id.clone(),
            username: profile.username.clone(),
            skills: profile.skills.clone(),
            xp: profile.xp,
            level: profile.level(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchResult {
    pub user: MatchedUser,
    pub score: f64,
    pub breakdown: ScoreBreakdown,
    pub complementary_skills: Vec<String>,
    pub common_skills: Vec<String>,
    pub label: &'static str,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SimilarUser {
    pub user: MatchedUser,
    pub common_skill_count: u32,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchStatsSummary {
    pub total: usize,
    pub pending: usize,
    pub accepted: usize,
    pub completed: usize,
    pub average_score: f64,
}

/// Top-level matching entry point: graph candidate generation, concurrent
/// profile hydration and scoring, and match-history bookkeeping.
#[derive(Clone)]
pub struct MatchEngine {
    profiles: Arc<dyn ProfileStore>,
    graph: SkillGraph,
    weights: MatchWeights,
}

impl MatchEngine {
    pub fn new(profiles: Arc<dyn ProfileStore>, graph: SkillGraph) -> Self {
        Self::with_weights(profiles, graph, MatchWeights::default())
    }

    pub fn with_weights(
        profiles: Arc<dyn ProfileStore>,
        graph: SkillGraph,
        weights: MatchWeights,
    ) -> Self {
        Self {
            profiles,
            graph,
            weights,
        }
    }

    /// Ranked, deduplicated matches for a requester.
    ///
    /// Candidate generation failures degrade to an empty pool, and each
    /// candidate is hydrated and scored independently: one broken candidate
    /// never fails the batch. Only a missing or invalid requester surfaces
    /// as an error.
    #[instrument(skip(self, options), fields(mode = ?options.mode))]
    pub async fn find_matches(
        &self,
        user_id: &str,
        options: MatchOptions,
    ) -> Result<Vec<MatchResult>, MatchError> {
        let user_id = validated_id(user_id, "user id")?;
        let limit = options.limit.clamp(1, MAX_MATCH_LIMIT);

        let requester = self
            .profiles
            .fetch_profile(user_id)
            .await?
            .ok_or_else(|| MatchError::NotFound(format!("profile {user_id}")))?;

        // Absence of data is not a failure.
        if requester.skills.is_empty() {
            return Ok(Vec::new());
        }

        let candidates = self
            .generate_candidates(user_id, limit * CANDIDATE_FETCH_FACTOR, options.mode)
            .await;
        if candidates.is_empty() {
            debug!(user_id, "no graph candidates");
            return Ok(Vec::new());
        }

        let requester = Arc::new(requester);
        let mut tasks = JoinSet::new();
        for candidate in candidates {
            let store = Arc::clone(&self.profiles);
            let requester = Arc::clone(&requester);
            let weights = self.weights;
            tasks.spawn(async move {
                score_candidate(store, requester, candidate, weights, options).await
            });
        }

        let mut matches = Vec::new();
        while let Some(outcome) = tasks.join_next().await {
            match outcome {
                Ok(Some(result)) => matches.push(result),
                Ok(None) => {}
                Err(err) => warn!(error = %err, "candidate scoring task failed; dropped"),
            }
        }

        matches.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(Ordering::Equal));
        matches.truncate(limit);
        Ok(matches)
    }

    /// Record a pending match request from one profile to another, with a
    /// score snapshot taken at request time.
    #[instrument(skip(self, message))]
    pub async fn request_match(
        &self,
        from_id: &str,
        to_id: &str,
        message: &str,
    ) -> Result<MatchHistoryEntry, MatchError> {
        let from_id = validated_id(from_id, "requester id")?;
        let to_id = validated_id(to_id, "target id")?;
        if from_id == to_id {
            return Err(MatchError::Validation("cannot match with yourself".into()));
        }

        let (from_profile, to_profile) = tokio::try_join!(
            self.profiles.fetch_profile(from_id),
            self.profiles.fetch_profile(to_id)
        )?;
        let mut from_profile =
            from_profile.ok_or_else(|| MatchError::NotFound(format!("profile {from_id}")))?;
        let to_profile =
            to_profile.ok_or_else(|| MatchError::NotFound(format!("profile {to_id}")))?;

        if from_profile.has_pending_match_with(to_id) {
            return Err(MatchError::Validation(
                "match request already pending".into(),
            ));
        }
        if !to_profile.is_active {
            return Err(MatchError::Validation("target profile is inactive".into()));
        }

        let snapshot = calculate_match_score(&from_profile, &to_profile, &self.weights);
        let message: String = message.trim().chars().take(MAX_MESSAGE_LEN).collect();

        let entry = MatchHistoryEntry {
            matched_user_id: to_id.to_string(),
            match_score: snapshot.score,
            status: MatchStatus::Pending,
            message: (!message.is_empty()).then_some(message),
            matched_at: Utc::now(),
        };

        from_profile.match_history.push(entry.clone());
        from_profile.statistics.total_matches += 1;
        self.profiles.save_profile(&from_profile).await?;

        Ok(entry)
    }

    /// Resolve a match request. Only `accepted`, `rejected` and `completed`
    /// are accepted; completion bumps the success counter.
    #[instrument(skip(self))]
    pub async fn update_match_status(
        &self,
        user_id: &str,
        target_id: &str,
        status: MatchStatus,
    ) -> Result<MatchHistoryEntry, MatchError> {
        let user_id = validated_id(user_id, "user id")?;
        let target_id = validated_id(target_id, "target id")?;
        if status == MatchStatus::Pending {
            return Err(MatchError::Validation("invalid status: pending".into()));
        }

        let mut profile = self
            .profiles
            .fetch_profile(user_id)
            .await?
            .ok_or_else(|| MatchError::NotFound(format!("profile {user_id}")))?;

        // Most recent entry for the pair wins; pairs carry at most one
        // pending entry, so this is the one being resolved.
        let entry = profile
            .match_history
            .iter_mut()
            .rev()
            .find(|entry| entry.matched_user_id == target_id)
            .ok_or_else(|| MatchError::NotFound(format!("match with {target_id}")))?;

        entry.status = status;
        let updated = entry.clone();
        if status == MatchStatus::Completed {
            profile.statistics.successful_matches += 1;
        }

        self.profiles.save_profile(&profile).await?;
        Ok(updated)
    }

    pub async fn get_match_statistics(
        &self,
        user_id: &str,
    ) -> Result<MatchStatsSummary, MatchError> {
        let user_id = validated_id(user_id, "user id")?;
        let profile = self
            .profiles
            .fetch_profile(user_id)
            .await?
            .ok_or_else(|| MatchError::NotFound(format!("profile {user_id}")))?;

        let history = &profile.match_history;
        let count_status = |status: MatchStatus| {
            history
                .iter()
                .filter(|entry| entry.status == status)
                .count()
        };

        let average_score = if history.is_empty() {
            0.0
        } else {
            let sum: f64 = history.iter().map(|entry| entry.match_score).sum();
            ((sum / history.len() as f64) * 100.0).round() / 100.0
        };

        Ok(MatchStatsSummary {
            total: history.len(),
            pending: count_status(MatchStatus::Pending),
            accepted: count_status(MatchStatus::Accepted),
            completed: count_status(MatchStatus::Completed),
            average_score,
        })
    }

    /// Profiles with the most skills in common with the requester, hydrated
    /// through the profile store. Graph failures degrade to an empty list.
    #[instrument(skip(self))]
    pub async fn get_similar_users(
        &self,
        user_id: &str,
        limit: usize,
    ) -> Result<Vec<SimilarUser>, MatchError> {
        let user_id = validated_id(user_id, "user id")?;
        let limit = limit.clamp(1, MAX_MATCH_LIMIT);

        let candidates = match self.graph.find_similar_users(user_id, limit).await {
            Ok(candidates) => candidates,
            Err(err) => {
                warn!(error = %err, "similar-user query degraded to empty result");
                return Ok(Vec::new());
            }
        };

        let mut similar = Vec::with_capacity(candidates.len());
        for candidate in candidates {
            if candidate.profile_id == user_id {
                continue;
            }
            match self.profiles.fetch_profile(&candidate.profile_id).await {
                Ok(Some(profile)) if profile.is_active => similar.push(SimilarUser {
                    user: MatchedUser::from(&profile),
                    common_skill_count: candidate.common_count,
                }),
                Ok(_) => {}
                Err(err) => {
                    warn!(candidate = %candidate.profile_id, error = %err, "hydration failed; candidate dropped");
                }
            }
        }

        Ok(similar)
    }

    /// Candidate pool for the requested mode. Non-project modes fall back
    /// to the complementary search when their traversal comes back empty;
    /// any graph failure degrades to an empty pool rather than aborting.
    async fn generate_candidates(
        &self,
        user_id: &str,
        limit: usize,
        mode: MatchMode,
    ) -> Vec<MatchCandidate> {
        let primary = match mode {
            MatchMode::Project => self.graph.find_complementary_users(user_id, limit).await,
            MatchMode::Mentorship => self
                .graph
                .find_mentors(user_id, limit)
                .await
                .map(|mentors| mentors.into_iter().map(mentor_candidate).collect()),
            MatchMode::Peer => self
                .graph
                .find_similar_users(user_id, limit)
                .await
                .map(|similar| similar.into_iter().map(similar_candidate).collect()),
        };

        let candidates = match primary {
            Ok(candidates) => candidates,
            Err(err) => {
                warn!(user_id, ?mode, error = %err, "candidate generation degraded to empty pool");
                Vec::new()
            }
        };

        if !candidates.is_empty() || mode == MatchMode::Project {
            return candidates;
        }

        match self.graph.find_complementary_users(user_id, limit).await {
            Ok(candidates) => candidates,
            Err(err) => {
                warn!(user_id, error = %err, "fallback candidate generation failed");
                Vec::new()
            }
        }
    }
}

fn mentor_candidate(mentor: crate::graph::MentorCandidate) -> MatchCandidate {
    MatchCandidate {
        profile_id: mentor.profile_id,
        username: mentor.username,
        common_count: mentor.expertise_overlap,
        ..MatchCandidate::default()
    }
}

fn similar_candidate(similar: crate::graph::SimilarCandidate) -> MatchCandidate {
    MatchCandidate {
        profile_id: similar.profile_id,
        username: similar.username,
        common_count: similar.common_count,
        ..MatchCandidate::default()
    }
}

fn validated_id<'a>(id: &'a str, what: &str) -> Result<&'a str, MatchError> {
    let id = id.trim();
    if id.is_empty() {
        return Err(MatchError::Validation(format!("{what} is required")));
    }
    Ok(id)
}

/// One candidate's hydrate/filter/score pass. Returns `None` for any skip
/// or failure; errors are logged here and never escape the task.
async fn score_candidate(
    store: Arc<dyn ProfileStore>,
    requester: Arc<Profile>,
    candidate: MatchCandidate,
    weights: MatchWeights,
    options: MatchOptions,
) -> Option<MatchResult> {
    if candidate.profile_id.is_empty() || candidate.profile_id == requester.id {
        return None;
    }

    let profile = match store.fetch_profile(&candidate.profile_id).await {
        Ok(Some(profile)) => profile,
        Ok(None) => {
            debug!(candidate = %candidate.profile_id, "candidate has no profile; dropped");
            return None;
        }
        Err(err) => {
            warn!(candidate = %candidate.profile_id, error = %err, "hydration failed; candidate dropped");
            return None;
        }
    };

    if !profile.is_active && !options.include_inactive {
        return None;
    }
    if requester.has_match_history_with(&profile.id) {
        return None;
    }

    let scored = calculate_match_score(&requester, &profile, &weights);
    if scored.score < options.min_score {
        return None;
    }

    Some(MatchResult {
        user: MatchedUser::from(&profile),
        score: scored.score,
        breakdown: scored.breakdown,
        complementary_skills: candidate.complementary_skills,
        common_skills: candidate.common_skills,
        label: match_label(scored.score),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::{GraphParams, GraphRow, GraphStore, GraphStoreError};
    use crate::store::MemoryProfileStore;
    use async_trait::async_trait;

    /// Graph store stub that always fails, for degradation paths.
    struct DeadGraphStore;

    #[async_trait]
    impl GraphStore for DeadGraphStore {
        async fn execute_read(
            &self,
            _query: &str,
            _params: GraphParams,
        ) -> Result<Vec<GraphRow>, GraphStoreError> {
            Err(GraphStoreError::Unavailable("bolt handshake failed".into()))
        }

        async fn execute_write(
            &self,
            _query: &str,
            _params: GraphParams,
        ) -> Result<Vec<GraphRow>, GraphStoreError> {
            Err(GraphStoreError::Unavailable("bolt handshake failed".into()))
        }
    }

    fn profile(id: &str, skills: &[&str]) -> Profile {
        let mut profile = Profile::new(id, id);
        profile.skills = skills.iter().map(|name| Skill::named(*name)).collect();
        profile
    }

    fn engine(profiles: Vec<Profile>) -> MatchEngine {
        let store = Arc::new(MemoryProfileStore::with_profiles(profiles));
        let graph = SkillGraph::new(Arc::new(DeadGraphStore));
        MatchEngine::new(store, graph)
    }

    #[tokio::test]
    async fn blank_user_id_is_a_validation_error() {
        let engine = engine(vec![]);
        let result = engine.find_matches("   ", MatchOptions::default()).await;
        assert!(matches!(result, Err(MatchError::Validation(_))));
    }

    #[tokio::test]
    async fn missing_requester_is_not_found() {
        let engine = engine(vec![]);
        let result = engine.find_matches("ghost", MatchOptions::default()).await;
        assert!(matches!(result, Err(MatchError::NotFound(_))));
    }

    #[tokio::test]
    async fn requester_without_skills_gets_empty_matches() {
        let engine = engine(vec![profile("u1", &[])]);
        let matches = engine
            .find_matches("u1", MatchOptions::default())
            .await
            .unwrap();
        assert!(matches.is_empty());
    }

    #[tokio::test]
    async fn graph_failure_degrades_to_empty_matches() {
        let engine = engine(vec![profile("u1", &["rust"])]);
        let matches = engine
            .find_matches("u1", MatchOptions::default())
            .await
            .unwrap();
        assert!(matches.is_empty());
    }

    #[tokio::test]
    async fn self_match_requests_are_rejected() {
        let engine = engine(vec![profile("u1", &["rust"])]);
        let result = engine.request_match("u1", "u1", "hi").await;
        assert!(matches!(result, Err(MatchError::Validation(_))));
    }

    #[tokio::test]
    async fn duplicate_pending_requests_are_rejected() {
        let engine = engine(vec![profile("u1", &["rust"]), profile("u2", &["go"])]);

        engine.request_match("u1", "u2", "").await.unwrap();
        let second = engine.request_match("u1", "u2", "").await;
        assert!(matches!(second, Err(MatchError::Validation(_))));
    }

    #[tokio::test]
    async fn resolved_history_allows_a_new_request() {
        let engine = engine(vec![profile("u1", &["rust"]), profile("u2", &["go"])]);

        engine.request_match("u1", "u2", "").await.unwrap();
        engine
            .update_match_status("u1", "u2", MatchStatus::Rejected)
            .await
            .unwrap();

        assert!(engine.request_match("u1", "u2", "").await.is_ok());
    }

    #[tokio::test]
    async fn inactive_targets_are_rejected() {
        let mut target = profile("u2", &["go"]);
        target.is_active = false;
        let engine = engine(vec![profile("u1", &["rust"]), target]);

        let result = engine.request_match("u1", "u2", "").await;
        assert!(matches!(result, Err(MatchError::Validation(_))));
    }

    #[tokio::test]
    async fn request_message_is_trimmed_to_500_chars() {
        let engine = engine(vec![profile("u1", &["rust"]), profile("u2", &["go"])]);

        let entry = engine
            .request_match("u1", "u2", &"x".repeat(900))
            .await
            .unwrap();
        assert_eq!(entry.message.unwrap().len(), 500);
        assert_eq!(entry.status, MatchStatus::Pending);
    }

    #[tokio::test]
    async fn request_updates_history_and_counters() {
        let engine = engine(vec![
            profile("u1", &["react", "node"]),
            profile("u2", &["python", "go"]),
        ]);

        let entry = engine.request_match("u1", "u2", "let's pair").await.unwrap();
        assert!(entry.match_score > 0.0);

        let stored = engine
            .profiles
            .fetch_profile("u1")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(stored.match_history.len(), 1);
        assert_eq!(stored.statistics.total_matches, 1);
        assert!(stored.has_pending_match_with("u2"));
    }

    #[tokio::test]
    async fn status_update_rejects_pending_and_counts_completions() {
        let engine = engine(vec![profile("u1", &["rust"]), profile("u2", &["go"])]);
        engine.request_match("u1", "u2", "").await.unwrap();

        let pending = engine
            .update_match_status("u1", "u2", MatchStatus::Pending)
            .await;
        assert!(matches!(pending, Err(MatchError::Validation(_))));

        let completed = engine
            .update_match_status("u1", "u2", MatchStatus::Completed)
            .await
            .unwrap();
        assert_eq!(completed.status, MatchStatus::Completed);

        let stored = engine
            .profiles
            .fetch_profile("u1")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(stored.statistics.successful_matches, 1);
    }

    #[tokio::test]
    async fn status_update_for_unknown_pair_is_not_found() {
        let engine = engine(vec![profile("u1", &["rust"])]);
        let result = engine
            .update_match_status("u1", "u9", MatchStatus::Accepted)
            .await;
        assert!(matches!(result, Err(MatchError::NotFound(_))));
    }

    #[tokio::test]
    async fn statistics_average_the_recorded_scores() {
        let mut requester = profile("u1", &["rust"]);
        requester.match_history = vec![
            MatchHistoryEntry {
                matched_user_id: "u2".into(),
                match_score: 0.8,
                status: MatchStatus::Completed,
                message: None,
                matched_at: Utc::now(),
            },
            MatchHistoryEntry {
                matched_user_id: "u3".into(),
                match_score: 0.4,
                status: MatchStatus::Pending,
                message: None,
                matched_at: Utc::now(),
            },
        ];
        let engine = engine(vec![requester]);

        let stats = engine.get_match_statistics("u1").await.unwrap();
        assert_eq!(stats.total, 2);
        assert_eq!(stats.pending, 1);
        assert_eq!(stats.completed, 1);
        assert_eq!(stats.accepted, 0);
        assert!((stats.average_score - 0.6).abs() < 1e-9);
    }

    #[tokio::test]
    async fn statistics_for_empty_history_are_zero() {
        let engine = engine(vec![profile("u1", &["rust"])]);
        let stats = engine.get_match_statistics("u1").await.unwrap();
        assert_eq!(stats, MatchStatsSummary::default());
    }

    #[tokio::test]
    async fn similar_users_degrade_to_empty_on_graph_failure() {
        let engine = engine(vec![profile("u1", &["rust"])]);
        let similar = engine.get_similar_users("u1", 5).await.unwrap();
        assert!(similar.is_empty());
    }
}
