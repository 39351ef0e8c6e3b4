//! End-to-end match flow over in-process collaborators: a scripted graph
//! store seeding candidates and the in-memory profile store hydrating them.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde_json::json;

use sm_common::graph::{GraphParams, GraphRow, GraphStore, GraphStoreError, SkillGraph};
use sm_common::matching::{MatchEngine, MatchMode, MatchOptions};
use sm_common::store::{MemoryProfileStore, ProfileStore};
use sm_common::{MatchStatus, Profile, Skill};

/// Serves canned rows for the traversal kinds the engine issues and records
/// how many reads were executed.
#[derive(Default)]
struct ScriptedGraph {
    complementary_rows: Vec<GraphRow>,
    mentor_rows: Vec<GraphRow>,
    similar_rows: Vec<GraphRow>,
    reads: Mutex<Vec<String>>,
}

#[async_trait]
impl GraphStore for ScriptedGraph {
    async fn execute_read(
        &self,
        query: &str,
        _params: GraphParams,
    ) -> Result<Vec<GraphRow>, GraphStoreError> {
        self.reads.lock().unwrap().push(query.to_string());

        let rows = if query.contains("complementarySkills") {
            &self.complementary_rows
        } else if query.contains("expertiseOverlap") {
            &self.mentor_rows
        } else {
            &self.similar_rows
        };
        Ok(rows.clone())
    }

    async fn execute_write(
        &self,
        _query: &str,
        _params: GraphParams,
    ) -> Result<Vec<GraphRow>, GraphStoreError> {
        Ok(Vec::new())
    }
}

fn candidate_row(profile_id: &str, complementary: &[&str], common: &[&str]) -> GraphRow {
    serde_json::from_value(json!({
        "profileId": profile_id,
        "username": profile_id,
        "complementarySkills": complementary,
        "commonSkills": common,
        "complementaryCount": complementary.len(),
        "commonCount": common.len(),
    }))
    .unwrap()
}

fn profile(id: &str, skills: &[&str], xp: i64) -> Profile {
    let mut profile = Profile::new(id, id);
    profile.skills = skills.iter().map(|name| Skill::named(*name)).collect();
    profile.xp = xp;
    profile
}

fn seeded_engine(graph: ScriptedGraph) -> (MatchEngine, Arc<MemoryProfileStore>) {
    let mut inactive = profile("u3", &["python", "go"], 100);
    inactive.is_active = false;

    let mut requester = profile("u1", &["React", "Node"], 100);
    requester.skill_embedding = vec![0.4, 0.1, 0.5];

    let store = Arc::new(MemoryProfileStore::with_profiles([
        requester,
        profile("u2", &["python", "go"], 100),
        inactive,
        profile("u4", &["rust", "go"], 100),
        profile("u5", &["React", "Node"], 10_000),
    ]));

    let engine = MatchEngine::new(
        store.clone(),
        SkillGraph::new(Arc::new(graph)),
    );
    (engine, store)
}

fn default_graph() -> ScriptedGraph {
    ScriptedGraph {
        complementary_rows: vec![
            // The engine skips itself even when the traversal leaks it back.
            candidate_row("u1", &["anything"], &[]),
            candidate_row("u2", &["python", "go"], &[]),
            candidate_row("u3", &["python", "go"], &[]),
            candidate_row("u4", &["rust", "go"], &[]),
            candidate_row("u5", &[], &["react", "node"]),
            candidate_row("ghost", &["cobol"], &[]),
        ],
        ..ScriptedGraph::default()
    }
}

#[tokio::test]
async fn find_matches_filters_scores_and_ranks() {
    let (engine, _store) = seeded_engine(default_graph());

    let matches = engine
        .find_matches("u1", MatchOptions::default())
        .await
        .unwrap();

    // u1 (self), u3 (inactive), u5 (score below 0.3 cutoff) and ghost
    // (no profile) are all dropped; u2 and u4 survive.
    assert_eq!(matches.len(), 2);
    assert!(matches.iter().all(|m| m.user.id != "u1"));
    assert!(matches.iter().all(|m| m.user.id != "u3"));
    assert!(matches.iter().all(|m| m.user.id != "u5"));
    assert!(matches.windows(2).all(|w| w[0].score >= w[1].score));

    let ids: Vec<&str> = matches.iter().map(|m| m.user.id.as_str()).collect();
    assert!(ids.contains(&"u2"));
    assert!(ids.contains(&"u4"));

    let u2 = matches.iter().find(|m| m.user.id == "u2").unwrap();
    assert_eq!(u2.breakdown.complementarity, 1.0);
    assert_eq!(u2.breakdown.overlap, 0.0);
    assert_eq!(u2.complementary_skills, vec!["python", "go"]);
    assert_eq!(u2.label, "Potential Connect");
}

#[tokio::test]
async fn find_matches_respects_the_limit() {
    let (engine, _store) = seeded_engine(default_graph());

    let matches = engine
        .find_matches(
            "u1",
            MatchOptions {
                limit: 1,
                ..MatchOptions::default()
            },
        )
        .await
        .unwrap();

    assert_eq!(matches.len(), 1);
}

#[tokio::test]
async fn include_inactive_opts_back_in() {
    let (engine, _store) = seeded_engine(default_graph());

    let matches = engine
        .find_matches(
            "u1",
            MatchOptions {
                include_inactive: true,
                ..MatchOptions::default()
            },
        )
        .await
        .unwrap();

    assert!(matches.iter().any(|m| m.user.id == "u3"));
}

#[tokio::test]
async fn candidates_already_in_history_are_excluded() {
    let (engine, store) = seeded_engine(default_graph());

    engine.request_match("u1", "u2", "pair on a project?").await.unwrap();
    let requester = store.fetch_profile("u1").await.unwrap().unwrap();
    assert!(requester.has_pending_match_with("u2"));

    let matches = engine
        .find_matches("u1", MatchOptions::default())
        .await
        .unwrap();

    assert!(matches.iter().all(|m| m.user.id != "u2"));
    assert!(matches.iter().any(|m| m.user.id == "u4"));
}

#[tokio::test]
async fn mentorship_mode_falls_back_to_complementary_search() {
    let graph = ScriptedGraph {
        complementary_rows: default_graph().complementary_rows,
        mentor_rows: Vec::new(),
        ..ScriptedGraph::default()
    };
    let (engine, _store) = seeded_engine(graph);

    let matches = engine
        .find_matches(
            "u1",
            MatchOptions {
                mode: MatchMode::Mentorship,
                ..MatchOptions::default()
            },
        )
        .await
        .unwrap();

    assert!(!matches.is_empty());
}

#[tokio::test]
async fn full_request_lifecycle_updates_statistics() {
    let (engine, _store) = seeded_engine(default_graph());

    engine.request_match("u1", "u2", "hello").await.unwrap();
    engine.request_match("u1", "u4", "").await.unwrap();

    engine
        .update_match_status("u1", "u2", MatchStatus::Completed)
        .await
        .unwrap();
    engine
        .update_match_status("u1", "u4", MatchStatus::Rejected)
        .await
        .unwrap();

    let stats = engine.get_match_statistics("u1").await.unwrap();
    assert_eq!(stats.total, 2);
    assert_eq!(stats.pending, 0);
    assert_eq!(stats.completed, 1);
    assert!(stats.average_score > 0.0);
}

#[tokio::test]
async fn similar_users_hydrate_through_the_profile_store() {
    let graph = ScriptedGraph {
        similar_rows: vec![
            serde_json::from_value(json!({
                "profileId": "u4",
                "username": "u4",
                "xp": 100,
                "commonCount": 2,
                "skills": [{"name": "rust", "proficiency": "advanced"}]
            }))
            .unwrap(),
            serde_json::from_value(json!({
                "profileId": "ghost",
                "username": "ghost",
                "xp": 5,
                "commonCount": 1,
                "skills": []
            }))
            .unwrap(),
        ],
        ..ScriptedGraph::default()
    };
    let (engine, _store) = seeded_engine(graph);

    let similar = engine.get_similar_users("u1", 10).await.unwrap();

    assert_eq!(similar.len(), 1);
    assert_eq!(similar[0].user.id, "u4");
    assert_eq!(similar[0].common_skill_count, 2);
}
