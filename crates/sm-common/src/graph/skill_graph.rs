use std::sync::Arc;

use serde_json::{Value, json};
use tracing::{debug, info, instrument};

use super::{GraphParams, GraphRow, GraphStore, GraphStoreError};
use crate::skill_normalizer::normalize_skill_name;
use crate::{Skill, SkillInput};

/// Candidate surfaced by a graph traversal, prior to hydration and scoring.
/// Carries the hints the traversal already computed so the orchestrator can
/// echo them without re-deriving set differences.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MatchCandidate {
    pub profile_id: String,
    pub username: String,
    pub complementary_skills: Vec<String>,
    pub common_skills: Vec<String>,
    pub complementary_count: u32,
    pub common_count: u32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SimilarCandidate {
    pub profile_id: String,
    pub username: String,
    pub xp: i64,
    pub common_count: u32,
    pub skills: Vec<(String, String)>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MentorCandidate {
    pub profile_id: String,
    pub username: String,
    pub xp: i64,
    pub expertise_overlap: u32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SkillRecommendation {
    pub skill: String,
    pub frequency: u32,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProfileSkillGraph {
    pub profile_id: String,
    pub skills: Vec<Skill>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct GraphStatistics {
    pub profile_count: u64,
    pub skill_count: u64,
    pub relationship_count: u64,
}

/// Candidate generation and maintenance over the skill-relationship graph.
#[derive(Clone)]
pub struct SkillGraph {
    store: Arc<dyn GraphStore>,
}

impl SkillGraph {
    pub fn new(store: Arc<dyn GraphStore>) -> Self {
        Self { store }
    }

    /// Profiles in the shared neighborhood whose skill set differs from the
    /// requester's, ranked by (complementary count desc, common count desc).
    /// The requester is excluded by identity, not topology.
    #[instrument(skip(self))]
    pub async fn find_complementary_users(
        &self,
        profile_id: &str,
        limit: usize,
    ) -> Result<Vec<MatchCandidate>, GraphStoreError> {
        let query = "\
            MATCH (p1:Profile {profileId: $profileId})-[:HAS_SKILL]->(s1:Skill) \
            MATCH (p2:Profile)-[:HAS_SKILL]->(s2:Skill) \
            WHERE p1 <> p2 \
            WITH p1, p2, \
                 collect(DISTINCT s1.name) AS requesterSkills, \
                 collect(DISTINCT s2.name) AS candidateSkills \
            WITH p2, \
                 [skill IN candidateSkills WHERE NOT skill IN requesterSkills] AS complementarySkills, \
                 [skill IN requesterSkills WHERE skill IN candidateSkills] AS commonSkills \
            WHERE size(complementarySkills) > 0 \
            RETURN p2.profileId AS profileId, \
                   p2.username AS username, \
                   complementarySkills, \
                   commonSkills, \
                   size(complementarySkills) AS complementaryCount, \
                   size(commonSkills) AS commonCount \
            ORDER BY complementaryCount DESC, commonCount DESC \
            LIMIT toInteger($limit)";

        let rows = self
            .store
            .execute_read(query, id_and_limit(profile_id, limit))
            .await?;

        Ok(rows
            .into_iter()
            .filter_map(|row| {
                let profile_id = row_string(&row, "profileId")?;
                Some(MatchCandidate {
                    profile_id,
                    username: row_string(&row, "username").unwrap_or_default(),
                    complementary_skills: row_string_list(&row, "complementarySkills"),
                    common_skills: row_string_list(&row, "commonSkills"),
                    complementary_count: row_u32(&row, "complementaryCount").unwrap_or(0),
                    common_count: row_u32(&row, "commonCount").unwrap_or(0),
                })
            })
            .collect())
    }

    /// Profiles ranked by how many skills they share with the requester.
    #[instrument(skip(self))]
    pub async fn find_similar_users(
        &self,
        profile_id: &str,
        limit: usize,
    ) -> Result<Vec<SimilarCandidate>, GraphStoreError> {
        let query = "\
            MATCH (p1:Profile {profileId: $profileId})-[:HAS_SKILL]->(s:Skill)<-[:HAS_SKILL]-(p2:Profile) \
            WHERE p1 <> p2 \
            WITH p2, count(DISTINCT s) AS commonCount \
            ORDER BY commonCount DESC \
            LIMIT toInteger($limit) \
            MATCH (p2)-[r:HAS_SKILL]->(skill:Skill) \
            RETURN p2.profileId AS profileId, \
                   p2.username AS username, \
                   p2.xp AS xp, \
                   commonCount, \
                   collect({name: skill.name, proficiency: r.proficiency}) AS skills";

        let rows = self
            .store
            .execute_read(query, id_and_limit(profile_id, limit))
            .await?;

        Ok(rows
            .into_iter()
            .filter_map(|row| {
                let profile_id = row_string(&row, "profileId")?;
                Some(SimilarCandidate {
                    profile_id,
                    username: row_string(&row, "username").unwrap_or_default(),
                    xp: row_i64(&row, "xp").unwrap_or(0),
                    common_count: row_u32(&row, "commonCount").unwrap_or(0),
                    skills: row_skill_pairs(&row, "skills"),
                })
            })
            .collect())
    }

    /// Advanced/expert holders of skills the requester is still learning,
    /// ranked by how many such skills they share.
    #[instrument(skip(self))]
    pub async fn find_mentors(
        &self,
        profile_id: &str,
        limit: usize,
    ) -> Result<Vec<MentorCandidate>, GraphStoreError> {
        let query = "\
            MATCH (mentee:Profile {profileId: $profileId})-[r1:HAS_SKILL]->(s:Skill)<-[r2:HAS_SKILL]-(mentor:Profile) \
            WHERE mentee <> mentor \
              AND r1.proficiency IN ['beginner', 'intermediate'] \
              AND r2.proficiency IN ['advanced', 'expert'] \
            WITH mentor, count(DISTINCT s) AS expertiseOverlap \
            ORDER BY expertiseOverlap DESC \
            LIMIT toInteger($limit) \
            RETURN mentor.profileId AS profileId, \
                   mentor.username AS username, \
                   mentor.xp AS xp, \
                   expertiseOverlap";

        let rows = self
            .store
            .execute_read(query, id_and_limit(profile_id, limit))
            .await?;

        Ok(rows
            .into_iter()
            .filter_map(|row| {
                let profile_id = row_string(&row, "profileId")?;
                Some(MentorCandidate {
                    profile_id,
                    username: row_string(&row, "username").unwrap_or_default(),
                    xp: row_i64(&row, "xp").unwrap_or(0),
                    expertise_overlap: row_u32(&row, "expertiseOverlap").unwrap_or(0),
                })
            })
            .collect())
    }

    /// Skills held by second-degree connections that the requester lacks,
    /// ranked by how many of those peers hold them.
    #[instrument(skip(self))]
    pub async fn skill_recommendations(
        &self,
        profile_id: &str,
        limit: usize,
    ) -> Result<Vec<SkillRecommendation>, GraphStoreError> {
        let query = "\
            MATCH (p:Profile {profileId: $profileId})-[:HAS_SKILL]->(s1:Skill) \
            MATCH (peer:Profile)-[:HAS_SKILL]->(s1) \
            MATCH (peer)-[:HAS_SKILL]->(s2:Skill) \
            WHERE NOT (p)-[:HAS_SKILL]->(s2) \
            WITH s2, count(DISTINCT peer) AS frequency \
            RETURN s2.name AS skill, frequency \
            ORDER BY frequency DESC \
            LIMIT toInteger($limit)";

        let rows = self
            .store
            .execute_read(query, id_and_limit(profile_id, limit))
            .await?;

        Ok(rows
            .into_iter()
            .filter_map(|row| {
                let skill = row_string(&row, "skill")?;
                Some(SkillRecommendation {
                    skill,
                    frequency: row_u32(&row, "frequency").unwrap_or(0),
                })
            })
            .collect())
    }

    /// Create or refresh the graph node for a profile.
    #[instrument(skip(self))]
    pub async fn upsert_profile_node(
        &self,
        profile_id: &str,
        username: &str,
        xp: i64,
    ) -> Result<(), GraphStoreError> {
        let query = "\
            MERGE (p:Profile {profileId: $profileId}) \
            SET p.username = $username, \
                p.xp = $xp, \
                p.updatedAt = timestamp() \
            RETURN p";

        let params = params([
            ("profileId", json!(profile_id)),
            ("username", json!(username)),
            ("xp", json!(xp)),
        ]);
        self.store.execute_write(query, params).await?;
        info!(profile_id, "profile node upserted");
        Ok(())
    }

    /// Replace a profile's HAS_SKILL edges with the given skills. Existing
    /// edges are deleted first so at most one relationship survives per
    /// (profile, skill) pair. Skill names are written in their normalized
    /// form so graph-side comparisons stay case-insensitive.
    #[instrument(skip(self, skills))]
    pub async fn replace_profile_skills(
        &self,
        profile_id: &str,
        skills: Vec<SkillInput>,
    ) -> Result<usize, GraphStoreError> {
        let normalized: Vec<Skill> = skills
            .into_iter()
            .filter_map(SkillInput::into_skill)
            .collect();

        if normalized.is_empty() {
            debug!(profile_id, "no skills to write; leaving graph untouched");
            return Ok(0);
        }

        self.delete_profile_skills(profile_id).await?;

        let query = "\
            MATCH (p:Profile {profileId: $profileId}) \
            UNWIND $skills AS skill \
            MERGE (s:Skill {name: skill.name}) \
            MERGE (p)-[r:HAS_SKILL]->(s) \
            SET r.proficiency = skill.proficiency, \
                r.category = skill.category, \
                r.source = skill.source, \
                r.updatedAt = timestamp() \
            RETURN p, collect(s) AS skills";

        let count = normalized.len();
        let skill_rows: Vec<Value> = normalized
            .iter()
            .map(|skill| {
                json!({
                    "name": normalize_skill_name(&skill.name),
                    "proficiency": skill.proficiency.to_string(),
                    "category": skill.category,
                    "source": skill.source.to_string(),
                })
            })
            .collect();

        let params = params([
            ("profileId", json!(profile_id)),
            ("skills", Value::Array(skill_rows)),
        ]);
        self.store.execute_write(query, params).await?;
        info!(profile_id, count, "profile skills replaced");
        Ok(count)
    }

    pub async fn delete_profile_skills(&self, profile_id: &str) -> Result<(), GraphStoreError> {
        let query = "\
            MATCH (p:Profile {profileId: $profileId})-[r:HAS_SKILL]->() \
            DELETE r";
        self.store
            .execute_write(query, params([("profileId", json!(profile_id))]))
            .await?;
        Ok(())
    }

    /// The skills currently attached to a profile node, or `None` when the
    /// profile has no node in the graph.
    pub async fn profile_skill_graph(
        &self,
        profile_id: &str,
    ) -> Result<Option<ProfileSkillGraph>, GraphStoreError> {
        let query = "\
            MATCH (p:Profile {profileId: $profileId})-[r:HAS_SKILL]->(s:Skill) \
            RETURN p.profileId AS profileId, \
                   collect({name: s.name, proficiency: r.proficiency, category: r.category, source: r.source}) AS skills";

        let rows = self
            .store
            .execute_read(query, params([("profileId", json!(profile_id))]))
            .await?;

        let Some(row) = rows.into_iter().next() else {
            return Ok(None);
        };

        let skills = row
            .get("skills")
            .and_then(Value::as_array)
            .map(|entries| {
                entries
                    .iter()
                    .filter_map(|entry| {
                        serde_json::from_value::<SkillInput>(entry.clone())
                            .ok()
                            .and_then(SkillInput::into_skill)
                    })
                    .collect()
            })
            .unwrap_or_default();

        Ok(Some(ProfileSkillGraph {
            profile_id: row_string(&row, "profileId").unwrap_or_else(|| profile_id.to_string()),
            skills,
        }))
    }

    /// Remove a profile node and every edge touching it.
    #[instrument(skip(self))]
    pub async fn delete_profile(&self, profile_id: &str) -> Result<(), GraphStoreError> {
        let query = "\
            MATCH (p:Profile {profileId: $profileId}) \
            OPTIONAL MATCH (p)-[r]-() \
            DELETE r, p";
        self.store
            .execute_write(query, params([("profileId", json!(profile_id))]))
            .await?;
        info!(profile_id, "profile removed from graph");
        Ok(())
    }

    pub async fn graph_statistics(&self) -> Result<GraphStatistics, GraphStoreError> {
        let query = "\
            MATCH (p:Profile) \
            OPTIONAL MATCH (s:Skill) \
            OPTIONAL MATCH ()-[r:HAS_SKILL]->() \
            RETURN count(DISTINCT p) AS profileCount, \
                   count(DISTINCT s) AS skillCount, \
                   count(r) AS relationshipCount";

        let rows = self.store.execute_read(query, GraphParams::new()).await?;
        let Some(row) = rows.into_iter().next() else {
            return Ok(GraphStatistics::default());
        };

        Ok(GraphStatistics {
            profile_count: row_u64(&row, "profileCount").unwrap_or(0),
            skill_count: row_u64(&row, "skillCount").unwrap_or(0),
            relationship_count: row_u64(&row, "relationshipCount").unwrap_or(0),
        })
    }
}

fn params<I>(entries: I) -> GraphParams
where
    I: IntoIterator<Item = (&'static str, Value)>,
{
    entries
        .into_iter()
        .map(|(key, value)| (key.to_string(), value))
        .collect()
}

fn id_and_limit(profile_id: &str, limit: usize) -> GraphParams {
    params([
        ("profileId", json!(profile_id)),
        // Coerced to at least one result slot; the store handles the rest.
        ("limit", json!(limit.max(1) as i64)),
    ])
}

fn row_string(row: &GraphRow, key: &str) -> Option<String> {
    row.get(key)
        .and_then(Value::as_str)
        .map(str::to_string)
        .filter(|value| !value.is_empty())
}

fn row_i64(row: &GraphRow, key: &str) -> Option<i64> {
    row.get(key).and_then(Value::as_i64)
}

fn row_u32(row: &GraphRow, key: &str) -> Option<u32> {
    row.get(key)
        .and_then(Value::as_u64)
        .map(|value| value.min(u32::MAX as u64) as u32)
}

fn row_u64(row: &GraphRow, key: &str) -> Option<u64> {
    row.get(key).and_then(Value::as_u64)
}

fn row_string_list(row: &GraphRow, key: &str) -> Vec<String> {
    row.get(key)
        .and_then(Value::as_array)
        .map(|values| {
            values
                .iter()
                .filter_map(|value| value.as_str().map(str::to_string))
                .collect()
        })
        .unwrap_or_default()
}

fn row_skill_pairs(row: &GraphRow, key: &str) -> Vec<(String, String)> {
    row.get(key)
        .and_then(Value::as_array)
        .map(|entries| {
            entries
                .iter()
                .filter_map(|entry| {
                    let name = entry.get("name")?.as_str()?.to_string();
                    let proficiency = entry
                        .get("proficiency")
                        .and_then(Value::as_str)
                        .unwrap_or("intermediate")
                        .to_string();
                    Some((name, proficiency))
                })
                .collect()
        })
        .unwrap_or_default()
}
