pub mod gravity;
pub mod graph;
pub mod intelligence;
pub mod logging;
pub mod matching;
pub mod skill_normalizer;
pub mod store;

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

use skill_normalizer::normalize_skill_name;

#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Proficiency {
    Beginner,
    #[default]
    Intermediate,
    Advanced,
    Expert,
}

impl Proficiency {
    /// Base score used by the freshness model, on the same 0-100 intensity
    /// scale profiles expose to the dashboard (divided by 100).
    pub fn base_score(self) -> f64 {
        match self {
            Proficiency::Beginner => 0.3,
            Proficiency::Intermediate => 0.6,
            Proficiency::Advanced => 0.85,
            Proficiency::Expert => 1.0,
        }
    }
}

#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, Display, EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum SkillSource {
    #[default]
    Github,
    Manual,
    Inferred,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Skill {
    pub name: String,
    #[serde(default)]
    pub proficiency: Proficiency,
    #[serde(default = "Skill::default_category")]
    pub category: String,
    #[serde(default)]
    pub source: SkillSource,
    #[serde(default)]
    pub last_used: Option<DateTime<Utc>>,
    /// Time-decayed freshness, maintained by the gravity cycle.
    #[serde(default)]
    pub freshness: Option<f64>,
}

impl Skill {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            proficiency: Proficiency::default(),
            category: Self::default_category(),
            source: SkillSource::default(),
            last_used: None,
            freshness: None,
        }
    }

    fn default_category() -> String {
        "general".into()
    }
}

/// Ingestion shape for skills, which arrive either as bare names or as
/// structured objects. Everything is folded into [`Skill`] here, before it
/// reaches scoring or graph writes; unparseable proficiency/source strings
/// fall back to the model defaults.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum SkillInput {
    Name(String),
    Detailed {
        name: String,
        #[serde(default)]
        proficiency: Option<String>,
        #[serde(default)]
        category: Option<String>,
        #[serde(default)]
        source: Option<String>,
        #[serde(default, rename = "lastUsed")]
        last_used: Option<DateTime<Utc>>,
    },
}

impl SkillInput {
    /// Returns `None` when the name is empty after trimming.
    pub fn into_skill(self) -> Option<Skill> {
        match self {
            SkillInput::Name(name) => {
                let name = name.trim().to_string();
                (!name.is_empty()).then(|| Skill::named(name))
            }
            SkillInput::Detailed {
                name,
                proficiency,
                category,
                source,
                last_used,
            } => {
                let name = name.trim().to_string();
                if name.is_empty() {
                    return None;
                }
                Some(Skill {
                    name,
                    proficiency: proficiency
                        .as_deref()
                        .and_then(|raw| raw.trim().to_lowercase().parse().ok())
                        .unwrap_or_default(),
                    category: category
                        .filter(|c| !c.trim().is_empty())
                        .unwrap_or_else(Skill::default_category),
                    source: source
                        .as_deref()
                        .and_then(|raw| raw.trim().to_lowercase().parse().ok())
                        .unwrap_or_default(),
                    last_used,
                    freshness: None,
                })
            }
        }
    }
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString, Default,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum MatchStatus {
    #[default]
    Pending,
    Accepted,
    Rejected,
    Completed,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchHistoryEntry {
    pub matched_user_id: String,
    pub match_score: f64,
    #[serde(default)]
    pub status: MatchStatus,
    #[serde(default)]
    pub message: Option<String>,
    pub matched_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchStatistics {
    pub total_matches: u32,
    pub successful_matches: u32,
}

// The document-store shape of a profile, restricted to the fields the
// engine reads and writes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Profile {
    pub id: String,
    pub username: String,
    #[serde(default)]
    pub skills: Vec<Skill>,
    #[serde(default)]
    pub skill_embedding: Vec<f32>,
    #[serde(default)]
    pub xp: i64,
    #[serde(default)]
    pub streak: u32,
    #[serde(default)]
    pub match_history: Vec<MatchHistoryEntry>,
    #[serde(default)]
    pub statistics: MatchStatistics,
    #[serde(default = "default_true")]
    pub is_active: bool,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

fn default_true() -> bool {
    true
}

impl Profile {
    pub fn new(id: impl Into<String>, username: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            username: username.into(),
            skills: Vec::new(),
            skill_embedding: Vec::new(),
            xp: 0,
            streak: 0,
            match_history: Vec::new(),
            statistics: MatchStatistics::default(),
            is_active: true,
            updated_at: None,
        }
    }

    /// Normalized skill names, deduplicated for set arithmetic.
    pub fn skill_name_set(&self) -> HashSet<String> {
        self.skills
            .iter()
            .map(|skill| normalize_skill_name(&skill.name))
            .filter(|name| !name.is_empty())
            .collect()
    }

    pub fn has_match_history_with(&self, target_id: &str) -> bool {
        self.match_history
            .iter()
            .any(|entry| entry.matched_user_id == target_id)
    }

    pub fn has_pending_match_with(&self, target_id: &str) -> bool {
        self.match_history
            .iter()
            .any(|entry| entry.matched_user_id == target_id && entry.status == MatchStatus::Pending)
    }

    /// Level derived from experience: `floor(sqrt(xp / 100)) + 1`.
    pub fn level(&self) -> u32 {
        ((self.xp.max(0) as f64 / 100.0).sqrt().floor() as u32) + 1
    }
}
