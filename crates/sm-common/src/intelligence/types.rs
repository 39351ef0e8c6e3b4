use serde::{Deserialize, Serialize};

use crate::Skill;

/// One skill as submitted to the trajectory endpoint.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SkillSnapshot {
    pub name: String,
    pub level: String,
    #[serde(rename = "gravityScore")]
    pub gravity_score: f64,
}

impl From<&Skill> for SkillSnapshot {
    fn from(skill: &Skill) -> Self {
        Self {
            name: skill.name.chars().take(100).collect(),
            level: skill.proficiency.to_string(),
            gravity_score: skill.freshness.unwrap_or(0.0),
        }
    }
}

/// Trajectory/drift analysis as returned by the intelligence service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrajectoryAnalysis {
    #[serde(default)]
    pub trajectory: String,
    #[serde(default)]
    pub drift_warnings: Vec<String>,
    #[serde(default)]
    pub ai_analysis: String,
    #[serde(default)]
    pub gravity_index: f64,
}

impl TrajectoryAnalysis {
    /// Analysis for a profile with no skills to analyze.
    pub fn unknown() -> Self {
        Self {
            trajectory: "unknown".into(),
            drift_warnings: Vec::new(),
            ai_analysis: "No skills data available to analyze.".into(),
            gravity_index: 0.0,
        }
    }

    /// Degraded-mode analysis returned when the service is unreachable;
    /// callers render it instead of handling an error.
    pub fn unavailable() -> Self {
        Self {
            trajectory: "unavailable".into(),
            drift_warnings: Vec::new(),
            ai_analysis: "Trajectory analysis is temporarily offline.".into(),
            gravity_index: 0.0,
        }
    }
}

/// Snapshot of the client's health, for diagnostics endpoints.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClientStats {
    pub circuit_open: bool,
    pub failure_count: u32,
    pub base_url: String,
}
