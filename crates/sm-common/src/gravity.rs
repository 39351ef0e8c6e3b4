use chrono::{DateTime, Utc};
use tracing::{debug, info};

use crate::Skill;
use crate::store::{ProfileStore, ProfileStoreError};

/// Decay rate for fast-moving framework/cloud skills.
pub const FAST_DECAY_RATE: f64 = 0.05;
/// Decay rate for fundamentals, which erode far more slowly.
pub const SLOW_DECAY_RATE: f64 = 0.01;

/// Placeholder for an external industry-demand signal; a fixed 1.0 until one
/// exists, so callers must not assume it varies.
pub const INDUSTRY_WEIGHT: f64 = 1.0;

const FAST_DECAY_KEYWORDS: [&str; 5] = ["react", "vue", "angular", "nextjs", "aws"];

/// Result of a freshness evaluation:
/// `gravity = (P · I · (1 + C)) / (1 + daysInactive · λ)`, rounded to four
/// decimal places. The inputs used are reported back for auditability.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GravityScore {
    pub gravity: f64,
    pub days_inactive: i64,
    pub decay_factor: f64,
}

/// Freshness of a skill as of now. See [`calculate_gravity_at`].
pub fn calculate_gravity(
    skill: &Skill,
    last_activity: Option<DateTime<Utc>>,
    streak_count: u32,
) -> GravityScore {
    calculate_gravity_at(skill, last_activity, streak_count, Utc::now())
}

/// Freshness of a skill as of `now`. Monotonically decreasing in days of
/// inactivity; monotonically increasing in proficiency and streak. A missing
/// last-activity date counts as active today.
pub fn calculate_gravity_at(
    skill: &Skill,
    last_activity: Option<DateTime<Utc>>,
    streak_count: u32,
    now: DateTime<Utc>,
) -> GravityScore {
    let days_inactive = last_activity
        .map(|last| ((now - last).num_seconds() as f64 / 86_400.0).max(0.0))
        .unwrap_or(0.0);

    let proficiency = skill.proficiency.base_score();
    let decay_factor = decay_rate(&skill.name);
    let consistency = (streak_count as f64 * 0.05).min(0.5);

    let gravity = (proficiency * INDUSTRY_WEIGHT * (1.0 + consistency))
        / (1.0 + days_inactive * decay_factor);

    GravityScore {
        gravity: (gravity * 10_000.0).round() / 10_000.0,
        days_inactive: days_inactive.floor() as i64,
        decay_factor,
    }
}

fn decay_rate(skill_name: &str) -> f64 {
    let lowered = skill_name.to_lowercase();
    if FAST_DECAY_KEYWORDS
        .iter()
        .any(|keyword| lowered.contains(keyword))
    {
        FAST_DECAY_RATE
    } else {
        SLOW_DECAY_RATE
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct GravityCycleSummary {
    pub profiles_scanned: usize,
    pub profiles_updated: usize,
    pub skills_decayed: usize,
    pub skills_grown: usize,
}

impl GravityCycleSummary {
    pub fn changed_anything(&self) -> bool {
        self.profiles_updated > 0
    }
}

/// Recompute freshness for every skill of every stored profile, persisting
/// only profiles where some skill moved by more than 0.001. A skill without
/// its own last-used date falls back to the profile's updated-at timestamp.
pub async fn run_gravity_cycle(
    store: &dyn ProfileStore,
) -> Result<GravityCycleSummary, ProfileStoreError> {
    let mut summary = GravityCycleSummary::default();

    for mut profile in store.list_profiles().await? {
        summary.profiles_scanned += 1;
        if profile.skills.is_empty() {
            continue;
        }

        let fallback_activity = profile.updated_at;
        let streak = profile.streak;
        let mut changed = false;

        for skill in &mut profile.skills {
            let last_activity = skill.last_used.or(fallback_activity);
            let physics = calculate_gravity(skill, last_activity, streak);

            let current = skill
                .freshness
                .unwrap_or_else(|| skill.proficiency.base_score());
            let delta = physics.gravity - current;
            if delta.abs() <= 0.001 {
                continue;
            }

            debug!(
                profile_id = %profile.id,
                skill = %skill.name,
                delta,
                gravity = physics.gravity,
                days_inactive = physics.days_inactive,
                "skill freshness moved"
            );

            if delta < 0.0 {
                summary.skills_decayed += 1;
            } else {
                summary.skills_grown += 1;
            }
            skill.freshness = Some(physics.gravity);
            changed = true;
        }

        if changed {
            store.save_profile(&profile).await?;
            summary.profiles_updated += 1;
            info!(profile_id = %profile.id, username = %profile.username, "updated skill freshness");
        }
    }

    Ok(summary)
}
