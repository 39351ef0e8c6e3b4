pub mod memory;

pub use memory::MemoryProfileStore;

use async_trait::async_trait;

use crate::Profile;

#[derive(Debug, thiserror::Error)]
pub enum ProfileStoreError {
    #[error("profile store unavailable: {0}")]
    Unavailable(String),
    #[error("failed to decode profile record: {0}")]
    Decode(String),
}

/// Narrow id-keyed view of the document store. The engine only reads
/// skills/embedding/xp/match history/active flag and writes match-history
/// entries and freshness updates; everything else about profile persistence
/// belongs to the owning service.
#[async_trait]
pub trait ProfileStore: Send + Sync {
    async fn fetch_profile(&self, id: &str) -> Result<Option<Profile>, ProfileStoreError>;

    async fn save_profile(&self, profile: &Profile) -> Result<(), ProfileStoreError>;

    /// Full scan, used by the freshness cycle.
    async fn list_profiles(&self) -> Result<Vec<Profile>, ProfileStoreError>;
}
