use super::{ProfilePatch, ProfileStore, UserProfileState};
use crate::database::Database;
use crate::errors::AppResult;

/// Fixed key the snapshot lives under.
pub const SNAPSHOT_KEY: &str = "user";

/// Durable copy of the profile record, used to rehydrate the store after a
/// restart. Holds only server-confirmed values.
#[derive(Debug, Clone)]
pub struct SnapshotCache {
    db: Database,
}

impl SnapshotCache {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    /// Raw serialized blob, exactly as persisted.
    pub async fn load_raw(&self) -> AppResult<Option<String>> {
        self.db.get_value(SNAPSHOT_KEY).await
    }

    pub async fn load(&self) -> AppResult<Option<UserProfileState>> {
        match self.load_raw().await? {
            Some(raw) => match serde_json::from_str(&raw) {
                Ok(state) => Ok(Some(state)),
                Err(e) => {
                    log::warn!("Ignoring unreadable profile snapshot: {}", e);
                    Ok(None)
                }
            },
            None => Ok(None),
        }
    }

    pub async fn save(&self, state: &UserProfileState) -> AppResult<()> {
        let raw = serde_json::to_string(state)?;
        self.db.put_value(SNAPSHOT_KEY, &raw).await
    }

    pub async fn clear(&self) -> AppResult<()> {
        self.db.delete_value(SNAPSHOT_KEY).await?;
        Ok(())
    }

    /// Shallow-merges `patch` into the persisted record, seeding an empty
    /// cache with `seed`.
    pub async fn merge(
        &self,
        patch: &ProfilePatch,
        seed: &UserProfileState,
    ) -> AppResult<UserProfileState> {
        let mut state = self.load().await?.unwrap_or_else(|| seed.clone());
        patch.apply(&mut state);
        self.save(&state).await?;
        Ok(state)
    }

    /// Startup path: copies the persisted record into the store, if any.
    pub async fn rehydrate(&self, store: &ProfileStore) -> AppResult<bool> {
        match self.load().await? {
            Some(state) => {
                log::info!(
                    "Rehydrated profile state for {}",
                    state.id.as_deref().unwrap_or("unknown user")
                );
                store.replace(Some(state));
                Ok(true)
            }
            None => {
                log::debug!("No persisted profile snapshot to rehydrate");
                Ok(false)
            }
        }
    }
}
