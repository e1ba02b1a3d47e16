use crate::errors::AppError;
use crate::profile::{ProfilePatch, ProfilePatcher, SnapshotCache, UserProfileState};

/// What a sync after confirmation managed to write.
#[derive(Debug, Clone, PartialEq)]
pub struct SyncReport {
    pub store_state: UserProfileState,
    /// Set when the durable write failed after the store was updated.
    pub snapshot_error: Option<String>,
}

impl SyncReport {
    pub fn snapshot_persisted(&self) -> bool {
        self.snapshot_error.is_none()
    }
}

/// Writes a confirmed avatar into the shared store, then the durable snapshot.
///
/// The two writes are independent: a failed snapshot write leaves the store
/// updated and is only logged.
#[derive(Debug, Clone)]
pub struct StateSynchronizer {
    patcher: ProfilePatcher,
    cache: SnapshotCache,
}

impl StateSynchronizer {
    pub fn new(patcher: ProfilePatcher, cache: SnapshotCache) -> Self {
        Self { patcher, cache }
    }

    pub async fn commit(&self, remote_url: &str, confirmed: &UserProfileState) -> SyncReport {
        let patch = ProfilePatch::avatar(remote_url);

        let store_state = self.patcher.apply(&patch, confirmed);
        log::info!("Shared profile state now points at {}", remote_url);

        let snapshot_error = match self.cache.merge(&patch, &store_state).await {
            Ok(_) => None,
            Err(e) => Some(AppError::consistency(format!("snapshot write failed: {}", e)).to_string()),
        };

        SyncReport {
            store_state,
            snapshot_error,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::Database;
    use crate::profile::ProfileStore;

    fn user(avatar: &str) -> UserProfileState {
        UserProfileState {
            id: Some("u1".to_string()),
            display_name: Some("Ada".to_string()),
            avatar: Some(avatar.to_string()),
            logged_in: true,
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_commit_updates_store_and_snapshot() {
        let db = Database::in_memory().await.unwrap();
        let cache = SnapshotCache::new(db);
        cache.save(&user("https://cdn/old.png")).await.unwrap();
        let store = ProfileStore::new(Some(user("https://cdn/old.png")));

        let sync = StateSynchronizer::new(store.patcher(), cache.clone());
        let confirmed = UserProfileState {
            avatar: Some("https://cdn/new.png".to_string()),
            ..Default::default()
        };
        let report = sync.commit("https://cdn/new.png", &confirmed).await;

        assert!(report.snapshot_persisted());
        assert_eq!(report.store_state.display_name.as_deref(), Some("Ada"));
        assert_eq!(
            store.current().unwrap().avatar.as_deref(),
            Some("https://cdn/new.png")
        );
        let persisted = cache.load().await.unwrap().unwrap();
        assert_eq!(persisted.avatar.as_deref(), Some("https://cdn/new.png"));
        assert_eq!(persisted.display_name.as_deref(), Some("Ada"));
    }

    #[tokio::test]
    async fn test_snapshot_failure_keeps_store_write() {
        let db = Database::in_memory().await.unwrap();
        let cache = SnapshotCache::new(db.clone());
        let store = ProfileStore::new(Some(user("https://cdn/old.png")));
        db.close().await;

        let sync = StateSynchronizer::new(store.patcher(), cache);
        let report = sync
            .commit("https://cdn/new.png", &UserProfileState::default())
            .await;

        assert!(!report.snapshot_persisted());
        assert!(report.snapshot_error.unwrap().starts_with("State drift"));
        assert_eq!(
            store.current().unwrap().avatar.as_deref(),
            Some("https://cdn/new.png")
        );
    }
}
