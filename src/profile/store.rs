use std::sync::Arc;
use tokio::sync::watch;

use super::{ProfilePatch, UserProfileState};

/// Application-wide holder of the current [`UserProfileState`].
///
/// Writes go through a single `watch` sender so exactly one writer mutates the
/// record at a time; readers get change notifications via [`subscribe`].
/// Concurrent writers are last-writer-wins.
///
/// [`subscribe`]: ProfileStore::subscribe
#[derive(Debug, Clone)]
pub struct ProfileStore {
    inner: Arc<watch::Sender<Option<UserProfileState>>>,
}

impl Default for ProfileStore {
    fn default() -> Self {
        Self::new(None)
    }
}

impl ProfileStore {
    pub fn new(initial: Option<UserProfileState>) -> Self {
        let (sender, _) = watch::channel(initial);
        Self {
            inner: Arc::new(sender),
        }
    }

    pub fn current(&self) -> Option<UserProfileState> {
        self.inner.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<Option<UserProfileState>> {
        self.inner.subscribe()
    }

    pub fn replace(&self, state: Option<UserProfileState>) {
        self.inner.send_replace(state);
    }

    /// Merges `patch` into the current record. An empty store is seeded with
    /// `seed` first. Returns the record as stored afterwards.
    pub fn merge(&self, patch: &ProfilePatch, seed: &UserProfileState) -> UserProfileState {
        let mut merged = None;
        self.inner.send_if_modified(|slot| {
            let changed = if let Some(state) = slot.as_mut() {
                patch.apply(state)
            } else {
                let mut state = seed.clone();
                patch.apply(&mut state);
                *slot = Some(state);
                true
            };
            merged = slot.clone();
            changed
        });

        merged.unwrap_or_else(|| seed.clone())
    }

    /// Write capability handed to components that may patch but not own the
    /// record.
    pub fn patcher(&self) -> ProfilePatcher {
        ProfilePatcher {
            store: self.clone(),
        }
    }
}

/// Patch-only handle onto a [`ProfileStore`].
#[derive(Debug, Clone)]
pub struct ProfilePatcher {
    store: ProfileStore,
}

impl ProfilePatcher {
    pub fn apply(&self, patch: &ProfilePatch, seed: &UserProfileState) -> UserProfileState {
        self.store.merge(patch, seed)
    }
}
