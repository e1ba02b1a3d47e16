// Profile state shared across the application
//
// The record itself, the in-memory store every screen reads from, and the
// durable snapshot that survives restarts.

pub mod session;
pub mod snapshot;
pub mod store;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

pub use snapshot::{SnapshotCache, SNAPSHOT_KEY};
pub use store::{ProfilePatcher, ProfileStore};

/// Current user's profile as the remote service describes it.
///
/// Fields this crate does not know about are kept in `extra` so a write never
/// drops data another component put there.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfileState {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avatar: Option<String>,
    #[serde(default)]
    pub logged_in: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_logged_in: Option<i64>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Shallow merge-patch over [`UserProfileState`]. `None` leaves a field as is.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProfilePatch {
    pub display_name: Option<String>,
    pub avatar: Option<String>,
    pub logged_in: Option<bool>,
    pub last_logged_in: Option<i64>,
}

impl ProfilePatch {
    pub fn avatar(url: impl Into<String>) -> Self {
        Self {
            avatar: Some(url.into()),
            ..Self::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        self == &Self::default()
    }

    /// Returns true when any field actually changed.
    pub fn apply(&self, state: &mut UserProfileState) -> bool {
        let mut changed = false;

        if let Some(display_name) = &self.display_name {
            changed |= state.display_name.as_ref() != Some(display_name);
            state.display_name = Some(display_name.clone());
        }
        if let Some(avatar) = &self.avatar {
            changed |= state.avatar.as_ref() != Some(avatar);
            state.avatar = Some(avatar.clone());
        }
        if let Some(logged_in) = self.logged_in {
            changed |= state.logged_in != logged_in;
            state.logged_in = logged_in;
        }
        if let Some(last_logged_in) = self.last_logged_in {
            changed |= state.last_logged_in != Some(last_logged_in);
            state.last_logged_in = Some(last_logged_in);
        }

        changed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unknown_fields_survive_round_trip() {
        let raw = r#"{"id":"u1","avatar":"https://cdn/a.png","loggedIn":true,"role":"admin","prefs":{"dark":true}}"#;
        let state: UserProfileState = serde_json::from_str(raw).unwrap();

        assert_eq!(state.id.as_deref(), Some("u1"));
        assert_eq!(state.extra.get("role"), Some(&Value::from("admin")));

        let back: Value = serde_json::to_value(&state).unwrap();
        assert_eq!(back["prefs"]["dark"], Value::Bool(true));
        assert_eq!(back["loggedIn"], Value::Bool(true));
    }

    #[test]
    fn test_avatar_patch_only_touches_avatar() {
        let mut state = UserProfileState {
            id: Some("u1".to_string()),
            display_name: Some("Ada".to_string()),
            avatar: Some("https://cdn/old.png".to_string()),
            logged_in: true,
            ..Default::default()
        };
        let before = state.clone();

        assert!(ProfilePatch::avatar("https://cdn/new.png").apply(&mut state));
        assert_eq!(state.avatar.as_deref(), Some("https://cdn/new.png"));
        assert_eq!(state.display_name, before.display_name);
        assert_eq!(state.logged_in, before.logged_in);

        assert!(!ProfilePatch::avatar("https://cdn/new.png").apply(&mut state));
        assert!(ProfilePatch::default().is_empty());
    }
}
