use super::{ProfileStore, SnapshotCache, UserProfileState};
use crate::errors::AppResult;

/// Login writer: stores the authenticated user with session flags set, in both
/// the shared store and the durable snapshot.
pub async fn record_login(
    store: &ProfileStore,
    cache: &SnapshotCache,
    user: UserProfileState,
) -> AppResult<UserProfileState> {
    let state = UserProfileState {
        logged_in: true,
        last_logged_in: Some(chrono::Utc::now().timestamp_millis()),
        ..user
    };

    store.replace(Some(state.clone()));
    cache.save(&state).await?;

    log::info!(
        "Recorded login for {}",
        state.id.as_deref().unwrap_or("unknown user")
    );
    Ok(state)
}

pub async fn record_logout(store: &ProfileStore, cache: &SnapshotCache) -> AppResult<()> {
    store.replace(None);
    cache.clear().await?;
    log::info!("Cleared profile state after logout");
    Ok(())
}
