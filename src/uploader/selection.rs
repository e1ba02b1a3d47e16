use uuid::Uuid;

use super::media::{MediaAsset, SelectedFile};
use crate::errors::{AppError, AppResult};

/// The surface holds at most this many pending assets.
pub const MAX_PENDING: usize = 1;

/// Capture zone for the single profile image. Changes here are local only:
/// the preview moves immediately and nothing is shared until an upload is
/// confirmed.
#[derive(Debug, Default, Clone)]
pub struct SelectionSurface {
    assets: Vec<MediaAsset>,
}

impl SelectionSurface {
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts with the avatar the profile already has.
    pub fn with_initial(avatar_url: Option<&str>) -> Self {
        let assets = avatar_url
            .filter(|url| !url.trim().is_empty())
            .map(|url| vec![MediaAsset::confirmed(url)])
            .unwrap_or_default();
        Self { assets }
    }

    pub fn assets(&self) -> &[MediaAsset] {
        &self.assets
    }

    pub fn current(&self) -> Option<&MediaAsset> {
        self.assets.first()
    }

    pub fn is_empty(&self) -> bool {
        self.assets.is_empty()
    }

    /// Adds the first of `files`; an existing entry is replaced. Zero files
    /// leaves the surface untouched.
    pub fn add(&mut self, files: Vec<SelectedFile>) -> AppResult<(MediaAsset, SelectedFile)> {
        let total = files.len();
        let file = files.into_iter().next().ok_or(AppError::EmptySelection)?;
        if total > MAX_PENDING {
            log::debug!(
                "Selection capped at {}: keeping {} and dropping {} more",
                MAX_PENDING,
                file.file_name,
                total - MAX_PENDING
            );
        }

        let asset = MediaAsset::from_selection(&file);
        self.assets.clear();
        self.assets.push(asset.clone());
        Ok((asset, file))
    }

    pub fn replace(&mut self, index: usize, file: SelectedFile) -> AppResult<MediaAsset> {
        if index >= self.assets.len() {
            return Err(AppError::InvalidSelectionIndex { index });
        }

        let asset = MediaAsset::from_selection(&file);
        self.assets[index] = asset.clone();
        Ok(asset)
    }

    pub fn remove(&mut self, index: usize) -> AppResult<MediaAsset> {
        if index >= self.assets.len() {
            return Err(AppError::InvalidSelectionIndex { index });
        }
        Ok(self.assets.remove(index))
    }

    /// Records the confirmed URL on the asset it was uploaded for. Returns
    /// false when that asset is gone or was already confirmed.
    pub fn attach_remote(&mut self, asset_id: Uuid, remote_url: &str) -> bool {
        match self.assets.iter_mut().find(|a| a.id == asset_id) {
            Some(asset) if asset.remote_url.is_none() => {
                asset.remote_url = Some(remote_url.to_string());
                true
            }
            Some(_) => {
                log::warn!("Asset {} already has a confirmed URL", asset_id);
                false
            }
            None => {
                log::debug!("Asset {} left the surface before confirmation", asset_id);
                false
            }
        }
    }
}
