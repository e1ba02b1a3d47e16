use base64::Engine;
use serde::{Deserialize, Serialize};
use std::path::Path;
use uuid::Uuid;

use crate::errors::AppResult;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
    Image,
    Video,
}

impl MediaKind {
    /// Classifies by the top-level part of a declared content type, so
    /// `image/png; q=1` and `IMAGE/JPEG` are both images. Anything else is
    /// unrecognized.
    pub fn classify(content_type: &str) -> Option<Self> {
        let top_level = content_type
            .split(';')
            .next()
            .and_then(|essence| essence.split('/').next())
            .map(|t| t.trim().to_ascii_lowercase())?;

        match top_level.as_str() {
            "image" => Some(MediaKind::Image),
            "video" => Some(MediaKind::Video),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            MediaKind::Image => "image",
            MediaKind::Video => "video",
        }
    }
}

impl std::fmt::Display for MediaKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A file picked by the user, with the content type it was declared as.
#[derive(Clone, PartialEq)]
pub struct SelectedFile {
    pub file_name: String,
    pub content_type: String,
    pub bytes: Vec<u8>,
}

impl std::fmt::Debug for SelectedFile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SelectedFile")
            .field("file_name", &self.file_name)
            .field("content_type", &self.content_type)
            .field("size", &self.bytes.len())
            .finish()
    }
}

impl SelectedFile {
    pub fn new(
        file_name: impl Into<String>,
        content_type: impl Into<String>,
        bytes: Vec<u8>,
    ) -> Self {
        Self {
            file_name: file_name.into(),
            content_type: content_type.into(),
            bytes,
        }
    }

    /// Reads a file from disk, declaring its content type from the extension.
    pub async fn from_path(file_path: &str) -> AppResult<Self> {
        let bytes = tokio::fs::read(file_path).await?;
        let file_name = Path::new(file_path)
            .file_name()
            .unwrap_or_default()
            .to_string_lossy()
            .to_string();

        Ok(Self::new(file_name, content_type_for_path(file_path), bytes))
    }

    pub fn size(&self) -> u64 {
        self.bytes.len() as u64
    }

    pub fn kind(&self) -> Option<MediaKind> {
        MediaKind::classify(&self.content_type)
    }

    /// Inline `data:` URL the preview renders from.
    pub fn preview_reference(&self) -> String {
        format!(
            "data:{};base64,{}",
            self.content_type,
            base64::engine::general_purpose::STANDARD.encode(&self.bytes)
        )
    }
}

pub fn content_type_for_path(file_path: &str) -> &'static str {
    let extension = Path::new(file_path)
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase);

    match extension.as_deref() {
        Some("png") => "image/png",
        Some("jpg") | Some("jpeg") => "image/jpeg",
        Some("webp") => "image/webp",
        Some("gif") => "image/gif",
        Some("bmp") => "image/bmp",
        Some("avif") => "image/avif",
        Some("mp4") | Some("m4v") => "video/mp4",
        Some("webm") => "video/webm",
        Some("mov") => "video/quicktime",
        Some("txt") => "text/plain",
        _ => "application/octet-stream",
    }
}

/// What the selection surface shows for its single slot.
#[derive(Debug, Clone, PartialEq)]
pub struct MediaAsset {
    pub id: Uuid,
    pub file_name: Option<String>,
    pub local_preview: String,
    pub remote_url: Option<String>,
    pub kind: Option<MediaKind>,
}

impl MediaAsset {
    pub fn from_selection(file: &SelectedFile) -> Self {
        Self {
            id: Uuid::new_v4(),
            file_name: Some(file.file_name.clone()),
            local_preview: file.preview_reference(),
            remote_url: None,
            kind: file.kind(),
        }
    }

    /// An asset for an avatar that is already stored remotely.
    pub fn confirmed(remote_url: impl Into<String>) -> Self {
        let remote_url = remote_url.into();
        Self {
            id: Uuid::new_v4(),
            file_name: None,
            local_preview: remote_url.clone(),
            remote_url: Some(remote_url),
            kind: Some(MediaKind::Image),
        }
    }

    pub fn is_confirmed(&self) -> bool {
        self.remote_url.is_some()
    }
}
