use std::sync::Arc;
use tokio_util::sync::CancellationToken;

use super::confirmation::{parse_confirmation, ConfirmedUpload};
use super::media::{MediaKind, SelectedFile};
use super::progress_tracker::ProgressReporter;
use super::transport::{AvatarTransport, ProgressCallback, UploadRequest};
use crate::errors::{AppError, AppResult};

/// Drives exactly one transfer per call and turns the response into a
/// confirmed record.
pub struct UploadCoordinator {
    transport: Arc<dyn AvatarTransport>,
    progress: ProgressReporter,
}

impl UploadCoordinator {
    pub fn new(transport: Arc<dyn AvatarTransport>, progress: ProgressReporter) -> Self {
        Self {
            transport,
            progress,
        }
    }

    pub fn progress(&self) -> &ProgressReporter {
        &self.progress
    }

    /// Uploads `file`. An unrecognized kind fails with
    /// [`AppError::UnsupportedMedia`] before anything is sent.
    ///
    /// Progress is reset before the request goes out; resetting it afterwards
    /// is left to the caller so it can order the reset after state sync.
    pub async fn begin(
        &self,
        attempt_id: &str,
        file: &SelectedFile,
        cancel: &CancellationToken,
    ) -> AppResult<ConfirmedUpload> {
        let Some(kind) = MediaKind::classify(&file.content_type) else {
            log::info!(
                "Skipping {}: unrecognized content type '{}'",
                file.file_name,
                file.content_type
            );
            return Err(AppError::unsupported_media(&file.content_type));
        };

        self.progress.begin_attempt();

        let request = UploadRequest {
            kind,
            file_name: file.file_name.clone(),
            content_type: file.content_type.clone(),
            bytes: file.bytes.clone(),
        };

        let reporter = self.progress.clone();
        let on_progress: ProgressCallback = Arc::new(move |sent, total| {
            reporter.record(sent, total);
        });

        log::info!(
            "Attempt {}: transferring {} as {} ({} bytes)",
            attempt_id,
            file.file_name,
            kind,
            file.size()
        );

        let result = tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                log::info!("Attempt {} cancelled during transfer", attempt_id);
                Err(AppError::upload_cancelled(attempt_id))
            }
            response = self.transport.upload(request, on_progress) => {
                response.and_then(|body| parse_confirmation(&body))
            }
        };

        match &result {
            Ok(confirmed) => log::info!(
                "Attempt {} confirmed with avatar {}",
                attempt_id,
                confirmed.remote_url
            ),
            Err(e) => log::error!("Attempt {} failed: {}", attempt_id, e),
        }

        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Default)]
    struct CountingTransport {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl AvatarTransport for CountingTransport {
        async fn upload(&self, _request: UploadRequest, on_progress: ProgressCallback) -> AppResult<String> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            on_progress(5, Some(10));
            Ok(r#"{"updatedUser":{"avatar":"https://cdn/x/a.png"}}"#.to_string())
        }
    }

    #[tokio::test]
    async fn test_unrecognized_kind_is_unsupported_media() {
        let transport = Arc::new(CountingTransport::default());
        let coordinator = UploadCoordinator::new(transport.clone(), ProgressReporter::new());
        let notes = SelectedFile::new("notes.txt", "text/plain", b"hi".to_vec());

        let err = coordinator
            .begin("a1", &notes, &CancellationToken::new())
            .await
            .unwrap_err();

        assert!(matches!(err, AppError::UnsupportedMedia { ref content_type } if content_type == "text/plain"));
        assert!(!err.is_surfaced());
        assert_eq!(transport.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_image_is_sent_and_confirmed() {
        let transport = Arc::new(CountingTransport::default());
        let coordinator = UploadCoordinator::new(transport.clone(), ProgressReporter::new());
        let png = SelectedFile::new("a.png", "image/png", vec![0u8; 10]);

        let confirmed = coordinator
            .begin("a2", &png, &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(confirmed.remote_url, "https://cdn/x/a.png");
        assert_eq!(coordinator.progress().current(), 50);
        assert_eq!(transport.calls.load(Ordering::SeqCst), 1);
    }
}
