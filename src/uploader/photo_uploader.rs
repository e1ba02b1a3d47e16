use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio_util::sync::CancellationToken;

use super::coordinator::UploadCoordinator;
use super::media::{MediaAsset, SelectedFile};
use super::notifications::{Notification, NotificationSink};
use super::progress_tracker::ProgressReporter;
use super::selection::SelectionSurface;
use super::synchronizer::{StateSynchronizer, SyncReport};
use super::transport::AvatarTransport;
use crate::database::{AttemptRecord, Database};
use crate::errors::{AppError, AppResult, ErrorClass};
use crate::profile::{ProfileStore, SnapshotCache};

/// How one selection ended.
#[derive(Debug)]
pub enum AttemptOutcome {
    /// Nothing usable was selected; nothing changed.
    Ignored,
    /// The preview changed but the kind is not uploadable, so no request was
    /// made.
    Skipped { asset: MediaAsset },
    Confirmed {
        attempt_id: String,
        asset: MediaAsset,
        remote_url: String,
        sync: SyncReport,
    },
    Failed { attempt_id: String, error: AppError },
}

impl AttemptOutcome {
    pub fn is_confirmed(&self) -> bool {
        matches!(self, AttemptOutcome::Confirmed { .. })
    }
}

#[derive(Debug)]
struct InFlight {
    attempt_id: String,
    cancel: CancellationToken,
}

/// Holds the in-flight slot for one attempt and frees it on drop, including
/// when the attempt future is dropped half way. A dropped attempt also has
/// its progress put back to 0.
struct InFlightGuard<'a> {
    slot: &'a Mutex<Option<InFlight>>,
    progress: &'a ProgressReporter,
    attempt_id: String,
    cancel: CancellationToken,
}

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        if self.progress.abandon_attempt() {
            log::warn!("Attempt {} dropped before it finished", self.attempt_id);
        }

        let mut slot = self.slot.lock().unwrap_or_else(PoisonError::into_inner);
        if slot
            .as_ref()
            .is_some_and(|current| current.attempt_id == self.attempt_id)
        {
            *slot = None;
        }
    }
}

/// The profile photo control: one selection surface, one upload at a time,
/// and the state writes that follow a confirmed upload.
pub struct ProfilePhotoUploader {
    surface: Mutex<SelectionSurface>,
    coordinator: UploadCoordinator,
    synchronizer: StateSynchronizer,
    notifier: Arc<dyn NotificationSink>,
    history: Option<Database>,
    in_flight: Mutex<Option<InFlight>>,
}

impl ProfilePhotoUploader {
    /// The preview starts from the avatar currently in `store`.
    pub fn new(
        transport: Arc<dyn AvatarTransport>,
        store: &ProfileStore,
        cache: SnapshotCache,
        notifier: Arc<dyn NotificationSink>,
    ) -> Self {
        let initial_avatar = store.current().and_then(|user| user.avatar);

        Self {
            surface: Mutex::new(SelectionSurface::with_initial(initial_avatar.as_deref())),
            coordinator: UploadCoordinator::new(transport, ProgressReporter::new()),
            synchronizer: StateSynchronizer::new(store.patcher(), cache),
            notifier,
            history: None,
            in_flight: Mutex::new(None),
        }
    }

    /// Records every finished attempt in `upload_history`.
    pub fn with_history(mut self, db: Database) -> Self {
        self.history = Some(db);
        self
    }

    pub fn progress(&self) -> &ProgressReporter {
        self.coordinator.progress()
    }

    pub fn preview(&self) -> Option<MediaAsset> {
        self.lock_surface().current().cloned()
    }

    pub fn is_busy(&self) -> bool {
        self.lock_in_flight().is_some()
    }

    /// Abandons the running transfer, if any. It then ends as a failed
    /// attempt.
    pub fn cancel_in_flight(&self) -> bool {
        match self.lock_in_flight().as_ref() {
            Some(in_flight) => {
                log::info!("Cancelling attempt {}", in_flight.attempt_id);
                in_flight.cancel.cancel();
                true
            }
            None => false,
        }
    }

    /// Handles a pick from the capture zone. Only the first file counts; it
    /// replaces whatever was pending.
    pub async fn on_change(&self, files: Vec<SelectedFile>) -> AppResult<AttemptOutcome> {
        if files.is_empty() {
            return ignore_selection(AppError::EmptySelection).map(|_| AttemptOutcome::Ignored);
        }

        let guard = self.acquire()?;
        let selected = self.lock_surface().add(files);
        match selected {
            Ok((asset, file)) => Ok(self.run_attempt(&guard, asset, file).await),
            Err(e) => ignore_selection(e).map(|_| AttemptOutcome::Ignored),
        }
    }

    pub async fn replace(&self, index: usize, file: SelectedFile) -> AppResult<AttemptOutcome> {
        let guard = self.acquire()?;
        let replaced = self.lock_surface().replace(index, file.clone());
        match replaced {
            Ok(asset) => Ok(self.run_attempt(&guard, asset, file).await),
            Err(e) => ignore_selection(e).map(|_| AttemptOutcome::Ignored),
        }
    }

    /// Clears the preview slot. Shared state is not touched.
    pub fn remove(&self, index: usize) -> AppResult<Option<MediaAsset>> {
        let _guard = self.acquire()?;
        let removed = self.lock_surface().remove(index);
        match removed {
            Ok(asset) => Ok(Some(asset)),
            Err(e) => ignore_selection(e).map(|_| None),
        }
    }

    fn acquire(&self) -> AppResult<InFlightGuard<'_>> {
        let mut slot = self.lock_in_flight();
        if let Some(current) = slot.as_ref() {
            log::warn!(
                "Rejecting selection while attempt {} is in flight",
                current.attempt_id
            );
            return Err(AppError::attempt_in_flight(&current.attempt_id));
        }

        let attempt_id = uuid::Uuid::new_v4().to_string();
        let cancel = CancellationToken::new();
        *slot = Some(InFlight {
            attempt_id: attempt_id.clone(),
            cancel: cancel.clone(),
        });

        Ok(InFlightGuard {
            slot: &self.in_flight,
            progress: self.coordinator.progress(),
            attempt_id,
            cancel,
        })
    }

    async fn run_attempt(
        &self,
        guard: &InFlightGuard<'_>,
        asset: MediaAsset,
        file: SelectedFile,
    ) -> AttemptOutcome {
        let attempt_id = guard.attempt_id.clone();

        let result = self
            .coordinator
            .begin(&attempt_id, &file, &guard.cancel)
            .await;

        let outcome = match result {
            Err(e) if e.class() == ErrorClass::Selection => {
                log::debug!("Attempt {} not sent: {}", attempt_id, e);
                return AttemptOutcome::Skipped { asset };
            }
            Ok(confirmed) => {
                let sync = self
                    .synchronizer
                    .commit(&confirmed.remote_url, &confirmed.record)
                    .await;

                let mut asset = asset;
                if self
                    .lock_surface()
                    .attach_remote(asset.id, &confirmed.remote_url)
                {
                    asset.remote_url = Some(confirmed.remote_url.clone());
                }

                self.progress().finish_attempt();
                self.notifier.notify(Notification::upload_succeeded());

                AttemptOutcome::Confirmed {
                    attempt_id,
                    asset,
                    remote_url: confirmed.remote_url,
                    sync,
                }
            }
            Err(error) => {
                if !error.is_surfaced() {
                    log::error!("Attempt {} ended with an unexpected error: {}", attempt_id, error);
                }
                self.progress().finish_attempt();
                self.notifier.notify(Notification::upload_failed());

                AttemptOutcome::Failed { attempt_id, error }
            }
        };

        self.record_history(&file, &outcome).await;
        outcome
    }

    async fn record_history(&self, file: &SelectedFile, outcome: &AttemptOutcome) {
        let Some(db) = &self.history else {
            return;
        };

        let (attempt_id, status, error_message, remote_url) = match outcome {
            AttemptOutcome::Confirmed {
                attempt_id,
                remote_url,
                ..
            } => (attempt_id, "confirmed", None, Some(remote_url.clone())),
            AttemptOutcome::Failed { attempt_id, error } => {
                let status = match error {
                    AppError::UploadCancelled { .. } => "cancelled",
                    _ => "failed",
                };
                (attempt_id, status, Some(error.to_string()), None)
            }
            AttemptOutcome::Ignored | AttemptOutcome::Skipped { .. } => return,
        };

        let record = AttemptRecord {
            attempt_id: attempt_id.clone(),
            file_name: file.file_name.clone(),
            media_kind: file.kind().map(|k| k.as_str().to_string()),
            file_size: i64::try_from(file.bytes.len()).unwrap_or(i64::MAX),
            status: status.to_string(),
            error_message,
            remote_url,
            attempted_at: chrono::Utc::now().to_rfc3339(),
        };

        if let Err(e) = db.record_attempt(&record).await {
            log::warn!("Failed to record attempt {} (non-critical): {}", attempt_id, e);
        }
    }

    fn lock_surface(&self) -> MutexGuard<'_, SelectionSurface> {
        self.surface.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn lock_in_flight(&self) -> MutexGuard<'_, Option<InFlight>> {
        self.in_flight.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Selection errors never reach the user; anything else goes back to the
/// caller.
fn ignore_selection(error: AppError) -> AppResult<()> {
    if error.class() == ErrorClass::Selection {
        log::debug!("Selection ignored: {}", error);
        Ok(())
    } else {
        Err(error)
    }
}
