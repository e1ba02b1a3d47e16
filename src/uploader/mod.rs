// Main uploader module - everything between a picked file and a confirmed avatar
//
// Selection, transfer, progress, and the state writes that follow a confirmation.

pub mod confirmation;
pub mod coordinator;
pub mod media;
pub mod notifications;
pub mod photo_uploader;
pub mod progress_tracker;
pub mod selection;
pub mod synchronizer;
pub mod transport;

pub use media::{MediaAsset, MediaKind, SelectedFile};
pub use notifications::{Notification, NotificationSink, Severity};
pub use photo_uploader::{AttemptOutcome, ProfilePhotoUploader};
pub use progress_tracker::ProgressReporter;
pub use transport::{AvatarTransport, CredentialPolicy, HttpTransport, ProgressCallback, UploadRequest};
