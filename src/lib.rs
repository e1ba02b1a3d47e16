//! Profile photo upload client.
//!
//! Picks a single image or video, streams it to the profile endpoint with
//! progress, and on confirmation writes the new avatar into the shared profile
//! store and its durable snapshot.

pub mod config;
pub mod database;
pub mod errors;
pub mod profile;
pub mod security;
pub mod uploader;

pub use errors::{AppError, AppResult, ErrorClass};
pub use profile::{ProfilePatch, ProfileStore, SnapshotCache, UserProfileState};
pub use uploader::{AttemptOutcome, ProfilePhotoUploader, SelectedFile};
