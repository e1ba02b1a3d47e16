use anyhow::{bail, Context, Result};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use profile_photo_uploader::config;
use profile_photo_uploader::database::Database;
use profile_photo_uploader::uploader::notifications::{
    ChannelNotificationSink, LogNotificationSink, Notification, NotificationSink,
};
use profile_photo_uploader::uploader::{HttpTransport, ProfilePhotoUploader, SelectedFile};
use profile_photo_uploader::{AttemptOutcome, ProfileStore, SnapshotCache};

const USAGE: &str = "usage: profile-photo-uploader <file> [--content-type <mime>]\n       profile-photo-uploader history [limit]";

enum Command {
    Upload {
        file_path: String,
        content_type: Option<String>,
    },
    History {
        limit: i64,
    },
}

fn parse_args(mut args: impl Iterator<Item = String>) -> Result<Command> {
    let Some(first) = args.next() else {
        bail!(USAGE);
    };

    if first == "history" {
        let limit = match args.next() {
            Some(raw) => raw.parse().context("history limit must be a number")?,
            None => 20,
        };
        return Ok(Command::History { limit });
    }

    let mut content_type = None;
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--content-type" => {
                content_type = Some(args.next().context("--content-type needs a value")?);
            }
            other => bail!("unexpected argument '{}'\n{}", other, USAGE),
        }
    }

    Ok(Command::Upload {
        file_path: first,
        content_type,
    })
}

/// Prints notifications until every sender is gone, then reports how many
/// were printed.
fn spawn_notification_printer(
    mut notifications: mpsc::UnboundedReceiver<Notification>,
) -> JoinHandle<usize> {
    tokio::spawn(async move {
        let mut printed = 0;
        while let Some(notification) = notifications.recv().await {
            println!("{}: {}", notification.title, notification.description);
            printed += 1;
        }
        printed
    })
}

#[tokio::main]
async fn main() -> Result<()> {
    let config = config::load_config().context("loading configuration")?;

    env_logger::Builder::new()
        .filter_level(config.log_level.parse().unwrap_or(log::LevelFilter::Info))
        .parse_default_env()
        .init();

    log::info!("Starting Profile Photo Uploader");

    let command = parse_args(std::env::args().skip(1))?;

    let db = Database::open(&config::get_database_path()?)
        .await
        .context("opening local database")?;
    if let Err(e) = db.cleanup_old_attempts(config.history_retention_days).await {
        log::warn!("History cleanup failed (non-critical): {}", e);
    }

    let (file_path, content_type) = match command {
        Command::History { limit } => {
            for record in db.recent_attempts(limit).await? {
                println!(
                    "{}  {:<9}  {}  {}",
                    record.attempted_at,
                    record.status,
                    record.file_name,
                    record
                        .remote_url
                        .or(record.error_message)
                        .unwrap_or_default()
                );
            }
            return Ok(());
        }
        Command::Upload {
            file_path,
            content_type,
        } => (file_path, content_type),
    };

    let store = ProfileStore::default();
    let cache = SnapshotCache::new(db.clone());
    cache
        .rehydrate(&store)
        .await
        .context("rehydrating profile state")?;

    let transport = Arc::new(HttpTransport::from_config(&config)?);

    let (notifier, printer) = if config.show_upload_notifications {
        let (sink, notifications) = ChannelNotificationSink::new();
        let printer = spawn_notification_printer(notifications);
        (Arc::new(sink) as Arc<dyn NotificationSink>, Some(printer))
    } else {
        (Arc::new(LogNotificationSink) as Arc<dyn NotificationSink>, None)
    };

    let uploader = Arc::new(
        ProfilePhotoUploader::new(transport, &store, cache, notifier).with_history(db.clone()),
    );

    let mut progress = uploader.progress().subscribe();
    tokio::spawn(async move {
        while progress.changed().await.is_ok() {
            let value = *progress.borrow();
            if value > 0 {
                println!("Uploading... {}%", value);
            }
        }
    });

    let mut file = SelectedFile::from_path(&file_path)
        .await
        .with_context(|| format!("reading {}", file_path))?;
    if let Some(content_type) = content_type {
        file.content_type = content_type;
    }

    let attempt = {
        let uploader = Arc::clone(&uploader);
        tokio::spawn(async move { uploader.on_change(vec![file]).await })
    };
    tokio::pin!(attempt);

    let outcome = tokio::select! {
        joined = &mut attempt => joined.context("upload task panicked")??,
        _ = tokio::signal::ctrl_c() => {
            uploader.cancel_in_flight();
            attempt.await.context("upload task panicked")??
        }
    };

    // The uploader holds the last notification sender; dropping it lets the
    // printer drain and stop.
    drop(uploader);
    if let Some(printer) = printer {
        match printer.await {
            Ok(printed) => log::debug!("Printed {} notification(s)", printed),
            Err(e) => log::warn!("Notification printer stopped abnormally: {}", e),
        }
    }

    match outcome {
        AttemptOutcome::Confirmed {
            remote_url, sync, ..
        } => {
            println!("Avatar updated: {}", remote_url);
            if let Some(drift) = sync.snapshot_error {
                eprintln!("Warning: profile cache not updated ({})", drift);
            }
        }
        AttemptOutcome::Failed { error, .. } => {
            db.close().await;
            bail!("upload failed: {}", error);
        }
        AttemptOutcome::Skipped { .. } => {
            println!("Skipped {}: only images and videos can be uploaded", file_path);
        }
        AttemptOutcome::Ignored => println!("Nothing selected"),
    }

    db.close().await;
    Ok(())
}
