use std::sync::Arc;
use tokio::sync::watch;

/// Percentage for `sent` of `total` bytes, rounded half up and clamped to 100.
/// An unreported or zero total yields `None`.
pub fn progress_percent(sent: u64, total: Option<u64>) -> Option<u8> {
    let total = total.filter(|t| *t > 0)?;
    let percent = (sent as f64 / total as f64 * 100.0).round();
    Some(percent.clamp(0.0, 100.0) as u8)
}

/// Publishes the 0-100 progress of the current attempt.
///
/// Within an attempt the published value never goes down. It is put back to
/// 0 when an attempt starts and when it ends.
#[derive(Debug, Clone)]
pub struct ProgressReporter {
    value: Arc<watch::Sender<u8>>,
}

impl Default for ProgressReporter {
    fn default() -> Self {
        Self::new()
    }
}

impl ProgressReporter {
    pub fn new() -> Self {
        let (sender, _) = watch::channel(0);
        Self {
            value: Arc::new(sender),
        }
    }

    pub fn current(&self) -> u8 {
        *self.value.borrow()
    }

    pub fn subscribe(&self) -> watch::Receiver<u8> {
        self.value.subscribe()
    }

    pub fn begin_attempt(&self) {
        self.value.send_replace(0);
        log::debug!("Progress reset for new attempt");
    }

    /// Feeds one transport callback. Returns the published value, or `None`
    /// when the update was dropped.
    pub fn record(&self, sent: u64, total: Option<u64>) -> Option<u8> {
        let Some(percent) = progress_percent(sent, total) else {
            log::debug!("Dropping progress update without a usable total ({} bytes sent)", sent);
            return None;
        };

        self.value.send_if_modified(|current| {
            if percent > *current {
                *current = percent;
                true
            } else {
                false
            }
        });

        let published = self.current();
        log::debug!("Progress: {}% ({} bytes sent)", published, sent);
        Some(published)
    }

    pub fn finish_attempt(&self) {
        self.value.send_replace(0);
        log::debug!("Progress reset after attempt");
    }

    /// Puts back a value left behind by an attempt that was dropped before
    /// it finished. Returns whether anything was reset.
    pub fn abandon_attempt(&self) -> bool {
        let reset = self.value.send_if_modified(|current| {
            if *current == 0 {
                return false;
            }
            *current = 0;
            true
        });
        if reset {
            log::debug!("Progress reset for abandoned attempt");
        }
        reset
    }
}
