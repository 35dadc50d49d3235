//! Session Watchdog
//!
//! Bounds the lifetime of a session. After the configured duration the
//! watchdog closes the channel once; the pending receive then returns a
//! local close and the session loop exits.

use std::time::Duration;

use tokio::task::JoinHandle;

use crate::application::ports::ChannelCloser;

/// Default maximum session duration.
pub const DEFAULT_SESSION_DURATION: Duration = Duration::from_secs(60 * 60);

/// What ended the watchdog.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WatchdogOutcome {
    /// The duration elapsed and this watchdog closed the channel.
    Expired,
    /// The channel was already closed when the watchdog fired or while it waited.
    AlreadyClosed,
}

/// Timer that closes a channel after a fixed duration.
///
/// # Example
///
/// ```rust,no_run
/// use std::time::Duration;
/// use birdeye_price_stream::application::ports::ChannelCloser;
/// use birdeye_price_stream::infrastructure::birdeye::watchdog::Watchdog;
///
/// async fn example(closer: ChannelCloser) {
///     let handle = Watchdog::new(Duration::from_secs(3600), closer).spawn();
///
///     // ... run the receive loop ...
///
///     handle.abort();
/// }
/// ```
#[derive(Debug)]
pub struct Watchdog {
    duration: Duration,
    closer: ChannelCloser,
}

impl Watchdog {
    /// Create a new watchdog.
    #[must_use]
    pub const fn new(duration: Duration, closer: ChannelCloser) -> Self {
        Self { duration, closer }
    }

    /// Run the watchdog on a background task.
    #[must_use]
    pub fn spawn(self) -> JoinHandle<WatchdogOutcome> {
        tokio::spawn(self.run())
    }

    /// Wait for the duration, then close the channel.
    pub async fn run(self) -> WatchdogOutcome {
        tokio::select! {
            () = self.closer.closed() => {
                tracing::debug!("Channel closed before session duration elapsed");
                return WatchdogOutcome::AlreadyClosed;
            }
            () = tokio::time::sleep(self.duration) => {}
        }

        if self.closer.close() {
            tracing::info!(
                duration_secs = self.duration.as_secs(),
                "Connection automatically closed after session duration"
            );
            WatchdogOutcome::Expired
        } else {
            WatchdogOutcome::AlreadyClosed
        }
    }
}
