//! Cancellable load timeout backed by a tokio task.

use std::time::Duration;

use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tokio::time::sleep;

/// Scheduled callback that fires once after `delay` unless cancelled first.
#[derive(Debug)]
pub struct TimeoutTimer {
    handle: JoinHandle<()>,
    delay: Duration,
}

impl TimeoutTimer {
    /// Schedule `on_fire` on the current tokio runtime.
    ///
    /// Returns `None` when called outside a runtime; the caller then proceeds
    /// without a timeout.
    pub fn arm<F>(delay: Duration, on_fire: F) -> Option<Self>
    where
        F: FnOnce() + Send + 'static,
    {
        let runtime = match Handle::try_current() {
            Ok(runtime) => runtime,
            Err(err) => {
                log::warn!("no async runtime available, load timeout disabled: {err}");
                return None;
            }
        };

        let handle = runtime.spawn(async move {
            sleep(delay).await;
            on_fire();
        });

        Some(Self { handle, delay })
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }

    /// Disarm the timer. A no-op if it already fired.
    pub fn cancel(self) {
        self.handle.abort();
    }

    /// Forget the timer without aborting; used from within the firing task.
    pub(crate) fn release(self) {
        drop(self.handle);
    }
}
