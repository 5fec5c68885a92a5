use parking_lot::{Condvar, Mutex};
use std::sync::Arc;
use std::time::Duration;

/// Stop signal shared between the bridge loop and whoever ends it
/// (typically a Ctrl+C handler).
///
/// The loop sleeps on the condition variable between polls, so a trigger
/// takes effect at the next iteration boundary without waiting out the
/// poll interval.
#[derive(Debug, Default)]
pub struct Shutdown {
    stopped: Mutex<bool>,
    cv: Condvar,
}

impl Shutdown {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn trigger(&self) {
        *self.stopped.lock() = true;
        self.cv.notify_all();
    }

    pub fn is_triggered(&self) -> bool {
        *self.stopped.lock()
    }

    /// Wait up to `timeout` for a trigger. Returns true if triggered.
    pub fn wait_timeout(&self, timeout: Duration) -> bool {
        let mut stopped = self.stopped.lock();
        self.cv
            .wait_while_for(&mut stopped, |stopped| !*stopped, timeout);
        *stopped
    }
}
