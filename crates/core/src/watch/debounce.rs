use std::future;
use std::pin::Pin;
use std::time::Duration;
use tokio::time::{Instant, Sleep, sleep};

/// Single-slot debounce timer: restarting replaces any pending deadline
#[derive(Debug)]
pub struct Debounce {
    delay: Duration,
    slot: Option<Pin<Box<Sleep>>>,
}

impl Debounce {
    pub fn new(delay: Duration) -> Self {
        Self { delay, slot: None }
    }

    /// Cancel any pending deadline and start a fresh one
    pub fn restart(&mut self) {
        match self.slot.as_mut() {
            Some(pending) => pending.as_mut().reset(Instant::now() + self.delay),
            None => self.slot = Some(Box::pin(sleep(self.delay))),
        }
    }

    /// Drop the pending deadline, if any. Safe to call repeatedly.
    pub fn cancel(&mut self) {
        self.slot = None;
    }

    pub fn is_pending(&self) -> bool {
        self.slot.is_some()
    }

    /// Completes when the pending deadline passes and clears the slot.
    /// Never completes while nothing is pending.
    pub async fn expired(&mut self) {
        match self.slot.as_mut() {
            Some(pending) => pending.as_mut().await,
            None => future::pending::<()>().await,
        }
        self.slot = None;
    }
}
