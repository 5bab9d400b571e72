//! Single-owner one-shot timer.
//!
//! At most one timer is live per `OneShot`.  Arming cancels the previous one.
//! Every firing carries the generation it was armed with, so a firing that
//! was already queued when the timer was cancelled is recognised as stale.

use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::AbortHandle;

use crate::session::SessionEvent;

#[derive(Debug, Default)]
pub struct OneShot {
    handle: Option<AbortHandle>,
    generation: u64,
    armed_total: u64,
}

impl OneShot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Arm the timer; `make` builds the event delivered after `delay`.
    pub fn arm<F>(&mut self, delay: Duration, tx: mpsc::Sender<SessionEvent>, make: F) -> u64
    where
        F: FnOnce(u64) -> SessionEvent + Send + 'static,
    {
        self.cancel();
        self.generation += 1;
        self.armed_total += 1;
        let generation = self.generation;
        let task = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            let _ = tx.send(make(generation)).await;
        });
        self.handle = Some(task.abort_handle());
        generation
    }

    /// Cancel the live timer, if any.  Returns whether one was live.
    pub fn cancel(&mut self) -> bool {
        match self.handle.take() {
            Some(handle) => {
                handle.abort();
                true
            }
            None => false,
        }
    }

    pub fn is_armed(&self) -> bool {
        self.handle.is_some()
    }

    /// Consume a firing.  True only for the live timer's own generation.
    pub fn take_if_current(&mut self, generation: u64) -> bool {
        if self.handle.is_some() && generation == self.generation {
            self.handle = None;
            true
        } else {
            false
        }
    }

    /// How many times this timer has been armed.
    pub fn armed_total(&self) -> u64 {
        self.armed_total
    }
}

impl Drop for OneShot {
    fn drop(&mut self) {
        self.cancel();
    }
}
