//! Request tokens and duplicate-submit guards
//!
//! Every async response that writes UI state carries a [`Ticket`]. Starting a
//! new request for the same resource supersedes older tickets (and aborts the
//! task registered for them), so a slow response for a clip the user has
//! already navigated away from is dropped instead of overwriting the new one.

use crate::core::error::{Error, Result};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::task::AbortHandle;
use tracing::debug;

/// Resources whose responses are gated by tokens
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Resource {
    Label,
    PlayCount,
    AudioList,
}

/// Proof that a response belongs to the latest request for its resource
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Ticket {
    resource: Resource,
    generation: u64,
}

impl Ticket {
    pub fn resource(&self) -> Resource {
        self.resource
    }
}

#[derive(Default)]
struct Slot {
    generation: u64,
    task: Option<AbortHandle>,
}

/// Per-resource request generations, shared by every component of one page
#[derive(Clone, Default)]
pub struct RequestTokens {
    slots: Arc<Mutex<HashMap<Resource, Slot>>>,
}

impl RequestTokens {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a request, superseding (and aborting) whatever was in flight
    pub fn begin(&self, resource: Resource) -> Ticket {
        let mut slots = self.slots.lock();
        let slot = slots.entry(resource).or_default();
        if let Some(task) = slot.task.take() {
            debug!(?resource, "aborting superseded request");
            task.abort();
        }
        slot.generation += 1;
        Ticket {
            resource,
            generation: slot.generation,
        }
    }

    /// Register the task serving `ticket` so a later `begin` can abort it
    pub fn attach(&self, ticket: &Ticket, task: AbortHandle) {
        let mut slots = self.slots.lock();
        let slot = slots.entry(ticket.resource).or_default();
        if slot.generation == ticket.generation {
            slot.task = Some(task);
        } else {
            task.abort();
        }
    }

    pub fn is_current(&self, ticket: &Ticket) -> bool {
        self.slots
            .lock()
            .get(&ticket.resource)
            .map_or(false, |slot| slot.generation == ticket.generation)
    }

    /// `Err(Cancelled)` when the ticket has been superseded
    pub fn check(&self, ticket: &Ticket) -> Result<()> {
        if self.is_current(ticket) {
            Ok(())
        } else {
            debug!(resource = ?ticket.resource, "dropping stale response");
            Err(Error::Cancelled)
        }
    }

    /// Forget the task for a finished request
    pub fn finish(&self, ticket: &Ticket) {
        let mut slots = self.slots.lock();
        if let Some(slot) = slots.get_mut(&ticket.resource) {
            if slot.generation == ticket.generation {
                slot.task = None;
            }
        }
    }
}

/// Duplicate-submit guard for one control
#[derive(Clone, Default)]
pub struct InFlight {
    busy: Arc<AtomicBool>,
}

/// Held while the guarded request runs; releases the control on drop
#[must_use]
pub struct InFlightGuard {
    busy: Arc<AtomicBool>,
}

impl InFlight {
    pub fn new() -> Self {
        Self::default()
    }

    /// `None` when a request for this control is already running
    pub fn try_begin(&self) -> Option<InFlightGuard> {
        self.busy
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| InFlightGuard {
                busy: self.busy.clone(),
            })
    }

    pub fn is_busy(&self) -> bool {
        self.busy.load(Ordering::Acquire)
    }
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        self.busy.store(false, Ordering::Release);
    }
}
