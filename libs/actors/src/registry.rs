//! Actor Registry
//!
//! Process-wide directory that maps actor ids and well-known names to strong
//! handles, plus the set of currently running actors.
//!
//! The registry does not contain every actor of a runtime; actors are put here
//! when something needs to find them later (network forwarding resolving an id
//! received from a peer, or a well-known service name).
//!
//! # Locking
//!
//! The three partitions are locked independently:
//!
//! 1. `entries` (id → handle), reader-writer lock
//! 2. `named` (name → handle), reader-writer lock
//! 3. `running` (running-id set), mutex + condition variable
//!
//! No operation ever holds more than one of them, so there is no lock order to
//! respect. Handles removed from a map are dropped after the lock is released,
//! so control block teardown never runs under a registry lock.

use actor_types::ActorId;
use parking_lot::{Condvar, Mutex, MutexGuard, RwLock};
use std::collections::{HashMap, HashSet};
use std::time::{Duration, Instant};
use tracing::{debug, trace, warn};

use crate::handle::ActorRef;

/// Snapshot of the name directory
pub type NameMap = HashMap<String, ActorRef>;

/// Directory of actors by id and by name, with running-actor tracking
#[derive(Debug, Default)]
pub struct ActorRegistry {
    entries: RwLock<HashMap<ActorId, ActorRef>>,
    named: RwLock<NameMap>,
    running: Mutex<HashSet<ActorId>>,
    running_changed: Condvar,
}

impl ActorRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Handle registered under `id`, if any
    pub fn get(&self, id: ActorId) -> Option<ActorRef> {
        self.entries.read().get(&id).cloned()
    }

    /// Associate `handle` with `id`, replacing any previous entry
    pub fn put(&self, id: ActorId, handle: ActorRef) {
        let previous = self.entries.write().insert(id, handle);
        if let Some(previous) = previous {
            debug!(actor_id = %id, replaced = %previous, "Replaced registry entry");
        } else {
            trace!(actor_id = %id, "Registered actor");
        }
    }

    /// Register `handle` under its own id
    pub fn put_self(&self, handle: ActorRef) {
        self.put(handle.id(), handle);
    }

    /// Drop the registry's claim on `id`. No-op if absent.
    pub fn erase(&self, id: ActorId) {
        let removed = self.entries.write().remove(&id);
        if removed.is_some() {
            trace!(actor_id = %id, "Erased registry entry");
        }
    }

    /// Handle registered under `name`, if any
    pub fn get_named(&self, name: &str) -> Option<ActorRef> {
        self.named.read().get(name).cloned()
    }

    /// Associate `handle` with `name`, replacing any previous entry
    pub fn put_named(&self, name: impl Into<String>, handle: ActorRef) {
        let name = name.into();
        let actor = handle.id();
        let previous = self.named.write().insert(name.clone(), handle);
        if let Some(previous) = previous {
            debug!(%name, actor_id = %actor, replaced = %previous, "Replaced name binding");
        } else {
            trace!(%name, actor_id = %actor, "Bound name");
        }
    }

    /// Remove a name binding. No-op if absent.
    pub fn erase_named(&self, name: &str) {
        let removed = self.named.write().remove(name);
        if removed.is_some() {
            trace!(%name, "Erased name binding");
        }
    }

    /// Copy of all current name bindings
    pub fn named_actors(&self) -> NameMap {
        self.named.read().clone()
    }

    /// Mark `id` as running. Returns the new running count.
    pub fn inc_running(&self, id: ActorId) -> usize {
        let count = {
            let mut running = self.running.lock();
            if !running.insert(id) {
                warn!(actor_id = %id, "inc_running for an actor that is already running");
            }
            running.len()
        };
        self.running_changed.notify_all();
        trace!(actor_id = %id, running = count, "Actor started running");
        count
    }

    /// Mark `id` as terminated. Returns the new running count.
    ///
    /// # Panics
    ///
    /// If no actor is running or `id` is not in the running set; both mean
    /// the runtime reported the same termination twice.
    pub fn dec_running(&self, id: ActorId) -> usize {
        let count = {
            let mut running = self.running.lock();
            assert!(
                !running.is_empty(),
                "running count underflow: dec_running({}) with no running actors",
                id
            );
            assert!(
                running.remove(&id),
                "dec_running({}) for an actor that is not running",
                id
            );
            running.len()
        };
        self.running_changed.notify_all();
        trace!(actor_id = %id, running = count, "Actor stopped running");
        count
    }

    /// Number of running actors
    pub fn running(&self) -> usize {
        self.running.lock().len()
    }

    /// Copy of the running-id set
    pub fn running_ids(&self) -> HashSet<ActorId> {
        self.running.lock().clone()
    }

    /// Block until exactly `expected` actors are running
    ///
    /// Has no timeout; intended for a dedicated shutdown thread.
    pub fn await_running_count_equal(&self, expected: usize) {
        self.await_running_count_equal_with(expected, || {});
    }

    /// Like [`await_running_count_equal`](Self::await_running_count_equal),
    /// invoking `on_wake` after every wake-up whether or not the count matches
    /// yet. The running lock is not held while `on_wake` runs.
    pub fn await_running_count_equal_with<F>(&self, expected: usize, mut on_wake: F)
    where
        F: FnMut(),
    {
        let mut running = self.running.lock();
        while running.len() != expected {
            self.running_changed.wait(&mut running);
            MutexGuard::unlocked(&mut running, &mut on_wake);
        }
    }

    /// Bounded variant for supervisors that cannot wait forever.
    /// Returns whether the count reached `expected` before `timeout`.
    pub fn await_running_count_equal_timeout(&self, expected: usize, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        let mut running = self.running.lock();
        while running.len() != expected {
            if self.running_changed.wait_until(&mut running, deadline).timed_out() {
                return running.len() == expected;
            }
        }
        true
    }

    /// Drop every id and name entry. Returns how many claims were released.
    ///
    /// Called by the hosting runtime at shutdown; actors with no other strong
    /// handles are torn down here.
    pub fn clear(&self) -> usize {
        let entries = std::mem::take(&mut *self.entries.write());
        let named = std::mem::take(&mut *self.named.write());
        let released = entries.len() + named.len();
        debug!(
            ids = entries.len(),
            names = named.len(),
            "Clearing actor registry"
        );
        drop(entries);
        drop(named);
        released
    }
}
