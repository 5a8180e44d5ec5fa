//! Parameter change polling
//!
//! Plugin parameters are set from one place and observed elsewhere through
//! listeners that a host only notifies from its message loop. A test that
//! sets a parameter and immediately checks a listener sees nothing until
//! that loop has run. [`ParameterStore`] models this: changes are queued on
//! a channel and delivered by [`dispatch_pending`], which the wait helpers
//! call after giving the loop a tick.

use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Mutex, PoisonError};
use std::thread;
use std::time::{Duration, Instant};

use crossbeam_channel::{unbounded, Receiver, Sender};
use tracing::debug;

use crate::error::{BlockCheckError, Result};

/// One message-loop tick
pub const DISPATCH_TICK: Duration = Duration::from_millis(1);

/// A queued parameter change
#[derive(Debug, Clone, PartialEq)]
pub struct ParameterChange {
    pub id: String,
    pub value: f32,
}

/// Copy of every parameter value at one moment
pub type ParameterSnapshot = BTreeMap<String, f32>;

type Listener = Box<dyn Fn(&ParameterChange) + Send + Sync>;

/// Named `f32` parameters with deferred change notification
///
/// Values update immediately and can be read from any thread. Listeners
/// are only called by [`dispatch_pending`]; they must not register further
/// listeners from inside the callback.
pub struct ParameterStore {
    values: HashMap<String, AtomicU32>,
    listeners: Mutex<Vec<Listener>>,
    sender: Sender<ParameterChange>,
    receiver: Receiver<ParameterChange>,
}

impl std::fmt::Debug for ParameterStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ParameterStore")
            .field("values", &self.snapshot())
            .field("pending", &self.receiver.len())
            .finish()
    }
}

impl Default for ParameterStore {
    fn default() -> Self {
        Self::new()
    }
}

impl ParameterStore {
    pub fn new() -> Self {
        let (sender, receiver) = unbounded();
        Self {
            values: HashMap::new(),
            listeners: Mutex::new(Vec::new()),
            sender,
            receiver,
        }
    }

    /// Add a parameter with its default value
    pub fn with_parameter(mut self, id: impl Into<String>, default_value: f32) -> Self {
        self.values
            .insert(id.into(), AtomicU32::new(default_value.to_bits()));
        self
    }

    /// Current value of a parameter
    pub fn value(&self, id: &str) -> Result<f32> {
        self.slot(id)
            .map(|slot| f32::from_bits(slot.load(Ordering::Acquire)))
    }

    /// Store a value and queue a change notification for listeners
    pub fn set_value_notifying_host(&self, id: &str, value: f32) -> Result<()> {
        self.slot(id)?.store(value.to_bits(), Ordering::Release);
        let _ = self.sender.send(ParameterChange {
            id: id.to_string(),
            value,
        });
        Ok(())
    }

    /// Register a callback for dispatched changes
    pub fn add_listener<F>(&self, listener: F)
    where
        F: Fn(&ParameterChange) + Send + Sync + 'static,
    {
        self.listeners
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(Box::new(listener));
    }

    /// Number of changes waiting for dispatch
    pub fn pending(&self) -> usize {
        self.receiver.len()
    }

    /// Copy of all current values
    pub fn snapshot(&self) -> ParameterSnapshot {
        self.values
            .iter()
            .map(|(id, slot)| (id.clone(), f32::from_bits(slot.load(Ordering::Acquire))))
            .collect()
    }

    fn slot(&self, id: &str) -> Result<&AtomicU32> {
        self.values
            .get(id)
            .ok_or_else(|| BlockCheckError::UnknownParameter { id: id.to_string() })
    }
}

/// Deliver queued changes to listeners, returning how many were delivered
///
/// Only changes queued before the call are delivered; changes that
/// listeners make wait for the next dispatch.
pub fn dispatch_pending(store: &ParameterStore) -> usize {
    let listeners = store.listeners.lock().unwrap_or_else(PoisonError::into_inner);
    let queued = store.receiver.len();
    let mut delivered = 0;
    for change in store.receiver.try_iter().take(queued) {
        for listener in listeners.iter() {
            listener(&change);
        }
        delivered += 1;
    }
    if delivered > 0 {
        debug!(delivered, "dispatched parameter changes");
    }
    delivered
}

/// Let one message-loop tick pass, then deliver queued changes
///
/// Call after `set_value_notifying_host` before checking listener state.
pub fn wait_for_parameter_change(store: &ParameterStore) -> usize {
    thread::sleep(DISPATCH_TICK);
    dispatch_pending(store)
}

/// Snapshot every parameter, then wait for pending changes to land
pub fn flush_parameters(store: &ParameterStore) -> ParameterSnapshot {
    let snapshot = store.snapshot();
    wait_for_parameter_change(store);
    snapshot
}

/// Poll `predicate` every tick until it holds or `timeout` passes
///
/// Returns whether the predicate held. It is checked at least once.
pub fn wait_until<F: FnMut() -> bool>(timeout: Duration, mut predicate: F) -> bool {
    let deadline = Instant::now() + timeout;
    loop {
        if predicate() {
            return true;
        }
        if Instant::now() >= deadline {
            return false;
        }
        thread::sleep(DISPATCH_TICK);
    }
}
