// src/event.rs
//! Structural-change events and the listener hub that fans them out.
//! Delivery is synchronous on the mutating thread; a misbehaving listener
//! only ever loses its own delivery.

use std::fmt;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;

use parking_lot::RwLock;
use tracing::warn;

use crate::handle::HandleRef;

/// Structural change observed on the registry.
#[derive(Clone)]
pub enum RegistryEvent {
    /// A handle became live.
    Registered(HandleRef),
    /// A handle left the registry, via explicit unregister or shutdown.
    Unregistered(HandleRef),
}

impl RegistryEvent {
    /// The handle the event is about.
    pub fn handle(&self) -> &HandleRef {
        match self {
            RegistryEvent::Registered(h) | RegistryEvent::Unregistered(h) => h,
        }
    }
}

impl fmt::Debug for RegistryEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (kind, h) = match self {
            RegistryEvent::Registered(h) => ("Registered", h),
            RegistryEvent::Unregistered(h) => ("Unregistered", h),
        };
        f.debug_struct(kind)
            .field("identity", &h.identity())
            .field("name", &h.logical_name())
            .finish()
    }
}

/// Observer of registry structural changes.
pub trait RegistryListener: Send + Sync {
    fn notify(&self, event: &RegistryEvent);
}

/// Shared listener as stored in the hub.
pub type ListenerRef = Arc<dyn RegistryListener>;

/// Ordered listener list with synchronous, best-effort delivery.
///
/// Listeners are appended and removed by `Arc` pointer identity; duplicates
/// are allowed and receive one delivery per occurrence.
#[derive(Default)]
pub struct ListenerHub {
    listeners: RwLock<Vec<ListenerRef>>,
}

impl ListenerHub {
    pub fn new() -> Self {
        Self {
            listeners: RwLock::new(Vec::new()),
        }
    }

    /// Append a listener to the end of the delivery order.
    pub fn add(&self, listener: ListenerRef) {
        self.listeners.write().push(listener);
    }

    /// Remove the first occurrence of `listener`; unknown listeners are a
    /// no-op.
    pub fn remove(&self, listener: &ListenerRef) {
        let mut listeners = self.listeners.write();
        if let Some(pos) = listeners.iter().position(|l| Arc::ptr_eq(l, listener)) {
            listeners.remove(pos);
        }
    }

    pub fn len(&self) -> usize {
        self.listeners.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.listeners.read().is_empty()
    }

    /// Deliver `event` to every listener present when emission starts.
    ///
    /// Iterates a snapshot, so a listener may add or remove listeners from
    /// inside `notify` without deadlocking. A panicking listener is logged
    /// and skipped; remaining listeners still receive the event and the
    /// index mutation that triggered it is never rolled back.
    pub fn emit(&self, event: &RegistryEvent) {
        let snapshot: Vec<ListenerRef> = self.listeners.read().clone();
        for listener in snapshot {
            if catch_unwind(AssertUnwindSafe(|| listener.notify(event))).is_err() {
                warn!(
                    identity = event.handle().identity(),
                    "registry listener panicked during delivery"
                );
            }
        }
    }
}

/// Listener that forwards events into a crossbeam channel, for consumers
/// that drain registry events from their own loop (schedulers, supervisors,
/// tests).
pub struct ChannelForwarder {
    tx: crossbeam_channel::Sender<RegistryEvent>,
}

impl ChannelForwarder {
    pub fn new(tx: crossbeam_channel::Sender<RegistryEvent>) -> Self {
        Self { tx }
    }
}

impl RegistryListener for ChannelForwarder {
    fn notify(&self, event: &RegistryEvent) {
        // A closed receiver means nobody is draining anymore; drop silently.
        let _ = self.tx.send(event.clone());
    }
}
