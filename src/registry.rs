// src/registry.rs
//! Live-actor registry: identity, name, and type indexes over handles.
//!
//! The identity map is the authority on liveness; the two derived indexes
//! (logical name, runtime type) are kept eagerly consistent with it inside
//! a single composite-update lock per mutation.

use std::collections::{HashMap, HashSet};

use dashmap::DashMap;
use parking_lot::Mutex;
use tracing::debug;

use crate::error::RegistryError;
use crate::event::{ListenerHub, ListenerRef, RegistryEvent};
use crate::handle::{ActorHandle, HandleRef, TypeDescriptor};

/// Derived name/type indexes.
///
/// Buckets hold identities rather than handles, so removal is exact even
/// when several actors share a name or type. A key is present iff its
/// bucket is non-empty.
#[derive(Default)]
struct SecondaryIndexes {
    by_name: HashMap<String, HashSet<String>>,
    by_type: HashMap<TypeDescriptor, HashSet<String>>,
}

impl SecondaryIndexes {
    fn insert(&mut self, handle: &HandleRef) {
        let identity = handle.identity().to_string();
        self.by_name
            .entry(handle.logical_name().to_string())
            .or_default()
            .insert(identity.clone());
        self.by_type
            .entry(handle.type_descriptor())
            .or_default()
            .insert(identity);
    }

    /// Remove one identity from the buckets `handle` occupies, dropping a
    /// bucket key once its last member leaves.
    fn remove(&mut self, handle: &HandleRef) {
        let identity = handle.identity();
        if let Some(bucket) = self.by_name.get_mut(handle.logical_name()) {
            bucket.remove(identity);
            if bucket.is_empty() {
                self.by_name.remove(handle.logical_name());
            }
        }
        if let Some(bucket) = self.by_type.get_mut(&handle.type_descriptor()) {
            bucket.remove(identity);
            if bucket.is_empty() {
                self.by_type.remove(&handle.type_descriptor());
            }
        }
    }
}

/// Registry of every live actor handle in the process.
///
/// Any number of threads may call any operation concurrently. A single
/// `register`/`unregister` applies its primary and secondary index updates
/// as one unit; lookups and traversals read the identity map without the
/// composite lock and see a weakly consistent, point-in-time view. Calls
/// for the *same* identity are expected to be serialized by the caller.
pub struct ActorRegistry {
    by_identity: DashMap<String, HandleRef>,
    /// Composite-update lock, held for the whole of every mutation so the
    /// three indexes never drift apart beyond the duration of one call.
    indexes: Mutex<SecondaryIndexes>,
    listeners: ListenerHub,
}

impl Default for ActorRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl ActorRegistry {
    /// Create a new, empty registry. Instances are independent; tests and
    /// embedded runtimes may run several side by side.
    pub fn new() -> Self {
        Self {
            by_identity: DashMap::new(),
            indexes: Mutex::new(SecondaryIndexes::default()),
            listeners: ListenerHub::new(),
        }
    }

    /// Register `handle` under its identity, logical name, and type, then
    /// notify listeners with `Registered`.
    ///
    /// A handle with an empty logical name is rejected before any index is
    /// touched. Re-registering an identity replaces the previous handle
    /// (last writer wins) and repairs whatever name/type buckets the old
    /// handle occupied.
    pub fn register(&self, handle: HandleRef) -> Result<(), RegistryError> {
        if handle.logical_name().is_empty() {
            return Err(RegistryError::InvalidHandleState(format!(
                "actor {} has no logical name",
                handle.identity()
            )));
        }

        let replaced = {
            let mut indexes = self.indexes.lock();
            let previous = self
                .by_identity
                .insert(handle.identity().to_string(), handle.clone());
            if let Some(old) = &previous {
                indexes.remove(old);
            }
            indexes.insert(&handle);
            previous.is_some()
        };

        debug!(
            identity = handle.identity(),
            name = handle.logical_name(),
            replaced,
            "registered actor"
        );
        self.listeners.emit(&RegistryEvent::Registered(handle));
        Ok(())
    }

    /// Remove `handle` from every index and notify listeners with
    /// `Unregistered`. Unknown identities are a no-op and stay silent.
    pub fn unregister(&self, handle: &dyn ActorHandle) {
        self.unregister_identity(handle.identity());
    }

    /// `unregister` by identity alone, for callers that no longer hold the
    /// handle itself.
    ///
    /// Bucket cleanup uses the handle the registry stored, so a stale
    /// handle observed after a same-identity re-register cannot strand
    /// secondary entries.
    pub fn unregister_identity(&self, identity: &str) {
        let removed = {
            let mut indexes = self.indexes.lock();
            match self.by_identity.remove(identity) {
                Some((_, stored)) => {
                    indexes.remove(&stored);
                    Some(stored)
                }
                None => None,
            }
        };

        if let Some(stored) = removed {
            debug!(identity, "unregistered actor");
            self.listeners.emit(&RegistryEvent::Unregistered(stored));
        }
    }

    /// Authoritative liveness check: the handle registered under
    /// `identity`, if any.
    pub fn lookup_by_identity(&self, identity: &str) -> Option<HandleRef> {
        self.by_identity.get(identity).map(|e| e.value().clone())
    }

    /// All live handles sharing a logical name; empty if none.
    pub fn lookup_by_name(&self, name: &str) -> Vec<HandleRef> {
        let identities: Vec<String> = {
            let indexes = self.indexes.lock();
            match indexes.by_name.get(name) {
                Some(bucket) => bucket.iter().cloned().collect(),
                None => return Vec::new(),
            }
        };
        self.resolve(identities)
    }

    /// Handles whose type descriptor equals `ty` exactly; empty if none.
    pub fn lookup_by_exact_type(&self, ty: TypeDescriptor) -> Vec<HandleRef> {
        let identities: Vec<String> = {
            let indexes = self.indexes.lock();
            match indexes.by_type.get(&ty) {
                Some(bucket) => bucket.iter().cloned().collect(),
                None => return Vec::new(),
            }
        };
        self.resolve(identities)
    }

    /// Handles whose type is `ty` or, per `is_subtype(handle_ty, ty)`, a
    /// subtype of it.
    ///
    /// Linear scan over live handles: no subtype index is maintained, and
    /// the subtype relation comes from the caller's type system. Exact
    /// matches always qualify regardless of the relation.
    pub fn lookup_by_subtype<F>(&self, ty: TypeDescriptor, is_subtype: F) -> Vec<HandleRef>
    where
        F: Fn(TypeDescriptor, TypeDescriptor) -> bool,
    {
        self.by_identity
            .iter()
            .filter(|e| {
                let handle_ty = e.value().type_descriptor();
                handle_ty == ty || is_subtype(handle_ty, ty)
            })
            .map(|e| e.value().clone())
            .collect()
    }

    /// Point-in-time snapshot of every live handle. Tolerates concurrent
    /// mutation; the snapshot is weakly consistent, not transactional.
    pub fn all_handles(&self) -> Vec<HandleRef> {
        self.by_identity.iter().map(|e| e.value().clone()).collect()
    }

    /// Apply `visit` to every current handle, in no particular order.
    /// Concurrent structural changes may or may not be observed.
    pub fn for_each<F: FnMut(&HandleRef)>(&self, mut visit: F) {
        for entry in self.by_identity.iter() {
            visit(entry.value());
        }
    }

    /// Number of live handles.
    pub fn len(&self) -> usize {
        self.by_identity.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_identity.is_empty()
    }

    /// Logical names that currently index at least one live handle.
    pub fn names(&self) -> Vec<String> {
        self.indexes.lock().by_name.keys().cloned().collect()
    }

    /// Type descriptors that currently index at least one live handle.
    pub fn type_descriptors(&self) -> Vec<TypeDescriptor> {
        self.indexes.lock().by_type.keys().copied().collect()
    }

    /// Subscribe a listener to structural-change events.
    pub fn add_listener(&self, listener: ListenerRef) {
        self.listeners.add(listener);
    }

    /// Remove the first matching subscription of `listener`.
    pub fn remove_listener(&self, listener: &ListenerRef) {
        self.listeners.remove(listener);
    }

    pub fn listener_count(&self) -> usize {
        self.listeners.len()
    }

    /// Stop and unregister every handle live at call time.
    ///
    /// Not atomic with respect to concurrent `register`: a handle arriving
    /// mid-shutdown may or may not be stopped. Each snapshotted handle is
    /// stopped first, then removed from all indexes with an `Unregistered`
    /// event. No lock is held across `stop`, so a handle whose stop path
    /// re-enters the registry cannot deadlock.
    pub fn shutdown_all(&self) {
        let live = self.all_handles();
        debug!(count = live.len(), "shutting down all registered actors");
        for handle in live {
            handle.stop();
            self.unregister(handle.as_ref());
        }
    }

    /// Map bucket identities back to handles. An identity can vanish
    /// between reading the bucket and resolving it; skipping it keeps the
    /// result weakly consistent.
    fn resolve(&self, identities: Vec<String>) -> Vec<HandleRef> {
        identities
            .into_iter()
            .filter_map(|id| self.lookup_by_identity(&id))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;

    struct Probe {
        identity: String,
        name: String,
        ty: TypeDescriptor,
        stopped: AtomicBool,
    }

    impl Probe {
        fn new(identity: &str, name: &str, ty: TypeDescriptor) -> Arc<Self> {
            Arc::new(Self {
                identity: identity.to_string(),
                name: name.to_string(),
                ty,
                stopped: AtomicBool::new(false),
            })
        }
    }

    impl ActorHandle for Probe {
        fn identity(&self) -> &str {
            &self.identity
        }
        fn logical_name(&self) -> &str {
            &self.name
        }
        fn type_descriptor(&self) -> TypeDescriptor {
            self.ty
        }
        fn stop(&self) {
            self.stopped.store(true, Ordering::SeqCst);
        }
    }

    const WORKER: TypeDescriptor = TypeDescriptor::named("worker");
    const LOGGER: TypeDescriptor = TypeDescriptor::named("logger");

    #[test]
    fn register_indexes_all_three_keys() {
        let registry = ActorRegistry::new();
        let probe = Probe::new("u1", "pool", WORKER);
        registry.register(probe.clone()).unwrap();

        let found = registry.lookup_by_identity("u1").expect("live");
        assert_eq!(found.identity(), "u1");
        assert_eq!(registry.lookup_by_name("pool").len(), 1);
        assert_eq!(registry.lookup_by_exact_type(WORKER).len(), 1);
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn empty_logical_name_leaves_no_partial_state() {
        let registry = ActorRegistry::new();
        let probe = Probe::new("u1", "", WORKER);

        let err = registry.register(probe).unwrap_err();
        assert!(matches!(err, RegistryError::InvalidHandleState(_)));
        assert!(registry.lookup_by_identity("u1").is_none());
        assert!(registry.names().is_empty());
        assert!(registry.type_descriptors().is_empty());
    }

    #[test]
    fn unregister_is_idempotent() {
        let registry = ActorRegistry::new();
        let probe = Probe::new("u1", "pool", WORKER);

        // never registered: no-op, no panic
        registry.unregister(probe.as_ref());

        registry.register(probe.clone()).unwrap();
        registry.unregister(probe.as_ref());
        registry.unregister(probe.as_ref());
        assert!(registry.is_empty());
    }

    #[test]
    fn reregistering_identity_repairs_buckets() {
        let registry = ActorRegistry::new();
        registry.register(Probe::new("u1", "old", WORKER)).unwrap();
        registry.register(Probe::new("u1", "new", LOGGER)).unwrap();

        assert_eq!(registry.len(), 1);
        assert!(registry.lookup_by_name("old").is_empty());
        assert_eq!(registry.lookup_by_name("new").len(), 1);
        assert!(registry.lookup_by_exact_type(WORKER).is_empty());
        assert_eq!(registry.lookup_by_exact_type(LOGGER).len(), 1);
        // stale bucket keys must be gone entirely
        assert_eq!(registry.names(), vec!["new".to_string()]);
        assert_eq!(registry.type_descriptors(), vec![LOGGER]);
    }

    #[test]
    fn shared_name_bucket_shrinks_member_by_member() {
        let registry = ActorRegistry::new();
        let a = Probe::new("u1", "worker", WORKER);
        let b = Probe::new("u2", "worker", LOGGER);
        registry.register(a.clone()).unwrap();
        registry.register(b.clone()).unwrap();

        assert_eq!(registry.lookup_by_name("worker").len(), 2);

        registry.unregister(a.as_ref());
        let remaining = registry.lookup_by_name("worker");
        assert_eq!(remaining.len(), 1);
        assert_eq!(remaining[0].identity(), "u2");
        assert!(registry.lookup_by_exact_type(WORKER).is_empty());
        assert!(registry.lookup_by_identity("u1").is_none());
    }

    #[test]
    fn subtype_scan_uses_caller_relation() {
        let registry = ActorRegistry::new();
        let actor = TypeDescriptor::named("actor");
        registry.register(Probe::new("u1", "a", WORKER)).unwrap();
        registry.register(Probe::new("u2", "b", LOGGER)).unwrap();

        // everything is an "actor" in this relation; nothing else subtypes
        let is_subtype =
            |_handle_ty: TypeDescriptor, queried: TypeDescriptor| queried == actor;

        assert_eq!(registry.lookup_by_subtype(actor, is_subtype).len(), 2);
        let workers = registry.lookup_by_subtype(WORKER, is_subtype);
        assert_eq!(workers.len(), 1);
        assert_eq!(workers[0].identity(), "u1");
    }

    #[test]
    fn shutdown_stops_everything_and_clears_indexes() {
        let registry = ActorRegistry::new();
        let a = Probe::new("u1", "a", WORKER);
        let b = Probe::new("u2", "b", LOGGER);
        registry.register(a.clone()).unwrap();
        registry.register(b.clone()).unwrap();

        registry.shutdown_all();

        assert!(a.stopped.load(Ordering::SeqCst));
        assert!(b.stopped.load(Ordering::SeqCst));
        assert!(registry.is_empty());
        assert!(registry.names().is_empty());
        assert!(registry.type_descriptors().is_empty());
    }

    #[test]
    fn for_each_visits_every_live_handle() {
        let registry = ActorRegistry::new();
        for i in 0..5 {
            registry
                .register(Probe::new(&format!("u{i}"), "pool", WORKER))
                .unwrap();
        }

        let mut seen = Vec::new();
        registry.for_each(|h| seen.push(h.identity().to_string()));
        seen.sort();
        assert_eq!(seen, vec!["u0", "u1", "u2", "u3", "u4"]);
        assert_eq!(registry.all_handles().len(), 5);
    }
}
