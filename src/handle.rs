// src/handle.rs
//! Actor handles as seen by the registry.
//! The registry never owns an actor; a handle exposes just enough surface
//! to index one (identity, logical name, runtime type) and to stop it.

use std::fmt;
use std::sync::Arc;

/// Describes the concrete runtime type of an actor.
///
/// A plain map key: exact-type queries hash and compare it directly, and
/// subtype queries go through a relation supplied by the caller's type
/// system. The registry carries no reflection machinery of its own.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct TypeDescriptor(&'static str);

impl TypeDescriptor {
    /// Descriptor for a Rust type, named via `std::any::type_name`.
    pub fn of<T: ?Sized + 'static>() -> Self {
        Self(std::any::type_name::<T>())
    }

    /// Descriptor with an explicit name, for actors whose type lives
    /// outside the Rust type system (scripting layers, remote nodes).
    pub const fn named(name: &'static str) -> Self {
        Self(name)
    }

    pub fn name(&self) -> &'static str {
        self.0
    }
}

impl fmt::Debug for TypeDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.0)
    }
}

impl fmt::Display for TypeDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.0)
    }
}

/// The registry's view of a live actor.
pub trait ActorHandle: Send + Sync {
    /// Globally unique key for this actor, immutable for the handle's
    /// lifetime.
    fn identity(&self) -> &str;

    /// User-assigned grouping name; not required to be unique.
    fn logical_name(&self) -> &str;

    /// Concrete runtime type of the underlying actor.
    fn type_descriptor(&self) -> TypeDescriptor;

    /// Terminate the underlying actor. Invoked during mass shutdown.
    fn stop(&self);
}

/// Shared handle as stored in the registry.
pub type HandleRef = Arc<dyn ActorHandle>;
