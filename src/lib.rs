// src/lib.rs
//! Roster — a concurrent registry of live actor handles.
//!
//! Tracks every live actor in a runtime and resolves handles by globally
//! unique identity, by user-assigned logical name, or by runtime type.
//! Structural changes (register, unregister, mass shutdown) are pushed
//! synchronously to subscribed listeners.
//!
//! The registry never owns actors. Message delivery, scheduling, and
//! supervision live elsewhere; only a minimal handle surface (identity,
//! name, type descriptor, stop) is consumed here, so any runtime can sit
//! on top.

pub mod error;
pub mod event;
pub mod handle;
pub mod registry;

pub use error::RegistryError;
pub use event::{ChannelForwarder, ListenerHub, ListenerRef, RegistryEvent, RegistryListener};
pub use handle::{ActorHandle, HandleRef, TypeDescriptor};
pub use registry::ActorRegistry;
