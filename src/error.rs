// src/error.rs
//! Registry error taxonomy.

use thiserror::Error;

/// Errors surfaced by registry operations.
///
/// Queries and removals are total functions (absence is an empty result);
/// only registration can fail, and only on caller error.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    /// `register` was called with a handle whose logical name is empty.
    /// No index is mutated when this is returned.
    #[error("invalid handle state: {0}")]
    InvalidHandleState(String),
}
