//! Error types for resolution.

use thiserror::Error;

/// Failure to resolve an entry against a [`Scope`](crate::inject::Scope).
///
/// Only structurally-missing dependencies are errors. A hook that is present
/// but has not emitted yet is not an error; the dependent entry simply stays
/// unready until it does.
#[derive(Debug, Error)]
pub enum ResolveError {
    /// A hook-kind dependency token names a key the scope does not provide.
    #[error("no hook named `{0}` in the resolution scope")]
    MissingHook(String),
}
