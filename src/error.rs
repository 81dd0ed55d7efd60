//! Engine-originated failures.
//!
//! Public operations return [`anyhow::Result`]; the errors raised by the engine itself
//! are [`StreamError`] values wrapped in that `anyhow::Error`, so callers that need to
//! react to a specific condition can `downcast_ref::<StreamError>()`.
//!
//! Errors raised by caller-supplied closures (`try_map`, `try_filter`, ...) are never
//! wrapped: the terminal returns the original error unchanged.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum StreamError {
    /// `to_map` without a merge function saw two elements with an equal key.
    #[error("duplicate key {key} while collecting into a map")]
    DuplicateKey { key: String },

    /// A type-erased partition did not hold the element type a stage expected.
    #[error("stage `{stage}` expected a partition of `{expected}`")]
    TypeMismatch {
        stage: &'static str,
        expected: &'static str,
    },

    /// A dedicated worker pool could not be created.
    #[error("failed to build worker pool: {0}")]
    WorkerPool(#[from] rayon::ThreadPoolBuildError),
}

impl StreamError {
    pub(crate) fn duplicate_key<K: std::fmt::Debug>(key: &K) -> Self {
        Self::DuplicateKey {
            key: format!("{key:?}"),
        }
    }

    pub(crate) fn type_mismatch<T>(stage: &'static str) -> Self {
        Self::TypeMismatch {
            stage,
            expected: std::any::type_name::<T>(),
        }
    }
}
