//! Error handling for the resolution engine

use thiserror::Error;

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;

/// Resolution error.
///
/// Every variant is unit-fatal: resolution of the compilation unit stops at
/// the first error and the error propagates to whoever ran the pass.
/// `InternalConsistency` indicates a bug in an earlier pass (or in the
/// resolver itself), not bad input, but it is surfaced the same way.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    #[error("redefinition of `{name}`: `{existing}` conflicts with `{incoming}`")]
    Redefinition {
        name: String,
        existing: String,
        incoming: String,
    },

    #[error("unresolved identifier `{name}`")]
    UnresolvedIdentifier { name: String },

    #[error("package not found: `{path}`")]
    PackageNotFound { path: String },

    #[error("package `{path}` has no member `{name}`")]
    CrossUnitLookup { path: String, name: String },

    #[error("type `{ty}` does not support {operation}")]
    UnsupportedOperation {
        ty: String,
        operation: &'static str,
    },

    #[error("internal consistency violation: {detail}")]
    InternalConsistency { detail: String },
}

impl Error {
    pub fn internal(detail: impl Into<String>) -> Self {
        Self::InternalConsistency {
            detail: detail.into(),
        }
    }
}
