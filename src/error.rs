//! Error definitions for all `dartgen` generation stages.

use thiserror::Error;

#[derive(Debug, Error)]
/// Top-level error type returned by public APIs.
pub enum GenError {
    /// A type node outside the supported set reached the converter.
    ///
    /// The model and the mapping table have diverged; the run is aborted.
    #[error("unsupported type: {0}")]
    UnsupportedType(String),
    /// A `reference` node names an identity missing from the type model.
    #[error("unresolved reference: {0}")]
    UnresolvedReference(String),
    /// Failure raised by a caller-supplied resolver or override hook.
    #[error("resolver error: {0}")]
    ResolverError(String),
    /// Malformed type-model input.
    #[error("model error: {0}")]
    ModelError(String),
    /// Output serialization failure.
    #[error("serialization error: {0}")]
    SerializationError(String),
    /// Filesystem I/O error from CLI or callers that propagate I/O.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}
