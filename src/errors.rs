//! Error types surfaced by the emitter.

use thiserror::Error;

/// Fatal conditions that abort an emitter run.
///
/// The emitter never attempts partial output: the first error aborts the run
/// and leaves the caches in their pre-run state (version mismatches will
/// invalidate stale entries on the next run).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EmitterError {
    /// The input IR violates an emitter precondition.
    #[error("invalid IR: {0}")]
    InvalidInput(String),

    /// Strong-mode emission needs a line-oriented file builder to splice the
    /// core library text.
    #[error("strong mode emission requires a file builder")]
    DialectMismatch,

    /// An exported member is neither a method nor a property.
    #[error("exported member of {class_name} is neither a method nor a property")]
    IllegalExportedMember { class_name: String },
}
