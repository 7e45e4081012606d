use thiserror::Error;

use dor_store::StoreError;
use dor_types::TypeError;

/// Errors from digital-object model operations.
#[derive(Debug, Error)]
pub enum ModelError {
    /// The object already has a PID; PIDs are immutable once assigned.
    #[error("PID already assigned: {0}")]
    PidAlreadyAssigned(String),

    /// The operation requires an object with an assigned PID.
    #[error("object has no PID")]
    PidRequired,

    /// No datastream group exists with the given ID.
    #[error("no such datastream: {0}")]
    NoSuchDatastream(String),

    /// The datastream group has no version with the given version ID.
    #[error("no such datastream version: {datastream_id}/{version_id}")]
    NoSuchVersion {
        datastream_id: String,
        version_id: String,
    },

    /// An incoming version's control group differs from the group fixed
    /// for its datastream ID.
    #[error("control group for {datastream_id} is fixed as {existing}, got {incoming}")]
    ControlGroupMismatch {
        datastream_id: String,
        existing: &'static str,
        incoming: &'static str,
    },

    /// Content could not be resolved through a collaborator.
    #[error(transparent)]
    Store(#[from] StoreError),

    /// An XML payload could not be parsed or re-serialized.
    #[error("XML error: {0}")]
    Xml(String),

    /// The relationship datastream content is not a well-formed graph.
    #[error("malformed relationship graph: {0}")]
    RelationshipGraph(String),

    /// A foundation type failed to parse.
    #[error(transparent)]
    Type(#[from] TypeError),
}

/// Result alias for model operations.
pub type ModelResult<T> = Result<T, ModelError>;
