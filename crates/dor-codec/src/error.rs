use thiserror::Error;

use dor_model::ModelError;

/// Errors from serialization and deserialization.
///
/// Codecs never swallow structural problems: any inability to establish the
/// object model's invariants surfaces as one of these, and the target
/// object must not be treated as populated afterwards.
#[derive(Debug, Error)]
pub enum CodecError {
    /// Malformed or structurally inconsistent wire data: missing root
    /// element, ambiguous control group, dangling reply-to reference,
    /// escaping archive member paths.
    #[error("object integrity violation: {0}")]
    ObjectIntegrity(String),

    /// Underlying byte-transport failure, including archive extraction.
    #[error("stream I/O failure: {0}")]
    StreamIo(String),

    /// The requested text encoding is not supported.
    #[error("unsupported text encoding: {0}")]
    UnsupportedEncoding(String),

    /// No codec is registered for the requested format identifier.
    #[error("no codec registered for format: {0}")]
    UnsupportedTranslation(String),

    /// Semantic validation failure: checksum mismatch on ingest, unknown
    /// checksum algorithm.
    #[error("validation failure: {0}")]
    Validation(String),
}

impl From<std::io::Error> for CodecError {
    fn from(e: std::io::Error) -> Self {
        Self::StreamIo(e.to_string())
    }
}

impl From<quick_xml::Error> for CodecError {
    fn from(e: quick_xml::Error) -> Self {
        Self::ObjectIntegrity(e.to_string())
    }
}

impl From<ModelError> for CodecError {
    fn from(e: ModelError) -> Self {
        match e {
            ModelError::Store(inner) => Self::StreamIo(inner.to_string()),
            other => Self::ObjectIntegrity(other.to_string()),
        }
    }
}

/// Result alias for codec operations.
pub type CodecResult<T> = Result<T, CodecError>;
