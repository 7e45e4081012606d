use thiserror::Error;

/// Errors from constructing or parsing foundation types.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TypeError {
    /// The string is not a well-formed persistent identifier.
    #[error("malformed PID: {0}")]
    MalformedPid(String),

    /// A PID exceeded the maximum encoded length.
    #[error("PID too long: {actual} characters (maximum {max})")]
    PidTooLong { actual: usize, max: usize },

    /// The checksum algorithm name is not in the supported set.
    #[error("unknown checksum algorithm: {0}")]
    UnknownChecksumAlgorithm(String),

    /// The one-letter state code is not recognized.
    #[error("unrecognized state code: {0:?}")]
    UnrecognizedStateCode(String),

    /// A wire-format date string could not be parsed.
    #[error("invalid date value: {0:?}")]
    InvalidDate(String),
}

/// Result alias for type construction.
pub type TypeResult<T> = Result<T, TypeError>;
