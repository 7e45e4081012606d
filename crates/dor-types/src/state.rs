use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::TypeError;

/// Lifecycle state of a digital object.
///
/// The wire representation in every format is the one-letter code; readers
/// and writers must go through [`ObjectState::from_code`] and
/// [`ObjectState::code`] so the mapping can never diverge between codecs.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ObjectState {
    #[default]
    Active,
    Inactive,
    Deleted,
}

impl ObjectState {
    /// The one-letter wire code.
    pub fn code(&self) -> &'static str {
        match self {
            Self::Active => "A",
            Self::Inactive => "I",
            Self::Deleted => "D",
        }
    }

    /// The human-readable label used by the Atom format's category terms.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Active => "Active",
            Self::Inactive => "Inactive",
            Self::Deleted => "Deleted",
        }
    }

    /// Parse either the one-letter code or the full label.
    pub fn from_code(s: &str) -> Result<Self, TypeError> {
        match s {
            "A" | "Active" => Ok(Self::Active),
            "I" | "Inactive" => Ok(Self::Inactive),
            "D" | "Deleted" => Ok(Self::Deleted),
            other => Err(TypeError::UnrecognizedStateCode(other.to_string())),
        }
    }
}

impl fmt::Display for ObjectState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Lifecycle state of a single datastream.
///
/// Same code set as [`ObjectState`], tracked separately because a datastream
/// may be inactive or deleted inside an active object.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DatastreamState {
    #[default]
    Active,
    Inactive,
    Deleted,
}

impl DatastreamState {
    pub fn code(&self) -> &'static str {
        match self {
            Self::Active => "A",
            Self::Inactive => "I",
            Self::Deleted => "D",
        }
    }

    pub fn from_code(s: &str) -> Result<Self, TypeError> {
        match s {
            "A" => Ok(Self::Active),
            "I" => Ok(Self::Inactive),
            "D" => Ok(Self::Deleted),
            other => Err(TypeError::UnrecognizedStateCode(other.to_string())),
        }
    }
}

impl fmt::Display for DatastreamState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}
