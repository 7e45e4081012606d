use std::fmt;

use md5::Md5;
use serde::{Deserialize, Serialize};
use sha1::Sha1;
use sha2::{Digest, Sha256, Sha384, Sha512};

use crate::error::TypeError;

/// Sentinel checksum value recorded when no digest has been computed.
pub const CHECKSUM_NONE: &str = "none";

/// Content-digest algorithm for datastream checksums.
///
/// The set is fixed: the 128/160/256/384/512-bit members of the MD/SHA
/// family, plus a `Disabled` sentinel meaning checksumming is turned off for
/// the datastream. Unknown algorithm names fail at configuration time, not
/// at first use.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ChecksumType {
    #[default]
    Disabled,
    Md5,
    Sha1,
    Sha256,
    Sha384,
    Sha512,
}

impl ChecksumType {
    /// The wire name of the algorithm.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Disabled => "DISABLED",
            Self::Md5 => "MD5",
            Self::Sha1 => "SHA-1",
            Self::Sha256 => "SHA-256",
            Self::Sha384 => "SHA-384",
            Self::Sha512 => "SHA-512",
        }
    }

    /// Parse an algorithm name. Unknown names are a validation failure.
    pub fn parse(s: &str) -> Result<Self, TypeError> {
        match s {
            "DISABLED" | "" => Ok(Self::Disabled),
            "MD5" => Ok(Self::Md5),
            "SHA-1" => Ok(Self::Sha1),
            "SHA-256" => Ok(Self::Sha256),
            "SHA-384" => Ok(Self::Sha384),
            "SHA-512" => Ok(Self::Sha512),
            other => Err(TypeError::UnknownChecksumAlgorithm(other.to_string())),
        }
    }

    /// Returns `true` if checksumming is disabled.
    pub fn is_disabled(&self) -> bool {
        matches!(self, Self::Disabled)
    }

    /// Hex digest of `data` under this algorithm.
    ///
    /// Returns `None` for [`ChecksumType::Disabled`]; callers decide whether
    /// that means "trivially valid" (comparison) or "nothing to record".
    pub fn digest(&self, data: &[u8]) -> Option<String> {
        let digest = match self {
            Self::Disabled => return None,
            Self::Md5 => hex::encode(Md5::digest(data)),
            Self::Sha1 => hex::encode(Sha1::digest(data)),
            Self::Sha256 => hex::encode(Sha256::digest(data)),
            Self::Sha384 => hex::encode(Sha384::digest(data)),
            Self::Sha512 => hex::encode(Sha512::digest(data)),
        };
        Some(digest)
    }
}

impl fmt::Display for ChecksumType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
