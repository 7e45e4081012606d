use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::TypeError;

/// Maximum encoded length of a PID, including the namespace and separator.
pub const MAX_PID_LENGTH: usize = 64;

/// URI scheme prefix under which objects are addressed in relationship
/// graphs and Atom entry identifiers.
pub const PID_URI_PREFIX: &str = "info:dor/";

/// Persistent identifier of a digital object.
///
/// A PID is namespace-qualified (`namespace:objectid`), globally unique, and
/// immutable once assigned to an object. The namespace part may contain
/// alphanumerics, `-` and `.`; the object part additionally allows `~`, `_`
/// and `%`-escapes.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Pid(String);

impl Pid {
    /// Parse and validate a PID from its string form.
    pub fn new(s: &str) -> Result<Self, TypeError> {
        if s.len() > MAX_PID_LENGTH {
            return Err(TypeError::PidTooLong {
                actual: s.len(),
                max: MAX_PID_LENGTH,
            });
        }
        let (ns, id) = s
            .split_once(':')
            .ok_or_else(|| TypeError::MalformedPid(s.to_string()))?;
        if ns.is_empty() || id.is_empty() {
            return Err(TypeError::MalformedPid(s.to_string()));
        }
        if !ns.chars().all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '.') {
            return Err(TypeError::MalformedPid(s.to_string()));
        }
        if !id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '.' | '~' | '_' | '%'))
        {
            return Err(TypeError::MalformedPid(s.to_string()));
        }
        Ok(Self(s.to_string()))
    }

    /// Parse a PID from its URI form (`info:dor/namespace:objectid`).
    pub fn from_uri(uri: &str) -> Result<Self, TypeError> {
        let stripped = uri
            .strip_prefix(PID_URI_PREFIX)
            .ok_or_else(|| TypeError::MalformedPid(uri.to_string()))?;
        Self::new(stripped)
    }

    /// The namespace part (everything before the `:`).
    pub fn namespace(&self) -> &str {
        self.0.split_once(':').map(|(ns, _)| ns).unwrap_or("")
    }

    /// The object part (everything after the `:`).
    pub fn object_id(&self) -> &str {
        self.0.split_once(':').map(|(_, id)| id).unwrap_or("")
    }

    /// The URI form used in relationship graphs and entry identifiers.
    pub fn to_uri(&self) -> String {
        format!("{PID_URI_PREFIX}{}", self.0)
    }

    /// The plain string form.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Pid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Pid({})", self.0)
    }
}

impl fmt::Display for Pid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for Pid {
    type Err = TypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn valid_pid_parses() {
        let pid = Pid::new("demo:object-1").unwrap();
        assert_eq!(pid.namespace(), "demo");
        assert_eq!(pid.object_id(), "object-1");
        assert_eq!(pid.as_str(), "demo:object-1");
    }

    #[test]
    fn missing_separator_is_rejected() {
        assert!(matches!(Pid::new("demo1"), Err(TypeError::MalformedPid(_))));
    }

    #[test]
    fn empty_parts_are_rejected() {
        assert!(Pid::new(":x").is_err());
        assert!(Pid::new("x:").is_err());
    }

    #[test]
    fn illegal_characters_are_rejected() {
        assert!(Pid::new("de mo:1").is_err());
        assert!(Pid::new("demo:a/b").is_err());
    }

    #[test]
    fn overlong_pid_is_rejected() {
        let long = format!("demo:{}", "x".repeat(MAX_PID_LENGTH));
        assert!(matches!(Pid::new(&long), Err(TypeError::PidTooLong { .. })));
    }

    #[test]
    fn uri_roundtrip() {
        let pid = Pid::new("demo:1").unwrap();
        let uri = pid.to_uri();
        assert_eq!(uri, "info:dor/demo:1");
        assert_eq!(Pid::from_uri(&uri).unwrap(), pid);
    }

    #[test]
    fn serde_is_transparent() {
        let pid = Pid::new("demo:1").unwrap();
        let json = serde_json::to_string(&pid).unwrap();
        assert_eq!(json, "\"demo:1\"");
    }
}
