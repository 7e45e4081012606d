use std::fmt;

use serde::{Deserialize, Serialize};

/// One edge of an object's relationship graph.
///
/// Equality and hashing cover all five fields. Two tuples that differ only
/// in the surface lexical form of a prefixed predicate are distinct values;
/// callers wanting prefix-independent comparison must expand predicates to
/// full URIs before constructing tuples.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RelationshipTuple {
    pub subject: String,
    pub predicate: String,
    pub object: String,
    pub is_literal: bool,
    pub datatype: Option<String>,
}

impl RelationshipTuple {
    /// A relationship whose object is a resource URI.
    pub fn resource(subject: &str, predicate: &str, object: &str) -> Self {
        Self {
            subject: subject.to_string(),
            predicate: predicate.to_string(),
            object: object.to_string(),
            is_literal: false,
            datatype: None,
        }
    }

    /// A relationship whose object is a literal, optionally typed.
    pub fn literal(subject: &str, predicate: &str, object: &str, datatype: Option<&str>) -> Self {
        Self {
            subject: subject.to_string(),
            predicate: predicate.to_string(),
            object: object.to_string(),
            is_literal: true,
            datatype: datatype.map(str::to_string),
        }
    }

    /// Returns `true` if this tuple matches the given pattern, where `None`
    /// in any position is a wildcard.
    pub fn matches(&self, subject: Option<&str>, predicate: Option<&str>, object: Option<&str>) -> bool {
        subject.map_or(true, |s| s == self.subject)
            && predicate.map_or(true, |p| p == self.predicate)
            && object.map_or(true, |o| o == self.object)
    }
}

impl fmt::Display for RelationshipTuple {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_literal {
            write!(f, "<{}> <{}> \"{}\"", self.subject, self.predicate, self.object)
        } else {
            write!(f, "<{}> <{}> <{}>", self.subject, self.predicate, self.object)
        }
    }
}
