use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Prefix of generated audit record IDs (`AUDREC1`, `AUDREC2`, ...).
pub const AUDIT_RECORD_ID_PREFIX: &str = "AUDREC";

/// One immutable entry of an object's audit trail.
///
/// Records are append-only; IDs are generated sequentially and never
/// rewritten once appended.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditRecord {
    pub id: String,
    /// The kind of API activity that caused the event (e.g. a management
    /// API call vs. an ingest).
    pub process_type: String,
    /// The operation name that was performed.
    pub action: String,
    /// The datastream ID the action touched, empty for object-level actions.
    pub component_id: String,
    /// Who performed the action.
    pub responsibility: String,
    pub date: Option<DateTime<Utc>>,
    pub justification: String,
}

impl AuditRecord {
    pub fn new(id: &str) -> Self {
        Self {
            id: id.to_string(),
            process_type: String::new(),
            action: String::new(),
            component_id: String::new(),
            responsibility: String::new(),
            date: None,
            justification: String::new(),
        }
    }
}
