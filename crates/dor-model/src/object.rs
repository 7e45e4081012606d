use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use tracing::debug;

use dor_store::ContentResolver;
use dor_types::{ObjectState, Pid, RelationshipTuple};

use crate::audit::{AuditRecord, AUDIT_RECORD_ID_PREFIX};
use crate::datastream::Datastream;
use crate::error::{ModelError, ModelResult};
use crate::relationships::{
    parse_relationships, AUDIT_ID, BASELINE_CONTENT_MODEL, HAS_MODEL_PREDICATE, RELS_EXT_ID,
    RELS_INT_ID,
};

/// Prefix of generated datastream IDs (`DS1`, `DS2`, ...).
pub const DATASTREAM_ID_PREFIX: &str = "DS";

/// The aggregate root: one digital object.
///
/// Holds identity and lifecycle properties, an insertion-ordered map of
/// datastream-ID → ordered version lists, the append-only audit trail, a
/// format side-channel property map, and a lazily derived relationship
/// cache. A group that loses its last version is removed from the map, so
/// every present ID has at least one version.
///
/// Instances are not thread-safe; callers serialize access externally.
pub struct DigitalObject {
    pid: Option<Pid>,
    pub state: ObjectState,
    pub label: String,
    pub owner_id: String,
    pub create_date: Option<DateTime<Utc>>,
    pub last_mod_date: Option<DateTime<Utc>>,
    /// True while the object is being ingested for the first time; cleared
    /// once it exists in the repository. Codecs use this to decide whether
    /// supplied checksums are verified or trusted.
    pub is_new: bool,
    pub ext_properties: BTreeMap<String, String>,
    audit_records: Vec<AuditRecord>,
    datastreams: IndexMap<String, Vec<Datastream>>,
    relationship_cache: Option<Vec<RelationshipTuple>>,
}

impl DigitalObject {
    /// A fresh object: no PID, active, new.
    pub fn new() -> Self {
        Self {
            pid: None,
            state: ObjectState::Active,
            label: String::new(),
            owner_id: String::new(),
            create_date: None,
            last_mod_date: None,
            is_new: true,
            ext_properties: BTreeMap::new(),
            audit_records: Vec::new(),
            datastreams: IndexMap::new(),
            relationship_cache: None,
        }
    }

    pub fn pid(&self) -> Option<&Pid> {
        self.pid.as_ref()
    }

    /// Assign the PID. Fails if one is already assigned; PIDs are immutable.
    pub fn assign_pid(&mut self, pid: Pid) -> ModelResult<()> {
        if let Some(existing) = &self.pid {
            return Err(ModelError::PidAlreadyAssigned(existing.to_string()));
        }
        self.pid = Some(pid);
        Ok(())
    }

    // ---- audit trail ----

    pub fn audit_records(&self) -> &[AuditRecord] {
        &self.audit_records
    }

    /// Append one audit record. The trail is append-only.
    pub fn add_audit_record(&mut self, record: AuditRecord) {
        self.audit_records.push(record);
    }

    // ---- datastreams ----

    /// IDs of all datastream groups that currently have at least one version.
    pub fn datastream_ids(&self) -> impl Iterator<Item = &str> {
        self.datastreams.keys().map(String::as_str)
    }

    /// All versions of a datastream, in insertion order.
    pub fn versions(&self, datastream_id: &str) -> Option<&[Datastream]> {
        self.datastreams.get(datastream_id).map(Vec::as_slice)
    }

    /// The current version of a datastream: maximum `create_date`, ties
    /// broken first-seen-wins.
    pub fn current_version(&self, datastream_id: &str) -> Option<&Datastream> {
        let group = self.datastreams.get(datastream_id)?;
        current_index(group).map(|i| &group[i])
    }

    /// Mutable access to the current version, for pre-commit fixups
    /// (staging remote managed content, absorbing fetch metadata).
    pub fn current_version_mut(&mut self, datastream_id: &str) -> Option<&mut Datastream> {
        let group = self.datastreams.get_mut(datastream_id)?;
        current_index(group).map(move |i| &mut group[i])
    }

    /// Mutable iteration over every version of every datastream, for the
    /// shared normalization pass. Content edits to the relationship
    /// datastreams must not go through this path — they would bypass cache
    /// invalidation.
    pub fn datastream_versions_mut(&mut self) -> impl Iterator<Item = &mut Datastream> {
        self.datastreams.values_mut().flatten()
    }

    /// Add one datastream version.
    ///
    /// Whether the version appends or replaces the current version is
    /// governed by the incoming version's own `versionable` flag, except
    /// that an explicit `add_new_version == false` always forces
    /// replacement. The reserved `AUDIT` datastream never versions.
    /// The control group is fixed per datastream ID; a mismatch is an
    /// error.
    pub fn add_datastream_version(
        &mut self,
        datastream: Datastream,
        add_new_version: bool,
    ) -> ModelResult<()> {
        let id = datastream.id.clone();
        if let Some(group) = self.datastreams.get(&id) {
            if let Some(existing) = group.first() {
                if existing.control_group() != datastream.control_group() {
                    return Err(ModelError::ControlGroupMismatch {
                        datastream_id: id,
                        existing: existing.control_group().code(),
                        incoming: datastream.control_group().code(),
                    });
                }
            }
        }
        let append = datastream.versionable && add_new_version && id != AUDIT_ID;
        let before = self.current_identity(&id);
        let group = self.datastreams.entry(id.clone()).or_default();
        let mut replaced_current = false;
        if !append {
            if let Some(i) = current_index(group) {
                group.remove(i);
                replaced_current = true;
            }
        }
        group.push(datastream);
        // A replacement may reuse the removed version's ID with different
        // content, so identity comparison alone cannot see it.
        if replaced_current || self.current_identity(&id) != before {
            self.maybe_invalidate_relationships(&id);
        }
        Ok(())
    }

    fn current_identity(&self, datastream_id: &str) -> Option<String> {
        self.current_version(datastream_id).map(|v| v.version_id.clone())
    }

    /// Remove one specific version. The group disappears with its last
    /// version.
    pub fn remove_datastream_version(
        &mut self,
        datastream_id: &str,
        version_id: &str,
    ) -> ModelResult<Datastream> {
        let group = self
            .datastreams
            .get_mut(datastream_id)
            .ok_or_else(|| ModelError::NoSuchDatastream(datastream_id.to_string()))?;
        let index = group
            .iter()
            .position(|v| v.version_id == version_id)
            .ok_or_else(|| ModelError::NoSuchVersion {
                datastream_id: datastream_id.to_string(),
                version_id: version_id.to_string(),
            })?;
        let was_current = current_index(group) == Some(index);
        let removed = group.remove(index);
        if group.is_empty() {
            self.datastreams.shift_remove(datastream_id);
        }
        if was_current {
            self.maybe_invalidate_relationships(datastream_id);
        }
        Ok(removed)
    }

    // ---- relationship graph ----

    /// Drop the cached relationship graph; the next query re-derives it.
    pub fn invalidate_relationship_cache(&mut self) {
        self.relationship_cache = None;
    }

    fn maybe_invalidate_relationships(&mut self, datastream_id: &str) {
        if datastream_id == RELS_EXT_ID || datastream_id == RELS_INT_ID {
            debug!(datastream_id, "relationship cache invalidated");
            self.relationship_cache = None;
        }
    }

    /// The object's relationship graph, derived lazily from the current
    /// versions of `RELS-EXT` and `RELS-INT` and cached until one of them
    /// changes.
    ///
    /// When no explicit has-model relationship is declared, a tuple
    /// asserting membership in the baseline model is synthesized; it is
    /// part of the derived graph only, never persisted.
    pub fn relationships(&mut self, resolver: &ContentResolver) -> ModelResult<&[RelationshipTuple]> {
        if self.relationship_cache.is_none() {
            let derived = self.derive_relationships(resolver)?;
            self.relationship_cache = Some(derived);
        }
        Ok(self.relationship_cache.as_deref().unwrap_or_default())
    }

    fn derive_relationships(&self, resolver: &ContentResolver) -> ModelResult<Vec<RelationshipTuple>> {
        let pid = self.pid.as_ref().ok_or(ModelError::PidRequired)?;
        let mut tuples = Vec::new();
        for id in [RELS_EXT_ID, RELS_INT_ID] {
            if let Some(version) = self.current_version(id) {
                let bytes = version.get_content_stream(resolver)?;
                tuples.extend(parse_relationships(&bytes)?);
            }
        }
        let has_explicit_model = tuples.iter().any(|t| t.predicate == HAS_MODEL_PREDICATE);
        if !has_explicit_model {
            tuples.push(RelationshipTuple::resource(
                &pid.to_uri(),
                HAS_MODEL_PREDICATE,
                BASELINE_CONTENT_MODEL,
            ));
        }
        Ok(tuples)
    }

    /// Relationships matching a pattern; `None` in any position is a
    /// wildcard.
    pub fn filtered_relationships(
        &mut self,
        resolver: &ContentResolver,
        subject: Option<&str>,
        predicate: Option<&str>,
        object: Option<&str>,
    ) -> ModelResult<Vec<RelationshipTuple>> {
        Ok(self
            .relationships(resolver)?
            .iter()
            .filter(|t| t.matches(subject, predicate, object))
            .cloned()
            .collect())
    }

    /// URIs of every content model this object is an instance of,
    /// including the synthesized baseline model when none is declared.
    pub fn content_model_uris(&mut self, resolver: &ContentResolver) -> ModelResult<Vec<String>> {
        Ok(self
            .filtered_relationships(resolver, None, Some(HAS_MODEL_PREDICATE), None)?
            .into_iter()
            .map(|t| t.object)
            .collect())
    }

    // ---- ID generation ----

    /// A datastream ID not currently in use (`DS` + next numeric suffix).
    ///
    /// The scan covers only currently-present IDs, so an ID whose whole
    /// prefix group has been removed can in principle be handed out again.
    /// This matches the observed behavior of the original system; callers
    /// must not rely on uniqueness across the object's full history.
    pub fn new_datastream_id(&self) -> String {
        let n = max_suffix(self.datastream_ids(), DATASTREAM_ID_PREFIX).map_or(1, |m| m + 1);
        format!("{DATASTREAM_ID_PREFIX}{n}")
    }

    /// A version ID for the given datastream (`{id}.` + next suffix,
    /// starting at 0 for a new group).
    pub fn new_version_id(&self, datastream_id: &str) -> String {
        let prefix = format!("{datastream_id}.");
        let existing = self
            .versions(datastream_id)
            .into_iter()
            .flatten()
            .map(|v| v.version_id.as_str());
        let n = max_suffix(existing, &prefix).map_or(0, |m| m + 1);
        format!("{prefix}{n}")
    }

    /// An audit record ID (`AUDREC` + next suffix).
    pub fn new_audit_record_id(&self) -> String {
        let existing = self.audit_records.iter().map(|r| r.id.as_str());
        let n = max_suffix(existing, AUDIT_RECORD_ID_PREFIX).map_or(1, |m| m + 1);
        format!("{AUDIT_RECORD_ID_PREFIX}{n}")
    }
}

impl Default for DigitalObject {
    fn default() -> Self {
        Self::new()
    }
}

/// Index of the current version: maximum `create_date`, first-seen-wins on
/// ties (strictly-greater comparison during a forward scan). Versions
/// without a date sort earliest.
fn current_index(group: &[Datastream]) -> Option<usize> {
    let mut best: Option<usize> = None;
    for (i, v) in group.iter().enumerate() {
        match best {
            None => best = Some(i),
            Some(b) => {
                if v.create_date > group[b].create_date {
                    best = Some(i);
                }
            }
        }
    }
    best
}

fn max_suffix<'a>(ids: impl Iterator<Item = &'a str>, prefix: &str) -> Option<u64> {
    ids.filter_map(|id| id.strip_prefix(prefix))
        .filter_map(|suffix| suffix.parse::<u64>().ok())
        .max()
}

#[cfg(test)]
mod tests {
    use dor_store::memory::memory_resolver;
    use dor_types::date::parse_date;

    use crate::datastream::ContentLocation;

    use super::*;

    fn inline_ds(id: &str, vid: &str, date: &str, xml: &[u8]) -> Datastream {
        let mut ds = Datastream::new(id, vid, ContentLocation::InlineXml { bytes: xml.to_vec() });
        ds.create_date = Some(parse_date(date).unwrap());
        ds
    }

    fn rels_ext(vid: &str, date: &str, object: &str) -> Datastream {
        let xml = format!(
            r#"<rdf:RDF xmlns:rdf="http://www.w3.org/1999/02/22-rdf-syntax-ns#"
                xmlns:rel="info:dor/dor-system:def/relations#">
              <rdf:Description rdf:about="info:dor/demo:1">
                <rel:isMemberOf rdf:resource="{object}"/>
              </rdf:Description></rdf:RDF>"#
        );
        inline_ds(RELS_EXT_ID, vid, date, xml.as_bytes())
    }

    fn object_with_pid() -> DigitalObject {
        let mut obj = DigitalObject::new();
        obj.assign_pid(Pid::new("demo:1").unwrap()).unwrap();
        obj
    }

    #[test]
    fn pid_is_immutable_once_assigned() {
        let mut obj = object_with_pid();
        assert!(matches!(
            obj.assign_pid(Pid::new("demo:2").unwrap()),
            Err(ModelError::PidAlreadyAssigned(_))
        ));
        assert_eq!(obj.pid().unwrap().as_str(), "demo:1");
    }

    #[test]
    fn current_version_is_max_create_date() {
        let mut obj = object_with_pid();
        obj.add_datastream_version(inline_ds("DC", "DC.0", "2008-01-01T00:00:00Z", b"<a/>"), true)
            .unwrap();
        obj.add_datastream_version(inline_ds("DC", "DC.1", "2008-06-01T00:00:00Z", b"<b/>"), true)
            .unwrap();
        assert_eq!(obj.current_version("DC").unwrap().version_id, "DC.1");
    }

    #[test]
    fn earlier_dated_addition_never_becomes_current() {
        let mut obj = object_with_pid();
        obj.add_datastream_version(inline_ds("DC", "DC.0", "2008-06-01T00:00:00Z", b"<a/>"), true)
            .unwrap();
        obj.add_datastream_version(inline_ds("DC", "DC.1", "2007-01-01T00:00:00Z", b"<b/>"), true)
            .unwrap();
        assert_eq!(obj.current_version("DC").unwrap().version_id, "DC.0");
        assert_eq!(obj.versions("DC").unwrap().len(), 2);
    }

    #[test]
    fn create_date_ties_break_first_seen_wins() {
        let mut obj = object_with_pid();
        obj.add_datastream_version(inline_ds("DC", "DC.0", "2008-01-01T00:00:00Z", b"<a/>"), true)
            .unwrap();
        obj.add_datastream_version(inline_ds("DC", "DC.1", "2008-01-01T00:00:00Z", b"<b/>"), true)
            .unwrap();
        assert_eq!(obj.current_version("DC").unwrap().version_id, "DC.0");
    }

    #[test]
    fn non_versionable_addition_replaces_current() {
        let mut obj = object_with_pid();
        let mut v0 = inline_ds("DC", "DC.0", "2008-01-01T00:00:00Z", b"<a/>");
        v0.versionable = false;
        obj.add_datastream_version(v0, true).unwrap();
        let mut v1 = inline_ds("DC", "DC.1", "2008-06-01T00:00:00Z", b"<b/>");
        v1.versionable = false;
        obj.add_datastream_version(v1, true).unwrap();
        let versions = obj.versions("DC").unwrap();
        assert_eq!(versions.len(), 1);
        assert_eq!(versions[0].version_id, "DC.1");
    }

    #[test]
    fn explicit_false_add_new_version_wins_over_versionable_flag() {
        let mut obj = object_with_pid();
        obj.add_datastream_version(inline_ds("DC", "DC.0", "2008-01-01T00:00:00Z", b"<a/>"), true)
            .unwrap();
        // incoming version says versionable, caller says replace
        obj.add_datastream_version(inline_ds("DC", "DC.1", "2008-06-01T00:00:00Z", b"<b/>"), false)
            .unwrap();
        assert_eq!(obj.versions("DC").unwrap().len(), 1);
    }

    #[test]
    fn control_group_is_fixed_per_datastream_id() {
        let mut obj = object_with_pid();
        obj.add_datastream_version(inline_ds("DC", "DC.0", "2008-01-01T00:00:00Z", b"<a/>"), true)
            .unwrap();
        let managed = {
            let mut ds = Datastream::new("DC", "DC.1", ContentLocation::Managed { key: "k".into() });
            ds.create_date = Some(parse_date("2008-06-01T00:00:00Z").unwrap());
            ds
        };
        assert!(matches!(
            obj.add_datastream_version(managed, true),
            Err(ModelError::ControlGroupMismatch { .. })
        ));
    }

    #[test]
    fn empty_group_is_removed_from_the_map() {
        let mut obj = object_with_pid();
        obj.add_datastream_version(inline_ds("DC", "DC.0", "2008-01-01T00:00:00Z", b"<a/>"), true)
            .unwrap();
        obj.remove_datastream_version("DC", "DC.0").unwrap();
        assert_eq!(obj.datastream_ids().count(), 0);
        assert!(obj.versions("DC").is_none());
    }

    #[test]
    fn removing_current_version_promotes_the_previous_one() {
        let mut obj = object_with_pid();
        obj.add_datastream_version(inline_ds("DC", "DC.0", "2008-01-01T00:00:00Z", b"<a/>"), true)
            .unwrap();
        obj.add_datastream_version(inline_ds("DC", "DC.1", "2008-06-01T00:00:00Z", b"<b/>"), true)
            .unwrap();
        obj.remove_datastream_version("DC", "DC.1").unwrap();
        assert_eq!(obj.current_version("DC").unwrap().version_id, "DC.0");
    }

    #[test]
    fn implicit_baseline_model_is_synthesized() {
        let resolver = memory_resolver();
        let mut obj = object_with_pid();
        let models = obj.content_model_uris(&resolver).unwrap();
        assert_eq!(models, vec![BASELINE_CONTENT_MODEL.to_string()]);
    }

    #[test]
    fn explicit_model_suppresses_the_baseline() {
        let resolver = memory_resolver();
        let mut obj = object_with_pid();
        let xml = format!(
            r#"<rdf:RDF xmlns:rdf="http://www.w3.org/1999/02/22-rdf-syntax-ns#"
                xmlns:model="info:dor/dor-system:def/model#">
              <rdf:Description rdf:about="info:dor/demo:1">
                <model:hasModel rdf:resource="info:dor/demo:CustomModel"/>
              </rdf:Description></rdf:RDF>"#
        );
        obj.add_datastream_version(
            inline_ds(RELS_EXT_ID, "RELS-EXT.0", "2008-01-01T00:00:00Z", xml.as_bytes()),
            true,
        )
        .unwrap();
        let models = obj.content_model_uris(&resolver).unwrap();
        assert_eq!(models, vec!["info:dor/demo:CustomModel".to_string()]);
    }

    #[test]
    fn replacing_current_rels_ext_changes_query_results() {
        let resolver = memory_resolver();
        let mut obj = object_with_pid();
        obj.add_datastream_version(
            rels_ext("RELS-EXT.0", "2008-01-01T00:00:00Z", "info:dor/demo:old"),
            true,
        )
        .unwrap();
        let before = obj
            .filtered_relationships(&resolver, None, None, Some("info:dor/demo:old"))
            .unwrap();
        assert_eq!(before.len(), 1);
        obj.add_datastream_version(
            rels_ext("RELS-EXT.1", "2008-06-01T00:00:00Z", "info:dor/demo:new"),
            true,
        )
        .unwrap();
        let old = obj
            .filtered_relationships(&resolver, None, None, Some("info:dor/demo:old"))
            .unwrap();
        let new = obj
            .filtered_relationships(&resolver, None, None, Some("info:dor/demo:new"))
            .unwrap();
        assert!(old.is_empty());
        assert_eq!(new.len(), 1);
    }

    #[test]
    fn in_place_rels_ext_replacement_with_same_version_id_rereads() {
        let resolver = memory_resolver();
        let mut obj = object_with_pid();
        obj.add_datastream_version(
            rels_ext("RELS-EXT.0", "2008-01-01T00:00:00Z", "info:dor/demo:old"),
            true,
        )
        .unwrap();
        obj.relationships(&resolver).unwrap();
        assert!(obj.relationship_cache.is_some());
        // forced replacement reusing the version ID, new content
        obj.add_datastream_version(
            rels_ext("RELS-EXT.0", "2008-01-01T00:00:00Z", "info:dor/demo:new"),
            false,
        )
        .unwrap();
        let old = obj
            .filtered_relationships(&resolver, None, None, Some("info:dor/demo:old"))
            .unwrap();
        let new = obj
            .filtered_relationships(&resolver, None, None, Some("info:dor/demo:new"))
            .unwrap();
        assert!(old.is_empty());
        assert_eq!(new.len(), 1);
    }

    #[test]
    fn adding_non_current_rels_ext_version_keeps_the_cache() {
        let resolver = memory_resolver();
        let mut obj = object_with_pid();
        obj.add_datastream_version(
            rels_ext("RELS-EXT.0", "2008-06-01T00:00:00Z", "info:dor/demo:current"),
            true,
        )
        .unwrap();
        obj.relationships(&resolver).unwrap();
        assert!(obj.relationship_cache.is_some());
        // historical version, dated before the current one
        obj.add_datastream_version(
            rels_ext("RELS-EXT.1", "2007-01-01T00:00:00Z", "info:dor/demo:stale"),
            true,
        )
        .unwrap();
        assert!(obj.relationship_cache.is_some());
        let stale = obj
            .filtered_relationships(&resolver, None, None, Some("info:dor/demo:stale"))
            .unwrap();
        assert!(stale.is_empty());
    }

    #[test]
    fn removing_current_rels_ext_rereads_from_the_promoted_version() {
        let resolver = memory_resolver();
        let mut obj = object_with_pid();
        obj.add_datastream_version(
            rels_ext("RELS-EXT.0", "2008-01-01T00:00:00Z", "info:dor/demo:t1"),
            true,
        )
        .unwrap();
        obj.add_datastream_version(
            rels_ext("RELS-EXT.1", "2008-06-01T00:00:00Z", "info:dor/demo:t2"),
            true,
        )
        .unwrap();
        obj.remove_datastream_version(RELS_EXT_ID, "RELS-EXT.1").unwrap();
        let t1 = obj
            .filtered_relationships(&resolver, None, None, Some("info:dor/demo:t1"))
            .unwrap();
        assert_eq!(t1.len(), 1);
    }

    #[test]
    fn audit_datastream_never_versions() {
        let mut obj = object_with_pid();
        obj.add_datastream_version(inline_ds(AUDIT_ID, "AUDIT.0", "2008-01-01T00:00:00Z", b"<a/>"), true)
            .unwrap();
        obj.add_datastream_version(inline_ds(AUDIT_ID, "AUDIT.0", "2008-06-01T00:00:00Z", b"<b/>"), true)
            .unwrap();
        assert_eq!(obj.versions(AUDIT_ID).unwrap().len(), 1);
    }

    #[test]
    fn generated_ids_increment_the_max_suffix() {
        let mut obj = object_with_pid();
        assert_eq!(obj.new_datastream_id(), "DS1");
        obj.add_datastream_version(inline_ds("DS3", "DS3.0", "2008-01-01T00:00:00Z", b"<a/>"), true)
            .unwrap();
        assert_eq!(obj.new_datastream_id(), "DS4");
        assert_eq!(obj.new_version_id("DS3"), "DS3.1");
        assert_eq!(obj.new_version_id("NEW"), "NEW.0");
        assert_eq!(obj.new_audit_record_id(), "AUDREC1");
        let mut rec = AuditRecord::new("AUDREC7");
        rec.action = "modifyDatastreamByValue".to_string();
        obj.add_audit_record(rec);
        assert_eq!(obj.new_audit_record_id(), "AUDREC8");
    }

    #[test]
    fn id_scan_only_sees_present_ids() {
        let mut obj = object_with_pid();
        obj.add_datastream_version(inline_ds("DS1", "DS1.0", "2008-01-01T00:00:00Z", b"<a/>"), true)
            .unwrap();
        obj.remove_datastream_version("DS1", "DS1.0").unwrap();
        // the prefix group is gone, so the ID can be handed out again
        assert_eq!(obj.new_datastream_id(), "DS1");
    }
}
