//! Relationship-graph extraction from the reserved relationship
//! datastreams.
//!
//! `RELS-EXT` describes the object's relationships to other objects;
//! `RELS-INT` describes relationships of the object's own datastreams. Both
//! carry an RDF/XML document of flat `Description` nodes; each child
//! element of a description is one predicate, with either an
//! `rdf:resource` attribute (resource object) or text content (literal
//! object, optionally datatyped).

use quick_xml::events::Event;
use quick_xml::name::ResolveResult;
use quick_xml::NsReader;

use dor_types::RelationshipTuple;

use crate::error::{ModelError, ModelResult};

/// Reserved datastream ID: object-to-object relationship graph.
pub const RELS_EXT_ID: &str = "RELS-EXT";

/// Reserved datastream ID: intra-object (datastream-level) relationships.
pub const RELS_INT_ID: &str = "RELS-INT";

/// Reserved datastream ID: the audit trail.
pub const AUDIT_ID: &str = "AUDIT";

/// Predicate asserting that an object is an instance of a content model.
pub const HAS_MODEL_PREDICATE: &str = "info:dor/dor-system:def/model#hasModel";

/// The baseline content model every object is implicitly an instance of
/// when it declares no explicit model. The implicit tuple is synthesized at
/// query time and never persisted.
pub const BASELINE_CONTENT_MODEL: &str = "info:dor/dor-system:BaseObject-1.0";

const RDF_NS: &str = "http://www.w3.org/1999/02/22-rdf-syntax-ns#";

/// Parse an RDF/XML relationship document into tuples.
///
/// Only the flat description structure used by the reserved relationship
/// datastreams is supported; nested resource nodes are rejected.
pub fn parse_relationships(bytes: &[u8]) -> ModelResult<Vec<RelationshipTuple>> {
    let mut reader = NsReader::from_reader(bytes);
    reader.config_mut().trim_text(true);
    let mut buf = Vec::new();
    let mut tuples = Vec::new();
    let mut subject: Option<String> = None;
    // (predicate URI, datatype) for a literal whose text is being collected
    let mut pending: Option<(String, Option<String>)> = None;
    let mut pending_text = String::new();
    let mut ignore_depth: u32 = 0;

    loop {
        let (ns, event) = reader
            .read_resolved_event_into(&mut buf)
            .map_err(|e| ModelError::RelationshipGraph(e.to_string()))?;
        match event {
            Event::Eof => break,
            Event::Start(ref e) | Event::Empty(ref e) => {
                let is_empty = matches!(event, Event::Empty(_));
                if ignore_depth > 0 {
                    if !is_empty {
                        ignore_depth += 1;
                    }
                    buf.clear();
                    continue;
                }
                let local = String::from_utf8_lossy(e.local_name().as_ref()).to_string();
                let ns_uri = match ns {
                    ResolveResult::Bound(n) => String::from_utf8_lossy(n.as_ref()).to_string(),
                    _ => String::new(),
                };
                if ns_uri == RDF_NS && local == "RDF" {
                    buf.clear();
                    continue;
                }
                if ns_uri == RDF_NS && local == "Description" {
                    let about = find_attr(e, "about")?;
                    subject = Some(about.ok_or_else(|| {
                        ModelError::RelationshipGraph("Description without rdf:about".to_string())
                    })?);
                    buf.clear();
                    continue;
                }
                match (&subject, &pending) {
                    (Some(subj), None) => {
                        let predicate = format!("{ns_uri}{local}");
                        if let Some(resource) = find_attr(e, "resource")? {
                            tuples.push(RelationshipTuple::resource(subj, &predicate, &resource));
                            if !is_empty {
                                ignore_depth = 1;
                            }
                        } else {
                            let datatype = find_attr(e, "datatype")?;
                            if is_empty {
                                tuples.push(RelationshipTuple::literal(
                                    subj,
                                    &predicate,
                                    "",
                                    datatype.as_deref(),
                                ));
                            } else {
                                pending = Some((predicate, datatype));
                                pending_text.clear();
                            }
                        }
                    }
                    (Some(_), Some(_)) => {
                        return Err(ModelError::RelationshipGraph(format!(
                            "nested node <{local}> inside a literal predicate"
                        )));
                    }
                    (None, _) => {
                        return Err(ModelError::RelationshipGraph(format!(
                            "element <{local}> outside any Description"
                        )));
                    }
                }
            }
            Event::Text(ref t) => {
                if pending.is_some() {
                    pending_text.push_str(
                        &t.unescape()
                            .map_err(|e| ModelError::RelationshipGraph(e.to_string()))?,
                    );
                }
            }
            Event::End(_) => {
                if ignore_depth > 0 {
                    ignore_depth -= 1;
                } else if let Some((predicate, datatype)) = pending.take() {
                    let subj = subject.as_deref().unwrap_or_default();
                    tuples.push(RelationshipTuple::literal(
                        subj,
                        &predicate,
                        &pending_text,
                        datatype.as_deref(),
                    ));
                    pending_text.clear();
                } else {
                    // closing a Description or the RDF root
                    subject = None;
                }
            }
            _ => {}
        }
        buf.clear();
    }
    Ok(tuples)
}

fn find_attr(e: &quick_xml::events::BytesStart<'_>, local: &str) -> ModelResult<Option<String>> {
    for attr in e.attributes() {
        let attr = attr.map_err(|e| ModelError::RelationshipGraph(e.to_string()))?;
        if attr.key.local_name().as_ref() == local.as_bytes() {
            let value = attr
                .unescape_value()
                .map_err(|e| ModelError::RelationshipGraph(e.to_string()))?;
            return Ok(Some(value.into_owned()));
        }
    }
    Ok(None)
}

#[cfg(test)]
mod tests {
    use super::*;

    const RELS: &[u8] = br#"<rdf:RDF xmlns:rdf="http://www.w3.org/1999/02/22-rdf-syntax-ns#"
          xmlns:model="info:dor/dor-system:def/model#"
          xmlns:rel="info:dor/dor-system:def/relations#">
        <rdf:Description rdf:about="info:dor/demo:1">
          <model:hasModel rdf:resource="info:dor/demo:UVA_STD_IMAGE"/>
          <rel:isMemberOfCollection rdf:resource="info:dor/demo:collection"/>
          <rel:itemID rdf:datatype="http://www.w3.org/2001/XMLSchema#string">item-77</rel:itemID>
        </rdf:Description>
      </rdf:RDF>"#;

    #[test]
    fn parses_resource_and_literal_tuples() {
        let tuples = parse_relationships(RELS).unwrap();
        assert_eq!(tuples.len(), 3);
        assert!(tuples.contains(&RelationshipTuple::resource(
            "info:dor/demo:1",
            "info:dor/dor-system:def/model#hasModel",
            "info:dor/demo:UVA_STD_IMAGE",
        )));
        assert!(tuples.contains(&RelationshipTuple::literal(
            "info:dor/demo:1",
            "info:dor/dor-system:def/relations#itemID",
            "item-77",
            Some("http://www.w3.org/2001/XMLSchema#string"),
        )));
    }

    #[test]
    fn multiple_descriptions_keep_their_subjects() {
        let xml = br#"<rdf:RDF xmlns:rdf="http://www.w3.org/1999/02/22-rdf-syntax-ns#"
              xmlns:rel="info:dor/dor-system:def/relations#">
            <rdf:Description rdf:about="info:dor/demo:1/DS1">
              <rel:isBackupOf rdf:resource="info:dor/demo:1/DS2"/>
            </rdf:Description>
            <rdf:Description rdf:about="info:dor/demo:1/DS2">
              <rel:label>primary</rel:label>
            </rdf:Description>
          </rdf:RDF>"#;
        let tuples = parse_relationships(xml).unwrap();
        assert_eq!(tuples.len(), 2);
        assert_eq!(tuples[0].subject, "info:dor/demo:1/DS1");
        assert_eq!(tuples[1].subject, "info:dor/demo:1/DS2");
        assert!(tuples[1].is_literal);
    }

    #[test]
    fn description_without_about_is_rejected() {
        let xml = br#"<rdf:RDF xmlns:rdf="http://www.w3.org/1999/02/22-rdf-syntax-ns#">
            <rdf:Description><p>x</p></rdf:Description></rdf:RDF>"#;
        assert!(parse_relationships(xml).is_err());
    }

    #[test]
    fn empty_document_yields_no_tuples() {
        let xml = br#"<rdf:RDF xmlns:rdf="http://www.w3.org/1999/02/22-rdf-syntax-ns#"/>"#;
        assert!(parse_relationships(xml).unwrap().is_empty());
    }
}
