//! The reserved audit-trail XML vocabulary.
//!
//! The `AUDIT` datastream is never carried as ordinary wire content: every
//! codec regenerates it from the object's audit-record list on write and
//! parses it back into records on read. Generation is deterministic, so
//! generate → parse → generate is idempotent.

use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, Event};
use quick_xml::{Reader, Writer};

use dor_model::AuditRecord;
use dor_types::date::{format_date, parse_date};

use crate::error::{CodecError, CodecResult};
use crate::vocab::AUDIT_NS;
use crate::xmlutil::{attr, local_name, write_text_element, xml_err};

/// Serialize the audit-record list as the audit-trail XML document.
pub fn generate_audit_trail(records: &[AuditRecord]) -> CodecResult<Vec<u8>> {
    let mut writer = Writer::new(Vec::new());
    writer
        .write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))
        .map_err(xml_err)?;
    let mut root = BytesStart::new("audit:auditTrail");
    root.push_attribute(("xmlns:audit", AUDIT_NS));
    writer.write_event(Event::Start(root)).map_err(xml_err)?;
    for record in records {
        let mut rec = BytesStart::new("audit:record");
        rec.push_attribute(("ID", record.id.as_str()));
        writer.write_event(Event::Start(rec)).map_err(xml_err)?;

        let mut process = BytesStart::new("audit:process");
        process.push_attribute(("type", record.process_type.as_str()));
        writer.write_event(Event::Empty(process)).map_err(xml_err)?;

        write_text_element(&mut writer, "audit:action", &record.action)?;
        write_text_element(&mut writer, "audit:componentID", &record.component_id)?;
        write_text_element(&mut writer, "audit:responsibility", &record.responsibility)?;
        let date = record.date.map(|d| format_date(&d)).unwrap_or_default();
        write_text_element(&mut writer, "audit:date", &date)?;
        write_text_element(&mut writer, "audit:justification", &record.justification)?;

        writer
            .write_event(Event::End(BytesEnd::new("audit:record")))
            .map_err(xml_err)?;
    }
    writer
        .write_event(Event::End(BytesEnd::new("audit:auditTrail")))
        .map_err(xml_err)?;
    Ok(writer.into_inner())
}

/// Parse an audit-trail XML document back into records.
pub fn parse_audit_trail(bytes: &[u8]) -> CodecResult<Vec<AuditRecord>> {
    let mut reader = Reader::from_reader(bytes);
    reader.config_mut().trim_text(true);
    let mut buf = Vec::new();
    let mut records = Vec::new();
    let mut current: Option<AuditRecord> = None;
    let mut field: Option<String> = None;
    let mut saw_root = false;

    loop {
        match reader.read_event_into(&mut buf)? {
            Event::Eof => break,
            Event::Start(ref e) | Event::Empty(ref e) => {
                let local = local_name(e);
                match local.as_str() {
                    "auditTrail" => saw_root = true,
                    "record" => {
                        let id = attr(e, "ID")?.unwrap_or_default();
                        current = Some(AuditRecord::new(&id));
                    }
                    "process" => {
                        if let Some(rec) = &mut current {
                            rec.process_type = attr(e, "type")?.unwrap_or_default();
                        }
                    }
                    "action" | "componentID" | "responsibility" | "date" | "justification" => {
                        field = Some(local);
                    }
                    other => {
                        return Err(CodecError::ObjectIntegrity(format!(
                            "unexpected element in audit trail: <{other}>"
                        )));
                    }
                }
            }
            Event::Text(ref t) => {
                if let (Some(rec), Some(name)) = (&mut current, &field) {
                    let text = t
                        .unescape()
                        .map_err(|e| CodecError::ObjectIntegrity(e.to_string()))?
                        .into_owned();
                    match name.as_str() {
                        "action" => rec.action.push_str(&text),
                        "componentID" => rec.component_id.push_str(&text),
                        "responsibility" => rec.responsibility.push_str(&text),
                        "date" => {
                            rec.date = Some(
                                parse_date(&text)
                                    .map_err(|e| CodecError::ObjectIntegrity(e.to_string()))?,
                            );
                        }
                        "justification" => rec.justification.push_str(&text),
                        _ => {}
                    }
                }
            }
            Event::End(ref e) => {
                let local = String::from_utf8_lossy(e.local_name().as_ref()).to_string();
                if local == "record" {
                    if let Some(rec) = current.take() {
                        records.push(rec);
                    }
                }
                field = None;
            }
            _ => {}
        }
        buf.clear();
    }
    if !saw_root {
        return Err(CodecError::ObjectIntegrity(
            "audit trail root element not found".to_string(),
        ));
    }
    Ok(records)
}
