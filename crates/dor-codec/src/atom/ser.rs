use std::io::Write;

use base64::Engine as _;
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::Writer;

use dor_model::{ContentLocation, Datastream, DigitalObject, AUDIT_ID};
use dor_store::ContentResolver;
use dor_types::date::format_date;
use dor_types::TranslationContext;

use crate::audit_xml::generate_audit_trail;
use crate::error::{CodecError, CodecResult};
use crate::translation::{
    datastream_state_attribute, normalize_ds_location, object_state_attribute, TranslationConfig,
};
use crate::vocab::{
    CAT_ALT_IDS, CAT_CONTROL_GROUP, CAT_DIGEST, CAT_DIGEST_TYPE, CAT_FORMAT_URI, CAT_LENGTH,
    CAT_VERSIONABLE, PROP_CREATED_DATE, PROP_LABEL, PROP_STATE, THREAD_NS,
};
use crate::xmlutil::{strip_decl, write_raw, write_text_element, xml_err};

use super::MemberSink;

pub(crate) fn serialize(
    object: &DigitalObject,
    sink: &mut dyn Write,
    context: TranslationContext,
    config: &TranslationConfig,
    resolver: &ContentResolver,
    members: &mut dyn MemberSink,
) -> CodecResult<()> {
    let pid = object.pid().ok_or_else(|| {
        CodecError::ObjectIntegrity("cannot serialize an object without a PID".to_string())
    })?;
    let pid_uri = pid.to_uri();

    let mut writer = Writer::new(sink);
    writer
        .write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))
        .map_err(xml_err)?;

    let mut feed = BytesStart::new("feed");
    feed.push_attribute(("xmlns", "http://www.w3.org/2005/Atom"));
    feed.push_attribute(("xmlns:thr", THREAD_NS));
    writer.write_event(Event::Start(feed)).map_err(xml_err)?;

    write_text_element(&mut writer, "id", &pid_uri)?;
    write_text_element(&mut writer, "title", &object.label)?;
    if let Some(date) = &object.last_mod_date {
        write_text_element(&mut writer, "updated", &format_date(date))?;
    }
    writer
        .write_event(Event::Start(BytesStart::new("author")))
        .map_err(xml_err)?;
    write_text_element(&mut writer, "name", &object.owner_id)?;
    writer
        .write_event(Event::End(BytesEnd::new("author")))
        .map_err(xml_err)?;

    write_category(&mut writer, PROP_STATE, object_state_attribute(object.state))?;
    if let Some(date) = &object.create_date {
        write_category(&mut writer, PROP_CREATED_DATE, &format_date(date))?;
    }
    for (name, value) in &object.ext_properties {
        write_category(&mut writer, name, value)?;
    }

    write_audit_entries(&mut writer, object, &pid_uri)?;

    for id in object.datastream_ids() {
        // the audit trail already went out as its own entry pair
        if id == AUDIT_ID {
            continue;
        }
        let versions = match object.versions(id) {
            Some(v) if !v.is_empty() => v,
            _ => continue,
        };
        let current = object.current_version(id).unwrap_or(&versions[0]);
        let parent_id = format!("{pid_uri}/{id}");

        writer
            .write_event(Event::Start(BytesStart::new("entry")))
            .map_err(xml_err)?;
        write_text_element(&mut writer, "id", &parent_id)?;
        write_text_element(&mut writer, "title", id)?;
        // the parent carries the earliest version date so it always sorts
        // ahead of its own versions
        if let Some(earliest) = versions.iter().filter_map(|v| v.create_date).min() {
            write_text_element(&mut writer, "updated", &format_date(&earliest))?;
        }
        let mut link = BytesStart::new("link");
        link.push_attribute(("rel", "alternate"));
        link.push_attribute((
            "href",
            format!("{parent_id}/{}", current.version_id).as_str(),
        ));
        writer.write_event(Event::Empty(link)).map_err(xml_err)?;
        write_category(&mut writer, CAT_CONTROL_GROUP, current.control_group().code())?;
        write_category(&mut writer, PROP_STATE, datastream_state_attribute(current.state))?;
        write_category(
            &mut writer,
            CAT_VERSIONABLE,
            if current.versionable { "true" } else { "false" },
        )?;
        writer
            .write_event(Event::End(BytesEnd::new("entry")))
            .map_err(xml_err)?;

        for ds in versions {
            let ds = normalize_ds_location(pid, ds, context, config);
            write_version_entry(
                &mut writer,
                &ds,
                &parent_id,
                context,
                resolver,
                members,
            )?;
        }
    }

    writer
        .write_event(Event::End(BytesEnd::new("feed")))
        .map_err(xml_err)?;
    Ok(())
}

fn write_category<W: Write>(writer: &mut Writer<W>, scheme: &str, term: &str) -> CodecResult<()> {
    let mut el = BytesStart::new("category");
    el.push_attribute(("scheme", scheme));
    el.push_attribute(("term", term));
    writer.write_event(Event::Empty(el)).map_err(xml_err)?;
    Ok(())
}

/// Emit the audit trail as its own parent/version entry pair, regenerated
/// from the record list.
fn write_audit_entries<W: Write>(
    writer: &mut Writer<W>,
    object: &DigitalObject,
    pid_uri: &str,
) -> CodecResult<()> {
    if object.audit_records().is_empty() {
        return Ok(());
    }
    let parent_id = format!("{pid_uri}/{AUDIT_ID}");
    let version_id = format!("{parent_id}/{AUDIT_ID}.0");
    let updated = object.create_date.map(|d| format_date(&d));

    writer
        .write_event(Event::Start(BytesStart::new("entry")))
        .map_err(xml_err)?;
    write_text_element(writer, "id", &parent_id)?;
    write_text_element(writer, "title", AUDIT_ID)?;
    if let Some(updated) = &updated {
        write_text_element(writer, "updated", updated)?;
    }
    write_category(writer, CAT_CONTROL_GROUP, "X")?;
    write_category(writer, PROP_STATE, "A")?;
    write_category(writer, CAT_VERSIONABLE, "false")?;
    writer
        .write_event(Event::End(BytesEnd::new("entry")))
        .map_err(xml_err)?;

    writer
        .write_event(Event::Start(BytesStart::new("entry")))
        .map_err(xml_err)?;
    write_text_element(writer, "id", &version_id)?;
    write_text_element(writer, "title", &format!("{AUDIT_ID}.0"))?;
    if let Some(updated) = &updated {
        write_text_element(writer, "updated", updated)?;
    }
    let mut reply = BytesStart::new("thr:in-reply-to");
    reply.push_attribute(("ref", parent_id.as_str()));
    writer.write_event(Event::Empty(reply)).map_err(xml_err)?;

    let trail = generate_audit_trail(object.audit_records())?;
    let mut content = BytesStart::new("content");
    content.push_attribute(("type", "text/xml"));
    writer.write_event(Event::Start(content)).map_err(xml_err)?;
    write_raw(writer, strip_decl(&trail))?;
    writer
        .write_event(Event::End(BytesEnd::new("content")))
        .map_err(xml_err)?;

    writer
        .write_event(Event::End(BytesEnd::new("entry")))
        .map_err(xml_err)?;
    Ok(())
}

fn write_version_entry<W: Write>(
    writer: &mut Writer<W>,
    ds: &Datastream,
    parent_id: &str,
    context: TranslationContext,
    resolver: &ContentResolver,
    members: &mut dyn MemberSink,
) -> CodecResult<()> {
    writer
        .write_event(Event::Start(BytesStart::new("entry")))
        .map_err(xml_err)?;
    write_text_element(writer, "id", &format!("{parent_id}/{}", ds.version_id))?;
    write_text_element(writer, "title", &ds.version_id)?;
    if let Some(date) = &ds.create_date {
        write_text_element(writer, "updated", &format_date(date))?;
    }
    let mut reply = BytesStart::new("thr:in-reply-to");
    reply.push_attribute(("ref", parent_id));
    writer.write_event(Event::Empty(reply)).map_err(xml_err)?;

    if !ds.label.is_empty() {
        write_category(writer, PROP_LABEL, &ds.label)?;
    }
    if let Some(uri) = &ds.format_uri {
        write_category(writer, CAT_FORMAT_URI, uri)?;
    }
    if !ds.alt_ids.is_empty() {
        write_category(writer, CAT_ALT_IDS, &ds.alt_ids.join(" "))?;
    }
    if !ds.checksum_type.is_disabled() || ds.checksum.is_some() {
        write_category(writer, CAT_DIGEST_TYPE, ds.checksum_type.as_str())?;
        write_category(
            writer,
            CAT_DIGEST,
            ds.checksum
                .as_deref()
                .unwrap_or(dor_types::checksum::CHECKSUM_NONE),
        )?;
    }
    if ds.size > 0 {
        write_category(writer, CAT_LENGTH, &ds.size.to_string())?;
    }

    match &ds.content {
        ContentLocation::InlineXml { bytes } => {
            let mut content = BytesStart::new("content");
            content.push_attribute((
                "type",
                if ds.mime_type.is_empty() {
                    "text/xml"
                } else {
                    ds.mime_type.as_str()
                },
            ));
            writer.write_event(Event::Start(content)).map_err(xml_err)?;
            write_raw(writer, bytes)?;
            writer
                .write_event(Event::End(BytesEnd::new("content")))
                .map_err(xml_err)?;
        }
        ContentLocation::Managed { key } => {
            if context == TranslationContext::SerializeExportArchive {
                let bytes = ds
                    .get_content_stream(resolver)
                    .map_err(|e| CodecError::StreamIo(e.to_string()))?;
                if members.wants_members() {
                    // version IDs are only unique within their group, so
                    // member names carry the datastream ID as well
                    let member = format!("{}/{}", ds.id, ds.version_id);
                    members.add(&member, &bytes)?;
                    write_content_src(writer, &ds.mime_type, &member)?;
                } else {
                    let encoded = base64::engine::general_purpose::STANDARD.encode(&bytes);
                    let mut content = BytesStart::new("content");
                    if !ds.mime_type.is_empty() {
                        content.push_attribute(("type", ds.mime_type.as_str()));
                    }
                    writer.write_event(Event::Start(content)).map_err(xml_err)?;
                    writer
                        .write_event(Event::Text(BytesText::new(&encoded)))
                        .map_err(xml_err)?;
                    writer
                        .write_event(Event::End(BytesEnd::new("content")))
                        .map_err(xml_err)?;
                }
            } else {
                write_content_src(writer, &ds.mime_type, key)?;
            }
        }
        ContentLocation::External { url } | ContentLocation::Redirect { url } => {
            write_content_src(writer, &ds.mime_type, url)?;
        }
    }

    writer
        .write_event(Event::End(BytesEnd::new("entry")))
        .map_err(xml_err)?;
    Ok(())
}

fn write_content_src<W: Write>(
    writer: &mut Writer<W>,
    mime_type: &str,
    src: &str,
) -> CodecResult<()> {
    let mut content = BytesStart::new("content");
    if !mime_type.is_empty() {
        content.push_attribute(("type", mime_type));
    }
    content.push_attribute(("src", src));
    writer.write_event(Event::Empty(content)).map_err(xml_err)?;
    Ok(())
}
