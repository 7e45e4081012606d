use std::io::Write;

use base64::Engine as _;
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, Event};
use quick_xml::Writer;

use dor_model::{ContentLocation, Datastream, DigitalObject, AUDIT_ID};
use dor_store::ContentResolver;
use dor_types::date::format_date;
use dor_types::format::DOXML_1_0;
use dor_types::{FormatIdentity, TranslationContext};

use crate::audit_xml::generate_audit_trail;
use crate::error::{CodecError, CodecResult};
use crate::translation::{
    datastream_state_attribute, normalize_ds_location, object_state_attribute, TranslationConfig,
};
use crate::vocab::{
    PROP_CREATED_DATE, PROP_LABEL, PROP_LAST_MODIFIED_DATE, PROP_OWNER_ID, PROP_STATE,
};
use crate::xmlutil::{strip_decl, write_raw, xml_err};

pub(super) fn serialize(
    object: &DigitalObject,
    sink: &mut dyn Write,
    context: TranslationContext,
    config: &TranslationConfig,
    resolver: &ContentResolver,
    format: &'static FormatIdentity,
) -> CodecResult<()> {
    let pid = object.pid().ok_or_else(|| {
        CodecError::ObjectIntegrity("cannot serialize an object without a PID".to_string())
    })?;

    let mut writer = Writer::new(sink);
    writer
        .write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))
        .map_err(xml_err)?;

    let version = if format.uri == DOXML_1_0.uri { "1.0" } else { "1.1" };
    let mut root = BytesStart::new("digitalObject");
    root.push_attribute(("VERSION", version));
    root.push_attribute(("PID", pid.as_str()));
    root.push_attribute(("xmlns", format.namespace));
    root.push_attribute(("xmlns:xsi", "http://www.w3.org/2001/XMLSchema-instance"));
    root.push_attribute((
        "xsi:schemaLocation",
        format!("{} {}", format.namespace, format.schema_location).as_str(),
    ));
    writer.write_event(Event::Start(root)).map_err(xml_err)?;

    write_object_properties(&mut writer, object)?;
    write_audit_datastream(&mut writer, object)?;

    for id in object.datastream_ids() {
        // the audit trail is regenerated from the record list above
        if id == AUDIT_ID {
            continue;
        }
        let versions = match object.versions(id) {
            Some(v) if !v.is_empty() => v,
            _ => continue,
        };
        let current = object.current_version(id).unwrap_or(&versions[0]);
        let mut group = BytesStart::new("datastream");
        group.push_attribute(("ID", id));
        group.push_attribute(("STATE", datastream_state_attribute(current.state)));
        group.push_attribute(("CONTROL_GROUP", current.control_group().code()));
        group.push_attribute((
            "VERSIONABLE",
            if current.versionable { "true" } else { "false" },
        ));
        writer.write_event(Event::Start(group)).map_err(xml_err)?;
        for ds in versions {
            let ds = normalize_ds_location(pid, ds, context, config);
            write_version(&mut writer, &ds, context, resolver)?;
        }
        writer
            .write_event(Event::End(BytesEnd::new("datastream")))
            .map_err(xml_err)?;
    }

    writer
        .write_event(Event::End(BytesEnd::new("digitalObject")))
        .map_err(xml_err)?;
    Ok(())
}

fn write_object_properties<W: Write>(
    writer: &mut Writer<W>,
    object: &DigitalObject,
) -> CodecResult<()> {
    writer
        .write_event(Event::Start(BytesStart::new("objectProperties")))
        .map_err(xml_err)?;
    write_property(writer, PROP_STATE, object_state_attribute(object.state))?;
    write_property(writer, PROP_LABEL, &object.label)?;
    write_property(writer, PROP_OWNER_ID, &object.owner_id)?;
    if let Some(date) = &object.create_date {
        write_property(writer, PROP_CREATED_DATE, &format_date(date))?;
    }
    if let Some(date) = &object.last_mod_date {
        write_property(writer, PROP_LAST_MODIFIED_DATE, &format_date(date))?;
    }
    for (name, value) in &object.ext_properties {
        let mut el = BytesStart::new("extproperty");
        el.push_attribute(("NAME", name.as_str()));
        el.push_attribute(("VALUE", value.as_str()));
        writer.write_event(Event::Empty(el)).map_err(xml_err)?;
    }
    writer
        .write_event(Event::End(BytesEnd::new("objectProperties")))
        .map_err(xml_err)?;
    Ok(())
}

fn write_property<W: Write>(writer: &mut Writer<W>, name: &str, value: &str) -> CodecResult<()> {
    let mut el = BytesStart::new("property");
    el.push_attribute(("NAME", name));
    el.push_attribute(("VALUE", value));
    writer.write_event(Event::Empty(el)).map_err(xml_err)?;
    Ok(())
}

/// The audit trail is regenerated from the record list on every write; the
/// reserved datastream never carries independent wire content.
fn write_audit_datastream<W: Write>(
    writer: &mut Writer<W>,
    object: &DigitalObject,
) -> CodecResult<()> {
    if object.audit_records().is_empty() {
        return Ok(());
    }
    let mut group = BytesStart::new("datastream");
    group.push_attribute(("ID", AUDIT_ID));
    group.push_attribute(("STATE", "A"));
    group.push_attribute(("CONTROL_GROUP", "X"));
    group.push_attribute(("VERSIONABLE", "false"));
    writer.write_event(Event::Start(group)).map_err(xml_err)?;

    let mut version = BytesStart::new("datastreamVersion");
    version.push_attribute(("ID", format!("{AUDIT_ID}.0").as_str()));
    version.push_attribute(("LABEL", "Audit Trail"));
    if let Some(date) = &object.create_date {
        version.push_attribute(("CREATED", format_date(date).as_str()));
    }
    version.push_attribute(("MIMETYPE", "text/xml"));
    writer.write_event(Event::Start(version)).map_err(xml_err)?;

    let trail = generate_audit_trail(object.audit_records())?;
    writer
        .write_event(Event::Start(BytesStart::new("xmlContent")))
        .map_err(xml_err)?;
    write_raw(writer, strip_decl(&trail))?;
    writer
        .write_event(Event::End(BytesEnd::new("xmlContent")))
        .map_err(xml_err)?;

    writer
        .write_event(Event::End(BytesEnd::new("datastreamVersion")))
        .map_err(xml_err)?;
    writer
        .write_event(Event::End(BytesEnd::new("datastream")))
        .map_err(xml_err)?;
    Ok(())
}

fn write_version<W: Write>(
    writer: &mut Writer<W>,
    ds: &Datastream,
    context: TranslationContext,
    resolver: &ContentResolver,
) -> CodecResult<()> {
    let mut el = BytesStart::new("datastreamVersion");
    el.push_attribute(("ID", ds.version_id.as_str()));
    el.push_attribute(("LABEL", ds.label.as_str()));
    if let Some(date) = &ds.create_date {
        el.push_attribute(("CREATED", format_date(date).as_str()));
    }
    el.push_attribute(("MIMETYPE", ds.mime_type.as_str()));
    if let Some(uri) = &ds.format_uri {
        el.push_attribute(("FORMAT_URI", uri.as_str()));
    }
    if !ds.alt_ids.is_empty() {
        el.push_attribute(("ALT_IDS", ds.alt_ids.join(" ").as_str()));
    }
    if ds.size > 0 {
        el.push_attribute(("SIZE", ds.size.to_string().as_str()));
    }
    writer.write_event(Event::Start(el)).map_err(xml_err)?;

    if !ds.checksum_type.is_disabled() || ds.checksum.is_some() {
        let mut digest = BytesStart::new("contentDigest");
        digest.push_attribute(("TYPE", ds.checksum_type.as_str()));
        digest.push_attribute((
            "DIGEST",
            ds.checksum
                .as_deref()
                .unwrap_or(dor_types::checksum::CHECKSUM_NONE),
        ));
        writer.write_event(Event::Empty(digest)).map_err(xml_err)?;
    }

    match &ds.content {
        ContentLocation::InlineXml { bytes } => {
            writer
                .write_event(Event::Start(BytesStart::new("xmlContent")))
                .map_err(xml_err)?;
            write_raw(writer, bytes)?;
            writer
                .write_event(Event::End(BytesEnd::new("xmlContent")))
                .map_err(xml_err)?;
        }
        ContentLocation::Managed { key } => {
            if context == TranslationContext::SerializeExportArchive {
                let bytes = ds
                    .get_content_stream(resolver)
                    .map_err(|e| CodecError::StreamIo(e.to_string()))?;
                let encoded = base64::engine::general_purpose::STANDARD.encode(&bytes);
                writer
                    .write_event(Event::Start(BytesStart::new("binaryContent")))
                    .map_err(xml_err)?;
                writer
                    .write_event(Event::Text(quick_xml::events::BytesText::new(&encoded)))
                    .map_err(xml_err)?;
                writer
                    .write_event(Event::End(BytesEnd::new("binaryContent")))
                    .map_err(xml_err)?;
            } else {
                let kind = if context == TranslationContext::SerializeExportPublic
                    || context == TranslationContext::SerializeExportMigrate
                {
                    "URL"
                } else {
                    "INTERNAL_ID"
                };
                write_location(writer, kind, key)?;
            }
        }
        ContentLocation::External { url } | ContentLocation::Redirect { url } => {
            write_location(writer, "URL", url)?;
        }
    }

    writer
        .write_event(Event::End(BytesEnd::new("datastreamVersion")))
        .map_err(xml_err)?;
    Ok(())
}

fn write_location<W: Write>(writer: &mut Writer<W>, kind: &str, reference: &str) -> CodecResult<()> {
    let mut el = BytesStart::new("contentLocation");
    el.push_attribute(("TYPE", kind));
    el.push_attribute(("REF", reference));
    writer.write_event(Event::Empty(el)).map_err(xml_err)?;
    Ok(())
}
