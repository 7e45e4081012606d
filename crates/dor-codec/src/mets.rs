//! Legacy METS-derived archival rendition.
//!
//! Carries object properties in the METS header, the audit trail in an
//! administrative-metadata section, and the datastreams as a two-level
//! file section (an outer `DATASTREAMS` group with one inner group per
//! datastream). Structural maps and the other disseminator-era METS
//! sections have no counterpart in the model and are not emitted; unknown
//! sections are skipped on read.

use std::io::Write;

use base64::Engine as _;
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::{Reader, Writer};

use dor_model::{ContentLocation, Datastream, DigitalObject, AUDIT_ID};
use dor_store::ContentResolver;
use dor_types::date::{format_date, parse_date};
use dor_types::format::METS_EXT_1_1;
use dor_types::{ChecksumType, DatastreamState, FormatIdentity, Pid, TranslationContext};

use crate::audit_xml::{generate_audit_trail, parse_audit_trail};
use crate::codec::{check_encoding, DigitalObjectCodec};
use crate::error::{CodecError, CodecResult};
use crate::translation::{
    datastream_state_attribute, normalize_datastreams, normalize_ds_location,
    object_state_attribute, read_datastream_state, read_object_state, verify_ingest_checksums,
    TranslationConfig,
};
use crate::xmlutil::{
    attr, capture_subtree, local_name, required_attr, strip_decl, write_raw, write_text_element,
    xml_err,
};

/// Codec for the METS-derived legacy archival format.
#[derive(Clone)]
pub struct MetsCodec {
    config: TranslationConfig,
    resolver: ContentResolver,
}

impl MetsCodec {
    pub fn new(config: TranslationConfig, resolver: ContentResolver) -> Self {
        Self { config, resolver }
    }
}

impl DigitalObjectCodec for MetsCodec {
    fn format(&self) -> &'static FormatIdentity {
        &METS_EXT_1_1
    }

    fn instance(&self) -> Box<dyn DigitalObjectCodec> {
        Box::new(self.clone())
    }

    fn deserialize(
        &self,
        source: &[u8],
        object: &mut DigitalObject,
        encoding: &str,
        context: TranslationContext,
    ) -> CodecResult<()> {
        check_encoding(encoding)?;
        deserialize(source, object, context, &self.config, &self.resolver)
    }

    fn serialize(
        &self,
        object: &DigitalObject,
        sink: &mut dyn Write,
        encoding: &str,
        context: TranslationContext,
    ) -> CodecResult<()> {
        check_encoding(encoding)?;
        serialize(object, sink, context, &self.config, &self.resolver)
    }
}

// ---- reading ----

struct GroupAttrs {
    id: String,
    control_group: String,
    state: DatastreamState,
    versionable: bool,
}

#[derive(Default)]
struct FileBuilder {
    id: String,
    label: String,
    created: Option<String>,
    mime_type: String,
    format_uri: Option<String>,
    alt_ids: Vec<String>,
    size: u64,
    digest_type: ChecksumType,
    digest: Option<String>,
    inline: Option<Vec<u8>>,
    location: Option<String>,
    binary_text: Option<String>,
}

fn deserialize(
    source: &[u8],
    object: &mut DigitalObject,
    context: TranslationContext,
    config: &TranslationConfig,
    resolver: &ContentResolver,
) -> CodecResult<()> {
    let mut reader = Reader::from_reader(source);
    let mut buf = Vec::new();
    let mut saw_root = false;
    let mut group: Option<GroupAttrs> = None;
    let mut file: Option<FileBuilder> = None;
    let mut in_audit = false;
    let mut in_agent = false;
    let mut in_name = false;
    let mut in_bin = false;

    loop {
        let event = reader.read_event_into(&mut buf)?;
        match event {
            Event::Eof => break,
            Event::Start(ref e) | Event::Empty(ref e) => {
                let is_start = matches!(event, Event::Start(_));
                match local_name(e).as_str() {
                    "mets" => {
                        saw_root = true;
                        if let Some(objid) = attr(e, "OBJID")? {
                            let pid = Pid::new(&objid)
                                .map_err(|err| CodecError::ObjectIntegrity(err.to_string()))?;
                            object.assign_pid(pid)?;
                        }
                        if let Some(label) = attr(e, "LABEL")? {
                            object.label = label;
                        }
                    }
                    "metsHdr" => {
                        if let Some(date) = attr(e, "CREATEDATE")? {
                            object.create_date = Some(
                                parse_date(&date)
                                    .map_err(|e| CodecError::ObjectIntegrity(e.to_string()))?,
                            );
                        }
                        if let Some(date) = attr(e, "LASTMODDATE")? {
                            object.last_mod_date = Some(
                                parse_date(&date)
                                    .map_err(|e| CodecError::ObjectIntegrity(e.to_string()))?,
                            );
                        }
                        if let Some(code) = attr(e, "RECORDSTATUS")? {
                            object.state = read_object_state(&code)?;
                        }
                    }
                    "agent" => in_agent = true,
                    "name" if in_agent => in_name = true,
                    "amdSec" => {
                        in_audit = attr(e, "ID")?.as_deref() == Some(AUDIT_ID);
                    }
                    "xmlData" if is_start => {
                        let bytes = capture_subtree(&mut reader)?;
                        if in_audit {
                            for record in parse_audit_trail(&bytes)? {
                                object.add_audit_record(record);
                            }
                        } else if let Some(f) = &mut file {
                            f.inline = Some(bytes);
                        }
                    }
                    "fileGrp" => {
                        // the outer DATASTREAMS group has no CONTROL_GROUP
                        if let Some(control_group) = attr(e, "CONTROL_GROUP")? {
                            let state = match attr(e, "STATUS")? {
                                Some(code) => read_datastream_state(&code)?,
                                None => DatastreamState::Active,
                            };
                            group = Some(GroupAttrs {
                                id: required_attr(e, "ID")?,
                                control_group,
                                state,
                                versionable: attr(e, "VERSIONABLE")?
                                    .map_or(true, |v| v != "false"),
                            });
                        }
                    }
                    "file" => {
                        let mut builder = FileBuilder {
                            id: required_attr(e, "ID")?,
                            ..FileBuilder::default()
                        };
                        builder.label = attr(e, "LABEL")?.unwrap_or_default();
                        builder.created = attr(e, "CREATED")?;
                        builder.mime_type = attr(e, "MIMETYPE")?.unwrap_or_default();
                        builder.format_uri = attr(e, "FORMAT_URI")?;
                        if let Some(alt) = attr(e, "ALT_IDS")? {
                            builder.alt_ids =
                                alt.split_whitespace().map(str::to_string).collect();
                        }
                        if let Some(size) = attr(e, "SIZE")? {
                            builder.size = size.parse().map_err(|_| {
                                CodecError::ObjectIntegrity(format!(
                                    "file {} carries a non-numeric SIZE {size:?}",
                                    builder.id
                                ))
                            })?;
                        }
                        if let Some(kind) = attr(e, "CHECKSUMTYPE")? {
                            builder.digest_type = ChecksumType::parse(&kind)
                                .map_err(|err| CodecError::Validation(err.to_string()))?;
                        }
                        builder.digest = attr(e, "CHECKSUM")?
                            .filter(|d| !d.is_empty() && d != dor_types::checksum::CHECKSUM_NONE);
                        file = Some(builder);
                    }
                    "FLocat" => {
                        if let Some(f) = &mut file {
                            f.location = Some(required_attr(e, "href")?);
                        }
                    }
                    "binData" => {
                        if is_start {
                            in_bin = true;
                            if let Some(f) = &mut file {
                                f.binary_text = Some(String::new());
                            }
                        }
                    }
                    _ => {}
                }
            }
            Event::Text(ref t) => {
                let text = t
                    .unescape()
                    .map_err(|e| CodecError::ObjectIntegrity(e.to_string()))?;
                if in_name {
                    object.owner_id.push_str(&text);
                } else if in_bin {
                    if let Some(buf) = file.as_mut().and_then(|f| f.binary_text.as_mut()) {
                        buf.push_str(&text);
                    }
                }
            }
            Event::End(ref e) => {
                let local = String::from_utf8_lossy(e.local_name().as_ref()).to_string();
                match local.as_str() {
                    "agent" => in_agent = false,
                    "name" => in_name = false,
                    "amdSec" => in_audit = false,
                    "binData" => in_bin = false,
                    "file" => {
                        let builder = file.take().ok_or_else(|| {
                            CodecError::ObjectIntegrity("file end without start".to_string())
                        })?;
                        let grp = group.as_ref().ok_or_else(|| {
                            CodecError::ObjectIntegrity(
                                "file outside a datastream file group".to_string(),
                            )
                        })?;
                        finish_file(object, grp, builder, resolver)?;
                    }
                    "fileGrp" => {
                        if group.is_some() {
                            group = None;
                        }
                    }
                    _ => {}
                }
            }
            _ => {}
        }
        buf.clear();
    }

    if !saw_root {
        return Err(CodecError::ObjectIntegrity(
            "root element <mets> not found".to_string(),
        ));
    }
    normalize_datastreams(object, context, config)?;
    verify_ingest_checksums(object, resolver)?;
    Ok(())
}

fn finish_file(
    object: &mut DigitalObject,
    group: &GroupAttrs,
    builder: FileBuilder,
    resolver: &ContentResolver,
) -> CodecResult<()> {
    let content = match group.control_group.as_str() {
        "X" => {
            let bytes = builder.inline.ok_or_else(|| {
                CodecError::ObjectIntegrity(format!(
                    "inline file {} has no embedded XML content",
                    builder.id
                ))
            })?;
            ContentLocation::InlineXml { bytes }
        }
        "M" => {
            if let Some(text) = &builder.binary_text {
                let cleaned: String = text.split_whitespace().collect();
                let bytes = base64::engine::general_purpose::STANDARD
                    .decode(cleaned.as_bytes())
                    .map_err(|e| {
                        CodecError::ObjectIntegrity(format!(
                            "invalid base64 content in file {}: {e}",
                            builder.id
                        ))
                    })?;
                let key = resolver
                    .staging
                    .stage(&bytes)
                    .map_err(|e| CodecError::StreamIo(e.to_string()))?;
                ContentLocation::Managed { key }
            } else {
                let key = builder.location.ok_or_else(|| {
                    CodecError::ObjectIntegrity(format!(
                        "managed file {} has no location",
                        builder.id
                    ))
                })?;
                ContentLocation::Managed { key }
            }
        }
        "E" | "R" => {
            let url = builder.location.ok_or_else(|| {
                CodecError::ObjectIntegrity(format!(
                    "referenced file {} has no location",
                    builder.id
                ))
            })?;
            if group.control_group == "E" {
                ContentLocation::External { url }
            } else {
                ContentLocation::Redirect { url }
            }
        }
        other => {
            return Err(CodecError::ObjectIntegrity(format!(
                "unrecognized control group {other:?} for file group {}",
                group.id
            )));
        }
    };

    let mut ds = Datastream::new(&group.id, &builder.id, content);
    ds.label = builder.label;
    ds.mime_type = builder.mime_type;
    ds.format_uri = builder.format_uri;
    ds.alt_ids = builder.alt_ids;
    ds.size = builder.size;
    ds.state = group.state;
    ds.versionable = group.versionable;
    ds.checksum_type = builder.digest_type;
    ds.checksum = builder.digest;
    if let Some(created) = &builder.created {
        ds.create_date =
            Some(parse_date(created).map_err(|e| CodecError::ObjectIntegrity(e.to_string()))?);
    }
    object.add_datastream_version(ds, true)?;
    Ok(())
}

// ---- writing ----

fn serialize(
    object: &DigitalObject,
    sink: &mut dyn Write,
    context: TranslationContext,
    config: &TranslationConfig,
    resolver: &ContentResolver,
) -> CodecResult<()> {
    let pid = object.pid().ok_or_else(|| {
        CodecError::ObjectIntegrity("cannot serialize an object without a PID".to_string())
    })?;

    let mut writer = Writer::new(sink);
    writer
        .write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))
        .map_err(xml_err)?;

    let mut root = BytesStart::new("mets");
    root.push_attribute(("xmlns", METS_EXT_1_1.namespace));
    root.push_attribute(("xmlns:xlink", "http://www.w3.org/1999/xlink"));
    root.push_attribute(("OBJID", pid.as_str()));
    root.push_attribute(("LABEL", object.label.as_str()));
    root.push_attribute(("EXT_VERSION", "1.1"));
    writer.write_event(Event::Start(root)).map_err(xml_err)?;

    let mut hdr = BytesStart::new("metsHdr");
    if let Some(date) = &object.create_date {
        hdr.push_attribute(("CREATEDATE", format_date(date).as_str()));
    }
    if let Some(date) = &object.last_mod_date {
        hdr.push_attribute(("LASTMODDATE", format_date(date).as_str()));
    }
    hdr.push_attribute(("RECORDSTATUS", object_state_attribute(object.state)));
    writer.write_event(Event::Start(hdr)).map_err(xml_err)?;
    let mut agent = BytesStart::new("agent");
    agent.push_attribute(("ROLE", "IPOWNER"));
    writer.write_event(Event::Start(agent)).map_err(xml_err)?;
    write_text_element(&mut writer, "name", &object.owner_id)?;
    writer
        .write_event(Event::End(BytesEnd::new("agent")))
        .map_err(xml_err)?;
    writer
        .write_event(Event::End(BytesEnd::new("metsHdr")))
        .map_err(xml_err)?;

    write_audit_section(&mut writer, object)?;

    writer
        .write_event(Event::Start(BytesStart::new("fileSec")))
        .map_err(xml_err)?;
    let mut outer = BytesStart::new("fileGrp");
    outer.push_attribute(("ID", "DATASTREAMS"));
    writer.write_event(Event::Start(outer)).map_err(xml_err)?;

    for id in object.datastream_ids() {
        // the audit trail lives in the administrative-metadata section
        if id == AUDIT_ID {
            continue;
        }
        let versions = match object.versions(id) {
            Some(v) if !v.is_empty() => v,
            _ => continue,
        };
        let current = object.current_version(id).unwrap_or(&versions[0]);
        let mut grp = BytesStart::new("fileGrp");
        grp.push_attribute(("ID", id));
        grp.push_attribute(("STATUS", datastream_state_attribute(current.state)));
        grp.push_attribute(("CONTROL_GROUP", current.control_group().code()));
        grp.push_attribute((
            "VERSIONABLE",
            if current.versionable { "true" } else { "false" },
        ));
        writer.write_event(Event::Start(grp)).map_err(xml_err)?;
        for ds in versions {
            let ds = normalize_ds_location(pid, ds, context, config);
            write_file(&mut writer, &ds, context, resolver)?;
        }
        writer
            .write_event(Event::End(BytesEnd::new("fileGrp")))
            .map_err(xml_err)?;
    }

    writer
        .write_event(Event::End(BytesEnd::new("fileGrp")))
        .map_err(xml_err)?;
    writer
        .write_event(Event::End(BytesEnd::new("fileSec")))
        .map_err(xml_err)?;
    writer
        .write_event(Event::End(BytesEnd::new("mets")))
        .map_err(xml_err)?;
    Ok(())
}

fn write_audit_section<W: Write>(
    writer: &mut Writer<W>,
    object: &DigitalObject,
) -> CodecResult<()> {
    if object.audit_records().is_empty() {
        return Ok(());
    }
    let mut amd = BytesStart::new("amdSec");
    amd.push_attribute(("ID", AUDIT_ID));
    writer.write_event(Event::Start(amd)).map_err(xml_err)?;
    let mut md = BytesStart::new("digiprovMD");
    md.push_attribute(("ID", format!("{AUDIT_ID}.0").as_str()));
    if let Some(date) = &object.create_date {
        md.push_attribute(("CREATED", format_date(date).as_str()));
    }
    writer.write_event(Event::Start(md)).map_err(xml_err)?;
    let mut wrap = BytesStart::new("mdWrap");
    wrap.push_attribute(("MIMETYPE", "text/xml"));
    writer.write_event(Event::Start(wrap)).map_err(xml_err)?;
    writer
        .write_event(Event::Start(BytesStart::new("xmlData")))
        .map_err(xml_err)?;
    let trail = generate_audit_trail(object.audit_records())?;
    write_raw(writer, strip_decl(&trail))?;
    writer
        .write_event(Event::End(BytesEnd::new("xmlData")))
        .map_err(xml_err)?;
    writer
        .write_event(Event::End(BytesEnd::new("mdWrap")))
        .map_err(xml_err)?;
    writer
        .write_event(Event::End(BytesEnd::new("digiprovMD")))
        .map_err(xml_err)?;
    writer
        .write_event(Event::End(BytesEnd::new("amdSec")))
        .map_err(xml_err)?;
    Ok(())
}

fn write_file<W: Write>(
    writer: &mut Writer<W>,
    ds: &Datastream,
    context: TranslationContext,
    resolver: &ContentResolver,
) -> CodecResult<()> {
    let mut el = BytesStart::new("file");
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
    if !ds.checksum_type.is_disabled() || ds.checksum.is_some() {
        el.push_attribute(("CHECKSUMTYPE", ds.checksum_type.as_str()));
        el.push_attribute((
            "CHECKSUM",
            ds.checksum
                .as_deref()
                .unwrap_or(dor_types::checksum::CHECKSUM_NONE),
        ));
    }
    writer.write_event(Event::Start(el)).map_err(xml_err)?;

    match &ds.content {
        ContentLocation::InlineXml { bytes } => {
            writer
                .write_event(Event::Start(BytesStart::new("FContent")))
                .map_err(xml_err)?;
            writer
                .write_event(Event::Start(BytesStart::new("xmlData")))
                .map_err(xml_err)?;
            write_raw(writer, bytes)?;
            writer
                .write_event(Event::End(BytesEnd::new("xmlData")))
                .map_err(xml_err)?;
            writer
                .write_event(Event::End(BytesEnd::new("FContent")))
                .map_err(xml_err)?;
        }
        ContentLocation::Managed { key } => {
            if context == TranslationContext::SerializeExportArchive {
                let bytes = ds
                    .get_content_stream(resolver)
                    .map_err(|e| CodecError::StreamIo(e.to_string()))?;
                let encoded = base64::engine::general_purpose::STANDARD.encode(&bytes);
                writer
                    .write_event(Event::Start(BytesStart::new("FContent")))
                    .map_err(xml_err)?;
                writer
                    .write_event(Event::Start(BytesStart::new("binData")))
                    .map_err(xml_err)?;
                writer
                    .write_event(Event::Text(BytesText::new(&encoded)))
                    .map_err(xml_err)?;
                writer
                    .write_event(Event::End(BytesEnd::new("binData")))
                    .map_err(xml_err)?;
                writer
                    .write_event(Event::End(BytesEnd::new("FContent")))
                    .map_err(xml_err)?;
            } else {
                write_locat(writer, key)?;
            }
        }
        ContentLocation::External { url } | ContentLocation::Redirect { url } => {
            write_locat(writer, url)?;
        }
    }

    writer
        .write_event(Event::End(BytesEnd::new("file")))
        .map_err(xml_err)?;
    Ok(())
}

fn write_locat<W: Write>(writer: &mut Writer<W>, reference: &str) -> CodecResult<()> {
    let mut el = BytesStart::new("FLocat");
    el.push_attribute(("LOCTYPE", "URL"));
    el.push_attribute(("xlink:href", reference));
    writer.write_event(Event::Empty(el)).map_err(xml_err)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use dor_model::AuditRecord;
    use dor_store::memory::memory_resolver;
    use dor_types::ObjectState;

    use super::*;

    fn codec() -> (MetsCodec, ContentResolver) {
        let resolver = memory_resolver();
        (
            MetsCodec::new(TranslationConfig::default(), resolver.clone()),
            resolver,
        )
    }

    fn sample_object() -> DigitalObject {
        let mut obj = DigitalObject::new();
        obj.assign_pid(Pid::new("demo:mets").unwrap()).unwrap();
        obj.state = ObjectState::Active;
        obj.label = "Mets sample".to_string();
        obj.owner_id = "userD".to_string();
        obj.create_date = Some(parse_date("2008-04-20T12:00:00.000Z").unwrap());
        obj.last_mod_date = Some(parse_date("2008-05-01T12:00:00.000Z").unwrap());

        let mut dc = Datastream::new(
            "DC",
            "DC.0",
            ContentLocation::InlineXml {
                bytes: b"<dc><title>Legacy</title></dc>".to_vec(),
            },
        );
        dc.label = "Dublin Core".to_string();
        dc.mime_type = "text/xml".to_string();
        dc.create_date = Some(parse_date("2008-04-20T12:00:00.000Z").unwrap());
        obj.add_datastream_version(dc, true).unwrap();

        let mut img = Datastream::new(
            "IMG",
            "IMG.0",
            ContentLocation::Managed {
                key: "demo:mets+IMG+IMG.0".to_string(),
            },
        );
        img.mime_type = "image/png".to_string();
        img.create_date = Some(parse_date("2008-04-21T12:00:00.000Z").unwrap());
        obj.add_datastream_version(img, true).unwrap();

        let mut ext = Datastream::new(
            "EXT",
            "EXT.0",
            ContentLocation::External {
                url: "http://example.org/remote.pdf".to_string(),
            },
        );
        ext.mime_type = "application/pdf".to_string();
        ext.create_date = Some(parse_date("2008-04-21T12:00:00.000Z").unwrap());
        obj.add_datastream_version(ext, true).unwrap();

        let mut rec = AuditRecord::new("AUDREC1");
        rec.process_type = "DOR API-M".to_string();
        rec.action = "ingest".to_string();
        rec.responsibility = "userD".to_string();
        rec.date = Some(parse_date("2008-04-20T12:00:00.000Z").unwrap());
        obj.add_audit_record(rec);
        obj
    }

    #[test]
    fn as_is_roundtrip_preserves_the_object() {
        let (codec, _) = codec();
        let original = sample_object();
        let mut bytes = Vec::new();
        codec
            .serialize(&original, &mut bytes, "UTF-8", TranslationContext::AsIs)
            .unwrap();

        let mut restored = DigitalObject::new();
        codec
            .deserialize(&bytes, &mut restored, "UTF-8", TranslationContext::AsIs)
            .unwrap();

        assert_eq!(restored.pid().unwrap().as_str(), "demo:mets");
        assert_eq!(restored.state, original.state);
        assert_eq!(restored.label, original.label);
        assert_eq!(restored.owner_id, original.owner_id);
        assert_eq!(restored.create_date, original.create_date);
        assert_eq!(restored.last_mod_date, original.last_mod_date);
        assert_eq!(restored.audit_records(), original.audit_records());
        assert_eq!(
            restored.current_version("DC").unwrap().content,
            ContentLocation::InlineXml {
                bytes: b"<dc><title>Legacy</title></dc>".to_vec()
            }
        );
        assert_eq!(
            restored.current_version("IMG").unwrap().content,
            ContentLocation::Managed {
                key: "demo:mets+IMG+IMG.0".to_string()
            }
        );
        assert_eq!(
            restored.current_version("EXT").unwrap().content,
            ContentLocation::External {
                url: "http://example.org/remote.pdf".to_string()
            }
        );
    }

    #[test]
    fn missing_root_element_fails_with_object_integrity() {
        let (codec, _) = codec();
        let mut obj = DigitalObject::new();
        let err = codec
            .deserialize(
                b"<somethingElse/>",
                &mut obj,
                "UTF-8",
                TranslationContext::DeserializeInstance,
            )
            .unwrap_err();
        assert!(matches!(err, CodecError::ObjectIntegrity(_)));
    }

    #[test]
    fn public_export_rewrites_managed_locations() {
        let (codec, _) = codec();
        let obj = sample_object();
        let mut bytes = Vec::new();
        codec
            .serialize(
                &obj,
                &mut bytes,
                "UTF-8",
                TranslationContext::SerializeExportPublic,
            )
            .unwrap();
        let text = String::from_utf8(bytes).unwrap();
        assert!(text.contains(
            "http://localhost:8080/dor/objects/demo:mets/datastreams/IMG/versions/IMG.0/content"
        ));
    }

    #[test]
    fn archive_export_roundtrips_managed_content() {
        let resolver = memory_resolver();
        let store = dor_store::MemoryManagedStore::new();
        store.put("demo:mets+IMG+IMG.0", b"IMAGEBYTES".to_vec());
        let resolver = ContentResolver::new(
            resolver.fetcher.clone(),
            std::sync::Arc::new(store),
            resolver.staging.clone(),
        );
        let codec = MetsCodec::new(TranslationConfig::default(), resolver.clone());
        let obj = sample_object();

        let mut bytes = Vec::new();
        codec
            .serialize(
                &obj,
                &mut bytes,
                "UTF-8",
                TranslationContext::SerializeExportArchive,
            )
            .unwrap();
        assert!(String::from_utf8_lossy(&bytes).contains("binData"));

        let mut restored = DigitalObject::new();
        codec
            .deserialize(
                &bytes,
                &mut restored,
                "UTF-8",
                TranslationContext::DeserializeInstance,
            )
            .unwrap();
        let img = restored.current_version("IMG").unwrap();
        assert_eq!(img.get_content_stream(&resolver).unwrap(), b"IMAGEBYTES");
    }

    #[test]
    fn checksum_mismatch_on_ingest_is_rejected() {
        let (codec, _) = codec();
        let doc = br#"<?xml version="1.0" encoding="UTF-8"?>
<mets xmlns="http://www.loc.gov/METS/" OBJID="demo:sum" LABEL="sum" EXT_VERSION="1.1">
  <metsHdr RECORDSTATUS="A"/>
  <fileSec>
    <fileGrp ID="DATASTREAMS">
      <fileGrp ID="DC" STATUS="A" CONTROL_GROUP="X" VERSIONABLE="true">
        <file ID="DC.0" LABEL="DC" CREATED="2008-04-20T12:00:00.000Z" MIMETYPE="text/xml" CHECKSUMTYPE="MD5" CHECKSUM="00000000000000000000000000000000">
          <FContent><xmlData><dc>other</dc></xmlData></FContent>
        </file>
      </fileGrp>
    </fileGrp>
  </fileSec>
</mets>"#;
        let mut obj = DigitalObject::new();
        let err = codec
            .deserialize(doc, &mut obj, "UTF-8", TranslationContext::DeserializeInstance)
            .unwrap_err();
        assert!(matches!(err, CodecError::Validation(_)));
    }
}
