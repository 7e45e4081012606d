use base64::Engine as _;
use quick_xml::events::Event;
use quick_xml::Reader;

use dor_model::{AuditRecord, ContentLocation, Datastream, DigitalObject, AUDIT_ID};
use dor_store::ContentResolver;
use dor_types::date::parse_date;
use dor_types::{ChecksumType, DatastreamState, Pid, TranslationContext};

use crate::audit_xml::parse_audit_trail;
use crate::error::{CodecError, CodecResult};
use crate::translation::{
    normalize_datastreams, read_datastream_state, read_object_state, verify_ingest_checksums,
    TranslationConfig,
};
use crate::vocab::{
    PROP_CREATED_DATE, PROP_LABEL, PROP_LAST_MODIFIED_DATE, PROP_OWNER_ID, PROP_STATE,
};
use crate::xmlutil::{attr, capture_subtree, local_name, required_attr};

/// Attributes of the enclosing `<datastream>` group element.
struct GroupAttrs {
    id: String,
    control_group: String,
    state: DatastreamState,
    versionable: bool,
}

/// Accumulates one `<datastreamVersion>` until its end tag.
#[derive(Default)]
struct VersionBuilder {
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

pub(super) fn deserialize(
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
    let mut version: Option<VersionBuilder> = None;
    let mut in_binary = false;
    let mut audit_records: Vec<AuditRecord> = Vec::new();

    loop {
        let event = reader.read_event_into(&mut buf)?;
        match event {
            Event::Eof => break,
            Event::Start(ref e) | Event::Empty(ref e) => {
                let is_start = matches!(event, Event::Start(_));
                match local_name(e).as_str() {
                    "digitalObject" => {
                        saw_root = true;
                        if let Some(pid) = attr(e, "PID")? {
                            let pid = Pid::new(&pid)
                                .map_err(|err| CodecError::ObjectIntegrity(err.to_string()))?;
                            object.assign_pid(pid)?;
                        }
                    }
                    "objectProperties" => {}
                    "property" => {
                        let name = required_attr(e, "NAME")?;
                        let value = required_attr(e, "VALUE")?;
                        read_property(object, &name, &value)?;
                    }
                    "extproperty" => {
                        let name = required_attr(e, "NAME")?;
                        let value = required_attr(e, "VALUE")?;
                        object.ext_properties.insert(name, value);
                    }
                    "datastream" => {
                        let state = match attr(e, "STATE")? {
                            Some(code) => read_datastream_state(&code)?,
                            None => DatastreamState::Active,
                        };
                        group = Some(GroupAttrs {
                            id: required_attr(e, "ID")?,
                            control_group: required_attr(e, "CONTROL_GROUP")?,
                            state,
                            versionable: attr(e, "VERSIONABLE")?
                                .map_or(true, |v| v != "false"),
                        });
                    }
                    "datastreamVersion" => {
                        let mut builder = VersionBuilder {
                            id: required_attr(e, "ID")?,
                            ..VersionBuilder::default()
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
                                    "version {} carries a non-numeric SIZE {size:?}",
                                    builder.id
                                ))
                            })?;
                        }
                        version = Some(builder);
                    }
                    "contentDigest" => {
                        if let Some(v) = &mut version {
                            if let Some(kind) = attr(e, "TYPE")? {
                                v.digest_type = ChecksumType::parse(&kind)
                                    .map_err(|err| CodecError::Validation(err.to_string()))?;
                            }
                            v.digest = attr(e, "DIGEST")?
                                .filter(|d| !d.is_empty() && d != dor_types::checksum::CHECKSUM_NONE);
                        }
                    }
                    "xmlContent" => {
                        let bytes = if is_start {
                            capture_subtree(&mut reader)?
                        } else {
                            Vec::new()
                        };
                        if let Some(v) = &mut version {
                            v.inline = Some(bytes);
                        }
                    }
                    "contentLocation" => {
                        if let Some(v) = &mut version {
                            v.location = Some(required_attr(e, "REF")?);
                        }
                    }
                    "binaryContent" => {
                        if is_start {
                            in_binary = true;
                            if let Some(v) = &mut version {
                                v.binary_text = Some(String::new());
                            }
                        }
                    }
                    _ => {}
                }
            }
            Event::Text(ref t) => {
                if in_binary {
                    if let Some(text) = version.as_mut().and_then(|v| v.binary_text.as_mut()) {
                        text.push_str(
                            &t.unescape()
                                .map_err(|e| CodecError::ObjectIntegrity(e.to_string()))?,
                        );
                    }
                }
            }
            Event::End(ref e) => {
                let local = String::from_utf8_lossy(e.local_name().as_ref()).to_string();
                match local.as_str() {
                    "binaryContent" => in_binary = false,
                    "datastreamVersion" => {
                        let builder = version.take().ok_or_else(|| {
                            CodecError::ObjectIntegrity(
                                "datastreamVersion end without start".to_string(),
                            )
                        })?;
                        let grp = group.as_ref().ok_or_else(|| {
                            CodecError::ObjectIntegrity(
                                "datastreamVersion outside a datastream".to_string(),
                            )
                        })?;
                        finish_version(object, grp, builder, resolver, &mut audit_records)?;
                    }
                    "datastream" => group = None,
                    _ => {}
                }
            }
            _ => {}
        }
        buf.clear();
    }

    if !saw_root {
        return Err(CodecError::ObjectIntegrity(
            "root element <digitalObject> not found".to_string(),
        ));
    }
    for record in audit_records {
        object.add_audit_record(record);
    }
    normalize_datastreams(object, context, config)?;
    verify_ingest_checksums(object, resolver)?;
    Ok(())
}

fn read_property(object: &mut DigitalObject, name: &str, value: &str) -> CodecResult<()> {
    match name {
        PROP_STATE => object.state = read_object_state(value)?,
        PROP_LABEL => object.label = value.to_string(),
        PROP_OWNER_ID => object.owner_id = value.to_string(),
        PROP_CREATED_DATE => {
            object.create_date = Some(
                parse_date(value).map_err(|e| CodecError::ObjectIntegrity(e.to_string()))?,
            );
        }
        PROP_LAST_MODIFIED_DATE => {
            object.last_mod_date = Some(
                parse_date(value).map_err(|e| CodecError::ObjectIntegrity(e.to_string()))?,
            );
        }
        // 1.0 documents carry disseminator-era properties; keep them
        other => {
            object
                .ext_properties
                .insert(other.to_string(), value.to_string());
        }
    }
    Ok(())
}

fn finish_version(
    object: &mut DigitalObject,
    group: &GroupAttrs,
    builder: VersionBuilder,
    resolver: &ContentResolver,
    audit_records: &mut Vec<AuditRecord>,
) -> CodecResult<()> {
    let content = match group.control_group.as_str() {
        "X" => {
            let bytes = builder.inline.ok_or_else(|| {
                CodecError::ObjectIntegrity(format!(
                    "inline datastream {} has no xmlContent",
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
                            "invalid base64 in binaryContent of {}: {e}",
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
                        "managed datastream {} has no contentLocation",
                        builder.id
                    ))
                })?;
                ContentLocation::Managed { key }
            }
        }
        "E" | "R" => {
            let url = builder.location.ok_or_else(|| {
                CodecError::ObjectIntegrity(format!(
                    "referenced datastream {} has no contentLocation",
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
                "unrecognized control group {other:?} for datastream {}",
                group.id
            )));
        }
    };

    if group.id == AUDIT_ID {
        let bytes = match &content {
            ContentLocation::InlineXml { bytes } => bytes,
            _ => {
                return Err(CodecError::ObjectIntegrity(
                    "AUDIT datastream must carry inline XML".to_string(),
                ));
            }
        };
        audit_records.extend(parse_audit_trail(bytes)?);
        return Ok(());
    }

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
