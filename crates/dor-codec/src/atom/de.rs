use std::collections::HashMap;

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
    CAT_ALT_IDS, CAT_CONTROL_GROUP, CAT_DIGEST, CAT_DIGEST_TYPE, CAT_FORMAT_URI, CAT_LENGTH,
    CAT_VERSIONABLE, PROP_CREATED_DATE, PROP_LABEL, PROP_STATE,
};
use crate::xmlutil::{attr, capture_subtree, local_name, required_attr};

use super::MemberSource;

/// One `<entry>` as read off the feed, before folding.
#[derive(Default)]
struct EntryData {
    id: String,
    updated: Option<String>,
    in_reply_to: Option<String>,
    categories: Vec<(String, String)>,
    content_type: Option<String>,
    content_src: Option<String>,
    content_raw: Option<Vec<u8>>,
}

/// Group-level attributes carried by a datastream's parent entry.
struct ParentInfo {
    ds_id: String,
    control_group: Option<String>,
    state: DatastreamState,
    versionable: bool,
}

pub(crate) fn deserialize(
    source: &[u8],
    object: &mut DigitalObject,
    context: TranslationContext,
    config: &TranslationConfig,
    resolver: &ContentResolver,
    members: &dyn MemberSource,
) -> CodecResult<()> {
    let mut reader = Reader::from_reader(source);
    let mut buf = Vec::new();

    let mut saw_root = false;
    let mut feed_id: Option<String> = None;
    let mut feed_title = String::new();
    let mut feed_updated: Option<String> = None;
    let mut feed_owner = String::new();
    let mut feed_categories: Vec<(String, String)> = Vec::new();

    let mut entries: Vec<EntryData> = Vec::new();
    let mut current: Option<EntryData> = None;
    let mut in_author = false;
    let mut field: Option<String> = None;

    loop {
        let event = reader.read_event_into(&mut buf)?;
        match event {
            Event::Eof => break,
            Event::Start(ref e) | Event::Empty(ref e) => {
                let is_start = matches!(event, Event::Start(_));
                match local_name(e).as_str() {
                    "feed" => saw_root = true,
                    "entry" => current = Some(EntryData::default()),
                    "author" => in_author = true,
                    "id" | "title" | "updated" => field = Some(local_name(e)),
                    "name" if in_author => field = Some("name".to_string()),
                    "category" => {
                        let scheme = required_attr(e, "scheme")?;
                        let term = required_attr(e, "term")?;
                        match &mut current {
                            Some(entry) => entry.categories.push((scheme, term)),
                            None => feed_categories.push((scheme, term)),
                        }
                    }
                    "in-reply-to" => {
                        if let Some(entry) = &mut current {
                            entry.in_reply_to = Some(required_attr(e, "ref")?);
                        }
                    }
                    "content" => {
                        let content_type = attr(e, "type")?;
                        let src = attr(e, "src")?;
                        let raw = if is_start {
                            Some(capture_subtree(&mut reader)?)
                        } else {
                            None
                        };
                        if let Some(entry) = &mut current {
                            entry.content_type = content_type;
                            entry.content_src = src;
                            entry.content_raw = raw;
                        }
                    }
                    _ => {}
                }
            }
            Event::Text(ref t) => {
                if let Some(name) = &field {
                    let text = t
                        .unescape()
                        .map_err(|e| CodecError::ObjectIntegrity(e.to_string()))?;
                    match (&mut current, name.as_str()) {
                        (Some(entry), "id") => entry.id.push_str(&text),
                        (Some(entry), "updated") => {
                            entry
                                .updated
                                .get_or_insert_with(String::new)
                                .push_str(&text);
                        }
                        (Some(_), _) => {}
                        (None, "id") => {
                            feed_id.get_or_insert_with(String::new).push_str(&text);
                        }
                        (None, "title") => feed_title.push_str(&text),
                        (None, "updated") => {
                            feed_updated.get_or_insert_with(String::new).push_str(&text);
                        }
                        (None, "name") => feed_owner.push_str(&text),
                        _ => {}
                    }
                }
            }
            Event::End(ref e) => {
                field = None;
                let local = String::from_utf8_lossy(e.local_name().as_ref()).to_string();
                match local.as_str() {
                    "entry" => {
                        if let Some(entry) = current.take() {
                            entries.push(entry);
                        }
                    }
                    "author" => in_author = false,
                    _ => {}
                }
            }
            _ => {}
        }
        buf.clear();
    }

    if !saw_root {
        return Err(CodecError::ObjectIntegrity(
            "root element <feed> not found".to_string(),
        ));
    }

    let feed_id = feed_id.ok_or_else(|| {
        CodecError::ObjectIntegrity("feed carries no object id".to_string())
    })?;
    let pid =
        Pid::from_uri(feed_id.trim()).map_err(|e| CodecError::ObjectIntegrity(e.to_string()))?;
    object.assign_pid(pid)?;
    object.label = feed_title;
    object.owner_id = feed_owner;
    if let Some(updated) = &feed_updated {
        object.last_mod_date = Some(
            parse_date(updated.trim()).map_err(|e| CodecError::ObjectIntegrity(e.to_string()))?,
        );
    }
    for (scheme, term) in feed_categories {
        match scheme.as_str() {
            PROP_STATE => object.state = read_object_state(&term)?,
            PROP_CREATED_DATE => {
                object.create_date = Some(
                    parse_date(&term).map_err(|e| CodecError::ObjectIntegrity(e.to_string()))?,
                );
            }
            _ => {
                object.ext_properties.insert(scheme, term);
            }
        }
    }

    fold_entries(object, entries, resolver, members)?;
    normalize_datastreams(object, context, config)?;
    verify_ingest_checksums(object, resolver)?;
    Ok(())
}

fn fold_entries(
    object: &mut DigitalObject,
    entries: Vec<EntryData>,
    resolver: &ContentResolver,
    members: &dyn MemberSource,
) -> CodecResult<()> {
    let mut parents: HashMap<String, ParentInfo> = HashMap::new();
    let mut versions: Vec<EntryData> = Vec::new();

    for entry in entries {
        if entry.in_reply_to.is_some() {
            versions.push(entry);
            continue;
        }
        let ds_id = last_segment(&entry.id).to_string();
        let mut info = ParentInfo {
            ds_id,
            control_group: None,
            state: DatastreamState::Active,
            versionable: true,
        };
        for (scheme, term) in &entry.categories {
            match scheme.as_str() {
                CAT_CONTROL_GROUP => info.control_group = Some(term.clone()),
                PROP_STATE => info.state = read_datastream_state(term)?,
                CAT_VERSIONABLE => info.versionable = term != "false",
                _ => {}
            }
        }
        parents.insert(entry.id.clone(), info);
    }

    // fold versions oldest-first by instant so ties in create_date resolve
    // the same way on every read; the raw strings tolerate several
    // spellings and do not sort lexically
    let mut keyed = Vec::with_capacity(versions.len());
    for entry in versions {
        let updated = match &entry.updated {
            Some(raw) => Some(
                parse_date(raw.trim())
                    .map_err(|e| CodecError::ObjectIntegrity(e.to_string()))?,
            ),
            None => None,
        };
        keyed.push((updated, entry));
    }
    keyed.sort_by(|a, b| (a.0, &a.1.id).cmp(&(b.0, &b.1.id)));

    let mut audit_records: Vec<AuditRecord> = Vec::new();
    for (updated, entry) in keyed {
        let parent_ref = entry.in_reply_to.as_deref().unwrap_or_default();
        let parent = parents.get(parent_ref).ok_or_else(|| {
            CodecError::ObjectIntegrity(format!(
                "entry {} replies to unknown entry {parent_ref}",
                entry.id
            ))
        })?;
        let content = build_content(&entry, parent, resolver, members)?;

        if parent.ds_id == AUDIT_ID {
            match &content {
                ContentLocation::InlineXml { bytes } => {
                    audit_records.extend(parse_audit_trail(bytes)?);
                }
                _ => {
                    return Err(CodecError::ObjectIntegrity(
                        "audit trail entry must carry inline XML".to_string(),
                    ));
                }
            }
            continue;
        }

        let version_id = last_segment(&entry.id).to_string();
        let mut ds = Datastream::new(&parent.ds_id, &version_id, content);
        ds.state = parent.state;
        ds.versionable = parent.versionable;
        ds.mime_type = entry.content_type.clone().unwrap_or_default();
        ds.create_date = updated;
        for (scheme, term) in &entry.categories {
            match scheme.as_str() {
                PROP_LABEL => ds.label = term.clone(),
                CAT_FORMAT_URI => ds.format_uri = Some(term.clone()),
                CAT_ALT_IDS => {
                    ds.alt_ids = term.split_whitespace().map(str::to_string).collect();
                }
                CAT_DIGEST_TYPE => {
                    ds.checksum_type = ChecksumType::parse(term)
                        .map_err(|e| CodecError::Validation(e.to_string()))?;
                }
                CAT_DIGEST => {
                    if !term.is_empty() && term != dor_types::checksum::CHECKSUM_NONE {
                        ds.checksum = Some(term.clone());
                    }
                }
                CAT_LENGTH => {
                    ds.size = term.parse().map_err(|_| {
                        CodecError::ObjectIntegrity(format!(
                            "entry {} carries a non-numeric length {term:?}",
                            entry.id
                        ))
                    })?;
                }
                _ => {}
            }
        }
        object.add_datastream_version(ds, true)?;
    }

    for record in audit_records {
        object.add_audit_record(record);
    }
    Ok(())
}

fn build_content(
    entry: &EntryData,
    parent: &ParentInfo,
    resolver: &ContentResolver,
    members: &dyn MemberSource,
) -> CodecResult<ContentLocation> {
    let inline = entry.content_raw.as_deref().map(trim_bytes);
    let group = match &parent.control_group {
        Some(code) => code.as_str(),
        // no declared custody mode: inline XML means X, a src reference
        // means managed
        None => {
            if inline.map_or(false, |b| b.starts_with(b"<")) {
                "X"
            } else if entry.content_src.is_some() {
                "M"
            } else {
                return Err(CodecError::ObjectIntegrity(format!(
                    "entry {} has neither a control group nor recognizable content",
                    entry.id
                )));
            }
        }
    };

    match group {
        "X" => {
            let bytes = inline.ok_or_else(|| {
                CodecError::ObjectIntegrity(format!(
                    "inline entry {} has no embedded XML content",
                    entry.id
                ))
            })?;
            Ok(ContentLocation::InlineXml {
                bytes: bytes.to_vec(),
            })
        }
        "M" => {
            if let Some(text) = inline.filter(|b| !b.starts_with(b"<") && !b.is_empty()) {
                let cleaned: Vec<u8> = text
                    .iter()
                    .copied()
                    .filter(|b| !b.is_ascii_whitespace())
                    .collect();
                let bytes = base64::engine::general_purpose::STANDARD
                    .decode(&cleaned)
                    .map_err(|e| {
                        CodecError::ObjectIntegrity(format!(
                            "invalid base64 content in entry {}: {e}",
                            entry.id
                        ))
                    })?;
                let key = resolver
                    .staging
                    .stage(&bytes)
                    .map_err(|e| CodecError::StreamIo(e.to_string()))?;
                return Ok(ContentLocation::Managed { key });
            }
            let src = entry.content_src.clone().ok_or_else(|| {
                CodecError::ObjectIntegrity(format!(
                    "managed entry {} has no content source",
                    entry.id
                ))
            })?;
            if let Some(bytes) = members.resolve(&src)? {
                let key = resolver
                    .staging
                    .stage(&bytes)
                    .map_err(|e| CodecError::StreamIo(e.to_string()))?;
                Ok(ContentLocation::Managed { key })
            } else {
                Ok(ContentLocation::Managed { key: src })
            }
        }
        "E" | "R" => {
            let url = entry.content_src.clone().ok_or_else(|| {
                CodecError::ObjectIntegrity(format!(
                    "referenced entry {} has no content source",
                    entry.id
                ))
            })?;
            if group == "E" {
                Ok(ContentLocation::External { url })
            } else {
                Ok(ContentLocation::Redirect { url })
            }
        }
        other => Err(CodecError::ObjectIntegrity(format!(
            "unrecognized control group {other:?} on entry {}",
            entry.id
        ))),
    }
}

fn last_segment(id: &str) -> &str {
    id.rsplit('/').next().unwrap_or(id)
}

fn trim_bytes(bytes: &[u8]) -> &[u8] {
    let start = bytes
        .iter()
        .position(|b| !b.is_ascii_whitespace())
        .unwrap_or(bytes.len());
    let end = bytes
        .iter()
        .rposition(|b| !b.is_ascii_whitespace())
        .map_or(start, |i| i + 1);
    &bytes[start..end]
}
