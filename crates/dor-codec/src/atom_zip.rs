//! Atom archival packaging: the Atom feed plus its binary payloads inside a
//! Zip container. The feed itself is the `atommanifest.xml` member; every
//! non-inline datastream version becomes its own member, referenced from
//! the manifest by relative member name.
//!
//! Extraction goes through a temporary directory that is removed when the
//! translation finishes, on success and on error alike. Member names that
//! would escape the extraction directory are an integrity violation.

use std::fs;
use std::io::{Cursor, Write};
use std::path::{Component, Path, PathBuf};

use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

use dor_model::DigitalObject;
use dor_store::ContentResolver;
use dor_types::format::ATOM_ZIP_1_1;
use dor_types::{FormatIdentity, TranslationContext};

use crate::atom::{de, ser, MemberSink, MemberSource};
use crate::codec::{check_encoding, DigitalObjectCodec};
use crate::error::{CodecError, CodecResult};
use crate::translation::TranslationConfig;

/// Zip member holding the Atom feed.
const MANIFEST_MEMBER: &str = "atommanifest.xml";

/// Codec for the Atom-in-Zip archival rendition.
#[derive(Clone)]
pub struct AtomZipCodec {
    config: TranslationConfig,
    resolver: ContentResolver,
}

impl AtomZipCodec {
    pub fn new(config: TranslationConfig, resolver: ContentResolver) -> Self {
        Self { config, resolver }
    }
}

impl DigitalObjectCodec for AtomZipCodec {
    fn format(&self) -> &'static FormatIdentity {
        &ATOM_ZIP_1_1
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
        let dir = tempfile::tempdir().map_err(|e| CodecError::StreamIo(e.to_string()))?;
        extract_archive(source, dir.path())?;
        let manifest = fs::read(dir.path().join(MANIFEST_MEMBER)).map_err(|_| {
            CodecError::ObjectIntegrity(format!("archive has no {MANIFEST_MEMBER} member"))
        })?;
        let members = DirMembers {
            root: dir.path().to_path_buf(),
        };
        de::deserialize(
            &manifest,
            object,
            context,
            &self.config,
            &self.resolver,
            &members,
        )
        // `dir` drops here and removes the extracted tree
    }

    fn serialize(
        &self,
        object: &DigitalObject,
        sink: &mut dyn Write,
        encoding: &str,
        context: TranslationContext,
    ) -> CodecResult<()> {
        check_encoding(encoding)?;
        let mut manifest = Vec::new();
        let mut collected = CollectedMembers::default();
        ser::serialize(
            object,
            &mut manifest,
            context,
            &self.config,
            &self.resolver,
            &mut collected,
        )?;

        let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
        let options =
            SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);
        zip.start_file(MANIFEST_MEMBER, options)
            .map_err(|e| CodecError::StreamIo(e.to_string()))?;
        zip.write_all(&manifest)?;
        for (name, bytes) in &collected.members {
            zip.start_file(name.as_str(), options)
                .map_err(|e| CodecError::StreamIo(e.to_string()))?;
            zip.write_all(bytes)?;
        }
        let cursor = zip
            .finish()
            .map_err(|e| CodecError::StreamIo(e.to_string()))?;
        sink.write_all(&cursor.into_inner())?;
        Ok(())
    }
}

/// Payloads gathered from the feed writer, in emission order.
#[derive(Default)]
struct CollectedMembers {
    members: Vec<(String, Vec<u8>)>,
}

impl MemberSink for CollectedMembers {
    fn wants_members(&self) -> bool {
        true
    }

    fn add(&mut self, name: &str, bytes: &[u8]) -> CodecResult<()> {
        self.members.push((name.to_string(), bytes.to_vec()));
        Ok(())
    }
}

/// Resolves manifest `src` references against the extraction directory.
struct DirMembers {
    root: PathBuf,
}

impl MemberSource for DirMembers {
    fn resolve(&self, src: &str) -> CodecResult<Option<Vec<u8>>> {
        // URLs and internal keys pass through untouched
        if src.contains("://") {
            return Ok(None);
        }
        ensure_contained(src)?;
        let path = self.root.join(src);
        if path.is_file() {
            let bytes = fs::read(&path).map_err(|e| CodecError::StreamIo(e.to_string()))?;
            Ok(Some(bytes))
        } else {
            Ok(None)
        }
    }
}

/// Reject member names that would resolve outside the extraction root.
fn ensure_contained(name: &str) -> CodecResult<()> {
    let ok = Path::new(name)
        .components()
        .all(|c| matches!(c, Component::Normal(_)));
    if ok {
        Ok(())
    } else {
        Err(CodecError::ObjectIntegrity(format!(
            "archive member path escapes the extraction directory: {name:?}"
        )))
    }
}

fn extract_archive(source: &[u8], root: &Path) -> CodecResult<()> {
    let mut archive = ZipArchive::new(Cursor::new(source))
        .map_err(|e| CodecError::ObjectIntegrity(format!("unreadable archive: {e}")))?;
    for index in 0..archive.len() {
        let mut member = archive
            .by_index(index)
            .map_err(|e| CodecError::ObjectIntegrity(format!("unreadable archive member: {e}")))?;
        if member.is_dir() {
            continue;
        }
        let name = member.name().to_string();
        ensure_contained(&name)?;
        let target = root.join(&name);
        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent).map_err(|e| CodecError::StreamIo(e.to_string()))?;
        }
        let mut out =
            fs::File::create(&target).map_err(|e| CodecError::StreamIo(e.to_string()))?;
        std::io::copy(&mut member, &mut out)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use dor_model::{ContentLocation, Datastream};
    use dor_store::memory::memory_resolver;
    use dor_store::MemoryManagedStore;
    use dor_types::date::parse_date;
    use dor_types::Pid;

    use super::*;

    fn resolver_with_content(key: &str, bytes: &[u8]) -> ContentResolver {
        let base = memory_resolver();
        let store = MemoryManagedStore::new();
        store.put(key, bytes.to_vec());
        ContentResolver::new(base.fetcher.clone(), Arc::new(store), base.staging.clone())
    }

    fn sample_object() -> DigitalObject {
        let mut obj = DigitalObject::new();
        obj.assign_pid(Pid::new("demo:zip").unwrap()).unwrap();
        obj.label = "Zip sample".to_string();
        obj.owner_id = "userC".to_string();
        obj.create_date = Some(parse_date("2008-04-20T12:00:00.000Z").unwrap());

        let mut dc = Datastream::new(
            "DC",
            "DC.0",
            ContentLocation::InlineXml {
                bytes: b"<dc><title>Zipped</title></dc>".to_vec(),
            },
        );
        dc.mime_type = "text/xml".to_string();
        dc.create_date = Some(parse_date("2008-04-20T12:00:00.000Z").unwrap());
        obj.add_datastream_version(dc, true).unwrap();

        let mut img = Datastream::new(
            "IMG",
            "IMG.0",
            ContentLocation::Managed {
                key: "demo:zip+IMG+IMG.0".to_string(),
            },
        );
        img.mime_type = "image/png".to_string();
        img.create_date = Some(parse_date("2008-04-21T12:00:00.000Z").unwrap());
        obj.add_datastream_version(img, true).unwrap();
        obj
    }

    #[test]
    fn archive_roundtrip_carries_binary_payloads_as_members() {
        let resolver = resolver_with_content("demo:zip+IMG+IMG.0", b"BINARYPNG");
        let codec = AtomZipCodec::new(TranslationConfig::default(), resolver.clone());
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
        assert_eq!(&bytes[..2], b"PK");

        let mut restored = DigitalObject::new();
        codec
            .deserialize(
                &bytes,
                &mut restored,
                "UTF-8",
                TranslationContext::DeserializeInstance,
            )
            .unwrap();
        assert_eq!(restored.pid().unwrap().as_str(), "demo:zip");
        assert_eq!(
            restored.current_version("DC").unwrap().content,
            ContentLocation::InlineXml {
                bytes: b"<dc><title>Zipped</title></dc>".to_vec()
            }
        );
        let img = restored.current_version("IMG").unwrap();
        assert!(matches!(
            &img.content,
            ContentLocation::Managed { key } if key.starts_with("staged://")
        ));
        assert_eq!(img.get_content_stream(&resolver).unwrap(), b"BINARYPNG");
    }

    #[test]
    fn colliding_version_ids_across_groups_keep_distinct_members() {
        // version IDs are only unique within their group; member names must
        // not collide when two groups reuse the same one
        let base = memory_resolver();
        let store = MemoryManagedStore::new();
        store.put("demo:zip+LEFT+1.0", b"left bytes".to_vec());
        store.put("demo:zip+RIGHT+1.0", b"right bytes".to_vec());
        let resolver =
            ContentResolver::new(base.fetcher.clone(), Arc::new(store), base.staging.clone());
        let codec = AtomZipCodec::new(TranslationConfig::default(), resolver.clone());

        let mut obj = DigitalObject::new();
        obj.assign_pid(Pid::new("demo:zip").unwrap()).unwrap();
        for (id, key, date) in [
            ("LEFT", "demo:zip+LEFT+1.0", "2008-04-20T12:00:00.000Z"),
            ("RIGHT", "demo:zip+RIGHT+1.0", "2008-04-21T12:00:00.000Z"),
        ] {
            let mut ds = Datastream::new(
                id,
                "1.0",
                ContentLocation::Managed {
                    key: key.to_string(),
                },
            );
            ds.mime_type = "application/octet-stream".to_string();
            ds.create_date = Some(parse_date(date).unwrap());
            obj.add_datastream_version(ds, true).unwrap();
        }

        let mut bytes = Vec::new();
        codec
            .serialize(
                &obj,
                &mut bytes,
                "UTF-8",
                TranslationContext::SerializeExportArchive,
            )
            .unwrap();

        let mut restored = DigitalObject::new();
        codec
            .deserialize(
                &bytes,
                &mut restored,
                "UTF-8",
                TranslationContext::DeserializeInstance,
            )
            .unwrap();
        let left = restored.current_version("LEFT").unwrap();
        let right = restored.current_version("RIGHT").unwrap();
        assert_eq!(left.get_content_stream(&resolver).unwrap(), b"left bytes");
        assert_eq!(right.get_content_stream(&resolver).unwrap(), b"right bytes");
    }

    #[test]
    fn archive_without_a_manifest_is_rejected() {
        let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
        zip.start_file("random.bin", SimpleFileOptions::default())
            .unwrap();
        zip.write_all(b"junk").unwrap();
        let bytes = zip.finish().unwrap().into_inner();

        let resolver = memory_resolver();
        let codec = AtomZipCodec::new(TranslationConfig::default(), resolver);
        let mut obj = DigitalObject::new();
        let err = codec
            .deserialize(
                &bytes,
                &mut obj,
                "UTF-8",
                TranslationContext::DeserializeInstance,
            )
            .unwrap_err();
        assert!(matches!(err, CodecError::ObjectIntegrity(_)));
    }

    #[test]
    fn garbage_bytes_are_not_an_archive() {
        let resolver = memory_resolver();
        let codec = AtomZipCodec::new(TranslationConfig::default(), resolver);
        let mut obj = DigitalObject::new();
        let err = codec
            .deserialize(
                b"not a zip at all",
                &mut obj,
                "UTF-8",
                TranslationContext::DeserializeInstance,
            )
            .unwrap_err();
        assert!(matches!(err, CodecError::ObjectIntegrity(_)));
    }

    #[test]
    fn escaping_member_references_are_an_integrity_violation() {
        // a manifest whose content src points outside the container
        let manifest = format!(
            r#"<?xml version="1.0" encoding="UTF-8"?>
<feed xmlns="http://www.w3.org/2005/Atom" xmlns:thr="http://purl.org/syndication/thread/1.0">
  <id>info:dor/demo:slip</id>
  <title>slip</title>
  <entry>
    <id>info:dor/demo:slip/IMG</id>
    <title>IMG</title>
    <category scheme="{cg}" term="M"/>
  </entry>
  <entry>
    <id>info:dor/demo:slip/IMG/IMG.0</id>
    <title>IMG.0</title>
    <updated>2008-04-20T12:00:00.000Z</updated>
    <thr:in-reply-to ref="info:dor/demo:slip/IMG"/>
    <content type="image/png" src="../../etc/passwd"/>
  </entry>
</feed>"#,
            cg = crate::vocab::CAT_CONTROL_GROUP,
        );
        let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
        zip.start_file(MANIFEST_MEMBER, SimpleFileOptions::default())
            .unwrap();
        zip.write_all(manifest.as_bytes()).unwrap();
        let bytes = zip.finish().unwrap().into_inner();

        let resolver = memory_resolver();
        let codec = AtomZipCodec::new(TranslationConfig::default(), resolver);
        let mut obj = DigitalObject::new();
        let err = codec
            .deserialize(
                &bytes,
                &mut obj,
                "UTF-8",
                TranslationContext::DeserializeInstance,
            )
            .unwrap_err();
        assert!(matches!(err, CodecError::ObjectIntegrity(_)));
    }

    #[test]
    fn member_name_containment_check() {
        assert!(ensure_contained("IMG.0").is_ok());
        assert!(ensure_contained("nested/IMG.0").is_ok());
        assert!(ensure_contained("../escape").is_err());
        assert!(ensure_contained("/etc/passwd").is_err());
        assert!(ensure_contained("a/../../b").is_err());
    }
}
