use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use dor_store::{ContentResolver, FetchedContent};
use dor_types::checksum::CHECKSUM_NONE;
use dor_types::{ChecksumType, DatastreamState};

use crate::canonical::canonicalize_xml;
use crate::error::{ModelError, ModelResult};

/// Custody mode of a datastream, fixed per datastream ID for its lifetime.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ControlGroup {
    /// Content is part of the object's own payload.
    InlineXml,
    /// Content lives in the repository's internal store (or the staging
    /// area before an ingest commits).
    Managed,
    /// Content is fetched live from an external URL on every resolution.
    External,
    /// Like `External`, but access-layer consumers redirect the client to
    /// the URL instead of proxying the bytes. Identical custody semantics
    /// inside this core.
    Redirect,
}

impl ControlGroup {
    /// The one-letter wire code.
    pub fn code(&self) -> &'static str {
        match self {
            Self::InlineXml => "X",
            Self::Managed => "M",
            Self::External => "E",
            Self::Redirect => "R",
        }
    }

    /// Parse the one-letter wire code.
    pub fn from_code(s: &str) -> Option<Self> {
        match s {
            "X" => Some(Self::InlineXml),
            "M" => Some(Self::Managed),
            "E" => Some(Self::External),
            "R" => Some(Self::Redirect),
            _ => None,
        }
    }
}

/// Where one datastream version's bytes live.
///
/// The variant determines the control group, so a version cannot be
/// constructed with a custody mode that disagrees with its location kind.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ContentLocation {
    InlineXml { bytes: Vec<u8> },
    Managed { key: String },
    External { url: String },
    Redirect { url: String },
}

impl ContentLocation {
    pub fn control_group(&self) -> ControlGroup {
        match self {
            Self::InlineXml { .. } => ControlGroup::InlineXml,
            Self::Managed { .. } => ControlGroup::Managed,
            Self::External { .. } => ControlGroup::External,
            Self::Redirect { .. } => ControlGroup::Redirect,
        }
    }

    /// The location string, if this variant has one (inline content does not).
    pub fn location(&self) -> Option<&str> {
        match self {
            Self::InlineXml { .. } => None,
            Self::Managed { key } => Some(key),
            Self::External { url } | Self::Redirect { url } => Some(url),
        }
    }

    /// Mutable access to the location string, for normalization passes.
    pub fn location_mut(&mut self) -> Option<&mut String> {
        match self {
            Self::InlineXml { .. } => None,
            Self::Managed { key } => Some(key),
            Self::External { url } | Self::Redirect { url } => Some(url),
        }
    }
}

/// One version of one named content segment of a digital object.
///
/// Identity is `(id, version_id)` where `version_id` is
/// `{id}.{sequence}`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Datastream {
    pub id: String,
    pub version_id: String,
    pub label: String,
    pub mime_type: String,
    pub format_uri: Option<String>,
    pub alt_ids: Vec<String>,
    pub create_date: Option<DateTime<Utc>>,
    pub size: u64,
    pub state: DatastreamState,
    /// Whether adding a new version appends (true) or replaces the current
    /// version (false). Always false for the reserved `AUDIT` datastream.
    pub versionable: bool,
    pub content: ContentLocation,
    pub checksum_type: ChecksumType,
    /// Recorded hex digest, or `None` when no digest has been recorded
    /// (serialized on the wire as `"none"`).
    pub checksum: Option<String>,
}

impl Datastream {
    /// A minimal version with the given identity and content; remaining
    /// fields take their defaults.
    pub fn new(id: &str, version_id: &str, content: ContentLocation) -> Self {
        Self {
            id: id.to_string(),
            version_id: version_id.to_string(),
            label: String::new(),
            mime_type: String::new(),
            format_uri: None,
            alt_ids: Vec::new(),
            create_date: None,
            size: 0,
            state: DatastreamState::Active,
            versionable: true,
            content,
            checksum_type: ChecksumType::Disabled,
            checksum: None,
        }
    }

    pub fn control_group(&self) -> ControlGroup {
        self.content.control_group()
    }

    /// Resolve this version's bytes through the injected collaborators.
    ///
    /// Inline content is returned directly. Managed content is read from
    /// the staging area when its key is staged, otherwise from the internal
    /// store; a managed key that is still a URL (pre-staging during ingest)
    /// is fetched. External and redirect content is fetched live on every
    /// call.
    pub fn get_content_stream(&self, resolver: &ContentResolver) -> ModelResult<Vec<u8>> {
        match &self.content {
            ContentLocation::InlineXml { bytes } => Ok(bytes.clone()),
            ContentLocation::Managed { key } => {
                if key.starts_with(dor_store::traits::STAGED_SCHEME) {
                    Ok(resolver.staging.read(key)?)
                } else if is_url(key) {
                    Ok(resolver.fetcher.fetch(key)?.bytes)
                } else {
                    Ok(resolver.store.read(key)?)
                }
            }
            ContentLocation::External { url } | ContentLocation::Redirect { url } => {
                Ok(resolver.fetcher.fetch(url)?.bytes)
            }
        }
    }

    /// Fetch a managed version's initial URL content once, deposit it in
    /// the staging area, and replace the URL with the staged key.
    ///
    /// MIME type and size are absorbed from the fetch response when the
    /// version does not carry them yet. After this call the URL is never
    /// fetched again; no-op for anything other than a URL-keyed managed
    /// version.
    pub fn stage_remote_content(&mut self, resolver: &ContentResolver) -> ModelResult<()> {
        let url = match &self.content {
            ContentLocation::Managed { key } if is_url(key) => key.clone(),
            _ => return Ok(()),
        };
        let fetched = resolver.fetcher.fetch(&url)?;
        let key = resolver.staging.stage(&fetched.bytes)?;
        self.absorb_fetch_metadata(&fetched);
        self.content = ContentLocation::Managed { key };
        Ok(())
    }

    /// Fill in MIME type and size from a fetch response, without
    /// overwriting values the version already carries.
    pub fn absorb_fetch_metadata(&mut self, fetched: &FetchedContent) {
        if self.mime_type.is_empty() {
            if let Some(mime) = &fetched.mime_type {
                self.mime_type = mime.clone();
            }
        }
        if self.size == 0 {
            self.size = fetched.length.unwrap_or(fetched.bytes.len() as u64);
        }
    }

    /// Whether checksum computation must canonicalize the content as XML
    /// first. True for inline XML and for any XML-typed MIME type.
    pub fn is_xml_payload(&self) -> bool {
        matches!(self.content, ContentLocation::InlineXml { .. })
            || self.mime_type == "text/xml"
            || self.mime_type == "application/xml"
            || self.mime_type.ends_with("+xml")
    }

    /// Compute the hex digest of this version's canonical content under the
    /// configured algorithm. Returns `None` when checksumming is disabled.
    pub fn compute_checksum(&self, resolver: &ContentResolver) -> ModelResult<Option<String>> {
        if self.checksum_type.is_disabled() {
            return Ok(None);
        }
        let raw = self.get_content_stream(resolver)?;
        let canonical = if self.is_xml_payload() {
            canonicalize_xml(&raw)?
        } else {
            raw
        };
        Ok(self.checksum_type.digest(&canonical))
    }

    /// The recorded checksum, lazily computed and cached if absent.
    ///
    /// Returns the `"none"` sentinel when checksumming is disabled.
    pub fn get_checksum(&mut self, resolver: &ContentResolver) -> ModelResult<String> {
        if let Some(existing) = &self.checksum {
            return Ok(existing.clone());
        }
        match self.compute_checksum(resolver)? {
            Some(digest) => {
                self.checksum = Some(digest.clone());
                Ok(digest)
            }
            None => Ok(CHECKSUM_NONE.to_string()),
        }
    }

    /// Switch algorithms and force recomputation. Switching to
    /// [`ChecksumType::Disabled`] clears the recorded digest.
    pub fn set_checksum_type(
        &mut self,
        checksum_type: ChecksumType,
        resolver: &ContentResolver,
    ) -> ModelResult<()> {
        self.checksum_type = checksum_type;
        self.checksum = self.compute_checksum(resolver)?;
        Ok(())
    }

    /// Compare the recorded checksum against a freshly computed one.
    ///
    /// Trivially true when checksumming is disabled; false when no digest
    /// is recorded.
    pub fn compare_checksum(&self, resolver: &ContentResolver) -> ModelResult<bool> {
        if self.checksum_type.is_disabled() {
            return Ok(true);
        }
        let recorded = match &self.checksum {
            Some(c) if c != CHECKSUM_NONE => c,
            _ => return Ok(false),
        };
        let computed = self.compute_checksum(resolver)?;
        Ok(computed.as_deref() == Some(recorded.as_str()))
    }
}

fn is_url(s: &str) -> bool {
    s.starts_with("http://") || s.starts_with("https://")
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use dor_store::memory::memory_resolver;
    use dor_store::{
        ContentResolver, FetchedContent, MemoryFetcher, MemoryManagedStore, MemoryStagingArea,
    };

    use super::*;

    fn inline(id: &str, vid: &str, xml: &[u8]) -> Datastream {
        Datastream::new(id, vid, ContentLocation::InlineXml { bytes: xml.to_vec() })
    }

    #[test]
    fn control_group_codes_roundtrip() {
        for cg in [
            ControlGroup::InlineXml,
            ControlGroup::Managed,
            ControlGroup::External,
            ControlGroup::Redirect,
        ] {
            assert_eq!(ControlGroup::from_code(cg.code()), Some(cg));
        }
        assert_eq!(ControlGroup::from_code("Z"), None);
    }

    #[test]
    fn inline_content_resolves_without_collaborators() {
        let resolver = memory_resolver();
        let ds = inline("DC", "DC.0", b"<dc/>");
        assert_eq!(ds.get_content_stream(&resolver).unwrap(), b"<dc/>");
    }

    #[test]
    fn managed_content_reads_from_store() {
        let store = Arc::new(MemoryManagedStore::new());
        store.put("demo:1+DS1+DS1.0", b"bytes".to_vec());
        let resolver = ContentResolver::new(
            Arc::new(MemoryFetcher::new()),
            store,
            Arc::new(MemoryStagingArea::new()),
        );
        let ds = Datastream::new(
            "DS1",
            "DS1.0",
            ContentLocation::Managed { key: "demo:1+DS1+DS1.0".to_string() },
        );
        assert_eq!(ds.get_content_stream(&resolver).unwrap(), b"bytes");
    }

    #[test]
    fn staged_managed_content_reads_from_staging() {
        let resolver = memory_resolver();
        let key = resolver.staging.stage(b"pre-commit").unwrap();
        let ds = Datastream::new("DS1", "DS1.0", ContentLocation::Managed { key });
        assert_eq!(ds.get_content_stream(&resolver).unwrap(), b"pre-commit");
    }

    #[test]
    fn remote_managed_content_is_staged_once() {
        let fetcher = Arc::new(MemoryFetcher::new());
        fetcher.put(
            "http://example.org/img",
            FetchedContent {
                bytes: b"imagedata".to_vec(),
                mime_type: Some("image/png".to_string()),
                length: Some(9),
            },
        );
        let resolver = ContentResolver::new(
            fetcher,
            Arc::new(MemoryManagedStore::new()),
            Arc::new(MemoryStagingArea::new()),
        );
        let mut ds = Datastream::new(
            "IMG",
            "IMG.0",
            ContentLocation::Managed { key: "http://example.org/img".to_string() },
        );
        ds.stage_remote_content(&resolver).unwrap();
        assert!(matches!(
            &ds.content,
            ContentLocation::Managed { key } if key.starts_with("staged://")
        ));
        assert_eq!(ds.mime_type, "image/png");
        assert_eq!(ds.size, 9);
        assert_eq!(ds.get_content_stream(&resolver).unwrap(), b"imagedata");
    }

    #[test]
    fn xml_checksum_ignores_cosmetic_whitespace() {
        let resolver = memory_resolver();
        let mut a = inline("DC", "DC.0", b"<dc>\n  <title>t</title>\n</dc>");
        a.checksum_type = ChecksumType::Md5;
        let mut b = inline("DC", "DC.0", b"<dc><title>t</title></dc>");
        b.checksum_type = ChecksumType::Md5;
        assert_eq!(
            a.compute_checksum(&resolver).unwrap(),
            b.compute_checksum(&resolver).unwrap()
        );
    }

    #[test]
    fn non_xml_checksum_hashes_raw_bytes() {
        let store = Arc::new(MemoryManagedStore::new());
        store.put("k", b"raw \n bytes".to_vec());
        let resolver = ContentResolver::new(
            Arc::new(MemoryFetcher::new()),
            store,
            Arc::new(MemoryStagingArea::new()),
        );
        let mut ds = Datastream::new("BIN", "BIN.0", ContentLocation::Managed { key: "k".to_string() });
        ds.mime_type = "application/octet-stream".to_string();
        ds.checksum_type = ChecksumType::Sha256;
        let expected = ChecksumType::Sha256.digest(b"raw \n bytes").unwrap();
        assert_eq!(ds.compute_checksum(&resolver).unwrap().unwrap(), expected);
    }

    #[test]
    fn get_checksum_computes_and_caches() {
        let resolver = memory_resolver();
        let mut ds = inline("DC", "DC.0", b"<dc/>");
        ds.checksum_type = ChecksumType::Sha1;
        assert!(ds.checksum.is_none());
        let first = ds.get_checksum(&resolver).unwrap();
        assert_eq!(ds.checksum.as_deref(), Some(first.as_str()));
        assert_eq!(ds.get_checksum(&resolver).unwrap(), first);
    }

    #[test]
    fn compare_checksum_disabled_is_trivially_true() {
        let resolver = memory_resolver();
        let ds = inline("DC", "DC.0", b"<dc/>");
        assert!(ds.compare_checksum(&resolver).unwrap());
    }

    #[test]
    fn compare_checksum_without_recorded_digest_is_false() {
        let resolver = memory_resolver();
        let mut ds = inline("DC", "DC.0", b"<dc/>");
        ds.checksum_type = ChecksumType::Md5;
        assert!(!ds.compare_checksum(&resolver).unwrap());
    }

    #[test]
    fn compare_checksum_detects_mutation() {
        let resolver = memory_resolver();
        let mut ds = inline("DC", "DC.0", b"<dc>one</dc>");
        ds.checksum_type = ChecksumType::Md5;
        let digest = ds.get_checksum(&resolver).unwrap();
        ds.checksum = Some(digest);
        assert!(ds.compare_checksum(&resolver).unwrap());
        ds.content = ContentLocation::InlineXml { bytes: b"<dc>two</dc>".to_vec() };
        assert!(!ds.compare_checksum(&resolver).unwrap());
    }

    #[test]
    fn set_checksum_type_recomputes() {
        let resolver = memory_resolver();
        let mut ds = inline("DC", "DC.0", b"<dc/>");
        ds.set_checksum_type(ChecksumType::Md5, &resolver).unwrap();
        let md5 = ds.checksum.clone().unwrap();
        ds.set_checksum_type(ChecksumType::Sha256, &resolver).unwrap();
        let sha = ds.checksum.clone().unwrap();
        assert_ne!(md5, sha);
        assert_eq!(sha.len(), 64);
        ds.set_checksum_type(ChecksumType::Disabled, &resolver).unwrap();
        assert!(ds.checksum.is_none());
    }

    #[test]
    fn clone_is_a_deep_independent_copy() {
        let mut original = inline("DC", "DC.0", b"<dc/>");
        original.alt_ids = vec!["alt-1".to_string()];
        let mut copy = original.clone();
        copy.alt_ids.push("alt-2".to_string());
        copy.content = ContentLocation::InlineXml { bytes: b"<other/>".to_vec() };
        assert_eq!(original.alt_ids, vec!["alt-1".to_string()]);
        assert_eq!(original.content, ContentLocation::InlineXml { bytes: b"<dc/>".to_vec() });
        assert_eq!(copy.control_group(), ControlGroup::InlineXml);
    }
}
