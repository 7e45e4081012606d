//! Atom packaging: the object rendered as an Atom feed whose entries carry
//! the datastreams. Each datastream group is one parent entry; each version
//! is a child entry threaded to its parent with `thr:in-reply-to`.
//!
//! The plain rendition here is self-contained XML; the Zip rendition in
//! [`crate::atom_zip`] reuses the same feed reader/writer and moves binary
//! payloads into container members.

pub(crate) mod de;
pub(crate) mod ser;

use std::io::Write;

use dor_model::DigitalObject;
use dor_store::ContentResolver;
use dor_types::format::ATOM_1_1;
use dor_types::{FormatIdentity, TranslationContext};

use crate::codec::{check_encoding, DigitalObjectCodec};
use crate::error::CodecResult;
use crate::translation::TranslationConfig;

/// Resolves a version entry's `src` reference against a container, if the
/// rendition has one. The plain Atom rendition has no members.
pub(crate) trait MemberSource {
    /// Bytes of the member named by `src`, or `None` if `src` is not a
    /// container member (a URL or location key passes through unchanged).
    fn resolve(&self, src: &str) -> CodecResult<Option<Vec<u8>>>;
}

/// Collects binary payloads emitted as container members during
/// serialization. The plain Atom rendition never receives any.
pub(crate) trait MemberSink {
    /// Whether archival exports should emit members at all. When `false`,
    /// binary payloads are inlined as base64 instead.
    fn wants_members(&self) -> bool {
        false
    }

    /// Store `bytes` under the member name `name`.
    fn add(&mut self, name: &str, bytes: &[u8]) -> CodecResult<()>;
}

/// The plain rendition: no container, so nothing resolves and nothing is
/// collected.
pub(crate) struct NoMembers;

impl MemberSource for NoMembers {
    fn resolve(&self, _src: &str) -> CodecResult<Option<Vec<u8>>> {
        Ok(None)
    }
}

impl MemberSink for NoMembers {
    fn add(&mut self, _name: &str, _bytes: &[u8]) -> CodecResult<()> {
        Ok(())
    }
}

/// Codec for the plain (single-document) Atom rendition.
#[derive(Clone)]
pub struct AtomCodec {
    config: TranslationConfig,
    resolver: ContentResolver,
}

impl AtomCodec {
    pub fn new(config: TranslationConfig, resolver: ContentResolver) -> Self {
        Self { config, resolver }
    }
}

impl DigitalObjectCodec for AtomCodec {
    fn format(&self) -> &'static FormatIdentity {
        &ATOM_1_1
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
        de::deserialize(
            source,
            object,
            context,
            &self.config,
            &self.resolver,
            &NoMembers,
        )
    }

    fn serialize(
        &self,
        object: &DigitalObject,
        sink: &mut dyn Write,
        encoding: &str,
        context: TranslationContext,
    ) -> CodecResult<()> {
        check_encoding(encoding)?;
        ser::serialize(
            object,
            sink,
            context,
            &self.config,
            &self.resolver,
            &mut NoMembers,
        )
    }
}
