//! The native object-exchange format ("DOXML"): a tree-structured XML
//! rendition of the full object, used for internal storage and for
//! migration/archival export.
//!
//! Version 1.1 is the writable format; 1.0 documents are read-compatible
//! (their disseminator-era extras are preserved as extended properties).

mod de;
mod ser;

use std::io::Write;

use dor_model::DigitalObject;
use dor_store::ContentResolver;
use dor_types::format::{DOXML_1_0, DOXML_1_1};
use dor_types::{FormatIdentity, TranslationContext};

use crate::codec::{check_encoding, DigitalObjectCodec};
use crate::error::CodecResult;
use crate::translation::TranslationConfig;

/// Codec for the native object-exchange XML format.
#[derive(Clone)]
pub struct DoxmlCodec {
    format: &'static FormatIdentity,
    config: TranslationConfig,
    resolver: ContentResolver,
}

impl DoxmlCodec {
    /// Codec speaking DOXML 1.1.
    pub fn new_1_1(config: TranslationConfig, resolver: ContentResolver) -> Self {
        Self {
            format: &DOXML_1_1,
            config,
            resolver,
        }
    }

    /// Codec speaking DOXML 1.0 (read-compatible legacy rendition).
    pub fn new_1_0(config: TranslationConfig, resolver: ContentResolver) -> Self {
        Self {
            format: &DOXML_1_0,
            config,
            resolver,
        }
    }
}

impl DigitalObjectCodec for DoxmlCodec {
    fn format(&self) -> &'static FormatIdentity {
        self.format
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
        de::deserialize(source, object, context, &self.config, &self.resolver)
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
            self.format,
        )
    }
}
