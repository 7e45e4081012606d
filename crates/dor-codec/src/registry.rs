//! Format registry: maps format URIs to codecs and dispatches translation
//! calls through fresh codec instances.

use std::collections::HashMap;

use tracing::debug;

use dor_model::DigitalObject;
use dor_store::ContentResolver;
use dor_types::TranslationContext;

use crate::atom::AtomCodec;
use crate::atom_zip::AtomZipCodec;
use crate::codec::DigitalObjectCodec;
use crate::doxml::DoxmlCodec;
use crate::error::{CodecError, CodecResult};
use crate::mets::MetsCodec;
use crate::translation::TranslationConfig;

/// Registered codecs, keyed by format URI.
///
/// Serializers and deserializers are registered independently; a format may
/// support only one direction. Dispatch always goes through
/// [`DigitalObjectCodec::instance`], so the registry can be shared.
#[derive(Default)]
pub struct CodecRegistry {
    serializers: HashMap<String, Box<dyn DigitalObjectCodec>>,
    deserializers: HashMap<String, Box<dyn DigitalObjectCodec>>,
}

impl CodecRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a codec for both directions under its own format URI.
    pub fn register(&mut self, codec: Box<dyn DigitalObjectCodec>) {
        let uri = codec.format().uri;
        debug!(format = uri, "registering codec");
        self.serializers.insert(uri.to_string(), codec.instance());
        self.deserializers.insert(uri.to_string(), codec);
    }

    /// Register a codec for serialization only.
    pub fn register_serializer(&mut self, codec: Box<dyn DigitalObjectCodec>) {
        self.serializers
            .insert(codec.format().uri.to_string(), codec);
    }

    /// Register a codec for deserialization only.
    pub fn register_deserializer(&mut self, codec: Box<dyn DigitalObjectCodec>) {
        self.deserializers
            .insert(codec.format().uri.to_string(), codec);
    }

    /// Format URIs with a registered serializer.
    pub fn serializable_formats(&self) -> impl Iterator<Item = &str> {
        self.serializers.keys().map(String::as_str)
    }

    /// Format URIs with a registered deserializer.
    pub fn deserializable_formats(&self) -> impl Iterator<Item = &str> {
        self.deserializers.keys().map(String::as_str)
    }

    /// Populate `object` from `source` bytes in the named format.
    pub fn deserialize(
        &self,
        format_uri: &str,
        source: &[u8],
        object: &mut DigitalObject,
        encoding: &str,
        context: TranslationContext,
    ) -> CodecResult<()> {
        let codec = self.deserializers.get(format_uri).ok_or_else(|| {
            CodecError::UnsupportedTranslation(format!("{format_uri} (deserialization)"))
        })?;
        codec
            .instance()
            .deserialize(source, object, encoding, context)
    }

    /// Write `object` to `sink` in the named format.
    pub fn serialize(
        &self,
        format_uri: &str,
        object: &DigitalObject,
        sink: &mut dyn std::io::Write,
        encoding: &str,
        context: TranslationContext,
    ) -> CodecResult<()> {
        let codec = self.serializers.get(format_uri).ok_or_else(|| {
            CodecError::UnsupportedTranslation(format!("{format_uri} (serialization)"))
        })?;
        codec.instance().serialize(object, sink, encoding, context)
    }
}

/// A registry with every built-in codec: DOXML 1.1 and 1.0, Atom, Atom-Zip,
/// and legacy METS.
pub fn default_registry(config: TranslationConfig, resolver: ContentResolver) -> CodecRegistry {
    let mut registry = CodecRegistry::new();
    registry.register(Box::new(DoxmlCodec::new_1_1(
        config.clone(),
        resolver.clone(),
    )));
    registry.register(Box::new(DoxmlCodec::new_1_0(
        config.clone(),
        resolver.clone(),
    )));
    registry.register(Box::new(AtomCodec::new(config.clone(), resolver.clone())));
    registry.register(Box::new(AtomZipCodec::new(
        config.clone(),
        resolver.clone(),
    )));
    registry.register(Box::new(MetsCodec::new(config, resolver)));
    registry
}

#[cfg(test)]
mod tests {
    use dor_model::{ContentLocation, Datastream};
    use dor_store::memory::memory_resolver;
    use dor_types::format::{ATOM_1_1, ATOM_ZIP_1_1, DOXML_1_0, DOXML_1_1, METS_EXT_1_1};
    use dor_types::Pid;

    use super::*;

    fn sample_object() -> DigitalObject {
        let mut obj = DigitalObject::new();
        obj.assign_pid(Pid::new("demo:reg").unwrap()).unwrap();
        obj.label = "Registry sample".to_string();
        let mut dc = Datastream::new(
            "DC",
            "DC.0",
            ContentLocation::InlineXml {
                bytes: b"<dc><title>R</title></dc>".to_vec(),
            },
        );
        dc.mime_type = "text/xml".to_string();
        dc.create_date = dor_types::date::parse_date("2008-04-20T12:00:00.000Z").ok();
        obj.add_datastream_version(dc, true).unwrap();
        obj
    }

    #[test]
    fn default_registry_speaks_all_builtin_formats() {
        let registry = default_registry(TranslationConfig::default(), memory_resolver());
        for uri in [
            DOXML_1_1.uri,
            DOXML_1_0.uri,
            ATOM_1_1.uri,
            ATOM_ZIP_1_1.uri,
            METS_EXT_1_1.uri,
        ] {
            assert!(registry.serializable_formats().any(|f| f == uri));
            assert!(registry.deserializable_formats().any(|f| f == uri));
        }
    }

    #[test]
    fn unknown_format_is_an_unsupported_translation() {
        let registry = default_registry(TranslationConfig::default(), memory_resolver());
        let mut obj = DigitalObject::new();
        let err = registry
            .deserialize(
                "info:dor/dor-system:NOPE-1.0",
                b"<x/>",
                &mut obj,
                "UTF-8",
                TranslationContext::AsIs,
            )
            .unwrap_err();
        assert!(matches!(err, CodecError::UnsupportedTranslation(_)));

        let obj = sample_object();
        let mut sink = Vec::new();
        assert!(matches!(
            registry.serialize(
                "info:dor/dor-system:NOPE-1.0",
                &obj,
                &mut sink,
                "UTF-8",
                TranslationContext::AsIs,
            ),
            Err(CodecError::UnsupportedTranslation(_))
        ));
    }

    #[test]
    fn dispatch_roundtrips_through_every_xml_format() {
        let resolver = memory_resolver();
        let registry = default_registry(TranslationConfig::default(), resolver);
        let original = sample_object();
        for uri in [DOXML_1_1.uri, ATOM_1_1.uri, METS_EXT_1_1.uri] {
            let mut bytes = Vec::new();
            registry
                .serialize(uri, &original, &mut bytes, "UTF-8", TranslationContext::AsIs)
                .unwrap();
            let mut restored = DigitalObject::new();
            registry
                .deserialize(uri, &bytes, &mut restored, "UTF-8", TranslationContext::AsIs)
                .unwrap();
            assert_eq!(restored.pid().unwrap().as_str(), "demo:reg", "{uri}");
            assert_eq!(
                restored.current_version("DC").unwrap().content,
                original.current_version("DC").unwrap().content,
                "{uri}"
            );
        }
    }

    #[test]
    fn direction_specific_registration_is_respected() {
        let resolver = memory_resolver();
        let mut registry = CodecRegistry::new();
        registry.register_serializer(Box::new(DoxmlCodec::new_1_0(
            TranslationConfig::default(),
            resolver,
        )));
        let obj = sample_object();
        let mut sink = Vec::new();
        registry
            .serialize(DOXML_1_0.uri, &obj, &mut sink, "UTF-8", TranslationContext::AsIs)
            .unwrap();
        let mut restored = DigitalObject::new();
        assert!(matches!(
            registry.deserialize(
                DOXML_1_0.uri,
                &sink,
                &mut restored,
                "UTF-8",
                TranslationContext::AsIs
            ),
            Err(CodecError::UnsupportedTranslation(_))
        ));
    }
}
