//! Wire-format codecs for the dor repository core.
//!
//! Every supported rendition of a digital object — the native
//! object-exchange XML ("DOXML", versions 1.0 and 1.1), Atom and Atom-Zip
//! packaging, and the legacy METS-derived archival format — implements the
//! same [`DigitalObjectCodec`] trait and is dispatched by format URI
//! through a [`CodecRegistry`].
//!
//! All codecs share one translation layer: location rewriting between
//! internal storage keys, public dissemination URLs, and the portable
//! migration host token is driven by the [`TranslationContext`] of the
//! call, never by the format. Deserialization of a brand-new object
//! verifies every declared checksum before the object is accepted.
//!
//! ```no_run
//! use dor_codec::{default_registry, TranslationConfig};
//! use dor_model::DigitalObject;
//! use dor_store::memory::memory_resolver;
//! use dor_types::format::DOXML_1_1;
//! use dor_types::TranslationContext;
//!
//! let registry = default_registry(TranslationConfig::default(), memory_resolver());
//! let mut object = DigitalObject::new();
//! registry.deserialize(
//!     DOXML_1_1.uri,
//!     br#"<digitalObject VERSION="1.1" PID="demo:1"/>"#,
//!     &mut object,
//!     "UTF-8",
//!     TranslationContext::DeserializeInstance,
//! )?;
//! # Ok::<(), dor_codec::CodecError>(())
//! ```

pub mod atom;
pub mod atom_zip;
pub mod audit_xml;
pub mod codec;
pub mod doxml;
pub mod error;
pub mod mets;
pub mod registry;
pub mod translation;
pub mod vocab;

mod xmlutil;

pub use atom::AtomCodec;
pub use atom_zip::AtomZipCodec;
pub use codec::{check_encoding, DigitalObjectCodec};
pub use doxml::DoxmlCodec;
pub use error::{CodecError, CodecResult};
pub use mets::MetsCodec;
pub use registry::{default_registry, CodecRegistry};
pub use translation::{TranslationConfig, PORTABLE_BASE_URL};

pub use dor_types::TranslationContext;
