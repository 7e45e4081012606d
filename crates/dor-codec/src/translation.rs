//! Shared, format-independent translation layer.
//!
//! Every codec runs the same normalization pass after deserializing and
//! rewrites datastream locations through the same routines before
//! serializing, so an object's locations and state codes can never depend
//! on which wire format carried it.

use serde::{Deserialize, Serialize};
use tracing::debug;

use dor_model::{ContentLocation, Datastream, DigitalObject};
use dor_types::{ChecksumType, DatastreamState, ObjectState, Pid, TranslationContext};

use crate::error::{CodecError, CodecResult};

/// Host token used by migration exports in place of the repository's real
/// base URL; the target repository substitutes its own on re-ingest.
pub const PORTABLE_BASE_URL: &str = "http://local.dor.server/dor";

/// Base-URL configuration for location rewriting.
///
/// Injected explicitly into codecs; there are no global handles.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TranslationConfig {
    /// Publicly reachable base URL of this repository.
    pub public_base_url: String,
    /// Checksum algorithm applied to datastreams that arrive without one.
    pub default_checksum_type: ChecksumType,
}

impl Default for TranslationConfig {
    fn default() -> Self {
        Self {
            public_base_url: "http://localhost:8080/dor".to_string(),
            default_checksum_type: ChecksumType::Disabled,
        }
    }
}

impl TranslationConfig {
    /// Load from TOML text.
    pub fn from_toml(text: &str) -> CodecResult<Self> {
        toml::from_str(text).map_err(|e| CodecError::Validation(e.to_string()))
    }
}

// ---- state codes ----

/// Parse an object's wire state attribute. The single source of truth for
/// the code mapping; an unrecognized code fails the deserialization.
pub fn read_object_state(code: &str) -> CodecResult<ObjectState> {
    ObjectState::from_code(code).map_err(|e| CodecError::ObjectIntegrity(e.to_string()))
}

/// The wire form of an object state.
pub fn object_state_attribute(state: ObjectState) -> &'static str {
    state.code()
}

/// Parse a datastream's wire state attribute.
pub fn read_datastream_state(code: &str) -> CodecResult<DatastreamState> {
    DatastreamState::from_code(code).map_err(|e| CodecError::ObjectIntegrity(e.to_string()))
}

/// The wire form of a datastream state.
pub fn datastream_state_attribute(state: DatastreamState) -> &'static str {
    state.code()
}

// ---- location rewriting ----

/// The internal location key for one managed datastream version.
pub fn internal_key(pid: &Pid, datastream_id: &str, version_id: &str) -> String {
    format!("{pid}+{datastream_id}+{version_id}")
}

fn dissemination_url(base: &str, pid: &str, datastream_id: &str, version_id: &str) -> String {
    format!("{base}/objects/{pid}/datastreams/{datastream_id}/versions/{version_id}/content")
}

/// Parse a dissemination URL back into its `(pid, dsId, versionId)` parts,
/// if it is one.
fn parse_dissemination_url<'a>(base: &str, url: &'a str) -> Option<(&'a str, &'a str, &'a str)> {
    let rest = url.strip_prefix(base)?.strip_prefix("/objects/")?;
    let (pid, rest) = rest.split_once("/datastreams/")?;
    let (ds_id, rest) = rest.split_once("/versions/")?;
    let version_id = rest.strip_suffix("/content")?;
    if pid.is_empty() || ds_id.is_empty() || version_id.is_empty() {
        return None;
    }
    Some((pid, ds_id, version_id))
}

/// Rewrite one datastream version's location for serialization, returning
/// a rewritten copy. The object itself is never mutated on the write path.
pub fn normalize_ds_location(
    pid: &Pid,
    datastream: &Datastream,
    context: TranslationContext,
    config: &TranslationConfig,
) -> Datastream {
    let mut out = datastream.clone();
    match &mut out.content {
        ContentLocation::Managed { key } => match context {
            TranslationContext::SerializeExportPublic => {
                *key = dissemination_url(
                    &config.public_base_url,
                    pid.as_str(),
                    &out.id,
                    &out.version_id,
                );
            }
            TranslationContext::SerializeExportMigrate => {
                *key = dissemination_url(PORTABLE_BASE_URL, pid.as_str(), &out.id, &out.version_id);
            }
            // archive export inlines content instead of rewriting;
            // internal storage keeps the key
            _ => {}
        },
        ContentLocation::External { url } | ContentLocation::Redirect { url } => {
            if context == TranslationContext::SerializeExportMigrate {
                if let Some(rest) = url.strip_prefix(&config.public_base_url) {
                    *url = format!("{PORTABLE_BASE_URL}{rest}");
                }
            }
        }
        ContentLocation::InlineXml { .. } => {}
    }
    out
}

/// The shared post-deserialization pass: rewrite incoming export-form
/// locations back to internal keys, substitute the portable host token,
/// and fill in the configured default checksum type.
pub fn normalize_datastreams(
    object: &mut DigitalObject,
    context: TranslationContext,
    config: &TranslationConfig,
) -> CodecResult<()> {
    if context == TranslationContext::AsIs {
        return Ok(());
    }
    let public_base = config.public_base_url.clone();
    let default_checksum = config.default_checksum_type;
    let mut rewritten = 0usize;
    for version in object.datastream_versions_mut() {
        match &mut version.content {
            ContentLocation::Managed { key } => {
                let parsed = parse_dissemination_url(PORTABLE_BASE_URL, key)
                    .or_else(|| parse_dissemination_url(&public_base, key))
                    .map(|(pid, ds, vid)| format!("{pid}+{ds}+{vid}"));
                if let Some(internal) = parsed {
                    *key = internal;
                    rewritten += 1;
                }
            }
            ContentLocation::External { url } | ContentLocation::Redirect { url } => {
                if let Some(rest) = url.strip_prefix(PORTABLE_BASE_URL) {
                    *url = format!("{public_base}{rest}");
                    rewritten += 1;
                }
            }
            ContentLocation::InlineXml { .. } => {}
        }
        if version.checksum_type.is_disabled()
            && version.checksum.is_none()
            && !default_checksum.is_disabled()
        {
            version.checksum_type = default_checksum;
        }
    }
    if rewritten > 0 {
        debug!(rewritten, "normalized datastream locations");
    }
    Ok(())
}

/// Checksum-on-ingest: when a brand-new object arrives with declared
/// checksums, verify them against the decoded content immediately and
/// refuse the object on mismatch. Existing objects trust the supplied
/// values; re-verification happens elsewhere.
pub fn verify_ingest_checksums(
    object: &DigitalObject,
    resolver: &dor_store::ContentResolver,
) -> CodecResult<()> {
    if !object.is_new {
        return Ok(());
    }
    let ids: Vec<String> = object.datastream_ids().map(str::to_string).collect();
    for id in ids {
        for version in object.versions(&id).unwrap_or_default() {
            let declared = match &version.checksum {
                Some(c) if c != dor_types::checksum::CHECKSUM_NONE => c,
                _ => continue,
            };
            if version.checksum_type.is_disabled() {
                continue;
            }
            if !version.compare_checksum(resolver)? {
                return Err(CodecError::Validation(format!(
                    "checksum mismatch on ingest for {}/{}: declared {} ({})",
                    id, version.version_id, declared, version.checksum_type
                )));
            }
        }
    }
    Ok(())
}
