use std::io::Write;

use dor_model::DigitalObject;
use dor_types::{FormatIdentity, TranslationContext};

use crate::error::{CodecError, CodecResult};

/// A symmetric serializer/deserializer for one wire format.
///
/// Implementations hold no mutable parse state; every dispatched call goes
/// through [`DigitalObjectCodec::instance`] first, so one configured codec
/// is safe to use from any number of concurrent callers.
pub trait DigitalObjectCodec: Send + Sync {
    /// The immutable identity of the format this codec speaks.
    fn format(&self) -> &'static FormatIdentity;

    /// A fresh, independent instance for one translation call.
    fn instance(&self) -> Box<dyn DigitalObjectCodec>;

    /// Populate `object` (supplied empty) from wire bytes.
    fn deserialize(
        &self,
        source: &[u8],
        object: &mut DigitalObject,
        encoding: &str,
        context: TranslationContext,
    ) -> CodecResult<()>;

    /// Write `object` to the sink in this codec's wire format.
    fn serialize(
        &self,
        object: &DigitalObject,
        sink: &mut dyn Write,
        encoding: &str,
        context: TranslationContext,
    ) -> CodecResult<()>;
}

/// Validate a requested text encoding. Only UTF-8 is supported.
pub fn check_encoding(encoding: &str) -> CodecResult<()> {
    match encoding.to_ascii_uppercase().as_str() {
        "UTF-8" | "UTF8" => Ok(()),
        other => Err(CodecError::UnsupportedEncoding(other.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn utf8_spellings_are_accepted() {
        assert!(check_encoding("UTF-8").is_ok());
        assert!(check_encoding("utf-8").is_ok());
        assert!(check_encoding("utf8").is_ok());
    }

    #[test]
    fn other_encodings_are_rejected() {
        assert!(matches!(
            check_encoding("ISO-8859-1"),
            Err(CodecError::UnsupportedEncoding(_))
        ));
        assert!(check_encoding("UTF-16").is_err());
    }
}
