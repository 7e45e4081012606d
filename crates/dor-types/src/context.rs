use serde::{Deserialize, Serialize};

/// Why a serialization or deserialization is happening.
///
/// The context is the only channel through which a codec learns the purpose
/// of a translation; it drives datastream location rewriting and decides
/// whether managed content is referenced or inlined.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TranslationContext {
    /// No rewriting at all; bytes in are semantics out.
    AsIs,
    /// Reading wire data into a model instance (ingest or load).
    DeserializeInstance,
    /// Writing the form kept in the repository's own storage.
    SerializeStorageInternal,
    /// Export for public consumption; internal keys become public URLs.
    SerializeExportPublic,
    /// Export for migration to another repository; URLs use a portable
    /// host token the target substitutes on re-ingest.
    SerializeExportMigrate,
    /// Self-contained archival export; managed content is inlined rather
    /// than referenced.
    SerializeExportArchive,
}

impl TranslationContext {
    /// Returns `true` for the three export contexts.
    pub fn is_export(&self) -> bool {
        matches!(
            self,
            Self::SerializeExportPublic | Self::SerializeExportMigrate | Self::SerializeExportArchive
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn export_contexts_are_flagged() {
        assert!(TranslationContext::SerializeExportPublic.is_export());
        assert!(TranslationContext::SerializeExportMigrate.is_export());
        assert!(TranslationContext::SerializeExportArchive.is_export());
        assert!(!TranslationContext::AsIs.is_export());
        assert!(!TranslationContext::SerializeStorageInternal.is_export());
        assert!(!TranslationContext::DeserializeInstance.is_export());
    }
}
