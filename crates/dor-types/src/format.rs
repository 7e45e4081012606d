use serde::Serialize;

/// Complete identity of a wire format: its format URI, primary XML
/// namespace, and public schema location.
///
/// These three fields are registered together and never mutated; a format
/// URI identifies exactly one (format, version) pair.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
pub struct FormatIdentity {
    pub uri: &'static str,
    pub namespace: &'static str,
    pub schema_location: &'static str,
}

/// Native object-exchange format, version 1.0 (legacy; read-compatible).
pub const DOXML_1_0: FormatIdentity = FormatIdentity {
    uri: "info:dor/dor-system:DOXML-1.0",
    namespace: "info:dor/dor-system:def/doxml#",
    schema_location: "http://www.dor-project.org/definitions/1/0/doxml1-0.xsd",
};

/// Native object-exchange format, version 1.1.
pub const DOXML_1_1: FormatIdentity = FormatIdentity {
    uri: "info:dor/dor-system:DOXML-1.1",
    namespace: "info:dor/dor-system:def/doxml#",
    schema_location: "http://www.dor-project.org/definitions/1/0/doxml1-1.xsd",
};

/// Atom packaging format, version 1.1. Shared by the plain and Zip
/// renditions; the Zip rendition is disambiguated by [`ATOM_ZIP_1_1`].
pub const ATOM_1_1: FormatIdentity = FormatIdentity {
    uri: "info:dor/dor-system:ATOM-1.1",
    namespace: "http://www.w3.org/2005/Atom",
    schema_location: "http://www.dor-project.org/definitions/1/0/atom.xsd",
};

/// Atom archival packaging format (Zip container), version 1.1.
pub const ATOM_ZIP_1_1: FormatIdentity = FormatIdentity {
    uri: "info:dor/dor-system:ATOMZip-1.1",
    namespace: "http://www.w3.org/2005/Atom",
    schema_location: "http://www.dor-project.org/definitions/1/0/atom.xsd",
};

/// Legacy archival packaging format (METS-derived), version 1.1.
pub const METS_EXT_1_1: FormatIdentity = FormatIdentity {
    uri: "info:dor/dor-system:METSExt-1.1",
    namespace: "http://www.loc.gov/METS/",
    schema_location: "http://www.dor-project.org/definitions/1/0/mets-ext1-1.xsd",
};
