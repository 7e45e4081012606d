//! Whitespace-insignificant XML canonicalization.
//!
//! XML-typed payloads are not checksummed over their raw bytes; they are
//! re-serialized with insignificant whitespace removed first, so two
//! cosmetically different serializations of the same document digest
//! identically. Non-XML payloads hash raw bytes — the asymmetry is
//! preserved for compatibility with already-recorded checksums.

use quick_xml::events::Event;
use quick_xml::{Reader, Writer};

use crate::error::{ModelError, ModelResult};

/// Re-serialize an XML document without insignificant whitespace,
/// comments, or the XML declaration.
pub fn canonicalize_xml(bytes: &[u8]) -> ModelResult<Vec<u8>> {
    let mut reader = Reader::from_reader(bytes);
    reader.config_mut().trim_text(true);
    let mut writer = Writer::new(Vec::new());
    let mut buf = Vec::new();
    loop {
        let event = reader
            .read_event_into(&mut buf)
            .map_err(|e| ModelError::Xml(e.to_string()))?;
        match event {
            Event::Eof => break,
            Event::Decl(_) | Event::Comment(_) | Event::DocType(_) | Event::PI(_) => {}
            other => writer
                .write_event(other)
                .map_err(|e| ModelError::Xml(e.to_string()))?,
        }
        buf.clear();
    }
    Ok(writer.into_inner())
}
