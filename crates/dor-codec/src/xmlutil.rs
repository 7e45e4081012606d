//! Small XML helpers shared by the concrete codecs.

use std::io::{BufRead, Write};

use quick_xml::events::{BytesEnd, BytesStart, BytesText, Event};
use quick_xml::{Reader, Writer};

use crate::error::{CodecError, CodecResult};

/// Map any reader/writer error into the codec taxonomy.
pub fn xml_err(e: impl std::fmt::Display) -> CodecError {
    CodecError::ObjectIntegrity(e.to_string())
}

/// Local (prefix-stripped) element name as an owned string.
pub fn local_name(e: &BytesStart<'_>) -> String {
    String::from_utf8_lossy(e.local_name().as_ref()).to_string()
}

/// Value of the attribute with the given local name, if present.
pub fn attr(e: &BytesStart<'_>, name: &str) -> CodecResult<Option<String>> {
    for attr in e.attributes() {
        let attr = attr.map_err(xml_err)?;
        if attr.key.local_name().as_ref() == name.as_bytes() {
            let value = attr.unescape_value().map_err(xml_err)?;
            return Ok(Some(value.into_owned()));
        }
    }
    Ok(None)
}

/// Like [`attr`], but absence is an integrity violation.
pub fn required_attr(e: &BytesStart<'_>, name: &str) -> CodecResult<String> {
    attr(e, name)?.ok_or_else(|| {
        CodecError::ObjectIntegrity(format!(
            "missing required attribute {name} on <{}>",
            local_name(e)
        ))
    })
}

/// Re-serialize the children of the element whose `Start` event was just
/// consumed, stopping at (and consuming) the matching `End`.
///
/// The captured fragment drops XML declarations and doctypes; namespace
/// prefixes declared by ancestors are not re-declared, matching the
/// historical behavior of inline-XML extraction.
pub fn capture_subtree<R: BufRead>(reader: &mut Reader<R>) -> CodecResult<Vec<u8>> {
    let mut writer = Writer::new(Vec::new());
    let mut depth = 0usize;
    let mut buf = Vec::new();
    loop {
        let event = reader.read_event_into(&mut buf)?;
        match event {
            Event::Eof => {
                return Err(CodecError::ObjectIntegrity(
                    "document ended inside embedded XML content".to_string(),
                ));
            }
            Event::Start(_) => {
                depth += 1;
                writer.write_event(event).map_err(xml_err)?;
            }
            Event::End(_) => {
                if depth == 0 {
                    break;
                }
                depth -= 1;
                writer.write_event(event).map_err(xml_err)?;
            }
            Event::Decl(_) | Event::DocType(_) => {}
            other => writer.write_event(other).map_err(xml_err)?,
        }
        buf.clear();
    }
    Ok(writer.into_inner())
}

/// Write `<name>text</name>`, escaping the text.
pub fn write_text_element<W: Write>(
    writer: &mut Writer<W>,
    name: &str,
    text: &str,
) -> CodecResult<()> {
    writer
        .write_event(Event::Start(BytesStart::new(name)))
        .map_err(xml_err)?;
    if !text.is_empty() {
        writer
            .write_event(Event::Text(BytesText::new(text)))
            .map_err(xml_err)?;
    }
    writer
        .write_event(Event::End(BytesEnd::new(name)))
        .map_err(xml_err)?;
    Ok(())
}

/// Drop a leading XML declaration from a serialized document, for embedding
/// it inside another document.
pub fn strip_decl(xml: &[u8]) -> &[u8] {
    if xml.starts_with(b"<?") {
        if let Some(pos) = xml.windows(2).position(|w| w == b"?>") {
            return &xml[pos + 2..];
        }
    }
    xml
}

/// Write an already-serialized XML fragment verbatim.
pub fn write_raw<W: Write>(writer: &mut Writer<W>, fragment: &[u8]) -> CodecResult<()> {
    let text = String::from_utf8_lossy(fragment);
    writer
        .write_event(Event::Text(BytesText::from_escaped(text)))
        .map_err(xml_err)?;
    Ok(())
}
