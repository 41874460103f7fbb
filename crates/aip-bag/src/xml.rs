use std::fmt;
use std::io::{BufRead, Write};

use aip_types::MetadataElement;
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::{Reader, Writer};

use crate::error::{BagError, BagResult};

pub const METADATA_ROOT: &str = "metadata";
pub const VALUE_ELEMENT: &str = "value";

fn xml_err(e: impl fmt::Display) -> BagError {
    BagError::MalformedXml(e.to_string())
}

/// Write a `<metadata>` document of `<value>` elements.
pub fn write_metadata<W: Write>(out: W, elements: &[MetadataElement]) -> BagResult<()> {
    let mut writer = Writer::new_with_indent(out, b' ', 2);
    writer
        .write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))
        .map_err(xml_err)?;
    writer
        .write_event(Event::Start(BytesStart::new(METADATA_ROOT)))
        .map_err(xml_err)?;
    for element in elements {
        let mut start = BytesStart::new(VALUE_ELEMENT);
        for (key, value) in &element.attributes {
            start.push_attribute((key.as_str(), value.as_str()));
        }
        if element.body.is_empty() {
            writer.write_event(Event::Empty(start)).map_err(xml_err)?;
            continue;
        }
        writer.write_event(Event::Start(start)).map_err(xml_err)?;
        writer
            .write_event(Event::Text(BytesText::new(&element.body)))
            .map_err(xml_err)?;
        writer
            .write_event(Event::End(BytesEnd::new(VALUE_ELEMENT)))
            .map_err(xml_err)?;
    }
    writer
        .write_event(Event::End(BytesEnd::new(METADATA_ROOT)))
        .map_err(xml_err)?;
    writer.into_inner().flush()?;
    Ok(())
}

/// Parse a `<metadata>` document back into its `<value>` elements.
///
/// Text inside a value is kept verbatim; whitespace between elements is
/// ignored.
pub fn read_metadata<R: BufRead>(input: R) -> BagResult<Vec<MetadataElement>> {
    let mut reader = Reader::from_reader(input);
    let mut buf = Vec::new();
    let mut elements = Vec::new();
    let mut current: Option<MetadataElement> = None;
    let mut saw_root = false;

    loop {
        match reader.read_event_into(&mut buf).map_err(xml_err)? {
            Event::Start(start) => {
                let name = start.name();
                match name.as_ref() {
                    b"metadata" if !saw_root => saw_root = true,
                    b"value" if saw_root && current.is_none() => {
                        current = Some(MetadataElement::new(attributes(&start)?, ""));
                    }
                    other => {
                        return Err(BagError::MalformedXml(format!(
                            "unexpected element <{}>",
                            String::from_utf8_lossy(other)
                        )))
                    }
                }
            }
            Event::Empty(start) => match start.name().as_ref() {
                b"value" if saw_root => {
                    elements.push(MetadataElement::new(attributes(&start)?, ""));
                }
                b"metadata" if !saw_root => saw_root = true,
                other => {
                    return Err(BagError::MalformedXml(format!(
                        "unexpected element <{}>",
                        String::from_utf8_lossy(other)
                    )))
                }
            },
            Event::Text(text) => {
                if let Some(element) = current.as_mut() {
                    element.body.push_str(&text.unescape().map_err(xml_err)?);
                }
            }
            Event::CData(data) => {
                if let Some(element) = current.as_mut() {
                    element.body.push_str(&String::from_utf8_lossy(&data));
                }
            }
            Event::End(end) => {
                if end.name().as_ref() == b"value" {
                    if let Some(element) = current.take() {
                        elements.push(element);
                    }
                }
            }
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }

    if !saw_root {
        return Err(BagError::MalformedXml("missing <metadata> root".into()));
    }
    if current.is_some() {
        return Err(BagError::MalformedXml("unterminated <value> element".into()));
    }
    Ok(elements)
}

fn attributes(start: &BytesStart<'_>) -> BagResult<Vec<(String, String)>> {
    let mut out = Vec::new();
    for attr in start.attributes() {
        let attr = attr.map_err(xml_err)?;
        let key = String::from_utf8_lossy(attr.key.as_ref()).into_owned();
        let value = attr.unescape_value().map_err(xml_err)?.into_owned();
        out.push((key, value));
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn render(elements: &[MetadataElement]) -> String {
        let mut out = Vec::new();
        write_metadata(&mut out, elements).unwrap();
        String::from_utf8(out).unwrap()
    }

    #[test]
    fn writes_declaration_and_values() {
        let xml = render(&[
            MetadataElement::named("name", "Physics"),
            MetadataElement::named("short_description", "Dept. of Physics"),
        ]);
        assert!(xml.starts_with("<?xml version=\"1.0\" encoding=\"UTF-8\"?>"));
        assert!(xml.contains("<value name=\"name\">Physics</value>"));
        assert_eq!(xml.matches("<value ").count(), 2);
    }

    #[test]
    fn escapes_markup() {
        let elements = vec![MetadataElement::named("title", "a < b & \"c\"")];
        let xml = render(&elements);
        assert!(!xml.contains("a < b"));
        assert_eq!(read_metadata(xml.as_bytes()).unwrap(), elements);
    }

    #[test]
    fn preserves_body_whitespace_and_attribute_order() {
        let elements = vec![
            MetadataElement::named("introductory_text", "  line one\nline two  ")
                .with_attribute("language", "en"),
            MetadataElement::named("empty", ""),
        ];
        assert_eq!(read_metadata(render(&elements).as_bytes()).unwrap(), elements);
    }

    #[test]
    fn empty_document() {
        let xml = render(&[]);
        assert!(read_metadata(xml.as_bytes()).unwrap().is_empty());
    }

    #[test]
    fn rejects_foreign_root() {
        let err = read_metadata("<other><value name=\"x\">1</value></other>".as_bytes())
            .unwrap_err();
        assert!(matches!(err, BagError::MalformedXml(_)));
    }

    #[test]
    fn rejects_truncated_document() {
        let err = read_metadata("<metadata><value name=\"x\">1".as_bytes()).unwrap_err();
        assert!(matches!(err, BagError::MalformedXml(_)));
    }

    #[test]
    fn rejects_empty_input() {
        assert!(matches!(
            read_metadata("".as_bytes()),
            Err(BagError::MalformedXml(_))
        ));
    }
}
