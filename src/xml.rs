//! Plain XML rendering of a document, and parsing it back.
//!
//! Leaves keep their pseudo-attributes, so `Document::from_xml(&doc.to_xml()?)` gives back a
//! document that encodes to the same kbin bytes.

use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::{Reader, Writer};

use crate::document::{Document, NodeId};
use crate::error::{Error, Result};
use crate::walker::WalkEvent;

fn xml_err(e: impl std::fmt::Display) -> Error {
    Error::Xml(e.to_string())
}

impl Document {
    /// Render the document as XML on a single line.
    pub fn to_xml(&self) -> Result<String> {
        render(self, Writer::new(Vec::new()))
    }

    /// Render the document as XML, indenting nested elements by two spaces.
    pub fn to_xml_pretty(&self) -> Result<String> {
        render(self, Writer::new_with_indent(Vec::new(), b' ', 2))
    }

    /// Parse XML into a document.
    ///
    /// The input must have exactly one root element. Whitespace-only text inside a non-leaf
    /// element that has child elements is formatting and gets dropped; all other text, leaf text
    /// included, is kept as-is.
    /// Comments, processing instructions and the declaration are ignored.
    pub fn from_xml(xml: &str) -> Result<Document> {
        parse(xml)
    }
}

fn render(doc: &Document, mut writer: Writer<Vec<u8>>) -> Result<String> {
    let mut walker = doc.walk().ok_or(Error::EmptyDocument)?;
    writer
        .write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))
        .map_err(xml_err)?;
    loop {
        let (id, event) = walker.walk();
        let node = doc.node(id);
        let text = node.text().unwrap_or("");
        let empty = node.children().is_empty() && text.is_empty();
        match event {
            WalkEvent::Start => {
                let mut start = BytesStart::new(node.tag());
                for attr in node.attributes() {
                    start.push_attribute(attr);
                }
                if empty {
                    writer.write_event(Event::Empty(start)).map_err(xml_err)?;
                    continue;
                }
                writer.write_event(Event::Start(start)).map_err(xml_err)?;
                if !text.is_empty() {
                    writer
                        .write_event(Event::Text(BytesText::new(text)))
                        .map_err(xml_err)?;
                }
            }
            WalkEvent::End => {
                if !empty {
                    writer
                        .write_event(Event::End(BytesEnd::new(node.tag())))
                        .map_err(xml_err)?;
                }
            }
            WalkEvent::Eof => break,
        }
    }
    String::from_utf8(writer.into_inner()).map_err(xml_err)
}

fn parse(xml: &str) -> Result<Document> {
    let mut reader = Reader::from_str(xml);
    let mut doc = Document::new();
    // Open elements with the text gathered for each so far
    let mut open: Vec<(NodeId, String)> = Vec::new();

    loop {
        match reader.read_event().map_err(xml_err)? {
            Event::Start(ref e) => {
                let id = open_element(&mut doc, &open, e)?;
                open.push((id, String::new()));
            }
            Event::Empty(ref e) => {
                open_element(&mut doc, &open, e)?;
            }
            Event::Text(ref e) => {
                let text = e.unescape().map_err(xml_err)?;
                match open.last_mut() {
                    Some((_, buf)) => buf.push_str(&text),
                    None if text.trim().is_empty() => (),
                    None => return Err(Error::Xml("text outside of the root element".into())),
                }
            }
            Event::CData(ref e) => {
                let text = String::from_utf8(e.to_vec()).map_err(xml_err)?;
                match open.last_mut() {
                    Some((_, buf)) => buf.push_str(&text),
                    None => return Err(Error::Xml("CDATA outside of the root element".into())),
                }
            }
            Event::End(_) => {
                if let Some((id, text)) = open.pop() {
                    let node = doc.node_mut(id);
                    let formatting =
                        !node.is_leaf() && !node.children().is_empty() && text.trim().is_empty();
                    if !text.is_empty() && !formatting {
                        node.set_text(text);
                    }
                }
            }
            Event::Eof => break,
            _ => (),
        }
    }

    if !open.is_empty() {
        return Err(Error::Xml("unclosed element at end of input".into()));
    }
    if doc.root().is_none() {
        return Err(Error::Xml("no root element".into()));
    }
    Ok(doc)
}

fn open_element(doc: &mut Document, open: &[(NodeId, String)], e: &BytesStart) -> Result<NodeId> {
    let tag = std::str::from_utf8(e.name().as_ref())
        .map_err(xml_err)?
        .to_string();
    let id = match open.last() {
        Some((parent, _)) => doc.add_child(*parent, tag),
        None if doc.root().is_some() => {
            return Err(Error::Xml("more than one root element".into()))
        }
        None => doc.create_root(tag),
    };
    for attr in e.attributes() {
        let attr = attr.map_err(xml_err)?;
        let key = std::str::from_utf8(attr.key.as_ref()).map_err(xml_err)?;
        let value = attr.unescape_value().map_err(xml_err)?;
        doc.node_mut(id).push_attr(key, value.into_owned());
    }
    Ok(id)
}
