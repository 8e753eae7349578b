use log::{debug, trace};

use crate::document::{Document, Node};
use crate::encoding::TextEncoding;
use crate::error::{Error, Result};
use crate::offsets::ByteOffsets;
use crate::sixbit::write_name;
use crate::types::{Marker, TypeCode, ValueKind};
use crate::value::{parse_bin, parse_values};
use crate::walker::WalkEvent;
use crate::MAGIC_NUMBER;

/// Encode a document using its own text encoding.
pub fn encode(doc: &Document) -> Result<Vec<u8>> {
    encode_with(doc, doc.encoding())
}

/// Encode a document, writing strings and attribute values in the given text encoding and
/// recording it in the header.
///
/// Nodes with a `__type` attribute are written as leaves: their text is parsed as a value of
/// that type, and their remaining attributes follow the value. Every other node is a container.
pub fn encode_with(doc: &Document, encoding: TextEncoding) -> Result<Vec<u8>> {
    let mut walker = doc.walk().ok_or(Error::EmptyDocument)?;
    let mut encoder = Encoder::new(encoding);
    loop {
        let (id, event) = walker.walk();
        match event {
            WalkEvent::Start => encoder.start_node(doc.node(id))?,
            WalkEvent::End => encoder.nodes.push(Marker::NodeEnd.into()),
            WalkEvent::Eof => break,
        }
    }
    Ok(encoder.finish())
}

struct Encoder {
    nodes: Vec<u8>,
    data: Vec<u8>,
    offsets: ByteOffsets,
    encoding: TextEncoding,
}

impl Encoder {
    fn new(encoding: TextEncoding) -> Self {
        Self {
            nodes: Vec::new(),
            data: Vec::new(),
            offsets: ByteOffsets::new(),
            encoding,
        }
    }

    fn start_node(&mut self, node: &Node) -> Result<()> {
        match node.leaf_type() {
            Some(name) => {
                let ty = TypeCode::from_name(name)
                    .ok_or_else(|| Error::UnsupportedLeafType(name.to_string()))?;
                self.write_leaf(node, ty)?;
                for (key, value) in node.user_attributes() {
                    self.write_attr(key, value)?;
                }
            }
            None => {
                trace!("node start <{}>", node.tag());
                self.nodes.push(Marker::NodeStart.into());
                write_name(&mut self.nodes, node.tag())?;
                for (key, value) in node.attributes() {
                    self.write_attr(key, value)?;
                }
            }
        }
        Ok(())
    }

    fn write_leaf(&mut self, node: &Node, ty: TypeCode) -> Result<()> {
        let desc = ty.descriptor();
        let text = node.text().unwrap_or("");
        trace!("leaf <{}> {} = {:?}", node.tag(), desc.name, text);
        match desc.kind {
            ValueKind::Str => {
                let mut raw = self.encoding.encode(text)?.into_owned();
                raw.push(0);
                self.write_marker(Marker::Leaf { ty, array: false }, node.tag())?;
                self.write_block(&raw)
            }
            ValueKind::Bin => {
                let raw = parse_bin(text)?;
                self.write_marker(Marker::Leaf { ty, array: false }, node.tag())?;
                self.write_block(&raw)
            }
            _ => {
                let (payload, count) = parse_values(&desc, text)?;
                let array = count != desc.count;
                self.write_marker(Marker::Leaf { ty, array }, node.tag())?;
                if array {
                    self.write_array_len(payload.len())?;
                }
                self.write_payload(&payload);
                Ok(())
            }
        }
    }

    fn write_marker(&mut self, marker: Marker, name: &str) -> Result<()> {
        self.nodes.push(marker.into());
        write_name(&mut self.nodes, name)
    }

    fn write_attr(&mut self, key: &str, value: &str) -> Result<()> {
        trace!("attribute {}={:?}", key, value);
        let mut raw = self.encoding.encode(value)?.into_owned();
        raw.push(0);
        self.write_marker(Marker::Attribute, key)?;
        self.write_block(&raw)
    }

    /// Write into the data segment at `pos`, zero-filling any gap before it.
    fn write_at(&mut self, pos: usize, bytes: &[u8]) {
        let end = pos + bytes.len();
        if self.data.len() < end {
            self.data.resize(end, 0);
        }
        self.data[pos..end].copy_from_slice(bytes);
    }

    fn write_block(&mut self, raw: &[u8]) -> Result<()> {
        let pos = self.offsets.offset4();
        self.write_at(pos, &len_prefix(raw.len())?);
        self.write_at(pos + 4, raw);
        self.offsets.align(pos + 4 + raw.len());
        Ok(())
    }

    fn write_array_len(&mut self, len: usize) -> Result<()> {
        let pos = self.offsets.offset4();
        self.write_at(pos, &len_prefix(len)?);
        self.offsets.align(pos + 4);
        Ok(())
    }

    fn write_payload(&mut self, payload: &[u8]) {
        let start = self.offsets.claim(payload.len());
        self.write_at(start, payload);
        self.offsets.align(start + payload.len());
    }

    fn finish(mut self) -> Vec<u8> {
        self.nodes.push(Marker::FileEnd.into());
        let padded = (self.nodes.len() + 3) & !3;
        self.nodes.resize(padded, 0);
        let padded = self.data.len().max(self.offsets.offset4());
        self.data.resize(padded, 0);
        debug!(
            "encoded kbin: {} node bytes, {} data bytes, encoding {}",
            self.nodes.len(),
            self.data.len(),
            self.encoding.name()
        );

        let header = self.encoding.header_byte();
        let mut buf = Vec::with_capacity(12 + self.nodes.len() + self.data.len());
        buf.extend_from_slice(&MAGIC_NUMBER.to_be_bytes());
        buf.push(header);
        buf.push(!header);
        // The format has no way to express segments past u32::MAX
        buf.extend_from_slice(&(self.nodes.len() as u32).to_be_bytes());
        buf.extend_from_slice(&self.nodes);
        buf.extend_from_slice(&(self.data.len() as u32).to_be_bytes());
        buf.extend_from_slice(&self.data);
        buf
    }
}

fn len_prefix(len: usize) -> Result<[u8; 4]> {
    u32::try_from(len)
        .map(u32::to_be_bytes)
        .map_err(|_| Error::BadStructure("value is longer than a u32 length prefix allows"))
}
