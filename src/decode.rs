use byteorder::{BigEndian, ReadBytesExt};
use log::{debug, trace};

use crate::document::{set_leaf_attrs, Document, NodeId};
use crate::encoding::TextEncoding;
use crate::error::{Error, Result};
use crate::offsets::ByteOffsets;
use crate::sixbit::read_name;
use crate::types::{Marker, TypeCode, ValueKind};
use crate::value::{format_bin, format_values};
use crate::MAGIC_NUMBER;

/// Decode a kbin buffer into a document.
///
/// Fails on the first malformed element; no partial tree is returned.
pub fn decode(buf: &[u8]) -> Result<Document> {
    let mut buf = buf;
    let encoding = read_header(&mut buf)?;
    let nodes = read_segment(&mut buf, "read node segment")?;
    let data = read_segment(&mut buf, "read data segment")?;
    debug!(
        "decoding kbin: {} node bytes, {} data bytes, encoding {}",
        nodes.len(),
        data.len(),
        encoding.name()
    );
    let doc = Decoder::new(nodes, data, encoding).run()?;
    debug!("decoded {} nodes", doc.len());
    Ok(doc)
}

/// Check the magic number and encoding checksum, returning the text encoding.
fn read_header(buf: &mut &[u8]) -> Result<TextEncoding> {
    let short = |actual: usize| Error::TruncatedSegment {
        step: "read header",
        actual,
        expected: 4,
    };
    let len = buf.len();
    let magic = buf.read_u16::<BigEndian>().map_err(|_| short(len))?;
    if magic != MAGIC_NUMBER {
        return Err(Error::BadMagicNumber(magic));
    }
    let encoding = buf.read_u8().map_err(|_| short(len))?;
    let checksum = buf.read_u8().map_err(|_| short(len))?;
    if checksum != !encoding {
        return Err(Error::EncodingChecksumMismatch { encoding, checksum });
    }
    TextEncoding::from_header_byte(encoding)
}

/// Split a u32-length-prefixed segment off the front of the buffer.
fn read_segment<'a>(buf: &mut &'a [u8], step: &'static str) -> Result<&'a [u8]> {
    let len = buf
        .read_u32::<BigEndian>()
        .map_err(|_| Error::TruncatedSegment {
            step,
            actual: buf.len(),
            expected: 4,
        })? as usize;
    if buf.len() < len {
        return Err(Error::TruncatedSegment {
            step,
            actual: buf.len(),
            expected: len,
        });
    }
    let (segment, rest) = buf.split_at(len);
    *buf = rest;
    Ok(segment)
}

struct Decoder<'a> {
    nodes: &'a [u8],
    data: &'a [u8],
    offsets: ByteOffsets,
    encoding: TextEncoding,
    doc: Document,
    current: Option<NodeId>,
}

impl<'a> Decoder<'a> {
    fn new(nodes: &'a [u8], data: &'a [u8], encoding: TextEncoding) -> Self {
        Self {
            nodes,
            data,
            offsets: ByteOffsets::new(),
            encoding,
            doc: Document::with_encoding(encoding),
            current: None,
        }
    }

    fn run(mut self) -> Result<Document> {
        loop {
            let marker = self
                .nodes
                .read_u8()
                .map_err(|_| Error::UnexpectedEndOfData("read node marker"))?;
            match Marker::from_u8(marker) {
                Marker::NodeStart => {
                    let name = read_name(&mut self.nodes)?;
                    trace!("node start <{}>", name);
                    self.current = Some(self.doc.new_node(name, self.current));
                }
                Marker::Attribute => {
                    let name = read_name(&mut self.nodes)?;
                    let current = self
                        .current
                        .ok_or(Error::BadStructure("attribute outside of any node"))?;
                    let raw = self.read_block("read attribute value")?;
                    let value = self.encoding.decode(raw)?;
                    trace!("attribute {}={:?}", name, value);
                    self.doc.node_mut(current).set_attr(name, value);
                }
                Marker::NodeEnd => {
                    trace!("node end");
                    // The root has no parent and stays current until the file end
                    if let Some(parent) = self.current.and_then(|c| self.doc.parent(c)) {
                        self.current = Some(parent);
                    }
                }
                Marker::FileEnd => {
                    trace!("file end");
                    if let Some(root) = self.current {
                        self.doc.set_root(root);
                    }
                    return Ok(self.doc);
                }
                Marker::Leaf { ty, array } => {
                    let name = read_name(&mut self.nodes)?;
                    self.read_leaf(name, ty, array)?;
                }
                Marker::Unknown(code) => return Err(Error::UnknownControlCode(code)),
            }
        }
    }

    /// Read a leaf and make it the current node. Its closing `NodeEnd` moves back up to the
    /// parent, and anything that appears before that (attributes, even nodes) belongs to it.
    fn read_leaf(&mut self, name: String, ty: TypeCode, array: bool) -> Result<()> {
        let desc = ty.descriptor();
        let (text, size, count) = match desc.kind {
            ValueKind::Str => {
                let raw = self.read_block("read str value")?;
                let text = self.encoding.decode(raw)?;
                // Sized by the decoded text, so it doesn't depend on the terminator or encoding
                let size = text.len();
                (text, size, 0)
            }
            ValueKind::Bin => {
                let raw = self.read_block("read bin value")?;
                (format_bin(raw), raw.len(), 0)
            }
            _ => {
                let size = if array {
                    self.read_array_len()?
                } else {
                    desc.value_size()
                };
                let payload = self.read_payload(size)?;
                (format_values(&desc, payload), size, size / desc.width)
            }
        };
        trace!("leaf <{}> {}{} = {:?}", name, desc.name, if array { "[]" } else { "" }, text);
        let id = self.doc.new_node(name, self.current);
        let node = self.doc.node_mut(id);
        set_leaf_attrs(node, ty, size, count);
        node.set_text(text);
        self.current = Some(id);
        Ok(())
    }

    fn slice(&self, pos: usize, len: usize, step: &'static str) -> Result<&'a [u8]> {
        let data: &'a [u8] = self.data;
        pos.checked_add(len)
            .and_then(|end| data.get(pos..end))
            .ok_or(Error::TruncatedSegment {
                step,
                actual: data.len().saturating_sub(pos),
                expected: len,
            })
    }

    fn read_u32_at(&self, pos: usize, step: &'static str) -> Result<usize> {
        let mut raw = self.slice(pos, 4, step)?;
        let len = raw.read_u32::<BigEndian>().map_err(|_| Error::TruncatedSegment {
            step,
            actual: 0,
            expected: 4,
        })?;
        Ok(len as usize)
    }

    /// A length-prefixed block stored contiguously at the 4-byte cursor.
    fn read_block(&mut self, step: &'static str) -> Result<&'a [u8]> {
        let pos = self.offsets.offset4();
        let len = self.read_u32_at(pos, step)?;
        let block = self.slice(pos + 4, len, step)?;
        self.offsets.align(pos + 4 + len);
        Ok(block)
    }

    fn read_array_len(&mut self) -> Result<usize> {
        let pos = self.offsets.offset4();
        let len = self.read_u32_at(pos, "read array length")?;
        self.offsets.align(pos + 4);
        Ok(len)
    }

    fn read_payload(&mut self, size: usize) -> Result<&'a [u8]> {
        let start = self.offsets.claim(size);
        let payload = self.slice(start, size, "read value")?;
        self.offsets.align(start + size);
        Ok(payload)
    }
}
