//! kbin is the compact binary XML format used by Konami's e-amusement network. This crate
//! decodes kbin buffers into an ordered tree of nodes and encodes trees back into the exact
//! byte layout the format expects.
//!
//! A kbin document is made of:
//!
//! - A 4-byte header: the magic number, the text encoding, and a checksum of the encoding
//! - A node segment describing the tree structure, with element names packed into six bits per
//! 	character
//! - A data segment holding every typed value and attribute, packed so that 1-byte and 2-byte
//! 	values fill the gaps left between 4-byte-aligned ones
//!
//! Values are typed leaves: a node carrying a `__type` pseudo-attribute (one of 53 fixed-width
//! integer, fixed-point, address, boolean, string and binary types) with its value as text.
//! Arrays and multi-element values additionally get `__size` and `__count`.
//!
//! ```
//! use kbin::{Document, TypeCode};
//!
//! let mut doc = Document::new();
//! let root = doc.create_root("call");
//! doc.node_mut(root).set_attr("model", "KFC:J:A:A");
//! doc.add_leaf(root, "id", TypeCode::U32, "12345");
//!
//! let bytes = kbin::encode(&doc).unwrap();
//! assert!(kbin::is_kbin(&bytes));
//! assert_eq!(kbin::decode(&bytes).unwrap(), doc);
//! ```
//!
//! Documents can also be rendered to and parsed from plain XML with [`Document::to_xml`] and
//! [`Document::from_xml`]. See the [`format`] module for the byte-level details.

mod decode;
mod document;
mod encode;
mod encoding;
mod error;
mod offsets;
mod sixbit;
mod types;
mod value;
mod walker;
mod xml;

pub mod format;

pub use self::decode::decode;
pub use self::document::{is_pseudo_attr, Document, Node, NodeId, COUNT_ATTR, SIZE_ATTR, TYPE_ATTR};
pub use self::encode::{encode, encode_with};
pub use self::encoding::{encoding_of, TextEncoding};
pub use self::error::{Error, Result};
pub use self::offsets::ByteOffsets;
pub use self::sixbit::{decode_sixbit, encode_sixbit, packed_len};
pub use self::types::{type_of, Marker, TypeCode, TypeDescriptor, ValueKind, ARRAY_FLAG};
pub use self::value::{format_fixed, parse_fixed};
pub use self::walker::{TreeWalker, WalkEvent};

/// The first two bytes of every kbin buffer, big-endian.
pub const MAGIC_NUMBER: u16 = 0xA042;

/// Node and attribute names are prefixed with a single length byte, so they can be at most 255
/// characters long.
pub const MAX_NAME_LEN: usize = 255;

/// Check if a buffer looks like kbin, i.e. starts with the magic number. This doesn't validate
/// anything past the first two bytes.
pub fn is_kbin(buf: &[u8]) -> bool {
    buf.len() >= 2 && u16::from_be_bytes([buf[0], buf[1]]) == MAGIC_NUMBER
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn sniff() {
        assert!(is_kbin(&[0xa0, 0x42]));
        assert!(is_kbin(&[0xa0, 0x42, 0x00, 0xff, 1, 2, 3]));
        assert!(!is_kbin(&[0xa0]));
        assert!(!is_kbin(b"<?xml"));
        assert!(!is_kbin(&[]));
    }

    #[test]
    fn sniff_encoded() {
        let mut doc = Document::new();
        doc.create_root("r");
        assert!(is_kbin(&encode(&doc).unwrap()));
        assert!(!is_kbin(doc.to_xml().unwrap().as_bytes()));
    }

    #[test]
    fn errors_display() {
        let err = decode(&[0, 0, 0, 0]).unwrap_err();
        assert!(!err.to_string().is_empty());
        let err: Box<dyn std::error::Error> = Box::new(Error::EmptyDocument);
        assert!(!err.to_string().is_empty());
    }
}
