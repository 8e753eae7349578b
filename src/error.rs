use std::fmt;

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug)]
pub enum Error {
    /// The first two bytes of the buffer weren't the kbin magic number.
    BadMagicNumber(u16),
    /// The checksum byte of the header wasn't the complement of the encoding byte.
    EncodingChecksumMismatch { encoding: u8, checksum: u8 },
    /// A byte in the node segment isn't a control code or a known leaf type.
    UnknownControlCode(u8),
    /// Looked up a type code that isn't in the type registry.
    UnknownType(u8),
    /// The header named a text encoding id outside of 0..=5.
    UnknownEncoding(u8),
    /// A node or attribute name contains a character sixbit can't represent.
    InvalidSixBitChar(char),
    /// A node or attribute name is longer than its length byte can hold.
    NameTooLong(usize),
    /// A leaf's `__type` pseudo-attribute doesn't name a registered type.
    UnsupportedLeafType(String),
    /// A length-prefixed segment or a value ended too early.
    TruncatedSegment {
        step: &'static str,
        actual: usize,
        expected: usize,
    },
    /// The node segment ran out before the file end marker.
    UnexpectedEndOfData(&'static str),
    /// Leaf text couldn't be serialized as its declared type.
    InvalidValue { ty: &'static str, value: String },
    /// Text couldn't be converted to or from the document's text encoding.
    BadText { encoding: &'static str },
    /// The node segment describes something that can't form a tree.
    BadStructure(&'static str),
    /// Tried to encode a document that has no root node.
    EmptyDocument,
    /// Failure reading or writing the XML representation of a document.
    Xml(String),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            Error::BadMagicNumber(magic) => {
                write!(f, "Incorrect magic number: expected 0xa042, got {:#06x}", magic)
            }
            Error::EncodingChecksumMismatch { encoding, checksum } => write!(
                f,
                "Invalid encoding checksum {:#04x} for encoding byte {:#04x}",
                checksum, encoding
            ),
            Error::UnknownControlCode(code) => write!(f, "Unknown control code {}", code),
            Error::UnknownType(code) => write!(f, "Unknown type code {}", code),
            Error::UnknownEncoding(id) => write!(f, "Unknown text encoding id {}", id),
            Error::InvalidSixBitChar(c) => write!(f, "Invalid sixbit character {:?}", c),
            Error::NameTooLong(len) => write!(
                f,
                "Name is {} characters long, maximum allowed is {}",
                len,
                crate::MAX_NAME_LEN
            ),
            Error::UnsupportedLeafType(ref ty) => write!(f, "Unsupported leaf type {:?}", ty),
            Error::TruncatedSegment {
                step,
                actual,
                expected,
            } => write!(
                f,
                "Expected data length {}, but got {} on step [{}]",
                expected, actual, step
            ),
            Error::UnexpectedEndOfData(step) => {
                write!(f, "Node segment ended early on step [{}]", step)
            }
            Error::InvalidValue { ty, ref value } => {
                write!(f, "Value {:?} is not a valid {}", value, ty)
            }
            Error::BadText { encoding } => {
                write!(f, "Text can't be represented in encoding {}", encoding)
            }
            Error::BadStructure(err) => write!(f, "Malformed node segment: {}", err),
            Error::EmptyDocument => f.write_str("Document has no root node"),
            Error::Xml(ref err) => write!(f, "XML failure: {}", err),
        }
    }
}

impl std::error::Error for Error {}
