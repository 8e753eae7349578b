//! Six-bit packing for node and attribute names.
//!
//! Each character maps onto one of 64 symbols: `0-9` are 0-9, `:` is 10, `A-Z` are 11-36, `_` is
//! 37, and `a-z` are 38-63. Symbols are packed most-significant bit first, with the final byte
//! padded out with zero bits. In the node segment a name is preceded by one byte holding its
//! length in characters.

use crate::error::{Error, Result};
use crate::MAX_NAME_LEN;

fn char_to_sixbit(c: char) -> Result<u8> {
    let v = match c {
        '0'..='9' => c as u8 - b'0',
        ':' => 10,
        'A'..='Z' => c as u8 - b'A' + 11,
        '_' => 37,
        'a'..='z' => c as u8 - b'a' + 38,
        _ => return Err(Error::InvalidSixBitChar(c)),
    };
    Ok(v)
}

fn sixbit_to_char(v: u8) -> char {
    match v & 0x3f {
        v @ 0..=9 => (b'0' + v) as char,
        10 => ':',
        v @ 11..=36 => (b'A' + v - 11) as char,
        37 => '_',
        v => (b'a' + v - 38) as char,
    }
}

/// Number of bytes needed to pack `len` sixbit characters.
pub fn packed_len(len: usize) -> usize {
    (len * 6 + 7) / 8
}

/// Unpack `len` characters from a sixbit-packed buffer.
pub fn decode_sixbit(len: usize, packed: &[u8]) -> Result<String> {
    let needed = packed_len(len);
    if packed.len() < needed {
        return Err(Error::TruncatedSegment {
            step: "decode sixbit name",
            actual: packed.len(),
            expected: needed,
        });
    }

    let mut out = String::with_capacity(len);
    let mut acc: u32 = 0;
    let mut bits = 0;
    let mut bytes = packed[..needed].iter();
    while out.len() < len {
        if bits < 6 {
            // Can't run dry: `needed` bytes always cover `len` characters
            if let Some(b) = bytes.next() {
                acc = (acc << 8) | (*b as u32);
                bits += 8;
            }
        }
        bits -= 6;
        out.push(sixbit_to_char((acc >> bits) as u8));
        acc &= (1 << bits) - 1;
    }
    Ok(out)
}

/// Pack a name into sixbit form, without the length byte.
pub fn encode_sixbit(s: &str) -> Result<Vec<u8>> {
    let mut out = Vec::with_capacity(packed_len(s.len()));
    let mut acc: u32 = 0;
    let mut bits = 0;
    for c in s.chars() {
        acc = (acc << 6) | char_to_sixbit(c)? as u32;
        bits += 6;
        if bits >= 8 {
            bits -= 8;
            out.push((acc >> bits) as u8);
            acc &= (1 << bits) - 1;
        }
    }
    if bits > 0 {
        out.push((acc << (8 - bits)) as u8);
    }
    Ok(out)
}

/// Read a length-prefixed sixbit name from the front of the node segment.
pub(crate) fn read_name(buf: &mut &[u8]) -> Result<String> {
    let (&len, rest) = buf
        .split_first()
        .ok_or(Error::UnexpectedEndOfData("read name length"))?;
    let len = len as usize;
    let needed = packed_len(len);
    let name = decode_sixbit(len, rest)?;
    *buf = &rest[needed..];
    Ok(name)
}

/// Append a length-prefixed sixbit name to the node segment.
pub(crate) fn write_name(buf: &mut Vec<u8>, name: &str) -> Result<()> {
    // Every valid sixbit character is a single byte, so byte length is character length
    let len = name.len();
    if len > MAX_NAME_LEN {
        return Err(Error::NameTooLong(len));
    }
    let packed = encode_sixbit(name)?;
    buf.push(len as u8);
    buf.extend_from_slice(&packed);
    Ok(())
}
