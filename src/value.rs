//! Conversion between leaf payload bytes and their textual form.
//!
//! Fixed-size leaves hold one or more big-endian elements and render as the elements separated
//! by single spaces. Float-class types are fixed-point integers with six implied fractional
//! digits, IPv4 addresses render as dotted quads, and binary blobs as lowercase hex.

use std::net::Ipv4Addr;

use byteorder::{BigEndian, ByteOrder};

use crate::error::{Error, Result};
use crate::types::{TypeDescriptor, ValueKind};

const FIXED_DIGITS: usize = 6;

/// Render a fixed-point integer with six implied fractional digits, e.g. `1500000` as
/// `1.500000` and `-1` as `-0.000001`.
pub fn format_fixed(v: i64) -> String {
    let digits = format!("{:0width$}", v.unsigned_abs(), width = FIXED_DIGITS + 1);
    let (major, minor) = digits.split_at(digits.len() - FIXED_DIGITS);
    let sign = if v < 0 { "-" } else { "" };
    format!("{}{}.{}", sign, major, minor)
}

/// Parse a decimal into a fixed-point integer with six implied fractional digits. Extra
/// fractional digits are truncated and missing ones are zero-filled.
pub fn parse_fixed(s: &str) -> Option<i64> {
    if !s.bytes().any(|b| b.is_ascii_digit()) {
        return None;
    }
    let (major, minor) = s.split_once('.').unwrap_or((s, ""));
    if !minor.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    let minor = &minor[..minor.len().min(FIXED_DIGITS)];
    format!("{}{:0<width$}", major, minor, width = FIXED_DIGITS)
        .parse()
        .ok()
}

fn read_signed(chunk: &[u8]) -> i64 {
    match chunk.len() {
        1 => chunk[0] as i8 as i64,
        2 => BigEndian::read_i16(chunk) as i64,
        4 => BigEndian::read_i32(chunk) as i64,
        _ => BigEndian::read_i64(chunk),
    }
}

fn read_unsigned(chunk: &[u8]) -> u64 {
    match chunk.len() {
        1 => chunk[0] as u64,
        2 => BigEndian::read_u16(chunk) as u64,
        4 => BigEndian::read_u32(chunk) as u64,
        _ => BigEndian::read_u64(chunk),
    }
}

fn fits_signed(v: i64, width: usize) -> bool {
    if width >= 8 {
        return true;
    }
    let bits = width * 8;
    let min = -(1i64 << (bits - 1));
    let max = (1i64 << (bits - 1)) - 1;
    (min..=max).contains(&v)
}

fn fits_unsigned(v: u64, width: usize) -> bool {
    width >= 8 || v < (1u64 << (width * 8))
}

/// Render every element of a fixed-size payload. Trailing bytes that don't fill a whole
/// element are ignored.
pub fn format_values(desc: &TypeDescriptor, payload: &[u8]) -> String {
    let rendered: Vec<String> = payload
        .chunks_exact(desc.width)
        .map(|chunk| match desc.kind {
            ValueKind::Signed => read_signed(chunk).to_string(),
            ValueKind::Float => format_fixed(read_signed(chunk)),
            ValueKind::Ip4 => Ipv4Addr::new(chunk[0], chunk[1], chunk[2], chunk[3]).to_string(),
            _ => read_unsigned(chunk).to_string(),
        })
        .collect();
    rendered.join(" ")
}

/// Parse the whitespace-separated elements of a fixed-size leaf into its payload. Returns the
/// payload and the number of elements.
pub fn parse_values(desc: &TypeDescriptor, text: &str) -> Result<(Vec<u8>, usize)> {
    let mut payload = Vec::new();
    let mut count = 0;
    for token in text.split_whitespace() {
        let bad = || Error::InvalidValue {
            ty: desc.name,
            value: token.to_string(),
        };
        let width = desc.width;
        match desc.kind {
            ValueKind::Signed | ValueKind::Float => {
                let v = if desc.kind == ValueKind::Float {
                    parse_fixed(token)
                } else {
                    token.parse::<i64>().ok()
                };
                let v = v.filter(|v| fits_signed(*v, width)).ok_or_else(bad)?;
                payload.extend_from_slice(&v.to_be_bytes()[8 - width..]);
            }
            ValueKind::Unsigned | ValueKind::Bool => {
                let v = token
                    .parse::<u64>()
                    .ok()
                    .filter(|v| fits_unsigned(*v, width))
                    .ok_or_else(bad)?;
                payload.extend_from_slice(&v.to_be_bytes()[8 - width..]);
            }
            ValueKind::Ip4 => {
                let addr: Ipv4Addr = token.parse().map_err(|_| bad())?;
                payload.extend_from_slice(&addr.octets());
            }
            ValueKind::Str | ValueKind::Bin => {
                return Err(Error::InvalidValue {
                    ty: desc.name,
                    value: text.to_string(),
                })
            }
        }
        count += 1;
    }
    Ok((payload, count))
}

/// Render a binary blob as lowercase hex.
pub fn format_bin(payload: &[u8]) -> String {
    hex::encode(payload)
}

pub fn parse_bin(text: &str) -> Result<Vec<u8>> {
    let text = text.trim();
    hex::decode(text).map_err(|_| Error::InvalidValue {
        ty: "bin",
        value: text.to_string(),
    })
}
