use std::borrow::Cow;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Text encoding applied to string leaves and attribute values. Names are always sixbit and
/// aren't affected.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TextEncoding {
    #[default]
    None,
    Ascii,
    Iso8859_1,
    EucJp,
    ShiftJis,
    Utf8,
}

impl TextEncoding {
    pub fn from_id(id: u8) -> Result<TextEncoding> {
        use self::TextEncoding::*;
        Ok(match id {
            0 => None,
            1 => Ascii,
            2 => Iso8859_1,
            3 => EucJp,
            4 => ShiftJis,
            5 => Utf8,
            _ => return Err(Error::UnknownEncoding(id)),
        })
    }

    pub fn id(self) -> u8 {
        use self::TextEncoding::*;
        match self {
            None => 0,
            Ascii => 1,
            Iso8859_1 => 2,
            EucJp => 3,
            ShiftJis => 4,
            Utf8 => 5,
        }
    }

    pub fn name(self) -> &'static str {
        use self::TextEncoding::*;
        match self {
            None => "NONE",
            Ascii => "ASCII",
            Iso8859_1 => "ISO-8859-1",
            EucJp => "EUC-JP",
            ShiftJis => "SHIFT_JIS",
            Utf8 => "UTF-8",
        }
    }

    /// The encoding id lives in the high three bits of the header's encoding byte.
    pub fn from_header_byte(b: u8) -> Result<TextEncoding> {
        TextEncoding::from_id(b >> 5)
    }

    pub fn header_byte(self) -> u8 {
        self.id() << 5
    }

    /// Decode a string value from the data segment. A single trailing NUL is dropped.
    pub fn decode(self, raw: &[u8]) -> Result<String> {
        let raw = match raw.split_last() {
            Some((0, rest)) => rest,
            _ => raw,
        };
        let bad = || Error::BadText {
            encoding: self.name(),
        };
        match self {
            TextEncoding::None | TextEncoding::Ascii | TextEncoding::Utf8 => {
                String::from_utf8(raw.to_vec()).map_err(|_| bad())
            }
            TextEncoding::Iso8859_1 => Ok(raw.iter().map(|&b| b as char).collect()),
            TextEncoding::EucJp | TextEncoding::ShiftJis => {
                let (text, had_errors) = self
                    .transcoder()
                    .decode_without_bom_handling(raw);
                if had_errors {
                    Err(bad())
                } else {
                    Ok(text.into_owned())
                }
            }
        }
    }

    /// Encode a string for the data segment, without the trailing NUL.
    pub fn encode<'a>(self, text: &'a str) -> Result<Cow<'a, [u8]>> {
        let bad = || Error::BadText {
            encoding: self.name(),
        };
        match self {
            TextEncoding::None | TextEncoding::Ascii | TextEncoding::Utf8 => {
                Ok(Cow::Borrowed(text.as_bytes()))
            }
            TextEncoding::Iso8859_1 => text
                .chars()
                .map(|c| u8::try_from(c as u32).map_err(|_| bad()))
                .collect::<Result<Vec<u8>>>()
                .map(Cow::Owned),
            TextEncoding::EucJp | TextEncoding::ShiftJis => {
                let (bytes, _, had_errors) = self.transcoder().encode(text);
                if had_errors {
                    Err(bad())
                } else {
                    Ok(bytes)
                }
            }
        }
    }

    fn transcoder(self) -> &'static encoding_rs::Encoding {
        match self {
            TextEncoding::EucJp => encoding_rs::EUC_JP,
            TextEncoding::ShiftJis => encoding_rs::SHIFT_JIS,
            _ => encoding_rs::UTF_8,
        }
    }
}

/// Look up the text encoding registered under an id.
pub fn encoding_of(id: u8) -> Result<TextEncoding> {
    TextEncoding::from_id(id)
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn registry() {
        for id in 0..=5u8 {
            let enc = encoding_of(id).unwrap();
            assert_eq!(enc.id(), id);
            assert_eq!(TextEncoding::from_header_byte(enc.header_byte()).unwrap(), enc);
        }
        assert!(matches!(encoding_of(6), Err(Error::UnknownEncoding(6))));
        assert!(matches!(
            TextEncoding::from_header_byte(0xe0),
            Err(Error::UnknownEncoding(7))
        ));
        assert_eq!(TextEncoding::ShiftJis.header_byte(), 0x80);
        assert_eq!(TextEncoding::default(), TextEncoding::None);
    }

    #[test]
    fn strips_one_nul() {
        let enc = TextEncoding::Utf8;
        assert_eq!(enc.decode(b"abc\0").unwrap(), "abc");
        assert_eq!(enc.decode(b"abc\0\0").unwrap(), "abc\0");
        assert_eq!(enc.decode(b"abc").unwrap(), "abc");
        assert_eq!(enc.decode(b"").unwrap(), "");
    }

    #[test]
    fn latin1() {
        let enc = TextEncoding::Iso8859_1;
        assert_eq!(enc.encode("café").unwrap().as_ref(), b"caf\xe9");
        assert_eq!(enc.decode(b"caf\xe9\0").unwrap(), "café");
        assert!(matches!(
            enc.encode("日本"),
            Err(Error::BadText {
                encoding: "ISO-8859-1"
            })
        ));
    }

    #[test]
    fn japanese() {
        let text = "日本語テキスト";
        for enc in [TextEncoding::ShiftJis, TextEncoding::EucJp] {
            let bytes = enc.encode(text).unwrap().into_owned();
            assert_ne!(bytes.as_slice(), text.as_bytes());
            assert_eq!(enc.decode(&bytes).unwrap(), text);
        }
        // "日" is 0x93fa in Shift_JIS
        assert_eq!(
            TextEncoding::ShiftJis.encode("日").unwrap().as_ref(),
            &[0x93, 0xfa]
        );
    }

    #[test]
    fn identity_requires_utf8() {
        assert!(matches!(
            TextEncoding::None.decode(&[0xff, 0xfe]),
            Err(Error::BadText { encoding: "NONE" })
        ));
        assert_eq!(TextEncoding::Ascii.encode("abc").unwrap().as_ref(), b"abc");
    }
}
