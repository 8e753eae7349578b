use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Set on a node segment byte when the leaf holds a length-prefixed array.
pub const ARRAY_FLAG: u8 = 0x40;

pub const CONTROL_NODE_START: u8 = 1;
pub const CONTROL_ATTRIBUTE: u8 = 46;
pub const CONTROL_NODE_END: u8 = 190;
pub const CONTROL_FILE_END: u8 = 191;

/// How the bytes of a leaf turn into text.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ValueKind {
    Signed,
    Unsigned,
    /// Fixed-point decimal with six implied fractional digits.
    Float,
    Bool,
    Ip4,
    Str,
    Bin,
}

/// Everything the codec needs to know about a leaf type.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TypeDescriptor {
    pub code: u8,
    pub name: &'static str,
    /// Byte width of a single element.
    pub width: usize,
    /// Number of elements in one non-array value. Variable vectors carry their nominal cap.
    pub count: usize,
    pub signed: bool,
    pub kind: ValueKind,
}

impl TypeDescriptor {
    /// Byte size of one non-array value.
    pub fn value_size(&self) -> usize {
        self.width * self.count
    }
}

/// The closed set of leaf types a kbin node segment can carry.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum TypeCode {
    S8 = 2,
    U8 = 3,
    S16 = 4,
    U16 = 5,
    S32 = 6,
    U32 = 7,
    S64 = 8,
    U64 = 9,
    Bin = 10,
    Str = 11,
    Ip4 = 12,
    Time = 13,
    Float = 14,
    Double = 15,
    S8x2 = 16,
    U8x2 = 17,
    S16x2 = 18,
    U16x2 = 19,
    S32x2 = 20,
    U32x2 = 21,
    S64x2 = 22,
    U64x2 = 23,
    Floatx2 = 24,
    Doublex2 = 25,
    S8x3 = 26,
    U8x3 = 27,
    S16x3 = 28,
    U16x3 = 29,
    S32x3 = 30,
    U32x3 = 31,
    S64x3 = 32,
    U64x3 = 33,
    Floatx3 = 34,
    Doublex3 = 35,
    S8x4 = 36,
    U8x4 = 37,
    S16x4 = 38,
    U16x4 = 39,
    S32x4 = 40,
    U32x4 = 41,
    S64x4 = 42,
    U64x4 = 43,
    Floatx4 = 44,
    Doublex4 = 45,
    Vs8 = 48,
    Vu8 = 49,
    Vs16 = 50,
    Vu16 = 51,
    Bool = 52,
    Boolx2 = 53,
    Boolx3 = 54,
    Boolx4 = 55,
    Vb = 56,
}

impl TypeCode {
    pub const ALL: [TypeCode; 53] = {
        use self::TypeCode::*;
        [
            S8, U8, S16, U16, S32, U32, S64, U64, Bin, Str, Ip4, Time, Float, Double, S8x2, U8x2,
            S16x2, U16x2, S32x2, U32x2, S64x2, U64x2, Floatx2, Doublex2, S8x3, U8x3, S16x3, U16x3,
            S32x3, U32x3, S64x3, U64x3, Floatx3, Doublex3, S8x4, U8x4, S16x4, U16x4, S32x4, U32x4,
            S64x4, U64x4, Floatx4, Doublex4, Vs8, Vu8, Vs16, Vu16, Bool, Boolx2, Boolx3, Boolx4,
            Vb,
        ]
    };

    /// Look up a type code, ignoring the array flag. Returns `None` for control codes and
    /// unassigned values.
    pub fn from_u8(n: u8) -> Option<TypeCode> {
        use self::TypeCode::*;
        let ty = match n & !ARRAY_FLAG {
            2 => S8,
            3 => U8,
            4 => S16,
            5 => U16,
            6 => S32,
            7 => U32,
            8 => S64,
            9 => U64,
            10 => Bin,
            11 => Str,
            12 => Ip4,
            13 => Time,
            14 => Float,
            15 => Double,
            16 => S8x2,
            17 => U8x2,
            18 => S16x2,
            19 => U16x2,
            20 => S32x2,
            21 => U32x2,
            22 => S64x2,
            23 => U64x2,
            24 => Floatx2,
            25 => Doublex2,
            26 => S8x3,
            27 => U8x3,
            28 => S16x3,
            29 => U16x3,
            30 => S32x3,
            31 => U32x3,
            32 => S64x3,
            33 => U64x3,
            34 => Floatx3,
            35 => Doublex3,
            36 => S8x4,
            37 => U8x4,
            38 => S16x4,
            39 => U16x4,
            40 => S32x4,
            41 => U32x4,
            42 => S64x4,
            43 => U64x4,
            44 => Floatx4,
            45 => Doublex4,
            48 => Vs8,
            49 => Vu8,
            50 => Vs16,
            51 => Vu16,
            52 => Bool,
            53 => Boolx2,
            54 => Boolx3,
            55 => Boolx4,
            56 => Vb,
            _ => return None,
        };
        Some(ty)
    }

    pub fn into_u8(self) -> u8 {
        self as u8
    }

    /// Look up a type by the name used in the `__type` pseudo-attribute.
    pub fn from_name(name: &str) -> Option<TypeCode> {
        match name {
            "b" => return Some(TypeCode::Bool),
            "f" => return Some(TypeCode::Float),
            "d" => return Some(TypeCode::Double),
            _ => (),
        }
        TypeCode::ALL.iter().copied().find(|ty| ty.name() == name)
    }

    pub fn name(self) -> &'static str {
        self.descriptor().name
    }

    pub fn descriptor(self) -> TypeDescriptor {
        use self::TypeCode::*;
        use self::ValueKind::Float as Fixed;
        use self::ValueKind::{Signed, Unsigned};
        let (name, width, count, kind) = match self {
            S8 => ("s8", 1, 1, Signed),
            U8 => ("u8", 1, 1, Unsigned),
            S16 => ("s16", 2, 1, Signed),
            U16 => ("u16", 2, 1, Unsigned),
            S32 => ("s32", 4, 1, Signed),
            U32 => ("u32", 4, 1, Unsigned),
            S64 => ("s64", 8, 1, Signed),
            U64 => ("u64", 8, 1, Unsigned),
            Bin => ("bin", 1, 1, ValueKind::Bin),
            Str => ("str", 1, 1, ValueKind::Str),
            Ip4 => ("ip4", 4, 1, ValueKind::Ip4),
            Time => ("time", 4, 1, Unsigned),
            Float => ("float", 4, 1, Fixed),
            Double => ("double", 8, 1, Fixed),
            S8x2 => ("2s8", 1, 2, Signed),
            U8x2 => ("2u8", 1, 2, Unsigned),
            S16x2 => ("2s16", 2, 2, Signed),
            U16x2 => ("2u16", 2, 2, Unsigned),
            S32x2 => ("2s32", 4, 2, Signed),
            U32x2 => ("2u32", 4, 2, Unsigned),
            S64x2 => ("2s64", 8, 2, Signed),
            U64x2 => ("2u64", 8, 2, Unsigned),
            Floatx2 => ("2f", 4, 2, Fixed),
            Doublex2 => ("2d", 8, 2, Fixed),
            S8x3 => ("3s8", 1, 3, Signed),
            U8x3 => ("3u8", 1, 3, Unsigned),
            S16x3 => ("3s16", 2, 3, Signed),
            U16x3 => ("3u16", 2, 3, Unsigned),
            S32x3 => ("3s32", 4, 3, Signed),
            U32x3 => ("3u32", 4, 3, Unsigned),
            S64x3 => ("3s64", 8, 3, Signed),
            U64x3 => ("3u64", 8, 3, Unsigned),
            Floatx3 => ("3f", 4, 3, Fixed),
            Doublex3 => ("3d", 8, 3, Fixed),
            S8x4 => ("4s8", 1, 4, Signed),
            U8x4 => ("4u8", 1, 4, Unsigned),
            S16x4 => ("4s16", 2, 4, Signed),
            U16x4 => ("4u16", 2, 4, Unsigned),
            S32x4 => ("4s32", 4, 4, Signed),
            U32x4 => ("4u32", 4, 4, Unsigned),
            S64x4 => ("4s64", 8, 4, Signed),
            U64x4 => ("4u64", 8, 4, Unsigned),
            Floatx4 => ("4f", 4, 4, Fixed),
            Doublex4 => ("4d", 8, 4, Fixed),
            Vs8 => ("vs8", 1, 16, Signed),
            Vu8 => ("vu8", 1, 16, Unsigned),
            Vs16 => ("vs16", 2, 8, Signed),
            Vu16 => ("vu16", 2, 8, Unsigned),
            Bool => ("bool", 1, 1, ValueKind::Bool),
            Boolx2 => ("2b", 1, 2, ValueKind::Bool),
            Boolx3 => ("3b", 1, 3, ValueKind::Bool),
            Boolx4 => ("4b", 1, 4, ValueKind::Bool),
            Vb => ("vb", 1, 16, ValueKind::Bool),
        };
        TypeDescriptor {
            code: self.into_u8(),
            name,
            width,
            count,
            signed: matches!(kind, Signed | Fixed),
            kind,
        }
    }
}

impl From<TypeCode> for u8 {
    fn from(val: TypeCode) -> u8 {
        val.into_u8()
    }
}

/// Look up the descriptor for a type code byte.
pub fn type_of(code: u8) -> Result<TypeDescriptor> {
    TypeCode::from_u8(code)
        .filter(|_| code & ARRAY_FLAG == 0)
        .map(TypeCode::descriptor)
        .ok_or(Error::UnknownType(code))
}

/// A single node segment byte.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Marker {
    NodeStart,
    Attribute,
    NodeEnd,
    FileEnd,
    Leaf { ty: TypeCode, array: bool },
    Unknown(u8),
}

impl Marker {
    /// Construct a marker from a single byte. The array flag is stripped before matching, so
    /// control codes are recognized with or without it.
    pub fn from_u8(n: u8) -> Marker {
        let array = n & ARRAY_FLAG != 0;
        match n & !ARRAY_FLAG {
            CONTROL_NODE_START => Marker::NodeStart,
            CONTROL_ATTRIBUTE => Marker::Attribute,
            CONTROL_NODE_END => Marker::NodeEnd,
            CONTROL_FILE_END => Marker::FileEnd,
            code => match TypeCode::from_u8(code) {
                Some(ty) => Marker::Leaf { ty, array },
                None => Marker::Unknown(n),
            },
        }
    }

    /// Converts a marker into the byte the encoder writes for it.
    pub fn into_u8(self) -> u8 {
        match self {
            Marker::NodeStart => CONTROL_NODE_START,
            Marker::Attribute => CONTROL_ATTRIBUTE,
            Marker::NodeEnd => CONTROL_NODE_END | ARRAY_FLAG,
            Marker::FileEnd => CONTROL_FILE_END | ARRAY_FLAG,
            Marker::Leaf { ty, array: false } => ty.into_u8(),
            Marker::Leaf { ty, array: true } => ty.into_u8() | ARRAY_FLAG,
            Marker::Unknown(n) => n,
        }
    }
}

impl From<u8> for Marker {
    fn from(val: u8) -> Marker {
        Marker::from_u8(val)
    }
}

impl From<Marker> for u8 {
    fn from(val: Marker) -> u8 {
        val.into_u8()
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn registry_is_total() {
        for ty in TypeCode::ALL {
            assert_eq!(TypeCode::from_u8(ty.into_u8()), Some(ty));
            assert_eq!(TypeCode::from_name(ty.name()), Some(ty));
            assert_eq!(type_of(ty.into_u8()).unwrap().name, ty.name());
        }
        for code in [0u8, 1, 46, 47, 57, 63] {
            assert!(TypeCode::from_u8(code).is_none(), "{} shouldn't be a type", code);
            assert!(matches!(type_of(code), Err(Error::UnknownType(c)) if c == code));
        }
    }

    #[test]
    fn descriptors() {
        let u32 = TypeCode::U32.descriptor();
        assert_eq!((u32.code, u32.width, u32.count, u32.signed), (7, 4, 1, false));
        let v = TypeCode::S16x3.descriptor();
        assert_eq!((v.name, v.width, v.count, v.signed), ("3s16", 2, 3, true));
        assert_eq!(v.value_size(), 6);
        let d = TypeCode::Double.descriptor();
        assert_eq!((d.width, d.kind, d.signed), (8, ValueKind::Float, true));
        assert_eq!(TypeCode::Vs16.descriptor().count, 8);
        assert_eq!(TypeCode::Vb.descriptor().count, 16);
    }

    #[test]
    fn aliases() {
        assert_eq!(TypeCode::from_name("b"), Some(TypeCode::Bool));
        assert_eq!(TypeCode::from_name("f"), Some(TypeCode::Float));
        assert_eq!(TypeCode::from_name("d"), Some(TypeCode::Double));
        assert_eq!(TypeCode::from_name("u128"), None);
    }

    #[test]
    fn markers() {
        assert_eq!(Marker::from_u8(1), Marker::NodeStart);
        assert_eq!(Marker::from_u8(46), Marker::Attribute);
        assert_eq!(Marker::from_u8(190), Marker::NodeEnd);
        assert_eq!(Marker::from_u8(0xfe), Marker::NodeEnd);
        assert_eq!(Marker::from_u8(0xff), Marker::FileEnd);
        assert_eq!(
            Marker::from_u8(5 | ARRAY_FLAG),
            Marker::Leaf {
                ty: TypeCode::U16,
                array: true
            }
        );
        assert_eq!(Marker::from_u8(200), Marker::Unknown(200));
        assert_eq!(Marker::from_u8(0), Marker::Unknown(0));
        assert_eq!(u8::from(Marker::NodeEnd), 0xfe);
        assert_eq!(u8::from(Marker::FileEnd), 0xff);
        let leaf = Marker::Leaf {
            ty: TypeCode::S32x2,
            array: true,
        };
        assert_eq!(Marker::from_u8(leaf.into()), leaf);
    }
}
