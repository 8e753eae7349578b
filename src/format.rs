/*!

The kbin wire format.

All multi-byte numbers are big-endian. A kbin buffer is laid out as:

| Bytes | Contents |
| ----- | -------- |
| 2     | Magic number `0xA042` |
| 1     | Encoding byte: the text encoding id shifted left by 5 |
| 1     | Checksum: the bitwise complement of the encoding byte |
| 4     | Length of the node segment |
| n     | Node segment, zero-padded to a multiple of 4 |
| 4     | Length of the data segment |
| m     | Data segment, a multiple of 4 |

# Text Encodings

| Id | Encoding   |
| -- | ---------- |
| 0  | None       |
| 1  | ASCII      |
| 2  | ISO-8859-1 |
| 3  | EUC-JP     |
| 4  | Shift_JIS  |
| 5  | UTF-8      |

Ids 6 and 7 fit in the encoding byte but aren't assigned, and a decoder rejects them. The
encoding applies to string values and attribute values. Node names are always sixbit.

# Node Segment

The node segment is a flat stream of control bytes, most followed by a name:

| Byte            | Meaning                       | Followed by |
| --------------- | ----------------------------- | ----------- |
| 1               | Start of a container node     | name        |
| 46              | Attribute of the current node | name        |
| 190             | End of the current node       | nothing     |
| 191             | End of the document           | nothing     |
| 2..=45, 48..=56 | Start of a typed leaf         | name        |

Bit `0x40` on a leaf type marks it as an array. The end markers are written with that bit set,
as `0xFE` and `0xFF`, and readers strip it before matching. Anything past the end-of-document
byte is padding.

A leaf becomes the current node just like a container does, and stays current until its end
marker. Attributes that follow a leaf therefore belong to the leaf.

## Names

A name is one length byte (the number of characters, at most 255) followed by the characters
packed six bits each, most significant bit first, with the final byte zero-padded. The 64
characters are, in order:

```text
0123456789:ABCDEFGHIJKLMNOPQRSTUVWXYZ_abcdefghijklmnopqrstuvwxyz
```

so `"id"` packs to `[0x02, 0xBA, 0x90]`.

# Data Segment

Every value and attribute lives in the data segment, in the same order as the node segment
refers to them. Three cursors track where the next value goes:

- `offset4` is always 4-byte aligned and receives everything that isn't exactly 1 or 2 bytes
	long, including every length prefix
- `offset2` receives values that are exactly 2 bytes long
- `offset1` receives values that are exactly 1 byte long

After each read or write that ends at position `p`, `offset4` moves up to `p` rounded up to a
multiple of 4 (it never moves back). Any of the small cursors sitting on a 4-byte boundary then
jumps to `offset4`. Small values thus share 4-byte blocks: a `u8` followed by a `u32` and then
another `u8` puts the second byte right after the first, ahead of the `u32`.

## Fixed-size values

Each fixed-size type has an element width and an element count. The payload is the elements
one after another, sized by the total byte length. A leaf whose element count differs from the
type's count is an array: its payload is preceded by a 4-byte byte length at `offset4`, and the
payload itself then goes through the usual cursor selection.

Float-class types are signed fixed-point numbers with six implied decimal places: the text
`1.5` is stored as the integer `1500000`.

## Strings, Binary, and Attributes

`str` values and attribute values are NUL-terminated text in the document's encoding. `bin`
values are raw bytes, written as lowercase hex in the tree. Both are stored as a 4-byte length
followed by the bytes, contiguously at `offset4`, regardless of their length.

# Types

| Code | Name   | Width | Count |   | Code | Name  | Width | Count |
| ---- | ------ | ----- | ----- | - | ---- | ----- | ----- | ----- |
| 2    | s8     | 1     | 1     |   | 29   | 3u16  | 2     | 3     |
| 3    | u8     | 1     | 1     |   | 30   | 3s32  | 4     | 3     |
| 4    | s16    | 2     | 1     |   | 31   | 3u32  | 4     | 3     |
| 5    | u16    | 2     | 1     |   | 32   | 3s64  | 8     | 3     |
| 6    | s32    | 4     | 1     |   | 33   | 3u64  | 8     | 3     |
| 7    | u32    | 4     | 1     |   | 34   | 3f    | 4     | 3     |
| 8    | s64    | 8     | 1     |   | 35   | 3d    | 8     | 3     |
| 9    | u64    | 8     | 1     |   | 36   | 4s8   | 1     | 4     |
| 10   | bin    | 1     | -     |   | 37   | 4u8   | 1     | 4     |
| 11   | str    | 1     | -     |   | 38   | 4s16  | 2     | 4     |
| 12   | ip4    | 4     | 1     |   | 39   | 4u16  | 2     | 4     |
| 13   | time   | 4     | 1     |   | 40   | 4s32  | 4     | 4     |
| 14   | float  | 4     | 1     |   | 41   | 4u32  | 4     | 4     |
| 15   | double | 8     | 1     |   | 42   | 4s64  | 8     | 4     |
| 16   | 2s8    | 1     | 2     |   | 43   | 4u64  | 8     | 4     |
| 17   | 2u8    | 1     | 2     |   | 44   | 4f    | 4     | 4     |
| 18   | 2s16   | 2     | 2     |   | 45   | 4d    | 8     | 4     |
| 19   | 2u16   | 2     | 2     |   | 48   | vs8   | 1     | 16    |
| 20   | 2s32   | 4     | 2     |   | 49   | vu8   | 1     | 16    |
| 21   | 2u32   | 4     | 2     |   | 50   | vs16  | 2     | 8     |
| 22   | 2s64   | 8     | 2     |   | 51   | vu16  | 2     | 8     |
| 23   | 2u64   | 8     | 2     |   | 52   | bool  | 1     | 1     |
| 24   | 2f     | 4     | 2     |   | 53   | 2b    | 1     | 2     |
| 25   | 2d     | 8     | 2     |   | 54   | 3b    | 1     | 3     |
| 26   | 3s8    | 1     | 3     |   | 55   | 4b    | 1     | 4     |
| 27   | 3u8    | 1     | 3     |   | 56   | vb    | 1     | 16    |
| 28   | 3s16   | 2     | 3     |   |      |       |       |       |

*/
